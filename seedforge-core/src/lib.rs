use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod config;
pub mod fill;
pub mod generator;
pub mod ips;
pub mod items;
pub mod layout;
pub mod logic;
pub mod multiworld;
pub mod patch;
pub mod plando;
pub mod progression;
pub mod seed;
pub mod stats;
pub mod world;

pub use config::{Config, ConfigParseError, GameMode};
pub use fill::{FillError, TieBreak};
pub use generator::{
    generate_ips, generate_rom_bytes, GeneratedRomResult, GenerationOptions, GenerationStage,
    Generator, MultiplayerDetails,
};
pub use ips::{GeneratedPatch, PatchError};
pub use plando::PlandoConfig;
pub use seed::SeedData;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("no valid placement after {attempts} attempt(s)")]
    GenerationFailure { attempts: usize },
    #[error("patch error: {0}")]
    PatchDecode(#[from] PatchError),
    #[error("config error: {0}")]
    ConfigParse(#[from] ConfigParseError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SeedError>;

/// Everything a command-line or front-end run needs.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub options: GenerationOptions,
    /// JSON item map; placement is random when unset.
    pub plando_path: Option<PathBuf>,
    /// Base image to patch. Without one only IPS files are written.
    pub input_path: Option<PathBuf>,
    pub output_path: PathBuf,
    /// Also write a spoiler log.
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub seed: u64,
    pub hash: u32,
    pub out_root: PathBuf,
    pub files: Vec<PathBuf>,
}

fn file_label(data: &SeedData, player: usize) -> String {
    data.player_label(player)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn write_file(path: PathBuf, bytes: &[u8], files: &mut Vec<PathBuf>) -> Result<()> {
    fs::write(&path, bytes)?;
    log::info!("wrote {}", path.display());
    files.push(path);
    Ok(())
}

/// Generates a seed and writes its outputs into a per-seed folder under
/// `output_path`: one IPS per player, a patched image per player when a
/// base image is given, the compressed seed, and optionally the spoiler.
pub fn run(settings: &RunSettings) -> Result<RunOutput> {
    let base = match &settings.input_path {
        Some(path) if !path.exists() => {
            return Err(SeedError::Validation(format!(
                "Input path does not exist: {}",
                path.display()
            )))
        }
        Some(path) => Some(fs::read(path)?),
        None => None,
    };
    let plando = match &settings.plando_path {
        Some(path) => Some(load_plando(path)?),
        None => None,
    };

    let mut generator = Generator::standard();
    let data = match &plando {
        Some(plando) => generator.generate_plando_seed(&settings.options, plando)?,
        None => generator.generate_seed(&settings.options)?,
    };

    // Per-seed subfolder so repeated runs do not collide.
    let out_root = settings
        .output_path
        .join(format!("SeedForge_{}_{:08X}", data.seed, data.hash));
    fs::create_dir_all(&out_root)?;

    let mut files = Vec::new();
    for player in 0..data.worlds.len() {
        let label = file_label(&data, player);
        let ips = generate_ips(&data, player)?;
        write_file(out_root.join(format!("{label}.ips")), &ips, &mut files)?;
        if let Some(base) = &base {
            let rom = generate_rom_bytes(base, &data, player)?;
            write_file(out_root.join(format!("{label}.sfc")), &rom, &mut files)?;
        }
    }

    let seed_path = out_root.join("seed.json.gz");
    data.save(&seed_path)?;
    files.push(seed_path);

    if settings.debug {
        write_file(
            out_root.join("spoiler_log.txt"),
            data.spoiler_text().as_bytes(),
            &mut files,
        )?;
    }

    Ok(RunOutput {
        seed: data.seed,
        hash: data.hash,
        out_root,
        files,
    })
}

pub fn load_plando(path: &Path) -> Result<PlandoConfig> {
    let text = fs::read_to_string(path)?;
    Ok(PlandoConfig::from_json(&text)?)
}
