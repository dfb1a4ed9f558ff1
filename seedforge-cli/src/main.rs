use clap::{Args, Parser, Subcommand};
use rand::Rng;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use seedforge_core::config::{
    encode_config_blob, parse_config_blob, BeepRate, Goal, HeartColor, ItemPlacement, LogicLevel,
};
use seedforge_core::stats::{spawn_stats, StatEvent, StatRequest};
use seedforge_core::{
    generate_rom_bytes, ips, load_plando, run, Config, GameMode, GenerationOptions, Generator,
    MultiplayerDetails, RunSettings, SeedData, TieBreak,
};

#[derive(Debug, Parser)]
#[command(name = "seedforge", version, about = "Seed generator for the combined Kingdom/Depths adventure")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a random seed and write patches for every player.
    Generate {
        #[command(flatten)]
        gen: GenArgs,
    },
    /// Generate from a JSON item map, filling the rest randomly.
    Plando {
        #[arg(long)]
        plando: PathBuf,
        #[command(flatten)]
        gen: GenArgs,
    },
    /// Rebuild a shared multiworld from its seed and config blob.
    Join {
        #[arg(long)]
        seed: u64,
        #[arg(long)]
        blob: String,
        /// 1-based player number to patch for; all players when omitted.
        #[arg(long)]
        player: Option<usize>,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Patch a base image from an exported seed file.
    Patch {
        #[arg(long)]
        seed_file: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// 1-based player number.
        #[arg(long, default_value_t = 1)]
        player: usize,
    },
    /// Apply a plain IPS file.
    ApplyIps {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        patch: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the config token or blob for the given options, or decode one.
    Token {
        #[arg(long)]
        decode: Option<String>,
        #[command(flatten)]
        gen: GenArgs,
    },
    /// Generate many seeds and summarise them.
    Stats {
        #[arg(long, default_value_t = 100)]
        count: usize,
        #[arg(long, default_value_t = 0)]
        base_seed: u64,
        /// Stop after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
        #[command(flatten)]
        gen: GenArgs,
    },
}

#[derive(Debug, Args)]
struct GenArgs {
    #[arg(long)]
    seed: Option<u64>,

    /// JSON generation options; flags below are ignored when given,
    /// except --seed.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Base image to patch. Only IPS files are written without it.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Defaults to Documents/SeedForge.
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = seedforge_core::generator::DEFAULT_MAX_ATTEMPTS)]
    attempts: usize,

    #[arg(long, default_value = "prioritized")]
    tie_break: TieBreak,

    /// Player config tokens; overrides the individual option flags.
    /// Repeat once per player.
    #[arg(long = "config")]
    configs: Vec<String>,

    #[arg(long, default_value = "normal")]
    mode: GameMode,

    #[arg(long, default_value = "normal")]
    kingdom_logic: LogicLevel,

    #[arg(long, default_value = "normal")]
    depths_logic: LogicLevel,

    #[arg(long, default_value = "randomized")]
    sword: ItemPlacement,

    #[arg(long, default_value = "randomized")]
    morph: ItemPlacement,

    #[arg(long, default_value = "defeatboth")]
    goal: Goal,

    #[arg(long, default_value_t = seedforge_core::config::CRYSTAL_COUNT)]
    crystals: u8,

    #[arg(long, default_value = "")]
    name: String,

    #[arg(long, default_value = "red")]
    heart_color: HeartColor,

    #[arg(long, default_value = "normal")]
    beep: BeepRate,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl GenArgs {
    fn configs(&self) -> Result<Vec<Config>, String> {
        if !self.configs.is_empty() {
            return self
                .configs
                .iter()
                .map(|token| Config::from_token(token).map_err(|e| e.to_string()))
                .collect();
        }
        Ok(vec![Config {
            mode: self.mode,
            kingdom_logic: self.kingdom_logic,
            depths_logic: self.depths_logic,
            sword_location: self.sword,
            morph_location: self.morph,
            goal: self.goal,
            crystals_required: self.crystals,
            player_name: self.name.clone(),
            heart_color: self.heart_color,
            low_health_beep: self.beep,
        }])
    }

    fn options(&self) -> Result<GenerationOptions, String> {
        let mut options = match &self.settings {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
                serde_json::from_str::<GenerationOptions>(&text)
                    .map_err(|e| format!("{}: {e}", path.display()))?
            }
            None => GenerationOptions {
                seed: None,
                configs: self.configs()?,
                max_attempts: self.attempts,
                tie_break: self.tie_break,
            },
        };
        // Pick the seed here so it can be reported even if generation fails.
        options.seed = self
            .seed
            .or(options.seed)
            .or_else(|| Some(rand::thread_rng().gen()));
        Ok(options)
    }

    fn output_dir(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(default_output_dir)
    }
}

fn default_output_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("SeedForge")
}

/// Converts a 1-based `--player` number to an index.
fn player_index(player: usize) -> Result<usize, String> {
    player
        .checked_sub(1)
        .ok_or_else(|| "player numbers start at 1".to_string())
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn generate(gen: &GenArgs, plando_path: Option<PathBuf>) {
    let options = gen.options().unwrap_or_else(|e| fail(e));
    let settings = RunSettings {
        options,
        plando_path,
        input_path: gen.input.clone(),
        output_path: gen.output_dir(),
        debug: gen.debug,
    };
    match run(&settings) {
        Ok(out) => {
            println!("Seed {} (hash {:08X})", out.seed, out.hash);
            for file in &out.files {
                println!("  {}", file.display());
            }
        }
        Err(err) => fail(err),
    }
}

fn main() {
    let cli = Cli::parse();
    let debug = match &cli.command {
        Command::Generate { gen }
        | Command::Plando { gen, .. }
        | Command::Token { gen, .. }
        | Command::Stats { gen, .. } => gen.debug,
        _ => false,
    };
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Generate { gen } => generate(&gen, None),
        Command::Plando { plando, gen } => {
            // Surface a malformed map before any generation work.
            if let Err(err) = load_plando(&plando) {
                fail(format!("{}: {err}", plando.display()));
            }
            generate(&gen, Some(plando));
        }
        Command::Join {
            seed,
            blob,
            player,
            input,
            output,
        } => {
            let base = fs::read(&input).unwrap_or_else(|e| fail(format!("{}: {e}", input.display())));
            let local_player = player.map(|p| player_index(p).unwrap_or_else(|e| fail(e)));
            let details = MultiplayerDetails {
                config_blob: blob,
                local_player,
            };
            let mut generator = Generator::standard();
            let result = generator
                .generate_pre_seeded_rom(&GenerationOptions::default(), seed, &details, &base)
                .unwrap_or_else(|e| fail(e));
            let out_dir = output.unwrap_or_else(default_output_dir);
            if let Err(e) = fs::create_dir_all(&out_dir) {
                fail(e);
            }
            for rom in &result.roms {
                let path = out_dir.join(format!(
                    "SeedForge_{}_{:08X}_P{}.sfc",
                    result.seed.seed,
                    result.seed.hash,
                    rom.player + 1
                ));
                if let Err(e) = fs::write(&path, &rom.bytes) {
                    fail(e);
                }
                println!("{}", path.display());
            }
        }
        Command::Patch {
            seed_file,
            input,
            output,
            player,
        } => {
            let player = player_index(player).unwrap_or_else(|e| fail(e));
            let data = SeedData::load(&seed_file).unwrap_or_else(|e| fail(e));
            let base = fs::read(&input).unwrap_or_else(|e| fail(format!("{}: {e}", input.display())));
            let rom = generate_rom_bytes(&base, &data, player).unwrap_or_else(|e| fail(e));
            if let Err(e) = fs::write(&output, rom) {
                fail(e);
            }
            println!("Patched {} for {}", output.display(), data.player_label(player));
        }
        Command::ApplyIps {
            input,
            patch,
            output,
        } => {
            let base = fs::read(&input).unwrap_or_else(|e| fail(format!("{}: {e}", input.display())));
            let ips_bytes = fs::read(&patch).unwrap_or_else(|e| fail(format!("{}: {e}", patch.display())));
            let out = ips::apply_patch_bytes(&base, &ips_bytes).unwrap_or_else(|e| fail(e));
            if let Err(e) = fs::write(&output, out) {
                fail(e);
            }
        }
        Command::Token { decode, gen } => match decode {
            Some(blob) => {
                for (slot, parsed) in parse_config_blob(&blob).into_iter().enumerate() {
                    match parsed {
                        Ok(config) => println!("player {}: {config:?}", slot + 1),
                        Err(err) => println!("player {}: {err}", slot + 1),
                    }
                }
            }
            None => {
                let configs = gen.configs().unwrap_or_else(|e| fail(e));
                let blob = encode_config_blob(&configs).unwrap_or_else(|e| fail(e));
                println!("{blob}");
            }
        },
        Command::Stats {
            count,
            base_seed,
            timeout,
            json,
            gen,
        } => {
            let options = gen.options().unwrap_or_else(|e| fail(e));
            let handle = spawn_stats(StatRequest {
                options,
                base_seed,
                count,
            });
            let deadline = timeout.map(|s| std::time::Instant::now() + Duration::from_secs(s));
            loop {
                if let Some(deadline) = deadline {
                    if std::time::Instant::now() >= deadline {
                        handle.cancel();
                    }
                }
                match handle.events().recv_timeout(Duration::from_millis(250)) {
                    Ok(StatEvent::Progress { current, total }) => {
                        log::info!("{current}/{total}");
                    }
                    Ok(StatEvent::Completed { message }) => {
                        eprintln!("{message}");
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            match handle.join() {
                Ok(report) if json => match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(e) => fail(e),
                },
                Ok(report) => println!("{}", report.summary()),
                Err(_) => fail("stat worker panicked"),
            }
        }
    }
}
