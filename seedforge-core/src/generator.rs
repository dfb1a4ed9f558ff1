use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::{parse_config_blob_strict, Config, GameMode};
use crate::fill::{self, TieBreak};
use crate::ips;
use crate::layout::StandardLayout;
use crate::multiworld::MultiWorld;
use crate::patch::{self, MAX_PLAYERS};
use crate::plando::PlandoConfig;
use crate::progression::Progression;
use crate::seed::{seed_hash, SeedData};
use crate::world::Layout;
use crate::{Result, SeedError};

pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Mixed into the seed for each fill attempt so retries explore new orders.
const ATTEMPT_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Random when unset.
    pub seed: Option<u64>,
    /// One per player.
    pub configs: Vec<Config>,
    pub max_attempts: usize,
    pub tie_break: TieBreak,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            seed: None,
            configs: vec![Config::default()],
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            tie_break: TieBreak::default(),
        }
    }
}

impl GenerationOptions {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// A shared multiworld blob plus which player this machine is patching
/// for. `None` patches every player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplayerDetails {
    pub config_blob: String,
    pub local_player: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerRom {
    pub player: usize,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedRomResult {
    pub seed: SeedData,
    pub roms: Vec<PlayerRom>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GenerationStage {
    Idle,
    Validating,
    Placing,
    Verifying,
    Patching,
    Complete,
    Failed,
}

impl GenerationStage {
    fn can_move_to(self, next: GenerationStage) -> bool {
        use GenerationStage::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Placing)
                | (Placing, Verifying)
                | (Placing, Placing)
                | (Verifying, Placing)
                | (Verifying, Patching)
                | (Patching, Complete)
                | (Complete, Validating)
                | (Failed, Validating)
                | (_, Failed)
        )
    }
}

/// Drives a request from validation to patched output. One generator can
/// run many requests; each starts again from `Validating`.
pub struct Generator<'a> {
    layout: &'a dyn Layout,
    stage: GenerationStage,
    history: Vec<GenerationStage>,
    attempts: usize,
}

impl Generator<'static> {
    pub fn standard() -> Self {
        Generator::new(&StandardLayout)
    }
}

impl<'a> Generator<'a> {
    pub fn new(layout: &'a dyn Layout) -> Self {
        Self {
            layout,
            stage: GenerationStage::Idle,
            history: vec![GenerationStage::Idle],
            attempts: 0,
        }
    }

    pub fn stage(&self) -> GenerationStage {
        self.stage
    }

    /// Every stage entered so far, in order.
    pub fn history(&self) -> &[GenerationStage] {
        &self.history
    }

    /// Fill attempts made by the latest request.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    fn enter(&mut self, next: GenerationStage) {
        debug_assert!(
            self.stage.can_move_to(next),
            "illegal transition {:?} -> {:?}",
            self.stage,
            next
        );
        log::debug!("generation stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
        self.history.push(next);
    }

    fn fail<T>(&mut self, err: SeedError) -> Result<T> {
        log::warn!("generation failed: {err}");
        self.enter(GenerationStage::Failed);
        Err(err)
    }

    /// Placement only, no patching.
    pub fn generate_seed(&mut self, options: &GenerationOptions) -> Result<SeedData> {
        self.run(options, None)
    }

    pub fn generate_plando_seed(
        &mut self,
        options: &GenerationOptions,
        plando: &PlandoConfig,
    ) -> Result<SeedData> {
        self.run(options, Some(plando))
    }

    pub fn generate_random_rom(
        &mut self,
        options: &GenerationOptions,
        base: &[u8],
    ) -> Result<GeneratedRomResult> {
        let seed = self.run(options, None)?;
        self.patch_all(seed, base, None)
    }

    pub fn generate_plando_rom(
        &mut self,
        options: &GenerationOptions,
        plando: &PlandoConfig,
        base: &[u8],
    ) -> Result<GeneratedRomResult> {
        let seed = self.run(options, Some(plando))?;
        self.patch_all(seed, base, None)
    }

    /// Regenerates a shared multiworld from its seed and config blob. Every
    /// participant running this gets the same placement.
    pub fn generate_pre_seeded_rom(
        &mut self,
        options: &GenerationOptions,
        seed: u64,
        details: &MultiplayerDetails,
        base: &[u8],
    ) -> Result<GeneratedRomResult> {
        let configs = match parse_config_blob_strict(&details.config_blob) {
            Ok(configs) => configs,
            Err(err) => {
                self.enter(GenerationStage::Validating);
                return self.fail(err.into());
            }
        };
        if let Some(local) = details.local_player {
            if local >= configs.len() {
                self.enter(GenerationStage::Validating);
                return self.fail(SeedError::Validation(format!(
                    "local player {local} is not among the {} players",
                    configs.len()
                )));
            }
        }
        let options = GenerationOptions {
            seed: Some(seed),
            configs,
            ..options.clone()
        };
        let data = self.run(&options, None)?;
        self.patch_all(data, base, details.local_player)
    }

    fn run(&mut self, options: &GenerationOptions, plando: Option<&PlandoConfig>) -> Result<SeedData> {
        self.attempts = 0;
        self.enter(GenerationStage::Validating);

        if let Err(err) = validate_options(options) {
            return self.fail(err);
        }
        // Building once up front turns a broken pool or plando into a
        // validation error instead of a run of failed attempts.
        let dry_run = MultiWorld::build(self.layout, &options.configs).and_then(|mut mw| {
            if let Some(plando) = plando {
                plando.apply(&mut mw)?;
                check_plando_completable(&mw)?;
            }
            Ok(mw)
        });
        if let Err(msg) = dry_run {
            return self.fail(SeedError::Validation(msg));
        }

        let seed = options.seed.unwrap_or_else(|| rand::thread_rng().gen());
        log::info!(
            "generating seed {seed} for {} player(s), up to {} attempt(s)",
            options.configs.len(),
            options.max_attempts
        );

        for attempt in 0..options.max_attempts {
            self.enter(GenerationStage::Placing);
            self.attempts = attempt + 1;

            let mut mw = match MultiWorld::build(self.layout, &options.configs) {
                Ok(mw) => mw,
                Err(msg) => return self.fail(SeedError::Validation(msg)),
            };
            if let Some(plando) = plando {
                if let Err(msg) = plando.apply(&mut mw) {
                    return self.fail(SeedError::Validation(msg));
                }
            }

            let mut rng = StdRng::seed_from_u64(attempt_seed(seed, attempt));
            if let Err(err) = fill::fill(&mut mw, &mut rng, options.tie_break) {
                log::info!("attempt {} failed during placement: {err}", attempt + 1);
                continue;
            }

            self.enter(GenerationStage::Verifying);
            let reach = match fill::verify(&mw) {
                Ok(reach) => reach,
                Err(err) => {
                    log::info!("attempt {} failed verification: {err}", attempt + 1);
                    continue;
                }
            };

            self.enter(GenerationStage::Patching);
            let hash = seed_hash(seed, &options.configs);
            let patches = (0..mw.worlds.len())
                .map(|player| patch::world_patches(&mw, player, hash))
                .collect();
            let playthrough = mw.playthrough(&reach);
            let data = SeedData::from_multiworld(seed, self.attempts, &mw, playthrough, patches);
            log::info!(
                "seed {seed} placed after {} attempt(s), {} sphere(s)",
                self.attempts,
                data.playthrough.len()
            );
            self.enter(GenerationStage::Complete);
            return Ok(data);
        }

        self.fail(SeedError::GenerationFailure {
            attempts: options.max_attempts,
        })
    }

    fn patch_all(
        &mut self,
        data: SeedData,
        base: &[u8],
        only: Option<usize>,
    ) -> Result<GeneratedRomResult> {
        let players: Vec<usize> = match only {
            Some(p) => vec![p],
            None => (0..data.worlds.len()).collect(),
        };
        let mut roms = Vec::with_capacity(players.len());
        for player in players {
            match generate_rom_bytes(base, &data, player) {
                Ok(bytes) => roms.push(PlayerRom { player, bytes }),
                Err(err) => return self.fail(err),
            }
        }
        Ok(GeneratedRomResult { seed: data, roms })
    }
}

/// Fails when the locked placements leave some location unreachable even
/// with every unplaced item already collected.
fn check_plando_completable(mw: &MultiWorld) -> std::result::Result<(), String> {
    let mut base = vec![Progression::new(); mw.worlds.len()];
    for id in mw.unplaced_items() {
        let item = mw.item(id);
        base[item.owner].add(item.item_type);
    }
    let reach = mw.sweep(&base);
    let first = reach.unreached().next();
    match first {
        Some(loc) => Err(format!(
            "plando leaves {} (player {}) unreachable",
            mw.location(loc).name,
            loc.world + 1
        )),
        None => Ok(()),
    }
}

/// RNG seed for a given attempt; attempt 0 uses `seed` as is.
pub fn attempt_seed(seed: u64, attempt: usize) -> u64 {
    seed ^ (attempt as u64).wrapping_mul(ATTEMPT_SALT)
}

/// Checks a request before any placement work.
pub fn validate_options(options: &GenerationOptions) -> Result<()> {
    if options.configs.is_empty() {
        return Err(SeedError::Validation("at least one player is required".to_string()));
    }
    if options.configs.len() > MAX_PLAYERS {
        return Err(SeedError::Validation(format!(
            "{} players requested, at most {MAX_PLAYERS} are supported",
            options.configs.len()
        )));
    }
    if options.max_attempts == 0 {
        return Err(SeedError::Validation("max_attempts must be at least 1".to_string()));
    }

    for (idx, config) in options.configs.iter().enumerate() {
        config
            .validate()
            .map_err(|msg| SeedError::Validation(format!("player {}: {msg}", idx + 1)))?;
    }

    if options.configs.len() > 1 {
        let mut names = HashSet::new();
        for (idx, config) in options.configs.iter().enumerate() {
            if config.mode != GameMode::Multiworld {
                return Err(SeedError::Validation(format!(
                    "player {} must use multiworld mode in a {}-player game",
                    idx + 1,
                    options.configs.len()
                )));
            }
            if !names.insert(config.player_name.to_ascii_lowercase()) {
                return Err(SeedError::Validation(format!(
                    "player name '{}' is used twice",
                    config.player_name
                )));
            }
        }
    }
    Ok(())
}

/// Patches `base` for one player: static resources for that player's
/// config, then the seed's own patches on top.
pub fn generate_rom_bytes(base: &[u8], seed: &SeedData, player: usize) -> Result<Vec<u8>> {
    let config = seed.configs.get(player).ok_or_else(|| {
        SeedError::Validation(format!("seed has no player {}", player + 1))
    })?;
    let dynamic = seed.patches.get(player).ok_or_else(|| {
        SeedError::Validation(format!("seed has no patches for player {}", player + 1))
    })?;
    let statics = patch::static_patches(config)?;
    Ok(ips::apply(base, &ips::compose(&statics, dynamic)))
}

/// Same as [`generate_rom_bytes`] as a single IPS file, for players who
/// patch with their own tools.
pub fn generate_ips(seed: &SeedData, player: usize) -> Result<Vec<u8>> {
    let config = seed.configs.get(player).ok_or_else(|| {
        SeedError::Validation(format!("seed has no player {}", player + 1))
    })?;
    let dynamic = seed.patches.get(player).map(Vec::as_slice).unwrap_or(&[]);
    let statics = patch::static_patches(config)?;
    Ok(ips::encode(&ips::compose(&statics, dynamic))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Goal;

    #[test]
    fn attempt_zero_keeps_seed() {
        assert_eq!(attempt_seed(1234, 0), 1234);
        assert_ne!(attempt_seed(1234, 1), attempt_seed(1234, 2));
    }

    #[test]
    fn validation_rules() {
        let ok = GenerationOptions::with_seed(1);
        assert!(validate_options(&ok).is_ok());

        let no_players = GenerationOptions {
            configs: Vec::new(),
            ..ok.clone()
        };
        assert!(matches!(validate_options(&no_players), Err(SeedError::Validation(_))));

        let zero_attempts = GenerationOptions {
            max_attempts: 0,
            ..ok.clone()
        };
        assert!(validate_options(&zero_attempts).is_err());

        let mixed = GenerationOptions {
            configs: vec![Config::multiworld("A"), Config::default()],
            ..ok.clone()
        };
        assert!(validate_options(&mixed).is_err());

        let duplicate = GenerationOptions {
            configs: vec![Config::multiworld("Ann"), Config::multiworld("ANN")],
            ..ok.clone()
        };
        assert!(validate_options(&duplicate).is_err());

        let bad_goal = GenerationOptions {
            configs: vec![Config {
                goal: Goal::DefeatBoth,
                crystals_required: 2,
                ..Config::default()
            }],
            ..ok
        };
        assert!(validate_options(&bad_goal).is_err());
    }

    #[test]
    fn stages_follow_the_happy_path() {
        let mut gen = Generator::standard();
        gen.generate_seed(&GenerationOptions::with_seed(11)).unwrap();
        let h = gen.history();
        assert_eq!(h.first(), Some(&GenerationStage::Idle));
        assert_eq!(h[1], GenerationStage::Validating);
        assert_eq!(h.last(), Some(&GenerationStage::Complete));
        assert!(h.contains(&GenerationStage::Patching));
        for pair in h.windows(2) {
            assert!(pair[0].can_move_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn invalid_request_ends_failed() {
        let mut gen = Generator::standard();
        let err = gen
            .generate_seed(&GenerationOptions {
                max_attempts: 0,
                ..GenerationOptions::with_seed(3)
            })
            .unwrap_err();
        assert!(matches!(err, SeedError::Validation(_)));
        assert_eq!(gen.stage(), GenerationStage::Failed);
        assert_eq!(gen.attempts(), 0);
    }

    #[test]
    fn pre_seeded_rejects_bad_blob() {
        let mut gen = Generator::standard();
        let details = MultiplayerDetails {
            config_blob: "9zzz".to_string(),
            local_player: None,
        };
        let err = gen
            .generate_pre_seeded_rom(&GenerationOptions::default(), 5, &details, &[0; 16])
            .unwrap_err();
        assert!(matches!(err, SeedError::ConfigParse(_)));
    }
}
