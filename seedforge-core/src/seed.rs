use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::config::Config;
use crate::ips::GeneratedPatch;
use crate::items::ItemType;
use crate::multiworld::{MultiWorld, PlaythroughEntry};
use crate::{Result, SeedError};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(hash, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

/// Short identifier shown in the game title. Changes with the seed and
/// with any player's options.
pub fn seed_hash(seed: u64, configs: &[Config]) -> u32 {
    let mut h = fnv1a(FNV_OFFSET, &seed.to_le_bytes());
    for config in configs {
        let token = config.to_token().unwrap_or_else(|_| format!("{config:?}"));
        h = fnv1a(h, token.as_bytes());
        h = fnv1a(h, &[b'~']);
    }
    (h ^ (h >> 32)) as u32
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub location: String,
    pub address: u32,
    pub item: ItemType,
    pub owner: usize,
}

/// One filled world in exportable form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldPlacement {
    pub player: usize,
    pub player_name: String,
    pub locations: Vec<PlacedItem>,
}

/// Everything a generation produced. Patching an image needs only this and
/// the base image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    pub seed: u64,
    pub hash: u32,
    /// Fill attempts used, including the one that succeeded.
    pub attempts: usize,
    pub configs: Vec<Config>,
    pub worlds: Vec<WorldPlacement>,
    pub playthrough: Vec<Vec<PlaythroughEntry>>,
    /// Per-seed patches, one list per player. Static resources are added
    /// at patch time from each player's config.
    pub patches: Vec<Vec<GeneratedPatch>>,
}

impl SeedData {
    pub fn from_multiworld(
        seed: u64,
        attempts: usize,
        mw: &MultiWorld,
        playthrough: Vec<Vec<PlaythroughEntry>>,
        patches: Vec<Vec<GeneratedPatch>>,
    ) -> Self {
        let configs: Vec<Config> = mw.worlds.iter().map(|w| w.config.clone()).collect();
        let worlds = mw
            .worlds
            .iter()
            .map(|world| WorldPlacement {
                player: world.player,
                player_name: world.config.player_name.clone(),
                locations: world
                    .locations
                    .iter()
                    .filter_map(|loc| {
                        let item = mw.item(loc.item?);
                        Some(PlacedItem {
                            location: loc.name.clone(),
                            address: loc.address,
                            item: item.item_type,
                            owner: item.owner,
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            seed,
            hash: seed_hash(seed, &configs),
            attempts,
            configs,
            worlds,
            playthrough,
            patches,
        }
    }

    pub fn player_label(&self, player: usize) -> String {
        match self.worlds.get(player) {
            Some(w) if !w.player_name.is_empty() => w.player_name.clone(),
            _ => format!("Player {}", player + 1),
        }
    }

    /// Human-readable placement and playthrough listing.
    pub fn spoiler_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SeedForge spoiler log");
        let _ = writeln!(out, "Seed: {} (hash {:08X})", self.seed, self.hash);
        let _ = writeln!(out, "Attempts: {}", self.attempts);
        for (idx, config) in self.configs.iter().enumerate() {
            let token = config.to_token().unwrap_or_else(|e| e.to_string());
            let _ = writeln!(out, "{}: {}", self.player_label(idx), token);
        }

        let _ = writeln!(out, "\n== Playthrough ==");
        for (n, sphere) in self.playthrough.iter().enumerate() {
            let _ = writeln!(out, "Sphere {}", n + 1);
            for e in sphere {
                let _ = writeln!(
                    out,
                    "  [{}] {} -> {} ({})",
                    self.player_label(e.world),
                    e.location,
                    e.item,
                    self.player_label(e.owner)
                );
            }
        }

        for world in &self.worlds {
            let _ = writeln!(out, "\n== {} ==", self.player_label(world.player));
            for placed in &world.locations {
                let _ = writeln!(
                    out,
                    "  {:<40} {} ({})",
                    placed.location,
                    placed.item,
                    self.player_label(placed.owner)
                );
            }
        }
        out
    }

    /// Gzipped JSON, for sharing a seed without the base image.
    pub fn to_compressed(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }

    pub fn from_compressed(bytes: &[u8]) -> Result<Self> {
        let mut decoder = GzDecoder::new(bytes);
        let mut json = Vec::new();
        decoder.read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_compressed()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_compressed(&bytes).map_err(|e| match e {
            SeedError::Io(err) => SeedError::Io(std::io::Error::new(
                err.kind(),
                format!("{}: {err}", path.display()),
            )),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SeedData {
        SeedData {
            seed: 42,
            hash: seed_hash(42, &[Config::default()]),
            attempts: 1,
            configs: vec![Config::default()],
            worlds: vec![WorldPlacement {
                player: 0,
                player_name: String::new(),
                locations: vec![PlacedItem {
                    location: "Cottage Chest".to_string(),
                    address: 0x1C_8000,
                    item: ItemType::Sword,
                    owner: 0,
                }],
            }],
            playthrough: vec![vec![PlaythroughEntry {
                world: 0,
                location: "Cottage Chest".to_string(),
                item: ItemType::Sword,
                owner: 0,
            }]],
            patches: vec![vec![GeneratedPatch::new(0x1C_8000, vec![0x5E, 0])]],
        }
    }

    #[test]
    fn hash_depends_on_seed_and_options() {
        let base = seed_hash(1, &[Config::default()]);
        assert_eq!(base, seed_hash(1, &[Config::default()]));
        assert_ne!(base, seed_hash(2, &[Config::default()]));
        assert_ne!(base, seed_hash(1, &[Config::multiworld("Ann")]));
    }

    #[test]
    fn compressed_export_restores() {
        let data = sample();
        let bytes = data.to_compressed().unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert_eq!(SeedData::from_compressed(&bytes).unwrap(), data);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(SeedData::from_compressed(b"not gzip").is_err());
    }

    #[test]
    fn spoiler_lists_spheres() {
        let text = sample().spoiler_text();
        assert!(text.contains("Sphere 1"));
        assert!(text.contains("[Player 1] Cottage Chest -> Progressive Sword (Player 1)"));
    }
}
