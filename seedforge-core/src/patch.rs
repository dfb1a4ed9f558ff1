use crate::config::{Config, GameMode, Goal};
use crate::ips::{self, GeneratedPatch, PatchError};
use crate::multiworld::MultiWorld;

/// Base game changes every seed needs: the award hook and a blank item table.
static BASE_PATCH: &[u8] = include_bytes!("../resources/base.ips");
/// Cross-player item delivery and the name table it reads.
static MULTIWORLD_PATCH: &[u8] = include_bytes!("../resources/multiworld.ips");

pub const ROM_TITLE_ADDR: u32 = 0x00_7FC0;
pub const ROM_TITLE_LEN: usize = 21;
pub const PLAYER_NAME_TABLE: u32 = 0x1C_6000;
pub const PLAYER_NAME_LEN: usize = 16;
/// Player index, player count, goal, crystals required.
pub const SEED_INFO_ADDR: u32 = 0x1C_7F00;
pub const HEART_COLOR_ADDR: u32 = 0x1C_7F10;
pub const LOW_HEALTH_BEEP_ADDR: u32 = 0x1C_7F11;
/// The name table holds this many entries and owners are one byte.
pub const MAX_PLAYERS: usize = 16;

/// Static resources for `config`, decoded in application order.
pub fn static_patches(config: &Config) -> Result<Vec<GeneratedPatch>, PatchError> {
    let mut patches = ips::decode(BASE_PATCH)?;
    if config.mode == GameMode::Multiworld {
        patches.extend(ips::decode(MULTIWORLD_PATCH)?);
    }
    Ok(patches)
}

pub fn rom_title(hash: u32) -> [u8; ROM_TITLE_LEN] {
    let mut title = [b' '; ROM_TITLE_LEN];
    let text = format!("SEEDFORGE {hash:08X}");
    title[..text.len()].copy_from_slice(text.as_bytes());
    title
}

fn name_entry(name: &str) -> [u8; PLAYER_NAME_LEN] {
    let mut entry = [b' '; PLAYER_NAME_LEN];
    for (slot, ch) in entry.iter_mut().zip(name.chars()) {
        *slot = if ch.is_ascii_graphic() || ch == ' ' {
            ch as u8
        } else {
            b'?'
        };
    }
    entry
}

/// Per-seed writes for `player`'s image: its item table, seed info,
/// cosmetics, the title, and every player's name in multiworld games.
pub fn world_patches(mw: &MultiWorld, player: usize, hash: u32) -> Vec<GeneratedPatch> {
    let world = &mw.worlds[player];
    let config = &world.config;
    let mut patches = Vec::with_capacity(world.locations.len() + 8);

    for loc in &world.locations {
        // Unfilled locations keep the table default from the base patch.
        if let Some(id) = loc.item {
            let item = mw.item(id);
            patches.push(GeneratedPatch::new(
                loc.address,
                vec![item.item_type.code(), item.owner as u8],
            ));
        }
    }

    let goal = match config.goal {
        Goal::DefeatBoth => 0,
        Goal::Crystals => 1,
    };
    patches.push(GeneratedPatch::new(
        SEED_INFO_ADDR,
        vec![player as u8, mw.worlds.len() as u8, goal, config.crystals_required],
    ));
    patches.push(GeneratedPatch::new(
        HEART_COLOR_ADDR,
        vec![config.heart_color.palette_byte()],
    ));
    patches.push(GeneratedPatch::new(
        LOW_HEALTH_BEEP_ADDR,
        vec![config.low_health_beep.frames()],
    ));

    if config.mode == GameMode::Multiworld {
        let mut table = Vec::with_capacity(mw.worlds.len() * PLAYER_NAME_LEN);
        for other in &mw.worlds {
            table.extend_from_slice(&name_entry(&other.config.player_name));
        }
        patches.push(GeneratedPatch::new(PLAYER_NAME_TABLE, table));
    }

    patches.push(GeneratedPatch::new(ROM_TITLE_ADDR, rom_title(hash).to_vec()));
    patches
}
