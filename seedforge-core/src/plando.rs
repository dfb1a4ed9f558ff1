use serde::{Deserialize, Serialize};

use crate::items::ItemType;
use crate::multiworld::{LocationRef, MultiWorld};

/// A hand-written placement: `item` (belonging to `owner`, default the
/// same world) goes into `location` of `world`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlandoPlacement {
    #[serde(default)]
    pub world: usize,
    pub location: String,
    pub item: String,
    #[serde(default)]
    pub owner: Option<usize>,
}

/// Explicit item map. Locations it doesn't mention are filled normally.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlandoConfig {
    pub placements: Vec<PlandoPlacement>,
}

impl PlandoConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Locks every placement into `mw`, taking the items out of the
    /// unplaced pool.
    pub fn apply(&self, mw: &mut MultiWorld) -> Result<(), String> {
        let mut unplaced = mw.unplaced_items();

        for p in &self.placements {
            let world = mw
                .worlds
                .get(p.world)
                .ok_or_else(|| format!("plando names world {} but only {} exist", p.world, mw.worlds.len()))?;
            let index = world
                .location_index(&p.location)
                .ok_or_else(|| format!("unknown location '{}' in world {}", p.location, p.world))?;
            let loc = LocationRef {
                world: p.world,
                index,
            };
            if mw.location(loc).is_filled() {
                return Err(format!("location '{}' is placed twice", p.location));
            }
            let item_type = ItemType::from_name(&p.item)
                .ok_or_else(|| format!("unknown item '{}'", p.item))?;
            let owner = p.owner.unwrap_or(p.world);
            let pos = unplaced
                .iter()
                .position(|&id| {
                    let item = mw.item(id);
                    item.item_type == item_type && item.owner == owner
                })
                .ok_or_else(|| {
                    format!("player {owner}'s pool has no {item_type} left for '{}'", p.location)
                })?;
            let id = unplaced.remove(pos);
            mw.place(loc, id);
        }
        Ok(())
    }
}
