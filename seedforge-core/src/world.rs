use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::items::{Half, ItemId, ItemType};
use crate::logic::Requirement;
use crate::progression::Progression;

/// Start of the item table the patched game reads location contents from.
/// Each location owns two bytes: item code, receiving player.
pub const ITEM_TABLE_BASE: u32 = 0x1C_8000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RewardKind {
    Pendant,
    Crystal,
    Boss,
}

impl RewardKind {
    pub fn item(self) -> ItemType {
        match self {
            RewardKind::Pendant => ItemType::Pendant,
            RewardKind::Crystal => ItemType::Crystal,
            RewardKind::Boss => ItemType::BossToken,
        }
    }
}

/// Attached to the few regions that award something when completed.
#[derive(Clone, Debug)]
pub struct RewardCapability {
    pub reward: RewardKind,
    pub complete: Requirement,
}

impl RewardCapability {
    pub fn reward_item(&self) -> ItemType {
        self.reward.item()
    }
}

/// Placement constraint a location imposes on the fill tie-break.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FillRule {
    Any,
    /// A progression item should land here before filler does.
    PreferProgression,
    /// Must receive this item type (owned by the same world).
    Forced(ItemType),
}

#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub half: Half,
    pub entry: Requirement,
    /// Indices into the owning world's `locations`.
    pub locations: Vec<usize>,
    pub reward: Option<RewardCapability>,
}

impl Region {
    pub fn can_enter(&self, progression: &Progression) -> bool {
        self.entry.is_satisfied(progression)
    }

    /// False for regions without a reward.
    pub fn can_complete(&self, progression: &Progression) -> bool {
        match &self.reward {
            Some(reward) => {
                self.can_enter(progression) && reward.complete.is_satisfied(progression)
            }
            None => false,
        }
    }

    pub fn reward_item(&self) -> Option<ItemType> {
        self.reward.as_ref().map(RewardCapability::reward_item)
    }
}

#[derive(Clone, Debug)]
pub struct Location {
    pub name: String,
    pub region: usize,
    /// Region entry rule combined with the location's own rule.
    pub access: Requirement,
    /// Offset of this location's entry in the target image.
    pub address: u32,
    pub fill_rule: FillRule,
    pub item: Option<ItemId>,
}

impl Location {
    pub fn is_available(&self, progression: &Progression) -> bool {
        self.access.is_satisfied(progression)
    }

    pub fn is_filled(&self) -> bool {
        self.item.is_some()
    }

    /// Locations with a rule of their own beyond plain region entry.
    pub fn is_constrained(&self) -> bool {
        !self.access.is_trivial() || self.fill_rule != FillRule::Any
    }
}

/// One player's graph. Items are referenced by arena index once the
/// coordinator takes ownership.
#[derive(Clone, Debug)]
pub struct World {
    pub player: usize,
    pub config: Config,
    pub regions: Vec<Region>,
    pub locations: Vec<Location>,
    /// Item types this world contributes to the shared pool.
    pub pool: Vec<ItemType>,
}

impl World {
    pub fn location_index(&self, name: &str) -> Option<usize> {
        self.locations
            .iter()
            .position(|loc| loc.name.eq_ignore_ascii_case(name))
    }

    pub fn region_of(&self, location: usize) -> &Region {
        &self.regions[self.locations[location].region]
    }

    pub fn reward_regions(&self) -> impl Iterator<Item = (usize, &Region)> {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, region)| region.reward.is_some())
    }

    pub fn is_in_reward_region(&self, location: usize) -> bool {
        self.region_of(location).reward.is_some()
    }
}

/// Builds the graph for one player. The standard game layout lives in
/// `layout.rs`; tests plug in tiny graphs.
pub trait Layout {
    fn build_world(&self, player: usize, config: &Config) -> World;
}

/// Incremental constructor used by layouts.
pub struct WorldBuilder {
    world: World,
    current_region: Option<usize>,
}

impl WorldBuilder {
    pub fn new(player: usize, config: &Config) -> Self {
        Self {
            world: World {
                player,
                config: config.clone(),
                regions: Vec::new(),
                locations: Vec::new(),
                pool: Vec::new(),
            },
            current_region: None,
        }
    }

    pub fn region(&mut self, name: &str, half: Half, entry: Requirement) -> &mut Self {
        self.world.regions.push(Region {
            name: name.to_string(),
            half,
            entry,
            locations: Vec::new(),
            reward: None,
        });
        self.current_region = Some(self.world.regions.len() - 1);
        self
    }

    /// Attaches a reward to the region most recently opened.
    pub fn reward(&mut self, reward: RewardKind, complete: Requirement) -> &mut Self {
        if let Some(idx) = self.current_region {
            self.world.regions[idx].reward = Some(RewardCapability { reward, complete });
        }
        self
    }

    pub fn location(&mut self, name: &str, requirement: Requirement) -> &mut Self {
        let address = ITEM_TABLE_BASE + 2 * self.world.locations.len() as u32;
        self.location_at(name, address, requirement, FillRule::Any)
    }

    pub fn location_with_rule(
        &mut self,
        name: &str,
        requirement: Requirement,
        rule: FillRule,
    ) -> &mut Self {
        let address = ITEM_TABLE_BASE + 2 * self.world.locations.len() as u32;
        self.location_at(name, address, requirement, rule)
    }

    pub fn location_at(
        &mut self,
        name: &str,
        address: u32,
        requirement: Requirement,
        rule: FillRule,
    ) -> &mut Self {
        let Some(region_idx) = self.current_region else {
            return self;
        };
        let entry = self.world.regions[region_idx].entry.clone();
        let loc_idx = self.world.locations.len();
        self.world.locations.push(Location {
            name: name.to_string(),
            region: region_idx,
            access: entry.and(requirement),
            address,
            fill_rule: rule,
            item: None,
        });
        self.world.regions[region_idx].locations.push(loc_idx);
        self
    }

    pub fn pool_item(&mut self, item: ItemType, copies: usize) -> &mut Self {
        for _ in 0..copies {
            self.world.pool.push(item);
        }
        self
    }

    /// Pads the pool with `filler` until it matches the location count.
    pub fn pad_pool(&mut self, filler: ItemType) -> &mut Self {
        while self.world.pool.len() < self.world.locations.len() {
            self.world.pool.push(filler);
        }
        self
    }

    pub fn build(self) -> World {
        self.world
    }
}
