use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::items::{Item, ItemId, ItemType};
use crate::progression::Progression;
use crate::world::{Layout, Location, World};

/// Addresses one location across all worlds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct LocationRef {
    pub world: usize,
    pub index: usize,
}

/// Something collected during a reachability sweep.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Collected {
    Location(LocationRef),
    /// A reward region completed in `world`.
    Reward { world: usize, region: usize, item: ItemType },
}

/// Result of a sweep: what each world ends up holding and what was reached.
#[derive(Clone, Debug)]
pub struct Reachability {
    pub progression: Vec<Progression>,
    pub reached: Vec<Vec<bool>>,
    /// Collection rounds; everything in round `n` was reachable with the
    /// items from rounds `0..n`.
    pub spheres: Vec<Vec<Collected>>,
}

impl Reachability {
    pub fn is_reached(&self, loc: LocationRef) -> bool {
        self.reached[loc.world][loc.index]
    }

    pub fn unreached(&self) -> impl Iterator<Item = LocationRef> + '_ {
        self.reached.iter().enumerate().flat_map(|(world, locs)| {
            locs.iter()
                .enumerate()
                .filter(|(_, reached)| !**reached)
                .map(move |(index, _)| LocationRef { world, index })
        })
    }

    pub fn all_reached(&self) -> bool {
        self.reached.iter().all(|locs| locs.iter().all(|r| *r))
    }
}

/// Owns every world and the shared item arena. Worlds only ever hold
/// arena indices, so an item placed in one world can belong to another.
#[derive(Clone, Debug)]
pub struct MultiWorld {
    pub worlds: Vec<World>,
    pub items: Vec<Item>,
}

impl MultiWorld {
    /// Takes ownership of each world's pool. Fails when a pool cannot fit
    /// into the locations its world offers.
    pub fn new(worlds: Vec<World>) -> Result<Self, String> {
        let mut items = Vec::new();
        for (idx, world) in worlds.iter().enumerate() {
            if world.player != idx {
                return Err(format!(
                    "world at position {idx} claims player {}",
                    world.player
                ));
            }
            if world.pool.len() != world.locations.len() {
                return Err(format!(
                    "player {idx} contributes {} items for {} locations",
                    world.pool.len(),
                    world.locations.len()
                ));
            }
            items.extend(world.pool.iter().map(|&t| Item::new(t, idx)));
        }
        if worlds.is_empty() {
            return Err("no worlds to generate".to_string());
        }
        Ok(Self { worlds, items })
    }

    pub fn build(layout: &dyn Layout, configs: &[Config]) -> Result<Self, String> {
        let worlds = configs
            .iter()
            .enumerate()
            .map(|(player, config)| layout.build_world(player, config))
            .collect();
        Self::new(worlds)
    }

    pub fn location(&self, loc: LocationRef) -> &Location {
        &self.worlds[loc.world].locations[loc.index]
    }

    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id]
    }

    /// Every location, world-major in declaration order.
    pub fn location_refs(&self) -> impl Iterator<Item = LocationRef> + '_ {
        self.worlds.iter().enumerate().flat_map(|(world, w)| {
            (0..w.locations.len()).map(move |index| LocationRef { world, index })
        })
    }

    pub fn total_locations(&self) -> usize {
        self.worlds.iter().map(|w| w.locations.len()).sum()
    }

    pub fn unfilled(&self) -> Vec<LocationRef> {
        self.location_refs()
            .filter(|&r| !self.location(r).is_filled())
            .collect()
    }

    /// Arena items not sitting in any location.
    pub fn unplaced_items(&self) -> Vec<ItemId> {
        let mut placed = vec![false; self.items.len()];
        for world in &self.worlds {
            for loc in &world.locations {
                if let Some(id) = loc.item {
                    placed[id] = true;
                }
            }
        }
        (0..self.items.len()).filter(|&id| !placed[id]).collect()
    }

    pub fn place(&mut self, loc: LocationRef, item: ItemId) {
        log::trace!(
            "placing {} (player {}) at {} in world {}",
            self.items[item].item_type,
            self.items[item].owner,
            self.worlds[loc.world].locations[loc.index].name,
            loc.world
        );
        self.worlds[loc.world].locations[loc.index].item = Some(item);
    }

    pub fn clear_placements(&mut self) {
        for world in &mut self.worlds {
            for loc in &mut world.locations {
                loc.item = None;
            }
        }
    }

    /// Fixed-point reachability from `base`, one progression per world.
    ///
    /// A location is reached when its world's progression satisfies its
    /// rule; its item is then credited to the item's owner. Completing a
    /// reward region credits the reward to the region's own world.
    pub fn sweep(&self, base: &[Progression]) -> Reachability {
        let mut progression: Vec<Progression> = self
            .worlds
            .iter()
            .enumerate()
            .map(|(idx, _)| base.get(idx).map(Progression::snapshot).unwrap_or_default())
            .collect();
        let mut reached: Vec<Vec<bool>> = self
            .worlds
            .iter()
            .map(|w| vec![false; w.locations.len()])
            .collect();
        let mut rewarded: Vec<Vec<bool>> = self
            .worlds
            .iter()
            .map(|w| vec![false; w.regions.len()])
            .collect();
        let mut spheres = Vec::new();

        loop {
            let mut round = Vec::new();
            for (w, world) in self.worlds.iter().enumerate() {
                for (i, loc) in world.locations.iter().enumerate() {
                    if !reached[w][i] && loc.is_available(&progression[w]) {
                        round.push(Collected::Location(LocationRef { world: w, index: i }));
                    }
                }
                for (r, region) in world.reward_regions() {
                    if !rewarded[w][r] && region.can_complete(&progression[w]) {
                        if let Some(item) = region.reward_item() {
                            round.push(Collected::Reward { world: w, region: r, item });
                        }
                    }
                }
            }
            if round.is_empty() {
                break;
            }
            for collected in &round {
                match *collected {
                    Collected::Location(loc) => {
                        reached[loc.world][loc.index] = true;
                        if let Some(id) = self.location(loc).item {
                            let item = &self.items[id];
                            progression[item.owner].add(item.item_type);
                        }
                    }
                    Collected::Reward { world, region, item } => {
                        rewarded[world][region] = true;
                        progression[world].add(item);
                    }
                }
            }
            spheres.push(round);
        }

        Reachability {
            progression,
            reached,
            spheres,
        }
    }

    /// Sweep from nothing: what a fresh set of players can actually reach.
    pub fn sweep_from_start(&self) -> Reachability {
        self.sweep(&vec![Progression::new(); self.worlds.len()])
    }

    /// Progression spheres in readable form, progression items only.
    pub fn playthrough(&self, reach: &Reachability) -> Vec<Vec<PlaythroughEntry>> {
        reach
            .spheres
            .iter()
            .map(|round| {
                round
                    .iter()
                    .filter_map(|c| match *c {
                        Collected::Location(loc) => {
                            let id = self.location(loc).item?;
                            let item = &self.items[id];
                            item.item_type.is_progression().then(|| PlaythroughEntry {
                                world: loc.world,
                                location: self.location(loc).name.clone(),
                                item: item.item_type,
                                owner: item.owner,
                            })
                        }
                        Collected::Reward { world, region, item } => Some(PlaythroughEntry {
                            world,
                            location: self.worlds[world].regions[region].name.clone(),
                            item,
                            owner: world,
                        }),
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|round| !round.is_empty())
            .collect()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlaythroughEntry {
    pub world: usize,
    pub location: String,
    pub item: ItemType,
    pub owner: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Half;
    use crate::logic::{has, Requirement};
    use crate::world::{RewardKind, WorldBuilder};

    struct KeyRoom;

    impl Layout for KeyRoom {
        fn build_world(&self, player: usize, config: &Config) -> World {
            let mut b = WorldBuilder::new(player, config);
            b.region("Hall", Half::Kingdom, Requirement::Always)
                .location("Open", Requirement::Always)
                .location("Locked", has(ItemType::Hammer));
            b.region("Vault", Half::Kingdom, has(ItemType::Hammer))
                .reward(RewardKind::Crystal, Requirement::Always);
            b.pool_item(ItemType::Hammer, 1).pad_pool(ItemType::Arrows);
            b.build()
        }
    }

    fn two_worlds() -> MultiWorld {
        MultiWorld::build(&KeyRoom, &[Config::default(), Config::default()]).unwrap()
    }

    #[test]
    fn arena_takes_every_pool() {
        let mw = two_worlds();
        assert_eq!(mw.items.len(), 4);
        assert_eq!(mw.total_locations(), 4);
        assert_eq!(mw.unplaced_items().len(), 4);
        assert_eq!(mw.items[2].owner, 1);
    }

    #[test]
    fn cross_world_item_unlocks_owner() {
        let mut mw = two_worlds();
        // World 0's open chest holds world 1's hammer.
        let hammer_1 = 2;
        mw.place(LocationRef { world: 0, index: 0 }, hammer_1);
        let reach = mw.sweep_from_start();
        assert!(reach.is_reached(LocationRef { world: 1, index: 1 }));
        assert!(!reach.is_reached(LocationRef { world: 0, index: 1 }));
        assert!(reach.progression[1].contains(ItemType::Crystal));
        assert!(!reach.progression[0].contains(ItemType::Crystal));
    }

    #[test]
    fn spheres_are_ordered() {
        let mut mw = two_worlds();
        mw.place(LocationRef { world: 0, index: 0 }, 0);
        let reach = mw.sweep_from_start();
        assert!(reach.spheres[0].contains(&Collected::Location(LocationRef { world: 0, index: 0 })));
        assert!(reach.spheres[1].contains(&Collected::Location(LocationRef { world: 0, index: 1 })));
        let playthrough = mw.playthrough(&reach);
        assert_eq!(playthrough[0][0].item, ItemType::Hammer);
        assert_eq!(playthrough[1][0].item, ItemType::Crystal);
    }

    #[test]
    fn rejects_mismatched_pool() {
        let mut world = KeyRoom.build_world(0, &Config::default());
        world.pool.push(ItemType::Arrows);
        assert!(MultiWorld::new(vec![world]).is_err());
        assert!(MultiWorld::new(Vec::new()).is_err());
    }
}
