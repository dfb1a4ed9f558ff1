use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::items::{ItemId, ItemType};
use crate::multiworld::{LocationRef, MultiWorld, Reachability};
use crate::progression::Progression;
use crate::world::FillRule;

/// How fill chooses among several reachable empty locations.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TieBreak {
    /// Reward guardians first, then locations with rules of their own,
    /// then uniformly at random.
    #[default]
    Prioritized,
    Uniform,
    /// First in arena order. Deterministic regardless of RNG.
    Ordered,
}

impl TieBreak {
    pub const ALL: [TieBreak; 3] = [TieBreak::Prioritized, TieBreak::Uniform, TieBreak::Ordered];

    pub fn as_str(self) -> &'static str {
        match self {
            TieBreak::Prioritized => "prioritized",
            TieBreak::Uniform => "uniform",
            TieBreak::Ordered => "ordered",
        }
    }
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TieBreak::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tie-break policy: {s}"))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FillError {
    #[error("no location can take {item} for player {owner}, even assuming the rest of the pool")]
    Deadlock { item: ItemType, owner: usize },
    #[error("{count} location(s) unreachable after fill, first: {first}")]
    Unreachable { count: usize, first: String },
    #[error("{location} must hold {item} but player {player} has none left")]
    ForcedItemMissing {
        location: String,
        item: ItemType,
        player: usize,
    },
    #[error("{items} unplaced item(s) for {locations} empty location(s)")]
    PoolMismatch { items: usize, locations: usize },
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FillReport {
    pub progression_placed: usize,
    pub filler_placed: usize,
    /// Placements that needed the assumed-fill fallback.
    pub assumed_placements: usize,
}

/// Places every unplaced arena item into an empty location.
///
/// Progression goes first, forward from what is currently reachable; when
/// nothing reachable is empty the item goes wherever the rest of the
/// unplaced progression would let a player reach. Filler takes what is
/// left. The caller verifies the result with [`verify`].
pub fn fill<R: Rng>(
    mw: &mut MultiWorld,
    rng: &mut R,
    policy: TieBreak,
) -> Result<FillReport, FillError> {
    let mut pool = mw.unplaced_items();
    let empty = mw.unfilled();
    if pool.len() != empty.len() {
        return Err(FillError::PoolMismatch {
            items: pool.len(),
            locations: empty.len(),
        });
    }

    place_forced(mw, &mut pool, &empty)?;

    let (mut progression, mut filler): (Vec<ItemId>, Vec<ItemId>) = pool
        .into_iter()
        .partition(|&id| mw.item(id).item_type.is_progression());
    progression.shuffle(rng);
    filler.shuffle(rng);

    let mut report = FillReport::default();

    while !progression.is_empty() {
        let reach = mw.sweep_from_start();
        let frontier = empty_reached(mw, &reach);

        if !frontier.is_empty() {
            let loc = choose_location(mw, &frontier, rng, policy);
            let pick = if frontier.len() == 1 {
                expanding_item(mw, &progression, &reach).unwrap_or(0)
            } else {
                0
            };
            let item = progression.remove(pick);
            mw.place(loc, item);
        } else {
            let item = progression.remove(0);
            let mut base = vec![Progression::new(); mw.worlds.len()];
            for &id in &progression {
                let it = mw.item(id);
                base[it.owner].add(it.item_type);
            }
            let assumed = mw.sweep(&base);
            let candidates = empty_reached(mw, &assumed);
            if candidates.is_empty() {
                let it = mw.item(item);
                return Err(FillError::Deadlock {
                    item: it.item_type,
                    owner: it.owner,
                });
            }
            let loc = choose_location(mw, &candidates, rng, policy);
            log::debug!(
                "frontier exhausted, assuming remaining pool for {} at {}",
                mw.item(item).item_type,
                mw.location(loc).name
            );
            mw.place(loc, item);
            report.assumed_placements += 1;
        }
        report.progression_placed += 1;
    }

    let remaining = mw.unfilled();
    for (loc, item) in remaining.into_iter().zip(filler) {
        mw.place(loc, item);
        report.filler_placed += 1;
    }

    Ok(report)
}

/// Sweeps from empty progression and fails if anything stays unreachable.
pub fn verify(mw: &MultiWorld) -> Result<Reachability, FillError> {
    let reach = mw.sweep_from_start();
    let unreached: Vec<LocationRef> = reach.unreached().collect();
    if let Some(&first) = unreached.first() {
        return Err(FillError::Unreachable {
            count: unreached.len(),
            first: format!("{} (player {})", mw.location(first).name, first.world + 1),
        });
    }
    Ok(reach)
}

fn place_forced(
    mw: &mut MultiWorld,
    pool: &mut Vec<ItemId>,
    empty: &[LocationRef],
) -> Result<(), FillError> {
    for &loc in empty {
        let FillRule::Forced(wanted) = mw.location(loc).fill_rule else {
            continue;
        };
        let pos = pool.iter().position(|&id| {
            let it = mw.item(id);
            it.item_type == wanted && it.owner == loc.world
        });
        match pos {
            Some(pos) => {
                let item = pool.remove(pos);
                mw.place(loc, item);
            }
            None => {
                return Err(FillError::ForcedItemMissing {
                    location: mw.location(loc).name.clone(),
                    item: wanted,
                    player: loc.world,
                })
            }
        }
    }
    Ok(())
}

fn empty_reached(mw: &MultiWorld, reach: &Reachability) -> Vec<LocationRef> {
    mw.location_refs()
        .filter(|&r| reach.is_reached(r) && !mw.location(r).is_filled())
        .collect()
}

/// Index of the first item that would open at least one new location for
/// its owner, checked against a copy of the current progression.
fn expanding_item(mw: &MultiWorld, items: &[ItemId], reach: &Reachability) -> Option<usize> {
    items.iter().position(|&id| {
        let it = mw.item(id);
        let next = reach.progression[it.owner].with(it.item_type);
        mw.worlds[it.owner]
            .locations
            .iter()
            .enumerate()
            .any(|(idx, loc)| !reach.reached[it.owner][idx] && loc.is_available(&next))
    })
}

fn priority(mw: &MultiWorld, loc: LocationRef) -> u8 {
    let location = mw.location(loc);
    if location.fill_rule == FillRule::PreferProgression
        && mw.worlds[loc.world].is_in_reward_region(loc.index)
    {
        0
    } else if location.is_constrained() {
        1
    } else {
        2
    }
}

fn choose_location<R: Rng>(
    mw: &MultiWorld,
    candidates: &[LocationRef],
    rng: &mut R,
    policy: TieBreak,
) -> LocationRef {
    match policy {
        TieBreak::Ordered => candidates[0],
        TieBreak::Uniform => candidates[rng.gen_range(0..candidates.len())],
        TieBreak::Prioritized => {
            let best = candidates
                .iter()
                .map(|&c| priority(mw, c))
                .min()
                .unwrap_or(2);
            let tier: Vec<LocationRef> = candidates
                .iter()
                .copied()
                .filter(|&c| priority(mw, c) == best)
                .collect();
            tier[rng.gen_range(0..tier.len())]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::items::Half;
    use crate::logic::{has, Requirement};
    use crate::world::{Layout, RewardKind, World, WorldBuilder};
    use rand::{rngs::StdRng, SeedableRng};

    /// Two slots: one open, one behind the only progression item.
    struct KeyAndDoor;

    impl Layout for KeyAndDoor {
        fn build_world(&self, player: usize, config: &Config) -> World {
            let mut b = WorldBuilder::new(player, config);
            b.region("Room", Half::Kingdom, Requirement::Always)
                .location("Outside", Requirement::Always)
                .location("Behind Door", has(ItemType::Hammer));
            b.pool_item(ItemType::Hammer, 1).pad_pool(ItemType::Arrows);
            b.build()
        }
    }

    /// A chain where only the last item opens the first door.
    struct Chain;

    impl Layout for Chain {
        fn build_world(&self, player: usize, config: &Config) -> World {
            let mut b = WorldBuilder::new(player, config);
            b.region("Start", Half::Kingdom, Requirement::Always)
                .location("Start A", Requirement::Always)
                .location("Start B", Requirement::Always);
            b.region("Cave", Half::Kingdom, has(ItemType::Lantern))
                .location("Cave A", Requirement::Always)
                .location("Cave B", Requirement::Always);
            b.region("Lair", Half::Kingdom, has(ItemType::Hammer))
                .reward(RewardKind::Boss, has(ItemType::Bow))
                .location_with_rule("Lair Guardian", has(ItemType::Bow), FillRule::PreferProgression)
                .location("Lair Chest", Requirement::Always);
            b.pool_item(ItemType::Lantern, 1)
                .pool_item(ItemType::Hammer, 1)
                .pool_item(ItemType::Bow, 1)
                .pad_pool(ItemType::Arrows);
            b.build()
        }
    }

    /// The only slot for the key is behind it.
    struct Impossible;

    impl Layout for Impossible {
        fn build_world(&self, player: usize, config: &Config) -> World {
            let mut b = WorldBuilder::new(player, config);
            b.region("Vault", Half::Kingdom, has(ItemType::Hammer))
                .location("Vault Chest", Requirement::Always);
            b.pool_item(ItemType::Hammer, 1);
            b.build()
        }
    }

    fn filled(layout: &dyn Layout, players: usize, seed: u64, policy: TieBreak) -> MultiWorld {
        let mut mw = MultiWorld::build(layout, &vec![Config::default(); players]).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        fill(&mut mw, &mut rng, policy).unwrap();
        mw
    }

    #[test]
    fn key_lands_outside_the_door() {
        for seed in 0..20 {
            let mw = filled(&KeyAndDoor, 1, seed, TieBreak::Uniform);
            let outside = mw.worlds[0].locations[0].item.unwrap();
            assert_eq!(mw.item(outside).item_type, ItemType::Hammer);
            assert!(verify(&mw).is_ok());
        }
    }

    #[test]
    fn every_location_is_filled_and_reachable() {
        for policy in TieBreak::ALL {
            for seed in 0..10 {
                let mw = filled(&Chain, 1, seed, policy);
                assert!(mw.unfilled().is_empty());
                assert!(mw.unplaced_items().is_empty());
                verify(&mw).unwrap();
            }
        }
    }

    #[test]
    fn prioritized_fills_guardian_with_progression() {
        struct Den;
        impl Layout for Den {
            fn build_world(&self, player: usize, config: &Config) -> World {
                let mut b = WorldBuilder::new(player, config);
                b.region("Yard", Half::Depths, Requirement::Always)
                    .location("Yard A", Requirement::Always)
                    .location("Yard B", Requirement::Always);
                b.region("Den", Half::Depths, Requirement::Always)
                    .reward(RewardKind::Boss, Requirement::Always)
                    .location_with_rule("Den Guardian", Requirement::Always, FillRule::PreferProgression);
                b.pool_item(ItemType::Tether, 1).pad_pool(ItemType::EnergyTank);
                b.build()
            }
        }
        for seed in 0..10 {
            let mw = filled(&Den, 1, seed, TieBreak::Prioritized);
            let id = mw.worlds[0].locations[2].item.unwrap();
            assert_eq!(mw.item(id).item_type, ItemType::Tether);
        }
    }

    #[test]
    fn two_players_fill_across_worlds() {
        for seed in 0..10 {
            let mw = filled(&Chain, 2, seed, TieBreak::Uniform);
            assert_eq!(mw.total_locations(), 12);
            verify(&mw).unwrap();
        }
    }

    #[test]
    fn impossible_layout_deadlocks() {
        let mut mw = MultiWorld::build(&Impossible, &[Config::default()]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = fill(&mut mw, &mut rng, TieBreak::Prioritized).unwrap_err();
        assert_eq!(
            err,
            FillError::Deadlock {
                item: ItemType::Hammer,
                owner: 0
            }
        );
    }

    #[test]
    fn forced_rule_is_honoured() {
        struct Forced;
        impl Layout for Forced {
            fn build_world(&self, player: usize, config: &Config) -> World {
                let mut b = WorldBuilder::new(player, config);
                b.region("Room", Half::Kingdom, Requirement::Always)
                    .location("Free", Requirement::Always)
                    .location_with_rule("Pedestal", Requirement::Always, FillRule::Forced(ItemType::Sword));
                b.pool_item(ItemType::Sword, 1).pad_pool(ItemType::Arrows);
                b.build()
            }
        }
        for seed in 0..5 {
            let mw = filled(&Forced, 1, seed, TieBreak::Uniform);
            let id = mw.worlds[0].locations[1].item.unwrap();
            assert_eq!(mw.item(id).item_type, ItemType::Sword);
        }
    }

    #[test]
    fn tie_break_parses() {
        assert_eq!("Uniform".parse::<TieBreak>(), Ok(TieBreak::Uniform));
        assert!("random".parse::<TieBreak>().is_err());
    }
}
