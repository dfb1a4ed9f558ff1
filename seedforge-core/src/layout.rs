use crate::config::{Config, Goal, ItemPlacement, LogicLevel, CRYSTAL_COUNT};
use crate::items::{Half, ItemType};
use crate::items::ItemType::*;
use crate::logic::{all, any, count, has, Requirement};
use crate::world::{FillRule, Layout, RewardKind, World, WorldBuilder};

/// Boss regions in the Depths half; the standard goal needs all of them.
pub const BOSS_COUNT: u8 = 4;

/// The full two-half game graph.
#[derive(Copy, Clone, Debug, Default)]
pub struct StandardLayout;

/// Shared rule fragments for one player's logic settings.
struct Rules {
    kingdom: LogicLevel,
    depths: LogicLevel,
}

impl Rules {
    fn new(config: &Config) -> Self {
        Self {
            kingdom: config.kingdom_logic,
            depths: config.depths_logic,
        }
    }

    fn dark_room(&self) -> Requirement {
        match self.kingdom {
            LogicLevel::Normal => has(Lantern),
            LogicLevel::Hard => Requirement::Always,
        }
    }

    fn mountain(&self) -> Requirement {
        match self.kingdom {
            LogicLevel::Normal => any([has(Gauntlet), has(Flute)]),
            LogicLevel::Hard => any([has(Gauntlet), has(Flute), has(DashBoots)]),
        }
    }

    fn can_bomb(&self) -> Requirement {
        all([has(MorphCore), any([has(Charges), has(PowerCharge)])])
    }

    fn can_power_bomb(&self) -> Requirement {
        all([has(MorphCore), has(PowerCharge)])
    }

    fn can_open_red(&self) -> Requirement {
        any([has(Missile), has(SuperMissile)])
    }

    fn can_heat(&self) -> Requirement {
        match self.depths {
            LogicLevel::Normal => has(HeatSuit),
            LogicLevel::Hard => any([has(HeatSuit), has(Booster)]),
        }
    }

    fn can_fly(&self) -> Requirement {
        match self.depths {
            LogicLevel::Normal => has(SkyJump),
            LogicLevel::Hard => any([has(SkyJump), has(SpringBoots)]),
        }
    }

    fn can_swim(&self) -> Requirement {
        match self.depths {
            LogicLevel::Normal => has(TideSuit),
            LogicLevel::Hard => any([has(TideSuit), has(SpringBoots)]),
        }
    }

    fn green_caverns(&self) -> Requirement {
        any([self.can_bomb(), self.can_open_red()])
    }

    fn magma_depths(&self) -> Requirement {
        all([
            self.green_caverns(),
            self.can_heat(),
            self.can_open_red(),
            has(MorphCore),
        ])
    }

    /// The dark side of the Kingdom, reached overland or through the
    /// portal below the magma depths.
    fn dark_side(&self) -> Requirement {
        all([
            has(Moonstone),
            any([
                all([has(Hammer), has(Gauntlet)]),
                count(Gauntlet, 2),
                all([self.magma_depths(), self.can_power_bomb()]),
            ]),
        ])
    }

    /// The trench, reached from the caverns or through the swamp portal.
    fn tidal_trench(&self) -> Requirement {
        any([
            all([self.can_swim(), self.can_power_bomb(), self.can_open_red()]),
            all([self.dark_side(), has(SwimFins), has(MorphCore)]),
        ])
    }

    fn goal(&self, config: &Config) -> Requirement {
        match config.goal {
            Goal::DefeatBoth => all([
                count(Crystal, CRYSTAL_COUNT),
                count(BossToken, BOSS_COUNT),
                count(Sword, 2),
            ]),
            Goal::Crystals => all([
                count(Crystal, config.crystals_required),
                count(Sword, 2),
            ]),
        }
    }
}

fn forced_or_any(placement: ItemPlacement, item: ItemType) -> FillRule {
    match placement {
        ItemPlacement::Early => FillRule::Forced(item),
        ItemPlacement::Randomized => FillRule::Any,
    }
}

impl StandardLayout {
    fn kingdom(b: &mut WorldBuilder, r: &Rules, config: &Config) {
        use Requirement::Always;

        b.region("Kingdom Fields", Half::Kingdom, Always)
            .location_with_rule(
                "Cottage Chest",
                Always,
                forced_or_any(config.sword_location, Sword),
            )
            .location("Sanctuary", Always)
            .location("Well Cave - Left", Always)
            .location("Well Cave - Right", Always)
            .location("Blind's Hideout", Always)
            .location("Bottle Merchant", Always)
            .location("Mushroom Grove", Always)
            .location("Castle Secret Passage", Always)
            .location("Castle Secret Chest", Always)
            .location("Library Shelf", has(DashBoots))
            .location("Lakeside Chest", has(SwimFins))
            .location("Hobo Bridge", has(SwimFins))
            .location("Sunken Altar", has(Hammer))
            .location("Old Man's Cave", all([r.mountain(), r.dark_room()]))
            .location("Spectacle Ledge", all([r.mountain(), has(Mirror)]))
            .location("Floating Island", all([r.mountain(), has(Mirror), r.dark_side()]))
            .location("Tablet of Wisdom", all([has(Tome), count(Sword, 2)]))
            .location("Zora Ledge", all([has(SwimFins), any([has(Gauntlet), has(Flute)])]))
            .location("Ancient Pedestal", count(Pendant, 3));

        b.region("Castle Dungeon", Half::Kingdom, Always)
            .location("Castle Dungeon - Map Chest", Always)
            .location("Castle Dungeon - Boomerang Chest", r.dark_room())
            .location("Castle Dungeon - Prisoner's Cell", Always);

        b.region("Eastern Ruins", Half::Kingdom, Always)
            .reward(RewardKind::Pendant, all([has(Bow), r.dark_room()]))
            .location("Eastern Ruins - Cannonball Chest", Always)
            .location("Eastern Ruins - Compass Chest", Always)
            .location("Eastern Ruins - Big Chest", Always)
            .location_with_rule(
                "Eastern Ruins - Guardian",
                all([has(Bow), r.dark_room()]),
                FillRule::PreferProgression,
            );

        b.region(
            "Desert Temple",
            Half::Kingdom,
            any([has(Tome), all([has(Mirror), has(Flute), count(Gauntlet, 2)])]),
        )
        .reward(
            RewardKind::Pendant,
            all([has(Gauntlet), any([has(FireWand), has(Lantern)])]),
        )
        .location("Desert Temple - Map Chest", Always)
        .location("Desert Temple - Torch", has(DashBoots))
        .location("Desert Temple - Big Chest", Always)
        .location_with_rule(
            "Desert Temple - Guardian",
            all([has(Gauntlet), any([has(FireWand), has(Lantern)])]),
            FillRule::PreferProgression,
        );

        b.region(
            "Tower of Heights",
            Half::Kingdom,
            all([r.mountain(), any([has(Mirror), all([has(Grapnel), has(Hammer)])])]),
        )
        .reward(RewardKind::Pendant, any([has(Sword), has(Hammer)]))
        .location("Tower of Heights - Basement Cage", Always)
        .location("Tower of Heights - Big Chest", any([has(FireWand), has(Lantern)]))
        .location_with_rule(
            "Tower of Heights - Guardian",
            any([has(Sword), has(Hammer)]),
            FillRule::PreferProgression,
        );

        b.region("Castle Tower", Half::Kingdom, any([has(Cape), count(Sword, 2)]))
            .location("Castle Tower - Foyer", Always)
            .location("Castle Tower - Dark Maze", r.dark_room());

        b.region("Dark Fields", Half::Kingdom, r.dark_side())
            .location("Pyramid Ledge", Always)
            .location("Chest Game", Always)
            .location("Catfish Pond", has(Gauntlet))
            .location("Hype Cave", has(Hammer))
            .location("Bumper Cave Ledge", all([has(Cape), has(Gauntlet)]))
            .location("Purple Chest", count(Gauntlet, 2));

        b.region(
            "Misty Swamp",
            Half::Kingdom,
            all([r.dark_side(), has(Mirror), has(SwimFins)]),
        )
        .reward(RewardKind::Crystal, all([has(Hammer), has(Grapnel)]))
        .location("Misty Swamp - Entrance", Always)
        .location("Misty Swamp - Flooded Room", has(Hammer))
        .location_with_rule(
            "Misty Swamp - Guardian",
            all([has(Hammer), has(Grapnel)]),
            FillRule::PreferProgression,
        );

        b.region("Bone Woods", Half::Kingdom, r.dark_side())
            .reward(RewardKind::Crystal, all([has(FireWand), has(Sword)]))
            .location("Bone Woods - Pot Room", Always)
            .location("Bone Woods - Big Chest", Always)
            .location_with_rule(
                "Bone Woods - Guardian",
                all([has(FireWand), has(Sword)]),
                FillRule::PreferProgression,
            );

        b.region("Thieves' Hideout", Half::Kingdom, r.dark_side())
            .reward(RewardKind::Crystal, any([has(Sword), has(Hammer)]))
            .location("Thieves' Hideout - Attic", Always)
            .location("Thieves' Hideout - Cell", has(Hammer))
            .location_with_rule(
                "Thieves' Hideout - Guardian",
                any([has(Sword), has(Hammer)]),
                FillRule::PreferProgression,
            );

        b.region(
            "Frost Palace",
            Half::Kingdom,
            all([
                has(Moonstone),
                count(Gauntlet, 2),
                any([has(FireWand), all([has(Tome), has(Sword)])]),
            ]),
        )
        .reward(
            RewardKind::Crystal,
            all([has(Hammer), any([has(FrostWand), has(FireWand)])]),
        )
        .location("Frost Palace - Freezor Chest", Always)
        .location("Frost Palace - Big Chest", has(Hammer))
        .location_with_rule(
            "Frost Palace - Guardian",
            all([has(Hammer), any([has(FrostWand), has(FireWand)])]),
            FillRule::PreferProgression,
        );
    }

    fn depths(b: &mut WorldBuilder, r: &Rules, config: &Config) {
        use Requirement::Always;

        b.region("Landing Cliffs", Half::Depths, Always)
            .location("Landing Cliffs - Ship Alcove", Always)
            .location("Landing Cliffs - Terminator Tunnel", Always)
            .location_with_rule(
                "Landing Cliffs - Morph Nest",
                Always,
                forced_or_any(config.morph_location, MorphCore),
            )
            .location("Landing Cliffs - Collapsed Shaft", r.can_bomb())
            .location("Landing Cliffs - Gauntlet Pit", all([r.can_bomb(), any([r.can_fly(), has(Booster)])]))
            .location("Landing Cliffs - Moat", r.can_open_red())
            .location("Landing Cliffs - Charge Vault", r.can_power_bomb());

        b.region("Green Caverns", Half::Depths, r.green_caverns())
            .location("Green Caverns - Early Supers", r.can_open_red())
            .location("Green Caverns - Reserve Room", all([has(MorphCore), r.can_open_red()]))
            .location("Green Caverns - Mockball Hall", Always)
            .location("Green Caverns - Spore Vine", r.can_bomb())
            .location("Green Caverns - Beam Alcove", Always)
            .location("Green Caverns - Ceiling", any([r.can_fly(), has(Tether)]));

        b.region(
            "Pink Caverns",
            Half::Depths,
            all([r.green_caverns(), r.can_open_red(), has(MorphCore)]),
        )
        .location("Pink Caverns - Wave Gate", has(SuperMissile))
        .location("Pink Caverns - Big Pink", Always)
        .location("Pink Caverns - Waterway", all([r.can_power_bomb(), has(Booster)]))
        .location("Pink Caverns - Energy Room", r.can_power_bomb());

        b.region(
            "Claw Den",
            Half::Depths,
            all([r.green_caverns(), r.can_bomb(), has(SuperMissile)]),
        )
        .reward(RewardKind::Boss, has(Missile))
        .location("Claw Den - Inner Chamber", Always)
        .location_with_rule("Claw Den - Guardian", has(Missile), FillRule::PreferProgression);

        b.region("Magma Depths", Half::Depths, r.magma_depths())
            .location("Magma Depths - Frozen Perch", has(SuperMissile))
            .location("Magma Depths - Crocodile Pit", any([has(Booster), r.can_fly()]))
            .location("Magma Depths - Spring Hall", Always)
            .location("Magma Depths - Bubble Mountain", Always)
            .location("Magma Depths - Lava Dive", any([r.can_fly(), has(SpringBoots)]));

        let inferno_heat = match r.depths {
            LogicLevel::Normal => has(HeatSuit),
            LogicLevel::Hard => r.can_heat(),
        };
        b.region(
            "Inferno Core",
            Half::Depths,
            all([
                r.magma_depths(),
                has(PowerCharge),
                inferno_heat,
                any([r.can_fly(), has(Tether)]),
            ]),
        )
        .reward(RewardKind::Boss, all([has(Missile), has(SuperMissile)]))
        .location("Inferno Core - Screw Chamber", Always)
        .location("Inferno Core - Golden Chest", Always)
        .location_with_rule(
            "Inferno Core - Guardian",
            all([has(Missile), has(SuperMissile)]),
            FillRule::PreferProgression,
        );

        b.region(
            "Sunken Hulk",
            Half::Depths,
            all([
                has(SuperMissile),
                r.can_power_bomb(),
                any([has(Tether), r.can_fly(), has(TideSuit)]),
            ]),
        )
        .reward(RewardKind::Boss, r.can_bomb())
        .location("Sunken Hulk - Bowling Alley", has(Booster))
        .location("Sunken Hulk - Attic", Always)
        .location_with_rule("Sunken Hulk - Guardian", r.can_bomb(), FillRule::PreferProgression);

        b.region("Tidal Trench", Half::Depths, r.tidal_trench())
            .location("Tidal Trench - Main Street", Always)
            .location("Tidal Trench - Sand Pit", all([r.can_swim(), has(SpringBoots)]))
            .location("Tidal Trench - Aqueduct", Always)
            .location("Tidal Trench - Spring Cavern", any([has(SkyJump), has(SpringBoots)]));

        b.region(
            "Trench Maw",
            Half::Depths,
            all([r.tidal_trench(), r.can_swim(), has(Tether)]),
        )
        .reward(RewardKind::Boss, r.can_open_red())
        .location("Trench Maw - Sky Chamber", Always)
        .location_with_rule("Trench Maw - Guardian", r.can_open_red(), FillRule::PreferProgression);
    }

    fn pool(b: &mut WorldBuilder) {
        b.pool_item(Sword, 2)
            .pool_item(Bow, 1)
            .pool_item(Grapnel, 1)
            .pool_item(Lantern, 1)
            .pool_item(Hammer, 1)
            .pool_item(SwimFins, 1)
            .pool_item(Moonstone, 1)
            .pool_item(Gauntlet, 2)
            .pool_item(FireWand, 1)
            .pool_item(FrostWand, 1)
            .pool_item(DashBoots, 1)
            .pool_item(Mirror, 1)
            .pool_item(Flute, 1)
            .pool_item(Tome, 1)
            .pool_item(Cape, 1)
            .pool_item(MorphCore, 1)
            .pool_item(Charges, 1)
            .pool_item(HeatSuit, 1)
            .pool_item(TideSuit, 1)
            .pool_item(Tether, 1)
            .pool_item(SpringBoots, 1)
            .pool_item(Booster, 1)
            .pool_item(SkyJump, 1)
            .pool_item(Missile, 2)
            .pool_item(SuperMissile, 2)
            .pool_item(PowerCharge, 2)
            .pool_item(HeartContainer, 6)
            .pool_item(HeartPiece, 8)
            .pool_item(Arrows, 4)
            .pool_item(EnergyTank, 8)
            .pool_item(ReserveTank, 2)
            .pad_pool(TwentyCoins);
    }
}

impl Layout for StandardLayout {
    fn build_world(&self, player: usize, config: &Config) -> World {
        let rules = Rules::new(config);
        let mut b = WorldBuilder::new(player, config);

        Self::kingdom(&mut b, &rules, config);
        Self::depths(&mut b, &rules, config);

        b.region("Crown Keep", Half::Kingdom, rules.goal(config))
            .location("Crown Keep - Throne", Requirement::Always);

        Self::pool(&mut b);
        b.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ItemClass;
    use crate::progression::Progression;

    fn everything(world: &World) -> Progression {
        let mut p: Progression = world.pool.iter().copied().collect();
        for _ in 0..CRYSTAL_COUNT {
            p.add(Crystal);
        }
        for _ in 0..BOSS_COUNT {
            p.add(BossToken);
        }
        for _ in 0..3 {
            p.add(Pendant);
        }
        p
    }

    #[test]
    fn pool_matches_location_count() {
        let world = StandardLayout.build_world(0, &Config::default());
        assert_eq!(world.pool.len(), world.locations.len());
        let progression = world.pool.iter().filter(|i| i.is_progression()).count();
        assert_eq!(progression, 31);
        assert!(world.pool.iter().all(|i| i.class() != ItemClass::RewardToken));
    }

    #[test]
    fn everything_reachable_with_full_inventory() {
        for logic in [LogicLevel::Normal, LogicLevel::Hard] {
            let config = Config {
                kingdom_logic: logic,
                depths_logic: logic,
                ..Config::default()
            };
            let world = StandardLayout.build_world(0, &config);
            let p = everything(&world);
            for loc in &world.locations {
                assert!(loc.is_available(&p), "{} unreachable", loc.name);
            }
            for (_, region) in world.reward_regions() {
                assert!(region.can_complete(&p), "{} not completable", region.name);
            }
        }
    }

    #[test]
    fn reward_counts_match_goal_constants() {
        let world = StandardLayout.build_world(0, &Config::default());
        let crystals = world
            .reward_regions()
            .filter(|(_, r)| r.reward_item() == Some(Crystal))
            .count();
        let bosses = world
            .reward_regions()
            .filter(|(_, r)| r.reward_item() == Some(BossToken))
            .count();
        assert_eq!(crystals, CRYSTAL_COUNT as usize);
        assert_eq!(bosses, BOSS_COUNT as usize);
    }

    #[test]
    fn hard_logic_is_never_stricter() {
        let normal = StandardLayout.build_world(0, &Config::default());
        let hard = StandardLayout.build_world(
            0,
            &Config {
                kingdom_logic: LogicLevel::Hard,
                depths_logic: LogicLevel::Hard,
                ..Config::default()
            },
        );
        let p: Progression = [Lantern, Booster, MorphCore, Missile].into_iter().collect();
        for (n, h) in normal.locations.iter().zip(hard.locations.iter()) {
            if n.is_available(&p) {
                assert!(h.is_available(&p), "{} stricter in hard logic", n.name);
            }
        }
    }

    #[test]
    fn early_placements_force_slots() {
        let config = Config {
            sword_location: ItemPlacement::Early,
            morph_location: ItemPlacement::Early,
            ..Config::default()
        };
        let world = StandardLayout.build_world(0, &config);
        let cottage = world.location_index("Cottage Chest").unwrap();
        let nest = world.location_index("Landing Cliffs - Morph Nest").unwrap();
        assert_eq!(world.locations[cottage].fill_rule, FillRule::Forced(Sword));
        assert_eq!(world.locations[nest].fill_rule, FillRule::Forced(MorphCore));
    }

    #[test]
    fn every_rule_is_monotone() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let world = StandardLayout.build_world(0, &Config::default());
        let mut rng = StdRng::seed_from_u64(31);
        for _ in 0..200 {
            let small: Progression = ItemType::all()
                .filter(|_| rng.gen_bool(0.4))
                .collect();
            let mut big = small;
            for item in ItemType::all() {
                if rng.gen_bool(0.3) {
                    big.add(item);
                }
            }
            for loc in &world.locations {
                if loc.is_available(&small) {
                    assert!(loc.is_available(&big), "{} lost access", loc.name);
                }
            }
            for region in &world.regions {
                if region.can_complete(&small) {
                    assert!(region.can_complete(&big), "{} lost completion", region.name);
                }
            }
        }
    }

    #[test]
    fn location_names_are_unique() {
        let world = StandardLayout.build_world(0, &Config::default());
        let mut names: Vec<&str> = world.locations.iter().map(|l| l.name.as_str()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
