use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of the combined game an item or region belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Half {
    Kingdom,
    Depths,
}

/// How an item participates in placement.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ItemClass {
    /// Referenced by logic; placed first so every slot stays reachable.
    Progression,
    /// No logic impact; fills whatever is left.
    Filler,
    /// Granted by completing a reward region, never placed in a slot.
    RewardToken,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemType {
    Sword,
    Bow,
    Grapnel,
    Lantern,
    Hammer,
    SwimFins,
    Moonstone,
    Gauntlet,
    FireWand,
    FrostWand,
    DashBoots,
    Mirror,
    Flute,
    Tome,
    Cape,
    MorphCore,
    Charges,
    HeatSuit,
    TideSuit,
    Tether,
    SpringBoots,
    Booster,
    SkyJump,
    Missile,
    SuperMissile,
    PowerCharge,
    TwentyCoins,
    Arrows,
    HeartPiece,
    HeartContainer,
    EnergyTank,
    ReserveTank,
    Pendant,
    Crystal,
    BossToken,
}

/// Number of distinct item types; sizes the progression count array.
pub const ITEM_TYPE_COUNT: usize = ItemType::BossToken as usize + 1;

#[derive(Copy, Clone, Debug)]
pub struct ItemInfo {
    pub item_type: ItemType,
    pub name: &'static str,
    pub class: ItemClass,
    pub half: Half,
    /// Byte the game reads from the item table to decide what to award.
    pub code: u8,
}

pub(crate) const ITEM_TABLE: &[ItemInfo] = &[
    ItemInfo { item_type: ItemType::Sword, name: "Progressive Sword", class: ItemClass::Progression, half: Half::Kingdom, code: 0x5E },
    ItemInfo { item_type: ItemType::Bow, name: "Bow", class: ItemClass::Progression, half: Half::Kingdom, code: 0x0B },
    ItemInfo { item_type: ItemType::Grapnel, name: "Grapnel", class: ItemClass::Progression, half: Half::Kingdom, code: 0x0A },
    ItemInfo { item_type: ItemType::Lantern, name: "Lantern", class: ItemClass::Progression, half: Half::Kingdom, code: 0x12 },
    ItemInfo { item_type: ItemType::Hammer, name: "Hammer", class: ItemClass::Progression, half: Half::Kingdom, code: 0x09 },
    ItemInfo { item_type: ItemType::SwimFins, name: "Swim Fins", class: ItemClass::Progression, half: Half::Kingdom, code: 0x1E },
    ItemInfo { item_type: ItemType::Moonstone, name: "Moonstone", class: ItemClass::Progression, half: Half::Kingdom, code: 0x1F },
    ItemInfo { item_type: ItemType::Gauntlet, name: "Progressive Gauntlet", class: ItemClass::Progression, half: Half::Kingdom, code: 0x61 },
    ItemInfo { item_type: ItemType::FireWand, name: "Fire Wand", class: ItemClass::Progression, half: Half::Kingdom, code: 0x07 },
    ItemInfo { item_type: ItemType::FrostWand, name: "Frost Wand", class: ItemClass::Progression, half: Half::Kingdom, code: 0x08 },
    ItemInfo { item_type: ItemType::DashBoots, name: "Dash Boots", class: ItemClass::Progression, half: Half::Kingdom, code: 0x4B },
    ItemInfo { item_type: ItemType::Mirror, name: "Mirror", class: ItemClass::Progression, half: Half::Kingdom, code: 0x1A },
    ItemInfo { item_type: ItemType::Flute, name: "Flute", class: ItemClass::Progression, half: Half::Kingdom, code: 0x14 },
    ItemInfo { item_type: ItemType::Tome, name: "Tome", class: ItemClass::Progression, half: Half::Kingdom, code: 0x1D },
    ItemInfo { item_type: ItemType::Cape, name: "Cape", class: ItemClass::Progression, half: Half::Kingdom, code: 0x19 },
    ItemInfo { item_type: ItemType::MorphCore, name: "Morph Core", class: ItemClass::Progression, half: Half::Depths, code: 0xB0 },
    ItemInfo { item_type: ItemType::Charges, name: "Charges", class: ItemClass::Progression, half: Half::Depths, code: 0xB1 },
    ItemInfo { item_type: ItemType::HeatSuit, name: "Heat Suit", class: ItemClass::Progression, half: Half::Depths, code: 0xB2 },
    ItemInfo { item_type: ItemType::TideSuit, name: "Tide Suit", class: ItemClass::Progression, half: Half::Depths, code: 0xB3 },
    ItemInfo { item_type: ItemType::Tether, name: "Tether", class: ItemClass::Progression, half: Half::Depths, code: 0xB4 },
    ItemInfo { item_type: ItemType::SpringBoots, name: "Spring Boots", class: ItemClass::Progression, half: Half::Depths, code: 0xB5 },
    ItemInfo { item_type: ItemType::Booster, name: "Booster", class: ItemClass::Progression, half: Half::Depths, code: 0xB6 },
    ItemInfo { item_type: ItemType::SkyJump, name: "Sky Jump", class: ItemClass::Progression, half: Half::Depths, code: 0xB7 },
    ItemInfo { item_type: ItemType::Missile, name: "Missile", class: ItemClass::Progression, half: Half::Depths, code: 0xC0 },
    ItemInfo { item_type: ItemType::SuperMissile, name: "Super Missile", class: ItemClass::Progression, half: Half::Depths, code: 0xC1 },
    ItemInfo { item_type: ItemType::PowerCharge, name: "Power Charge", class: ItemClass::Progression, half: Half::Depths, code: 0xC2 },
    ItemInfo { item_type: ItemType::TwentyCoins, name: "Twenty Coins", class: ItemClass::Filler, half: Half::Kingdom, code: 0x36 },
    ItemInfo { item_type: ItemType::Arrows, name: "Arrows", class: ItemClass::Filler, half: Half::Kingdom, code: 0x44 },
    ItemInfo { item_type: ItemType::HeartPiece, name: "Heart Piece", class: ItemClass::Filler, half: Half::Kingdom, code: 0x17 },
    ItemInfo { item_type: ItemType::HeartContainer, name: "Heart Container", class: ItemClass::Filler, half: Half::Kingdom, code: 0x3E },
    ItemInfo { item_type: ItemType::EnergyTank, name: "Energy Tank", class: ItemClass::Filler, half: Half::Depths, code: 0xC3 },
    ItemInfo { item_type: ItemType::ReserveTank, name: "Reserve Tank", class: ItemClass::Filler, half: Half::Depths, code: 0xC4 },
    ItemInfo { item_type: ItemType::Pendant, name: "Pendant", class: ItemClass::RewardToken, half: Half::Kingdom, code: 0x37 },
    ItemInfo { item_type: ItemType::Crystal, name: "Crystal", class: ItemClass::RewardToken, half: Half::Kingdom, code: 0x20 },
    ItemInfo { item_type: ItemType::BossToken, name: "Boss Token", class: ItemClass::RewardToken, half: Half::Depths, code: 0xD0 },
];

impl ItemType {
    pub fn info(self) -> &'static ItemInfo {
        // ITEM_TABLE is declared in discriminant order.
        &ITEM_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn class(self) -> ItemClass {
        self.info().class
    }

    pub fn code(self) -> u8 {
        self.info().code
    }

    pub fn is_progression(self) -> bool {
        self.class() == ItemClass::Progression
    }

    pub fn all() -> impl Iterator<Item = ItemType> {
        ITEM_TABLE.iter().map(|info| info.item_type)
    }

    /// Looks an item type up by its display name, case-insensitively.
    pub fn from_name(name: &str) -> Option<ItemType> {
        ITEM_TABLE
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name.trim()))
            .map(|info| info.item_type)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of an item inside the coordinator's item arena.
pub type ItemId = usize;

/// A concrete item instance: what it is and which player receives it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub item_type: ItemType,
    pub owner: usize,
}

impl Item {
    pub fn new(item_type: ItemType, owner: usize) -> Self {
        Self { item_type, owner }
    }

    pub fn class(&self) -> ItemClass {
        self.item_type.class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_in_discriminant_order() {
        for (idx, info) in ITEM_TABLE.iter().enumerate() {
            assert_eq!(info.item_type as usize, idx, "{} is out of order", info.name);
        }
        assert_eq!(ITEM_TABLE.len(), ITEM_TYPE_COUNT);
    }

    #[test]
    fn codes_are_unique() {
        let mut codes: Vec<u8> = ITEM_TABLE.iter().map(|info| info.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ITEM_TABLE.len());
    }

    #[test]
    fn from_name_ignores_case() {
        assert_eq!(ItemType::from_name("morph core"), Some(ItemType::MorphCore));
        assert_eq!(ItemType::from_name("Progressive Sword"), Some(ItemType::Sword));
        assert_eq!(ItemType::from_name("Triforce"), None);
    }

    #[test]
    fn reward_tokens_are_not_progression() {
        assert!(!ItemType::Crystal.is_progression());
        assert_eq!(ItemType::BossToken.class(), ItemClass::RewardToken);
        assert!(ItemType::Missile.is_progression());
        assert_eq!(ItemType::EnergyTank.class(), ItemClass::Filler);
    }
}
