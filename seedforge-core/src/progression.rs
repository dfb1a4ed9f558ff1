use crate::items::{ItemType, ITEM_TYPE_COUNT};

/// Accumulated item state used to evaluate logic.
///
/// Counts live in a fixed array indexed by item type, so queries are O(1)
/// and a snapshot is a plain copy. Fill evaluates many hypothetical states
/// per iteration and never needs to replay history.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Progression {
    counts: [u8; ITEM_TYPE_COUNT],
}

impl Default for Progression {
    fn default() -> Self {
        Self::new()
    }
}

impl Progression {
    pub fn new() -> Self {
        Self {
            counts: [0; ITEM_TYPE_COUNT],
        }
    }

    pub fn add(&mut self, item: ItemType) {
        let slot = &mut self.counts[item as usize];
        *slot = slot.saturating_add(1);
    }

    pub fn contains(&self, item: ItemType) -> bool {
        self.counts[item as usize] > 0
    }

    pub fn count_of(&self, item: ItemType) -> u8 {
        self.counts[item as usize]
    }

    pub fn snapshot(&self) -> Progression {
        *self
    }

    /// Returns a copy with one more `item`, leaving `self` untouched.
    pub fn with(&self, item: ItemType) -> Progression {
        let mut next = *self;
        next.add(item);
        next
    }

    /// Adds every count of `other` into `self`.
    pub fn merge(&mut self, other: &Progression) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine = mine.saturating_add(*theirs);
        }
    }

}

impl FromIterator<ItemType> for Progression {
    fn from_iter<I: IntoIterator<Item = ItemType>>(iter: I) -> Self {
        let mut progression = Progression::new();
        for item in iter {
            progression.add(item);
        }
        progression
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate() {
        let mut p = Progression::new();
        assert!(!p.contains(ItemType::Sword));
        p.add(ItemType::Sword);
        p.add(ItemType::Sword);
        assert!(p.contains(ItemType::Sword));
        assert_eq!(p.count_of(ItemType::Sword), 2);
        assert_eq!(p.count_of(ItemType::Bow), 0);
    }

    #[test]
    fn with_leaves_original_untouched() {
        let p: Progression = [ItemType::Hammer].into_iter().collect();
        let q = p.with(ItemType::Mirror);
        assert!(!p.contains(ItemType::Mirror));
        assert!(q.contains(ItemType::Mirror));
        assert_eq!(q.count_of(ItemType::Hammer), 1);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a: Progression = [ItemType::Missile].into_iter().collect();
        let b: Progression = [ItemType::Missile, ItemType::Tether].into_iter().collect();
        let before = a.snapshot();
        a.merge(&b);
        assert_eq!(a.count_of(ItemType::Missile), 2);
        assert_eq!(before.count_of(ItemType::Missile), 1);
        assert!(a.contains(ItemType::Tether));
    }
}
