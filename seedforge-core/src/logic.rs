use crate::items::ItemType;
use crate::progression::Progression;

/// Access rule evaluated against a [`Progression`].
///
/// There is no negation, so every rule is monotone: adding items can only
/// turn a false result true. Fill relies on this to terminate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    Always,
    Never,
    Has(ItemType),
    Count(ItemType, u8),
    All(Vec<Requirement>),
    Any(Vec<Requirement>),
}

impl Requirement {
    pub fn is_satisfied(&self, progression: &Progression) -> bool {
        match self {
            Requirement::Always => true,
            Requirement::Never => false,
            Requirement::Has(item) => progression.contains(*item),
            Requirement::Count(item, n) => progression.count_of(*item) >= *n,
            Requirement::All(reqs) => reqs.iter().all(|r| r.is_satisfied(progression)),
            Requirement::Any(reqs) => reqs.iter().any(|r| r.is_satisfied(progression)),
        }
    }

    /// Conjunction that drops `Always` operands and collapses trivial cases.
    pub fn and(self, other: Requirement) -> Requirement {
        match (self, other) {
            (Requirement::Always, r) | (r, Requirement::Always) => r,
            (Requirement::Never, _) | (_, Requirement::Never) => Requirement::Never,
            (Requirement::All(mut a), Requirement::All(b)) => {
                a.extend(b);
                Requirement::All(a)
            }
            (Requirement::All(mut a), r) => {
                a.push(r);
                Requirement::All(a)
            }
            (l, r) => Requirement::All(vec![l, r]),
        }
    }

    pub fn is_trivial(&self) -> bool {
        matches!(self, Requirement::Always)
    }
}

pub fn has(item: ItemType) -> Requirement {
    Requirement::Has(item)
}

pub fn count(item: ItemType, n: u8) -> Requirement {
    Requirement::Count(item, n)
}

pub fn all<I: IntoIterator<Item = Requirement>>(reqs: I) -> Requirement {
    Requirement::All(reqs.into_iter().collect())
}

pub fn any<I: IntoIterator<Item = Requirement>>(reqs: I) -> Requirement {
    Requirement::Any(reqs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_progression(rng: &mut StdRng) -> Progression {
        let mut p = Progression::new();
        for item in ItemType::all() {
            for _ in 0..rng.gen_range(0..3) {
                p.add(item);
            }
        }
        p
    }

    #[test]
    fn combinators_evaluate() {
        let p: Progression = [ItemType::Bow, ItemType::Sword, ItemType::Sword]
            .into_iter()
            .collect();
        assert!(all([has(ItemType::Bow), count(ItemType::Sword, 2)]).is_satisfied(&p));
        assert!(!all([has(ItemType::Bow), has(ItemType::Hammer)]).is_satisfied(&p));
        assert!(any([has(ItemType::Hammer), has(ItemType::Bow)]).is_satisfied(&p));
        assert!(!count(ItemType::Sword, 3).is_satisfied(&p));
        assert!(!Requirement::Never.is_satisfied(&p));
    }

    #[test]
    fn and_simplifies() {
        assert_eq!(Requirement::Always.and(has(ItemType::Bow)), has(ItemType::Bow));
        assert_eq!(has(ItemType::Bow).and(Requirement::Never), Requirement::Never);
        assert_eq!(
            all([has(ItemType::Bow)]).and(has(ItemType::Cape)),
            all([has(ItemType::Bow), has(ItemType::Cape)])
        );
    }

    #[test]
    fn superset_never_loses_access() {
        let req = any([
            all([has(ItemType::MorphCore), any([has(ItemType::Charges), count(ItemType::PowerCharge, 2)])]),
            all([count(ItemType::Gauntlet, 2), has(ItemType::Moonstone)]),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let small = random_progression(&mut rng);
            let mut big = small;
            big.merge(&random_progression(&mut rng));
            if req.is_satisfied(&small) {
                assert!(req.is_satisfied(&big));
            }
        }
    }
}
