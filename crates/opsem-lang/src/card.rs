//! The cardinality lattice and per-address counts.
//!
//! The abstract interpreter tracks, for every allocated address, an upper
//! bound on how many concrete cells the address denotes: `0 < 1 < ω`.
//! Counts drive the strong/weak update decision: a write to a `1` address
//! overwrites, a write to an `ω` address joins with the prior contents.

use crate::term::Address;
use std::collections::BTreeMap;
use std::fmt;

/// Upper bound on how many concrete values one abstract address denotes.
///
/// `Zero` means unreachable (never allocated). Each allocation at an
/// address bumps its count one rung: `0 → 1 → ω`, saturating at `ω`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cardinality {
    Zero,
    One,
    Many,
}

impl Cardinality {
    /// Least upper bound.
    pub fn join(self, other: Cardinality) -> Cardinality {
        self.max(other)
    }

    /// The count after one more allocation at this address.
    pub fn bump(self) -> Cardinality {
        match self {
            Cardinality::Zero => Cardinality::One,
            Cardinality::One | Cardinality::Many => Cardinality::Many,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Zero => write!(f, "0"),
            Cardinality::One => write!(f, "1"),
            Cardinality::Many => write!(f, "ω"),
        }
    }
}

/// Three-valued answer for comparisons that abstraction cannot decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ternary {
    True,
    False,
    Unknown,
}

impl Ternary {
    pub fn from_bool(b: bool) -> Ternary {
        if b {
            Ternary::True
        } else {
            Ternary::False
        }
    }

    /// Three-valued conjunction.
    pub fn and(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::False, _) | (_, Ternary::False) => Ternary::False,
            (Ternary::True, Ternary::True) => Ternary::True,
            _ => Ternary::Unknown,
        }
    }

    /// Three-valued disjunction.
    pub fn or(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::True, _) | (_, Ternary::True) => Ternary::True,
            (Ternary::False, Ternary::False) => Ternary::False,
            _ => Ternary::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        self == Ternary::True
    }

    pub fn is_false(self) -> bool {
        self == Ternary::False
    }
}

/// Per-address cardinality map carried by abstract states.
///
/// Total over all addresses: anything absent counts as `Zero`. Updates
/// return a new map; counts are passed by value like the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Counts {
    entries: BTreeMap<Address, Cardinality>,
}

impl Counts {
    pub fn new() -> Counts {
        Counts::default()
    }

    /// The count recorded for an address (`Zero` if never allocated).
    pub fn get(&self, addr: &Address) -> Cardinality {
        self.entries
            .get(addr)
            .copied()
            .unwrap_or(Cardinality::Zero)
    }

    /// A new map with the address's count bumped one rung.
    pub fn bump(&self, addr: &Address) -> Counts {
        let mut entries = self.entries.clone();
        let next = self.get(addr).bump();
        entries.insert(addr.clone(), next);
        Counts { entries }
    }

    /// A new map with the address's count joined with `card`.
    pub fn join(&self, addr: &Address, card: Cardinality) -> Counts {
        let mut entries = self.entries.clone();
        let next = self.get(addr).join(card);
        entries.insert(addr.clone(), next);
        Counts { entries }
    }

    /// Iterate over recorded (address, count) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, Cardinality)> {
        self.entries.iter().map(|(a, c)| (a, *c))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
