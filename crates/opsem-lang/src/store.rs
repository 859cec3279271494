//! The address-keyed, space-partitioned store.
//!
//! A store maps an address-space tag to a partition, and a partition maps
//! address identifiers to *slots*. A slot is the denotation set of the
//! address: the concrete interpreter keeps every slot a singleton, the
//! abstract interpreter accumulates weak-update joins in it.
//!
//! Updates are persistent: every write returns a new store, so states can
//! be fingerprinted and memoized by value.

use crate::term::{AddrId, Address, AddressKind, MapClass, MapValue, Term};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

type Partition = BTreeMap<AddrId, BTreeSet<Term>>;

/// Per-address-space mapping from address identifier to stored terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Store {
    partitions: BTreeMap<Arc<str>, Partition>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    /// The slot for an address, if mapped.
    pub fn slot(&self, addr: &Address) -> Option<&BTreeSet<Term>> {
        self.partitions.get(&addr.space)?.get(&addr.id)
    }

    /// The single stored value for an address. `None` when the address
    /// is unmapped or the slot holds more than one denotation (the
    /// concrete interpreter treats both as errors at its own level).
    pub fn one(&self, addr: &Address) -> Option<&Term> {
        let slot = self.slot(addr)?;
        if slot.len() == 1 {
            slot.iter().next()
        } else {
            None
        }
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.slot(addr).is_some()
    }

    /// Strong update: replace the slot with `{value}`.
    pub fn write_strong(&self, addr: &Address, value: Term) -> Store {
        let mut partitions = self.partitions.clone();
        let partition = partitions.entry(Arc::clone(&addr.space)).or_default();
        let mut slot = BTreeSet::new();
        slot.insert(value);
        partition.insert(addr.id.clone(), slot);
        Store { partitions }
    }

    /// Weak update: union `value` into the slot.
    pub fn write_weak(&self, addr: &Address, value: Term) -> Store {
        let mut partitions = self.partitions.clone();
        let partition = partitions.entry(Arc::clone(&addr.space)).or_default();
        partition.entry(addr.id.clone()).or_default().insert(value);
        Store { partitions }
    }

    /// Every address currently mapped, reconstructed as egal handles
    /// (the store itself does not record address kinds).
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.partitions.iter().flat_map(|(tag, partition)| {
            partition.keys().map(move |id| Address {
                kind: AddressKind::Egal,
                space: Arc::clone(tag),
                id: id.clone(),
            })
        })
    }

    pub fn partition_tags(&self) -> impl Iterator<Item = &Arc<str>> {
        self.partitions.keys()
    }

    /// Every stored term across every partition and slot.
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.partitions
            .values()
            .flat_map(|p| p.values().flat_map(|slot| slot.iter()))
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.values().all(|p| p.is_empty())
    }

    /// One partition as a raw dictionary term: address ↦ stored value
    /// (the slot itself, as a set, when it holds several denotations).
    /// Addresses render as egal handles. Escape hatch for
    /// `Unsafe-store-ref`-style expressions only.
    pub fn partition_as_term(&self, tag: &str) -> Term {
        let entries = self
            .partitions
            .get(tag)
            .into_iter()
            .flat_map(|partition| {
                partition.iter().map(|(id, slot)| {
                    let key = Term::Addr(Address {
                        kind: AddressKind::Egal,
                        space: Arc::from(tag),
                        id: id.clone(),
                    });
                    let value = if slot.len() == 1 {
                        slot.iter().next().cloned().unwrap_or_else(Term::empty_set)
                    } else {
                        Term::Set(slot.clone())
                    };
                    (key, value)
                })
            });
        Term::Map(MapValue::from_entries(MapClass::Raw, entries))
    }

    /// The whole store as a raw dictionary term: tag ↦ partition.
    pub fn as_term(&self) -> Term {
        let entries = self
            .partitions
            .keys()
            .map(|tag| (Term::sym(tag), self.partition_as_term(tag)));
        Term::Map(MapValue::from_entries(MapClass::Raw, entries))
    }
}
