//! Fully-evaluated term values.
//!
//! A [`Term`] is what rules rewrite and stores hold: an atom, a variant
//! value, a finite map, a finite set, an address, or a tagged external
//! value. Recursive structure goes through the store — terms carry
//! addresses, never owning back-references — so every term is a finite
//! tree with `Eq + Ord + Hash` throughout.

use crate::atom::Atom;
use crate::space::VariantDesc;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A fully-evaluated value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Atom(Atom),
    Variant(VariantValue),
    Map(MapValue),
    Set(BTreeSet<Term>),
    Addr(Address),
    External(ExternalValue),
}

impl Term {
    pub fn int(n: impl Into<num_bigint::BigInt>) -> Term {
        Term::Atom(Atom::Int(n.into()))
    }

    pub fn bool(b: bool) -> Term {
        Term::Atom(Atom::Bool(b))
    }

    pub fn sym(name: impl AsRef<str>) -> Term {
        Term::Atom(Atom::sym(name))
    }

    pub fn str(s: impl AsRef<str>) -> Term {
        Term::Atom(Atom::str(s))
    }

    pub fn char(c: char) -> Term {
        Term::Atom(Atom::Char(c))
    }

    /// Build a variant value. The field count must match the descriptor
    /// arity; that is enforced where variants are constructed from user
    /// input (the parser and RHS instantiation), not here.
    pub fn variant(desc: &Arc<VariantDesc>, fields: Vec<Term>) -> Term {
        Term::Variant(VariantValue {
            desc: Arc::clone(desc),
            fields: fields.into(),
        })
    }

    pub fn empty_set() -> Term {
        Term::Set(BTreeSet::new())
    }

    pub fn set(elems: impl IntoIterator<Item = Term>) -> Term {
        Term::Set(elems.into_iter().collect())
    }

    /// Truthiness: everything except `#f` is true.
    pub fn truthy(&self) -> bool {
        !matches!(self, Term::Atom(Atom::Bool(false)))
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Term::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<Term>> {
        match self {
            Term::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_addr(&self) -> Option<&Address> {
        match self {
            Term::Addr(a) => Some(a),
            _ => None,
        }
    }

    /// Every address occurring anywhere in this term.
    pub fn addresses(&self) -> Vec<&Address> {
        let mut out = Vec::new();
        self.collect_addresses(&mut out);
        out
    }

    fn collect_addresses<'a>(&'a self, out: &mut Vec<&'a Address>) {
        match self {
            Term::Atom(_) => {}
            Term::Variant(v) => {
                for field in v.fields.iter() {
                    field.collect_addresses(out);
                }
            }
            Term::Map(m) => {
                for (k, v) in m.entries() {
                    k.collect_addresses(out);
                    v.collect_addresses(out);
                }
            }
            Term::Set(s) => {
                for e in s {
                    e.collect_addresses(out);
                }
            }
            Term::Addr(a) => out.push(a),
            Term::External(e) => e.payload.collect_addresses(out),
        }
    }
}

impl From<Atom> for Term {
    fn from(a: Atom) -> Term {
        Term::Atom(a)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(a) => write!(f, "{a}"),
            Term::Variant(v) => {
                write!(f, "({}", v.desc.name)?;
                for field in v.fields.iter() {
                    write!(f, " {field}")?;
                }
                write!(f, ")")
            }
            Term::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.entries().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{k} {v}")?;
                }
                write!(f, "}}")
            }
            Term::Set(s) => {
                write!(f, "#{{")?;
                for (i, e) in s.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "}}")
            }
            Term::Addr(a) => write!(f, "{a}"),
            Term::External(e) => write!(f, "{}", e.payload),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Variant values
// ─────────────────────────────────────────────────────────────────────

/// A variant value: an interned descriptor plus one term per component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantValue {
    /// Shared descriptor; interning makes name comparison cheap.
    pub desc: Arc<VariantDesc>,
    /// Fixed-length, immutable field sequence.
    pub fields: Arc<[Term]>,
}

impl VariantValue {
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Map values
// ─────────────────────────────────────────────────────────────────────

/// How a map value's keys behave under equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapClass {
    /// Domain values are concrete: exact key equality is correct.
    Discrete,
    /// Domain values may be abstract: lookups fall back to a linear
    /// scan under engine equality, and entries may only "may"-match.
    Abstract,
    /// Raw dictionary trusted as discrete (store escape hatches).
    Raw,
}

/// A finite map value.
///
/// The component descriptor that produced the map picks its class; the
/// class decides whether exact key lookup is trustworthy or whether the
/// engine must scan entries under its own equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapValue {
    class: MapClass,
    entries: BTreeMap<Term, Term>,
}

impl MapValue {
    pub fn new(class: MapClass) -> MapValue {
        MapValue {
            class,
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries(
        class: MapClass,
        entries: impl IntoIterator<Item = (Term, Term)>,
    ) -> MapValue {
        MapValue {
            class,
            entries: entries.into_iter().collect(),
        }
    }

    pub fn class(&self) -> MapClass {
        self.class
    }

    /// Exact (structural) key lookup — the fast path. Abstract-class
    /// callers must fall back to scanning when this misses.
    pub fn get_exact(&self, key: &Term) -> Option<&Term> {
        self.entries.get(key)
    }

    pub fn contains_exact(&self, key: &Term) -> bool {
        self.entries.contains_key(key)
    }

    /// A new map with `key ↦ value` added (exact-key replacement).
    pub fn insert(&self, key: Term, value: Term) -> MapValue {
        let mut entries = self.entries.clone();
        entries.insert(key, value);
        MapValue {
            class: self.class,
            entries,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Term, &Term)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Addresses
// ─────────────────────────────────────────────────────────────────────

/// How an address compares to another address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressKind {
    /// Compare by dereferencing both sides through the store.
    Structural,
    /// Compare by syntactic identity of (space tag, identifier).
    Egal,
}

/// An address identifier within a store partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddrId {
    /// Concrete allocation: per-run monotonic counter.
    Seq(u64),
    /// Named identifier (parsed terms).
    Name(Arc<str>),
    /// Abstract allocation: deterministic in rule name, allocation
    /// site, and an optional client hint.
    Site {
        rule: Arc<str>,
        site: u32,
        hint: Option<Box<Term>>,
    },
}

impl fmt::Display for AddrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrId::Seq(n) => write!(f, "@{n}"),
            AddrId::Name(s) => write!(f, "{s}"),
            AddrId::Site { rule, site, hint } => {
                write!(f, "{rule}.{site}")?;
                if let Some(h) = hint {
                    write!(f, "[{h}]")?;
                }
                Ok(())
            }
        }
    }
}

/// A handle into a store partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    pub kind: AddressKind,
    /// Address-space tag selecting the store partition.
    pub space: Arc<str>,
    pub id: AddrId,
}

impl Address {
    pub fn egal(space: impl AsRef<str>, id: AddrId) -> Address {
        Address {
            kind: AddressKind::Egal,
            space: Arc::from(space.as_ref()),
            id,
        }
    }

    pub fn structural(space: impl AsRef<str>, id: AddrId) -> Address {
        Address {
            kind: AddressKind::Structural,
            space: Arc::from(space.as_ref()),
            id,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

// ─────────────────────────────────────────────────────────────────────
// External values
// ─────────────────────────────────────────────────────────────────────

/// A value of an external space, tagged with the space name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExternalValue {
    pub space: Arc<str>,
    pub payload: Box<Term>,
}

impl ExternalValue {
    pub fn new(space: impl AsRef<str>, payload: Term) -> ExternalValue {
        ExternalValue {
            space: Arc::from(space.as_ref()),
            payload: Box::new(payload),
        }
    }
}
