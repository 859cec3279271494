//! Spaces, variants, components, and language definitions.
//!
//! A language is a name plus a simultaneous mapping from space names to
//! spaces (mutual recursion allowed). Construction validates the whole
//! definition up front:
//! - every space reference resolves, and address references name address
//!   spaces
//! - same-named variants agree on arity language-wide
//! - address-space tags are unique
//! - every mutually recursive clique of user spaces agrees on its
//!   `trust_recursion` flag

use crate::atom::Atom;
use crate::card::{Cardinality, Ternary};
use crate::error::LangError;
use crate::term::Term;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// How precisely a qualified map component's domain is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DomainPrecision {
    /// Domain values are concrete; exact key equality is exact.
    Concrete,
    /// Domain values are abstractions but remain discrete (hash-safe).
    DiscreteAbstraction,
    /// Domain values may be abstract; equality needs a key scan.
    Abstract,
}

/// One component of a variant (or a raw space alternative).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    /// Values drawn from the named space.
    SpaceRef(Arc<str>),
    /// Values are addresses into the named address space's partition.
    AddrOf(Arc<str>),
    /// Finite map with the given domain and range components.
    Map {
        dom: Box<Component>,
        rng: Box<Component>,
    },
    /// Finite map with an explicit domain-precision qualifier.
    QMap {
        dom: Box<Component>,
        precision: DomainPrecision,
        rng: Box<Component>,
    },
    /// Finite set of values of the inner component.
    SetOf(Box<Component>),
    /// Trusted to admit any value.
    Anything,
}

impl Component {
    pub fn space(name: impl AsRef<str>) -> Component {
        Component::SpaceRef(Arc::from(name.as_ref()))
    }

    pub fn addr(space: impl AsRef<str>) -> Component {
        Component::AddrOf(Arc::from(space.as_ref()))
    }

    pub fn map(dom: Component, rng: Component) -> Component {
        Component::Map {
            dom: Box::new(dom),
            rng: Box::new(rng),
        }
    }

    pub fn qmap(dom: Component, precision: DomainPrecision, rng: Component) -> Component {
        Component::QMap {
            dom: Box::new(dom),
            precision,
            rng: Box::new(rng),
        }
    }

    pub fn set_of(inner: Component) -> Component {
        Component::SetOf(Box::new(inner))
    }
}

/// A variant descriptor: a name plus an ordered component sequence.
///
/// Descriptors are interned behind `Arc` at language construction, so
/// values, patterns, and the parser all share one allocation per variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantDesc {
    pub name: Arc<str>,
    pub components: Arc<[Component]>,
}

impl VariantDesc {
    pub fn new(name: impl AsRef<str>, components: Vec<Component>) -> Arc<VariantDesc> {
        Arc::new(VariantDesc {
            name: Arc::from(name.as_ref()),
            components: components.into(),
        })
    }

    pub fn arity(&self) -> usize {
        self.components.len()
    }
}

/// One alternative of a user space.
#[derive(Debug, Clone)]
pub enum Alternative {
    /// A variant constructor.
    Variant(Arc<VariantDesc>),
    /// Inclusion of another space.
    Ref(Arc<str>),
    /// A raw component (e.g. a map or set shape admitted directly).
    Comp(Component),
}

/// Membership predicate for an external space.
pub type ExternalPredicate = Arc<dyn Fn(&Term) -> bool + Send + Sync>;
/// Per-value cardinality for an external space.
pub type ExternalCardinality = Arc<dyn Fn(&Term) -> Cardinality + Send + Sync>;
/// Optional must/may equality oracle for an external space.
pub type ExternalEquality = Arc<dyn Fn(&Term, &Term) -> Ternary + Send + Sync>;

/// A space whose values are defined by an opaque membership predicate.
#[derive(Clone)]
pub struct ExternalSpace {
    pub name: Arc<str>,
    /// Membership test (boolean; the three-way lift lives in
    /// `special_equal` only).
    pub contains: ExternalPredicate,
    /// Cardinality of a single value under abstraction.
    pub cardinality: ExternalCardinality,
    /// Whether any value of this space ever has cardinality > 1.
    pub imprecise: bool,
    /// Equality oracle returning must-true / must-false / may.
    pub special_equal: Option<ExternalEquality>,
}

impl ExternalSpace {
    /// Build a precise external space from a membership predicate.
    /// Every value gets cardinality `1` and structural equality.
    pub fn precise(
        name: impl AsRef<str>,
        contains: impl Fn(&Term) -> bool + Send + Sync + 'static,
    ) -> ExternalSpace {
        ExternalSpace {
            name: Arc::from(name.as_ref()),
            contains: Arc::new(contains),
            cardinality: Arc::new(|_| Cardinality::One),
            imprecise: false,
            special_equal: None,
        }
    }

    /// The external space of integer atoms.
    pub fn integers() -> ExternalSpace {
        ExternalSpace::precise("Integer", |t| {
            matches!(t, Term::Atom(Atom::Int(_)))
        })
    }

    /// The external space of boolean atoms.
    pub fn booleans() -> ExternalSpace {
        ExternalSpace::precise("Boolean", |t| {
            matches!(t, Term::Atom(Atom::Bool(_)))
        })
    }

    /// The external space of symbol atoms.
    pub fn symbols() -> ExternalSpace {
        ExternalSpace::precise("Symbol", |t| matches!(t, Term::Atom(Atom::Sym(_))))
    }

    /// The external space of string atoms.
    pub fn strings() -> ExternalSpace {
        ExternalSpace::precise("String", |t| matches!(t, Term::Atom(Atom::Str(_))))
    }

    /// The external space of character atoms.
    pub fn characters() -> ExternalSpace {
        ExternalSpace::precise("Character", |t| {
            matches!(t, Term::Atom(Atom::Char(_)))
        })
    }
}

impl fmt::Debug for ExternalSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalSpace")
            .field("name", &self.name)
            .field("imprecise", &self.imprecise)
            .field("special_equal", &self.special_equal.is_some())
            .finish()
    }
}

/// A space: the universe a "type" of values is drawn from.
#[derive(Debug, Clone)]
pub enum Space {
    /// A list of alternatives, with a flag asserting finiteness under
    /// abstraction even if the definition is self-referential.
    User {
        alternatives: Vec<Alternative>,
        trust_recursion: bool,
    },
    /// The set of addresses stamped with `tag`.
    Address { tag: Arc<str> },
    /// Values defined by an opaque membership predicate.
    External(ExternalSpace),
}

impl Space {
    pub fn user(alternatives: Vec<Alternative>) -> Space {
        Space::User {
            alternatives,
            trust_recursion: false,
        }
    }

    pub fn user_trusted(alternatives: Vec<Alternative>) -> Space {
        Space::User {
            alternatives,
            trust_recursion: true,
        }
    }

    pub fn address(tag: impl AsRef<str>) -> Space {
        Space::Address {
            tag: Arc::from(tag.as_ref()),
        }
    }
}

/// A language: a name plus a simultaneous space-name scope.
#[derive(Debug, Clone)]
pub struct Language {
    pub name: Arc<str>,
    spaces: BTreeMap<Arc<str>, Space>,
}

impl Language {
    /// Build and validate a language definition.
    pub fn new(
        name: impl AsRef<str>,
        spaces: impl IntoIterator<Item = (String, Space)>,
    ) -> Result<Language, LangError> {
        let spaces: BTreeMap<Arc<str>, Space> = spaces
            .into_iter()
            .map(|(n, s)| (Arc::from(n.as_str()), s))
            .collect();
        let lang = Language {
            name: Arc::from(name.as_ref()),
            spaces,
        };
        lang.validate()?;
        Ok(lang)
    }

    /// Look up a space by name.
    pub fn space(&self, name: &str) -> Result<&Space, LangError> {
        self.spaces
            .get(name)
            .ok_or_else(|| LangError::UndefinedSpace(name.to_string()))
    }

    pub fn spaces(&self) -> impl Iterator<Item = (&Arc<str>, &Space)> {
        self.spaces.iter()
    }

    /// Find a variant descriptor by head name within a user space.
    pub fn variant_in(&self, space: &str, head: &str) -> Result<Option<Arc<VariantDesc>>, LangError> {
        match self.space(space)? {
            Space::User { alternatives, .. } => Ok(alternatives.iter().find_map(|alt| match alt {
                Alternative::Variant(desc) if &*desc.name == head => Some(Arc::clone(desc)),
                _ => None,
            })),
            _ => Ok(None),
        }
    }

    // ── Validation ────────────────────────────────────────────────────

    fn validate(&self) -> Result<(), LangError> {
        self.check_references()?;
        self.check_arities()?;
        self.check_address_tags()?;
        self.check_trust_recursion()
    }

    /// Every `SpaceRef` resolves; every `AddrOf` names an address space.
    fn check_references(&self) -> Result<(), LangError> {
        for (_, space) in self.spaces() {
            if let Space::User { alternatives, .. } = space {
                for alt in alternatives {
                    match alt {
                        Alternative::Variant(desc) => {
                            for comp in desc.components.iter() {
                                self.check_component(comp)?;
                            }
                        }
                        Alternative::Ref(name) => {
                            self.space(name)?;
                        }
                        Alternative::Comp(comp) => self.check_component(comp)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn check_component(&self, comp: &Component) -> Result<(), LangError> {
        match comp {
            Component::SpaceRef(name) => {
                self.space(name)?;
                Ok(())
            }
            Component::AddrOf(name) => match self.space(name)? {
                Space::Address { .. } => Ok(()),
                _ => Err(LangError::NotAnAddressSpace(name.to_string())),
            },
            Component::Map { dom, rng } => {
                self.check_component(dom)?;
                self.check_component(rng)
            }
            Component::QMap { dom, rng, .. } => {
                self.check_component(dom)?;
                self.check_component(rng)
            }
            Component::SetOf(inner) => self.check_component(inner),
            Component::Anything => Ok(()),
        }
    }

    /// Same-named variants must agree on arity across the language.
    fn check_arities(&self) -> Result<(), LangError> {
        let mut arities: BTreeMap<&str, usize> = BTreeMap::new();
        for (_, space) in self.spaces() {
            if let Space::User { alternatives, .. } = space {
                for alt in alternatives {
                    if let Alternative::Variant(desc) = alt {
                        match arities.get(&*desc.name) {
                            Some(&seen) if seen != desc.arity() => {
                                return Err(LangError::VariantArityConflict {
                                    variant: desc.name.to_string(),
                                    first: seen,
                                    second: desc.arity(),
                                });
                            }
                            _ => {
                                arities.insert(desc.name.as_ref(), desc.arity());
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Address-space tags are unique.
    fn check_address_tags(&self) -> Result<(), LangError> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for (_, space) in self.spaces() {
            if let Space::Address { tag } = space {
                if !seen.insert(tag.as_ref()) {
                    return Err(LangError::DuplicateAddressTag(tag.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Mutually recursive user spaces must agree on `trust_recursion`.
    fn check_trust_recursion(&self) -> Result<(), LangError> {
        let users: Vec<&Arc<str>> = self
            .spaces
            .iter()
            .filter(|(_, s)| matches!(s, Space::User { .. }))
            .map(|(n, _)| n)
            .collect();

        for a in &users {
            for b in &users {
                if a == b {
                    continue;
                }
                if self.reaches(a, b) && self.reaches(b, a) {
                    let (ta, tb) = (self.trust_flag(a), self.trust_flag(b));
                    if ta != tb {
                        return Err(LangError::TrustRecursionMismatch {
                            first: a.to_string(),
                            second: b.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn trust_flag(&self, name: &str) -> bool {
        matches!(
            self.spaces.get(name),
            Some(Space::User {
                trust_recursion: true,
                ..
            })
        )
    }

    /// Whether `from` references `to`, directly or transitively.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![from.to_string()];
        while let Some(cur) = stack.pop() {
            if !visited.insert(cur.clone()) {
                continue;
            }
            for next in self.direct_refs(&cur) {
                if next == to {
                    return true;
                }
                stack.push(next);
            }
        }
        false
    }

    /// Space names referenced directly from `name`'s alternatives.
    fn direct_refs(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(Space::User { alternatives, .. }) = self.spaces.get(name) {
            for alt in alternatives {
                match alt {
                    Alternative::Variant(desc) => {
                        for comp in desc.components.iter() {
                            component_refs(comp, &mut out);
                        }
                    }
                    Alternative::Ref(n) => out.push(n.to_string()),
                    Alternative::Comp(comp) => component_refs(comp, &mut out),
                }
            }
        }
        out
    }
}

fn component_refs(comp: &Component, out: &mut Vec<String>) {
    match comp {
        Component::SpaceRef(n) => out.push(n.to_string()),
        Component::AddrOf(_) | Component::Anything => {}
        Component::Map { dom, rng } | Component::QMap { dom, rng, .. } => {
            component_refs(dom, out);
            component_refs(rng, out);
        }
        Component::SetOf(inner) => component_refs(inner, out),
    }
}
