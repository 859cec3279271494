//! The expression language of binding lists and right-hand sides.
//!
//! Expressions are pure except where noted in [`StoreEffects`]. Every
//! form computes a store-interaction classifier, a small bitset the
//! interpreter may use as an optimization hint (pure expressions can be
//! memoized, write-only ones turned into deltas); it never changes
//! observable behaviour.

use crate::pattern::Pattern;
use crate::term::AddressKind;
use std::ops::BitOr;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────
// Store-interaction classifier
// ─────────────────────────────────────────────────────────────────────

/// Bitset describing how an expression interacts with the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StoreEffects(u8);

impl StoreEffects {
    pub const NONE: StoreEffects = StoreEffects(0);
    /// Reads the store.
    pub const READ: StoreEffects = StoreEffects(1 << 0);
    /// Writes the store.
    pub const WRITE: StoreEffects = StoreEffects(1 << 1);
    /// Touches the cardinality map.
    pub const CARD: StoreEffects = StoreEffects(1 << 2);
    /// Allocates addresses.
    pub const ALLOC: StoreEffects = StoreEffects(1 << 3);
    /// May fan out into more than one result in some mode.
    pub const MANY: StoreEffects = StoreEffects(1 << 4);

    pub fn contains(self, other: StoreEffects) -> bool {
        self.0 & other.0 == other.0
    }

    /// Pure in the memoization sense: no writes, no allocation.
    pub fn is_pure(self) -> bool {
        !self.contains(StoreEffects::WRITE) && !self.contains(StoreEffects::ALLOC)
    }
}

impl BitOr for StoreEffects {
    type Output = StoreEffects;

    fn bitor(self, rhs: StoreEffects) -> StoreEffects {
        StoreEffects(self.0 | rhs.0)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

/// An allocation expression.
///
/// `kind` selects egal vs structural addresses; `hint` is the client
/// naming hint of the qualified forms. `site` is assigned in textual
/// order by [`crate::rule::Rule::new`] and keys abstract allocation.
#[derive(Debug, Clone)]
pub struct AllocExpr {
    pub space: Arc<str>,
    pub kind: AddressKind,
    pub hint: Option<Box<Expr>>,
    pub site: u32,
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Instantiate a pattern against the current environment.
    Term(Pattern),
    /// Literal boolean.
    Bool(bool),
    /// Look `key` up in the map bound to `map`; on a miss, evaluate
    /// `default` if present, otherwise error.
    MapLookup {
        map: Arc<str>,
        key: Box<Expr>,
        default: Option<Box<Expr>>,
    },
    /// A new map with `key ↦ value` added. `trust_strong` asserts the
    /// update is strong even when the key is an abstract address.
    MapExtend {
        map: Arc<str>,
        key: Box<Expr>,
        value: Box<Expr>,
        trust_strong: bool,
    },
    /// Read the store at an address.
    StoreLookup { addr: Box<Expr> },
    /// Scrutinize the guard; abstract may-truthiness explores both
    /// branches at quality `may`.
    If {
        guard: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
    /// Sequential binding list, then the body.
    Let {
        bindings: Vec<Binding>,
        body: Box<Expr>,
    },
    /// Term equality (abstract: possibly both booleans).
    Equal { lhs: Box<Expr>, rhs: Box<Expr> },
    /// Domain membership test on the map bound to `map`.
    InDom { map: Arc<str>, key: Box<Expr> },
    /// The empty set.
    EmptySet,
    /// Set membership test.
    InSet { set: Box<Expr>, elem: Box<Expr> },
    /// Union of set-valued sub-expressions.
    SetUnion(Vec<Expr>),
    /// Add elements to a set.
    SetAdd { set: Box<Expr>, elems: Vec<Expr> },
    /// Invoke a meta-function on an instantiated pattern.
    MfCall { name: Arc<str>, arg: Pattern },
    /// Select one element of a set-valued expression
    /// non-deterministically (one result per member in both modes).
    Choose(Box<Expr>),
    /// Allocate a fresh address.
    Alloc(AllocExpr),
    /// Escape hatch: the whole store as a raw dictionary.
    UnsafeStoreSpace,
    /// Escape hatch: one store partition as a raw dictionary.
    UnsafeStoreRef { space: Arc<str> },
}

impl Expr {
    pub fn term(pat: Pattern) -> Expr {
        Expr::Term(pat)
    }

    /// Instantiate a single variable reference.
    pub fn var(name: impl AsRef<str>) -> Expr {
        Expr::Term(Pattern::var(name))
    }

    pub fn map_lookup(map: impl AsRef<str>, key: Expr) -> Expr {
        Expr::MapLookup {
            map: Arc::from(map.as_ref()),
            key: Box::new(key),
            default: None,
        }
    }

    pub fn map_lookup_default(map: impl AsRef<str>, key: Expr, default: Expr) -> Expr {
        Expr::MapLookup {
            map: Arc::from(map.as_ref()),
            key: Box::new(key),
            default: Some(Box::new(default)),
        }
    }

    pub fn map_extend(map: impl AsRef<str>, key: Expr, value: Expr, trust_strong: bool) -> Expr {
        Expr::MapExtend {
            map: Arc::from(map.as_ref()),
            key: Box::new(key),
            value: Box::new(value),
            trust_strong,
        }
    }

    pub fn store_lookup(addr: Expr) -> Expr {
        Expr::StoreLookup {
            addr: Box::new(addr),
        }
    }

    pub fn if_(guard: Expr, then: Expr, els: Expr) -> Expr {
        Expr::If {
            guard: Box::new(guard),
            then: Box::new(then),
            els: Box::new(els),
        }
    }

    pub fn let_(bindings: Vec<Binding>, body: Expr) -> Expr {
        Expr::Let {
            bindings,
            body: Box::new(body),
        }
    }

    pub fn equal(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Equal {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn in_dom(map: impl AsRef<str>, key: Expr) -> Expr {
        Expr::InDom {
            map: Arc::from(map.as_ref()),
            key: Box::new(key),
        }
    }

    pub fn in_set(set: Expr, elem: Expr) -> Expr {
        Expr::InSet {
            set: Box::new(set),
            elem: Box::new(elem),
        }
    }

    pub fn set_add(set: Expr, elems: Vec<Expr>) -> Expr {
        Expr::SetAdd {
            set: Box::new(set),
            elems,
        }
    }

    pub fn call(name: impl AsRef<str>, arg: Pattern) -> Expr {
        Expr::MfCall {
            name: Arc::from(name.as_ref()),
            arg,
        }
    }

    pub fn choose(set: Expr) -> Expr {
        Expr::Choose(Box::new(set))
    }

    /// Allocate an egal address.
    pub fn malloc(space: impl AsRef<str>) -> Expr {
        Expr::Alloc(AllocExpr {
            space: Arc::from(space.as_ref()),
            kind: AddressKind::Egal,
            hint: None,
            site: 0,
        })
    }

    /// Allocate a structural address.
    pub fn salloc(space: impl AsRef<str>) -> Expr {
        Expr::Alloc(AllocExpr {
            space: Arc::from(space.as_ref()),
            kind: AddressKind::Structural,
            hint: None,
            site: 0,
        })
    }

    /// Allocate an egal address with an abstract naming hint.
    pub fn qmalloc(space: impl AsRef<str>, hint: Expr) -> Expr {
        Expr::Alloc(AllocExpr {
            space: Arc::from(space.as_ref()),
            kind: AddressKind::Egal,
            hint: Some(Box::new(hint)),
            site: 0,
        })
    }

    /// Allocate a structural address with an abstract naming hint.
    pub fn qsalloc(space: impl AsRef<str>, hint: Expr) -> Expr {
        Expr::Alloc(AllocExpr {
            space: Arc::from(space.as_ref()),
            kind: AddressKind::Structural,
            hint: Some(Box::new(hint)),
            site: 0,
        })
    }

    /// The store-interaction classifier for this expression.
    pub fn effects(&self) -> StoreEffects {
        match self {
            Expr::Term(_) | Expr::Bool(_) | Expr::EmptySet => StoreEffects::NONE,
            Expr::MapLookup { key, default, .. } => {
                let d = default
                    .as_ref()
                    .map(|e| e.effects())
                    .unwrap_or(StoreEffects::NONE);
                key.effects() | d
            }
            Expr::MapExtend { key, value, .. } => key.effects() | value.effects(),
            Expr::StoreLookup { addr } => {
                addr.effects() | StoreEffects::READ | StoreEffects::MANY
            }
            Expr::If { guard, then, els } => guard.effects() | then.effects() | els.effects(),
            Expr::Let { bindings, body } => {
                let mut fx = body.effects();
                for b in bindings {
                    fx = fx | b.effects();
                }
                fx
            }
            Expr::Equal { lhs, rhs } => lhs.effects() | rhs.effects() | StoreEffects::MANY,
            Expr::InDom { key, .. } => key.effects(),
            Expr::InSet { set, elem } => set.effects() | elem.effects(),
            Expr::SetUnion(exprs) => exprs
                .iter()
                .fold(StoreEffects::NONE, |fx, e| fx | e.effects()),
            Expr::SetAdd { set, elems } => elems
                .iter()
                .fold(set.effects(), |fx, e| fx | e.effects()),
            // A meta-function body is opaque here; assume everything.
            Expr::MfCall { .. } => {
                StoreEffects::READ
                    | StoreEffects::WRITE
                    | StoreEffects::CARD
                    | StoreEffects::ALLOC
                    | StoreEffects::MANY
            }
            Expr::Choose(set) => set.effects() | StoreEffects::MANY,
            Expr::Alloc(a) => {
                let h = a
                    .hint
                    .as_ref()
                    .map(|e| e.effects())
                    .unwrap_or(StoreEffects::NONE);
                h | StoreEffects::ALLOC | StoreEffects::CARD
            }
            Expr::UnsafeStoreSpace | Expr::UnsafeStoreRef { .. } => StoreEffects::READ,
        }
    }

    /// Assign allocation-site indices in textual order.
    pub(crate) fn assign_sites(&mut self, next: &mut u32) {
        match self {
            Expr::Term(_) | Expr::Bool(_) | Expr::EmptySet => {}
            Expr::MapLookup { key, default, .. } => {
                key.assign_sites(next);
                if let Some(d) = default {
                    d.assign_sites(next);
                }
            }
            Expr::MapExtend { key, value, .. } => {
                key.assign_sites(next);
                value.assign_sites(next);
            }
            Expr::StoreLookup { addr } => addr.assign_sites(next),
            Expr::If { guard, then, els } => {
                guard.assign_sites(next);
                then.assign_sites(next);
                els.assign_sites(next);
            }
            Expr::Let { bindings, body } => {
                for b in bindings {
                    b.assign_sites(next);
                }
                body.assign_sites(next);
            }
            Expr::Equal { lhs, rhs } => {
                lhs.assign_sites(next);
                rhs.assign_sites(next);
            }
            Expr::InDom { key, .. } => key.assign_sites(next),
            Expr::InSet { set, elem } => {
                set.assign_sites(next);
                elem.assign_sites(next);
            }
            Expr::SetUnion(exprs) => {
                for e in exprs {
                    e.assign_sites(next);
                }
            }
            Expr::SetAdd { set, elems } => {
                set.assign_sites(next);
                for e in elems {
                    e.assign_sites(next);
                }
            }
            Expr::MfCall { .. } => {}
            Expr::Choose(set) => set.assign_sites(next),
            Expr::Alloc(a) => {
                a.site = *next;
                *next += 1;
                if let Some(h) = &mut a.hint {
                    h.assign_sites(next);
                }
            }
            Expr::UnsafeStoreSpace | Expr::UnsafeStoreRef { .. } => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Binding lists
// ─────────────────────────────────────────────────────────────────────

/// One form of a binding list (used by `Let` bodies and rule side
/// conditions). Forms run in textual order; each form's store and count
/// updates thread into the next.
#[derive(Debug, Clone)]
pub enum Binding {
    /// Evaluate the expression, match the pattern against each result;
    /// failure prunes that branch.
    Bind { pat: Pattern, expr: Expr },
    /// Evaluate key and value, write the store. Produces no value
    /// binding. `trust_strong` forces a strong update at ω.
    StoreExtend {
        addr: Expr,
        value: Expr,
        trust_strong: bool,
    },
    /// Evaluate the expression; falsy prunes the branch.
    When(Expr),
}

impl Binding {
    pub fn bind(pat: Pattern, expr: Expr) -> Binding {
        Binding::Bind { pat, expr }
    }

    pub fn store_extend(addr: Expr, value: Expr) -> Binding {
        Binding::StoreExtend {
            addr,
            value,
            trust_strong: false,
        }
    }

    pub fn store_extend_strong(addr: Expr, value: Expr) -> Binding {
        Binding::StoreExtend {
            addr,
            value,
            trust_strong: true,
        }
    }

    pub fn when(expr: Expr) -> Binding {
        Binding::When(expr)
    }

    pub fn effects(&self) -> StoreEffects {
        match self {
            Binding::Bind { expr, .. } => expr.effects(),
            Binding::StoreExtend { addr, value, .. } => {
                addr.effects() | value.effects() | StoreEffects::WRITE | StoreEffects::CARD
            }
            Binding::When(expr) => expr.effects(),
        }
    }

    pub(crate) fn assign_sites(&mut self, next: &mut u32) {
        match self {
            Binding::Bind { expr, .. } => expr.assign_sites(next),
            Binding::StoreExtend { addr, value, .. } => {
                addr.assign_sites(next);
                value.assign_sites(next);
            }
            Binding::When(expr) => expr.assign_sites(next),
        }
    }
}
