//! Matching patterns.
//!
//! Patterns are the left-hand-side language: they bind variables,
//! reference earlier bindings, and destructure variant values. The
//! fully-evaluated counterpart lives in [`crate::term`].

use crate::atom::Atom;
use crate::space::VariantDesc;
use std::sync::Arc;

/// Quantifier for recursive meta-function argument positions.
///
/// Only consulted by the abstract matcher when the quantified pattern
/// meets a structural address; concrete matching strips the wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// Every denotation of the address must match, with identical
    /// bindings.
    All,
    /// Some denotation matches; one result row per denotation.
    Exists,
}

/// A matching form.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Bind `name` to the matched value, optionally checking membership
    /// in a space first. A second occurrence of a bound name
    /// equal-matches the existing binding (non-linear patterns).
    Bind {
        name: Arc<str>,
        space: Option<Arc<str>>,
    },
    /// Reference an existing binding and equal-match it. Meaningful in
    /// right-hand sides and side conditions; unbound references are
    /// structural errors.
    Ref(Arc<str>),
    /// Match a variant value with the same name, then the children
    /// pairwise.
    Variant {
        desc: Arc<VariantDesc>,
        children: Vec<Pattern>,
    },
    /// Equal-match an atom.
    Atom(Atom),
    /// Quantified recursive position (meta-function arguments only).
    Quantified {
        quantifier: Quantifier,
        inner: Box<Pattern>,
    },
    /// Set destructuring: one element plus the rest of the set.
    /// Declared but not implemented — the matcher rejects it. The
    /// semantics of destructuring may-present entries is unsettled.
    SetWith {
        element: Box<Pattern>,
        rest: Box<Pattern>,
    },
    /// Map destructuring: one entry plus the rest of the map. Declared
    /// but not implemented, as for [`Pattern::SetWith`].
    MapWith {
        key: Box<Pattern>,
        value: Box<Pattern>,
        rest: Box<Pattern>,
    },
}

impl Pattern {
    /// Bind a variable with no space check.
    pub fn bind(name: impl AsRef<str>) -> Pattern {
        Pattern::Bind {
            name: Arc::from(name.as_ref()),
            space: None,
        }
    }

    /// Bind a variable after a membership check against `space`.
    pub fn bind_in(name: impl AsRef<str>, space: impl AsRef<str>) -> Pattern {
        Pattern::Bind {
            name: Arc::from(name.as_ref()),
            space: Some(Arc::from(space.as_ref())),
        }
    }

    /// Reference an existing binding.
    pub fn var(name: impl AsRef<str>) -> Pattern {
        Pattern::Ref(Arc::from(name.as_ref()))
    }

    pub fn variant(desc: &Arc<VariantDesc>, children: Vec<Pattern>) -> Pattern {
        Pattern::Variant {
            desc: Arc::clone(desc),
            children,
        }
    }

    pub fn int(n: impl Into<num_bigint::BigInt>) -> Pattern {
        Pattern::Atom(Atom::Int(n.into()))
    }

    pub fn bool(b: bool) -> Pattern {
        Pattern::Atom(Atom::Bool(b))
    }

    pub fn sym(name: impl AsRef<str>) -> Pattern {
        Pattern::Atom(Atom::sym(name))
    }

    pub fn quantified(quantifier: Quantifier, inner: Pattern) -> Pattern {
        Pattern::Quantified {
            quantifier,
            inner: Box::new(inner),
        }
    }
}
