//! Atomic term values.
//!
//! Atoms are the leaves of the term model: numbers, booleans, symbols,
//! characters, and strings. Equality is structural, and every atom is
//! totally ordered and hashable so terms can key maps and populate sets.

use num_bigint::BigInt;
use std::fmt;
use std::sync::Arc;

/// An atomic value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Atom {
    /// Arbitrary-precision integer.
    Int(BigInt),
    /// Boolean.
    Bool(bool),
    /// Interned symbol.
    Sym(Arc<str>),
    /// Single character.
    Char(char),
    /// String.
    Str(Arc<str>),
}

impl Atom {
    /// Build an integer atom from anything convertible to a [`BigInt`].
    pub fn int(n: impl Into<BigInt>) -> Self {
        Atom::Int(n.into())
    }

    /// Build a symbol atom.
    pub fn sym(name: impl AsRef<str>) -> Self {
        Atom::Sym(Arc::from(name.as_ref()))
    }

    /// Build a string atom.
    pub fn str(s: impl AsRef<str>) -> Self {
        Atom::Str(Arc::from(s.as_ref()))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Int(n) => write!(f, "{n}"),
            Atom::Bool(true) => write!(f, "#t"),
            Atom::Bool(false) => write!(f, "#f"),
            Atom::Sym(s) => write!(f, "{s}"),
            Atom::Char(c) => write!(f, "#\\{c}"),
            Atom::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

impl From<bool> for Atom {
    fn from(b: bool) -> Self {
        Atom::Bool(b)
    }
}

impl From<i64> for Atom {
    fn from(n: i64) -> Self {
        Atom::Int(BigInt::from(n))
    }
}

impl From<char> for Atom {
    fn from(c: char) -> Self {
        Atom::Char(c)
    }
}
