//! Pattern-variable environments.
//!
//! An environment maps pattern-variable names to terms. It is
//! persistent: binding returns a new environment, so the matcher and
//! the binding-list evaluator can fan out without interference.

use opsem_lang::Term;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A persistent mapping from pattern-variable name to term.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Env {
    bindings: BTreeMap<Arc<str>, Term>,
}

impl Env {
    pub fn new() -> Env {
        Env::default()
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// A new environment with `name` bound to `term`.
    pub fn bind(&self, name: &Arc<str>, term: Term) -> Env {
        let mut bindings = self.bindings.clone();
        bindings.insert(Arc::clone(name), term);
        Env { bindings }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Term)> {
        self.bindings.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
