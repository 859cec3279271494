//! Reduction rules and meta-functions.

use crate::card::Counts;
use crate::expr::Binding;
use crate::pattern::Pattern;
use crate::store::Store;
use crate::term::Term;
use std::fmt;
use std::sync::Arc;

/// One row of a reduction relation.
///
/// Applying a rule to `(term, store)`: match `lhs` against the term,
/// evaluate the binding list threading store updates, then instantiate
/// `rhs` under each surviving environment. The rule name is surfaced to
/// allocation so abstract addresses can depend on it.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: Arc<str>,
    pub lhs: Pattern,
    pub rhs: Pattern,
    pub bindings: Vec<Binding>,
}

impl Rule {
    /// Build a rule, assigning allocation-site indices to every
    /// allocation expression in textual order.
    pub fn new(
        name: impl AsRef<str>,
        lhs: Pattern,
        rhs: Pattern,
        mut bindings: Vec<Binding>,
    ) -> Rule {
        let mut next = 0u32;
        for b in &mut bindings {
            b.assign_sites(&mut next);
        }
        Rule {
            name: Arc::from(name.as_ref()),
            lhs,
            rhs,
            bindings,
        }
    }
}

/// Trusted concrete implementation of a meta-function: receives the
/// store and the instantiated argument, returns effectful results.
pub type TrustedConcrete =
    Arc<dyn Fn(&Store, &Term) -> Result<Vec<(Term, Store)>, String> + Send + Sync>;

/// Trusted abstract implementation: additionally threads the counts.
pub type TrustedAbstract = Arc<
    dyn Fn(&Store, &Counts, &Term) -> Result<Vec<(Term, Store, Counts)>, String> + Send + Sync,
>;

/// A named, rule-defined function callable from expressions.
///
/// If a trusted implementation exists for the current mode it is invoked
/// directly; otherwise the first rule whose LHS matches the argument is
/// applied and its non-empty result set returned.
#[derive(Clone)]
pub struct MetaFun {
    pub name: Arc<str>,
    pub rules: Vec<Rule>,
    pub trusted_concrete: Option<TrustedConcrete>,
    pub trusted_abstract: Option<TrustedAbstract>,
}

impl MetaFun {
    pub fn new(name: impl AsRef<str>, rules: Vec<Rule>) -> MetaFun {
        MetaFun {
            name: Arc::from(name.as_ref()),
            rules,
            trusted_concrete: None,
            trusted_abstract: None,
        }
    }

    pub fn with_trusted_concrete(mut self, imp: TrustedConcrete) -> MetaFun {
        self.trusted_concrete = Some(imp);
        self
    }

    pub fn with_trusted_abstract(mut self, imp: TrustedAbstract) -> MetaFun {
        self.trusted_abstract = Some(imp);
        self
    }
}

impl fmt::Debug for MetaFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaFun")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .field("trusted_concrete", &self.trusted_concrete.is_some())
            .field("trusted_abstract", &self.trusted_abstract.is_some())
            .finish()
    }
}
