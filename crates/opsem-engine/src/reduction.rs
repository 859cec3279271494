//! The reduction relation: one-step application and fixed points.
//!
//! `apply` is the union over all rules of their applications. The
//! fixed-point driver explores every non-deterministic branch with a
//! worklist and returns the set of normal forms (states whose image
//! under `apply` is empty). The memoized variant keeps a visited set
//! keyed on whole states and returns nothing for a revisit, giving a
//! complete exploration without repeats — and termination on cyclic
//! reduction graphs, which the unmemoized driver only leaves via the
//! step budget.

use crate::error::{EvalError, EvalResult};
use crate::eval::{Ctx, Effs};
use crate::rules::apply_rule;
use opsem_lang::{Cardinality, Counts, Rule, Store, Term};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// A concrete state: a term plus a store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct State {
    pub term: Term,
    pub store: Store,
}

impl State {
    pub fn new(term: Term) -> State {
        State {
            term,
            store: Store::new(),
        }
    }

    pub fn with_store(term: Term, store: Store) -> State {
        State { term, store }
    }
}

/// An abstract state: a term, a store, and per-address cardinality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbsState {
    pub term: Term,
    pub store: Store,
    pub counts: Counts,
}

impl AbsState {
    pub fn new(term: Term) -> AbsState {
        AbsState {
            term,
            store: Store::new(),
            counts: Counts::new(),
        }
    }

    /// Sanity check: every address reachable from the term or from a
    /// stored value carries a count of at least one.
    pub fn counts_cover_reachable(&self) -> bool {
        let term_ok = self
            .term
            .addresses()
            .iter()
            .all(|a| self.counts.get(a) >= Cardinality::One);
        let store_ok = self
            .store
            .terms()
            .all(|t| t.addresses().iter().all(|a| self.counts.get(a) >= Cardinality::One));
        term_ok && store_ok
    }
}

/// The union over all rules of one-step applications.
pub(crate) fn step_all(
    cx: &Ctx<'_>,
    rules: &[Rule],
    term: &Term,
    store: &Store,
    counts: &Counts,
) -> EvalResult<Effs> {
    let mut out = Effs::new();
    for rule in rules {
        out.extend(apply_rule(cx, rule, term, store, counts)?);
    }
    Ok(out)
}

/// Worklist fixed point over `(term, store, counts)` triples.
///
/// With `memo`, revisited states are dropped; without it, a cyclic
/// reduction graph only terminates through `max_steps`.
pub(crate) fn explore(
    cx: &Ctx<'_>,
    rules: &[Rule],
    start: (Term, Store, Counts),
    memo: bool,
    max_steps: Option<u64>,
) -> EvalResult<BTreeSet<(Term, Store, Counts)>> {
    let mut normal = BTreeSet::new();
    let mut visited: HashSet<(Term, Store, Counts)> = HashSet::new();
    let mut worklist = vec![start];
    let mut steps: u64 = 0;

    while let Some(state) = worklist.pop() {
        if memo && !visited.insert(state.clone()) {
            continue;
        }
        steps += 1;
        if let Some(limit) = max_steps {
            if steps > limit {
                return Err(EvalError::StepLimitExceeded { limit });
            }
        }
        trace!(steps, frontier = worklist.len(), "exploring state");

        let (term, store, counts) = &state;
        let succs = step_all(cx, rules, term, store, counts)?;
        if succs.is_empty() {
            normal.insert(state);
        } else {
            for s in succs {
                worklist.push((s.value, s.store, s.counts));
            }
        }
    }
    debug!(steps, normal_forms = normal.len(), "fixed point reached");
    Ok(normal)
}
