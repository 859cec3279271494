//! The pattern matcher.
//!
//! One core matches a pattern against a term under an environment and a
//! store, producing a deduplicated set of `(environment, quality)` rows.
//! The concrete wrapper insists on at most one row at quality `must`.
//!
//! Non-determinism enters in abstract mode: a structural address whose
//! slot holds several denotations matches each of them at quality `may`,
//! and equality checks the abstraction cannot decide produce `may` rows.
//! Match failure is silent — an empty row set, never an error.
//!
//! Policy (pinned by tests): variant and atom patterns match *through*
//! a structural address by dereferencing; binders capture the address
//! itself, falling back to the dereferenced contents when a space check
//! rejects the address.

use crate::env::Env;
use crate::equal::{equal_abstract, equal_concrete};
use crate::error::{EvalError, EvalResult};
use crate::machine::Mode;
use opsem_lang::{
    in_space, Address, AddressKind, Counts, Language, Pattern, Quantifier, Store, Term, Ternary,
};
use std::collections::BTreeSet;

/// Whether a result follows definitely or only possibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quality {
    Must,
    May,
}

impl Quality {
    /// `May` is absorbing: the whole match collapses at the first
    /// `may` step.
    pub fn join(self, other: Quality) -> Quality {
        if self == Quality::Must && other == Quality::Must {
            Quality::Must
        } else {
            Quality::May
        }
    }
}

/// Deduplicated match results.
pub type Matches = BTreeSet<(Env, Quality)>;

/// Matcher inputs that stay fixed across the recursion.
pub(crate) struct MatchIn<'a> {
    pub lang: &'a Language,
    pub mode: Mode,
    pub store: &'a Store,
    pub counts: &'a Counts,
}

/// Deterministic concrete match: `None` on failure, one extended
/// environment on success.
pub fn match_concrete(
    lang: &Language,
    store: &Store,
    pat: &Pattern,
    term: &Term,
    env: &Env,
) -> EvalResult<Option<Env>> {
    let counts = Counts::new();
    let m = MatchIn {
        lang,
        mode: Mode::Concrete,
        store,
        counts: &counts,
    };
    let rows = match_pattern(&m, pat, term, env)?;
    if rows.len() > 1 {
        return Err(EvalError::Internal(
            "concrete match produced multiple environments".to_string(),
        ));
    }
    Ok(rows.into_iter().next().map(|(env, _)| env))
}

/// Match a pattern against a term, fanning out as the mode allows.
pub(crate) fn match_pattern(
    m: &MatchIn<'_>,
    pat: &Pattern,
    term: &Term,
    env: &Env,
) -> EvalResult<Matches> {
    match pat {
        Pattern::Bind { name, space } => {
            if let Some(prev) = env.get(name) {
                // Non-linear occurrence: equal-match the prior binding.
                return equal_rows(m, prev, term, env);
            }
            match space {
                None => Ok(one(env.bind(name, term.clone()), Quality::Must)),
                Some(sp) => {
                    if in_space(m.lang, sp, term)? {
                        return Ok(one(env.bind(name, term.clone()), Quality::Must));
                    }
                    // A structural address outside the space binds its
                    // contents instead.
                    if let Some(addr) = structural(term) {
                        let (denots, penalty) = denotations(m, addr)?;
                        let mut rows = Matches::new();
                        for d in &denots {
                            if in_space(m.lang, sp, d)? {
                                rows.insert((env.bind(name, d.clone()), penalty));
                            }
                        }
                        return Ok(rows);
                    }
                    Ok(Matches::new())
                }
            }
        }

        Pattern::Ref(name) => {
            let prev = env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnboundVariable(name.to_string()))?;
            equal_rows(m, &prev, term, env)
        }

        Pattern::Atom(atom) => equal_rows(m, &Term::Atom(atom.clone()), term, env),

        Pattern::Variant { desc, children } => match term {
            Term::Variant(v) => {
                if v.desc.name != desc.name || v.arity() != desc.arity() {
                    return Ok(Matches::new());
                }
                if children.len() != desc.arity() {
                    return Err(EvalError::ArityMismatch {
                        variant: desc.name.to_string(),
                        expected: desc.arity(),
                        got: children.len(),
                    });
                }
                let mut rows = one(env.clone(), Quality::Must);
                for (child, field) in children.iter().zip(v.fields.iter()) {
                    let mut next = Matches::new();
                    for (env, q) in &rows {
                        for (env2, q2) in match_pattern(m, child, field, env)? {
                            next.insert((env2, q.join(q2)));
                        }
                    }
                    if next.is_empty() {
                        return Ok(next);
                    }
                    rows = next;
                }
                Ok(rows)
            }
            _ => through_structural(m, pat, term, env),
        },

        Pattern::Quantified { quantifier, inner } => {
            if m.mode == Mode::Concrete {
                return match_pattern(m, inner, term, env);
            }
            let addr = match structural(term) {
                Some(addr) => addr,
                None => return match_pattern(m, inner, term, env),
            };
            let (denots, penalty) = denotations(m, addr)?;
            match quantifier {
                Quantifier::Exists => {
                    let mut rows = Matches::new();
                    for d in &denots {
                        for (env2, q) in match_pattern(m, inner, d, env)? {
                            rows.insert((env2, q.join(penalty)));
                        }
                    }
                    Ok(rows)
                }
                Quantifier::All => {
                    // Every denotation must match, with identical
                    // bindings across denotations.
                    let mut acc: Option<Matches> = None;
                    for d in &denots {
                        let rows = match_pattern(m, inner, d, env)?;
                        if rows.is_empty() {
                            return Ok(Matches::new());
                        }
                        acc = Some(match acc {
                            None => rows,
                            Some(prev) => intersect(prev, rows),
                        });
                    }
                    Ok(acc.unwrap_or_default())
                }
            }
        }

        Pattern::SetWith { .. } => Err(EvalError::UnsupportedPattern("set-with")),
        Pattern::MapWith { .. } => Err(EvalError::UnsupportedPattern("map-with")),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn one(env: Env, q: Quality) -> Matches {
    let mut rows = Matches::new();
    rows.insert((env, q));
    rows
}

fn structural(term: &Term) -> Option<&Address> {
    match term {
        Term::Addr(a) if a.kind == AddressKind::Structural => Some(a),
        _ => None,
    }
}

/// The values a structural address may stand for, plus the quality
/// penalty for having more than one.
fn denotations(m: &MatchIn<'_>, addr: &Address) -> EvalResult<(Vec<Term>, Quality)> {
    let slot = m
        .store
        .slot(addr)
        .ok_or_else(|| EvalError::UnmappedAddress(addr.clone()))?;
    if m.mode == Mode::Concrete && slot.len() != 1 {
        return Err(EvalError::Internal(
            "concrete store slot holds several denotations".to_string(),
        ));
    }
    let penalty = if slot.len() > 1 {
        Quality::May
    } else {
        Quality::Must
    };
    Ok((slot.iter().cloned().collect(), penalty))
}

/// Retry a pattern through a structural address's denotations.
fn through_structural(
    m: &MatchIn<'_>,
    pat: &Pattern,
    term: &Term,
    env: &Env,
) -> EvalResult<Matches> {
    let addr = match structural(term) {
        Some(addr) => addr,
        None => return Ok(Matches::new()),
    };
    let (denots, penalty) = denotations(m, addr)?;
    let mut rows = Matches::new();
    for d in &denots {
        for (env2, q) in match_pattern(m, pat, d, env)? {
            rows.insert((env2, q.join(penalty)));
        }
    }
    Ok(rows)
}

/// Equal-match: the rows produced by comparing two terms under the
/// current mode's equality.
fn equal_rows(m: &MatchIn<'_>, a: &Term, b: &Term, env: &Env) -> EvalResult<Matches> {
    match m.mode {
        Mode::Concrete => {
            if equal_concrete(m.lang, m.store, a, b)? {
                Ok(one(env.clone(), Quality::Must))
            } else {
                Ok(Matches::new())
            }
        }
        Mode::Abstract => match equal_abstract(m.lang, m.store, m.counts, a, b)? {
            Ternary::True => Ok(one(env.clone(), Quality::Must)),
            Ternary::False => Ok(Matches::new()),
            Ternary::Unknown => Ok(one(env.clone(), Quality::May)),
        },
    }
}

/// Environments present in both row sets, qualities joined.
fn intersect(a: Matches, b: Matches) -> Matches {
    let mut out = Matches::new();
    for (env, qa) in &a {
        for (env2, qb) in &b {
            if env == env2 {
                out.insert((env.clone(), qa.join(*qb)));
            }
        }
    }
    out
}
