//! The expression evaluator.
//!
//! Evaluation takes `(expression, environment, store, counts)` and
//! returns a *set* of effectful results `(value, store, counts,
//! quality)`. Sub-expressions evaluate left to right and each
//! sub-result's store threads into the next sub-expression, so one
//! expression fans out into the product of its sub-results. Result
//! ordering is unspecified; the set is deduplicated.

use crate::alloc::{self, AddrGen};
use crate::env::Env;
use crate::equal::{equal_abstract, equal_concrete};
use crate::error::{EvalError, EvalResult};
use crate::machine::Mode;
use crate::matcher::{match_pattern, MatchIn, Quality};
use crate::metafun;
use opsem_lang::{
    Binding, Counts, Expr, Language, MapClass, MapValue, MetaFun, Pattern, Space, Store, Term,
    Ternary,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Evaluator context: everything that stays fixed during one rule
/// application.
pub(crate) struct Ctx<'a> {
    pub lang: &'a Language,
    pub metafuns: &'a BTreeMap<Arc<str>, MetaFun>,
    pub mode: Mode,
    pub gensym: &'a AddrGen,
    /// Current rule name, surfaced to abstract allocation.
    pub rule_name: Arc<str>,
}

impl<'a> Ctx<'a> {
    /// The same context under another rule's name.
    pub fn for_rule(&self, name: &Arc<str>) -> Ctx<'a> {
        Ctx {
            lang: self.lang,
            metafuns: self.metafuns,
            mode: self.mode,
            gensym: self.gensym,
            rule_name: Arc::clone(name),
        }
    }

    pub(crate) fn match_in<'s>(&'s self, store: &'s Store, counts: &'s Counts) -> MatchIn<'s> {
        MatchIn {
            lang: self.lang,
            mode: self.mode,
            store,
            counts,
        }
    }
}

/// One effectful result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Eff {
    pub value: Term,
    pub store: Store,
    pub counts: Counts,
    pub quality: Quality,
}

/// A deduplicated result set.
pub type Effs = BTreeSet<Eff>;

/// Collect results into a deduplicated set.
pub(crate) fn eff_set(results: impl IntoIterator<Item = Eff>) -> Effs {
    results.into_iter().collect()
}

/// One surviving branch of a binding list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct BindRow {
    pub env: Env,
    pub store: Store,
    pub counts: Counts,
    pub quality: Quality,
}

fn eff(value: Term, store: &Store, counts: &Counts, quality: Quality) -> Eff {
    Eff {
        value,
        store: store.clone(),
        counts: counts.clone(),
        quality,
    }
}

// ─────────────────────────────────────────────────────────────────────
// Expression evaluation
// ─────────────────────────────────────────────────────────────────────

pub(crate) fn eval_expr(
    cx: &Ctx<'_>,
    expr: &Expr,
    env: &Env,
    store: &Store,
    counts: &Counts,
) -> EvalResult<Effs> {
    match expr {
        Expr::Term(pat) => {
            let value = instantiate(pat, env)?;
            Ok(BTreeSet::from([eff(value, store, counts, Quality::Must)]))
        }

        Expr::Bool(b) => Ok(BTreeSet::from([eff(
            Term::bool(*b),
            store,
            counts,
            Quality::Must,
        )])),

        Expr::MapLookup { map, key, default } => {
            let mapv = map_of(env, map)?;
            let mut out = Effs::new();
            let args = [key.as_ref().clone()];
            for (vals, st, ct, q) in eval_list(cx, &args, env, store, counts)? {
                let key_val = &vals[0];
                match lookup(cx, &mapv, key_val, &st, &ct)? {
                    Lookup::Hit(rows) => {
                        for (v, lq) in rows {
                            out.insert(eff(v, &st, &ct, q.join(lq)));
                        }
                    }
                    Lookup::Maybe(rows) => {
                        for (v, lq) in &rows {
                            out.insert(eff(v.clone(), &st, &ct, q.join(*lq)));
                        }
                        if let Some(def) = default {
                            for d in eval_expr(cx, def, env, &st, &ct)? {
                                out.insert(Eff {
                                    quality: q.join(d.quality).join(Quality::May),
                                    ..d
                                });
                            }
                        }
                    }
                    Lookup::Miss => match default {
                        Some(def) => {
                            for d in eval_expr(cx, def, env, &st, &ct)? {
                                out.insert(Eff {
                                    quality: q.join(d.quality),
                                    ..d
                                });
                            }
                        }
                        None => {
                            return Err(EvalError::MissingKey {
                                key: key_val.clone(),
                            })
                        }
                    },
                }
            }
            Ok(out)
        }

        Expr::MapExtend {
            map,
            key,
            value,
            trust_strong,
        } => {
            let mapv = map_of(env, map)?;
            let mut out = Effs::new();
            let args = [key.as_ref().clone(), value.as_ref().clone()];
            for (vals, st, ct, q) in eval_list(cx, &args, env, store, counts)? {
                for (m2, eq) in extend(cx, &mapv, &vals[0], &vals[1], *trust_strong, &st, &ct)? {
                    out.insert(eff(Term::Map(m2), &st, &ct, q.join(eq)));
                }
            }
            Ok(out)
        }

        Expr::StoreLookup { addr } => {
            let mut out = Effs::new();
            let args = [addr.as_ref().clone()];
            for (vals, st, ct, q) in eval_list(cx, &args, env, store, counts)? {
                let a = match &vals[0] {
                    Term::Addr(a) => a.clone(),
                    other => return Err(EvalError::NotAnAddress(other.clone())),
                };
                let slot = st
                    .slot(&a)
                    .ok_or_else(|| EvalError::UnmappedAddress(a.clone()))?;
                match cx.mode {
                    Mode::Concrete => {
                        let v = st
                            .one(&a)
                            .ok_or_else(|| EvalError::UnmappedAddress(a.clone()))?;
                        out.insert(eff(v.clone(), &st, &ct, q));
                    }
                    Mode::Abstract => {
                        let penalty = if slot.len() > 1 {
                            Quality::May
                        } else {
                            Quality::Must
                        };
                        for v in slot.clone() {
                            out.insert(eff(v, &st, &ct, q.join(penalty)));
                        }
                    }
                }
            }
            Ok(out)
        }

        Expr::If { guard, then, els } => {
            let mut out = Effs::new();
            for g in eval_expr(cx, guard, env, store, counts)? {
                for (truth, tq) in truthiness(cx, &g.store, &g.value)? {
                    let branch = if truth { then } else { els };
                    for b in eval_expr(cx, branch, env, &g.store, &g.counts)? {
                        out.insert(Eff {
                            quality: g.quality.join(tq).join(b.quality),
                            ..b
                        });
                    }
                }
            }
            Ok(out)
        }

        Expr::Let { bindings, body } => {
            let mut out = Effs::new();
            for row in run_bindings(cx, bindings, env, store, counts)? {
                for b in eval_expr(cx, body, &row.env, &row.store, &row.counts)? {
                    out.insert(Eff {
                        quality: row.quality.join(b.quality),
                        ..b
                    });
                }
            }
            Ok(out)
        }

        Expr::Equal { lhs, rhs } => {
            let mut out = Effs::new();
            let args = [lhs.as_ref().clone(), rhs.as_ref().clone()];
            for (vals, st, ct, q) in eval_list(cx, &args, env, store, counts)? {
                for (b, eq) in bool_rows(cx, &st, &ct, &vals[0], &vals[1])? {
                    out.insert(eff(Term::bool(b), &st, &ct, q.join(eq)));
                }
            }
            Ok(out)
        }

        Expr::InDom { map, key } => {
            let mapv = map_of(env, map)?;
            let mut out = Effs::new();
            let args = [key.as_ref().clone()];
            for (vals, st, ct, q) in eval_list(cx, &args, env, store, counts)? {
                match lookup(cx, &mapv, &vals[0], &st, &ct)? {
                    Lookup::Hit(_) => {
                        out.insert(eff(Term::bool(true), &st, &ct, q));
                    }
                    Lookup::Miss => {
                        out.insert(eff(Term::bool(false), &st, &ct, q));
                    }
                    Lookup::Maybe(_) => {
                        out.insert(eff(Term::bool(true), &st, &ct, q.join(Quality::May)));
                        out.insert(eff(Term::bool(false), &st, &ct, q.join(Quality::May)));
                    }
                }
            }
            Ok(out)
        }

        Expr::EmptySet => Ok(BTreeSet::from([eff(
            Term::empty_set(),
            store,
            counts,
            Quality::Must,
        )])),

        Expr::InSet { set, elem } => {
            let mut out = Effs::new();
            let args = [set.as_ref().clone(), elem.as_ref().clone()];
            for (vals, st, ct, q) in eval_list(cx, &args, env, store, counts)? {
                let members = vals[0]
                    .as_set()
                    .ok_or_else(|| EvalError::NotASet(vals[0].clone()))?;
                let mut acc = Ternary::False;
                for e in members {
                    acc = acc.or(ternary_equal(cx, &st, &ct, e, &vals[1])?);
                    if acc.is_true() {
                        break;
                    }
                }
                match acc {
                    Ternary::True => {
                        out.insert(eff(Term::bool(true), &st, &ct, q));
                    }
                    Ternary::False => {
                        out.insert(eff(Term::bool(false), &st, &ct, q));
                    }
                    Ternary::Unknown => {
                        out.insert(eff(Term::bool(true), &st, &ct, q.join(Quality::May)));
                        out.insert(eff(Term::bool(false), &st, &ct, q.join(Quality::May)));
                    }
                }
            }
            Ok(out)
        }

        Expr::SetUnion(exprs) => {
            let mut out = Effs::new();
            for (vals, st, ct, q) in eval_list(cx, exprs, env, store, counts)? {
                let mut union = BTreeSet::new();
                for v in &vals {
                    let s = v.as_set().ok_or_else(|| EvalError::NotASet(v.clone()))?;
                    union.extend(s.iter().cloned());
                }
                out.insert(eff(Term::Set(union), &st, &ct, q));
            }
            Ok(out)
        }

        Expr::SetAdd { set, elems } => {
            let mut args = vec![set.as_ref().clone()];
            args.extend(elems.iter().cloned());
            let mut out = Effs::new();
            for (vals, st, ct, q) in eval_list(cx, &args, env, store, counts)? {
                let mut s = vals[0]
                    .as_set()
                    .ok_or_else(|| EvalError::NotASet(vals[0].clone()))?
                    .clone();
                s.extend(vals[1..].iter().cloned());
                out.insert(eff(Term::Set(s), &st, &ct, q));
            }
            Ok(out)
        }

        Expr::MfCall { name, arg } => {
            let arg_val = instantiate(arg, env)?;
            metafun::call(cx, name, &arg_val, store, counts)
        }

        Expr::Choose(set) => {
            let mut out = Effs::new();
            for row in eval_expr(cx, set, env, store, counts)? {
                let members = row
                    .value
                    .as_set()
                    .ok_or_else(|| EvalError::NotASet(row.value.clone()))?;
                for v in members {
                    out.insert(eff(v.clone(), &row.store, &row.counts, row.quality));
                }
            }
            Ok(out)
        }

        Expr::Alloc(a) => {
            let tag = match cx.lang.space(&a.space)? {
                Space::Address { tag } => Arc::clone(tag),
                _ => return Err(EvalError::NotAnAddressSpace(a.space.to_string())),
            };
            let mut out = Effs::new();
            let hints: Vec<(Option<Term>, Store, Counts, Quality)> = match &a.hint {
                Some(h) => eval_list(cx, &[h.as_ref().clone()], env, store, counts)?
                    .into_iter()
                    .map(|(mut vals, st, ct, q)| (Some(vals.remove(0)), st, ct, q))
                    .collect(),
                None => vec![(None, store.clone(), counts.clone(), Quality::Must)],
            };
            for (hint, st, ct, q) in hints {
                match cx.mode {
                    Mode::Concrete => {
                        let addr = alloc::concrete(cx.gensym, &tag, a.kind);
                        out.insert(eff(Term::Addr(addr), &st, &ct, q));
                    }
                    Mode::Abstract => {
                        let addr = alloc::site(&cx.rule_name, a.site, hint, &tag, a.kind);
                        let ct2 = ct.bump(&addr);
                        out.insert(eff(Term::Addr(addr), &st, &ct2, q));
                    }
                }
            }
            Ok(out)
        }

        Expr::UnsafeStoreSpace => Ok(BTreeSet::from([eff(
            store.as_term(),
            store,
            counts,
            Quality::Must,
        )])),

        Expr::UnsafeStoreRef { space } => {
            let tag = match cx.lang.space(space)? {
                Space::Address { tag } => Arc::clone(tag),
                _ => return Err(EvalError::NotAnAddressSpace(space.to_string())),
            };
            Ok(BTreeSet::from([eff(
                store.partition_as_term(&tag),
                store,
                counts,
                Quality::Must,
            )]))
        }
    }
}

/// Evaluate expressions left to right, threading stores and counts.
/// Each row pairs the collected values with the final store state.
fn eval_list(
    cx: &Ctx<'_>,
    exprs: &[Expr],
    env: &Env,
    store: &Store,
    counts: &Counts,
) -> EvalResult<Vec<(Vec<Term>, Store, Counts, Quality)>> {
    let mut rows = vec![(Vec::new(), store.clone(), counts.clone(), Quality::Must)];
    for e in exprs {
        let mut next = Vec::new();
        for (vals, st, ct, q) in &rows {
            for r in eval_expr(cx, e, env, st, ct)? {
                let mut vals2 = vals.clone();
                vals2.push(r.value);
                next.push((vals2, r.store, r.counts, q.join(r.quality)));
            }
        }
        rows = next;
    }
    Ok(rows)
}

// ─────────────────────────────────────────────────────────────────────
// Binding lists
// ─────────────────────────────────────────────────────────────────────

/// Run a binding list in textual order. Each form's store and count
/// updates thread into the next; match and `When` failures prune their
/// branch silently.
pub(crate) fn run_bindings(
    cx: &Ctx<'_>,
    forms: &[Binding],
    env: &Env,
    store: &Store,
    counts: &Counts,
) -> EvalResult<BTreeSet<BindRow>> {
    let mut rows = BTreeSet::from([BindRow {
        env: env.clone(),
        store: store.clone(),
        counts: counts.clone(),
        quality: Quality::Must,
    }]);

    for form in forms {
        let mut next = BTreeSet::new();
        for row in &rows {
            match form {
                Binding::Bind { pat, expr } => {
                    for r in eval_expr(cx, expr, &row.env, &row.store, &row.counts)? {
                        let m = cx.match_in(&r.store, &r.counts);
                        for (env2, mq) in match_pattern(&m, pat, &r.value, &row.env)? {
                            next.insert(BindRow {
                                env: env2,
                                store: r.store.clone(),
                                counts: r.counts.clone(),
                                quality: row.quality.join(r.quality).join(mq),
                            });
                        }
                    }
                }
                Binding::StoreExtend {
                    addr,
                    value,
                    trust_strong,
                } => {
                    let args = [addr.clone(), value.clone()];
                    for (vals, st, ct, q) in
                        eval_list(cx, &args, &row.env, &row.store, &row.counts)?
                    {
                        let a = match &vals[0] {
                            Term::Addr(a) => a.clone(),
                            other => return Err(EvalError::NotAnAddress(other.clone())),
                        };
                        let strong = match cx.mode {
                            Mode::Concrete => true,
                            Mode::Abstract => {
                                *trust_strong
                                    || ct.get(&a) <= opsem_lang::Cardinality::One
                            }
                        };
                        let st2 = if strong {
                            st.write_strong(&a, vals[1].clone())
                        } else {
                            st.write_weak(&a, vals[1].clone())
                        };
                        next.insert(BindRow {
                            env: row.env.clone(),
                            store: st2,
                            counts: ct,
                            quality: row.quality.join(q),
                        });
                    }
                }
                Binding::When(expr) => {
                    for r in eval_expr(cx, expr, &row.env, &row.store, &row.counts)? {
                        for (truth, tq) in truthiness(cx, &r.store, &r.value)? {
                            if truth {
                                next.insert(BindRow {
                                    env: row.env.clone(),
                                    store: r.store.clone(),
                                    counts: r.counts.clone(),
                                    quality: row.quality.join(r.quality).join(tq),
                                });
                            }
                        }
                    }
                }
            }
        }
        rows = next;
        if rows.is_empty() {
            break;
        }
    }
    Ok(rows)
}

// ─────────────────────────────────────────────────────────────────────
// Pattern instantiation
// ─────────────────────────────────────────────────────────────────────

/// Build a term from a pattern and an environment. Both binder and
/// reference forms look their variable up; unbound names are structural
/// errors, as are arity mismatches on variant constructors.
pub(crate) fn instantiate(pat: &Pattern, env: &Env) -> EvalResult<Term> {
    match pat {
        Pattern::Bind { name, .. } | Pattern::Ref(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnboundVariable(name.to_string())),
        Pattern::Atom(a) => Ok(Term::Atom(a.clone())),
        Pattern::Variant { desc, children } => {
            if children.len() != desc.arity() {
                return Err(EvalError::ArityMismatch {
                    variant: desc.name.to_string(),
                    expected: desc.arity(),
                    got: children.len(),
                });
            }
            let mut fields = Vec::with_capacity(children.len());
            for child in children {
                fields.push(instantiate(child, env)?);
            }
            Ok(Term::variant(desc, fields))
        }
        Pattern::Quantified { inner, .. } => instantiate(inner, env),
        Pattern::SetWith { .. } => Err(EvalError::UnsupportedPattern("set-with")),
        Pattern::MapWith { .. } => Err(EvalError::UnsupportedPattern("map-with")),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Map operations
// ─────────────────────────────────────────────────────────────────────

fn map_of(env: &Env, name: &str) -> EvalResult<MapValue> {
    match env.get(name) {
        None => Err(EvalError::UnboundMapVariable(name.to_string())),
        Some(Term::Map(m)) => Ok(m.clone()),
        Some(other) => Err(EvalError::NotAMap {
            name: name.to_string(),
            value: other.clone(),
        }),
    }
}

enum Lookup {
    /// Definitely present.
    Hit(Vec<(Term, Quality)>),
    /// Possibly present (abstract keys the equality cannot decide).
    Maybe(Vec<(Term, Quality)>),
    /// Definitely absent.
    Miss,
}

/// Key lookup: exact dictionary hit first, then a scan under the
/// mode's equality.
fn lookup(
    cx: &Ctx<'_>,
    map: &MapValue,
    key: &Term,
    store: &Store,
    counts: &Counts,
) -> EvalResult<Lookup> {
    if let Some(v) = map.get_exact(key) {
        return Ok(Lookup::Hit(vec![(v.clone(), Quality::Must)]));
    }
    let mut maybes = Vec::new();
    for (k, v) in map.entries() {
        match ternary_equal(cx, store, counts, key, k)? {
            Ternary::True => return Ok(Lookup::Hit(vec![(v.clone(), Quality::Must)])),
            Ternary::Unknown => maybes.push((v.clone(), Quality::May)),
            Ternary::False => {}
        }
    }
    if maybes.is_empty() {
        Ok(Lookup::Miss)
    } else {
        Ok(Lookup::Maybe(maybes))
    }
}

/// Map extension. Concrete mode and trusted updates replace exactly;
/// an abstract-class map with an undecidable key fans out over the
/// compatible pairings (new entry vs. overwriting each `may`-equal
/// key).
fn extend(
    cx: &Ctx<'_>,
    map: &MapValue,
    key: &Term,
    value: &Term,
    trust_strong: bool,
    store: &Store,
    counts: &Counts,
) -> EvalResult<Vec<(MapValue, Quality)>> {
    let exact = (map.insert(key.clone(), value.clone()), Quality::Must);
    if cx.mode == Mode::Concrete || trust_strong || map.class() != MapClass::Abstract {
        return Ok(vec![exact]);
    }

    let mut unknown_keys = Vec::new();
    for (k, _) in map.entries() {
        match ternary_equal(cx, store, counts, key, k)? {
            // A definitely equal key: exact insertion already
            // overwrites the right entry.
            Ternary::True => return Ok(vec![exact]),
            Ternary::Unknown => unknown_keys.push(k.clone()),
            Ternary::False => {}
        }
    }
    if unknown_keys.is_empty() {
        return Ok(vec![exact]);
    }

    let mut out = vec![(exact.0, Quality::May)];
    for old_key in unknown_keys {
        let entries = map
            .entries()
            .filter(|(k, _)| **k != old_key)
            .map(|(k, v)| (k.clone(), v.clone()));
        let replaced =
            MapValue::from_entries(map.class(), entries).insert(key.clone(), value.clone());
        out.push((replaced, Quality::May));
    }
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────
// Truthiness and equality helpers
// ─────────────────────────────────────────────────────────────────────

/// The boolean outcomes a scrutinized value admits. Only `#f` is falsy;
/// in abstract mode a structural address fans out over its denotations,
/// and mixed truthiness explores both branches at `may`.
fn truthiness(cx: &Ctx<'_>, store: &Store, value: &Term) -> EvalResult<Vec<(bool, Quality)>> {
    if cx.mode == Mode::Abstract {
        if let Term::Addr(a) = value {
            if a.kind == opsem_lang::AddressKind::Structural {
                let slot = store
                    .slot(a)
                    .ok_or_else(|| EvalError::UnmappedAddress(a.clone()))?;
                let penalty = if slot.len() > 1 {
                    Quality::May
                } else {
                    Quality::Must
                };
                let mut out: Vec<(bool, Quality)> = Vec::new();
                for d in slot.clone() {
                    for (b, q) in truthiness(cx, store, &d)? {
                        let q = q.join(penalty);
                        if !out.iter().any(|(b2, q2)| *b2 == b && *q2 == q) {
                            out.push((b, q));
                        }
                    }
                }
                return Ok(out);
            }
        }
    }
    Ok(vec![(value.truthy(), Quality::Must)])
}

/// Mode-aware equality as a ternary.
fn ternary_equal(
    cx: &Ctx<'_>,
    store: &Store,
    counts: &Counts,
    a: &Term,
    b: &Term,
) -> EvalResult<Ternary> {
    match cx.mode {
        Mode::Concrete => Ok(Ternary::from_bool(equal_concrete(cx.lang, store, a, b)?)),
        Mode::Abstract => equal_abstract(cx.lang, store, counts, a, b),
    }
}

/// The boolean result rows of an equality test.
fn bool_rows(
    cx: &Ctx<'_>,
    store: &Store,
    counts: &Counts,
    a: &Term,
    b: &Term,
) -> EvalResult<Vec<(bool, Quality)>> {
    match ternary_equal(cx, store, counts, a, b)? {
        Ternary::True => Ok(vec![(true, Quality::Must)]),
        Ternary::False => Ok(vec![(false, Quality::Must)]),
        Ternary::Unknown => Ok(vec![(true, Quality::May), (false, Quality::May)]),
    }
}
