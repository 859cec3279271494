//! Term equality, concrete and abstract.
//!
//! Structural addresses compare by dereference through the store; a
//! visited pair set makes cyclic store shapes terminate (two addresses
//! assumed equal on revisit). Egal addresses compare by identity of
//! (space tag, identifier) — downgraded to `Unknown` in abstract mode
//! when the shared address has cardinality ω, since one abstract egal
//! address then stands for several concrete cells.
//!
//! Map and set equality requires equal entry counts; entry collapsing
//! under abstraction is not modeled. Discrete maps take the exact-key
//! fast path before falling back to a scan under this equality.

use crate::error::{EvalError, EvalResult};
use opsem_lang::{Address, AddressKind, Cardinality, Counts, Language, MapClass, Space, Store,
    Term, Ternary};
use std::collections::BTreeSet;

/// Exact equality in the concrete interpreter.
pub fn equal_concrete(lang: &Language, store: &Store, a: &Term, b: &Term) -> EvalResult<bool> {
    let mut seen = BTreeSet::new();
    match equal_in(lang, store, None, a, b, &mut seen)? {
        Ternary::True => Ok(true),
        Ternary::False => Ok(false),
        Ternary::Unknown => Err(EvalError::Internal(
            "concrete equality produced an unknown".to_string(),
        )),
    }
}

/// Three-valued equality in the abstract interpreter.
pub fn equal_abstract(
    lang: &Language,
    store: &Store,
    counts: &Counts,
    a: &Term,
    b: &Term,
) -> EvalResult<Ternary> {
    let mut seen = BTreeSet::new();
    equal_in(lang, store, Some(counts), a, b, &mut seen)
}

fn is_structural(t: &Term) -> Option<&Address> {
    match t {
        Term::Addr(a) if a.kind == AddressKind::Structural => Some(a),
        _ => None,
    }
}

/// The slot a structural address dereferences to.
fn slot<'s>(store: &'s Store, addr: &Address) -> EvalResult<&'s BTreeSet<Term>> {
    store
        .slot(addr)
        .ok_or_else(|| EvalError::UnmappedAddress(addr.clone()))
}

fn equal_in(
    lang: &Language,
    store: &Store,
    counts: Option<&Counts>,
    a: &Term,
    b: &Term,
    seen: &mut BTreeSet<(Address, Address)>,
) -> EvalResult<Ternary> {
    // Structural addresses dereference; everything else is a value.
    match (is_structural(a), is_structural(b)) {
        (Some(x), Some(y)) => {
            if !seen.insert((x.clone(), y.clone())) {
                // Coinductive: assume equal on revisit.
                return Ok(Ternary::True);
            }
            let (sa, sb) = (slot(store, x)?, slot(store, y)?);
            return pairwise(lang, store, counts, sa, sb, seen);
        }
        (Some(x), None) => {
            if !seen.insert((x.clone(), x.clone())) {
                return Ok(Ternary::True);
            }
            let sa = slot(store, x)?;
            let singleton = BTreeSet::from([b.clone()]);
            return pairwise(lang, store, counts, sa, &singleton, seen);
        }
        (None, Some(y)) => {
            if !seen.insert((y.clone(), y.clone())) {
                return Ok(Ternary::True);
            }
            let sb = slot(store, y)?;
            let singleton = BTreeSet::from([a.clone()]);
            return pairwise(lang, store, counts, &singleton, sb, seen);
        }
        (None, None) => {}
    }

    match (a, b) {
        (Term::Addr(x), Term::Addr(y)) => {
            // Both egal here: syntactic identity of (tag, id), weakened
            // to Unknown at cardinality ω.
            if x == y {
                match counts {
                    Some(c) if c.get(x) == Cardinality::Many => Ok(Ternary::Unknown),
                    _ => Ok(Ternary::True),
                }
            } else {
                Ok(Ternary::False)
            }
        }
        (Term::Atom(x), Term::Atom(y)) => Ok(Ternary::from_bool(x == y)),
        (Term::Variant(x), Term::Variant(y)) => {
            if x.desc.name != y.desc.name || x.arity() != y.arity() {
                return Ok(Ternary::False);
            }
            let mut acc = Ternary::True;
            for (fx, fy) in x.fields.iter().zip(y.fields.iter()) {
                acc = acc.and(equal_in(lang, store, counts, fx, fy, seen)?);
                if acc.is_false() {
                    return Ok(Ternary::False);
                }
            }
            Ok(acc)
        }
        (Term::Map(x), Term::Map(y)) => {
            if x.len() != y.len() {
                return Ok(Ternary::False);
            }
            let scan = x.class() == MapClass::Abstract || y.class() == MapClass::Abstract;
            let mut acc = Ternary::True;
            for (k, v) in x.entries() {
                // Fast path: exact key hit, even for abstract maps.
                let entry = if scan { None } else { y.get_exact(k) };
                let here = match entry {
                    Some(v2) => equal_in(lang, store, counts, v, v2, seen)?,
                    None => {
                        let mut best = Ternary::False;
                        for (k2, v2) in y.entries() {
                            let keys = equal_in(lang, store, counts, k, k2, seen)?;
                            if keys.is_false() {
                                continue;
                            }
                            let vals = equal_in(lang, store, counts, v, v2, seen)?;
                            best = best.or(keys.and(vals));
                            if best.is_true() {
                                break;
                            }
                        }
                        best
                    }
                };
                acc = acc.and(here);
                if acc.is_false() {
                    return Ok(Ternary::False);
                }
            }
            Ok(acc)
        }
        (Term::Set(x), Term::Set(y)) => {
            if x.len() != y.len() {
                return Ok(Ternary::False);
            }
            let mut acc = Ternary::True;
            for e in x {
                let mut best = Ternary::False;
                for e2 in y {
                    best = best.or(equal_in(lang, store, counts, e, e2, seen)?);
                    if best.is_true() {
                        break;
                    }
                }
                acc = acc.and(best);
                if acc.is_false() {
                    return Ok(Ternary::False);
                }
            }
            Ok(acc)
        }
        (Term::External(x), Term::External(y)) => {
            if x.space != y.space {
                return Ok(Ternary::False);
            }
            if let Some(oracle) = special_equal(lang, &x.space) {
                let verdict = oracle(x.payload.as_ref(), y.payload.as_ref());
                // Concrete mode has no "may": fall back to structure.
                if verdict != Ternary::Unknown || counts.is_some() {
                    return Ok(verdict);
                }
            }
            let structural = equal_in(lang, store, counts, &x.payload, &y.payload, seen)?;
            // An imprecise external value stands for several concrete
            // values: syntactic agreement proves nothing in abstract
            // mode.
            if counts.is_some() && structural == Ternary::True {
                if let Ok(Space::External(ext)) = lang.space(&x.space) {
                    if ext.imprecise
                        && ((ext.cardinality)(x.payload.as_ref()) == Cardinality::Many
                            || (ext.cardinality)(y.payload.as_ref()) == Cardinality::Many)
                    {
                        return Ok(Ternary::Unknown);
                    }
                }
            }
            Ok(structural)
        }
        // A tagged external value equals the raw value it wraps.
        (Term::External(x), other) => equal_in(lang, store, counts, &x.payload, other, seen),
        (other, Term::External(y)) => equal_in(lang, store, counts, other, &y.payload, seen),
        _ => Ok(Ternary::False),
    }
}

/// Equality of two denotation sets: every choice pair must agree for a
/// definite answer.
fn pairwise(
    lang: &Language,
    store: &Store,
    counts: Option<&Counts>,
    sa: &BTreeSet<Term>,
    sb: &BTreeSet<Term>,
    seen: &mut BTreeSet<(Address, Address)>,
) -> EvalResult<Ternary> {
    let mut all_true = true;
    let mut all_false = true;
    for da in sa {
        for db in sb {
            match equal_in(lang, store, counts, da, db, seen)? {
                Ternary::True => all_false = false,
                Ternary::False => all_true = false,
                Ternary::Unknown => {
                    all_true = false;
                    all_false = false;
                }
            }
            if !all_true && !all_false {
                return Ok(Ternary::Unknown);
            }
        }
    }
    if all_true {
        Ok(Ternary::True)
    } else if all_false {
        Ok(Ternary::False)
    } else {
        Ok(Ternary::Unknown)
    }
}

/// The special-equality oracle of an external space, if any.
fn special_equal<'l>(
    lang: &'l Language,
    space: &str,
) -> Option<&'l opsem_lang::space::ExternalEquality> {
    match lang.space(space) {
        Ok(Space::External(ext)) => ext.special_equal.as_ref(),
        _ => None,
    }
}
