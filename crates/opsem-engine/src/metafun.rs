//! The meta-function driver.
//!
//! A meta-function with a trusted implementation for the current mode is
//! invoked directly, receiving the store (and counts) plus the
//! instantiated argument. Otherwise its rules are tried in order and the
//! first rule producing a non-empty result set wins; a rule whose side
//! conditions prune every branch falls through to the next rule.
//! Running out of rules is a structural error.

use crate::error::{EvalError, EvalResult};
use crate::eval::{eff_set, Ctx, Eff, Effs};
use crate::matcher::Quality;
use crate::rules::apply_rule;
use opsem_lang::{Counts, Store, Term};

/// Invoke a meta-function on an already-instantiated argument.
pub(crate) fn call(
    cx: &Ctx<'_>,
    name: &str,
    arg: &Term,
    store: &Store,
    counts: &Counts,
) -> EvalResult<Effs> {
    let mf = cx
        .metafuns
        .get(name)
        .ok_or_else(|| EvalError::UnknownMetaFunction(name.to_string()))?;

    if cx.mode == crate::machine::Mode::Concrete {
        if let Some(imp) = &mf.trusted_concrete {
            let results = imp(store, arg).map_err(|message| EvalError::Trusted {
                name: name.to_string(),
                message,
            })?;
            return Ok(eff_set(results.into_iter().map(|(value, store)| Eff {
                value,
                store,
                counts: counts.clone(),
                quality: Quality::Must,
            })));
        }
    } else if let Some(imp) = &mf.trusted_abstract {
        let results = imp(store, counts, arg).map_err(|message| EvalError::Trusted {
            name: name.to_string(),
            message,
        })?;
        return Ok(eff_set(results.into_iter().map(
            |(value, store, counts)| Eff {
                value,
                store,
                counts,
                quality: Quality::Must,
            },
        )));
    }

    for rule in &mf.rules {
        let effs = apply_rule(cx, rule, arg, store, counts)?;
        if !effs.is_empty() {
            return Ok(effs);
        }
    }
    Err(EvalError::NoRuleMatches {
        name: name.to_string(),
        arg: arg.clone(),
    })
}
