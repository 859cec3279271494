//! The rule driver.
//!
//! Applying one rule to a term under a store: match the LHS with an
//! empty environment, run the binding list threading store and count
//! updates, then instantiate the RHS under each surviving environment.

use crate::env::Env;
use crate::eval::{instantiate, run_bindings, Ctx, Eff, Effs};
use crate::error::EvalResult;
use crate::matcher::match_pattern;
use opsem_lang::{Counts, Rule, Store, Term};
use tracing::debug;

/// Apply one rule. An empty result set means the rule did not fire.
pub(crate) fn apply_rule(
    cx: &Ctx<'_>,
    rule: &Rule,
    term: &Term,
    store: &Store,
    counts: &Counts,
) -> EvalResult<Effs> {
    let cx = cx.for_rule(&rule.name);
    let m = cx.match_in(store, counts);
    let rows = match_pattern(&m, &rule.lhs, term, &Env::new())?;

    let mut out = Effs::new();
    for (env, mq) in rows {
        for row in run_bindings(&cx, &rule.bindings, &env, store, counts)? {
            let value = instantiate(&rule.rhs, &row.env)?;
            out.insert(Eff {
                value,
                store: row.store,
                counts: row.counts,
                quality: mq.join(row.quality),
            });
        }
    }
    if !out.is_empty() {
        debug!(rule = %rule.name, results = out.len(), "rule fired");
    }
    Ok(out)
}
