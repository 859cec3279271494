//! The machine: language + rules + meta-functions + mode + options.
//!
//! A [`Machine`] owns everything one run needs, including the concrete
//! address generator (scoped here rather than process-global so runs
//! are reentrant and tests independent). The mode decides which
//! interpreter the matcher, evaluator, and drivers implement: exact
//! concrete semantics, or the finitary abstract over-approximation.

use crate::alloc::AddrGen;
use crate::env::Env;
use crate::error::EvalResult;
use crate::eval::{self, Ctx, Effs};
use crate::matcher::{self, Matches};
use crate::reduction::{self, AbsState, State};
use opsem_lang::{Counts, Expr, Language, MetaFun, Pattern, Rule, Store, Term};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Which interpreter the machine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Exact semantics, one result per deterministic choice.
    Concrete,
    /// Sound over-approximation with explicit non-determinism and
    /// cardinality tracking.
    Abstract,
}

/// Run options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Fixed-point step budget. `None` runs unbounded; cyclic
    /// reduction graphs then only terminate under memoization.
    pub max_steps: Option<u64>,
}

/// A language plus its semantics, ready to run.
pub struct Machine {
    lang: Language,
    rules: Vec<Rule>,
    metafuns: BTreeMap<Arc<str>, MetaFun>,
    mode: Mode,
    options: Options,
    gensym: AddrGen,
}

impl Machine {
    /// A concrete-mode machine for a language.
    pub fn concrete(lang: Language) -> Machine {
        Machine::with_mode(lang, Mode::Concrete)
    }

    /// An abstract-mode machine for a language.
    pub fn abstracted(lang: Language) -> Machine {
        Machine::with_mode(lang, Mode::Abstract)
    }

    fn with_mode(lang: Language, mode: Mode) -> Machine {
        Machine {
            lang,
            rules: Vec::new(),
            metafuns: BTreeMap::new(),
            mode,
            options: Options::default(),
            gensym: AddrGen::new(),
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Machine {
        self.rules.push(rule);
        self
    }

    pub fn with_metafun(mut self, mf: MetaFun) -> Machine {
        self.metafuns.insert(Arc::clone(&mf.name), mf);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Machine {
        self.options.max_steps = Some(max_steps);
        self
    }

    pub fn with_options(mut self, options: Options) -> Machine {
        self.options = options;
        self
    }

    pub fn lang(&self) -> &Language {
        &self.lang
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn ctx(&self) -> Ctx<'_> {
        Ctx {
            lang: &self.lang,
            metafuns: &self.metafuns,
            mode: self.mode,
            gensym: &self.gensym,
            rule_name: Arc::from("top-level"),
        }
    }

    // ── Expression and match access ──────────────────────────────────

    /// Evaluate one expression against an environment and store.
    pub fn eval_expr(
        &self,
        expr: &Expr,
        env: &Env,
        store: &Store,
        counts: &Counts,
    ) -> EvalResult<Effs> {
        eval::eval_expr(&self.ctx(), expr, env, store, counts)
    }

    /// Match a pattern against a term under this machine's mode.
    pub fn matches(
        &self,
        pat: &Pattern,
        term: &Term,
        env: &Env,
        store: &Store,
        counts: &Counts,
    ) -> EvalResult<Matches> {
        let cx = self.ctx();
        let m = cx.match_in(store, counts);
        matcher::match_pattern(&m, pat, term, env)
    }

    // ── Concrete reduction ───────────────────────────────────────────

    /// One-step application of every rule.
    pub fn step(&self, state: &State) -> EvalResult<BTreeSet<State>> {
        let counts = Counts::new();
        let effs =
            reduction::step_all(&self.ctx(), &self.rules, &state.term, &state.store, &counts)?;
        Ok(to_states(effs))
    }

    /// Reduce to the set of normal forms.
    pub fn apply_star(&self, state: State) -> EvalResult<BTreeSet<State>> {
        self.star(state, false)
    }

    /// Reduce to normal forms, dropping revisited states.
    pub fn apply_star_memo(&self, state: State) -> EvalResult<BTreeSet<State>> {
        self.star(state, true)
    }

    fn star(&self, state: State, memo: bool) -> EvalResult<BTreeSet<State>> {
        let start = (state.term, state.store, Counts::new());
        let normal = reduction::explore(
            &self.ctx(),
            &self.rules,
            start,
            memo,
            self.options.max_steps,
        )?;
        Ok(normal
            .into_iter()
            .map(|(term, store, _)| State { term, store })
            .collect())
    }

    // ── Abstract reduction ───────────────────────────────────────────

    /// One-step application of every rule to an abstract state.
    pub fn step_abs(&self, state: &AbsState) -> EvalResult<BTreeSet<AbsState>> {
        let effs = reduction::step_all(
            &self.ctx(),
            &self.rules,
            &state.term,
            &state.store,
            &state.counts,
        )?;
        Ok(effs
            .into_iter()
            .map(|e| AbsState {
                term: e.value,
                store: e.store,
                counts: e.counts,
            })
            .collect())
    }

    /// Abstract reduction to the set of normal forms.
    pub fn apply_star_abs(&self, state: AbsState) -> EvalResult<BTreeSet<AbsState>> {
        self.star_abs(state, false)
    }

    /// Abstract reduction with the visited-set memo.
    pub fn apply_star_abs_memo(&self, state: AbsState) -> EvalResult<BTreeSet<AbsState>> {
        self.star_abs(state, true)
    }

    fn star_abs(&self, state: AbsState, memo: bool) -> EvalResult<BTreeSet<AbsState>> {
        let start = (state.term, state.store, state.counts);
        let normal = reduction::explore(
            &self.ctx(),
            &self.rules,
            start,
            memo,
            self.options.max_steps,
        )?;
        Ok(normal
            .into_iter()
            .map(|(term, store, counts)| AbsState {
                term,
                store,
                counts,
            })
            .collect())
    }
}

fn to_states(effs: Effs) -> BTreeSet<State> {
    effs.into_iter()
        .map(|e| State {
            term: e.value,
            store: e.store,
        })
        .collect()
}
