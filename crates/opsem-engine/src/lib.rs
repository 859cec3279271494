//! The Opsem semantic engine.
//!
//! Runs a language defined with `opsem-lang` on terms: a pattern
//! matcher with non-linear binders, an expression evaluator with
//! effectful store and allocation operations, the rule and
//! meta-function drivers, and the reduction relation with fixed-point
//! and memoized exploration. One [`Machine`] serves both interpreters —
//! [`Mode::Concrete`] for exact semantics, [`Mode::Abstract`] for the
//! finitary over-approximation with `must`/`may` qualities and
//! per-address cardinality.
//!
//! The engine is single-threaded and synchronous; stores, counts, and
//! environments are passed by value, so non-deterministic branches
//! never alias.

pub mod alloc;
pub mod env;
pub mod equal;
pub mod error;
pub mod eval;
pub mod machine;
pub mod matcher;
pub mod metafun;
pub mod reduction;
pub mod rules;

pub use alloc::AddrGen;
pub use env::Env;
pub use equal::{equal_abstract, equal_concrete};
pub use error::{EvalError, EvalResult, Stage};
pub use eval::{Eff, Effs};
pub use machine::{Machine, Mode, Options};
pub use matcher::{match_concrete, Matches, Quality};
pub use reduction::{AbsState, State};
