//! Runtime error types for the semantic engine.
//!
//! Match failures are not errors — they silently prune a branch. The
//! variants here are structural errors (bugs in a language definition
//! or its rules), partial operations caught misbehaving, and the step
//! budget. Every error maps to the pipeline stage that raised it.

use opsem_lang::{Address, LangError, Term};
use std::fmt;

/// The pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Match,
    ExprEval,
    MfEval,
    Parse,
    InSpace,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Match => write!(f, "match"),
            Stage::ExprEval => write!(f, "expr-eval"),
            Stage::MfEval => write!(f, "mf-eval"),
            Stage::Parse => write!(f, "parse"),
            Stage::InSpace => write!(f, "in-space"),
        }
    }
}

/// Evaluation error — structural bugs, partial operations, budgets.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A space name does not resolve.
    UndefinedSpace(String),
    /// An allocation targets a space that is not an address space.
    NotAnAddressSpace(String),
    /// A meta-function call names no registered meta-function.
    UnknownMetaFunction(String),
    /// No rule of a meta-function produced a result for the argument.
    NoRuleMatches { name: String, arg: Term },
    /// A pattern variable was unbound at RHS instantiation.
    UnboundVariable(String),
    /// A map expression names an unbound variable.
    UnboundMapVariable(String),
    /// A map expression's variable is bound to a non-map.
    NotAMap { name: String, value: Term },
    /// A variant pattern was instantiated with the wrong field count.
    ArityMismatch {
        variant: String,
        expected: usize,
        got: usize,
    },
    /// `Map-lookup` without a default on a definitely missing key.
    MissingKey { key: Term },
    /// `Store-lookup` (or a dereference) on an unmapped address.
    UnmappedAddress(Address),
    /// A store operation's key evaluated to a non-address.
    NotAnAddress(Term),
    /// A set operation's operand evaluated to a non-set.
    NotASet(Term),
    /// A pattern form whose semantics are not implemented.
    UnsupportedPattern(&'static str),
    /// A trusted meta-function implementation reported an error.
    Trusted { name: String, message: String },
    /// The fixed-point step budget ran out.
    StepLimitExceeded { limit: u64 },
    /// An internal invariant failed.
    Internal(String),
}

impl EvalError {
    /// The stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            EvalError::UndefinedSpace(_) => Stage::InSpace,
            EvalError::UnsupportedPattern(_) => Stage::Match,
            EvalError::UnknownMetaFunction(_)
            | EvalError::NoRuleMatches { .. }
            | EvalError::Trusted { .. } => Stage::MfEval,
            _ => Stage::ExprEval,
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.stage())?;
        match self {
            EvalError::UndefinedSpace(name) => write!(f, "undefined space `{name}`"),
            EvalError::NotAnAddressSpace(name) => {
                write!(f, "`{name}` is not an address space")
            }
            EvalError::UnknownMetaFunction(name) => {
                write!(f, "unknown meta-function `{name}`")
            }
            EvalError::NoRuleMatches { name, arg } => {
                write!(f, "no rule of meta-function `{name}` applies to {arg}")
            }
            EvalError::UnboundVariable(name) => {
                write!(f, "unbound pattern variable `{name}`")
            }
            EvalError::UnboundMapVariable(name) => {
                write!(f, "unbound map variable `{name}`")
            }
            EvalError::NotAMap { name, value } => {
                write!(f, "`{name}` is bound to {value}, not a map")
            }
            EvalError::ArityMismatch {
                variant,
                expected,
                got,
            } => write!(
                f,
                "variant `{variant}` expects {expected} fields, got {got}"
            ),
            EvalError::MissingKey { key } => write!(f, "key {key} is not in the map"),
            EvalError::UnmappedAddress(addr) => {
                write!(f, "address {addr} is not mapped in the store")
            }
            EvalError::NotAnAddress(term) => write!(f, "{term} is not an address"),
            EvalError::NotASet(term) => write!(f, "{term} is not a set"),
            EvalError::UnsupportedPattern(what) => {
                write!(f, "{what} patterns are not implemented")
            }
            EvalError::Trusted { name, message } => {
                write!(f, "trusted implementation of `{name}` failed: {message}")
            }
            EvalError::StepLimitExceeded { limit } => {
                write!(f, "step budget of {limit} exhausted")
            }
            EvalError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<LangError> for EvalError {
    fn from(e: LangError) -> EvalError {
        match e {
            LangError::UndefinedSpace(name) => EvalError::UndefinedSpace(name),
            LangError::NotAnAddressSpace(name) => EvalError::NotAnAddressSpace(name),
            other => EvalError::Internal(other.to_string()),
        }
    }
}

/// Result alias for engine operations.
pub type EvalResult<T> = Result<T, EvalError>;
