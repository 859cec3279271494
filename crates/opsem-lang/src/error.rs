//! Language-definition error types.

use thiserror::Error;

/// Errors raised while constructing or consulting a language definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LangError {
    /// A space name does not resolve.
    #[error("undefined space `{0}`")]
    UndefinedSpace(String),

    /// An address component names a space that is not an address space.
    #[error("`{0}` is not an address space")]
    NotAnAddressSpace(String),

    /// Two same-named variants disagree on arity.
    #[error("variant `{variant}` declared with arity {first} and arity {second}")]
    VariantArityConflict {
        variant: String,
        first: usize,
        second: usize,
    },

    /// Two address spaces share a partition tag.
    #[error("duplicate address-space tag `{0}`")]
    DuplicateAddressTag(String),

    /// A mutually recursive pair of user spaces disagrees on the
    /// trust-recursion flag.
    #[error("spaces `{first}` and `{second}` are mutually recursive but disagree on trust-recursion")]
    TrustRecursionMismatch { first: String, second: String },
}

/// Result alias for language-definition operations.
pub type LangResult<T> = Result<T, LangError>;
