//! Shared data model for the Opsem semantics workbench.
//!
//! This crate defines everything the engine and the surface syntax have
//! in common:
//! - atoms and fully-evaluated [`Term`]s (variants, maps, sets,
//!   addresses, external values)
//! - spaces, variant descriptors, components, and validated
//!   [`Language`] definitions
//! - structural membership (`in_space` and friends)
//! - patterns, expressions, binding lists, rules, and meta-functions
//! - the space-partitioned persistent [`Store`] and the `0 < 1 < ω`
//!   cardinality lattice of the abstract interpreter

pub mod atom;
pub mod card;
pub mod error;
pub mod expr;
pub mod member;
pub mod pattern;
pub mod rule;
pub mod space;
pub mod store;
pub mod term;

pub use atom::Atom;
pub use card::{Cardinality, Counts, Ternary};
pub use error::{LangError, LangResult};
pub use expr::{AllocExpr, Binding, Expr, StoreEffects};
pub use member::{in_component, in_space, in_variant};
pub use pattern::{Pattern, Quantifier};
pub use rule::{MetaFun, Rule, TrustedAbstract, TrustedConcrete};
pub use space::{
    Alternative, Component, DomainPrecision, ExternalSpace, Language, Space, VariantDesc,
};
pub use store::Store;
pub use term::{AddrId, Address, AddressKind, ExternalValue, MapClass, MapValue, Term, VariantValue};
