//! Structural space membership.
//!
//! `in_space` / `in_variant` / `in_component` form a mutually recursive
//! predicate family over the term model. Membership is purely
//! structural; failing on an undefined space name is a hard error, a
//! mismatched value is just `false`.

use crate::error::LangError;
use crate::space::{Alternative, Component, Language, Space, VariantDesc};
use crate::term::Term;

/// Whether `term` lies in the named space.
pub fn in_space(lang: &Language, space: &str, term: &Term) -> Result<bool, LangError> {
    match lang.space(space)? {
        Space::User { alternatives, .. } => {
            for alt in alternatives {
                let ok = match alt {
                    Alternative::Variant(desc) => in_variant(lang, desc, term)?,
                    Alternative::Ref(name) => in_space(lang, name, term)?,
                    Alternative::Comp(comp) => in_component(lang, comp, term)?,
                };
                if ok {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Space::Address { tag } => Ok(matches!(term, Term::Addr(a) if a.space == *tag)),
        Space::External(ext) => {
            if let Term::External(v) = term {
                if v.space == ext.name {
                    return Ok(true);
                }
            }
            Ok((ext.contains)(term))
        }
    }
}

/// Whether `term` is a value of the given variant: same name, same
/// arity, every field in its component.
pub fn in_variant(lang: &Language, desc: &VariantDesc, term: &Term) -> Result<bool, LangError> {
    let v = match term {
        Term::Variant(v) => v,
        _ => return Ok(false),
    };
    if v.desc.name != desc.name || v.arity() != desc.arity() {
        return Ok(false);
    }
    for (field, comp) in v.fields.iter().zip(desc.components.iter()) {
        if !in_component(lang, comp, field)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether `term` satisfies a component descriptor.
pub fn in_component(lang: &Language, comp: &Component, term: &Term) -> Result<bool, LangError> {
    match comp {
        Component::SpaceRef(name) => in_space(lang, name, term),
        // An address component is exactly membership in the named
        // address space (validation guarantees it is one).
        Component::AddrOf(name) => in_space(lang, name, term),
        Component::Map { dom, rng } | Component::QMap { dom, rng, .. } => {
            let m = match term.as_map() {
                Some(m) => m,
                None => return Ok(false),
            };
            for (k, v) in m.entries() {
                if !in_component(lang, dom, k)? || !in_component(lang, rng, v)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Component::SetOf(inner) => {
            let s = match term.as_set() {
                Some(s) => s,
                None => return Ok(false),
            };
            for e in s {
                if !in_component(lang, inner, e)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Component::Anything => Ok(true),
    }
}
