//! Space-directed term elaboration.
//!
//! A [`Sexp`] becomes a [`Term`] only relative to an expected space:
//! list heads name variants of that space, map and set literals
//! elaborate against map and set components, a bare symbol under an
//! address space is the serialized identifier of an egal address, and
//! external spaces admit whatever their predicate accepts.

use crate::error::{ParseError, ParseResult};
use crate::reader::{read, Sexp};
use opsem_lang::{
    AddrId, Address, Alternative, Atom, Component, DomainPrecision, Language, MapClass, MapValue,
    Space, Term, VariantDesc,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Parse one term from source text against the named space.
pub fn parse_term(lang: &Language, space: &str, source: &str) -> ParseResult<Term> {
    let sexp = read(source)?;
    elab_space(lang, space, &sexp)
}

/// Elaborate a read form against the named space.
pub fn elab_space(lang: &Language, space: &str, sexp: &Sexp) -> ParseResult<Term> {
    match lang.space(space)? {
        Space::User { alternatives, .. } => elab_user(lang, space, alternatives, sexp),
        Space::Address { tag } => elab_address(tag, sexp),
        Space::External(ext) => {
            let term = elab_generic(sexp)?;
            if (ext.contains)(&term) {
                Ok(term)
            } else {
                Err(ParseError::TypeMismatch {
                    expected: format!("a value of external space `{}`", ext.name),
                    span: sexp.span(),
                })
            }
        }
    }
}

fn elab_user(
    lang: &Language,
    space: &str,
    alternatives: &[Alternative],
    sexp: &Sexp,
) -> ParseResult<Term> {
    if let Sexp::List(elems, span) = sexp {
        // A list form must be headed by a variant of the expected
        // space (or of a space it includes).
        let head = match elems.first() {
            Some(Sexp::Sym(head, _)) => head.clone(),
            _ => {
                return Err(ParseError::NoAlternative {
                    space: space.to_string(),
                    span: *span,
                })
            }
        };
        let desc = match find_variant(lang, space, &head)? {
            Some(desc) => desc,
            None => {
                return Err(ParseError::UnknownVariantHead {
                    head,
                    space: space.to_string(),
                    span: *span,
                })
            }
        };
        let children = &elems[1..];
        if children.len() != desc.arity() {
            return Err(ParseError::ArityMismatch {
                variant: head,
                expected: desc.arity(),
                got: children.len(),
                span: *span,
            });
        }
        let mut fields = Vec::with_capacity(children.len());
        for (child, comp) in children.iter().zip(desc.components.iter()) {
            fields.push(elab_component(lang, comp, child)?);
        }
        return Ok(Term::variant(&desc, fields));
    }

    // Non-list forms elaborate against the first non-variant
    // alternative that accepts them.
    for alt in alternatives {
        let attempt = match alt {
            Alternative::Variant(_) => continue,
            Alternative::Ref(name) => elab_space(lang, name, sexp),
            Alternative::Comp(comp) => elab_component(lang, comp, sexp),
        };
        if let Ok(term) = attempt {
            return Ok(term);
        }
    }
    Err(ParseError::NoAlternative {
        space: space.to_string(),
        span: sexp.span(),
    })
}

/// Find a variant by head name in a space, following inclusions.
fn find_variant(
    lang: &Language,
    space: &str,
    head: &str,
) -> ParseResult<Option<Arc<VariantDesc>>> {
    fn go(
        lang: &Language,
        space: &str,
        head: &str,
        visited: &mut BTreeSet<String>,
    ) -> ParseResult<Option<Arc<VariantDesc>>> {
        if !visited.insert(space.to_string()) {
            return Ok(None);
        }
        if let Some(desc) = lang.variant_in(space, head)? {
            return Ok(Some(desc));
        }
        if let Space::User { alternatives, .. } = lang.space(space)? {
            for alt in alternatives {
                let included = match alt {
                    Alternative::Ref(name) => Some(name),
                    Alternative::Comp(Component::SpaceRef(name)) => Some(name),
                    _ => None,
                };
                if let Some(name) = included {
                    if let Some(desc) = go(lang, name, head, visited)? {
                        return Ok(Some(desc));
                    }
                }
            }
        }
        Ok(None)
    }
    go(lang, space, head, &mut BTreeSet::new())
}

fn elab_address(tag: &Arc<str>, sexp: &Sexp) -> ParseResult<Term> {
    match sexp {
        Sexp::Sym(name, _) => {
            let id = match name.strip_prefix('@').and_then(|n| n.parse::<u64>().ok()) {
                Some(n) => AddrId::Seq(n),
                None => AddrId::Name(Arc::from(name.as_str())),
            };
            Ok(Term::Addr(Address::egal(tag, id)))
        }
        other => Err(ParseError::TypeMismatch {
            expected: format!("an address identifier in `{tag}`"),
            span: other.span(),
        }),
    }
}

/// Elaborate a read form against a component descriptor.
pub fn elab_component(lang: &Language, comp: &Component, sexp: &Sexp) -> ParseResult<Term> {
    match comp {
        Component::SpaceRef(name) | Component::AddrOf(name) => elab_space(lang, name, sexp),
        Component::Map { dom, rng } => elab_map(lang, dom, rng, MapClass::Discrete, sexp),
        Component::QMap {
            dom,
            precision,
            rng,
        } => {
            let class = match precision {
                DomainPrecision::Abstract => MapClass::Abstract,
                DomainPrecision::Concrete | DomainPrecision::DiscreteAbstraction => {
                    MapClass::Discrete
                }
            };
            elab_map(lang, dom, rng, class, sexp)
        }
        Component::SetOf(inner) => match sexp {
            Sexp::SetLit(elems, _) => {
                let mut set = BTreeSet::new();
                for e in elems {
                    set.insert(elab_component(lang, inner, e)?);
                }
                Ok(Term::Set(set))
            }
            other => Err(ParseError::TypeMismatch {
                expected: "a set literal".to_string(),
                span: other.span(),
            }),
        },
        Component::Anything => elab_generic(sexp),
    }
}

fn elab_map(
    lang: &Language,
    dom: &Component,
    rng: &Component,
    class: MapClass,
    sexp: &Sexp,
) -> ParseResult<Term> {
    match sexp {
        Sexp::MapLit(pairs, _) => {
            let mut entries = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                entries.push((elab_component(lang, dom, k)?, elab_component(lang, rng, v)?));
            }
            Ok(Term::Map(MapValue::from_entries(class, entries)))
        }
        other => Err(ParseError::TypeMismatch {
            expected: "a map literal".to_string(),
            span: other.span(),
        }),
    }
}

/// Elaborate with no expected space: atoms, and map/set literals of
/// generic content. Lists have no meaning without a variant context.
fn elab_generic(sexp: &Sexp) -> ParseResult<Term> {
    match sexp {
        Sexp::Int(n, _) => Ok(Term::Atom(Atom::Int(n.clone()))),
        Sexp::Bool(b, _) => Ok(Term::Atom(Atom::Bool(*b))),
        Sexp::Char(c, _) => Ok(Term::Atom(Atom::Char(*c))),
        Sexp::Str(s, _) => Ok(Term::Atom(Atom::str(s))),
        Sexp::Sym(s, _) => Ok(Term::Atom(Atom::sym(s))),
        Sexp::MapLit(pairs, _) => {
            let mut entries = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                entries.push((elab_generic(k)?, elab_generic(v)?));
            }
            Ok(Term::Map(MapValue::from_entries(
                MapClass::Discrete,
                entries,
            )))
        }
        Sexp::SetLit(elems, _) => {
            let mut set = BTreeSet::new();
            for e in elems {
                set.insert(elab_generic(e)?);
            }
            Ok(Term::Set(set))
        }
        Sexp::List(_, span) => Err(ParseError::TypeMismatch {
            expected: "an atom, map, or set".to_string(),
            span: *span,
        }),
    }
}
