//! Term printing — the inverse of the parser.
//!
//! Variants render as `(name child …)`, maps as `{k v …}`, sets as
//! `#{e …}`, external values as their payload verbatim, and egal
//! addresses as their serialized identifier. Structural addresses have
//! no serialized form; printing one is an error.

use opsem_lang::{AddrId, AddressKind, Term};
use thiserror::Error;

/// Errors raised while rendering a term.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrintError {
    /// Structural addresses only exist relative to a store.
    #[error("structural address `{0}` has no serialized form")]
    StructuralAddress(String),
}

/// Render a term to its surface syntax.
pub fn print_term(term: &Term) -> Result<String, PrintError> {
    let mut out = String::new();
    write_term(term, &mut out)?;
    Ok(out)
}

fn write_term(term: &Term, out: &mut String) -> Result<(), PrintError> {
    match term {
        Term::Atom(a) => {
            out.push_str(&a.to_string());
            Ok(())
        }
        Term::Variant(v) => {
            out.push('(');
            out.push_str(v.name());
            for field in v.fields.iter() {
                out.push(' ');
                write_term(field, out)?;
            }
            out.push(')');
            Ok(())
        }
        Term::Map(m) => {
            out.push('{');
            for (i, (k, v)) in m.entries().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_term(k, out)?;
                out.push(' ');
                write_term(v, out)?;
            }
            out.push('}');
            Ok(())
        }
        Term::Set(s) => {
            out.push_str("#{");
            for (i, e) in s.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_term(e, out)?;
            }
            out.push('}');
            Ok(())
        }
        Term::Addr(a) => match a.kind {
            AddressKind::Egal => {
                match &a.id {
                    AddrId::Seq(n) => out.push_str(&format!("@{n}")),
                    AddrId::Name(s) => out.push_str(s),
                    AddrId::Site { .. } => out.push_str(&a.id.to_string()),
                }
                Ok(())
            }
            AddressKind::Structural => Err(PrintError::StructuralAddress(a.id.to_string())),
        },
        Term::External(e) => write_term(&e.payload, out),
    }
}
