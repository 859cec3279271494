//! Address allocation.
//!
//! Concrete allocation draws globally fresh identifiers from a
//! per-machine monotonic counter (scoped, not process-global, so runs
//! are reentrant and tests independent). Abstract allocation is pure:
//! the address is deterministic in the rule name, the allocation site,
//! and an optional client hint.

use opsem_lang::{AddrId, Address, AddressKind, Term};
use std::cell::Cell;
use std::sync::Arc;

/// The concrete address generator. One per machine.
#[derive(Debug, Default)]
pub struct AddrGen {
    next: Cell<u64>,
}

impl AddrGen {
    pub fn new() -> AddrGen {
        AddrGen::default()
    }

    fn fresh(&self) -> u64 {
        let n = self.next.get();
        self.next.set(n + 1);
        n
    }
}

/// A globally fresh concrete address.
pub(crate) fn concrete(gen: &AddrGen, space: &Arc<str>, kind: AddressKind) -> Address {
    Address {
        kind,
        space: Arc::clone(space),
        id: AddrId::Seq(gen.fresh()),
    }
}

/// The deterministic abstract address for an allocation site.
pub(crate) fn site(
    rule: &Arc<str>,
    site: u32,
    hint: Option<Term>,
    space: &Arc<str>,
    kind: AddressKind,
) -> Address {
    Address {
        kind,
        space: Arc::clone(space),
        id: AddrId::Site {
            rule: Arc::clone(rule),
            site,
            hint: hint.map(Box::new),
        },
    }
}
