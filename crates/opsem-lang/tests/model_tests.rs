//! Value/store model tests: cardinality lattice, counts, the
//! partitioned store, effect classifiers, and allocation-site
//! numbering.

use opsem_lang::term::{AddrId, Address};
use opsem_lang::{
    Binding, Cardinality, Counts, Expr, MapClass, MapValue, Pattern, Rule, Store, StoreEffects,
    Term,
};

// ══════════════════════════════════════════════════════════════════════════════
// Cardinality
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn cardinality_is_ordered() {
    assert!(Cardinality::Zero < Cardinality::One);
    assert!(Cardinality::One < Cardinality::Many);
}

#[test]
fn cardinality_join_is_lub() {
    assert_eq!(
        Cardinality::Zero.join(Cardinality::One),
        Cardinality::One
    );
    assert_eq!(
        Cardinality::One.join(Cardinality::Many),
        Cardinality::Many
    );
    assert_eq!(Cardinality::One.join(Cardinality::One), Cardinality::One);
}

#[test]
fn bump_saturates_at_many() {
    assert_eq!(Cardinality::Zero.bump(), Cardinality::One);
    assert_eq!(Cardinality::One.bump(), Cardinality::Many);
    assert_eq!(Cardinality::Many.bump(), Cardinality::Many);
}

#[test]
fn counts_default_to_zero_and_bump() {
    let a = Address::egal("heap", AddrId::Seq(0));
    let counts = Counts::new();
    assert_eq!(counts.get(&a), Cardinality::Zero);
    let counts = counts.bump(&a);
    assert_eq!(counts.get(&a), Cardinality::One);
    let counts = counts.bump(&a);
    assert_eq!(counts.get(&a), Cardinality::Many);
}

// ══════════════════════════════════════════════════════════════════════════════
// Store
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn strong_update_replaces_slot() {
    let a = Address::egal("heap", AddrId::Seq(0));
    let st = Store::new().write_strong(&a, Term::int(1));
    assert_eq!(st.one(&a), Some(&Term::int(1)));
    let st = st.write_strong(&a, Term::int(2));
    assert_eq!(st.one(&a), Some(&Term::int(2)));
    assert_eq!(st.slot(&a).unwrap().len(), 1);
}

#[test]
fn weak_update_joins_slot() {
    let a = Address::egal("heap", AddrId::Seq(0));
    let st = Store::new()
        .write_strong(&a, Term::int(1))
        .write_weak(&a, Term::int(2));
    let slot = st.slot(&a).unwrap();
    assert_eq!(slot.len(), 2);
    assert!(slot.contains(&Term::int(1)));
    assert!(slot.contains(&Term::int(2)));
    // The single-value view declines to answer.
    assert_eq!(st.one(&a), None);
}

#[test]
fn updates_are_persistent() {
    let a = Address::egal("heap", AddrId::Seq(0));
    let st0 = Store::new();
    let st1 = st0.write_strong(&a, Term::int(1));
    assert!(!st0.contains(&a));
    assert!(st1.contains(&a));
}

#[test]
fn partitions_are_keyed_by_tag() {
    let a = Address::egal("heap", AddrId::Seq(0));
    let b = Address::egal("stack", AddrId::Seq(0));
    let st = Store::new()
        .write_strong(&a, Term::int(1))
        .write_strong(&b, Term::int(2));
    assert_eq!(st.one(&a), Some(&Term::int(1)));
    assert_eq!(st.one(&b), Some(&Term::int(2)));
    assert_eq!(st.partition_tags().count(), 2);
}

#[test]
fn raw_store_views_are_trusted_dictionaries() {
    let a = Address::egal("heap", AddrId::Seq(0));
    let st = Store::new().write_strong(&a, Term::int(5));
    let part = st.partition_as_term("heap");
    match &part {
        Term::Map(m) => {
            assert_eq!(m.class(), MapClass::Raw);
            assert_eq!(m.get_exact(&Term::Addr(a.clone())), Some(&Term::int(5)));
        }
        other => panic!("expected a map, got {other}"),
    }
    match st.as_term() {
        Term::Map(m) => assert_eq!(m.get_exact(&Term::sym("heap")), Some(&part)),
        other => panic!("expected a map, got {other}"),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Map values
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn map_insert_is_persistent() {
    let m0 = MapValue::new(MapClass::Discrete);
    let m1 = m0.insert(Term::sym("x"), Term::int(1));
    assert!(m0.is_empty());
    assert_eq!(m1.get_exact(&Term::sym("x")), Some(&Term::int(1)));
}

#[test]
fn map_class_distinguishes_values() {
    let d = MapValue::from_entries(MapClass::Discrete, vec![(Term::int(1), Term::int(2))]);
    let a = MapValue::from_entries(MapClass::Abstract, vec![(Term::int(1), Term::int(2))]);
    assert_ne!(Term::Map(d), Term::Map(a));
}

// ══════════════════════════════════════════════════════════════════════════════
// Effect classifiers
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn pure_forms_have_no_effects() {
    assert_eq!(Expr::Bool(true).effects(), StoreEffects::NONE);
    assert_eq!(Expr::EmptySet.effects(), StoreEffects::NONE);
    assert!(Expr::term(Pattern::bind("x")).effects().is_pure());
}

#[test]
fn store_lookup_reads() {
    let fx = Expr::store_lookup(Expr::var("a")).effects();
    assert!(fx.contains(StoreEffects::READ));
    assert!(fx.is_pure());
}

#[test]
fn alloc_allocates_and_touches_counts() {
    let fx = Expr::malloc("A").effects();
    assert!(fx.contains(StoreEffects::ALLOC));
    assert!(fx.contains(StoreEffects::CARD));
    assert!(!fx.is_pure());
}

#[test]
fn store_extend_writes() {
    let fx = Binding::store_extend(Expr::var("a"), Expr::var("v")).effects();
    assert!(fx.contains(StoreEffects::WRITE));
}

#[test]
fn choose_is_many() {
    let fx = Expr::choose(Expr::EmptySet).effects();
    assert!(fx.contains(StoreEffects::MANY));
    assert!(fx.is_pure());
}

#[test]
fn effects_union_through_let() {
    let e = Expr::let_(
        vec![Binding::bind(Pattern::bind("a"), Expr::malloc("A"))],
        Expr::store_lookup(Expr::var("a")),
    );
    let fx = e.effects();
    assert!(fx.contains(StoreEffects::ALLOC));
    assert!(fx.contains(StoreEffects::READ));
}

// ══════════════════════════════════════════════════════════════════════════════
// Allocation sites
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn rule_numbers_allocation_sites_in_textual_order() {
    let rule = Rule::new(
        "r",
        Pattern::bind("x"),
        Pattern::var("x"),
        vec![
            Binding::bind(Pattern::bind("a"), Expr::malloc("A")),
            Binding::bind(
                Pattern::bind("b"),
                Expr::let_(
                    vec![Binding::bind(Pattern::bind("c"), Expr::salloc("A"))],
                    Expr::var("c"),
                ),
            ),
        ],
    );
    let mut sites = Vec::new();
    fn collect(e: &Expr, out: &mut Vec<u32>) {
        match e {
            Expr::Alloc(a) => out.push(a.site),
            Expr::Let { bindings, body } => {
                for b in bindings {
                    if let Binding::Bind { expr, .. } = b {
                        collect(expr, out);
                    }
                }
                collect(body, out);
            }
            _ => {}
        }
    }
    for b in &rule.bindings {
        if let Binding::Bind { expr, .. } = b {
            collect(expr, &mut sites);
        }
    }
    assert_eq!(sites, vec![0, 1]);
}
