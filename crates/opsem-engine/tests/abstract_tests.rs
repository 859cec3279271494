//! Abstract interpreter tests: cardinality bumps, strong vs weak
//! updates, count-aware equality, abstract allocation determinism, and
//! `may` exploration of undecidable branches.

use opsem_engine::{equal_abstract, AbsState, Env, Machine, Quality};
use opsem_lang::term::{AddrId, Address};
use opsem_lang::{
    Atom, Binding, Cardinality, Counts, ExternalSpace, Expr, Language, MetaFun, Pattern, Rule,
    Space, Store, Term, Ternary,
};
use std::sync::Arc;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn lang() -> Language {
    Language::new(
        "abs",
        vec![
            (
                "Integer".to_string(),
                Space::External(ExternalSpace::integers()),
            ),
            ("A".to_string(), Space::address("A")),
        ],
    )
    .unwrap()
}

fn trusted_cmp(
    name: &str,
    f: impl Fn(&num_bigint::BigInt) -> bool + Send + Sync + 'static,
) -> MetaFun {
    MetaFun::new(name, Vec::new()).with_trusted_abstract(Arc::new(
        move |store, counts, arg| match arg {
            Term::Atom(Atom::Int(n)) => {
                Ok(vec![(Term::bool(f(n)), store.clone(), counts.clone())])
            }
            other => Err(format!("expected an integer, got {other}")),
        },
    ))
}

fn trusted_inc() -> MetaFun {
    MetaFun::new("inc", Vec::new()).with_trusted_abstract(Arc::new(
        |store, counts, arg| match arg {
            Term::Atom(Atom::Int(n)) => {
                Ok(vec![(Term::int(n + 1), store.clone(), counts.clone())])
            }
            other => Err(format!("expected an integer, got {other}")),
        },
    ))
}

/// `n ↦ n+1 while n < 2`, allocating and storing `n` at one site on
/// every firing.
fn alloc_loop_machine() -> Machine {
    let rule = Rule::new(
        "step",
        Pattern::bind_in("n", "Integer"),
        Pattern::var("m"),
        vec![
            Binding::when(Expr::call("lt2", Pattern::var("n"))),
            Binding::bind(Pattern::bind("a"), Expr::malloc("A")),
            Binding::store_extend(Expr::var("a"), Expr::var("n")),
            Binding::bind(Pattern::bind("m"), Expr::call("inc", Pattern::var("n"))),
        ],
    );
    Machine::abstracted(lang())
        .with_rule(rule)
        .with_metafun(trusted_cmp("lt2", |n| n < &2.into()))
        .with_metafun(trusted_inc())
}

// ══════════════════════════════════════════════════════════════════════════════
// Cardinality and weak updates (S6)
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn second_allocation_at_a_site_saturates_and_joins() {
    let m = alloc_loop_machine();
    let normal = m.apply_star_abs(AbsState::new(Term::int(0))).unwrap();
    assert_eq!(normal.len(), 1);
    let state = normal.iter().next().unwrap();
    assert_eq!(state.term, Term::int(2));

    // One abstract address was allocated twice.
    let addrs: Vec<Address> = state.store.addresses().collect();
    assert_eq!(addrs.len(), 1);
    let addr = &addrs[0];
    assert!(matches!(&addr.id, AddrId::Site { site: 0, .. }));
    assert_eq!(state.counts.get(addr), Cardinality::Many);

    // The first write was strong (count 1), the second weak (count ω):
    // reading now sees the join of both written values.
    let slot = state.store.slot(addr).unwrap();
    assert_eq!(slot.len(), 2);
    assert!(slot.contains(&Term::int(0)));
    assert!(slot.contains(&Term::int(1)));

    assert!(state.counts_cover_reachable());
}

#[test]
fn trust_strong_overrides_weak_updates() {
    let rule = Rule::new(
        "step",
        Pattern::bind_in("n", "Integer"),
        Pattern::var("m"),
        vec![
            Binding::when(Expr::call("lt2", Pattern::var("n"))),
            Binding::bind(Pattern::bind("a"), Expr::malloc("A")),
            Binding::store_extend_strong(Expr::var("a"), Expr::var("n")),
            Binding::bind(Pattern::bind("m"), Expr::call("inc", Pattern::var("n"))),
        ],
    );
    let m = Machine::abstracted(lang())
        .with_rule(rule)
        .with_metafun(trusted_cmp("lt2", |n| n < &2.into()))
        .with_metafun(trusted_inc());
    let normal = m.apply_star_abs(AbsState::new(Term::int(0))).unwrap();
    let state = normal.iter().next().unwrap();
    let addr = state.store.addresses().next().unwrap();
    // Still ω, but the user vouched for strong updates.
    assert_eq!(state.counts.get(&addr), Cardinality::Many);
    assert_eq!(state.store.one(&addr), Some(&Term::int(1)));
}

#[test]
fn abstract_state_reads_fan_out_weakly() {
    let m = Machine::abstracted(lang());
    let a = Address::egal("A", AddrId::Seq(0));
    let st = Store::new()
        .write_strong(&a, Term::int(1))
        .write_weak(&a, Term::int(2));
    let env = Env::new().bind(&Arc::from("a"), Term::Addr(a));
    let rows = m
        .eval_expr(
            &Expr::store_lookup(Expr::var("a")),
            &env,
            &st,
            &Counts::new(),
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    for r in &rows {
        assert_eq!(r.quality, Quality::May);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Quantified positions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn quantifiers_govern_address_denotations() {
    use opsem_lang::{Component, Quantifier, VariantDesc};
    let var_desc = VariantDesc::new("Var", vec![Component::Anything]);
    let m = Machine::abstracted(lang());
    let a = Address::structural("A", AddrId::Seq(0));
    let st = Store::new()
        .write_strong(&a, Term::variant(&var_desc, vec![Term::sym("p")]))
        .write_weak(&a, Term::variant(&var_desc, vec![Term::sym("q")]));
    let inner = Pattern::variant(&var_desc, vec![Pattern::bind("x")]);

    // ∃: one row per denotation.
    let exists = Pattern::quantified(Quantifier::Exists, inner.clone());
    let rows = m
        .matches(&exists, &Term::Addr(a.clone()), &Env::new(), &st, &Counts::new())
        .unwrap();
    assert_eq!(rows.len(), 2);

    // ∀: the denotations bind differently, so no row survives.
    let all = Pattern::quantified(Quantifier::All, inner.clone());
    let rows = m
        .matches(&all, &Term::Addr(a.clone()), &Env::new(), &st, &Counts::new())
        .unwrap();
    assert!(rows.is_empty());

    // ∀ with agreeing denotations survives at must.
    let b = Address::structural("A", AddrId::Seq(1));
    let st2 = Store::new().write_strong(&b, Term::variant(&var_desc, vec![Term::sym("p")]));
    let rows = m
        .matches(&all, &Term::Addr(b), &Env::new(), &st2, &Counts::new())
        .unwrap();
    assert_eq!(rows.len(), 1);
    let (env, q) = rows.iter().next().unwrap();
    assert_eq!(env.get("x"), Some(&Term::sym("p")));
    assert_eq!(*q, Quality::Must);
}

// ══════════════════════════════════════════════════════════════════════════════
// Count-aware equality
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn egal_identity_weakens_at_omega() {
    let l = lang();
    let st = Store::new();
    let a = Term::Addr(Address::egal("A", AddrId::Seq(0)));
    let b = Term::Addr(Address::egal("A", AddrId::Seq(1)));
    let addr = Address::egal("A", AddrId::Seq(0));

    let one = Counts::new().bump(&addr);
    assert_eq!(equal_abstract(&l, &st, &one, &a, &a).unwrap(), Ternary::True);

    let omega = one.bump(&addr);
    assert_eq!(
        equal_abstract(&l, &st, &omega, &a, &a).unwrap(),
        Ternary::Unknown
    );

    // Distinct egal addresses are never equal, whatever the counts.
    assert_eq!(
        equal_abstract(&l, &st, &omega, &a, &b).unwrap(),
        Ternary::False
    );
}

#[test]
fn equal_expression_fans_out_on_unknown() {
    let m = Machine::abstracted(lang());
    let addr = Address::egal("A", AddrId::Seq(0));
    let counts = Counts::new().bump(&addr).bump(&addr);
    let env = Env::new().bind(&Arc::from("a"), Term::Addr(addr));
    let rows = m
        .eval_expr(
            &Expr::equal(Expr::var("a"), Expr::var("a")),
            &env,
            &Store::new(),
            &counts,
        )
        .unwrap();
    let mut vals: Vec<(Term, Quality)> =
        rows.into_iter().map(|e| (e.value, e.quality)).collect();
    vals.sort();
    assert_eq!(
        vals,
        vec![
            (Term::bool(false), Quality::May),
            (Term::bool(true), Quality::May),
        ]
    );
}

#[test]
fn may_truthy_guard_explores_both_branches() {
    let m = Machine::abstracted(lang());
    let a = Address::structural("A", AddrId::Seq(0));
    let st = Store::new()
        .write_strong(&a, Term::bool(true))
        .write_weak(&a, Term::bool(false));
    let env = Env::new().bind(&Arc::from("g"), Term::Addr(a));
    let e = Expr::if_(
        Expr::var("g"),
        Expr::term(Pattern::sym("yes")),
        Expr::term(Pattern::sym("no")),
    );
    let rows = m.eval_expr(&e, &env, &st, &Counts::new()).unwrap();
    let mut vals: Vec<(Term, Quality)> =
        rows.into_iter().map(|e| (e.value, e.quality)).collect();
    vals.sort();
    assert_eq!(
        vals,
        vec![
            (Term::sym("no"), Quality::May),
            (Term::sym("yes"), Quality::May),
        ]
    );
}

#[test]
fn imprecise_external_values_only_may_equal_themselves() {
    use opsem_lang::{ExternalValue, Space};
    let any = opsem_lang::space::ExternalSpace {
        name: Arc::from("AnyInt"),
        contains: Arc::new(|t| matches!(t, Term::Atom(Atom::Sym(_)))),
        cardinality: Arc::new(|_| Cardinality::Many),
        imprecise: true,
        special_equal: None,
    };
    let l = Language::new("ext", vec![("AnyInt".to_string(), Space::External(any))]).unwrap();
    let v = Term::External(ExternalValue::new("AnyInt", Term::sym("top")));

    // Abstractly, one ⊤-like value stands for many integers.
    assert_eq!(
        equal_abstract(&l, &Store::new(), &Counts::new(), &v, &v).unwrap(),
        Ternary::Unknown
    );
    // Concretely it is still just itself.
    assert!(opsem_engine::equal_concrete(&l, &Store::new(), &v, &v).unwrap());
}

#[test]
fn special_equality_oracle_is_consulted_first() {
    use opsem_lang::{ExternalValue, Space};
    let modular = opsem_lang::space::ExternalSpace {
        name: Arc::from("Mod2"),
        contains: Arc::new(|t| matches!(t, Term::Atom(Atom::Int(_)))),
        cardinality: Arc::new(|_| Cardinality::One),
        imprecise: false,
        // Equality modulo 2.
        special_equal: Some(Arc::new(|a, b| match (a, b) {
            (Term::Atom(Atom::Int(x)), Term::Atom(Atom::Int(y))) => {
                Ternary::from_bool((x % 2) == (y % 2))
            }
            _ => Ternary::Unknown,
        })),
    };
    let l = Language::new("ext", vec![("Mod2".to_string(), Space::External(modular))]).unwrap();
    let two = Term::External(ExternalValue::new("Mod2", Term::int(2)));
    let four = Term::External(ExternalValue::new("Mod2", Term::int(4)));
    let three = Term::External(ExternalValue::new("Mod2", Term::int(3)));
    let st = Store::new();
    let ct = Counts::new();
    assert_eq!(equal_abstract(&l, &st, &ct, &two, &four).unwrap(), Ternary::True);
    assert_eq!(equal_abstract(&l, &st, &ct, &two, &three).unwrap(), Ternary::False);
}

// ══════════════════════════════════════════════════════════════════════════════
// Abstract allocation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn abstract_allocation_is_deterministic() {
    let m = Machine::abstracted(lang());
    let first = m
        .eval_expr(&Expr::malloc("A"), &Env::new(), &Store::new(), &Counts::new())
        .unwrap();
    let second = m
        .eval_expr(&Expr::malloc("A"), &Env::new(), &Store::new(), &Counts::new())
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn concrete_allocation_is_not() {
    let m = Machine::concrete(lang());
    let first = m
        .eval_expr(&Expr::malloc("A"), &Env::new(), &Store::new(), &Counts::new())
        .unwrap();
    let second = m
        .eval_expr(&Expr::malloc("A"), &Env::new(), &Store::new(), &Counts::new())
        .unwrap();
    assert_ne!(first, second);
}

#[test]
fn hints_distinguish_abstract_addresses() {
    let m = Machine::abstracted(lang());
    let with_hint = |h: i64| {
        m.eval_expr(
            &Expr::qmalloc("A", Expr::term(Pattern::int(h))),
            &Env::new(),
            &Store::new(),
            &Counts::new(),
        )
        .unwrap()
        .into_iter()
        .next()
        .unwrap()
        .value
    };
    assert_ne!(with_hint(1), with_hint(2));
    assert_eq!(with_hint(1), with_hint(1));
}
