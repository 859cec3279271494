//! Language construction and structural membership tests.
//!
//! Covers:
//! - construction-time validation (references, arities, address tags,
//!   trust-recursion cliques)
//! - `in_space` / `in_variant` / `in_component` over every space kind

use opsem_lang::{
    in_component, in_space, Alternative, Component, ExternalSpace, LangError, Language, MapClass,
    MapValue, Space, Term, VariantDesc,
};
use opsem_lang::term::{AddrId, Address};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// A small lambda-calculus term language:
/// `E = (App E E) | (Lam Symbol E) | (Var Symbol)`.
fn lam_lang() -> Language {
    let app = VariantDesc::new("App", vec![Component::space("E"), Component::space("E")]);
    let lam = VariantDesc::new(
        "Lam",
        vec![Component::space("Symbol"), Component::space("E")],
    );
    let var = VariantDesc::new("Var", vec![Component::space("Symbol")]);
    Language::new(
        "lam",
        vec![
            (
                "E".to_string(),
                Space::user(vec![
                    Alternative::Variant(app),
                    Alternative::Variant(lam),
                    Alternative::Variant(var),
                ]),
            ),
            (
                "Symbol".to_string(),
                Space::External(ExternalSpace::symbols()),
            ),
        ],
    )
    .expect("lam language is valid")
}

fn var(name: &str) -> Term {
    let desc = VariantDesc::new("Var", vec![Component::space("Symbol")]);
    Term::variant(&desc, vec![Term::sym(name)])
}

// ══════════════════════════════════════════════════════════════════════════════
// Construction validation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn undefined_space_reference_rejected() {
    let bad = VariantDesc::new("C", vec![Component::space("Nowhere")]);
    let err = Language::new(
        "bad",
        vec![(
            "S".to_string(),
            Space::user(vec![Alternative::Variant(bad)]),
        )],
    )
    .unwrap_err();
    assert_eq!(err, LangError::UndefinedSpace("Nowhere".to_string()));
}

#[test]
fn variant_arity_must_agree_across_spaces() {
    let one = VariantDesc::new("Pair", vec![Component::Anything]);
    let two = VariantDesc::new("Pair", vec![Component::Anything, Component::Anything]);
    let err = Language::new(
        "bad",
        vec![
            (
                "A".to_string(),
                Space::user(vec![Alternative::Variant(one)]),
            ),
            (
                "B".to_string(),
                Space::user(vec![Alternative::Variant(two)]),
            ),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, LangError::VariantArityConflict { .. }));
}

#[test]
fn addr_component_must_name_address_space() {
    let boxed = VariantDesc::new("Box", vec![Component::addr("S")]);
    let err = Language::new(
        "bad",
        vec![(
            "S".to_string(),
            Space::user(vec![Alternative::Variant(boxed)]),
        )],
    )
    .unwrap_err();
    assert_eq!(err, LangError::NotAnAddressSpace("S".to_string()));
}

#[test]
fn duplicate_address_tags_rejected() {
    let err = Language::new(
        "bad",
        vec![
            ("A".to_string(), Space::address("heap")),
            ("B".to_string(), Space::address("heap")),
        ],
    )
    .unwrap_err();
    assert_eq!(err, LangError::DuplicateAddressTag("heap".to_string()));
}

#[test]
fn mutually_recursive_spaces_must_agree_on_trust() {
    let a = VariantDesc::new("A", vec![Component::space("T")]);
    let b = VariantDesc::new("B", vec![Component::space("S")]);
    let err = Language::new(
        "bad",
        vec![
            (
                "S".to_string(),
                Space::user_trusted(vec![Alternative::Variant(a.clone())]),
            ),
            (
                "T".to_string(),
                Space::user(vec![Alternative::Variant(b.clone())]),
            ),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, LangError::TrustRecursionMismatch { .. }));

    // Both trusted is fine.
    Language::new(
        "good",
        vec![
            (
                "S".to_string(),
                Space::user_trusted(vec![Alternative::Variant(a)]),
            ),
            (
                "T".to_string(),
                Space::user_trusted(vec![Alternative::Variant(b)]),
            ),
        ],
    )
    .expect("uniformly trusted clique is valid");
}

#[test]
fn self_recursion_without_trust_is_allowed() {
    // A single space referencing itself is recursive but not a
    // two-space clique; the flag is its own business.
    lam_lang();
}

// ══════════════════════════════════════════════════════════════════════════════
// Membership
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn variant_membership() {
    let lang = lam_lang();
    assert!(in_space(&lang, "E", &var("x")).unwrap());
    assert!(!in_space(&lang, "E", &Term::int(3)).unwrap());
}

#[test]
fn nested_variant_membership() {
    let lang = lam_lang();
    let lam = VariantDesc::new(
        "Lam",
        vec![Component::space("Symbol"), Component::space("E")],
    );
    let id = Term::variant(&lam, vec![Term::sym("a"), var("a")]);
    assert!(in_space(&lang, "E", &id).unwrap());

    // A Lam whose body is not an E fails.
    let bad = Term::variant(&lam, vec![Term::sym("a"), Term::int(1)]);
    assert!(!in_space(&lang, "E", &bad).unwrap());
}

#[test]
fn membership_on_undefined_space_is_an_error() {
    let lang = lam_lang();
    assert!(in_space(&lang, "Nope", &Term::int(0)).is_err());
}

#[test]
fn external_space_membership_uses_predicate() {
    let lang = lam_lang();
    assert!(in_space(&lang, "Symbol", &Term::sym("x")).unwrap());
    assert!(!in_space(&lang, "Symbol", &Term::int(7)).unwrap());
}

#[test]
fn address_space_membership_checks_tag() {
    let lang = Language::new(
        "l",
        vec![
            ("A".to_string(), Space::address("A")),
            ("B".to_string(), Space::address("B")),
        ],
    )
    .unwrap();
    let a = Term::Addr(Address::egal("A", AddrId::Seq(0)));
    let a_structural = Term::Addr(Address::structural("A", AddrId::Seq(1)));
    assert!(in_space(&lang, "A", &a).unwrap());
    // Both address kinds are members.
    assert!(in_space(&lang, "A", &a_structural).unwrap());
    assert!(!in_space(&lang, "B", &a).unwrap());
}

#[test]
fn map_component_membership_checks_every_entry() {
    let lang = lam_lang();
    let comp = Component::map(Component::space("Symbol"), Component::space("E"));
    let good = Term::Map(MapValue::from_entries(
        MapClass::Discrete,
        vec![(Term::sym("x"), var("y"))],
    ));
    let bad = Term::Map(MapValue::from_entries(
        MapClass::Discrete,
        vec![(Term::sym("x"), Term::int(3))],
    ));
    assert!(in_component(&lang, &comp, &good).unwrap());
    assert!(!in_component(&lang, &comp, &bad).unwrap());
    assert!(!in_component(&lang, &comp, &Term::int(3)).unwrap());
}

#[test]
fn set_component_membership_checks_every_element() {
    let lang = lam_lang();
    let comp = Component::set_of(Component::space("Symbol"));
    let good = Term::set(vec![Term::sym("a"), Term::sym("b")]);
    let bad = Term::set(vec![Term::sym("a"), Term::int(2)]);
    assert!(in_component(&lang, &comp, &good).unwrap());
    assert!(!in_component(&lang, &comp, &bad).unwrap());
}

#[test]
fn anything_accepts_everything() {
    let lang = lam_lang();
    assert!(in_component(&lang, &Component::Anything, &Term::int(42)).unwrap());
    assert!(in_component(&lang, &Component::Anything, &var("q")).unwrap());
}

#[test]
fn inclusion_membership_follows_space_refs() {
    // V = E | Integer
    let lang = {
        let var = VariantDesc::new("Var", vec![Component::space("Symbol")]);
        Language::new(
            "l",
            vec![
                (
                    "E".to_string(),
                    Space::user(vec![Alternative::Variant(var)]),
                ),
                (
                    "V".to_string(),
                    Space::user(vec![
                        Alternative::Ref("E".into()),
                        Alternative::Comp(Component::space("Integer")),
                    ]),
                ),
                (
                    "Symbol".to_string(),
                    Space::External(ExternalSpace::symbols()),
                ),
                (
                    "Integer".to_string(),
                    Space::External(ExternalSpace::integers()),
                ),
            ],
        )
        .unwrap()
    };
    assert!(in_space(&lang, "V", &var("x")).unwrap());
    assert!(in_space(&lang, "V", &Term::int(9)).unwrap());
    assert!(!in_space(&lang, "V", &Term::str("no")).unwrap());
}
