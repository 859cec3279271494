//! Parser and printer tests: lexing, reading, space-directed
//! elaboration, error cases, and print/parse round-trips.

use opsem_lang::term::{AddrId, Address};
use opsem_lang::{
    Alternative, Component, ExternalSpace, Language, MapClass, MapValue, Space, Term, VariantDesc,
};
use opsem_sexp::{parse_term, print_term, read, ParseError, Sexp};
use proptest::prelude::*;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// `E = (App E E) | (Lam Symbol E) | (Var Symbol) | (Env {Symbol E})
///    | (Many #{E}) | (Loc A)` over symbol/integer externals and an
/// address space `A`.
fn lang() -> Language {
    let app = VariantDesc::new("App", vec![Component::space("E"), Component::space("E")]);
    let lam = VariantDesc::new(
        "Lam",
        vec![Component::space("Symbol"), Component::space("E")],
    );
    let var = VariantDesc::new("Var", vec![Component::space("Symbol")]);
    let env = VariantDesc::new(
        "Env",
        vec![Component::map(
            Component::space("Symbol"),
            Component::space("E"),
        )],
    );
    let many = VariantDesc::new("Many", vec![Component::set_of(Component::space("E"))]);
    let loc = VariantDesc::new("Loc", vec![Component::addr("A")]);
    Language::new(
        "lam",
        vec![
            (
                "E".to_string(),
                Space::user(vec![
                    Alternative::Variant(app),
                    Alternative::Variant(lam),
                    Alternative::Variant(var),
                    Alternative::Variant(env),
                    Alternative::Variant(many),
                    Alternative::Variant(loc),
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
            ("A".to_string(), Space::address("A")),
        ],
    )
    .expect("test language is valid")
}

fn desc(name: &str) -> std::sync::Arc<VariantDesc> {
    let l = lang();
    l.variant_in("E", name).unwrap().expect("variant exists")
}

fn var(name: &str) -> Term {
    Term::variant(&desc("Var"), vec![Term::sym(name)])
}

// ══════════════════════════════════════════════════════════════════════════════
// Reader
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn read_atoms() {
    assert!(matches!(read("42").unwrap(), Sexp::Int(n, _) if n == 42.into()));
    assert!(matches!(read("-7").unwrap(), Sexp::Int(n, _) if n == (-7).into()));
    assert!(matches!(read("#t").unwrap(), Sexp::Bool(true, _)));
    assert!(matches!(read("#\\x").unwrap(), Sexp::Char('x', _)));
    assert!(matches!(read("#\\space").unwrap(), Sexp::Char(' ', _)));
    assert!(matches!(read("hello").unwrap(), Sexp::Sym(s, _) if s == "hello"));
    assert!(matches!(read("\"a\\nb\"").unwrap(), Sexp::Str(s, _) if s == "a\nb"));
}

#[test]
fn read_nested_lists() {
    let sx = read("(App (Var a) (Var b))").unwrap();
    match sx {
        Sexp::List(elems, _) => {
            assert_eq!(elems.len(), 3);
            assert!(matches!(&elems[0], Sexp::Sym(s, _) if s == "App"));
        }
        other => panic!("expected a list, got {other:?}"),
    }
}

#[test]
fn read_map_and_set_literals() {
    assert!(matches!(read("{x 1 y 2}").unwrap(), Sexp::MapLit(pairs, _) if pairs.len() == 2));
    assert!(matches!(read("#{1 2 3}").unwrap(), Sexp::SetLit(elems, _) if elems.len() == 3));
}

#[test]
fn read_comments_and_whitespace() {
    let sx = read("; a term\n  (Var x) ; trailing\n").unwrap();
    assert!(matches!(sx, Sexp::List(..)));
}

#[test]
fn read_errors() {
    assert!(matches!(read("{x}").unwrap_err(), ParseError::UnevenMapLiteral { .. }));
    assert!(matches!(read("(Var x").unwrap_err(), ParseError::UnexpectedEof));
    assert!(matches!(read(")").unwrap_err(), ParseError::UnexpectedToken { .. }));
    assert!(matches!(read("(Var x) 1").unwrap_err(), ParseError::TrailingInput { .. }));
    assert!(matches!(read("\"oops").unwrap_err(), ParseError::UnterminatedString { .. }));
    assert!(matches!(read("#q").unwrap_err(), ParseError::InvalidHashForm { .. }));
}

// ══════════════════════════════════════════════════════════════════════════════
// Space-directed elaboration
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn parse_variant_terms() {
    let l = lang();
    let t = parse_term(&l, "E", "(App (Lam a (Var a)) (Var b))").unwrap();
    let expected = Term::variant(
        &desc("App"),
        vec![
            Term::variant(&desc("Lam"), vec![Term::sym("a"), var("a")]),
            var("b"),
        ],
    );
    assert_eq!(t, expected);
}

#[test]
fn parse_atom_through_inclusion() {
    let l = lang();
    assert_eq!(parse_term(&l, "E", "42").unwrap(), Term::int(42));
}

#[test]
fn parse_map_component() {
    let l = lang();
    let t = parse_term(&l, "E", "(Env {x (Var y)})").unwrap();
    let expected = Term::variant(
        &desc("Env"),
        vec![Term::Map(MapValue::from_entries(
            MapClass::Discrete,
            vec![(Term::sym("x"), var("y"))],
        ))],
    );
    assert_eq!(t, expected);
}

#[test]
fn parse_set_component() {
    let l = lang();
    let t = parse_term(&l, "E", "(Many #{(Var a) (Var b)})").unwrap();
    let expected = Term::variant(&desc("Many"), vec![Term::set(vec![var("a"), var("b")])]);
    assert_eq!(t, expected);
}

#[test]
fn parse_egal_address_identifiers() {
    let l = lang();
    let named = parse_term(&l, "E", "(Loc k0)").unwrap();
    let expected = Term::variant(
        &desc("Loc"),
        vec![Term::Addr(Address::egal("A", AddrId::Name("k0".into())))],
    );
    assert_eq!(named, expected);

    let seq = parse_term(&l, "E", "(Loc @7)").unwrap();
    let expected = Term::variant(
        &desc("Loc"),
        vec![Term::Addr(Address::egal("A", AddrId::Seq(7)))],
    );
    assert_eq!(seq, expected);
}

#[test]
fn parse_unknown_variant_head() {
    let l = lang();
    assert!(matches!(
        parse_term(&l, "E", "(Nope 1)").unwrap_err(),
        ParseError::UnknownVariantHead { head, .. } if head == "Nope"
    ));
}

#[test]
fn parse_arity_mismatch() {
    let l = lang();
    assert!(matches!(
        parse_term(&l, "E", "(App (Var a))").unwrap_err(),
        ParseError::ArityMismatch { expected: 2, got: 1, .. }
    ));
}

#[test]
fn parse_type_mismatch_against_component() {
    let l = lang();
    // Env wants a map literal.
    assert!(matches!(
        parse_term(&l, "E", "(Env 42)").unwrap_err(),
        ParseError::TypeMismatch { .. }
    ));
}

#[test]
fn parse_rejects_value_outside_space() {
    let l = lang();
    assert!(matches!(
        parse_term(&l, "E", "\"str\"").unwrap_err(),
        ParseError::NoAlternative { .. }
    ));
}

#[test]
fn parse_undefined_space() {
    let l = lang();
    assert!(matches!(
        parse_term(&l, "Nope", "1").unwrap_err(),
        ParseError::Lang(_)
    ));
}

#[test]
fn parse_errors_serialize_to_json() {
    let err = parse_term(&lang(), "E", "(App (Var a))").unwrap_err();
    let json = serde_json::to_string(&err).expect("serializable");
    assert!(json.contains("ArityMismatch"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Printing and round-trips
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn print_variants_and_atoms() {
    let t = Term::variant(
        &desc("App"),
        vec![
            Term::variant(&desc("Lam"), vec![Term::sym("a"), var("a")]),
            var("b"),
        ],
    );
    assert_eq!(print_term(&t).unwrap(), "(App (Lam a (Var a)) (Var b))");
}

#[test]
fn print_structural_address_is_an_error() {
    let t = Term::Addr(Address::structural("A", AddrId::Seq(0)));
    assert!(print_term(&t).is_err());
}

#[test]
fn round_trip_fixed_terms() {
    let l = lang();
    for src in [
        "(Var x)",
        "(App (Var x) (Var y))",
        "(Lam f (App (Var f) 3))",
        "(Env {a (Var b) c 12})",
        "(Many #{(Var a) 4})",
        "(Loc @3)",
        "(Loc cell)",
    ] {
        let t = parse_term(&l, "E", src).unwrap();
        let printed = print_term(&t).unwrap();
        let back = parse_term(&l, "E", &printed).unwrap();
        assert_eq!(back, t, "round-trip through {printed}");
    }
}

// ── Generated round-trips ────────────────────────────────────────────

/// Terms of the `E` space, depth-bounded.
fn arb_term() -> impl Strategy<Value = Term> {
    let sym = "[a-z][a-z0-9]{0,4}";
    let leaf = prop_oneof![
        sym.prop_map(|s| Term::variant(&desc("Var"), vec![Term::sym(s)])),
        any::<i64>().prop_map(Term::int),
        (0u64..100).prop_map(|n| Term::variant(
            &desc("Loc"),
            vec![Term::Addr(Address::egal("A", AddrId::Seq(n)))]
        )),
    ];
    leaf.prop_recursive(3, 24, 4, move |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(f, a)| {
                Term::variant(&desc("App"), vec![f, a])
            }),
            ("[a-z]{1,3}", inner.clone()).prop_map(|(x, b)| {
                Term::variant(&desc("Lam"), vec![Term::sym(x), b])
            }),
            prop::collection::btree_map("[a-z]{1,3}".prop_map(Term::sym), inner.clone(), 0..3)
                .prop_map(|m| {
                    Term::variant(
                        &desc("Env"),
                        vec![Term::Map(MapValue::from_entries(MapClass::Discrete, m))],
                    )
                }),
            prop::collection::btree_set(inner, 0..3).prop_map(|s| {
                Term::variant(&desc("Many"), vec![Term::Set(s)])
            }),
        ]
    })
}

proptest! {
    /// parse(print(d)) = d for any term of the space.
    #[test]
    fn round_trip_generated(t in arb_term()) {
        let l = lang();
        let printed = print_term(&t).unwrap();
        let back = parse_term(&l, "E", &printed).unwrap();
        prop_assert_eq!(back, t);
    }
}
