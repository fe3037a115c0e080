#![cfg(feature = "z3")]

use covenant_ast::{no_span, BinOp, Expr, StringComparison, StringOp};
use covenant_verify::{length_symbol, BvInfo, Reason, SmtType, Translator, UnsupportedType, VerifyOptions};
use z3::ast::Ast;
use z3::{Config, Context, SatResult, Solver};

fn ctx() -> Context {
    let mut cfg = Config::new();
    cfg.set_model_generation(true);
    Context::new(&cfg)
}

#[test]
fn unsupported_declarations_are_distinguished() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());

    let float = tr.try_declare("x", "f64", no_span()).expect_err("f64");
    let dynamic = tr.try_declare("o", "object", no_span()).expect_err("object");
    assert!(matches!(float.reason, Reason::Type(UnsupportedType::FloatingPoint(_))));
    assert!(matches!(dynamic.reason, Reason::Type(UnsupportedType::Dynamic(_))));
    assert_ne!(float.to_string(), dynamic.to_string());
    assert!(float.to_string().contains("floating-point not supported"));
    assert!(!tr.declare("x", "double"));
    assert!(tr.lookup("x").is_none());
}

#[test]
fn mixed_width_sum_commutes() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());
    assert!(tr.declare("a", "short"));
    assert!(tr.declare("b", "ulong"));

    let ab = tr
        .translate(&Expr::binary(Expr::ident("a"), BinOp::Add, Expr::ident("b")))
        .expect("a + b");
    let ba = tr
        .translate(&Expr::binary(Expr::ident("b"), BinOp::Add, Expr::ident("a")))
        .expect("b + a");
    let (ab, ba) = (ab.as_bv().expect("bv").clone(), ba.as_bv().expect("bv").clone());
    assert_eq!(ab.get_size(), 64);
    assert_eq!(ba.get_size(), 64);

    let solver = Solver::new(&ctx);
    solver.assert(&ab._eq(&ba).not());
    assert_eq!(solver.check(), SatResult::Unsat);
}

#[test]
fn array_length_is_one_term_under_both_spellings() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());
    assert!(tr.declare("arr", "i32[]"));

    let by_name = tr.lookup(&length_symbol("arr")).cloned().expect("arr$length");
    let by_access = tr.translate(&Expr::length("arr")).expect("arr.Length");
    assert_eq!(by_name.as_dynamic(), by_access.as_dynamic());
    assert_eq!(tr.kind_of(&by_access), Some(SmtType::BitVec(BvInfo::U32)));

    let elem = tr.translate(&Expr::index("arr", Expr::ident("arr$length"))).expect("arr[len]");
    assert_eq!(tr.kind_of(&elem), Some(SmtType::BitVec(BvInfo::I32)));
    assert!(tr.warnings().is_empty());
}

#[test]
fn non_ordinal_mode_warns_exactly_once() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());
    assert!(tr.declare("s", "string"));

    let ends = Expr::string_op(
        StringOp::EndsWith,
        Expr::ident("s"),
        vec![Expr::string("z")],
        Some(StringComparison::InvariantCulture),
    );
    assert!(tr.translate(&ends).is_some());
    assert_eq!(tr.warnings().len(), 1);
    assert!(tr.warnings()[0].contains("InvariantCulture"));

    let ordinal = Expr::string_op(
        StringOp::EndsWith,
        Expr::ident("s"),
        vec![Expr::string("z")],
        Some(StringComparison::Ordinal),
    );
    assert!(tr.translate(&ordinal).is_some());
    assert_eq!(tr.warnings().len(), 1);
}

#[test]
fn shadowing_binder_restores_outer_binding() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());
    assert!(tr.declare("x", "int"));
    let outer = tr.lookup("x").cloned().expect("x").as_dynamic();

    let ok = Expr::forall(&[("x", "long")], Expr::binary(Expr::ident("x"), BinOp::Eq, Expr::ident("x")));
    assert!(tr.translate(&ok).is_some());
    assert_eq!(tr.lookup("x").map(|t| t.as_dynamic()), Some(outer.clone()));
    assert_eq!(tr.symbols().get("x").map(|b| b.ty), Some(SmtType::BitVec(BvInfo::I32)));

    let failing = Expr::forall(
        &[("x", "long")],
        Expr::binary(Expr::ident("x"), BinOp::Gt, Expr::float(0.5)),
    );
    assert!(tr.translate(&failing).is_none());
    assert_eq!(tr.lookup("x").map(|t| t.as_dynamic()), Some(outer));
    assert_eq!(tr.symbols().depth(), 0);
}

#[test]
fn binder_only_names_disappear_after_quantifier() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());
    let q = Expr::exists(&[("k", "uint")], Expr::binary(Expr::ident("k"), BinOp::Gt, Expr::int(3)));
    assert!(tr.translate(&q).is_some());
    assert!(tr.lookup("k").is_none());
    assert!(tr.translate(&Expr::ident("k")).is_none());
}

#[test]
fn too_many_binders_are_rejected() {
    let ctx = ctx();
    let opts = VerifyOptions {
        max_quantifier_binders: 1,
        ..VerifyOptions::default()
    };
    let mut tr = Translator::new(&ctx, &opts);
    let q = Expr::forall(&[("i", "int"), ("j", "int")], Expr::bool(true));
    let err = tr.translate_checked(&q).expect_err("too many");
    assert_eq!(err.reason, Reason::TooManyBinders { found: 2, max: 1 });
}

#[test]
fn diagnose_of_quantifier_does_not_leak_binders() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());
    let q = Expr::forall(
        &[("i", "int")],
        Expr::binary(Expr::index("zs", Expr::ident("i")), BinOp::Gt, Expr::call("f", vec![])),
    );
    let err = tr.diagnose(&q).expect("diagnosis");
    assert_eq!(err.reason, Reason::Call("f".to_string()));
    assert!(tr.lookup("i").is_none());
    assert!(tr.lookup("zs").is_none());
    assert!(tr.warnings().is_empty());
}

#[test]
fn concat_translates_and_arity_is_checked() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());
    assert!(tr.declare("s", "string"));
    assert!(tr.declare("n", "int"));

    let cat = Expr::string_op(StringOp::Concat, Expr::string("a"), vec![Expr::ident("s"), Expr::string("b")], None);
    let t = tr.translate(&cat).expect("concat");
    assert_eq!(tr.kind_of(&t), Some(SmtType::String));

    let bad = Expr::string_op(StringOp::Contains, Expr::ident("s"), vec![], None);
    let err = tr.translate_checked(&bad).expect_err("arity");
    assert!(matches!(err.reason, Reason::Arity { found: 0, .. }));

    let sub = Expr::string_op(StringOp::Substring, Expr::ident("s"), vec![Expr::ident("n")], None);
    let err = tr.translate_checked(&sub).expect_err("substring");
    assert_eq!(err.reason, Reason::StringOperation("Substring".to_string()));
}

#[test]
fn array_first_used_inside_quantifier_stays_declared() {
    let ctx = ctx();
    let mut tr = Translator::new(&ctx, &VerifyOptions::default());
    let body = Expr::binary(
        Expr::index("xs", Expr::ident("i")),
        BinOp::Le,
        Expr::index("xs", Expr::binary(Expr::ident("i"), BinOp::Add, Expr::int(1))),
    );
    assert!(tr.translate(&Expr::forall(&[("i", "int")], body)).is_some());
    assert!(tr.lookup("xs").is_some());
    assert!(tr.lookup(&length_symbol("xs")).is_some());
    assert_eq!(tr.warnings().len(), 1, "{:?}", tr.warnings());

    let after = tr.translate(&Expr::index("xs", Expr::int(0))).expect("xs[0]");
    assert_eq!(tr.kind_of(&after), Some(SmtType::BitVec(BvInfo::I32)));
    assert_eq!(tr.warnings().len(), 1);
}
