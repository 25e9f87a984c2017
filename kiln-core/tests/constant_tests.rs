//! 常量折叠与常量声明测试

mod common;

use common::analyze;
use kiln_core::tree::{BinaryOp, UnaryOp};
use kiln_core::{Const, DiagnosticKind, Expr, NodeKind, Stmt};

fn is_decl(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::ConstDecl(_))
}

#[test]
fn test_folds_declaration() {
    let init = Expr::binary(
        BinaryOp::Add,
        Expr::binary(BinaryOp::Mul, Expr::int(2), Expr::int(3)),
        Expr::unary(UnaryOp::Neg, Expr::int(1)),
    );
    let fx = analyze(Stmt::constant("limit", init));
    let mut ev = fx.session.evaluator();
    assert_eq!(fx.analysis.constant(&mut ev, fx.root()).unwrap(), Some(Const::Int(5)));
}

#[test]
fn test_names_follow_declarations() {
    let fx = analyze(Stmt::block(vec![
        Stmt::constant("base", Expr::int(10)),
        Stmt::constant("next", Expr::binary(BinaryOp::Add, Expr::name("base"), Expr::int(1))),
        Stmt::constant("big", Expr::binary(BinaryOp::Lt, Expr::name("base"), Expr::name("next"))),
    ]));
    let mut ev = fx.session.evaluator();
    let decls = fx.find(is_decl);

    assert_eq!(fx.analysis.constant(&mut ev, decls[1]).unwrap(), Some(Const::Int(11)));
    assert_eq!(fx.analysis.constant(&mut ev, decls[2]).unwrap(), Some(Const::Bool(true)));
}

#[test]
fn test_first_declaration_wins() {
    let fx = analyze(Stmt::block(vec![
        Stmt::constant("a", Expr::int(1)),
        Stmt::constant("a", Expr::int(2)),
        Stmt::constant("b", Expr::name("a")),
    ]));
    let mut ev = fx.session.evaluator();
    let decls = fx.find(is_decl);
    assert_eq!(fx.analysis.constant(&mut ev, decls[2]).unwrap(), Some(Const::Int(1)));
}

#[test]
fn test_non_constant_operands() {
    let fx = analyze(Stmt::block(vec![
        Stmt::constant("unknown", Expr::name("input")),
        Stmt::constant("ratio", Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0))),
        Stmt::constant("call", Expr::call("now", vec![])),
    ]));
    let mut ev = fx.session.evaluator();
    for decl in fx.find(is_decl) {
        assert_eq!(fx.analysis.constant(&mut ev, decl).unwrap(), None);
    }
    fx.analysis.diagnose(&mut ev).unwrap();
    assert!(fx.buffer().is_empty());
}

#[test]
fn test_constant_guard_decides_reachability() {
    let fx = analyze(Stmt::block(vec![
        Stmt::constant("running", Expr::unary(UnaryOp::Not, Expr::bool(false))),
        Stmt::while_loop(Expr::name("running"), Stmt::call("tick")),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();

    assert!(!fx.analysis.reachable(&mut ev, fx.call_stmt("after")).unwrap());
    fx.analysis.diagnose(&mut ev).unwrap();
    assert_eq!(fx.count(DiagnosticKind::UnreachableStatement), 1);
}

#[test]
fn test_mutual_definition_reported_once() {
    let fx = analyze(Stmt::block(vec![
        Stmt::constant("a", Expr::name("b")),
        Stmt::constant("b", Expr::name("a")),
        Stmt::while_loop(Expr::name("a"), Stmt::call("tick")),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();
    fx.analysis.diagnose(&mut ev).unwrap();

    let diagnostics = fx.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::CyclicDefinition);
    assert!(diagnostics[0].message.ends_with("is defined in terms of itself"));

    for decl in fx.find(is_decl) {
        assert_eq!(fx.analysis.constant(&mut ev, decl).unwrap(), None);
    }
    // 非常量条件不会截断语句序列
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("after")).unwrap());
    assert_eq!(fx.buffer().len(), 1);
}

#[test]
fn test_self_reference_reported_once() {
    let fx = analyze(Stmt::constant(
        "x",
        Expr::binary(BinaryOp::Add, Expr::name("x"), Expr::int(1)),
    ));
    let mut ev = fx.session.evaluator();

    assert_eq!(fx.analysis.constant(&mut ev, fx.root()).unwrap(), None);
    fx.analysis.diagnose(&mut ev).unwrap();

    let diagnostics = fx.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "constant `x` is defined in terms of itself");
}

#[test]
fn test_cycle_entered_through_guard_reported_once() {
    let fx = analyze(Stmt::block(vec![
        Stmt::constant("a", Expr::name("b")),
        Stmt::constant("b", Expr::name("a")),
        Stmt::while_loop(Expr::name("a"), Stmt::call("tick")),
    ]));
    let mut ev = fx.session.evaluator();
    let guard = fx.find(|kind| matches!(kind, NodeKind::Name(_)))[2];

    assert_eq!(fx.analysis.constant(&mut ev, guard).unwrap(), None);
    fx.analysis.diagnose(&mut ev).unwrap();
    assert_eq!(fx.count(DiagnosticKind::CyclicDefinition), 1);
}
