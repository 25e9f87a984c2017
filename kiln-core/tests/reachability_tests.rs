//! 可达性、正常完成与逃逸集测试

mod common;

use common::analyze;
use kiln_core::{Case, DiagnosticKind, Expr, JumpLabel, LabelSet, Location, NodeKind, Stmt};

fn is_while(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::While)
}

// ===== 语句序列 =====

#[test]
fn test_return_makes_rest_unreachable() {
    let fx = analyze(Stmt::block(vec![Stmt::ret(), Stmt::call("print")]));
    let mut ev = fx.session.evaluator();
    let print = fx.call_stmt("print");

    assert!(!fx.analysis.completes(&mut ev, fx.root()).unwrap());
    assert!(!fx.analysis.reachable(&mut ev, print).unwrap());

    fx.analysis.diagnose(&mut ev).unwrap();
    let diagnostics = fx.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnreachableStatement);
    assert_eq!(diagnostics[0].location, Location::new(3, 1));
    assert_eq!(diagnostics[0].to_string(), "3:1: [unreachable-statement] unreachable statement");
}

#[test]
fn test_unreachable_run_reported_once() {
    let fx = analyze(Stmt::block(vec![
        Stmt::call("first"),
        Stmt::ret(),
        Stmt::call("second"),
        Stmt::call("third"),
    ]));
    let mut ev = fx.session.evaluator();
    fx.analysis.diagnose(&mut ev).unwrap();

    assert_eq!(fx.count(DiagnosticKind::UnreachableStatement), 1);
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("first")).unwrap());
    assert!(!fx.analysis.reachable(&mut ev, fx.call_stmt("third")).unwrap());
}

#[test]
fn test_repeated_diagnose_reports_nothing_new() {
    let fx = analyze(Stmt::block(vec![Stmt::ret(), Stmt::call("print")]));
    let mut ev = fx.session.evaluator();
    fx.analysis.diagnose(&mut ev).unwrap();
    fx.analysis.diagnose(&mut ev).unwrap();

    let mut other = fx.session.evaluator();
    fx.analysis.diagnose(&mut other).unwrap();
    assert_eq!(fx.count(DiagnosticKind::UnreachableStatement), 1);
}

#[test]
fn test_empty_block_completes() {
    let fx = analyze(Stmt::block(vec![]));
    let mut ev = fx.session.evaluator();
    assert!(fx.analysis.completes(&mut ev, fx.root()).unwrap());
    assert!(fx.analysis.breaks(&mut ev, fx.root()).unwrap().is_empty());
}

#[test]
fn test_if_else_both_branches_return() {
    let fx = analyze(Stmt::block(vec![
        Stmt::if_else(Expr::name("c"), Stmt::ret(), Stmt::throw("Panic")),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();
    assert!(!fx.analysis.reachable(&mut ev, fx.call_stmt("after")).unwrap());

    let fx = analyze(Stmt::block(vec![
        Stmt::if_then(Expr::bool(false), Stmt::ret()),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("after")).unwrap());
}

// ===== 循环语句 =====

#[test]
fn test_conditional_break_leaves_infinite_loop() {
    let fx = analyze(Stmt::while_loop(
        Expr::bool(true),
        Stmt::block(vec![Stmt::if_then(Expr::name("cond"), Stmt::brk())]),
    ));
    let mut ev = fx.session.evaluator();
    let body = fx.one(|kind| matches!(kind, NodeKind::Block));

    assert_eq!(
        fx.analysis.breaks(&mut ev, body).unwrap(),
        LabelSet::singleton(JumpLabel::Unlabeled)
    );
    assert!(fx.analysis.breaks(&mut ev, fx.root()).unwrap().is_empty());
    assert!(fx.analysis.completes(&mut ev, fx.root()).unwrap());
}

#[test]
fn test_infinite_loop_hides_following_statement() {
    let fx = analyze(Stmt::block(vec![
        Stmt::while_loop(Expr::bool(true), Stmt::call("tick")),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();
    let lp = fx.one(is_while);

    assert!(!fx.analysis.completes(&mut ev, lp).unwrap());
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("tick")).unwrap());

    fx.analysis.diagnose(&mut ev).unwrap();
    let diagnostics = fx.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].location, Location::new(4, 1));
}

#[test]
fn test_false_guard_body_unreachable() {
    let fx = analyze(Stmt::while_loop(
        Expr::bool(false),
        Stmt::block(vec![Stmt::call("never"), Stmt::call("again")]),
    ));
    let mut ev = fx.session.evaluator();

    assert!(fx.analysis.completes(&mut ev, fx.root()).unwrap());
    fx.analysis.diagnose(&mut ev).unwrap();

    let diagnostics = fx.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    // 报告在循环体上，而不是体内每条语句上
    assert_eq!(diagnostics[0].location, Location::new(2, 1));
}

#[test]
fn test_unknown_guard_loop_completes() {
    let fx = analyze(Stmt::block(vec![
        Stmt::while_loop(Expr::name("more"), Stmt::call("tick")),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("after")).unwrap());
}

#[test]
fn test_do_while_completion() {
    let cases = [
        (Stmt::block(vec![Stmt::brk()]), Expr::bool(true), true),
        (Stmt::call("tick"), Expr::bool(true), false),
        (Stmt::call("tick"), Expr::name("c"), true),
        (Stmt::block(vec![Stmt::cont()]), Expr::bool(false), true),
        (Stmt::ret(), Expr::name("c"), false),
    ];

    for (body, cond, expected) in cases {
        let fx = analyze(Stmt::do_while(body.clone(), cond.clone()));
        let mut ev = fx.session.evaluator();
        assert_eq!(
            fx.analysis.completes(&mut ev, fx.root()).unwrap(),
            expected,
            "do {body:?} while ({cond:?})"
        );
        assert!(fx.analysis.continues(&mut ev, fx.root()).unwrap().is_empty());
    }
}

#[test]
fn test_continue_to_own_label_reaches_do_while_guard() {
    let fx = analyze(Stmt::block(vec![
        Stmt::labeled(
            "retry",
            Stmt::do_while(
                Stmt::block(vec![
                    Stmt::if_then(Expr::name("again"), Stmt::cont_to("retry")),
                    Stmt::ret(),
                ]),
                Expr::name("pending"),
            ),
        ),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();
    let labeled = fx.one(|kind| matches!(kind, NodeKind::Labeled(_)));

    assert!(fx.analysis.completes(&mut ev, labeled).unwrap());
    assert!(fx.analysis.continues(&mut ev, labeled).unwrap().is_empty());
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("after")).unwrap());
    fx.analysis.diagnose(&mut ev).unwrap();
    assert_eq!(fx.count(DiagnosticKind::UnreachableStatement), 0);
}

#[test]
fn test_continue_to_outer_label_skips_do_while_guard() {
    let fx = analyze(Stmt::labeled(
        "outer",
        Stmt::while_loop(
            Expr::name("c"),
            Stmt::do_while(
                Stmt::block(vec![Stmt::cont_to("outer")]),
                Expr::name("pending"),
            ),
        ),
    ));
    let mut ev = fx.session.evaluator();
    let inner = fx.one(|kind| matches!(kind, NodeKind::DoWhile));
    assert!(!fx.analysis.completes(&mut ev, inner).unwrap());
}

// ===== 标签 =====

#[test]
fn test_labeled_break_is_stripped_by_its_label() {
    let fx = analyze(Stmt::block(vec![
        Stmt::labeled(
            "outer",
            Stmt::while_loop(
                Expr::bool(true),
                Stmt::while_loop(Expr::bool(true), Stmt::brk_to("outer")),
            ),
        ),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();
    let loops = fx.find(is_while);
    let (outer_loop, inner_loop) = (loops[0], loops[1]);
    let labeled = fx.one(|kind| matches!(kind, NodeKind::Labeled(_)));
    let outer = LabelSet::singleton(JumpLabel::named("outer"));

    assert_eq!(fx.analysis.breaks(&mut ev, inner_loop).unwrap(), outer);
    assert_eq!(fx.analysis.breaks(&mut ev, outer_loop).unwrap(), outer);
    assert!(fx.analysis.breaks(&mut ev, labeled).unwrap().is_empty());

    assert!(!fx.analysis.completes(&mut ev, outer_loop).unwrap());
    assert!(fx.analysis.completes(&mut ev, labeled).unwrap());
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("after")).unwrap());
}

#[test]
fn test_labeled_continue_escapes_inner_loop() {
    let fx = analyze(Stmt::labeled(
        "rows",
        Stmt::while_loop(
            Expr::name("r"),
            Stmt::while_loop(Expr::name("c"), Stmt::cont_to("rows")),
        ),
    ));
    let mut ev = fx.session.evaluator();
    let loops = fx.find(is_while);

    assert_eq!(
        fx.analysis.continues(&mut ev, loops[1]).unwrap(),
        LabelSet::singleton(JumpLabel::named("rows"))
    );
    assert!(fx.analysis.continues(&mut ev, fx.root()).unwrap().is_empty());
    fx.analysis.diagnose(&mut ev).unwrap();
    assert!(fx.buffer().is_empty());
}

#[test]
fn test_break_out_of_labeled_block() {
    let fx = analyze(Stmt::labeled(
        "done",
        Stmt::block(vec![Stmt::brk_to("done"), Stmt::call("skipped")]),
    ));
    let mut ev = fx.session.evaluator();

    assert!(!fx.analysis.reachable(&mut ev, fx.call_stmt("skipped")).unwrap());
    assert!(fx.analysis.completes(&mut ev, fx.root()).unwrap());
}

// ===== switch 语句 =====

#[test]
fn test_switch_completion() {
    let with_break = analyze(Stmt::switch(
        Expr::name("x"),
        vec![
            Case::case(vec![Stmt::call("a"), Stmt::brk()]),
            Case::default(vec![Stmt::ret()]),
        ],
    ));
    let all_return = analyze(Stmt::block(vec![
        Stmt::switch(
            Expr::name("x"),
            vec![Case::case(vec![Stmt::ret()]), Case::default(vec![Stmt::ret()])],
        ),
        Stmt::call("after"),
    ]));
    let no_default = analyze(Stmt::switch(Expr::name("x"), vec![Case::case(vec![Stmt::ret()])]));
    let no_cases = analyze(Stmt::switch(Expr::name("x"), vec![]));

    let mut ev = with_break.session.evaluator();
    assert!(with_break.analysis.completes(&mut ev, with_break.root()).unwrap());
    assert!(with_break.analysis.breaks(&mut ev, with_break.root()).unwrap().is_empty());

    let mut ev = all_return.session.evaluator();
    assert!(!all_return.analysis.reachable(&mut ev, all_return.call_stmt("after")).unwrap());

    let mut ev = no_default.session.evaluator();
    assert!(no_default.analysis.completes(&mut ev, no_default.root()).unwrap());

    let mut ev = no_cases.session.evaluator();
    assert!(no_cases.analysis.completes(&mut ev, no_cases.root()).unwrap());
}

#[test]
fn test_switch_keeps_continue() {
    let fx = analyze(Stmt::while_loop(
        Expr::name("c"),
        Stmt::switch(Expr::name("x"), vec![Case::case(vec![Stmt::cont()])]),
    ));
    let mut ev = fx.session.evaluator();
    let switch = fx.one(|kind| matches!(kind, NodeKind::Switch));

    assert_eq!(
        fx.analysis.continues(&mut ev, switch).unwrap(),
        LabelSet::singleton(JumpLabel::Unlabeled)
    );
    assert!(fx.analysis.continues(&mut ev, fx.root()).unwrap().is_empty());
}

// ===== try 语句 =====

#[test]
fn test_finally_that_returns_swallows_break() {
    let fx = analyze(Stmt::while_loop(
        Expr::name("c"),
        Stmt::try_finally(Stmt::brk(), vec![], Stmt::ret()),
    ));
    let mut ev = fx.session.evaluator();
    let try_stmt = fx.one(|kind| matches!(kind, NodeKind::Try));

    assert!(fx.analysis.breaks(&mut ev, try_stmt).unwrap().is_empty());
    assert!(!fx.analysis.completes(&mut ev, try_stmt).unwrap());
}

#[test]
fn test_try_completes_through_catch() {
    let fx = analyze(Stmt::block(vec![
        Stmt::try_catch(Stmt::ret(), vec![("IoError", Stmt::call("recover"))]),
        Stmt::call("after"),
    ]));
    let mut ev = fx.session.evaluator();
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("recover")).unwrap());
    assert!(fx.analysis.reachable(&mut ev, fx.call_stmt("after")).unwrap());
}
