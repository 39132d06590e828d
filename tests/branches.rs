mod common;

use common::*;
use range_checker::analysis::diagnostics::DiagnosticCause;
use range_checker::ast::{BinaryOp, DeclaredType, Expr, IncDec, Statement};

#[test]
fn early_returns_form_a_union() {
    let program = single_method(
        vec![("x", DeclaredType::Short)],
        DeclaredType::Int,
        vec![
            Statement::if_then(
                Expr::binary(BinaryOp::Lt, Expr::local("x"), Expr::int(3)),
                vec![Statement::ret(Expr::int(2))],
            ),
            Statement::ret(Expr::int(1)),
        ],
    );
    let analysis = analyze(program, "T.f");
    assert_range(&returned(&analysis), 1, 2);
    let size = analysis.return_value.as_ref().map_or(0, |r| r.size);
    assert!(size <= 8, "tree of size {}", size);
    assert_range(&returned_with(&analysis, &[("x", 3, 10)]), 1, 1);
}

#[test]
fn implied_condition_does_not_fork() {
    let program = single_method(
        vec![("a", DeclaredType::Int)],
        DeclaredType::Int,
        vec![
            Statement::if_then(
                Expr::binary(BinaryOp::Gt, Expr::local("a"), Expr::int(5)),
                vec![Statement::if_then(
                    Expr::binary(BinaryOp::Gt, Expr::local("a"), Expr::int(3)),
                    vec![Statement::ret(Expr::int(1))],
                )],
            ),
            Statement::ret(Expr::int(0)),
        ],
    );
    let analysis = analyze(program, "T.f");
    assert_range(&returned(&analysis), 0, 1);
    assert_range(&returned_with(&analysis, &[("a", 6, 100)]), 1, 1);
    assert_range(&returned_with(&analysis, &[("a", -100, 5)]), 0, 0);
}

#[test]
fn forks_keep_values_correlated() {
    let program = single_method(
        vec![("x", DeclaredType::Int)],
        DeclaredType::Int,
        vec![
            Statement::declare_uninit("a", DeclaredType::Int),
            Statement::declare_uninit("b", DeclaredType::Int),
            Statement::if_else(
                Expr::binary(BinaryOp::Gt, Expr::local("x"), Expr::int(0)),
                vec![
                    Statement::expr(Expr::assign(Expr::local("a"), Expr::int(1))),
                    Statement::expr(Expr::assign(Expr::local("b"), Expr::int(1))),
                ],
                vec![
                    Statement::expr(Expr::assign(Expr::local("a"), Expr::int(-1))),
                    Statement::expr(Expr::assign(Expr::local("b"), Expr::int(-1))),
                ],
            ),
            Statement::ret(Expr::binary(BinaryOp::Mul, Expr::local("a"), Expr::local("b"))),
        ],
    );
    assert_range(&returned(&analyze(program, "T.f")), 1, 1);
}

#[test]
fn reassignment_drops_old_constraints() {
    let program = single_method(
        vec![("x", DeclaredType::Int)],
        DeclaredType::Int,
        vec![
            Statement::if_then(
                Expr::binary(BinaryOp::Gt, Expr::local("x"), Expr::int(10)),
                vec![
                    Statement::expr(Expr::assign(
                        Expr::local("x"),
                        Expr::binary(BinaryOp::Sub, Expr::local("x"), Expr::int(20)),
                    )),
                    Statement::if_then(
                        Expr::binary(BinaryOp::Lt, Expr::local("x"), Expr::int(0)),
                        vec![Statement::ret(Expr::int(1))],
                    ),
                    Statement::ret(Expr::int(2)),
                ],
            ),
            Statement::ret(Expr::int(3)),
        ],
    );
    assert_range(&returned(&analyze(program, "T.f")), 1, 3);
}

#[test]
fn short_circuit_skips_side_effects() {
    let program = single_method(
        vec![("x", DeclaredType::Int)],
        DeclaredType::Int,
        vec![
            Statement::declare("y", DeclaredType::Int, Expr::int(0)),
            Statement::declare(
                "t",
                DeclaredType::Boolean,
                Expr::binary(
                    BinaryOp::And,
                    Expr::binary(BinaryOp::Gt, Expr::local("x"), Expr::int(0)),
                    Expr::binary(
                        BinaryOp::Gt,
                        Expr::inc_dec(IncDec::PreIncrement, Expr::local("y")),
                        Expr::int(0),
                    ),
                ),
            ),
            Statement::ret(Expr::local("y")),
        ],
    );
    let analysis = analyze(program, "T.f");
    assert_range(&returned(&analysis), 0, 1);
    assert_range(&returned_with(&analysis, &[("x", -5, 0)]), 0, 0);
    assert_range(&returned_with(&analysis, &[("x", 1, 5)]), 1, 1);
}

#[test]
fn fork_cap_merges_and_stays_sound() {
    let mut body = vec![Statement::declare("s", DeclaredType::Int, Expr::int(0))];
    for bit in 0..8 {
        body.push(Statement::if_then(
            Expr::binary(
                BinaryOp::Ne,
                Expr::binary(
                    BinaryOp::BitAnd,
                    Expr::local("x"),
                    Expr::int(1 << bit),
                ),
                Expr::int(0),
            ),
            vec![Statement::expr(Expr::compound_assign(Expr::local("s"), BinaryOp::Add, Expr::int(1)))],
        ));
    }
    body.push(Statement::ret(Expr::local("s")));
    let program = single_method(vec![("x", DeclaredType::Int)], DeclaredType::Int, body);
    let options = range_checker::analysis::option::AnalysisOption {
        max_forks: 4,
        ..Default::default()
    };
    let analysis = analyze_with(program, "T.f", options);
    assert!(has_diagnostic(&analysis, DiagnosticCause::ForkCap));
    let interval = returned(&analysis);
    assert!(contains(&interval, 0));
    assert!(contains(&interval, 8));
}

fn divide_in_condition(guard: Option<Expr>) -> Vec<Statement> {
    let divided = Statement::if_then(
        Expr::binary(
            BinaryOp::Gt,
            Expr::binary(BinaryOp::Div, Expr::int(10), Expr::local("x")),
            Expr::int(2),
        ),
        vec![Statement::ret(Expr::int(1))],
    );
    let inner = match guard {
        Some(guard) => Statement::if_then(guard, vec![divided]),
        None => divided,
    };
    vec![inner, Statement::ret(Expr::int(0))]
}

#[test]
fn division_by_zero_in_condition_is_reported() {
    let program = single_method(vec![("x", DeclaredType::Int)], DeclaredType::Int, divide_in_condition(None));
    let analysis = analyze(program, "T.f");
    assert!(has_diagnostic(&analysis, DiagnosticCause::DivZero));
    assert_range(&returned(&analysis), 0, 1);
}

#[test]
fn guarded_division_in_condition_is_not_reported() {
    let guard = Expr::binary(BinaryOp::Gt, Expr::local("x"), Expr::int(0));
    let program = single_method(
        vec![("x", DeclaredType::Int)],
        DeclaredType::Int,
        divide_in_condition(Some(guard)),
    );
    let analysis = analyze(program, "T.f");
    assert!(!has_diagnostic(&analysis, DiagnosticCause::DivZero));
    assert_range(&returned(&analysis), 0, 1);
}
