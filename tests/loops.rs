mod common;

use common::*;
use range_checker::analysis::diagnostics::DiagnosticCause;
use range_checker::analysis::option::AnalysisOption;
use range_checker::ast::{BinaryOp, ClassDecl, DeclaredType, Expr, FieldDecl, IncDec, MethodDecl, Program, Statement};

fn tripling_loop() -> Program {
    single_method(
        vec![],
        DeclaredType::Int,
        vec![
            Statement::declare("x", DeclaredType::Int, Expr::int(1)),
            Statement::while_loop(
                Expr::binary(BinaryOp::Lt, Expr::local("x"), Expr::int(1000)),
                vec![Statement::expr(Expr::assign(
                    Expr::local("x"),
                    Expr::binary(BinaryOp::Mul, Expr::local("x"), Expr::int(3)),
                ))],
            ),
            Statement::ret(Expr::local("x")),
        ],
    )
}

#[test]
fn counter_leaves_loop_at_bound() {
    let program = single_method(
        vec![],
        DeclaredType::Int,
        vec![
            Statement::declare("i", DeclaredType::Int, Expr::int(0)),
            Statement::for_loop(
                vec![],
                Some(Expr::binary(BinaryOp::Lt, Expr::local("i"), Expr::int(10))),
                vec![Expr::inc_dec(IncDec::PostIncrement, Expr::local("i"))],
                vec![],
            ),
            Statement::ret(Expr::local("i")),
        ],
    );
    let analysis = analyze(program, "T.f");
    assert!(analysis.diagnostics.is_empty());
    assert_range(&returned(&analysis), 10, 10);
}

#[test]
fn accumulator_follows_counter() {
    let program = single_method(
        vec![],
        DeclaredType::Int,
        vec![
            Statement::declare("i", DeclaredType::Int, Expr::int(0)),
            Statement::declare("sum", DeclaredType::Int, Expr::int(0)),
            Statement::while_loop(
                Expr::binary(BinaryOp::Lt, Expr::local("i"), Expr::int(5)),
                vec![
                    Statement::expr(Expr::compound_assign(Expr::local("sum"), BinaryOp::Add, Expr::int(2))),
                    Statement::expr(Expr::inc_dec(IncDec::PreIncrement, Expr::local("i"))),
                ],
            ),
            Statement::ret(Expr::local("sum")),
        ],
    );
    assert_range(&returned(&analyze(program, "T.f")), 10, 10);
}

#[test]
fn nonlinear_loop_reaches_a_sound_bound() {
    let analysis = analyze(tripling_loop(), "T.f");
    let interval = returned(&analysis);
    assert!(contains(&interval, 2187));
    assert!(!contains(&interval, 999));
    assert!(!contains(&interval, 1));
}

#[test]
fn iteration_cap_gives_full_range() {
    let options = AnalysisOption {
        max_loop_iterations: 0,
        ..Default::default()
    };
    let analysis = analyze_with(tripling_loop(), "T.f", options);
    assert!(has_diagnostic(&analysis, DiagnosticCause::LoopIterationCap));
    let interval = returned(&analysis);
    assert!(contains(&interval, 2187));
    assert!(contains(&interval, i32::MAX as i64));
}

#[test]
fn return_inside_loop_is_an_exit() {
    let program = single_method(
        vec![],
        DeclaredType::Int,
        vec![
            Statement::declare("i", DeclaredType::Int, Expr::int(0)),
            Statement::while_loop(
                Expr::binary(BinaryOp::Lt, Expr::local("i"), Expr::int(10)),
                vec![
                    Statement::if_then(
                        Expr::binary(BinaryOp::Eq, Expr::local("i"), Expr::int(7)),
                        vec![Statement::ret(Expr::int(7))],
                    ),
                    Statement::expr(Expr::inc_dec(IncDec::PostIncrement, Expr::local("i"))),
                ],
            ),
            Statement::ret(Expr::int(-1)),
        ],
    );
    let interval = returned(&analyze(program, "T.f"));
    assert!(contains(&interval, 7));
    assert!(contains(&interval, -1));
}

#[test]
fn loop_writing_fields_is_analyzed() {
    let mut program = Program::new();
    program
        .add_class(ClassDecl::new("Counter").field(FieldDecl::new("count", DeclaredType::Int)))
        .add_method(MethodDecl::new_instance(
            "Counter",
            "add",
            vec![range_checker::ast::Parameter::new("n", DeclaredType::Int)],
            Some(DeclaredType::Int),
            vec![
                Statement::for_loop(
                    vec![Statement::declare("i", DeclaredType::Int, Expr::int(0))],
                    Some(Expr::binary(BinaryOp::Lt, Expr::local("i"), Expr::local("n"))),
                    vec![Expr::inc_dec(IncDec::PostIncrement, Expr::local("i"))],
                    vec![Statement::expr(Expr::inc_dec(
                        IncDec::PostIncrement,
                        Expr::this_field("count"),
                    ))],
                ),
                Statement::ret(Expr::int(0)),
            ],
        ));
    let analysis = analyze(program, "Counter.add");
    assert_range(&returned(&analysis), 0, 0);
    assert!(analysis.fields.contains_key("this.count"));
}

#[test]
fn parameter_bound_keeps_the_closed_form() {
    let program = single_method(
        vec![("n", DeclaredType::Int)],
        DeclaredType::Int,
        vec![
            Statement::declare("a", DeclaredType::Int, Expr::int(0)),
            Statement::while_loop(
                Expr::binary(BinaryOp::Lt, Expr::local("a"), Expr::local("n")),
                vec![Statement::expr(Expr::compound_assign(Expr::local("a"), BinaryOp::Add, Expr::int(3)))],
            ),
            Statement::ret(Expr::local("a")),
        ],
    );
    let analysis = analyze(program, "T.f");
    assert!(contains(&returned(&analysis), 12));
    let bounded = returned_with(&analysis, &[("n", 10, 10)]);
    assert!(contains(&bounded, 12));
    assert!(!contains(&bounded, 9));
    assert!(!contains(&bounded, 15));
    assert!(!contains(&bounded, i32::MAX as i64));
}
