mod common;

use common::*;
use range_checker::ast::{BinaryOp, DeclaredType, Expr, Statement, UnaryOp};

#[test]
fn self_difference_is_zero() {
    let program = single_method(
        vec![("x", DeclaredType::Short)],
        DeclaredType::Int,
        vec![Statement::ret(Expr::binary(BinaryOp::Sub, Expr::local("x"), Expr::local("x")))],
    );
    let analysis = analyze(program, "T.f");
    assert_range(&returned(&analysis), 0, 0);
    assert_eq!(analysis.return_value.as_ref().map(|r| r.size), Some(1));
}

#[test]
fn narrowing_cast_wraps_exactly() {
    let program = single_method(
        vec![],
        DeclaredType::Short,
        vec![Statement::ret(Expr::cast(
            DeclaredType::Short,
            Expr::binary(BinaryOp::Add, Expr::int(32767), Expr::int(1)),
        ))],
    );
    assert_range(&returned(&analyze(program, "T.f")), -32768, -32768);

    let program = single_method(
        vec![],
        DeclaredType::Short,
        vec![Statement::ret(Expr::cast(
            DeclaredType::Short,
            Expr::binary(BinaryOp::Mul, Expr::int(16384), Expr::int(2)),
        ))],
    );
    assert_range(&returned(&analyze(program, "T.f")), -32768, -32768);
}

#[test]
fn narrowing_cast_of_product_under_bound_input() {
    let program = single_method(
        vec![("x", DeclaredType::Int)],
        DeclaredType::Short,
        vec![Statement::ret(Expr::cast(
            DeclaredType::Short,
            Expr::binary(BinaryOp::Mul, Expr::local("x"), Expr::int(256)),
        ))],
    );
    let analysis = analyze(program, "T.f");
    assert_range(&returned(&analysis), -32768, 32767);
    assert_range(&returned_with(&analysis, &[("x", 256, 256)]), 0, 0);
    assert_range(&returned_with(&analysis, &[("x", 1, 3)]), 256, 768);
}

#[test]
fn affine_terms_cancel() {
    let program = single_method(
        vec![("a", DeclaredType::Int)],
        DeclaredType::Int,
        vec![Statement::ret(Expr::binary(
            BinaryOp::Sub,
            Expr::local("a"),
            Expr::binary(BinaryOp::Add, Expr::local("a"), Expr::int(10)),
        ))],
    );
    assert_range(&returned(&analyze(program, "T.f")), -10, -10);
}

#[test]
fn square_is_not_negative() {
    let program = single_method(
        vec![("x", DeclaredType::Short)],
        DeclaredType::Int,
        vec![Statement::ret(Expr::binary(BinaryOp::Mul, Expr::local("x"), Expr::local("x")))],
    );
    let interval = returned(&analyze(program, "T.f"));
    assert!(!contains(&interval, -1));
    assert!(contains(&interval, 0));
    assert!(contains(&interval, 32768 * 32768));
}

#[test]
fn compound_assignment_narrows_to_the_target() {
    let program = single_method(
        vec![("b", DeclaredType::Byte)],
        DeclaredType::Byte,
        vec![
            Statement::expr(Expr::compound_assign(Expr::local("b"), BinaryOp::Add, Expr::int(200))),
            Statement::ret(Expr::local("b")),
        ],
    );
    let analysis = analyze(program, "T.f");
    assert_range(&returned(&analysis), -128, 127);
    assert_range(&returned_with(&analysis, &[("b", 0, 0)]), -56, -56);
}

#[test]
fn negation_of_min_value_wraps() {
    let program = single_method(
        vec![("x", DeclaredType::Int)],
        DeclaredType::Int,
        vec![Statement::ret(Expr::unary(UnaryOp::Neg, Expr::local("x")))],
    );
    let analysis = analyze(program, "T.f");
    let min = i64::from(i32::MIN);
    assert_range(&returned_with(&analysis, &[("x", min, min)]), min, min);
    assert_range(&returned_with(&analysis, &[("x", 1, 5)]), -5, -1);
}
