mod common;

use common::*;
use range_checker::analysis::diagnostics::DiagnosticCause;
use range_checker::ast::{
    BinaryOp, ClassDecl, DeclaredType, Expr, FieldDecl, MethodDecl, Parameter, Program, Statement,
};

fn box_class() -> ClassDecl {
    ClassDecl::new("Box").field(FieldDecl::new("v", DeclaredType::Int))
}

#[test]
fn callee_result_is_instantiated_with_arguments() {
    let mut program = Program::new();
    program
        .add_method(static_method(
            "twice",
            vec![("v", DeclaredType::Int)],
            Some(DeclaredType::Int),
            vec![Statement::ret(Expr::binary(BinaryOp::Mul, Expr::local("v"), Expr::int(2)))],
        ))
        .add_method(static_method(
            "f",
            vec![("b", DeclaredType::Byte)],
            Some(DeclaredType::Int),
            vec![Statement::ret(Expr::call_static("T.twice", vec![Expr::local("b")]))],
        ));
    let analysis = analyze(program, "T.f");
    assert_range(&returned(&analysis), -256, 254);
    assert_range(&returned_with(&analysis, &[("b", 3, 3)]), 6, 6);
}

#[test]
fn callee_heap_writes_reach_the_caller() {
    let mut program = Program::new();
    program
        .add_class(box_class())
        .add_method(static_method(
            "set",
            vec![("b", DeclaredType::class("Box")), ("v", DeclaredType::Int)],
            None,
            vec![
                Statement::expr(Expr::assign(Expr::field(Expr::local("b"), "v"), Expr::local("v"))),
                Statement::ret_void(),
            ],
        ))
        .add_method(static_method(
            "f",
            vec![("a", DeclaredType::class("Box"))],
            Some(DeclaredType::Int),
            vec![
                Statement::expr(Expr::call_static("T.set", vec![Expr::local("a"), Expr::int(9)])),
                Statement::ret(Expr::field(Expr::local("a"), "v")),
            ],
        ));
    assert_range(&returned(&analyze(program, "T.f")), 9, 9);
}

#[test]
fn aliased_arguments_share_one_object() {
    let mut program = Program::new();
    program
        .add_class(box_class())
        .add_method(static_method(
            "swapish",
            vec![("p", DeclaredType::class("Box")), ("q", DeclaredType::class("Box"))],
            Some(DeclaredType::Int),
            vec![
                Statement::expr(Expr::assign(Expr::field(Expr::local("p"), "v"), Expr::int(1))),
                Statement::expr(Expr::assign(Expr::field(Expr::local("q"), "v"), Expr::int(2))),
                Statement::ret(Expr::field(Expr::local("p"), "v")),
            ],
        ))
        .add_method(static_method(
            "f",
            vec![("a", DeclaredType::class("Box")), ("b", DeclaredType::class("Box"))],
            Some(DeclaredType::Int),
            vec![
                Statement::declare(
                    "same",
                    DeclaredType::Int,
                    Expr::call_static("T.swapish", vec![Expr::local("a"), Expr::local("a")]),
                ),
                Statement::declare(
                    "distinct",
                    DeclaredType::Int,
                    Expr::call_static("T.swapish", vec![Expr::local("a"), Expr::local("b")]),
                ),
                Statement::ret(Expr::binary(
                    BinaryOp::Add,
                    Expr::binary(BinaryOp::Mul, Expr::local("same"), Expr::int(10)),
                    Expr::local("distinct"),
                )),
            ],
        ));
    assert_range(&returned(&analyze(program, "T.f")), 21, 21);
}

#[test]
fn recursion_hits_the_depth_cap() {
    let mut program = Program::new();
    program.add_method(static_method(
        "r",
        vec![("n", DeclaredType::Int)],
        Some(DeclaredType::Int),
        vec![Statement::ret(Expr::binary(
            BinaryOp::Add,
            Expr::call_static("T.r", vec![Expr::local("n")]),
            Expr::int(1),
        ))],
    ));
    let analysis = analyze(program, "T.r");
    assert!(has_diagnostic(&analysis, DiagnosticCause::CallDepthCap));
    assert_range(&returned(&analysis), i32::MIN as i64, i32::MAX as i64);
}

#[test]
fn unknown_callee_is_reported() {
    let program = single_method(
        vec![("x", DeclaredType::Int)],
        DeclaredType::Int,
        vec![Statement::ret(Expr::call_static("T.missing", vec![Expr::local("x")]))],
    );
    let analysis = analyze(program, "T.f");
    assert!(has_diagnostic(&analysis, DiagnosticCause::UnresolvedCall));
    assert_range(&returned(&analysis), i32::MIN as i64, i32::MAX as i64);
}

fn shapes() -> Program {
    let mut program = Program::new();
    program
        .add_class(ClassDecl::interface("Shape"))
        .add_class(
            ClassDecl::new("Square")
                .implements("Shape")
                .field(FieldDecl::new("side", DeclaredType::Int).with_initializer(Expr::int(2))),
        )
        .add_method(MethodDecl::new_instance(
            "Square",
            "area",
            vec![],
            Some(DeclaredType::Int),
            vec![Statement::ret(Expr::binary(
                BinaryOp::Mul,
                Expr::this_field("side"),
                Expr::this_field("side"),
            ))],
        ));
    program
}

#[test]
fn virtual_call_on_allocated_object() {
    let mut program = shapes();
    program.add_method(static_method(
        "f",
        vec![],
        Some(DeclaredType::Int),
        vec![
            Statement::declare("s", DeclaredType::class("Shape"), Expr::new_object("Square", None, vec![])),
            Statement::ret(Expr::call_virtual(Expr::local("s"), "Shape", "area", vec![])),
        ],
    ));
    assert_range(&returned(&analyze(program, "T.f")), 4, 4);
}

#[test]
fn virtual_call_with_single_implementation() {
    let mut program = shapes();
    program.add_method(static_method(
        "f",
        vec![("s", DeclaredType::class("Shape"))],
        Some(DeclaredType::Int),
        vec![Statement::ret(Expr::call_virtual(Expr::local("s"), "Shape", "area", vec![]))],
    ));
    let analysis = analyze(program, "T.f");
    assert!(!has_diagnostic(&analysis, DiagnosticCause::UnresolvedCall));
    assert!(contains(&returned(&analysis), 4));
}

#[test]
fn constructor_arguments_initialize_fields() {
    let mut program = Program::new();
    program
        .add_class(box_class())
        .add_method(MethodDecl::new_constructor(
            "Box",
            vec![Parameter::new("v", DeclaredType::Short)],
            vec![
                Statement::expr(Expr::assign(Expr::this_field("v"), Expr::local("v"))),
                Statement::ret_void(),
            ],
        ))
        .add_method(static_method(
            "f",
            vec![("x", DeclaredType::Byte)],
            Some(DeclaredType::Int),
            vec![
                Statement::declare(
                    "b",
                    DeclaredType::class("Box"),
                    Expr::new_object("Box", Some("Box.<init>"), vec![Expr::local("x")]),
                ),
                Statement::ret(Expr::field(Expr::local("b"), "v")),
            ],
        ));
    assert_range(&returned(&analyze(program, "T.f")), -128, 127);
}

#[test]
fn library_calls_expand_inline() {
    let program = single_method(
        vec![("x", DeclaredType::Byte)],
        DeclaredType::Int,
        vec![Statement::ret(Expr::call_library(
            "Math.max",
            vec![Expr::local("x"), Expr::int(10)],
        ))],
    );
    assert_range(&returned(&analyze(program, "T.f")), 10, 127);

    let program = single_method(
        vec![("x", DeclaredType::Byte)],
        DeclaredType::Int,
        vec![Statement::ret(Expr::call_library("Math.abs", vec![Expr::local("x")]))],
    );
    assert_range(&returned(&analyze(program, "T.f")), 0, 128);
}
