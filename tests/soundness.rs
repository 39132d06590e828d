mod common;

use common::*;
use proptest::prelude::*;
use range_checker::analysis::analyzer::range_analysis::MethodAnalysis;
use range_checker::analysis::memory::path::Path;
use range_checker::analysis::numerical::evaluator::{InputBindings, RangeEvaluator};
use range_checker::analysis::numerical::interval::Interval;
use range_checker::analysis::option::AnalysisOption;
use range_checker::ast::{BinaryOp, ClassDecl, DeclaredType, Expr, FieldDecl, Program, Statement};
use std::rc::Rc;

/// Integer expressions over `short x` and `int y`.
#[derive(Clone, Debug)]
enum Gen {
    X,
    Y,
    Const(i32),
    Bin(BinaryOp, Box<Gen>, Box<Gen>),
    Neg(Box<Gen>),
    ToShort(Box<Gen>),
    ToByte(Box<Gen>),
    CondLt(Box<Gen>, Box<Gen>, Box<Gen>, Box<Gen>),
}

impl Gen {
    fn to_expr(&self) -> Expr {
        match self {
            Gen::X => Expr::local("x"),
            Gen::Y => Expr::local("y"),
            Gen::Const(c) => Expr::int(*c as i64),
            Gen::Bin(op, l, r) => Expr::binary(*op, l.to_expr(), r.to_expr()),
            Gen::Neg(e) => Expr::unary(range_checker::ast::UnaryOp::Neg, e.to_expr()),
            Gen::ToShort(e) => Expr::cast(DeclaredType::Short, e.to_expr()),
            Gen::ToByte(e) => Expr::cast(DeclaredType::Byte, e.to_expr()),
            Gen::CondLt(a, b, t, f) => Expr::conditional(
                Expr::binary(BinaryOp::Lt, a.to_expr(), b.to_expr()),
                t.to_expr(),
                f.to_expr(),
            ),
        }
    }

    fn run(&self, x: i16, y: i32) -> i32 {
        match self {
            Gen::X => x as i32,
            Gen::Y => y,
            Gen::Const(c) => *c,
            Gen::Bin(op, l, r) => {
                let (a, b) = (l.run(x, y), r.run(x, y));
                match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::BitAnd => a & b,
                    BinaryOp::BitOr => a | b,
                    BinaryOp::BitXor => a ^ b,
                    BinaryOp::Shl => a.wrapping_shl(b as u32),
                    BinaryOp::Shr => a.wrapping_shr(b as u32),
                    BinaryOp::UShr => (a as u32).wrapping_shr(b as u32) as i32,
                    _ => unreachable!(),
                }
            }
            Gen::Neg(e) => e.run(x, y).wrapping_neg(),
            Gen::ToShort(e) => e.run(x, y) as i16 as i32,
            Gen::ToByte(e) => e.run(x, y) as i8 as i32,
            Gen::CondLt(a, b, t, f) => {
                if a.run(x, y) < b.run(x, y) {
                    t.run(x, y)
                } else {
                    f.run(x, y)
                }
            }
        }
    }
}

fn operator() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::BitAnd),
        Just(BinaryOp::BitOr),
        Just(BinaryOp::BitXor),
        Just(BinaryOp::Shl),
        Just(BinaryOp::Shr),
        Just(BinaryOp::UShr),
    ]
}

fn expression() -> impl Strategy<Value = Gen> {
    let leaf = prop_oneof![
        Just(Gen::X),
        Just(Gen::Y),
        (-300i32..300).prop_map(Gen::Const),
        prop_oneof![Just(i32::MIN), Just(i32::MAX), Just(32767), Just(-32768)].prop_map(Gen::Const),
    ];
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            (operator(), inner.clone(), inner.clone())
                .prop_map(|(op, l, r)| Gen::Bin(op, Box::new(l), Box::new(r))),
            inner.clone().prop_map(|e| Gen::Neg(Box::new(e))),
            inner.clone().prop_map(|e| Gen::ToShort(Box::new(e))),
            inner.clone().prop_map(|e| Gen::ToByte(Box::new(e))),
            (inner.clone(), inner.clone(), inner.clone(), inner)
                .prop_map(|(a, b, t, f)| Gen::CondLt(Box::new(a), Box::new(b), Box::new(t), Box::new(f))),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn concrete_result_lies_in_the_range(gen in expression(), x in any::<i16>(), y in any::<i32>()) {
        let program = single_method(
            vec![("x", DeclaredType::Short), ("y", DeclaredType::Int)],
            DeclaredType::Int,
            vec![Statement::ret(gen.to_expr())],
        );
        let analysis = analyze(program, "T.f");
        let expected = gen.run(x, y) as i64;

        let interval = returned(&analysis);
        prop_assert!(contains(&interval, expected), "{} not in {:?}", expected, interval);

        let bound = returned_with(&analysis, &[("x", x as i64, x as i64), ("y", y as i64, y as i64)]);
        prop_assert!(contains(&bound, expected), "{} not in {:?} at x={} y={}", expected, bound, x, y);
    }
}

/// One of the two `Box` parameters `a` and `b`.
#[derive(Clone, Copy, Debug)]
enum Param {
    A,
    B,
}

impl Param {
    fn field(self) -> Expr {
        match self {
            Param::A => Expr::field(Expr::local("a"), "v"),
            Param::B => Expr::field(Expr::local("b"), "v"),
        }
    }

    fn local(self) -> Expr {
        match self {
            Param::A => Expr::local("a"),
            Param::B => Expr::local("b"),
        }
    }
}

/// Statements over the field `v` of the two parameters.
#[derive(Clone, Debug)]
enum FieldOp {
    /// `p.v = c`
    Store(Param, i32),
    /// `p.v = p.v + q.v`
    AddInto(Param, Param),
    /// `if (a.v < b.v) p.v = c`
    StoreIfLess(Param, i32),
    /// `T.bump(p, q)`, which runs `p.v = p.v + 1; q.v = q.v + p.v`
    Bump(Param, Param),
}

impl FieldOp {
    fn to_statement(&self) -> Statement {
        match self {
            FieldOp::Store(p, c) => Statement::expr(Expr::assign(p.field(), Expr::int(*c as i64))),
            FieldOp::AddInto(p, q) => Statement::expr(Expr::assign(
                p.field(),
                Expr::binary(BinaryOp::Add, p.field(), q.field()),
            )),
            FieldOp::StoreIfLess(p, c) => Statement::if_then(
                Expr::binary(BinaryOp::Lt, Param::A.field(), Param::B.field()),
                vec![Statement::expr(Expr::assign(p.field(), Expr::int(*c as i64)))],
            ),
            FieldOp::Bump(p, q) => Statement::expr(Expr::call_static("T.bump", vec![p.local(), q.local()])),
        }
    }

    /// Runs the statement on concrete objects, `cells[slot(p)]` being `p.v`.
    fn run(&self, cells: &mut [i32], slot: impl Fn(Param) -> usize) {
        match self {
            FieldOp::Store(p, c) => cells[slot(*p)] = *c,
            FieldOp::AddInto(p, q) => cells[slot(*p)] = cells[slot(*p)].wrapping_add(cells[slot(*q)]),
            FieldOp::StoreIfLess(p, c) => {
                if cells[slot(Param::A)] < cells[slot(Param::B)] {
                    cells[slot(*p)] = *c;
                }
            }
            FieldOp::Bump(p, q) => {
                cells[slot(*p)] = cells[slot(*p)].wrapping_add(1);
                cells[slot(*q)] = cells[slot(*q)].wrapping_add(cells[slot(*p)]);
            }
        }
    }
}

fn param() -> impl Strategy<Value = Param> {
    prop_oneof![Just(Param::A), Just(Param::B)]
}

fn field_op() -> impl Strategy<Value = FieldOp> {
    prop_oneof![
        (param(), -20i32..20).prop_map(|(p, c)| FieldOp::Store(p, c)),
        (param(), param()).prop_map(|(p, q)| FieldOp::AddInto(p, q)),
        (param(), -20i32..20).prop_map(|(p, c)| FieldOp::StoreIfLess(p, c)),
        (param(), param()).prop_map(|(p, q)| FieldOp::Bump(p, q)),
    ]
}

fn box_program(ops: &[FieldOp], result: Param) -> Program {
    let boxes = || vec![("p", DeclaredType::class("Box")), ("q", DeclaredType::class("Box"))];
    let bump = static_method(
        "bump",
        boxes(),
        None,
        vec![
            Statement::expr(Expr::assign(
                Expr::field(Expr::local("p"), "v"),
                Expr::binary(BinaryOp::Add, Expr::field(Expr::local("p"), "v"), Expr::int(1)),
            )),
            Statement::expr(Expr::assign(
                Expr::field(Expr::local("q"), "v"),
                Expr::binary(
                    BinaryOp::Add,
                    Expr::field(Expr::local("q"), "v"),
                    Expr::field(Expr::local("p"), "v"),
                ),
            )),
            Statement::ret_void(),
        ],
    );
    let mut body: Vec<Statement> = ops.iter().map(|op| op.to_statement()).collect();
    body.push(Statement::ret(result.field()));
    let f = static_method(
        "f",
        vec![("a", DeclaredType::class("Box")), ("b", DeclaredType::class("Box"))],
        Some(DeclaredType::Int),
        body,
    );
    let mut program = Program::new();
    program
        .add_class(ClassDecl::new("Box").field(FieldDecl::new("v", DeclaredType::Int)))
        .add_method(bump)
        .add_method(f);
    program
}

/// The return interval with `a.v` and `b.v` bound to single values on entry.
fn returned_with_fields(analysis: &MethodAnalysis, a: i32, b: i32) -> Interval {
    let v = Rc::new("v".to_string());
    let mut bindings = InputBindings::new();
    bindings.bind(Path::new_field(Path::new_parameter(0), &v), Interval::from_i64(a as i64, a as i64));
    bindings.bind(Path::new_field(Path::new_parameter(1), &v), Interval::from_i64(b as i64, b as i64));
    let evaluator = RangeEvaluator::new(AnalysisOption::default().narrowing_iteration);
    returned(&analysis.evaluate_with(&evaluator, &bindings))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn field_result_lies_in_the_range_for_either_aliasing(
        ops in prop::collection::vec(field_op(), 1..6),
        result in param(),
        a in -20i32..20,
        b in -20i32..20,
    ) {
        let analysis = analyze(box_program(&ops, result), "T.f");
        let interval = returned(&analysis);

        // `a` and `b` are different objects
        let mut cells = vec![a, b];
        for op in ops.iter() {
            op.run(&mut cells, |p| match p { Param::A => 0, Param::B => 1 });
        }
        let apart = cells[match result { Param::A => 0, Param::B => 1 }] as i64;
        prop_assert!(contains(&interval, apart), "{} not in {:?} for {:?}", apart, interval, ops);
        let bound = returned_with_fields(&analysis, a, b);
        prop_assert!(contains(&bound, apart), "{} not in {:?} for {:?} apart", apart, bound, ops);

        // `a` and `b` are the same object
        let mut cells = vec![a];
        for op in ops.iter() {
            op.run(&mut cells, |_| 0);
        }
        let shared = cells[0] as i64;
        prop_assert!(contains(&interval, shared), "{} not in {:?} for {:?}", shared, interval, ops);
        let bound = returned_with_fields(&analysis, a, a);
        prop_assert!(contains(&bound, shared), "{} not in {:?} for {:?} shared", shared, bound, ops);
    }
}
