#![allow(dead_code)]

use range_checker::analysis::analyzer::analysis_trait::StaticAnalysis;
use range_checker::analysis::analyzer::range_analysis::{MethodAnalysis, RangeAnalysis};
use range_checker::analysis::diagnostics::DiagnosticCause;
use range_checker::analysis::global_context::GlobalContext;
use range_checker::analysis::numerical::evaluator::{InputBindings, RangeEvaluator};
use range_checker::analysis::numerical::interval::{Bound, Interval};
use range_checker::analysis::option::AnalysisOption;
use range_checker::ast::{DeclaredType, MethodDecl, Parameter, Program, Statement};
use rug::Integer;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

pub fn analyze(program: Program, method_key: &str) -> MethodAnalysis {
    analyze_with(program, method_key, AnalysisOption::default())
}

pub fn analyze_with(program: Program, method_key: &str, options: AnalysisOption) -> MethodAnalysis {
    init_logger();
    let mut context = GlobalContext::new(program, options);
    RangeAnalysis::new(&mut context)
        .analyze_method(method_key)
        .expect("analysis succeeds")
}

/// A program with the single static method `T.f`.
pub fn single_method(parameters: Vec<(&str, DeclaredType)>, return_type: DeclaredType, body: Vec<Statement>) -> Program {
    let mut program = Program::new();
    program.add_method(static_method("f", parameters, Some(return_type), body));
    program
}

pub fn static_method(
    name: &str,
    parameters: Vec<(&str, DeclaredType)>,
    return_type: Option<DeclaredType>,
    body: Vec<Statement>,
) -> MethodDecl {
    let parameters = parameters
        .into_iter()
        .map(|(name, ty)| Parameter::new(name, ty))
        .collect();
    MethodDecl::new_static("T", name, parameters, return_type, body)
}

pub fn returned(analysis: &MethodAnalysis) -> Interval {
    analysis
        .return_value
        .as_ref()
        .expect("method returns a value")
        .interval
        .clone()
}

/// The return interval with the named inputs bound to the given ranges.
pub fn returned_with(analysis: &MethodAnalysis, inputs: &[(&str, i64, i64)]) -> Interval {
    let mut bindings = InputBindings::new();
    for (name, low, high) in inputs {
        let path = analysis.input_path(name).expect("input exists");
        bindings.bind(path, Interval::from_i64(*low, *high));
    }
    let evaluator = RangeEvaluator::new(AnalysisOption::default().narrowing_iteration);
    returned(&analysis.evaluate_with(&evaluator, &bindings))
}

pub fn assert_range(interval: &Interval, low: i64, high: i64) {
    assert_eq!(
        (&interval.low, &interval.high),
        (&Bound::from(low), &Bound::from(high)),
        "expected [{}, {}], found {:?}",
        low,
        high,
        interval
    );
}

pub fn contains(interval: &Interval, value: i64) -> bool {
    interval.contains(&Integer::from(value))
}

pub fn has_diagnostic(analysis: &MethodAnalysis, cause: DiagnosticCause) -> bool {
    analysis.diagnostics.iter().any(|d| d.cause == cause)
}
