use crate::analysis::analysis_result::{AnalysisError, AnalysisInfo, Result};
use crate::analysis::analyzer::analysis_trait::StaticAnalysis;
use crate::analysis::ast_visitor::body_visitor::BodyVisitor;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause, ImprecisionReason};
use crate::analysis::global_context::{GlobalContext, MethodSummary};
use crate::analysis::memory::expression::ExpressionType;
use crate::analysis::memory::heap::AliasPartition;
use crate::analysis::memory::path::{Path, PathEnum};
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use crate::analysis::numerical::constraint_solver::ConstraintSolver;
use crate::analysis::numerical::evaluator::{EvaluationFlags, InputBindings, RangeEvaluator};
use crate::analysis::numerical::interval::Interval;
use crate::ast::Program;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Instant;

/// One output of a method: the tree of its value at exit and the range that tree evaluates to.
#[derive(Clone, Debug)]
pub struct OutputRange {
    /// The value at every exit, gated by the path condition of the exit
    pub tree: Rc<SymbolicValue>,
    pub size: u64,
    pub interval: Interval,
    pub may_divide_by_zero: bool,
    pub reasons: BTreeSet<ImprecisionReason>,
    value_type: ExpressionType,
    branches: Vec<(Rc<SymbolicValue>, Rc<SymbolicValue>)>,
}

impl OutputRange {
    fn new(
        branches: Vec<(Rc<SymbolicValue>, Rc<SymbolicValue>)>,
        value_type: ExpressionType,
        evaluator: &RangeEvaluator,
        bindings: &InputBindings,
    ) -> Self {
        let tree = SymbolicValue::make_union(branches.clone(), value_type);
        let mut output = OutputRange {
            size: tree.expression_size,
            tree,
            interval: Interval::bottom(),
            may_divide_by_zero: false,
            reasons: BTreeSet::new(),
            value_type,
            branches,
        };
        output.evaluate(evaluator, bindings);
        output
    }

    /// Evaluates every exit under the inputs its path condition allows, and takes the hull.
    fn evaluate(&mut self, evaluator: &RangeEvaluator, bindings: &InputBindings) {
        let solver = ConstraintSolver::new(evaluator);
        let mut flags = EvaluationFlags::default();
        let mut interval = Interval::bottom();
        for (condition, value) in self.branches.iter() {
            if let Some(narrowed) = solver.narrow(bindings, condition, true) {
                interval = interval.lub(&evaluator.evaluate(value, &narrowed, &mut flags));
            }
        }
        if self.value_type.is_primitive() {
            let may_wrap = interval.may_wrap;
            interval = interval
                .meet(&Interval::full(self.value_type))
                .with_wrap(may_wrap);
        }
        self.interval = interval;
        self.may_divide_by_zero = flags.may_divide_by_zero;
        self.reasons = flags.reasons;
    }

    pub fn value_type(&self) -> ExpressionType {
        self.value_type
    }

    pub fn to_json(&self) -> Value {
        json!({
            "tree": format!("{:?}", self.tree),
            "size": self.size,
            "interval": {
                "low": format!("{:?}", self.interval.low),
                "high": format!("{:?}", self.interval.high),
                "may_wrap": self.interval.may_wrap,
            },
            "may_divide_by_zero": self.may_divide_by_zero,
            "reasons": self.reasons.iter().map(|r| r.name()).collect::<Vec<_>>(),
        })
    }
}

/// Everything the analysis found out about one method.
#[derive(Clone, Debug)]
pub struct MethodAnalysis {
    pub method_key: Rc<String>,
    pub parameters: Vec<(Rc<String>, ExpressionType)>,
    pub return_value: Option<OutputRange>,
    /// Fields of `this` as `this.f` and static fields of the class as `C.f`
    pub fields: BTreeMap<String, OutputRange>,
    /// Primitive locals that are live at every exit
    pub locals: BTreeMap<String, OutputRange>,
    pub diagnostics: Vec<Diagnostic>,
    summary_diagnostics: Vec<Diagnostic>,
}

impl MethodAnalysis {
    fn from_summary(
        program: &Program,
        summary: &MethodSummary,
        evaluator: &RangeEvaluator,
        bindings: &InputBindings,
    ) -> MethodAnalysis {
        let method = &summary.method;
        let parameters = method
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.declared_type.expression_type()))
            .collect();

        let return_value = method.return_type.as_ref().map(|ty| {
            let branches = summary
                .exits
                .iter()
                .filter_map(|exit| {
                    exit.return_value
                        .as_ref()
                        .map(|value| (exit.state.path_condition.clone(), value.clone()))
                })
                .collect();
            OutputRange::new(branches, ty.expression_type(), evaluator, bindings)
        });

        let mut fields = BTreeMap::new();
        if !method.is_static {
            let this = SymbolicValue::make_variable(Path::new_this(), ExpressionType::Reference);
            for field in program.instance_fields(&method.class_name) {
                let ty = field.declared_type.expression_type();
                let mut fresh = summary.ordinal_count;
                let branches = summary
                    .exits
                    .iter()
                    .filter_map(|exit| {
                        let mut heap = exit.state.heap.clone();
                        heap.read_field(&this, &field.name, ty, &mut fresh)
                            .map(|value| (exit.state.path_condition.clone(), value))
                    })
                    .collect();
                fields.insert(
                    format!("this.{}", field.name),
                    OutputRange::new(branches, ty, evaluator, bindings),
                );
            }
        }
        if let Ok(class) = program.class(&method.class_name) {
            for field in class.static_fields.iter() {
                let ty = field.declared_type.expression_type();
                let branches = summary
                    .exits
                    .iter()
                    .map(|exit| {
                        let value = exit.state.static_value(&class.name, &field.name, ty);
                        (exit.state.path_condition.clone(), value)
                    })
                    .collect();
                fields.insert(
                    format!("{}.{}", class.name, field.name),
                    OutputRange::new(branches, ty, evaluator, bindings),
                );
            }
        }

        let mut names: Option<BTreeSet<Rc<String>>> = None;
        for exit in summary.exits.iter() {
            let here: BTreeSet<Rc<String>> = exit
                .state
                .locals
                .value_map
                .iter()
                .filter_map(|(path, value)| match &path.value {
                    PathEnum::LocalVariable { name } if value.value_type().is_primitive() => Some(name.clone()),
                    _ => None,
                })
                .collect();
            names = Some(match names {
                Some(names) => names.intersection(&here).cloned().collect(),
                None => here,
            });
        }
        let mut locals = BTreeMap::new();
        for name in names.unwrap_or_default() {
            let branches: Vec<_> = summary
                .exits
                .iter()
                .filter_map(|exit| {
                    exit.state
                        .local_value(&name)
                        .map(|value| (exit.state.path_condition.clone(), value))
                })
                .collect();
            let ty = match branches.first() {
                Some((_, value)) => value.value_type(),
                None => continue,
            };
            locals.insert(name.to_string(), OutputRange::new(branches, ty, evaluator, bindings));
        }

        let mut analysis = MethodAnalysis {
            method_key: method.key.clone(),
            parameters,
            return_value,
            fields,
            locals,
            diagnostics: Vec::new(),
            summary_diagnostics: summary.diagnostics.clone(),
        };
        analysis.collect_diagnostics();
        analysis
    }

    fn outputs(&self) -> impl Iterator<Item = (String, &OutputRange)> {
        self.return_value
            .iter()
            .map(|r| ("return".to_string(), r))
            .chain(self.fields.iter().map(|(name, r)| (name.clone(), r)))
            .chain(self.locals.iter().map(|(name, r)| (name.clone(), r)))
    }

    fn collect_diagnostics(&mut self) {
        let mut diagnostics = self.summary_diagnostics.clone();
        for (name, output) in self.outputs() {
            if output.may_divide_by_zero {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCause::DivZero,
                    format!("{} of {} may divide by zero", name, self.method_key),
                ));
            }
        }
        diagnostics.sort();
        diagnostics.dedup();
        self.diagnostics = diagnostics;
    }

    /// The same outputs evaluated under caller supplied intervals for the inputs.
    pub fn evaluate_with(&self, evaluator: &RangeEvaluator, bindings: &InputBindings) -> MethodAnalysis {
        let mut result = self.clone();
        for output in result
            .return_value
            .iter_mut()
            .chain(result.fields.values_mut())
            .chain(result.locals.values_mut())
        {
            output.evaluate(evaluator, bindings);
        }
        result.collect_diagnostics();
        result
    }

    /// The input path named by a parameter name, `this.f` or `C.f`.
    pub fn input_path(&self, name: &str) -> Option<Rc<Path>> {
        if let Some(ordinal) = self.parameters.iter().position(|(p, _)| p.as_str() == name) {
            return Some(Path::new_parameter(ordinal));
        }
        let (qualifier, field) = name.split_at(name.find('.')?);
        let field = Rc::new(field[1..].to_string());
        if qualifier == "this" {
            Some(Path::new_field(Path::new_this(), &field))
        } else {
            Some(Path::new_static_field(&Rc::new(qualifier.to_string()), &field))
        }
    }

    pub fn to_json(&self) -> Value {
        let outputs: serde_json::Map<String, Value> = self.outputs().map(|(name, r)| (name, r.to_json())).collect();
        json!({
            "method": self.method_key.as_str(),
            "outputs": outputs,
            "diagnostics": self.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        })
    }
}

/// Analyzes the methods of a program and reports their output ranges
pub struct RangeAnalysis<'a> {
    /// The global context
    pub context: &'a mut GlobalContext,
    pub results: Vec<MethodAnalysis>,
}

impl<'a> StaticAnalysis<'a> for RangeAnalysis<'a> {
    fn new(context: &'a mut GlobalContext) -> Self {
        RangeAnalysis {
            context,
            results: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<AnalysisInfo> {
        let timer = Instant::now();
        info!("================== Range Analysis Starts ==================");
        info!("Widening Delay: {}", self.context.analysis_options.widening_delay);
        let keys: Vec<Rc<String>> = self.context.program.methods.keys().cloned().collect();
        for key in keys {
            let analysis = self.analyze_method(&key)?;
            self.results.push(analysis);
        }
        info!("================== Range Analysis Ends ==================");
        self.emit_diagnostics();
        Ok(AnalysisInfo {
            analysis_time: timer.elapsed(),
        })
    }

    fn analyze_method(&mut self, method_key: &str) -> Result<MethodAnalysis> {
        let method = self
            .context
            .program
            .method(method_key)
            .ok_or_else(|| AnalysisError::UnknownMethod(method_key.to_string()))?;
        info!("Analyzing {}", method.key);
        let timer = Instant::now();
        let visitor = BodyVisitor::new(
            self.context,
            method.clone(),
            Rc::new(AliasPartition::new()),
            vec![method.key.clone()],
        );
        let summary = visitor.summarize()?;
        let evaluator = RangeEvaluator::new(self.context.analysis_options.narrowing_iteration);
        let program = self.context.program.clone();
        let analysis = MethodAnalysis::from_summary(&program, &summary, &evaluator, &InputBindings::new());
        debug!("{} diagnostics for {}", analysis.diagnostics.len(), method.key);
        self.context
            .diagnostics_for
            .insert(method.key.clone(), analysis.diagnostics.clone());
        info!("Analyzed {} in {:?}", method.key, timer.elapsed());
        Ok(analysis)
    }

    fn emit_diagnostics(&mut self) {
        let options = &self.context.analysis_options;
        let mut diagnostics: Vec<(&Rc<String>, &Diagnostic)> = self
            .context
            .diagnostics_for
            .map
            .iter()
            .flat_map(|(key, diags)| diags.iter().map(move |d| (key, d)))
            .filter(|(_, d)| !options.is_suppressed(d.cause))
            .collect();
        diagnostics.sort();
        for (key, diagnostic) in diagnostics {
            warn!("{}: {}", key, diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::option::AnalysisOption;
    use crate::ast::{BinaryOp, DeclaredType, Expr, MethodDecl, Parameter, Statement};
    use rug::Integer;

    fn divide() -> Program {
        let mut program = Program::new();
        program.add_method(MethodDecl::new_static(
            "T",
            "divide",
            vec![
                Parameter::new("a", DeclaredType::Int),
                Parameter::new("b", DeclaredType::Int),
            ],
            Some(DeclaredType::Int),
            vec![Statement::ret(Expr::binary(BinaryOp::Div, Expr::local("a"), Expr::local("b")))],
        ));
        program
    }

    #[test]
    fn test_division_by_zero_is_reported() {
        let mut context = GlobalContext::new(divide(), AnalysisOption::default());
        let mut analysis = RangeAnalysis::new(&mut context);
        let result = analysis.analyze_method("T.divide").expect("analysis succeeds");
        assert!(result.diagnostics.iter().any(|d| d.cause == DiagnosticCause::DivZero));
        assert!(context.diagnostics_for.get("T.divide").is_some());
    }

    #[test]
    fn test_evaluate_with_bindings() {
        let mut context = GlobalContext::new(divide(), AnalysisOption::default());
        let result = RangeAnalysis::new(&mut context)
            .analyze_method("T.divide")
            .expect("analysis succeeds");
        let mut bindings = InputBindings::new();
        bindings.bind(result.input_path("a").expect("a is a parameter"), Interval::from_i64(10, 20));
        bindings.bind(result.input_path("b").expect("b is a parameter"), Interval::from_i64(2, 5));
        let narrowed = result.evaluate_with(&RangeEvaluator::new(3), &bindings);
        let interval = narrowed.return_value.expect("divide returns").interval;
        assert!(interval.contains(&Integer::from(2)));
        assert!(interval.contains(&Integer::from(10)));
        assert!(!interval.contains(&Integer::from(11)));
        assert!(!narrowed.diagnostics.iter().any(|d| d.cause == DiagnosticCause::DivZero));
    }

    #[test]
    fn test_unknown_method_is_an_error() {
        let mut context = GlobalContext::new(Program::new(), AnalysisOption::default());
        let error = RangeAnalysis::new(&mut context).analyze_method("T.missing").unwrap_err();
        assert_eq!(error, AnalysisError::UnknownMethod("T.missing".to_string()));
    }

    #[test]
    fn test_input_paths() {
        let mut context = GlobalContext::new(divide(), AnalysisOption::default());
        let result = RangeAnalysis::new(&mut context)
            .analyze_method("T.divide")
            .expect("analysis succeeds");
        assert_eq!(result.input_path("b"), Some(Path::new_parameter(1)));
        assert_eq!(
            result.input_path("T.count"),
            Some(Path::new_static_field(&Rc::new("T".to_string()), &Rc::new("count".to_string())))
        );
        assert_eq!(result.input_path("nothing"), None);
        let json = result.to_json();
        assert_eq!(json["method"], "T.divide");
        assert!(json["outputs"]["return"]["interval"]["low"].is_string());
    }
}
