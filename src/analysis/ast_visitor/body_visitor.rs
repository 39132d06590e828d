use crate::analysis::abstract_domain::{AbstractDomain, ExitState};
use crate::analysis::analysis_result::{AnalysisError, Result};
use crate::analysis::ast_visitor::block_visitor::BlockVisitor;
use crate::analysis::ast_visitor::loop_visitor::LoopVisitor;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause};
use crate::analysis::global_context::{GlobalContext, MethodSummary};
use crate::analysis::memory::expression::ExpressionType;
use crate::analysis::memory::heap::{AliasPartition, ObjectKey};
use crate::analysis::memory::path::Path;
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use crate::analysis::numerical::constraint_solver::ConstraintSolver;
use crate::analysis::numerical::evaluator::{EvaluationFlags, InputBindings, RangeEvaluator};
use crate::ast::{DeclaredType, Expr, MethodDecl, Program, Statement};
use itertools::Itertools;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Abstractly executes one method body under one aliasing of its inputs.
/// Every feasible path keeps its own fork until the fork cap merges them.
pub struct BodyVisitor<'a> {
    // Global context
    pub context: &'a mut GlobalContext,

    // The method being analyzed
    pub method: Rc<MethodDecl>,

    // Must-alias classes of the reference inputs
    pub partition: Rc<AliasPartition>,

    // Keys of the methods being analyzed, outermost first, this one last
    pub call_stack: Vec<Rc<String>>,

    // Declared types of the parameters and of the locals declared so far
    pub local_types: HashMap<Rc<String>, DeclaredType>,

    // Forks that left the method, with their return values
    pub exits: Vec<ExitState>,

    // Ordinal of the next fresh, loop or havoc path
    pub next_fresh: usize,

    // Abstract address of the next allocation
    pub next_heap_block: usize,

    // Returns are not recorded while this is positive
    pub exit_suppression: usize,

    pub buffered_diagnostics: Vec<Diagnostic>,

    pub evaluator: RangeEvaluator,
}

impl<'a> BodyVisitor<'a> {
    pub fn new(
        context: &'a mut GlobalContext,
        method: Rc<MethodDecl>,
        partition: Rc<AliasPartition>,
        call_stack: Vec<Rc<String>>,
    ) -> Self {
        let evaluator = RangeEvaluator::new(context.analysis_options.narrowing_iteration);
        let local_types = method
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.declared_type.clone()))
            .collect();
        let partition = with_unrelated_inputs(&context.program, &method, partition);
        Self {
            context,
            method,
            partition,
            call_stack,
            local_types,
            exits: Vec::new(),
            next_fresh: 0,
            next_heap_block: 0,
            exit_suppression: 0,
            buffered_diagnostics: Vec::new(),
            evaluator,
        }
    }

    /// Parameters hold their entry values, nothing is assumed yet.
    pub fn entry_state(&self) -> AbstractDomain {
        let mut state = AbstractDomain::new(self.partition.clone());
        for (ordinal, parameter) in self.method.parameters.iter().enumerate() {
            let value = SymbolicValue::make_variable(
                Path::new_parameter(ordinal),
                parameter.declared_type.expression_type(),
            );
            state.update_local(&parameter.name, value);
        }
        state
    }

    /// Runs the body to completion and packs up what it does for callers.
    pub fn summarize(mut self) -> Result<MethodSummary> {
        let method = self.method.clone();
        debug!(
            "Analyzing {} under {:?}, call stack: {:?}",
            method.key, self.partition, self.call_stack
        );
        let mut forks = vec![self.entry_state()];
        if method.is_constructor {
            forks = self.run_field_initializers(forks)?;
        }
        let forks = self.visit_statements(forks, &method.body)?;
        if method.return_type.is_none() {
            for state in forks {
                self.record_exit(state, None);
            }
        } else if !forks.is_empty() {
            debug!("{} forks fall off the end of {}", forks.len(), method.key);
        }

        let mut diagnostics = self.buffered_diagnostics;
        diagnostics.sort();
        diagnostics.dedup();
        let touched: BTreeSet<Rc<Path>> = self
            .exits
            .iter()
            .flat_map(|exit| exit.state.heap.touched().iter().cloned())
            .collect();
        debug!("{} has {} exits", method.key, self.exits.len());
        Ok(MethodSummary {
            method,
            partition: self.partition,
            exits: self.exits,
            ordinal_count: self.next_fresh,
            heap_block_count: self.next_heap_block,
            diagnostics,
            touched,
        })
    }

    /// Field initializers of the class and its superclasses, the root class first.
    fn run_field_initializers(&mut self, mut forks: Vec<AbstractDomain>) -> Result<Vec<AbstractDomain>> {
        let program = self.context.program.clone();
        let chain = program.superclass_chain(&self.method.class_name);
        for class in chain.into_iter().rev() {
            for field in class.fields.iter() {
                if let Some(initializer) = &field.initializer {
                    let assignment = Expr::assign(Expr::this_field(&field.name), initializer.clone());
                    forks = self.visit_statement(forks, &Statement::Expression(assignment))?;
                }
            }
        }
        Ok(forks)
    }

    pub fn visit_statements(
        &mut self,
        mut forks: Vec<AbstractDomain>,
        statements: &[Statement],
    ) -> Result<Vec<AbstractDomain>> {
        for statement in statements {
            if forks.is_empty() {
                break;
            }
            forks = self.visit_statement(forks, statement)?;
        }
        Ok(forks)
    }

    pub fn visit_statement(&mut self, forks: Vec<AbstractDomain>, statement: &Statement) -> Result<Vec<AbstractDomain>> {
        if forks.is_empty() {
            return Ok(forks);
        }
        let forks = match statement {
            Statement::LocalDecl {
                name,
                declared_type,
                initializer,
            } => {
                self.local_types.insert(name.clone(), declared_type.clone());
                match initializer {
                    Some(expr) => {
                        let ty = declared_type.expression_type();
                        let mut result = Vec::new();
                        for (mut state, value) in self.evaluate_each(forks, expr)? {
                            let value = self.limit_size(&state, assignment_conversion(value, ty));
                            state.update_local(name, value);
                            result.push(state);
                        }
                        result
                    }
                    None => forks,
                }
            }
            Statement::Expression(expr) => self
                .evaluate_each(forks, expr)?
                .into_iter()
                .map(|(state, _)| state)
                .collect(),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => self.visit_if(forks, condition, then_branch, else_branch.as_deref())?,
            Statement::While { condition, body } => {
                LoopVisitor::new(self).visit_loop(forks, Some(condition), body, &[])?
            }
            Statement::For {
                init,
                condition,
                updates,
                body,
            } => {
                let forks = self.visit_statements(forks, init)?;
                LoopVisitor::new(self).visit_loop(forks, condition.as_ref(), body, updates)?
            }
            Statement::Return(value) => {
                self.visit_return(forks, value.as_ref())?;
                Vec::new()
            }
            Statement::Block(statements) => self.visit_statements(forks, statements)?,
        };
        debug!("{} live forks", forks.len());
        Ok(self.limit_forks(forks))
    }

    fn visit_if(
        &mut self,
        forks: Vec<AbstractDomain>,
        condition: &Expr,
        then_branch: &Statement,
        else_branch: Option<&Statement>,
    ) -> Result<Vec<AbstractDomain>> {
        let mut then_forks = Vec::new();
        let mut else_forks = Vec::new();
        for (state, value) in self.evaluate_each(forks, condition)? {
            let (then_state, else_state) = self.branch(state, &value)?;
            then_forks.extend(then_state);
            else_forks.extend(else_state);
        }
        let mut result = self.visit_statement(then_forks, then_branch)?;
        match else_branch {
            Some(statement) => result.extend(self.visit_statement(else_forks, statement)?),
            None => result.extend(else_forks),
        }
        Ok(result)
    }

    fn visit_return(&mut self, forks: Vec<AbstractDomain>, value: Option<&Expr>) -> Result<()> {
        let expr = match value {
            Some(expr) => expr,
            None => {
                for state in forks {
                    self.record_exit(state, None);
                }
                return Ok(());
            }
        };
        let return_type = self.method.return_type.as_ref().map(|t| t.expression_type());
        for (state, value) in self.evaluate_each(forks, expr)? {
            let value = match return_type {
                Some(ty) => assignment_conversion(value, ty),
                None => value,
            };
            let value = self.limit_size(&state, value);
            self.record_exit(state, Some(value));
        }
        Ok(())
    }

    pub fn record_exit(&mut self, state: AbstractDomain, return_value: Option<Rc<SymbolicValue>>) {
        if self.exit_suppression > 0 {
            return;
        }
        debug!("Exit of {} with {:?}, pc: {:?}", self.method.key, return_value, state.path_condition);
        self.exits.push(ExitState { state, return_value });
    }

    /// Evaluates `expr` in every fork.
    pub fn evaluate_each(
        &mut self,
        forks: Vec<AbstractDomain>,
        expr: &Expr,
    ) -> Result<Vec<(AbstractDomain, Rc<SymbolicValue>)>> {
        let mut result = Vec::new();
        for state in forks {
            result.extend(BlockVisitor::new(self).visit_expression(state, expr)?);
        }
        Ok(result)
    }

    /// Intervals of the inputs under which the path condition of `state` can hold,
    /// `None` if it cannot hold at all.
    pub fn bindings_for(&self, state: &AbstractDomain) -> Option<InputBindings> {
        ConstraintSolver::new(&self.evaluator).narrow(&InputBindings::new(), &state.path_condition, true)
    }

    /// Splits `state` on a boolean value. A side that cannot be taken is `None`.
    pub fn branch(
        &mut self,
        state: AbstractDomain,
        condition: &Rc<SymbolicValue>,
    ) -> Result<(Option<AbstractDomain>, Option<AbstractDomain>)> {
        if condition.value_type() != ExpressionType::Bool {
            return Err(AnalysisError::NonBooleanCondition(condition.value_type()));
        }
        let bindings = match self.bindings_for(&state) {
            Some(bindings) => bindings,
            None => {
                debug!("Dropping infeasible fork, pc: {:?}", state.path_condition);
                return Ok((None, None));
            }
        };
        self.check_divisors(condition, &bindings);
        match self.evaluator.truth_value(condition, &bindings) {
            Some(true) => Ok((Some(state), None)),
            Some(false) => Ok((None, Some(state))),
            None => {
                let mut then_state = state.clone();
                self.assume(&mut then_state, condition.clone());
                let mut else_state = state;
                self.assume(&mut else_state, condition.logical_not());
                Ok((
                    Some(then_state).filter(|s| !s.is_bottom()),
                    Some(else_state).filter(|s| !s.is_bottom()),
                ))
            }
        }
    }

    /// Reports a condition that may divide by zero under `bindings`.
    fn check_divisors(&mut self, condition: &Rc<SymbolicValue>, bindings: &InputBindings) {
        if self.exit_suppression > 0 {
            return;
        }
        let mut flags = EvaluationFlags::default();
        self.evaluator.evaluate_operands(condition, bindings, &mut flags);
        if flags.may_divide_by_zero {
            self.emit_diagnostic(
                DiagnosticCause::DivZero,
                format!("a condition in {} may divide by zero", self.method.key),
            );
        }
    }

    /// Adds a conjunct to the path condition of `state`. A path condition that grows too large
    /// keeps only the new conjunct.
    pub fn assume(&mut self, state: &mut AbstractDomain, condition: Rc<SymbolicValue>) {
        state.assume(condition.clone());
        let max_size = self.context.analysis_options.max_expression_size;
        if state.path_condition.expression_size > max_size {
            self.emit_diagnostic(
                DiagnosticCause::ExpressionSizeCap,
                format!("path condition in {} grew past {} nodes", self.method.key, max_size),
            );
            state.path_condition = condition;
        }
    }

    /// Merges the forks into one if there are too many of them.
    pub fn limit_forks(&mut self, forks: Vec<AbstractDomain>) -> Vec<AbstractDomain> {
        let max_forks = self.context.analysis_options.max_forks;
        if forks.len() <= max_forks {
            return forks;
        }
        self.emit_diagnostic(
            DiagnosticCause::ForkCap,
            format!("merged {} forks in {}", forks.len(), self.method.key),
        );
        forks.into_iter().fold1(|a, b| a.join(&b)).into_iter().collect()
    }

    /// Replaces a primitive value whose tree grew too large by an unknown within its interval.
    pub fn limit_size(&mut self, state: &AbstractDomain, value: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        let max_size = self.context.analysis_options.max_expression_size;
        let ty = value.value_type();
        if value.expression_size <= max_size || !ty.is_primitive() {
            return value;
        }
        let bindings = self.bindings_for(state).unwrap_or_default();
        let bounds = self.evaluator.evaluate_quietly(&value, &bindings);
        self.emit_diagnostic(
            DiagnosticCause::ExpressionSizeCap,
            format!(
                "tree of {} nodes in {} replaced by {:?}",
                value.expression_size, self.method.key, bounds
            ),
        );
        let ordinal = self.fresh_ordinal();
        SymbolicValue::make_widen(Path::new_fresh(ordinal), bounds, ty)
    }

    pub fn fresh_ordinal(&mut self) -> usize {
        let ordinal = self.next_fresh;
        self.next_fresh += 1;
        ordinal
    }

    pub fn new_heap_block(&mut self) -> usize {
        let address = self.next_heap_block;
        self.next_heap_block += 1;
        address
    }

    pub fn field_type(&self, class_name: &Rc<String>, field_name: &Rc<String>) -> Result<DeclaredType> {
        self.context
            .program
            .field_type(class_name, field_name)
            .ok_or_else(|| AnalysisError::UnknownField {
                class_name: class_name.to_string(),
                field_name: field_name.to_string(),
            })
    }

    /// The value of `reference.field_name` where the reference has static class `class_name`.
    pub fn read_field(
        &mut self,
        state: &mut AbstractDomain,
        reference: &Rc<SymbolicValue>,
        class_name: &Rc<String>,
        field_name: &Rc<String>,
    ) -> Result<Rc<SymbolicValue>> {
        let ty = self.field_type(class_name, field_name)?.expression_type();
        state
            .heap
            .read_field(reference, field_name, ty, &mut self.next_fresh)
            .ok_or_else(|| AnalysisError::UnknownField {
                class_name: class_name.to_string(),
                field_name: field_name.to_string(),
            })
    }

    /// Forgets everything about the objects reachable from `roots`, from any static field,
    /// and about the static fields themselves.
    pub fn havoc_reachable(&mut self, state: &mut AbstractDomain, mut roots: Vec<Rc<SymbolicValue>>) {
        roots.extend(
            state
                .statics
                .value_map
                .values()
                .filter(|v| v.value_type() == ExpressionType::Reference)
                .cloned(),
        );
        for key in state.heap.reachable(&roots) {
            let ordinal = self.fresh_ordinal();
            match &key {
                ObjectKey::Input(path) => state.heap.havoc_root(path, ordinal),
                ObjectKey::Allocated(..) => state.heap.havoc_object(&key, Path::new_fresh(ordinal)),
            }
        }
        let ordinal = self.fresh_ordinal();
        state.havoc_statics(ordinal);
        state.heap.havoc_static_roots(ordinal);
    }

    /// The summary of `method` under `partition`, computing it on a cache miss.
    pub fn summary_for(&mut self, method: &Rc<MethodDecl>, partition: Rc<AliasPartition>) -> Result<Rc<MethodSummary>> {
        if let Some(summary) = self.context.summary_cache.get(&method.key, &partition) {
            debug!("Reusing the summary of {}", method.key);
            return Ok(summary);
        }
        let mut call_stack = self.call_stack.clone();
        call_stack.push(method.key.clone());
        let visitor = BodyVisitor::new(self.context, method.clone(), partition, call_stack);
        let summary = Rc::new(visitor.summarize()?);
        self.context.summary_cache.insert(summary.clone());
        Ok(summary)
    }

    pub fn emit_diagnostic(&mut self, cause: DiagnosticCause, message: String) {
        warn!("{} in {}: {}", cause.name(), self.method.key, message);
        self.buffered_diagnostics.push(Diagnostic::new(cause, message));
    }
}

/// Marks the reference inputs whose declared classes cannot have a common instance as
/// distinct. Any other two reference inputs may be the same object.
fn with_unrelated_inputs(program: &Program, method: &MethodDecl, partition: Rc<AliasPartition>) -> Rc<AliasPartition> {
    let mut inputs: Vec<(Rc<Path>, &Rc<String>)> = Vec::new();
    if !method.is_static {
        inputs.push((Path::new_this(), &method.class_name));
    }
    for (ordinal, parameter) in method.parameters.iter().enumerate() {
        if let Some(class_name) = parameter.declared_type.class_name() {
            inputs.push((Path::new_parameter(ordinal), class_name));
        }
    }
    let unrelated = |a: &str, b: &str| match (program.class(a), program.class(b)) {
        (Ok(left), Ok(right)) => {
            !left.is_interface && !right.is_interface && !program.is_subtype(a, b) && !program.is_subtype(b, a)
        }
        _ => false,
    };
    let mut result = (*partition).clone();
    for ((left_path, left_class), (right_path, right_class)) in inputs.iter().tuple_combinations() {
        if unrelated(left_class.as_str(), right_class.as_str()) {
            result.mark_distinct(left_path, right_path);
        }
    }
    Rc::new(result)
}

/// The implicit conversion of a value stored into a location of type `ty`.
pub fn assignment_conversion(value: Rc<SymbolicValue>, ty: ExpressionType) -> Rc<SymbolicValue> {
    let value_type = value.value_type();
    if ty.is_integer() && value_type.is_integer() && value_type != ty {
        value.cast(ty)
    } else {
        value
    }
}
