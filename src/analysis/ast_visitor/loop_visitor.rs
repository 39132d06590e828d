use crate::analysis::abstract_domain::AbstractDomain;
use crate::analysis::analysis_result::Result;
use crate::analysis::ast_visitor::block_visitor::BlockVisitor;
use crate::analysis::ast_visitor::body_visitor::BodyVisitor;
use crate::analysis::diagnostics::DiagnosticCause;
use crate::analysis::memory::expression::{ComparisonOperator, ExpressionType};
use crate::analysis::memory::heap::ObjectKey;
use crate::analysis::memory::path::Path;
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use crate::analysis::numerical::interval::{Bound, Interval};
use crate::analysis::numerical::lattice::LatticeTrait;
use crate::ast::{BinaryOp, DeclaredType, Expr, IncDec, Statement};
use itertools::Itertools;
use log::debug;
use rug::Integer;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::rc::Rc;

/// Resolves `while` and `for` loops, either to a closed form over an iteration counter
/// or to a widened fixed point over the locals the loop modifies.
pub struct LoopVisitor<'l, 'a> {
    pub body_visitor: &'l mut BodyVisitor<'a>,
}

impl<'l, 'a> Debug for LoopVisitor<'l, 'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        "LoopVisitor".fmt(f)
    }
}

impl<'l, 'a> LoopVisitor<'l, 'a> {
    pub fn new(body_visitor: &'l mut BodyVisitor<'a>) -> Self {
        Self { body_visitor }
    }

    /// The forks that leave the loop through its condition. Returns inside the body are
    /// recorded as exits of the method. A missing condition is `true`.
    pub fn visit_loop(
        &mut self,
        forks: Vec<AbstractDomain>,
        condition: Option<&Expr>,
        body: &Statement,
        updates: &[Expr],
    ) -> Result<Vec<AbstractDomain>> {
        let always = Expr::BoolLiteral(true);
        let condition = condition.unwrap_or(&always);
        if forks.is_empty() {
            return Ok(forks);
        }
        let plan = InductionPlan::recognize(condition, body, updates, &self.body_visitor.local_types);
        let plan = match plan {
            Some(plan) => plan,
            None => return self.visit_fixpoint(forks, condition, body, updates),
        };
        debug!("Loop on {} has a closed form: {:?}", plan.counter, plan.steps);
        let mut result = Vec::new();
        let mut remaining = Vec::new();
        for state in forks {
            let (exits, rest) = self.apply_closed_form(&plan, state)?;
            result.extend(exits);
            remaining.extend(rest);
        }
        if !remaining.is_empty() {
            result.extend(self.visit_fixpoint(remaining, condition, body, updates)?);
        }
        Ok(result)
    }

    /// The state after the loop expressed in terms of the iteration count `n`, which is
    /// constrained by the path condition to the first iteration at which the guard fails.
    /// Where the counter may wrap before the guard fails, the fork is split on the bound and
    /// the part the closed form cannot describe is handed back as the second result.
    fn apply_closed_form(
        &mut self,
        plan: &InductionPlan,
        mut state: AbstractDomain,
    ) -> Result<(Vec<AbstractDomain>, Option<AbstractDomain>)> {
        let mut initial = BTreeMap::new();
        for name in plan.steps.keys() {
            match state.local_value(name) {
                Some(value) => {
                    initial.insert(name.clone(), value);
                }
                None => return Ok((Vec::new(), Some(state))),
            }
        }
        let bound = BlockVisitor::new(self.body_visitor).visit_pure(&mut state, &plan.bound)?;
        if !bound.value_type().is_integer() {
            return Ok((Vec::new(), Some(state)));
        }
        let bindings = match self.body_visitor.bindings_for(&state) {
            Some(bindings) => bindings,
            None => return Ok((Vec::new(), None)),
        };
        let bound_type = bound.value_type();
        let bound_interval = self
            .body_visitor
            .evaluator
            .evaluate_quietly(&bound, &bindings)
            .meet(&Interval::full(bound_type));

        let (counter_type, counter_step) = match plan.steps.get(&plan.counter) {
            Some(step) => step.clone(),
            None => return Ok((Vec::new(), Some(state))),
        };
        let counter_initial = match initial.get(&plan.counter) {
            Some(value) => value.cast(ExpressionType::I64),
            None => return Ok((Vec::new(), Some(state))),
        };
        let span = counter_type.max_value() - counter_type.min_value();
        let max_count: Integer = span / counter_step.clone().abs() + 1;
        for (_, step) in plan.steps.values() {
            let reach = max_count.clone() * step.clone().abs() + (Integer::from(1) << 32);
            if reach > i64::MAX {
                return Ok((Vec::new(), Some(state)));
            }
        }
        // the last value the guard admits is `bound + offset`, one more step must not wrap
        let offset: i32 = match plan.operator {
            ComparisonOperator::Lt => -1,
            ComparisonOperator::Le | ComparisonOperator::Ge => 0,
            ComparisonOperator::Gt => 1,
            _ => return Ok((Vec::new(), Some(state))),
        };
        let safe_low = (counter_type.min_value() - &counter_step - offset).max(bound_type.min_value());
        let safe_high = (counter_type.max_value() - &counter_step - offset).min(bound_type.max_value());
        if safe_low > safe_high {
            return Ok((Vec::new(), Some(state)));
        }
        let safe = Interval::new(Bound::Int(safe_low.clone()), Bound::Int(safe_high.clone()));
        let fitting = bound_interval.meet(&safe);
        if fitting.is_bottom() {
            debug!("Counter {} wraps against {:?}", plan.counter, bound_interval);
            return Ok((Vec::new(), Some(state)));
        }
        let mut rest = None;
        if fitting != bound_interval {
            debug!("Counter {} may wrap against {:?}, splitting on the bound", plan.counter, bound_interval);
            let wide_bound = bound.cast(ExpressionType::I64);
            let in_range = wide_bound
                .greater_or_equal(SymbolicValue::make_constant(safe_low, ExpressionType::I64))
                .and(wide_bound.less_or_equal(SymbolicValue::make_constant(safe_high, ExpressionType::I64)));
            let mut wrapping = state.clone();
            self.body_visitor.assume(&mut wrapping, in_range.logical_not());
            if !wrapping.is_bottom() && self.body_visitor.bindings_for(&wrapping).is_some() {
                rest = Some(wrapping);
            }
            self.body_visitor.assume(&mut state, in_range);
            if state.is_bottom() {
                return Ok((Vec::new(), rest));
            }
        }

        let ordinal = self.body_visitor.fresh_ordinal();
        let count = SymbolicValue::make_widen(
            Path::new_loop_counter(ordinal),
            Interval::new(Bound::from(0i64), Bound::Int(max_count)),
            ExpressionType::I64,
        );
        let bound = bound.cast(ExpressionType::I64);
        let exit = progress(&counter_initial, &count, &counter_step)
            .compare(plan.operator, bound.clone())
            .logical_not();
        let previous = count.sub(SymbolicValue::make_int(1, ExpressionType::I64), ExpressionType::I64);
        let last_taken = count
            .equals(SymbolicValue::make_int(0, ExpressionType::I64))
            .or(progress(&counter_initial, &previous, &counter_step).compare(plan.operator, bound));
        self.body_visitor.assume(&mut state, exit);
        self.body_visitor.assume(&mut state, last_taken);
        if state.is_bottom() {
            return Ok((Vec::new(), rest));
        }

        for (name, (ty, step)) in plan.steps.iter() {
            if let Some(value) = initial.get(name) {
                let value = progress(&value.cast(ExpressionType::I64), &count, step).cast(*ty);
                let value = self.body_visitor.limit_size(&state, value);
                state.update_local(name, value);
            }
        }
        Ok((vec![state], rest))
    }

    fn visit_fixpoint(
        &mut self,
        forks: Vec<AbstractDomain>,
        condition: &Expr,
        body: &Statement,
        updates: &[Expr],
    ) -> Result<Vec<AbstractDomain>> {
        let mut entry = match forks.into_iter().fold1(|a, b| a.join(&b)) {
            Some(state) => state,
            None => return Ok(Vec::new()),
        };
        let mut effects = LoopEffects::default();
        effects.visit_expression(condition);
        effects.visit_statement(body);
        for update in updates {
            effects.visit_expression(update);
        }
        if effects.heap {
            self.havoc_heap(&mut entry);
        }
        let bindings = match self.body_visitor.bindings_for(&entry) {
            Some(bindings) => bindings,
            None => return Ok(Vec::new()),
        };

        let mut primitives: BTreeMap<Rc<String>, ExpressionType> = BTreeMap::new();
        let mut references = Vec::new();
        let mut bounds: BTreeMap<Rc<String>, Interval> = BTreeMap::new();
        for name in effects.locals.iter() {
            if let Some(value) = entry.local_value(name) {
                let ty = value.value_type();
                if ty.is_primitive() {
                    let interval = self
                        .body_visitor
                        .evaluator
                        .evaluate_quietly(&value, &bindings)
                        .meet(&Interval::full(ty));
                    primitives.insert(name.clone(), ty);
                    bounds.insert(name.clone(), interval);
                } else {
                    references.push(name.clone());
                }
            }
        }

        let ordinal = self.body_visitor.fresh_ordinal();
        let saved_fresh = self.body_visitor.next_fresh;
        let saved_heap_block = self.body_visitor.next_heap_block;
        let options = &self.body_visitor.context.analysis_options;
        let (widening_delay, narrowing_iteration, max_iterations) = (
            options.widening_delay,
            options.narrowing_iteration,
            options.max_loop_iterations,
        );
        let entry_bounds = bounds.clone();
        let mut stable = false;
        for iteration in 0..max_iterations {
            let head = head_state(&entry, ordinal, &primitives, &references, &bounds);
            self.body_visitor.next_fresh = saved_fresh;
            self.body_visitor.next_heap_block = saved_heap_block;
            let back_edges = self.visit_quietly(head, condition, body, updates)?;
            let next = self.bounds_after(&back_edges, &primitives, bounds.clone());
            debug!("Loop head bounds after iteration {}: {:?}", iteration, next);
            if next == bounds {
                stable = true;
                break;
            }
            bounds = if iteration >= widening_delay {
                next.iter()
                    .map(|(name, interval)| {
                        let full = primitives.get(name).map_or_else(Interval::top, |ty| Interval::full(*ty));
                        let widened = match bounds.get(name) {
                            Some(old) => old.widening_with(interval),
                            None => interval.clone(),
                        };
                        (name.clone(), widened.meet(&full))
                    })
                    .collect()
            } else {
                next
            };
        }
        if stable {
            for _ in 0..narrowing_iteration {
                let head = head_state(&entry, ordinal, &primitives, &references, &bounds);
                self.body_visitor.next_fresh = saved_fresh;
                self.body_visitor.next_heap_block = saved_heap_block;
                let back_edges = self.visit_quietly(head, condition, body, updates)?;
                let recomputed = self.bounds_after(&back_edges, &primitives, entry_bounds.clone());
                let narrowed: BTreeMap<Rc<String>, Interval> = bounds
                    .iter()
                    .map(|(name, old)| match recomputed.get(name) {
                        Some(new) => (name.clone(), old.narrowing_with(new)),
                        None => (name.clone(), old.clone()),
                    })
                    .collect();
                if narrowed == bounds {
                    break;
                }
                debug!("Loop head bounds narrowed to {:?}", narrowed);
                bounds = narrowed;
            }
        } else {
            self.body_visitor.emit_diagnostic(
                DiagnosticCause::LoopIterationCap,
                format!(
                    "loop in {} did not stabilize within {} iterations",
                    self.body_visitor.method.key, max_iterations
                ),
            );
            bounds = primitives
                .iter()
                .map(|(name, ty)| (name.clone(), Interval::full(*ty)))
                .collect();
        }

        // The head covers every iteration, so one more pass records the returns in the body
        // and the forks whose condition fails leave the loop.
        let head = head_state(&entry, ordinal, &primitives, &references, &bounds);
        self.body_visitor.next_fresh = saved_fresh;
        self.body_visitor.next_heap_block = saved_heap_block;
        let mut taken = Vec::new();
        let mut exits = Vec::new();
        for (state, value) in self.body_visitor.evaluate_each(vec![head], condition)? {
            let (then_state, else_state) = self.body_visitor.branch(state, &value)?;
            taken.extend(then_state);
            exits.extend(else_state);
        }
        self.body_visitor.visit_statement(taken, body)?;
        Ok(exits)
    }

    /// An iteration whose returns are not exits of the method, since the head does not yet
    /// cover every iteration.
    fn visit_quietly(
        &mut self,
        head: AbstractDomain,
        condition: &Expr,
        body: &Statement,
        updates: &[Expr],
    ) -> Result<Vec<AbstractDomain>> {
        self.body_visitor.exit_suppression += 1;
        let back_edges = self.visit_iteration(head, condition, body, updates);
        self.body_visitor.exit_suppression -= 1;
        back_edges
    }

    /// `start` joined with the values the primitive locals have on the back edges.
    fn bounds_after(
        &mut self,
        back_edges: &[AbstractDomain],
        primitives: &BTreeMap<Rc<String>, ExpressionType>,
        start: BTreeMap<Rc<String>, Interval>,
    ) -> BTreeMap<Rc<String>, Interval> {
        let mut next = start;
        for state in back_edges.iter() {
            let bindings = match self.body_visitor.bindings_for(state) {
                Some(bindings) => bindings,
                None => continue,
            };
            for (name, ty) in primitives.iter() {
                if let Some(value) = state.local_value(name) {
                    let full = Interval::full(*ty);
                    let interval = self
                        .body_visitor
                        .evaluator
                        .evaluate_quietly(&value, &bindings)
                        .meet(&full);
                    let bound = next.entry(name.clone()).or_insert_with(Interval::bottom);
                    *bound = bound.lub(&interval).meet(&full);
                }
            }
        }
        next
    }

    /// One pass from the loop head through the body and the updates.
    fn visit_iteration(
        &mut self,
        head: AbstractDomain,
        condition: &Expr,
        body: &Statement,
        updates: &[Expr],
    ) -> Result<Vec<AbstractDomain>> {
        let mut taken = Vec::new();
        for (state, value) in self.body_visitor.evaluate_each(vec![head], condition)? {
            let (then_state, _) = self.body_visitor.branch(state, &value)?;
            taken.extend(then_state);
        }
        let mut forks = self.body_visitor.visit_statement(taken, body)?;
        for update in updates {
            forks = self
                .body_visitor
                .evaluate_each(forks, update)?
                .into_iter()
                .map(|(state, _)| state)
                .collect();
        }
        Ok(forks)
    }

    /// Forgets the contents of every object the loop might write, and of the static fields.
    fn havoc_heap(&mut self, entry: &mut AbstractDomain) {
        let mut roots: Vec<Rc<SymbolicValue>> = entry
            .locals
            .value_map
            .values()
            .filter(|v| v.value_type() == ExpressionType::Reference)
            .cloned()
            .collect();
        if !self.body_visitor.method.is_static {
            roots.push(SymbolicValue::make_variable(Path::new_this(), ExpressionType::Reference));
        }
        roots.extend(entry.heap.objects.keys().map(|key| match key {
            ObjectKey::Allocated(address) => SymbolicValue::make_heap_block(*address),
            ObjectKey::Input(path) => SymbolicValue::make_variable(path.clone(), ExpressionType::Reference),
        }));
        debug!("Loop in {} writes the heap, havocking {} roots", self.body_visitor.method.key, roots.len());
        self.body_visitor.havoc_reachable(entry, roots);
    }
}

/// The loop head: modified primitive locals range over their bounds, modified references
/// are unknown.
fn head_state(
    entry: &AbstractDomain,
    ordinal: usize,
    primitives: &BTreeMap<Rc<String>, ExpressionType>,
    references: &[Rc<String>],
    bounds: &BTreeMap<Rc<String>, Interval>,
) -> AbstractDomain {
    let mut head = entry.clone();
    for (name, ty) in primitives.iter() {
        let interval = bounds.get(name).cloned().unwrap_or_else(|| Interval::full(*ty));
        let value = SymbolicValue::make_widen(Path::new_loop_variable(ordinal, name), interval, *ty);
        head.update_local(name, value);
    }
    for name in references {
        let value = SymbolicValue::make_variable(Path::new_loop_variable(ordinal, name), ExpressionType::Reference);
        head.update_local(name, value);
    }
    head
}

/// `initial + count * step` in `long`.
fn progress(initial: &Rc<SymbolicValue>, count: &Rc<SymbolicValue>, step: &Integer) -> Rc<SymbolicValue> {
    let step = SymbolicValue::make_constant(step.clone(), ExpressionType::I64);
    initial.add(count.mul(step, ExpressionType::I64), ExpressionType::I64)
}

/// A loop whose body only adds constants to integer locals and whose guard compares one of
/// them against a value the loop does not change.
#[derive(Debug)]
struct InductionPlan {
    /// Type and per-iteration increment of every local the loop updates
    steps: BTreeMap<Rc<String>, (ExpressionType, Integer)>,
    counter: Rc<String>,
    /// Compares the counter, on the left, with `bound`
    operator: ComparisonOperator,
    bound: Expr,
}

impl InductionPlan {
    fn recognize(
        condition: &Expr,
        body: &Statement,
        updates: &[Expr],
        local_types: &HashMap<Rc<String>, DeclaredType>,
    ) -> Option<InductionPlan> {
        let mut increments: BTreeMap<Rc<String>, Integer> = BTreeMap::new();
        collect_statement_steps(body, &mut increments)?;
        for update in updates {
            collect_expression_step(update, &mut increments)?;
        }
        let (op, left, right) = match condition {
            Expr::Binary { op, left, right } => (*op, left.as_ref(), right.as_ref()),
            _ => return None,
        };
        let operator = match op {
            BinaryOp::Lt => ComparisonOperator::Lt,
            BinaryOp::Le => ComparisonOperator::Le,
            BinaryOp::Gt => ComparisonOperator::Gt,
            BinaryOp::Ge => ComparisonOperator::Ge,
            _ => return None,
        };
        let (counter, operator, bound) = match (left, right) {
            (Expr::Local(name), other) if increments.contains_key(name) => (name.clone(), operator, other.clone()),
            (other, Expr::Local(name)) if increments.contains_key(name) => {
                (name.clone(), operator.swap(), other.clone())
            }
            _ => return None,
        };
        if bound.has_side_effects() || increments.keys().any(|name| bound.mentions_local(name)) {
            return None;
        }
        let step = increments.get(&counter)?;
        let ascending = matches!(operator, ComparisonOperator::Lt | ComparisonOperator::Le);
        if (ascending && *step <= 0) || (!ascending && *step >= 0) {
            return None;
        }
        let mut steps = BTreeMap::new();
        for (name, step) in increments {
            let ty = local_types.get(&name)?.expression_type();
            if !ty.is_integer() || ty == ExpressionType::I64 {
                return None;
            }
            steps.insert(name, (ty, step));
        }
        Some(InductionPlan {
            steps,
            counter,
            operator,
            bound,
        })
    }
}

fn collect_statement_steps(statement: &Statement, increments: &mut BTreeMap<Rc<String>, Integer>) -> Option<()> {
    match statement {
        Statement::Expression(expr) => collect_expression_step(expr, increments),
        Statement::Block(statements) => {
            for statement in statements {
                collect_statement_steps(statement, increments)?;
            }
            Some(())
        }
        _ => None,
    }
}

/// `v++`, `v--`, `v += c`, `v -= c`, `v = v + c` and `v = v - c` on a local `v`.
fn collect_expression_step(expr: &Expr, increments: &mut BTreeMap<Rc<String>, Integer>) -> Option<()> {
    let (name, delta) = match expr {
        Expr::IncDec { op, target } => {
            let delta = match op {
                IncDec::PreIncrement | IncDec::PostIncrement => Integer::from(1),
                IncDec::PreDecrement | IncDec::PostDecrement => Integer::from(-1),
            };
            (local_name(target)?, delta)
        }
        Expr::Assign {
            target,
            op: Some(op),
            value,
        } => (local_name(target)?, signed_literal(*op, value)?),
        Expr::Assign { target, op: None, value } => {
            let name = local_name(target)?;
            match value.as_ref() {
                Expr::Binary { op, left, right } if local_name(left).as_ref() == Some(&name) => {
                    let delta = signed_literal(*op, right)?;
                    (name, delta)
                }
                _ => return None,
            }
        }
        _ => return None,
    };
    *increments.entry(name).or_insert_with(|| Integer::from(0)) += delta;
    Some(())
}

fn local_name(expr: &Expr) -> Option<Rc<String>> {
    match expr {
        Expr::Local(name) => Some(name.clone()),
        _ => None,
    }
}

fn signed_literal(op: BinaryOp, value: &Expr) -> Option<Integer> {
    let constant = match value {
        Expr::IntLiteral(c) | Expr::LongLiteral(c) => Integer::from(*c),
        _ => return None,
    };
    match op {
        BinaryOp::Add => Some(constant),
        BinaryOp::Sub => Some(-constant),
        _ => None,
    }
}

/// What a loop may change.
#[derive(Debug, Default)]
struct LoopEffects {
    locals: BTreeSet<Rc<String>>,
    /// Writes a field or a static field, calls, or allocates
    heap: bool,
}

impl LoopEffects {
    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::LocalDecl { initializer, .. } => {
                if let Some(expr) = initializer {
                    self.visit_expression(expr);
                }
            }
            Statement::Expression(expr) => self.visit_expression(expr),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_expression(condition);
                self.visit_statement(then_branch);
                if let Some(statement) = else_branch {
                    self.visit_statement(statement);
                }
            }
            Statement::While { condition, body } => {
                self.visit_expression(condition);
                self.visit_statement(body);
            }
            Statement::For {
                init,
                condition,
                updates,
                body,
            } => {
                init.iter().for_each(|s| self.visit_statement(s));
                if let Some(expr) = condition {
                    self.visit_expression(expr);
                }
                updates.iter().for_each(|e| self.visit_expression(e));
                self.visit_statement(body);
            }
            Statement::Return(value) => {
                if let Some(expr) = value {
                    self.visit_expression(expr);
                }
            }
            Statement::Block(statements) => statements.iter().for_each(|s| self.visit_statement(s)),
        }
    }

    fn visit_target(&mut self, target: &Expr) {
        match target {
            Expr::Local(name) => {
                self.locals.insert(name.clone());
            }
            Expr::Field { receiver, .. } => {
                self.heap = true;
                if let Some(receiver) = receiver {
                    self.visit_expression(receiver);
                }
            }
            Expr::StaticField { .. } => self.heap = true,
            other => self.visit_expression(other),
        }
    }

    fn visit_expression(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { target, value, .. } => {
                self.visit_target(target);
                self.visit_expression(value);
            }
            Expr::IncDec { target, .. } => self.visit_target(target),
            Expr::Call {
                receiver, arguments, ..
            } => {
                self.heap = true;
                if let Some(receiver) = receiver {
                    self.visit_expression(receiver);
                }
                arguments.iter().for_each(|a| self.visit_expression(a));
            }
            Expr::New { arguments, .. } => {
                self.heap = true;
                arguments.iter().for_each(|a| self.visit_expression(a));
            }
            Expr::Field {
                receiver: Some(receiver),
                ..
            } => self.visit_expression(receiver),
            Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => self.visit_expression(operand),
            Expr::Binary { left, right, .. } => {
                self.visit_expression(left);
                self.visit_expression(right);
            }
            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                self.visit_expression(condition);
                self.visit_expression(then_value);
                self.visit_expression(else_value);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ast_visitor::body_visitor::BodyVisitor;
    use crate::analysis::global_context::{GlobalContext, MethodSummary};
    use crate::analysis::memory::heap::AliasPartition;
    use crate::analysis::numerical::evaluator::RangeEvaluator;
    use crate::analysis::option::AnalysisOption;
    use crate::ast::{MethodDecl, Parameter, Program};

    fn visit(method: MethodDecl) -> MethodSummary {
        let mut program = Program::new();
        program.add_method(method.clone());
        let mut context = GlobalContext::new(program, AnalysisOption::default());
        let key = method.key.clone();
        let visitor = BodyVisitor::new(&mut context, Rc::new(method), Rc::new(AliasPartition::new()), vec![key]);
        visitor.summarize().expect("analysis succeeds")
    }

    fn returned_interval(summary: &MethodSummary) -> Interval {
        let evaluator = RangeEvaluator::new(AnalysisOption::default().narrowing_iteration);
        let mut result = Interval::bottom();
        for exit in summary.exits.iter() {
            let solver = crate::analysis::numerical::constraint_solver::ConstraintSolver::new(&evaluator);
            let bindings = match solver.narrow(&Default::default(), &exit.state.path_condition, true) {
                Some(bindings) => bindings,
                None => continue,
            };
            if let Some(value) = &exit.return_value {
                result = result.lub(&evaluator.evaluate_quietly(value, &bindings));
            }
        }
        result
    }

    #[test]
    fn test_counting_loop_has_closed_form() {
        let method = MethodDecl::new_static(
            "T",
            "count",
            vec![],
            Some(DeclaredType::Int),
            vec![
                Statement::declare("i", DeclaredType::Int, Expr::int(0)),
                Statement::declare("sum", DeclaredType::Int, Expr::int(0)),
                Statement::for_loop(
                    vec![],
                    Some(Expr::binary(BinaryOp::Lt, Expr::local("i"), Expr::int(10))),
                    vec![Expr::inc_dec(IncDec::PostIncrement, Expr::local("i"))],
                    vec![Statement::expr(Expr::compound_assign(
                        Expr::local("sum"),
                        BinaryOp::Add,
                        Expr::int(3),
                    ))],
                ),
                Statement::ret(Expr::local("sum")),
            ],
        );
        let summary = visit(method);
        assert!(summary.diagnostics.is_empty());
        let interval = returned_interval(&summary);
        assert!(interval.is_singleton());
        assert!(interval.contains(&Integer::from(30)));
    }

    #[test]
    fn test_recognize_rejects_nonconstant_steps() {
        let mut types = HashMap::new();
        types.insert(Rc::new("x".to_string()), DeclaredType::Int);
        let condition = Expr::binary(BinaryOp::Lt, Expr::local("x"), Expr::int(100));
        let doubling = Statement::expr(Expr::assign(
            Expr::local("x"),
            Expr::binary(BinaryOp::Mul, Expr::local("x"), Expr::int(2)),
        ));
        assert!(InductionPlan::recognize(&condition, &doubling, &[], &types).is_none());

        let stepping = Statement::expr(Expr::assign(
            Expr::local("x"),
            Expr::binary(BinaryOp::Add, Expr::local("x"), Expr::int(4)),
        ));
        let plan = InductionPlan::recognize(&condition, &stepping, &[], &types).expect("x steps by 4");
        assert_eq!(plan.steps[&Rc::new("x".to_string())].1, 4);

        let descending = Expr::binary(BinaryOp::Gt, Expr::int(100), Expr::local("x"));
        assert!(InductionPlan::recognize(&descending, &stepping, &[], &types).is_some());
        let wrong_way = Expr::binary(BinaryOp::Gt, Expr::local("x"), Expr::int(100));
        assert!(InductionPlan::recognize(&wrong_way, &stepping, &[], &types).is_none());
    }

    #[test]
    fn test_fixpoint_bounds_exit_value() {
        let method = MethodDecl::new_static(
            "T",
            "grow",
            vec![Parameter::new("x", DeclaredType::Int)],
            Some(DeclaredType::Int),
            vec![
                Statement::if_then(
                    Expr::binary(BinaryOp::Lt, Expr::local("x"), Expr::int(1)),
                    vec![Statement::ret(Expr::int(1))],
                ),
                Statement::while_loop(
                    Expr::binary(BinaryOp::Lt, Expr::local("x"), Expr::int(100)),
                    vec![Statement::expr(Expr::assign(
                        Expr::local("x"),
                        Expr::binary(BinaryOp::Mul, Expr::local("x"), Expr::int(2)),
                    ))],
                ),
                Statement::ret(Expr::local("x")),
            ],
        );
        let summary = visit(method);
        let interval = returned_interval(&summary);
        assert!(interval.contains(&Integer::from(1)));
        assert!(interval.contains(&Integer::from(128)));
        assert!(!interval.contains(&Integer::from(0)));
    }

    #[test]
    fn test_effects_see_heap_writes() {
        let mut effects = LoopEffects::default();
        effects.visit_statement(&Statement::Block(vec![
            Statement::expr(Expr::inc_dec(IncDec::PreIncrement, Expr::local("i"))),
            Statement::expr(Expr::assign(Expr::this_field("count"), Expr::local("i"))),
        ]));
        assert!(effects.heap);
        assert!(effects.locals.contains(&Rc::new("i".to_string())));
    }
}
