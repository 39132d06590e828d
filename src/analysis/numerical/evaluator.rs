use crate::analysis::diagnostics::ImprecisionReason;
use crate::analysis::memory::constant_value::ConstantValue;
use crate::analysis::memory::expression::{
    BinaryOperator, ComparisonOperator, Expression, ExpressionType, UnaryOperator,
};
use crate::analysis::memory::path::Path;
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use crate::analysis::numerical::constraint_solver::ConstraintSolver;
use crate::analysis::numerical::interval::Interval;
use log::debug;
use rug::Integer;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// Operands larger than this are not searched for shared inputs.
const SHARED_INPUT_SEARCH_LIMIT: u64 = 64;

/// Intervals for the inputs of a tree. Inputs without a binding range over their whole domain.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InputBindings {
    bindings: BTreeMap<Rc<Path>, Interval>,
}

impl fmt::Debug for InputBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.bindings.iter()).finish()
    }
}

impl InputBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, path: Rc<Path>, interval: Interval) {
        self.bindings.insert(path, interval);
    }

    /// The interval of the input at `path`, the full domain of `var_type` if unbound.
    pub fn get(&self, path: &Rc<Path>, var_type: ExpressionType) -> Interval {
        let full = Interval::full(var_type);
        match self.bindings.get(path) {
            Some(interval) => interval.meet(&full),
            None => full,
        }
    }

    pub fn is_bound(&self, path: &Rc<Path>) -> bool {
        self.bindings.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<Path>, &Interval)> {
        self.bindings.iter()
    }

    /// Pointwise hull. An input bound on one side only is unconstrained in the other,
    /// so it becomes unbound.
    pub fn join(&self, other: &InputBindings) -> InputBindings {
        let mut result = InputBindings::new();
        for (path, interval) in self.bindings.iter() {
            if let Some(other_interval) = other.bindings.get(path) {
                result.bind(path.clone(), interval.lub(other_interval));
            }
        }
        result
    }
}

/// Side results of an evaluation besides the interval itself.
#[derive(Clone, Debug, Default)]
pub struct EvaluationFlags {
    /// Some division or remainder in the tree may have a zero divisor.
    pub may_divide_by_zero: bool,
    pub reasons: BTreeSet<ImprecisionReason>,
}

/// Evaluates finished trees into intervals under given input bindings.
#[derive(Clone, Copy, Debug)]
pub struct RangeEvaluator {
    pub narrowing_iteration: u32,
}

impl RangeEvaluator {
    pub fn new(narrowing_iteration: u32) -> Self {
        RangeEvaluator {
            narrowing_iteration,
        }
    }

    fn solver(&self) -> ConstraintSolver<'_> {
        ConstraintSolver::new(self)
    }

    /// Evaluates `value` without collecting flags.
    pub fn evaluate_quietly(&self, value: &Rc<SymbolicValue>, bindings: &InputBindings) -> Interval {
        self.evaluate(value, bindings, &mut EvaluationFlags::default())
    }

    /// The tightest interval this evaluator can find for `value`, in its own domain.
    pub fn evaluate(
        &self,
        value: &Rc<SymbolicValue>,
        bindings: &InputBindings,
        flags: &mut EvaluationFlags,
    ) -> Interval {
        match &value.expression {
            Expression::Top | Expression::HeapBlock { .. } => Interval::top(),
            Expression::Bottom => Interval::bottom(),
            Expression::CompileTimeConstant { value, .. } => match value {
                ConstantValue::Int(n) => Interval::singleton(n.clone()),
                ConstantValue::Bottom => Interval::bottom(),
                ConstantValue::Null | ConstantValue::Top => Interval::top(),
            },
            Expression::Variable { path, var_type } => bindings.get(path, *var_type),
            Expression::Widen {
                path,
                bounds,
                var_type,
            } => bindings.get(path, *var_type).meet(bounds),
            Expression::Binary {
                operator,
                left,
                right,
                result_type,
            } => self.evaluate_binary(*operator, left, right, *result_type, bindings, flags),
            Expression::Unary {
                operator,
                operand,
                result_type,
            } => {
                let operand = self.evaluate(operand, bindings, flags);
                match operator {
                    UnaryOperator::Neg => (-operand).wrap_to(*result_type),
                    UnaryOperator::BitNot => operand.bit_not(),
                }
            }
            Expression::Cast {
                operand,
                target_type,
            } => self.evaluate(operand, bindings, flags).wrap_to(*target_type),
            Expression::Comparison { .. }
            | Expression::And { .. }
            | Expression::Or { .. }
            | Expression::LogicalNot { .. } => {
                Interval::from_option_bool(self.truth_value(value, bindings))
            }
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => {
                let solver = self.solver();
                let mut result = Interval::bottom();
                if let Some(narrowed) = solver.narrow(bindings, condition, true) {
                    result = result.lub(&self.evaluate(consequent, &narrowed, flags));
                }
                if let Some(narrowed) = solver.narrow(bindings, condition, false) {
                    result = result.lub(&self.evaluate(alternate, &narrowed, flags));
                }
                result
            }
            Expression::Union { branches, .. } => {
                let solver = self.solver();
                branches
                    .iter()
                    .filter_map(|(condition, value)| {
                        solver
                            .narrow(bindings, condition, true)
                            .map(|narrowed| self.evaluate(value, &narrowed, flags))
                    })
                    .fold(Interval::bottom(), |acc, i| acc.lub(&i))
            }
        }
    }

    /// Flags of the arithmetic operands of a boolean tree, which `evaluate` only inspects
    /// for their truth. The right operand of `&&` and `||` is evaluated where the left one
    /// lets it run.
    pub fn evaluate_operands(&self, condition: &Rc<SymbolicValue>, bindings: &InputBindings, flags: &mut EvaluationFlags) {
        match &condition.expression {
            Expression::Comparison { left, right, .. } => {
                self.evaluate(left, bindings, flags);
                self.evaluate(right, bindings, flags);
            }
            Expression::And { left, right } | Expression::Or { left, right } => {
                self.evaluate_operands(left, bindings, flags);
                let runs_right = matches!(condition.expression, Expression::And { .. });
                if let Some(narrowed) = self.solver().narrow(bindings, left, runs_right) {
                    self.evaluate_operands(right, &narrowed, flags);
                }
            }
            Expression::LogicalNot { operand } => self.evaluate_operands(operand, bindings, flags),
            Expression::ConditionalExpression {
                condition: c,
                consequent,
                alternate,
            } => {
                self.evaluate_operands(c, bindings, flags);
                let solver = self.solver();
                if let Some(narrowed) = solver.narrow(bindings, c, true) {
                    self.evaluate_operands(consequent, &narrowed, flags);
                }
                if let Some(narrowed) = solver.narrow(bindings, c, false) {
                    self.evaluate_operands(alternate, &narrowed, flags);
                }
            }
            _ => {
                self.evaluate(condition, bindings, flags);
            }
        }
    }

    fn evaluate_binary(
        &self,
        operator: BinaryOperator,
        left: &Rc<SymbolicValue>,
        right: &Rc<SymbolicValue>,
        result_type: ExpressionType,
        bindings: &InputBindings,
        flags: &mut EvaluationFlags,
    ) -> Interval {
        let l = self.evaluate(left, bindings, flags);
        let r = self.evaluate(right, bindings, flags);
        let result = match operator {
            BinaryOperator::Add => (l.clone() + r.clone()).wrap_to(result_type),
            BinaryOperator::Sub => (l.clone() - r.clone()).wrap_to(result_type),
            BinaryOperator::Mul => {
                let product = if left == right {
                    l.square()
                } else {
                    l.clone() * r.clone()
                };
                product.wrap_to(result_type)
            }
            BinaryOperator::Div => {
                let (quotient, divides_by_zero) = l.div_trunc(&r);
                flags.may_divide_by_zero |= divides_by_zero;
                quotient.wrap_to(result_type)
            }
            BinaryOperator::Rem => {
                let (remainder, divides_by_zero) = l.rem_trunc(&r);
                flags.may_divide_by_zero |= divides_by_zero;
                remainder
            }
            BinaryOperator::BitAnd => l.bit_and(&r, result_type),
            BinaryOperator::BitOr => l.bit_or(&r, result_type),
            BinaryOperator::BitXor => l.bit_xor(&r, result_type),
            BinaryOperator::Shl => l.shl(&r, result_type),
            BinaryOperator::Shr => l.shr(&r, result_type),
            BinaryOperator::UShr => l.ushr(&r, result_type),
        };
        if !result.is_singleton() && !result.is_bottom() {
            Self::record_reasons(operator, left, right, &l, &r, flags);
        }
        result
    }

    /// Names the known sources of gaps in a non-singleton result.
    fn record_reasons(
        operator: BinaryOperator,
        left: &Rc<SymbolicValue>,
        right: &Rc<SymbolicValue>,
        l: &Interval,
        r: &Interval,
        flags: &mut EvaluationFlags,
    ) {
        let is_scaling = |i: &Interval| match Integer::try_from_interval(i) {
            Some(n) => n.abs() > 1,
            None => false,
        };
        match operator {
            BinaryOperator::Mul if left == right => {
                flags.reasons.insert(ImprecisionReason::GapsFromPowers);
                return;
            }
            BinaryOperator::Mul => {
                if (!l.is_singleton() && !r.is_singleton()) || is_scaling(l) || is_scaling(r) {
                    flags.reasons.insert(ImprecisionReason::GapsFromMultiplication);
                }
            }
            BinaryOperator::Rem if !l.is_singleton() => {
                flags
                    .reasons
                    .insert(ImprecisionReason::RequiresModulusReasoning);
            }
            _ => (),
        }
        if left.expression_size <= SHARED_INPUT_SEARCH_LIMIT
            && right.expression_size <= SHARED_INPUT_SEARCH_LIMIT
        {
            let mut left_leaves = BTreeSet::new();
            let mut right_leaves = BTreeSet::new();
            left.collect_leaves(&mut left_leaves);
            right.collect_leaves(&mut right_leaves);
            if left_leaves.intersection(&right_leaves).next().is_some() {
                debug!("operands share inputs: {:?} {} {:?}", left, operator, right);
                flags
                    .reasons
                    .insert(ImprecisionReason::RequiresIdentifyingIdenticalExpressions);
            }
        }
    }

    /// Three valued truth of a boolean tree. Interval reasoning first, then the solver
    /// proves one polarity infeasible.
    pub fn truth_value(&self, condition: &Rc<SymbolicValue>, bindings: &InputBindings) -> Option<bool> {
        if let Some(b) = self.direct_truth_value(condition, bindings) {
            return Some(b);
        }
        let solver = self.solver();
        if solver.narrow(bindings, condition, true).is_none() {
            Some(false)
        } else if solver.narrow(bindings, condition, false).is_none() {
            Some(true)
        } else {
            None
        }
    }

    /// Truth of a boolean tree from the intervals of its operands alone.
    pub fn direct_truth_value(
        &self,
        condition: &Rc<SymbolicValue>,
        bindings: &InputBindings,
    ) -> Option<bool> {
        match &condition.expression {
            Expression::Comparison {
                operator,
                left,
                right,
            } => {
                if left.value_type() == ExpressionType::Reference {
                    return None;
                }
                let l = self.evaluate_quietly(left, bindings);
                let r = self.evaluate_quietly(right, bindings);
                compare_intervals(*operator, &l, &r)
            }
            Expression::And { left, right } => {
                match (
                    self.direct_truth_value(left, bindings),
                    self.direct_truth_value(right, bindings),
                ) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }
            }
            Expression::Or { left, right } => {
                match (
                    self.direct_truth_value(left, bindings),
                    self.direct_truth_value(right, bindings),
                ) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }
            }
            Expression::LogicalNot { operand } => {
                self.direct_truth_value(operand, bindings).map(|b| !b)
            }
            _ => self.evaluate_quietly(condition, bindings).as_bool(),
        }
    }
}

/// Signed comparison of two intervals of the same domain.
pub fn compare_intervals(operator: ComparisonOperator, l: &Interval, r: &Interval) -> Option<bool> {
    if l.is_bottom() || r.is_bottom() {
        return None;
    }
    match operator {
        ComparisonOperator::Eq => l.equal_to(r),
        ComparisonOperator::Ne => l.not_equal_to(r),
        ComparisonOperator::Lt => l.less_than(r),
        ComparisonOperator::Le => l.less_equal(r),
        ComparisonOperator::Gt => l.greater_than(r),
        ComparisonOperator::Ge => l.greater_equal(r),
    }
}

/// The integer an interval pins down, if any.
trait TryFromInterval {
    fn try_from_interval(interval: &Interval) -> Option<Integer>;
}

impl TryFromInterval for Integer {
    fn try_from_interval(interval: &Interval) -> Option<Integer> {
        if interval.is_singleton() {
            interval.low.as_integer().cloned()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::memory::expression::ExpressionType::*;
    use crate::analysis::numerical::interval::Bound;

    fn param(ordinal: usize, ty: ExpressionType) -> Rc<SymbolicValue> {
        SymbolicValue::make_variable(Path::new_parameter(ordinal), ty)
    }

    fn int(v: i64) -> Rc<SymbolicValue> {
        SymbolicValue::make_int(v, I32)
    }

    fn evaluator() -> RangeEvaluator {
        RangeEvaluator::new(5)
    }

    #[test]
    fn test_default_bindings_are_full_domains() {
        let x = param(0, I16);
        let interval = evaluator().evaluate_quietly(&x, &InputBindings::new());
        assert_eq!(interval, Interval::from_i64(-32768, 32767));
    }

    #[test]
    fn test_short_multiplication_wraps_exactly_for_singletons() {
        let x = param(0, I16);
        let value = x.cast(I32).mul(int(256), I32).cast(I16);
        let mut bindings = InputBindings::new();
        bindings.bind(Path::new_parameter(0), Interval::from_i64(256, 256));
        let interval = evaluator().evaluate_quietly(&value, &bindings);
        assert_eq!(interval, Interval::from_i64(0, 0).with_wrap(true));
    }

    #[test]
    fn test_conditional_narrows_each_branch() {
        let x = param(0, I16).cast(I32);
        let cond = x.less_than(int(3));
        let value = cond.conditional_expression(int(2), int(1));
        assert_eq!(
            evaluator().evaluate_quietly(&value, &InputBindings::new()),
            Interval::from_i64(1, 2)
        );
        // x < 3 ? x : 3 never exceeds 3
        let clamp = cond.conditional_expression(x.clone(), int(3));
        let interval = evaluator().evaluate_quietly(&clamp, &InputBindings::new());
        assert_eq!(interval, Interval::from_i64(-32768, 3));
    }

    #[test]
    fn test_division_by_zero_is_flagged() {
        let x = param(0, I32);
        let y = param(1, I32);
        let quotient = x.binary(BinaryOperator::Div, y, I32);
        let mut flags = EvaluationFlags::default();
        let mut bindings = InputBindings::new();
        bindings.bind(Path::new_parameter(0), Interval::from_i64(10, 20));
        bindings.bind(Path::new_parameter(1), Interval::from_i64(0, 2));
        let interval = evaluator().evaluate(&quotient, &bindings, &mut flags);
        assert!(flags.may_divide_by_zero);
        assert_eq!(interval, Interval::from_i64(5, 20));
    }

    #[test]
    fn test_square_and_reasons() {
        let x = param(0, I16).cast(I32);
        let square = x.mul(x.clone(), I32);
        let mut flags = EvaluationFlags::default();
        let interval = evaluator().evaluate(&square, &InputBindings::new(), &mut flags);
        assert_eq!(interval.low, Bound::from(0i64));
        assert_eq!(interval.high, Bound::from(32768i64 * 32768));
        assert!(flags.reasons.contains(&ImprecisionReason::GapsFromPowers));

        let y = param(1, I16).cast(I32);
        let mut flags = EvaluationFlags::default();
        evaluator().evaluate(&x.binary(BinaryOperator::Rem, int(100), I32), &InputBindings::new(), &mut flags);
        assert!(flags.reasons.contains(&ImprecisionReason::RequiresModulusReasoning));

        let mut flags = EvaluationFlags::default();
        evaluator().evaluate(&x.mul(y, I32), &InputBindings::new(), &mut flags);
        assert!(flags.reasons.contains(&ImprecisionReason::GapsFromMultiplication));
    }

    #[test]
    fn test_boolean_truth_uses_the_solver() {
        let x = param(0, I32);
        // x > 5 && x < 3 can never hold
        let cond = x.greater_than(int(5)).and(x.less_than(int(3)));
        assert_eq!(
            evaluator().truth_value(&cond, &InputBindings::new()),
            Some(false)
        );
        let interval = evaluator().evaluate_quietly(&cond, &InputBindings::new());
        assert_eq!(interval, Interval::from(false));
    }

    #[test]
    fn test_union_skips_infeasible_branches() {
        let x = param(0, I32);
        let never = x.greater_than(int(5)).and(x.less_than(int(3)));
        let union = SymbolicValue::make_from(
            Expression::Union {
                branches: vec![
                    (never, int(100)),
                    (x.greater_than(int(0)), int(1)),
                    (x.less_or_equal(int(0)), int(2)),
                ],
                result_type: I32,
            },
            10,
        );
        assert_eq!(
            evaluator().evaluate_quietly(&union, &InputBindings::new()),
            Interval::from_i64(1, 2)
        );
    }

    #[test]
    fn test_bindings_join() {
        let mut a = InputBindings::new();
        a.bind(Path::new_parameter(0), Interval::from_i64(0, 1));
        a.bind(Path::new_parameter(1), Interval::from_i64(0, 1));
        let mut b = InputBindings::new();
        b.bind(Path::new_parameter(0), Interval::from_i64(5, 6));
        let joined = a.join(&b);
        assert_eq!(joined.get(&Path::new_parameter(0), I32), Interval::from_i64(0, 6));
        assert!(!joined.is_bound(&Path::new_parameter(1)));
    }
}
