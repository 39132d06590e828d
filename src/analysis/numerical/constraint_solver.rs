use crate::analysis::memory::expression::{ComparisonOperator, Expression, ExpressionType};
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use crate::analysis::numerical::evaluator::{compare_intervals, InputBindings, RangeEvaluator};
use crate::analysis::numerical::interval::{Bound, Interval};
use crate::analysis::numerical::linear_constraint::LinearExpression;
use rug::Integer;
use std::rc::Rc;

/// Narrows input intervals so that a boolean tree has a given truth value.
/// `None` means that no input in the given bindings gives the condition that value.
pub struct ConstraintSolver<'e> {
    evaluator: &'e RangeEvaluator,
}

impl<'e> ConstraintSolver<'e> {
    pub fn new(evaluator: &'e RangeEvaluator) -> Self {
        ConstraintSolver { evaluator }
    }

    fn iterations(&self) -> u32 {
        std::cmp::max(self.evaluator.narrowing_iteration, 1)
    }

    /// Bindings within `bindings` under which `condition` may evaluate to `polarity`.
    pub fn narrow(
        &self,
        bindings: &InputBindings,
        condition: &Rc<SymbolicValue>,
        polarity: bool,
    ) -> Option<InputBindings> {
        match &condition.expression {
            Expression::Bottom => None,
            Expression::CompileTimeConstant { .. } => match condition.as_bool_if_known() {
                Some(b) if b != polarity => None,
                _ => Some(bindings.clone()),
            },
            Expression::LogicalNot { operand } => self.narrow(bindings, operand, !polarity),
            Expression::And { .. } | Expression::Or { .. } => {
                let is_conjunction =
                    matches!(condition.expression, Expression::And { .. }) == polarity;
                let mut parts = Vec::new();
                flatten(condition, polarity, is_conjunction, &mut parts);
                if is_conjunction {
                    self.narrow_conjunction(bindings, &parts)
                } else {
                    parts
                        .iter()
                        .map(|(part, polarity)| self.narrow(bindings, part, *polarity))
                        .fold(None, join_options)
                }
            }
            Expression::Comparison {
                operator,
                left,
                right,
            } => {
                let operator = if polarity {
                    *operator
                } else {
                    operator.negate()
                };
                self.narrow_comparison(bindings, operator, left, right)
            }
            Expression::Variable { .. } | Expression::Widen { .. } => {
                self.narrow_value(bindings, condition, &Interval::from(polarity))
            }
            // (c && a) || (!c && b)
            Expression::ConditionalExpression {
                condition: c,
                consequent,
                alternate,
            } => {
                let when_true = self
                    .narrow(bindings, c, true)
                    .and_then(|b| self.narrow(&b, consequent, polarity));
                let when_false = self
                    .narrow(bindings, c, false)
                    .and_then(|b| self.narrow(&b, alternate, polarity));
                join_options(when_true, when_false)
            }
            Expression::Union { branches, .. } => branches
                .iter()
                .map(|(c, value)| {
                    self.narrow(bindings, c, true)
                        .and_then(|b| self.narrow(&b, value, polarity))
                })
                .fold(None, join_options),
            _ => {
                let interval = self.evaluator.evaluate_quietly(condition, bindings);
                match interval.as_bool() {
                    Some(b) if b != polarity => None,
                    _ => Some(bindings.clone()),
                }
            }
        }
    }

    /// Applies every literal in turn until the bindings stop shrinking.
    fn narrow_conjunction(
        &self,
        bindings: &InputBindings,
        parts: &[(&Rc<SymbolicValue>, bool)],
    ) -> Option<InputBindings> {
        let mut current = bindings.clone();
        for _ in 0..self.iterations() {
            let mut next = current.clone();
            for (part, polarity) in parts {
                next = self.narrow(&next, part, *polarity)?;
            }
            if next == current {
                break;
            }
            current = next;
        }
        Some(current)
    }

    fn narrow_comparison(
        &self,
        bindings: &InputBindings,
        operator: ComparisonOperator,
        left: &Rc<SymbolicValue>,
        right: &Rc<SymbolicValue>,
    ) -> Option<InputBindings> {
        let mut current = bindings.clone();
        for _ in 0..self.iterations() {
            let l = self.evaluator.evaluate_quietly(left, &current);
            let r = self.evaluator.evaluate_quietly(right, &current);
            if l.is_bottom() || r.is_bottom() {
                return None;
            }
            match compare_intervals(operator, &l, &r) {
                Some(false) => return None,
                Some(true) => return Some(current),
                None => (),
            }
            if !left.value_type().is_primitive() {
                return Some(current);
            }
            let next = self.narrow_linear(&current, operator, left, right, &l, &r)?;
            if next == current {
                return Some(current);
            }
            current = next;
        }
        let l = self.evaluator.evaluate_quietly(left, &current);
        let r = self.evaluator.evaluate_quietly(right, &current);
        match compare_intervals(operator, &l, &r) {
            Some(false) => None,
            _ => Some(current),
        }
    }

    /// One round of bound propagation over `left - right op 0`. When neither side may
    /// have wrapped, the sides are decomposed into linear combinations of their subterms.
    fn narrow_linear(
        &self,
        bindings: &InputBindings,
        operator: ComparisonOperator,
        left: &Rc<SymbolicValue>,
        right: &Rc<SymbolicValue>,
        l: &Interval,
        r: &Interval,
    ) -> Option<InputBindings> {
        let ty = left.value_type();
        let linear = if !l.may_wrap && !r.may_wrap && ty.is_integer() {
            LinearExpression::from_value(left, ty) - LinearExpression::from_value(right, ty)
        } else {
            LinearExpression::atom(left) - LinearExpression::atom(right)
        };
        let mut current = bindings.clone();
        for (atom, coefficient) in linear.terms() {
            let rest = self.evaluate_linear(&linear.without(atom), &current);
            if rest.is_bottom() {
                return None;
            }
            let bound = match operator {
                ComparisonOperator::Ne => {
                    match self.excluded_point(&current, atom, coefficient, &rest) {
                        Some(bound) => bound,
                        None => continue,
                    }
                }
                _ => {
                    // coefficient * atom op -rest
                    let target = -rest;
                    let scaled = match operator {
                        ComparisonOperator::Lt => {
                            Interval::new(Bound::NINF, target.high - Bound::from(1i64))
                        }
                        ComparisonOperator::Le => Interval::new(Bound::NINF, target.high),
                        ComparisonOperator::Gt => {
                            Interval::new(target.low + Bound::from(1i64), Bound::INF)
                        }
                        ComparisonOperator::Ge => Interval::new(target.low, Bound::INF),
                        _ => Interval::new(target.low, target.high),
                    };
                    scale_down(&scaled, coefficient)
                }
            };
            current = self.narrow_value(&current, atom, &bound)?;
        }
        Some(current)
    }

    /// For `coefficient * atom != -rest` with a fixed `rest`, removes the excluded value
    /// when it is an end point of the atom's interval.
    fn excluded_point(
        &self,
        bindings: &InputBindings,
        atom: &Rc<SymbolicValue>,
        coefficient: &Integer,
        rest: &Interval,
    ) -> Option<Interval> {
        if !rest.is_singleton() {
            return None;
        }
        let target = -rest.low.as_integer()?.clone();
        if Integer::from(&target % coefficient) != 0 {
            return None;
        }
        let excluded = target / coefficient.clone();
        let current = self.evaluator.evaluate_quietly(atom, bindings);
        let point = Bound::Int(excluded.clone());
        if current.low == point {
            Some(Interval::new(Bound::Int(excluded + 1), Bound::INF))
        } else if current.high == point {
            Some(Interval::new(Bound::NINF, Bound::Int(excluded - 1)))
        } else {
            None
        }
    }

    /// The mathematical range of a linear combination of subterms.
    fn evaluate_linear(&self, linear: &LinearExpression, bindings: &InputBindings) -> Interval {
        linear
            .terms()
            .fold(Interval::singleton(linear.constant()), |acc, (atom, coefficient)| {
                let atom_interval = self.evaluator.evaluate_quietly(atom, bindings);
                acc + atom_interval * Interval::singleton(coefficient.clone())
            })
    }

    /// Restricts the inputs of `value` so that it lies within `bound`.
    pub fn narrow_value(
        &self,
        bindings: &InputBindings,
        value: &Rc<SymbolicValue>,
        bound: &Interval,
    ) -> Option<InputBindings> {
        let current = self.evaluator.evaluate_quietly(value, bindings);
        if current.meet(bound).is_bottom() {
            return None;
        }
        match &value.expression {
            Expression::Variable { path, var_type } => {
                let narrowed = bindings.get(path, *var_type).meet(bound);
                bind_narrowed(bindings, path, narrowed)
            }
            Expression::Widen {
                path,
                bounds,
                var_type,
            } => {
                let narrowed = bindings.get(path, *var_type).meet(bounds).meet(bound);
                bind_narrowed(bindings, path, narrowed)
            }
            // a cast that cannot truncate is the identity
            Expression::Cast {
                operand,
                target_type,
            } if target_type.is_integer() => {
                let inner = self.evaluator.evaluate_quietly(operand, bindings);
                if inner.is_subset_of(&Interval::full(*target_type))
                    && operand.value_type() != ExpressionType::Bool
                {
                    self.narrow_value(bindings, operand, bound)
                } else {
                    Some(bindings.clone())
                }
            }
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => {
                let when_true = self
                    .narrow(bindings, condition, true)
                    .and_then(|b| self.narrow_value(&b, consequent, bound));
                let when_false = self
                    .narrow(bindings, condition, false)
                    .and_then(|b| self.narrow_value(&b, alternate, bound));
                join_options(when_true, when_false)
            }
            _ => Some(bindings.clone()),
        }
    }
}

fn bind_narrowed(
    bindings: &InputBindings,
    path: &Rc<crate::analysis::memory::path::Path>,
    narrowed: Interval,
) -> Option<InputBindings> {
    if narrowed.is_bottom() {
        return None;
    }
    let mut result = bindings.clone();
    result.bind(path.clone(), narrowed);
    Some(result)
}

fn join_options(a: Option<InputBindings>, b: Option<InputBindings>) -> Option<InputBindings> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.join(&b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

/// Collects the literals of a conjunction (or disjunction) with their polarities,
/// pushing negations inwards.
fn flatten<'v>(
    value: &'v Rc<SymbolicValue>,
    polarity: bool,
    conjunctive: bool,
    parts: &mut Vec<(&'v Rc<SymbolicValue>, bool)>,
) {
    match &value.expression {
        Expression::And { left, right } if polarity == conjunctive => {
            flatten(left, polarity, conjunctive, parts);
            flatten(right, polarity, conjunctive, parts);
        }
        Expression::Or { left, right } if polarity != conjunctive => {
            flatten(left, polarity, conjunctive, parts);
            flatten(right, polarity, conjunctive, parts);
        }
        Expression::LogicalNot { operand } => flatten(operand, !polarity, conjunctive, parts),
        _ => parts.push((value, polarity)),
    }
}

/// The values of `a` such that `coefficient * a` lies in `scaled`.
fn scale_down(scaled: &Interval, coefficient: &Integer) -> Interval {
    let magnitude = Integer::from(coefficient.abs_ref());
    let (low, high) = if *coefficient > 0 {
        (scaled.low.clone(), scaled.high.clone())
    } else {
        (-scaled.high.clone(), -scaled.low.clone())
    };
    let low = match low {
        Bound::Int(n) => Bound::Int(ceil_div(&n, &magnitude)),
        other => other,
    };
    let high = match high {
        Bound::Int(n) => Bound::Int(floor_div(&n, &magnitude)),
        other => other,
    };
    Interval::new(low, high)
}

fn floor_div(n: &Integer, d: &Integer) -> Integer {
    let q = Integer::from(n / d);
    let r = Integer::from(n % d);
    if r != 0 && ((*n < 0) != (*d < 0)) {
        q - 1
    } else {
        q
    }
}

fn ceil_div(n: &Integer, d: &Integer) -> Integer {
    let q = Integer::from(n / d);
    let r = Integer::from(n % d);
    if r != 0 && ((*n < 0) == (*d < 0)) {
        q + 1
    } else {
        q
    }
}
