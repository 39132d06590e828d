// This file is adapted from MIRAI (https://github.com/facebookexperimental/MIRAI)
// Original author: Herman Venter <hermanv@fb.com>
// Original copyright header:

// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use super::constant_value::ConstantValue;
use super::expression::{
    BinaryOperator, ComparisonOperator, Expression, ExpressionType, UnaryOperator,
};
use super::path::Path;
use crate::analysis::numerical::interval::Interval;
use crate::analysis::numerical::linear_constraint::LinearExpression;
use rug::Integer;
use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// Represent a symbolic value. Values are immutable and shared through `Rc`,
/// two values are the same if they are structurally equal.
#[derive(Clone, Eq, Ord, PartialOrd, PartialEq, Hash)]
pub struct SymbolicValue {
    pub expression: Expression,
    /// One plus the sizes of all children, shared subterms are counted every time they occur.
    pub expression_size: u64,
}

impl Debug for SymbolicValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.expression.fmt(f)
    }
}

/// An abstract domain element that all represent the impossible concrete value.
/// I.e. the corresponding set of possible concrete values is empty.
pub const BOTTOM: SymbolicValue = SymbolicValue {
    expression: Expression::Bottom,
    expression_size: 1,
};

/// An abstract domain element that all represents all possible concrete values.
pub const TOP: SymbolicValue = SymbolicValue {
    expression: Expression::Top,
    expression_size: 1,
};

impl From<bool> for SymbolicValue {
    fn from(b: bool) -> SymbolicValue {
        if b {
            SymbolicValue::new_true()
        } else {
            SymbolicValue::new_false()
        }
    }
}

impl SymbolicValue {
    pub fn new_true() -> Self {
        SymbolicValue {
            expression: Expression::CompileTimeConstant {
                value: ConstantValue::from(true),
                value_type: ExpressionType::Bool,
            },
            expression_size: 1,
        }
    }

    pub fn new_false() -> Self {
        SymbolicValue {
            expression: Expression::CompileTimeConstant {
                value: ConstantValue::from(false),
                value_type: ExpressionType::Bool,
            },
            expression_size: 1,
        }
    }

    /// Creates an abstract value from the given expression and size.
    pub fn make_from(expression: Expression, expression_size: u64) -> Rc<SymbolicValue> {
        Rc::new(SymbolicValue {
            expression,
            expression_size,
        })
    }

    pub fn make_bool(b: bool) -> Rc<SymbolicValue> {
        Rc::new(b.into())
    }

    pub fn make_true() -> Rc<SymbolicValue> {
        Rc::new(SymbolicValue::new_true())
    }

    pub fn make_false() -> Rc<SymbolicValue> {
        Rc::new(SymbolicValue::new_false())
    }

    /// An integer constant of the given domain, wrapped into it.
    pub fn make_constant(value: Integer, value_type: ExpressionType) -> Rc<SymbolicValue> {
        let value = ConstantValue::Int(value).cast(&value_type);
        SymbolicValue::make_from(
            Expression::CompileTimeConstant { value, value_type },
            1,
        )
    }

    pub fn make_int(value: i64, value_type: ExpressionType) -> Rc<SymbolicValue> {
        SymbolicValue::make_constant(Integer::from(value), value_type)
    }

    pub fn make_null() -> Rc<SymbolicValue> {
        SymbolicValue::make_from(
            Expression::CompileTimeConstant {
                value: ConstantValue::Null,
                value_type: ExpressionType::Reference,
            },
            1,
        )
    }

    /// Creates an abstract value that stands for the unknown value stored at `path`.
    pub fn make_variable(path: Rc<Path>, var_type: ExpressionType) -> Rc<SymbolicValue> {
        SymbolicValue::make_from(Expression::Variable { path, var_type }, 1)
    }

    /// Creates a value about which only the interval `bounds` is known.
    pub fn make_widen(
        path: Rc<Path>,
        bounds: Interval,
        var_type: ExpressionType,
    ) -> Rc<SymbolicValue> {
        SymbolicValue::make_from(
            Expression::Widen {
                path,
                bounds,
                var_type,
            },
            1,
        )
    }

    pub fn make_heap_block(abstract_address: usize) -> Rc<SymbolicValue> {
        SymbolicValue::make_from(Expression::HeapBlock { abstract_address }, 1)
    }

    /// Creates the value of an output that is reached along several mutually exclusive paths
    /// which together cover every execution.
    pub fn make_union(
        branches: Vec<(Rc<SymbolicValue>, Rc<SymbolicValue>)>,
        result_type: ExpressionType,
    ) -> Rc<SymbolicValue> {
        // group equal values, keeping the order in which they first occur
        let mut groups: Vec<(Rc<SymbolicValue>, Rc<SymbolicValue>)> = Vec::new();
        for (condition, value) in branches {
            match condition.as_bool_if_known() {
                Some(false) => continue,
                Some(true) => return value,
                None => (),
            }
            if let Some(group) = groups.iter_mut().find(|(_, v)| *v == value) {
                group.0 = group.0.or(condition);
            } else {
                groups.push((condition, value));
            }
        }
        match groups.len() {
            0 => Rc::new(BOTTOM),
            1 => groups.remove(0).1,
            2 if groups[0].0.logical_not() == groups[1].0 => {
                let (condition, consequent) = groups.remove(0);
                let (_, alternate) = groups.remove(0);
                condition.conditional_expression(consequent, alternate)
            }
            _ => {
                let expression_size = groups.iter().fold(1u64, |acc, (c, v)| {
                    acc.saturating_add(c.expression_size)
                        .saturating_add(v.expression_size)
                });
                SymbolicValue::make_from(
                    Expression::Union {
                        branches: groups,
                        result_type,
                    },
                    expression_size,
                )
            }
        }
    }

    /// Creates an abstract value from a binary expression and keeps track of the size.
    fn make_binary(
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
        operation: impl FnOnce(Rc<SymbolicValue>, Rc<SymbolicValue>) -> Expression,
    ) -> Rc<SymbolicValue> {
        let expression_size = left
            .expression_size
            .saturating_add(right.expression_size)
            .saturating_add(1);
        Self::make_from(operation(left, right), expression_size)
    }

    /// Creates an abstract value from a unary expression and keeps track of the size.
    fn make_unary(
        operand: Rc<SymbolicValue>,
        operation: impl FnOnce(Rc<SymbolicValue>) -> Expression,
    ) -> Rc<SymbolicValue> {
        let expression_size = operand.expression_size.saturating_add(1);
        Self::make_from(operation(operand), expression_size)
    }

    fn make_arithmetic(
        operator: BinaryOperator,
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
        result_type: ExpressionType,
    ) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::Binary {
            operator,
            left,
            right,
            result_type,
        })
    }

    /// Turns a linear combination back into a tree: positive terms first, then the
    /// subtracted ones, then the constant.
    fn from_linear(linear: LinearExpression, ty: ExpressionType) -> Rc<SymbolicValue> {
        let constant = linear.constant();
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for (atom, coefficient) in linear.terms() {
            if *coefficient > 0 {
                positive.push((atom.clone(), coefficient.clone()));
            } else {
                let magnitude = ty.wrap_integer(&Integer::from(-coefficient));
                if magnitude > 0 {
                    negative.push((atom.clone(), magnitude));
                } else {
                    positive.push((atom.clone(), coefficient.clone()));
                }
            }
        }
        let term = |atom: Rc<SymbolicValue>, factor: Integer| {
            if factor == 1 {
                atom
            } else {
                Self::make_arithmetic(
                    BinaryOperator::Mul,
                    atom,
                    Self::make_constant(factor, ty),
                    ty,
                )
            }
        };
        let mut acc: Option<Rc<SymbolicValue>> = None;
        for (atom, factor) in positive {
            let t = term(atom, factor);
            acc = Some(match acc {
                None => t,
                Some(a) => Self::make_arithmetic(BinaryOperator::Add, a, t, ty),
            });
        }
        for (atom, factor) in negative {
            let t = term(atom, factor);
            acc = Some(match acc {
                None => Self::make_unary(t, |operand| Expression::Unary {
                    operator: UnaryOperator::Neg,
                    operand,
                    result_type: ty,
                }),
                Some(a) => Self::make_arithmetic(BinaryOperator::Sub, a, t, ty),
            });
        }
        match acc {
            None => Self::make_constant(constant, ty),
            Some(a) if constant == 0 => a,
            Some(a) if constant > 0 => Self::make_arithmetic(
                BinaryOperator::Add,
                a,
                Self::make_constant(constant, ty),
                ty,
            ),
            Some(a) => {
                let magnitude = ty.wrap_integer(&Integer::from(-&constant));
                if magnitude > 0 {
                    Self::make_arithmetic(
                        BinaryOperator::Sub,
                        a,
                        Self::make_constant(magnitude, ty),
                        ty,
                    )
                } else {
                    Self::make_arithmetic(
                        BinaryOperator::Add,
                        a,
                        Self::make_constant(constant, ty),
                        ty,
                    )
                }
            }
        }
    }

    /// Collects sums of scaled subterms modulo the width of `ty` when that makes the tree smaller.
    fn try_linear(
        operator: BinaryOperator,
        left: &Rc<SymbolicValue>,
        right: &Rc<SymbolicValue>,
        ty: ExpressionType,
    ) -> Option<Rc<SymbolicValue>> {
        if !ty.is_integer() {
            return None;
        }
        let l = LinearExpression::from_value(left, ty);
        let r = LinearExpression::from_value(right, ty);
        let combined = match operator {
            BinaryOperator::Add => l + r,
            BinaryOperator::Sub => l - r,
            BinaryOperator::Mul if r.is_constant() => {
                let factor = r.constant();
                l * factor
            }
            BinaryOperator::Mul if l.is_constant() => {
                let factor = l.constant();
                r * factor
            }
            _ => return None,
        };
        let rebuilt = Self::from_linear(combined.wrap(ty), ty);
        let raw_size = left
            .expression_size
            .saturating_add(right.expression_size)
            .saturating_add(1);
        if rebuilt.expression_size < raw_size {
            Some(rebuilt)
        } else {
            None
        }
    }

    /// Algebraic identities that do not depend on linear normalization.
    fn simplify_binary(
        operator: BinaryOperator,
        left: &Rc<SymbolicValue>,
        right: &Rc<SymbolicValue>,
        ty: ExpressionType,
    ) -> Option<Rc<SymbolicValue>> {
        use BinaryOperator::*;
        let zero = || Self::make_int(0, ty);
        match operator {
            Add | Sub if right.expression.is_zero() => Some(left.clone()),
            Mul if right.expression.is_one() => Some(left.clone()),
            Mul if right.expression.is_zero() => Some(zero()),
            Div if right.expression.is_one() => Some(left.clone()),
            // MIN / -1 wraps to MIN, exactly like negation
            Div if right.expression.is_minus_one() => Some(left.neg(ty)),
            Rem if right.expression.is_one() || right.expression.is_minus_one() => Some(zero()),
            BitAnd if left == right => Some(left.clone()),
            BitAnd if right.expression.is_zero() => Some(zero()),
            BitAnd if right.expression.is_minus_one() => Some(left.clone()),
            BitOr if left == right => Some(left.clone()),
            BitOr if right.expression.is_zero() => Some(left.clone()),
            BitOr if right.expression.is_minus_one() => Some(right.clone()),
            BitXor if left == right => Some(zero()),
            BitXor if right.expression.is_zero() => Some(left.clone()),
            Shl | Shr | UShr if left.expression.is_zero() => Some(zero()),
            Shl | Shr | UShr => {
                let distance = right.as_int_if_known()?;
                let mask = Integer::from(ty.bit_length() - 1);
                if (distance & mask) == 0 {
                    Some(left.clone())
                } else {
                    None
                }
            }
            Add | Sub | Mul => Self::try_linear(operator, left, right, ty),
            _ => None,
        }
    }
}

/// Some methods that a symbolic value has
/// Define a trait in order to define these methods for type `Rc<SymbolicValue>`
pub trait SymbolicValueTrait: Sized {
    fn add(&self, other: Self, result_type: ExpressionType) -> Self;
    fn and(&self, other: Self) -> Self;
    fn as_bool_if_known(&self) -> Option<bool>;
    fn as_int_if_known(&self) -> Option<Integer>;
    fn binary(&self, operator: BinaryOperator, other: Self, result_type: ExpressionType) -> Self;
    fn bit_not(&self, result_type: ExpressionType) -> Self;
    fn cast(&self, target_type: ExpressionType) -> Self;
    fn collect_leaves(&self, result: &mut BTreeSet<Rc<Path>>);
    fn compare(&self, operator: ComparisonOperator, other: Self) -> Self;
    fn conditional_expression(&self, consequent: Self, alternate: Self) -> Self;
    fn equals(&self, other: Self) -> Self;
    fn greater_or_equal(&self, other: Self) -> Self;
    fn greater_than(&self, other: Self) -> Self;
    fn implies(&self, other: &Self) -> bool;
    fn implies_not(&self, other: &Self) -> bool;
    fn is_bottom(&self) -> bool;
    fn is_compile_time_constant(&self) -> bool;
    fn is_top(&self) -> bool;
    fn less_or_equal(&self, other: Self) -> Self;
    fn less_than(&self, other: Self) -> Self;
    fn logical_not(&self) -> Self;
    fn mul(&self, other: Self, result_type: ExpressionType) -> Self;
    fn neg(&self, result_type: ExpressionType) -> Self;
    fn not_equals(&self, other: Self) -> Self;
    fn or(&self, other: Self) -> Self;
    fn record_heap_blocks(&self, result: &mut BTreeSet<usize>);
    fn refine_paths(&self, replace: &mut dyn FnMut(&Self) -> Option<Self>) -> Self;
    fn sub(&self, other: Self, result_type: ExpressionType) -> Self;
    fn value_type(&self) -> ExpressionType;
}

impl SymbolicValueTrait for Rc<SymbolicValue> {
    fn add(&self, other: Rc<SymbolicValue>, result_type: ExpressionType) -> Rc<SymbolicValue> {
        self.binary(BinaryOperator::Add, other, result_type)
    }

    /// Returns an element that is "self && other".
    fn and(&self, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        let self_bool = self.as_bool_if_known();
        let other_bool = other.as_bool_if_known();
        match (self_bool, other_bool) {
            // [false && other] -> false
            // [self && false] -> false
            (Some(false), _) | (_, Some(false)) => return SymbolicValue::make_false(),
            // [true && other] -> other
            (Some(true), _) => return other,
            // [self && true] -> self
            (_, Some(true)) => return self.clone(),
            _ => (),
        }
        if self.is_bottom() {
            return self.clone();
        }
        if other.is_bottom() {
            return other;
        }
        // [x && x] -> x
        if *self == other {
            return other;
        }
        // [x && !x] -> false
        if self.logical_not() == other {
            return SymbolicValue::make_false();
        }
        match &self.expression {
            Expression::And { left: x, right: y } => {
                // [(x && y) && x] -> x && y
                // [(x && y) && y] -> x && y
                if *x == other || *y == other {
                    return self.clone();
                }
            }
            Expression::Or { left: x, right: y } => {
                // [(x || y) && x] -> x
                // [(x || y) && y] -> y
                if *x == other || *y == other {
                    return other;
                }
                // [(x || y) && (!x)] -> y
                // [(x || y) && (!y)] -> x
                let not_other = other.logical_not();
                if *x == not_other {
                    return y.and(other);
                }
                if *y == not_other {
                    return x.and(other);
                }
            }
            _ => (),
        }
        SymbolicValue::make_binary(self.clone(), other, |left, right| Expression::And {
            left,
            right,
        })
    }

    /// The Boolean value of this expression, if known, otherwise None.
    fn as_bool_if_known(&self) -> Option<bool> {
        match &self.expression {
            Expression::CompileTimeConstant {
                value,
                value_type: ExpressionType::Bool,
            } => value.as_bool_if_known(),
            _ => None,
        }
    }

    /// If the concrete value of this abstract value is a known integer, return it.
    fn as_int_if_known(&self) -> Option<Integer> {
        match &self.expression {
            Expression::CompileTimeConstant { value, .. } => value.try_get_integer(),
            _ => None,
        }
    }

    /// Returns an element that is "self op other" computed in `result_type`.
    fn binary(
        &self,
        operator: BinaryOperator,
        other: Rc<SymbolicValue>,
        result_type: ExpressionType,
    ) -> Rc<SymbolicValue> {
        if self.is_top() || self.is_bottom() {
            return self.clone();
        }
        if other.is_top() || other.is_bottom() {
            return other;
        }
        // constants go to the right of commutative operators
        let (left, right) = if operator.is_commutative()
            && self.is_compile_time_constant()
            && !other.is_compile_time_constant()
        {
            (other, self.clone())
        } else {
            (self.clone(), other)
        };
        if let (
            Expression::CompileTimeConstant { value: v1, .. },
            Expression::CompileTimeConstant { value: v2, .. },
        ) = (&left.expression, &right.expression)
        {
            let folded = match operator {
                BinaryOperator::Add => v1.add(v2),
                BinaryOperator::Sub => v1.sub(v2),
                BinaryOperator::Mul => v1.mul(v2),
                BinaryOperator::Div => v1.div(v2),
                BinaryOperator::Rem => v1.rem(v2),
                BinaryOperator::BitAnd => v1.bit_and(v2),
                BinaryOperator::BitOr => v1.bit_or(v2),
                BinaryOperator::BitXor => v1.bit_xor(v2),
                BinaryOperator::Shl => v1.shl(v2, &result_type),
                BinaryOperator::Shr => v1.shr(v2, &result_type),
                BinaryOperator::UShr => v1.ushr(v2, &result_type),
            };
            // division by zero stays symbolic so that the evaluator can report it
            if let ConstantValue::Int(n) = folded {
                return SymbolicValue::make_constant(n, result_type);
            }
        }
        if let Some(simplified) = SymbolicValue::simplify_binary(operator, &left, &right, result_type)
        {
            return simplified;
        }
        SymbolicValue::make_arithmetic(operator, left, right, result_type)
    }

    /// Returns an element that is "~self".
    fn bit_not(&self, result_type: ExpressionType) -> Rc<SymbolicValue> {
        match &self.expression {
            Expression::CompileTimeConstant { value, .. } => {
                if let ConstantValue::Int(n) = value.bit_not() {
                    return SymbolicValue::make_constant(n, result_type);
                }
            }
            // [~~x] -> x
            Expression::Unary {
                operator: UnaryOperator::BitNot,
                operand,
                ..
            } => return operand.clone(),
            _ => (),
        }
        SymbolicValue::make_unary(self.clone(), |operand| Expression::Unary {
            operator: UnaryOperator::BitNot,
            operand,
            result_type,
        })
    }

    /// Returns an element that is "(target_type) self", wrapping when it narrows.
    fn cast(&self, target_type: ExpressionType) -> Rc<SymbolicValue> {
        match &self.expression {
            Expression::CompileTimeConstant { value, value_type } => {
                if *value_type == target_type {
                    return self.clone();
                }
                if let ConstantValue::Int(n) = value {
                    return SymbolicValue::make_constant(n.clone(), target_type);
                }
                return self.clone();
            }
            Expression::Bottom | Expression::Top => return self.clone(),
            // [(x as t1) as target_type] -> x as target_type when the first cast loses nothing
            // or when both truncate and the second one keeps fewer bits
            Expression::Cast {
                operand,
                target_type: t1,
            } => {
                let inner = operand.value_type();
                if inner.fits_in(*t1)
                    || (t1.is_integer()
                        && target_type.is_integer()
                        && t1.bit_length() >= target_type.bit_length())
                {
                    return operand.cast(target_type);
                }
            }
            _ => (),
        }
        if self.value_type() == target_type {
            return self.clone();
        }
        SymbolicValue::make_unary(self.clone(), |operand| Expression::Cast {
            operand,
            target_type,
        })
    }

    /// Adds the paths of every variable and widened leaf to `result`.
    fn collect_leaves(&self, result: &mut BTreeSet<Rc<Path>>) {
        match &self.expression {
            Expression::Variable { path, .. } | Expression::Widen { path, .. } => {
                result.insert(path.clone());
            }
            Expression::And { left, right }
            | Expression::Or { left, right }
            | Expression::Binary { left, right, .. }
            | Expression::Comparison { left, right, .. } => {
                left.collect_leaves(result);
                right.collect_leaves(result);
            }
            Expression::Cast { operand, .. }
            | Expression::LogicalNot { operand }
            | Expression::Unary { operand, .. } => operand.collect_leaves(result),
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => {
                condition.collect_leaves(result);
                consequent.collect_leaves(result);
                alternate.collect_leaves(result);
            }
            Expression::Union { branches, .. } => {
                for (condition, value) in branches {
                    condition.collect_leaves(result);
                    value.collect_leaves(result);
                }
            }
            Expression::Top
            | Expression::Bottom
            | Expression::CompileTimeConstant { .. }
            | Expression::HeapBlock { .. } => (),
        }
    }

    /// Returns an element that is "self op other".
    fn compare(&self, operator: ComparisonOperator, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        use ComparisonOperator::*;
        if self.is_bottom() || self.is_top() {
            return self.clone();
        }
        if other.is_bottom() || other.is_top() {
            return other;
        }
        if let (
            Expression::CompileTimeConstant { value: v1, .. },
            Expression::CompileTimeConstant { value: v2, .. },
        ) = (&self.expression, &other.expression)
        {
            let folded = match operator {
                Eq => v1.equals(v2),
                Ne => v1.not_equals(v2),
                Lt => v1.less_than(v2),
                Le => v1.less_or_equal(v2),
                Gt => v1.greater_than(v2),
                Ge => v1.greater_or_equal(v2),
            };
            if let Some(b) = folded.as_bool_if_known() {
                return SymbolicValue::make_bool(b);
            }
        }
        // [x op x] -> true for the reflexive operators
        if *self == other {
            return SymbolicValue::make_bool(matches!(operator, Eq | Le | Ge));
        }
        if let Eq | Ne = operator {
            // distinct allocations, or an allocation and null, are never equal
            let distinct = match (&self.expression, &other.expression) {
                (Expression::HeapBlock { .. }, Expression::HeapBlock { .. }) => true,
                (Expression::HeapBlock { .. }, Expression::CompileTimeConstant { value, .. })
                | (Expression::CompileTimeConstant { value, .. }, Expression::HeapBlock { .. }) => {
                    *value == ConstantValue::Null
                }
                _ => false,
            };
            if distinct {
                return SymbolicValue::make_bool(operator == Ne);
            }
            // a choice between references is compared branch by branch
            if self.value_type() == ExpressionType::Reference {
                if let Expression::ConditionalExpression {
                    condition,
                    consequent,
                    alternate,
                } = &self.expression
                {
                    return condition.conditional_expression(
                        consequent.compare(operator, other.clone()),
                        alternate.compare(operator, other),
                    );
                }
                if let Expression::ConditionalExpression { .. } = &other.expression {
                    return other.compare(operator, self.clone());
                }
            }
            // [b == true] -> b, [b == false] -> !b
            if self.value_type() == ExpressionType::Bool {
                if let Some(b) = other.as_bool_if_known() {
                    return if b == (operator == Eq) {
                        self.clone()
                    } else {
                        self.logical_not()
                    };
                }
            }
        }
        // constants go to the right
        if self.is_compile_time_constant() && !other.is_compile_time_constant() {
            return other.compare(operator.swap(), self.clone());
        }
        SymbolicValue::make_binary(self.clone(), other, |left, right| Expression::Comparison {
            operator,
            left,
            right,
        })
    }

    /// Returns an element that is "if self { consequent } else { alternate }".
    fn conditional_expression(
        &self,
        consequent: Rc<SymbolicValue>,
        alternate: Rc<SymbolicValue>,
    ) -> Rc<SymbolicValue> {
        match self.as_bool_if_known() {
            Some(true) => return consequent,
            Some(false) => return alternate,
            None => (),
        }
        if consequent == alternate {
            return consequent;
        }
        if consequent.value_type() == ExpressionType::Bool {
            match (consequent.as_bool_if_known(), alternate.as_bool_if_known()) {
                // [c ? true : false] -> c
                (Some(true), Some(false)) => return self.clone(),
                // [c ? false : true] -> !c
                (Some(false), Some(true)) => return self.logical_not(),
                // [c ? x : false] -> c && x
                (_, Some(false)) => return self.and(consequent),
                // [c ? true : x] -> c || x
                (Some(true), _) => return self.or(alternate),
                _ => (),
            }
        }
        // [!c ? x : y] -> c ? y : x
        if let Expression::LogicalNot { operand } = &self.expression {
            return operand.conditional_expression(alternate, consequent);
        }
        // [c ? (c ? x : y) : z] -> c ? x : z
        if let Expression::ConditionalExpression {
            condition,
            consequent: inner,
            ..
        } = &consequent.expression
        {
            if condition == self {
                return self.conditional_expression(inner.clone(), alternate);
            }
        }
        // [c ? x : (c ? y : z)] -> c ? x : z
        if let Expression::ConditionalExpression {
            condition,
            alternate: inner,
            ..
        } = &alternate.expression
        {
            if condition == self {
                return self.conditional_expression(consequent, inner.clone());
            }
        }
        let expression_size = self
            .expression_size
            .saturating_add(consequent.expression_size)
            .saturating_add(alternate.expression_size)
            .saturating_add(1);
        SymbolicValue::make_from(
            Expression::ConditionalExpression {
                condition: self.clone(),
                consequent,
                alternate,
            },
            expression_size,
        )
    }

    fn equals(&self, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        self.compare(ComparisonOperator::Eq, other)
    }

    fn greater_or_equal(&self, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        self.compare(ComparisonOperator::Ge, other)
    }

    fn greater_than(&self, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        self.compare(ComparisonOperator::Gt, other)
    }

    /// Returns true if "self => other" is known at compile time to be true.
    /// Returning false does not imply the implication is false, just that we do not know.
    ///
    /// Important: keep the performance of this function proportional to the size of self.
    fn implies(&self, other: &Rc<SymbolicValue>) -> bool {
        // x => true, is always true
        // false => x, is always true
        // x => x, is always true
        if other.as_bool_if_known().unwrap_or(false)
            || !self.as_bool_if_known().unwrap_or(true)
            || self.eq(other)
        {
            return true;
        }

        // x && y => x
        // y && x => x
        if let Expression::And { left, right } = &self.expression {
            return left.implies(other) || right.implies(other);
        }
        // x => x || y
        if let Expression::Or { left, right } = &other.expression {
            return self.implies(left) || self.implies(right);
        }
        false
    }

    /// Returns true if "self => !other" is known at compile time to be true.
    /// Returning false does not imply the implication is false, just that we do not know.
    fn implies_not(&self, other: &Rc<SymbolicValue>) -> bool {
        // x => !false, is always true
        // false => !x, is always true
        if !other.as_bool_if_known().unwrap_or(true) || !self.as_bool_if_known().unwrap_or(true) {
            return true;
        };
        if let Expression::And { left, right } = &self.expression {
            return left.implies_not(other) || right.implies_not(other);
        }
        // !x => !x
        self.eq(&other.logical_not())
    }

    /// True if the set of concrete values that correspond to this domain is empty.
    fn is_bottom(&self) -> bool {
        matches!(&self.expression, Expression::Bottom)
    }

    /// True if this value is a compile time constant.
    fn is_compile_time_constant(&self) -> bool {
        matches!(&self.expression, Expression::CompileTimeConstant { .. })
    }

    /// True if all possible concrete values are elements of the set corresponding to this domain.
    fn is_top(&self) -> bool {
        matches!(self.expression, Expression::Top)
    }

    fn less_or_equal(&self, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        self.compare(ComparisonOperator::Le, other)
    }

    fn less_than(&self, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        self.compare(ComparisonOperator::Lt, other)
    }

    /// Returns an element that is "!self" where self is a bool.
    fn logical_not(&self) -> Rc<SymbolicValue> {
        if let Some(b) = self.as_bool_if_known() {
            return SymbolicValue::make_bool(!b);
        }
        match &self.expression {
            Expression::Bottom | Expression::Top => self.clone(),
            // [!(x < y)] -> x >= y and so on
            Expression::Comparison {
                operator,
                left,
                right,
            } => SymbolicValue::make_binary(left.clone(), right.clone(), |left, right| {
                Expression::Comparison {
                    operator: operator.negate(),
                    left,
                    right,
                }
            }),
            // [!!x] -> x
            Expression::LogicalNot { operand } => operand.clone(),
            _ => SymbolicValue::make_unary(self.clone(), |operand| Expression::LogicalNot {
                operand,
            }),
        }
    }

    fn mul(&self, other: Rc<SymbolicValue>, result_type: ExpressionType) -> Rc<SymbolicValue> {
        self.binary(BinaryOperator::Mul, other, result_type)
    }

    /// Returns an element that is "-self".
    fn neg(&self, result_type: ExpressionType) -> Rc<SymbolicValue> {
        match &self.expression {
            Expression::CompileTimeConstant { value, .. } => {
                if let ConstantValue::Int(n) = value.neg() {
                    return SymbolicValue::make_constant(n, result_type);
                }
            }
            // [--x] -> x
            Expression::Unary {
                operator: UnaryOperator::Neg,
                operand,
                ..
            } => return operand.clone(),
            _ => (),
        }
        SymbolicValue::make_unary(self.clone(), |operand| Expression::Unary {
            operator: UnaryOperator::Neg,
            operand,
            result_type,
        })
    }

    fn not_equals(&self, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        self.compare(ComparisonOperator::Ne, other)
    }

    /// Returns an element that is "self || other".
    fn or(&self, other: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        fn is_contained_in(x: &Rc<SymbolicValue>, y: &Rc<SymbolicValue>) -> bool {
            if *x == *y {
                return true;
            }
            if let Expression::Or { left, right } = &y.expression {
                is_contained_in(x, left) || is_contained_in(x, right)
            } else {
                false
            }
        }

        match (self.as_bool_if_known(), other.as_bool_if_known()) {
            // [x || true] -> true
            // [true || y] -> true
            (Some(true), _) | (_, Some(true)) => return SymbolicValue::make_true(),
            // [false || y] -> y
            (Some(false), _) => return other,
            // [x || false] -> x
            (_, Some(false)) => return self.clone(),
            _ => (),
        }
        if self.is_bottom() || self.is_top() {
            return self.clone();
        }
        if other.is_bottom() || other.is_top() {
            return other;
        }
        // [x || (x || y)] -> x || y
        if is_contained_in(self, &other) {
            return other;
        }
        // [(x || y) || x] -> x || y
        if is_contained_in(&other, self) {
            return self.clone();
        }
        // [x || !x] -> true
        if self.logical_not() == other {
            return SymbolicValue::make_true();
        }
        // [x || (x && y)] -> x
        if let Expression::And { left, right } = &other.expression {
            if left == self || right == self {
                return self.clone();
            }
        }
        // [(x && y) || x] -> x
        if let Expression::And { left, right } = &self.expression {
            if *left == other || *right == other {
                return other;
            }
        }
        if let (
            Expression::And {
                left: x1,
                right: y1,
            },
            Expression::And {
                left: x2,
                right: y2,
            },
        ) = (&self.expression, &other.expression)
        {
            // [(x && y) || (x && z)] -> x && (y || z) when y || z simplifies
            if x1 == x2 {
                let rest = y1.or(y2.clone());
                if !matches!(rest.expression, Expression::Or { .. }) {
                    return x1.and(rest);
                }
            }
            // [(x && z) || (y && z)] -> (x || y) && z when x || y simplifies
            if y1 == y2 {
                let rest = x1.or(x2.clone());
                if !matches!(rest.expression, Expression::Or { .. }) {
                    return rest.and(y1.clone());
                }
            }
        }
        SymbolicValue::make_binary(self.clone(), other, |left, right| Expression::Or {
            left,
            right,
        })
    }

    /// Adds any abstract addresses found in the value to the given set.
    fn record_heap_blocks(&self, result: &mut BTreeSet<usize>) {
        self.expression.record_heap_blocks(result);
    }

    /// Rebuilds this value bottom up through the simplifying constructors, replacing every
    /// node for which `replace` returns a value.
    fn refine_paths(
        &self,
        replace: &mut dyn FnMut(&Rc<SymbolicValue>) -> Option<Rc<SymbolicValue>>,
    ) -> Rc<SymbolicValue> {
        if let Some(value) = replace(self) {
            return value;
        }
        match &self.expression {
            Expression::Top
            | Expression::Bottom
            | Expression::CompileTimeConstant { .. }
            | Expression::HeapBlock { .. }
            | Expression::Variable { .. }
            | Expression::Widen { .. } => self.clone(),
            Expression::And { left, right } => left
                .refine_paths(replace)
                .and(right.refine_paths(replace)),
            Expression::Binary {
                operator,
                left,
                right,
                result_type,
            } => left
                .refine_paths(replace)
                .binary(*operator, right.refine_paths(replace), *result_type),
            Expression::Cast {
                operand,
                target_type,
            } => operand.refine_paths(replace).cast(*target_type),
            Expression::Comparison {
                operator,
                left,
                right,
            } => left
                .refine_paths(replace)
                .compare(*operator, right.refine_paths(replace)),
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => condition.refine_paths(replace).conditional_expression(
                consequent.refine_paths(replace),
                alternate.refine_paths(replace),
            ),
            Expression::LogicalNot { operand } => operand.refine_paths(replace).logical_not(),
            Expression::Or { left, right } => {
                left.refine_paths(replace).or(right.refine_paths(replace))
            }
            Expression::Unary {
                operator,
                operand,
                result_type,
            } => {
                let operand = operand.refine_paths(replace);
                match operator {
                    UnaryOperator::Neg => operand.neg(*result_type),
                    UnaryOperator::BitNot => operand.bit_not(*result_type),
                }
            }
            Expression::Union {
                branches,
                result_type,
            } => {
                let branches = branches
                    .iter()
                    .map(|(condition, value)| {
                        (condition.refine_paths(replace), value.refine_paths(replace))
                    })
                    .collect();
                SymbolicValue::make_union(branches, *result_type)
            }
        }
    }

    fn sub(&self, other: Rc<SymbolicValue>, result_type: ExpressionType) -> Rc<SymbolicValue> {
        self.binary(BinaryOperator::Sub, other, result_type)
    }

    fn value_type(&self) -> ExpressionType {
        self.expression.infer_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::memory::expression::ExpressionType::*;

    fn param(ordinal: usize, ty: ExpressionType) -> Rc<SymbolicValue> {
        SymbolicValue::make_variable(Path::new_parameter(ordinal), ty)
    }

    fn int(v: i64) -> Rc<SymbolicValue> {
        SymbolicValue::make_int(v, I32)
    }

    fn resimplify(value: &Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        value.refine_paths(&mut |_| None)
    }

    #[test]
    fn test_self_cancellation() {
        let x = param(0, I32).mul(int(3), I32).add(param(1, I32), I32);
        assert_eq!(x.sub(x.clone(), I32), int(0));
        assert_eq!(x.binary(BinaryOperator::BitXor, x.clone(), I32), int(0));
        assert_eq!(x.binary(BinaryOperator::BitAnd, x.clone(), I32), x);
    }

    #[test]
    fn test_independently_built_operands_cancel() {
        let build = || {
            param(0, I32)
                .mul(int(2), I32)
                .sub(int(1), I32)
                .mul(int(2), I32)
        };
        let diff = build().sub(build(), I32);
        assert_eq!(diff, int(0));
        assert_eq!(diff.expression_size, 1);
    }

    #[test]
    fn test_affine_collection() {
        let a = param(0, I32);
        // a - (a + 10) -> -10
        assert_eq!(a.sub(a.add(int(10), I32), I32), int(-10));
        // (a + 1) - (a + 2) -> -1
        assert_eq!(
            a.add(int(1), I32).sub(a.add(int(2), I32), I32),
            int(-1)
        );
        // (a + 1) + 2 -> a + 3
        let folded = a.add(int(1), I32).add(int(2), I32);
        assert_eq!(folded, a.add(int(3), I32));
        assert_eq!(folded.expression_size, 3);
    }

    #[test]
    fn test_simplification_is_idempotent() {
        let a = param(0, I32);
        let b = param(1, I32);
        let c = param(2, I32);
        let values = vec![
            a.mul(int(2), I32).add(b.mul(int(3), I32), I32).sub(c.clone(), I32).add(int(5), I32),
            int(0).sub(a.clone(), I32).sub(b.clone(), I32),
            a.mul(b.clone(), I32).sub(a.mul(b.clone(), I32).mul(int(2), I32), I32),
            a.less_than(int(3)).logical_not(),
            a.cast(I16).cast(I32).add(int(7), I32),
            a.add(int(2147483647), I32).add(int(1), I32),
        ];
        for value in values {
            let again = resimplify(&value);
            assert_eq!(again, value);
            assert_eq!(resimplify(&again), again);
        }
    }

    #[test]
    fn test_constant_wraparound() {
        let sum = int(32767).add(int(1), I32).cast(I16);
        assert_eq!(sum.as_int_if_known(), Some(Integer::from(-32768)));
        let product = int(16384).mul(int(2), I32).cast(I16);
        assert_eq!(product.as_int_if_known(), Some(Integer::from(-32768)));
        let product = int(256).mul(int(256), I32).cast(I16);
        assert_eq!(product.as_int_if_known(), Some(Integer::from(0)));
    }

    #[test]
    fn test_division_by_constant_zero_stays_symbolic() {
        let quotient = int(5).binary(BinaryOperator::Div, int(0), I32);
        assert!(!quotient.is_compile_time_constant());
        let min = SymbolicValue::make_int(i32::MIN as i64, I32);
        let wrapped = min.binary(BinaryOperator::Div, int(-1), I32);
        assert_eq!(wrapped, min);
    }

    #[test]
    fn test_double_negation() {
        let a = param(0, I32);
        assert_eq!(a.neg(I32).neg(I32), a);
        assert_eq!(a.bit_not(I32).bit_not(I32), a);
        let cond = param(1, Bool);
        assert_eq!(cond.logical_not().logical_not(), cond);
        let lt = a.less_than(int(3));
        assert_eq!(lt.logical_not(), a.greater_or_equal(int(3)));
    }

    #[test]
    fn test_cast_chains() {
        let s = param(0, I16);
        // (int) s is lossless, so (byte)(int) s is (byte) s
        assert_eq!(s.cast(I32).cast(I8), s.cast(I8));
        // back to the source type
        assert_eq!(s.cast(I32).cast(I16), s);
        let c = param(1, Char);
        assert_ne!(param(2, I16).cast(Char).cast(I32), param(2, I16).cast(I32));
        assert_eq!(c.cast(I32).cast(Char), c);
    }

    #[test]
    fn test_comparisons_fold() {
        let a = param(0, I32);
        assert_eq!(a.less_or_equal(a.clone()).as_bool_if_known(), Some(true));
        assert_eq!(a.less_than(a.clone()).as_bool_if_known(), Some(false));
        // constants move to the right
        assert_eq!(int(3).less_than(a.clone()), a.greater_than(int(3)));
        let h1 = SymbolicValue::make_heap_block(1);
        let h2 = SymbolicValue::make_heap_block(2);
        assert_eq!(h1.equals(h2).as_bool_if_known(), Some(false));
        assert_eq!(
            h1.not_equals(SymbolicValue::make_null()).as_bool_if_known(),
            Some(true)
        );
    }

    #[test]
    fn test_conditional_reference_equality() {
        let c = param(0, Bool);
        let h1 = SymbolicValue::make_heap_block(1);
        let h2 = SymbolicValue::make_heap_block(2);
        let choice = c.conditional_expression(h1.clone(), h2);
        assert_eq!(choice.equals(h1), c);
    }

    #[test]
    fn test_union_of_complementary_paths() {
        let x = param(0, I16);
        let cond = x.cast(I32).less_than(int(3));
        let union = SymbolicValue::make_union(
            vec![(cond.clone(), int(2)), (cond.logical_not(), int(1))],
            I32,
        );
        assert_eq!(union, cond.conditional_expression(int(2), int(1)));
        assert_eq!(union.expression_size, 1 + cond.expression_size + 2);

        let same = SymbolicValue::make_union(
            vec![(cond.clone(), int(2)), (cond.logical_not(), int(2))],
            I32,
        );
        assert_eq!(same, int(2));
    }

    #[test]
    fn test_path_conditions_merge() {
        let a = param(0, Bool);
        let b = param(1, Bool);
        let c = param(2, Bool);
        let left = a.and(b.clone()).and(c.clone());
        let right = a.and(b.logical_not()).and(c.clone());
        assert_eq!(left.or(right), a.and(c));
    }

    #[test]
    fn test_refine_paths_substitutes_and_simplifies() {
        let x = param(0, I32);
        let y = param(1, I32);
        let value = x.sub(y.clone(), I32);
        let substituted = value.refine_paths(&mut |v| {
            if *v == y {
                Some(x.clone())
            } else {
                None
            }
        });
        assert_eq!(substituted, int(0));
    }
}
