// This file is adapted from MIRAI (https://github.com/facebookexperimental/MIRAI)
// Original author: Herman Venter <hermanv@fb.com>
// Original copyright header:

// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use super::constant_value::ConstantValue;
use super::path::Path;
use super::symbolic_value::SymbolicValue;
use crate::analysis::numerical::interval::Interval;
use az::OverflowingCast;
use rug::Integer;
use std::collections::BTreeSet;
use std::fmt::{self, Debug, Formatter, Result};
use std::rc::Rc;

/// Closely based on the expressions found in MIR.
#[derive(Clone, Eq, PartialOrd, PartialEq, Hash, Ord)]
pub enum Expression {
    /// An expression that represents any possible value
    Top,

    /// An expression that represents an impossible value, such as the value returned by a method
    /// that always throws.
    Bottom,

    /// An expression that is true if both left and right are true. &&
    And {
        // The value of the left operand.
        left: Rc<SymbolicValue>,
        // The value of the right operand.
        right: Rc<SymbolicValue>,
    },

    /// An arithmetic, bitwise or shift operation. Both operands of arithmetic and bitwise
    /// operations already have `result_type`; shifts only require the left operand to have it.
    Binary {
        operator: BinaryOperator,
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
        result_type: ExpressionType,
    },

    /// An expression that is the operand converted to the target_type, wrapping if narrowing.
    Cast {
        // The value of the operand.
        operand: Rc<SymbolicValue>,
        // The type the operand is being cast to.
        target_type: ExpressionType,
    },

    /// A signed comparison of two operands of the same type.
    Comparison {
        operator: ComparisonOperator,
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
    },

    /// An expression that is a compile time constant value, such as a numeric literal or null.
    CompileTimeConstant {
        value: ConstantValue,
        value_type: ExpressionType,
    },

    /// An expression that is either if_true or if_false, depending on the value of condition.
    ConditionalExpression {
        // A condition that results in a Boolean value
        condition: Rc<SymbolicValue>,
        // The value of this expression if join_condition is true.
        consequent: Rc<SymbolicValue>,
        // The value of this expression if join_condition is false.
        alternate: Rc<SymbolicValue>,
    },

    /// An expression that represents an object allocated by a `new` expression.
    /// Every evaluation of an allocation site gets its own ordinal.
    HeapBlock {
        // A unique ordinal that distinguishes this allocation from other allocations.
        // Not an actual memory address.
        abstract_address: usize,
    },

    /// An expression that is true if the operand is false. ! bool
    LogicalNot { operand: Rc<SymbolicValue> },

    /// An expression that is true if either one of left or right are true. ||
    Or {
        // The value of the left operand.
        left: Rc<SymbolicValue>,
        // The value of the right operand.
        right: Rc<SymbolicValue>,
    },

    /// Arithmetic negation or bitwise complement of an already promoted operand.
    Unary {
        operator: UnaryOperator,
        operand: Rc<SymbolicValue>,
        result_type: ExpressionType,
    },

    /// The value of the first branch whose path condition holds. The conditions of the
    /// branches are mutually exclusive, they come from distinct forks reaching method exit.
    Union {
        branches: Vec<(Rc<SymbolicValue>, Rc<SymbolicValue>)>,
        result_type: ExpressionType,
    },

    /// The unknown value of a place in memory.
    /// This is distinct from Top in that we known something: the place and the type.
    /// This is a useful distinction because it allows us to simplify some expressions
    /// like x == x.
    Variable {
        path: Rc<Path>,
        var_type: ExpressionType,
    },

    /// The partly known value of a place in memory that is assigned to from inside a loop
    /// body. Only the interval reached by the loop's fixed point is known.
    Widen {
        /// The path of the location where an indeterminate number of flows join together.
        path: Rc<Path>,
        /// The fixed point reached for this path.
        bounds: Interval,
        var_type: ExpressionType,
    },
}

impl Debug for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Expression::Top => f.write_str("TOP"),
            Expression::Bottom => f.write_str("BOTTOM"),
            Expression::And { left, right } => {
                f.write_fmt(format_args!("({:?}) && ({:?})", left, right))
            }
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => f.write_fmt(format_args!("({:?}) {} ({:?})", left, operator, right)),
            Expression::Cast {
                operand,
                target_type,
            } => f.write_fmt(format_args!("({}) ({:?})", target_type, operand)),
            Expression::Comparison {
                operator,
                left,
                right,
            } => f.write_fmt(format_args!("({:?}) {} ({:?})", left, operator, right)),
            Expression::CompileTimeConstant { value, .. } => value.fmt(f),
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => f.write_fmt(format_args!(
                "if {:?} {{ {:?} }} else {{ {:?} }}",
                condition, consequent, alternate
            )),
            Expression::HeapBlock { abstract_address } => {
                f.write_fmt(format_args!("heap_{}", *abstract_address))
            }
            Expression::LogicalNot { operand } => f.write_fmt(format_args!("!({:?})", operand)),
            Expression::Or { left, right } => {
                f.write_fmt(format_args!("({:?}) || ({:?})", left, right))
            }
            Expression::Unary {
                operator, operand, ..
            } => f.write_fmt(format_args!("{}({:?})", operator, operand)),
            Expression::Union { branches, .. } => {
                f.write_str("union {")?;
                for (condition, value) in branches {
                    f.write_fmt(format_args!(" [{:?}] => {:?};", condition, value))?;
                }
                f.write_str(" }")
            }
            Expression::Variable { path, var_type } => {
                f.write_fmt(format_args!("{:?}: {}", path, var_type))
            }
            Expression::Widen { path, bounds, .. } => {
                f.write_fmt(format_args!("widen({:?}) at {:?}", bounds, path))
            }
        }
    }
}

impl Expression {
    /// Returns the type of value the expression should result in, if well formed.
    /// (both operands are of the same type for binary operators, conditional branches match).
    pub fn infer_type(&self) -> ExpressionType {
        use self::ExpressionType::*;
        match self {
            Expression::Top | Expression::Bottom => Reference,
            Expression::And { .. }
            | Expression::Comparison { .. }
            | Expression::LogicalNot { .. }
            | Expression::Or { .. } => Bool,
            Expression::Binary { result_type, .. }
            | Expression::Unary { result_type, .. }
            | Expression::Union { result_type, .. } => *result_type,
            Expression::Cast { target_type, .. } => *target_type,
            Expression::CompileTimeConstant { value_type, .. } => *value_type,
            Expression::ConditionalExpression { consequent, .. } => {
                consequent.expression.infer_type()
            }
            Expression::HeapBlock { .. } => Reference,
            Expression::Variable { var_type, .. } | Expression::Widen { var_type, .. } => {
                *var_type
            }
        }
    }

    /// Determines if the given expression is the compile time constant 1.
    pub fn is_one(&self) -> bool {
        if let Expression::CompileTimeConstant {
            value: ConstantValue::Int(val),
            ..
        } = self
        {
            return *val == 1;
        }
        false
    }

    /// Determines if the given expression is the compile time constant 0.
    pub fn is_zero(&self) -> bool {
        if let Expression::CompileTimeConstant {
            value: ConstantValue::Int(val),
            ..
        } = self
        {
            return *val == 0;
        }
        false
    }

    /// Determines if the given expression is the compile time constant -1.
    pub fn is_minus_one(&self) -> bool {
        if let Expression::CompileTimeConstant {
            value: ConstantValue::Int(val),
            ..
        } = self
        {
            return *val == -1;
        }
        false
    }

    /// Leaves are the values the range evaluator binds to intervals.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Expression::Variable { .. } | Expression::Widen { .. })
    }

    /// Adds any heap blocks found in the associated expression to the given set.
    pub fn record_heap_blocks(&self, result: &mut BTreeSet<usize>) {
        match &self {
            Expression::HeapBlock { abstract_address } => {
                result.insert(*abstract_address);
            }
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => {
                condition.expression.record_heap_blocks(result);
                consequent.expression.record_heap_blocks(result);
                alternate.expression.record_heap_blocks(result);
            }
            Expression::Union { branches, .. } => {
                for (_, value) in branches {
                    value.expression.record_heap_blocks(result);
                }
            }
            _ => (),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum UnaryOperator {
    Neg,
    BitNot,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            UnaryOperator::Neg => f.write_str("-"),
            UnaryOperator::BitNot => f.write_str("~"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl BinaryOperator {
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Mul
                | BinaryOperator::BitAnd
                | BinaryOperator::BitOr
                | BinaryOperator::BitXor
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(
            self,
            BinaryOperator::Shl | BinaryOperator::Shr | BinaryOperator::UShr
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::UShr => ">>>",
        };
        f.write_str(symbol)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOperator {
    /// The operator `op'` such that `!(a op b) == a op' b`.
    pub fn negate(self) -> Self {
        use ComparisonOperator::*;
        match self {
            Eq => Ne,
            Ne => Eq,
            Lt => Ge,
            Le => Gt,
            Gt => Le,
            Ge => Lt,
        }
    }

    /// The operator `op'` such that `a op b == b op' a`.
    pub fn swap(self) -> Self {
        use ComparisonOperator::*;
        match self {
            Eq => Eq,
            Ne => Ne,
            Lt => Gt,
            Le => Ge,
            Gt => Lt,
            Ge => Le,
        }
    }

    pub fn is_ordering(self) -> bool {
        !matches!(self, ComparisonOperator::Eq | ComparisonOperator::Ne)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let symbol = match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

/// The domain of a value. Every node of an expression tree belongs to exactly one of these.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ExpressionType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    Reference,
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let name = match self {
            ExpressionType::Bool => "boolean",
            ExpressionType::Char => "char",
            ExpressionType::I8 => "byte",
            ExpressionType::I16 => "short",
            ExpressionType::I32 => "int",
            ExpressionType::I64 => "long",
            ExpressionType::Reference => "reference",
        };
        f.write_str(name)
    }
}

impl ExpressionType {
    /// Returns true if this type is one of the integer types.
    pub fn is_integer(&self) -> bool {
        use self::ExpressionType::*;
        matches!(self, Char | I8 | I16 | I32 | I64)
    }

    /// Returns true if this type is not a reference.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, ExpressionType::Reference)
    }

    /// Returns true if this type is one of the signed integer types.
    pub fn is_signed_integer(&self) -> bool {
        use self::ExpressionType::*;
        matches!(self, I8 | I16 | I32 | I64)
    }

    /// Returns the number of bits used to represent the given type.
    pub fn bit_length(&self) -> u32 {
        use self::ExpressionType::*;
        match self {
            Bool => 1,
            I8 => 8,
            Char | I16 => 16,
            I32 => 32,
            I64 | Reference => 64,
        }
    }

    /// Returns the maximum value for this type. References have no numeric range.
    pub fn max_value(&self) -> Integer {
        use self::ExpressionType::*;
        match self {
            Bool => Integer::from(1),
            Char => Integer::from(std::u16::MAX),
            I8 => Integer::from(std::i8::MAX),
            I16 => Integer::from(std::i16::MAX),
            I32 => Integer::from(std::i32::MAX),
            I64 | Reference => Integer::from(std::i64::MAX),
        }
    }

    /// Returns the minimum value for this type.
    pub fn min_value(&self) -> Integer {
        use self::ExpressionType::*;
        match self {
            Bool | Char => Integer::from(0),
            I8 => Integer::from(std::i8::MIN),
            I16 => Integer::from(std::i16::MIN),
            I32 => Integer::from(std::i32::MIN),
            I64 | Reference => Integer::from(std::i64::MIN),
        }
    }

    /// Reduces an arbitrary integer into this domain with two's complement wraparound.
    pub fn wrap_integer(&self, value: &Integer) -> Integer {
        use self::ExpressionType::*;
        match self {
            Bool => Integer::from(*value != 0),
            Char => Integer::from(OverflowingCast::<u16>::overflowing_cast(value).0),
            I8 => Integer::from(OverflowingCast::<i8>::overflowing_cast(value).0),
            I16 => Integer::from(OverflowingCast::<i16>::overflowing_cast(value).0),
            I32 => Integer::from(OverflowingCast::<i32>::overflowing_cast(value).0),
            I64 | Reference => Integer::from(OverflowingCast::<i64>::overflowing_cast(value).0),
        }
    }

    /// Unary numeric promotion.
    pub fn unary_promoted(&self) -> ExpressionType {
        use self::ExpressionType::*;
        match self {
            Char | I8 | I16 => I32,
            other => *other,
        }
    }

    /// Binary numeric promotion of two integer operand types.
    pub fn binary_promotion(left: ExpressionType, right: ExpressionType) -> ExpressionType {
        if left == ExpressionType::I64 || right == ExpressionType::I64 {
            ExpressionType::I64
        } else {
            ExpressionType::I32
        }
    }

    /// True if every value of this domain is also a value of `target`.
    pub fn fits_in(&self, target: ExpressionType) -> bool {
        if !self.is_integer() || !target.is_integer() {
            return self == &target;
        }
        self.min_value() >= target.min_value() && self.max_value() <= target.max_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_integer() {
        let big = Integer::from(32768);
        assert_eq!(ExpressionType::I16.wrap_integer(&big), -32768);
        assert_eq!(ExpressionType::Char.wrap_integer(&Integer::from(-1)), 65535);
        assert_eq!(ExpressionType::I8.wrap_integer(&Integer::from(200)), -56);
        assert_eq!(ExpressionType::I32.wrap_integer(&Integer::from(65536)), 65536);
    }

    #[test]
    fn test_promotion() {
        use ExpressionType::*;
        assert_eq!(I16.unary_promoted(), I32);
        assert_eq!(Char.unary_promoted(), I32);
        assert_eq!(ExpressionType::binary_promotion(I16, I8), I32);
        assert_eq!(ExpressionType::binary_promotion(I32, I64), I64);
    }

    #[test]
    fn test_fits_in() {
        use ExpressionType::*;
        assert!(I8.fits_in(I16));
        assert!(Char.fits_in(I32));
        assert!(!Char.fits_in(I16));
        assert!(!I8.fits_in(Char));
        assert!(!I64.fits_in(I32));
    }

    #[test]
    fn test_comparison_operator_algebra() {
        use ComparisonOperator::*;
        for op in &[Eq, Ne, Lt, Le, Gt, Ge] {
            assert_eq!(op.negate().negate(), *op);
            assert_eq!(op.swap().swap(), *op);
        }
        assert_eq!(Lt.negate(), Ge);
        assert_eq!(Le.swap(), Ge);
    }
}
