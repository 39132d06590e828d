// This file is adapted from MIRAI (https://github.com/facebookexperimental/MIRAI)
// Original author: Herman Venter <hermanv@fb.com>
// Original copyright header:

// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use super::expression::ExpressionType;

use rug::Integer;
use std::fmt::{Debug, Formatter, Result};

/// Represent a compile time constant
#[derive(Clone, Eq, PartialOrd, PartialEq, Hash, Ord)]
pub enum ConstantValue {
    /// The impossible constant. Use this as the result of a partial transfer function.
    Bottom,
    /// The constant that may be any possible value
    Top,
    /// The null reference
    Null,
    /// Integer, booleans are 0 and 1
    Int(Integer),
}

impl Debug for ConstantValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ConstantValue::Bottom => f.write_str("BOTTOM"),
            ConstantValue::Top => f.write_str("TOP"),
            ConstantValue::Null => f.write_str("null"),
            ConstantValue::Int(val) => val.fmt(f),
        }
    }
}

impl ConstantValue {
    pub fn is_top(&self) -> bool {
        matches!(self, ConstantValue::Top)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, ConstantValue::Bottom)
    }

    pub fn try_get_integer(&self) -> Option<Integer> {
        match self {
            ConstantValue::Int(val) => Some(val.clone()),
            _ => None,
        }
    }

    /// The Boolean value of this constant, if it is a Boolean constant, otherwise None.
    pub fn as_bool_if_known(&self) -> Option<bool> {
        match &self {
            ConstantValue::Int(val) if *val == 1 => Some(true),
            ConstantValue::Int(val) if *val == 0 => Some(false),
            _ => None,
        }
    }
}

impl From<Integer> for ConstantValue {
    fn from(i: Integer) -> ConstantValue {
        ConstantValue::Int(i)
    }
}

impl From<i64> for ConstantValue {
    fn from(i: i64) -> ConstantValue {
        ConstantValue::Int(Integer::from(i))
    }
}

impl From<bool> for ConstantValue {
    fn from(b: bool) -> ConstantValue {
        ConstantValue::Int(Integer::from(b))
    }
}

/// Transfer functions. Results are in unbounded precision, callers wrap them with `cast`.
impl ConstantValue {
    fn int_binary(&self, other: &Self, op: impl FnOnce(&Integer, &Integer) -> Option<Integer>) -> Self {
        match (self, other) {
            (ConstantValue::Int(val1), ConstantValue::Int(val2)) => match op(val1, val2) {
                Some(result) => ConstantValue::Int(result),
                None => ConstantValue::Bottom,
            },
            (ConstantValue::Top, _) | (_, ConstantValue::Top) => ConstantValue::Top,
            _ => ConstantValue::Bottom,
        }
    }

    /// Returns a constant that is "self + other".
    pub fn add(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(a.clone() + b.clone()))
    }

    /// Returns a constant that is "self & other".
    pub fn bit_and(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(a.clone() & b.clone()))
    }

    /// Returns a constant that is "!self" where self is an integer value.
    pub fn bit_not(&self) -> Self {
        match self {
            ConstantValue::Int(val) => ConstantValue::Int(-val.clone() - 1),
            ConstantValue::Top => ConstantValue::Top,
            _ => ConstantValue::Bottom,
        }
    }

    /// Returns a constant that is "self | other".
    pub fn bit_or(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(a.clone() | b.clone()))
    }

    /// Returns a constant that is "self ^ other".
    pub fn bit_xor(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(a.clone() ^ b.clone()))
    }

    /// Returns a constant that is "(target_type) self", wrapping around on overflow.
    pub fn cast(&self, target_type: &ExpressionType) -> Self {
        match self {
            ConstantValue::Int(val) if target_type.is_primitive() => {
                ConstantValue::Int(target_type.wrap_integer(val))
            }
            _ => self.clone(),
        }
    }

    /// Returns a constant that is "self / other", truncated toward zero.
    /// Division by zero has no constant result.
    pub fn div(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| {
            if *b == 0 {
                None
            } else {
                Some(a.clone() / b.clone())
            }
        })
    }

    /// Returns a constant that is "self == other".
    pub fn equals(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantValue::Int(val1), ConstantValue::Int(val2)) => (val1 == val2).into(),
            (ConstantValue::Null, ConstantValue::Null) => true.into(),
            (ConstantValue::Top, _) | (_, ConstantValue::Top) => ConstantValue::Top,
            _ => ConstantValue::Bottom,
        }
    }

    /// Returns a constant that is "self >= other".
    pub fn greater_or_equal(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(Integer::from(a >= b)))
    }

    /// Returns a constant that is "self > other".
    pub fn greater_than(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(Integer::from(a > b)))
    }

    /// Returns a constant that is "self <= other".
    pub fn less_or_equal(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(Integer::from(a <= b)))
    }

    /// Returns a constant that is "self < other".
    pub fn less_than(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(Integer::from(a < b)))
    }

    /// Returns a constant that is "self * other".
    pub fn mul(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(a.clone() * b.clone()))
    }

    /// Returns a constant that is "-self".
    pub fn neg(&self) -> Self {
        match self {
            ConstantValue::Int(val) => ConstantValue::Int(-val.clone()),
            ConstantValue::Top => ConstantValue::Top,
            _ => ConstantValue::Bottom,
        }
    }

    /// Returns a constant that is "self != other".
    pub fn not_equals(&self, other: &Self) -> Self {
        self.equals(other).logical_not()
    }

    /// Returns a constant that is "!self" where self is a bool.
    pub fn logical_not(&self) -> Self {
        match self {
            ConstantValue::Int(val) => {
                if *val == 1 {
                    ConstantValue::Int(Integer::from(0))
                } else if *val == 0 {
                    ConstantValue::Int(Integer::from(1))
                } else {
                    ConstantValue::Bottom
                }
            }
            ConstantValue::Top => ConstantValue::Top,
            _ => ConstantValue::Bottom,
        }
    }

    /// Returns a constant that is "self % other", with the sign of the dividend.
    pub fn rem(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| {
            if *b == 0 {
                None
            } else {
                Some(a.clone() % b.clone())
            }
        })
    }

    /// The shift distance masked to the width of the shifted domain.
    fn shift_distance(other: &Self, result_type: &ExpressionType) -> Option<u32> {
        match other {
            ConstantValue::Int(val) => {
                let mask = Integer::from(result_type.bit_length() - 1);
                (val.clone() & mask).to_u32()
            }
            _ => None,
        }
    }

    /// Returns a constant that is "self << other".
    pub fn shl(&self, other: &Self, result_type: &ExpressionType) -> Self {
        match (self, Self::shift_distance(other, result_type)) {
            (ConstantValue::Int(val1), Some(val2)) => ConstantValue::Int(val1.clone() << val2),
            (ConstantValue::Top, _) => ConstantValue::Top,
            _ => ConstantValue::Bottom,
        }
    }

    /// Returns a constant that is "self >> other", rounding toward negative infinity.
    pub fn shr(&self, other: &Self, result_type: &ExpressionType) -> Self {
        match (self, Self::shift_distance(other, result_type)) {
            (ConstantValue::Int(val1), Some(val2)) => ConstantValue::Int(val1.clone() >> val2),
            (ConstantValue::Top, _) => ConstantValue::Top,
            _ => ConstantValue::Bottom,
        }
    }

    /// Returns a constant that is "self >>> other": the operand is shifted as an unsigned value.
    pub fn ushr(&self, other: &Self, result_type: &ExpressionType) -> Self {
        match (self, Self::shift_distance(other, result_type)) {
            (ConstantValue::Int(val1), Some(0)) => ConstantValue::Int(val1.clone()),
            (ConstantValue::Int(val1), Some(val2)) => {
                let modulus = Integer::from(1) << result_type.bit_length();
                let unsigned = if *val1 < 0 {
                    val1.clone() + modulus
                } else {
                    val1.clone()
                };
                ConstantValue::Int(unsigned >> val2)
            }
            (ConstantValue::Top, _) => ConstantValue::Top,
            _ => ConstantValue::Bottom,
        }
    }

    /// Returns a constant that is "self - other".
    pub fn sub(&self, other: &Self) -> Self {
        self.int_binary(other, |a, b| Some(a.clone() - b.clone()))
    }
}
