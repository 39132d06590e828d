use crate::analysis::memory::expression::ExpressionType;
use crate::analysis::numerical::lattice::LatticeTrait;
use rug::Integer;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Either `∞`, `-∞`, or an arbitrary precision integer
#[derive(Clone, Eq, PartialEq, Hash)]
pub enum Bound {
    INF,          // Positive infinity
    Int(Integer), // Arbitrary precision integer
    NINF,         // Negative infinity
}

use Bound::*;

impl Bound {
    pub fn is_finite(&self) -> bool {
        matches!(self, Int(_))
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Int(n) => Some(n),
            _ => None,
        }
    }

    fn sign(&self) -> Ordering {
        match self {
            INF => Ordering::Greater,
            NINF => Ordering::Less,
            Int(n) => n.cmp0(),
        }
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            INF => String::from("∞"),
            NINF => String::from("-∞"),
            Int(n) => n.to_string(),
        };
        write!(f, "{}", value)
    }
}

impl Ord for Bound {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            Ordering::Equal
        } else {
            match (self, other) {
                (INF, _) | (_, NINF) => Ordering::Greater,
                (NINF, _) | (_, INF) => Ordering::Less,
                (Int(a), Int(b)) => a.cmp(b),
            }
        }
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Integer> for Bound {
    fn from(n: Integer) -> Self {
        Bound::Int(n)
    }
}

impl From<i128> for Bound {
    fn from(n: i128) -> Self {
        Bound::Int(Integer::from(n))
    }
}

impl From<i64> for Bound {
    fn from(n: i64) -> Self {
        Bound::Int(Integer::from(n))
    }
}

impl Add for Bound {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        match (self, other) {
            (INF, _) | (_, INF) => Self::INF,
            (NINF, _) | (_, NINF) => Self::NINF,
            (Int(a), Int(b)) => Self::Int(a + b),
        }
    }
}

impl Sub for Bound {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        match (self, other) {
            (INF, _) | (_, NINF) => Self::INF,
            (NINF, _) | (_, INF) => Self::NINF,
            (Int(a), Int(b)) => Self::Int(a - b),
        }
    }
}

impl Neg for Bound {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            INF => NINF,
            NINF => INF,
            Int(n) => Int(-n),
        }
    }
}

impl Mul for Bound {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let sign = match (self.sign(), rhs.sign()) {
            (Ordering::Equal, _) | (_, Ordering::Equal) => Ordering::Equal,
            (a, b) if a == b => Ordering::Greater,
            _ => Ordering::Less,
        };
        match (self, rhs) {
            (Int(a), Int(b)) => Self::Int(a * b),
            _ => match sign {
                Ordering::Greater => INF,
                Ordering::Less => NINF,
                Ordering::Equal => Int(Integer::from(0)),
            },
        }
    }
}

/// Truncating division of two bounds, the divisor is never zero.
fn div_bound(lhs: &Bound, rhs: &Bound) -> Bound {
    match (lhs, rhs) {
        (Int(a), Int(b)) => Int(a.clone() / b.clone()),
        (_, INF) | (_, NINF) => Int(Integer::from(0)),
        (INF, _) | (NINF, _) => {
            if lhs.sign() == rhs.sign() {
                INF
            } else {
                NINF
            }
        }
    }
}

/// Abstract value that represents an interval
/// When `low` <= `high`, it is a normal interval `[low, high]`
/// When `low` == `NINF` && `high` == `INF`, it is `[-∞, ∞]`
/// When `low` == `INF` && `high` == `NINF`, it is `⊥`
///
/// `may_wrap` records that the computation producing this interval may have
/// wrapped around the bounds of its fixed-width domain.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub high: Bound,
    pub low: Bound,
    pub may_wrap: bool,
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "⊥")
        } else if self.may_wrap {
            write!(f, "[{:?}, {:?}]~", self.low, self.high)
        } else {
            write!(f, "[{:?}, {:?}]", self.low, self.high)
        }
    }
}

impl Interval {
    const INF: Bound = Bound::INF;
    const NINF: Bound = Bound::NINF;

    pub fn new(low: Bound, high: Bound) -> Self {
        Interval {
            high,
            low,
            may_wrap: false,
        }
    }

    pub fn singleton(value: Integer) -> Self {
        Interval::new(Bound::Int(value.clone()), Bound::Int(value))
    }

    pub fn from_i64(low: i64, high: i64) -> Self {
        Interval::new(Bound::from(low), Bound::from(high))
    }

    /// The full range of the domain of `ty`.
    pub fn full(ty: ExpressionType) -> Self {
        if ty.is_primitive() {
            Interval::new(Bound::Int(ty.min_value()), Bound::Int(ty.max_value()))
        } else {
            Interval::top()
        }
    }

    pub fn with_wrap(mut self, may_wrap: bool) -> Self {
        self.may_wrap = self.may_wrap || may_wrap;
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.low.is_finite() && self.low == self.high
    }

    pub fn contains(&self, n: &Integer) -> bool {
        let b = Bound::Int(n.clone());
        self.low <= b && b <= self.high
    }

    pub fn contains_zero(&self) -> bool {
        self.contains(&Integer::from(0))
    }

    pub fn is_subset_of(&self, other: &Interval) -> bool {
        self.is_bottom() || (other.low <= self.low && self.high <= other.high)
    }

    pub fn is_non_negative(&self) -> bool {
        self.low >= Bound::from(0i64)
    }

    /// Greatest lower bound.
    pub fn meet(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        let low = std::cmp::max(self.low.clone(), other.low.clone());
        let high = std::cmp::min(self.high.clone(), other.high.clone());
        if high < low {
            Interval::bottom()
        } else {
            Interval {
                high,
                low,
                may_wrap: self.may_wrap && other.may_wrap,
            }
        }
    }

    /// Reduce an interval computed in unbounded precision into the domain of `ty`.
    /// Singletons and intervals that do not straddle a wrap boundary stay exact;
    /// otherwise the result is the whole domain, flagged as possibly wrapped.
    pub fn wrap_to(&self, ty: ExpressionType) -> Interval {
        if self.is_bottom() || !ty.is_integer() {
            return self.clone();
        }
        let full = Interval::full(ty);
        if self.is_subset_of(&full) {
            return self.clone();
        }
        let (low, high) = match (&self.low, &self.high) {
            (Int(low), Int(high)) => (low, high),
            _ => return full.with_wrap(true),
        };
        let modulus = Integer::from(1) << ty.bit_length();
        let span = high.clone() - low.clone();
        if span >= modulus {
            return full.with_wrap(true);
        }
        let wrapped_low = ty.wrap_integer(low);
        let wrapped_high = ty.wrap_integer(high);
        if wrapped_low <= wrapped_high {
            Interval::new(Bound::Int(wrapped_low), Bound::Int(wrapped_high)).with_wrap(true)
        } else {
            full.with_wrap(true)
        }
    }

    /// Returns a boolean interval built from a three valued comparison result.
    pub fn from_option_bool(value: Option<bool>) -> Interval {
        match value {
            Some(b) => Interval::from(b),
            None => Interval::from_i64(0, 1),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        bool::try_from(self.clone()).ok()
    }

    pub fn less_than(&self, other: &Interval) -> Option<bool> {
        if self.is_bottom() || other.is_bottom() {
            None
        } else if self.high < other.low {
            Some(true)
        } else if other.high <= self.low {
            Some(false)
        } else {
            None
        }
    }

    pub fn less_equal(&self, other: &Interval) -> Option<bool> {
        if self.is_bottom() || other.is_bottom() {
            None
        } else if self.high <= other.low {
            Some(true)
        } else if other.high < self.low {
            Some(false)
        } else {
            None
        }
    }

    pub fn greater_equal(&self, other: &Interval) -> Option<bool> {
        other.less_equal(self)
    }

    pub fn greater_than(&self, other: &Interval) -> Option<bool> {
        other.less_than(self)
    }

    pub fn equal_to(&self, other: &Interval) -> Option<bool> {
        if let (Ok(v1), Ok(v2)) = (Integer::try_from(self), Integer::try_from(other)) {
            return Some(v1 == v2);
        }
        if self.meet(other).is_bottom() {
            return Some(false);
        }
        None
    }

    pub fn not_equal_to(&self, other: &Interval) -> Option<bool> {
        self.equal_to(other).map(|b| !b)
    }

    fn is_zero(&self) -> bool {
        self.low == Bound::Int(Integer::from(0)) && self.high == Bound::Int(Integer::from(0))
    }

    fn all_ones(&self) -> bool {
        self.low == Bound::Int(Integer::from(-1)) && self.high == Bound::Int(Integer::from(-1))
    }

    fn corners(&self, rhs: &Interval, op: fn(Bound, Bound) -> Bound) -> Interval {
        let candidates = [
            op(self.low.clone(), rhs.low.clone()),
            op(self.low.clone(), rhs.high.clone()),
            op(self.high.clone(), rhs.low.clone()),
            op(self.high.clone(), rhs.high.clone()),
        ];
        let low = candidates.iter().min().cloned().unwrap_or(NINF);
        let high = candidates.iter().max().cloned().unwrap_or(INF);
        Interval::new(low, high).with_wrap(self.may_wrap || rhs.may_wrap)
    }

    /// Square of an interval, tighter than `self * self` when it straddles zero.
    pub fn square(&self) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        let product = self.clone() * self.clone();
        if self.contains_zero() {
            Interval::new(Bound::from(0i64), product.high).with_wrap(self.may_wrap)
        } else {
            product
        }
    }

    /// Splits a divisor into its strictly negative and strictly positive parts.
    fn split_at_zero(&self) -> (Option<Interval>, Option<Interval>) {
        let negative = self.meet(&Interval::new(NINF, Bound::from(-1i64)));
        let positive = self.meet(&Interval::new(Bound::from(1i64), INF));
        (
            if negative.is_bottom() { None } else { Some(negative) },
            if positive.is_bottom() { None } else { Some(positive) },
        )
    }

    /// Truncating division in unbounded precision.
    /// The flag is set when the divisor may be zero; the interval covers only the defined results.
    pub fn div_trunc(&self, rhs: &Interval) -> (Interval, bool) {
        if self.is_bottom() || rhs.is_bottom() {
            return (Interval::bottom(), false);
        }
        let divides_by_zero = rhs.contains_zero();
        let (negative, positive) = rhs.split_at_zero();
        let result = [negative, positive]
            .iter()
            .flatten()
            .map(|divisor| self.corners(divisor, |a, b| div_bound(&a, &b)))
            .fold(Interval::bottom(), |acc, i| acc.lub(&i));
        (result, divides_by_zero)
    }

    /// Truncating remainder: the result has the sign of the dividend and a magnitude
    /// smaller than the largest divisor magnitude.
    pub fn rem_trunc(&self, rhs: &Interval) -> (Interval, bool) {
        if self.is_bottom() || rhs.is_bottom() {
            return (Interval::bottom(), false);
        }
        let divides_by_zero = rhs.contains_zero();
        if let (Ok(a), Ok(b)) = (Integer::try_from(self), Integer::try_from(rhs)) {
            if b == 0 {
                return (Interval::bottom(), true);
            }
            return (Interval::singleton(a % b), false);
        }
        let (negative, positive) = rhs.split_at_zero();
        if negative.is_none() && positive.is_none() {
            return (Interval::bottom(), divides_by_zero);
        }
        // smallest and largest divisor magnitudes
        let magnitudes = [negative.map(|i| (-i.high, -i.low)), positive.map(|i| (i.low, i.high))];
        let min_magnitude = magnitudes.iter().flatten().map(|m| m.0.clone()).min();
        let max_magnitude = magnitudes.iter().flatten().map(|m| m.1.clone()).max();
        let (min_magnitude, max_magnitude) = match (min_magnitude, max_magnitude) {
            (Some(min), Some(max)) => (min, max),
            _ => return (Interval::top(), divides_by_zero),
        };
        // |dividend| < |divisor| leaves the dividend unchanged
        let dividend_magnitude = std::cmp::max(-self.low.clone(), self.high.clone());
        if dividend_magnitude < min_magnitude {
            return (self.clone(), divides_by_zero);
        }
        let limit = max_magnitude - Bound::from(1i64);
        let zero = Bound::from(0i64);
        let low = if self.low >= zero {
            zero.clone()
        } else {
            std::cmp::max(self.low.clone(), -limit.clone())
        };
        let high = if self.high <= zero {
            zero
        } else {
            std::cmp::min(self.high.clone(), limit)
        };
        (Interval::new(low, high).with_wrap(self.may_wrap), divides_by_zero)
    }

    /// Bitwise complement, `~x == -x - 1`, never leaves the domain.
    pub fn bit_not(&self) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        Interval::new(
            -self.high.clone() - Bound::from(1i64),
            -self.low.clone() - Bound::from(1i64),
        )
        .with_wrap(self.may_wrap)
    }

    fn bit_width_mask(&self, other: &Interval) -> Option<Integer> {
        let max = std::cmp::max(self.high.as_integer()?, other.high.as_integer()?).clone();
        let bits = max.significant_bits();
        Some((Integer::from(1) << bits) - 1)
    }

    pub fn bit_and(&self, rhs: &Interval, ty: ExpressionType) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            Self::bottom()
        } else if self.is_zero() || rhs.is_zero() {
            Self::singleton(Integer::from(0))
        } else if self.all_ones() {
            rhs.clone()
        } else if rhs.all_ones() {
            self.clone()
        } else if let (Ok(lval), Ok(rval)) = (Integer::try_from(self), Integer::try_from(rhs)) {
            Self::singleton(lval & rval)
        } else if self.is_non_negative() && rhs.is_non_negative() {
            Interval::new(Bound::from(0i64), std::cmp::min(self.high.clone(), rhs.high.clone()))
        } else if self.is_non_negative() {
            Interval::new(Bound::from(0i64), self.high.clone())
        } else if rhs.is_non_negative() {
            Interval::new(Bound::from(0i64), rhs.high.clone())
        } else {
            Self::full(ty)
        }
    }

    pub fn bit_or(&self, rhs: &Interval, ty: ExpressionType) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            Self::bottom()
        } else if self.all_ones() || rhs.all_ones() {
            Self::singleton(Integer::from(-1))
        } else if self.is_zero() {
            rhs.clone()
        } else if rhs.is_zero() {
            self.clone()
        } else if let (Ok(lval), Ok(rval)) = (Integer::try_from(self), Integer::try_from(rhs)) {
            Self::singleton(lval | rval)
        } else if self.is_non_negative() && rhs.is_non_negative() {
            match self.bit_width_mask(rhs) {
                Some(mask) => Interval::new(
                    std::cmp::max(self.low.clone(), rhs.low.clone()),
                    Bound::Int(mask),
                ),
                None => Self::full(ty),
            }
        } else {
            Self::full(ty)
        }
    }

    pub fn bit_xor(&self, rhs: &Interval, ty: ExpressionType) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            Self::bottom()
        } else if self.is_zero() {
            rhs.clone()
        } else if rhs.is_zero() {
            self.clone()
        } else if let (Ok(lval), Ok(rval)) = (Integer::try_from(self), Integer::try_from(rhs)) {
            Self::singleton(lval ^ rval)
        } else if self.is_non_negative() && rhs.is_non_negative() {
            match self.bit_width_mask(rhs) {
                Some(mask) => Interval::new(Bound::from(0i64), Bound::Int(mask)),
                None => Self::full(ty),
            }
        } else {
            Self::full(ty)
        }
    }

    /// Shift distances are masked to the width of the promoted left operand.
    fn shift_distances(distance: &Interval, ty: ExpressionType) -> Vec<u32> {
        let mask = ty.bit_length() - 1;
        match (distance.low.as_integer(), distance.high.as_integer()) {
            (Some(low), Some(high)) if high.clone() - low.clone() <= mask => {
                let mut result: Vec<u32> = Vec::new();
                let mut current = low.clone();
                while current <= *high {
                    let masked = current.clone() & Integer::from(mask);
                    if let Some(d) = masked.to_u32() {
                        result.push(d);
                    }
                    current += 1;
                }
                result.sort_unstable();
                result.dedup();
                result
            }
            _ => (0..=mask).collect(),
        }
    }

    pub fn shl(&self, distance: &Interval, ty: ExpressionType) -> Interval {
        if self.is_bottom() || distance.is_bottom() {
            return Self::bottom();
        }
        Self::shift_distances(distance, ty)
            .into_iter()
            .map(|d| {
                let factor = Interval::singleton(Integer::from(1) << d);
                (self.clone() * factor).wrap_to(ty)
            })
            .fold(Interval::bottom(), |acc, i| acc.lub(&i))
    }

    pub fn shr(&self, distance: &Interval, ty: ExpressionType) -> Interval {
        if self.is_bottom() || distance.is_bottom() {
            return Self::bottom();
        }
        let full = Interval::full(ty);
        let operand = self.meet(&full);
        Self::shift_distances(distance, ty)
            .into_iter()
            .map(|d| {
                let shift = |b: Bound| match b {
                    Int(n) => Int(n >> d),
                    other => other,
                };
                Interval::new(shift(operand.low.clone()), shift(operand.high.clone()))
            })
            .fold(Interval::bottom(), |acc, i| acc.lub(&i))
            .with_wrap(self.may_wrap)
    }

    /// Logical right shift: negative operands are reinterpreted as unsigned first.
    pub fn ushr(&self, distance: &Interval, ty: ExpressionType) -> Interval {
        if self.is_bottom() || distance.is_bottom() {
            return Self::bottom();
        }
        let full = Interval::full(ty);
        let operand = self.meet(&full);
        let modulus = Integer::from(1) << ty.bit_length();
        let negative_part = operand.meet(&Interval::new(NINF, Bound::from(-1i64)));
        let non_negative_part = operand.meet(&Interval::new(Bound::from(0i64), INF));
        let mut result = Interval::bottom();
        for d in Self::shift_distances(distance, ty) {
            if !non_negative_part.is_bottom() {
                if let (Some(low), Some(high)) = (
                    non_negative_part.low.as_integer(),
                    non_negative_part.high.as_integer(),
                ) {
                    result = result.lub(&Interval::singleton(low.clone() >> d).lub(
                        &Interval::singleton(high.clone() >> d),
                    ));
                }
            }
            if !negative_part.is_bottom() {
                if let (Some(low), Some(high)) =
                    (negative_part.low.as_integer(), negative_part.high.as_integer())
                {
                    let part = if d == 0 {
                        Interval::singleton(low.clone()).lub(&Interval::singleton(high.clone()))
                    } else {
                        Interval::singleton((low.clone() + modulus.clone()) >> d).lub(
                            &Interval::singleton((high.clone() + modulus.clone()) >> d),
                        )
                    };
                    result = result.lub(&part);
                }
            }
        }
        result.with_wrap(self.may_wrap)
    }
}

impl LatticeTrait for Interval {
    fn top() -> Self {
        Interval::new(Self::NINF, Self::INF)
    }

    fn is_top(&self) -> bool {
        self.high == Self::INF && self.low == Self::NINF
    }

    fn bottom() -> Self {
        Interval::new(Self::INF, Self::NINF)
    }

    fn is_bottom(&self) -> bool {
        self.high < self.low
    }

    /// Interval hull
    fn lub(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Interval {
            high: std::cmp::max(self.high.clone(), other.high.clone()),
            low: std::cmp::min(self.low.clone(), other.low.clone()),
            may_wrap: self.may_wrap || other.may_wrap,
        }
    }

    /// Bounds that keep moving jump to infinity
    fn widening_with(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        let low = if other.low < self.low {
            NINF
        } else {
            self.low.clone()
        };
        let high = if other.high > self.high {
            INF
        } else {
            self.high.clone()
        };
        Interval::new(low, high).with_wrap(self.may_wrap || other.may_wrap)
    }

    fn glb(&self, other: &Self) -> Self {
        self.meet(other)
    }

    fn narrowing_with(&self, other: &Self) -> Self {
        if other.is_bottom() {
            return self.clone();
        }
        self.meet(other)
    }
}

// Inherent shortcuts so callers do not need the lattice trait in scope
impl Interval {
    pub fn top() -> Self {
        <Self as LatticeTrait>::top()
    }

    pub fn bottom() -> Self {
        <Self as LatticeTrait>::bottom()
    }

    pub fn is_top(&self) -> bool {
        <Self as LatticeTrait>::is_top(self)
    }

    pub fn is_bottom(&self) -> bool {
        <Self as LatticeTrait>::is_bottom(self)
    }

    pub fn lub(&self, other: &Self) -> Self {
        <Self as LatticeTrait>::lub(self, other)
    }
}

impl TryFrom<Interval> for Integer {
    type Error = &'static str;
    fn try_from(value: Interval) -> Result<Self, Self::Error> {
        Integer::try_from(&value)
    }
}

impl TryFrom<&Interval> for Integer {
    type Error = &'static str;
    fn try_from(value: &Interval) -> Result<Self, Self::Error> {
        if let (Bound::Int(high), Bound::Int(low)) = (&value.high, &value.low) {
            if high == low {
                return Ok(high.clone());
            }
        }
        Err("interval is not a integer")
    }
}

impl TryFrom<Interval> for bool {
    type Error = &'static str;
    fn try_from(value: Interval) -> Result<Self, Self::Error> {
        if value.high == Bound::Int(Integer::from(1)) && value.low == Bound::Int(Integer::from(1)) {
            Ok(true)
        } else if value.high == Bound::Int(Integer::from(0))
            && value.low == Bound::Int(Integer::from(0))
        {
            Ok(false)
        } else {
            Err("interval is not a bool")
        }
    }
}

impl From<bool> for Interval {
    fn from(b: bool) -> Self {
        Interval::singleton(Integer::from(b as i32))
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, other: Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        let may_wrap = self.may_wrap || other.may_wrap;
        let low = self.low + other.low;
        let high = self.high + other.high;
        Interval::new(low, high).with_wrap(may_wrap)
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, other: Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        let may_wrap = self.may_wrap || other.may_wrap;
        let low = self.low - other.high;
        let high = self.high - other.low;
        Interval::new(low, high).with_wrap(may_wrap)
    }
}

impl Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        if self.is_bottom() {
            return self;
        }
        let may_wrap = self.may_wrap;
        Interval::new(-self.high, -self.low).with_wrap(may_wrap)
    }
}

impl Mul for Interval {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        self.corners(&rhs, |a, b| a * b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(low: i64, high: i64) -> Interval {
        Interval::from_i64(low, high)
    }

    #[test]
    fn test_integer_cmp() {
        let ninf = Bound::NINF;
        let a = Bound::from(-1i64);
        let b = Bound::from(0i64);
        let c = Bound::from(1i64);
        let inf = Bound::INF;
        assert!(ninf < a && a < b && b < c && c < inf);
    }

    #[test]
    fn test_wrap_singleton_is_exact() {
        let sum = short(32767, 32767) + short(1, 1);
        let wrapped = sum.wrap_to(ExpressionType::I16);
        assert_eq!(Integer::try_from(&wrapped), Ok(Integer::from(-32768)));
        assert!(wrapped.may_wrap);

        let product = short(16384, 16384) * short(2, 2);
        let wrapped = product.wrap_to(ExpressionType::I16);
        assert_eq!(Integer::try_from(&wrapped), Ok(Integer::from(-32768)));
    }

    #[test]
    fn test_wrap_straddling_gives_full_domain() {
        let product = short(-300, 300) * short(-300, 300);
        let wrapped = product.wrap_to(ExpressionType::I16);
        assert_eq!(wrapped.low, Bound::from(-32768i64));
        assert_eq!(wrapped.high, Bound::from(32767i64));
        assert!(wrapped.may_wrap);
    }

    #[test]
    fn test_wrap_shifted_range_stays_tight() {
        // [32768, 32770] lies entirely above the short range and shifts down
        let wrapped = short(32768, 32770).wrap_to(ExpressionType::I16);
        assert_eq!(wrapped, short(-32768, -32766).with_wrap(true));
    }

    #[test]
    fn test_no_wrap_inside_domain() {
        let sum = short(-10, 10) + short(0, 5);
        let wrapped = sum.wrap_to(ExpressionType::I32);
        assert_eq!(wrapped, short(-10, 15));
        assert!(!wrapped.may_wrap);
    }

    #[test]
    fn test_division_by_zero_containing_divisor() {
        let (quotient, divides_by_zero) = short(10, 20).div_trunc(&short(-1, 2));
        assert!(divides_by_zero);
        assert_eq!(quotient, short(-20, 20));

        let (quotient, divides_by_zero) = short(10, 20).div_trunc(&short(0, 0));
        assert!(divides_by_zero);
        assert!(quotient.is_bottom());
    }

    #[test]
    fn test_truncating_division() {
        let (quotient, divides_by_zero) = short(-7, -7).div_trunc(&short(2, 2));
        assert!(!divides_by_zero);
        assert_eq!(quotient, short(-3, -3));
    }

    #[test]
    fn test_remainder_bounds() {
        let (rem, _) = short(-1000, 1000).rem_trunc(&short(100, 100));
        assert_eq!(rem, short(-99, 99));
        let (rem, _) = short(0, 1000).rem_trunc(&short(7, 10));
        assert_eq!(rem, short(0, 9));
        let (rem, _) = short(3, 5).rem_trunc(&short(10, 10));
        assert_eq!(rem, short(3, 5));
        let (rem, _) = short(-7, -7).rem_trunc(&short(3, 3));
        assert_eq!(rem, short(-1, -1));
    }

    #[test]
    fn test_square_straddling_zero() {
        let sq = short(-3, 2).square();
        assert_eq!(sq, short(0, 9));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(short(0, 2).less_than(&short(3, 4)), Some(true));
        assert_eq!(short(3, 4).less_than(&short(0, 3)), Some(false));
        assert_eq!(short(0, 5).less_than(&short(3, 4)), None);
        assert_eq!(short(0, 1).equal_to(&short(2, 3)), Some(false));
    }

    #[test]
    fn test_shifts() {
        let shifted = short(1, 1).shl(&short(31, 31), ExpressionType::I32);
        assert_eq!(shifted, short(i32::MIN as i64, i32::MIN as i64).with_wrap(true));
        let shifted = short(-8, -8).shr(&short(1, 1), ExpressionType::I32);
        assert_eq!(shifted, short(-4, -4));
        let shifted = short(-1, -1).ushr(&short(28, 28), ExpressionType::I32);
        assert_eq!(shifted, short(15, 15));
        // distance is masked to five bits
        let shifted = short(1, 1).shl(&short(33, 33), ExpressionType::I32);
        assert_eq!(shifted, short(2, 2));
    }

    #[test]
    fn test_bitwise_non_negative() {
        let and = short(0, 12).bit_and(&short(0, 5), ExpressionType::I32);
        assert_eq!(and, short(0, 5));
        let or = short(1, 12).bit_or(&short(0, 5), ExpressionType::I32);
        assert_eq!(or, short(1, 15));
        let not = short(0, 5).bit_not();
        assert_eq!(not, short(-6, -1));
    }

    #[test]
    fn test_widening() {
        let widened = short(0, 1).widening_with(&short(0, 2));
        assert_eq!(widened.low, Bound::from(0i64));
        assert_eq!(widened.high, Bound::INF);
    }
}
