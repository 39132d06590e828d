use crate::analysis::memory::constant_value::ConstantValue;
use crate::analysis::memory::expression::{
    BinaryOperator, ComparisonOperator, Expression, ExpressionType, UnaryOperator,
};
use crate::analysis::memory::symbolic_value::SymbolicValue;
use rug::Integer;
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::ops::{Add, Mul, Neg, Sub};
use std::rc::Rc;

/// Represents a linear expression with integer coefficients
/// E.g. 3*a+4*b-5*c+6, where `cof_map` stores {(a,3), (b,4), (c,-5)}, and `cst` stores 6.
/// The "variables" are arbitrary subterms (atoms) that are not themselves linear.
#[derive(PartialEq, Eq, Clone)]
pub struct LinearExpression {
    cof_map: BTreeMap<Rc<SymbolicValue>, Integer>,
    cst: Integer,
}

impl Default for LinearExpression {
    /// The default value of a linear expression is simply zero
    fn default() -> Self {
        Self {
            cof_map: BTreeMap::new(),
            cst: Integer::from(0),
        }
    }
}

impl LinearExpression {
    /// Decomposes a value of domain `ty` into a sum of scaled atoms plus a constant.
    /// Only additions, subtractions, negations and multiplications by a constant
    /// computed in `ty` itself are looked through.
    pub fn from_value(value: &Rc<SymbolicValue>, ty: ExpressionType) -> LinearExpression {
        match &value.expression {
            Expression::CompileTimeConstant {
                value: ConstantValue::Int(n),
                ..
            } => LinearExpression::from(n.clone()),
            Expression::Binary {
                operator,
                left,
                right,
                result_type,
            } if *result_type == ty => match operator {
                BinaryOperator::Add => {
                    Self::from_value(left, ty) + Self::from_value(right, ty)
                }
                BinaryOperator::Sub => {
                    Self::from_value(left, ty) - Self::from_value(right, ty)
                }
                BinaryOperator::Mul => {
                    let l = Self::from_value(left, ty);
                    let r = Self::from_value(right, ty);
                    if l.is_constant() {
                        r * l.cst
                    } else if r.is_constant() {
                        l * r.cst
                    } else {
                        Self::atom(value)
                    }
                }
                _ => Self::atom(value),
            },
            Expression::Unary {
                operator: UnaryOperator::Neg,
                operand,
                result_type,
            } if *result_type == ty => -Self::from_value(operand, ty),
            _ => Self::atom(value),
        }
    }

    pub fn atom(value: &Rc<SymbolicValue>) -> LinearExpression {
        let mut result = LinearExpression::default();
        result.add_term(value.clone(), Integer::from(1));
        result
    }

    /// Test if the expression only has the constant term
    pub fn is_constant(&self) -> bool {
        self.cof_map.is_empty()
    }

    /// Returns the constant term
    pub fn constant(&self) -> Integer {
        self.cst.clone()
    }

    /// Number of atoms with a non zero coefficient
    pub fn atom_count(&self) -> usize {
        self.cof_map.len()
    }

    /// Get the coefficient of atom `var`, zero if it does not occur.
    pub fn get_coff(&self, var: &Rc<SymbolicValue>) -> Integer {
        if let Some(coff) = self.cof_map.get(var) {
            coff.clone()
        } else {
            Integer::from(0)
        }
    }

    /// Add term `n*x` to the linear expression
    pub fn add_term(&mut self, x: Rc<SymbolicValue>, n: Integer) {
        if let Some(num) = self.cof_map.get(&x) {
            let r = num.clone() + n;
            if r == 0 {
                self.cof_map.remove(&x);
            } else {
                self.cof_map.insert(x, r);
            }
        } else if n != 0 {
            self.cof_map.insert(x, n);
        }
    }

    /// Reduces coefficients and the constant into the domain of `ty`; terms whose
    /// coefficient becomes zero disappear. Valid because wrapping arithmetic is a ring.
    pub fn wrap(self, ty: ExpressionType) -> LinearExpression {
        let mut result = LinearExpression {
            cof_map: BTreeMap::new(),
            cst: ty.wrap_integer(&self.cst),
        };
        for (var, coff) in self {
            result.add_term(var, ty.wrap_integer(&coff));
        }
        result
    }

    /// Returns a copy with the term of `var` removed.
    pub fn without(&self, var: &Rc<SymbolicValue>) -> LinearExpression {
        let mut result = self.clone();
        result.cof_map.remove(var);
        result
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Rc<SymbolicValue>, &Integer)> {
        self.cof_map.iter()
    }
}

impl From<Integer> for LinearExpression {
    fn from(src: Integer) -> Self {
        LinearExpression::default() + src
    }
}

impl Add<Self> for LinearExpression {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let mut res = Self {
            cof_map: self.cof_map,
            cst: self.cst + &other.cst,
        };
        for (var, coff) in other {
            res.add_term(var, coff);
        }
        res
    }
}

impl Add<Integer> for LinearExpression {
    type Output = Self;

    fn add(self, other: Integer) -> Self {
        Self {
            cof_map: self.cof_map,
            cst: self.cst + other,
        }
    }
}

impl Sub<Self> for LinearExpression {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        let mut res = Self {
            cof_map: self.cof_map,
            cst: self.cst - &other.cst,
        };
        for (var, coff) in other {
            res.add_term(var, -coff);
        }
        res
    }
}

impl Mul<Integer> for LinearExpression {
    type Output = Self;

    fn mul(self, other: Integer) -> Self {
        if other == 0 {
            Self::default()
        } else {
            let mut cof_map = BTreeMap::new();
            for (var, coff) in &self {
                let r = coff.clone() * other.clone();
                if r != 0 {
                    cof_map.insert(var.clone(), r);
                }
            }
            Self {
                cof_map,
                cst: other * &self.cst,
            }
        }
    }
}

impl Neg for LinearExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self * Integer::from(-1)
    }
}

impl IntoIterator for LinearExpression {
    type Item = (Rc<SymbolicValue>, Integer);
    type IntoIter = std::collections::btree_map::IntoIter<Rc<SymbolicValue>, Integer>;
    fn into_iter(self) -> Self::IntoIter {
        self.cof_map.into_iter()
    }
}

impl<'a> IntoIterator for &'a LinearExpression {
    type Item = (&'a Rc<SymbolicValue>, &'a Integer);
    type IntoIter = std::collections::btree_map::Iter<'a, Rc<SymbolicValue>, Integer>;
    fn into_iter(self) -> Self::IntoIter {
        self.cof_map.iter()
    }
}

impl Debug for LinearExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::new();
        for (i, (v, n)) in self.cof_map.iter().enumerate() {
            if *n > 0 && i != 0 {
                res.push('+');
            }
            if *n == -1 {
                res.push('-');
            } else if *n != 1 {
                res.push_str(format!("{}*", n).as_str());
            }
            res.push_str(format!("({:?})", v).as_str());
        }
        if self.cst > 0 && !self.cof_map.is_empty() {
            res.push('+');
        }
        if self.cst != 0 || self.cof_map.is_empty() {
            res.push_str(format!("{}", self.cst).as_str());
        }
        write!(f, "{}", res)
    }
}

/// A linear constraint `exp op 0` over mathematical integers.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct LinearConstraint {
    pub expression: LinearExpression,
    pub operator: ComparisonOperator,
}

impl LinearConstraint {
    /// Builds `left op right` as `left - right op 0`.
    pub fn new(
        left: LinearExpression,
        operator: ComparisonOperator,
        right: LinearExpression,
    ) -> Self {
        LinearConstraint {
            expression: left - right,
            operator,
        }
    }

    pub fn negate(&self) -> Self {
        LinearConstraint {
            expression: self.expression.clone(),
            operator: self.operator.negate(),
        }
    }

    /// For a constraint without atoms, its truth value.
    pub fn is_tautology(&self) -> Option<bool> {
        if !self.expression.is_constant() {
            return None;
        }
        let c = self.expression.constant();
        Some(match self.operator {
            ComparisonOperator::Eq => c == 0,
            ComparisonOperator::Ne => c != 0,
            ComparisonOperator::Lt => c < 0,
            ComparisonOperator::Le => c <= 0,
            ComparisonOperator::Gt => c > 0,
            ComparisonOperator::Ge => c >= 0,
        })
    }
}
