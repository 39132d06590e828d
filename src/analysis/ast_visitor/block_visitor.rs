// This file is adapted from MIRAI (https://github.com/facebookexperimental/MIRAI)
// Original author: Herman Venter <hermanv@fb.com>
// Original copyright header:

// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::analysis::abstract_domain::AbstractDomain;
use crate::analysis::analysis_result::{AnalysisError, Result};
use crate::analysis::ast_visitor::body_visitor::{assignment_conversion, BodyVisitor};
use crate::analysis::ast_visitor::call_visitor::CallVisitor;
use crate::analysis::memory::expression::{BinaryOperator, ExpressionType};
use crate::analysis::memory::path::Path;
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use crate::ast::{BinaryOp, CallTarget, DeclaredType, Expr, IncDec, UnaryOp};
use std::fmt;
use std::rc::Rc;

/// Forks paired with the value an expression has in each of them.
pub type Evaluated = Vec<(AbstractDomain, Rc<SymbolicValue>)>;

/// Builds the symbolic values of expressions. Pure expressions are evaluated in place,
/// expressions with side effects may split the fork they are evaluated in.
pub struct BlockVisitor<'block, 'a> {
    /// The upper layer body visitor, block visitor may change body visitor's state
    pub body_visitor: &'block mut BodyVisitor<'a>,
}

impl<'block, 'a> fmt::Debug for BlockVisitor<'block, 'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "BlockVisitor".fmt(f)
    }
}

/// A storage location that is assigned to.
enum Place {
    Local(Rc<String>, ExpressionType),
    Field {
        reference: Rc<SymbolicValue>,
        class_name: Rc<String>,
        name: Rc<String>,
        ty: ExpressionType,
    },
    Static {
        class_name: Rc<String>,
        name: Rc<String>,
        ty: ExpressionType,
    },
}

impl Place {
    fn ty(&self) -> ExpressionType {
        match self {
            Place::Local(_, ty) | Place::Field { ty, .. } | Place::Static { ty, .. } => *ty,
        }
    }
}

impl<'block, 'a> BlockVisitor<'block, 'a> {
    pub fn new(body_visitor: &'block mut BodyVisitor<'a>) -> Self {
        Self { body_visitor }
    }

    /// Evaluates `expr` in `state`, returning every fork the evaluation ends in.
    pub fn visit_expression(&mut self, mut state: AbstractDomain, expr: &Expr) -> Result<Evaluated> {
        if !expr.has_side_effects() {
            let value = self.visit_pure(&mut state, expr)?;
            return Ok(vec![(state, value)]);
        }
        match expr {
            Expr::Field { receiver, name } => {
                let class_name = self.receiver_class(receiver.as_deref())?;
                let mut result = Vec::new();
                for (mut state, reference) in self.visit_receiver(state, receiver.as_deref())? {
                    let value = self
                        .body_visitor
                        .read_field(&mut state, &reference, &class_name, name)?;
                    result.push((state, value));
                }
                Ok(result)
            }
            Expr::Unary { op, operand } => self
                .visit_expression(state, operand)?
                .into_iter()
                .map(|(state, value)| Ok((state, apply_unary(*op, value)?)))
                .collect(),
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => self.visit_short_circuit(state, true, left, right),
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => self.visit_short_circuit(state, false, left, right),
            Expr::Binary { op, left, right } => {
                let mut result = Vec::new();
                for (state, left_value) in self.visit_expression(state, left)? {
                    for (state, right_value) in self.visit_expression(state, right)? {
                        result.push((state, apply_binary(*op, left_value.clone(), right_value)?));
                    }
                }
                Ok(result)
            }
            Expr::Assign { target, op, value } => self.visit_assign(state, target, *op, value),
            Expr::IncDec { op, target } => self.visit_inc_dec(state, *op, target),
            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => self.visit_conditional(state, condition, then_value, else_value),
            Expr::Cast { target, operand } => self
                .visit_expression(state, operand)?
                .into_iter()
                .map(|(state, value)| Ok((state, apply_cast(target, value)?)))
                .collect(),
            Expr::Call {
                target,
                receiver,
                arguments,
            } => CallVisitor::new(self).visit_call(state, target, receiver.as_deref(), arguments),
            Expr::New {
                class_name,
                constructor,
                arguments,
            } => CallVisitor::new(self).visit_new(state, class_name, constructor.as_ref(), arguments),
            _ => {
                let value = self.visit_pure(&mut state, expr)?;
                Ok(vec![(state, value)])
            }
        }
    }

    /// The value of an expression without side effects. Reads may still materialize
    /// fresh values for unknown references.
    pub fn visit_pure(&mut self, state: &mut AbstractDomain, expr: &Expr) -> Result<Rc<SymbolicValue>> {
        match expr {
            Expr::BoolLiteral(b) => Ok(SymbolicValue::make_bool(*b)),
            Expr::IntLiteral(n) => Ok(SymbolicValue::make_int(*n, ExpressionType::I32)),
            Expr::LongLiteral(n) => Ok(SymbolicValue::make_int(*n, ExpressionType::I64)),
            Expr::CharLiteral(c) => Ok(SymbolicValue::make_int(i64::from(*c), ExpressionType::Char)),
            Expr::Null => Ok(SymbolicValue::make_null()),
            Expr::Local(name) => state
                .local_value(name)
                .ok_or_else(|| AnalysisError::UnboundVariable(name.to_string())),
            Expr::This => self.this_value(),
            Expr::Field { receiver, name } => {
                let class_name = self.receiver_class(receiver.as_deref())?;
                let reference = match receiver {
                    Some(receiver) => self.visit_pure(state, receiver)?,
                    None => self.this_value()?,
                };
                self.body_visitor.read_field(state, &reference, &class_name, name)
            }
            Expr::StaticField { class_name, name } => {
                let (declaring_class, declared_type) = self.static_field(class_name, name)?;
                Ok(state.static_value(&declaring_class, name, declared_type.expression_type()))
            }
            Expr::Unary { op, operand } => {
                let operand = self.visit_pure(state, operand)?;
                apply_unary(*op, operand)
            }
            Expr::Binary { op, left, right } => {
                let left = self.visit_pure(state, left)?;
                let right = self.visit_pure(state, right)?;
                apply_binary(*op, left, right)
            }
            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                let condition = self.visit_pure(state, condition)?;
                check_boolean(&condition)?;
                let consequent = self.visit_pure(state, then_value)?;
                let alternate = self.visit_pure(state, else_value)?;
                let ty = conditional_type(consequent.value_type(), alternate.value_type());
                Ok(condition.conditional_expression(
                    assignment_conversion(consequent, ty),
                    assignment_conversion(alternate, ty),
                ))
            }
            Expr::Cast { target, operand } => {
                let operand = self.visit_pure(state, operand)?;
                apply_cast(target, operand)
            }
            _ => Err(AnalysisError::Unsupported(format!(
                "side effects in a pure context: {:?}",
                expr
            ))),
        }
    }

    pub fn this_value(&self) -> Result<Rc<SymbolicValue>> {
        if self.body_visitor.method.is_static {
            return Err(AnalysisError::UnboundVariable("this".to_string()));
        }
        Ok(SymbolicValue::make_variable(
            Path::new_this(),
            ExpressionType::Reference,
        ))
    }

    /// The receiver of a field access or call, `this` when absent.
    pub fn visit_receiver(&mut self, state: AbstractDomain, receiver: Option<&Expr>) -> Result<Evaluated> {
        match receiver {
            Some(receiver) => self.visit_expression(state, receiver),
            None => Ok(vec![(state, self.this_value()?)]),
        }
    }

    fn visit_short_circuit(&mut self, state: AbstractDomain, is_and: bool, left: &Expr, right: &Expr) -> Result<Evaluated> {
        let mut result = Vec::new();
        for (mut state, left_value) in self.visit_expression(state, left)? {
            check_boolean(&left_value)?;
            if !right.has_side_effects() {
                let right_value = self.visit_pure(&mut state, right)?;
                check_boolean(&right_value)?;
                let value = if is_and {
                    left_value.and(right_value)
                } else {
                    left_value.or(right_value)
                };
                result.push((state, value));
                continue;
            }
            // the right operand runs only where the left one does not decide the result
            let (then_state, else_state) = self.body_visitor.branch(state, &left_value)?;
            let (undecided, decided) = if is_and {
                (then_state, else_state)
            } else {
                (else_state, then_state)
            };
            if let Some(state) = decided {
                result.push((state, SymbolicValue::make_bool(!is_and)));
            }
            if let Some(state) = undecided {
                for (state, right_value) in self.visit_expression(state, right)? {
                    check_boolean(&right_value)?;
                    result.push((state, right_value));
                }
            }
        }
        Ok(result)
    }

    fn visit_conditional(
        &mut self,
        state: AbstractDomain,
        condition: &Expr,
        then_value: &Expr,
        else_value: &Expr,
    ) -> Result<Evaluated> {
        let forks_on_branches = then_value.has_side_effects() || else_value.has_side_effects();
        let mut consequents = Vec::new();
        let mut alternates = Vec::new();
        let mut joined = Vec::new();
        for (mut state, condition_value) in self.visit_expression(state, condition)? {
            check_boolean(&condition_value)?;
            if !forks_on_branches {
                let consequent = self.visit_pure(&mut state, then_value)?;
                let alternate = self.visit_pure(&mut state, else_value)?;
                joined.push((state, condition_value, consequent, alternate));
                continue;
            }
            let (then_state, else_state) = self.body_visitor.branch(state, &condition_value)?;
            if let Some(state) = then_state {
                consequents.extend(self.visit_expression(state, then_value)?);
            }
            if let Some(state) = else_state {
                alternates.extend(self.visit_expression(state, else_value)?);
            }
        }

        let mut result = Vec::new();
        for (state, condition_value, consequent, alternate) in joined {
            let ty = conditional_type(consequent.value_type(), alternate.value_type());
            let value = condition_value.conditional_expression(
                assignment_conversion(consequent, ty),
                assignment_conversion(alternate, ty),
            );
            result.push((state, value));
        }
        // every fork of a branch has the same type, so the first one decides
        let ty = match (consequents.first(), alternates.first()) {
            (Some((_, c)), Some((_, a))) => conditional_type(c.value_type(), a.value_type()),
            (Some((_, v)), None) | (None, Some((_, v))) => v.value_type(),
            (None, None) => return Ok(result),
        };
        for (state, value) in consequents.into_iter().chain(alternates.into_iter()) {
            result.push((state, assignment_conversion(value, ty)));
        }
        Ok(result)
    }

    fn visit_place(&mut self, state: AbstractDomain, target: &Expr) -> Result<Vec<(AbstractDomain, Place)>> {
        match target {
            Expr::Local(name) => {
                let ty = self.local_type(name)?;
                Ok(vec![(state, Place::Local(name.clone(), ty))])
            }
            Expr::Field { receiver, name } => {
                let class_name = self.receiver_class(receiver.as_deref())?;
                let ty = self.body_visitor.field_type(&class_name, name)?.expression_type();
                Ok(self
                    .visit_receiver(state, receiver.as_deref())?
                    .into_iter()
                    .map(|(state, reference)| {
                        let place = Place::Field {
                            reference,
                            class_name: class_name.clone(),
                            name: name.clone(),
                            ty,
                        };
                        (state, place)
                    })
                    .collect())
            }
            Expr::StaticField { class_name, name } => {
                let (declaring_class, declared_type) = self.static_field(class_name, name)?;
                let place = Place::Static {
                    class_name: declaring_class,
                    name: name.clone(),
                    ty: declared_type.expression_type(),
                };
                Ok(vec![(state, place)])
            }
            other => Err(AnalysisError::NotAssignable(format!("{:?}", other))),
        }
    }

    fn read_place(&mut self, state: &mut AbstractDomain, place: &Place) -> Result<Rc<SymbolicValue>> {
        match place {
            Place::Local(name, _) => state
                .local_value(name)
                .ok_or_else(|| AnalysisError::UnboundVariable(name.to_string())),
            Place::Field {
                reference,
                class_name,
                name,
                ..
            } => self.body_visitor.read_field(state, reference, class_name, name),
            Place::Static { class_name, name, ty } => Ok(state.static_value(class_name, name, *ty)),
        }
    }

    /// Stores `value` and returns what was stored.
    fn write_place(&mut self, state: &mut AbstractDomain, place: &Place, value: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        let value = self.body_visitor.limit_size(state, value);
        match place {
            Place::Local(name, _) => state.update_local(name, value.clone()),
            Place::Field { reference, name, .. } => state.heap.write_field(reference, name, &value),
            Place::Static { class_name, name, .. } => state.update_static(class_name, name, value.clone()),
        }
        value
    }

    /// The receiver is evaluated first, then the old value of a compound assignment,
    /// then the right hand side.
    fn visit_assign(&mut self, state: AbstractDomain, target: &Expr, op: Option<BinaryOp>, value: &Expr) -> Result<Evaluated> {
        let mut result = Vec::new();
        for (mut state, place) in self.visit_place(state, target)? {
            let old_value = match op {
                Some(_) => Some(self.read_place(&mut state, &place)?),
                None => None,
            };
            for (mut state, new_value) in self.visit_expression(state, value)? {
                let new_value = match (op, &old_value) {
                    (Some(op), Some(old_value)) => {
                        assignment_conversion(apply_binary(op, old_value.clone(), new_value)?, place.ty())
                    }
                    _ => {
                        check_assignable(&new_value, place.ty())?;
                        assignment_conversion(new_value, place.ty())
                    }
                };
                let stored = self.write_place(&mut state, &place, new_value);
                result.push((state, stored));
            }
        }
        Ok(result)
    }

    fn visit_inc_dec(&mut self, state: AbstractDomain, op: IncDec, target: &Expr) -> Result<Evaluated> {
        let mut result = Vec::new();
        for (mut state, place) in self.visit_place(state, target)? {
            let ty = place.ty();
            if !ty.is_integer() {
                return Err(AnalysisError::IncompatibleOperands {
                    operator: "++".to_string(),
                    left: ty,
                    right: ty,
                });
            }
            let old_value = self.read_place(&mut state, &place)?;
            let promoted = ty.unary_promoted();
            let one = SymbolicValue::make_int(1, promoted);
            let widened = old_value.cast(promoted);
            let new_value = match op {
                IncDec::PreIncrement | IncDec::PostIncrement => widened.add(one, promoted),
                IncDec::PreDecrement | IncDec::PostDecrement => widened.sub(one, promoted),
            };
            let stored = self.write_place(&mut state, &place, new_value.cast(ty));
            let value = match op {
                IncDec::PreIncrement | IncDec::PreDecrement => stored,
                IncDec::PostIncrement | IncDec::PostDecrement => old_value,
            };
            result.push((state, value));
        }
        Ok(result)
    }

    /// The static class of the object `receiver` denotes, the current class for `this`.
    pub fn receiver_class(&self, receiver: Option<&Expr>) -> Result<Rc<String>> {
        match receiver {
            Some(receiver) => self.class_of(receiver),
            None => Ok(self.body_visitor.method.class_name.clone()),
        }
    }

    /// The declared class of a reference expression.
    pub fn class_of(&self, expr: &Expr) -> Result<Rc<String>> {
        let program = &self.body_visitor.context.program;
        let declared = match expr {
            Expr::This => return Ok(self.body_visitor.method.class_name.clone()),
            Expr::New { class_name, .. } => return Ok(class_name.clone()),
            Expr::Assign { target, .. } => return self.class_of(target),
            Expr::Conditional {
                then_value,
                else_value,
                ..
            } => return self.class_of(then_value).or_else(|_| self.class_of(else_value)),
            Expr::Local(name) => self.body_visitor.local_types.get(name).cloned(),
            Expr::Field { receiver, name } => {
                let class_name = self.receiver_class(receiver.as_deref())?;
                program.field_type(&class_name, name)
            }
            Expr::StaticField { class_name, name } => {
                program.static_field_type(class_name, name).map(|(_, t)| t)
            }
            Expr::Cast { target, .. } => Some(target.clone()),
            Expr::Call { target, .. } => match target {
                CallTarget::Static(key) => program.method(key).and_then(|m| m.return_type.clone()),
                CallTarget::Virtual {
                    class_name,
                    method_name,
                } => program
                    .resolve_virtual(class_name, method_name)
                    .or_else(|| program.implementations(class_name, method_name).into_iter().next())
                    .and_then(|m| m.return_type.clone()),
                CallTarget::Library(..) => None,
            },
            _ => None,
        };
        declared
            .as_ref()
            .and_then(|t| t.class_name().cloned())
            .ok_or_else(|| AnalysisError::UntypedReceiver(format!("{:?}", expr)))
    }

    fn static_field(&self, class_name: &Rc<String>, name: &Rc<String>) -> Result<(Rc<String>, DeclaredType)> {
        self.body_visitor
            .context
            .program
            .static_field_type(class_name, name)
            .ok_or_else(|| AnalysisError::UnknownField {
                class_name: class_name.to_string(),
                field_name: name.to_string(),
            })
    }

    fn local_type(&self, name: &Rc<String>) -> Result<ExpressionType> {
        self.body_visitor
            .local_types
            .get(name)
            .map(|t| t.expression_type())
            .ok_or_else(|| AnalysisError::UnboundVariable(name.to_string()))
    }
}

fn check_boolean(value: &Rc<SymbolicValue>) -> Result<()> {
    if value.value_type() == ExpressionType::Bool {
        Ok(())
    } else {
        Err(AnalysisError::NonBooleanCondition(value.value_type()))
    }
}

fn check_assignable(value: &Rc<SymbolicValue>, ty: ExpressionType) -> Result<()> {
    let value_type = value.value_type();
    let compatible = value_type == ty || (value_type.is_integer() && ty.is_integer()) || value.is_top();
    if compatible {
        Ok(())
    } else {
        Err(AnalysisError::IncompatibleOperands {
            operator: "=".to_string(),
            left: ty,
            right: value_type,
        })
    }
}

/// The type of `c ? a : b` given the types of `a` and `b`.
pub fn conditional_type(left: ExpressionType, right: ExpressionType) -> ExpressionType {
    if left == right || !left.is_integer() || !right.is_integer() {
        left
    } else if left.fits_in(right) {
        right
    } else if right.fits_in(left) {
        left
    } else {
        ExpressionType::binary_promotion(left, right)
    }
}

pub fn apply_cast(target: &DeclaredType, operand: Rc<SymbolicValue>) -> Result<Rc<SymbolicValue>> {
    let target_type = target.expression_type();
    let operand_type = operand.value_type();
    if target_type.is_integer() && operand_type.is_integer() {
        Ok(operand.cast(target_type))
    } else if target_type == operand_type {
        // reference casts do not change the value
        Ok(operand)
    } else {
        Err(AnalysisError::IncompatibleOperands {
            operator: format!("({})", target),
            left: target_type,
            right: operand_type,
        })
    }
}

pub fn apply_unary(op: UnaryOp, operand: Rc<SymbolicValue>) -> Result<Rc<SymbolicValue>> {
    let ty = operand.value_type();
    let incompatible = |symbol: &str| AnalysisError::IncompatibleOperands {
        operator: symbol.to_string(),
        left: ty,
        right: ty,
    };
    match op {
        UnaryOp::Not if ty == ExpressionType::Bool => Ok(operand.logical_not()),
        UnaryOp::Not => Err(incompatible("!")),
        _ if !ty.is_integer() => Err(incompatible("unary")),
        UnaryOp::Neg => {
            let promoted = ty.unary_promoted();
            Ok(operand.cast(promoted).neg(promoted))
        }
        UnaryOp::Plus => Ok(operand.cast(ty.unary_promoted())),
        UnaryOp::BitNot => {
            let promoted = ty.unary_promoted();
            Ok(operand.cast(promoted).bit_not(promoted))
        }
    }
}

fn arithmetic_operator(op: BinaryOp) -> Option<BinaryOperator> {
    Some(match op {
        BinaryOp::Add => BinaryOperator::Add,
        BinaryOp::Sub => BinaryOperator::Sub,
        BinaryOp::Mul => BinaryOperator::Mul,
        BinaryOp::Div => BinaryOperator::Div,
        BinaryOp::Rem => BinaryOperator::Rem,
        BinaryOp::BitAnd => BinaryOperator::BitAnd,
        BinaryOp::BitOr => BinaryOperator::BitOr,
        BinaryOp::BitXor => BinaryOperator::BitXor,
        BinaryOp::Shl => BinaryOperator::Shl,
        BinaryOp::Shr => BinaryOperator::Shr,
        BinaryOp::UShr => BinaryOperator::UShr,
        _ => return None,
    })
}

/// Applies a binary operator with the promotions of its operands made explicit.
pub fn apply_binary(op: BinaryOp, left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Result<Rc<SymbolicValue>> {
    let left_type = left.value_type();
    let right_type = right.value_type();
    let incompatible = || AnalysisError::IncompatibleOperands {
        operator: op.to_string(),
        left: left_type,
        right: right_type,
    };
    let both_bool = left_type == ExpressionType::Bool && right_type == ExpressionType::Bool;
    let both_integer = left_type.is_integer() && right_type.is_integer();
    let both_reference =
        left_type == ExpressionType::Reference && right_type == ExpressionType::Reference;

    if both_bool {
        return match op {
            BinaryOp::And | BinaryOp::BitAnd => Ok(left.and(right)),
            BinaryOp::Or | BinaryOp::BitOr => Ok(left.or(right)),
            BinaryOp::BitXor | BinaryOp::Ne => Ok(left.not_equals(right)),
            BinaryOp::Eq => Ok(left.equals(right)),
            _ => Err(incompatible()),
        };
    }
    if both_reference {
        return match op {
            BinaryOp::Eq => Ok(left.equals(right)),
            BinaryOp::Ne => Ok(left.not_equals(right)),
            _ => Err(incompatible()),
        };
    }
    if !both_integer {
        return Err(incompatible());
    }
    if matches!(op, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr) {
        let promoted = left_type.unary_promoted();
        let distance = right.cast(right_type.unary_promoted());
        let operator = arithmetic_operator(op).ok_or_else(incompatible)?;
        return Ok(left.cast(promoted).binary(operator, distance, promoted));
    }
    let promoted = ExpressionType::binary_promotion(left_type, right_type);
    let left = left.cast(promoted);
    let right = right.cast(promoted);
    match op {
        BinaryOp::Eq => Ok(left.equals(right)),
        BinaryOp::Ne => Ok(left.not_equals(right)),
        BinaryOp::Lt => Ok(left.less_than(right)),
        BinaryOp::Le => Ok(left.less_or_equal(right)),
        BinaryOp::Gt => Ok(left.greater_than(right)),
        BinaryOp::Ge => Ok(left.greater_or_equal(right)),
        BinaryOp::And | BinaryOp::Or => Err(incompatible()),
        _ => {
            let operator = arithmetic_operator(op).ok_or_else(incompatible)?;
            Ok(left.binary(operator, right, promoted))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::memory::expression::ExpressionType::*;

    fn param(ordinal: usize, ty: ExpressionType) -> Rc<SymbolicValue> {
        SymbolicValue::make_variable(Path::new_parameter(ordinal), ty)
    }

    #[test]
    fn test_promotion_is_explicit() {
        let b = param(0, I8);
        let s = param(1, I16);
        let sum = apply_binary(BinaryOp::Add, b.clone(), s.clone()).expect("integers add");
        assert_eq!(sum.value_type(), I32);
        assert_eq!(sum, b.cast(I32).add(s.cast(I32), I32));

        let l = param(2, I64);
        let product = apply_binary(BinaryOp::Mul, b, l.clone()).expect("integers multiply");
        assert_eq!(product.value_type(), I64);
    }

    #[test]
    fn test_shift_distance_is_promoted_alone() {
        let x = param(0, I16);
        let d = param(1, I64);
        let shifted = apply_binary(BinaryOp::Shl, x.clone(), d.clone()).expect("integers shift");
        assert_eq!(shifted.value_type(), I32);
        assert_eq!(shifted, x.cast(I32).binary(BinaryOperator::Shl, d, I32));
    }

    #[test]
    fn test_boolean_operators() {
        let a = param(0, Bool);
        let b = param(1, Bool);
        assert_eq!(apply_binary(BinaryOp::BitXor, a.clone(), b.clone()), Ok(a.not_equals(b.clone())));
        assert_eq!(apply_binary(BinaryOp::BitAnd, a.clone(), b.clone()), Ok(a.and(b)));
        assert!(apply_binary(BinaryOp::Add, a.clone(), param(2, I32)).is_err());
        assert!(apply_unary(UnaryOp::Neg, a).is_err());
    }

    #[test]
    fn test_unary_promotion() {
        let c = param(0, Char);
        let negated = apply_unary(UnaryOp::Neg, c.clone()).expect("char negates");
        assert_eq!(negated.value_type(), I32);
        assert_eq!(negated, c.cast(I32).neg(I32));
    }

    #[test]
    fn test_conditional_type() {
        assert_eq!(conditional_type(I8, I16), I16);
        assert_eq!(conditional_type(Char, I16), I32);
        assert_eq!(conditional_type(I32, I64), I64);
        assert_eq!(conditional_type(Reference, Reference), Reference);
    }

    #[test]
    fn test_casts() {
        let x = param(0, I32);
        assert_eq!(apply_cast(&DeclaredType::Short, x.clone()), Ok(x.cast(I16)));
        assert!(apply_cast(&DeclaredType::Boolean, x).is_err());
        let r = param(1, Reference);
        assert_eq!(apply_cast(&DeclaredType::class("A"), r.clone()), Ok(r));
    }
}
