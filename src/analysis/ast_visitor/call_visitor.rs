// This file is adapted from MIRAI (https://github.com/facebookexperimental/MIRAI)
// Original author: Herman Venter <hermanv@fb.com>
// Original copyright header:

// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::analysis::abstract_domain::AbstractDomain;
use crate::analysis::analysis_result::{AnalysisError, Result};
use crate::analysis::ast_visitor::block_visitor::{BlockVisitor, Evaluated};
use crate::analysis::ast_visitor::body_visitor::{assignment_conversion, BodyVisitor};
use crate::analysis::diagnostics::DiagnosticCause;
use crate::analysis::global_context::MethodSummary;
use crate::analysis::memory::constant_value::ConstantValue;
use crate::analysis::memory::expression::{Expression, ExpressionType};
use crate::analysis::memory::heap::{AbstractObject, AliasPartition, Heap, ObjectKey, Target};
use crate::analysis::memory::known_names::KnownNames;
use crate::analysis::memory::path::{Path, PathEnum};
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use crate::ast::{CallTarget, Expr, MethodDecl};
use log::debug;
use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::rc::Rc;

/// Resolves calls and object creations, and transfers the summary of the callee
/// into the caller's forks.
pub struct CallVisitor<'call, 'block, 'a> {
    /// The upper layer block visitor
    pub block_visitor: &'call mut BlockVisitor<'block, 'a>,
}

impl<'call, 'block, 'a> Debug for CallVisitor<'call, 'block, 'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        "CallVisitor".fmt(f)
    }
}

/// How the aliasing a summary was computed under relates to the aliasing at a call site.
enum AliasCheck {
    Consistent,
    /// These input paths of the callee must alias at the call site.
    Refine(Vec<(Rc<Path>, Rc<Path>)>),
    /// Some input paths of the callee may or may not alias at the call site.
    Ambiguous,
}

impl<'call, 'block, 'a> CallVisitor<'call, 'block, 'a> {
    pub fn new(block_visitor: &'call mut BlockVisitor<'block, 'a>) -> Self {
        Self { block_visitor }
    }

    fn body(&mut self) -> &mut BodyVisitor<'a> {
        &mut *self.block_visitor.body_visitor
    }

    pub fn visit_call(
        &mut self,
        state: AbstractDomain,
        target: &CallTarget,
        receiver: Option<&Expr>,
        arguments: &[Expr],
    ) -> Result<Evaluated> {
        match target {
            CallTarget::Library(name) => self.visit_library_call(state, name, arguments),
            CallTarget::Static(key) => {
                let method = match self.body().context.program.method(key) {
                    Some(method) => method,
                    None => {
                        let operands: Vec<&Expr> = receiver.into_iter().chain(arguments.iter()).collect();
                        return self.unresolved(state, &operands, format!("no method has the key {}", key), None);
                    }
                };
                let this = Expr::This;
                let receiver = if method.is_static {
                    None
                } else {
                    Some(receiver.unwrap_or(&this))
                };
                let operands: Vec<&Expr> = receiver.into_iter().chain(arguments.iter()).collect();
                let mut result = Vec::new();
                for (state, mut values) in self.visit_operands(state, &operands)? {
                    let receiver_value = if method.is_static {
                        None
                    } else {
                        Some(values.remove(0))
                    };
                    result.extend(self.invoke(state, &method, receiver_value, values)?);
                }
                Ok(result)
            }
            CallTarget::Virtual {
                class_name,
                method_name,
            } => self.visit_virtual_call(state, class_name, method_name, receiver, arguments),
        }
    }

    /// `new C(args)`: allocates the object with default field values and runs the constructor on it.
    pub fn visit_new(
        &mut self,
        state: AbstractDomain,
        class_name: &Rc<String>,
        constructor: Option<&Rc<String>>,
        arguments: &[Expr],
    ) -> Result<Evaluated> {
        let program = self.body().context.program.clone();
        program.class(class_name)?;
        let method = match constructor {
            Some(key) => program
                .method(key)
                .ok_or_else(|| AnalysisError::UnknownMethod(key.to_string()))?,
            None => program.default_constructor(class_name),
        };
        let operands: Vec<&Expr> = arguments.iter().collect();
        let mut result = Vec::new();
        for (mut state, values) in self.visit_operands(state, &operands)? {
            let address = self.body().new_heap_block();
            let fields = program
                .instance_fields(class_name)
                .into_iter()
                .map(|f| (f.name.clone(), f.declared_type.default_value()))
                .collect();
            let object = state.heap.allocate(address, class_name.clone(), fields);
            debug!("Allocated {} at {}", class_name, address);
            for (state, _) in self.invoke(state, &method, Some(object.clone()), values)? {
                result.push((state, object.clone()));
            }
        }
        Ok(result)
    }

    /// Evaluates the operands left to right, across the forks each of them may create.
    fn visit_operands(
        &mut self,
        state: AbstractDomain,
        operands: &[&Expr],
    ) -> Result<Vec<(AbstractDomain, Vec<Rc<SymbolicValue>>)>> {
        let mut partial = vec![(state, Vec::new())];
        for operand in operands {
            let mut next = Vec::new();
            for (state, values) in partial {
                for (state, value) in self.block_visitor.visit_expression(state, operand)? {
                    let mut values = values.clone();
                    values.push(value);
                    next.push((state, values));
                }
            }
            partial = next;
        }
        Ok(partial)
    }

    fn visit_library_call(&mut self, state: AbstractDomain, name: &Rc<String>, arguments: &[Expr]) -> Result<Evaluated> {
        let known_name = self.body().context.known_names_cache.get(name);
        let operands: Vec<&Expr> = arguments.iter().collect();
        if known_name == KnownNames::None {
            return self.unresolved(state, &operands, format!("unknown library method {}", name), None);
        }
        if arguments.len() != known_name.arity() {
            return Err(AnalysisError::WrongArgumentCount {
                method: name.to_string(),
                expected: known_name.arity(),
                found: arguments.len(),
            });
        }
        let mut result = Vec::new();
        for (state, values) in self.visit_operands(state, &operands)? {
            result.push((state, expand_library_call(known_name, &values)?));
        }
        Ok(result)
    }

    fn visit_virtual_call(
        &mut self,
        state: AbstractDomain,
        class_name: &Rc<String>,
        method_name: &Rc<String>,
        receiver: Option<&Expr>,
        arguments: &[Expr],
    ) -> Result<Evaluated> {
        let program = self.body().context.program.clone();
        let declared_return_type = program
            .resolve_virtual(class_name, method_name)
            .or_else(|| program.implementations(class_name, method_name).into_iter().next())
            .and_then(|m| m.return_type.clone())
            .map(|t| t.expression_type());
        let this = Expr::This;
        let operands: Vec<&Expr> = std::iter::once(receiver.unwrap_or(&this))
            .chain(arguments.iter())
            .collect();
        let mut result = Vec::new();
        for (state, mut values) in self.visit_operands(state, &operands)? {
            let receiver_value = values.remove(0);
            for (state, receiver_target, key) in self.split_on_targets(state, &receiver_value) {
                let method = match &key {
                    Some(ObjectKey::Allocated(..)) => key
                        .as_ref()
                        .and_then(|k| state.heap.class_of(k))
                        .and_then(|c| program.resolve_virtual(&c, method_name)),
                    Some(ObjectKey::Input(..)) => {
                        let mut implementations = program.implementations(class_name, method_name);
                        if implementations.len() == 1 {
                            implementations.pop()
                        } else {
                            None
                        }
                    }
                    None if is_null(&receiver_target) => {
                        debug!("Call of {}.{} on null ends the fork", class_name, method_name);
                        continue;
                    }
                    None => None,
                };
                match method {
                    Some(method) => {
                        result.extend(self.invoke(state, &method, Some(receiver_target), values.clone())?)
                    }
                    None => {
                        let mut references = vec![receiver_target];
                        references.extend(values.iter().cloned());
                        let message = format!("cannot resolve the target of {}.{}", class_name, method_name);
                        result.push(self.fallback(
                            state,
                            DiagnosticCause::UnresolvedCall,
                            message,
                            references,
                            declared_return_type,
                        ));
                    }
                }
            }
        }
        Ok(result)
    }

    /// A call whose callee is not known: the operands are evaluated, then the call havocs.
    fn unresolved(
        &mut self,
        state: AbstractDomain,
        operands: &[&Expr],
        message: String,
        result_type: Option<ExpressionType>,
    ) -> Result<Evaluated> {
        let mut result = Vec::new();
        for (state, values) in self.visit_operands(state, operands)? {
            result.push(self.fallback(
                state,
                DiagnosticCause::UnresolvedCall,
                message.clone(),
                values,
                result_type,
            ));
        }
        Ok(result)
    }

    /// Havocs everything the callee might reach and returns a fresh value. An unknown result
    /// type is taken to be `long`, which every integer result converts from.
    fn fallback(
        &mut self,
        mut state: AbstractDomain,
        cause: DiagnosticCause,
        message: String,
        values: Vec<Rc<SymbolicValue>>,
        result_type: Option<ExpressionType>,
    ) -> (AbstractDomain, Rc<SymbolicValue>) {
        self.body().emit_diagnostic(cause, message);
        let roots = values
            .into_iter()
            .filter(|v| v.value_type() == ExpressionType::Reference)
            .collect();
        self.body().havoc_reachable(&mut state, roots);
        let ordinal = self.body().fresh_ordinal();
        let ty = result_type.unwrap_or(ExpressionType::I64);
        (state, SymbolicValue::make_variable(Path::new_fresh(ordinal), ty))
    }

    /// Splits the fork by the objects `value` may denote.
    fn split_on_targets(
        &mut self,
        state: AbstractDomain,
        value: &Rc<SymbolicValue>,
    ) -> Vec<(AbstractDomain, Rc<SymbolicValue>, Option<ObjectKey>)> {
        let mut targets = state.heap.targets(value);
        if targets.len() == 1 {
            if let Some(target) = targets.pop() {
                return vec![(state, target.value, target.key)];
            }
        }
        let mut result = Vec::new();
        for target in targets {
            let mut fork = state.clone();
            self.body().assume(&mut fork, target.guard);
            if !fork.is_bottom() {
                result.push((fork, target.value, target.key));
            }
        }
        result
    }

    /// Splits the fork until every reference operand denotes a single object.
    fn split_references(
        &mut self,
        state: AbstractDomain,
        receiver: Option<Rc<SymbolicValue>>,
        arguments: Vec<Rc<SymbolicValue>>,
    ) -> Vec<(AbstractDomain, Option<Rc<SymbolicValue>>, Vec<Rc<SymbolicValue>>)> {
        let has_receiver = receiver.is_some();
        let mut partial = vec![(state, Vec::new())];
        for value in receiver.into_iter().chain(arguments.into_iter()) {
            let mut next = Vec::new();
            for (state, done) in partial {
                if value.value_type() != ExpressionType::Reference {
                    let mut done = done;
                    done.push(value.clone());
                    next.push((state, done));
                    continue;
                }
                for (state, target, _) in self.split_on_targets(state, &value) {
                    let mut done = done.clone();
                    done.push(target);
                    next.push((state, done));
                }
            }
            partial = next;
        }
        partial
            .into_iter()
            .map(|(state, mut values)| {
                let receiver = if has_receiver && !values.is_empty() {
                    Some(values.remove(0))
                } else {
                    None
                };
                (state, receiver, values)
            })
            .collect()
    }

    /// Calls a resolved method: inlines its summary, or takes the fallback when the call
    /// goes too deep.
    pub fn invoke(
        &mut self,
        state: AbstractDomain,
        method: &Rc<MethodDecl>,
        receiver: Option<Rc<SymbolicValue>>,
        arguments: Vec<Rc<SymbolicValue>>,
    ) -> Result<Evaluated> {
        if arguments.len() != method.parameters.len() {
            return Err(AnalysisError::WrongArgumentCount {
                method: method.key.to_string(),
                expected: method.parameters.len(),
                found: arguments.len(),
            });
        }
        let arguments: Vec<Rc<SymbolicValue>> = arguments
            .into_iter()
            .zip(method.parameters.iter())
            .map(|(value, parameter)| assignment_conversion(value, parameter.declared_type.expression_type()))
            .collect();
        let result_type = method.return_type.as_ref().map(|t| t.expression_type());
        let max_call_depth = self.body().context.analysis_options.max_call_depth;
        if self.body().call_stack.len() >= max_call_depth {
            let message = format!("call of {} is nested deeper than {}", method.key, max_call_depth);
            let values = receiver.into_iter().chain(arguments.into_iter()).collect();
            return Ok(vec![self.fallback(
                state,
                DiagnosticCause::CallDepthCap,
                message,
                values,
                result_type,
            )]);
        }
        let mut result = Vec::new();
        for (state, receiver, arguments) in self.split_references(state, receiver, arguments) {
            result.extend(self.invoke_with_aliasing(state, method, receiver, arguments)?);
        }
        Ok(result)
    }

    fn invoke_with_aliasing(
        &mut self,
        state: AbstractDomain,
        method: &Rc<MethodDecl>,
        receiver: Option<Rc<SymbolicValue>>,
        arguments: Vec<Rc<SymbolicValue>>,
    ) -> Result<Evaluated> {
        let mut partition = partition_for(&state.heap, receiver.as_ref(), &arguments);
        let max_refinements = self.body().context.analysis_options.max_alias_refinements;
        let mut refinements = 0;
        loop {
            let summary = self.body().summary_for(method, Rc::new(partition.clone()))?;
            match self.check_aliasing(&state, &summary, receiver.as_ref(), &arguments) {
                AliasCheck::Consistent => {
                    return Ok(self.apply_summary(state, &summary, receiver, &arguments));
                }
                AliasCheck::Refine(pairs) if refinements < max_refinements => {
                    debug!("Re-analyzing {} with {:?} aliased", method.key, pairs);
                    for (left, right) in pairs.iter() {
                        partition.union(left, right);
                    }
                    refinements += 1;
                }
                _ => {
                    let message = format!(
                        "the summary of {} does not fit the aliasing at the call",
                        method.key
                    );
                    let result_type = method.return_type.as_ref().map(|t| t.expression_type());
                    let values = receiver.into_iter().chain(arguments.into_iter()).collect();
                    return Ok(vec![self.fallback(
                        state,
                        DiagnosticCause::AmbiguousAliasing,
                        message,
                        values,
                        result_type,
                    )]);
                }
            }
        }
    }

    /// Compares the input objects the callee touched with the objects they denote at the call.
    fn check_aliasing(
        &mut self,
        state: &AbstractDomain,
        summary: &MethodSummary,
        receiver: Option<&Rc<SymbolicValue>>,
        arguments: &[Rc<SymbolicValue>],
    ) -> AliasCheck {
        let mut next_fresh = self.body().next_fresh + summary.ordinal_count;
        let mut translator = Translator {
            caller: state.clone(),
            receiver: receiver.cloned(),
            arguments,
            ordinal_offset: 0,
            block_offset: 0,
            next_fresh: &mut next_fresh,
        };
        let mut resolved: Vec<(Rc<Path>, Vec<Target>)> = Vec::new();
        for path in summary.touched.iter().filter(|p| !p.is_method_local()) {
            let reference = translator.translate_path(path, ExpressionType::Reference);
            let targets = translator
                .caller
                .heap
                .targets(&reference)
                .into_iter()
                .filter(|t| t.key.is_some())
                .collect();
            resolved.push((path.clone(), targets));
        }

        let certain = |targets: &[Target]| {
            targets.len() == 1 && targets[0].guard.as_bool_if_known() == Some(true)
        };
        let mut must_alias = Vec::new();
        for (i, (left_path, left_targets)) in resolved.iter().enumerate() {
            for (right_path, right_targets) in resolved.iter().skip(i + 1) {
                if summary.partition.same_class(left_path, right_path) {
                    continue;
                }
                let overlap = left_targets
                    .iter()
                    .any(|l| right_targets.iter().any(|r| l.key == r.key));
                if !overlap {
                    continue;
                }
                if certain(left_targets.as_slice()) && certain(right_targets.as_slice()) {
                    must_alias.push((left_path.clone(), right_path.clone()));
                } else {
                    return AliasCheck::Ambiguous;
                }
            }
        }
        if must_alias.is_empty() {
            AliasCheck::Consistent
        } else {
            AliasCheck::Refine(must_alias)
        }
    }

    /// One caller fork per feasible exit of the callee.
    fn apply_summary(
        &mut self,
        state: AbstractDomain,
        summary: &MethodSummary,
        receiver: Option<Rc<SymbolicValue>>,
        arguments: &[Rc<SymbolicValue>],
    ) -> Evaluated {
        let ordinal_offset = self.body().next_fresh;
        let block_offset = self.body().next_heap_block;
        let mut next_fresh = ordinal_offset + summary.ordinal_count;
        self.body().next_heap_block += summary.heap_block_count;
        self.body()
            .buffered_diagnostics
            .extend(summary.diagnostics.iter().cloned());
        debug!(
            "Applying {} exits of {} at offsets {}/{}",
            summary.exits.len(),
            summary.method.key,
            ordinal_offset,
            block_offset
        );

        let mut result = Vec::new();
        for exit in summary.exits.iter() {
            let mut translator = Translator {
                caller: state.clone(),
                receiver: receiver.clone(),
                arguments,
                ordinal_offset,
                block_offset,
                next_fresh: &mut next_fresh,
            };
            let condition = translator.translate(&exit.state.path_condition);
            let mut post = state.clone();
            self.body().assume(&mut post, condition);
            if post.is_bottom() || self.body().bindings_for(&post).is_none() {
                debug!("Exit of {} is infeasible at the call", summary.method.key);
                continue;
            }
            translator.transfer_heap(&exit.state.heap, &mut post);
            translator.transfer_statics(&exit.state, &mut post);
            for path in summary.touched.iter().filter(|p| !p.is_method_local()) {
                let reference = translator.translate_path(path, ExpressionType::Reference);
                for target in post.heap.targets(&reference) {
                    if let Some(ObjectKey::Input(caller_path)) = target.key {
                        post.heap.mark_touched(caller_path);
                    }
                }
            }
            for caller_path in translator.caller.heap.touched().iter() {
                post.heap.mark_touched(caller_path.clone());
            }
            let value = match &exit.return_value {
                Some(value) => translator.translate(value),
                None => translator.fresh_variable(ExpressionType::I64),
            };
            result.push((post, value));
        }
        self.body().next_fresh = next_fresh;
        result
    }
}

/// Inputs of the callee that are passed the same object are one alias class.
fn partition_for(
    heap: &Heap,
    receiver: Option<&Rc<SymbolicValue>>,
    arguments: &[Rc<SymbolicValue>],
) -> AliasPartition {
    let mut partition = AliasPartition::new();
    let mut seen: Vec<(ObjectKey, Rc<Path>)> = Vec::new();
    let candidates = receiver
        .map(|r| (Path::new_this(), r))
        .into_iter()
        .chain(
            arguments
                .iter()
                .enumerate()
                .map(|(i, a)| (Path::new_parameter(i), a)),
        );
    for (path, value) in candidates {
        if value.value_type() != ExpressionType::Reference {
            continue;
        }
        if let Some(key) = heap.key_of(value) {
            let first = seen.iter().find(|(k, _)| *k == key).map(|(_, p)| p.clone());
            match first {
                Some(first) => partition.union(&first, &path),
                None => seen.push((key, path)),
            }
        }
    }
    partition
}

fn is_null(value: &Rc<SymbolicValue>) -> bool {
    matches!(
        &value.expression,
        Expression::CompileTimeConstant {
            value: ConstantValue::Null,
            ..
        }
    )
}

/// Expands a well known library method into an expression tree.
fn expand_library_call(known_name: KnownNames, arguments: &[Rc<SymbolicValue>]) -> Result<Rc<SymbolicValue>> {
    let integer_argument = |i: usize| -> Result<Rc<SymbolicValue>> {
        let value = arguments
            .get(i)
            .cloned()
            .ok_or_else(|| AnalysisError::Unsupported(format!("missing argument {}", i)))?;
        if value.value_type().is_integer() {
            Ok(value)
        } else {
            Err(AnalysisError::IncompatibleOperands {
                operator: "call".to_string(),
                left: value.value_type(),
                right: value.value_type(),
            })
        }
    };
    match known_name {
        KnownNames::MathAbs => {
            let x = integer_argument(0)?;
            let ty = x.value_type().unary_promoted();
            let x = x.cast(ty);
            let negative = x.less_than(SymbolicValue::make_int(0, ty));
            Ok(negative.conditional_expression(x.neg(ty), x))
        }
        KnownNames::MathMax | KnownNames::MathMin => {
            let a = integer_argument(0)?;
            let b = integer_argument(1)?;
            let ty = ExpressionType::binary_promotion(a.value_type(), b.value_type());
            let (a, b) = (a.cast(ty), b.cast(ty));
            let a_is_smaller = a.less_or_equal(b.clone());
            if known_name == KnownNames::MathMax {
                Ok(a_is_smaller.conditional_expression(b, a))
            } else {
                Ok(a_is_smaller.conditional_expression(a, b))
            }
        }
        KnownNames::IntegerSignum | KnownNames::LongSignum => {
            let ty = if known_name == KnownNames::LongSignum {
                ExpressionType::I64
            } else {
                ExpressionType::I32
            };
            let x = integer_argument(0)?.cast(ty);
            let zero = SymbolicValue::make_int(0, ty);
            let int = |n: i64| SymbolicValue::make_int(n, ExpressionType::I32);
            let positive = x.greater_than(zero.clone()).conditional_expression(int(1), int(0));
            Ok(x.less_than(zero).conditional_expression(int(-1), positive))
        }
        KnownNames::None => Err(AnalysisError::UnknownMethod("library method".to_string())),
    }
}

/// Rewrites values of a callee exit into the caller's terms: inputs become the actual
/// arguments and the caller's current contents, numbered paths move past the caller's.
struct Translator<'t> {
    // The caller state at the call, reads may materialize entries in this copy
    caller: AbstractDomain,
    receiver: Option<Rc<SymbolicValue>>,
    arguments: &'t [Rc<SymbolicValue>],
    ordinal_offset: usize,
    block_offset: usize,
    next_fresh: &'t mut usize,
}

impl<'t> Translator<'t> {
    fn translate(&mut self, value: &Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        value.refine_paths(&mut |node| self.translate_leaf(node))
    }

    fn translate_leaf(&mut self, node: &Rc<SymbolicValue>) -> Option<Rc<SymbolicValue>> {
        match &node.expression {
            Expression::Variable { path, var_type } => Some(self.translate_path(path, *var_type)),
            Expression::Widen {
                path,
                bounds,
                var_type,
            } => Some(SymbolicValue::make_widen(
                Path::relocate(path, self.ordinal_offset),
                bounds.clone(),
                *var_type,
            )),
            Expression::HeapBlock { abstract_address } => {
                Some(SymbolicValue::make_heap_block(abstract_address + self.block_offset))
            }
            _ => None,
        }
    }

    fn fresh_variable(&mut self, ty: ExpressionType) -> Rc<SymbolicValue> {
        let ordinal = *self.next_fresh;
        *self.next_fresh += 1;
        SymbolicValue::make_variable(Path::new_fresh(ordinal), ty)
    }

    /// The caller value of the entry value at a callee path.
    fn translate_path(&mut self, path: &Rc<Path>, ty: ExpressionType) -> Rc<SymbolicValue> {
        if path.is_method_local() {
            return SymbolicValue::make_variable(Path::relocate(path, self.ordinal_offset), ty);
        }
        match &path.value {
            PathEnum::Parameter { ordinal } => match self.arguments.get(*ordinal) {
                Some(value) => value.clone(),
                None => self.fresh_variable(ty),
            },
            PathEnum::This => match &self.receiver {
                Some(value) => value.clone(),
                None => self.fresh_variable(ty),
            },
            PathEnum::StaticField {
                class_name,
                field_name,
            } => self.caller.static_value(class_name, field_name, ty),
            PathEnum::QualifiedPath { qualifier, .. } => {
                let field = match path.field_name() {
                    Some(field) => field.clone(),
                    None => return self.fresh_variable(ty),
                };
                let reference = self.translate_path(qualifier, ExpressionType::Reference);
                match self
                    .caller
                    .heap
                    .read_field(&reference, &field, ty, &mut *self.next_fresh)
                {
                    Some(value) => value,
                    None => self.fresh_variable(ty),
                }
            }
            _ => self.fresh_variable(ty),
        }
    }

    /// Applies the heap effects of a callee exit to `post`.
    fn transfer_heap(&mut self, callee: &Heap, post: &mut AbstractDomain) {
        if let Some(ordinal) = callee.static_roots_havocked() {
            post.heap.havoc_static_roots(ordinal + self.ordinal_offset);
        }
        for root in callee.havocked_roots().keys() {
            if root.is_method_local() {
                continue;
            }
            let reference = self.translate_path(root, ExpressionType::Reference);
            for key in post.heap.reachable(&[reference]) {
                let ordinal = *self.next_fresh;
                *self.next_fresh += 1;
                match &key {
                    ObjectKey::Input(path) => post.heap.havoc_root(path, ordinal),
                    ObjectKey::Allocated(..) => post.heap.havoc_object(&key, Path::new_fresh(ordinal)),
                }
            }
        }
        for (key, object) in callee.objects.iter() {
            match key {
                ObjectKey::Allocated(address) => {
                    let fields = object
                        .fields
                        .iter()
                        .map(|(field, value)| (field.clone(), self.translate(value)))
                        .collect();
                    let relocated = AbstractObject {
                        class_name: object.class_name.clone(),
                        fields,
                        aliases: BTreeSet::new(),
                        havoc_base: object
                            .havoc_base
                            .as_ref()
                            .map(|base| Path::relocate(base, self.ordinal_offset)),
                    };
                    post.heap
                        .objects
                        .insert(ObjectKey::Allocated(address + self.block_offset), relocated);
                }
                ObjectKey::Input(path) => {
                    if path.is_method_local() {
                        continue;
                    }
                    let reference = self.translate_path(path, ExpressionType::Reference);
                    if let Some(base) = &object.havoc_base {
                        let base = Path::relocate(base, self.ordinal_offset);
                        for target in post.heap.targets(&reference) {
                            if let Some(key) = target.key {
                                post.heap.havoc_object(&key, base.clone());
                            }
                        }
                    }
                    for (field, value) in object.fields.iter() {
                        let value = self.translate(value);
                        post.heap.write_field(&reference, field, &value);
                    }
                }
            }
        }
    }

    fn transfer_statics(&mut self, callee: &AbstractDomain, post: &mut AbstractDomain) {
        if let Some(ordinal) = callee.statics_havocked {
            post.havoc_statics(ordinal + self.ordinal_offset);
        }
        for (path, value) in callee.statics.value_map.iter() {
            let value = self.translate(value);
            post.statics.update_value_at(path.clone(), value);
        }
    }
}
