use crate::analysis::memory::expression::{Expression, ExpressionType};
use crate::analysis::memory::heap::{AliasPartition, Heap};
use crate::analysis::memory::path::{Path, PathEnum};
use crate::analysis::memory::symbolic_domain::SymbolicDomain;
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// The state of one fork: the condition under which execution reaches the current point,
/// together with what every local, static field and object holds there.
#[derive(Clone, PartialEq)]
pub struct AbstractDomain {
    pub path_condition: Rc<SymbolicValue>,
    pub locals: SymbolicDomain,
    // Statics written so far. Unwritten ones hold their entry value.
    pub statics: SymbolicDomain,
    pub statics_havocked: Option<usize>,
    pub heap: Heap,
}

impl fmt::Debug for AbstractDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pc: {:?}, locals: {:?}, statics: {:?}, heap: {:?}",
            self.path_condition, self.locals, self.statics, self.heap
        )
    }
}

impl AbstractDomain {
    pub fn new(partition: Rc<AliasPartition>) -> Self {
        Self {
            path_condition: SymbolicValue::make_true(),
            locals: SymbolicDomain::default(),
            statics: SymbolicDomain::default(),
            statics_havocked: None,
            heap: Heap::new(partition),
        }
    }

    // A bottom domain means the fork is infeasible
    pub fn is_bottom(&self) -> bool {
        self.path_condition.as_bool_if_known() == Some(false)
    }

    pub fn local_value(&self, name: &Rc<String>) -> Option<Rc<SymbolicValue>> {
        self.locals.value_at(&Path::new_local(name)).cloned()
    }

    pub fn update_local(&mut self, name: &Rc<String>, value: Rc<SymbolicValue>) {
        debug!("Updating local {}, value: {:?}", name, value);
        self.heap.set_alias(name, &value);
        self.locals.update_value_at(Path::new_local(name), value);
    }

    pub fn static_value(&self, class_name: &Rc<String>, field_name: &Rc<String>, ty: ExpressionType) -> Rc<SymbolicValue> {
        let path = Path::new_static_field(class_name, field_name);
        if let Some(value) = self.statics.value_at(&path) {
            return value.clone();
        }
        match self.statics_havocked {
            Some(ordinal) => SymbolicValue::make_variable(Path::new_havocked(ordinal, &path), ty),
            None => SymbolicValue::make_variable(path, ty),
        }
    }

    pub fn update_static(&mut self, class_name: &Rc<String>, field_name: &Rc<String>, value: Rc<SymbolicValue>) {
        debug!("Updating static {}.{}, value: {:?}", class_name, field_name, value);
        self.statics
            .update_value_at(Path::new_static_field(class_name, field_name), value);
    }

    /// Forgets everything known about static fields.
    pub fn havoc_statics(&mut self, ordinal: usize) {
        self.statics.clear();
        self.statics_havocked = Some(ordinal);
    }

    pub fn assume(&mut self, condition: Rc<SymbolicValue>) {
        self.path_condition = self.path_condition.and(condition);
    }

    /// Merges two forks into one whose values choose between the forks by the conjuncts
    /// that tell their path conditions apart.
    pub fn join(&self, other: &Self) -> Self {
        let condition = distinguishing_condition(&self.path_condition, &other.path_condition);
        let mut statics = self.statics.join(&other.statics, &condition);
        let statics_havocked = self.statics_havocked.or(other.statics_havocked);
        // a static written on one side only holds its entry value on the other
        let one_sided: BTreeSet<&Rc<Path>> = self
            .statics
            .value_map
            .keys()
            .filter(|p| !other.statics.contains(p))
            .chain(
                other
                    .statics
                    .value_map
                    .keys()
                    .filter(|p| !self.statics.contains(p)),
            )
            .collect();
        for path in one_sided {
            if let PathEnum::StaticField {
                class_name,
                field_name,
            } = &path.value
            {
                let ty = match statics.value_at(path) {
                    Some(value) => value.value_type(),
                    None => continue,
                };
                let left = self.static_value(class_name, field_name, ty);
                let right = other.static_value(class_name, field_name, ty);
                statics.update_value_at(path.clone(), condition.conditional_expression(left, right));
            }
        }
        Self {
            path_condition: self.path_condition.or(other.path_condition.clone()),
            locals: self.locals.join(&other.locals, &condition),
            statics,
            statics_havocked,
            heap: self.heap.join(&other.heap, &condition),
        }
    }
}

/// Adds the conjuncts of `condition` to `result`.
pub fn conjuncts(condition: &Rc<SymbolicValue>, result: &mut Vec<Rc<SymbolicValue>>) {
    if let Expression::And { left, right } = &condition.expression {
        conjuncts(left, result);
        conjuncts(right, result);
    } else if condition.as_bool_if_known() != Some(true) {
        result.push(condition.clone());
    }
}

/// A condition that holds where `left` holds and fails where `right` holds, assuming the two
/// are disjoint. Conjuncts shared by both are dropped.
pub fn distinguishing_condition(left: &Rc<SymbolicValue>, right: &Rc<SymbolicValue>) -> Rc<SymbolicValue> {
    let mut left_parts = Vec::new();
    let mut right_parts = Vec::new();
    conjuncts(left, &mut left_parts);
    conjuncts(right, &mut right_parts);
    let own: Vec<Rc<SymbolicValue>> = left_parts
        .into_iter()
        .filter(|c| !right_parts.contains(c))
        .collect();
    own.into_iter()
        .fold(SymbolicValue::make_true(), |acc, c| acc.and(c))
}

/// One way a method can complete.
#[derive(Clone, Debug)]
pub struct ExitState {
    pub state: AbstractDomain,
    pub return_value: Option<Rc<SymbolicValue>>,
}
