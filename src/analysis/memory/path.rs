// This file is adapted from MIRAI (https://github.com/facebookexperimental/MIRAI)
// Original author: Herman Venter <hermanv@fb.com>
// Original copyright header:

// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.
//

use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Formatter, Result};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Represent a memory location as a path
#[derive(Clone, Eq, Ord, PartialOrd)]
pub struct Path {
    pub value: PathEnum,
    hash: u64,
}

impl Debug for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.value.fmt(f)
    }
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Path) -> bool {
        self.hash == other.hash && self.value == other.value
    }
}

impl From<PathEnum> for Path {
    fn from(value: PathEnum) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Path {
            value,
            hash: hasher.finish(),
        }
    }
}

/// A path represents a left hand side expression, or a value that flows into the method.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathEnum {
    /// The formal parameter at the given position, starting at 0.
    Parameter { ordinal: usize },

    /// The receiver of an instance method or constructor.
    This,

    /// A named local variable of the method being analyzed.
    LocalVariable { name: Rc<String> },

    /// A static field, the value it holds at method entry is an input.
    StaticField {
        class_name: Rc<String>,
        field_name: Rc<String>,
    },

    /// A value about which nothing is known besides its type, introduced by a fallback.
    Fresh { ordinal: usize },

    /// The number of iterations a summarized loop executed.
    LoopCounter { ordinal: usize },

    /// A local variable as seen at the head of a loop, before any particular iteration.
    LoopVariable { ordinal: usize, name: Rc<String> },

    /// The object at `original` after an unknown call may have changed it.
    Havocked { ordinal: usize, original: Rc<Path> },

    /// The qualifier denotes an object, the selector one of its fields.
    QualifiedPath {
        length: usize,
        qualifier: Rc<Path>,
        selector: Rc<PathSelector>,
    },
}

impl Debug for PathEnum {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PathEnum::Parameter { ordinal } => f.write_fmt(format_args!("param_{}", ordinal)),
            PathEnum::This => f.write_str("this"),
            PathEnum::LocalVariable { name } => f.write_str(name),
            PathEnum::StaticField {
                class_name,
                field_name,
            } => f.write_fmt(format_args!("{}.{}", class_name, field_name)),
            PathEnum::Fresh { ordinal } => f.write_fmt(format_args!("fresh_{}", ordinal)),
            PathEnum::LoopCounter { ordinal } => {
                f.write_fmt(format_args!("iterations_{}", ordinal))
            }
            PathEnum::LoopVariable { ordinal, name } => {
                f.write_fmt(format_args!("loop_{}.{}", ordinal, name))
            }
            PathEnum::Havocked { ordinal, original } => {
                f.write_fmt(format_args!("havoc_{}({:?})", ordinal, original))
            }
            PathEnum::QualifiedPath {
                qualifier,
                selector,
                ..
            } => f.write_fmt(format_args!("{:?}.{:?}", qualifier, selector)),
        }
    }
}

impl Path {
    pub fn new_parameter(ordinal: usize) -> Rc<Path> {
        Rc::new(PathEnum::Parameter { ordinal }.into())
    }

    pub fn new_this() -> Rc<Path> {
        Rc::new(PathEnum::This.into())
    }

    pub fn new_local(name: &Rc<String>) -> Rc<Path> {
        Rc::new(PathEnum::LocalVariable { name: name.clone() }.into())
    }

    pub fn new_static_field(class_name: &Rc<String>, field_name: &Rc<String>) -> Rc<Path> {
        Rc::new(
            PathEnum::StaticField {
                class_name: class_name.clone(),
                field_name: field_name.clone(),
            }
            .into(),
        )
    }

    pub fn new_fresh(ordinal: usize) -> Rc<Path> {
        Rc::new(PathEnum::Fresh { ordinal }.into())
    }

    pub fn new_loop_counter(ordinal: usize) -> Rc<Path> {
        Rc::new(PathEnum::LoopCounter { ordinal }.into())
    }

    pub fn new_loop_variable(ordinal: usize, name: &Rc<String>) -> Rc<Path> {
        Rc::new(
            PathEnum::LoopVariable {
                ordinal,
                name: name.clone(),
            }
            .into(),
        )
    }

    pub fn new_havocked(ordinal: usize, original: &Rc<Path>) -> Rc<Path> {
        Rc::new(
            PathEnum::Havocked {
                ordinal,
                original: original.clone(),
            }
            .into(),
        )
    }

    /// Creates a path to the field of the object denoted by the qualifier.
    pub fn new_field(qualifier: Rc<Path>, field_name: &Rc<String>) -> Rc<Path> {
        let selector = Rc::new(PathSelector::Field(field_name.clone()));
        Self::new_qualified(qualifier, selector)
    }

    pub fn new_qualified(qualifier: Rc<Path>, selector: Rc<PathSelector>) -> Rc<Path> {
        let length = qualifier.path_length() + 1;
        Rc::new(
            PathEnum::QualifiedPath {
                length,
                qualifier,
                selector,
            }
            .into(),
        )
    }

    /// Returns the length of the path.
    pub fn path_length(&self) -> usize {
        match &self.value {
            PathEnum::QualifiedPath { length, .. } => *length,
            _ => 1,
        }
    }

    /// The unqualified path this path is built on.
    pub fn root(&self) -> &Path {
        match &self.value {
            PathEnum::QualifiedPath { qualifier, .. } => qualifier.root(),
            _ => self,
        }
    }

    /// True if the value at this path at method entry is an input of the method:
    /// parameters, the receiver, static fields and anything reached through them.
    pub fn is_input(&self) -> bool {
        matches!(
            self.root().value,
            PathEnum::Parameter { .. } | PathEnum::This | PathEnum::StaticField { .. }
        )
    }

    /// True if the root of this path was numbered by the analysis of one method body and
    /// has to be renumbered when that body's results are transferred to a caller.
    pub fn is_method_local(&self) -> bool {
        matches!(
            self.root().value,
            PathEnum::Fresh { .. }
                | PathEnum::LoopCounter { .. }
                | PathEnum::LoopVariable { .. }
                | PathEnum::Havocked { .. }
        )
    }

    /// Shifts the ordinals of fresh, loop and havoc roots by `offset`.
    pub fn relocate(path: &Rc<Path>, offset: usize) -> Rc<Path> {
        match &path.value {
            PathEnum::Fresh { ordinal } => Path::new_fresh(ordinal + offset),
            PathEnum::LoopCounter { ordinal } => Path::new_loop_counter(ordinal + offset),
            PathEnum::LoopVariable { ordinal, name } => {
                Path::new_loop_variable(ordinal + offset, name)
            }
            PathEnum::Havocked { ordinal, original } => Path::new_havocked(ordinal + offset, original),
            PathEnum::QualifiedPath {
                qualifier,
                selector,
                ..
            } => Path::new_qualified(Path::relocate(qualifier, offset), selector.clone()),
            _ => path.clone(),
        }
    }

    /// The field selected by this path, if it is a qualified path.
    pub fn field_name(&self) -> Option<&Rc<String>> {
        match &self.value {
            PathEnum::QualifiedPath { selector, .. } => match selector.as_ref() {
                PathSelector::Field(name) => Some(name),
            },
            _ => None,
        }
    }

    pub fn qualifier(&self) -> Option<&Rc<Path>> {
        match &self.value {
            PathEnum::QualifiedPath { qualifier, .. } => Some(qualifier),
            _ => None,
        }
    }

    /// True if `self` is `root` or is a path reached through `root`.
    pub fn is_rooted_by(&self, root: &Path) -> bool {
        if self == root {
            return true;
        }
        match &self.value {
            PathEnum::QualifiedPath { qualifier, .. } => qualifier.is_rooted_by(root),
            _ => false,
        }
    }
}

/// The selector denotes a de-referenced item, field, or element, or slice.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathSelector {
    /// Select the struct field with the given name.
    Field(Rc<String>),
}

impl Debug for PathSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PathSelector::Field(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocate_only_touches_method_local_roots() {
        let x = Rc::new(String::from("x"));
        let fresh_field = Path::new_field(Path::new_fresh(2), &x);
        let relocated = Path::relocate(&fresh_field, 10);
        assert_eq!(relocated, Path::new_field(Path::new_fresh(12), &x));

        let param_field = Path::new_field(Path::new_parameter(0), &x);
        assert_eq!(Path::relocate(&param_field, 10), param_field);
    }

    #[test]
    fn test_inputs_and_lengths() {
        let x = Rc::new(String::from("x"));
        let nested = Path::new_field(Path::new_field(Path::new_this(), &x), &x);
        assert_eq!(nested.path_length(), 3);
        assert!(nested.is_input());
        assert!(nested.is_rooted_by(&Path::new_this()));
        assert!(!Path::new_local(&x).is_input());
        assert_eq!(format!("{:?}", nested), "this.x.x");
    }
}
