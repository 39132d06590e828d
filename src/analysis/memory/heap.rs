use crate::analysis::memory::expression::{Expression, ExpressionType};
use crate::analysis::memory::path::{Path, PathEnum};
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// The identity of an abstract object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKey {
    /// Created by the evaluation of a `new` expression with this abstract address.
    Allocated(usize),
    /// Reached through an input reference. The path is the representative of its alias class.
    Input(Rc<Path>),
}

/// One object a reference value may denote, and the condition under which it does.
/// `key` is `None` for `null` and for references about which nothing is known.
#[derive(Clone, Debug)]
pub struct Target {
    pub guard: Rc<SymbolicValue>,
    pub value: Rc<SymbolicValue>,
    pub key: Option<ObjectKey>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AbstractObject {
    pub class_name: Option<Rc<String>>,
    /// Fields written so far. Unwritten fields of input objects hold their entry value.
    pub fields: BTreeMap<Rc<String>, Rc<SymbolicValue>>,
    /// Locals currently known to denote this object.
    pub aliases: BTreeSet<Rc<String>>,
    /// Set once an unknown call may have changed the object: unwritten fields are then read
    /// relative to this path instead of the object's own.
    pub havoc_base: Option<Rc<Path>>,
}

/// Must-alias classes of input reference paths. Paths that are not mentioned are their own
/// class; the representative of a class is its smallest path. Paths in different classes may
/// still denote the same object unless they are recorded as distinct.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasPartition {
    representatives: BTreeMap<Rc<Path>, Rc<Path>>,
    distinct: BTreeSet<(Rc<Path>, Rc<Path>)>,
}

impl AliasPartition {
    pub fn new() -> Self {
        AliasPartition::default()
    }

    pub fn representative(&self, path: &Rc<Path>) -> Rc<Path> {
        let mut current = path.clone();
        while let Some(next) = self.representatives.get(&current) {
            if *next == current {
                break;
            }
            current = next.clone();
        }
        current
    }

    pub fn union(&mut self, a: &Rc<Path>, b: &Rc<Path>) {
        let ra = self.representative(a);
        let rb = self.representative(b);
        if ra == rb {
            return;
        }
        let (small, large) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.representatives.insert(large, small);
    }

    pub fn same_class(&self, a: &Rc<Path>, b: &Rc<Path>) -> bool {
        self.representative(a) == self.representative(b)
    }

    /// Records that the two paths never denote the same object, e.g. because their declared
    /// classes are unrelated.
    pub fn mark_distinct(&mut self, a: &Rc<Path>, b: &Rc<Path>) {
        let pair = if a < b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
        self.distinct.insert(pair);
    }

    /// False only if the paths are known to denote different objects.
    pub fn may_alias(&self, a: &Rc<Path>, b: &Rc<Path>) -> bool {
        let ra = self.representative(a);
        let rb = self.representative(b);
        if ra == rb {
            return true;
        }
        let pair = if ra < rb { (ra, rb) } else { (rb, ra) };
        !self.distinct.contains(&pair)
    }

    pub fn is_trivial(&self) -> bool {
        self.representatives.is_empty()
    }

    /// A canonical listing of the non-trivial classes, usable as a cache key.
    pub fn key(&self) -> Vec<(Rc<Path>, Rc<Path>)> {
        self.representatives
            .keys()
            .map(|path| (path.clone(), self.representative(path)))
            .collect()
    }
}

#[derive(Clone, PartialEq)]
pub struct Heap {
    pub objects: BTreeMap<ObjectKey, AbstractObject>,
    pub partition: Rc<AliasPartition>,
    /// Input paths whose whole reachable object graph was havocked, with the havoc ordinal.
    havocked_roots: BTreeMap<Rc<Path>, usize>,
    /// Set when everything reachable from static fields was havocked.
    static_roots_havocked: Option<usize>,
    /// Input objects that were read or written.
    touched: BTreeSet<Rc<Path>>,
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.objects.iter().map(|(k, o)| (k, &o.fields)))
            .finish()
    }
}

impl Heap {
    pub fn new(partition: Rc<AliasPartition>) -> Self {
        Heap {
            objects: BTreeMap::new(),
            partition,
            havocked_roots: BTreeMap::new(),
            static_roots_havocked: None,
            touched: BTreeSet::new(),
        }
    }

    pub fn havocked_roots(&self) -> &BTreeMap<Rc<Path>, usize> {
        &self.havocked_roots
    }

    pub fn static_roots_havocked(&self) -> Option<usize> {
        self.static_roots_havocked
    }

    pub fn touched(&self) -> &BTreeSet<Rc<Path>> {
        &self.touched
    }

    pub fn mark_touched(&mut self, path: Rc<Path>) {
        self.touched.insert(path);
    }

    /// The object denoted by a reference that is not a choice between several references.
    pub fn key_of(&self, value: &Rc<SymbolicValue>) -> Option<ObjectKey> {
        match &value.expression {
            Expression::HeapBlock { abstract_address } => Some(ObjectKey::Allocated(*abstract_address)),
            Expression::Variable {
                path,
                var_type: ExpressionType::Reference,
            } => Some(ObjectKey::Input(self.partition.representative(path))),
            _ => None,
        }
    }

    /// Splits a reference value into the objects it may denote.
    pub fn targets(&self, value: &Rc<SymbolicValue>) -> Vec<Target> {
        let mut result = Vec::new();
        self.collect_targets(value, SymbolicValue::make_true(), &mut result);
        result
    }

    fn collect_targets(&self, value: &Rc<SymbolicValue>, guard: Rc<SymbolicValue>, result: &mut Vec<Target>) {
        match &value.expression {
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => {
                self.collect_targets(consequent, guard.and(condition.clone()), result);
                self.collect_targets(alternate, guard.and(condition.logical_not()), result);
            }
            Expression::Union { branches, .. } => {
                for (condition, branch) in branches {
                    self.collect_targets(branch, guard.and(condition.clone()), result);
                }
            }
            _ => {
                if guard.as_bool_if_known() == Some(false) {
                    return;
                }
                result.push(Target {
                    guard,
                    value: value.clone(),
                    key: self.key_of(value),
                });
            }
        }
    }

    pub fn class_of(&self, key: &ObjectKey) -> Option<Rc<String>> {
        self.objects.get(key).and_then(|o| o.class_name.clone())
    }

    pub fn allocate(
        &mut self,
        abstract_address: usize,
        class_name: Rc<String>,
        fields: BTreeMap<Rc<String>, Rc<SymbolicValue>>,
    ) -> Rc<SymbolicValue> {
        self.objects.insert(
            ObjectKey::Allocated(abstract_address),
            AbstractObject {
                class_name: Some(class_name),
                fields,
                ..AbstractObject::default()
            },
        );
        SymbolicValue::make_heap_block(abstract_address)
    }

    /// The base of an input object that has no entry yet. The most recent havoc that covers
    /// the path wins.
    fn input_base(&self, path: &Rc<Path>) -> Rc<Path> {
        let mut latest = self
            .havocked_roots
            .iter()
            .filter(|(root, _)| path.is_rooted_by(root))
            .map(|(_, ordinal)| *ordinal)
            .max();
        if let (Some(ordinal), PathEnum::StaticField { .. }) = (self.static_roots_havocked, &path.root().value) {
            latest = latest.max(Some(ordinal));
        }
        match latest {
            Some(ordinal) => Path::new_havocked(ordinal, path),
            None => path.clone(),
        }
    }

    /// The path relative to which unwritten fields of the object are read.
    fn field_base(&self, key: &ObjectKey) -> Option<Rc<Path>> {
        let object = self.objects.get(key);
        if let Some(base) = object.and_then(|o| o.havoc_base.as_ref()) {
            return Some(base.clone());
        }
        match key {
            ObjectKey::Allocated(..) => None,
            ObjectKey::Input(path) if object.is_some() => Some(path.clone()),
            ObjectKey::Input(path) => Some(self.input_base(path)),
        }
    }

    /// The current value of a field of a single object, `None` if the object does not have it.
    /// An input object that does not hold the field sees it through every other input object
    /// that holds it, or was havocked, when the two are the same object.
    pub fn read_field_of(&self, key: &ObjectKey, field: &Rc<String>, ty: ExpressionType) -> Option<Rc<SymbolicValue>> {
        if let Some(value) = self.objects.get(key).and_then(|o| o.fields.get(field)) {
            return Some(value.clone());
        }
        let base = self.field_base(key)?;
        let mut value = SymbolicValue::make_variable(Path::new_field(base, field), ty);
        if let ObjectKey::Input(path) = key {
            for other in self.possible_aliases(path) {
                let object = match self.objects.get(&ObjectKey::Input(other.clone())) {
                    Some(object) => object,
                    None => continue,
                };
                let seen = match (object.fields.get(field), &object.havoc_base) {
                    (Some(held), _) if held.value_type() == ty => held.clone(),
                    (Some(..), _) => continue,
                    (None, Some(havoc_base)) => {
                        SymbolicValue::make_variable(Path::new_field(havoc_base.clone(), field), ty)
                    }
                    (None, None) => continue,
                };
                value = same_object(&other, path).conditional_expression(seen, value);
            }
        }
        Some(value)
    }

    /// The other input objects with an entry that may be the object at `path`.
    fn possible_aliases(&self, path: &Rc<Path>) -> Vec<Rc<Path>> {
        self.objects
            .keys()
            .filter_map(|key| match key {
                ObjectKey::Input(other) if other != path && self.partition.may_alias(path, other) => {
                    Some(other.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// The value of `reference.field`. Reading through `null` or an unknown reference gives a
    /// fresh value. `None` if an allocated target has no such field.
    pub fn read_field(
        &mut self,
        reference: &Rc<SymbolicValue>,
        field: &Rc<String>,
        ty: ExpressionType,
        fresh: &mut usize,
    ) -> Option<Rc<SymbolicValue>> {
        let targets = self.targets(reference);
        let mut branches = Vec::with_capacity(targets.len());
        for target in targets {
            let value = match &target.key {
                Some(key) => {
                    if let ObjectKey::Input(path) = key {
                        self.touched.insert(path.clone());
                    }
                    self.read_field_of(key, field, ty)?
                }
                None => {
                    let value = SymbolicValue::make_variable(Path::new_fresh(*fresh), ty);
                    *fresh += 1;
                    value
                }
            };
            branches.push((target.guard, value));
        }
        Some(SymbolicValue::make_union(branches, ty))
    }

    /// `reference.field = value`. Objects that are only possibly denoted keep their old value
    /// under the complementary condition.
    pub fn write_field(&mut self, reference: &Rc<SymbolicValue>, field: &Rc<String>, value: &Rc<SymbolicValue>) {
        let mut groups: Vec<(ObjectKey, Rc<SymbolicValue>)> = Vec::new();
        for target in self.targets(reference) {
            if let Some(key) = target.key {
                if let Some(group) = groups.iter_mut().find(|(k, _)| *k == key) {
                    group.1 = group.1.or(target.guard);
                } else {
                    groups.push((key, target.guard));
                }
            }
        }
        for (key, guard) in groups {
            if let ObjectKey::Input(path) = &key {
                // other input objects see the write where they are the written object
                for other in self.possible_aliases(path) {
                    let other_key = ObjectKey::Input(other.clone());
                    let same_type = self
                        .objects
                        .get(&other_key)
                        .and_then(|o| o.fields.get(field))
                        .map_or(true, |held| held.value_type() == value.value_type());
                    if !same_type {
                        continue;
                    }
                    if let Some(old) = self.read_field_of(&other_key, field, value.value_type()) {
                        let condition = same_object(path, &other).and(guard.clone());
                        let new_value = condition.conditional_expression(value.clone(), old);
                        debug!("{:?}.{} := {:?}", other_key, field, new_value);
                        if let Some(object) = self.objects.get_mut(&other_key) {
                            object.fields.insert(field.clone(), new_value);
                        }
                    }
                }
            }
            self.materialize(&key);
            let new_value = if guard.as_bool_if_known() == Some(true) {
                value.clone()
            } else {
                match self.read_field_of(&key, field, value.value_type()) {
                    Some(old) => guard.conditional_expression(value.clone(), old),
                    None => value.clone(),
                }
            };
            debug!("{:?}.{} := {:?}", key, field, new_value);
            if let Some(object) = self.objects.get_mut(&key) {
                object.fields.insert(field.clone(), new_value);
            }
        }
    }

    /// Makes sure an input object has an entry, so that it can be written.
    pub fn materialize(&mut self, key: &ObjectKey) {
        if self.objects.contains_key(key) {
            return;
        }
        let havoc_base = match key {
            ObjectKey::Input(path) => {
                self.touched.insert(path.clone());
                let base = self.input_base(path);
                if base == *path {
                    None
                } else {
                    Some(base)
                }
            }
            ObjectKey::Allocated(..) => None,
        };
        self.objects.insert(
            key.clone(),
            AbstractObject {
                havoc_base,
                ..AbstractObject::default()
            },
        );
    }

    /// Forgets everything known about the fields of one object. Fields held by input objects
    /// that may be the same object become unknown where they are.
    pub fn havoc_object(&mut self, key: &ObjectKey, base: Rc<Path>) {
        self.materialize(key);
        if let ObjectKey::Input(path) = key {
            for other in self.possible_aliases(path) {
                let other_key = ObjectKey::Input(other.clone());
                let held: Vec<(Rc<String>, Rc<SymbolicValue>)> = match self.objects.get(&other_key) {
                    Some(object) => object.fields.iter().map(|(f, v)| (f.clone(), v.clone())).collect(),
                    None => continue,
                };
                let condition = same_object(path, &other);
                for (field, old) in held {
                    let unknown = SymbolicValue::make_variable(Path::new_field(base.clone(), &field), old.value_type());
                    let new_value = condition.conditional_expression(unknown, old);
                    if let Some(object) = self.objects.get_mut(&other_key) {
                        object.fields.insert(field, new_value);
                    }
                }
            }
        }
        if let Some(object) = self.objects.get_mut(key) {
            object.fields.clear();
            object.havoc_base = Some(base);
        }
    }

    /// Forgets everything known about the objects reachable from the input path `root`.
    pub fn havoc_root(&mut self, root: &Rc<Path>, ordinal: usize) {
        self.havocked_roots.insert(root.clone(), ordinal);
        self.materialize(&ObjectKey::Input(root.clone()));
        let rooted: Vec<Rc<Path>> = self
            .objects
            .keys()
            .filter_map(|key| match key {
                ObjectKey::Input(path) if path.is_rooted_by(root) => Some(path.clone()),
                _ => None,
            })
            .collect();
        for path in rooted {
            let base = Path::new_havocked(ordinal, &path);
            self.havoc_object(&ObjectKey::Input(path), base);
        }
    }

    /// Forgets everything known about the objects reachable from static fields.
    pub fn havoc_static_roots(&mut self, ordinal: usize) {
        self.static_roots_havocked = Some(ordinal);
        let rooted: Vec<Rc<Path>> = self
            .objects
            .keys()
            .filter_map(|key| match key {
                ObjectKey::Input(path) if matches!(path.root().value, PathEnum::StaticField { .. }) => {
                    Some(path.clone())
                }
                _ => None,
            })
            .collect();
        for path in rooted {
            let base = Path::new_havocked(ordinal, &path);
            self.havoc_object(&ObjectKey::Input(path), base);
        }
    }

    /// The objects that may be reached from the given references through reference fields.
    pub fn reachable(&self, roots: &[Rc<SymbolicValue>]) -> BTreeSet<ObjectKey> {
        let mut result = BTreeSet::new();
        let mut pending: Vec<Rc<SymbolicValue>> = roots.to_vec();
        while let Some(value) = pending.pop() {
            for target in self.targets(&value) {
                if let Some(key) = target.key {
                    if !result.insert(key.clone()) {
                        continue;
                    }
                    if let Some(object) = self.objects.get(&key) {
                        pending.extend(
                            object
                                .fields
                                .values()
                                .filter(|v| v.value_type() == ExpressionType::Reference)
                                .cloned(),
                        );
                    }
                }
            }
        }
        result
    }

    /// Records that the local `name` now holds `value`.
    pub fn set_alias(&mut self, name: &Rc<String>, value: &Rc<SymbolicValue>) {
        for object in self.objects.values_mut() {
            object.aliases.remove(name);
        }
        if value.value_type() != ExpressionType::Reference {
            return;
        }
        let targets = self.targets(value);
        if let [target] = targets.as_slice() {
            if let Some(object) = target.key.as_ref().and_then(|k| self.objects.get_mut(k)) {
                object.aliases.insert(name.clone());
            }
        }
    }

    /// The heap that is `self` where `condition` holds and `other` elsewhere.
    pub fn join(&self, other: &Heap, condition: &Rc<SymbolicValue>) -> Heap {
        let mut result = self.clone();
        result.touched.extend(other.touched.iter().cloned());
        for (root, ordinal) in &other.havocked_roots {
            let entry = result.havocked_roots.entry(root.clone()).or_insert(*ordinal);
            *entry = (*entry).max(*ordinal);
        }
        result.static_roots_havocked = self.static_roots_havocked.max(other.static_roots_havocked);
        let keys: BTreeSet<&ObjectKey> = self.objects.keys().chain(other.objects.keys()).collect();
        for key in keys {
            let merged = match (self.objects.get(key), other.objects.get(key), key) {
                (Some(object), None, ObjectKey::Allocated(..)) | (None, Some(object), ObjectKey::Allocated(..)) => {
                    object.clone()
                }
                (left, right, _) => self.join_object(other, key, left, right, condition),
            };
            result.objects.insert(key.clone(), merged);
        }
        result
    }

    fn join_object(
        &self,
        other: &Heap,
        key: &ObjectKey,
        left: Option<&AbstractObject>,
        right: Option<&AbstractObject>,
        condition: &Rc<SymbolicValue>,
    ) -> AbstractObject {
        let natural = match key {
            ObjectKey::Input(path) => Some(path.clone()),
            ObjectKey::Allocated(..) => None,
        };
        let left_base = self.field_base(key);
        let right_base = other.field_base(key);
        let havoc_base = if left_base != natural {
            left_base
        } else if right_base != natural {
            right_base
        } else {
            None
        };
        let mut merged = AbstractObject {
            class_name: left.or(right).and_then(|o| o.class_name.clone()),
            havoc_base,
            ..AbstractObject::default()
        };
        for object in left.iter().chain(right.iter()) {
            merged.aliases.extend(object.aliases.iter().cloned());
        }
        let typed_fields: BTreeMap<&Rc<String>, ExpressionType> = left
            .iter()
            .chain(right.iter())
            .flat_map(|o| o.fields.iter().map(|(f, v)| (f, v.value_type())))
            .collect();
        for (field, ty) in typed_fields {
            let value = match (self.read_field_of(key, field, ty), other.read_field_of(key, field, ty)) {
                (Some(l), Some(r)) => condition.conditional_expression(l, r),
                (Some(v), None) | (None, Some(v)) => v,
                (None, None) => continue,
            };
            merged.fields.insert(field.clone(), value);
        }
        merged
    }
}

/// `a == b` for two input reference paths, the smaller path on the left.
fn same_object(a: &Rc<Path>, b: &Rc<Path>) -> Rc<SymbolicValue> {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    SymbolicValue::make_variable(a.clone(), ExpressionType::Reference)
        .equals(SymbolicValue::make_variable(b.clone(), ExpressionType::Reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::memory::expression::ExpressionType::*;

    fn name(s: &str) -> Rc<String> {
        Rc::new(s.to_string())
    }

    fn heap() -> Heap {
        Heap::new(Rc::new(AliasPartition::new()))
    }

    #[test]
    fn test_write_through_alias_is_visible() {
        let mut heap = heap();
        let mut fresh = 0;
        let a = SymbolicValue::make_variable(Path::new_parameter(0), Reference);
        let b = a.clone();
        let v = SymbolicValue::make_int(7, I32);
        heap.write_field(&b, &name("f"), &v);
        assert_eq!(heap.read_field(&a, &name("f"), I32, &mut fresh), Some(v));
        assert_eq!(fresh, 0);
    }

    #[test]
    fn test_unwritten_input_field_is_its_entry_value() {
        let mut heap = heap();
        let mut fresh = 0;
        let p = SymbolicValue::make_variable(Path::new_parameter(1), Reference);
        let read = heap.read_field(&p, &name("x"), I16, &mut fresh).expect("input field");
        assert_eq!(
            read,
            SymbolicValue::make_variable(Path::new_field(Path::new_parameter(1), &name("x")), I16)
        );
        assert!(heap.touched().contains(&Path::new_parameter(1)));
    }

    #[test]
    fn test_conditional_write() {
        let mut heap = heap();
        let mut fresh = 0;
        let c = SymbolicValue::make_variable(Path::new_parameter(0), Bool);
        let a = heap.allocate(0, name("A"), BTreeMap::new());
        let b = heap.allocate(1, name("A"), BTreeMap::new());
        let zero = SymbolicValue::make_int(0, I32);
        let one = SymbolicValue::make_int(1, I32);
        heap.write_field(&a, &name("f"), &zero);
        heap.write_field(&b, &name("f"), &zero);
        heap.write_field(&c.conditional_expression(a.clone(), b.clone()), &name("f"), &one);
        assert_eq!(
            heap.read_field(&a, &name("f"), I32, &mut fresh),
            Some(c.conditional_expression(one.clone(), zero.clone()))
        );
        assert_eq!(
            heap.read_field(&b, &name("f"), I32, &mut fresh),
            Some(c.conditional_expression(zero, one))
        );
    }

    #[test]
    fn test_conditional_write_to_one_object_is_strong() {
        let mut heap = heap();
        let c = SymbolicValue::make_variable(Path::new_parameter(0), Bool);
        let a = heap.allocate(0, name("A"), BTreeMap::new());
        let one = SymbolicValue::make_int(1, I32);
        heap.write_field(&c.conditional_expression(a.clone(), a.clone()), &name("f"), &one);
        let key = ObjectKey::Allocated(0);
        assert_eq!(heap.read_field_of(&key, &name("f"), I32), Some(one));
    }

    #[test]
    fn test_partition_merges_input_objects() {
        let mut partition = AliasPartition::new();
        partition.union(&Path::new_parameter(1), &Path::new_parameter(0));
        assert_eq!(partition.representative(&Path::new_parameter(1)), Path::new_parameter(0));
        let mut heap = Heap::new(Rc::new(partition));
        let mut fresh = 0;
        let p0 = SymbolicValue::make_variable(Path::new_parameter(0), Reference);
        let p1 = SymbolicValue::make_variable(Path::new_parameter(1), Reference);
        let v = SymbolicValue::make_int(3, I32);
        heap.write_field(&p1, &name("f"), &v);
        assert_eq!(heap.read_field(&p0, &name("f"), I32, &mut fresh), Some(v));
    }

    #[test]
    fn test_havoc_root_reaches_unmaterialized_objects() {
        let mut heap = heap();
        let mut fresh = 0;
        let next = Path::new_field(Path::new_parameter(0), &name("next"));
        heap.havoc_root(&Path::new_parameter(0), 4);
        let q = SymbolicValue::make_variable(next.clone(), Reference);
        let read = heap.read_field(&q, &name("x"), I32, &mut fresh).expect("input field");
        let havocked = |path: &Rc<Path>| {
            SymbolicValue::make_variable(Path::new_field(Path::new_havocked(4, path), &name("x")), I32)
        };
        // `p0.next` may be `p0` itself
        let root = Path::new_parameter(0);
        assert_eq!(
            read,
            same_object(&root, &next).conditional_expression(havocked(&root), havocked(&next))
        );
    }

    #[test]
    fn test_write_reaches_possible_aliases() {
        let mut heap = heap();
        let mut fresh = 0;
        let (p0, p1) = (Path::new_parameter(0), Path::new_parameter(1));
        let a = SymbolicValue::make_variable(p0.clone(), Reference);
        let b = SymbolicValue::make_variable(p1.clone(), Reference);
        let one = SymbolicValue::make_int(1, I32);
        let two = SymbolicValue::make_int(2, I32);
        heap.write_field(&a, &name("v"), &one);
        // `b` has no entry yet and sees the write where it is `a`
        let entry_b = SymbolicValue::make_variable(Path::new_field(p1.clone(), &name("v")), I32);
        assert_eq!(
            heap.read_field(&b, &name("v"), I32, &mut fresh),
            Some(same_object(&p0, &p1).conditional_expression(one.clone(), entry_b))
        );
        heap.write_field(&b, &name("v"), &two);
        assert_eq!(heap.read_field(&b, &name("v"), I32, &mut fresh), Some(two.clone()));
        assert_eq!(
            heap.read_field(&a, &name("v"), I32, &mut fresh),
            Some(same_object(&p1, &p0).conditional_expression(two, one))
        );
    }

    #[test]
    fn test_distinct_inputs_do_not_see_each_other() {
        let mut partition = AliasPartition::new();
        let (p0, p1) = (Path::new_parameter(0), Path::new_parameter(1));
        partition.mark_distinct(&p1, &p0);
        assert!(!partition.may_alias(&p0, &p1));
        let mut heap = Heap::new(Rc::new(partition));
        let mut fresh = 0;
        let a = SymbolicValue::make_variable(p0, Reference);
        let b = SymbolicValue::make_variable(p1.clone(), Reference);
        heap.write_field(&a, &name("v"), &SymbolicValue::make_int(1, I32));
        assert_eq!(
            heap.read_field(&b, &name("v"), I32, &mut fresh),
            Some(SymbolicValue::make_variable(Path::new_field(p1, &name("v")), I32))
        );
    }

    #[test]
    fn test_havoc_reaches_fields_of_possible_aliases() {
        let mut heap = heap();
        let mut fresh = 0;
        let (p0, p1) = (Path::new_parameter(0), Path::new_parameter(1));
        let b = SymbolicValue::make_variable(p1.clone(), Reference);
        let one = SymbolicValue::make_int(1, I32);
        heap.write_field(&b, &name("v"), &one);
        heap.havoc_root(&p0, 3);
        let unknown = SymbolicValue::make_variable(Path::new_field(Path::new_havocked(3, &p0), &name("v")), I32);
        assert_eq!(
            heap.read_field(&b, &name("v"), I32, &mut fresh),
            Some(same_object(&p0, &p1).conditional_expression(unknown, one))
        );
    }

    #[test]
    fn test_join_keeps_one_sided_writes_conditional() {
        let base = heap();
        let c = SymbolicValue::make_variable(Path::new_parameter(1), Bool);
        let p = SymbolicValue::make_variable(Path::new_parameter(0), Reference);
        let mut left = base.clone();
        left.write_field(&p, &name("x"), &SymbolicValue::make_int(5, I32));
        let joined = left.join(&base, &c);
        let key = ObjectKey::Input(Path::new_parameter(0));
        let entry = SymbolicValue::make_variable(Path::new_field(Path::new_parameter(0), &name("x")), I32);
        assert_eq!(
            joined.read_field_of(&key, &name("x"), I32),
            Some(c.conditional_expression(SymbolicValue::make_int(5, I32), entry))
        );
    }
}
