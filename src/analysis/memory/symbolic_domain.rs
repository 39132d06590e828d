use crate::analysis::memory::path::Path;
use crate::analysis::memory::symbolic_value::{SymbolicValue, SymbolicValueTrait};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A map from storage locations to the symbolic values they hold.
#[derive(Clone, Default, PartialEq)]
pub struct SymbolicDomain {
    pub value_map: BTreeMap<Rc<Path>, Rc<SymbolicValue>>,
}

impl SymbolicDomain {
    pub fn get_paths_iter(&self) -> Vec<Rc<Path>> {
        self.value_map.keys().cloned().collect()
    }

    pub fn value_at(&self, path: &Rc<Path>) -> Option<&Rc<SymbolicValue>> {
        self.value_map.get(path)
    }

    pub fn update_value_at(&mut self, path: Rc<Path>, value: Rc<SymbolicValue>) {
        self.value_map.insert(path, value);
    }

    pub fn contains(&self, path: &Rc<Path>) -> bool {
        self.value_map.contains_key(path)
    }

    pub fn size(&self) -> usize {
        self.value_map.len()
    }

    pub fn forget(&mut self, path: &Rc<Path>) {
        self.value_map.remove(path);
    }

    pub fn clear(&mut self) {
        self.value_map.clear();
    }

    /// The domain that is `self` where `condition` holds and `other` elsewhere. A path bound on
    /// one side only keeps its value.
    pub fn join(&self, other: &Self, condition: &Rc<SymbolicValue>) -> Self {
        let mut result = other.value_map.clone();
        for (path, val1) in self.value_map.iter() {
            match other.value_map.get(path) {
                Some(val2) if val1 != val2 => {
                    result.insert(
                        path.clone(),
                        condition.conditional_expression(val1.clone(), val2.clone()),
                    );
                }
                Some(_) => (),
                None => {
                    result.insert(path.clone(), val1.clone());
                }
            }
        }
        Self { value_map: result }
    }
}

impl fmt::Debug for SymbolicDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::memory::expression::ExpressionType;

    #[test]
    fn test_join() {
        let x = Path::new_local(&Rc::new("x".to_string()));
        let y = Path::new_local(&Rc::new("y".to_string()));
        let c = SymbolicValue::make_variable(Path::new_parameter(0), ExpressionType::Bool);
        let one = SymbolicValue::make_int(1, ExpressionType::I32);
        let two = SymbolicValue::make_int(2, ExpressionType::I32);

        let mut left = SymbolicDomain::default();
        left.update_value_at(x.clone(), one.clone());
        left.update_value_at(y.clone(), one.clone());
        let mut right = SymbolicDomain::default();
        right.update_value_at(x.clone(), two.clone());
        right.update_value_at(y.clone(), one.clone());

        let joined = left.join(&right, &c);
        assert_eq!(joined.value_at(&y), Some(&one));
        assert_eq!(joined.value_at(&x), Some(&c.conditional_expression(one, two)));
        assert_eq!(joined.size(), 2);
    }
}
