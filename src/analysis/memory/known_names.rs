// This file is adapted from MIRAI (https://github.com/facebookexperimental/MIRAI)
// Original author: Herman Venter <hermanv@fb.com>
// Original copyright header:

// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::rc::Rc;

/// Well known library methods that are expanded into expression trees instead of being
/// treated as calls with unknown effects.
#[derive(Clone, Copy, Debug, Eq, PartialOrd, PartialEq, Hash, Ord)]
pub enum KnownNames {
    /// This is not a known name
    None,
    MathAbs,
    MathMax,
    MathMin,
    IntegerSignum,
    LongSignum,
}

impl KnownNames {
    /// The number of arguments the method takes.
    pub fn arity(self) -> usize {
        match self {
            KnownNames::None => 0,
            KnownNames::MathAbs | KnownNames::IntegerSignum | KnownNames::LongSignum => 1,
            KnownNames::MathMax | KnownNames::MathMin => 2,
        }
    }
}

lazy_static! {
    static ref LIBRARY_METHODS: HashMap<&'static str, KnownNames> = {
        let mut map = HashMap::new();
        map.insert("Math.abs", KnownNames::MathAbs);
        map.insert("Math.max", KnownNames::MathMax);
        map.insert("Math.min", KnownNames::MathMin);
        map.insert("StrictMath.abs", KnownNames::MathAbs);
        map.insert("StrictMath.max", KnownNames::MathMax);
        map.insert("StrictMath.min", KnownNames::MathMin);
        map.insert("Integer.signum", KnownNames::IntegerSignum);
        map.insert("Long.signum", KnownNames::LongSignum);
        map
    };
}

/// An analysis lifetime cache that contains a map from library method names to known names.
#[derive(Default)]
pub struct KnownNamesCache {
    name_cache: HashMap<Rc<String>, KnownNames>,
}

impl KnownNamesCache {
    /// Get the well known name for the given method name and cache the association.
    /// Names may be qualified with `java.lang.`. If the name does not denote a well
    /// known method, this returns KnownNames::None.
    pub fn get(&mut self, name: &Rc<String>) -> KnownNames {
        *self
            .name_cache
            .entry(name.clone())
            .or_insert_with(|| Self::get_known_name_for(name))
    }

    fn get_known_name_for(name: &str) -> KnownNames {
        let unqualified = name.strip_prefix("java.lang.").unwrap_or(name);
        LIBRARY_METHODS
            .get(unqualified)
            .copied()
            .unwrap_or(KnownNames::None)
    }
}
