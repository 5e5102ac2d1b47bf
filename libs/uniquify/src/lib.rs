//! A library for assigning unique names.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

/// A set of unique names.
///
/// Each key of type `K` is assigned a unique name. Names are drawn from a
/// base name by appending `_1`, `_2`, ... until an unused candidate is found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Names<K: Hash + Eq> {
    names: HashSet<ArcStr>,
    assignments: HashMap<K, ArcStr>,
}

impl<K: Hash + Eq> Default for Names<K> {
    fn default() -> Self {
        Self {
            names: HashSet::new(),
            assignments: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq> Names<K> {
    /// Creates a new, empty name set.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the name associated with this key, if it exists.
    pub fn name(&self, id: &K) -> Option<ArcStr> {
        self.assignments.get(id).cloned()
    }

    /// Returns `true` if `name` has been handed out.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// The number of assigned names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no names have been assigned.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Allocates a new, unique name associated with the given ID.
    ///
    /// The name will be based on the given `base_name`. If `id` already has a
    /// name, the old assignment is replaced but the old name stays reserved.
    pub fn assign_name(&mut self, id: K, base_name: &str) -> ArcStr {
        let name = if self.names.contains(base_name) {
            let mut i = 1;
            loop {
                let new_name = arcstr::format!("{}_{}", base_name, i);
                if !self.names.contains(&new_name) {
                    break new_name;
                }
                i += 1;
            }
        } else {
            base_name.into()
        };

        self.names.insert(name.clone());
        self.assignments.insert(id, name.clone());
        name
    }

    /// Frees the name assigned to `id` so that it may be handed out again.
    ///
    /// Returns the released name, if any.
    pub fn release(&mut self, id: &K) -> Option<ArcStr> {
        let name = self.assignments.remove(id)?;
        self.names.remove(&name);
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_in_call_order() {
        let mut names = Names::new();
        assert_eq!(names.assign_name(0, "inv"), "inv");
        assert_eq!(names.assign_name(1, "inv"), "inv_1");
        assert_eq!(names.assign_name(2, "nand"), "nand");
        assert_eq!(names.assign_name(3, "inv"), "inv_2");
        assert_eq!(names.name(&1).as_deref(), Some("inv_1"));
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn released_names_are_reused() {
        let mut names = Names::new();
        names.assign_name("a", "cell");
        names.assign_name("b", "cell");
        assert_eq!(names.release(&"b").as_deref(), Some("cell_1"));
        assert!(!names.contains("cell_1"));
        assert_eq!(names.assign_name("c", "cell"), "cell_1");
        assert_eq!(names.release(&"missing"), None);
    }
}
