//! Dense indexing of task ids.
//!
//! The dependency graph stores edges as `usize` indices into the task slice
//! rather than as string keys or references, so adjacency lists stay cheap to
//! walk and carry no ownership cycles.

use rustc_hash::FxHashMap;

/// Bidirectional mapping between task id strings and their input positions.
#[derive(Debug, Clone, Default)]
pub struct TaskIndex {
    to_index: FxHashMap<String, usize>,
    ids: Vec<String>,
}

impl TaskIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Register a new id at the next position.
    ///
    /// Returns `None` if the id was already registered.
    pub fn insert(&mut self, id: &str) -> Option<usize> {
        if self.to_index.contains_key(id) {
            return None;
        }
        let index = self.ids.len();
        self.ids.push(id.to_string());
        self.to_index.insert(id.to_string(), index);
        Some(index)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<usize> {
        self.to_index.get(id).copied()
    }

    /// Id registered at `index`.
    ///
    /// Panics if `index` was not handed out by this index.
    #[inline]
    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_input_order() {
        let mut index = TaskIndex::with_capacity(3);
        assert_eq!(index.insert("design"), Some(0));
        assert_eq!(index.insert("build"), Some(1));
        assert_eq!(index.insert("design"), None);

        assert_eq!(index.len(), 2);
        assert_eq!(index.id(1), "build");
        assert_eq!(index.get("design"), Some(0));
        assert_eq!(index.get("missing"), None);
    }
}
