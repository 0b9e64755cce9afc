//! Per-category stacks of reusable tensor names with bounded recycling.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Bookkeeping for pooled buffer names. The pool tracks names only; the
/// owning workspace keeps the tensors themselves registered, so every name
/// on a stack corresponds to a live registry entry.
#[derive(Debug, Default)]
pub(crate) struct BufferPool {
    stacks: HashMap<String, Vec<String>>,
    capacities: HashMap<String, usize>,
}

/// Outcome of returning a buffer to its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReleaseAction {
    /// The name went back on the stack; storage is kept for reuse.
    Recycled,
    /// The pool is at capacity (or the caller forced it): the workspace
    /// must fully reset the tensor instead.
    ResetStorage,
}

impl BufferPool {
    /// Registers a new category of `capacity` buffers and returns the
    /// derived tensor names, deepest-index on top of the stack.
    pub(crate) fn create_category(&mut self, category: &str, capacity: usize) -> Result<Vec<String>> {
        if self.stacks.contains_key(category) {
            return Err(Error::DuplicateCategory {
                category: category.to_string(),
            });
        }
        let names: Vec<String> = (1..=capacity)
            .map(|index| format!("_t_{category}_buffer_{index}"))
            .collect();
        self.stacks.insert(category.to_string(), names.clone());
        self.capacities.insert(category.to_string(), capacity);
        Ok(names)
    }

    /// Pops a pooled name. An empty stack is a caller error: pools never
    /// grow on demand.
    pub(crate) fn acquire(&mut self, category: &str) -> Result<String> {
        let stack = self
            .stacks
            .get_mut(category)
            .ok_or_else(|| Error::UnknownCategory {
                category: category.to_string(),
            })?;
        stack.pop().ok_or_else(|| Error::PoolExhausted {
            category: category.to_string(),
        })
    }

    /// Returns `name` to its category, recycling below capacity and
    /// directing the workspace to reset storage at or above it.
    pub(crate) fn release(&mut self, name: &str, category: &str, force: bool) -> Result<ReleaseAction> {
        let stack = self
            .stacks
            .get_mut(category)
            .ok_or_else(|| Error::UnknownCategory {
                category: category.to_string(),
            })?;
        let capacity = self.capacities.get(category).copied().unwrap_or(0);
        if force || stack.len() >= capacity {
            return Ok(ReleaseAction::ResetStorage);
        }
        stack.push(name.to_string());
        Ok(ReleaseAction::Recycled)
    }

    /// Current number of pooled names in `category`.
    pub(crate) fn pooled(&self, category: &str) -> usize {
        self.stacks.get(category).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_derive_from_category_and_index() {
        let mut pool = BufferPool::default();
        let names = pool.create_category("Aux", 2).unwrap();
        assert_eq!(names, ["_t_Aux_buffer_1", "_t_Aux_buffer_2"]);
    }

    #[test]
    fn release_recycles_below_capacity_only() {
        let mut pool = BufferPool::default();
        pool.create_category("Aux", 1).unwrap();
        let name = pool.acquire("Aux").unwrap();
        assert_eq!(pool.release(&name, "Aux", false).unwrap(), ReleaseAction::Recycled);
        // Stack is back at capacity; an extra return must reset instead.
        assert_eq!(
            pool.release("_t_Aux_buffer_9", "Aux", false).unwrap(),
            ReleaseAction::ResetStorage
        );
    }

    #[test]
    fn forced_release_never_recycles() {
        let mut pool = BufferPool::default();
        pool.create_category("Aux", 2).unwrap();
        let name = pool.acquire("Aux").unwrap();
        assert_eq!(
            pool.release(&name, "Aux", true).unwrap(),
            ReleaseAction::ResetStorage
        );
        assert_eq!(pool.pooled("Aux"), 1);
    }

    #[test]
    fn unknown_category_is_an_error() {
        let mut pool = BufferPool::default();
        assert!(matches!(
            pool.acquire("Nope"),
            Err(Error::UnknownCategory { .. })
        ));
    }
}
