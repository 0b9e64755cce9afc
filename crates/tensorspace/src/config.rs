//! Workspace construction parameters.
//!
//! The original capacity table for pooled buffers lived in a shared static;
//! here it is an explicit value passed at construction so two workspaces can
//! carry different pool sizes.

use std::env;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Category name for general-purpose scratch buffers.
pub const COMMON_BUFFERS: &str = "Common";

/// Category name for gradient scratch buffers.
pub const GRAD_BUFFERS: &str = "Grad";

/// Tensor seeded into every workspace as a discard target for operator
/// outputs nobody reads.
pub const SENTINEL_TENSOR: &str = "ignore";

const DEFAULT_COMMON_CAPACITY: usize = 2;
const DEFAULT_GRAD_CAPACITY: usize = 1;

static COMMON_CAPACITY: OnceLock<usize> = OnceLock::new();
static GRAD_CAPACITY: OnceLock<usize> = OnceLock::new();

fn parse_capacity(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

fn env_capacity(key: &str, fallback: usize) -> usize {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => parse_capacity(&value).unwrap_or(fallback),
        _ => fallback,
    }
}

/// Pool size for the `"Common"` category, overridable through
/// `TENSORSPACE_COMMON_BUFFERS`.
pub fn common_capacity() -> usize {
    *COMMON_CAPACITY
        .get_or_init(|| env_capacity("TENSORSPACE_COMMON_BUFFERS", DEFAULT_COMMON_CAPACITY))
}

/// Pool size for the `"Grad"` category, overridable through
/// `TENSORSPACE_GRAD_BUFFERS`.
pub fn grad_capacity() -> usize {
    *GRAD_CAPACITY.get_or_init(|| env_capacity("TENSORSPACE_GRAD_BUFFERS", DEFAULT_GRAD_CAPACITY))
}

/// Buffer categories seeded into a workspace at construction.
///
/// Every entry pre-creates `capacity` pooled tensors and fixes the category's
/// recycle threshold at that count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub seed_categories: Vec<(String, usize)>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            seed_categories: vec![
                (COMMON_BUFFERS.to_string(), common_capacity()),
                (GRAD_BUFFERS.to_string(), grad_capacity()),
            ],
        }
    }
}

impl WorkspaceConfig {
    /// A config that seeds no categories; every pool must be created
    /// explicitly.
    pub fn empty() -> Self {
        WorkspaceConfig {
            seed_categories: Vec::new(),
        }
    }
}
