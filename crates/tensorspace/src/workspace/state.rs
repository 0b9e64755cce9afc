//! Internal index state shared by all workspace operations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::filler::FillerSpec;
use crate::graph::GraphEngine;
use crate::tensor::Tensor;

use super::buffers::BufferPool;
use super::resolver::NameResolver;
use super::Workspace;

/// Mutable workspace indexes protected by the single mutex inside
/// [`Workspace`](super::Workspace). Tracks owned tensors, alias mappings,
/// pooled buffer names, registered graphs and fillers, and the composition
/// list of remote workspaces consulted on local misses.
pub(super) struct WorkspaceState<E: GraphEngine> {
    pub(super) tensors: HashMap<String, Arc<Tensor>>,
    pub(super) resolver: NameResolver,
    pub(super) buffers: BufferPool,
    pub(super) graphs: HashMap<String, Arc<E::Graph>>,
    pub(super) fillers: HashMap<String, FillerSpec>,
    /// Composed workspaces in attach order; search order is insertion order.
    pub(super) remotes: Vec<Arc<Workspace<E>>>,
}

impl<E: GraphEngine> WorkspaceState<E> {
    pub(super) fn new() -> Self {
        WorkspaceState {
            tensors: HashMap::new(),
            resolver: NameResolver::default(),
            buffers: BufferPool::default(),
            graphs: HashMap::new(),
            fillers: HashMap::new(),
            remotes: Vec::new(),
        }
    }

    /// Fetch-or-create against the local registry only. Creation never
    /// consults remotes: a local name always shadows remote ownership.
    pub(super) fn create_local(&mut self, resolved: &str) -> Arc<Tensor> {
        self.tensors
            .entry(resolved.to_string())
            .or_insert_with(|| Arc::new(Tensor::new(resolved)))
            .clone()
    }
}
