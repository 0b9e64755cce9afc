//! Hierarchical resource workspace backing graph execution.
//!
//! The workspace is the memory/lifetime backbone operators and graph runs
//! depend on to obtain, alias, and release storage without re-allocating on
//! every step. It owns every index under a single mutex and hands out
//! `Arc` handles whose lifetime is bounded by the workspace itself.
//!
//! ## Architecture
//!
//! ```text
//! Workspace<E>
//!      |
//!      +-- WorkspaceState (mutex-guarded indexes)
//!      |       +-- tensors    (storage name -> Arc<Tensor>)
//!      |       +-- resolver   (single-hop alias table)
//!      |       +-- buffers    (bounded per-category name stacks)
//!      |       +-- graphs     (name -> Arc<E::Graph>)
//!      |       +-- fillers    (tensor name -> FillerSpec, write-once)
//!      |       +-- remotes    (composed workspaces, attach order)
//!      |
//!      +-- LockTable (per-resolved-name advisory locks)
//!      |
//!      +-- Arc<E> (graph engine, compiles GraphDef -> E::Graph)
//! ```
//!
//! ## Name resolution
//!
//! Every public operation resolves its tensor name through the alias table
//! exactly once at entry. Internal paths (remote fan-out included) only
//! see already-resolved names, so aliasing is a single hop by construction.
//!
//! ## Hierarchy
//!
//! A workspace composes other workspaces by shared reference. Lookups are
//! local-first and fan out through the composition in attach order,
//! recursing into each remote's own hierarchy. Fan-outs thread a visited
//! set of workspace ids, so a composition that happens to form a cycle
//! terminates instead of recursing forever. Mutation never crosses the
//! hierarchy: creation shadows remote ownership and release demands it.
//!
//! ## Locking discipline
//!
//! The state mutex is taken per-call and never held across engine execution
//! or user closures; graph and tensor handles are cloned out first. The
//! per-name lock table serializes tensor *data* access only.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, trace};

use crate::config::{WorkspaceConfig, SENTINEL_TENSOR};
use crate::error::{Error, Result};
use crate::filler::FillerSpec;
use crate::graph::{ExecutableGraph, GraphDef, GraphEngine};
use crate::tensor::Tensor;

mod buffers;
mod locks;
mod resolver;
mod state;

pub use locks::TensorLock;

use buffers::ReleaseAction;
use locks::LockTable;
use state::WorkspaceState;

static WORKSPACE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Named container owning tensors, pooled buffers, graphs, fillers, and
/// aliases, generic over the engine that compiles and runs its graphs.
pub struct Workspace<E: GraphEngine> {
    name: String,
    id: u64,
    engine: Arc<E>,
    state: Mutex<WorkspaceState<E>>,
    locks: LockTable,
}

impl<E: GraphEngine> Workspace<E> {
    /// Creates a workspace seeded with the sentinel tensor and the default
    /// buffer categories.
    pub fn new(name: impl Into<String>, engine: Arc<E>) -> Arc<Self> {
        Self::with_config(name, engine, WorkspaceConfig::default())
            .expect("default workspace config is valid")
    }

    /// Creates a workspace seeding the buffer categories named in `config`.
    ///
    /// Fails with [`Error::DuplicateCategory`] if the config names a
    /// category twice.
    pub fn with_config(
        name: impl Into<String>,
        engine: Arc<E>,
        config: WorkspaceConfig,
    ) -> Result<Arc<Self>> {
        let mut state = WorkspaceState::new();
        state.create_local(SENTINEL_TENSOR);
        for (category, capacity) in &config.seed_categories {
            let names = state.buffers.create_category(category, *capacity)?;
            for buffer_name in names {
                state.create_local(&buffer_name);
            }
        }
        Ok(Arc::new(Workspace {
            name: name.into(),
            id: WORKSPACE_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed),
            engine,
            state: Mutex::new(state),
            locks: LockTable::default(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the engine handle graphs are compiled with.
    pub fn engine(&self) -> Arc<E> {
        Arc::clone(&self.engine)
    }

    /// Composes `remote` into this workspace for local-miss lookups.
    ///
    /// Idempotent by name: if a workspace with the same name is already
    /// attached, the existing one is returned and `remote` is dropped
    /// (first attach wins).
    pub fn attach(&self, remote: Arc<Workspace<E>>) -> Arc<Workspace<E>> {
        let mut state = self.state.lock().expect("workspace state poisoned");
        if let Some(existing) = state
            .remotes
            .iter()
            .find(|candidate| candidate.name == remote.name)
        {
            return Arc::clone(existing);
        }
        state.remotes.push(Arc::clone(&remote));
        remote
    }

    /// Redirects future lookups of `old` to `new`. Single hop only; the
    /// target is never itself resolved again.
    pub fn define_alias(&self, old: impl Into<String>, new: impl Into<String>) {
        let mut state = self.state.lock().expect("workspace state poisoned");
        state.resolver.define_alias(old, new);
    }

    /// Reports whether the tensor exists locally, or anywhere in the
    /// composed hierarchy when `search_remote` is set.
    pub fn exists(&self, name: &str, search_remote: bool) -> bool {
        let resolved = self.resolve(name);
        let mut visited = HashSet::new();
        self.has_resolved(&resolved, search_remote, &mut visited)
    }

    /// Fetch-or-create against the local registry.
    ///
    /// Creation never searches remotely: a name not yet local is created
    /// locally even when a remote workspace owns the same resolved name.
    /// Local scope always wins at creation time, and later local fetches
    /// see the shadowing tensor.
    pub fn create_tensor(&self, name: &str) -> Arc<Tensor> {
        let mut state = self.state.lock().expect("workspace state poisoned");
        let resolved = state.resolver.resolve(name).to_string();
        state.create_local(&resolved)
    }

    /// Fetches an existing tensor, local-first, then through the
    /// composition in attach order when `search_remote` is set.
    ///
    /// A miss everywhere searched is the fatal [`Error::TensorNotFound`]:
    /// tensors must be created before they can be fetched.
    pub fn get_tensor(&self, name: &str, search_remote: bool) -> Result<Arc<Tensor>> {
        let resolved = self.resolve(name);
        let mut visited = HashSet::new();
        self.get_resolved(&resolved, search_remote, &mut visited)
            .ok_or(Error::TensorNotFound { name: resolved })
    }

    /// Resets a locally owned tensor's storage, keeping the registry entry
    /// and any outstanding handles alive.
    ///
    /// Releasing a tensor this workspace does not own is the fatal
    /// [`Error::InvalidOwnership`]; remote release is disallowed.
    pub fn release_tensor(&self, name: &str) -> Result<()> {
        let state = self.state.lock().expect("workspace state poisoned");
        let resolved = state.resolver.resolve(name).to_string();
        let tensor = state
            .tensors
            .get(&resolved)
            .cloned()
            .ok_or(Error::InvalidOwnership { name: resolved })?;
        drop(state);
        tensor.reset();
        Ok(())
    }

    /// Lists local tensor names (sorted) followed by each composed
    /// workspace's own recursive listing, in attach order. A workspace
    /// reachable through multiple paths contributes its names once.
    pub fn list_tensor_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut visited = HashSet::new();
        self.collect_names(&mut visited, &mut names);
        names
    }

    /// Returns the advisory lock for the resolved name, creating it on
    /// first use. Handles for the same resolved name share one mutex.
    pub fn lock_handle(&self, name: &str) -> TensorLock {
        let resolved = self.resolve(name);
        self.locks.handle(&resolved)
    }

    /// Runs `body` while holding the tensor's advisory lock. The lock is
    /// released on every exit path, panics included.
    pub fn with_tensor_lock<R>(&self, name: &str, body: impl FnOnce() -> R) -> R {
        let lock = self.lock_handle(name);
        let _guard = lock.lock();
        body()
    }

    /// Associates an initialization spec with its tensor name.
    ///
    /// Write-once: the first definition for a name wins and later ones are
    /// silently dropped, so repeated graph-construction passes stay
    /// idempotent. A spec without a tensor name is the fatal
    /// [`Error::EmptyFillerName`].
    pub fn define_filler(&self, spec: FillerSpec) -> Result<()> {
        if spec.tensor.is_empty() {
            return Err(Error::EmptyFillerName);
        }
        let mut state = self.state.lock().expect("workspace state poisoned");
        state.fillers.entry(spec.tensor.clone()).or_insert(spec);
        Ok(())
    }

    /// Returns the filler registered for `name`, if any.
    pub fn lookup_filler(&self, name: &str) -> Option<FillerSpec> {
        let state = self.state.lock().expect("workspace state poisoned");
        state.fillers.get(name).cloned()
    }

    /// Creates a buffer category with `capacity` pre-registered tensors.
    /// The capacity also fixes the category's recycle threshold.
    pub fn create_buffer_category(&self, category: &str, capacity: usize) -> Result<()> {
        let mut state = self.state.lock().expect("workspace state poisoned");
        let names = state.buffers.create_category(category, capacity)?;
        for name in names {
            state.create_local(&name);
        }
        Ok(())
    }

    /// Pops a pooled buffer from `category`.
    ///
    /// Exhaustion is the fatal [`Error::PoolExhausted`]: pools never grow
    /// on demand, so draining one past its seed count is a caller bug.
    pub fn acquire_buffer(&self, category: &str) -> Result<Arc<Tensor>> {
        let mut state = self.state.lock().expect("workspace state poisoned");
        let name = state.buffers.acquire(category)?;
        let tensor = state
            .tensors
            .get(&name)
            .cloned()
            .expect("pooled buffer name missing from tensor registry");
        Ok(tensor)
    }

    /// Returns a buffer to `category`. Below the category's capacity the
    /// tensor is pooled with its storage intact; at capacity, or when
    /// `force` is set, the tensor is fully reset instead, so steady-state
    /// reuse stays bounded.
    pub fn release_buffer(&self, tensor: &Arc<Tensor>, category: &str, force: bool) -> Result<()> {
        let mut state = self.state.lock().expect("workspace state poisoned");
        let action = state.buffers.release(tensor.name(), category, force)?;
        match action {
            ReleaseAction::Recycled => {
                trace!(buffer = tensor.name(), category, "buffer recycled");
                Ok(())
            }
            ReleaseAction::ResetStorage => {
                if !state.tensors.contains_key(tensor.name()) {
                    return Err(Error::InvalidOwnership {
                        name: tensor.name().to_string(),
                    });
                }
                drop(state);
                debug!(buffer = tensor.name(), category, "pool at capacity, resetting buffer");
                tensor.reset();
                Ok(())
            }
        }
    }

    /// Current number of pooled (idle) buffers in `category`.
    pub fn pooled_buffers(&self, category: &str) -> usize {
        let state = self.state.lock().expect("workspace state poisoned");
        state.buffers.pooled(category)
    }

    /// Compiles `def` through the engine and registers the result under the
    /// definition's name. Re-creating a name replaces the stored graph
    /// (last write wins).
    pub fn create_graph(self: &Arc<Self>, def: &GraphDef) -> Result<Arc<E::Graph>> {
        let graph = self
            .engine
            .compile(def, self)
            .map_err(|cause| Error::GraphBuild {
                name: def.name.clone(),
                cause,
            })?;
        let graph = Arc::new(graph);
        let mut state = self.state.lock().expect("workspace state poisoned");
        if state
            .graphs
            .insert(def.name.clone(), Arc::clone(&graph))
            .is_some()
        {
            debug!(graph = def.name.as_str(), "replacing registered graph");
        }
        Ok(graph)
    }

    /// Runs a registered graph under the phase filters.
    ///
    /// An unknown name is the recoverable [`Error::UnknownGraph`]; engine
    /// failures surface as the recoverable [`Error::GraphRun`] carrying the
    /// engine's error as cause.
    pub fn run_graph(&self, name: &str, include: &str, exclude: &str) -> Result<()> {
        let graph = {
            let state = self.state.lock().expect("workspace state poisoned");
            state.graphs.get(name).cloned()
        };
        let Some(graph) = graph else {
            error!(graph = name, "graph does not exist in this workspace");
            return Err(Error::UnknownGraph {
                name: name.to_string(),
            });
        };
        graph.run(include, exclude).map_err(|cause| Error::GraphRun {
            name: name.to_string(),
            cause,
        })
    }

    /// Names of all registered graphs, sorted.
    pub fn list_graph_names(&self) -> Vec<String> {
        let state = self.state.lock().expect("workspace state poisoned");
        let mut names: Vec<String> = state.graphs.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(&self, name: &str) -> String {
        let state = self.state.lock().expect("workspace state poisoned");
        state.resolver.resolve(name).to_string()
    }

    /// Existence check over pre-resolved names. Inserts this workspace into
    /// `visited` and skips workspaces already seen, so cyclic compositions
    /// terminate.
    fn has_resolved(&self, resolved: &str, search_remote: bool, visited: &mut HashSet<u64>) -> bool {
        if !visited.insert(self.id) {
            return false;
        }
        let state = self.state.lock().expect("workspace state poisoned");
        if state.tensors.contains_key(resolved) {
            return true;
        }
        if !search_remote {
            return false;
        }
        let remotes: Vec<_> = state.remotes.clone();
        drop(state);
        remotes
            .iter()
            .any(|remote| remote.has_resolved(resolved, true, visited))
    }

    /// Local-first fetch over pre-resolved names, fanning out through the
    /// composition in attach order. First match wins.
    fn get_resolved(
        &self,
        resolved: &str,
        search_remote: bool,
        visited: &mut HashSet<u64>,
    ) -> Option<Arc<Tensor>> {
        if !visited.insert(self.id) {
            return None;
        }
        let state = self.state.lock().expect("workspace state poisoned");
        if let Some(tensor) = state.tensors.get(resolved) {
            return Some(Arc::clone(tensor));
        }
        if !search_remote {
            return None;
        }
        let remotes: Vec<_> = state.remotes.clone();
        drop(state);
        for remote in &remotes {
            trace!(
                workspace = self.name.as_str(),
                remote = remote.name.as_str(),
                tensor = resolved,
                "searching composed workspace"
            );
            if let Some(tensor) = remote.get_resolved(resolved, true, visited) {
                return Some(tensor);
            }
        }
        None
    }

    fn collect_names(&self, visited: &mut HashSet<u64>, out: &mut Vec<String>) {
        if !visited.insert(self.id) {
            return;
        }
        let state = self.state.lock().expect("workspace state poisoned");
        let mut local: Vec<String> = state.tensors.keys().cloned().collect();
        local.sort();
        out.extend(local);
        let remotes: Vec<_> = state.remotes.clone();
        drop(state);
        for remote in &remotes {
            remote.collect_names(visited, out);
        }
    }
}
