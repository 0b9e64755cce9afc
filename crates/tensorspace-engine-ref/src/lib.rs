//! Reference engine interpreting graph definitions over workspace tensors.
//!
//! [`RefEngine`] compiles a [`GraphDef`] into a [`RefGraph`] that executes
//! ops sequentially against F32 host tensors fetched through the owning
//! workspace. It exists to exercise the full workspace surface (fillers,
//! hierarchical lookup, and pooled scratch buffers) and to serve as the
//! executable model for the phase-filter semantics of `run`.

mod fill;
mod ops;

use std::sync::{Arc, Weak};

use anyhow::{bail, Context, Result};
use tracing::trace;

use tensorspace::config::COMMON_BUFFERS;
use tensorspace::{ExecutableGraph, GraphDef, GraphEngine, OpDef, Workspace};

pub use fill::apply_filler;

/// Compiles [`GraphDef`]s into sequentially interpreted [`RefGraph`]s.
#[derive(Debug, Default)]
pub struct RefEngine;

impl RefEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(RefEngine)
    }
}

impl GraphEngine for RefEngine {
    type Graph = RefGraph;

    fn compile(&self, def: &GraphDef, workspace: &Arc<Workspace<Self>>) -> Result<RefGraph> {
        for op in &def.ops {
            ops::validate(op).with_context(|| format!("op `{}` in graph `{}`", op.name, def.name))?;
        }
        Ok(RefGraph {
            name: def.name.clone(),
            ops: def.ops.clone(),
            workspace: Arc::downgrade(workspace),
        })
    }
}

/// A compiled graph: the validated op list plus a back-reference to the
/// workspace it executes against.
///
/// The workspace registry owns the graph, so the back-reference is weak;
/// running a graph whose workspace was dropped is an error, not a dangle.
#[derive(Debug)]
pub struct RefGraph {
    name: String,
    ops: Vec<OpDef>,
    workspace: Weak<Workspace<RefEngine>>,
}

impl RefGraph {
    /// An op runs when its phase tag passes both filters: untagged ops
    /// always run, tagged ops require `include` to be empty or equal, and
    /// are skipped when `exclude` matches.
    fn op_selected(op: &OpDef, include: &str, exclude: &str) -> bool {
        if op.phase.is_empty() {
            return true;
        }
        if !exclude.is_empty() && op.phase == exclude {
            return false;
        }
        include.is_empty() || op.phase == include
    }
}

impl ExecutableGraph for RefGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, include: &str, exclude: &str) -> Result<()> {
        let workspace = match self.workspace.upgrade() {
            Some(workspace) => workspace,
            None => bail!("workspace for graph `{}` was dropped", self.name),
        };
        for op in &self.ops {
            if !Self::op_selected(op, include, exclude) {
                trace!(graph = self.name.as_str(), op = op.name.as_str(), "op filtered out");
                continue;
            }
            ops::execute(&workspace, op)
                .with_context(|| format!("op `{}` ({}) in graph `{}`", op.name, op.kind, self.name))?;
        }
        Ok(())
    }
}

/// Workspace handle type most callers of this engine want.
pub type RefWorkspace = Workspace<RefEngine>;

/// Category the engine stages elementwise scratch results through.
pub const SCRATCH_CATEGORY: &str = COMMON_BUFFERS;
