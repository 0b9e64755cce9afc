//! Graph definitions and the engine seam the workspace runs them through.
//!
//! A [`GraphDef`] is an inert, serializable description of a computation; an
//! engine compiles it into an [`ExecutableGraph`] the workspace registers by
//! name. The workspace never interprets a definition itself; it only
//! brokers compilation and run requests across the [`GraphEngine`] boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::workspace::Workspace;

/// A single operator within a graph definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpDef {
    pub name: String,
    /// Operator kind tag dispatched on by the engine (e.g. `"Fill"`).
    pub kind: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Phase tag matched against the include/exclude run filters. Empty
    /// means the op runs in every phase.
    #[serde(default)]
    pub phase: String,
    /// Output shape, for ops that allocate rather than inherit one.
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    /// Scalar attribute for ops parameterized by a single constant.
    #[serde(default)]
    pub value: Option<f32>,
}

/// An immutable graph description, keyed by name in the workspace registry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDef {
    pub name: String,
    #[serde(default)]
    pub ops: Vec<OpDef>,
}

impl GraphDef {
    pub fn new(name: impl Into<String>) -> Self {
        GraphDef {
            name: name.into(),
            ops: Vec::new(),
        }
    }

    pub fn with_op(mut self, op: OpDef) -> Self {
        self.ops.push(op);
        self
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(src: &str) -> serde_json::Result<Self> {
        serde_json::from_str(src)
    }
}

/// A compiled graph the workspace can run by name.
///
/// Implementations hold whatever compiled form the engine produced; `run`
/// may fetch and mutate workspace tensors, so implementations that need the
/// workspace back should keep a `Weak` reference to avoid an ownership
/// cycle with the registry that owns them.
pub trait ExecutableGraph: Send + Sync {
    fn name(&self) -> &str;

    /// Executes the graph, restricted by the phase filters. A non-empty
    /// `include` selects ops tagged with that phase; a non-empty `exclude`
    /// skips them.
    fn run(&self, include: &str, exclude: &str) -> anyhow::Result<()>;
}

/// Compiles [`GraphDef`]s into executable graphs for a workspace.
///
/// The associated `Graph` type keeps the workspace generic over its engine,
/// so compiled artifacts carry no type erasure unless the engine wants it.
pub trait GraphEngine: Send + Sync + Sized + 'static {
    type Graph: ExecutableGraph + 'static;

    /// Builds an executable graph from `def`. The target workspace is handed
    /// over so the compiled graph can resolve tensors when it later runs.
    fn compile(&self, def: &GraphDef, workspace: &Arc<Workspace<Self>>)
        -> anyhow::Result<Self::Graph>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_def_round_trips_through_json() {
        let def = GraphDef::new("init").with_op(OpDef {
            name: "fill_w".to_string(),
            kind: "Fill".to_string(),
            inputs: Vec::new(),
            outputs: vec!["w".to_string()],
            phase: "train".to_string(),
            shape: Some(vec![2, 3]),
            value: None,
        });
        let encoded = def.to_json_string().unwrap();
        let decoded = GraphDef::from_json_str(&encoded).unwrap();
        assert_eq!(def, decoded);
    }

    #[test]
    fn op_def_fields_default_when_absent() {
        let decoded: GraphDef = serde_json::from_str(
            r#"{"name": "g", "ops": [{"name": "noop", "kind": "Copy"}]}"#,
        )
        .unwrap();
        let op = &decoded.ops[0];
        assert!(op.inputs.is_empty());
        assert!(op.phase.is_empty());
        assert_eq!(op.shape, None);
    }
}
