//! Initialization specifications bound to tensor names.
//!
//! A filler describes how an external component should populate a tensor the
//! first time it is needed; the workspace only stores the association. The
//! registry is write-once per tensor name so repeated graph-construction
//! passes cannot clobber an earlier definition.

use serde::{Deserialize, Serialize};

/// Families of tensor initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FillerKind {
    /// A trainable value; left zeroed until an optimizer writes it.
    Variable,
    /// Fed externally at run time; left zeroed.
    Placeholder,
    Constant {
        value: f32,
    },
    Uniform {
        low: f32,
        high: f32,
    },
    Normal {
        mean: f32,
        std: f32,
    },
    TruncatedNormal {
        mean: f32,
        std: f32,
        low: f32,
        high: f32,
    },
}

/// An initialization spec keyed by the tensor it fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillerSpec {
    pub tensor: String,
    pub kind: FillerKind,
}

impl FillerSpec {
    pub fn new(tensor: impl Into<String>, kind: FillerKind) -> Self {
        FillerSpec {
            tensor: tensor.into(),
            kind,
        }
    }

    /// Constant fill, the default for tensors without an explicit spec.
    pub fn constant(tensor: impl Into<String>, value: f32) -> Self {
        FillerSpec::new(tensor, FillerKind::Constant { value })
    }

    pub fn uniform(tensor: impl Into<String>, low: f32, high: f32) -> Self {
        FillerSpec::new(tensor, FillerKind::Uniform { low, high })
    }

    pub fn normal(tensor: impl Into<String>, mean: f32, std: f32) -> Self {
        FillerSpec::new(tensor, FillerKind::Normal { mean, std })
    }

    /// Normal samples clipped to two standard deviations around the mean.
    pub fn truncated_normal(tensor: impl Into<String>, mean: f32, std: f32) -> Self {
        FillerSpec::new(
            tensor,
            FillerKind::TruncatedNormal {
                mean,
                std,
                low: mean - 2.0 * std,
                high: mean + 2.0 * std,
            },
        )
    }
}
