pub mod config;
pub mod error;
pub mod filler;
pub mod graph;
pub mod tensor;
pub mod workspace;

pub use config::WorkspaceConfig;
pub use error::{Error, Result, Severity};
pub use filler::{FillerKind, FillerSpec};
pub use graph::{ExecutableGraph, GraphDef, GraphEngine, OpDef};
pub use tensor::{DType, Shape, Tensor};
pub use workspace::{TensorLock, Workspace};
