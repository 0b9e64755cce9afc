//! Typed errors for workspace operations, split into fatal and recoverable
//! kinds.
//!
//! Fatal kinds indicate programmer error (a tensor fetched before creation,
//! a pool drained past its seed count); callers are entitled to `expect`
//! them away. Recoverable kinds are expected runtime outcomes the caller
//! decides how to handle, such as running a graph by a name that was never
//! registered.

use thiserror::Error;

/// Classification of an [`Error`] kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// An invariant violation; continuing past it is a bug in the caller.
    Fatal,
    /// An expected miss the caller is meant to handle.
    Recoverable,
}

#[derive(Debug, Error)]
pub enum Error {
    /// The tensor was not found locally nor in any composed workspace.
    #[error("tensor `{name}` does not exist in this workspace or any composed workspace")]
    TensorNotFound { name: String },

    /// A buffer was requested from a category whose stack is empty.
    #[error("buffer pool `{category}` is exhausted; seed more buffers if necessary")]
    PoolExhausted { category: String },

    /// The tensor is not owned by the local workspace, so it cannot be
    /// released (or returned to a pool) here.
    #[error("tensor `{name}` does not belong to this workspace and cannot be released")]
    InvalidOwnership { name: String },

    /// A buffer category with this name has already been created.
    #[error("buffer category `{category}` already exists")]
    DuplicateCategory { category: String },

    /// The buffer category was never created in this workspace.
    #[error("buffer category `{category}` was never created")]
    UnknownCategory { category: String },

    /// A filler spec must name the tensor it initializes.
    #[error("filler spec does not name a tensor")]
    EmptyFillerName,

    /// No graph with this name is registered.
    #[error("graph `{name}` does not exist in this workspace")]
    UnknownGraph { name: String },

    /// The engine rejected the graph definition during compilation.
    #[error("graph `{name}` failed to build: {cause}")]
    GraphBuild { name: String, cause: anyhow::Error },

    /// The engine reported a failure while running the graph.
    #[error("graph `{name}` failed to run: {cause}")]
    GraphRun { name: String, cause: anyhow::Error },
}

impl Error {
    /// Returns the fatal/recoverable classification of this kind.
    pub fn severity(&self) -> Severity {
        match self {
            Error::TensorNotFound { .. }
            | Error::PoolExhausted { .. }
            | Error::InvalidOwnership { .. }
            | Error::DuplicateCategory { .. }
            | Error::UnknownCategory { .. }
            | Error::EmptyFillerName => Severity::Fatal,
            Error::UnknownGraph { .. }
            | Error::GraphBuild { .. }
            | Error::GraphRun { .. } => Severity::Recoverable,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

pub type Result<T> = std::result::Result<T, Error>;
