// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for snapfs

use thiserror::Error;

use crate::id::ChunkId;

/// Result type alias
pub type SnapResult<T> = Result<T, SnapError>;

/// Main error type
#[derive(Error, Debug)]
pub enum SnapError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Unsupported node type {type_name} at {path}")]
    UnsupportedNodeType { path: String, type_name: String },

    #[error("Chunk {0} not found in repository index")]
    ChunkSizeUnindexed(ChunkId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Object not found in repository: {0}")]
    ObjectNotFound(String),

    #[error("Corrupted object: {0}")]
    Corrupted(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<SnapError>,
    },
}

impl SnapError {
    /// Errors a file server should answer with "not found".
    ///
    /// Malformed paths are deliberately in this class.
    pub fn is_not_found(&self) -> bool {
        match self {
            SnapError::InvalidPath(_)
            | SnapError::SnapshotNotFound(_)
            | SnapError::NodeNotFound(_) => true,
            SnapError::Context { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Innermost error, skipping context wrappers
    pub fn root_cause(&self) -> &SnapError {
        match self {
            SnapError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn context(self, context: impl Into<String>) -> Self {
        SnapError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Attach context to a failing result
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> SnapResult<T>;

    fn with_context<F, S>(self, f: F) -> SnapResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for SnapResult<T> {
    fn context(self, context: impl Into<String>) -> SnapResult<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> SnapResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
