use std::ops::Range;

use thiserror::Error;

/// The error taxonomy shared by every subsystem of the crate.
///
/// `ParseError` and `SizeMismatch` abort only the call that raised them;
/// `IoError` during a pipeline run triggers a pipeline-wide stop;
/// `ShutdownRequested` never escapes to a caller; it collapses to a
/// `false` return at the channel boundary.
#[derive(Debug, Error)]
pub enum MolError {
    #[error("parse error at column {column}: {message}")]
    ParseError { column: usize, message: String },

    #[error("evaluation error in {node}: {message}")]
    EvaluationError { node: String, message: String },

    #[error("index {got} out of range {range:?}")]
    IndexError { got: i64, range: Range<i64> },

    #[error("size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("topology table required but not present")]
    TopologyMissing,

    #[error("I/O error on {path}: {detail}")]
    IoError { path: String, detail: String },

    #[error("shutdown requested")]
    ShutdownRequested,
}

pub type Result<T> = std::result::Result<T, MolError>;
