//! Error types for model and graph operations.

use crate::model::CellId;
use thiserror::Error;

/// Errors raised when an operation is handed ids or settings it cannot use.
///
/// Expected edge cases (missing geometry, no stencil, zero-size bounds) are
/// not errors; those operations return `None` instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown cell: {0}")]
    UnknownCell(CellId),
    #[error("Cell is not an edge: {0}")]
    NotAnEdge(CellId),
    #[error("Cell cannot hold children: {0}")]
    InvalidParent(CellId),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
