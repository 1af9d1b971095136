use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the comparison pipeline.
///
/// Non-finite ratios are not represented here: a zero control cell is a data
/// condition handled by the filter, not a hard error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source not found or unreadable: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read table from {}: {cause:#}", .path.display())]
    Parse { path: PathBuf, cause: anyhow::Error },

    #[error("shape mismatch: {left} but {right}")]
    ShapeMismatch { left: TableShape, right: TableShape },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("insufficient data: {samples} usable samples for {folds} folds")]
    InsufficientData { samples: usize, folds: usize },

    #[error("cannot write {}: {cause}", .path.display())]
    Write { path: PathBuf, cause: std::io::Error },
}

/// Shape of a named table, as reported in `ShapeMismatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableShape {
    pub name: &'static str,
    pub rows: usize,
    pub cols: usize,
}

impl TableShape {
    pub fn new(name: &'static str, (rows, cols): (usize, usize)) -> Self {
        TableShape { name, rows, cols }
    }
}

impl fmt::Display for TableShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is {}x{}", self.name, self.rows, self.cols)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
