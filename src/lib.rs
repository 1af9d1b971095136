//! Flag cells of an experimental measurement table whose ratio to a control
//! table strays from 1 by more than a cross-validated threshold.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod prompt;

pub use config::{Job, Manifest, RunParams};
pub use error::PipelineError;
pub use pipeline::{run_batch, run_pair, BatchOptions, BatchReport, PairFailure, PairReport};
