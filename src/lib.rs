//! Microstate - per-trial behavioral stability scores for repeated-choice experiments
//!
//! Interaction records are turned into condition-level summaries through a
//! deterministic pipeline: ingestion → microstate computation → aggregation →
//! encoding.
//!
//! ## Modules
//!
//! - **Microstate**: per-participant running counts and `1 - count / trial` scores
//! - **Aggregation**: density histograms and mean ± sd trends at checkpoint trials

pub mod adapter;
pub mod aggregate;
pub mod binning;
pub mod config;
pub mod encoder;
pub mod error;
pub mod microstate;
pub mod pipeline;
pub mod stats;
pub mod types;

pub use adapter::{InputFormat, RecordAdapter, RecordBatch};
pub use aggregate::{trend_series, AggregationPipeline, TrialSelection};
pub use config::PipelineConfig;
pub use error::ComputeError;
pub use microstate::MicrostateComputer;
pub use pipeline::{csv_to_microstate_csv, MicrostateProcessor};
pub use types::{AugmentedRecord, ExperimentKeys, InteractionRecord};

/// Crate version embedded in all summary reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for summary reports
pub const PRODUCER_NAME: &str = "microstate";
