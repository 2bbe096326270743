//! Core types, errors and identifiers for the filesystem-backed tracking store.
//!
//! This crate has no filesystem dependency of its own — it defines the data
//! model ([`types`]), the error taxonomy ([`error`]), identifier generation
//! ([`ids`]) and the run-name generator predicate list ([`names`]) shared by
//! `track-storage` and `track-query`.

#![warn(missing_docs)]

pub mod error;
pub mod ids;
pub mod names;
pub mod types;

pub use error::{Error, ErrorCode, Result};
pub use types::{
    Experiment, LifecycleStage, Metric, OrderedF64, PagedResult, Run, RunData, RunInfo,
    RunStatus, ViewType, DEFAULT_EXPERIMENT_ID, EXPERIMENT_ID_FIXED_WIDTH, MLFLOW_RUN_NAME,
};
