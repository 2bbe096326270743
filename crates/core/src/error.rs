//! Error types for the tracking store.
//!
//! This module defines the single error type used throughout the workspace.
//! We use `thiserror` for automatic `Display`/`Error` impls, the same way the
//! rest of this codebase's ambient stack does.
//!
//! ## Error taxonomy
//!
//! Every variant maps to one of four stable [`ErrorCode`]s so callers can branch
//! on the code without parsing the display string:
//!
//! - `ResourceDoesNotExist` — an experiment or run was not found.
//! - `InvalidParameterValue` — bad input (empty name, duplicate param key, ...).
//! - `InternalError` — an unexpected I/O failure, typically wrapped by `log_batch`.
//! - `MissingConfig` — a metadata file is absent or unparseable for an otherwise
//!   present directory.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tracking store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error code surfaced to callers, independent of the display message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The requested experiment or run does not exist.
    ResourceDoesNotExist,
    /// The caller supplied an invalid parameter.
    InvalidParameterValue,
    /// An unexpected internal failure occurred.
    InternalError,
    /// A metadata file is missing or unreadable.
    MissingConfig,
}

/// Errors produced by the tracking store.
#[derive(Debug, Error)]
pub enum Error {
    /// Experiment not found.
    #[error("No Experiment with id={experiment_id} exists")]
    ExperimentNotFound {
        /// The id that was looked up.
        experiment_id: String,
    },

    /// Run not found.
    #[error("Run '{run_id}' not found")]
    RunNotFound {
        /// The id that was looked up.
        run_id: String,
    },

    /// Attempted to create an experiment whose name collides with an active one.
    #[error("Experiment(name={name}) already exists")]
    ExperimentAlreadyExists {
        /// The colliding name.
        name: String,
    },

    /// Experiment name was empty or otherwise invalid.
    #[error("Invalid experiment name: '{name}'")]
    InvalidExperimentName {
        /// The rejected name.
        name: String,
    },

    /// Attempted to delete or rename the reserved default experiment.
    #[error("Cannot delete the default experiment")]
    CannotDeleteDefaultExperiment,

    /// Attempted to rename an experiment that is not active.
    #[error("Cannot rename a non-active experiment.")]
    CannotRenameNonActiveExperiment,

    /// Attempted to mutate a run or experiment that is not active.
    #[error("The run {run_id} must be in the 'active' state. Current state is {status}.")]
    RunNotActive {
        /// The affected run id.
        run_id: String,
        /// The run's current lifecycle stage, for diagnostics.
        status: String,
    },

    /// Attempted to create a run under a non-active experiment.
    #[error("Could not create run under non-active experiment with id {experiment_id}.")]
    ExperimentNotActive {
        /// The affected experiment id.
        experiment_id: String,
    },

    /// Changing an already-set param value.
    #[error(
        "Changing param values is not allowed. Param with key='{key}' was already logged \
         with value='{old_value}' for run ID='{run_id}'. Attempted logging new value \
         '{new_value}'."
    )]
    ParamValueChanged {
        /// Run the param belongs to.
        run_id: String,
        /// Param key.
        key: String,
        /// Value already on disk.
        old_value: String,
        /// Value the caller attempted to write.
        new_value: String,
    },

    /// A param or tag value exceeded the configured maximum length.
    #[error(
        "Param value '{key}' exceeded length limit of {limit} characters (got {actual})"
    )]
    ValueExceededLength {
        /// Offending key.
        key: String,
        /// Configured maximum.
        limit: usize,
        /// Actual length observed.
        actual: usize,
    },

    /// Duplicate parameter keys submitted in a single `log_batch` call.
    #[error("Duplicate parameter keys have been submitted: [{keys}]")]
    DuplicateParamKeys {
        /// Comma-joined offending keys.
        keys: String,
    },

    /// `run_name` and the reserved `mlflow.runName`-equivalent tag disagree.
    #[error(
        "Both 'run_name' argument and 'run_name' tag are specified, but with \
         different values: run_name='{run_name}', tag value='{tag_value}'"
    )]
    RunNameConflict {
        /// Value passed via the API argument.
        run_name: String,
        /// Value passed via the reserved tag.
        tag_value: String,
    },

    /// A metric sample's value could not be parsed as a float.
    #[error("Metric value for key '{key}' must be numeric, got '{value}'")]
    NonNumericMetricValue {
        /// Metric key.
        key: String,
        /// Raw offending value.
        value: String,
    },

    /// `max_results` fell outside the accepted range.
    #[error("Invalid value for max_results. It must be at most {limit}, but got {actual}")]
    MaxResultsOutOfRange {
        /// Configured upper bound.
        limit: u32,
        /// Value the caller supplied.
        actual: i64,
    },

    /// `max_results` was zero, negative, or otherwise not a positive integer.
    #[error("Invalid value for max_results. It must be a positive integer, but got {actual}")]
    MaxResultsNotPositive {
        /// The offending value, rendered as the caller supplied it (e.g. `"0"`, `"-3"`, `"None"`).
        actual: String,
    },

    /// Pagination/backward-compatibility request unsupported by metric history.
    #[error("Metric history does not support pagination")]
    MetricHistoryPaginationUnsupported,

    /// The filter string could not be parsed.
    #[error("Error on parsing filter '{filter}': {reason}")]
    MalformedFilter {
        /// The offending filter string.
        filter: String,
        /// Human-readable parse failure reason.
        reason: String,
    },

    /// A page token was invalid (tampered with or from a different query).
    #[error("Invalid page token: {reason}")]
    InvalidPageToken {
        /// Why the token was rejected.
        reason: String,
    },

    /// A tag does not exist, or the entity it belongs to is not active.
    #[error("No tag with name: {key} in run with id {run_id}")]
    TagNotFound {
        /// Run the tag was looked up on.
        run_id: String,
        /// The missing key.
        key: String,
    },

    /// The on-disk directory layout is internally inconsistent.
    #[error("Malformed experiment/run layout at '{path}': {reason}")]
    Corruption {
        /// Path where the inconsistency was found.
        path: PathBuf,
        /// Diagnostic description.
        reason: String,
    },

    /// Metadata file missing or unreadable after retrying.
    #[error("Meta data for '{path}' is missing")]
    MissingConfig {
        /// The path that could not be read.
        path: PathBuf,
    },

    /// A key referenced a path outside of its owning directory.
    #[error("Invalid key '{key}': must not escape its storage directory")]
    PathEscape {
        /// The offending key.
        key: String,
    },

    /// Wrapper for unexpected I/O failures.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper used by `log_batch` for any unexpected internal failure.
    #[error("Internal error while logging batch: {0}")]
    Internal(String),
}

impl Error {
    /// Stable error code for this error, for callers that want to match
    /// on category rather than parse the display message.
    pub fn code(&self) -> ErrorCode {
        use Error::*;
        match self {
            ExperimentNotFound { .. } | RunNotFound { .. } => ErrorCode::ResourceDoesNotExist,

            ExperimentAlreadyExists { .. }
            | InvalidExperimentName { .. }
            | CannotDeleteDefaultExperiment
            | CannotRenameNonActiveExperiment
            | RunNotActive { .. }
            | ExperimentNotActive { .. }
            | ParamValueChanged { .. }
            | ValueExceededLength { .. }
            | DuplicateParamKeys { .. }
            | RunNameConflict { .. }
            | NonNumericMetricValue { .. }
            | MaxResultsOutOfRange { .. }
            | MaxResultsNotPositive { .. }
            | MetricHistoryPaginationUnsupported
            | MalformedFilter { .. }
            | InvalidPageToken { .. }
            | TagNotFound { .. }
            | PathEscape { .. } => ErrorCode::InvalidParameterValue,

            Corruption { .. } | MissingConfig { .. } => ErrorCode::MissingConfig,

            Io(_) | Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Wrap an arbitrary error as an internal error, the way `log_batch`
    /// wraps unexpected failures from its underlying writes.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}
