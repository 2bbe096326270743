//! A filesystem-backed tracking store for machine learning experiments,
//! runs, params, metrics and tags.
//!
//! # Quick start
//!
//! ```no_run
//! use filestore::FileStore;
//! use track_storage::StoreConfig;
//!
//! let store = FileStore::open("/tmp/my-tracking-store", StoreConfig::default())?;
//! let experiment_id = store.create_experiment("my-experiment", None, &[])?;
//! let run = store.create_run(&experiment_id, "alice", 0, &[], None)?;
//! store.log_param(&run.info.run_id, "learning_rate", "0.01")?;
//! # Ok::<(), track_core::Error>(())
//! ```
//!
//! The store is organized as three layered crates:
//!
//! - `track-core`: the data model, error taxonomy, id/name generation.
//! - `track-storage`: the on-disk directory layout, metadata codec, leaf
//!   stores (params/tags/metrics) and entity CRUD/lifecycle.
//! - `track-query`: the filter/order/pagination search engine.
//!
//! [`FileStore`] wires the two together behind a single facade.

#![warn(missing_docs)]

use std::path::Path;

use track_core::{Error, Metric, PagedResult, Run, RunStatus, ViewType};
pub use track_core::{Experiment, LifecycleStage};
use track_query::Filter;
pub use track_storage::StoreConfig;
use track_storage::{EntityStore, LogBatch};

/// Facade over the storage and query layers. Cloning is cheap to add later
/// if needed, but today a single `FileStore` owns its `EntityStore`.
pub struct FileStore {
    store: EntityStore,
}

impl FileStore {
    /// Open (creating if absent) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self, Error> {
        Ok(FileStore { store: EntityStore::open(root.as_ref(), config)? })
    }

    /// The underlying entity store, for callers that need lower-level
    /// access (e.g. direct `track-storage` leaf APIs).
    pub fn entity_store(&self) -> &EntityStore {
        &self.store
    }

    // ------------------------------------------------------------------
    // Experiments
    // ------------------------------------------------------------------

    /// Create a new experiment.
    pub fn create_experiment(
        &self,
        name: &str,
        artifact_location: Option<String>,
        tags: &[(String, String)],
    ) -> Result<String, Error> {
        self.store.create_experiment(name, artifact_location, tags)
    }

    /// Fetch an experiment by id.
    pub fn get_experiment(&self, experiment_id: &str) -> Result<Experiment, Error> {
        self.store.get_experiment(experiment_id)
    }

    /// Fetch an active experiment by name.
    pub fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>, Error> {
        self.store.get_experiment_by_name(name)
    }

    /// Soft-delete an experiment.
    pub fn delete_experiment(&self, experiment_id: &str) -> Result<(), Error> {
        self.store.delete_experiment(experiment_id)
    }

    /// Restore a soft-deleted experiment.
    pub fn restore_experiment(&self, experiment_id: &str) -> Result<(), Error> {
        self.store.restore_experiment(experiment_id)
    }

    /// Rename an active experiment.
    pub fn rename_experiment(&self, experiment_id: &str, new_name: &str) -> Result<(), Error> {
        self.store.rename_experiment(experiment_id, new_name)
    }

    /// Set a tag on an experiment.
    pub fn set_experiment_tag(&self, experiment_id: &str, key: &str, value: &str) -> Result<(), Error> {
        self.store.set_experiment_tag(experiment_id, key, value)
    }

    /// Search experiments, with filtering, ordering and pagination.
    ///
    /// `max_results = None` means "omitted" and resolves to the store's
    /// configured default page size; `Some(0)` or a negative value is
    /// rejected with [`Error::MaxResultsNotPositive`], and a value above the
    /// configured ceiling with [`Error::MaxResultsOutOfRange`].
    #[allow(clippy::too_many_arguments)]
    pub fn search_experiments(
        &self,
        filter: &str,
        view_type: ViewType,
        max_results: Option<i64>,
        order_by: &[String],
        page_token: Option<&str>,
    ) -> Result<PagedResult<Experiment>, Error> {
        track_query::search_experiments(&self.store, filter, view_type, max_results, order_by, page_token)
    }

    // ------------------------------------------------------------------
    // Runs
    // ------------------------------------------------------------------

    /// Create a new run under an active experiment.
    pub fn create_run(
        &self,
        experiment_id: &str,
        user_id: &str,
        start_time: i64,
        tags: &[(String, String)],
        run_name: Option<String>,
    ) -> Result<Run, Error> {
        self.store.create_run(experiment_id, user_id, start_time, tags, run_name)
    }

    /// Fetch a run's info and leaf data by id.
    pub fn get_run(&self, run_id: &str) -> Result<Run, Error> {
        self.store.get_run(run_id)
    }

    /// Update a run's status, end time, and (optionally) its name.
    pub fn update_run_info(
        &self,
        run_id: &str,
        status: RunStatus,
        end_time: Option<i64>,
        run_name: Option<String>,
    ) -> Result<(), Error> {
        self.store.update_run_info(run_id, status, end_time, run_name).map(|_| ())
    }

    /// Soft-delete a run.
    pub fn delete_run(&self, run_id: &str) -> Result<(), Error> {
        self.store.delete_run(run_id)
    }

    /// Restore a soft-deleted run.
    pub fn restore_run(&self, run_id: &str) -> Result<(), Error> {
        self.store.restore_run(run_id)
    }

    /// Permanently remove a run.
    pub fn hard_delete_run(&self, run_id: &str) -> Result<(), Error> {
        self.store.hard_delete_run(run_id)
    }

    /// Search runs under `experiment_ids`, with filtering, ordering and
    /// pagination.
    ///
    /// See [`FileStore::search_experiments`] for `max_results`'s `None`
    /// vs. zero/negative/over-ceiling handling.
    #[allow(clippy::too_many_arguments)]
    pub fn search_runs(
        &self,
        experiment_ids: &[String],
        filter: &str,
        view_type: ViewType,
        max_results: Option<i64>,
        order_by: &[String],
        page_token: Option<&str>,
    ) -> Result<PagedResult<Run>, Error> {
        track_query::search_runs(&self.store, experiment_ids, filter, view_type, max_results, order_by, page_token)
    }

    // ------------------------------------------------------------------
    // Leaf data
    // ------------------------------------------------------------------

    /// Log a single param on an active run.
    pub fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), Error> {
        let info = self.store.require_active(run_id)?;
        let dir = self.store.paths().params_dir(&info.experiment_id, run_id);
        track_storage::params::log_param(&dir, run_id, key, value, self.store.config())
    }

    /// Log a single metric sample on an active run.
    pub fn log_metric(&self, run_id: &str, key: &str, metric: Metric) -> Result<(), Error> {
        let info = self.store.require_active(run_id)?;
        let dir = self.store.paths().metrics_dir(&info.experiment_id, run_id);
        track_storage::metrics::log_metric(&dir, key, &metric)
    }

    /// Read a metric's full history, in insertion order.
    ///
    /// Metric history has no pagination of its own; callers passing a
    /// `page_token` or `max_results` get [`Error::MetricHistoryPaginationUnsupported`]
    /// rather than a silently truncated result.
    pub fn get_metric_history(
        &self,
        run_id: &str,
        key: &str,
        page_token: Option<&str>,
        max_results: Option<i64>,
    ) -> Result<Vec<Metric>, Error> {
        if page_token.is_some() || max_results.is_some() {
            return Err(Error::MetricHistoryPaginationUnsupported);
        }
        let run = self.store.get_run(run_id)?;
        let dir = self.store.paths().metrics_dir(&run.info.experiment_id, run_id);
        track_storage::metrics::get_metric_history(&dir, key)
    }

    /// Set a tag on an active run. Setting the reserved `mlflow.runName`
    /// tag also updates the run's `run_name` field to match.
    pub fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<(), Error> {
        self.store.set_run_tag(run_id, key, value)
    }

    /// Delete a tag from an active run.
    pub fn delete_tag(&self, run_id: &str, key: &str) -> Result<(), Error> {
        self.store.delete_run_tag(run_id, key)
    }

    /// Log a batch of metrics, params and tags in a single call.
    pub fn log_batch(&self, run_id: &str, batch: LogBatch) -> Result<(), Error> {
        track_storage::log_batch(&self.store, run_id, batch)
    }
}

/// Validate a filter string without running a search, useful for early
/// validation of caller-supplied queries.
pub fn validate_filter(filter: &str) -> Result<(), Error> {
    Filter::parse(filter).map(|_| ())
}
