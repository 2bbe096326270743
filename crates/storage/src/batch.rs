//! Batch API: `log_batch` with validation, duplicate detection and
//! idempotent replays.

use std::collections::HashSet;

use track_core::{Error, Metric};

use crate::entities::EntityStore;
use crate::{metrics, params};

/// A batch of metrics, params and tags to log against a single run.
#[derive(Debug, Clone, Default)]
pub struct LogBatch {
    /// Metrics to append.
    pub metrics: Vec<(String, Metric)>,
    /// Params to set (key, value).
    pub params: Vec<(String, String)>,
    /// Tags to set (key, value); duplicate keys are allowed, last wins.
    pub tags: Vec<(String, String)>,
}

/// Execute a batch log call against `run_id`:
///
/// 1. The run must be active.
/// 2. Duplicate param keys within the call are rejected before any write.
/// 3. Writes happen in order: metrics, then params, then tags.
/// 4. Any unexpected write failure is wrapped as `Error::Internal`.
pub fn log_batch(store: &EntityStore, run_id: &str, batch: LogBatch) -> Result<(), Error> {
    let info = store.require_active(run_id)?;

    let mut seen = HashSet::new();
    let mut dupes = Vec::new();
    for (key, _) in &batch.params {
        if !seen.insert(key.clone()) && !dupes.contains(key) {
            dupes.push(key.clone());
        }
    }
    if !dupes.is_empty() {
        return Err(Error::DuplicateParamKeys { keys: dupes.join(", ") });
    }

    let metrics_dir = store.paths().metrics_dir(&info.experiment_id, run_id);
    let params_dir = store.paths().params_dir(&info.experiment_id, run_id);
    let config = store.config();

    for (key, metric) in &batch.metrics {
        metrics::log_metric(&metrics_dir, key, metric)
            .map_err(|e| wrap_internal(e, "metric"))?;
    }
    for (key, value) in &batch.params {
        params::log_param(&params_dir, run_id, key, value, config)?;
    }
    // Duplicate tag keys within a call are allowed; last one wins because we
    // write them in call order. Routing through `set_run_tag` (rather than
    // the raw `tags::set_tag`) keeps `run_name` in sync when the batch
    // contains the reserved `mlflow.runName` tag.
    for (key, value) in &batch.tags {
        store.set_run_tag(run_id, key, value).map_err(|e| wrap_internal(e, "tag"))?;
    }

    Ok(())
}

/// Wrap an unexpected (non-user) failure as an internal error, leaving
/// user-facing validation errors (e.g. `ParamValueChanged`,
/// `ValueExceededLength`, `NonNumericMetricValue`) untouched so callers
/// still see the precise error.
fn wrap_internal(err: Error, stage: &str) -> Error {
    match err {
        Error::Io(_) => Error::internal(format!("unexpected I/O failure logging {stage}: {err}")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use tempfile::tempdir;
    use track_core::MLFLOW_RUN_NAME;

    fn run() -> (tempfile::TempDir, EntityStore, String) {
        let dir = tempdir().unwrap();
        let store = EntityStore::open(dir.path(), StoreConfig::for_testing()).unwrap();
        let exp_id = store.create_experiment("e", None, &[]).unwrap();
        let run = store.create_run(&exp_id, "user", 0, &[], None).unwrap();
        (dir, store, run.info.run_id)
    }

    #[test]
    fn duplicate_param_keys_rejected_before_any_write() {
        let (_d, store, run_id) = run();
        let batch = LogBatch {
            params: vec![("a".to_string(), "1".to_string()), ("a".to_string(), "2".to_string())],
            ..Default::default()
        };
        let err = log_batch(&store, &run_id, batch).unwrap_err();
        assert!(matches!(err, Error::DuplicateParamKeys { .. }));

        let fetched = store.get_run(&run_id).unwrap();
        assert!(!fetched.data.params.contains_key("a"));
    }

    #[test]
    fn requires_active_run() {
        let (_d, store, run_id) = run();
        store.delete_run(&run_id).unwrap();
        let err = log_batch(&store, &run_id, LogBatch::default()).unwrap_err();
        assert!(matches!(err, Error::RunNotActive { .. }));
    }

    #[test]
    fn duplicate_tag_keys_last_wins() {
        let (_d, store, run_id) = run();
        let batch = LogBatch {
            tags: vec![("t".to_string(), "first".to_string()), ("t".to_string(), "second".to_string())],
            ..Default::default()
        };
        log_batch(&store, &run_id, batch).unwrap();
        let fetched = store.get_run(&run_id).unwrap();
        assert_eq!(fetched.data.tags.get("t"), Some(&"second".to_string()));
    }

    #[test]
    fn replay_with_identical_values_is_idempotent() {
        let (_d, store, run_id) = run();
        let batch = LogBatch {
            params: vec![("p".to_string(), "v".to_string())],
            ..Default::default()
        };
        log_batch(&store, &run_id, batch.clone()).unwrap();
        log_batch(&store, &run_id, batch).unwrap();
        let fetched = store.get_run(&run_id).unwrap();
        assert_eq!(fetched.data.params.get("p"), Some(&"v".to_string()));
    }

    #[test]
    fn log_batch_syncs_run_name_tag() {
        let (_d, store, run_id) = run();
        let batch = LogBatch {
            tags: vec![(MLFLOW_RUN_NAME.to_string(), "renamed".to_string())],
            ..Default::default()
        };
        log_batch(&store, &run_id, batch).unwrap();
        let fetched = store.get_run(&run_id).unwrap();
        assert_eq!(fetched.info.run_name, "renamed");
        assert_eq!(fetched.data.tags.get(MLFLOW_RUN_NAME), Some(&"renamed".to_string()));
    }

    #[test]
    fn writes_metrics_params_tags_in_order() {
        let (_d, store, run_id) = run();
        let batch = LogBatch {
            metrics: vec![("m".to_string(), Metric { timestamp: 1, value: 1.0, step: 0 })],
            params: vec![("p".to_string(), "v".to_string())],
            tags: vec![("t".to_string(), "v".to_string())],
        };
        log_batch(&store, &run_id, batch).unwrap();
        let fetched = store.get_run(&run_id).unwrap();
        assert_eq!(fetched.data.metrics.get("m"), Some(&1.0));
        assert_eq!(fetched.data.params.get("p"), Some(&"v".to_string()));
        assert_eq!(fetched.data.tags.get("t"), Some(&"v".to_string()));
    }
}
