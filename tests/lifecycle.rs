//! Facade-level lifecycle and scenario tests.
//!
//! These exercise `FileStore` the way an external caller would: through its
//! public API only, never reaching into `track-storage`/`track-query`
//! internals. Per-module edge cases already have dedicated unit tests closer
//! to the code they cover; these walk the same named scenarios end to end.

mod common;

use common::store;
use track_core::{Error, Metric, RunStatus, ViewType};

/// S1 — search by name, including the `ORDER BY` override.
#[test]
fn scenario_search_experiments_by_name() {
    let (_dir, store) = store();
    store.create_experiment("a", None, &[]).unwrap();
    store.create_experiment("ab", None, &[]).unwrap();
    store.create_experiment("Abc", None, &[]).unwrap();

    let result = store
        .search_experiments("name LIKE 'a%'", ViewType::ActiveOnly, None, &[], None)
        .unwrap();
    assert_eq!(
        result.items.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        vec!["ab", "a"]
    );

    let result = store
        .search_experiments(
            "name ILIKE 'a%'",
            ViewType::ActiveOnly,
            None,
            &["last_update_time asc".to_string()],
            None,
        )
        .unwrap();
    assert_eq!(
        result.items.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        vec!["a", "ab", "Abc"]
    );
}

/// S2 — filter runs by `attributes.run_id IN (...)`, default order
/// `start_time DESC`.
#[test]
fn scenario_filter_runs_by_run_id_in() {
    let (_dir, store) = store();
    let exp_id = store.create_experiment("e", None, &[]).unwrap();
    let r1 = store.create_run(&exp_id, "alice", 100, &[], None).unwrap();
    let r2 = store.create_run(&exp_id, "alice", 200, &[], None).unwrap();

    let filter = format!("attributes.run_id IN ('{}','{}')", r1.info.run_id, r2.info.run_id);
    let result = store
        .search_runs(&[exp_id], &filter, ViewType::ActiveOnly, None, &[], None)
        .unwrap();
    assert_eq!(
        result.items.iter().map(|r| r.info.run_id.clone()).collect::<Vec<_>>(),
        vec![r2.info.run_id, r1.info.run_id]
    );
}

/// S3 — out-of-order metric samples still resolve the right "latest" value
/// by `(step, timestamp, value)`, not insertion order.
#[test]
fn scenario_metric_latest_by_step_then_timestamp_then_value() {
    let (_dir, store) = store();
    let exp_id = store.create_experiment("e", None, &[]).unwrap();
    let run = store.create_run(&exp_id, "alice", 0, &[], None).unwrap();

    store.log_metric(&run.info.run_id, "m", Metric { step: 0, timestamp: 100, value: 1000.0 }).unwrap();
    store.log_metric(&run.info.run_id, "m", Metric { step: 3, timestamp: 40, value: 100.0 }).unwrap();
    store.log_metric(&run.info.run_id, "m", Metric { step: 3, timestamp: 50, value: 10.0 }).unwrap();
    store.log_metric(&run.info.run_id, "m", Metric { step: 3, timestamp: 50, value: 20.0 }).unwrap();

    let fetched = store.get_run(&run.info.run_id).unwrap();
    assert_eq!(fetched.data.metrics.get("m"), Some(&20.0));

    let history = store.get_metric_history(&run.info.run_id, "m", None, None).unwrap();
    let latest = history.iter().max_by_key(|m| m.order_key()).unwrap();
    assert_eq!((latest.step, latest.timestamp, latest.value), (3, 50, 20.0));
}

/// S4 — `run_name` stays in sync with the reserved `mlflow.runName` tag
/// across an explicit-None update and a direct tag write.
#[test]
fn scenario_run_name_tag_sync() {
    let (_dir, store) = store();
    let exp_id = store.create_experiment("e", None, &[]).unwrap();
    let run = store.create_run(&exp_id, "alice", 0, &[], Some("first".to_string())).unwrap();
    assert_eq!(run.info.run_name, "first");

    store.update_run_info(&run.info.run_id, RunStatus::Running, None, None).unwrap();
    let fetched = store.get_run(&run.info.run_id).unwrap();
    assert_eq!(fetched.info.run_name, "first");
    assert_eq!(fetched.data.tags.get("mlflow.runName"), Some(&"first".to_string()));

    store.set_tag(&run.info.run_id, "mlflow.runName", "other").unwrap();
    let fetched = store.get_run(&run.info.run_id).unwrap();
    assert_eq!(fetched.info.run_name, "other");
    assert_eq!(fetched.data.tags.get("mlflow.runName"), Some(&"other".to_string()));
}

/// S5 — a duplicate param key within one `log_batch` call is rejected and
/// leaves no partial state behind.
#[test]
fn scenario_duplicate_params_in_batch_rejected() {
    let (_dir, store) = store();
    let exp_id = store.create_experiment("e", None, &[]).unwrap();
    let run = store.create_run(&exp_id, "alice", 0, &[], None).unwrap();

    let batch = track_storage::LogBatch {
        params: vec![("a".to_string(), "1".to_string()), ("a".to_string(), "2".to_string())],
        ..Default::default()
    };
    let err = store.log_batch(&run.info.run_id, batch).unwrap_err();
    assert!(matches!(err, Error::DuplicateParamKeys { .. }));

    let fetched = store.get_run(&run.info.run_id).unwrap();
    assert!(fetched.data.params.get("a").is_none());
}

/// S6 — a run missing its `meta.yaml` is excluded from search results but
/// still raises when fetched directly.
#[test]
fn scenario_malformed_run_excluded_from_search_but_errors_on_direct_fetch() {
    let (_dir, store) = store();
    let exp_id = store.create_experiment("e", None, &[]).unwrap();
    let good = store.create_run(&exp_id, "alice", 0, &[], None).unwrap();
    let bad = store.create_run(&exp_id, "alice", 0, &[], None).unwrap();

    let meta_path = store
        .entity_store()
        .paths()
        .run_meta(&exp_id, &bad.info.run_id);
    std::fs::remove_file(meta_path).unwrap();

    let result = store
        .search_runs(&[exp_id], "", ViewType::ActiveOnly, None, &[], None)
        .unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].info.run_id, good.info.run_id);

    let err = store.get_run(&bad.info.run_id).unwrap_err();
    assert!(matches!(err, Error::MissingConfig { .. }));
}

/// A full create -> mutate -> delete -> restore walk through the public
/// facade, touching every leaf-data kind once.
#[test]
fn full_experiment_and_run_lifecycle() {
    let (_dir, store) = store();
    let exp_id = store.create_experiment("demo", None, &[("team".to_string(), "ml".to_string())]).unwrap();
    store.set_experiment_tag(&exp_id, "stage", "dev").unwrap();

    let run = store.create_run(&exp_id, "alice", 0, &[], None).unwrap();
    store.log_param(&run.info.run_id, "lr", "0.01").unwrap();
    store.log_metric(&run.info.run_id, "acc", Metric { timestamp: 1, value: 0.9, step: 0 }).unwrap();
    store.set_tag(&run.info.run_id, "env", "prod").unwrap();
    store.update_run_info(&run.info.run_id, RunStatus::Finished, Some(100), None).unwrap();

    store.delete_run(&run.info.run_id).unwrap();
    let deleted = store.get_run(&run.info.run_id).unwrap();
    assert_eq!(deleted.info.lifecycle_stage, filestore::LifecycleStage::Deleted);

    store.restore_run(&run.info.run_id).unwrap();
    let restored = store.get_run(&run.info.run_id).unwrap();
    assert_eq!(restored.info.lifecycle_stage, filestore::LifecycleStage::Active);
    assert_eq!(restored.data.params.get("lr"), Some(&"0.01".to_string()));

    store.delete_experiment(&exp_id).unwrap();
    assert!(store.get_experiment_by_name("demo").unwrap().is_none());
    store.restore_experiment(&exp_id).unwrap();
    assert!(store.get_experiment_by_name("demo").unwrap().is_some());

    store.delete_tag(&run.info.run_id, "env").unwrap();
    let fetched = store.get_run(&run.info.run_id).unwrap();
    assert!(fetched.data.tags.get("env").is_none());
}
