//! Core data model for the tracking store.
//!
//! This module defines the foundational entity types: experiments, runs,
//! params, tags and metrics. These are plain data — all persistence and
//! lifecycle behavior lives in `track-storage`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifier reserved for the experiment that always exists and can never
/// be deleted.
pub const DEFAULT_EXPERIMENT_ID: &str = "0";

/// Fixed width used when minting new experiment ids.
pub const EXPERIMENT_ID_FIXED_WIDTH: usize = 18;

/// Reserved tag key mirroring a run's `run_name` field.
pub const MLFLOW_RUN_NAME: &str = "mlflow.runName";

/// Lifecycle stage shared by experiments and runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Entity is live and mutable.
    Active,
    /// Entity has been soft-deleted; leaf data is read-only.
    Deleted,
}

impl LifecycleStage {
    /// Parse the on-disk string representation, accepting legacy values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// On-disk string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    /// Whether this stage permits mutation of leaf data.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle view filter used by search operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewType {
    /// Only active entities.
    ActiveOnly,
    /// Only deleted entities.
    DeletedOnly,
    /// Both active and deleted entities.
    All,
}

impl ViewType {
    /// Whether an entity in the given lifecycle stage should be visible
    /// under this view.
    pub fn matches(&self, stage: LifecycleStage) -> bool {
        match self {
            ViewType::ActiveOnly => stage.is_active(),
            ViewType::DeletedOnly => !stage.is_active(),
            ViewType::All => true,
        }
    }
}

/// Run execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// Run is currently executing.
    Running,
    /// Run has been scheduled but not started.
    Scheduled,
    /// Run finished successfully.
    Finished,
    /// Run failed.
    Failed,
    /// Run was killed.
    Killed,
}

impl RunStatus {
    /// Parse the on-disk string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(Self::Running),
            "SCHEDULED" => Some(Self::Scheduled),
            "FINISHED" => Some(Self::Finished),
            "FAILED" => Some(Self::Failed),
            "KILLED" => Some(Self::Killed),
            _ => None,
        }
    }

    /// On-disk string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Scheduled => "SCHEDULED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An experiment: a named grouping of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Opaque, fixed-width identifier.
    pub experiment_id: String,
    /// Unique (among active experiments) display name.
    pub name: String,
    /// URI under which this experiment's runs store their artifacts.
    pub artifact_location: String,
    /// Lifecycle stage.
    pub lifecycle_stage: LifecycleStage,
    /// Creation time in milliseconds since epoch; `None` for legacy records.
    pub creation_time: Option<i64>,
    /// Last-update time in milliseconds since epoch; `None` for legacy records.
    pub last_update_time: Option<i64>,
    /// Experiment-level tags.
    pub tags: HashMap<String, String>,
}

/// A run's identifying and lifecycle fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// 32-character hex run identifier.
    pub run_id: String,
    /// Enclosing experiment id.
    pub experiment_id: String,
    /// Human-readable run name.
    pub run_name: String,
    /// Identifier of the user that created the run.
    pub user_id: String,
    /// Current execution status.
    pub status: RunStatus,
    /// Start time in milliseconds since epoch.
    pub start_time: i64,
    /// End time in milliseconds since epoch; `None` while running.
    pub end_time: Option<i64>,
    /// Soft-delete timestamp; present iff `lifecycle_stage == Deleted`.
    pub deleted_time: Option<i64>,
    /// Artifact root for this run, derived once at creation (never mutated).
    pub artifact_uri: String,
    /// Lifecycle stage.
    pub lifecycle_stage: LifecycleStage,
}

/// A run's mutable leaf data: params, tags and the latest value of each
/// logged metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunData {
    /// Immutable param key/value pairs.
    pub params: HashMap<String, String>,
    /// Mutable tag key/value pairs.
    pub tags: HashMap<String, String>,
    /// Latest sample per metric key).
    pub metrics: HashMap<String, f64>,
}

/// A run together with its leaf data, as returned by `get_run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Identifying and lifecycle fields.
    pub info: RunInfo,
    /// Params, tags and latest metric values.
    pub data: RunData,
}

/// A single logged metric sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric key.
    pub timestamp: i64,
    /// Sample value.
    pub value: f64,
    /// Training/evaluation step; defaults to 0 for legacy records.
    pub step: i64,
}

impl Metric {
    /// Lexicographic ordering key used to determine the "latest" sample
    /// for a metric key: max over (step, timestamp, value).
    pub fn order_key(&self) -> (i64, i64, OrderedF64) {
        (self.step, self.timestamp, OrderedF64(self.value))
    }
}

/// Thin wrapper giving `f64` a total order for use as a sort/comparison key.
///
/// Metric values are never NaN in practice (rejected at write time by the
/// numeric-parse check), so `partial_cmp` is safe to unwrap here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderedF64(pub f64);

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// A page of search results plus an opaque continuation token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// The page's items, in the caller's requested order.
    pub items: Vec<T>,
    /// Token for fetching the next page; `None` once the last page is reached.
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lifecycle_roundtrip() {
        assert_eq!(LifecycleStage::parse("active"), Some(LifecycleStage::Active));
        assert_eq!(LifecycleStage::parse("deleted"), Some(LifecycleStage::Deleted));
        assert_eq!(LifecycleStage::parse("bogus"), None);
        assert_eq!(LifecycleStage::Active.as_str(), "active");
    }

    #[test]
    fn view_type_matches() {
        assert!(ViewType::ActiveOnly.matches(LifecycleStage::Active));
        assert!(!ViewType::ActiveOnly.matches(LifecycleStage::Deleted));
        assert!(ViewType::All.matches(LifecycleStage::Deleted));
    }

    #[test]
    fn metric_latest_is_max_step_then_timestamp_then_value() {
        let a = Metric { timestamp: 100, value: 1000.0, step: 0 };
        let b = Metric { timestamp: 40, value: 100.0, step: 3 };
        let c = Metric { timestamp: 50, value: 10.0, step: 3 };
        let d = Metric { timestamp: 50, value: 20.0, step: 3 };
        let mut samples = vec![a, b, c, d];
        samples.sort_by_key(|m| m.order_key());
        assert_eq!(samples.last().unwrap().value, 20.0);
    }

    #[test]
    fn run_status_roundtrip() {
        for s in [
            RunStatus::Running,
            RunStatus::Scheduled,
            RunStatus::Finished,
            RunStatus::Failed,
            RunStatus::Killed,
        ] {
            assert_eq!(RunStatus::parse(s.as_str()), Some(s));
        }
    }

    proptest! {
        #[test]
        fn ordered_f64_matches_primitive_comparison(a in -1e12f64..1e12, b in -1e12f64..1e12) {
            prop_assert_eq!(OrderedF64(a).cmp(&OrderedF64(b)), a.partial_cmp(&b).unwrap());
        }

        #[test]
        fn metric_order_key_is_max_by_step_then_timestamp_then_value(
            samples in prop::collection::vec((0i64..10, 0i64..1000, -1000f64..1000.0), 1..30),
        ) {
            let metrics: Vec<Metric> = samples
                .iter()
                .map(|&(step, timestamp, value)| Metric { timestamp, value, step })
                .collect();
            let expected = metrics
                .iter()
                .max_by_key(|m| m.order_key())
                .cloned()
                .unwrap();
            let expected_key = (expected.step, expected.timestamp, OrderedF64(expected.value));

            let by_naive_scan = metrics.iter().fold(metrics[0].clone(), |best, m| {
                if m.order_key() > best.order_key() { m.clone() } else { best }
            });
            prop_assert_eq!((by_naive_scan.step, by_naive_scan.timestamp, OrderedF64(by_naive_scan.value)), expected_key);
        }
    }
}
