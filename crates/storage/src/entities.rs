//! Entity Store: CRUD and lifecycle transitions for experiments and runs,
//! built on top of the Path Resolver and Metadata Codec.

use chrono::Utc;
use track_core::{
    Error, Experiment, LifecycleStage, Run, RunData, RunInfo, RunStatus, ViewType,
    DEFAULT_EXPERIMENT_ID, MLFLOW_RUN_NAME,
};

use crate::artifact_uri::{experiment_artifact_location, run_artifact_uri};
use crate::codec::{read_document, write_document, Document};
use crate::config::StoreConfig;
use crate::metrics;
use crate::params;
use crate::paths::PathResolver;
use crate::tags;

/// CRUD and lifecycle operations for experiments and runs.
pub struct EntityStore {
    paths: PathResolver,
    config: StoreConfig,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl EntityStore {
    /// Open (creating if absent) a store rooted at `root`, bootstrapping the
    /// reserved default experiment if it does not already exist.
    pub fn open(root: impl Into<std::path::PathBuf>, config: StoreConfig) -> Result<Self, Error> {
        let paths = PathResolver::new(root);
        std::fs::create_dir_all(paths.root())?;
        let store = EntityStore { paths, config };
        if !store.paths.experiment_meta(DEFAULT_EXPERIMENT_ID).exists() {
            store.bootstrap_default_experiment()?;
        }
        Ok(store)
    }

    fn bootstrap_default_experiment(&self) -> Result<(), Error> {
        let now = now_millis();
        self.paths.ensure_experiment_dirs(DEFAULT_EXPERIMENT_ID)?;
        let mut doc = Document::default();
        doc.set("experiment_id", DEFAULT_EXPERIMENT_ID);
        doc.set("name", "Default");
        doc.set(
            "artifact_location",
            experiment_artifact_location(self.paths.root().to_string_lossy().as_ref(), DEFAULT_EXPERIMENT_ID),
        );
        doc.set("creation_time", now.to_string());
        doc.set("last_update_time", now.to_string());
        doc.set("lifecycle_stage", LifecycleStage::Active.as_str());
        write_document(&self.paths.experiment_meta(DEFAULT_EXPERIMENT_ID), &doc)?;
        Ok(())
    }

    /// The resolver backing this store, for callers (e.g. the query engine)
    /// that need to enumerate entities directly.
    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Experiments
    // ------------------------------------------------------------------

    /// Create a new experiment.
    pub fn create_experiment(
        &self,
        name: &str,
        artifact_location: Option<String>,
        tags_in: &[(String, String)],
    ) -> Result<String, Error> {
        if name.is_empty() {
            return Err(Error::InvalidExperimentName { name: name.to_string() });
        }
        if self.get_experiment_by_name(name)?.is_some() {
            return Err(Error::ExperimentAlreadyExists { name: name.to_string() });
        }

        let experiment_id = self.allocate_experiment_id()?;
        self.paths.ensure_experiment_dirs(&experiment_id)?;

        let artifact_location = artifact_location.unwrap_or_else(|| {
            experiment_artifact_location(self.paths.root().to_string_lossy().as_ref(), &experiment_id)
        });

        let now = now_millis();
        let mut doc = Document::default();
        doc.set("experiment_id", experiment_id.clone());
        doc.set("name", name);
        doc.set("artifact_location", artifact_location);
        doc.set("creation_time", now.to_string());
        doc.set("last_update_time", now.to_string());
        doc.set("lifecycle_stage", LifecycleStage::Active.as_str());
        write_document(&self.paths.experiment_meta(&experiment_id), &doc)?;

        for (k, v) in tags_in {
            tags::set_tag(&self.paths.experiment_tags_dir(&experiment_id), k, v)?;
        }

        tracing::debug!(experiment_id, name, "created experiment");
        Ok(experiment_id)
    }

    fn allocate_experiment_id(&self) -> Result<String, Error> {
        loop {
            let id = track_core::ids::new_experiment_id();
            if !self.paths.experiment_dir(&id).exists() {
                return Ok(id);
            }
        }
    }

    /// Read an experiment and its tags.
    pub fn get_experiment(&self, experiment_id: &str) -> Result<Experiment, Error> {
        let meta_path = self.paths.experiment_meta(experiment_id);
        if !self.paths.experiment_dir(experiment_id).exists() {
            return Err(Error::ExperimentNotFound { experiment_id: experiment_id.to_string() });
        }
        let doc = read_document(&meta_path, &self.config)?;
        self.experiment_from_doc(experiment_id, &doc, &meta_path)
    }

    fn experiment_from_doc(
        &self,
        experiment_id: &str,
        doc: &Document,
        meta_path: &std::path::Path,
    ) -> Result<Experiment, Error> {
        let name = doc.require("name", meta_path)?.to_string();
        let artifact_location = doc.require("artifact_location", meta_path)?.to_string();
        let lifecycle_stage = LifecycleStage::parse(doc.require("lifecycle_stage", meta_path)?)
            .ok_or_else(|| Error::MissingConfig { path: meta_path.to_path_buf() })?;
        let creation_time = doc.get_optional("creation_time").and_then(|v| v.parse().ok());
        let last_update_time = doc.get_optional("last_update_time").and_then(|v| v.parse().ok());
        let tags = tags::list_tags(&self.paths.experiment_tags_dir(experiment_id))?
            .into_iter()
            .collect();

        Ok(Experiment {
            experiment_id: experiment_id.to_string(),
            name,
            artifact_location,
            lifecycle_stage,
            creation_time,
            last_update_time,
            tags,
        })
    }

    /// Look up an experiment by name among active experiments.
    pub fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>, Error> {
        for experiment in self.list_experiments(ViewType::ActiveOnly)? {
            if experiment.name == name {
                return Ok(Some(experiment));
            }
        }
        Ok(None)
    }

    /// List every experiment matching `view_type`. Malformed entries are
    /// silently excluded, not propagated as errors.
    pub fn list_experiments(&self, view_type: ViewType) -> Result<Vec<Experiment>, Error> {
        let mut out = Vec::new();
        for id in self.paths.list_experiment_ids()? {
            match self.get_experiment(&id) {
                Ok(exp) if view_type.matches(exp.lifecycle_stage) => out.push(exp),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(experiment_id = %id, "skipping malformed experiment in search");
                }
            }
        }
        Ok(out)
    }

    /// Soft-delete an experiment. Idempotent; refuses the default experiment.
    pub fn delete_experiment(&self, experiment_id: &str) -> Result<(), Error> {
        if experiment_id == DEFAULT_EXPERIMENT_ID {
            return Err(Error::CannotDeleteDefaultExperiment);
        }
        let mut experiment = self.get_experiment(experiment_id)?;
        if experiment.lifecycle_stage == LifecycleStage::Deleted {
            return Ok(());
        }
        experiment.lifecycle_stage = LifecycleStage::Deleted;
        experiment.last_update_time = Some(bump(experiment.last_update_time));
        self.write_experiment_doc(&experiment)?;
        Ok(())
    }

    /// Restore a soft-deleted experiment. Idempotent.
    pub fn restore_experiment(&self, experiment_id: &str) -> Result<(), Error> {
        let mut experiment = self.get_experiment(experiment_id)?;
        if experiment.lifecycle_stage == LifecycleStage::Active {
            return Ok(());
        }
        experiment.lifecycle_stage = LifecycleStage::Active;
        experiment.last_update_time = Some(bump(experiment.last_update_time));
        self.write_experiment_doc(&experiment)?;
        Ok(())
    }

    /// Rename an active experiment. Rejects non-active experiments and
    /// name collisions with another active experiment.
    pub fn rename_experiment(&self, experiment_id: &str, new_name: &str) -> Result<(), Error> {
        let mut experiment = self.get_experiment(experiment_id)?;
        if experiment.lifecycle_stage != LifecycleStage::Active {
            return Err(Error::CannotRenameNonActiveExperiment);
        }
        if let Some(existing) = self.get_experiment_by_name(new_name)? {
            if existing.experiment_id != experiment_id {
                return Err(Error::ExperimentAlreadyExists { name: new_name.to_string() });
            }
        }
        experiment.name = new_name.to_string();
        experiment.last_update_time = Some(bump(experiment.last_update_time));
        self.write_experiment_doc(&experiment)?;
        Ok(())
    }

    fn write_experiment_doc(&self, experiment: &Experiment) -> Result<(), Error> {
        let mut doc = Document::default();
        doc.set("experiment_id", experiment.experiment_id.clone());
        doc.set("name", experiment.name.clone());
        doc.set("artifact_location", experiment.artifact_location.clone());
        doc.set(
            "creation_time",
            experiment.creation_time.map(|t| t.to_string()).unwrap_or_else(|| "None".to_string()),
        );
        doc.set(
            "last_update_time",
            experiment.last_update_time.map(|t| t.to_string()).unwrap_or_else(|| "None".to_string()),
        );
        doc.set("lifecycle_stage", experiment.lifecycle_stage.as_str());
        write_document(&self.paths.experiment_meta(&experiment.experiment_id), &doc)
    }

    /// Set a tag on an experiment.
    pub fn set_experiment_tag(&self, experiment_id: &str, key: &str, value: &str) -> Result<(), Error> {
        // Existence check surfaces ExperimentNotFound before writing a tag
        // under a directory that was never created.
        self.get_experiment(experiment_id)?;
        tags::set_tag(&self.paths.experiment_tags_dir(experiment_id), key, value)
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
        tags_in: &[(String, String)],
        run_name: Option<String>,
    ) -> Result<Run, Error> {
        let experiment = self.get_experiment(experiment_id)?;
        if experiment.lifecycle_stage != LifecycleStage::Active {
            return Err(Error::ExperimentNotActive { experiment_id: experiment_id.to_string() });
        }

        let run_name_tag = tags_in.iter().find(|(k, _)| k == MLFLOW_RUN_NAME).map(|(_, v)| v.clone());
        let resolved_name = match (&run_name, &run_name_tag) {
            (Some(n), Some(t)) if n != t => {
                return Err(Error::RunNameConflict { run_name: n.clone(), tag_value: t.clone() });
            }
            (Some(n), _) if !n.is_empty() => n.clone(),
            (_, Some(t)) if !t.is_empty() => t.clone(),
            _ => track_core::names::generate_run_name(),
        };

        let run_id = track_core::ids::new_run_id();
        self.paths.ensure_run_dirs(experiment_id, &run_id)?;
        let artifact_uri = run_artifact_uri(&experiment.artifact_location, &run_id);

        let info = RunInfo {
            run_id: run_id.clone(),
            experiment_id: experiment_id.to_string(),
            run_name: resolved_name.clone(),
            user_id: user_id.to_string(),
            status: RunStatus::Running,
            start_time,
            end_time: None,
            deleted_time: None,
            artifact_uri,
            lifecycle_stage: LifecycleStage::Active,
        };
        self.write_run_info(&info)?;

        let tags_dir = self.paths.run_tags_dir(experiment_id, &run_id);
        for (k, v) in tags_in {
            if k == MLFLOW_RUN_NAME {
                continue;
            }
            tags::set_tag(&tags_dir, k, v)?;
        }
        tags::set_tag(&tags_dir, MLFLOW_RUN_NAME, &resolved_name)?;

        tracing::debug!(run_id, experiment_id, "created run");
        Ok(Run { info, data: RunData::default() })
    }

    /// Locate which experiment a run belongs to by scanning experiment
    /// directories.
    fn find_run_experiment_id(&self, run_id: &str) -> Result<Option<String>, Error> {
        for experiment_id in self.paths.list_experiment_ids()? {
            if self.paths.run_dir(&experiment_id, run_id).is_dir() {
                return Ok(Some(experiment_id));
            }
        }
        Ok(None)
    }

    /// Read a run's info and leaf data.
    pub fn get_run(&self, run_id: &str) -> Result<Run, Error> {
        let experiment_id = self
            .find_run_experiment_id(run_id)?
            .ok_or_else(|| Error::RunNotFound { run_id: run_id.to_string() })?;
        self.get_run_info(&experiment_id, run_id).map(|info| {
            let data = self.read_run_data(&experiment_id, run_id).unwrap_or_default();
            Run { info, data }
        })
    }

    fn get_run_info(&self, experiment_id: &str, run_id: &str) -> Result<RunInfo, Error> {
        let meta_path = self.paths.run_meta(experiment_id, run_id);
        let doc = read_document(&meta_path, &self.config)?;
        self.run_info_from_doc(experiment_id, run_id, &doc, &meta_path)
    }

    fn run_info_from_doc(
        &self,
        experiment_id: &str,
        run_id: &str,
        doc: &Document,
        meta_path: &std::path::Path,
    ) -> Result<RunInfo, Error> {
        let doc_experiment_id = doc.require("experiment_id", meta_path)?;
        self.paths.check_run_experiment_id(experiment_id, doc_experiment_id)?;

        let status = RunStatus::parse(doc.require("status", meta_path)?)
            .ok_or_else(|| Error::MissingConfig { path: meta_path.to_path_buf() })?;
        let lifecycle_stage = LifecycleStage::parse(doc.require("lifecycle_stage", meta_path)?)
            .ok_or_else(|| Error::MissingConfig { path: meta_path.to_path_buf() })?;

        Ok(RunInfo {
            run_id: run_id.to_string(),
            experiment_id: experiment_id.to_string(),
            run_name: doc.get_optional("run_name").unwrap_or_default().to_string(),
            user_id: doc.get_optional("user_id").unwrap_or_default().to_string(),
            status,
            start_time: doc.require("start_time", meta_path)?.parse().unwrap_or(0),
            end_time: doc.get_optional("end_time").and_then(|v| v.parse().ok()),
            deleted_time: doc.get_optional("deleted_time").and_then(|v| v.parse().ok()),
            artifact_uri: doc.require("artifact_uri", meta_path)?.to_string(),
            lifecycle_stage,
        })
    }

    fn read_run_data(&self, experiment_id: &str, run_id: &str) -> Result<RunData, Error> {
        let params = params::list_params(&self.paths.params_dir(experiment_id, run_id))?
            .into_iter()
            .collect();
        let tags = tags::list_tags(&self.paths.run_tags_dir(experiment_id, run_id))?
            .into_iter()
            .collect();
        let mut metric_values = std::collections::HashMap::new();
        let metrics_dir = self.paths.metrics_dir(experiment_id, run_id);
        for key in metrics::list_metric_keys(&metrics_dir)? {
            let history = metrics::get_metric_history(&metrics_dir, &key)?;
            if let Some(latest) = metrics::latest(&history) {
                metric_values.insert(key, latest.value);
            }
        }
        Ok(RunData { params, tags, metrics: metric_values })
    }

    fn write_run_info(&self, info: &RunInfo) -> Result<(), Error> {
        let mut doc = Document::default();
        doc.set("run_uuid", info.run_id.clone());
        doc.set("run_id", info.run_id.clone());
        doc.set("run_name", info.run_name.clone());
        doc.set("experiment_id", info.experiment_id.clone());
        doc.set("user_id", info.user_id.clone());
        doc.set("status", info.status.as_str());
        doc.set("start_time", info.start_time.to_string());
        doc.set(
            "end_time",
            info.end_time.map(|t| t.to_string()).unwrap_or_else(|| "None".to_string()),
        );
        doc.set(
            "deleted_time",
            info.deleted_time.map(|t| t.to_string()).unwrap_or_else(|| "None".to_string()),
        );
        doc.set("artifact_uri", info.artifact_uri.clone());
        doc.set("lifecycle_stage", info.lifecycle_stage.as_str());
        write_document(&self.paths.run_meta(&info.experiment_id, &info.run_id), &doc)
    }

    fn require_active_run(&self, run_id: &str) -> Result<RunInfo, Error> {
        let experiment_id = self
            .find_run_experiment_id(run_id)?
            .ok_or_else(|| Error::RunNotFound { run_id: run_id.to_string() })?;
        let info = self.get_run_info(&experiment_id, run_id)?;
        if info.lifecycle_stage != LifecycleStage::Active {
            return Err(Error::RunNotActive {
                run_id: run_id.to_string(),
                status: info.lifecycle_stage.to_string(),
            });
        }
        Ok(info)
    }

    /// Update a run's status, end time, and (optionally) its name. A `None`
    /// `run_name` leaves the name unchanged; a `Some` value updates both
    /// the field and the reserved tag.
    pub fn update_run_info(
        &self,
        run_id: &str,
        status: RunStatus,
        end_time: Option<i64>,
        run_name: Option<String>,
    ) -> Result<RunInfo, Error> {
        let mut info = self.require_active_run(run_id)?;
        info.status = status;
        info.end_time = end_time;
        if let Some(name) = run_name {
            info.run_name = name.clone();
            tags::set_tag(&self.paths.run_tags_dir(&info.experiment_id, run_id), MLFLOW_RUN_NAME, &name)?;
        }
        self.write_run_info(&info)?;
        Ok(info)
    }

    /// Set a tag on an active run. When `key` is the reserved
    /// `mlflow.runName` tag, the run's `run_name` field is updated to match
    /// in the same call, keeping the two in sync per the invariant in
    /// spec.md §3 ("`mlflow.runName` tag ... and `run_name` field ... must
    /// be equal after any successful mutation").
    pub fn set_run_tag(&self, run_id: &str, key: &str, value: &str) -> Result<(), Error> {
        let mut info = self.require_active_run(run_id)?;
        tags::set_tag(&self.paths.run_tags_dir(&info.experiment_id, run_id), key, value)?;
        if key == MLFLOW_RUN_NAME && info.run_name != value {
            info.run_name = value.to_string();
            self.write_run_info(&info)?;
        }
        Ok(())
    }

    /// Delete a tag from an active run.
    pub fn delete_run_tag(&self, run_id: &str, key: &str) -> Result<(), Error> {
        let info = self.require_active_run(run_id)?;
        tags::delete_tag(&self.paths.run_tags_dir(&info.experiment_id, run_id), run_id, key)
    }

    /// Soft-delete a run. Idempotent.
    pub fn delete_run(&self, run_id: &str) -> Result<(), Error> {
        let experiment_id = self
            .find_run_experiment_id(run_id)?
            .ok_or_else(|| Error::RunNotFound { run_id: run_id.to_string() })?;
        let mut info = self.get_run_info(&experiment_id, run_id)?;
        if info.lifecycle_stage == LifecycleStage::Deleted {
            return Ok(());
        }
        info.lifecycle_stage = LifecycleStage::Deleted;
        info.deleted_time = Some(now_millis());
        self.write_run_info(&info)
    }

    /// Restore a soft-deleted run. Idempotent.
    pub fn restore_run(&self, run_id: &str) -> Result<(), Error> {
        let experiment_id = self
            .find_run_experiment_id(run_id)?
            .ok_or_else(|| Error::RunNotFound { run_id: run_id.to_string() })?;
        let mut info = self.get_run_info(&experiment_id, run_id)?;
        if info.lifecycle_stage == LifecycleStage::Active {
            return Ok(());
        }
        info.lifecycle_stage = LifecycleStage::Active;
        info.deleted_time = None;
        self.write_run_info(&info)
    }

    /// Permanently remove a run's directory. Subsequent reads raise
    /// `ResourceDoesNotExist`.
    pub fn hard_delete_run(&self, run_id: &str) -> Result<(), Error> {
        let experiment_id = self
            .find_run_experiment_id(run_id)?
            .ok_or_else(|| Error::RunNotFound { run_id: run_id.to_string() })?;
        std::fs::remove_dir_all(self.paths.run_dir(&experiment_id, run_id))?;
        Ok(())
    }

    /// List every run under `experiment_ids` matching `view_type`.
    /// Malformed entries are silently excluded.
    pub fn list_runs(&self, experiment_ids: &[String], view_type: ViewType) -> Result<Vec<Run>, Error> {
        let mut out = Vec::new();
        for experiment_id in experiment_ids {
            for run_id in self.paths.list_run_ids(experiment_id)? {
                match self.get_run_info(experiment_id, &run_id) {
                    Ok(info) if view_type.matches(info.lifecycle_stage) => {
                        let data = self.read_run_data(experiment_id, &run_id).unwrap_or_default();
                        out.push(Run { info, data });
                    }
                    Ok(_) => {}
                    Err(_) => {
                        tracing::warn!(run_id, "skipping malformed run in search");
                    }
                }
            }
        }
        Ok(out)
    }

    /// Require that a run is active, for leaf-mutation callers (params,
    /// tags, metrics, batch).
    pub fn require_active(&self, run_id: &str) -> Result<RunInfo, Error> {
        self.require_active_run(run_id)
    }
}

/// Keep `last_update_time` monotone even if the clock has not advanced
/// since the previous write.
fn bump(previous: Option<i64>) -> i64 {
    let now = now_millis();
    match previous {
        Some(p) if p >= now => p + 1,
        _ => now,
    }
}
