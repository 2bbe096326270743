//! Directory layout and path resolution.
//!
//! ```text
//! <root>/
//!   <experiment_id>/
//!     meta.yaml
//!     tags/<tag_key>
//!     <run_id>/
//!       meta.yaml
//!       params/<key>
//!       tags/<key>
//!       metrics/<key>
//!       artifacts/
//! ```

use std::path::{Path, PathBuf};

use track_core::Error;

/// Name of the metadata document inside an experiment or run directory.
pub const META_FILE: &str = "meta.yaml";

/// Resolves (experiment id, run id, subkey) triples to on-disk paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at the given store directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PathResolver { root: root.into() }
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for an experiment.
    pub fn experiment_dir(&self, experiment_id: &str) -> PathBuf {
        self.root.join(experiment_id)
    }

    /// Metadata document path for an experiment.
    pub fn experiment_meta(&self, experiment_id: &str) -> PathBuf {
        self.experiment_dir(experiment_id).join(META_FILE)
    }

    /// Tag directory for an experiment.
    pub fn experiment_tags_dir(&self, experiment_id: &str) -> PathBuf {
        self.experiment_dir(experiment_id).join("tags")
    }

    /// Directory for a run, nested under its experiment.
    pub fn run_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.experiment_dir(experiment_id).join(run_id)
    }

    /// Metadata document path for a run.
    pub fn run_meta(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.run_dir(experiment_id, run_id).join(META_FILE)
    }

    /// Params directory for a run.
    pub fn params_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.run_dir(experiment_id, run_id).join("params")
    }

    /// Tags directory for a run.
    pub fn run_tags_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.run_dir(experiment_id, run_id).join("tags")
    }

    /// Metrics directory for a run.
    pub fn metrics_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.run_dir(experiment_id, run_id).join("metrics")
    }

    /// Artifacts directory for a run (opaque to this layer).
    pub fn artifacts_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.run_dir(experiment_id, run_id).join("artifacts")
    }

    /// List experiment ids present on disk (each subdirectory of `root` that
    /// contains a `meta.yaml`, legacy integer-looking names included).
    pub fn list_experiment_ids(&self) -> std::io::Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
        Ok(ids)
    }

    /// List run ids present under an experiment directory.
    pub fn list_run_ids(&self, experiment_id: &str) -> std::io::Result<Vec<String>> {
        let dir = self.experiment_dir(experiment_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name == "tags" {
                    continue;
                }
                ids.push(name.to_string());
            }
        }
        Ok(ids)
    }

    /// Ensure the directory structure for a new experiment exists.
    pub fn ensure_experiment_dirs(&self, experiment_id: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(self.experiment_dir(experiment_id))?;
        std::fs::create_dir_all(self.experiment_tags_dir(experiment_id))?;
        Ok(())
    }

    /// Ensure the directory structure for a new run exists.
    pub fn ensure_run_dirs(&self, experiment_id: &str, run_id: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(self.run_dir(experiment_id, run_id))?;
        std::fs::create_dir_all(self.params_dir(experiment_id, run_id))?;
        std::fs::create_dir_all(self.run_tags_dir(experiment_id, run_id))?;
        std::fs::create_dir_all(self.metrics_dir(experiment_id, run_id))?;
        std::fs::create_dir_all(self.artifacts_dir(experiment_id, run_id))?;
        Ok(())
    }

    /// Derive the enclosing experiment id from a run directory's parent
    /// directory name, cross-checking it against the id recorded in the
    /// run's own document. Mismatches indicate corruption.
    pub fn check_run_experiment_id(
        &self,
        path_experiment_id: &str,
        doc_experiment_id: &str,
    ) -> Result<(), Error> {
        if path_experiment_id != doc_experiment_id {
            return Err(Error::Corruption {
                path: self.experiment_dir(path_experiment_id),
                reason: format!(
                    "run's enclosing directory is experiment '{path_experiment_id}' but its \
                     metadata records experiment_id '{doc_experiment_id}'"
                ),
            });
        }
        Ok(())
    }

    /// Resolve a leaf key (param/tag name) to a path inside `dir`, rejecting
    /// any attempt to escape the directory via `..` or an absolute path.
    pub fn resolve_leaf_key(dir: &Path, key: &str) -> Result<PathBuf, Error> {
        let rel = Path::new(key);
        if rel.is_absolute() || rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(Error::PathEscape { key: key.to_string() });
        }
        Ok(dir.join(rel))
    }
}
