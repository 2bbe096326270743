//! Per-run param store: one file per key, immutable after first write.

use std::path::Path;

use track_core::Error;

use crate::config::StoreConfig;
use crate::paths::PathResolver;

/// Set a param's value. A repeat write of the identical value is a no-op;
/// a write of a different value is rejected.
pub fn log_param(
    dir: &Path,
    run_id: &str,
    key: &str,
    value: &str,
    config: &StoreConfig,
) -> Result<(), Error> {
    if value.chars().count() > config.param_value_max_length {
        return Err(Error::ValueExceededLength {
            key: key.to_string(),
            limit: config.param_value_max_length,
            actual: value.chars().count(),
        });
    }
    let path = PathResolver::resolve_leaf_key(dir, key)?;
    if let Some(existing) = read_one(&path)? {
        if existing != value {
            return Err(Error::ParamValueChanged {
                run_id: run_id.to_string(),
                key: key.to_string(),
                old_value: existing,
                new_value: value.to_string(),
            });
        }
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, value)?;
    tracing::debug!(run_id, key, "logged param");
    Ok(())
}

/// Read a single param's value, if logged.
pub fn get_param(dir: &Path, key: &str) -> Result<Option<String>, Error> {
    let path = PathResolver::resolve_leaf_key(dir, key)?;
    read_one(&path)
}

/// List every param logged for a run. A missing `params/` directory (no
/// params logged yet) is treated as empty, not an error.
pub fn list_params(dir: &Path) -> Result<Vec<(String, String)>, Error> {
    list_leaf_files(dir)
}

fn read_one(path: &Path) -> Result<Option<String>, Error> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

pub(crate) fn list_leaf_files(dir: &Path) -> Result<Vec<(String, String)>, Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in walk_files(dir)? {
        let rel = entry
            .strip_prefix(dir)
            .expect("walked entry is under dir")
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        let value = std::fs::read_to_string(&entry)?;
        out.push((rel, value));
    }
    Ok(out)
}

/// Recursively list regular files under `dir`, supporting keys that
/// contain slashes (e.g. `"this is/a weird/but valid param"`, which is
/// itself a nested path on disk).
fn walk_files(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
        for entry in std::fs::read_dir(&d)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn repeat_identical_value_is_noop() {
        let dir = tempdir().unwrap();
        let cfg = StoreConfig::for_testing();
        log_param(dir.path(), "r1", "lr", "0.01", &cfg).unwrap();
        log_param(dir.path(), "r1", "lr", "0.01", &cfg).unwrap();
        assert_eq!(get_param(dir.path(), "lr").unwrap(), Some("0.01".to_string()));
    }

    #[test]
    fn differing_value_is_rejected() {
        let dir = tempdir().unwrap();
        let cfg = StoreConfig::for_testing();
        log_param(dir.path(), "r1", "lr", "0.01", &cfg).unwrap();
        let err = log_param(dir.path(), "r1", "lr", "0.02", &cfg).unwrap_err();
        assert!(matches!(err, Error::ParamValueChanged { .. }));
        assert_eq!(get_param(dir.path(), "lr").unwrap(), Some("0.01".to_string()));
    }

    #[test]
    fn value_length_boundary() {
        let dir = tempdir().unwrap();
        let cfg = StoreConfig::for_testing();
        let ok_value = "x".repeat(500);
        log_param(dir.path(), "r1", "p", &ok_value, &cfg).unwrap();

        let too_long = "x".repeat(1000);
        let err = log_param(dir.path(), "r1", "p2", &too_long, &cfg).unwrap_err();
        assert!(matches!(err, Error::ValueExceededLength { .. }));
    }

    #[test]
    fn key_with_slashes_is_valid() {
        let dir = tempdir().unwrap();
        let cfg = StoreConfig::for_testing();
        log_param(dir.path(), "r1", "this is/a weird/but valid param", "v", &cfg).unwrap();
        assert_eq!(
            get_param(dir.path(), "this is/a weird/but valid param").unwrap(),
            Some("v".to_string())
        );
    }

    #[test]
    fn key_path_escape_rejected() {
        let dir = tempdir().unwrap();
        let cfg = StoreConfig::for_testing();
        let err = log_param(dir.path(), "r1", "../escape", "v", &cfg).unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));
    }

    #[test]
    fn list_params_on_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("params");
        assert!(list_params(&missing).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn repeated_writes_of_same_value_stay_idempotent(
            value in "[a-zA-Z0-9]{1,50}",
            repeats in 1usize..10,
        ) {
            let dir = tempdir().unwrap();
            let cfg = StoreConfig::for_testing();
            for _ in 0..repeats {
                log_param(dir.path(), "r1", "k", &value, &cfg).unwrap();
            }
            prop_assert_eq!(get_param(dir.path(), "k").unwrap(), Some(value));
        }
    }
}
