//! Per-run and per-experiment tag store: one file per key, freely
//! overwritable.

use std::path::Path;

use track_core::Error;

use crate::params::list_leaf_files;
use crate::paths::PathResolver;

/// Set a tag's value, overwriting any existing value for the key.
pub fn set_tag(dir: &Path, key: &str, value: &str) -> Result<(), Error> {
    let path = PathResolver::resolve_leaf_key(dir, key)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, value)?;
    Ok(())
}

/// Read a single tag's value, if set.
pub fn get_tag(dir: &Path, key: &str) -> Result<Option<String>, Error> {
    let path = PathResolver::resolve_leaf_key(dir, key)?;
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

/// Delete a tag. Errors if the tag does not exist; checking
/// that the owning entity is active is the caller's responsibility.
pub fn delete_tag(dir: &Path, entity_id: &str, key: &str) -> Result<(), Error> {
    let path = PathResolver::resolve_leaf_key(dir, key)?;
    if !path.exists() {
        return Err(Error::TagNotFound {
            run_id: entity_id.to_string(),
            key: key.to_string(),
        });
    }
    std::fs::remove_file(path)?;
    Ok(())
}

/// List every tag set on an entity. A missing `tags/` directory is treated
/// as empty, not an error.
pub fn list_tags(dir: &Path) -> Result<Vec<(String, String)>, Error> {
    list_leaf_files(dir)
}
