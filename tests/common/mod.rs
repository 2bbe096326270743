//! Shared helpers for the facade-level integration tests.

#![allow(dead_code)]

use filestore::{FileStore, StoreConfig};
use tempfile::TempDir;

/// Open a fresh store rooted at a throwaway temp directory, tuned with the
/// low retry/backoff settings `StoreConfig::for_testing` uses so corrupt-read
/// retries in these tests don't sit around waiting on real-world defaults.
pub fn store() -> (TempDir, FileStore) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = FileStore::open(dir.path(), StoreConfig::for_testing()).expect("failed to open store");
    (dir, store)
}
