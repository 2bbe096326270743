//! Store-wide configuration knobs.
//!
//! Pulled out of what would otherwise be module-level constants so callers
//! can override them per store, following the same explicit builder-struct
//! pattern used for database configuration elsewhere in this workspace.

use std::time::Duration;

/// Configuration for a [`crate::entities::EntityStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Default `max_results` applied when a search call omits one.
    pub search_max_results_default: u32,
    /// Hard upper bound on `max_results`; requests above this are rejected.
    pub search_max_results_limit: u32,
    /// Maximum accepted length, in characters, of a param value.
    pub param_value_max_length: usize,
    /// Number of retry attempts the metadata codec makes on a transient
    /// empty/unparseable read.
    pub codec_retry_attempts: u32,
    /// Backoff between metadata codec retry attempts.
    pub codec_retry_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            search_max_results_default: 1_000,
            search_max_results_limit: 50_000,
            param_value_max_length: 500,
            codec_retry_attempts: 3,
            codec_retry_backoff: Duration::from_millis(5),
        }
    }
}

impl StoreConfig {
    /// Configuration tuned for fast tests: same limits, no sleep on retry.
    pub fn for_testing() -> Self {
        StoreConfig {
            codec_retry_backoff: Duration::from_millis(0),
            ..Default::default()
        }
    }

    /// Override `search_max_results_limit`.
    pub fn with_search_max_results_limit(mut self, limit: u32) -> Self {
        self.search_max_results_limit = limit;
        self
    }
}
