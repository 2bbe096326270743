//! Identifier generation for experiments and runs.

use rand::Rng;
use uuid::Uuid;

use crate::types::EXPERIMENT_ID_FIXED_WIDTH;

/// Generate a new opaque experiment id: a fixed-width, zero-padded decimal
/// string.
///
/// Uniqueness against existing experiments is the caller's responsibility
/// (the entity store retries on directory-already-exists, see
/// `track-storage::entities`).
pub fn new_experiment_id() -> String {
    let n: u64 = rand::thread_rng().gen_range(0..10u64.pow(EXPERIMENT_ID_FIXED_WIDTH as u32 - 1));
    format!("{:0width$}", n, width = EXPERIMENT_ID_FIXED_WIDTH)
}

/// Generate a new 32-character hex run id.
///
/// A `Uuid::new_v4()` rendered in "simple" form is exactly 32 lowercase hex
/// characters with no hyphens, which is the on-disk run id format.
pub fn new_run_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_id_has_fixed_width() {
        for _ in 0..20 {
            assert_eq!(new_experiment_id().len(), EXPERIMENT_ID_FIXED_WIDTH);
        }
    }

    #[test]
    fn run_id_is_32_hex_chars() {
        for _ in 0..20 {
            let id = new_run_id();
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn run_ids_are_unique_with_overwhelming_probability() {
        let a = new_run_id();
        let b = new_run_id();
        assert_ne!(a, b);
    }
}
