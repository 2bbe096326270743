//! Storage layer for the tracking store.
//!
//! This crate implements the on-disk directory layout and metadata I/O:
//!
//! - [`paths`]: Path Resolver — directory shape and naming rules.
//! - [`codec`]: Metadata Codec — small key/value documents with retry on
//!   transient empty reads.
//! - [`entities`]: Entity Store — CRUD and lifecycle for experiments and runs.
//! - [`params`], [`tags`], [`metrics`]: Leaf Stores.
//! - [`batch`]: Batch API.
//! - [`artifact_uri`]: Artifact URI Builder.
//! - [`config`]: store-wide configuration knobs.

#![warn(missing_docs)]

pub mod artifact_uri;
pub mod batch;
pub mod codec;
pub mod config;
pub mod entities;
pub mod metrics;
pub mod params;
pub mod paths;
pub mod tags;

pub use batch::{log_batch, LogBatch};
pub use config::StoreConfig;
pub use entities::EntityStore;
pub use paths::PathResolver;
