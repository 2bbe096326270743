//! Query engine: a small filter grammar, ordering and opaque-token
//! pagination layered over [`track_storage::EntityStore`].
//!
//! - [`filter`]: the `Field`/`Op`/`Literal` filter AST and its parser.
//! - [`eval`]: matches a parsed filter against an experiment or run.
//! - [`order`]: `ORDER BY` parsing and deterministic sorting.
//! - [`page`]: `max_results` validation and opaque page tokens.
//! - [`search`]: glues the above together into `search_experiments` /
//!   `search_runs`.

#![warn(missing_docs)]

pub mod eval;
pub mod filter;
pub mod order;
pub mod page;
pub mod search;

pub use filter::{Field, Filter, Literal, Op, Term};
pub use order::OrderTerm;
pub use search::{search_experiments, search_runs};
