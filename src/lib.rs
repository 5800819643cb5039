//! PivotDB - grouped aggregation engine for column-oriented shard indexes
//!
//! Given per-shard column indexes, a chain of grouping fields and a set of
//! metrics, the engine produces a hierarchical pivot result: one group per
//! key combination at every nesting level, with date truncation, numeric
//! bucketing, text tokenization, top-N selection and multi-shard merging.

pub mod config;
pub mod core;
pub mod query;
pub mod storage;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::{DBError, DBResult};
pub use crate::query::{aggregate, AggregationRequest, AggregationResultTree, AppContext};
