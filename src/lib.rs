//! nsdb: nested-set forest storage
//!
//! Stores a labeled forest where each node owns an integer interval
//! `[left, right]`; ancestry is interval containment, so ancestor and
//! descendant queries are range scans with no recursion.
//!
//! - [`storage`]: node records, the [`IntervalStore`] persistence contract
//!   and the in-memory [`MemoryStore`]
//! - [`engine`]: [`TreeEngine`], the transactional add/remove/move/rename
//!   algorithms and queries
//! - [`invariants`]: forest validity checker
//! - [`config`], [`metrics`]: engine tunables and operation counters

pub mod config;
pub mod engine;
pub mod error;
pub mod invariants;
pub mod metrics;
pub mod storage;

pub use config::EngineConfig;
pub use engine::{MovePlan, Relocation, TreeEngine};
pub use error::{ForestError, Result};
pub use invariants::{ForestStats, Violation};
pub use metrics::{Metrics, MetricsSnapshot, Operation};
pub use storage::{ForestSnapshot, Interval, IntervalStore, MemoryStore, Node};
