//! Node records and the persistence contract the engine is written against.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use memory::{ForestSnapshot, MemoryStore, SNAPSHOT_VERSION};

/// Unbounded upper limit for shift predicates.
pub const UNBOUNDED: i64 = i64::MAX;

/// Node record: a name plus its nested-set interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Unique, non-empty name
    pub name: String,

    /// Left boundary value
    pub left: i64,

    /// Right boundary value, always greater than `left`
    pub right: i64,
}

impl Node {
    pub fn new(name: impl Into<String>, left: i64, right: i64) -> Self {
        Self {
            name: name.into(),
            left,
            right,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.left, self.right)
    }
}

/// Closed integer interval `[left, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub left: i64,
    pub right: i64,
}

impl Interval {
    pub fn new(left: i64, right: i64) -> Self {
        Self { left, right }
    }

    /// Number of boundary values spanned, inclusive. Twice the subtree size.
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Strict containment: `other` is a descendant of `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        self.left < other.left && other.right < self.right
    }

    pub fn is_disjoint(&self, other: &Interval) -> bool {
        self.right < other.left || other.right < self.left
    }
}

/// Persistence collaborator over the node collection.
///
/// Every mutating call made by one engine operation happens between
/// `begin()` and `commit()`/`rollback()`; partial application must never be
/// observable after a rollback.
///
/// Shift predicates are strict at both ends: `shift_left(a, b, d)` adds `d`
/// to `left` of every node with `a < left < b`.
pub trait IntervalStore: Send + Sync {
    // === TRANSACTIONS ===

    /// Open a transaction. Fails if one is already open.
    fn begin(&mut self) -> Result<()>;

    /// Make every change since `begin()` durable.
    fn commit(&mut self) -> Result<()>;

    /// Discard every change since `begin()`.
    fn rollback(&mut self) -> Result<()>;

    // === READS ===

    /// Point lookup by name.
    fn find_by_name(&self, name: &str) -> Result<Option<Node>>;

    /// Nodes with `node.left < left` and `right < node.right` (ancestors of
    /// the interval), ordered by `left`.
    fn find_enclosing(&self, left: i64, right: i64) -> Result<Vec<Node>>;

    /// Nodes with `left < node.left` and `node.right < right` (descendants
    /// of the interval), ordered by `left`.
    fn find_within(&self, left: i64, right: i64) -> Result<Vec<Node>>;

    /// Whole forest ordered by `left`.
    fn all_nodes(&self) -> Result<Vec<Node>>;

    /// Number of stored nodes.
    fn count_all(&self) -> Result<usize>;

    // === WRITES ===

    /// For every node with `after < left < before`: `left += delta`.
    fn shift_left(&mut self, after: i64, before: i64, delta: i64) -> Result<()>;

    /// For every node with `after < right < before`: `right += delta`.
    fn shift_right(&mut self, after: i64, before: i64, delta: i64) -> Result<()>;

    /// Insert a new node. `Conflict` if the name is taken.
    fn insert(&mut self, name: &str, left: i64, right: i64) -> Result<()>;

    /// Overwrite the interval of an existing node. `NotFound` if absent.
    fn set_interval(&mut self, name: &str, left: i64, right: i64) -> Result<()>;

    /// Delete every node with `node.left >= left` and `node.right <= right`.
    /// Returns the number of deleted nodes.
    fn delete_subtree(&mut self, left: i64, right: i64) -> Result<usize>;

    /// Rename a node. `NotFound` if absent, `Conflict` if `new_name` is taken.
    fn rename(&mut self, name: &str, new_name: &str) -> Result<()>;
}
