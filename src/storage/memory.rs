//! In-memory interval store with undo-snapshot transactions.
//!
//! The forest is a single owned aggregate: a slot vector of node records
//! plus a name index pointing into it. Nothing outside the store holds a
//! reference to a record; callers re-fetch by name after every mutation.
//!
//! Transactions copy the aggregate on `begin()` and restore that copy on
//! `rollback()`. Every engine mutation already touches O(n) boundaries in
//! the worst case, so the copy does not change the complexity class.
//!
//! Snapshots are persisted as JSON:
//!
//! ```text
//! {"version": 1, "nodes": [{"name": "...", "left": 0, "right": 1}, ...]}
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForestError, Result};
use crate::invariants;
use super::{IntervalStore, Node};

/// Current on-disk snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a whole forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSnapshot {
    pub version: u32,
    pub nodes: Vec<Node>,
}

/// Node slots keyed by name.
#[derive(Debug, Clone, Default)]
struct Slots {
    nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
}

impl Slots {
    fn from_nodes(nodes: Vec<Node>) -> Self {
        let by_name = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.name.clone(), idx))
            .collect();
        Self { nodes, by_name }
    }

    fn reindex(&mut self) {
        self.by_name.clear();
        for (idx, node) in self.nodes.iter().enumerate() {
            self.by_name.insert(node.name.clone(), idx);
        }
    }

    fn sorted_where(&self, keep: impl Fn(&Node) -> bool) -> Vec<Node> {
        let mut out: Vec<Node> = self.nodes.iter().filter(|n| keep(n)).cloned().collect();
        out.sort_by_key(|n| n.left);
        out
    }
}

/// Owned in-memory forest implementing [`IntervalStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Slots,
    /// Committed state captured by `begin()`; `Some` while a transaction is open.
    undo: Option<Slots>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records.
    ///
    /// The records must already satisfy the forest invariants; anything
    /// else is rejected with `InvariantViolation`.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self> {
        invariants::verify(&nodes)?;
        Ok(Self {
            slots: Slots::from_nodes(nodes),
            undo: None,
        })
    }

    /// Load a store from a JSON snapshot file.
    pub fn open(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: ForestSnapshot = serde_json::from_str(&contents)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ForestError::InvariantViolation(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        let store = Self::from_nodes(snapshot.nodes)?;
        tracing::info!("loaded forest snapshot {:?}: {} nodes", path, store.len());
        Ok(store)
    }

    /// Write the committed state to `path`.
    ///
    /// Goes through a sibling temp file that is synced to disk before it is
    /// renamed over `path`, so a crash mid-write leaves the previous snapshot
    /// intact.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_vec_pretty(&snapshot)?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, path)?;
        tracing::info!("saved forest snapshot {:?}: {} nodes", path, snapshot.nodes.len());
        Ok(())
    }

    /// Committed state, ordered by `left`. Ignores any open transaction.
    pub fn snapshot(&self) -> ForestSnapshot {
        let committed = self.undo.as_ref().unwrap_or(&self.slots);
        ForestSnapshot {
            version: SNAPSHOT_VERSION,
            nodes: committed.sorted_where(|_| true),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.nodes.is_empty()
    }

    pub fn in_transaction(&self) -> bool {
        self.undo.is_some()
    }
}

impl IntervalStore for MemoryStore {
    fn begin(&mut self) -> Result<()> {
        if self.undo.is_some() {
            return Err(ForestError::Storage("transaction already open".to_string()));
        }
        self.undo = Some(self.slots.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.undo
            .take()
            .map(|_| ())
            .ok_or_else(|| ForestError::Storage("commit without open transaction".to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        let committed = self
            .undo
            .take()
            .ok_or_else(|| ForestError::Storage("rollback without open transaction".to_string()))?;
        self.slots = committed;
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Node>> {
        Ok(self
            .slots
            .by_name
            .get(name)
            .map(|&idx| self.slots.nodes[idx].clone()))
    }

    fn find_enclosing(&self, left: i64, right: i64) -> Result<Vec<Node>> {
        Ok(self.slots.sorted_where(|n| n.left < left && right < n.right))
    }

    fn find_within(&self, left: i64, right: i64) -> Result<Vec<Node>> {
        Ok(self.slots.sorted_where(|n| left < n.left && n.right < right))
    }

    fn all_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.slots.sorted_where(|_| true))
    }

    fn count_all(&self) -> Result<usize> {
        Ok(self.slots.nodes.len())
    }

    fn shift_left(&mut self, after: i64, before: i64, delta: i64) -> Result<()> {
        for node in self.slots.nodes.iter_mut() {
            if after < node.left && node.left < before {
                node.left += delta;
            }
        }
        Ok(())
    }

    fn shift_right(&mut self, after: i64, before: i64, delta: i64) -> Result<()> {
        for node in self.slots.nodes.iter_mut() {
            if after < node.right && node.right < before {
                node.right += delta;
            }
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, left: i64, right: i64) -> Result<()> {
        if self.slots.by_name.contains_key(name) {
            return Err(ForestError::Conflict(name.to_string()));
        }
        self.slots.by_name.insert(name.to_string(), self.slots.nodes.len());
        self.slots.nodes.push(Node::new(name, left, right));
        Ok(())
    }

    fn set_interval(&mut self, name: &str, left: i64, right: i64) -> Result<()> {
        let idx = *self
            .slots
            .by_name
            .get(name)
            .ok_or_else(|| ForestError::NotFound(name.to_string()))?;
        let node = &mut self.slots.nodes[idx];
        node.left = left;
        node.right = right;
        Ok(())
    }

    fn delete_subtree(&mut self, left: i64, right: i64) -> Result<usize> {
        let before = self.slots.nodes.len();
        self.slots
            .nodes
            .retain(|n| !(n.left >= left && n.right <= right));
        let deleted = before - self.slots.nodes.len();
        if deleted > 0 {
            self.slots.reindex();
        }
        Ok(deleted)
    }

    fn rename(&mut self, name: &str, new_name: &str) -> Result<()> {
        let idx = *self
            .slots
            .by_name
            .get(name)
            .ok_or_else(|| ForestError::NotFound(name.to_string()))?;
        if name == new_name {
            return Ok(());
        }
        if self.slots.by_name.contains_key(new_name) {
            return Err(ForestError::Conflict(new_name.to_string()));
        }
        self.slots.by_name.remove(name);
        self.slots.by_name.insert(new_name.to_string(), idx);
        self.slots.nodes[idx].name = new_name.to_string();
        Ok(())
    }
}
