//! TreeEngine - nested-set mutations and queries over an `IntervalStore`
//!
//! Every mutation runs as one transaction on the store while holding the
//! engine's write lock, so concurrent mutations are serialized and readers
//! (which take the read lock) never observe a half-applied shift sequence.
//! All shift coordinates come from a snapshot read inside the same
//! transaction before the first write.
//!
//! # Usage
//!
//! ```
//! use nsdb::TreeEngine;
//!
//! let engine = TreeEngine::in_memory();
//! engine.add_root("Director").unwrap();
//! engine.add_node("Accounting", "Director").unwrap();
//! engine.add_node("Payroll", "Accounting").unwrap();
//!
//! let ancestors = engine.ancestor_names("Payroll").unwrap();
//! assert_eq!(ancestors, vec!["Director", "Accounting"]);
//! ```

pub mod relocation;

use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::{require_name, ForestError, Result};
use crate::invariants;
use crate::metrics::{Metrics, Operation};
use crate::storage::{IntervalStore, MemoryStore, Node, UNBOUNDED};

pub use relocation::{plan_move, MovePlan, Relocation, Shift};

/// Nested-set forest engine.
///
/// Cheap to share: wrap in `Arc` and call from any thread.
pub struct TreeEngine<S: IntervalStore = MemoryStore> {
    store: RwLock<S>,
    config: EngineConfig,
    metrics: Option<Arc<Metrics>>,
}

impl TreeEngine<MemoryStore> {
    /// Empty in-memory forest with default config.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), EngineConfig::default())
    }

    /// In-memory forest seeded with `nodes`, which must satisfy the forest
    /// invariants.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self> {
        Ok(Self::new(MemoryStore::from_nodes(nodes)?, EngineConfig::default()))
    }

    /// Load a forest snapshot from disk.
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        Ok(Self::new(MemoryStore::open(path)?, config))
    }

    /// Persist the committed forest to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.read_lock()?.save_to(path)
    }
}

impl<S: IntervalStore> TreeEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        let metrics = config
            .collect_metrics
            .then(|| Arc::new(Metrics::with_slow_threshold(config.slow_op_threshold_us)));
        Self {
            store: RwLock::new(store),
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Metrics collector, if `collect_metrics` is enabled.
    pub fn metrics(&self) -> Option<&Arc<Metrics>> {
        self.metrics.as_ref()
    }

    // === MUTATIONS ===

    /// Append a new top-level root after every existing node.
    pub fn add_root(&self, name: &str) -> Result<()> {
        self.timed(Operation::AddRoot, || {
            require_name(name, "name")?;
            self.transaction(Operation::AddRoot, |store| {
                if store.find_by_name(name)?.is_some() {
                    return Err(ForestError::Conflict(name.to_string()));
                }
                let left = 2 * store.count_all()? as i64;
                store.insert(name, left, left + 1)?;
                tracing::debug!("AddRoot '{}' at [{}, {}]", name, left, left + 1);
                Ok(())
            })
        })
    }

    /// Attach a new leaf as the rightmost child of `parent`.
    pub fn add_node(&self, name: &str, parent: &str) -> Result<()> {
        self.timed(Operation::AddNode, || {
            require_name(name, "name")?;
            require_name(parent, "parent name")?;
            self.transaction(Operation::AddNode, |store| {
                let parent_node = lookup(&*store, parent)?;
                if store.find_by_name(name)?.is_some() {
                    return Err(ForestError::Conflict(name.to_string()));
                }

                // Every boundary >= parent.right moves up by 2
                let pr = parent_node.right;
                store.shift_left(pr - 1, UNBOUNDED, 2)?;
                store.shift_right(pr - 1, UNBOUNDED, 2)?;
                store.insert(name, pr, pr + 1)?;

                tracing::debug!("AddNode '{}' under '{}' at [{}, {}]", name, parent, pr, pr + 1);
                Ok(())
            })
        })
    }

    /// Delete a node together with its whole subtree and close the gap.
    pub fn remove_node(&self, name: &str) -> Result<()> {
        self.timed(Operation::RemoveNode, || {
            require_name(name, "name")?;
            self.transaction(Operation::RemoveNode, |store| {
                let node = lookup(&*store, name)?;
                let width = node.interval().width();

                let deleted = store.delete_subtree(node.left, node.right)?;
                if 2 * deleted as i64 != width {
                    return Err(ForestError::InvariantViolation(format!(
                        "'{}' spans {} boundary values but {} nodes were deleted",
                        name, width, deleted
                    )));
                }
                store.shift_left(node.right, UNBOUNDED, -width)?;
                store.shift_right(node.right, UNBOUNDED, -width)?;

                tracing::debug!("RemoveNode '{}': {} nodes, gap of {} closed", name, deleted, width);
                Ok(())
            })
        })
    }

    /// Re-attach `name` as a direct child of `new_parent`.
    ///
    /// Only the named node moves; its former descendants are promoted into
    /// the slot it leaves. Returns the relocation case that was applied.
    pub fn move_node(&self, name: &str, new_parent: &str) -> Result<Relocation> {
        self.timed(Operation::MoveNode, || {
            require_name(name, "name")?;
            require_name(new_parent, "new parent name")?;
            self.transaction(Operation::MoveNode, |store| {
                let node = lookup(&*store, name)?;
                let parent = lookup(&*store, new_parent)?;
                if node.name == parent.name {
                    return Err(ForestError::InvalidOperation(
                        "cannot move a node into itself".to_string(),
                    ));
                }
                let plan = plan_move(node.interval(), parent.interval())?;

                for shift in plan.shifts {
                    store.shift_left(shift.after, shift.before, shift.delta)?;
                    store.shift_right(shift.after, shift.before, shift.delta)?;
                }
                store.set_interval(name, plan.target.left, plan.target.right)?;

                tracing::debug!(
                    "MoveNode '{}' -> '{}' ({}): [{}, {}] -> [{}, {}]",
                    name,
                    new_parent,
                    plan.relocation.as_str(),
                    node.left,
                    node.right,
                    plan.target.left,
                    plan.target.right
                );
                Ok(plan.relocation)
            })
        })
    }

    /// Change a node's name. Its interval is untouched.
    pub fn rename_node(&self, name: &str, new_name: &str) -> Result<()> {
        self.timed(Operation::RenameNode, || {
            require_name(name, "name")?;
            require_name(new_name, "new name")?;
            self.transaction(Operation::RenameNode, |store| {
                store.rename(name, new_name)?;
                tracing::debug!("RenameNode '{}' -> '{}'", name, new_name);
                Ok(())
            })
        })
    }

    // === QUERIES ===

    /// Every ancestor of `name`, root first.
    pub fn get_ancestors(&self, name: &str) -> Result<Vec<Node>> {
        self.timed(Operation::GetAncestors, || {
            require_name(name, "name")?;
            let store = self.read_lock()?;
            let node = lookup(&*store, name)?;
            store.find_enclosing(node.left, node.right)
        })
    }

    /// Every descendant of `name` (direct and indirect), ordered by `left`.
    pub fn get_children(&self, name: &str) -> Result<Vec<Node>> {
        self.timed(Operation::GetChildren, || {
            require_name(name, "name")?;
            let store = self.read_lock()?;
            let node = lookup(&*store, name)?;
            store.find_within(node.left, node.right)
        })
    }

    /// The whole forest ordered by `left`.
    pub fn get_all(&self) -> Result<Vec<Node>> {
        self.timed(Operation::GetAll, || self.read_lock()?.all_nodes())
    }

    pub fn ancestor_names(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.get_ancestors(name)?.into_iter().map(|n| n.name).collect())
    }

    pub fn descendant_names(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.get_children(name)?.into_iter().map(|n| n.name).collect())
    }

    /// Point lookup. Not measured.
    pub fn find(&self, name: &str) -> Result<Option<Node>> {
        self.read_lock()?.find_by_name(name)
    }

    pub fn node_count(&self) -> Result<usize> {
        self.read_lock()?.count_all()
    }

    /// Run the invariant checker over a consistent read of the forest.
    pub fn verify(&self) -> Result<()> {
        invariants::verify(&self.read_lock()?.all_nodes()?)
    }

    pub fn into_store(self) -> Result<S> {
        self.store
            .into_inner()
            .map_err(|_| ForestError::Storage("forest lock poisoned".to_string()))
    }

    // === INTERNALS ===

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, S>> {
        self.store
            .read()
            .map_err(|_| ForestError::Storage("forest lock poisoned".to_string()))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, S>> {
        self.store
            .write()
            .map_err(|_| ForestError::Storage("forest lock poisoned".to_string()))
    }

    fn timed<T>(&self, op: Operation, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let started = Instant::now();
        let result = f();
        if let Some(metrics) = &self.metrics {
            metrics.record(op, started.elapsed().as_micros() as u64);
        }
        result
    }

    /// Run `f` inside one store transaction under the write lock. Any error,
    /// including a failed invariant check, rolls the whole mutation back.
    fn transaction<T>(&self, op: Operation, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        let mut store = self.write_lock()?;
        store.begin()?;

        let outcome = f(&mut *store).and_then(|value| {
            if self.config.verify_invariants {
                invariants::verify(&store.all_nodes()?)?;
            }
            Ok(value)
        });

        let outcome = outcome.and_then(|value| store.commit().map(|()| value));
        if let Err(cause) = &outcome {
            self.abort(&mut *store, op, cause);
        }
        outcome
    }

    fn abort(&self, store: &mut S, op: Operation, cause: &ForestError) {
        if let Some(metrics) = &self.metrics {
            metrics.record_abort();
        }
        match cause {
            ForestError::InvalidArgument(_)
            | ForestError::NotFound(_)
            | ForestError::Conflict(_)
            | ForestError::InvalidOperation(_) => {
                tracing::debug!("{} rejected: {}", op.as_str(), cause);
            }
            _ => tracing::warn!("{} rolled back: {}", op.as_str(), cause),
        }
        if let Err(e) = store.rollback() {
            tracing::warn!("{} rollback failed: {}", op.as_str(), e);
        }
    }
}

fn lookup<S: IntervalStore + ?Sized>(store: &S, name: &str) -> Result<Node> {
    store
        .find_by_name(name)?
        .ok_or_else(|| ForestError::NotFound(name.to_string()))
}
