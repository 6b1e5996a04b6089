//! Forest invariant checker.
//!
//! A committed forest of n nodes must satisfy:
//! - unique, non-empty names
//! - `left < right` for every node
//! - gapless numbering: the boundary values are exactly `0 .. 2n-1`
//! - laminar family: two intervals are disjoint or strictly nested
//! - subtree width: `right - left + 1` equals twice the subtree size
//!
//! Used by tests, by `MemoryStore::from_nodes`, by the `forest_check`
//! binary, and by the engine when `EngineConfig::verify_invariants` is set.

use std::collections::HashSet;

use thiserror::Error;

use crate::error::{ForestError, Result};
use crate::storage::Node;

/// A single broken invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("node with empty name at [{left}, {right}]")]
    EmptyName { left: i64, right: i64 },

    #[error("duplicate name '{0}'")]
    DuplicateName(String),

    #[error("'{name}' has empty interval [{left}, {right}]")]
    EmptyInterval { name: String, left: i64, right: i64 },

    #[error("'{name}' has boundary {value} outside 0..{limit}")]
    BoundaryOutOfRange { name: String, value: i64, limit: i64 },

    #[error("boundary value {0} used more than once")]
    DuplicateBoundary(i64),

    #[error("'{outer}' and '{inner}' partially overlap")]
    PartialOverlap { outer: String, inner: String },

    #[error("'{name}' spans {width} boundary values but its subtree holds {nodes} nodes")]
    WidthMismatch { name: String, width: i64, nodes: usize },
}

/// Collect every violation in `nodes`. Empty means the forest is valid.
pub fn check(nodes: &[Node]) -> Vec<Violation> {
    let mut violations = Vec::new();

    // Names
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if node.name.trim().is_empty() {
            violations.push(Violation::EmptyName { left: node.left, right: node.right });
        } else if !seen.insert(node.name.as_str()) {
            violations.push(Violation::DuplicateName(node.name.clone()));
        }
        if node.left >= node.right {
            violations.push(Violation::EmptyInterval {
                name: node.name.clone(),
                left: node.left,
                right: node.right,
            });
        }
    }

    // Gapless numbering. 2n in-range values with no repeats cover 0..2n-1.
    let limit = 2 * nodes.len() as i64;
    let mut used = vec![false; nodes.len() * 2];
    for node in nodes {
        for value in [node.left, node.right] {
            if value < 0 || value >= limit {
                violations.push(Violation::BoundaryOutOfRange {
                    name: node.name.clone(),
                    value,
                    limit,
                });
            } else if std::mem::replace(&mut used[value as usize], true) {
                violations.push(Violation::DuplicateBoundary(value));
            }
        }
    }

    // Laminar family + subtree width
    let mut sorted: Vec<&Node> = nodes.iter().filter(|n| n.left < n.right).collect();
    sorted.sort_by_key(|n| n.left);

    let mut open: Vec<&Node> = Vec::new();
    for node in &sorted {
        while open.last().is_some_and(|top| top.right < node.left) {
            open.pop();
        }
        if let Some(top) = open.last() {
            if node.right >= top.right {
                violations.push(Violation::PartialOverlap {
                    outer: top.name.clone(),
                    inner: node.name.clone(),
                });
            }
        }
        open.push(node);
    }

    let lefts: Vec<i64> = sorted.iter().map(|n| n.left).collect();
    for node in &sorted {
        let start = lefts.partition_point(|&l| l < node.left);
        let end = lefts.partition_point(|&l| l <= node.right);
        let subtree = end - start;
        let width = node.right - node.left + 1;
        if width != 2 * subtree as i64 {
            violations.push(Violation::WidthMismatch {
                name: node.name.clone(),
                width,
                nodes: subtree,
            });
        }
    }

    violations
}

/// Fail with the first violation found, if any.
pub fn verify(nodes: &[Node]) -> Result<()> {
    match check(nodes).into_iter().next() {
        Some(violation) => Err(ForestError::InvariantViolation(violation.to_string())),
        None => Ok(()),
    }
}

/// Shape summary of a (valid) forest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForestStats {
    pub nodes: usize,
    pub roots: usize,
    pub leaves: usize,
    /// Depth of the deepest node; roots have depth 1. Zero for an empty forest.
    pub max_depth: usize,
}

impl ForestStats {
    pub fn collect(nodes: &[Node]) -> Self {
        let mut sorted: Vec<&Node> = nodes.iter().collect();
        sorted.sort_by_key(|n| n.left);

        let mut stats = ForestStats {
            nodes: nodes.len(),
            ..Self::default()
        };
        let mut open: Vec<i64> = Vec::new();
        for node in sorted {
            while open.last().is_some_and(|&right| right < node.left) {
                open.pop();
            }
            if open.is_empty() {
                stats.roots += 1;
            }
            if node.right - node.left == 1 {
                stats.leaves += 1;
            }
            open.push(node.right);
            stats.max_depth = stats.max_depth.max(open.len());
        }
        stats
    }
}
