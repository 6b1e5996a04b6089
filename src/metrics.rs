//! Operation metrics for the forest engine
//!
//! Lightweight, thread-safe counters recorded on every engine call:
//! - Latency percentiles (p50, p95, p99) over a rolling window
//! - Per-operation call counts and average latency
//! - Recent slow operations
//! - Aborted (rolled back) mutations
//!
//! Uses only atomics and the standard library. Latencies are in
//! microseconds since a single in-memory operation rarely reaches 1ms.
//!
//! # Example
//!
//! ```
//! use nsdb::metrics::{Metrics, Operation};
//!
//! let metrics = Metrics::new();
//! metrics.record(Operation::MoveNode, 42);
//!
//! let stats = metrics.snapshot();
//! assert_eq!(stats.op_count, 1);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Number of recent latencies kept for percentile calculation.
const LATENCY_WINDOW_SIZE: usize = 1000;

/// Number of recent slow operations kept for reporting.
const MAX_SLOW_OPS: usize = 10;

/// Number of distinct `Operation` variants.
const OP_COUNT: usize = 8;

/// Default slow-operation threshold in microseconds.
pub const DEFAULT_SLOW_OP_THRESHOLD_US: u64 = 10_000;

/// Engine entry points that are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AddRoot,
    AddNode,
    RemoveNode,
    MoveNode,
    RenameNode,
    GetAncestors,
    GetChildren,
    GetAll,
}

impl Operation {
    pub const ALL: [Operation; OP_COUNT] = [
        Operation::AddRoot,
        Operation::AddNode,
        Operation::RemoveNode,
        Operation::MoveNode,
        Operation::RenameNode,
        Operation::GetAncestors,
        Operation::GetChildren,
        Operation::GetAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::AddRoot => "AddRoot",
            Operation::AddNode => "AddNode",
            Operation::RemoveNode => "RemoveNode",
            Operation::MoveNode => "MoveNode",
            Operation::RenameNode => "RenameNode",
            Operation::GetAncestors => "GetAncestors",
            Operation::GetChildren => "GetChildren",
            Operation::GetAll => "GetAll",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::AddRoot
                | Operation::AddNode
                | Operation::RemoveNode
                | Operation::MoveNode
                | Operation::RenameNode
        )
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Thread-safe metrics collector. Share it behind an `Arc`.
pub struct Metrics {
    op_count: AtomicU64,
    mutation_count: AtomicU64,
    slow_op_count: AtomicU64,
    aborted_count: AtomicU64,

    /// Rolling window of recent latencies
    latencies_us: Mutex<VecDeque<u64>>,
    latency_sum_us: AtomicU64,

    /// Indexed by `Operation::index()`
    op_counts: [AtomicU64; OP_COUNT],
    op_latency_sums: [AtomicU64; OP_COUNT],

    slow_ops: Mutex<VecDeque<SlowOp>>,
    slow_threshold_us: u64,

    started_at: Instant,
}

/// A recorded slow operation.
#[derive(Clone, Debug, PartialEq)]
pub struct SlowOp {
    pub operation: Operation,
    pub duration_us: u64,
    /// Milliseconds since metrics started
    pub timestamp_ms: u64,
}

/// Point-in-time copy of all metrics.
#[derive(Clone, Debug, Default)]
pub struct MetricsSnapshot {
    pub op_count: u64,
    /// Calls to mutating operations, including rejected and rolled back ones
    pub mutation_count: u64,
    pub slow_op_count: u64,
    pub aborted_count: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub avg_us: u64,
    pub recent_slow_ops: Vec<SlowOp>,
    pub uptime_secs: u64,
    /// Operations with at least one call, most frequent first
    pub op_stats: Vec<OperationStat>,
}

/// Per-operation totals.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationStat {
    pub operation: Operation,
    pub count: u64,
    pub avg_us: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::with_slow_threshold(DEFAULT_SLOW_OP_THRESHOLD_US)
    }

    pub fn with_slow_threshold(slow_threshold_us: u64) -> Self {
        Self {
            op_count: AtomicU64::new(0),
            mutation_count: AtomicU64::new(0),
            slow_op_count: AtomicU64::new(0),
            aborted_count: AtomicU64::new(0),
            latencies_us: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW_SIZE)),
            latency_sum_us: AtomicU64::new(0),
            op_counts: Default::default(),
            op_latency_sums: Default::default(),
            slow_ops: Mutex::new(VecDeque::with_capacity(MAX_SLOW_OPS)),
            slow_threshold_us,
            started_at: Instant::now(),
        }
    }

    /// Record one completed engine call, successful or not.
    pub fn record(&self, operation: Operation, duration_us: u64) {
        self.op_count.fetch_add(1, Ordering::Relaxed);
        if operation.is_mutation() {
            self.mutation_count.fetch_add(1, Ordering::Relaxed);
        }
        self.op_counts[operation.index()].fetch_add(1, Ordering::Relaxed);
        self.op_latency_sums[operation.index()].fetch_add(duration_us, Ordering::Relaxed);

        // A poisoned window only loses percentile data; counters stay exact.
        if let Ok(mut latencies) = self.latencies_us.lock() {
            if latencies.len() >= LATENCY_WINDOW_SIZE {
                if let Some(old) = latencies.pop_front() {
                    self.latency_sum_us.fetch_sub(old, Ordering::Relaxed);
                }
            }
            latencies.push_back(duration_us);
            self.latency_sum_us.fetch_add(duration_us, Ordering::Relaxed);
        }

        if duration_us >= self.slow_threshold_us {
            self.slow_op_count.fetch_add(1, Ordering::Relaxed);
            let slow = SlowOp {
                operation,
                duration_us,
                timestamp_ms: self.started_at.elapsed().as_millis() as u64,
            };
            if let Ok(mut slow_ops) = self.slow_ops.lock() {
                if slow_ops.len() >= MAX_SLOW_OPS {
                    slow_ops.pop_front();
                }
                slow_ops.push_back(slow);
            }
        }
    }

    /// Record a mutation whose transaction was rolled back.
    pub fn record_abort(&self) {
        self.aborted_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (p50, p95, p99, avg) = match self.latencies_us.lock() {
            Ok(latencies) if !latencies.is_empty() => {
                let mut sorted: Vec<u64> = latencies.iter().copied().collect();
                sorted.sort_unstable();

                let len = sorted.len();
                let p50 = sorted[len * 50 / 100];
                let p95 = sorted[len * 95 / 100];
                let p99 = sorted.get(len * 99 / 100).copied().unwrap_or(sorted[len - 1]);
                let avg = self.latency_sum_us.load(Ordering::Relaxed) / len as u64;
                (p50, p95, p99, avg)
            }
            _ => (0, 0, 0, 0),
        };

        let recent_slow_ops = self
            .slow_ops
            .lock()
            .map(|slow| slow.iter().cloned().collect())
            .unwrap_or_default();

        MetricsSnapshot {
            op_count: self.op_count.load(Ordering::Relaxed),
            mutation_count: self.mutation_count.load(Ordering::Relaxed),
            slow_op_count: self.slow_op_count.load(Ordering::Relaxed),
            aborted_count: self.aborted_count.load(Ordering::Relaxed),
            p50_us: p50,
            p95_us: p95,
            p99_us: p99,
            avg_us: avg,
            recent_slow_ops,
            uptime_secs: self.started_at.elapsed().as_secs(),
            op_stats: self.operation_stats(),
        }
    }

    fn operation_stats(&self) -> Vec<OperationStat> {
        let mut stats: Vec<OperationStat> = Operation::ALL
            .iter()
            .filter_map(|&operation| {
                let count = self.op_counts[operation.index()].load(Ordering::Relaxed);
                if count == 0 {
                    return None;
                }
                let sum = self.op_latency_sums[operation.index()].load(Ordering::Relaxed);
                Some(OperationStat {
                    operation,
                    count,
                    avg_us: sum / count,
                })
            })
            .collect();

        stats.sort_by(|a, b| b.count.cmp(&a.count));
        stats
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_new() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.op_count, 0);
        assert_eq!(snapshot.p50_us, 0);
        assert_eq!(snapshot.aborted_count, 0);
        assert!(snapshot.op_stats.is_empty());
        assert!(snapshot.recent_slow_ops.is_empty());
    }

    #[test]
    fn test_record_counts_per_operation() {
        let metrics = Metrics::new();
        metrics.record(Operation::AddNode, 10);
        metrics.record(Operation::AddNode, 30);
        metrics.record(Operation::MoveNode, 5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.op_count, 3);
        assert_eq!(snapshot.op_stats.len(), 2);
        assert_eq!(
            snapshot.op_stats[0],
            OperationStat { operation: Operation::AddNode, count: 2, avg_us: 20 }
        );
        assert_eq!(snapshot.op_stats[1].operation, Operation::MoveNode);
    }

    #[test]
    fn test_slow_ops_tracked_and_bounded() {
        let metrics = Metrics::with_slow_threshold(100);
        metrics.record(Operation::GetAll, 99);
        assert_eq!(metrics.snapshot().slow_op_count, 0);

        for i in 0..15 {
            metrics.record(Operation::RemoveNode, 100 + i);
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.slow_op_count, 15);
        assert_eq!(snapshot.recent_slow_ops.len(), MAX_SLOW_OPS);
        // Oldest evicted first
        assert_eq!(snapshot.recent_slow_ops[0].duration_us, 105);
        assert_eq!(snapshot.recent_slow_ops[0].operation, Operation::RemoveNode);
    }

    #[test]
    fn test_percentiles() {
        let metrics = Metrics::new();
        for i in 1..=100 {
            metrics.record(Operation::GetChildren, i);
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.p50_us, 51);
        assert_eq!(snapshot.p95_us, 96);
        assert_eq!(snapshot.p99_us, 100);
        assert_eq!(snapshot.avg_us, 50);
    }

    #[test]
    fn test_latency_window_eviction() {
        let metrics = Metrics::new();
        for _ in 0..LATENCY_WINDOW_SIZE {
            metrics.record(Operation::GetAll, 1);
        }
        for _ in 0..LATENCY_WINDOW_SIZE {
            metrics.record(Operation::GetAll, 3);
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.avg_us, 3);
        assert_eq!(snapshot.op_count, 2 * LATENCY_WINDOW_SIZE as u64);
    }

    #[test]
    fn test_record_abort() {
        let metrics = Metrics::new();
        metrics.record_abort();
        metrics.record_abort();
        assert_eq!(metrics.snapshot().aborted_count, 2);
    }

    #[test]
    fn test_mutations_counted_separately() {
        let metrics = Metrics::new();
        metrics.record(Operation::AddNode, 5);
        metrics.record(Operation::MoveNode, 5);
        metrics.record(Operation::GetChildren, 5);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.op_count, 3);
        assert_eq!(snapshot.mutation_count, 2);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::AddRoot.as_str(), "AddRoot");
        assert_eq!(Operation::GetAncestors.as_str(), "GetAncestors");
        assert!(Operation::RenameNode.is_mutation());
        assert!(!Operation::GetAll.is_mutation());
        for (i, op) in Operation::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
    }

    #[test]
    fn test_thread_safety() {
        let metrics = Arc::new(Metrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for i in 0..100 {
                        metrics.record(Operation::AddNode, i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().op_count, 800);
    }
}
