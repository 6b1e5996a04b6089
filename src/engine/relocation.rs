//! Move classification for `TreeEngine::move_node`.
//!
//! A move detaches one node N from its place and re-attaches it as a leaf
//! directly under a new parent P. N's descendants are promoted one level to
//! fill the slot N leaves behind. Because the forest is laminar, the
//! intervals of N and P relate in exactly one of four ways:
//!
//! | Case      | Relation            | N lands                         |
//! |-----------|---------------------|---------------------------------|
//! | Forward   | `nr < pl`           | first child, `[pl-1, pl]`       |
//! | Backward  | `pr < nl`           | last child, `[pr, pr+1]`        |
//! | Ascend    | P strictly holds N  | nearer edge of P                |
//! | Descend   | N strictly holds P  | first child, `[pl, pl+1]`       |
//!
//! No ancestor walk is needed to reject cycles: the only degenerate input
//! is N == P, and any other relation breaks the laminar invariant.
//!
//! All coordinates are taken from the snapshot read before the first shift.

use crate::error::{ForestError, Result};
use crate::storage::Interval;

/// Which of the move cases applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relocation {
    /// N wholly precedes P.
    Forward,
    /// N wholly follows P.
    Backward,
    /// N is inside P and closer to P's right edge; becomes the last child.
    AscendToLast,
    /// N is inside P and not closer to the right edge; becomes the first child.
    AscendToFirst,
    /// P is inside N; the relationship is inverted.
    Descend,
}

impl Relocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relocation::Forward => "forward",
            Relocation::Backward => "backward",
            Relocation::AscendToLast => "ascend-last",
            Relocation::AscendToFirst => "ascend-first",
            Relocation::Descend => "descend",
        }
    }
}

/// One range shift, applied to both `left` and `right` fields of every node
/// whose value lies strictly between `after` and `before`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub after: i64,
    pub before: i64,
    pub delta: i64,
}

impl Shift {
    fn new(after: i64, before: i64, delta: i64) -> Self {
        Self { after, before, delta }
    }
}

/// Complete recipe for a move.
///
/// `shifts` must be applied in order: the output range of the first shift
/// is disjoint from the predicate of the second, but not the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    pub relocation: Relocation,
    pub shifts: [Shift; 2],
    /// Final interval written to N after both shifts.
    pub target: Interval,
}

/// Classify the relation between `node` and `parent` and build the plan.
pub fn plan_move(node: Interval, parent: Interval) -> Result<MovePlan> {
    let Interval { left: nl, right: nr } = node;
    let Interval { left: pl, right: pr } = parent;

    if node == parent {
        return Err(ForestError::InvalidOperation(
            "cannot move a node into itself".to_string(),
        ));
    }

    let plan = if node.is_disjoint(&parent) {
        if nr < pl {
            MovePlan {
                relocation: Relocation::Forward,
                shifts: [Shift::new(nl, nr, -1), Shift::new(nr, pl + 1, -2)],
                target: Interval::new(pl - 1, pl),
            }
        } else {
            MovePlan {
                relocation: Relocation::Backward,
                shifts: [Shift::new(nl, nr, 1), Shift::new(pr - 1, nl, 2)],
                target: Interval::new(pr, pr + 1),
            }
        }
    } else if parent.contains(&node) {
        // Tie goes to the first-child slot.
        if pr - nr < nl - pl {
            MovePlan {
                relocation: Relocation::AscendToLast,
                shifts: [Shift::new(nl, nr, -1), Shift::new(nr, pr, -2)],
                target: Interval::new(pr - 2, pr - 1),
            }
        } else {
            MovePlan {
                relocation: Relocation::AscendToFirst,
                shifts: [Shift::new(nl, nr, 1), Shift::new(pl, nl, 2)],
                target: Interval::new(pl + 1, pl + 2),
            }
        }
    } else if node.contains(&parent) {
        MovePlan {
            relocation: Relocation::Descend,
            shifts: [Shift::new(nl, pl + 1, -1), Shift::new(pl, nr, 1)],
            target: Interval::new(pl, pl + 1),
        }
    } else {
        return Err(ForestError::InvariantViolation(format!(
            "intervals [{}, {}] and [{}, {}] partially overlap",
            nl, nr, pl, pr
        )));
    };

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(left: i64, right: i64) -> Interval {
        Interval::new(left, right)
    }

    #[test]
    fn test_forward() {
        let plan = plan_move(iv(5, 12), iv(17, 24)).unwrap();
        assert_eq!(plan.relocation, Relocation::Forward);
        assert_eq!(plan.target, iv(16, 17));
        assert_eq!(plan.shifts, [Shift::new(5, 12, -1), Shift::new(12, 18, -2)]);
    }

    #[test]
    fn test_backward() {
        let plan = plan_move(iv(27, 28), iv(17, 24)).unwrap();
        assert_eq!(plan.relocation, Relocation::Backward);
        assert_eq!(plan.target, iv(24, 25));
        assert_eq!(plan.shifts, [Shift::new(27, 28, 1), Shift::new(23, 27, 2)]);
    }

    #[test]
    fn test_adjacent_siblings() {
        let plan = plan_move(iv(1, 4), iv(5, 12)).unwrap();
        assert_eq!(plan.relocation, Relocation::Forward);
        assert_eq!(plan.target, iv(4, 5));

        let plan = plan_move(iv(5, 12), iv(1, 4)).unwrap();
        assert_eq!(plan.relocation, Relocation::Backward);
        assert_eq!(plan.target, iv(4, 5));
        assert_eq!(plan.shifts, [Shift::new(5, 12, 1), Shift::new(3, 5, 2)]);
    }

    #[test]
    fn test_ascend_tie_prefers_first_child() {
        // pr - nr == nl - pl == 3
        let plan = plan_move(iv(20, 21), iv(17, 24)).unwrap();
        assert_eq!(plan.relocation, Relocation::AscendToFirst);
        assert_eq!(plan.target, iv(18, 19));
    }

    #[test]
    fn test_ascend_nearer_right_edge() {
        let plan = plan_move(iv(9, 10), iv(5, 12)).unwrap();
        assert_eq!(plan.relocation, Relocation::AscendToLast);
        assert_eq!(plan.target, iv(10, 11));
        assert_eq!(plan.shifts, [Shift::new(9, 10, -1), Shift::new(10, 12, -2)]);
    }

    #[test]
    fn test_ascend_nearer_left_edge() {
        let plan = plan_move(iv(6, 7), iv(5, 12)).unwrap();
        assert_eq!(plan.relocation, Relocation::AscendToFirst);
        assert_eq!(plan.target, iv(6, 7));
    }

    #[test]
    fn test_descend() {
        let plan = plan_move(iv(5, 12), iv(9, 10)).unwrap();
        assert_eq!(plan.relocation, Relocation::Descend);
        assert_eq!(plan.target, iv(9, 10));
        assert_eq!(plan.shifts, [Shift::new(5, 10, -1), Shift::new(9, 12, 1)]);
    }

    #[test]
    fn test_self_move_rejected() {
        let err = plan_move(iv(5, 12), iv(5, 12)).unwrap_err();
        assert!(matches!(err, ForestError::InvalidOperation(_)));
    }

    #[test]
    fn test_partial_overlap_is_invariant_violation() {
        let err = plan_move(iv(0, 4), iv(2, 6)).unwrap_err();
        assert!(matches!(err, ForestError::InvariantViolation(_)));
    }

    #[test]
    fn test_names() {
        assert_eq!(Relocation::Forward.as_str(), "forward");
        assert_eq!(Relocation::Descend.as_str(), "descend");
    }
}
