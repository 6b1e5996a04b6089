//! Shared fixtures for integration tests.

#![allow(dead_code)]

use nsdb::{Node, TreeEngine};

pub const DIRECTOR: &str = "Director";
pub const FACILITIES: &str = "Deputy Director for Facilities";
pub const MAINTENANCE: &str = "Maintenance Staff";
pub const LYCEUM_COUNCIL: &str = "Lyceum Council";
pub const DEVELOPMENT_FUND: &str = "School Development Fund";
pub const STUDENT_GOVERNMENT: &str = "Student Government";
pub const STUDENTS: &str = "Students";
pub const IT: &str = "Deputy Director for IT";
pub const COMPUTER_ENGINEER: &str = "Computer Engineer";
pub const STUDENT_LIFE: &str = "Deputy Director for Student Life";
pub const SUPPORT_SERVICE: &str = "Support Service";
pub const EXTRACURRICULAR: &str = "Extracurricular Teachers Group";
pub const HOMEROOM: &str = "Homeroom Teachers Group";
pub const ACCOUNTING: &str = "Accounting";
pub const TEACHERS_COUNCIL: &str = "Teachers Council";
pub const ACADEMICS: &str = "Deputy Director for Academics";
pub const DEPARTMENTS: &str = "Specialized Departments";
pub const METHODOLOGY: &str = "Methodology Council";

/// School org chart: one root, 18 nodes, boundaries 0..=35.
pub fn school() -> Vec<(&'static str, i64, i64)> {
    vec![
        (DIRECTOR, 0, 35),
        (FACILITIES, 1, 4),
        (MAINTENANCE, 2, 3),
        (LYCEUM_COUNCIL, 5, 12),
        (DEVELOPMENT_FUND, 6, 7),
        (STUDENT_GOVERNMENT, 8, 11),
        (STUDENTS, 9, 10),
        (IT, 13, 16),
        (COMPUTER_ENGINEER, 14, 15),
        (STUDENT_LIFE, 17, 24),
        (SUPPORT_SERVICE, 18, 19),
        (EXTRACURRICULAR, 20, 21),
        (HOMEROOM, 22, 23),
        (ACCOUNTING, 25, 26),
        (TEACHERS_COUNCIL, 27, 28),
        (ACADEMICS, 29, 32),
        (DEPARTMENTS, 30, 31),
        (METHODOLOGY, 33, 34),
    ]
}

pub fn nodes(rows: &[(&str, i64, i64)]) -> Vec<Node> {
    rows.iter().map(|&(name, l, r)| Node::new(name, l, r)).collect()
}

pub fn school_engine() -> TreeEngine {
    TreeEngine::from_nodes(nodes(&school())).unwrap()
}

/// Forest as `(name, left, right)` ordered by `left`.
pub fn state(engine: &TreeEngine) -> Vec<(String, i64, i64)> {
    engine
        .get_all()
        .unwrap()
        .into_iter()
        .map(|n| (n.name, n.left, n.right))
        .collect()
}

/// Assert the forest equals `expected` (order-insensitive).
pub fn assert_forest(engine: &TreeEngine, expected: &[(&str, i64, i64)]) {
    let mut want: Vec<(String, i64, i64)> = expected
        .iter()
        .map(|&(name, l, r)| (name.to_string(), l, r))
        .collect();
    want.sort_by_key(|n| n.1);
    assert_eq!(state(engine), want);
    engine.verify().expect("forest invariants must hold");
}

pub fn interval(engine: &TreeEngine, name: &str) -> (i64, i64) {
    let node = engine
        .find(name)
        .unwrap()
        .unwrap_or_else(|| panic!("node {} missing", name));
    (node.left, node.right)
}
