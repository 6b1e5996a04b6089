//! forest_check: validate a forest snapshot file.
//!
//! Reads a JSON snapshot written by `MemoryStore::save_to`, runs the full
//! invariant checker and prints every violation plus a shape summary.
//! Exits with status 1 if the forest is invalid.
//!
//! Run: cargo run --bin forest_check -- ./forest.json [--list]

use std::path::PathBuf;

use anyhow::{bail, Context};
use nsdb::invariants::{self, ForestStats};
use nsdb::storage::{ForestSnapshot, SNAPSHOT_VERSION};

fn print_usage() {
    eprintln!("Usage: forest_check <snapshot.json> [--list]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <snapshot.json>  Forest snapshot to validate");
    eprintln!("  --list           Print every node with its interval");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let Some(path_arg) = args.get(1).filter(|a| !a.starts_with("--")) else {
        print_usage();
        std::process::exit(2);
    };
    let path = PathBuf::from(path_arg);
    let list = args.iter().any(|a| a == "--list");

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let snapshot: ForestSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        bail!(
            "unsupported snapshot version {} (expected {})",
            snapshot.version,
            SNAPSHOT_VERSION
        );
    }

    tracing::info!("checking {} nodes from {}", snapshot.nodes.len(), path.display());

    if list {
        let mut nodes = snapshot.nodes.clone();
        nodes.sort_by_key(|n| n.left);
        for node in &nodes {
            println!("[{:>6}, {:>6}]  {}", node.left, node.right, node.name);
        }
        println!();
    }

    let violations = invariants::check(&snapshot.nodes);
    let stats = ForestStats::collect(&snapshot.nodes);

    println!("nodes:      {}", stats.nodes);
    println!("roots:      {}", stats.roots);
    println!("leaves:     {}", stats.leaves);
    println!("max depth:  {}", stats.max_depth);
    println!("violations: {}", violations.len());
    for violation in &violations {
        println!("  - {}", violation);
    }

    if !violations.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
