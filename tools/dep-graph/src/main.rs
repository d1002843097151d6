//! dep-graph: dependency graph of a Go module, same shape `/graph` serves
//!
//! Usage:
//!   dep-graph <repo>          # print {"nodes": [...], "edges": [...]} for <repo>/go.mod
//!   dep-graph <repo> --edges  # one `from -> to` line per edge
//!
//! Exit codes: 0 on success, 2 when the manifest is missing or malformed.

use std::env;
use std::process;

use incident_hub::scan;
use incident_hub::types::DepGraph;

fn print_edges(graph: &DepGraph) {
    for edge in &graph.edges {
        println!("{} -> {}", edge.from, edge.to);
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let edges_only = args.iter().any(|a| a == "--edges");
    let repos: Vec<_> = args.iter().skip(1).filter(|a| !a.starts_with('-')).collect();

    if repos.len() != 1 {
        eprintln!("Usage: dep-graph <repo> [--edges]");
        eprintln!("  --edges  Print one `from -> to` line per dependency");
        process::exit(2);
    }

    let graph = scan::scan_repo(repos[0]).unwrap_or_else(|e| {
        eprintln!("dep-graph: {}", e);
        process::exit(2);
    });

    if edges_only {
        print_edges(&graph);
        return;
    }

    match serde_json::to_string_pretty(&graph) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("dep-graph: cannot encode graph: {}", e);
            process::exit(2);
        }
    }
}
