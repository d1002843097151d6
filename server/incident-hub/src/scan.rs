//! Dependency graph from a Go module manifest (`go.mod`).
//!
//! Only `require` directives contribute nodes. The graph is a star: the module
//! itself (`main`) points at every required module path.

use std::fs;
use std::path::Path;

use crate::error::ScanError;
use crate::types::{DepGraph, Edge};

pub const ROOT_NODE: &str = "main";
pub const MANIFEST: &str = "go.mod";

/// Read `<repo>/go.mod` and build its dependency graph.
pub fn scan_repo(repo: impl AsRef<Path>) -> Result<DepGraph, ScanError> {
  let path = repo.as_ref().join(MANIFEST);
  let label = path.display().to_string();
  let contents = fs::read_to_string(&path).map_err(|source| ScanError::Read {
    path: label.clone(),
    source,
  })?;
  let deps = parse_go_mod(&label, &contents)?;
  Ok(build_graph(deps))
}

pub fn build_graph(deps: Vec<String>) -> DepGraph {
  let edges = deps
    .iter()
    .map(|d| Edge {
      from: ROOT_NODE.to_string(),
      to: d.clone(),
    })
    .collect();
  let mut nodes = Vec::with_capacity(deps.len() + 1);
  nodes.push(ROOT_NODE.to_string());
  nodes.extend(deps);
  DepGraph { nodes, edges }
}

enum Block {
  None,
  Require,
  Other,
}

/// Extract required module paths in declaration order, without duplicates.
pub fn parse_go_mod(label: &str, contents: &str) -> Result<Vec<String>, ScanError> {
  let err = |line: usize, reason: &str| ScanError::Parse {
    path: label.to_string(),
    line,
    reason: reason.to_string(),
  };

  let mut deps: Vec<String> = Vec::new();
  let mut block = Block::None;
  let mut block_start = 0;

  for (idx, raw) in contents.lines().enumerate() {
    let line_no = idx + 1;
    let line = strip_comment(raw).trim();
    if line.is_empty() {
      continue;
    }

    match block {
      Block::Require => {
        if line == ")" {
          block = Block::None;
        } else {
          push_unique(&mut deps, parse_requirement(line).map_err(|r| err(line_no, r))?);
        }
        continue;
      }
      Block::Other => {
        if line == ")" {
          block = Block::None;
        }
        continue;
      }
      Block::None => {}
    }

    let (directive, rest) = match line.split_once(char::is_whitespace) {
      Some((d, r)) => (d, r.trim()),
      None => (line, ""),
    };

    match (directive, rest) {
      ("require", "(") => {
        block = Block::Require;
        block_start = line_no;
      }
      ("require", "()") => {}
      ("require", "") => return Err(err(line_no, "require without a module")),
      ("require", single) => {
        push_unique(&mut deps, parse_requirement(single).map_err(|r| err(line_no, r))?);
      }
      (_, "(") => {
        block = Block::Other;
        block_start = line_no;
      }
      _ => {}
    }
  }

  match block {
    Block::None => Ok(deps),
    _ => Err(err(block_start, "unterminated block")),
  }
}

fn strip_comment(line: &str) -> &str {
  match line.find("//") {
    Some(pos) => &line[..pos],
    None => line,
  }
}

fn parse_requirement(entry: &str) -> Result<String, &'static str> {
  let mut parts = entry.split_whitespace();
  let (Some(module), Some(version), None) = (parts.next(), parts.next(), parts.next()) else {
    return Err("expected `<module> <version>`");
  };
  if !version.starts_with('v') {
    return Err("version must start with `v`");
  }
  let module = module.trim_matches('"');
  if module.is_empty() {
    return Err("empty module path");
  }
  Ok(module.to_string())
}

fn push_unique(deps: &mut Vec<String>, dep: String) {
  if !deps.contains(&dep) {
    deps.push(dep);
  }
}
