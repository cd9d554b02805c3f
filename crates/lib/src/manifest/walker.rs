//! Manifest traversal.
//!
//! Flattens a manifest tree into the list of specs it declares. The walk is a
//! pre-order depth-first traversal in document order, so the output is stable
//! for identical input. The first occurrence of an id wins; later duplicates
//! (at any depth) are dropped.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::{Manifest, ManifestNode};
use crate::resolve::DependencySpec;

/// Extracts dependency specs from a manifest tree.
#[derive(Debug, Clone, Copy)]
pub struct ManifestWalker {
  recursive: bool,
}

impl ManifestWalker {
  pub fn new(recursive: bool) -> Self {
    Self { recursive }
  }

  /// Walk `manifest` and return its specs in first-occurrence order.
  pub fn walk(&self, manifest: &Manifest) -> Vec<DependencySpec> {
    let mut seen = HashSet::new();
    let mut specs = Vec::new();
    self.visit(manifest.root(), 0, &mut seen, &mut specs);

    debug!(count = specs.len(), recursive = self.recursive, "walked manifest");
    specs
  }

  fn visit(&self, node: ManifestNode<'_>, depth: usize, seen: &mut HashSet<String>, out: &mut Vec<DependencySpec>) {
    for (raw_id, child) in node.dependencies() {
      match DependencySpec::classify(raw_id, depth) {
        Some(spec) => {
          if seen.insert(spec.raw_id.clone()) {
            out.push(spec);
          } else {
            trace!(id = raw_id.trim(), depth, "duplicate dependency");
          }
        }
        None => trace!(id = raw_id, depth, "skipping entry that is not a package id"),
      }

      // Subtrees of skipped and duplicate entries are still walked.
      if self.recursive {
        self.visit(child, depth + 1, seen, out);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracing_test::traced_test;

  fn manifest(json: &str) -> Manifest {
    Manifest::from_json(json).unwrap().unwrap()
  }

  fn ids(specs: &[DependencySpec]) -> Vec<&str> {
    specs.iter().map(|s| s.raw_id.as_str()).collect()
  }

  const NESTED: &str = r#"{
    "dependencies": {
      "a.x.1": {},
      "a.x.latest": {
        "dependencies": {
          "b.y.2": { "dependencies": { "c.z.3": {} } },
          "a.x.1": {}
        }
      },
      "d.w.4": {}
    }
  }"#;

  #[test]
  fn flat_walk_ignores_nested() {
    let specs = ManifestWalker::new(false).walk(&manifest(NESTED));
    assert_eq!(ids(&specs), vec!["a.x.1", "a.x.latest", "d.w.4"]);
    assert!(specs.iter().all(|s| s.depth == 0 && !s.is_sub_dependency));
  }

  #[test]
  fn recursive_walk_is_preorder() {
    let specs = ManifestWalker::new(true).walk(&manifest(NESTED));
    assert_eq!(ids(&specs), vec!["a.x.1", "a.x.latest", "b.y.2", "c.z.3", "d.w.4"]);

    let c = specs.iter().find(|s| s.raw_id == "c.z.3").unwrap();
    assert_eq!(c.depth, 2);
    assert!(c.is_sub_dependency);
  }

  #[test]
  fn first_occurrence_wins() {
    let json = r#"{
      "dependencies": {
        "p.q.latest": { "dependencies": { "r.s.1": {} } },
        " r.s.1 ": {}
      }
    }"#;
    let specs = ManifestWalker::new(true).walk(&manifest(json));
    assert_eq!(ids(&specs), vec!["p.q.latest", "r.s.1"]);

    let r = &specs[1];
    assert_eq!(r.depth, 1);
    assert!(r.is_sub_dependency);
  }

  #[test]
  fn no_duplicates_in_output() {
    let specs = ManifestWalker::new(true).walk(&manifest(NESTED));
    let unique: HashSet<_> = specs.iter().map(|s| &s.raw_id).collect();
    assert_eq!(unique.len(), specs.len());
  }

  #[test]
  #[traced_test]
  fn malformed_ids_are_skipped_silently() {
    let json = r#"{
      "dependencies": {
        "notes": { "dependencies": { "e.f.5": {} } },
        "a.b": {},
        "a.b.c.d": {},
        "g.h.6": {}
      }
    }"#;
    let specs = ManifestWalker::new(true).walk(&manifest(json));
    assert_eq!(ids(&specs), vec!["e.f.5", "g.h.6"]);
    assert!(logs_contain("skipping entry that is not a package id"));
  }

  #[test]
  fn walk_is_reproducible() {
    let m = manifest(NESTED);
    let walker = ManifestWalker::new(true);
    assert_eq!(walker.walk(&m), walker.walk(&m));
  }

  #[test]
  fn bad_versions_are_kept() {
    let specs = ManifestWalker::new(false).walk(&manifest(r#"{"dependencies": {"a.b.beta": {}}}"#));
    assert_eq!(specs.len(), 1);
    assert!(specs[0].version_error().is_some());
  }
}
