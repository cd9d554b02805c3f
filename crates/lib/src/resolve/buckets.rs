//! Record classification.
//!
//! Every record lands in exactly one bucket. Version errors take priority over
//! everything else; the remaining records split into missing, update-needed and
//! installed. Each bucket keeps the scan order of its records.

use serde::Serialize;

use super::local::LocalInstallChecker;
use super::record::PackageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
  VersionError,
  Missing,
  UpdateNeeded,
  Installed,
}

/// Record indices grouped by bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
  pub version_error: Vec<usize>,
  pub missing: Vec<usize>,
  pub update_needed: Vec<usize>,
  pub installed: Vec<usize>,
}

impl Buckets {
  /// Partition `records` in one pass.
  pub fn partition(records: &[PackageRecord], checker: &LocalInstallChecker<'_>) -> Self {
    let any_missing = records.iter().any(|r| r.is_valid() && !r.exists_locally);

    let mut buckets = Buckets::default();
    for (idx, record) in records.iter().enumerate() {
      let bucket = classify(record, checker, any_missing);
      buckets.slot_mut(bucket).push(idx);
    }
    buckets
  }

  /// Whether any record needs the catalog.
  pub fn needs_action(&self) -> bool {
    !self.missing.is_empty() || !self.update_needed.is_empty()
  }

  /// Records to match against the catalog: missing first, then update checks.
  pub fn actionable(&self) -> impl Iterator<Item = usize> + '_ {
    self.missing.iter().chain(self.update_needed.iter()).copied()
  }

  pub fn bucket_of(&self, idx: usize) -> Option<Bucket> {
    [
      Bucket::VersionError,
      Bucket::Missing,
      Bucket::UpdateNeeded,
      Bucket::Installed,
    ]
    .into_iter()
    .find(|bucket| self.slot(*bucket).contains(&idx))
  }

  pub fn slot(&self, bucket: Bucket) -> &[usize] {
    match bucket {
      Bucket::VersionError => &self.version_error,
      Bucket::Missing => &self.missing,
      Bucket::UpdateNeeded => &self.update_needed,
      Bucket::Installed => &self.installed,
    }
  }

  fn slot_mut(&mut self, bucket: Bucket) -> &mut Vec<usize> {
    match bucket {
      Bucket::VersionError => &mut self.version_error,
      Bucket::Missing => &mut self.missing,
      Bucket::UpdateNeeded => &mut self.update_needed,
      Bucket::Installed => &mut self.installed,
    }
  }
}

fn classify(record: &PackageRecord, checker: &LocalInstallChecker<'_>, any_missing: bool) -> Bucket {
  if !record.is_valid() {
    Bucket::VersionError
  } else if !record.exists_locally {
    Bucket::Missing
  } else if checker.needs_update_check(record, any_missing) {
    Bucket::UpdateNeeded
  } else {
    Bucket::Installed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::resolve::{DependencySpec, LocalPackageIndex};

  struct Installed(Vec<&'static str>);

  impl LocalPackageIndex for Installed {
    fn exists(&self, id: &str) -> bool {
      self.0.iter().any(|installed| *installed == id)
    }
  }

  fn records(index: &Installed, ids: &[&str]) -> Vec<PackageRecord> {
    let checker = LocalInstallChecker::new(index, false);
    ids
      .iter()
      .map(|id| checker.check(DependencySpec::classify(id, 0).unwrap()))
      .collect()
  }

  #[test]
  fn latest_stays_installed_when_nothing_missing() {
    let index = Installed(vec!["a.x.1", "a.y.latest"]);
    let recs = records(&index, &["a.x.1", "a.y.latest"]);
    let buckets = Buckets::partition(&recs, &LocalInstallChecker::new(&index, false));

    assert!(buckets.update_needed.is_empty());
    assert_eq!(buckets.installed, vec![0, 1]);
    assert!(!buckets.needs_action());
  }

  #[test]
  fn latest_moves_when_something_missing() {
    let index = Installed(vec!["a.y.latest", "a.z.latest"]);
    let recs = records(&index, &["a.y.latest", "a.x.1", "a.z.latest"]);
    let buckets = Buckets::partition(&recs, &LocalInstallChecker::new(&index, false));

    assert_eq!(buckets.missing, vec![1]);
    assert_eq!(buckets.update_needed, vec![0, 2]);
    assert!(buckets.installed.is_empty());
    assert_eq!(buckets.actionable().collect::<Vec<_>>(), vec![1, 0, 2]);
  }

  #[test]
  fn always_check_moves_latest() {
    let index = Installed(vec!["a.y.latest"]);
    let recs = records(&index, &["a.y.latest"]);
    let buckets = Buckets::partition(&recs, &LocalInstallChecker::new(&index, true));
    assert_eq!(buckets.update_needed, vec![0]);
    assert!(buckets.needs_action());
  }

  #[test]
  fn version_errors_do_not_count_as_missing() {
    let index = Installed(vec!["a.y.latest"]);
    let recs = records(&index, &["a.b.oops", "a.y.latest"]);
    let buckets = Buckets::partition(&recs, &LocalInstallChecker::new(&index, false));

    assert_eq!(buckets.version_error, vec![0]);
    assert!(buckets.missing.is_empty());
    assert_eq!(buckets.installed, vec![1]);
    assert!(!buckets.needs_action());
  }

  #[test]
  fn every_record_in_exactly_one_bucket() {
    let index = Installed(vec!["a.b.1", "c.d.latest"]);
    let recs = records(&index, &["a.b.1", "a.b.2", "c.d.latest", "e.f.latest", "g.h.bad"]);
    let buckets = Buckets::partition(&recs, &LocalInstallChecker::new(&index, false));

    for idx in 0..recs.len() {
      let hits = [
        Bucket::VersionError,
        Bucket::Missing,
        Bucket::UpdateNeeded,
        Bucket::Installed,
      ]
      .iter()
      .filter(|b| buckets.slot(**b).contains(&idx))
      .count();
      assert_eq!(hits, 1, "record {} in {} buckets", idx, hits);
    }
    assert_eq!(buckets.bucket_of(3), Some(Bucket::Missing));
    assert_eq!(buckets.bucket_of(2), Some(Bucket::UpdateNeeded));
  }
}
