//! Local package presence.
//!
//! Installed packages are archive files named `<creator>.<package>.<version>.var`,
//! anywhere below the packages directory. A `latest` id counts as installed when
//! any integer version of its group is present.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::record::PackageRecord;
use super::spec::{DependencySpec, split_id};
use crate::consts::{LATEST, PACKAGE_EXT};

#[derive(Debug, Error)]
pub enum IndexError {
  #[error("packages path '{0}' is not a directory")]
  NotADirectory(PathBuf),

  #[error("failed to scan packages directory: {message}")]
  WalkDir { message: String },
}

/// Answers whether a package id is installed.
pub trait LocalPackageIndex {
  fn exists(&self, id: &str) -> bool;

  /// Re-read the underlying storage. Indexes without a cache do nothing.
  fn refresh(&mut self) -> Result<(), IndexError> {
    Ok(())
  }
}

/// Package index backed by a directory of `.var` archives.
#[derive(Debug, Clone)]
pub struct FsPackageIndex {
  root: PathBuf,
  installed: HashSet<String>,
  /// Highest installed version per `creator.package` group.
  newest: HashMap<String, u32>,
}

impl FsPackageIndex {
  /// Open and scan the packages directory at `root`.
  ///
  /// A missing directory is an empty index, not an error.
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, IndexError> {
    let mut index = Self {
      root: root.into(),
      installed: HashSet::new(),
      newest: HashMap::new(),
    };
    index.scan()?;
    Ok(index)
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn len(&self) -> usize {
    self.installed.len()
  }

  pub fn is_empty(&self) -> bool {
    self.installed.is_empty()
  }

  fn scan(&mut self) -> Result<(), IndexError> {
    self.installed.clear();
    self.newest.clear();

    if !self.root.exists() {
      debug!(root = %self.root.display(), "packages directory does not exist yet");
      return Ok(());
    }
    if !self.root.is_dir() {
      return Err(IndexError::NotADirectory(self.root.clone()));
    }

    for entry in WalkDir::new(&self.root).follow_links(true) {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) if e.depth() == 0 => return Err(IndexError::WalkDir { message: e.to_string() }),
        Err(e) => {
          warn!(error = %e, "skipping unreadable entry in packages directory");
          continue;
        }
      };
      if !entry.file_type().is_file() {
        continue;
      }
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some(PACKAGE_EXT) {
        continue;
      }
      let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };
      let Some((creator, package, version)) = split_id(stem) else {
        continue;
      };
      let Ok(version) = version.parse::<u32>() else {
        continue;
      };

      let group = format!("{}.{}", creator, package);
      let newest = self.newest.entry(group).or_insert(version);
      *newest = (*newest).max(version);
      self.installed.insert(stem.to_string());
    }

    debug!(root = %self.root.display(), count = self.installed.len(), "indexed local packages");
    Ok(())
  }
}

impl LocalPackageIndex for FsPackageIndex {
  fn exists(&self, id: &str) -> bool {
    match split_id(id) {
      Some((creator, package, LATEST)) => self.newest.contains_key(&format!("{}.{}", creator, package)),
      Some(_) => self.installed.contains(id),
      None => false,
    }
  }

  fn refresh(&mut self) -> Result<(), IndexError> {
    self.scan()
  }
}

/// Local presence checks for records.
pub struct LocalInstallChecker<'a> {
  index: &'a dyn LocalPackageIndex,
  always_check_for_updates: bool,
}

impl<'a> LocalInstallChecker<'a> {
  pub fn new(index: &'a dyn LocalPackageIndex, always_check_for_updates: bool) -> Self {
    Self {
      index,
      always_check_for_updates,
    }
  }

  pub fn exists(&self, spec: &DependencySpec) -> bool {
    self.index.exists(&spec.raw_id)
  }

  /// Build the record for `spec` with its current local presence.
  pub fn check(&self, spec: DependencySpec) -> PackageRecord {
    let exists = self.exists(&spec);
    PackageRecord::new(spec, exists)
  }

  /// Whether a `latest` record should be checked against the catalog.
  ///
  /// Only `latest` records qualify, and only when updates are always checked
  /// or something else in the same scan is already missing.
  pub fn needs_update_check(&self, record: &PackageRecord, any_missing: bool) -> bool {
    record.require_latest && (self.always_check_for_updates || any_missing)
  }
}
