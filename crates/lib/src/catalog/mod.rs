//! The package catalog.
//!
//! The catalog is an external service listing downloadable package versions.
//! The engine only reads its entries and triggers downloads through it.
//!
//! # Modules
//!
//! - [`matcher`] - Picking the catalog entry for each record
//! - [`fs`] - A catalog backed by a JSON index and a local mirror directory

pub mod fs;
pub mod matcher;

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::LATEST;

pub use fs::FsCatalog;
pub use matcher::{CatalogMatcher, MatchError, MatchOutcome};

/// One downloadable package version as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
  /// Full package id, e.g. `acme.cool-hair.7`.
  pub name: String,
  /// `creator.package` identity shared by every version.
  pub group: String,
  /// Integer version, or a `latest` label.
  pub version: String,
  /// The package is not installed in the version this entry offers.
  pub needs_download: bool,
  /// The catalog is allowed to serve this package.
  pub can_be_downloaded: bool,
}

impl CatalogItem {
  pub fn numeric_version(&self) -> Option<u32> {
    self.version.trim().parse().ok()
  }

  /// Whether the version is a `latest` label rather than a number.
  pub fn is_latest_label(&self) -> bool {
    let version = self.version.trim();
    version == LATEST || version.ends_with(".latest")
  }

  /// Whether starting a download for this entry makes sense.
  pub fn is_downloadable(&self) -> bool {
    self.needs_download && self.can_be_downloaded
  }
}

/// What a download handle reports when polled.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadStatus {
  NotStarted,
  /// Fraction done, `0.0..=1.0`.
  Running(f32),
  Complete,
  Failed(String),
}

/// A download started by [`CatalogService::start_download`].
///
/// Handles are cooperative: work only advances when the handle is polled.
pub trait DownloadHandle {
  fn poll(&mut self) -> DownloadStatus;

  /// Abandon the download. Later polls must not touch shared state.
  fn detach(&mut self);
}

/// Errors raised by a catalog backend.
#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("catalog surface not found: {0}")]
  SurfaceNotFound(String),

  #[error("catalog index '{path}' could not be read: {source}")]
  ReadIndex {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("catalog index '{path}' is malformed: {source}")]
  ParseIndex {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("package '{0}' is not listed in the catalog")]
  UnknownItem(String),

  #[error("package '{0}' cannot be downloaded from the catalog")]
  NotDownloadable(String),

  #[error("failed to start download of '{name}': {source}")]
  Start {
    name: String,
    #[source]
    source: io::Error,
  },

  #[error("catalog service error: {0}")]
  Service(String),
}

/// The package catalog service as seen by the download orchestrator.
///
/// State queries are polled repeatedly while a batch is being prepared, so
/// they should be cheap.
pub trait CatalogService {
  /// Locate and open the catalog surface. Fails when it cannot be found.
  fn open_surface(&mut self) -> Result<(), CatalogError>;

  fn is_surface_open(&self) -> bool;

  /// Put the surface back where it was before [`open_surface`](Self::open_surface).
  fn restore_surface(&mut self);

  /// Entries left over from a previous batch that are still being torn down.
  fn has_stale_entries(&self) -> bool;

  /// The listing has been (re)populated since the surface was opened.
  fn listing_ready(&self) -> bool;

  fn is_enabled(&self) -> bool;

  fn enable(&mut self) -> Result<(), CatalogError>;

  fn disable(&mut self) -> Result<(), CatalogError>;

  /// The catalog is reloading after being enabled.
  fn is_refreshing(&self) -> bool;

  /// Snapshot of the current entries.
  fn items(&self) -> Vec<CatalogItem>;

  fn start_download(&mut self, item: &CatalogItem) -> Result<Box<dyn DownloadHandle>, CatalogError>;
}
