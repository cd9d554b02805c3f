//! A catalog backed by a JSON index and a local mirror directory.
//!
//! The index looks like:
//!
//! ```json
//! {
//!   "enabled": true,
//!   "items": [
//!     { "name": "acme.hair.3", "group": "acme.hair", "version": "3",
//!       "file": "acme.hair.3.var", "sha256": "…", "prompt": "Install acme.hair.3?" }
//!   ]
//! }
//! ```
//!
//! Downloads copy the mirrored file into the packages directory one chunk per
//! poll, through a `.part` file that is promoted once the copy is verified.
//! Items with a `prompt` are only promoted when that prompt is accepted.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{CatalogError, CatalogItem, CatalogService, DownloadHandle, DownloadStatus};
use crate::consts::PACKAGE_EXT;
use crate::download::PromptBoard;

const CHUNK_SIZE: usize = 64 * 1024;
const PART_SUFFIX: &str = "part";

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Deserialize)]
struct IndexFile {
  #[serde(default = "default_true")]
  enabled: bool,
  #[serde(default)]
  items: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexEntry {
  name: String,
  group: String,
  version: String,
  needs_download: Option<bool>,
  can_be_downloaded: Option<bool>,
  /// Path of the package inside the mirror directory.
  file: Option<PathBuf>,
  sha256: Option<String>,
  prompt: Option<String>,
}

/// Catalog service over a mirror directory.
#[derive(Debug)]
pub struct FsCatalog {
  index_path: PathBuf,
  mirror_dir: PathBuf,
  packages_dir: PathBuf,
  prompts: PromptBoard,
  entries: Option<Vec<IndexEntry>>,
  enabled: bool,
  surface_open: bool,
}

impl FsCatalog {
  /// Create a catalog. Nothing is read until the surface is opened.
  pub fn new(
    index_path: impl Into<PathBuf>,
    mirror_dir: impl Into<PathBuf>,
    packages_dir: impl Into<PathBuf>,
    prompts: PromptBoard,
  ) -> Self {
    Self {
      index_path: index_path.into(),
      mirror_dir: mirror_dir.into(),
      packages_dir: packages_dir.into(),
      prompts,
      entries: None,
      enabled: false,
      surface_open: false,
    }
  }

  pub fn index_path(&self) -> &Path {
    &self.index_path
  }

  fn load(&mut self) -> Result<(), CatalogError> {
    let content = fs::read_to_string(&self.index_path).map_err(|source| CatalogError::ReadIndex {
      path: self.index_path.clone(),
      source,
    })?;
    let index: IndexFile = serde_json::from_str(&content).map_err(|source| CatalogError::ParseIndex {
      path: self.index_path.clone(),
      source,
    })?;

    debug!(path = %self.index_path.display(), entries = index.items.len(), enabled = index.enabled, "loaded catalog index");
    self.enabled = index.enabled;
    self.entries = Some(index.items);
    Ok(())
  }

  fn target_path(&self, name: &str) -> PathBuf {
    self.packages_dir.join(format!("{}.{}", name, PACKAGE_EXT))
  }

  fn part_files(&self) -> Vec<PathBuf> {
    let Ok(dir) = fs::read_dir(&self.packages_dir) else {
      return Vec::new();
    };
    dir
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(PART_SUFFIX))
      .collect()
  }

  fn to_item(&self, entry: &IndexEntry) -> CatalogItem {
    let name = entry.name.trim();
    CatalogItem {
      name: entry.name.clone(),
      group: entry.group.clone(),
      version: entry.version.clone(),
      needs_download: entry
        .needs_download
        .unwrap_or_else(|| !self.target_path(name).exists()),
      can_be_downloaded: entry.file.is_some() && entry.can_be_downloaded.unwrap_or(true),
    }
  }
}

impl CatalogService for FsCatalog {
  fn open_surface(&mut self) -> Result<(), CatalogError> {
    if !self.index_path.is_file() {
      return Err(CatalogError::SurfaceNotFound(self.index_path.display().to_string()));
    }
    self.load()?;

    // Leftovers from an interrupted batch.
    for part in self.part_files() {
      debug!(path = %part.display(), "removing stale partial download");
      if let Err(e) = fs::remove_file(&part) {
        warn!(path = %part.display(), error = %e, "failed to remove stale partial download");
      }
    }

    self.surface_open = true;
    Ok(())
  }

  fn is_surface_open(&self) -> bool {
    self.surface_open
  }

  fn restore_surface(&mut self) {
    self.surface_open = false;
  }

  fn has_stale_entries(&self) -> bool {
    !self.part_files().is_empty()
  }

  fn listing_ready(&self) -> bool {
    self.entries.is_some()
  }

  fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn enable(&mut self) -> Result<(), CatalogError> {
    info!(path = %self.index_path.display(), "enabling catalog");
    self.load()?;
    self.enabled = true;
    Ok(())
  }

  fn disable(&mut self) -> Result<(), CatalogError> {
    self.enabled = false;
    Ok(())
  }

  fn is_refreshing(&self) -> bool {
    // Enabling reloads the index synchronously.
    false
  }

  fn items(&self) -> Vec<CatalogItem> {
    if !self.enabled {
      return Vec::new();
    }
    self
      .entries
      .iter()
      .flatten()
      .map(|entry| self.to_item(entry))
      .collect()
  }

  fn start_download(&mut self, item: &CatalogItem) -> Result<Box<dyn DownloadHandle>, CatalogError> {
    let entry = self
      .entries
      .iter()
      .flatten()
      .find(|e| e.name == item.name)
      .ok_or_else(|| CatalogError::UnknownItem(item.name.clone()))?;

    let Some(file) = entry.file.as_ref().filter(|_| entry.can_be_downloaded.unwrap_or(true)) else {
      return Err(CatalogError::NotDownloadable(item.name.clone()));
    };

    let name = entry.name.trim().to_string();
    let start_err = |source: io::Error| CatalogError::Start {
      name: name.clone(),
      source,
    };

    let source_path = self.mirror_dir.join(file);
    let source = File::open(&source_path).map_err(start_err)?;
    let total = source.metadata().map_err(start_err)?.len();

    fs::create_dir_all(&self.packages_dir).map_err(start_err)?;
    let target = self.target_path(&name);
    let part_path = target.with_extension(format!("{}.{}", PACKAGE_EXT, PART_SUFFIX));
    let part = File::create(&part_path).map_err(start_err)?;

    debug!(name = %name, source = %source_path.display(), size = total, "starting mirror copy");

    Ok(Box::new(FsDownload {
      name,
      copy: Some(CopyState {
        source,
        part,
        buf: vec![0; CHUNK_SIZE],
        hasher: Sha256::new(),
      }),
      part_path,
      target,
      total,
      copied: 0,
      expected_sha256: entry.sha256.as_ref().map(|s| s.trim().to_lowercase()),
      prompt: entry.prompt.clone(),
      prompts: self.prompts.clone(),
      finished: None,
    }))
  }
}

/// Open files of a copy in progress.
struct CopyState {
  source: File,
  part: File,
  buf: Vec<u8>,
  hasher: Sha256,
}

/// One cooperative mirror copy.
struct FsDownload {
  name: String,
  copy: Option<CopyState>,
  part_path: PathBuf,
  target: PathBuf,
  total: u64,
  copied: u64,
  expected_sha256: Option<String>,
  prompt: Option<String>,
  prompts: PromptBoard,
  finished: Option<DownloadStatus>,
}

impl FsDownload {
  fn step(&mut self) -> Result<Option<String>, String> {
    let Some(copy) = self.copy.as_mut() else {
      return Err("download was detached".to_string());
    };

    let n = copy.source.read(&mut copy.buf).map_err(|e| format!("read failed: {}", e))?;
    if n > 0 {
      copy.part.write_all(&copy.buf[..n]).map_err(|e| format!("write failed: {}", e))?;
      copy.hasher.update(&copy.buf[..n]);
      self.copied += n as u64;
      return Ok(None);
    }

    copy.part.flush().map_err(|e| format!("write failed: {}", e))?;
    let Some(copy) = self.copy.take() else {
      return Err("download was detached".to_string());
    };
    Ok(Some(hex::encode(copy.hasher.finalize())))
  }

  fn finish(&mut self, actual: String) -> DownloadStatus {
    if let Some(expected) = &self.expected_sha256
      && *expected != actual
    {
      let _ = fs::remove_file(&self.part_path);
      return DownloadStatus::Failed(format!(
        "sha256 mismatch: expected {}, got {}",
        expected, actual
      ));
    }

    match self.prompt.take() {
      Some(text) => {
        let part = self.part_path.clone();
        let target = self.target.clone();
        let id = self.prompts.raise(
          text,
          Some(Box::new(move || promote(&part, &target).map_err(|e| e.to_string()))),
        );
        debug!(name = %self.name, prompt = id, "install waiting for confirmation");
        DownloadStatus::Complete
      }
      None => match promote(&self.part_path, &self.target) {
        Ok(()) => DownloadStatus::Complete,
        Err(e) => DownloadStatus::Failed(format!("failed to install package: {}", e)),
      },
    }
  }
}

fn promote(part: &Path, target: &Path) -> io::Result<()> {
  fs::rename(part, target)?;
  info!(path = %target.display(), "installed package");
  Ok(())
}

impl DownloadHandle for FsDownload {
  fn poll(&mut self) -> DownloadStatus {
    if let Some(status) = &self.finished {
      return status.clone();
    }

    let status = match self.step() {
      Ok(None) => {
        let fraction = if self.total == 0 {
          1.0
        } else {
          self.copied as f32 / self.total as f32
        };
        return DownloadStatus::Running(fraction.min(1.0));
      }
      Ok(Some(actual)) => self.finish(actual),
      Err(reason) => {
        let _ = fs::remove_file(&self.part_path);
        DownloadStatus::Failed(reason)
      }
    };
    self.finished = Some(status.clone());
    status
  }

  fn detach(&mut self) {
    if self.copy.take().is_some() {
      debug!(name = %self.name, "abandoning partial download");
      let _ = fs::remove_file(&self.part_path);
    }
    self.finished = Some(DownloadStatus::NotStarted);
  }
}
