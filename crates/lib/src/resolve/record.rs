use serde::Serialize;

use super::spec::DependencySpec;
use crate::catalog::CatalogItem;

/// Where a record is in its download lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadState {
  #[default]
  NotStarted,
  Started,
  Complete,
  Errored,
}

/// The resolution unit: one per unique spec in a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
  pub spec: DependencySpec,
  pub exists_locally: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version_error: Option<String>,
  pub require_latest: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub matched_item: Option<CatalogItem>,
  pub download_state: DownloadState,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub download_error: Option<String>,
}

impl PackageRecord {
  pub fn new(spec: DependencySpec, exists_locally: bool) -> Self {
    let version_error = spec.version_error();
    let require_latest = spec.require_latest();
    Self {
      spec,
      exists_locally,
      version_error,
      require_latest,
      matched_item: None,
      download_state: DownloadState::NotStarted,
      download_error: None,
    }
  }

  pub fn id(&self) -> &str {
    &self.spec.raw_id
  }

  pub fn group(&self) -> &str {
    &self.spec.group
  }

  pub fn is_valid(&self) -> bool {
    self.version_error.is_none()
  }
}
