//! Dependency spec parsing.
//!
//! A raw dependency id has the form `creator.package.version`, where the version
//! segment is either an integer or the literal `latest`. Ids that do not split
//! into exactly three segments are not specs at all and are dropped by the
//! walker; ids with a bad version segment are kept and surface as version errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::LATEST;

/// The version part of a dependency id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum VersionToken {
  /// A pinned integer version.
  Pinned(u32),
  /// Whatever version the catalog currently publishes as newest.
  Latest,
  /// A version segment that is neither an integer nor `latest`.
  Invalid(String),
}

impl VersionToken {
  fn parse(segment: &str) -> Self {
    if segment == LATEST {
      return VersionToken::Latest;
    }
    match segment.parse::<u32>() {
      Ok(version) => VersionToken::Pinned(version),
      Err(_) => VersionToken::Invalid(segment.to_string()),
    }
  }

  pub fn is_latest(&self) -> bool {
    matches!(self, VersionToken::Latest)
  }
}

impl fmt::Display for VersionToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionToken::Pinned(v) => write!(f, "{}", v),
      VersionToken::Latest => f.write_str(LATEST),
      VersionToken::Invalid(raw) => f.write_str(raw),
    }
  }
}

/// One declared dependency, as found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
  /// Trimmed raw id, e.g. `acme.cool-hair.7`.
  pub raw_id: String,
  /// Composite `creator.package` identity shared by every version of a package.
  pub group: String,
  pub version_token: VersionToken,
  pub is_sub_dependency: bool,
  pub depth: usize,
}

impl DependencySpec {
  /// Classify a raw id found at `depth` in the manifest tree.
  ///
  /// Returns `None` when the trimmed id is not exactly three dot-separated segments.
  pub fn classify(raw_id: &str, depth: usize) -> Option<Self> {
    let raw_id = raw_id.trim();
    let (creator, package, version) = split_id(raw_id)?;

    Some(Self {
      raw_id: raw_id.to_string(),
      group: format!("{}.{}", creator, package),
      version_token: VersionToken::parse(version),
      is_sub_dependency: depth > 0,
      depth,
    })
  }

  pub fn require_latest(&self) -> bool {
    self.version_token.is_latest()
  }

  /// Stricter format check applied after classification.
  ///
  /// Returns a human-readable reason when the id is structurally a spec but
  /// cannot name a real package.
  pub fn version_error(&self) -> Option<String> {
    if let VersionToken::Invalid(raw) = &self.version_token {
      return Some(format!(
        "invalid version '{}' in '{}': expected an integer or '{}'",
        raw, self.raw_id, LATEST
      ));
    }

    let (creator, package, _) = split_id(&self.raw_id)?;
    if creator.is_empty() || package.is_empty() {
      return Some(format!("'{}' has an empty creator or package name", self.raw_id));
    }
    if self.raw_id.chars().any(char::is_whitespace) {
      return Some(format!("'{}' contains whitespace", self.raw_id));
    }
    None
  }
}

impl fmt::Display for DependencySpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw_id)
  }
}

/// Split an id into `(creator, package, version)`.
pub fn split_id(id: &str) -> Option<(&str, &str, &str)> {
  let mut parts = id.split('.');
  let creator = parts.next()?;
  let package = parts.next()?;
  let version = parts.next()?;
  if parts.next().is_some() {
    return None;
  }
  Some((creator, package, version))
}

#[cfg(test)]
mod tests {
  use super::*;

  mod classify {
    use super::*;

    #[test]
    fn pinned_version() {
      let spec = DependencySpec::classify("acme.cool-hair.7", 0).unwrap();
      assert_eq!(spec.raw_id, "acme.cool-hair.7");
      assert_eq!(spec.group, "acme.cool-hair");
      assert_eq!(spec.version_token, VersionToken::Pinned(7));
      assert!(!spec.is_sub_dependency);
      assert!(!spec.require_latest());
      assert!(spec.version_error().is_none());
    }

    #[test]
    fn latest_version() {
      let spec = DependencySpec::classify("acme.cool-hair.latest", 2).unwrap();
      assert!(spec.require_latest());
      assert!(spec.is_sub_dependency);
      assert_eq!(spec.depth, 2);
      assert!(spec.version_error().is_none());
    }

    #[test]
    fn trims_surrounding_whitespace() {
      let spec = DependencySpec::classify("  acme.hair.1 \n", 0).unwrap();
      assert_eq!(spec.raw_id, "acme.hair.1");
    }

    #[test]
    fn wrong_segment_count_is_dropped() {
      assert!(DependencySpec::classify("acme.hair", 0).is_none());
      assert!(DependencySpec::classify("acme.hair.1.2", 0).is_none());
      assert!(DependencySpec::classify("license", 0).is_none());
    }
  }

  mod version_error {
    use super::*;

    #[test]
    fn non_integer_version() {
      let spec = DependencySpec::classify("acme.hair.v2", 0).unwrap();
      assert_eq!(spec.version_token, VersionToken::Invalid("v2".to_string()));
      let err = spec.version_error().unwrap();
      assert!(err.contains("v2"));
    }

    #[test]
    fn latest_is_case_sensitive() {
      let spec = DependencySpec::classify("acme.hair.Latest", 0).unwrap();
      assert!(spec.version_error().is_some());
    }

    #[test]
    fn empty_creator() {
      let spec = DependencySpec::classify(".hair.1", 0).unwrap();
      assert!(spec.version_error().unwrap().contains("empty"));
    }

    #[test]
    fn inner_whitespace() {
      let spec = DependencySpec::classify("acme.cool hair.1", 0).unwrap();
      assert!(spec.version_error().unwrap().contains("whitespace"));
    }
  }

  #[test]
  fn version_token_display() {
    assert_eq!(VersionToken::Pinned(12).to_string(), "12");
    assert_eq!(VersionToken::Latest.to_string(), "latest");
    assert_eq!(VersionToken::Invalid("x".to_string()).to_string(), "x");
  }
}
