//! Package manifests.
//!
//! A manifest is a JSON document whose `dependencies` object maps raw package
//! ids to nested manifests. Nested manifests have the same shape, which lets a
//! manifest carry the full dependency tree of everything it references:
//!
//! ```json
//! {
//!   "licenseType": "CC BY",
//!   "dependencies": {
//!     "acme.cool-hair.3": {},
//!     "acme.base-scene.latest": {
//!       "dependencies": { "bob.textures.12": {} }
//!     }
//!   }
//! }
//! ```
//!
//! # Modules
//!
//! - [`walker`] - Flattening the tree into an ordered, deduplicated spec list

pub mod walker;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::consts::MANIFEST_FILENAME;

pub use walker::ManifestWalker;

const DEPENDENCIES_KEY: &str = "dependencies";

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse manifest '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("manifest '{0}' is not a JSON object")]
  NotAnObject(PathBuf),
}

/// A parsed manifest document.
///
/// Key order is preserved exactly as written in the source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
  root: Map<String, Value>,
}

impl Manifest {
  /// Wrap an already-parsed JSON object.
  pub fn from_map(root: Map<String, Value>) -> Self {
    Self { root }
  }

  /// Parse a manifest from JSON text.
  ///
  /// Returns `None` if the document is valid JSON but not an object.
  pub fn from_json(json: &str) -> Result<Option<Self>, serde_json::Error> {
    match serde_json::from_str::<Value>(json)? {
      Value::Object(root) => Ok(Some(Self { root })),
      _ => Ok(None),
    }
  }

  pub fn root(&self) -> ManifestNode<'_> {
    ManifestNode { map: Some(&self.root) }
  }
}

/// A borrowed view of one level of a manifest tree.
#[derive(Debug, Clone, Copy)]
pub struct ManifestNode<'a> {
  map: Option<&'a Map<String, Value>>,
}

impl<'a> ManifestNode<'a> {
  fn from_value(value: &'a Value) -> Self {
    Self { map: value.as_object() }
  }

  /// Entries of this node's `dependencies` object, in document order.
  ///
  /// Nodes without a `dependencies` object, or whose value is not an object
  /// at all, simply have no dependencies.
  pub fn dependencies(self) -> impl Iterator<Item = (&'a str, ManifestNode<'a>)> + 'a {
    self
      .map
      .and_then(|map| map.get(DEPENDENCIES_KEY))
      .and_then(Value::as_object)
      .into_iter()
      .flat_map(|deps| deps.iter().map(|(id, value)| (id.as_str(), ManifestNode::from_value(value))))
  }
}

/// Where manifests come from.
pub trait ManifestSource {
  /// Load the manifest identified by `locator`.
  ///
  /// Returns `Ok(None)` when there is no manifest at that location.
  fn load_manifest(&self, locator: &Path) -> Result<Option<Manifest>, ManifestError>;
}

/// Loads manifests from the local filesystem.
///
/// A locator naming a directory is read as `<dir>/meta.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsManifestSource;

impl ManifestSource for FsManifestSource {
  fn load_manifest(&self, locator: &Path) -> Result<Option<Manifest>, ManifestError> {
    let path = if locator.is_dir() {
      locator.join(MANIFEST_FILENAME)
    } else {
      locator.to_path_buf()
    };

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "manifest not found");
        return Ok(None);
      }
      Err(e) => return Err(ManifestError::Read { path, source: e }),
    };

    let manifest = Manifest::from_json(&content).map_err(|e| ManifestError::Parse {
      path: path.clone(),
      source: e,
    })?;

    manifest.map(Some).ok_or(ManifestError::NotAnObject(path))
  }
}
