//! Matching records to catalog entries.
//!
//! Pinned records match the first entry whose trimmed name equals the record's
//! id; catalog order decides ties. `latest` records match the entry with the
//! highest integer version in their group (the first one wins on equal
//! versions). An entry labelled `latest` is only used when the group has no
//! integer-versioned entry at all.

use thiserror::Error;
use tracing::{debug, trace};

use super::CatalogItem;
use crate::resolve::PackageRecord;

/// The selected catalog entry for a record is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
  #[error("catalog entry '{name}' for '{id}' is malformed: {reason}")]
  MalformedEntry { id: String, name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
  Matched(CatalogItem),
  NoMatch,
  Error(MatchError),
}

impl MatchOutcome {
  pub fn item(&self) -> Option<&CatalogItem> {
    match self {
      MatchOutcome::Matched(item) => Some(item),
      _ => None,
    }
  }
}

/// Matches records against one catalog snapshot.
pub struct CatalogMatcher<'a> {
  items: &'a [CatalogItem],
}

impl<'a> CatalogMatcher<'a> {
  pub fn new(items: &'a [CatalogItem]) -> Self {
    Self { items }
  }

  pub fn match_record(&self, record: &PackageRecord) -> MatchOutcome {
    let found = if record.require_latest {
      self.newest_in_group(record.group())
    } else {
      self.exact(record.id())
    };

    let Some(item) = found else {
      trace!(id = record.id(), "no catalog entry");
      return MatchOutcome::NoMatch;
    };

    match validate(record, item) {
      Ok(()) => {
        debug!(id = record.id(), entry = %item.name, "matched catalog entry");
        MatchOutcome::Matched(item.clone())
      }
      Err(e) => MatchOutcome::Error(e),
    }
  }

  /// Match every record, keeping input order.
  pub fn match_all<'r>(&self, records: impl IntoIterator<Item = &'r PackageRecord>) -> Vec<MatchOutcome> {
    records.into_iter().map(|r| self.match_record(r)).collect()
  }

  fn exact(&self, id: &str) -> Option<&'a CatalogItem> {
    self.items.iter().find(|item| item.name.trim() == id)
  }

  fn newest_in_group(&self, group: &str) -> Option<&'a CatalogItem> {
    let mut newest: Option<(u32, &'a CatalogItem)> = None;
    let mut labelled: Option<&'a CatalogItem> = None;

    for item in self.items.iter().filter(|item| item.group.trim() == group) {
      match item.numeric_version() {
        Some(version) => {
          if newest.is_none_or(|(best, _)| version > best) {
            newest = Some((version, item));
          }
        }
        None => {
          if labelled.is_none() && item.is_latest_label() {
            labelled = Some(item);
          }
        }
      }
    }

    newest.map(|(_, item)| item).or(labelled)
  }
}

fn validate(record: &PackageRecord, item: &CatalogItem) -> Result<(), MatchError> {
  let malformed = |reason: &str| MatchError::MalformedEntry {
    id: record.id().to_string(),
    name: item.name.clone(),
    reason: reason.to_string(),
  };

  let name = item.name.trim();
  let group = item.group.trim();
  if name.is_empty() {
    return Err(malformed("empty name"));
  }
  if group.is_empty() {
    return Err(malformed("empty group"));
  }
  if item.version.trim().is_empty() {
    return Err(malformed("empty version"));
  }
  if !name.strip_prefix(group).is_some_and(|rest| rest.starts_with('.')) {
    return Err(malformed("name is not in its group"));
  }
  Ok(())
}
