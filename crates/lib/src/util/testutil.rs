//! In-memory collaborators for engine tests.
//!
//! The fakes script the behavior of the catalog service, the local package
//! index and the confirmation surface so that orchestrator and session tests
//! run against a [`VirtualClock`](crate::download::VirtualClock) without I/O.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::catalog::{CatalogError, CatalogItem, CatalogService, DownloadHandle, DownloadStatus};
use crate::download::{ConfirmationSurface, Prompt, PromptError, PromptId};
use crate::resolve::LocalPackageIndex;

/// Build a catalog item for `name` (`creator.package.version`).
pub fn catalog_item(name: &str) -> CatalogItem {
  let (group, version) = name.rsplit_once('.').unwrap_or((name, ""));
  CatalogItem {
    name: name.to_string(),
    group: group.to_string(),
    version: version.to_string(),
    needs_download: true,
    can_be_downloaded: true,
  }
}

/// Countdown of polls before a wait condition flips.
///
/// `u32::MAX` never flips within any reasonable timeout.
#[derive(Debug, Default)]
pub struct Countdown(Cell<u32>);

impl Countdown {
  pub fn new(polls: u32) -> Self {
    Self(Cell::new(polls))
  }

  pub fn set(&self, polls: u32) {
    self.0.set(polls);
  }

  /// True once the countdown has run out. Each call consumes one poll.
  pub fn tick(&self) -> bool {
    let left = self.0.get();
    if left == 0 {
      return true;
    }
    if left != u32::MAX {
      self.0.set(left - 1);
    }
    false
  }
}

type PollHook = Box<dyn Fn()>;

/// Scripted catalog service.
#[derive(Default)]
pub struct FakeCatalog {
  pub items: Vec<CatalogItem>,
  pub enabled: bool,
  pub surface_missing: bool,
  pub surface_open: bool,
  pub restored: bool,
  pub stale: Countdown,
  pub listing: Countdown,
  pub refresh: Countdown,
  pub enable_calls: u32,
  pub disable_calls: u32,
  /// Status sequence returned by each item's handle; the last one repeats.
  pub scripts: HashMap<String, Vec<DownloadStatus>>,
  pub start_failures: HashSet<String>,
  pub started: Vec<String>,
  pub detached: Rc<RefCell<Vec<String>>>,
  hooks: HashMap<String, (usize, Rc<PollHook>)>,
  /// Packages that become installed when their handle completes.
  installs: Option<FakeIndex>,
}

impl FakeCatalog {
  pub fn new(items: Vec<CatalogItem>) -> Self {
    Self {
      items,
      enabled: true,
      ..Default::default()
    }
  }

  pub fn script(mut self, name: &str, statuses: Vec<DownloadStatus>) -> Self {
    self.scripts.insert(name.to_string(), statuses);
    self
  }

  /// Run `hook` when the handle for `name` is polled for the `poll`th time.
  pub fn on_poll(mut self, name: &str, poll: usize, hook: impl Fn() + 'static) -> Self {
    self.hooks.insert(name.to_string(), (poll, Rc::new(Box::new(hook))));
    self
  }

  /// Mark completed downloads as installed in `index`.
  pub fn installs_into(mut self, index: &FakeIndex) -> Self {
    self.installs = Some(index.clone());
    self
  }
}

impl CatalogService for FakeCatalog {
  fn open_surface(&mut self) -> Result<(), CatalogError> {
    if self.surface_missing {
      return Err(CatalogError::SurfaceNotFound("fake".to_string()));
    }
    self.surface_open = true;
    Ok(())
  }

  fn is_surface_open(&self) -> bool {
    self.surface_open
  }

  fn restore_surface(&mut self) {
    self.surface_open = false;
    self.restored = true;
  }

  fn has_stale_entries(&self) -> bool {
    !self.stale.tick()
  }

  fn listing_ready(&self) -> bool {
    self.listing.tick()
  }

  fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn enable(&mut self) -> Result<(), CatalogError> {
    self.enable_calls += 1;
    self.enabled = true;
    Ok(())
  }

  fn disable(&mut self) -> Result<(), CatalogError> {
    self.disable_calls += 1;
    self.enabled = false;
    Ok(())
  }

  fn is_refreshing(&self) -> bool {
    !self.refresh.tick()
  }

  fn items(&self) -> Vec<CatalogItem> {
    if self.enabled { self.items.clone() } else { Vec::new() }
  }

  fn start_download(&mut self, item: &CatalogItem) -> Result<Box<dyn DownloadHandle>, CatalogError> {
    if self.start_failures.contains(&item.name) {
      return Err(CatalogError::Service(format!("refused to start {}", item.name)));
    }
    self.started.push(item.name.clone());
    let statuses = self
      .scripts
      .get(&item.name)
      .cloned()
      .unwrap_or_else(|| vec![DownloadStatus::Complete]);
    Ok(Box::new(FakeHandle {
      name: item.name.clone(),
      statuses: statuses.into(),
      last: DownloadStatus::NotStarted,
      polls: 0,
      hook: self.hooks.get(&item.name).cloned(),
      detached: self.detached.clone(),
      installs: self.installs.clone(),
    }))
  }
}

pub struct FakeHandle {
  name: String,
  statuses: VecDeque<DownloadStatus>,
  last: DownloadStatus,
  polls: usize,
  hook: Option<(usize, Rc<PollHook>)>,
  detached: Rc<RefCell<Vec<String>>>,
  installs: Option<FakeIndex>,
}

impl DownloadHandle for FakeHandle {
  fn poll(&mut self) -> DownloadStatus {
    self.polls += 1;
    if let Some((at, hook)) = &self.hook
      && *at == self.polls
    {
      hook();
    }
    if let Some(next) = self.statuses.pop_front() {
      if next == DownloadStatus::Complete
        && let Some(index) = &self.installs
      {
        index.install(&self.name);
      }
      self.last = next;
    }
    self.last.clone()
  }

  fn detach(&mut self) {
    self.statuses.clear();
    self.detached.borrow_mut().push(self.name.clone());
  }
}

/// Shared in-memory package index.
#[derive(Debug, Clone, Default)]
pub struct FakeIndex {
  installed: Arc<Mutex<HashSet<String>>>,
}

impl FakeIndex {
  pub fn with(ids: &[&str]) -> Self {
    let index = Self::default();
    for id in ids {
      index.install(id);
    }
    index
  }

  pub fn install(&self, id: &str) {
    self.installed.lock().unwrap().insert(id.to_string());
  }
}

impl LocalPackageIndex for FakeIndex {
  fn exists(&self, id: &str) -> bool {
    let installed = self.installed.lock().unwrap();
    match id.strip_suffix(".latest") {
      Some(group) => installed.iter().any(|i| i.rsplit_once('.').is_some_and(|(g, _)| g == group)),
      None => installed.contains(id),
    }
  }
}

/// Confirmation surface whose prompts show up after a number of listings.
#[derive(Debug, Default)]
pub struct FakePrompts {
  scheduled: RefCell<VecDeque<(u32, Prompt)>>,
  active: RefCell<Vec<Prompt>>,
  listings: Cell<u32>,
  pub accepted: Vec<PromptId>,
}

impl FakePrompts {
  pub fn new() -> Self {
    Self::default()
  }

  /// Show `text` from the `listing`th call to `active_prompts` on.
  pub fn schedule(self, listing: u32, text: &str) -> Self {
    let id = self.scheduled.borrow().len() as PromptId + 1;
    self.scheduled.borrow_mut().push_back((
      listing,
      Prompt {
        id,
        text: text.to_string(),
      },
    ));
    self
  }

  pub fn listings(&self) -> u32 {
    self.listings.get()
  }
}

impl ConfirmationSurface for FakePrompts {
  fn active_prompts(&self) -> Vec<Prompt> {
    let listing = self.listings.get() + 1;
    self.listings.set(listing);

    let mut scheduled = self.scheduled.borrow_mut();
    while scheduled.front().is_some_and(|(at, _)| *at <= listing) {
      if let Some((_, prompt)) = scheduled.pop_front() {
        self.active.borrow_mut().push(prompt);
      }
    }
    self.active.borrow().clone()
  }

  fn accept(&mut self, id: PromptId) -> Result<(), PromptError> {
    let mut active = self.active.borrow_mut();
    let pos = active.iter().position(|p| p.id == id).ok_or(PromptError::NotActive(id))?;
    active.remove(pos);
    self.accepted.push(id);
    Ok(())
  }
}
