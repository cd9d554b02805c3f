//! hubsync-lib: dependency resolution and download orchestration for Hub packages
//!
//! This crate resolves a package manifest into install actions:
//! - `manifest`: loading manifests and walking their dependency trees
//! - `resolve`: classifying specs, checking local presence, bucketing records
//! - `catalog`: the package catalog service and matching records against it
//! - `download`: running a download batch and draining confirmation prompts
//! - `session`: sequencing a full scan / download / report cycle

pub mod catalog;
pub mod consts;
pub mod diagnostics;
pub mod download;
pub mod events;
pub mod manifest;
pub mod platform;
pub mod resolve;
pub mod session;
pub mod settings;

#[cfg(test)]
mod util;
