//! Turning manifest specs into classified package records.
//!
//! # Modules
//!
//! - [`spec`] - Raw id parsing and version classification
//! - [`local`] - Local package presence checks
//! - [`buckets`] - Partitioning records into missing / update-needed / installed

pub mod buckets;
pub mod local;
pub mod spec;
mod record;

pub use buckets::{Bucket, Buckets};
pub use local::{FsPackageIndex, IndexError, LocalInstallChecker, LocalPackageIndex};
pub use record::*;
pub use spec::{DependencySpec, VersionToken};
