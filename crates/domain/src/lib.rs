//! # Domain — versioned-namespace metadata and update planning
//!
//! A domain is a sharded key-value namespace. Its data lives as immutable
//! versioned partition files, each version either a self-sufficient
//! **base** or a **delta** naming its parent; the chain of parents from
//! any version leads to the nearest ancestor base.
//!
//! | Module          | Purpose                                          |
//! |-----------------|--------------------------------------------------|
//! | [`version`]     | `DomainVersion` chain metadata                   |
//! | [`files`]       | `NNNNN.<kind>.<format>` partition file naming    |
//! | [`plan`]        | Nearest-base walk producing update plans         |
//! | [`partitioner`] | Key-to-partition routing and key hashing         |
//! | [`config`]      | Per-domain engine selection and geometry         |

mod config;
mod error;
pub mod files;
mod partitioner;
mod plan;
mod version;

pub use config::{Domain, EngineConfig};
pub use error::{DomainError, Result};
pub use files::{detect_current_version, local_files, FileFormat, FileKind, PartitionFileName};
pub use partitioner::{Crc32KeyHasher, Crc32Partitioner, KeyHasher, Partitioner};
pub use plan::{IncrementalUpdatePlan, UpdatePlanner};
pub use version::{DomainVersion, DomainVersions, PartitionStats, VersionKind};
