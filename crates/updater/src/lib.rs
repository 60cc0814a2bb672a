//! # Updater — partition update orchestration
//!
//! Brings one partition from its installed version to a target version:
//!
//! ```text
//! Idle → Planning → Fetching → Merging → Installing → Idle
//!            |          |          |           |
//!            └──────────┴──────────┴───────────┴──→ Failed (per attempt)
//! ```
//!
//! Planning walks the domain's version chain to a `(base, deltas)` plan;
//! fetching pulls missing plan files through a shared [`CacheDir`];
//! merging runs the format-specific merge in a scratch work directory;
//! installing promotes the new base by atomic rename and deletes the
//! bases it supersedes. Any failure leaves the installed base untouched.
//!
//! | Module        | Purpose                                            |
//! |---------------|----------------------------------------------------|
//! | [`remote`]    | `RemoteFileOps` collaborator + local-disk impl     |
//! | [`cache`]     | Shared fetch cache with scratch-and-rename writes  |
//! | [`format`]    | `StorageFormat` capability (cueball / curly)       |
//! | [`updater`]   | The per-partition update state machine             |
//! | [`compactor`] | Chain rewrite into a single fresh base             |
//! | [`gc`]        | Remote defunct-version and local partition cleanup |
//! | [`executor`]  | Thread-per-update with per-disk concurrency gates  |

mod cache;
mod compactor;
mod error;
mod executor;
mod format;
mod gc;
mod remote;
mod updater;

pub use cache::CacheDir;
pub use compactor::Compactor;
pub use error::{Result, UpdateError};
pub use executor::{ConcurrencyGate, Permit, UpdateExecutor};
pub use format::{CueballFormat, CurlyFormat, MergeStats, PartitionReader, StorageFormat};
pub use gc::{
    delete_partition_now, is_deletable, mark_deletable, sweep_deletable, RemoteVersionDeleter,
};
pub use remote::{LocalDiskRemote, RemoteFileOps};
pub use updater::{PartitionUpdateStats, PartitionUpdater, UpdateState};

#[cfg(test)]
mod tests;
