use crate::error::Result;
use crate::remote::RemoteFileOps;
use domain::{DomainVersion, DomainVersions, FileKind};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Marker file naming a partition directory as safe to sweep.
const DELETABLE_MARKER: &str = "DELETABLE";

/// Removes a defunct version's files from one partition's remote
/// namespace.
pub struct RemoteVersionDeleter {
    remote: Arc<dyn RemoteFileOps>,
}

impl RemoteVersionDeleter {
    pub fn new(remote: Arc<dyn RemoteFileOps>) -> Self {
        Self { remote }
    }

    /// Deletes every remote file belonging to `version`, regardless of
    /// format. Absent files are not an error: deletion is idempotent and
    /// may race another host doing the same cleanup.
    pub fn delete_version(&self, version: &DomainVersion) -> Result<usize> {
        let kind = if version.is_base() {
            FileKind::Base
        } else {
            FileKind::Delta
        };
        let prefix = format!("{:05}.{}.", version.number, kind.as_str());
        let mut removed = 0;
        for name in self.remote.list()? {
            if name.starts_with(&prefix) {
                self.remote.delete(&name)?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(version = version.number, removed, "Deleted defunct remote version");
        }
        Ok(removed)
    }

    /// Deletes every version marked defunct in the chain.
    pub fn delete_defunct(&self, versions: &DomainVersions) -> Result<usize> {
        let mut removed = 0;
        for version in versions.defunct() {
            removed += self.delete_version(version)?;
        }
        Ok(removed)
    }
}

/// Removes a partition's local directory immediately.
///
/// Only safe when no reader holds the partition open; when that cannot
/// be guaranteed, use [`mark_deletable`] and a later [`sweep_deletable`]
/// pass instead.
pub fn delete_partition_now(partition_dir: &Path) -> Result<()> {
    match fs::remove_dir_all(partition_dir) {
        Ok(()) => {
            tracing::info!(partition = %partition_dir.display(), "Deleted partition");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Marks a partition for deferred deletion. The partition keeps serving
/// any reader that already has it open; a later sweep removes it.
pub fn mark_deletable(partition_dir: &Path) -> Result<()> {
    fs::write(partition_dir.join(DELETABLE_MARKER), b"")?;
    Ok(())
}

#[must_use]
pub fn is_deletable(partition_dir: &Path) -> bool {
    partition_dir.join(DELETABLE_MARKER).exists()
}

/// Deletes every marked partition directory under `data_dir`. Returns
/// the number of partitions removed.
pub fn sweep_deletable(data_dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && is_deletable(&path) {
            fs::remove_dir_all(&path)?;
            removed += 1;
            tracing::info!(partition = %path.display(), "Swept deletable partition");
        }
    }
    Ok(removed)
}
