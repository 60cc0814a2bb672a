use crate::cache::CacheDir;
use crate::error::Result;
use crate::format::{MergeStats, StorageFormat};
use crate::remote::RemoteFileOps;
use crate::updater::{install_base, scratch_paths};
use domain::{DomainVersions, FileKind, UpdatePlanner};
use std::path::PathBuf;
use std::sync::Arc;

/// Rewrites a base plus its delta chain into a single new base at the
/// chain head version.
///
/// For cueball this is the ordinary block merge (which never keeps
/// losers); for curly it is the key-level compacting rewrite that
/// reclaims superseded record space. Read results after compaction are
/// indistinguishable from applying the same deltas by append merge.
pub struct Compactor {
    partition_dir: PathBuf,
    work_dir: PathBuf,
    cache: Arc<CacheDir>,
    remote: Arc<dyn RemoteFileOps>,
    format: Arc<dyn StorageFormat>,
}

impl Compactor {
    pub fn new(
        partition_dir: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        cache: Arc<CacheDir>,
        remote: Arc<dyn RemoteFileOps>,
        format: Arc<dyn StorageFormat>,
    ) -> Self {
        Self {
            partition_dir: partition_dir.into(),
            work_dir: work_dir.into(),
            cache,
            remote,
            format,
        }
    }

    /// Compacts the chain ending at `target` into one base installed at
    /// `target`. Inputs come from the installed base when versions line
    /// up and from the fetch cache otherwise.
    ///
    /// # Errors
    ///
    /// A failed compaction leaves the installed base untouched; at worst
    /// scratch files remain in the work directory.
    pub fn compact_to(&self, versions: &DomainVersions, target: u32) -> Result<MergeStats> {
        let plan = UpdatePlanner::plan(versions, target)?;
        let current = domain::detect_current_version(&self.partition_dir, self.format.format())?;

        let base_paths = if current == Some(plan.base) {
            self.format
                .version_paths(&self.partition_dir, plan.base, FileKind::Base)
        } else {
            self.fetch_version(plan.base, FileKind::Base)?
        };
        let mut delta_paths = Vec::with_capacity(plan.deltas.len());
        for &delta in &plan.deltas {
            delta_paths.push(self.fetch_version(delta, FileKind::Delta)?);
        }

        let outputs = scratch_paths(self.format.as_ref(), &self.work_dir, target)?;
        let stats = self.format.compact(&base_paths, &delta_paths, &outputs)?;
        install_base(self.format.as_ref(), &self.partition_dir, &outputs, target)?;
        tracing::info!(
            partition = %self.partition_dir.display(),
            version = target,
            records = stats.records_written,
            bytes = stats.bytes_written,
            "Compacted chain into new base"
        );
        Ok(stats)
    }

    fn fetch_version(&self, version: u32, kind: FileKind) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for name in self.format.file_names(version, kind) {
            let (path, _) = self.cache.fetch(self.remote.as_ref(), &name)?;
            paths.push(path);
        }
        Ok(paths)
    }
}
