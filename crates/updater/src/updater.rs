use crate::cache::CacheDir;
use crate::error::{Result, UpdateError};
use crate::format::StorageFormat;
use crate::remote::RemoteFileOps;
use domain::{DomainVersions, FileKind, UpdatePlanner};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where an update attempt currently is. `Failed` is terminal per
/// attempt; the next call starts over from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Planning,
    Fetching,
    Merging,
    Installing,
    Failed,
}

/// Counters from one completed update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionUpdateStats {
    pub installed_version: u32,
    /// `true` when the partition was already at the target and nothing
    /// was fetched or merged.
    pub no_op: bool,
    pub bytes_fetched: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Drives one partition from its installed version to a target version.
///
/// Idle → Planning → Fetching → Merging → Installing → Idle, with any
/// error (or cancellation) landing in `Failed` for that attempt. All
/// merge output goes to a scratch work directory and is promoted by
/// atomic rename, so a failed or interrupted attempt never disturbs the
/// installed base; the caller owns retry policy.
pub struct PartitionUpdater {
    partition_dir: PathBuf,
    work_dir: PathBuf,
    cache: Arc<CacheDir>,
    remote: Arc<dyn RemoteFileOps>,
    format: Arc<dyn StorageFormat>,
    cancel: Arc<AtomicBool>,
    state: UpdateState,
}

impl PartitionUpdater {
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
            cancel: Arc::new(AtomicBool::new(false)),
            state: UpdateState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Flag a caller can set from another thread to abort the attempt at
    /// the next state boundary. An aborted attempt reports
    /// [`UpdateError::Interrupted`].
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Brings the partition to `target`, fetching and merging as needed.
    pub fn update_to(
        &mut self,
        versions: &DomainVersions,
        target: u32,
    ) -> Result<PartitionUpdateStats> {
        match self.run(versions, target) {
            Ok(stats) => {
                self.state = UpdateState::Idle;
                Ok(stats)
            }
            Err(e) => {
                self.state = UpdateState::Failed;
                tracing::warn!(
                    partition = %self.partition_dir.display(),
                    target,
                    error = %e,
                    "Partition update failed"
                );
                Err(e)
            }
        }
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(UpdateError::Interrupted);
        }
        Ok(())
    }

    fn run(&mut self, versions: &DomainVersions, target: u32) -> Result<PartitionUpdateStats> {
        let started = Instant::now();
        let mut stats = PartitionUpdateStats {
            installed_version: target,
            ..PartitionUpdateStats::default()
        };

        self.state = UpdateState::Planning;
        self.checkpoint()?;
        let current = domain::detect_current_version(&self.partition_dir, self.format.format())?;
        if current == Some(target) {
            tracing::info!(
                partition = %self.partition_dir.display(),
                version = target,
                "Already at target version"
            );
            stats.no_op = true;
            stats.elapsed = started.elapsed();
            return Ok(stats);
        }

        let plan = UpdatePlanner::plan(versions, target)?;
        // A version that carried no data has no remote files; it drops
        // out of the fetch set instead of failing the attempt.
        let mut live_deltas = Vec::with_capacity(plan.deltas.len());
        for &delta in &plan.deltas {
            if !versions.get(delta)?.is_empty() {
                live_deltas.push(delta);
            }
        }
        let base_is_current = current == Some(plan.base);
        let base_empty = versions.get(plan.base)?.is_empty();
        tracing::info!(
            partition = %self.partition_dir.display(),
            current = ?current,
            target,
            base = plan.base,
            deltas = live_deltas.len(),
            "Planned incremental update"
        );

        if live_deltas.is_empty() {
            if base_is_current {
                // Nothing in the chain adds to the installed base: adopt
                // the target by carrying its contents forward under the
                // target version number, without fetching or merging.
                self.state = UpdateState::Installing;
                self.checkpoint()?;
                self.promote(plan.base, target)?;
                stats.elapsed = started.elapsed();
                return Ok(stats);
            }
            if base_empty {
                // The whole chain is empty: install a real zero-record
                // base so the adoption is detectable later.
                self.state = UpdateState::Merging;
                self.checkpoint()?;
                let outputs = self.scratch_paths(target)?;
                self.format.write_empty_base(&outputs)?;
                self.state = UpdateState::Installing;
                self.checkpoint()?;
                self.install(&outputs, target)?;
                stats.elapsed = started.elapsed();
                return Ok(stats);
            }
        }

        self.state = UpdateState::Fetching;
        self.checkpoint()?;
        // The installed base doubles as the plan base when versions line
        // up; an empty plan base is materialized locally (the builder
        // pushes no files for it); otherwise the base comes through the
        // cache like any delta.
        let base_paths = if base_is_current {
            self.format
                .version_paths(&self.partition_dir, plan.base, FileKind::Base)
        } else if base_empty {
            let paths = self.scratch_paths(plan.base)?;
            self.format.write_empty_base(&paths)?;
            paths
        } else {
            self.fetch_version(plan.base, FileKind::Base, &mut stats)?
        };
        let mut delta_paths = Vec::with_capacity(live_deltas.len());
        for &delta in &live_deltas {
            delta_paths.push(self.fetch_version(delta, FileKind::Delta, &mut stats)?);
        }

        self.state = UpdateState::Merging;
        self.checkpoint()?;
        let outputs = self.scratch_paths(target)?;
        let merged = self.format.merge(&base_paths, &delta_paths, &outputs)?;
        stats.records_written = merged.records_written;
        stats.bytes_written = merged.bytes_written;

        self.state = UpdateState::Installing;
        self.checkpoint()?;
        self.install(&outputs, target)?;

        stats.elapsed = started.elapsed();
        tracing::info!(
            partition = %self.partition_dir.display(),
            version = target,
            records = stats.records_written,
            bytes_fetched = stats.bytes_fetched,
            "Installed new base"
        );
        Ok(stats)
    }

    fn fetch_version(
        &self,
        version: u32,
        kind: FileKind,
        stats: &mut PartitionUpdateStats,
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for name in self.format.file_names(version, kind) {
            let (path, fetched) = self.cache.fetch(self.remote.as_ref(), &name)?;
            stats.bytes_fetched += fetched;
            paths.push(path);
        }
        Ok(paths)
    }

    /// Scratch output paths for the target base, with any leftovers from
    /// an earlier interrupted attempt removed.
    fn scratch_paths(&self, target: u32) -> Result<Vec<PathBuf>> {
        scratch_paths(self.format.as_ref(), &self.work_dir, target)
    }

    fn install(&self, outputs: &[PathBuf], target: u32) -> Result<()> {
        install_base(self.format.as_ref(), &self.partition_dir, outputs, target)
    }

    /// Renumbers the installed `from` base as version `to` without a
    /// merge. The files are hard-linked under the new names first and the
    /// superseded names dropped after, so both versions stay complete
    /// throughout and the higher number wins detection after a crash.
    fn promote(&self, from: u32, to: u32) -> Result<()> {
        let from_names = self.format.file_names(from, FileKind::Base);
        let to_names = self.format.file_names(to, FileKind::Base);
        for (from_name, to_name) in from_names.iter().zip(to_names.iter()).rev() {
            let link = self.partition_dir.join(to_name);
            match fs::remove_file(&link) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            fs::hard_link(self.partition_dir.join(from_name), &link)?;
        }
        sync_dir(&self.partition_dir);

        for file in domain::local_files(&self.partition_dir)? {
            if file.kind == FileKind::Base && file.version != to {
                fs::remove_file(self.partition_dir.join(file.to_string()))?;
            }
        }
        tracing::info!(
            partition = %self.partition_dir.display(),
            from,
            version = to,
            "Promoted installed base to empty chain target"
        );
        Ok(())
    }
}

/// Scratch output paths under `work_dir` for a `target` base, with any
/// leftovers from an earlier interrupted attempt removed.
pub(crate) fn scratch_paths(
    format: &dyn StorageFormat,
    work_dir: &Path,
    target: u32,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(work_dir)?;
    let outputs = format.version_paths(work_dir, target, FileKind::Base);
    for path in &outputs {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(outputs)
}

/// Promotes a scratch base into the partition directory and drops the
/// bases it supersedes.
///
/// Files are renamed in reverse canonical order so the file that defines
/// the version (the format's first name) appears last; a version is never
/// detectable before all its files are in place.
pub(crate) fn install_base(
    format: &dyn StorageFormat,
    partition_dir: &Path,
    outputs: &[PathBuf],
    target: u32,
) -> Result<()> {
    fs::create_dir_all(partition_dir)?;
    let names = format.file_names(target, FileKind::Base);
    for (output, name) in outputs.iter().zip(names.iter()).rev() {
        fs::rename(output, partition_dir.join(name))?;
    }
    sync_dir(partition_dir);

    for file in domain::local_files(partition_dir)? {
        if file.kind == FileKind::Base && file.version != target {
            fs::remove_file(partition_dir.join(file.to_string()))?;
            tracing::debug!(
                partition = %partition_dir.display(),
                file = %file,
                "Deleted obsolete base"
            );
        }
    }
    Ok(())
}

pub(crate) fn sync_dir(path: &Path) {
    if let Ok(dir) = fs::File::open(path) {
        let _ = dir.sync_all();
    }
}
