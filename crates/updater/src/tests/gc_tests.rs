use super::{seed_remote_cueball, seed_remote_curly, Fixture};
use crate::{
    delete_partition_now, is_deletable, mark_deletable, sweep_deletable, RemoteFileOps,
    RemoteVersionDeleter,
};
use anyhow::Result;
use domain::{DomainVersion, DomainVersions};
use std::fs;
use std::sync::Arc;

#[test]
fn defunct_versions_are_deleted_remotely() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1)])?;
    seed_remote_curly(
        fx.remote.root(),
        "00001.delta.curly",
        "00001.delta.cueball",
        &[(2, b"two")],
    )?;
    seed_remote_cueball(fx.remote.root(), "00002.delta.cueball", &[(3, 3)])?;

    let mut versions = DomainVersions::new();
    versions.insert(DomainVersion::base(0));
    let mut defunct = DomainVersion::delta(1, 0);
    defunct.defunct = true;
    versions.insert(defunct);
    versions.insert(DomainVersion::delta(2, 1));

    let deleter = RemoteVersionDeleter::new(Arc::clone(&fx.remote) as Arc<dyn RemoteFileOps>);
    let removed = deleter.delete_defunct(&versions)?;
    // Both files of the defunct curly version go; nothing else does.
    assert_eq!(removed, 2);
    assert!(!fx.remote.exists("00001.delta.curly")?);
    assert!(!fx.remote.exists("00001.delta.cueball")?);
    assert!(fx.remote.exists("00000.base.cueball")?);
    assert!(fx.remote.exists("00002.delta.cueball")?);

    // Idempotent.
    assert_eq!(deleter.delete_defunct(&versions)?, 0);
    Ok(())
}

#[test]
fn delete_now_removes_the_partition_directory() -> Result<()> {
    let fx = Fixture::new()?;
    let partition = fx.partition_dir();
    fs::create_dir_all(&partition)?;
    fs::write(partition.join("00000.base.cueball"), b"x")?;

    delete_partition_now(&partition)?;
    assert!(!partition.exists());
    // Deleting an absent partition is fine.
    delete_partition_now(&partition)?;
    Ok(())
}

#[test]
fn deferred_deletion_marks_then_sweeps() -> Result<()> {
    let fx = Fixture::new()?;
    let data_dir = fx.dir.path().join("data");
    let doomed = data_dir.join("partition-0");
    let kept = data_dir.join("partition-1");
    fs::create_dir_all(&doomed)?;
    fs::create_dir_all(&kept)?;
    fs::write(doomed.join("00000.base.cueball"), b"x")?;
    fs::write(kept.join("00000.base.cueball"), b"x")?;

    mark_deletable(&doomed)?;
    assert!(is_deletable(&doomed));
    assert!(!is_deletable(&kept));
    // Marking does not delete; readers already holding files keep them.
    assert!(doomed.join("00000.base.cueball").exists());

    let removed = sweep_deletable(&data_dir)?;
    assert_eq!(removed, 1);
    assert!(!doomed.exists());
    assert!(kept.join("00000.base.cueball").exists());
    Ok(())
}
