use super::{curly_options, k, options, seed_remote_cueball, seed_remote_curly, v, Fixture};
use crate::{Compactor, CueballFormat, CurlyFormat, RemoteFileOps, StorageFormat};
use anyhow::Result;
use compress::BlockCodec;
use domain::{detect_current_version, DomainVersion, DomainVersions, FileFormat, FileKind};
use std::sync::Arc;

fn versions_with_deltas(deltas: &[u32]) -> DomainVersions {
    let mut versions = DomainVersions::new();
    versions.insert(DomainVersion::base(0));
    let mut parent = 0;
    for &delta in deltas {
        versions.insert(DomainVersion::delta(delta, parent));
        parent = delta;
    }
    versions
}

#[test]
fn curly_compaction_reclaims_superseded_records() -> Result<()> {
    let fx = Fixture::new()?;
    let big = vec![0x11u8; 600];
    seed_remote_curly(
        fx.remote.root(),
        "00000.base.curly",
        "00000.base.cueball",
        &[(1, &big), (2, b"keep")],
    )?;
    seed_remote_curly(
        fx.remote.root(),
        "00001.delta.curly",
        "00001.delta.cueball",
        &[(1, b"tiny")],
    )?;
    let versions = versions_with_deltas(&[1]);

    let format: Arc<dyn StorageFormat> =
        Arc::new(CurlyFormat::new(curly_options(), BlockCodec::None));
    let compactor = Compactor::new(
        fx.partition_dir(),
        fx.work_dir(),
        Arc::clone(&fx.cache),
        Arc::clone(&fx.remote) as Arc<dyn RemoteFileOps>,
        Arc::clone(&format),
    );
    let stats = compactor.compact_to(&versions, 1)?;
    assert_eq!(stats.records_written, 2);
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Curly)?,
        Some(1)
    );

    // The 600-byte superseded record is gone from the rewritten file.
    let record_len = fx.partition_dir().join("00001.base.curly").metadata()?.len();
    assert!(record_len < 100, "record file still {} bytes", record_len);

    let paths = format.version_paths(&fx.partition_dir(), 1, FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert_eq!(reader.get(&k(1))?.value, Some(b"tiny".to_vec()));
    assert_eq!(reader.get(&k(2))?.value, Some(b"keep".to_vec()));
    Ok(())
}

#[test]
fn cueball_compaction_is_the_block_merge() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1), (2, 2)])?;
    seed_remote_cueball(fx.remote.root(), "00001.delta.cueball", &[(2, 22), (3, 33)])?;
    let versions = versions_with_deltas(&[1]);

    let format: Arc<dyn StorageFormat> =
        Arc::new(CueballFormat::new(options(), BlockCodec::None));
    let compactor = Compactor::new(
        fx.partition_dir(),
        fx.work_dir(),
        Arc::clone(&fx.cache),
        Arc::clone(&fx.remote) as Arc<dyn RemoteFileOps>,
        Arc::clone(&format),
    );
    let stats = compactor.compact_to(&versions, 1)?;
    assert_eq!(stats.records_written, 3);

    let paths = format.version_paths(&fx.partition_dir(), 1, FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert_eq!(reader.get(&k(1))?.value, Some(v(1)));
    assert_eq!(reader.get(&k(2))?.value, Some(v(22)));
    assert_eq!(reader.get(&k(3))?.value, Some(v(33)));
    Ok(())
}

#[test]
fn compaction_reuses_the_installed_base() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1)])?;
    seed_remote_cueball(fx.remote.root(), "00001.delta.cueball", &[(2, 2)])?;
    let versions = versions_with_deltas(&[1]);

    // Install version 0 first, then drop its remote copy.
    fx.cueball_updater().update_to(&versions, 0)?;
    fx.remote.delete("00000.base.cueball")?;
    fx.cache.prune(&std::collections::HashSet::new())?;

    let format: Arc<dyn StorageFormat> =
        Arc::new(CueballFormat::new(options(), BlockCodec::None));
    let compactor = Compactor::new(
        fx.partition_dir(),
        fx.work_dir(),
        Arc::clone(&fx.cache),
        Arc::clone(&fx.remote) as Arc<dyn RemoteFileOps>,
        Arc::clone(&format),
    );
    compactor.compact_to(&versions, 1)?;
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(1)
    );
    assert!(!fx.partition_dir().join("00000.base.cueball").exists());
    Ok(())
}
