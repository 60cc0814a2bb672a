use super::{curly_options, k, options, seed_remote_cueball, seed_remote_curly, v, Fixture};
use crate::{
    CueballFormat, CurlyFormat, PartitionUpdater, RemoteFileOps, StorageFormat, UpdateError,
    UpdateState,
};
use anyhow::Result;
use compress::BlockCodec;
use domain::{detect_current_version, DomainVersion, DomainVersions, FileFormat, PartitionStats};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn chain_to(versions: &mut DomainVersions, base: u32, deltas: &[u32]) {
    versions.insert(DomainVersion::base(base).with_partitions(vec![PartitionStats {
        num_bytes: 1,
        num_records: 1,
    }]));
    let mut parent = base;
    for &delta in deltas {
        versions.insert(DomainVersion::delta(delta, parent).with_partitions(vec![
            PartitionStats {
                num_bytes: 1,
                num_records: 1,
            },
        ]));
        parent = delta;
    }
}

#[test]
fn fresh_install_of_a_base_version() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1), (2, 2)])?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[]);

    let mut updater = fx.cueball_updater();
    let stats = updater.update_to(&versions, 0)?;
    assert!(!stats.no_op);
    assert!(stats.bytes_fetched > 0);
    assert_eq!(stats.records_written, 2);
    assert_eq!(updater.state(), UpdateState::Idle);
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(0)
    );

    let format = CueballFormat::new(options(), BlockCodec::None);
    let paths = format.version_paths(&fx.partition_dir(), 0, domain::FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert_eq!(reader.get(&k(1))?.value, Some(v(1)));
    assert_eq!(reader.get(&k(2))?.value, Some(v(2)));
    Ok(())
}

#[test]
fn incremental_update_applies_deltas_in_order() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1), (5, 5)])?;
    seed_remote_cueball(fx.remote.root(), "00001.delta.cueball", &[(1, 101), (2, 102)])?;
    seed_remote_cueball(fx.remote.root(), "00002.delta.cueball", &[(1, 201), (3, 203)])?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[1, 2]);

    let mut updater = fx.cueball_updater();
    updater.update_to(&versions, 0)?;
    let stats = updater.update_to(&versions, 2)?;
    assert_eq!(stats.records_written, 4);
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(2)
    );
    // The superseded base is gone from the partition directory.
    assert!(!fx.partition_dir().join("00000.base.cueball").exists());

    let format = CueballFormat::new(options(), BlockCodec::None);
    let paths = format.version_paths(&fx.partition_dir(), 2, domain::FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert_eq!(reader.get(&k(1))?.value, Some(v(201)));
    assert_eq!(reader.get(&k(2))?.value, Some(v(102)));
    assert_eq!(reader.get(&k(3))?.value, Some(v(203)));
    assert_eq!(reader.get(&k(5))?.value, Some(v(5)));
    Ok(())
}

#[test]
fn installed_base_is_reused_instead_of_refetched() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1)])?;
    seed_remote_cueball(fx.remote.root(), "00001.delta.cueball", &[(2, 2)])?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[1]);

    let mut updater = fx.cueball_updater();
    updater.update_to(&versions, 0)?;
    // Wipe every copy of the base except the installed one. The next
    // update must reuse the installed base rather than refetch it.
    fx.remote.delete("00000.base.cueball")?;
    fx.cache.prune(&std::collections::HashSet::new())?;

    updater.update_to(&versions, 1)?;
    assert!(!fx.cache.contains("00000.base.cueball"));
    assert!(fx.cache.contains("00001.delta.cueball"));
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(1)
    );
    Ok(())
}

#[test]
fn update_to_installed_version_is_a_no_op() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1)])?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[]);

    let mut updater = fx.cueball_updater();
    updater.update_to(&versions, 0)?;
    let again = updater.update_to(&versions, 0)?;
    assert!(again.no_op);
    assert_eq!(again.bytes_fetched, 0);
    assert_eq!(again.records_written, 0);
    Ok(())
}

#[test]
fn missing_remote_file_aborts_and_leaves_local_state() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1)])?;
    // Version 1 exists in the chain but its file was never pushed.
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[1]);

    let mut updater = fx.cueball_updater();
    updater.update_to(&versions, 0)?;
    let err = updater.update_to(&versions, 1).unwrap_err();
    assert!(matches!(err, UpdateError::MissingRemoteFile(name) if name == "00001.delta.cueball"));
    assert_eq!(updater.state(), UpdateState::Failed);
    // The old base still serves.
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(0)
    );
    Ok(())
}

#[test]
fn empty_target_version_is_adopted_without_fetching() -> Result<()> {
    let fx = Fixture::new()?;
    // Nothing seeded remotely at all.
    let mut versions = DomainVersions::new();
    versions.insert(
        DomainVersion::base(3).with_partitions(vec![PartitionStats::default(); 2]),
    );

    let mut updater = fx.cueball_updater();
    let stats = updater.update_to(&versions, 3)?;
    assert_eq!(stats.bytes_fetched, 0);
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(3)
    );

    let format = CueballFormat::new(options(), BlockCodec::None);
    let paths = format.version_paths(&fx.partition_dir(), 3, domain::FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert!(!reader.get(&k(1))?.found());
    Ok(())
}

#[test]
fn empty_delta_keeps_the_installed_data() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1), (2, 2)])?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[]);
    // A cycle in which this partition received no changes: the delta has
    // zero bytes and the builder pushed no file for it.
    versions.insert(DomainVersion::delta(1, 0).with_partitions(vec![PartitionStats::default()]));

    let mut updater = fx.cueball_updater();
    updater.update_to(&versions, 0)?;
    let stats = updater.update_to(&versions, 1)?;
    assert_eq!(stats.bytes_fetched, 0);
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(1)
    );
    assert!(!fx.partition_dir().join("00000.base.cueball").exists());

    let format = CueballFormat::new(options(), BlockCodec::None);
    let paths = format.version_paths(&fx.partition_dir(), 1, domain::FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert_eq!(reader.get(&k(1))?.value, Some(v(1)));
    assert_eq!(reader.get(&k(2))?.value, Some(v(2)));
    Ok(())
}

#[test]
fn empty_intermediate_delta_is_not_fetched() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1), (5, 5)])?;
    seed_remote_cueball(fx.remote.root(), "00002.delta.cueball", &[(2, 202)])?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[]);
    // Version 1 carried nothing; only versions 0 and 2 exist remotely.
    versions.insert(DomainVersion::delta(1, 0).with_partitions(vec![PartitionStats::default()]));
    versions.insert(DomainVersion::delta(2, 1).with_partitions(vec![PartitionStats {
        num_bytes: 1,
        num_records: 1,
    }]));

    let mut updater = fx.cueball_updater();
    updater.update_to(&versions, 2)?;
    assert!(!fx.cache.contains("00001.delta.cueball"));
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(2)
    );

    let format = CueballFormat::new(options(), BlockCodec::None);
    let paths = format.version_paths(&fx.partition_dir(), 2, domain::FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert_eq!(reader.get(&k(1))?.value, Some(v(1)));
    assert_eq!(reader.get(&k(2))?.value, Some(v(202)));
    assert_eq!(reader.get(&k(5))?.value, Some(v(5)));
    Ok(())
}

#[test]
fn empty_base_under_live_deltas_is_materialized_locally() -> Result<()> {
    let fx = Fixture::new()?;
    // The opening base carried nothing, so no file was pushed for it; the
    // first delta holds all the data.
    seed_remote_cueball(fx.remote.root(), "00001.delta.cueball", &[(1, 1)])?;
    let mut versions = DomainVersions::new();
    versions.insert(DomainVersion::base(0).with_partitions(vec![PartitionStats::default()]));
    versions.insert(DomainVersion::delta(1, 0).with_partitions(vec![PartitionStats {
        num_bytes: 1,
        num_records: 1,
    }]));

    let mut updater = fx.cueball_updater();
    updater.update_to(&versions, 1)?;
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        Some(1)
    );

    let format = CueballFormat::new(options(), BlockCodec::None);
    let paths = format.version_paths(&fx.partition_dir(), 1, domain::FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert_eq!(reader.get(&k(1))?.value, Some(v(1)));
    Ok(())
}

#[test]
fn cancelled_update_reports_interrupted() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1)])?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[]);

    let mut updater = fx.cueball_updater();
    updater.cancel_flag().store(true, Ordering::Relaxed);
    let err = updater.update_to(&versions, 0).unwrap_err();
    assert!(matches!(err, UpdateError::Interrupted));
    assert_eq!(updater.state(), UpdateState::Failed);
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Cueball)?,
        None
    );
    Ok(())
}

#[test]
fn curly_update_installs_record_and_index_together() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_curly(
        fx.remote.root(),
        "00000.base.curly",
        "00000.base.cueball",
        &[(1, b"one"), (5, b"five")],
    )?;
    seed_remote_curly(
        fx.remote.root(),
        "00001.delta.curly",
        "00001.delta.cueball",
        &[(1, b"one v2"), (2, b"two")],
    )?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[1]);

    let format: Arc<dyn StorageFormat> =
        Arc::new(CurlyFormat::new(curly_options(), BlockCodec::None));
    let mut updater = PartitionUpdater::new(
        fx.partition_dir(),
        fx.work_dir(),
        Arc::clone(&fx.cache),
        Arc::clone(&fx.remote) as Arc<dyn RemoteFileOps>,
        Arc::clone(&format),
    );
    updater.update_to(&versions, 1)?;
    assert_eq!(
        detect_current_version(&fx.partition_dir(), FileFormat::Curly)?,
        Some(1)
    );
    assert!(fx.partition_dir().join("00001.base.curly").exists());
    assert!(fx.partition_dir().join("00001.base.cueball").exists());

    let paths = format.version_paths(&fx.partition_dir(), 1, domain::FileKind::Base);
    let reader = format.open_reader(&paths)?;
    assert_eq!(reader.get(&k(1))?.value, Some(b"one v2".to_vec()));
    assert_eq!(reader.get(&k(2))?.value, Some(b"two".to_vec()));
    assert_eq!(reader.get(&k(5))?.value, Some(b"five".to_vec()));
    Ok(())
}

#[test]
fn get_bulk_through_the_format_reader() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00000.base.cueball", &[(1, 1), (2, 2)])?;
    let mut versions = DomainVersions::new();
    chain_to(&mut versions, 0, &[]);
    fx.cueball_updater().update_to(&versions, 0)?;

    let format = CueballFormat::new(options(), BlockCodec::None);
    let paths = format.version_paths(&fx.partition_dir(), 0, domain::FileKind::Base);
    let reader = format.open_reader(&paths)?;
    let results = reader.get_bulk(&[k(2), k(9), k(1)])?;
    assert_eq!(results[0].value, Some(v(2)));
    assert!(!results[1].found());
    assert_eq!(results[2].value, Some(v(1)));
    Ok(())
}
