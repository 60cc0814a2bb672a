use super::{seed_remote_cueball, Fixture};
use crate::{RemoteFileOps, UpdateError};
use anyhow::Result;
use std::collections::HashSet;
use std::io::Read;

#[test]
fn fetch_copies_once_and_hits_after() -> Result<()> {
    let fx = Fixture::new()?;
    seed_remote_cueball(fx.remote.root(), "00001.delta.cueball", &[(1, 1)])?;

    let (path, fetched) = fx.cache.fetch(fx.remote.as_ref(), "00001.delta.cueball")?;
    assert!(path.exists());
    assert!(fetched > 0);

    let (again, refetched) = fx.cache.fetch(fx.remote.as_ref(), "00001.delta.cueball")?;
    assert_eq!(again, path);
    assert_eq!(refetched, 0);
    Ok(())
}

#[test]
fn fetch_of_a_missing_file_fails() -> Result<()> {
    let fx = Fixture::new()?;
    let err = fx
        .cache
        .fetch(fx.remote.as_ref(), "00009.delta.cueball")
        .unwrap_err();
    assert!(matches!(err, UpdateError::MissingRemoteFile(name) if name == "00009.delta.cueball"));
    assert!(!fx.cache.contains("00009.delta.cueball"));
    Ok(())
}

#[test]
fn prune_keeps_only_referenced_files() -> Result<()> {
    let fx = Fixture::new()?;
    for name in ["00001.delta.cueball", "00002.delta.cueball", "00003.delta.cueball"] {
        seed_remote_cueball(fx.remote.root(), name, &[(1, 1)])?;
        fx.cache.fetch(fx.remote.as_ref(), name)?;
    }

    let keep: HashSet<String> = ["00002.delta.cueball".to_string()].into_iter().collect();
    let removed = fx.cache.prune(&keep)?;
    assert_eq!(removed, 2);
    assert!(fx.cache.contains("00002.delta.cueball"));
    assert!(!fx.cache.contains("00001.delta.cueball"));
    assert!(!fx.cache.contains("00003.delta.cueball"));
    Ok(())
}

#[test]
fn local_disk_remote_round_trips_and_lists() -> Result<()> {
    let fx = Fixture::new()?;
    let payload = b"record payload".to_vec();
    let stored = fx.remote.store("00004.delta.curly", &mut payload.as_slice())?;
    assert_eq!(stored, payload.len() as u64);
    assert!(fx.remote.exists("00004.delta.curly")?);

    let mut read_back = Vec::new();
    fx.remote.open("00004.delta.curly")?.read_to_end(&mut read_back)?;
    assert_eq!(read_back, payload);

    let names = fx.remote.list()?;
    assert_eq!(names, vec!["00004.delta.curly".to_string()]);

    fx.remote.delete("00004.delta.curly")?;
    assert!(!fx.remote.exists("00004.delta.curly")?);
    // Deleting again is fine.
    fx.remote.delete("00004.delta.curly")?;
    Ok(())
}
