use super::{k, pair, small_options, write_pair};
use crate::{CurlyError, CurlyLocation, CurlyWriter};
use anyhow::Result;
use compress::BlockCodec;
use cueball::CueballError;
use tempfile::tempdir;

#[test]
fn counts_records_and_bytes() -> Result<()> {
    let dir = tempdir()?;
    let files = pair(dir.path(), "00001.base");
    let stats = write_pair(
        &files,
        small_options(),
        &[(1, b"alpha"), (2, b"be"), (3, b"gamma!")],
    )?;

    assert_eq!(stats.records_written, 3);
    assert_eq!(stats.records_folded, 0);
    // Each plain record costs a 1-byte length prefix plus the value.
    assert_eq!(stats.record_bytes_written, 6 + 3 + 7);
    assert_eq!(stats.index.records_written, 3);
    Ok(())
}

#[test]
fn folding_reuses_the_first_occurrence() -> Result<()> {
    let dir = tempdir()?;
    let files = pair(dir.path(), "00001.base");
    let stats = write_pair(
        &files,
        small_options().with_value_folding(),
        &[(1, b"shared"), (2, b"shared"), (3, b"other"), (4, b"shared")],
    )?;

    assert_eq!(stats.records_written, 4);
    assert_eq!(stats.records_folded, 2);
    // Only the two distinct values hit the record file.
    assert_eq!(stats.record_bytes_written, 7 + 6);
    assert_eq!(stats.index.records_written, 4);
    Ok(())
}

#[test]
fn without_folding_duplicates_are_re_appended() -> Result<()> {
    let dir = tempdir()?;
    let files = pair(dir.path(), "00001.base");
    let stats = write_pair(
        &files,
        small_options(),
        &[(1, b"shared"), (2, b"shared")],
    )?;

    assert_eq!(stats.records_folded, 0);
    assert_eq!(stats.record_bytes_written, 7 + 7);
    Ok(())
}

#[test]
fn grouped_writer_packs_records_into_blocks() -> Result<()> {
    let dir = tempdir()?;
    let files = pair(dir.path(), "00001.base");
    // A 16-byte target forces a block cut every couple of records.
    let options = small_options().with_block_grouping(BlockCodec::None, 16);
    let stats = write_pair(
        &files,
        options,
        &[(1, b"aaaaaaaaaa"), (2, b"bbbbbbbbbb"), (3, b"cccccccccc")],
    )?;

    assert_eq!(stats.records_written, 3);
    // Uncompressed blocks still carry a block length prefix, so the file
    // is a little larger than the raw records.
    assert!(stats.record_bytes_written > 33);
    assert_eq!(files.record_path.metadata()?.len(), stats.record_bytes_written);
    Ok(())
}

#[test]
fn key_order_violation_propagates_from_the_index() -> Result<()> {
    let dir = tempdir()?;
    let files = pair(dir.path(), "00001.base");
    let mut w = CurlyWriter::create(&files.record_path, &files.index_path, small_options())?;
    w.write(&k(5), b"five")?;
    let err = w.write(&k(4), b"four").unwrap_err();
    assert!(matches!(
        err,
        CurlyError::Index(CueballError::KeyOrderViolation { .. })
    ));
    Ok(())
}

#[test]
fn location_overflow_is_reported_not_truncated() {
    // A 2-byte offset varint cannot fit a 1-byte slot.
    let location = CurlyLocation::direct(1 << 14);
    let err = location.encode(1).unwrap_err();
    assert!(matches!(err, CurlyError::LocationOverflow { slot_size: 1, .. }));
}

#[test]
fn files_appear_only_at_close() -> Result<()> {
    let dir = tempdir()?;
    let files = pair(dir.path(), "00001.base");
    let mut w = CurlyWriter::create(&files.record_path, &files.index_path, small_options())?;
    w.write(&k(1), b"one")?;
    assert!(!files.record_path.exists());
    assert!(!files.index_path.exists());

    w.close()?;
    assert!(files.record_path.exists());
    assert!(files.index_path.exists());
    Ok(())
}

#[test]
fn failed_index_close_leaves_no_record_file() -> Result<()> {
    let dir = tempdir()?;
    let files = pair(dir.path(), "00001.base");
    let mut w = CurlyWriter::create(&files.record_path, &files.index_path, small_options())?;
    w.write(&k(1), b"one")?;

    // Pull the index's temp file out from under the writer so the index
    // cannot be renamed into place at close.
    std::fs::remove_file(dir.path().join("00001.base.cueball.tmp"))?;
    assert!(w.close().is_err());

    // Neither file took its final name; the version is not detectable.
    assert!(!files.record_path.exists());
    assert!(!files.index_path.exists());
    Ok(())
}

#[test]
fn empty_version_is_valid() -> Result<()> {
    let dir = tempdir()?;
    let files = pair(dir.path(), "00001.base");
    let stats = write_pair(&files, small_options(), &[])?;
    assert_eq!(stats.records_written, 0);
    assert_eq!(stats.record_bytes_written, 0);

    let r = crate::CurlyReader::open(&files.record_path, &files.index_path, small_options())?;
    assert!(!r.get(&k(1))?.found());
    Ok(())
}
