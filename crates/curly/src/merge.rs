use crate::error::Result;
use crate::location::CurlyLocation;
use crate::options::CurlyOptions;
use crate::writer::{sync_parent_dir, tmp_sibling, CurlyStats};
use crate::CurlyFilePair;
use compress::BlockCodec;
use cueball::{CueballMerger, ValueTransformer};
use std::fs::{rename, File, OpenOptions};
use std::io::{self, BufWriter};

/// Rewrites key-index location slots during an append merge.
///
/// Stream `i`'s record file lands at byte offset `adjustments[i]` of the
/// concatenated output, so every location from stream `i` shifts by that
/// amount. In-block offsets are unchanged: blocks move as a unit.
pub struct OffsetTransformer {
    adjustments: Vec<u64>,
    grouped: bool,
    slot_size: usize,
}

impl OffsetTransformer {
    #[must_use]
    pub fn new(adjustments: Vec<u64>, grouped: bool, slot_size: usize) -> Self {
        Self {
            adjustments,
            grouped,
            slot_size,
        }
    }
}

impl ValueTransformer for OffsetTransformer {
    fn transform(&self, stream: usize, value: &mut Vec<u8>) -> cueball::Result<()> {
        let mut location = CurlyLocation::decode(value, self.grouped)?;
        location.record_offset += self.adjustments[stream];
        *value = location.encode(self.slot_size)?;
        Ok(())
    }
}

/// Append merge: folds a base and an ordered sequence of deltas into one
/// new curly version without touching record payloads.
///
/// Record files are concatenated base first, then deltas in ascending
/// version order; the key indexes are merged with an [`OffsetTransformer`]
/// shifting each winning location by where its record file landed.
/// Superseded records stay in the output (a compacting merge reclaims
/// them).
pub struct CurlyMerger;

impl CurlyMerger {
    /// Merges `base` plus `deltas` into `output`.
    ///
    /// The output index is compressed with `output_index_codec`. The
    /// record file is written at a temp path and renamed into place
    /// before the index merge runs, so a crash leaves at worst a temp
    /// file and an orphaned record file, never a torn version.
    ///
    /// # Errors
    ///
    /// Any input read error or output I/O error aborts the merge.
    pub fn merge(
        base: &CurlyFilePair,
        deltas: &[&CurlyFilePair],
        output: &CurlyFilePair,
        options: CurlyOptions,
        output_index_codec: BlockCodec,
    ) -> Result<CurlyStats> {
        let mut inputs = Vec::with_capacity(1 + deltas.len());
        inputs.push(base);
        inputs.extend_from_slice(deltas);

        // Concatenate record files, noting where each stream lands.
        let tmp_path = tmp_sibling(&output.record_path);
        let raw = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut out = BufWriter::new(raw);
        let mut adjustments = Vec::with_capacity(inputs.len());
        let mut total = 0u64;
        for pair in &inputs {
            adjustments.push(total);
            let mut src = File::open(&pair.record_path)?;
            total += io::copy(&mut src, &mut out)?;
        }
        let inner = out
            .into_inner()
            .map_err(|e| crate::CurlyError::Io(e.into_error()))?;
        inner.sync_all()?;
        rename(&tmp_path, &output.record_path)?;
        sync_parent_dir(&output.record_path);

        // Merge the key indexes, shifting each location accordingly.
        let transformer =
            OffsetTransformer::new(adjustments, options.grouped(), options.location_size());
        let delta_indexes: Vec<_> = deltas.iter().map(|p| p.index_path.as_path()).collect();
        let index = CueballMerger::merge(
            &base.index_path,
            &delta_indexes,
            &output.index_path,
            options.index,
            output_index_codec,
            Some(&transformer),
        )?;

        Ok(CurlyStats {
            record_bytes_written: total,
            records_written: index.records_written,
            records_folded: 0,
            index,
        })
    }
}
