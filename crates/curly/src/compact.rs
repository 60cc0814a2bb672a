use crate::error::{CurlyError, Result};
use crate::location::CurlyLocation;
use crate::options::CurlyOptions;
use crate::writer::{CurlyStats, CurlyWriter};
use crate::CurlyFilePair;
use codec::varint;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// Random-access record fetcher over one input stream of a compacting
/// merge.
///
/// Winning keys arrive in hash order, not record order, so grouped
/// streams keep the last decompressed block around; neighbouring keys
/// written together tend to share a block.
struct RecordSource {
    file: File,
    options: CurlyOptions,
    last_block: Option<(u64, Vec<u8>)>,
}

impl RecordSource {
    fn open(pair: &CurlyFilePair, options: CurlyOptions) -> Result<Self> {
        Ok(Self {
            file: File::open(&pair.record_path)?,
            options,
            last_block: None,
        })
    }

    /// Reads the record at `location` from this stream's record file.
    fn fetch(&mut self, location: CurlyLocation) -> Result<Vec<u8>> {
        match location.in_block_offset {
            None => {
                self.file.seek(SeekFrom::Start(location.record_offset))?;
                let len = varint::read(&mut self.file)?;
                let mut value = vec![0u8; len as usize];
                self.file.read_exact(&mut value)?;
                Ok(value)
            }
            Some(in_block) => {
                let block = self.block_at(location.record_offset)?;
                let in_block = in_block as usize;
                if in_block >= block.len() {
                    return Err(CurlyError::Corrupt(format!(
                        "in-block offset {} beyond block length {}",
                        in_block,
                        block.len()
                    )));
                }
                let (len, prefix_len) = varint::decode(&block[in_block..])
                    .map_err(|e| CurlyError::Corrupt(format!("bad record length prefix: {}", e)))?;
                let start = in_block + prefix_len;
                let end = start + len as usize;
                if end > block.len() {
                    return Err(CurlyError::Corrupt(format!(
                        "record of {} bytes at in-block offset {} overruns block length {}",
                        len,
                        in_block,
                        block.len()
                    )));
                }
                Ok(block[start..end].to_vec())
            }
        }
    }

    fn block_at(&mut self, block_offset: u64) -> Result<&[u8]> {
        let stale = match &self.last_block {
            Some((offset, _)) => *offset != block_offset,
            None => true,
        };
        if stale {
            let grouping = self.options.block_grouping.ok_or_else(|| {
                CurlyError::Corrupt("grouped location in ungrouped file".to_string())
            })?;
            self.file.seek(SeekFrom::Start(block_offset))?;
            let len = varint::read(&mut self.file)?;
            let mut compressed = vec![0u8; len as usize];
            self.file.read_exact(&mut compressed)?;
            let block = grouping
                .codec
                .decompress(&compressed, grouping.target_block_size)?;
            self.last_block = Some((block_offset, block));
        }
        match &self.last_block {
            Some((_, block)) => Ok(block),
            None => Err(CurlyError::Corrupt(
                "record block unavailable".to_string(),
            )),
        }
    }
}

/// Compacting merge: folds a base and an ordered sequence of deltas into
/// one new curly version containing only each key's winning record.
///
/// The key-level N-way merge runs over the input key indexes; for every
/// winning key the record is fetched from its stream's record file and
/// re-appended through a fresh writer, so superseded records and
/// fold-duplicated values are reclaimed. Costs a record-file rewrite;
/// the append merge ([`crate::CurlyMerger`]) trades space for speed.
pub struct CurlyCompactingMerger;

impl CurlyCompactingMerger {
    /// Merges `base` plus `deltas` (ascending version order) into
    /// `output`, rewriting records under `output_options`.
    ///
    /// `input_options` and `output_options` must agree on index geometry
    /// (key hash size, slot width, hash index bits); grouping, folding,
    /// and codecs may differ, which is how a compaction can re-group or
    /// re-compress a partition.
    ///
    /// # Errors
    ///
    /// Any input read error or output I/O error aborts the merge; the
    /// output paths are left untouched apart from temp files.
    pub fn merge(
        base: &CurlyFilePair,
        deltas: &[&CurlyFilePair],
        output: &CurlyFilePair,
        input_options: CurlyOptions,
        output_options: CurlyOptions,
    ) -> Result<CurlyStats> {
        let mut inputs = Vec::with_capacity(1 + deltas.len());
        inputs.push(base);
        inputs.extend_from_slice(deltas);

        let mut sources = Vec::with_capacity(inputs.len());
        let mut index_paths = Vec::with_capacity(inputs.len());
        for pair in &inputs {
            sources.push(RecordSource::open(pair, input_options)?);
            index_paths.push(pair.index_path.as_path());
        }

        let mut writer =
            CurlyWriter::create(&output.record_path, &output.index_path, output_options)?;
        let grouped = input_options.grouped();
        cueball::merge_entries(&index_paths, input_options.index, |stream, key_hash, slot| {
            let location = CurlyLocation::decode(slot, grouped)?;
            let value = sources[stream].fetch(location)?;
            writer.write(key_hash, &value)?;
            Ok(())
        })?;
        writer.close()
    }
}
