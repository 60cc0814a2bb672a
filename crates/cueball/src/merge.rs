//! N-way merge over a base file and an ordered sequence of delta files.
//!
//! Each input is walked by a [`StreamBuffer`] — a sequential cursor that
//! lazily loads one bucket block at a time in file order. The merge itself
//! is a min-heap of pending entries keyed on key hash; when several inputs
//! carry the same hash, the entry from the **highest stream index wins**
//! (inputs are ordered base first, then deltas in ascending version order,
//! so later deltas override earlier ones and the base).
//!
//! [`merge_entries`] exposes the winner stream to a caller-supplied sink so
//! the curly format can drive record resolution off the same merge;
//! [`CueballMerger::merge`] is the sink that simply rewrites a cueball file.

use crate::error::{CueballError, Result};
use crate::footer::Footer;
use crate::options::CueballOptions;
use crate::writer::{CueballStats, CueballWriter};
use codec::varint;
use compress::BlockCodec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Sequential cursor over one cueball file.
///
/// Yields `(key hash, value)` tuples in file order, loading and
/// decompressing one bucket block at a time. Sparse buckets (zero-length
/// ranges) are skipped without disturbing block boundaries.
pub struct StreamBuffer {
    file: BufReader<File>,
    footer: Footer,
    options: CueballOptions,
    /// Next bucket index to load.
    next_bucket: usize,
    block: Vec<u8>,
    block_pos: usize,
}

impl StreamBuffer {
    /// Opens a cursor at the first entry of `path`.
    pub fn open<P: AsRef<Path>>(path: P, options: CueballOptions) -> Result<Self> {
        let mut file = File::open(path)?;
        let footer = Footer::read(&mut file, options.num_buckets())?;
        file.seek(SeekFrom::Start(0))?;
        Ok(Self {
            file: BufReader::new(file),
            footer,
            options,
            next_bucket: 0,
            block: Vec::new(),
            block_pos: 0,
        })
    }

    /// Returns the next `(key hash, value)` tuple, or `None` at end of
    /// file.
    pub fn next_entry(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        loop {
            if self.block_pos < self.block.len() {
                let entry_size = self.options.entry_size();
                let key_size = self.options.key_hash_size;
                let at = self.block_pos;
                self.block_pos += entry_size;
                let key_hash = self.block[at..at + key_size].to_vec();
                let value = self.block[at + key_size..at + entry_size].to_vec();
                return Ok(Some((key_hash, value)));
            }
            if !self.load_next_block()? {
                return Ok(None);
            }
        }
    }

    /// Loads the next non-empty bucket block. Returns `false` when the
    /// file is exhausted.
    fn load_next_block(&mut self) -> Result<bool> {
        while self.next_bucket < self.footer.num_buckets() {
            let bucket = self.next_bucket;
            self.next_bucket += 1;
            let (start, end) = self.footer.bucket_range(bucket);
            if start == end {
                continue;
            }

            let mut raw = vec![0u8; (end - start) as usize];
            self.file.seek(SeekFrom::Start(start))?;
            self.file.read_exact(&mut raw)?;

            self.block = if self.options.codec.is_compressed() {
                let (compressed_len, prefix_len) = varint::decode(&raw).map_err(|e| {
                    CueballError::Corrupt(format!("bad block length prefix: {}", e))
                })?;
                let payload = &raw[prefix_len..];
                if compressed_len as usize != payload.len() {
                    return Err(CueballError::Corrupt(format!(
                        "block length prefix {} does not match range {}",
                        compressed_len,
                        payload.len()
                    )));
                }
                self.options
                    .codec
                    .decompress(payload, self.footer.max_uncompressed_block_size() as usize)?
            } else {
                raw
            };

            if self.block.len() % self.options.entry_size() != 0 {
                return Err(CueballError::Corrupt(format!(
                    "block length {} is not a multiple of entry size {}",
                    self.block.len(),
                    self.options.entry_size()
                )));
            }
            self.block_pos = 0;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Rewrites a merged key-index value before it reaches the output.
///
/// The curly append merge uses this to add per-stream offset adjustments
/// to record locations; plain cueball merges pass no transformer.
pub trait ValueTransformer {
    /// Rewrites `value` in place for an entry that won from `stream`.
    fn transform(&self, stream: usize, value: &mut Vec<u8>) -> Result<()>;
}

/// A pending tuple from one input stream, ordered for the merge heap.
struct HeapEntry {
    key_hash: Vec<u8>,
    value: Vec<u8>,
    stream: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key_hash == other.key_hash && self.stream == other.stream
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse the key comparison so the
        // smallest hash pops first. On equal hashes the higher stream
        // index (latest version) pops first and wins.
        other
            .key_hash
            .cmp(&self.key_hash)
            .then_with(|| self.stream.cmp(&other.stream))
    }
}

/// Runs the N-way merge over `inputs` (base first, then deltas in
/// ascending version order), invoking `sink(stream, key_hash, value)` once
/// per distinct key hash with the winning entry. Losing duplicates are
/// consumed and discarded.
pub fn merge_entries<F>(inputs: &[&Path], options: CueballOptions, mut sink: F) -> Result<()>
where
    F: FnMut(usize, &[u8], &[u8]) -> Result<()>,
{
    let mut streams = Vec::with_capacity(inputs.len());
    let mut heap = BinaryHeap::new();
    for (stream, path) in inputs.iter().enumerate() {
        let mut cursor = StreamBuffer::open(path, options)?;
        if let Some((key_hash, value)) = cursor.next_entry()? {
            heap.push(HeapEntry {
                key_hash,
                value,
                stream,
            });
        }
        streams.push(cursor);
    }

    while let Some(top) = heap.pop() {
        sink(top.stream, &top.key_hash, &top.value)?;
        if let Some((key_hash, value)) = streams[top.stream].next_entry()? {
            heap.push(HeapEntry {
                key_hash,
                value,
                stream: top.stream,
            });
        }

        // Discard losers: every other stream carrying the same hash.
        while let Some(peek) = heap.peek() {
            if peek.key_hash != top.key_hash {
                break;
            }
            let loser = match heap.pop() {
                Some(e) => e,
                None => break,
            };
            if let Some((key_hash, value)) = streams[loser.stream].next_entry()? {
                heap.push(HeapEntry {
                    key_hash,
                    value,
                    stream: loser.stream,
                });
            }
        }
    }
    Ok(())
}

/// Folds a base and an ordered sequence of deltas into one new cueball
/// file.
pub struct CueballMerger;

impl CueballMerger {
    /// Merges `base` plus `deltas` (ascending version order) into
    /// `output`, compressed with `output_codec`.
    ///
    /// An optional [`ValueTransformer`] rewrites each winning value with
    /// knowledge of which stream it came from.
    ///
    /// # Errors
    ///
    /// Any input read error, order violation, or output I/O error aborts
    /// the merge; the output path is left untouched (only a temp file may
    /// remain).
    pub fn merge(
        base: &Path,
        deltas: &[&Path],
        output: &Path,
        options: CueballOptions,
        output_codec: BlockCodec,
        transformer: Option<&dyn ValueTransformer>,
    ) -> Result<CueballStats> {
        let mut inputs = Vec::with_capacity(1 + deltas.len());
        inputs.push(base);
        inputs.extend_from_slice(deltas);

        let mut writer = CueballWriter::create(output, options.with_codec(output_codec))?;
        let mut scratch = Vec::with_capacity(options.value_size);
        merge_entries(&inputs, options, |stream, key_hash, value| {
            match transformer {
                Some(t) => {
                    scratch.clear();
                    scratch.extend_from_slice(value);
                    t.transform(stream, &mut scratch)?;
                    writer.write(key_hash, &scratch)
                }
                None => writer.write(key_hash, value),
            }
        })?;
        writer.close()
    }
}
