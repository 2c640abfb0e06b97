use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use record::Source;
use tracing::debug;

use crate::format::{entry_position, Header, IndexEntry, INDEX_ENTRY_BYTES};
use crate::{ArchiveError, Result};

/// Point-lookup reader over an immutable archive.
///
/// On [`open`](ArchiveReader::open) only the 16-byte header is read and
/// validated; the index stays on disk and every lookup binary-searches it
/// directly. Open cost is O(1) in the archive size, and a lookup costs
/// O(log n) index-entry reads plus one ranged read for the content.
///
/// A persistent handle to the byte source is kept for the lifetime of the
/// reader, wrapped in a `Mutex` so that [`lookup`](ArchiveReader::lookup)
/// can be called through a shared `&self` reference. Every lookup seeks to
/// absolute offsets and carries no state between calls.
#[derive(Debug)]
pub struct ArchiveReader<S> {
    /// Validated header, cached at open.
    header: Header,
    /// Total source length; fixed for the reader's lifetime, the archive
    /// being immutable.
    source_len: u64,
    /// Persistent byte source, wrapped in a Mutex for interior mutability.
    source: Mutex<S>,
}

impl ArchiveReader<BufReader<File>> {
    /// Opens an archive file.
    ///
    /// # Validation
    ///
    /// - The file must hold a full 16-byte header.
    /// - `index_len` must equal `record_count * 41` and `data_offset` must
    ///   equal `16 + index_len`.
    /// - The index region must fit inside the file.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Corrupt`] if any check fails, [`ArchiveError::Io`]
    /// if the file cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_source(BufReader::new(file))
    }
}

impl<S: Read + Seek> ArchiveReader<S> {
    /// Constructs a reader over any seekable byte source, such as an opened
    /// file or an in-memory `Cursor`.
    ///
    /// Performs the same validation as [`open`](ArchiveReader::open).
    pub fn from_source(mut source: S) -> Result<Self> {
        let source_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        let header = Header::read_from(&mut source)?;

        if source_len < header.data_offset {
            return Err(ArchiveError::Corrupt(format!(
                "file length {} is shorter than data_offset {} (truncated index)",
                source_len, header.data_offset
            )));
        }

        debug!(
            records = header.record_count,
            data_offset = header.data_offset,
            "opened archive"
        );
        Ok(Self {
            header,
            source_len,
            source: Mutex::new(source),
        })
    }

    /// Looks up the content stored under `(language, text_id)`.
    ///
    /// With a `source` filter, the stored tag must equal the filter: a key
    /// match with a different tag fails with
    /// [`ArchiveError::SourceMismatch`] immediately, the search does not
    /// look for a sibling entry under another tag.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::NotFound`] if no entry has this key,
    /// [`ArchiveError::SourceMismatch`] as above,
    /// [`ArchiveError::Corrupt`] for format violations met along the way,
    /// [`ArchiveError::Io`] on read failure.
    pub fn lookup(&self, language: &str, text_id: &str, source: Option<Source>) -> Result<String> {
        // Lookups only ever seek to absolute offsets, so a source left
        // behind by a panicked lookup holds no state worth rejecting.
        let mut src = self.source.lock().unwrap_or_else(|e| e.into_inner());

        let mut low: u64 = 0;
        let mut high: u64 = u64::from(self.header.record_count);

        while low < high {
            let mid = low + (high - low) / 2;
            let entry = Self::read_entry(&mut src, mid)?;
            match entry.key_cmp(language, text_id) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => {
                    if let Some(expected) = source {
                        if entry.source != expected {
                            return Err(ArchiveError::SourceMismatch {
                                language: language.to_string(),
                                text_id: text_id.to_string(),
                                expected,
                                actual: entry.source,
                            });
                        }
                    }
                    return self.read_content(&mut src, &entry);
                }
            }
        }

        Err(ArchiveError::NotFound {
            language: language.to_string(),
            text_id: text_id.to_string(),
        })
    }

    /// Walks the whole index once and checks the archive's structural
    /// invariants: non-decreasing key order, content offsets contiguous
    /// from 0, and a data region exactly as long as the entries claim.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Corrupt`] naming the first offending entry.
    pub fn verify(&self) -> Result<()> {
        let mut src = self.source.lock().unwrap_or_else(|e| e.into_inner());

        let mut expected_offset: u64 = 0;
        let mut prev_key: Option<(String, String)> = None;
        for pos in 0..u64::from(self.header.record_count) {
            let entry = Self::read_entry(&mut src, pos)?;
            if let Some((language, text_id)) = &prev_key {
                if entry.key_cmp(language, text_id) == Ordering::Less {
                    return Err(ArchiveError::Corrupt(format!(
                        "index entry {pos} key ({}, {}) sorts before its predecessor ({language}, {text_id})",
                        entry.language, entry.text_id
                    )));
                }
            }
            if entry.content_offset != expected_offset {
                return Err(ArchiveError::Corrupt(format!(
                    "index entry {pos} content_offset {} leaves a gap (expected {expected_offset})",
                    entry.content_offset
                )));
            }
            expected_offset += u64::from(entry.content_length);
            prev_key = Some((entry.language, entry.text_id));
        }

        let data_len = self.source_len - self.header.data_offset;
        if expected_offset != data_len {
            return Err(ArchiveError::Corrupt(format!(
                "data region is {data_len} bytes but index entries claim {expected_offset}"
            )));
        }
        Ok(())
    }

    /// The validated header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of index entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.record_count as usize
    }

    /// Returns `true` if the archive holds zero records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.record_count == 0
    }

    /// Data region size in bytes.
    #[must_use]
    pub fn data_size(&self) -> u64 {
        self.source_len - self.header.data_offset
    }

    /// Reads and decodes the index entry at position `pos`.
    fn read_entry(src: &mut S, pos: u64) -> Result<IndexEntry> {
        src.seek(SeekFrom::Start(entry_position(pos)))?;
        let mut buf = [0u8; INDEX_ENTRY_BYTES as usize];
        src.read_exact(&mut buf)
            .map_err(|e| truncated(e, &format!("index entry {pos}")))?;
        IndexEntry::read_from(&buf)
    }

    /// Reads `entry`'s slice of the data region and decodes it as UTF-8.
    fn read_content(&self, src: &mut S, entry: &IndexEntry) -> Result<String> {
        let data_len = self.source_len - self.header.data_offset;
        let end = entry
            .content_offset
            .checked_add(u64::from(entry.content_length));
        // Bounds-check against the real data region before allocating.
        if !matches!(end, Some(end) if end <= data_len) {
            return Err(ArchiveError::Corrupt(format!(
                "content for ({}, {}) extends past end of file",
                entry.language, entry.text_id
            )));
        }

        src.seek(SeekFrom::Start(self.header.data_offset + entry.content_offset))?;
        let mut buf = vec![0u8; entry.content_length as usize];
        src.read_exact(&mut buf)
            .map_err(|e| truncated(e, &format!("content for ({}, {})", entry.language, entry.text_id)))?;
        String::from_utf8(buf).map_err(|_| {
            ArchiveError::Corrupt(format!(
                "invalid UTF-8 in content for ({}, {})",
                entry.language, entry.text_id
            ))
        })
    }
}

/// Maps an EOF hit while reading a region to `Corrupt`; any other failure
/// stays `Io`.
fn truncated(e: io::Error, what: &str) -> ArchiveError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ArchiveError::Corrupt(format!("{what} extends past end of file"))
    } else {
        ArchiveError::Io(e)
    }
}
