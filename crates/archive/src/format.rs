//! Archive binary format constants and header / index-entry codecs.
//!
//! ## Layout (all integers little-endian, no magic, no checksum)
//!
//! ```text
//! [header: 16 bytes][index: record_count * 41 bytes][data: content bytes]
//! ```
//!
//! ## Header (16 bytes)
//!
//! ```text
//! [record_count: u32 LE][index_len: u32 LE][data_offset: u64 LE]
//! ```
//!
//! `index_len` is always `record_count * 41` and `data_offset` is always
//! `16 + index_len`; both are stored anyway and checked on open.
//!
//! ## Index entry (41 bytes, entries sorted by `(language, text_id)`)
//!
//! ```text
//! [language: 8][text_id: 16][source: 5][content_offset: u64 LE][content_length: u32 LE]
//! ```
//!
//! String fields are UTF-8, padded to their fixed width with NUL bytes.
//! `content_offset` is relative to the start of the data region, so entry
//! decoding never depends on the header. The layout carries no version or
//! checksum fields; it is fixed by the existing producers and consumers of
//! these files.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::io::{self, Result as IoResult, Write};
use std::str::FromStr;

use record::Source;

use crate::{ArchiveError, Result};

/// Size of the header in bytes: 4 (`record_count`) + 4 (`index_len`) + 8 (`data_offset`).
pub const HEADER_BYTES: u64 = 4 + 4 + 8;

/// Fixed width of the `language` field.
pub const LANG_BYTES: usize = 8;

/// Fixed width of the `text_id` field.
pub const TEXT_ID_BYTES: usize = 16;

/// Fixed width of the `source` field (fits the longest tag, `"AUDIO"`).
pub const SOURCE_BYTES: usize = 5;

/// Size of one index entry in bytes: 8 + 16 + 5 + 8 (`content_offset`) + 4 (`content_length`).
pub const INDEX_ENTRY_BYTES: u64 = 8 + 16 + 5 + 8 + 4;

/// Largest record count whose index still fits the header's u32 `index_len`.
pub const MAX_RECORDS: u64 = u32::MAX as u64 / INDEX_ENTRY_BYTES;

/// Combined width of the three string fields; the integer tail starts here.
const STR_BYTES: usize = LANG_BYTES + TEXT_ID_BYTES + SOURCE_BYTES;

/// Returns the absolute byte offset of index entry `pos`.
#[must_use]
pub fn entry_position(pos: u64) -> u64 {
    HEADER_BYTES + pos * INDEX_ENTRY_BYTES
}

/// Decoded archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Number of index entries.
    pub record_count: u32,
    /// Index region size in bytes.
    pub index_len: u32,
    /// Absolute offset of the data region.
    pub data_offset: u64,
}

impl Header {
    /// Builds the header implied by `record_count`.
    ///
    /// The caller must keep `record_count` within [`MAX_RECORDS`].
    #[must_use]
    pub fn for_record_count(record_count: u32) -> Self {
        debug_assert!(u64::from(record_count) <= MAX_RECORDS);
        let index_len = u64::from(record_count) * INDEX_ENTRY_BYTES;
        Self {
            record_count,
            index_len: index_len as u32,
            data_offset: HEADER_BYTES + index_len,
        }
    }

    /// Writes the 16-byte header to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> IoResult<()> {
        w.write_u32::<LittleEndian>(self.record_count)?;
        w.write_u32::<LittleEndian>(self.index_len)?;
        w.write_u64::<LittleEndian>(self.data_offset)?;
        Ok(())
    }

    /// Reads and validates a header from `r`.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Corrupt`] if fewer than 16 bytes are available or the
    /// stored fields are not internally consistent.
    pub fn read_from<R: io::Read>(r: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_BYTES as usize];
        r.read_exact(&mut buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ArchiveError::Corrupt("file shorter than the 16-byte header".to_string())
            } else {
                ArchiveError::Io(e)
            }
        })?;
        let mut cursor = &buf[..];
        let header = Self {
            record_count: cursor.read_u32::<LittleEndian>()?,
            index_len: cursor.read_u32::<LittleEndian>()?,
            data_offset: cursor.read_u64::<LittleEndian>()?,
        };
        header.validate()?;
        Ok(header)
    }

    /// Checks the header's internal arithmetic.
    pub fn validate(&self) -> Result<()> {
        let expect_index = u64::from(self.record_count) * INDEX_ENTRY_BYTES;
        if u64::from(self.index_len) != expect_index {
            return Err(ArchiveError::Corrupt(format!(
                "index_len {} does not match record_count {} * {}",
                self.index_len, self.record_count, INDEX_ENTRY_BYTES
            )));
        }
        if self.data_offset != HEADER_BYTES + u64::from(self.index_len) {
            return Err(ArchiveError::Corrupt(format!(
                "data_offset {} does not match {} + index_len {}",
                self.data_offset, HEADER_BYTES, self.index_len
            )));
        }
        Ok(())
    }
}

/// Serializes one index entry to `w`: string fields NUL-padded to width,
/// integers little-endian.
///
/// A `language` or `text_id` wider than its fixed field fails with
/// [`io::ErrorKind::InvalidInput`] before anything reaches `w`.
pub fn write_index_entry<W: Write>(
    w: &mut W,
    language: &str,
    text_id: &str,
    source: Source,
    content_offset: u64,
    content_length: u32,
) -> IoResult<()> {
    if language.len() > LANG_BYTES {
        return Err(oversized_field("language", language.len(), LANG_BYTES));
    }
    if text_id.len() > TEXT_ID_BYTES {
        return Err(oversized_field("text_id", text_id.len(), TEXT_ID_BYTES));
    }

    let mut buf = [0u8; INDEX_ENTRY_BYTES as usize];
    buf[..language.len()].copy_from_slice(language.as_bytes());
    buf[LANG_BYTES..LANG_BYTES + text_id.len()].copy_from_slice(text_id.as_bytes());
    let tag = source.as_str().as_bytes();
    buf[LANG_BYTES + TEXT_ID_BYTES..LANG_BYTES + TEXT_ID_BYTES + tag.len()].copy_from_slice(tag);
    let mut tail = &mut buf[STR_BYTES..];
    tail.write_u64::<LittleEndian>(content_offset)?;
    tail.write_u32::<LittleEndian>(content_length)?;
    w.write_all(&buf)
}

/// One decoded 41-byte index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub language: String,
    pub text_id: String,
    pub source: Source,
    /// Byte offset of the content, relative to the start of the data region.
    pub content_offset: u64,
    /// Content length in bytes.
    pub content_length: u32,
}

impl IndexEntry {
    /// Decodes an entry from its fixed-width wire form.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Corrupt`] if a string field is not valid UTF-8 or the
    /// source tag is unknown.
    pub fn read_from(buf: &[u8; INDEX_ENTRY_BYTES as usize]) -> Result<Self> {
        let language = read_padded_field(&buf[..LANG_BYTES], "language")?;
        let text_id = read_padded_field(&buf[LANG_BYTES..LANG_BYTES + TEXT_ID_BYTES], "text_id")?;
        let tag = read_padded_field(&buf[LANG_BYTES + TEXT_ID_BYTES..STR_BYTES], "source")?;
        let source = Source::from_str(&tag)
            .map_err(|e| ArchiveError::Corrupt(format!("index entry with {e}")))?;
        let mut tail = &buf[STR_BYTES..];
        Ok(Self {
            language,
            text_id,
            source,
            content_offset: tail.read_u64::<LittleEndian>()?,
            content_length: tail.read_u32::<LittleEndian>()?,
        })
    }

    /// Serializes the entry. Inverse of [`IndexEntry::read_from`].
    pub fn write_to<W: Write>(&self, w: &mut W) -> IoResult<()> {
        write_index_entry(
            w,
            &self.language,
            &self.text_id,
            self.source,
            self.content_offset,
            self.content_length,
        )
    }

    /// Byte-wise comparison of this entry's composite key against a target
    /// key, `language` first.
    #[must_use]
    pub fn key_cmp(&self, language: &str, text_id: &str) -> Ordering {
        (self.language.as_str(), self.text_id.as_str()).cmp(&(language, text_id))
    }
}

fn oversized_field(field: &'static str, len: usize, width: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{field} is {len} bytes but the field holds {width}"),
    )
}

/// Strips trailing NUL padding from a fixed-width field and checks UTF-8.
fn read_padded_field(raw: &[u8], field: &'static str) -> Result<String> {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    match std::str::from_utf8(&raw[..end]) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => Err(ArchiveError::Corrupt(format!(
            "invalid UTF-8 in {field} field"
        ))),
    }
}
