//! # Archive — indexed binary text archive
//!
//! Immutable, read-optimized storage for short multilingual text snippets
//! (subtitles, transcripts). An archive is built once, in bulk, from a
//! record collection and then served read-only: point lookups by composite
//! `(language, text_id)` key, with an optional [`Source`](record::Source)
//! filter.
//!
//! ## File layout
//!
//! ```text
//! [HEADER] record_count(u32) | index_len(u32) | data_offset(u64)
//! [INDEX]  repeated: language(8) | text_id(16) | source(5) | content_offset(u64) | content_length(u32)
//! [DATA]   concatenated UTF-8 content bytes
//! ```
//!
//! Index entries are sorted by `(language, text_id)`, compared byte-wise,
//! and are fixed-width (41 bytes). That gives the reader random access to
//! any entry by position, so [`ArchiveReader`] binary-searches the index
//! directly on disk instead of loading it: opening an archive reads 16
//! bytes no matter how large the file is.
//!
//! ## Write path / read path
//!
//! [`ArchiveWriter`] validates the whole input, sorts it, and emits the
//! three regions in one pass; the path-based entry points write through a
//! temp file and atomic rename. [`ArchiveReader`] keeps one persistent
//! handle behind a `Mutex`, so a single reader is shared across threads.

mod error;
mod format;
mod reader;
mod writer;

pub use error::{ArchiveError, Result};
pub use format::{
    entry_position, write_index_entry, Header, IndexEntry, HEADER_BYTES, INDEX_ENTRY_BYTES,
    LANG_BYTES, MAX_RECORDS, SOURCE_BYTES, TEXT_ID_BYTES,
};
pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;
