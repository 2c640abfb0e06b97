use std::fs::{rename, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use record::{Record, RecordSet, Source};
use tracing::{debug, info};

use crate::format::{write_index_entry, Header, LANG_BYTES, MAX_RECORDS, TEXT_ID_BYTES};
use crate::{ArchiveError, Result};

/// Borrowed view of one record in emit order.
#[derive(Clone, Copy)]
struct EntryRef<'a> {
    language: &'a str,
    text_id: &'a str,
    source: Source,
    content: &'a str,
}

impl<'a> EntryRef<'a> {
    fn from_record(record: &'a Record) -> Self {
        Self {
            language: &record.language,
            text_id: &record.text_id,
            source: record.source,
            content: &record.content,
        }
    }
}

/// Serializes a record collection into an immutable archive.
///
/// The writer is stateless; all work happens inside the static entry
/// points. The whole input is validated before the first byte is emitted,
/// and the path-based forms are crash-safe: bytes land in a temporary file
/// that is fsynced and then atomically renamed over the target.
pub struct ArchiveWriter {}

impl ArchiveWriter {
    /// Serializes `records` into `sink`.
    ///
    /// Records may arrive in any order; they are sorted by
    /// `(language, text_id)` first. An empty slice produces a valid
    /// 16-byte archive.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Validation`] for an oversized or trailing-NUL field,
    /// [`ArchiveError::DuplicateKey`] if two records share a composite key,
    /// [`ArchiveError::Io`] on sink failure. Validation errors leave the
    /// sink untouched.
    pub fn write_to<W: Write>(sink: &mut W, records: &[Record]) -> Result<()> {
        let entries = Self::sorted_entries(records)?;
        Self::write_sorted(sink, &entries)
    }

    /// Builds an archive from `records` and atomically replaces `path`.
    ///
    /// # Crash Safety
    ///
    /// Writes to `path` with a `.tmp` extension, calls `sync_all()`, then
    /// atomically renames. A crash mid-write leaves the previous archive
    /// intact and at worst a stray temp file behind.
    ///
    /// # Errors
    ///
    /// As [`write_to`](ArchiveWriter::write_to); on any failure `path` is
    /// left untouched and the temp file is removed.
    pub fn write_to_path<P: AsRef<Path>>(path: P, records: &[Record]) -> Result<()> {
        let entries = Self::sorted_entries(records)?;
        Self::write_file(path.as_ref(), &entries)
    }

    /// Builds an archive from an already staged [`RecordSet`] and atomically
    /// replaces `path`.
    ///
    /// The set is sorted and key-unique by construction, so only field
    /// validation applies.
    pub fn write_set_to_path<P: AsRef<Path>>(path: P, set: &RecordSet) -> Result<()> {
        let entries = Self::set_entries(set)?;
        Self::write_file(path.as_ref(), &entries)
    }

    /// Sorts, checks key uniqueness, and validates fields.
    fn sorted_entries(records: &[Record]) -> Result<Vec<EntryRef<'_>>> {
        let mut entries: Vec<EntryRef<'_>> = records.iter().map(EntryRef::from_record).collect();
        entries.sort_by(|a, b| (a.language, a.text_id).cmp(&(b.language, b.text_id)));

        for pair in entries.windows(2) {
            if pair[0].language == pair[1].language && pair[0].text_id == pair[1].text_id {
                return Err(ArchiveError::DuplicateKey {
                    language: pair[0].language.to_string(),
                    text_id: pair[0].text_id.to_string(),
                });
            }
        }
        for entry in &entries {
            validate(entry)?;
        }
        Ok(entries)
    }

    fn set_entries(set: &RecordSet) -> Result<Vec<EntryRef<'_>>> {
        let entries: Vec<EntryRef<'_>> = set
            .iter()
            .map(|(key, text)| EntryRef {
                language: &key.language,
                text_id: &key.text_id,
                source: text.source,
                content: &text.content,
            })
            .collect();
        for entry in &entries {
            validate(entry)?;
        }
        Ok(entries)
    }

    /// Emits header, index and data regions for pre-validated, sorted
    /// entries.
    fn write_sorted<W: Write>(sink: &mut W, entries: &[EntryRef<'_>]) -> Result<()> {
        if entries.len() as u64 > MAX_RECORDS {
            return Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} records exceed the format limit of {}",
                    entries.len(),
                    MAX_RECORDS
                ),
            )));
        }

        let header = Header::for_record_count(entries.len() as u32);
        header.write_to(sink)?;

        // Index region: content offsets accumulate in entry order.
        let mut content_offset: u64 = 0;
        for entry in entries {
            let content_length = entry.content.len() as u32;
            write_index_entry(
                sink,
                entry.language,
                entry.text_id,
                entry.source,
                content_offset,
                content_length,
            )?;
            content_offset += u64::from(content_length);
        }

        // Data region: content bytes back to back, in index order.
        for entry in entries {
            sink.write_all(entry.content.as_bytes())?;
        }

        debug!(
            records = entries.len(),
            data_bytes = content_offset,
            "archive serialized"
        );
        Ok(())
    }

    fn write_file(path: &Path, entries: &[EntryRef<'_>]) -> Result<()> {
        // Temporary file next to the target for the atomic rename below.
        let tmp_path = path.with_extension("tmp");

        // Whichever step fails, the temp file must not outlive the call.
        if let Err(e) = Self::write_and_rename(&tmp_path, path, entries) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        // Fsync the parent directory so the rename survives a crash.
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        info!(path = %path.display(), records = entries.len(), "archive written");
        Ok(())
    }

    /// Fills `tmp_path`, syncs it, and renames it over `path`. The caller
    /// removes `tmp_path` if any step fails.
    fn write_and_rename(tmp_path: &Path, path: &Path, entries: &[EntryRef<'_>]) -> Result<()> {
        let raw_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp_path)?;
        let mut file = BufWriter::new(raw_file);
        Self::write_sorted(&mut file, entries)?;

        // Flush the BufWriter, then sync the underlying file.
        file.flush()?;
        file.into_inner().map_err(io::Error::from)?.sync_all()?;

        // Atomically move into place.
        rename(tmp_path, path)?;
        Ok(())
    }
}

fn validate(entry: &EntryRef<'_>) -> Result<()> {
    check_width(entry, "language", entry.language, LANG_BYTES)?;
    check_width(entry, "text_id", entry.text_id, TEXT_ID_BYTES)?;
    if entry.content.len() > u32::MAX as usize {
        return Err(validation(
            entry,
            "content",
            format!("{} bytes exceeds the u32 length field", entry.content.len()),
        ));
    }
    Ok(())
}

fn check_width(
    entry: &EntryRef<'_>,
    field: &'static str,
    value: &str,
    width: usize,
) -> Result<()> {
    if value.len() > width {
        return Err(validation(
            entry,
            field,
            format!("{} bytes of UTF-8 exceeds the {width}-byte field", value.len()),
        ));
    }
    // A trailing NUL is indistinguishable from field padding after decode.
    if value.ends_with('\0') {
        return Err(validation(
            entry,
            field,
            "value ends with a NUL byte".to_string(),
        ));
    }
    Ok(())
}

fn validation(entry: &EntryRef<'_>, field: &'static str, reason: String) -> ArchiveError {
    ArchiveError::Validation {
        field,
        language: entry.language.to_string(),
        text_id: entry.text_id.to_string(),
        reason,
    }
}
