use std::io;

use record::Source;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors raised by the archive writer and reader.
///
/// Every variant is terminal for the operation that raised it; nothing here
/// retries or repairs. Callers decide how each variant maps onto their own
/// surface (exit codes in the CLI, responses in a serving layer).
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A record failed build-time validation. No output is written.
    #[error("invalid {field} in record ({language}, {text_id}): {reason}")]
    Validation {
        /// The rejected field: `"language"`, `"text_id"` or `"content"`.
        field: &'static str,
        language: String,
        text_id: String,
        reason: String,
    },

    /// Two build inputs share one composite key. No output is written.
    #[error("duplicate key ({language}, {text_id}) in build input")]
    DuplicateKey { language: String, text_id: String },

    /// The archive violates the on-disk format: inconsistent header
    /// arithmetic, a truncated index or data region, invalid UTF-8, or an
    /// unknown source tag.
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    /// No index entry matches the requested composite key.
    #[error("not found: language {language:?}, text id {text_id:?}")]
    NotFound { language: String, text_id: String },

    /// The key matched but the stored source tag differs from the caller's
    /// filter.
    #[error("source mismatch for ({language}, {text_id}): expected {expected}, actual {actual}")]
    SourceMismatch {
        language: String,
        text_id: String,
        expected: Source,
        actual: Source,
    },

    /// An underlying I/O failure, as opposed to a well-read but invalid
    /// archive.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
