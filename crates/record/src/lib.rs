//! # Record — snippet data model
//!
//! The logical model shared by the archive writer and the CLI: a [`Record`]
//! is one multilingual text snippet, addressed by its composite
//! `(language, text_id)` key and tagged with the [`Source`] it came from.
//!
//! [`RecordSet`] is the staging collection used to accumulate records before
//! an archive build. It keeps entries ordered by composite key and holds at
//! most one entry per key; `insert` hands back any displaced record so a
//! loader can treat a key collision as an error instead of silently keeping
//! the last write.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Provenance of a snippet: ingested as text or transcribed from audio.
///
/// Exactly two tags exist on the wire (`"TEXT"` and `"AUDIO"`); the enum
/// makes any other tag unrepresentable in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Text,
    Audio,
}

impl Source {
    /// The exact tag stored in the archive index.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Text => "TEXT",
            Source::Audio => "AUDIO",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a source tag that is neither `TEXT` nor `AUDIO`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source tag {found:?} (expected TEXT or AUDIO)")]
pub struct ParseSourceError {
    /// The rejected input.
    pub found: String,
}

impl FromStr for Source {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEXT" => Ok(Source::Text),
            "AUDIO" => Ok(Source::Audio),
            other => Err(ParseSourceError {
                found: other.to_string(),
            }),
        }
    }
}

/// Composite key addressing one snippet: `(language, text_id)`.
///
/// The derived `Ord` compares `language` first, then `text_id`. String
/// comparison in Rust is byte-wise over the UTF-8 encoding, which is the
/// same order the on-disk index uses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Language code such as `"en"` or `"zh-Hans"`.
    pub language: String,
    /// Identifier within the language.
    pub text_id: String,
}

/// One logical snippet before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Language code; its UTF-8 encoding must fit in 8 bytes.
    pub language: String,
    /// Identifier within the language; its UTF-8 encoding must fit in
    /// 16 bytes.
    pub text_id: String,
    /// Where the snippet came from.
    pub source: Source,
    /// The snippet text, any length.
    pub content: String,
}

impl Record {
    pub fn new(
        language: impl Into<String>,
        text_id: impl Into<String>,
        source: Source,
        content: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            text_id: text_id.into(),
            source,
            content: content.into(),
        }
    }

    /// The record's composite key.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey {
            language: self.language.clone(),
            text_id: self.text_id.clone(),
        }
    }
}

/// Per-key payload held by [`RecordSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub source: Source,
    pub content: String,
}

/// Ordered, key-unique staging collection for archive builds.
#[derive(Debug, Default)]
pub struct RecordSet {
    map: BTreeMap<RecordKey, TextEntry>,
    content_bytes: usize,
}

impl RecordSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            content_bytes: 0,
        }
    }

    /// Inserts a record, returning the record previously stored under the
    /// same composite key if there was one.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        let Record {
            language,
            text_id,
            source,
            content,
        } = record;
        let key = RecordKey { language, text_id };
        self.content_bytes += content.len();
        match self.map.insert(key.clone(), TextEntry { source, content }) {
            Some(old) => {
                self.content_bytes = self.content_bytes.saturating_sub(old.content.len());
                Some(Record {
                    language: key.language,
                    text_id: key.text_id,
                    source: old.source,
                    content: old.content,
                })
            }
            None => None,
        }
    }

    /// Looks up the entry stored under `(language, text_id)`.
    #[must_use]
    pub fn get(&self, language: &str, text_id: &str) -> Option<&TextEntry> {
        let key = RecordKey {
            language: language.to_string(),
            text_id: text_id.to_string(),
        };
        self.map.get(&key)
    }

    /// Iterates entries in ascending composite-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &TextEntry)> {
        self.map.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Total content payload across all entries, in bytes.
    #[must_use]
    pub fn content_bytes(&self) -> usize {
        self.content_bytes
    }
}

#[cfg(test)]
mod tests;
