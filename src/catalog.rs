//! Recitation catalog: entries, their time-coded segments, and per-source
//! groupings.
//!
//! A `Catalog` is built once at startup (either directly from memory or by
//! loading a directory of per-source JSON files) and is never mutated after
//! construction. Every source keeps its identifier next to its entries in a
//! `SourceCatalog` record.

use crate::constants::SOURCE_EXTENSION;
use crate::error::{LoungeError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One time-coded span of an entry's audio.
///
/// Stored on disk as a `[marker_a, marker_b, start_ms, end_ms]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i64, i64, f64, f64)", into = "(i64, i64, f64, f64)")]
pub struct Segment {
    pub marker_a: i64,
    pub marker_b: i64,
    pub start_ms: f64,
    pub end_ms: f64,
}

impl Segment {
    pub fn new(marker_a: i64, marker_b: i64, start_ms: f64, end_ms: f64) -> Self {
        Self {
            marker_a,
            marker_b,
            start_ms,
            end_ms,
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, time_ms: f64) -> bool {
        time_ms >= self.start_ms && time_ms <= self.end_ms
    }
}

impl From<(i64, i64, f64, f64)> for Segment {
    fn from((marker_a, marker_b, start_ms, end_ms): (i64, i64, f64, f64)) -> Self {
        Self::new(marker_a, marker_b, start_ms, end_ms)
    }
}

impl From<Segment> for (i64, i64, f64, f64) {
    fn from(s: Segment) -> Self {
        (s.marker_a, s.marker_b, s.start_ms, s.end_ms)
    }
}

/// Segments as they arrive from the catalog: either already structured, or a
/// JSON string that has to be parsed before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentData {
    Parsed(Vec<Segment>),
    Encoded(String),
}

impl Default for SegmentData {
    fn default() -> Self {
        SegmentData::Parsed(Vec::new())
    }
}

impl SegmentData {
    /// Parse the encoded form. Malformed input is reported as `SegmentParse`.
    pub fn parse(&self) -> Result<Cow<'_, [Segment]>> {
        match self {
            SegmentData::Parsed(segments) => Ok(Cow::Borrowed(segments.as_slice())),
            SegmentData::Encoded(raw) => serde_json::from_str::<Vec<Segment>>(raw)
                .map(Cow::Owned)
                .map_err(LoungeError::SegmentParse),
        }
    }
}

/// Identity of an entry within the playing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub collection_id: u32,
    pub local_position: u32,
}

impl fmt::Display for EntryKey {
    /// Formats as `"{collection_id}:{local_position}"`, the text table key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection_id, self.local_position)
    }
}

/// One playable recitation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "surah_number")]
    pub collection_id: u32,
    #[serde(rename = "ayah_number")]
    pub sequence_number: u32,
    /// Position inside the selected collection, starting at 1. Zero until the
    /// entry is picked into a selection; never read from or written to disk.
    #[serde(skip)]
    pub local_position: u32,
    #[serde(default)]
    pub segments: SegmentData,
    #[serde(rename = "audio_url")]
    pub media_uri: String,
}

impl Entry {
    pub fn new(
        collection_id: u32,
        sequence_number: u32,
        segments: SegmentData,
        media_uri: impl Into<String>,
    ) -> Self {
        Self {
            collection_id,
            sequence_number,
            local_position: 0,
            segments,
            media_uri: media_uri.into(),
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey {
            collection_id: self.collection_id,
            local_position: self.local_position,
        }
    }

    /// Segments in playable form. A malformed encoding is logged and treated
    /// as an entry without segments.
    pub fn segments(&self) -> Vec<Segment> {
        match self.segments.parse() {
            Ok(segments) => segments.into_owned(),
            Err(e) => {
                log::warn!(
                    "Entry {} (sequence {}): {e}; continuing without text",
                    self.key(),
                    self.sequence_number
                );
                Vec::new()
            }
        }
    }
}

/// All entries recited by a single source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCatalog {
    pub source: String,
    pub entries: Vec<Entry>,
}

impl SourceCatalog {
    pub fn new(source: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            source: source.into(),
            entries,
        }
    }

    /// Parse a source file holding either a list of entries or an object
    /// whose values are entries.
    pub fn from_json(source: impl Into<String>, json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SourceFile {
            List(Vec<Entry>),
            Map(BTreeMap<String, Entry>),
        }

        let entries = match serde_json::from_str::<SourceFile>(json)? {
            SourceFile::List(entries) => entries,
            SourceFile::Map(map) => map.into_values().collect(),
        };
        Ok(Self::new(source, entries))
    }
}

/// Immutable set of sources available to the selector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    sources: Vec<SourceCatalog>,
}

impl Catalog {
    pub fn new(sources: Vec<SourceCatalog>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[SourceCatalog] {
        &self.sources
    }

    pub fn source(&self, id: &str) -> Option<&SourceCatalog> {
        self.sources.iter().find(|s| s.source == id)
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.source.as_str())
    }

    pub fn entry_count(&self) -> usize {
        self.sources.iter().map(|s| s.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Load every `<source>.json` file in `dir`, one source per file.
    ///
    /// Files are parsed in parallel. A file that cannot be read or parsed is
    /// logged and skipped so one broken source does not take the rest down.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
            })
            .collect();
        paths.sort();

        let mut sources: Vec<SourceCatalog> = paths
            .par_iter()
            .filter_map(|path| match load_source_file(path) {
                Ok(source) => Some(source),
                Err(e) => {
                    log::error!("Skipping source file {}: {e}", path.display());
                    None
                }
            })
            .collect();
        sources.sort_by(|a, b| a.source.cmp(&b.source));

        for source in &sources {
            log::info!(
                "Loaded source {} with {} entries",
                source.source,
                source.entries.len()
            );
        }

        Ok(Self::new(sources))
    }
}

fn load_source_file(path: &Path) -> Result<SourceCatalog> {
    let source = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LoungeError::UnknownSource(path.display().to_string()))?
        .to_string();
    let json = fs::read_to_string(path)?;
    SourceCatalog::from_json(source, &json)
}
