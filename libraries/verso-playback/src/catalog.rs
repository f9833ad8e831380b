//! Segment catalog
//!
//! Turns a day's reading buckets and the chapter-offset table into the
//! ordered list of virtual segments the scheduler plays.

use crate::error::Result;
use crate::types::VirtualSegment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One row of the chapter-offset table (`chapters.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterOffset {
    pub id: u32,

    /// Display name, e.g. "Genesis 3"
    pub name: String,

    /// Start offset into the asset, in seconds
    #[serde(rename = "start")]
    pub start_offset: f64,

    /// End offset into the asset, in seconds
    #[serde(rename = "end")]
    pub end_offset: f64,
}

impl ChapterOffset {
    /// Split the name at its last space into (book name, chapter number)
    ///
    /// Returns `None` when the trailing token is not a chapter number.
    pub fn book_and_chapter(&self) -> Option<(&str, u32)> {
        let (book, chapter) = self.name.trim().rsplit_once(' ')?;
        let chapter = chapter.parse().ok()?;
        Some((book.trim_end(), chapter))
    }
}

/// A contiguous chapter range of one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingBucket {
    pub book_name: String,
    pub start_chapter: u32,
    pub end_chapter: u32,
}

impl ReadingBucket {
    pub fn new(book_name: impl Into<String>, start_chapter: u32, end_chapter: u32) -> Self {
        Self {
            book_name: book_name.into(),
            start_chapter,
            end_chapter,
        }
    }

    fn matches(&self, entry: &ChapterOffset) -> bool {
        entry
            .book_and_chapter()
            .is_some_and(|(book, chapter)| {
                book == self.book_name && (self.start_chapter..=self.end_chapter).contains(&chapter)
            })
    }
}

/// Parse a chapter-offset table from JSON text
pub fn parse_chapter_table(json: &str) -> Result<Vec<ChapterOffset>> {
    Ok(serde_json::from_str(json)?)
}

/// Load a chapter-offset table from a JSON file
pub fn load_chapter_table(path: impl AsRef<Path>) -> Result<Vec<ChapterOffset>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let table = parse_chapter_table(&text)?;
    debug!(
        "Loaded {} chapter offsets from {}",
        table.len(),
        path.as_ref().display()
    );
    Ok(table)
}

/// Build the ordered segment list for a set of buckets
///
/// Buckets are visited in order; within a bucket, matching table entries keep
/// their table order. No matches yields an empty list. Entries with unusable
/// offsets are skipped.
pub fn build_segments(buckets: &[ReadingBucket], table: &[ChapterOffset]) -> Vec<VirtualSegment> {
    let mut segments = Vec::new();

    for bucket in buckets {
        for entry in table.iter().filter(|entry| bucket.matches(entry)) {
            match VirtualSegment::new(entry.name.clone(), entry.start_offset, entry.end_offset) {
                Ok(segment) => segments.push(segment),
                Err(e) => warn!("Skipping chapter {} ({}): {}", entry.id, entry.name, e),
            }
        }
    }

    segments
}

/// Sum of segment durations in seconds
pub fn total_duration(segments: &[VirtualSegment]) -> f64 {
    segments.iter().map(VirtualSegment::duration).sum()
}
