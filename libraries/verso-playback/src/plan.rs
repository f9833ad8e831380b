//! Reading plan
//!
//! Maps a plan day to one chapter per book list. Each list cycles through
//! its books independently, so lists of different lengths drift apart over
//! time.

use crate::catalog::ReadingBucket;
use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A book and its chapter count
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookItem {
    pub name: String,
    pub chapters: u32,
}

/// One list of books read in sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookList {
    pub id: u32,
    pub books: Vec<BookItem>,
}

impl BookList {
    /// Total chapters across every book in the list
    pub fn chapter_count(&self) -> u32 {
        self.books.iter().map(|b| b.chapters).sum()
    }

    /// Position of `day` within this list's cycle, in `1..=chapter_count`
    ///
    /// `None` for a list without chapters.
    fn cycle_position(&self, day: u32) -> Option<u32> {
        let total = self.chapter_count();
        match day.checked_rem(total)? {
            0 => Some(total),
            n => Some(n),
        }
    }

    /// Resolve a cycle position to (book, chapter within book)
    fn locate(&self, position: u32) -> Option<(&BookItem, u32)> {
        let mut preceding = 0;
        for book in &self.books {
            if position <= preceding + book.chapters {
                return Some((book, position - preceding));
            }
            preceding += book.chapters;
        }
        None
    }
}

/// A day's reading for one list, with cycle progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReading {
    pub list_id: u32,
    pub bucket: ReadingBucket,

    /// Chapter number within the list's whole cycle
    pub progress: u32,

    /// Chapters in the list's cycle
    pub total: u32,
}

impl DailyReading {
    /// Display label, e.g. "Genesis 3"
    pub fn label(&self) -> String {
        format!("{} {}", self.bucket.book_name, self.bucket.start_chapter)
    }
}

/// The full reading plan (`plan.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BookList>", into = "Vec<BookList>")]
pub struct ReadingPlan {
    lists: Vec<BookList>,
}

impl ReadingPlan {
    /// Build a plan, rejecting lists without chapters
    pub fn new(lists: Vec<BookList>) -> Result<Self> {
        if let Some(empty) = lists.iter().find(|l| l.chapter_count() == 0) {
            return Err(PlaybackError::Catalog(format!(
                "Book list {} has no chapters",
                empty.id
            )));
        }
        Ok(Self { lists })
    }

    /// Parse a plan from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let lists: Vec<BookList> = serde_json::from_str(json)?;
        Self::new(lists)
    }

    /// Load a plan from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn lists(&self) -> &[BookList] {
        &self.lists
    }

    /// Readings for `day`, one per list in list order
    ///
    /// Day 0 is treated as day 1.
    pub fn readings_for_day(&self, day: u32) -> Vec<DailyReading> {
        let day = day.max(1);

        self.lists
            .iter()
            .filter_map(|list| {
                let position = list.cycle_position(day)?;
                let (book, chapter) = list.locate(position)?;
                Some(DailyReading {
                    list_id: list.id,
                    bucket: ReadingBucket::new(book.name.clone(), chapter, chapter),
                    progress: position,
                    total: list.chapter_count(),
                })
            })
            .collect()
    }

    /// Buckets for `day`, ready for [`crate::build_segments`]
    pub fn buckets_for_day(&self, day: u32) -> Vec<ReadingBucket> {
        self.readings_for_day(day)
            .into_iter()
            .map(|r| r.bucket)
            .collect()
    }
}

impl TryFrom<Vec<BookList>> for ReadingPlan {
    type Error = PlaybackError;

    fn try_from(lists: Vec<BookList>) -> Result<Self> {
        Self::new(lists)
    }
}

impl From<ReadingPlan> for Vec<BookList> {
    fn from(plan: ReadingPlan) -> Self {
        plan.lists
    }
}
