//! Verso - Virtual-Segment Playback
//!
//! Plays one large audio asset as an ordered list of independently
//! addressable segments (one per chapter), each a `[start, end)` range of
//! the shared asset.
//!
//! This crate provides:
//! - Segment catalog building from a chapter-offset table
//! - Reading plan (day number to chapter buckets)
//! - Segment scheduling with epoch-guarded completions and auto-advance
//! - Render-clock position tracking, clamped to segment bounds
//! - Scrub preview vs. committed seek
//! - Gapless playback rate changes
//! - A control-thread service with a command/event handle
//!
//! # Architecture
//!
//! `verso-playback` is platform-agnostic. Audio decoding and device output
//! sit behind the [`RenderGraph`] trait (see `verso-audio-desktop`). All
//! session state is owned by one control thread; render completions reach
//! it as messages, and a completion scheduled under an older epoch is
//! discarded.
//!
//! # Example: Building Segments
//!
//! ```rust
//! use verso_playback::{build_segments, ChapterOffset, ReadingBucket};
//!
//! let table = vec![
//!     ChapterOffset { id: 1, name: "Genesis 1".into(), start_offset: 0.0, end_offset: 300.0 },
//!     ChapterOffset { id: 2, name: "Genesis 2".into(), start_offset: 300.0, end_offset: 540.0 },
//! ];
//! let segments = build_segments(&[ReadingBucket::new("Genesis", 1, 2)], &table);
//! assert_eq!(segments.len(), 2);
//! ```
//!
//! # Example: Platform Integration
//!
//! ```rust,no_run
//! use verso_playback::{
//!     AssetInfo, CompletionFn, PlaybackConfig, PlaybackSession, RenderClock, RenderGraph, Result,
//! };
//! use std::path::Path;
//!
//! // Implement RenderGraph for your platform
//! struct MyEngine;
//!
//! impl RenderGraph for MyEngine {
//!     fn open(&mut self, _source: &Path) -> Result<AssetInfo> {
//!         Ok(AssetInfo { duration: 3600.0, sample_rate: 44100 })
//!     }
//!     fn schedule_range(&mut self, _start: u64, _frames: u64, _done: CompletionFn) -> Result<()> {
//!         Ok(())
//!     }
//!     fn play(&mut self) -> Result<()> { Ok(()) }
//!     fn pause(&mut self) {}
//!     fn stop(&mut self) {}
//!     fn set_rate(&mut self, _rate: f32) {}
//!     fn render_clock(&self) -> Option<RenderClock> { None }
//! }
//!
//! let mut session = PlaybackSession::new(PlaybackConfig::default(), Box::new(MyEngine));
//! session.load_asset(Path::new("/audio/bible.mp3"))?;
//! session.select_segment(0, None);
//! # Ok::<(), verso_playback::PlaybackError>(())
//! ```

mod catalog;
mod error;
mod events;
mod plan;
mod rate;
mod render;
mod scheduler;
mod scrub;
mod service;
mod session;
mod tracker;
pub mod types;

// Public exports
pub use catalog::{
    build_segments, load_chapter_table, parse_chapter_table, total_duration, ChapterOffset,
    ReadingBucket,
};
pub use error::{PlaybackError, Result};
pub use events::{NowPlayingInfo, PlaybackEvent};
pub use plan::{BookItem, BookList, DailyReading, ReadingPlan};
pub use rate::validate_rate;
pub use render::{CompletionFn, RenderClock, RenderGraph};
pub use scheduler::{ControlMessage, ScheduledRange};
pub use scrub::ScrubState;
pub use service::{Command, PlayerHandle, PlayerService};
pub use session::PlaybackSession;
pub use tracker::{PositionTracker, TrackerReading};
pub use types::{AssetInfo, PlaybackConfig, SegmentId, SessionSnapshot, VirtualSegment};
