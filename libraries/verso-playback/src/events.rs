//! Playback Events
//!
//! Event-based communication for presentation layers. Events are queued by
//! the session and drained by the control thread:
//! - Now-playing updates (every tracker tick and control-state change)
//! - Segment changes (selection, auto-advance)
//! - Play/pause state changes
//! - Segment list swaps
//! - End of queue

use serde::{Deserialize, Serialize};

/// System-level media info for the active segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    /// Title of the active segment
    pub title: String,

    /// Seconds elapsed since the segment start
    pub elapsed: f64,

    /// Segment duration in seconds
    pub duration: f64,

    /// Playback rate, or 0 while paused
    pub rate: f32,
}

/// Events emitted by the playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Now-playing metadata changed
    NowPlaying(NowPlayingInfo),

    /// Active segment changed
    SegmentChanged {
        /// Index of the new active segment
        index: usize,
        /// Title of the new active segment
        title: String,
    },

    /// Playing state toggled
    StateChanged {
        /// Whether the render path is playing
        is_playing: bool,
    },

    /// Segment list was replaced
    SegmentsReplaced {
        /// Number of segments in the new list
        count: usize,
        /// Sum of segment durations in seconds
        total_duration: f64,
    },

    /// Last segment finished and nothing follows it
    QueueFinished,

    /// A control call failed on the render path
    Error {
        /// Error message
        message: String,
    },
}

impl PlaybackEvent {
    /// Now-playing payload, if this is a now-playing update
    pub fn now_playing(&self) -> Option<&NowPlayingInfo> {
        match self {
            Self::NowPlaying(info) => Some(info),
            _ => None,
        }
    }
}
