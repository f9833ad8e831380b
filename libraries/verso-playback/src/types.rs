//! Core types for segment playback

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a virtual segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(Uuid);

impl SegmentId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named sub-range of the shared audio asset
///
/// Offsets are absolute seconds into the asset. Segments are immutable once
/// constructed; `new` refuses negative or inverted bounds so every segment in
/// a session satisfies `0 <= start_offset < end_offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualSegment {
    id: SegmentId,
    title: String,
    start_offset: f64,
    end_offset: f64,
}

impl VirtualSegment {
    /// Create a segment covering `[start_offset, end_offset)`
    pub fn new(title: impl Into<String>, start_offset: f64, end_offset: f64) -> Result<Self> {
        let valid = start_offset.is_finite()
            && end_offset.is_finite()
            && start_offset >= 0.0
            && end_offset > start_offset;
        if !valid {
            return Err(PlaybackError::InvalidSegment {
                start: start_offset,
                end: end_offset,
            });
        }

        Ok(Self {
            id: SegmentId::new(),
            title: title.into(),
            start_offset,
            end_offset,
        })
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start_offset(&self) -> f64 {
        self.start_offset
    }

    pub fn end_offset(&self) -> f64 {
        self.end_offset
    }

    /// Length of the segment in seconds
    pub fn duration(&self) -> f64 {
        self.end_offset - self.start_offset
    }

    /// Clamp an absolute asset time into this segment's bounds
    ///
    /// NaN collapses to the segment start.
    pub fn clamp(&self, time: f64) -> f64 {
        if time.is_nan() {
            return self.start_offset;
        }
        time.clamp(self.start_offset, self.end_offset)
    }

    /// Check whether an absolute asset time lies within the segment
    pub fn contains(&self, time: f64) -> bool {
        (self.start_offset..=self.end_offset).contains(&time)
    }
}

/// Properties of the loaded audio asset, as reported by the render graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Total asset length in seconds
    pub duration: f64,

    /// Native sample rate of the asset (frames per second)
    pub sample_rate: u32,
}

impl AssetInfo {
    /// Convert an absolute asset time to a frame index
    pub fn frame_at(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * f64::from(self.sample_rate)).round() as u64
    }
}

/// Configuration for the playback session and its control thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Position tracker poll interval (default: 50ms)
    pub tick_interval_ms: u64,

    /// Skip forward/backward distance in seconds (default: 15)
    pub skip_interval_secs: f64,

    /// Rate applied when the session starts (default: 1.0)
    pub default_rate: f32,

    /// Rates visited by `cycle_rate` (default: 1.0, 1.1, 1.2, 1.5)
    pub rate_presets: Vec<f32>,

    /// Capacity of the outbound event channel (default: 256)
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            skip_interval_secs: 15.0,
            default_rate: 1.0,
            rate_presets: vec![1.0, 1.1, 1.2, 1.5],
            event_capacity: 256,
        }
    }
}

impl PlaybackConfig {
    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.default_rate.is_finite() && self.default_rate > 0.0) {
            return Err(PlaybackError::InvalidRate(self.default_rate));
        }
        if self.rate_presets.is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "rate_presets must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .rate_presets
            .iter()
            .find(|r| !(r.is_finite() && **r > 0.0))
        {
            return Err(PlaybackError::InvalidRate(*bad));
        }
        Ok(())
    }
}

/// Point-in-time view of the session, for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current segment list in playback order
    pub segments: Vec<VirtualSegment>,

    /// Index of the active segment (meaningless when `segments` is empty)
    pub active_index: usize,

    /// Absolute asset position in seconds
    pub position: f64,

    /// Position relative to the active segment's start
    pub elapsed: f64,

    /// Active segment duration
    pub duration: f64,

    pub is_playing: bool,
    pub is_scrubbing: bool,
    pub rate: f32,
    pub epoch: u64,

    /// Sum of all segment durations in the current list
    pub total_duration: f64,

    /// Duration of the loaded asset, if any
    pub asset_duration: Option<f64>,
}
