//! Position tracker
//!
//! Converts the render clock into an absolute asset position for the active
//! segment. The control thread calls [`PlaybackSession::tick`] on a fixed
//! cadence while playing.

use crate::error::PlaybackError;
use crate::render::RenderClock;
use crate::session::PlaybackSession;
use crate::types::VirtualSegment;
use tracing::trace;

/// Result of one tracker poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerReading {
    /// Tracker not running, or clock not ready; nothing was written
    Skipped,

    /// Clamped position inside the segment
    Position(f64),

    /// Clamped position reached the segment end
    ReachedEnd(f64),
}

/// Render-clock to segment-position converter
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    running: bool,

    /// Absolute asset time the current range was scheduled from
    anchor: f64,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a range scheduled from `anchor`
    pub fn start(&mut self, anchor: f64) {
        self.running = true;
        self.anchor = anchor;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn anchor(&self) -> f64 {
        self.anchor
    }

    /// Convert a clock reading into a clamped segment position
    pub fn sample(&self, clock: Option<RenderClock>, segment: &VirtualSegment) -> TrackerReading {
        if !self.running {
            return TrackerReading::Skipped;
        }
        let Some(clock) = clock else {
            return TrackerReading::Skipped;
        };

        let position = segment.clamp(self.anchor + clock.seconds());
        if position >= segment.end_offset() {
            TrackerReading::ReachedEnd(position)
        } else {
            TrackerReading::Position(position)
        }
    }
}

impl PlaybackSession {
    /// One tracker tick
    ///
    /// Runs only while playing and not scrubbing. When the clock reaches the
    /// segment end the tracker stops and the session reports not-playing;
    /// advancing to the next segment is left to the range completion.
    pub fn tick(&mut self) {
        if !self.is_playing || self.scrub.is_scrubbing() || !self.tracker.is_running() {
            return;
        }

        match self.poll_position() {
            TrackerReading::Skipped => {
                trace!("{}, skipping tick", PlaybackError::ClockUnavailable);
            }
            TrackerReading::Position(_) => {
                self.publish_now_playing();
            }
            TrackerReading::ReachedEnd(_) => {
                self.tracker.stop();
                self.is_playing = false;
                self.emit_state_changed();
                self.publish_now_playing();
            }
        }
    }

    /// Read the render clock and write the clamped position
    pub(crate) fn poll_position(&mut self) -> TrackerReading {
        if self.scrub.is_scrubbing() {
            return TrackerReading::Skipped;
        }
        let Some(segment) = self.segments.get(self.active_index) else {
            return TrackerReading::Skipped;
        };

        let reading = self.tracker.sample(self.graph.render_clock(), segment);
        match reading {
            TrackerReading::Position(p) | TrackerReading::ReachedEnd(p) => self.position = p,
            TrackerReading::Skipped => {}
        }
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(seconds: f64) -> Option<RenderClock> {
        Some(RenderClock {
            sample_time: (seconds * 1000.0) as u64,
            sample_rate: 1000,
        })
    }

    #[test]
    fn stopped_tracker_skips() {
        let segment = VirtualSegment::new("A", 0.0, 10.0).unwrap();
        let tracker = PositionTracker::new();
        assert_eq!(tracker.sample(clock(1.0), &segment), TrackerReading::Skipped);
    }

    #[test]
    fn missing_clock_skips() {
        let segment = VirtualSegment::new("A", 0.0, 10.0).unwrap();
        let mut tracker = PositionTracker::new();
        tracker.start(0.0);
        assert_eq!(tracker.sample(None, &segment), TrackerReading::Skipped);
    }

    #[test]
    fn offsets_clock_by_anchor() {
        let segment = VirtualSegment::new("B", 10.0, 25.0).unwrap();
        let mut tracker = PositionTracker::new();
        tracker.start(12.0);
        assert_eq!(
            tracker.sample(clock(3.0), &segment),
            TrackerReading::Position(15.0)
        );
    }

    #[test]
    fn clamps_and_reports_end() {
        let segment = VirtualSegment::new("B", 10.0, 25.0).unwrap();
        let mut tracker = PositionTracker::new();
        tracker.start(20.0);
        assert_eq!(
            tracker.sample(clock(9.0), &segment),
            TrackerReading::ReachedEnd(25.0)
        );
    }
}
