//! Render graph adapter contract
//!
//! The session drives an external audio engine (source node, speed node,
//! output) through this trait. Implementations own the decoding and device
//! I/O; the session only schedules frame ranges, toggles transport and reads
//! the render clock.

use crate::error::Result;
use crate::types::AssetInfo;
use std::path::Path;

/// Callback fired when a scheduled range has finished rendering
///
/// May run on any thread. Fires at most once, and never if the range was
/// superseded by `stop()` or a newer `schedule_range()`.
pub type CompletionFn = Box<dyn FnOnce() + Send + 'static>;

/// Render clock reading for the currently scheduled range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderClock {
    /// Frames of the scheduled range rendered so far, in asset frames
    pub sample_time: u64,

    /// Asset sample rate the frames are counted in
    pub sample_rate: u32,
}

impl RenderClock {
    /// Seconds of asset time rendered since the range started
    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_time as f64 / f64::from(self.sample_rate)
    }
}

/// Audio engine the playback session renders through
///
/// All methods are called from the control thread and must not block on
/// the render path.
pub trait RenderGraph: Send {
    /// Open the shared asset and report its duration and sample rate
    fn open(&mut self, source: &Path) -> Result<AssetInfo>;

    /// Queue `frame_count` frames starting at `start_frame` for playback
    ///
    /// Replaces anything previously scheduled.
    fn schedule_range(
        &mut self,
        start_frame: u64,
        frame_count: u64,
        on_complete: CompletionFn,
    ) -> Result<()>;

    /// Start (or resume) rendering the scheduled range
    fn play(&mut self) -> Result<()>;

    /// Hold the render path without discarding the scheduled range
    fn pause(&mut self);

    /// Discard the scheduled range; its completion will not fire
    fn stop(&mut self);

    /// Apply a playback speed multiplier without interrupting output
    fn set_rate(&mut self, rate: f32);

    /// Current render clock, or `None` while the graph is not running
    fn render_clock(&self) -> Option<RenderClock>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_seconds() {
        let clock = RenderClock {
            sample_time: 66150,
            sample_rate: 44100,
        };
        assert_eq!(clock.seconds(), 1.5);

        let clock = RenderClock {
            sample_time: 10,
            sample_rate: 0,
        };
        assert_eq!(clock.seconds(), 0.0);
    }
}
