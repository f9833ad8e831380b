//! Playback rate control
//!
//! Rate changes go straight to the render graph's speed node and never
//! reschedule, so they are gapless. A rate set while paused is stored and
//! applied by the next scheduling request.

use crate::error::{PlaybackError, Result};
use crate::session::PlaybackSession;
use tracing::debug;

/// Check that a rate multiplier is usable
pub fn validate_rate(rate: f32) -> Result<f32> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(PlaybackError::InvalidRate(rate))
    }
}

impl PlaybackSession {
    /// Set the playback speed multiplier
    pub fn set_rate(&mut self, rate: f32) -> Result<()> {
        let rate = validate_rate(rate)?;
        self.rate = rate;

        if self.is_playing {
            self.graph.set_rate(rate);
        } else {
            debug!("Rate {} stored, applied on next play", rate);
        }

        self.publish_now_playing();
        Ok(())
    }

    /// Advance to the next configured rate preset, wrapping around
    ///
    /// A rate that is not one of the presets moves to the first preset.
    pub fn cycle_rate(&mut self) -> Result<f32> {
        let presets = &self.config.rate_presets;
        let next = presets
            .iter()
            .position(|r| (*r - self.rate).abs() < f32::EPSILON)
            .map_or(0, |i| (i + 1) % presets.len());

        let rate = presets
            .get(next)
            .copied()
            .ok_or(PlaybackError::InvalidRate(self.rate))?;
        self.set_rate(rate)?;
        Ok(rate)
    }
}
