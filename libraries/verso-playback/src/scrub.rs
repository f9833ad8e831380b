//! Scrub and seek control
//!
//! While scrubbing, `position` holds a preview value and the render path is
//! left untouched; the tracker does not write. Committing a scrub, and every
//! non-scrub seek, reschedules the active segment from the new time because
//! the render path cannot reposition in place.

use crate::session::PlaybackSession;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether `position` reflects real playback or a pending preview
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ScrubState {
    /// Position reflects the render path
    #[default]
    Committed,

    /// Position is a user-held preview not yet applied
    Scrubbing {
        /// Position when the scrub began, restored on cancel
        origin: f64,
    },
}

impl ScrubState {
    pub fn is_scrubbing(self) -> bool {
        matches!(self, Self::Scrubbing { .. })
    }
}

impl PlaybackSession {
    /// Enter scrubbing with a preview at `to_time`
    pub fn begin_scrub(&mut self, to_time: f64) {
        if self.active_segment().is_none() {
            debug!("begin_scrub() with no segments loaded");
            return;
        }
        if !self.scrub.is_scrubbing() {
            self.scrub = ScrubState::Scrubbing {
                origin: self.position,
            };
        }
        self.set_preview(to_time);
    }

    /// Move the scrub preview
    ///
    /// Never touches the render path. Called while committed, this enters
    /// scrubbing first.
    pub fn update_scrub(&mut self, to_time: f64) {
        if !self.scrub.is_scrubbing() {
            self.begin_scrub(to_time);
            return;
        }
        self.set_preview(to_time);
    }

    /// Leave scrubbing and reschedule the active segment from `to_time`
    pub fn commit_scrub(&mut self, to_time: f64) {
        let Some(segment) = self.active_segment() else {
            self.scrub = ScrubState::Committed;
            return;
        };
        let target = segment.clamp(to_time);

        self.scrub = ScrubState::Committed;
        self.select_segment(self.active_index, Some(target));
    }

    /// Abandon a scrub without touching the render path
    ///
    /// The position returns to where the scrub began, then follows the
    /// render clock again if playing.
    pub fn cancel_scrub(&mut self) {
        let ScrubState::Scrubbing { origin } = self.scrub else {
            return;
        };
        self.scrub = ScrubState::Committed;
        self.position = origin;
        self.poll_position();
        self.publish_now_playing();
    }

    /// Seek to an absolute asset time within the active segment
    pub fn seek_to(&mut self, time: f64) {
        let Some(segment) = self.active_segment() else {
            debug!("seek_to() with no segments loaded");
            return;
        };
        let target = segment.clamp(time);
        self.select_segment(self.active_index, Some(target));
    }

    /// Seek relative to the current position, clamped to the active segment
    pub fn seek_by(&mut self, delta: f64) {
        self.seek_to(self.position + delta);
    }

    /// Skip forward by the configured interval
    pub fn skip_forward(&mut self) {
        self.seek_by(self.config.skip_interval_secs);
    }

    /// Skip backward by the configured interval
    pub fn skip_backward(&mut self) {
        self.seek_by(-self.config.skip_interval_secs);
    }

    fn set_preview(&mut self, to_time: f64) {
        if let Some(segment) = self.active_segment() {
            self.position = segment.clamp(to_time);
            self.publish_now_playing();
        }
    }
}
