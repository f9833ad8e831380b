//! Playback scheduler
//!
//! Segment selection and range scheduling. Every accepted selection bumps
//! the session epoch; the completion closure handed to the render graph
//! carries the epoch it was scheduled under, and a completion whose epoch no
//! longer matches is discarded. Completions never touch session state from
//! the render thread: they are sent as [`ControlMessage`]s and applied by
//! [`PlaybackSession::handle_message`] on the control thread.

use crate::error::PlaybackError;
use crate::events::PlaybackEvent;
use crate::render::CompletionFn;
use crate::scrub::ScrubState;
use crate::session::PlaybackSession;
use tracing::{debug, error, trace, warn};

/// Messages marshalled from render threads onto the control thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// A scheduled range finished rendering
    RangeCompleted {
        /// Epoch the range was scheduled under
        epoch: u64,
        /// Segment index the range belonged to
        index: usize,
    },
}

/// Frame range for one scheduling request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRange {
    pub start_frame: u64,
    pub frame_count: u64,
}

impl PlaybackSession {
    /// Play segment `index`, starting at `from_time` or the segment start
    ///
    /// Dropped (not queued) while another scheduling operation is in
    /// progress. Completions only ever arrive as queued messages and this
    /// takes `&mut self`, so on the control thread the guard never trips; it
    /// keeps the adapter calls of one schedule from interleaving with
    /// another's if that ever changes. Out-of-range indices and calls before an asset is loaded
    /// are ignored. `from_time` is clamped to the segment bounds.
    pub fn select_segment(&mut self, index: usize, from_time: Option<f64>) {
        if self.scheduling {
            debug!("Scheduling in progress, dropping selection of {}", index);
            return;
        }
        let Some(asset) = self.asset else {
            warn!(
                "Cannot select segment {}: {}",
                index,
                PlaybackError::AssetUnavailable("no asset loaded".to_string())
            );
            return;
        };
        let Some(segment) = self.segments.get(index) else {
            debug!("{}", PlaybackError::IndexOutOfRange(index));
            return;
        };

        let from = from_time.map_or(segment.start_offset(), |t| segment.clamp(t));
        let end = segment.end_offset();
        let range = ScheduledRange {
            start_frame: asset.frame_at(from),
            frame_count: asset.frame_at(end).saturating_sub(asset.frame_at(from)),
        };

        self.scheduling = true;
        self.schedule(index, from, range);
        self.scheduling = false;
    }

    fn schedule(&mut self, index: usize, from: f64, range: ScheduledRange) {
        let previous_index = self.active_index;

        self.halt_render_path();
        self.epoch += 1;
        self.active_index = index;
        self.position = from;
        self.scrub = ScrubState::Committed;

        let epoch = self.epoch;
        let messages = self.messages_tx.clone();
        let on_complete: CompletionFn = Box::new(move || {
            // Control thread may already be gone during teardown
            let _ = messages.send(ControlMessage::RangeCompleted { epoch, index });
        });

        debug!(
            "Scheduling segment {} from {:.3}s ({} frames at {}, epoch {})",
            index, from, range.frame_count, range.start_frame, epoch
        );

        let started = self
            .graph
            .schedule_range(range.start_frame, range.frame_count, on_complete)
            .and_then(|()| {
                self.graph.set_rate(self.rate);
                self.graph.play()
            });

        if let Err(e) = started {
            error!("Failed to start segment {}: {}", index, e);
            self.graph.stop();
            self.emit(PlaybackEvent::Error {
                message: e.to_string(),
            });
            self.emit_state_changed();
            self.publish_now_playing();
            return;
        }

        self.is_playing = true;
        self.tracker.start(from);

        if index != previous_index {
            let title = self.segments[index].title().to_string();
            self.emit(PlaybackEvent::SegmentChanged { index, title });
        }
        self.emit_state_changed();
        self.publish_now_playing();
    }

    /// Apply a message marshalled from a render thread
    pub fn handle_message(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::RangeCompleted { epoch, index } => self.complete_range(epoch, index),
        }
    }

    fn complete_range(&mut self, epoch: u64, index: usize) {
        if epoch != self.epoch {
            trace!(
                "Discarding stale completion for segment {} (epoch {}, current {})",
                index,
                epoch,
                self.epoch
            );
            return;
        }
        let Some(end) = self.segments.get(index).map(|s| s.end_offset()) else {
            return;
        };

        self.tracker.stop();
        self.is_playing = false;
        self.position = end;

        let next = index + 1;
        if next < self.segments.len() {
            debug!("Segment {} finished, advancing to {}", index, next);
            self.select_segment(next, None);
        } else {
            debug!("Segment {} finished, end of queue", index);
            self.emit_state_changed();
            self.publish_now_playing();
            self.emit(PlaybackEvent::QueueFinished);
        }
    }
}
