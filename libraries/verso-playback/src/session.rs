//! Playback session - the single owner of mutable playback state
//!
//! Scheduling lives in `scheduler.rs`, position polling in `tracker.rs`,
//! scrubbing and seeking in `scrub.rs` and speed control in `rate.rs`; each
//! adds an `impl PlaybackSession` block over the state defined here.

use crate::{
    catalog,
    error::{PlaybackError, Result},
    events::{NowPlayingInfo, PlaybackEvent},
    render::RenderGraph,
    scheduler::ControlMessage,
    scrub::ScrubState,
    tracker::PositionTracker,
    types::{AssetInfo, PlaybackConfig, SessionSnapshot, VirtualSegment},
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::Path;
use tracing::{debug, info};

/// Virtual-segment playback session
///
/// Owns the render graph exclusively. Every method runs on the control
/// thread; the only state that crosses threads is the completion message
/// channel, which render callbacks write to and [`process_pending`] drains.
///
/// Invariant: while `segments` is non-empty, `active_index < segments.len()`
/// and `position` lies within the active segment's bounds.
///
/// [`process_pending`]: PlaybackSession::process_pending
pub struct PlaybackSession {
    pub(crate) config: PlaybackConfig,
    pub(crate) graph: Box<dyn RenderGraph>,
    pub(crate) asset: Option<AssetInfo>,

    // Segment list
    pub(crate) segments: Vec<VirtualSegment>,
    pub(crate) total_duration: f64,
    pub(crate) active_index: usize,

    // Transport
    pub(crate) position: f64,
    pub(crate) is_playing: bool,
    pub(crate) rate: f32,
    pub(crate) scrub: ScrubState,

    // Scheduling
    pub(crate) epoch: u64,
    pub(crate) scheduling: bool,
    pub(crate) tracker: PositionTracker,
    pub(crate) messages_tx: Sender<ControlMessage>,
    messages_rx: Receiver<ControlMessage>,

    // Event queue for presentation layers
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackSession {
    /// Create a session over a render graph
    pub fn new(config: PlaybackConfig, graph: Box<dyn RenderGraph>) -> Self {
        let (messages_tx, messages_rx) = unbounded();

        Self {
            rate: config.default_rate,
            config,
            graph,
            asset: None,
            segments: Vec::new(),
            total_duration: 0.0,
            active_index: 0,
            position: 0.0,
            is_playing: false,
            scrub: ScrubState::Committed,
            epoch: 0,
            scheduling: false,
            tracker: PositionTracker::new(),
            messages_tx,
            messages_rx,
            pending_events: Vec::new(),
        }
    }

    // ===== Asset & Segments =====

    /// Bind the session to the shared audio asset
    ///
    /// A second call while an asset is loaded is a no-op that returns the
    /// already-loaded asset info.
    pub fn load_asset(&mut self, source: &Path) -> Result<AssetInfo> {
        if let Some(asset) = self.asset {
            debug!("Asset already loaded, ignoring {}", source.display());
            return Ok(asset);
        }

        let asset = self.graph.open(source).map_err(|e| match e {
            PlaybackError::AssetUnavailable(msg) => PlaybackError::AssetUnavailable(msg),
            other => PlaybackError::AssetUnavailable(format!("{}: {}", source.display(), other)),
        })?;

        info!(
            "Loaded asset {} ({:.1}s at {} Hz)",
            source.display(),
            asset.duration,
            asset.sample_rate
        );
        self.asset = Some(asset);
        Ok(asset)
    }

    /// Replace the segment list
    ///
    /// Resets the active index to 0 and the position to the first segment's
    /// start (or 0 when empty). Anything playing from the old list is
    /// stopped and its pending completion invalidated; playback is not
    /// restarted.
    pub fn set_segments(&mut self, segments: Vec<VirtualSegment>) {
        self.halt_render_path();
        self.epoch += 1;
        self.scrub = ScrubState::Committed;

        self.total_duration = catalog::total_duration(&segments);
        self.position = segments.first().map_or(0.0, VirtualSegment::start_offset);
        self.active_index = 0;
        self.segments = segments;

        info!(
            "Segment list replaced: {} segments, {:.1}s total",
            self.segments.len(),
            self.total_duration
        );
        self.emit(PlaybackEvent::SegmentsReplaced {
            count: self.segments.len(),
            total_duration: self.total_duration,
        });
        self.emit_state_changed();
        self.publish_now_playing();
    }

    // ===== Playback Control =====

    /// Start or resume playback of the active segment from the current position
    ///
    /// Resuming at the very end of a segment restarts it.
    pub fn play(&mut self) {
        if self.is_playing {
            return;
        }
        let Some(segment) = self.active_segment() else {
            debug!("play() with no segments loaded");
            return;
        };

        let from = if self.position >= segment.end_offset() {
            segment.start_offset()
        } else {
            self.position
        };
        self.select_segment(self.active_index, Some(from));
    }

    /// Pause playback, keeping the current position
    pub fn pause(&mut self) {
        if !self.is_playing {
            return;
        }

        // Capture the latest render position before the clock stops
        self.poll_position();
        self.graph.pause();
        self.tracker.stop();
        self.is_playing = false;

        self.emit_state_changed();
        self.publish_now_playing();
    }

    /// Toggle between playing and paused (remote play/pause entry point)
    pub fn toggle_play_pause(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Select the segment after the active one
    pub fn next_segment(&mut self) {
        self.select_segment(self.active_index.saturating_add(1), None);
    }

    /// Select the segment before the active one
    pub fn previous_segment(&mut self) {
        match self.active_index.checked_sub(1) {
            Some(index) => self.select_segment(index, None),
            None => debug!("Already at first segment"),
        }
    }

    /// Tear down the render path (session shutdown)
    ///
    /// Invalidates every outstanding completion.
    pub fn shutdown(&mut self) {
        self.halt_render_path();
        self.epoch += 1;
        info!("Playback session shut down");
    }

    // ===== Completion Messages =====

    /// Drain and apply completion messages marshalled from render threads
    ///
    /// Returns the number of messages handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.messages_rx.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Receiver side of the completion channel, for select loops
    pub fn message_receiver(&self) -> Receiver<ControlMessage> {
        self.messages_rx.clone()
    }

    // ===== State Queries =====

    /// Bounds-checked segment lookup
    pub fn segment(&self, index: usize) -> Option<&VirtualSegment> {
        self.segments.get(index)
    }

    /// Currently active segment, if any
    pub fn active_segment(&self) -> Option<&VirtualSegment> {
        self.segment(self.active_index)
    }

    pub fn segments(&self) -> &[VirtualSegment] {
        &self.segments
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Absolute asset position in seconds
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub.is_scrubbing()
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether a scheduling operation is in progress
    pub fn is_scheduling(&self) -> bool {
        self.scheduling
    }

    pub fn asset(&self) -> Option<AssetInfo> {
        self.asset
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Copy of the session state for presentation layers
    pub fn snapshot(&self) -> SessionSnapshot {
        let (elapsed, duration) = self
            .active_segment()
            .map(|s| (self.position - s.start_offset(), s.duration()))
            .unwrap_or((0.0, 0.0));

        SessionSnapshot {
            segments: self.segments.clone(),
            active_index: self.active_index,
            position: self.position,
            elapsed,
            duration,
            is_playing: self.is_playing,
            is_scrubbing: self.is_scrubbing(),
            rate: self.rate,
            epoch: self.epoch,
            total_duration: self.total_duration,
            asset_duration: self.asset.map(|a| a.duration),
        }
    }

    /// Now-playing metadata for the active segment
    ///
    /// The displayed rate is 0 while paused.
    pub fn now_playing(&self) -> Option<NowPlayingInfo> {
        self.active_segment().map(|segment| NowPlayingInfo {
            title: segment.title().to_string(),
            elapsed: self.position - segment.start_offset(),
            duration: segment.duration(),
            rate: if self.is_playing { self.rate } else { 0.0 },
        })
    }

    // ===== Events =====

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    pub(crate) fn emit(&mut self, event: PlaybackEvent) {
        self.pending_events.push(event);
    }

    pub(crate) fn emit_state_changed(&mut self) {
        self.emit(PlaybackEvent::StateChanged {
            is_playing: self.is_playing,
        });
    }

    pub(crate) fn publish_now_playing(&mut self) {
        if let Some(info) = self.now_playing() {
            self.emit(PlaybackEvent::NowPlaying(info));
        }
    }

    // ===== Internal =====

    /// Stop the render path and the tracker
    pub(crate) fn halt_render_path(&mut self) {
        self.graph.stop();
        self.tracker.stop();
        self.is_playing = false;
    }
}
