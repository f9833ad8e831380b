//! State shared between the graph, the decoder worker and the output callback

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Lock-free render state
///
/// `generation` is bumped by every schedule and stop. The output callback
/// records which generation its ring buffer belongs to in `attached`, and
/// `consumed` counts source frames played from that buffer. Anything
/// tagged with an older generation is dead.
#[derive(Debug)]
pub(crate) struct RenderState {
    generation: AtomicU64,
    attached: AtomicU64,
    consumed: AtomicU64,
    playing: AtomicBool,
    rate_bits: AtomicU32,
    source_rate: AtomicU32,
}

impl RenderState {
    pub(crate) fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            attached: AtomicU64::new(u64::MAX),
            consumed: AtomicU64::new(0),
            playing: AtomicBool::new(false),
            rate_bits: AtomicU32::new(1.0f32.to_bits()),
            source_rate: AtomicU32::new(0),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate the current range; returns the new generation
    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Called by the output callback when it takes a new buffer
    pub(crate) fn attach(&self, generation: u64) {
        self.consumed.store(0, Ordering::Release);
        self.attached.store(generation, Ordering::Release);
    }

    /// Whether the callback is playing from `generation`'s buffer
    pub(crate) fn is_attached(&self, generation: u64) -> bool {
        self.attached.load(Ordering::Acquire) == generation && self.is_current(generation)
    }

    pub(crate) fn add_consumed(&self, frames: u64) {
        self.consumed.fetch_add(frames, Ordering::AcqRel);
    }

    pub(crate) fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Acquire)
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub(crate) fn set_rate(&self, rate: f32) {
        self.rate_bits.store(rate.to_bits(), Ordering::Release);
    }

    pub(crate) fn rate(&self) -> f32 {
        f32::from_bits(self.rate_bits.load(Ordering::Acquire))
    }

    pub(crate) fn set_source_rate(&self, rate: u32) {
        self.source_rate.store(rate, Ordering::Release);
    }

    pub(crate) fn source_rate(&self) -> u32 {
        self.source_rate.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_detaches_current_buffer() {
        let state = RenderState::new();
        let generation = state.bump_generation();
        state.attach(generation);
        assert!(state.is_attached(generation));

        state.bump_generation();
        assert!(!state.is_attached(generation));
    }

    #[test]
    fn attach_resets_consumed() {
        let state = RenderState::new();
        let first = state.bump_generation();
        state.attach(first);
        state.add_consumed(500);

        let second = state.bump_generation();
        state.attach(second);
        assert_eq!(state.consumed(), 0);
    }

    #[test]
    fn nothing_attached_initially() {
        let state = RenderState::new();
        assert!(!state.is_attached(state.generation()));
        assert_eq!(state.rate(), 1.0);
    }
}
