//! Desktop render graph
//!
//! Implements [`RenderGraph`] on top of three threads: the playback control
//! thread (caller), a decoder worker that owns the Symphonia reader, and the
//! CPAL audio thread. Each scheduled range gets a fresh ring buffer; the
//! producer goes to the worker and the consumer to the output callback,
//! both tagged with the range's generation.

use crate::config::DesktopConfig;
use crate::decoder::AssetDecoder;
use crate::error::AudioError;
use crate::output::{Attachment, OutputStream};
use crate::state::RenderState;
use crate::worker::{DecodeJob, DecoderWorker};
use crossbeam_channel::{unbounded, Sender};
use ringbuf::{traits::*, HeapRb};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use verso_playback::{AssetInfo, CompletionFn, RenderClock, RenderGraph};

/// [`RenderGraph`] backed by Symphonia decoding and CPAL output
pub struct DesktopRenderGraph {
    config: DesktopConfig,
    state: Arc<RenderState>,
    attach_tx: Sender<Attachment>,
    worker: Option<DecoderWorker>,
    asset: Option<AssetInfo>,

    // Declared last so the stream stops after the worker
    output: Option<OutputStream>,
}

impl DesktopRenderGraph {
    /// Open the configured output device and start the audio thread
    pub fn new(config: DesktopConfig) -> crate::Result<Self> {
        let state = Arc::new(RenderState::new());
        let (attach_tx, attach_rx) = unbounded();
        let output = OutputStream::start(config.device_name.as_deref(), Arc::clone(&state), attach_rx)?;

        Ok(Self {
            config,
            state,
            attach_tx,
            worker: None,
            asset: None,
            output: Some(output),
        })
    }

    /// Graph without an output device; tests drive the callback by hand
    #[cfg(test)]
    pub(crate) fn detached(
        config: DesktopConfig,
        device_rate: u32,
    ) -> (Self, crate::output::Renderer) {
        let state = Arc::new(RenderState::new());
        let (attach_tx, attach_rx) = unbounded();
        let renderer = crate::output::Renderer::new(Arc::clone(&state), attach_rx, device_rate, 2);
        let graph = Self {
            config,
            state,
            attach_tx,
            worker: None,
            asset: None,
            output: None,
        };
        (graph, renderer)
    }

    /// Output device sample rate, if a device is open
    pub fn device_rate(&self) -> Option<u32> {
        self.output.as_ref().map(OutputStream::device_rate)
    }

    pub fn asset(&self) -> Option<AssetInfo> {
        self.asset
    }
}

impl RenderGraph for DesktopRenderGraph {
    fn open(&mut self, source: &Path) -> verso_playback::Result<AssetInfo> {
        let decoder = AssetDecoder::open(source)?;
        let info = decoder.info();

        self.stop();
        self.state.set_source_rate(info.sample_rate);
        // Dropping the old worker joins it
        self.worker = None;
        self.worker = Some(
            DecoderWorker::spawn(decoder, Arc::clone(&self.state), self.config.decode_chunk_frames)
                .map_err(AudioError::from)?,
        );
        self.asset = Some(info);

        info!("Opened {} ({:.1}s)", source.display(), info.duration);
        Ok(info)
    }

    fn schedule_range(
        &mut self,
        start_frame: u64,
        frame_count: u64,
        on_complete: CompletionFn,
    ) -> verso_playback::Result<()> {
        let (Some(worker), Some(asset)) = (&self.worker, self.asset) else {
            return Err(AudioError::NoAsset.into());
        };

        let generation = self.state.bump_generation();
        let capacity = self.config.buffer_samples(asset.sample_rate);
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

        debug!(
            "Range {}+{} frames (generation {})",
            start_frame, frame_count, generation
        );

        self.attach_tx
            .send(Attachment {
                generation,
                consumer,
            })
            .map_err(|_| AudioError::ThreadStopped)?;

        let job = DecodeJob {
            generation,
            start_frame,
            frame_count,
            producer,
            on_complete,
        };
        if !worker.submit(job) {
            return Err(AudioError::ThreadStopped.into());
        }
        Ok(())
    }

    fn play(&mut self) -> verso_playback::Result<()> {
        if self.worker.is_none() {
            return Err(AudioError::NoAsset.into());
        }
        self.state.set_playing(true);
        Ok(())
    }

    fn pause(&mut self) {
        self.state.set_playing(false);
    }

    fn stop(&mut self) {
        self.state.set_playing(false);
        self.state.bump_generation();
    }

    fn set_rate(&mut self, rate: f32) {
        self.state.set_rate(rate);
    }

    fn render_clock(&self) -> Option<RenderClock> {
        let generation = self.state.generation();
        if !self.state.is_attached(generation) {
            return None;
        }
        Some(RenderClock {
            sample_time: self.state.consumed(),
            sample_rate: self.state.source_rate(),
        })
    }
}

impl Drop for DesktopRenderGraph {
    fn drop(&mut self) {
        // Unblocks a worker waiting on the callback
        self.state.bump_generation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    const RATE: u32 = 8000;

    fn write_wav(path: &Path, frames: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let value = ((i % 3000) * 10) as i16;
            writer.write_sample(value).unwrap();
            writer.write_sample(-value).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn counter() -> (Arc<AtomicUsize>, CompletionFn) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (
            count,
            Box::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    /// Run the callback until `done` or the timeout
    fn pump(renderer: &mut crate::output::Renderer, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut buffer = vec![0.0f32; 512];
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            renderer.render(&mut buffer);
            std::thread::sleep(Duration::from_millis(1));
        }
        done()
    }

    #[test]
    fn schedule_without_asset_fails() {
        let (mut graph, _renderer) = DesktopRenderGraph::detached(DesktopConfig::default(), RATE);
        let (_, done) = counter();
        assert!(graph.schedule_range(0, 100, done).is_err());
        assert!(graph.play().is_err());
    }

    #[test]
    fn open_reports_asset_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.wav");
        write_wav(&path, RATE * 3);

        let (mut graph, _renderer) = DesktopRenderGraph::detached(DesktopConfig::default(), RATE);
        let info = graph.open(&path).unwrap();

        assert_eq!(info.sample_rate, RATE);
        assert!((info.duration - 3.0).abs() < 1e-9);
    }

    #[test]
    fn range_completes_after_playing_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.wav");
        write_wav(&path, RATE * 2);

        let (mut graph, mut renderer) = DesktopRenderGraph::detached(DesktopConfig::default(), RATE);
        graph.open(&path).unwrap();
        assert!(graph.render_clock().is_none());

        let (count, done) = counter();
        graph.schedule_range(4000, 2000, done).unwrap();
        graph.play().unwrap();

        assert!(pump(&mut renderer, || count.load(Ordering::SeqCst) == 1));
        let clock = graph.render_clock().unwrap();
        assert_eq!(clock.sample_time, 2000);
        assert_eq!(clock.sample_rate, RATE);
    }

    #[test]
    fn stopped_range_never_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.wav");
        write_wav(&path, RATE * 2);

        let (mut graph, mut renderer) = DesktopRenderGraph::detached(DesktopConfig::default(), RATE);
        graph.open(&path).unwrap();

        let (count, done) = counter();
        graph.schedule_range(0, 8000, done).unwrap();
        graph.play().unwrap();
        let mut buffer = vec![0.0f32; 512];
        renderer.render(&mut buffer);

        graph.stop();
        assert!(graph.render_clock().is_none());

        // A newer range still completes, the stopped one does not
        let (newer, done) = counter();
        graph.schedule_range(100, 10, done).unwrap();
        graph.play().unwrap();
        assert!(pump(&mut renderer, || newer.load(Ordering::SeqCst) == 1));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unreadable_range_never_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.wav");
        write_wav(&path, RATE);

        let (mut graph, mut renderer) = DesktopRenderGraph::detached(DesktopConfig::default(), RATE);
        graph.open(&path).unwrap();

        // Seeking ten seconds into a one-second asset fails
        let (count, done) = counter();
        graph.schedule_range(u64::from(RATE) * 10, 100, done).unwrap();
        graph.play().unwrap();

        let deadline = Instant::now() + Duration::from_millis(300);
        let mut buffer = vec![0.0f32; 512];
        while Instant::now() < deadline {
            renderer.render(&mut buffer);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(buffer.iter().all(|s| *s == 0.0));

        // The worker survives and plays the next range
        let (next, done) = counter();
        graph.schedule_range(0, 100, done).unwrap();
        graph.play().unwrap();
        assert!(pump(&mut renderer, || next.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn zero_length_range_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.wav");
        write_wav(&path, RATE);

        let (mut graph, mut renderer) = DesktopRenderGraph::detached(DesktopConfig::default(), RATE);
        graph.open(&path).unwrap();

        let (count, done) = counter();
        graph.schedule_range(RATE as u64, 0, done).unwrap();
        graph.play().unwrap();

        assert!(pump(&mut renderer, || count.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn paused_clock_holds_still() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.wav");
        write_wav(&path, RATE * 2);

        let (mut graph, mut renderer) = DesktopRenderGraph::detached(DesktopConfig::default(), RATE);
        graph.open(&path).unwrap();
        let (_count, done) = counter();
        graph.schedule_range(0, RATE as u64, done).unwrap();
        graph.play().unwrap();

        assert!(pump(&mut renderer, || graph
            .render_clock()
            .is_some_and(|c| c.sample_time > 0)));
        graph.pause();
        let paused_at = graph.render_clock().unwrap().sample_time;

        let mut buffer = vec![0.0f32; 512];
        renderer.render(&mut buffer);
        assert_eq!(graph.render_clock().unwrap().sample_time, paused_at);
        assert!(buffer.iter().all(|s| *s == 0.0));
    }
}
