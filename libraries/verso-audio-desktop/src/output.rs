//! CPAL output with a dedicated audio thread
//!
//! The audio thread owns the CPAL stream, which avoids Send/Sync issues
//! with `cpal::Stream` across platforms. The stream runs for the life of
//! the graph; ranges reach its callback as ring-buffer consumers sent over
//! a channel, and pause just silences the callback.
//!
//! The callback reads source frames through a fractional read head that
//! advances by `rate * source_rate / device_rate` per output frame, with
//! linear interpolation between neighbours. Rate changes therefore take
//! effect on the next callback without touching the buffer, and the
//! consumed-frame count stays in asset frames.

use crate::error::{AudioError, Result};
use crate::state::RenderState;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use ringbuf::{traits::*, HeapCons};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// A range's ring buffer, handed to the callback
pub(crate) struct Attachment {
    pub generation: u64,
    pub consumer: HeapCons<f32>,
}

type Frame = [f32; 2];

/// Output callback state
pub(crate) struct Renderer {
    state: Arc<RenderState>,
    attachments: Receiver<Attachment>,
    consumer: Option<HeapCons<f32>>,
    generation: u64,
    device_rate: u32,
    channels: usize,

    // Read head: `frac` of the way from `current` to `upcoming`
    current: Option<Frame>,
    upcoming: Option<Frame>,
    frac: f64,
}

impl Renderer {
    pub(crate) fn new(
        state: Arc<RenderState>,
        attachments: Receiver<Attachment>,
        device_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            state,
            attachments,
            consumer: None,
            generation: 0,
            device_rate: device_rate.max(1),
            channels: usize::from(channels.max(1)),
            current: None,
            upcoming: None,
            frac: 0.0,
        }
    }

    /// Fill one device buffer (runs on the real-time thread)
    pub(crate) fn render(&mut self, output: &mut [f32]) {
        self.take_attachments();

        if self.consumer.is_some() && !self.state.is_current(self.generation) {
            self.detach();
        }
        if self.consumer.is_none() || !self.state.is_playing() {
            output.fill(0.0);
            return;
        }

        let step = f64::from(self.state.rate()) * f64::from(self.state.source_rate())
            / f64::from(self.device_rate);
        let mut played = 0u64;

        for frame in output.chunks_mut(self.channels) {
            let [left, right] = self.next_frame(step, &mut played);
            match frame {
                [mono] => *mono = (left + right) * 0.5,
                [l, r, rest @ ..] => {
                    *l = left;
                    *r = right;
                    rest.fill(0.0);
                }
                [] => {}
            }
        }

        if played > 0 {
            self.state.add_consumed(played);
        }
    }

    fn take_attachments(&mut self) {
        while let Ok(attachment) = self.attachments.try_recv() {
            if !self.state.is_current(attachment.generation) {
                continue;
            }
            self.consumer = Some(attachment.consumer);
            self.generation = attachment.generation;
            self.current = None;
            self.upcoming = None;
            self.frac = 0.0;
            self.state.attach(attachment.generation);
        }
    }

    fn detach(&mut self) {
        self.consumer = None;
        self.current = None;
        self.upcoming = None;
    }

    fn next_frame(&mut self, step: f64, played: &mut u64) -> Frame {
        if self.current.is_none() {
            self.current = self.pop_frame();
            self.frac = 0.0;
            if self.current.is_some() {
                *played += 1;
            }
        }
        let Some(current) = self.current else {
            return [0.0; 2];
        };
        if self.upcoming.is_none() {
            self.upcoming = self.pop_frame();
        }
        let upcoming = self.upcoming.unwrap_or(current);

        let t = self.frac as f32;
        let out = [
            current[0] + (upcoming[0] - current[0]) * t,
            current[1] + (upcoming[1] - current[1]) * t,
        ];

        self.frac += step;
        while self.frac >= 1.0 {
            self.frac -= 1.0;
            self.current = self.upcoming.take().or_else(|| self.pop_frame());
            if self.current.is_none() {
                // Starved; resume from the next frame that arrives
                self.frac = 0.0;
                break;
            }
            *played += 1;
            self.upcoming = self.pop_frame();
        }

        out
    }

    fn pop_frame(&mut self) -> Option<Frame> {
        let consumer = self.consumer.as_mut()?;
        if consumer.occupied_len() < 2 {
            return None;
        }
        let left = consumer.try_pop()?;
        let right = consumer.try_pop()?;
        Some([left, right])
    }
}

enum OutputCommand {
    Shutdown,
}

/// Running output stream
pub(crate) struct OutputStream {
    command_tx: Sender<OutputCommand>,
    thread: Option<JoinHandle<()>>,
    device_rate: u32,
}

impl OutputStream {
    /// Open a device and start the audio thread
    ///
    /// Blocks until the stream is running or has failed to start.
    pub(crate) fn start(
        device_name: Option<&str>,
        state: Arc<RenderState>,
        attachments: Receiver<Attachment>,
    ) -> Result<Self> {
        let device = find_device(device_name)?;
        let supported = device.default_output_config()?;
        let device_rate = supported.sample_rate();
        let config = supported.config();

        let (command_tx, command_rx) = bounded::<OutputCommand>(4);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        let thread = thread::Builder::new()
            .name("verso-audio-output".to_string())
            .spawn(move || {
                audio_thread_run(device, config, state, attachments, &command_rx, &ready_tx);
            })?;

        ready_rx.recv().map_err(|_| AudioError::ThreadStopped)??;
        info!("Audio output running at {} Hz", device_rate);

        Ok(Self {
            command_tx,
            thread: Some(thread),
            device_rate,
        })
    }

    pub(crate) fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        let _ = self.command_tx.send(OutputCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }
}

fn find_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    let Some(name) = name else {
        return host.default_output_device().ok_or(AudioError::DeviceNotFound);
    };

    let devices = host
        .output_devices()
        .map_err(|e| AudioError::DeviceError(e.to_string()))?;
    for device in devices {
        if device.name().is_ok_and(|n| n == name) {
            return Ok(device);
        }
    }
    warn!("Output device '{}' not found", name);
    Err(AudioError::DeviceNotFound)
}

/// Audio thread main loop: owns the stream until shutdown
fn audio_thread_run(
    device: Device,
    config: StreamConfig,
    state: Arc<RenderState>,
    attachments: Receiver<Attachment>,
    commands: &Receiver<OutputCommand>,
    ready: &Sender<Result<()>>,
) {
    let mut renderer = Renderer::new(state, attachments, config.sample_rate, config.channels);

    let stream = match device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.render(data),
        |err| warn!("Audio stream error: {}", err),
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(e.into()));
        return;
    }
    let _ = ready.send(Ok(()));

    while let Ok(command) = commands.recv() {
        match command {
            OutputCommand::Shutdown => break,
        }
    }

    drop(stream);
    debug!("Audio output thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::HeapRb;

    fn renderer_with_frames(frames: &[Frame], source_rate: u32, device_rate: u32) -> (Renderer, Arc<RenderState>) {
        let state = Arc::new(RenderState::new());
        state.set_source_rate(source_rate);
        state.set_playing(true);

        let generation = state.bump_generation();
        let (mut producer, consumer) = HeapRb::<f32>::new(frames.len() * 2 + 2).split();
        for frame in frames {
            producer.push_slice(frame);
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(Attachment {
            generation,
            consumer,
        })
        .unwrap();
        (Renderer::new(Arc::clone(&state), rx, device_rate, 2), state)
    }

    fn ramp(len: usize) -> Vec<Frame> {
        (0..len).map(|i| [i as f32, -(i as f32)]).collect()
    }

    #[test]
    fn unit_rate_copies_frames() {
        let (mut renderer, state) = renderer_with_frames(&ramp(4), 1000, 1000);
        let mut out = vec![0.0; 8];

        renderer.render(&mut out);

        assert_eq!(out, vec![0.0, 0.0, 1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        assert_eq!(state.consumed(), 4);
    }

    #[test]
    fn double_rate_skips_frames() {
        let (mut renderer, state) = renderer_with_frames(&ramp(8), 1000, 1000);
        state.set_rate(2.0);
        let mut out = vec![0.0; 8];

        renderer.render(&mut out);

        let lefts: Vec<f32> = out.chunks(2).map(|f| f[0]).collect();
        assert_eq!(lefts, vec![0.0, 2.0, 4.0, 6.0]);
        assert_eq!(state.consumed(), 8);
    }

    #[test]
    fn half_rate_interpolates() {
        let (mut renderer, _state) = renderer_with_frames(&ramp(4), 1000, 1000);
        renderer.state.set_rate(0.5);
        let mut out = vec![0.0; 8];

        renderer.render(&mut out);

        let lefts: Vec<f32> = out.chunks(2).map(|f| f[0]).collect();
        assert_eq!(lefts, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn device_rate_conversion_counts_source_frames() {
        // 500 Hz asset on a 1000 Hz device: two output frames per source frame
        let (mut renderer, state) = renderer_with_frames(&ramp(4), 500, 1000);
        let mut out = vec![0.0; 8];

        renderer.render(&mut out);

        // Two frames played out, the third just started
        assert_eq!(state.consumed(), 3);
    }

    #[test]
    fn paused_renders_silence_and_keeps_clock() {
        let (mut renderer, state) = renderer_with_frames(&ramp(4), 1000, 1000);
        state.set_playing(false);
        let mut out = vec![1.0; 8];

        renderer.render(&mut out);

        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(state.consumed(), 0);
        assert!(state.is_attached(state.generation()));
    }

    #[test]
    fn stopped_range_is_detached() {
        let (mut renderer, state) = renderer_with_frames(&ramp(4), 1000, 1000);
        let mut out = vec![0.0; 4];
        renderer.render(&mut out);

        state.bump_generation();
        let mut out = vec![1.0; 4];
        renderer.render(&mut out);

        assert!(out.iter().all(|s| *s == 0.0));
        assert!(renderer.consumer.is_none());
    }

    #[test]
    fn starved_buffer_outputs_silence() {
        let (mut renderer, state) = renderer_with_frames(&ramp(2), 1000, 1000);
        let mut out = vec![9.0; 8];

        renderer.render(&mut out);

        assert_eq!(&out[..4], &[0.0, 0.0, 1.0, -1.0]);
        assert!(out[4..].iter().all(|s| *s == 0.0));
        assert_eq!(state.consumed(), 2);
    }

    #[test]
    fn mono_device_downmixes() {
        let state = Arc::new(RenderState::new());
        state.set_source_rate(1000);
        state.set_playing(true);
        let generation = state.bump_generation();
        let (mut producer, consumer) = HeapRb::<f32>::new(8).split();
        producer.push_slice(&[0.5, 1.5, 1.0, 3.0]);
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(Attachment {
            generation,
            consumer,
        })
        .unwrap();

        let mut renderer = Renderer::new(state, rx, 1000, 1);
        let mut out = vec![0.0; 2];
        renderer.render(&mut out);

        assert_eq!(out, vec![1.0, 2.0]);
    }
}
