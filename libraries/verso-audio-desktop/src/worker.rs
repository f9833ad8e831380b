//! Decoder worker thread
//!
//! Owns the [`AssetDecoder`] and fills the output ring buffer for one
//! scheduled range at a time. Once every frame of the range has been played
//! by the output callback, the range's completion fires, unless the range
//! was stopped or superseded first. A range whose audio cannot be sought or
//! decoded never completes.

use crate::decoder::AssetDecoder;
use crate::state::RenderState;
use crossbeam_channel::{Receiver, Sender};
use ringbuf::{traits::*, HeapProd};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace, warn};
use verso_playback::CompletionFn;

/// Sleep while the ring buffer is full or the callback is still draining
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// One range to decode
pub(crate) struct DecodeJob {
    pub generation: u64,
    pub start_frame: u64,
    pub frame_count: u64,
    pub producer: HeapProd<f32>,
    pub on_complete: CompletionFn,
}

pub(crate) enum WorkerCommand {
    Decode(DecodeJob),
    Shutdown,
}

/// Handle to a running decoder worker
pub(crate) struct DecoderWorker {
    command_tx: Sender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl DecoderWorker {
    pub(crate) fn spawn(
        decoder: AssetDecoder,
        state: Arc<RenderState>,
        chunk_frames: usize,
    ) -> std::io::Result<Self> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("verso-decoder".to_string())
            .spawn(move || run(decoder, &command_rx, &state, chunk_frames))?;

        Ok(Self {
            command_tx,
            thread: Some(thread),
        })
    }

    /// Queue a range; returns false if the worker has exited
    pub(crate) fn submit(&self, job: DecodeJob) -> bool {
        self.command_tx.send(WorkerCommand::Decode(job)).is_ok()
    }
}

impl Drop for DecoderWorker {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Decoder thread panicked");
            }
        }
    }
}

fn run(
    mut decoder: AssetDecoder,
    commands: &Receiver<WorkerCommand>,
    state: &RenderState,
    chunk_frames: usize,
) {
    while let Ok(command) = commands.recv() {
        match command {
            WorkerCommand::Decode(job) => run_job(&mut decoder, job, state, chunk_frames),
            WorkerCommand::Shutdown => break,
        }
    }
    debug!("Decoder thread exiting");
}

/// Decode one range, wait for it to play out, then complete it
pub(crate) fn run_job(
    decoder: &mut AssetDecoder,
    mut job: DecodeJob,
    state: &RenderState,
    chunk_frames: usize,
) {
    let generation = job.generation;
    if !state.is_current(generation) {
        trace!("Dropping superseded range (generation {})", generation);
        return;
    }

    let pushed = if job.frame_count == 0 {
        0
    } else {
        match decode_range(decoder, &mut job, state, chunk_frames) {
            Some(pushed) => pushed,
            None => return,
        }
    };

    // Completion means the listener heard the last frame
    loop {
        if !state.is_current(generation) {
            trace!("Range stopped before playing out (generation {})", generation);
            return;
        }
        if state.is_attached(generation) && state.consumed() >= pushed {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    debug!("Range complete: {} frames (generation {})", pushed, generation);
    (job.on_complete)();
}

/// Push the range into the ring buffer
///
/// `None` when superseded midway or when the asset cannot be read; such a
/// range never completes, so the session is not advanced past audio that
/// was never heard.
fn decode_range(
    decoder: &mut AssetDecoder,
    job: &mut DecodeJob,
    state: &RenderState,
    chunk_frames: usize,
) -> Option<u64> {
    if let Err(e) = decoder.seek_to_frame(job.start_frame) {
        error!("Seek to frame {} failed: {}", job.start_frame, e);
        return None;
    }

    let mut remaining = job.frame_count;
    while remaining > 0 {
        if !state.is_current(job.generation) {
            return None;
        }

        let samples = match decoder.next_samples() {
            Ok(Some(samples)) => samples,
            Ok(None) => {
                debug!("Asset ended {} frames short of the range", remaining);
                break;
            }
            Err(e) => {
                error!("Decode failed with {} frames left in the range: {}", remaining, e);
                return None;
            }
        };

        let frames = ((samples.len() / 2) as u64).min(remaining) as usize;
        for chunk in samples[..frames * 2].chunks(chunk_frames.max(1) * 2) {
            if !push_all(&mut job.producer, chunk, state, job.generation) {
                return None;
            }
        }
        remaining -= frames as u64;
    }

    Some(job.frame_count - remaining)
}

/// Block until `samples` fit in the ring buffer; false when superseded
fn push_all(producer: &mut HeapProd<f32>, samples: &[f32], state: &RenderState, generation: u64) -> bool {
    let mut offset = 0;
    while offset < samples.len() {
        if !state.is_current(generation) {
            return false;
        }
        let written = producer.push_slice(&samples[offset..]);
        offset += written;
        if written == 0 {
            thread::sleep(POLL_INTERVAL);
        }
    }
    true
}
