//! Asset decoder using Symphonia
//!
//! Decodes the shared asset from an arbitrary frame offset into interleaved
//! stereo f32 at the asset's own sample rate. Rate and device-rate
//! conversion happen later, in the output callback.
//!
//! All Symphonia sample formats are normalized to [-1.0, 1.0]; mono is
//! duplicated to both channels and anything wider than stereo keeps its
//! first two channels.

use crate::error::{AudioError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tracing::{debug, warn};
use verso_playback::AssetInfo;

/// Streaming decoder over one audio asset
pub struct AssetDecoder {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    time_base: TimeBase,
    sample_rate: u32,
    total_frames: u64,

    /// Frames still to drop after an accurate seek landed early
    skip_frames: u64,
}

impl AssetDecoder {
    /// Open and probe an asset
    ///
    /// When the container does not declare its length, packets are scanned
    /// once to count frames.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (format, track_id) = probe(&path)?;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.id == track_id)
            .ok_or_else(|| AudioError::UnsupportedFormat("No audio tracks found".into()))?;
        let params = track.codec_params.clone();

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| AudioError::UnsupportedFormat("Unknown sample rate".into()))?;
        let time_base = params.time_base.unwrap_or(TimeBase::new(1, sample_rate));

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

        let total_frames = match params.n_frames {
            Some(frames) => frames,
            None => {
                debug!("{} has no frame count, scanning packets", path.display());
                count_frames(&path, track_id, time_base, sample_rate)?
            }
        };

        debug!(
            "Opened {}: {} Hz, {} frames, {} channels",
            path.display(),
            sample_rate,
            total_frames,
            params.channels.map_or(0, |c| c.count())
        );

        Ok(Self {
            path,
            format,
            decoder,
            track_id,
            time_base,
            sample_rate,
            total_frames,
            skip_frames: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Duration and sample rate for the playback session
    pub fn info(&self) -> AssetInfo {
        AssetInfo {
            duration: self.total_frames as f64 / f64::from(self.sample_rate),
            sample_rate: self.sample_rate,
        }
    }

    /// Position the decoder so the next samples start at `frame`
    pub fn seek_to_frame(&mut self, frame: u64) -> Result<()> {
        let required_ts = frames_to_ts(frame, self.time_base, self.sample_rate);
        let seeked = self.format.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: required_ts,
                track_id: self.track_id,
            },
        )?;
        self.decoder.reset();

        let early = seeked.required_ts.saturating_sub(seeked.actual_ts);
        self.skip_frames = ts_to_frames(early, self.time_base, self.sample_rate);
        Ok(())
    }

    /// Decode the next packet into interleaved stereo samples
    ///
    /// Returns `None` at end of stream.
    pub fn next_samples(&mut self) -> Result<Option<Vec<f32>>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!("Skipping corrupt packet in {}: {}", self.path.display(), msg);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let mut samples = convert_to_stereo_f32(decoded);
            if self.skip_frames > 0 {
                let frames = (samples.len() / 2) as u64;
                let skip = self.skip_frames.min(frames);
                self.skip_frames -= skip;
                samples.drain(..(skip as usize) * 2);
                if samples.is_empty() {
                    continue;
                }
            }
            return Ok(Some(samples));
        }
    }
}

fn probe(path: &Path) -> Result<(Box<dyn FormatReader>, u32)> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let format = probed.format;
    let track_id = format
        .default_track()
        .ok_or_else(|| AudioError::UnsupportedFormat("No audio tracks found".into()))?
        .id;
    Ok((format, track_id))
}

/// Sum packet durations for containers without a declared length
fn count_frames(path: &Path, track_id: u32, time_base: TimeBase, sample_rate: u32) -> Result<u64> {
    let (mut format, _) = probe(path)?;
    let mut ts = 0u64;
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => ts += packet.dur,
            Ok(_) => {}
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(ts_to_frames(ts, time_base, sample_rate))
}

fn frames_to_ts(frames: u64, time_base: TimeBase, sample_rate: u32) -> u64 {
    // ts * numer / denom seconds == frames / sample_rate seconds
    let num = u128::from(frames) * u128::from(time_base.denom);
    let den = u128::from(time_base.numer) * u128::from(sample_rate);
    (num / den.max(1)) as u64
}

fn ts_to_frames(ts: u64, time_base: TimeBase, sample_rate: u32) -> u64 {
    let num = u128::from(ts) * u128::from(time_base.numer) * u128::from(sample_rate);
    (num / u128::from(time_base.denom).max(1)) as u64
}

/// Interleave a planar buffer to stereo f32
fn interleave_to_stereo_f32<T, F>(buf: &symphonia::core::audio::AudioBuffer<T>, normalize: F) -> Vec<f32>
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    let mut output = Vec::with_capacity(frames * 2);

    let right = if channels > 1 { 1 } else { 0 };
    for frame_idx in 0..frames {
        output.push(normalize(buf.chan(0)[frame_idx]));
        output.push(normalize(buf.chan(right)[frame_idx]));
    }

    output
}

fn convert_to_stereo_f32(decoded: AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::F32(buf) => interleave_to_stereo_f32(&buf, |s| s),
        AudioBufferRef::F64(buf) => interleave_to_stereo_f32(&buf, |s| s as f32),

        AudioBufferRef::S8(buf) => interleave_to_stereo_f32(&buf, |s| s as f32 / i8::MAX as f32),
        AudioBufferRef::S16(buf) => interleave_to_stereo_f32(&buf, |s| s as f32 / i16::MAX as f32),
        AudioBufferRef::S24(buf) => interleave_to_stereo_f32(&buf, |s| s.inner() as f32 / 8388607.0),
        AudioBufferRef::S32(buf) => interleave_to_stereo_f32(&buf, |s| s as f32 / i32::MAX as f32),

        AudioBufferRef::U8(buf) => {
            interleave_to_stereo_f32(&buf, |s| (s as f32 / u8::MAX as f32) * 2.0 - 1.0)
        }
        AudioBufferRef::U16(buf) => {
            interleave_to_stereo_f32(&buf, |s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
        }
        AudioBufferRef::U24(buf) => {
            interleave_to_stereo_f32(&buf, |s| (s.inner() as f32 / 16777215.0) * 2.0 - 1.0)
        }
        AudioBufferRef::U32(buf) => {
            interleave_to_stereo_f32(&buf, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0)
        }
    }
}
