//! Desktop render graph configuration

use serde::{Deserialize, Serialize};

/// Tuning for the decoder worker and output buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    /// Decoded audio buffered ahead of the output callback (default: 2s)
    pub buffer_seconds: f32,

    /// Largest batch of frames the decoder pushes at once (default: 4096)
    pub decode_chunk_frames: usize,

    /// Output device name; the host default when unset
    pub device_name: Option<String>,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: 2.0,
            decode_chunk_frames: 4096,
            device_name: None,
        }
    }
}

impl DesktopConfig {
    /// Ring buffer capacity in interleaved stereo samples
    pub fn buffer_samples(&self, sample_rate: u32) -> usize {
        let frames = (f64::from(self.buffer_seconds.max(0.1)) * f64::from(sample_rate)) as usize;
        frames.max(self.decode_chunk_frames.max(1)) * 2
    }
}
