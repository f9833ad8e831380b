//! Error types for segment playback

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The audio asset could not be opened
    #[error("Audio asset unavailable: {0}")]
    AssetUnavailable(String),

    /// Segment index is not within the current segment list
    #[error("Segment index out of range: {0}")]
    IndexOutOfRange(usize),

    /// Render clock is not running yet
    #[error("Render clock unavailable")]
    ClockUnavailable,

    /// Playback rate must be finite and greater than zero
    #[error("Invalid playback rate: {0}")]
    InvalidRate(f32),

    /// Segment bounds are inverted or negative
    #[error("Invalid segment bounds: start {start}, end {end}")]
    InvalidSegment {
        /// Start offset in seconds
        start: f64,
        /// End offset in seconds
        end: f64,
    },

    /// Chapter table or reading plan is malformed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Session configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Render graph rejected a call
    #[error("Render error: {0}")]
    Render(String),

    /// Control thread is no longer running
    #[error("Playback service stopped")]
    ServiceStopped,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
