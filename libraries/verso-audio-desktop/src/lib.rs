//! Desktop render graph for Verso using CPAL and Symphonia
//!
//! This crate provides [`DesktopRenderGraph`], the desktop implementation of
//! `verso_playback::RenderGraph`.
//!
//! # Features
//!
//! - Decodes MP3, FLAC, OGG, WAV, AAC and other Symphonia formats
//! - Sample-accurate range scheduling from any frame of the asset
//! - Gapless playback rate changes
//! - Render clock counted in asset frames
//!
//! # Example
//!
//! ```no_run
//! use verso_audio_desktop::{DesktopConfig, DesktopRenderGraph};
//! use verso_playback::{PlaybackConfig, PlayerService};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = DesktopRenderGraph::new(DesktopConfig::default())?;
//! let player = PlayerService::init(PlaybackConfig::default(), Box::new(graph))?;
//! player.load_asset("/audio/bible.mp3")?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod config;
mod decoder;
mod error;
mod graph;
mod output;
mod state;
mod worker;

pub use config::DesktopConfig;
pub use decoder::AssetDecoder;
pub use error::{AudioError, Result};
pub use graph::DesktopRenderGraph;
