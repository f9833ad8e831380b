/// Application configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use verso_audio_desktop::DesktopConfig;
use verso_playback::PlaybackConfig;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "verso.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathSettings,
    pub playback: PlaybackConfig,
    pub audio: DesktopConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathSettings {
    /// The single concatenated audio asset
    pub asset: PathBuf,

    /// Chapter-offset table (`chapters.json`)
    pub chapters: PathBuf,

    /// Reading plan (`plan.json`)
    pub plan: PathBuf,

    /// Where the current day is persisted
    pub state: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            asset: PathBuf::from("./data/bible.mp3"),
            chapters: PathBuf::from("./data/chapters.json"),
            plan: PathBuf::from("./data/plan.json"),
            state: PathBuf::from("./data/state.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `verso.toml` is used when
    /// present. `VERSO_`-prefixed variables override the file, with `__`
    /// between section and key (`VERSO_PLAYBACK__SKIP_INTERVAL_SECS=30`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file {} not found",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("VERSO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.audio.decode_chunk_frames == 0 {
            return Err(CliError::Config(
                "audio.decode_chunk_frames must be greater than zero".to_string(),
            ));
        }
        if !(self.audio.buffer_seconds.is_finite() && self.audio.buffer_seconds > 0.0) {
            return Err(CliError::Config(format!(
                "audio.buffer_seconds must be positive, got {}",
                self.audio.buffer_seconds
            )));
        }

        Ok(())
    }
}
