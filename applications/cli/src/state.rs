/// Persisted reading-plan day
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayState {
    pub day: u32,
}

impl Default for DayState {
    fn default() -> Self {
        Self { day: 1 }
    }
}

impl DayState {
    /// Load the saved day, or day 1 when nothing is saved yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No saved state at {}, starting at day 1", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let mut state: Self = serde_json::from_str(&text)?;
        state.day = state.day.max(1);
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("Saved day {} to {}", self.day, path.display());
        Ok(())
    }

    pub fn next(self) -> Self {
        Self {
            day: self.day.saturating_add(1),
        }
    }

    /// Previous day, never below day 1
    pub fn previous(self) -> Self {
        Self {
            day: self.day.saturating_sub(1).max(1),
        }
    }

    pub fn with_day(day: u32) -> Self {
        Self { day: day.max(1) }
    }
}
