use anyhow::{Context, Result};
use cuex_experiment::CueTiming;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timing: CueTiming,
    pub audio: AudioSettings,
    pub display: DisplaySettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// WAV looped during PERIODIC epochs
    pub periodic_track: Option<PathBuf>,
    /// WAV looped during RANDOM epochs
    pub random_track: Option<PathBuf>,
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            periodic_track: None,
            random_track: None,
            volume: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub font: Option<PathBuf>,
    pub fullscreen: bool,
    /// Window size when not fullscreen
    pub width: u32,
    pub height: u32,
    /// How long the completion screen stays up
    pub complete_hold_secs: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            font: None,
            fullscreen: true,
            width: 1280,
            height: 720,
            complete_hold_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    /// Write the JSON per-epoch summary next to the CSV files
    pub summary: bool,
    /// Add a `response` row to the event log for every resolved cue
    pub log_resolved_cues: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            summary: true,
            log_resolved_cues: false,
        }
    }
}

impl AppConfig {
    /// Reads `path`. A missing file is created with the defaults, which are then used;
    /// a file that exists but does not parse is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            let cfg = Self::default();
            match toml::to_string_pretty(&cfg) {
                Ok(text) => match fs::write(path, text) {
                    Ok(()) => info!(path = %path.display(), "wrote default config"),
                    Err(e) => warn!(path = %path.display(), error = %e, "cannot write default config"),
                },
                Err(e) => warn!(error = %e, "cannot serialize default config"),
            }
            return Ok(cfg);
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
