use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults applied when a flag is not given on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub english_only: bool,
    pub mode: String,
    pub min_speakers: usize,
    pub max_speakers: usize,
    pub unresolved: String,
    pub models_dir: Option<PathBuf>,
    pub model_mirror: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "large-v3".to_string(),
            english_only: true,
            mode: "cue".to_string(),
            min_speakers: 1,
            max_speakers: 2,
            unresolved: "unknown".to_string(),
            models_dir: None,
            model_mirror: None,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Parley").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or malformed files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("no configuration directory on this system")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
