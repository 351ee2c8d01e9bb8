//! Application configuration management.
//!
//! This module handles the persistent configuration for the lounge: where the
//! recitation data lives, the starting volume, which sources may be picked,
//! how text is presented, and the per-source fade table. Configuration is
//! stored in the user's config directory (typically ~/.config/lounge/config.toml)
//! and every field falls back to a default when absent.

use crate::constants::{DEFAULT_FADE_KEY, DEFAULT_VOLUME, SHORT_TRACK_MS};
use crate::tables::{FadeProfile, FadeTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Which of the two text tables the player shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    #[default]
    Primary,
    Secondary,
    Both,
}

impl TextMode {
    pub fn next(self) -> Self {
        match self {
            TextMode::Primary => TextMode::Secondary,
            TextMode::Secondary => TextMode::Both,
            TextMode::Both => TextMode::Primary,
        }
    }
}

impl fmt::Display for TextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextMode::Primary => "primary",
            TextMode::Secondary => "secondary",
            TextMode::Both => "both",
        };
        f.write_str(name)
    }
}

impl FromStr for TextMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Ok(TextMode::Primary),
            "secondary" => Ok(TextMode::Secondary),
            "both" => Ok(TextMode::Both),
            other => Err(format!(
                "Unknown text mode '{other}' (expected primary, secondary or both)"
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub text_mode: TextMode,
    #[serde(default = "default_show_text")]
    pub show_text: bool,
    #[serde(default = "default_short_track_ms")]
    pub short_track_ms: f64,
    #[serde(default = "default_fades")]
    pub fades: BTreeMap<String, FadeProfile>,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("lounge"))
        .unwrap_or_else(|| PathBuf::from("~/.lounge"))
        .to_string_lossy()
        .to_string()
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_show_text() -> bool {
    true
}

fn default_short_track_ms() -> f64 {
    SHORT_TRACK_MS
}

fn default_fades() -> BTreeMap<String, FadeProfile> {
    [
        ("AbdulBasetAbdulSamad", FadeProfile::new(0.3, 0.8)),
        ("YasserAlDossari", FadeProfile::new(0.005, 0.05)),
        ("HaniArRifai", FadeProfile::new(0.05, 1.0)),
        ("MohamedSiddiqAlMinshawi", FadeProfile::new(0.25, 0.5)),
        (DEFAULT_FADE_KEY, FadeProfile::new(0.0, 0.0)),
    ]
    .into_iter()
    .map(|(name, profile)| (name.to_string(), profile))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            data_dir: default_data_dir(),
            volume: default_volume(),
            sources: Vec::new(),
            text_mode: TextMode::default(),
            show_text: default_show_text(),
            short_track_ms: default_short_track_ms(),
            fades: default_fades(),
        }
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        // Check for XDG_CONFIG_HOME first (useful for testing)
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join("lounge")
        } else {
            dirs::config_dir()
                .ok_or("Unable to find config directory")?
                .join("lounge")
        };
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            // Return default config instead of error
            return Ok(Default::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()?;
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    pub fn exists() -> Result<bool, Box<dyn Error>> {
        Ok(Self::config_path()?.exists())
    }

    /// Data directory with `~` and environment variables expanded.
    pub fn data_path(&self) -> Result<PathBuf, Box<dyn Error>> {
        let expanded = shellexpand::full(&self.data_dir)?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    /// The allow-list to hand to the selector; `None` means every source.
    pub fn source_filter(&self) -> Option<Vec<String>> {
        if self.sources.is_empty() {
            None
        } else {
            Some(self.sources.clone())
        }
    }

    pub fn fade_table(&self) -> FadeTable {
        FadeTable::new(self.fades.clone())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "data_dir" => self.data_dir = value.to_string(),
            "volume" => {
                let volume = value
                    .parse::<f32>()
                    .map_err(|_| "Value must be a number between 0 and 1")?;
                if !(0.0..=1.0).contains(&volume) {
                    return Err("Value must be a number between 0 and 1".into());
                }
                self.volume = volume;
            }
            "sources" => {
                self.sources = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            "text_mode" => self.text_mode = value.parse()?,
            "show_text" => {
                self.show_text = value
                    .parse::<bool>()
                    .map_err(|_| "Value must be 'true' or 'false'")?;
            }
            _ => return Err(format!("Unknown configuration key: {key}").into()),
        }
        Ok(())
    }
}
