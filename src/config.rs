use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Language code of the last selection.
    #[serde(default)]
    pub language: Option<String>,
    /// Writing system name of the last selection.
    #[serde(default)]
    pub writing_system: Option<String>,
    /// Directory with `index.json` and `<code>.json` files replacing the
    /// bundled languages.
    #[serde(default)]
    pub catalog_dir: Option<String>,
    #[serde(default = "default_speech_enabled")]
    pub speech_enabled: bool,
    #[serde(default = "default_speech_command")]
    pub speech_command: String,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    /// Locale code -> synthesizer voice name.
    #[serde(default)]
    pub voices: HashMap<String, String>,
}

fn default_theme() -> String {
    "terminal-default".to_string()
}
fn default_speech_enabled() -> bool {
    true
}
fn default_speech_command() -> String {
    "espeak-ng".to_string()
}
fn default_speech_rate() -> f32 {
    0.7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            language: None,
            writing_system: None,
            catalog_dir: None,
            speech_enabled: default_speech_enabled(),
            speech_command: default_speech_command(),
            speech_rate: default_speech_rate(),
            voices: HashMap::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glyphdr")
            .join("config.toml")
    }

    /// Clamp values a hand-edited file may have left out of range.
    pub fn validate(&mut self) {
        if !self.speech_rate.is_finite() || self.speech_rate <= 0.0 {
            self.speech_rate = default_speech_rate();
        }
        self.speech_rate = self.speech_rate.min(4.0);
        if self.speech_command.trim().is_empty() {
            self.speech_command = default_speech_command();
        }
    }

    /// Remember the selection so the next start resumes it.
    pub fn set_selection(&mut self, language: &str, writing_system: &str) {
        self.language = Some(language.to_string());
        self.writing_system = Some(writing_system.to_string());
    }

    pub fn selection(&self) -> Option<(&str, &str)> {
        Some((self.language.as_deref()?, self.writing_system.as_deref()?))
    }
}
