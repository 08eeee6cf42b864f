//! Configuration vault – reads/writes `~/.visnav/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use visnav_runtime::EngineConfig;
use visnav_types::ContextLabel;

/// Persisted user configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Context to navigate to, e.g. `"main_menu"`.
    #[serde(default = "default_target")]
    pub target: String,

    /// Context the simulated desktop starts in, e.g. `"in_game"`.
    #[serde(default = "default_start_context")]
    pub start_context: String,

    /// Full engine configuration surface.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            start_context: default_start_context(),
            engine: EngineConfig::default(),
        }
    }
}

fn default_target() -> String {
    "main_menu".to_string()
}

fn default_start_context() -> String {
    "in_game".to_string()
}

impl CliConfig {
    /// `~/.visnav/config.toml` (falling back to the working directory when
    /// `$HOME` is unset).
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".visnav").join("config.toml")
    }

    /// Load the config at `path`, writing the defaults there on first run.
    pub fn load_or_init(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let raw = fs::read_to_string(path)?;
            Ok(toml::from_str(&raw)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Write this config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Parse a context name as written in the config file.
pub fn parse_context(name: &str) -> Option<ContextLabel> {
    match name.trim().to_lowercase().as_str() {
        "main_menu" => Some(ContextLabel::MainMenu),
        "single_player_menu" => Some(ContextLabel::SinglePlayerMenu),
        "options_menu" => Some(ContextLabel::OptionsMenu),
        "in_game" => Some(ContextLabel::InGame),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".visnav").join("config.toml");

        let config = CliConfig::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.target, "main_menu");
        assert_eq!(config.engine.loop_window, 4);
    }

    #[test]
    fn saved_config_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CliConfig::default();
        config.target = "options_menu".to_string();
        config.engine.attempt_budget = 5;
        config.save_to(&path).unwrap();

        let back = CliConfig::load_or_init(&path).unwrap();
        assert_eq!(back.target, "options_menu");
        assert_eq!(back.engine.attempt_budget, 5);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "target = \"in_game\"\n").unwrap();

        let config = CliConfig::load_or_init(&path).unwrap();
        assert_eq!(config.target, "in_game");
        assert_eq!(config.start_context, "in_game");
        assert_eq!(config.engine.max_recalibrations, 3);
    }

    #[test]
    fn context_names_parse() {
        assert_eq!(parse_context("main_menu"), Some(ContextLabel::MainMenu));
        assert_eq!(
            parse_context(" Single_Player_Menu "),
            Some(ContextLabel::SinglePlayerMenu)
        );
        assert_eq!(parse_context("nonsense"), None);
    }
}
