use anyhow::Context;
use serde::Deserialize;
use std::{env, fs, path::PathBuf};

use crate::engine::MAX_VOLUME;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub player: PlayerConfig,
    pub ui: UiConfig,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join("config.toml"));
            candidates.push(current_dir.join("config").join("config.toml"));
            candidates.push(current_dir.join("config").join("radio.toml"));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join("config.toml"));
                candidates.push(dir.join("config").join("config.toml"));
                candidates.push(dir.join("config").join("radio.toml"));
            }
        }

        for path in candidates {
            if path.exists() {
                let data = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let config = Self::from_toml(&data)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?;
                log::info!("loaded config from {}", path.display());
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    pub fn from_toml(data: &str) -> anyhow::Result<Self> {
        let doc: ConfigDocument = toml::from_str(data)?;
        Ok(doc.into())
    }
}

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub initial_volume: u8,
    pub video_enabled: bool,
    pub mpv_path: PathBuf,
    pub ytdlp_path: PathBuf,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: 50,
            video_enabled: false,
            mpv_path: PathBuf::from("mpv"),
            ytdlp_path: PathBuf::from("yt-dlp"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UiConfig {
    pub always_on_top: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    player: PlayerSection,
    #[serde(default)]
    ui: UiSection,
}

impl From<ConfigDocument> for Config {
    fn from(value: ConfigDocument) -> Self {
        let defaults = PlayerConfig::default();
        let player = PlayerConfig {
            initial_volume: value
                .player
                .initial_volume
                .map(|v| v.min(u32::from(MAX_VOLUME)) as u8)
                .unwrap_or(defaults.initial_volume),
            video_enabled: value.player.video_enabled.unwrap_or(defaults.video_enabled),
            mpv_path: value.player.mpv_path.unwrap_or(defaults.mpv_path),
            ytdlp_path: value.player.ytdlp_path.unwrap_or(defaults.ytdlp_path),
        };
        let ui = UiConfig {
            always_on_top: value.ui.always_on_top.unwrap_or(false),
        };

        Config { player, ui }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PlayerSection {
    initial_volume: Option<u32>,
    video_enabled: Option<bool>,
    mpv_path: Option<PathBuf>,
    ytdlp_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct UiSection {
    always_on_top: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.player.initial_volume, 50);
        assert!(!config.player.video_enabled);
        assert_eq!(config.player.mpv_path, PathBuf::from("mpv"));
        assert!(!config.ui.always_on_top);
    }

    #[test]
    fn sections_override_defaults_and_volume_is_clamped() {
        let config = Config::from_toml(
            r#"
            [player]
            initial_volume = 180
            video_enabled = true
            ytdlp_path = "/opt/bin/yt-dlp"

            [ui]
            always_on_top = true
            "#,
        )
        .unwrap();
        assert_eq!(config.player.initial_volume, 100);
        assert!(config.player.video_enabled);
        assert_eq!(config.player.ytdlp_path, PathBuf::from("/opt/bin/yt-dlp"));
        assert_eq!(config.player.mpv_path, PathBuf::from("mpv"));
        assert!(config.ui.always_on_top);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(Config::from_toml("[player]\ninitial_volume = \"loud\"").is_err());
    }
}
