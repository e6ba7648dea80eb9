//! Runtime configuration.
//!
//! Values come from, in decreasing precedence: command line flags, the TOML
//! file given with `--config`, and the defaults below.

use std::{collections::BTreeMap, fs, path::Path, str::FromStr, time::Duration};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Deserializer};

use crate::{controls::ControlKind, playlist::PlaylistId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub server: ServerConfig,
    pub player: PlayerConfig,
    pub playlist: PlaylistConfig,
    pub timings: Timings,
    pub output: OutputConfig,
}

impl Config {
    /// Read a TOML config file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for [`Config`].
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8080,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlayerConfig {
    /// Command word bound to each control. Words given in the file replace
    /// the defaults one by one; an empty word unbinds the control.
    #[serde(deserialize_with = "controls_over_defaults")]
    pub controls: BTreeMap<ControlKind, String>,
    pub classes: ControlClasses,
}
impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            controls: ControlKind::ALL
                .iter()
                .map(|kind| (*kind, kind.as_str().to_owned()))
                .collect(),
            classes: ControlClasses::default(),
        }
    }
}

fn controls_over_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<ControlKind, String>, D::Error> {
    let mut controls = PlayerConfig::default().controls;
    controls.extend(BTreeMap::<ControlKind, String>::deserialize(deserializer)?);
    controls.retain(|_, word| !word.is_empty());
    Ok(controls)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ControlClasses {
    pub disabled: String,
    pub playing: String,
    pub paused: String,
}
impl Default for ControlClasses {
    fn default() -> Self {
        Self {
            disabled: "disabled".to_owned(),
            playing: "playing".to_owned(),
            paused: "paused".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlaylistConfig {
    pub default_playlist: Option<DefaultPlaylist>,
    pub current_class: String,
}
impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            default_playlist: None,
            current_class: "current".to_owned(),
        }
    }
}

/// Playlist to show before any player reports one
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DefaultPlaylist {
    Id(PlaylistId),
    /// First playlist of that type, e.g. `audio`
    Kind(String),
}
impl FromStr for DefaultPlaylist {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(s.parse()
            .map_or_else(|_| Self::Kind(s.to_owned()), Self::Id))
    }
}

/// Polling cadence, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Timings {
    pub poll_interval_ms: u64,
    pub retry_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub playlist_refresh_ms: u64,
    pub error_display_ms: u64,
}
impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            retry_interval_ms: 5000,
            request_timeout_ms: 3000,
            playlist_refresh_ms: 5000,
            error_display_ms: 5000,
        }
    }
}
impl Timings {
    /// Delay before the next poll, depending on how the last one went
    #[must_use]
    pub const fn next_poll(&self, success: bool) -> Duration {
        Duration::from_millis(if success {
            self.poll_interval_ms
        } else {
            self.retry_interval_ms
        })
    }
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
    #[must_use]
    pub const fn playlist_refresh(&self) -> Duration {
        Duration::from_millis(self.playlist_refresh_ms)
    }
    #[must_use]
    pub const fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Item properties joined into the module text, first non-empty ones win
    pub properties: Vec<String>,
    pub separator: String,
    /// Text shown when none of the properties have a value
    pub placeholder: String,
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            properties: vec!["displayartist".to_owned(), "title".to_owned()],
            separator: " - ".to_owned(),
            placeholder: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.timings.next_poll(true), Duration::from_secs(1));
        assert_eq!(config.timings.next_poll(false), Duration::from_secs(5));
        assert_eq!(config.player.controls[&ControlKind::PlayPause], "play-pause");
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
[server]
host = "kodi.lan"

[player.controls]
play-pause = "toggle"
stop = ""

[playlist]
default-playlist = "audio"

[timings]
poll-interval-ms = 250
"#,
        )
        .unwrap();
        assert_eq!(config.server.host, "kodi.lan");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.player.controls[&ControlKind::PlayPause], "toggle");
        assert_eq!(config.player.controls[&ControlKind::Next], "next");
        assert!(!config.player.controls.contains_key(&ControlKind::Stop));
        assert_eq!(
            config.playlist.default_playlist,
            Some(DefaultPlaylist::Kind("audio".to_owned()))
        );
        assert_eq!(config.timings.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.timings.retry_interval_ms, 5000);
    }

    #[test]
    fn test_numeric_default_playlist() {
        let config: Config = toml::from_str("[playlist]\ndefault-playlist = 1\n").unwrap();
        assert_eq!(config.playlist.default_playlist, Some(DefaultPlaylist::Id(1)));
        assert_eq!("0".parse::<DefaultPlaylist>(), Ok(DefaultPlaylist::Id(0)));
        assert_eq!("video".parse::<DefaultPlaylist>(), Ok(DefaultPlaylist::Kind("video".to_owned())));
    }
}
