//! Configuration file support for podcastr.
//!
//! This module provides functionality for loading and saving user preferences
//! from a TOML configuration file.

use crate::error::Result;
use crate::format::DisplayLocale;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which media element implementation drives playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    /// External mpv process controlled over its IPC socket
    #[default]
    Mpv,
    /// Silent wall-clock playback, no audio output
    Clock,
}

impl FromStr for MediaBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mpv" => Ok(MediaBackend::Mpv),
            "clock" => Ok(MediaBackend::Clock),
            other => Err(format!("unknown backend '{}', use 'mpv' or 'clock'", other)),
        }
    }
}

impl fmt::Display for MediaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaBackend::Mpv => write!(f, "mpv"),
            MediaBackend::Clock => write!(f, "clock"),
        }
    }
}

/// User configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the episode API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// How many episodes the landing screen requests
    #[serde(default = "default_episode_limit")]
    pub episode_limit: usize,

    /// Locale for dates
    #[serde(default)]
    pub locale: DisplayLocale,

    /// Media backend
    #[serde(default)]
    pub backend: MediaBackend,

    /// Player command for the mpv backend
    #[serde(default = "default_player")]
    pub player: String,

    /// Additional arguments to pass to the player
    #[serde(default)]
    pub player_args: Vec<String>,

    /// Seconds moved by a single seek key press
    #[serde(default = "default_seek_step")]
    pub seek_step: u64,

    /// Custom keybindings
    #[serde(default)]
    pub keybindings: Keybindings,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn default_api_url() -> String {
    "http://localhost:3333".to_string()
}

fn default_episode_limit() -> usize {
    12
}

fn default_player() -> String {
    "mpv".to_string()
}

fn default_seek_step() -> u64 {
    10
}

impl Config {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self {
            api_url: default_api_url(),
            episode_limit: default_episode_limit(),
            locale: DisplayLocale::default(),
            backend: MediaBackend::default(),
            player: default_player(),
            player_args: Vec::new(),
            seek_step: default_seek_step(),
            keybindings: Keybindings::default(),
        }
    }

    /// Get the path to the config file.
    ///
    /// Returns ~/.config/podcastr/config.toml on Linux,
    /// or a platform-appropriate location on other systems.
    pub fn get_config_path() -> std::result::Result<PathBuf, io::Error> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
            })?
            .join("podcastr");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load config from `path`, or defaults if there is no file there.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Write a default config file if none exists yet.
    ///
    /// Returns the path of the config file.
    pub fn create_default_if_missing() -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        Self::create_default_at(&path)?;
        Ok(path)
    }

    /// Write defaults to `path` unless a file is already there. Returns
    /// whether a file was written.
    pub fn create_default_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        Self::new().save_to(path)?;
        Ok(true)
    }
}

/// Key names bound to each UI command.
///
/// Names are single characters (`"j"`, `"?"`) or one of `Up`, `Down`, `Left`,
/// `Right`, `Enter`, `Esc`, `Backspace`, `Tab`, `Space`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keybindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub select: Vec<String>,
    pub back: Vec<String>,
    pub play: Vec<String>,
    pub toggle_play: Vec<String>,
    pub next: Vec<String>,
    pub previous: Vec<String>,
    pub shuffle: Vec<String>,
    pub repeat: Vec<String>,
    pub seek_forward: Vec<String>,
    pub seek_backward: Vec<String>,
    pub stop: Vec<String>,
    pub help: Vec<String>,
    pub quit: Vec<String>,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            up: keys(&["k", "Up"]),
            down: keys(&["j", "Down"]),
            select: keys(&["Enter"]),
            back: keys(&["Backspace", "Esc"]),
            play: keys(&["p"]),
            toggle_play: keys(&["Space"]),
            next: keys(&["n"]),
            previous: keys(&["b"]),
            shuffle: keys(&["s"]),
            repeat: keys(&["r"]),
            seek_forward: keys(&["l", "Right"]),
            seek_backward: keys(&["h", "Left"]),
            stop: keys(&["x"]),
            help: keys(&["?"]),
            quit: keys(&["q"]),
        }
    }
}

impl Keybindings {
    /// Check whether a key event matches any key name in `binding`.
    ///
    /// Events carrying Control or Alt never match; those are reserved for
    /// global shortcuts.
    pub fn matches(&self, binding: &[String], key: &KeyEvent) -> bool {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return false;
        }

        binding
            .iter()
            .filter_map(|name| parse_key_name(name))
            .any(|code| code == key.code)
    }
}

/// Translate a configured key name into a crossterm key code.
fn parse_key_name(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }

    match name.to_ascii_lowercase().as_str() {
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "enter" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "backspace" => Some(KeyCode::Backspace),
        "tab" => Some(KeyCode::Tab),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_new_config_has_defaults() {
        let config = Config::new();
        assert_eq!(config.api_url, "http://localhost:3333");
        assert_eq!(config.episode_limit, 12);
        assert_eq!(config.locale, DisplayLocale::PtBr);
        assert_eq!(config.backend, MediaBackend::Mpv);
        assert_eq!(config.player, "mpv");
        assert!(config.player_args.is_empty());
        assert_eq!(config.seek_step, 10);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            api_url: "https://podcastr.example.com".to_string(),
            locale: DisplayLocale::EnUs,
            backend: MediaBackend::Clock,
            player_args: vec!["--volume=50".to_string()],
            ..Config::new()
        };

        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("api_url = \"https://podcastr.example.com\""));
        assert!(toml_str.contains("locale = \"en-US\""));
        assert!(toml_str.contains("backend = \"clock\""));
        assert!(toml_str.contains("player_args"));
    }

    #[test]
    fn test_config_partial_deserialization() {
        let toml_str = r#"
            api_url = "http://10.0.0.2:3333"
            backend = "clock"

            [keybindings]
            next = ["N"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_url, "http://10.0.0.2:3333");
        assert_eq!(config.backend, MediaBackend::Clock);
        assert_eq!(config.episode_limit, 12);
        assert_eq!(config.keybindings.next, vec!["N".to_string()]);
        // untouched bindings keep their defaults
        assert_eq!(config.keybindings.quit, vec!["q".to_string()]);
    }

    #[test]
    fn test_create_default_writes_once_and_loads_back() {
        let dir = std::env::temp_dir().join(format!("podcastr-config-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");
        let _ = fs::remove_dir_all(&dir);

        assert!(Config::create_default_at(&path).unwrap());
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_url, Config::new().api_url);
        assert_eq!(loaded.keybindings, Keybindings::default());

        // an existing file is left alone
        let custom = Config {
            seek_step: 30,
            ..Config::new()
        };
        custom.save_to(&path).unwrap();
        assert!(!Config::create_default_at(&path).unwrap());
        assert_eq!(Config::load_from(&path).unwrap().seek_step, 30);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_from_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("podcastr-no-such-dir").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.episode_limit, 12);
    }

    #[test]
    fn test_config_rejects_unknown_backend() {
        let result: std::result::Result<Config, _> = toml::from_str("backend = \"vlc\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("MPV".parse::<MediaBackend>(), Ok(MediaBackend::Mpv));
        assert_eq!("clock".parse::<MediaBackend>(), Ok(MediaBackend::Clock));
        assert!("vlc".parse::<MediaBackend>().is_err());
    }

    #[test]
    fn test_keybindings_match_chars_and_named_keys() {
        let kb = Keybindings::default();
        assert!(kb.matches(&kb.down, &key(KeyCode::Char('j'))));
        assert!(kb.matches(&kb.down, &key(KeyCode::Down)));
        assert!(kb.matches(&kb.toggle_play, &key(KeyCode::Char(' '))));
        assert!(kb.matches(&kb.back, &key(KeyCode::Esc)));
        assert!(!kb.matches(&kb.up, &key(KeyCode::Char('j'))));
    }

    #[test]
    fn test_keybindings_ignore_control_chords() {
        let kb = Keybindings::default();
        let ctrl_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(!kb.matches(&kb.quit, &ctrl_q));
    }

    #[test]
    fn test_unknown_key_name_never_matches() {
        let kb = Keybindings::default();
        let binding = vec!["F13".to_string()];
        assert!(!kb.matches(&binding, &key(KeyCode::F(13))));
    }
}
