//! Configuration for tilemux.
//!
//! The configuration file is located at `~/.tilemux/config.toml`:
//!
//! ```toml
//! # Command started in every new pane (optional)
//! shell = "/bin/zsh"
//!
//! # Rows kept above the live screen of each pane
//! scrollback_limit = 10000
//!
//! # Log filter used when RUST_LOG is not set
//! log_level = "info"
//!
//! [keys]
//! prefix = "Ctrl+B"
//! resize_step = 0.1
//!
//! # Replaces the default table when present
//! [keys.prefix_bindings]
//! "%" = "split-vertical"
//! "\"" = "split-horizontal"
//! "o" = "focus-next"
//!
//! [keys.global_bindings]
//! "Alt+R" = "resize-mode"
//! ```
//!
//! Key names are the chord names produced by the key mapper: plain
//! characters as themselves, `Ctrl+X` / `Alt+X` for chords, and `Up`,
//! `Enter`, `F5` and so on for named keys.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::term::state::DEFAULT_SCROLLBACK;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell command for new panes
    pub shell: Option<String>,
    pub scrollback_limit: usize,
    pub log_level: String,
    pub keys: KeyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            scrollback_limit: DEFAULT_SCROLLBACK,
            log_level: "info".to_string(),
            keys: KeyConfig::default(),
        }
    }
}

/// Key binding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Chord that enters tmux mode
    pub prefix: String,
    /// Weight moved by one resize-mode key press
    pub resize_step: f32,
    /// Keys accepted right after the prefix
    pub prefix_bindings: HashMap<String, Action>,
    /// Keys acted on without the prefix
    pub global_bindings: HashMap<String, Action>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        let prefix_bindings = [
            ("%", Action::SplitVertical),
            ("\"", Action::SplitHorizontal),
            ("o", Action::FocusNext),
            (";", Action::FocusPrev),
            ("{", Action::MoveLeft),
            ("}", Action::MoveRight),
            ("x", Action::ClosePane),
            ("r", Action::ResizeMode),
        ];
        let global_bindings = [("Alt+R", Action::ResizeMode)];

        Self {
            prefix: "Ctrl+B".to_string(),
            resize_step: 0.1,
            prefix_bindings: to_map(&prefix_bindings),
            global_bindings: to_map(&global_bindings),
        }
    }
}

fn to_map(bindings: &[(&str, Action)]) -> HashMap<String, Action> {
    bindings
        .iter()
        .map(|(key, action)| (key.to_string(), *action))
        .collect()
}

/// Commands a key binding can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// New pane below the focused one
    SplitVertical,
    /// New pane beside the focused one
    SplitHorizontal,
    FocusNext,
    FocusPrev,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    ClosePane,
    ResizeMode,
    ScrollUp,
    ScrollDown,
}

impl Config {
    /// Parse configuration text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// `~/.tilemux/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.tilemux`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".tilemux");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
