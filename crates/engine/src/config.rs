//! Configuration management for hypr-sessions.
//!
//! The app mapping file is TOML, loaded from (in order):
//! 1. the path given with `--apps-toml`
//! 2. `$XDG_CONFIG_HOME/hypr/session-apps.toml` (`~/.config/hypr/session-apps.toml`)
//!
//! A missing file yields the defaults: no mappings, which makes every record
//! unmapped on restore but still lets `save` capture a session.

use crate::error::{Error, Result};
use directories::BaseDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bounds applied to `[restore]` timings by [`Config::validate`].
pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 600;
pub const MIN_POLL_INTERVAL_MS: u64 = 50;
pub const MAX_POLL_INTERVAL_MS: u64 = 5_000;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[apps]` and `[pwa]` tables.
    #[serde(flatten)]
    pub mapping: AppMapping,
    /// Restore loop tuning.
    pub restore: RestoreConfig,
    /// What capture records and how.
    pub capture: CaptureConfig,
}

/// Application identity to launch command.
///
/// Keys in `apps` are window classes or app ids; keys in `pwa` are PWA
/// display names. Values are shell command lines that may contain the
/// `{cwd}` and `{url}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMapping {
    pub apps: BTreeMap<String, String>,
    pub pwa: BTreeMap<String, String>,
}

impl AppMapping {
    pub fn app(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        self.apps.get(key).map(String::as_str)
    }

    pub fn pwa(&self, display_name: &str) -> Option<&str> {
        if display_name.is_empty() {
            return None;
        }
        self.pwa.get(display_name).map(String::as_str)
    }
}

/// Restore-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Seconds each launched app gets to show its window.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between window list queries in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Fallback for PWA records without a mapping. `{url}` is replaced with
    /// the saved launch URL.
    #[serde(default = "default_browser_command")]
    pub browser_command: String,

    /// Let windows that were already open before restore started be claimed.
    #[serde(default = "default_false")]
    pub match_existing_windows: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            browser_command: default_browser_command(),
            match_existing_windows: false,
        }
    }
}

impl RestoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Capture-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Window classes whose working directory is recorded.
    #[serde(default = "default_terminals")]
    pub terminals: Vec<String>,

    /// Window classes never written to the session.
    #[serde(default = "default_ignore_classes")]
    pub ignore_classes: Vec<String>,

    /// Record windows on special (scratchpad) workspaces too.
    #[serde(default = "default_false")]
    pub include_special_workspaces: bool,

    /// Regexes for the classes of generic browser windows that may host PWAs.
    #[serde(default = "default_browser_classes")]
    pub browser_classes: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            terminals: default_terminals(),
            ignore_classes: default_ignore_classes(),
            include_special_workspaces: false,
            browser_classes: default_browser_classes(),
        }
    }
}

impl CaptureConfig {
    pub fn is_terminal(&self, class: &str) -> bool {
        self.terminals.iter().any(|t| t.eq_ignore_ascii_case(class))
    }

    pub fn is_ignored(&self, class: &str) -> bool {
        self.ignore_classes.iter().any(|c| c.eq_ignore_ascii_case(class))
    }

    /// Compile `browser_classes`, failing on the first invalid pattern.
    pub fn compile_browser_classes(&self) -> Result<Vec<Regex>> {
        self.browser_classes
            .iter()
            .map(|pattern| Regex::new(pattern).map_err(Error::from))
            .collect()
    }
}

// Default value functions for serde
fn default_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_browser_command() -> String {
    "chromium --app={url}".to_string()
}

fn default_false() -> bool {
    false
}

fn default_terminals() -> Vec<String> {
    [
        "Alacritty",
        "kitty",
        "foot",
        "org.wezfurlong.wezterm",
        "com.mitchellh.ghostty",
        "org.gnome.Console",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_ignore_classes() -> Vec<String> {
    ["waybar", "rofi", "wofi", "fuzzel", "dunst", "mako", "swaync", "hyprpaper"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_browser_classes() -> Vec<String> {
    vec![r"^(?i:chromium(-browser)?|google-chrome(-stable)?|brave-browser)$".to_string()]
}

/// A setting that was adjusted during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl Config {
    /// Load configuration from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => match default_config_path() {
                Some(path) => Self::load_from_path(&path),
                None => {
                    tracing::info!("No home directory, using default configuration");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::ConfigInvalid {
                    path: path.to_path_buf(),
                    message: format!("failed to read: {}", e),
                })
            }
        };

        let mut config: Config = toml::from_str(&content).map_err(|e| Error::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Err(e) = config.capture.compile_browser_classes() {
            return Err(Error::ConfigInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }

        for warning in config.validate() {
            tracing::warn!("config: {}: {}", warning.field, warning.message);
        }

        tracing::info!(
            "Loaded config from {} ({} apps, {} PWAs)",
            path.display(),
            config.mapping.apps.len(),
            config.mapping.pwa.len()
        );
        Ok(config)
    }

    /// Clamp out-of-range settings, returning what was changed.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let timeout = self.restore.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
        if timeout != self.restore.timeout_secs {
            warnings.push(ConfigWarning {
                field: "restore.timeout_secs",
                message: format!("{} out of range, using {}", self.restore.timeout_secs, timeout),
            });
            self.restore.timeout_secs = timeout;
        }

        let poll = self
            .restore
            .poll_interval_ms
            .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);
        if poll != self.restore.poll_interval_ms {
            warnings.push(ConfigWarning {
                field: "restore.poll_interval_ms",
                message: format!(
                    "{} out of range, using {}",
                    self.restore.poll_interval_ms, poll
                ),
            });
            self.restore.poll_interval_ms = poll;
        }

        if !self.restore.browser_command.contains("{url}") {
            warnings.push(ConfigWarning {
                field: "restore.browser_command",
                message: "has no {url} placeholder; PWA fallbacks will open the browser only"
                    .to_string(),
            });
        }

        warnings
    }
}

/// `$XDG_CONFIG_HOME/hypr/session-apps.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("hypr").join("session-apps.toml"))
}

/// `$XDG_STATE_HOME/hypr/session.json`, falling back to
/// `~/.local/state/hypr/session.json` where no state dir is defined.
pub fn default_session_path() -> Option<PathBuf> {
    let dirs = BaseDirs::new()?;
    let state = dirs
        .state_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dirs.home_dir().join(".local").join("state"));
    Some(state.join("hypr").join("session.json"))
}
