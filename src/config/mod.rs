//! Configuration management for novelscout.
//!
//! Configuration is read from `~/.config/novelscout/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod ai;
pub mod download;

pub use ai::AiConfig;
pub use download::DownloadConfig;

use crate::evasion::EvasionConfig;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace root used when `--workspace` is not given
    pub workspace: Option<PathBuf>,
    pub download: DownloadConfig,
    pub evasion: EvasionConfig,
    pub ai: AiConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating it when absent.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/novelscout/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("novelscout").join("config.toml"))
    }

    /// Pick the workspace root: explicit override, then config, then the current directory.
    pub fn workspace_root(&self, override_root: Option<&Path>) -> PathBuf {
        override_root
            .map(Path::to_path_buf)
            .or_else(|| self.workspace.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> &'static str {
        r##"# novelscout configuration
#
# Every key is optional; anything left out falls back to the value shown here.

# Default workspace root. Downloads land in <workspace>/downloads,
# logs in <workspace>/logs and exports in <workspace>/result.
# workspace = "/home/me/novels"

[download]
# Attempts per catalog, chapter list and chapter fetch
retries = 3

# Pause between attempts (milliseconds)
retry_delay_ms = 500

# Pause between consecutive chapter fetches (milliseconds)
chapter_delay_ms = 200

# Chapter fetches in flight for one novel; files are still written in order
chapter_concurrency = 1

# Novels downloaded at once during a rank scan
rank_concurrency = 2

# Plain HTTP request timeout (seconds)
request_timeout_secs = 30

[evasion]
# Fall back to a Chromium session when a site serves a verification page
enabled = true

# Show the browser window so challenges can be solved by hand
visible = false

# How long to wait for the real page before giving up (seconds)
timeout_secs = 45

# How often the page is checked while waiting (milliseconds)
poll_interval_ms = 500

# Extra wait once the page looks ready (milliseconds)
settle_ms = 2000

# Extra selectors or markers can be listed here; these replace the built-in lists.
# success_selectors = [".y-list__item", ".chapter-item-title"]
# challenge_markers = ["just a moment", "security checking"]

[ai]
# Any OpenAI-compatible endpoint
api_base = "https://api.openai.com/v1"
api_key = ""
model = "gpt-4o-mini"
temperature = 0.7

# Leading chapters sent to whole-novel analysis
auto_chapters = 5

# Leave empty to use the built-in prompts
auto_prompt = ""
chapter_prompt = ""
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
