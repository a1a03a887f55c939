//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MIMEVIEW_CONFIG` (environment variable)
//! 2. `~/.config/mimeview/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimeview\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Message viewer settings.
    pub viewer: ViewerConfig,
    /// Filter rules, evaluated in order; the first match wins.
    pub filters: Vec<FilterConfig>,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Message viewer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Command every part is piped into for display. Shell-tokenized.
    pub pager: String,
    /// Preferred `type/subtype` order for picking the initial part.
    pub alternatives: Vec<String>,
    /// Write the message header fields into the pager before the body.
    pub show_headers: bool,
    /// Show the part selector even when there is only one part.
    pub always_show_mime: bool,
    /// Header summary rows; each row is a list of header names.
    pub header_layout: Vec<Vec<String>>,
}

/// One `[[filters]]` entry.
///
/// Exactly one of `mimetype` or `header` + `regex` selects the parts the
/// rule applies to. An empty `command` sends the part straight to the pager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Glob matched against the part's `type/subtype`.
    pub mimetype: Option<String>,
    /// Header to match: `subject`, `from`, `to` or `cc`.
    pub header: Option<String>,
    /// Regular expression matched against the header value.
    pub regex: Option<String>,
    /// Shell command run with `sh -c`.
    pub command: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            pager: "cat".to_string(),
            alternatives: vec!["text/plain".to_string(), "text/html".to_string()],
            show_headers: false,
            always_show_mime: false,
            header_layout: vec![
                vec!["From".to_string(), "To".to_string()],
                vec!["Cc".to_string(), "Bcc".to_string()],
                vec!["Date".to_string()],
                vec!["Subject".to_string()],
            ],
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => default_config(),
    }
}

/// Load configuration from an explicit file, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), filters = cfg.filters.len(), "Loaded config");
                with_default_filters(cfg)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                with_default_filters(Config::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            with_default_filters(Config::default())
        }
    }
}

/// A config without any filter would render nothing; give text a pass-through.
fn with_default_filters(mut cfg: Config) -> Config {
    if cfg.filters.is_empty() {
        cfg.filters.push(FilterConfig {
            mimetype: Some("text/*".to_string()),
            command: "cat".to_string(),
            ..Default::default()
        });
    }
    cfg
}

/// The built-in configuration, default filter included.
pub fn default_config() -> Config {
    with_default_filters(Config::default())
}

/// Write `config` to `path`, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MIMEVIEW_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mimeview").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mimeview")
}
