//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables, then command-line flags (applied in `main`).
//! A missing config file yields `Config::default()`. Unknown keys are
//! accepted but logged, since they are most likely typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// An environment override could not be interpreted
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Socket address the HTTP server binds to.
    pub listen: String,

    /// Public base URL used to build media links (no trailing slash needed).
    pub base_url: String,

    /// SQLite catalog location.
    pub database_path: PathBuf,

    /// Root directory for downloaded media, served under `/media`.
    pub media_dir: PathBuf,

    /// `yt-dlp` executable name or path.
    pub yt_dlp_path: PathBuf,

    /// Source feed fetch timeout.
    pub fetch_timeout_secs: u64,

    /// Timeout for a single shorts/country probe.
    pub probe_timeout_secs: u64,

    /// Host probed by the shorts and country filters.
    pub probe_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            base_url: "http://localhost:3000".to_string(),
            database_path: PathBuf::from("storage/podcasts.db"),
            media_dir: PathBuf::from("storage/media"),
            yt_dlp_path: PathBuf::from("yt-dlp"),
            fetch_timeout_secs: 30,
            probe_timeout_secs: 10,
            probe_base_url: "https://www.youtube.com".to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "listen",
        "base_url",
        "database_path",
        "media_dir",
        "yt_dlp_path",
        "fetch_timeout_secs",
        "probe_timeout_secs",
        "probe_base_url",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to bound memory use
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Applies environment overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// `BASE_URL`, `FEEDCAST_LISTEN`, `FEEDCAST_DATABASE`, `FEEDCAST_MEDIA_DIR`,
    /// `FEEDCAST_YT_DLP`, `FEEDCAST_FETCH_TIMEOUT_SECS` and
    /// `FEEDCAST_PROBE_TIMEOUT_SECS` are recognized. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("FEEDCAST_LISTEN") {
            self.listen = v;
        }
        if let Some(v) = get("FEEDCAST_DATABASE") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("FEEDCAST_MEDIA_DIR") {
            self.media_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FEEDCAST_YT_DLP") {
            self.yt_dlp_path = PathBuf::from(v);
        }
        if let Some(v) = get("FEEDCAST_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_secs("FEEDCAST_FETCH_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = get("FEEDCAST_PROBE_TIMEOUT_SECS") {
            self.probe_timeout_secs = parse_secs("FEEDCAST_PROBE_TIMEOUT_SECS", v)?;
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn parse_secs(name: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen, "0.0.0.0:3000");
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
        assert_eq!(config.probe_base_url, "https://www.youtube.com");
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "  \n").unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "base_url = \"https://pods.example\"\nmedia_dir = \"/srv/media\"\nunknown_key = 1\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, "https://pods.example");
        assert_eq!(config.media_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.listen, "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "listen = ").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, vec![b'#'; (Config::MAX_FILE_SIZE + 1) as usize]).unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::TooLarge(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BASE_URL", "https://env.example"),
            ("FEEDCAST_MEDIA_DIR", "/env/media"),
            ("FEEDCAST_LISTEN", ""),
            ("FEEDCAST_PROBE_TIMEOUT_SECS", "3"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_from(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.base_url, "https://env.example");
        assert_eq!(config.media_dir, PathBuf::from("/env/media"));
        assert_eq!(config.listen, "0.0.0.0:3000");
        assert_eq!(config.probe_timeout_secs, 3);
    }

    #[test]
    fn test_invalid_env_timeout() {
        let mut config = Config::default();
        let result = config.apply_env_from(|name| {
            (name == "FEEDCAST_FETCH_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }
}
