//! Configuration file support for the flipbook viewer.
//!
//! `ViewerConfig` holds the viewer options (camelCase JSON, every field defaulted).
//! `AppConfig` wraps it with a format version and handles persistence: a JSON file
//! in the user config directory on native, `localStorage` on wasm.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_AUTO_PLAY_INTERVAL_MS, DEFAULT_JUMP_STEP_DELAY_MS,
    DEFAULT_PRECACHE_FIRST_PAGES, DEFAULT_PREFETCH_AHEAD, DEFAULT_PRELOAD_PAGES,
    DEFAULT_SEARCH_PATH,
};

/// Verbosity of the viewer's logging. Serialized lowercase (`"debug"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        log::LevelFilter::from(self)
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Format version written to new files. Files from a newer version are refused.
pub const CONFIG_VERSION: u32 = 1;

/// Options for one viewer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    /// Read and write the `page` query parameter
    pub enable_url_sync: bool,
    pub auto_play_on_mount: bool,
    pub auto_play_interval_ms: u64,
    /// Buffer radius of the lazy loader
    pub preload_pages: usize,
    /// Pages ahead of the current one handed to the cache for pre-fetch
    pub prefetch_ahead: usize,
    /// Pages the cache warms right after the catalog loads
    pub precache_first_pages: usize,
    pub jump_step_delay_ms: u64,
    pub enable_keyboard: bool,
    pub show_thumbnails: bool,
    #[serde(alias = "showTOC")]
    pub show_toc: bool,
    pub show_page_numbers: bool,
    /// Treat page 0 as a cover that opens with a short transition
    pub show_cover: bool,
    /// Fetch the catalog and page images off the UI thread. The browser build
    /// always does.
    pub use_background_worker: bool,
    /// Backend origin used to resolve relative image URLs
    pub api_url: String,
    /// Path of the product search page for SKU-only hotspots
    pub search_path: String,
    pub log_level: LogLevel,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            enable_url_sync: true,
            auto_play_on_mount: false,
            auto_play_interval_ms: DEFAULT_AUTO_PLAY_INTERVAL_MS,
            preload_pages: DEFAULT_PRELOAD_PAGES,
            prefetch_ahead: DEFAULT_PREFETCH_AHEAD,
            precache_first_pages: DEFAULT_PRECACHE_FIRST_PAGES,
            jump_step_delay_ms: DEFAULT_JUMP_STEP_DELAY_MS,
            enable_keyboard: true,
            show_thumbnails: false,
            show_toc: false,
            show_page_numbers: true,
            show_cover: true,
            use_background_worker: true,
            api_url: DEFAULT_API_URL.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            log_level: LogLevel::default(),
        }
    }
}

impl ViewerConfig {
    pub fn auto_play_interval(&self) -> Duration {
        Duration::from_millis(self.auto_play_interval_ms.max(1))
    }

    pub fn jump_step_delay(&self) -> Duration {
        Duration::from_millis(self.jump_step_delay_ms)
    }

    /// Backend origin without a trailing slash.
    pub fn api_origin(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

/// Persisted settings: the viewer options plus a format version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            viewer: ViewerConfig::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a config document. Unknown viewer fields are ignored and missing ones
    /// take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                found: config.version,
                supported: CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "flipbook-config.json"
    }

    /// `<config dir>/flipbook/flipbook-config.json`, or under `~/.config` when the
    /// platform has no config dir.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
        Some(base.join("flipbook").join(Self::default_filename()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Write to `path`, creating missing directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Wrote config to {}", path.display());
        Ok(())
    }

    /// Config from the default path. `None` when there is no file or it is unusable;
    /// an unusable file is logged.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.is_file() {
            log::debug!("No config at {}", path.display());
            return None;
        }
        Self::load_from(&path)
            .inspect(|_| log::info!("Loaded config from {}", path.display()))
            .inspect_err(|e| log::warn!("Ignoring config {}: {}", path.display(), e))
            .ok()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path()
            .ok_or_else(|| ConfigError::Storage("no config directory on this platform".to_string()))?;
        self.save_to(&path)
    }

    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "flipbook-config";

    #[cfg(target_arch = "wasm32")]
    fn local_storage() -> Result<web_sys::Storage, ConfigError> {
        let window =
            web_sys::window().ok_or_else(|| ConfigError::Storage("no window".to_string()))?;
        window
            .local_storage()
            .map_err(|e| ConfigError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| ConfigError::Storage("localStorage disabled".to_string()))
    }

    /// Config saved in `localStorage`, if any. Problems are logged, not returned.
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let stored = Self::local_storage().and_then(|storage| {
            storage
                .get_item(Self::STORAGE_KEY)
                .map_err(|e| ConfigError::Storage(format!("{:?}", e)))
        });
        match stored {
            Ok(Some(json)) => Self::from_json(&json)
                .inspect_err(|e| log::warn!("Ignoring stored config: {}", e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Cannot read stored config: {}", e);
                None
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        let json = self.to_json()?;
        Self::local_storage()?
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|e| ConfigError::Storage(format!("{:?}", e)))?;
        log::info!("Stored config in localStorage");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config version {found} is newer than this build understands ({supported})")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config storage unavailable: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"version": 1, "viewer": {"preloadPages": 5, "showTOC": true,
                       "logLevel": "debug", "apiUrl": "https://api.example.com/"}}"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.viewer.preload_pages, 5);
        assert!(config.viewer.show_toc);
        assert_eq!(config.viewer.log_level, LogLevel::Debug);
        assert_eq!(config.viewer.api_origin(), "https://api.example.com");
        assert_eq!(config.viewer.auto_play_interval_ms, 3000);
        assert!(config.viewer.enable_url_sync);
        assert!(config.viewer.show_cover);
    }

    #[test]
    fn test_version_too_new() {
        let err = AppConfig::from_json(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::VersionTooNew {
                found: 99,
                supported: CONFIG_VERSION
            }
        ));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            AppConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(AppConfig::default_filename());

        let mut config = AppConfig::new();
        config.viewer.jump_step_delay_ms = 40;
        config.viewer.log_level = LogLevel::Trace;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(matches!(
            AppConfig::load_from(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_log_level_filters() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(
            log::LevelFilter::from(LogLevel::default()),
            log::LevelFilter::Info
        );
    }
}
