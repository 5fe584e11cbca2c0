//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EML2MD_CONFIG` (environment variable)
//! 2. `~/.config/eml2md/config.toml` (Linux/macOS)
//!    `%APPDATA%\eml2md\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The loaded [`Config`] is passed explicitly to [`crate::convert::Converter`];
//! nothing in the library reads the environment on its own.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::project::ProjectRoots;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where projects and staged uploads live.
    pub storage: StorageConfig,
    /// Conversion limits.
    pub convert: ConvertConfig,
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

/// Storage layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// General project root.
    pub root_folder: PathBuf,
    /// Name of the inbox staging folder inside `root_folder`.
    pub inbox_folder: String,
    /// Directory for staged raw messages (defaults to the system temp dir).
    pub temp_dir: Option<PathBuf>,
}

/// Conversion limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Maximum slug length in the generated filename.
    pub max_slug_length: usize,
    /// Maximum raw message size in bytes (default: 52428800 = 50 MB).
    pub max_message_size: u64,
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

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_folder: PathBuf::from("output"),
            inbox_folder: "_from_email".to_string(),
            temp_dir: None,
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_slug_length: crate::normalize::DEFAULT_SLUG_LENGTH,
            max_message_size: 50 * 1024 * 1024, // 50 MB
        }
    }
}

impl StorageConfig {
    /// The inbox and general roots derived from this configuration.
    pub fn roots(&self) -> ProjectRoots {
        ProjectRoots::new(&self.root_folder, &self.inbox_folder)
    }

    /// Directory used for staged raw messages.
    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("eml2md"))
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Where [`load_config`] took the configuration from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// No config file exists.
    Defaults,
    /// Parsed from this file.
    File(PathBuf),
    /// The file exists but could not be read or parsed; defaults are used.
    Fallback { path: PathBuf, error: String },
}

impl ConfigOrigin {
    /// Log the origin. Call once the subscriber is installed.
    pub fn report(&self) {
        match self {
            Self::Defaults => tracing::debug!("No config file, using defaults"),
            Self::File(path) => tracing::info!(path = %path.display(), "Loaded config"),
            Self::Fallback { path, error } => tracing::warn!(
                path = %path.display(),
                error = %error,
                "Failed to load config, using defaults"
            ),
        }
    }
}

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error;
/// the returned [`ConfigOrigin`] says which happened.
pub fn load_config() -> (Config, ConfigOrigin) {
    load_config_from(config_file_path().as_deref())
}

/// Load configuration from `path`, falling back to defaults.
pub fn load_config_from(path: Option<&Path>) -> (Config, ConfigOrigin) {
    let Some(path) = path.filter(|p| p.exists()) else {
        return (Config::default(), ConfigOrigin::Defaults);
    };

    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|contents| toml::from_str::<Config>(&contents).map_err(|e| e.to_string()));

    match parsed {
        Ok(cfg) => (cfg, ConfigOrigin::File(path.to_path_buf())),
        Err(error) => (
            Config::default(),
            ConfigOrigin::Fallback {
                path: path.to_path_buf(),
                error,
            },
        ),
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EML2MD_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("eml2md").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eml2md")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.storage.inbox_folder, "_from_email");
        assert_eq!(cfg.convert.max_slug_length, 100);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.storage.root_folder, cfg.storage.root_folder);
        assert_eq!(parsed.convert.max_message_size, cfg.convert.max_message_size);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[storage]
root_folder = "/srv/projects"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.storage.root_folder, PathBuf::from("/srv/projects"));
        assert_eq!(cfg.storage.inbox_folder, "_from_email");
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_roots_from_storage() {
        let storage = StorageConfig {
            root_folder: PathBuf::from("/srv/projects"),
            inbox_folder: "_inbox".into(),
            temp_dir: Some(PathBuf::from("/tmp/stage")),
        };
        let roots = storage.roots();
        assert_eq!(roots.general, PathBuf::from("/srv/projects"));
        assert_eq!(roots.inbox, PathBuf::from("/srv/projects/_inbox"));
        assert_eq!(storage.staging_dir(), PathBuf::from("/tmp/stage"));
    }

    #[test]
    fn test_load_config_origins() {
        let tmp = tempfile::tempdir().unwrap();

        let missing = tmp.path().join("missing.toml");
        let (cfg, origin) = load_config_from(Some(&missing));
        assert_eq!(origin, ConfigOrigin::Defaults);
        assert_eq!(cfg.storage.inbox_folder, "_from_email");

        let good = tmp.path().join("good.toml");
        std::fs::write(&good, "[storage]\ninbox_folder = \"_mail\"\n").unwrap();
        let (cfg, origin) = load_config_from(Some(&good));
        assert_eq!(origin, ConfigOrigin::File(good.clone()));
        assert_eq!(cfg.storage.inbox_folder, "_mail");

        let broken = tmp.path().join("broken.toml");
        std::fs::write(&broken, "[storage\ninbox_folder = ").unwrap();
        let (cfg, origin) = load_config_from(Some(&broken));
        assert!(matches!(origin, ConfigOrigin::Fallback { ref path, .. } if *path == broken));
        assert_eq!(cfg.storage.inbox_folder, "_from_email");
    }
}
