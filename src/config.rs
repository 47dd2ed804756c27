//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSMOKE_CONFIG` (environment variable)
//! 2. `~/.config/mailsmoke/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailsmoke\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where attachments come from.
    pub library: LibraryConfig,
    /// Message rendering defaults.
    pub render: RenderConfig,
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

/// Attachment library settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directories scanned when none are given on the command line.
    pub roots: Vec<PathBuf>,
}

/// Rendering defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Seed for `fake`, so renders repeat.
    pub seed: Option<u64>,
    /// Domain used in generated Message-IDs.
    pub message_domain: String,
    /// Default directory for rendered `.eml` files.
    pub output_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            seed: None,
            message_domain: "mailsmoke.local".to_string(),
            output_dir: None,
        }
    }
}

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from `path`, falling back to defaults on any error.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSMOKE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailsmoke").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsmoke")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailsmoke.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert!(cfg.library.roots.is_empty());
        assert_eq!(cfg.render.message_domain, "mailsmoke.local");
        assert!(cfg.render.seed.is_none());
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.library.roots = vec![PathBuf::from("/srv/attachments")];
        cfg.render.seed = Some(99);
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.library.roots, cfg.library.roots);
        assert_eq!(parsed.render.seed, Some(99));
        assert_eq!(parsed.render.message_domain, cfg.render.message_domain);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[library]
roots = ["/a", "/b"]

[render]
seed = 7
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.library.roots.len(), 2);
        assert_eq!(cfg.render.seed, Some(7));
        // Other fields use defaults
        assert_eq!(cfg.render.message_domain, "mailsmoke.local");
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_load_config_from_bad_file_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[render\nseed = ").unwrap();
        let cfg = load_config_from(&path);
        assert_eq!(cfg.render.message_domain, "mailsmoke.local");

        let missing = load_config_from(&tmp.path().join("nope.toml"));
        assert!(missing.render.seed.is_none());
    }

    #[test]
    fn test_log_file_path_uses_cache_override() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/smoke-cache"));
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/tmp/smoke-cache/mailsmoke.log")
        );
    }
}
