use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::http::DEFAULT_BACKEND_URL;

/// Environment variable that overrides the configured backend url
pub const BACKEND_URL_ENV: &str = "LVC_BACKEND_URL";

const APP_DIR: &str = "lvc-portal";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub backend_url: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user's config directory. A missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)
    }

    /// Fold command-line overrides into the stored settings.
    /// Returns whether anything changed.
    pub fn remember(&mut self, backend_url: Option<&str>, download_dir: Option<&Path>) -> bool {
        let mut changed = false;
        if let Some(url) = backend_url {
            changed |= self.backend_url.as_deref() != Some(url);
            self.backend_url = Some(url.to_string());
        }
        if let Some(dir) = download_dir {
            changed |= self.download_dir.as_deref() != Some(dir);
            self.download_dir = Some(dir.to_path_buf());
        }
        changed
    }

    /// Backend url, with `LVC_BACKEND_URL` taking precedence over the file
    pub fn backend_url(&self) -> String {
        pick_backend_url(std::env::var(BACKEND_URL_ENV).ok(), self.backend_url.as_deref())
    }

    /// Where downloaded reports are written
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR))
    }

    pub fn log_dir() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("logs"))
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

fn pick_backend_url(env: Option<String>, configured: Option<&str>) -> String {
    env.filter(|url| !url.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            backend_url: Some("http://10.0.0.5:8000".into()),
            download_dir: Some(dir.path().join("pdfs")),
            request_timeout_secs: Some(120),
            log_level: Some("debug".into()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(loaded.download_dir(), dir.path().join("pdfs"));
    }

    #[test]
    fn test_remember_overrides_then_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config {
            log_level: Some("info".into()),
            ..Config::new()
        };

        assert!(!config.remember(None, None));
        assert!(config.remember(Some("http://10.0.0.5:8000"), Some(Path::new("/tmp/pdfs"))));
        assert!(!config.remember(Some("http://10.0.0.5:8000"), None));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.backend_url.as_deref(), Some("http://10.0.0.5:8000"));
        assert_eq!(loaded.download_dir, Some(PathBuf::from("/tmp/pdfs")));
        assert_eq!(loaded.log_level.as_deref(), Some("info"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"backend_url":"http://example:9000"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend_url.as_deref(), Some("http://example:9000"));
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = Config {
            request_timeout_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_backend_url_precedence() {
        assert_eq!(pick_backend_url(None, None), DEFAULT_BACKEND_URL);
        assert_eq!(pick_backend_url(None, Some("http://file")), "http://file");
        assert_eq!(
            pick_backend_url(Some("http://env".into()), Some("http://file")),
            "http://env"
        );
        assert_eq!(pick_backend_url(Some("  ".into()), Some("http://file")), "http://file");
    }
}
