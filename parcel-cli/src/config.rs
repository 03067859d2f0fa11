//! CLI configuration management

use anyhow::{Context, Result};
use parcel_core::catalog::CATALOG_SERVICE_URL;
use parcel_core::kubernetes::client::default_kubeconfig_path;
use parcel_core::kubernetes::VOLUME_NAMESPACE;
use parcel_core::logging::{LogRotation, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_service_url: String,
    pub namespace: String,
    pub kubernetes_config_path: Option<PathBuf>,
    pub log_level: String,
    /// Directory for rolling JSON log files
    pub log_file: Option<PathBuf>,
    pub log_rotation: LogRotation,
    /// JSON on stderr instead of plain text
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_service_url: CATALOG_SERVICE_URL.to_string(),
            namespace: VOLUME_NAMESPACE.to_string(),
            kubernetes_config_path: default_kubeconfig_path(),
            log_level: "warn".to_string(),
            log_file: None,
            log_rotation: LogRotation::Daily,
            log_json: false,
        }
    }
}

/// Values a command runs with, after command-line overrides
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub catalog_service_url: String,
    pub namespace: String,
    /// None means infer the cluster from the environment
    pub kubeconfig: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Read a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home).join(".config/parcel/config.toml"))
    }

    /// Logging setup for this config and a `-v` count
    pub fn logging(&self, verbosity: u8) -> LoggingConfig {
        LoggingConfig {
            level: LoggingConfig::level_for_verbosity(&self.log_level, verbosity),
            file_path: self.log_file.clone(),
            rotation: self.log_rotation,
            json_format: self.log_json,
        }
    }

    /// Apply command-line overrides
    ///
    /// An explicit `--kubeconfig` is always used. The configured path is only
    /// used if the file exists; otherwise the client infers its config.
    pub fn resolve(
        &self,
        svcurl: Option<String>,
        namespace: Option<String>,
        kubeconfig: Option<PathBuf>,
    ) -> Settings {
        let kubeconfig = kubeconfig.or_else(|| {
            self.kubernetes_config_path
                .clone()
                .filter(|path| path.exists())
        });

        Settings {
            catalog_service_url: svcurl.unwrap_or_else(|| self.catalog_service_url.clone()),
            namespace: namespace.unwrap_or_else(|| self.namespace.clone()),
            kubeconfig,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config {
            catalog_service_url: "http://catalog.example.org:9000".to_string(),
            namespace: "datasets".to_string(),
            kubernetes_config_path: Some(PathBuf::from("/etc/kube/admin.conf")),
            log_level: "debug".to_string(),
            log_file: Some(dir.path().join("logs")),
            log_rotation: LogRotation::Hourly,
            log_json: true,
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.catalog_service_url, "http://localhost:8080");
        assert_eq!(config.namespace, "default");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "namespace = \"science\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.namespace, "science");
        assert_eq!(config.catalog_service_url, CATALOG_SERVICE_URL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "namespace = [").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_logging_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let log_dir = dir.path().join("logs");
        std::fs::write(
            &path,
            format!(
                "log_level = \"info\"\nlog_file = {:?}\nlog_rotation = \"never\"\nlog_json = true\n",
                log_dir.display().to_string()
            ),
        )
        .unwrap();

        let logging = Config::load_from(&path).unwrap().logging(1);
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.file_path, Some(log_dir.clone()));
        assert_eq!(logging.rotation, LogRotation::Never);
        assert!(logging.json_format);

        let mut appender = logging.file_appender().unwrap().unwrap();
        std::io::Write::write_all(&mut appender, b"ok").unwrap();
        std::io::Write::flush(&mut appender).unwrap();
        assert!(log_dir.join("parcel.log").exists());
    }

    #[test]
    fn test_default_logging_has_no_file() {
        let logging = Config::default().logging(0);
        assert_eq!(logging.level, "warn");
        assert!(logging.file_path.is_none());
        assert!(!logging.json_format);
    }

    #[test]
    fn test_resolve_overrides() {
        let dir = TempDir::new().unwrap();
        let kubeconfig = dir.path().join("kubeconfig");
        std::fs::write(&kubeconfig, "").unwrap();

        let config = Config {
            kubernetes_config_path: Some(kubeconfig.clone()),
            ..Config::default()
        };

        let settings = config.resolve(None, None, None);
        assert_eq!(settings.catalog_service_url, CATALOG_SERVICE_URL);
        assert_eq!(settings.namespace, VOLUME_NAMESPACE);
        assert_eq!(settings.kubeconfig, Some(kubeconfig));

        let settings = config.resolve(
            Some("http://other:8080".to_string()),
            Some("lab".to_string()),
            Some(PathBuf::from("/explicit/kubeconfig")),
        );
        assert_eq!(settings.catalog_service_url, "http://other:8080");
        assert_eq!(settings.namespace, "lab");
        assert_eq!(settings.kubeconfig, Some(PathBuf::from("/explicit/kubeconfig")));
    }

    #[test]
    fn test_resolve_missing_kubeconfig_falls_back_to_inference() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            kubernetes_config_path: Some(dir.path().join("missing")),
            ..Config::default()
        };

        assert_eq!(config.resolve(None, None, None).kubeconfig, None);
    }
}
