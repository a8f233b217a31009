//! Config file plus environment overrides

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use directories::ProjectDirs;
use epm_params::{Confirm, ConfirmPolicy};
use epm_store::{DocumentStore, JsonFileStore, MemoryStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// File name inside the platform config directory
pub const CONFIG_FILE: &str = "config.yml";

/// Overrides `backend`
pub const ENV_BACKEND: &str = "EPM_BACKEND";
/// Overrides `root`
pub const ENV_ROOT: &str = "EPM_ROOT";
/// Overrides `confirm`
pub const ENV_CONFIRM: &str = "EPM_CONFIRM";
/// Overrides `log_filter`
pub const ENV_LOG: &str = "EPM_LOG";

/// Which [`DocumentStore`] implementation to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// One JSON file per collection under `root`
    #[default]
    File,
    /// Process-local, nothing persisted
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::invalid_value(
                "backend",
                format!("unknown backend '{other}' (expected file or memory)"),
            )),
        }
    }
}

/// Tool configuration
///
/// Every key is optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Store backend
    pub backend: Backend,
    /// Directory of the file backend; platform data dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// How schema changes and deletions are confirmed
    pub confirm: ConfirmPolicy,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            root: None,
            confirm: ConfirmPolicy::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// `config.yml` under the platform config directory
    ///
    /// # Errors
    /// [`ConfigError::NoConfigDir`] when no home directory is known.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
    }

    /// Load `path` (or the default path) and apply environment overrides
    ///
    /// # Errors
    /// Unreadable or malformed file, bad override values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let mut config = Self::from_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a config file; a missing file yields the defaults
    ///
    /// # Errors
    /// IO errors other than not-found, and YAML errors.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(path, &text),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::io_error(path, err)),
        }
    }

    fn from_yaml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay values found through `lookup`, keyed by the `EPM_*` names
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for an unknown backend or policy.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BACKEND) {
            self.backend = value.parse()?;
        }
        if let Some(value) = lookup(ENV_ROOT) {
            self.root = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_CONFIRM) {
            self.confirm = value
                .parse()
                .map_err(|reason: String| ConfigError::invalid_value("confirm", reason))?;
        }
        if let Some(value) = lookup(ENV_LOG) {
            self.log_filter = value;
        }
        Ok(())
    }

    /// Directory the file backend writes to
    ///
    /// # Errors
    /// [`ConfigError::NoConfigDir`] when `root` is unset and no data
    /// directory is known.
    pub fn store_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(project_dirs()?.data_dir().join("store")),
        }
    }

    /// Open the configured backend
    ///
    /// # Errors
    /// Store root resolution and store open failures.
    pub fn open_store(&self) -> Result<Arc<dyn DocumentStore>, ConfigError> {
        match self.backend {
            Backend::Memory => {
                warn!("memory backend selected, records last only for this process");
                Ok(Arc::new(MemoryStore::new()))
            }
            Backend::File => {
                let root = self.store_root()?;
                info!(root = %root.display(), "opening json file store");
                Ok(Arc::new(JsonFileStore::open(root)?))
            }
        }
    }

    /// Confirmation source for the configured policy
    #[must_use]
    pub fn confirmer(&self) -> Box<dyn Confirm> {
        self.confirm.into_confirm()
    }

    /// Write a default config file at `path` unless one exists
    ///
    /// Returns `true` when a file was written.
    ///
    /// # Errors
    /// IO errors creating the directory or the file.
    pub fn write_default(path: &Path) -> Result<bool, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ConfigError::io_error(parent, err))?;
        }
        let text = serde_yaml::to_string(&Self::default()).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "config file exists, leaving it alone");
                return Ok(false);
            }
            Err(err) => return Err(ConfigError::io_error(path, err)),
        };
        file.write_all(text.as_bytes())
            .map_err(|err| ConfigError::io_error(path, err))?;
        info!(path = %path.display(), "wrote default config");
        Ok(true)
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("", "", "epm").ok_or(ConfigError::NoConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use epm_store::Namespace;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.confirm, ConfirmPolicy::Prompt);
        assert_eq!(config.log_filter, "info");
        assert!(config.root.is_none());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml(Path::new("c.yml"), "backend: memory\n").unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn empty_yaml_is_default() {
        let config = Config::from_yaml(Path::new("c.yml"), "  \n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_key_rejected() {
        let result = Config::from_yaml(Path::new("c.yml"), "host: localhost\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::from_yaml(
            Path::new("c.yml"),
            "backend: memory\nconfirm: prompt\nlog_filter: warn\n",
        )
        .unwrap();
        config
            .apply_env(env(&[
                (ENV_BACKEND, "file"),
                (ENV_ROOT, "/tmp/epm"),
                (ENV_CONFIRM, "yes"),
                (ENV_LOG, "epm_params=debug"),
            ]))
            .unwrap();
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.root, Some(PathBuf::from("/tmp/epm")));
        assert_eq!(config.confirm, ConfirmPolicy::Yes);
        assert_eq!(config.log_filter, "epm_params=debug");
    }

    #[test]
    fn bad_env_values_rejected() {
        let mut config = Config::default();
        assert!(matches!(
            config.apply_env(env(&[(ENV_BACKEND, "mongo")])),
            Err(ConfigError::InvalidValue { key, .. }) if key == "backend"
        ));
        assert!(matches!(
            config.apply_env(env(&[(ENV_CONFIRM, "maybe")])),
            Err(ConfigError::InvalidValue { key, .. }) if key == "confirm"
        ));
    }

    #[test]
    fn explicit_root_wins() {
        let config = Config {
            root: Some(PathBuf::from("/data/epm")),
            ..Config::default()
        };
        assert_eq!(config.store_root().unwrap(), PathBuf::from("/data/epm"));
    }

    #[test]
    fn memory_backend_opens_empty_store() {
        let config = Config {
            backend: Backend::Memory,
            ..Config::default()
        };
        let store = config.open_store().unwrap();
        let ns = Namespace::new("p", "c");
        assert_eq!(store.count(&ns).unwrap(), 0);
    }
}
