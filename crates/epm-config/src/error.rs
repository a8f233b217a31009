//! Error types for configuration loading

use std::path::PathBuf;

use epm_store::StoreError;

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("config io error at {path}: {source}")]
    Io {
        /// Config file or directory
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for [`Config`](crate::Config)
    #[error("invalid config file {path}: {source}")]
    Yaml {
        /// Config file being read or written
        path: PathBuf,
        /// Parser or emitter failure
        #[source]
        source: serde_yaml::Error,
    },

    /// A key holds a value outside its domain
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Config key
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The platform has no config or data directory for this user
    #[error("could not resolve the platform config directory")]
    NoConfigDir,

    /// Opening the configured store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ConfigError {
    /// Create io error
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create invalid value error
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
