//! EPM Configuration
//!
//! Loads `config.yml` from the platform config directory (or an explicit
//! path), overlays `EPM_*` environment variables and turns the result into
//! a store handle and a confirmation policy.
//!
//! ```yaml
//! backend: file          # file | memory
//! root: /data/epm        # file backend directory
//! confirm: prompt        # prompt | yes | no
//! log_filter: info
//! ```

#![warn(missing_docs)]

mod config;
mod error;

pub use config::{Backend, Config, CONFIG_FILE, ENV_BACKEND, ENV_CONFIRM, ENV_LOG, ENV_ROOT};
pub use error::ConfigError;
