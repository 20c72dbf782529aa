//! Configuration loader
//!
//! Layers the optional JSON file and `EGRESS_PROXY_*` environment variables
//! over the defaults using the `config` crate.

use std::path::{Path, PathBuf};
use log::{debug, warn};
use config::{Config, Environment, File, FileFormat};

use crate::common::{ProxyError, Result};
use super::defaults;
use super::ProxyConfig;

/// Load configuration from file and environment
///
/// `config_file` wins over the file named by `EGRESS_PROXY_CONFIG_FILE`.
/// A named file that does not exist is skipped with a warning.
///
/// # Errors
///
/// Returns `ProxyError::Config` if a source cannot be read or a value has the wrong type.
pub fn load_config(config_file: Option<&Path>) -> Result<ProxyConfig> {
    let config_path = config_file
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(defaults::CONFIG_FILE_ENV).ok().map(PathBuf::from));

    let mut builder = Config::builder();

    let mut loaded_from = None;
    if let Some(path) = config_path {
        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path.clone()).format(FileFormat::Json));
            loaded_from = Some(path);
        } else {
            warn!("Configuration file not found: {}", path.display());
        }
    }

    builder = builder.add_source(Environment::with_prefix(defaults::ENV_PREFIX));

    let settings = builder
        .build()
        .map_err(|e| ProxyError::Config(format!("Failed to load configuration: {}", e)))?;

    let mut config: ProxyConfig = settings
        .try_deserialize()
        .map_err(|e| ProxyError::Config(format!("Failed to parse configuration: {}", e)))?;

    config.config_file = loaded_from;
    Ok(config)
}
