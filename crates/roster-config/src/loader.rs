use std::path::{Path, PathBuf};

use roster_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

pub const ENV_SERVER_HOST: &str = "SERVER_HOST";
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
pub const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
pub const ENV_MIGRATIONS_DIR: &str = "MIGRATIONS_DIR";

/// Builds an `AppConfig` from an optional config file plus environment
/// overrides. Environment variables always win over the file.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => AppConfig::default(),
        };
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}")))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}")))?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other}"
                )));
            }
        };

        info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get(ENV_SERVER_HOST) {
            debug!("{} overrides server.host", ENV_SERVER_HOST);
            config.server.host = host;
        }
        if let Some(port) = get(ENV_SERVER_PORT) {
            config.server.port = port.parse().map_err(|_| {
                Error::Config(format!("{ENV_SERVER_PORT} is not a valid port: {port}"))
            })?;
        }
        if let Some(path) = get(ENV_DATABASE_PATH) {
            config.database.path = PathBuf::from(path);
        }
        if let Some(dir) = get(ENV_MIGRATIONS_DIR) {
            config.database.migrations_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}
