use buildinfra::service::client::ClientConfig;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "BUILDINFRA";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Other(#[from] config::ConfigError),

    #[error("Orchestrator host must start with http:// or https://, got {0}")]
    InvalidHost(String),
}

#[derive(Debug, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl OrchestratorSettings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            token: self.token.clone().filter(|token| !token.is_empty()),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub orchestrator: OrchestratorSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(config_path().as_deref())
    }

    /// Defaults, then the config file when it exists, then `BUILDINFRA_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("orchestrator.host", default_host())?
            .set_default("orchestrator.timeout_secs", default_timeout_secs())?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = config.try_deserialize()?;
        tracing::debug!(host = %settings.orchestrator.host, "loaded settings");

        let host = &settings.orchestrator.host;
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ConfigError::InvalidHost(host.clone()));
        }
        Ok(settings)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("buildinfra").join("config.toml"))
}

fn default_host() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}
