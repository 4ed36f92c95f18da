use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::LoopConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::demo::DemoConfig;
use super::platform::HeadlessConfig;

pub(crate) const CONFIG_ENV_VAR: &str = "ORION_CONFIG";
pub(crate) const RUN_SECONDS_ENV_VAR: &str = "ORION_RUN_SECONDS";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
}

/// Every section is optional; missing fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct GameConfig {
    #[serde(rename = "loop")]
    pub(crate) loop_config: LoopConfig,
    pub(crate) demo: DemoConfig,
    pub(crate) headless: HeadlessConfig,
}

pub(crate) struct AppWiring {
    pub(crate) config: GameConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, ConfigError> {
    info!("=== Orion Startup ===");

    let mut config = match env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        Some(path) => {
            let path = PathBuf::from(path);
            let config = load_config(&path)?;
            info!(path = %path.display(), "config_loaded");
            config
        }
        None => GameConfig::default(),
    };
    config.headless.run_seconds =
        resolve_run_seconds(env::var(RUN_SECONDS_ENV_VAR), config.headless.run_seconds);

    Ok(AppWiring { config })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn load_config(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw, path)
}

fn parse_config(raw: &str, path: &Path) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn resolve_run_seconds(value: Result<String, env::VarError>, config_run_seconds: f64) -> f64 {
    match value {
        Ok(value) => match value.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
            _ => {
                warn!(
                    env_var = RUN_SECONDS_ENV_VAR,
                    value = value.as_str(),
                    "invalid run-seconds env var value; falling back to config"
                );
                config_run_seconds
            }
        },
        Err(env::VarError::NotPresent) => config_run_seconds,
        Err(err) => {
            warn!(
                env_var = RUN_SECONDS_ENV_VAR,
                error = %err,
                "unable to read run-seconds env var; falling back to config"
            );
            config_run_seconds
        }
    }
}
