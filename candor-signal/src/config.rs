//! Service configuration
//!
//! Resolution priority: command-line argument (clap also reads the
//! matching environment variable), then the TOML config file, then
//! the compiled default.

use std::path::PathBuf;

use clap::Parser;

use candor_common::config::{find_config_file, toml_int, toml_str};
use candor_common::{Error, Result};

use crate::oracle::OracleSettings;

const DEFAULT_PORT: u16 = 5731;
const DEFAULT_EXTRACTION_INTERVAL: u32 = 6;

/// Read an optional integer setting, rejecting values that do not fit
/// the target type (negative durations, ports above 65535)
fn int_setting<T: TryFrom<i64>>(file: Option<&toml::Value>, key: &str) -> Result<Option<T>> {
    match file.and_then(|f| toml_int(f, key)) {
        Some(value) => T::try_from(value).map(Some).map_err(|_| {
            Error::Config(format!("{} value {} is out of range", key, value))
        }),
        None => Ok(None),
    }
}

/// candor-signal - live interview signal service
#[derive(Debug, Parser)]
#[command(name = "candor-signal", version)]
pub struct Args {
    /// HTTP listen port
    #[arg(long, env = "CANDOR_PORT")]
    pub port: Option<u16>,

    /// Path to the TOML config file
    #[arg(long, env = "CANDOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the company culture document
    #[arg(long, env = "CANDOR_CULTURE_FILE")]
    pub culture_file: Option<PathBuf>,

    /// Oracle chat-completions endpoint URL
    #[arg(long, env = "CANDOR_ORACLE_URL")]
    pub oracle_url: Option<String>,

    /// Oracle API key
    #[arg(long, env = "CANDOR_ORACLE_API_KEY")]
    pub oracle_api_key: Option<String>,

    /// Oracle model identifier
    #[arg(long, env = "CANDOR_ORACLE_MODEL")]
    pub oracle_model: Option<String>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub port: u16,
    pub culture_file: Option<PathBuf>,
    pub extraction_interval: u32,
    pub oracle: OracleSettings,
}

impl SignalConfig {
    /// Resolve configuration from CLI/env arguments plus the optional
    /// TOML file. A missing file means compiled defaults; an existing
    /// but unreadable or unparseable file is a configuration error.
    pub fn load(args: &Args) -> Result<Self> {
        let file = match args.config.clone().or_else(find_config_file) {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let value: toml::Value = toml::from_str(&text).map_err(|e| {
                    Error::Config(format!("Failed to parse {}: {}", path.display(), e))
                })?;
                tracing::info!(path = %path.display(), "Configuration file loaded");
                Some(value)
            }
            None => None,
        };

        let file_ref = file.as_ref();
        let defaults = OracleSettings::default();

        let oracle = OracleSettings {
            base_url: args
                .oracle_url
                .clone()
                .or_else(|| file_ref.and_then(|f| toml_str(f, "oracle_url")))
                .unwrap_or(defaults.base_url),
            api_key: args
                .oracle_api_key
                .clone()
                .or_else(|| file_ref.and_then(|f| toml_str(f, "oracle_api_key"))),
            model: args
                .oracle_model
                .clone()
                .or_else(|| file_ref.and_then(|f| toml_str(f, "oracle_model")))
                .unwrap_or(defaults.model),
            timeout_secs: int_setting::<u64>(file_ref, "oracle_timeout_secs")?
                .unwrap_or(defaults.timeout_secs),
            min_interval_ms: int_setting::<u64>(file_ref, "oracle_min_interval_ms")?
                .unwrap_or(defaults.min_interval_ms),
        };

        let port = match args.port {
            Some(port) => port,
            None => int_setting::<u16>(file_ref, "port")?.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            port,
            culture_file: args
                .culture_file
                .clone()
                .or_else(|| file_ref.and_then(|f| toml_str(f, "culture_file")).map(PathBuf::from)),
            extraction_interval: int_setting::<u32>(file_ref, "extraction_interval")?
                .unwrap_or(DEFAULT_EXTRACTION_INTERVAL),
            oracle,
        })
    }
}
