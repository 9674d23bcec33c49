use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

pub const DEFAULT_CONFIG_FILE: &str = "hydro-audit.json";
pub const DEFAULT_BASE_URL: &str = "https://cchdo.ucsd.edu";
pub const DEFAULT_OUTPUT_DIR: &str = "nc";
pub const DEFAULT_CONVERTER_COMMAND: &str = "hydro";

/// On-disk config file shape. Every field is optional; a missing file just
/// means all defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub report_dir: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub converter_command: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub output_dir: Utf8PathBuf,
    pub report_dir: Utf8PathBuf,
    pub workers: Option<usize>,
    pub converter_command: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; the implicit `hydro-audit.json` is
    /// optional and its absence falls back to defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, AuditError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(AuditError::ConfigRead(config_path));
            }
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| AuditError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| AuditError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            output_dir: Utf8PathBuf::from(
                config
                    .output_dir
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            report_dir: Utf8PathBuf::from(config.report_dir.unwrap_or_else(|| ".".to_string())),
            workers: config.workers,
            converter_command: config
                .converter_command
                .unwrap_or_else(|| DEFAULT_CONVERTER_COMMAND.to_string()),
        }
    }
}
