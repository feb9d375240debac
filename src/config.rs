use crate::constants::{API_V1_BASE_URL, API_V2_BASE_URL};
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url_v1")]
    pub base_url_v1: String,
    #[serde(default = "default_base_url_v2")]
    pub base_url_v2: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_base_url_v1() -> String {
    API_V1_BASE_URL.to_string()
}

fn default_base_url_v2() -> String {
    API_V2_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url_v1: default_base_url_v1(),
            base_url_v2: default_base_url_v2(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory; a missing file yields
    /// the defaults, a malformed file is a hard error.
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        match fs::read_to_string(config_path) {
            Ok(config_content) => {
                let config: Config = toml::from_str(&config_content)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_both_api_generations() {
        let config = Config::default();
        assert_eq!(config.api.base_url_v1, API_V1_BASE_URL);
        assert_eq!(config.api.base_url_v2, API_V2_BASE_URL);
        assert_eq!(config.output.data_dir, "data");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[output]\ndata_dir = \"harvest\"\n").unwrap();
        assert_eq!(config.output.data_dir, "harvest");
        assert_eq!(config.api.base_url_v2, API_V2_BASE_URL);
    }
}
