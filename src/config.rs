//! Environment configuration

use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_WHATSAPP_NUMBER: &str = "5518996125628";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub whatsapp_number: String,
    /// Whether the `product_images` table is deployed. Decided once at startup from configuration.
    pub multi_image: bool,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or(&get, "PORT", DEFAULT_PORT)?;
        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}/uploads"))
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            database_url,
            port,
            nats_url: get("NATS_URL").filter(|u| !u.is_empty()),
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./uploads")),
            public_base_url,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            whatsapp_number: get("WHATSAPP_NUMBER").unwrap_or_else(|| DEFAULT_WHATSAPP_NUMBER.to_string()),
            multi_image: parse_or(&get, "MULTI_IMAGE", true)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/ricca")])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.public_base_url, "http://localhost:8083/uploads");
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert!(config.multi_image);
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn test_overrides_and_errors() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"), ("PORT", "9000"), ("MULTI_IMAGE", "false"),
            ("PUBLIC_BASE_URL", "https://cdn.example/imgs/"),
        ])).unwrap();
        assert_eq!(config.port, 9000);
        assert!(!config.multi_image);
        assert_eq!(config.public_base_url, "https://cdn.example/imgs");

        assert!(matches!(Config::from_lookup(lookup(&[])), Err(ConfigError::Missing("DATABASE_URL"))));
        assert!(matches!(
            Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("PORT", "abc")])),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
    }
}
