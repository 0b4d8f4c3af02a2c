//! Configuration loader with environment variable expansion

use super::{
    env, Config, ConfigError, MetricsConfig, ServerConfig, StoreConfig, UploadConfig,
};
use lazy_static::lazy_static;
use std::path::Path;

lazy_static! {
    // ${VAR} or ${VAR:-default}
    static ref ENV_VAR_PATTERN: regex_lite::Regex =
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap();
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, expanding environment variables first
    pub fn from_yaml(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content, |name| std::env::var(name).ok());
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// The four store variables must be present; their values may be empty.
    /// Everything else falls back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String, ConfigError> {
            lookup(name).ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
        };

        let store = StoreConfig {
            region: required(env::REGION)?,
            access_key_id: required(env::ACCESS_KEY_ID)?,
            secret_access_key: required(env::SECRET_ACCESS_KEY)?,
            bucket_name: required(env::BUCKET_NAME)?,
            endpoint: lookup(env::ENDPOINT).filter(|s| !s.is_empty()),
        };

        let mut server = ServerConfig::default();
        if let Some(address) = lookup(env::SERVER_ADDRESS) {
            server.address = address;
        }

        let mut upload = UploadConfig::default();
        if let Some(prefix) = lookup(env::KEY_PREFIX) {
            upload.key_prefix = prefix;
        }
        if let Some(raw) = lookup(env::MAX_CONCURRENCY) {
            upload.max_concurrent_uploads = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{} must be a positive integer, got '{}'",
                    env::MAX_CONCURRENCY,
                    raw
                ))
            })?;
        }

        let mut metrics = MetricsConfig::default();
        if let Some(raw) = lookup(env::METRICS_ENABLED) {
            metrics.enabled = parse_bool(&raw).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "{} must be a boolean, got '{}'",
                    env::METRICS_ENABLED,
                    raw
                ))
            })?;
        }

        let config = Config {
            server,
            store,
            upload,
            metrics,
        };
        config.validate()?;
        Ok(config)
    }

    /// Expand `${VAR}` and `${VAR:-default}` placeholders.
    ///
    /// A placeholder whose variable is unset and has no default is kept as-is.
    fn expand_env_vars<F>(content: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut result = String::with_capacity(content.len());
        let mut last_match = 0;

        for cap in ENV_VAR_PATTERN.captures_iter(content) {
            let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };

            result.push_str(&content[last_match..full_match.start()]);

            let value = match lookup(var_name.as_str()) {
                Some(val) => val,
                None => match cap.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => full_match.as_str().to_string(),
                },
            };
            result.push_str(&value);

            last_match = full_match.end();
        }

        result.push_str(&content[last_match..]);
        result
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
