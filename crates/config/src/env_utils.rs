use crate::ConfigError;
use std::env;
use url::Url;

/// Load a required string variable from the environment.
pub fn load_string(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::missing(key))
}

/// Load an optional string variable from the environment.
pub fn load_string_opt(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Load a required `u64` variable from the environment.
pub fn load_u64(key: &str) -> Result<u64, ConfigError> {
    let val = load_string(key)?;
    val.parse::<u64>().map_err(|source| ConfigError::ParseInt { key: key.to_string(), source })
}

/// Load an optional `u64` variable from the environment, falling back to
/// `default` if it is unset. An unset variable is not an error; a present
/// but unparsable one is.
pub fn load_u64_or(key: &str, default: u64) -> Result<u64, ConfigError> {
    match load_string_opt(key) {
        Some(raw) => raw.parse::<u64>().map_err(|source| ConfigError::ParseInt {
            key: key.to_string(),
            source,
        }),
        None => Ok(default),
    }
}

/// Load an optional `u32` variable from the environment, falling back to
/// `default` if it is unset.
pub fn load_u32_or(key: &str, default: u32) -> Result<u32, ConfigError> {
    match load_string_opt(key) {
        Some(raw) => raw.parse::<u32>().map_err(|source| ConfigError::ParseInt {
            key: key.to_string(),
            source,
        }),
        None => Ok(default),
    }
}

/// Load a required URL variable from the environment.
pub fn load_url(key: &str) -> Result<Url, ConfigError> {
    let raw = load_string(key)?;
    Url::parse(&raw).map_err(|source| ConfigError::ParseUrl { key: key.to_string(), source })
}
