/// Error type for [`crate::Config`] loading. Captures errors related to
/// reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Missing or non-unicode environment variable.
    #[error("missing or non-unicode environment variable: {0}")]
    Var(String),
    /// Error parsing an integer environment variable.
    #[error("failed to parse environment variable {key}: {source}")]
    ParseInt {
        /// The variable that failed to parse.
        key: String,
        /// The underlying parse error.
        #[source]
        source: std::num::ParseIntError,
    },
    /// Error parsing a URL environment variable.
    #[error("failed to parse environment variable {key} as a URL: {source}")]
    ParseUrl {
        /// The variable that failed to parse.
        key: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
}

impl ConfigError {
    /// Missing or non-unicode env var.
    pub fn missing(key: &str) -> Self {
        Self::Var(key.to_string())
    }
}
