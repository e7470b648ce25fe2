//! Configuration management.
//!
//! Values come from an optional file plus `LEARNLOG__*` environment variables,
//! e.g. `LEARNLOG__STORE__ENDPOINT` or `LEARNLOG__STORE__CREDENTIAL__AUTH`.

use base64::Engine;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{ErrorCode, LearnlogError, Result};
use crate::statement::vocabulary::{
    ACCOUNT_HOME_PAGE, DEFAULT_ACTIVITY_BASE, DEFAULT_CONTEXT_LANGUAGE, DEFAULT_PLATFORM_NAME,
};
use crate::telemetry::LoggingConfig;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Statement store connection
    pub store: StoreConfig,

    /// URIs and labels stamped on built statements
    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the statement store (the `/statements` resource lives below it)
    pub endpoint: String,

    /// Credential sent on every request
    #[serde(default)]
    pub credential: CredentialConfig,

    /// Value of the `X-Experience-API-Version` header
    #[serde(default = "default_protocol_version")]
    pub version: String,

    /// Per-request timeout enforced by the HTTP client
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(endpoint: impl Into<String>, credential: CredentialConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
            version: default_protocol_version(),
            timeout: default_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(LearnlogError::configuration(
                ErrorCode::MissingConfiguration,
                "store.endpoint is not set",
            ));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(LearnlogError::configuration(
                ErrorCode::InvalidConfiguration,
                format!("store.endpoint must be an http(s) URL, got {}", self.endpoint),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(LearnlogError::configuration(
                ErrorCode::InvalidConfiguration,
                "store.version must not be empty",
            ));
        }
        self.credential.authorization_header().map(|_| ())
    }
}

/// Store credential.
///
/// `auth` is a pre-encoded Basic token. `username`/`password` are encoded on
/// use. `bearer` sends a bearer token instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub auth: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub bearer: Option<String>,
}

impl CredentialConfig {
    pub fn basic_token(token: impl Into<String>) -> Self {
        Self {
            auth: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
            ..Default::default()
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> Result<String> {
        if let Some(token) = self.bearer.as_deref().filter(|t| !t.is_empty()) {
            return Ok(format!("Bearer {}", token));
        }
        if let Some(token) = self.auth.as_deref().filter(|t| !t.is_empty()) {
            return Ok(format!("Basic {}", token));
        }
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) if !user.is_empty() => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", user, pass));
                Ok(format!("Basic {}", encoded))
            }
            _ => Err(LearnlogError::configuration(
                ErrorCode::MissingConfiguration,
                "store.credential needs auth, bearer, or username and password",
            )),
        }
    }
}

/// URIs and labels stamped on built statements.
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyConfig {
    /// Prefix for project, tool, prompt and outcome activity ids
    #[serde(default = "default_activity_base")]
    pub activity_base: String,

    /// Homepage scoping learner account names
    #[serde(default = "default_home_page")]
    pub home_page: String,

    /// Platform name in statement context
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Locale in statement context
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            activity_base: default_activity_base(),
            home_page: default_home_page(),
            platform: default_platform(),
            language: default_language(),
        }
    }
}

// Default value functions
fn default_protocol_version() -> String { "1.0.3".to_string() }
fn default_timeout() -> Duration { Duration::from_secs(30) }
fn default_activity_base() -> String { DEFAULT_ACTIVITY_BASE.to_string() }
fn default_home_page() -> String { ACCOUNT_HOME_PAGE.to_string() }
fn default_platform() -> String { DEFAULT_PLATFORM_NAME.to_string() }
fn default_language() -> String { DEFAULT_CONTEXT_LANGUAGE.to_string() }

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("LEARNLOG").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.store.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LEARNLOG").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.store.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_basic_from_username_password() {
        let cred = CredentialConfig::basic("alice", "secret");
        assert_eq!(
            cred.authorization_header().unwrap(),
            "Basic YWxpY2U6c2VjcmV0"
        );
    }

    #[test]
    fn test_pre_encoded_token_and_bearer() {
        assert_eq!(
            CredentialConfig::basic_token("abc").authorization_header().unwrap(),
            "Basic abc"
        );
        assert_eq!(
            CredentialConfig::bearer("t0k").authorization_header().unwrap(),
            "Bearer t0k"
        );
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let err = CredentialConfig::default().authorization_header().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingConfiguration);
    }

    #[test]
    fn test_store_validate_rejects_non_http_endpoint() {
        let store = StoreConfig::new("ftp://lrs", CredentialConfig::basic_token("x"));
        assert_eq!(
            store.validate().unwrap_err().code(),
            ErrorCode::InvalidConfiguration
        );
    }

    #[test]
    fn test_from_file_applies_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[store]
endpoint = "https://lrs.example.org/xapi/"
timeout = "5s"

[store.credential]
auth = "dG9rZW4="
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cfg = Config::from_file(&path).unwrap();

        assert_eq!(cfg.store.base_url(), "https://lrs.example.org/xapi");
        assert_eq!(cfg.store.version, "1.0.3");
        assert_eq!(cfg.store.timeout, Duration::from_secs(5));
        assert_eq!(cfg.vocabulary.activity_base, DEFAULT_ACTIVITY_BASE);
        assert_eq!(cfg.vocabulary.home_page, ACCOUNT_HOME_PAGE);
    }
}
