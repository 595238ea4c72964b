//! Client configuration
//!
//! Construction-time settings for the client: API root URL, the credential
//! pair, and the transport timeout. Configuration is immutable once the
//! client is built.
//!
//! ## Environment Variables
//! - `ADLANE_API_URL`: API root URL (optional, defaults to the staging host)
//! - `ADLANE_EMAIL`: login identity
//! - `ADLANE_PASSWORD`: login secret

use std::fmt;
use std::time::Duration;

use crate::errors::{ClientError, Result};

/// Default API root: the AdLane staging host.
pub const DEFAULT_BASE_URL: &str = "https://sandbox.api.adlane.io/v2";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`Client`](crate::Client).
#[derive(Clone)]
pub struct ClientConfig {
    pub(crate) base_url: String,
    pub(crate) email: String,
    pub(crate) password: String,
    pub(crate) timeout: Duration,
}

impl ClientConfig {
    /// Start building a configuration with the given credential pair.
    pub fn builder(email: impl Into<String>, password: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: DEFAULT_BASE_URL.to_string(),
            email: email.into(),
            password: password.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ClientError::Config` if a required variable is missing or the
    /// configured URL is invalid.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("ADLANE_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let email = env_var("ADLANE_EMAIL")?;
        let password = env_var("ADLANE_PASSWORD")?;

        ClientConfig::builder(email, password).base_url(base_url).build()
    }

    /// API root URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Login identity.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Transport timeout applied to every request.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Clone)]
pub struct ClientConfigBuilder {
    base_url: String,
    email: String,
    password: String,
    timeout: Duration,
}

impl ClientConfigBuilder {
    /// Override the API root URL (trailing slashes are trimmed).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    /// Returns `ClientError::Config` if the base URL is malformed or a
    /// credential is empty.
    pub fn build(self) -> Result<ClientConfig> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL {base_url:?}: {e}")))?;

        if self.email.is_empty() {
            return Err(ClientError::Config("email must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(ClientError::Config("password must not be empty".into()));
        }

        Ok(ClientConfig {
            base_url,
            email: self.email,
            password: self.password,
            timeout: self.timeout,
        })
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| ClientError::Config(format!("environment variable {name} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = ClientConfig::builder("buyer@example.com", "secret").build().unwrap();

        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let config = ClientConfig::builder("buyer@example.com", "secret")
            .base_url("https://api.adlane.io/v2/")
            .build()
            .unwrap();

        assert_eq!(config.base_url(), "https://api.adlane.io/v2");
    }

    #[test]
    fn rejects_malformed_url() {
        let result =
            ClientConfig::builder("buyer@example.com", "secret").base_url("not-a-url").build();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn rejects_empty_credentials() {
        assert!(matches!(
            ClientConfig::builder("", "secret").build(),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::builder("buyer@example.com", "").build(),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let config = ClientConfig::builder("buyer@example.com", "hunter2").build().unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hunter2"));
    }
}
