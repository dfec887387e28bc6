//! Client configuration.

use std::time::Duration;

/// Default backend URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of collections requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g., "http://127.0.0.1:8090").
    pub base_url: String,

    /// Admin identity used for password authentication.
    pub identity: Option<String>,

    /// Admin password used for password authentication.
    pub password: Option<String>,

    /// Pre-issued admin token; takes precedence over identity and password.
    pub token: Option<String>,

    /// Request timeout.
    pub timeout: Duration,

    /// Collections requested per page when fetching the schema.
    pub page_size: u32,
}

impl ClientConfig {
    /// Create a configuration for the given backend URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            identity: None,
            password: None,
            token: None,
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a configuration for a backend on localhost.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }

    /// Set the admin identity and password.
    pub fn with_credentials(mut self, identity: impl Into<String>, password: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self.password = Some(password.into());
        self
    }

    /// Set a pre-issued admin token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the page size used when listing collections.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("https://pb.example.com/")
            .with_credentials("admin@example.com", "secret")
            .with_timeout(Duration::from_secs(5))
            .with_page_size(50);

        assert_eq!(config.base_url(), "https://pb.example.com");
        assert_eq!(config.identity.as_deref(), Some("admin@example.com"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::localhost()
            .with_credentials("admin@example.com", "hunter2")
            .with_token("tok_abc");
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tok_abc"));
        assert!(rendered.contains("admin@example.com"));
    }
}
