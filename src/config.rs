// ABOUTME: Client configuration: agent address, optional auth key, I/O timeout, logging span
// ABOUTME: ConfigBuilder provides a fluent construction API matching the rest of this crate

use crate::error::Error;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`Client`](crate::Client).
///
/// `addr` is the only required field. `timeout` governs dial, writes, and
/// subscription-init deadlines; it does not bound delivery after a
/// subscription is established (see the subscription primitives in the
/// crate's design notes).
#[derive(Debug, Clone)]
pub struct Config {
    /// `host:port` of the agent.
    pub addr: String,
    /// Shared-key value sent with the `auth` request. `None` skips the
    /// auth step entirely.
    pub auth_key: Option<String>,
    /// Applies to dial, writes, and subscription initialization.
    pub timeout: Duration,
    /// Optional span that all of this client's internal spans are
    /// created under, letting a caller tag diagnostics without the crate
    /// depending on a particular `tracing` subscriber.
    pub logger: Option<tracing::Span>,
}

impl Config {
    /// Start building a configuration for `addr`.
    pub fn builder(addr: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder {
            addr: addr.into(),
            auth_key: None,
            timeout: DEFAULT_TIMEOUT,
            logger: None,
        }
    }
}

/// Fluent builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    addr: String,
    auth_key: Option<String>,
    timeout: Duration,
    logger: Option<tracing::Span>,
}

impl ConfigBuilder {
    /// Set the shared auth key. An empty string is treated the same as
    /// never calling this method: no `auth` request is sent.
    pub fn auth_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.auth_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Override the default 10 second timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tag this client's internal spans under `span`.
    pub fn logger(mut self, span: tracing::Span) -> Self {
        self.logger = Some(span);
        self
    }

    /// Validate and produce the final [`Config`].
    pub fn build(self) -> Result<Config, Error> {
        if self.addr.trim().is_empty() {
            return Err(Error::Protocol("addr must not be empty".into()));
        }

        Ok(Config {
            addr: self.addr,
            auth_key: self.auth_key,
            timeout: self.timeout,
            logger: self.logger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_ten_seconds() {
        let config = Config::builder("127.0.0.1:7373").build().unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.auth_key.is_none());
    }

    #[test]
    fn empty_addr_is_rejected() {
        let err = Config::builder("   ").build().unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn empty_auth_key_is_treated_as_none() {
        let config = Config::builder("127.0.0.1:7373")
            .auth_key("")
            .build()
            .unwrap();
        assert!(config.auth_key.is_none());
    }

    #[test]
    fn auth_key_and_timeout_are_applied() {
        let config = Config::builder("127.0.0.1:7373")
            .auth_key("s3cr3t")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        assert_eq!(config.auth_key.as_deref(), Some("s3cr3t"));
        assert_eq!(config.timeout, Duration::from_secs(3));
    }
}
