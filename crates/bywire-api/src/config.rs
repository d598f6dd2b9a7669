//! Configuration management for the Bybit webhook receiver.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use bywire_core::{Secret, Verifier};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{middleware::allowlist::IpAllowlist, publish::DEFAULT_QUEUE, server::RouterConfig};

const CONFIG_FILE: &str = "config.toml";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Everything except the webhook secret has a default. The secret is never
/// serialized and is redacted from `Debug` output.
///
/// # Example
///
/// ```no_run
/// use bywire_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    // Bybit
    /// Shared HMAC secret for webhook signatures.
    ///
    /// Environment variable: `BYBIT_WEBHOOK_SECRET`
    #[serde(default, skip_serializing)]
    pub bybit_webhook_secret: Option<String>,
    /// Freshness window for `X-BYBIT-TIMESTAMP` in milliseconds.
    ///
    /// Environment variable: `BYBIT_TIMESTAMP_TOLERANCE_MS`
    #[serde(default = "default_tolerance_ms")]
    pub bybit_timestamp_tolerance_ms: u64,
    /// Comma-separated CIDR ranges allowed to deliver events. Empty admits
    /// every peer.
    ///
    /// Environment variable: `BYBIT_ALLOWED_IP_RANGES`
    #[serde(default)]
    pub bybit_allowed_ip_ranges: String,
    /// Queue name attached to published events.
    ///
    /// Environment variable: `BYBIT_BROKER_QUEUE`
    #[serde(default = "default_broker_queue")]
    pub bybit_broker_queue: String,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Maximum request body size in bytes.
    ///
    /// Environment variable: `MAX_BODY_BYTES`
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment
    /// variable overrides, then validate it.
    ///
    /// # Errors
    ///
    /// Fails if a source cannot be parsed or validation rejects the result,
    /// including when `BYBIT_WEBHOOK_SECRET` is unset.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// Layered providers used by [`Config::load`].
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""))
    }

    /// Extracts and validates configuration from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Fails on extraction or validation errors.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the validated webhook secret.
    ///
    /// # Errors
    ///
    /// Fails if the secret is unset or empty.
    pub fn secret(&self) -> Result<Secret> {
        let raw = self.bybit_webhook_secret.as_deref().unwrap_or_default();
        Secret::new(raw).context("BYBIT_WEBHOOK_SECRET must be set to a non-empty value")
    }

    /// Freshness window as a `Duration`.
    pub fn tolerance(&self) -> Duration {
        Duration::from_millis(self.bybit_timestamp_tolerance_ms)
    }

    /// Builds the verification pipeline from the secret and tolerance.
    ///
    /// # Errors
    ///
    /// Fails if the secret is missing or the tolerance is zero.
    pub fn to_verifier(&self) -> Result<Verifier> {
        Verifier::new(self.secret()?, self.tolerance()).context("Invalid verification settings")
    }

    /// Parses the configured allowlist.
    ///
    /// # Errors
    ///
    /// Fails if any entry is not a valid address or CIDR range.
    pub fn to_allowlist(&self) -> Result<IpAllowlist> {
        IpAllowlist::parse(&self.bybit_allowed_ip_ranges)
            .context("BYBIT_ALLOWED_IP_RANGES contains an invalid range")
    }

    /// Convert to router limits.
    pub fn to_router_config(&self) -> RouterConfig {
        RouterConfig {
            request_timeout: Duration::from_secs(self.request_timeout),
            max_body_bytes: self.max_body_bytes,
        }
    }

    /// Parse server socket address from host and port configuration.
    ///
    /// # Errors
    ///
    /// Fails if host and port do not form a socket address.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        self.secret()?;

        if self.bybit_timestamp_tolerance_ms == 0 {
            anyhow::bail!("bybit_timestamp_tolerance_ms must be greater than 0");
        }

        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        self.to_allowlist()?;

        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bybit_webhook_secret", &self.bybit_webhook_secret.as_ref().map(|_| "***"))
            .field("bybit_timestamp_tolerance_ms", &self.bybit_timestamp_tolerance_ms)
            .field("bybit_allowed_ip_ranges", &self.bybit_allowed_ip_ranges)
            .field("bybit_broker_queue", &self.bybit_broker_queue)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bybit_webhook_secret: None,
            bybit_timestamp_tolerance_ms: default_tolerance_ms(),
            bybit_allowed_ip_ranges: String::new(),
            bybit_broker_queue: default_broker_queue(),
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
            rust_log: default_log_level(),
        }
    }
}

fn default_tolerance_ms() -> u64 {
    5 * 60 * 1000
}

fn default_broker_queue() -> String {
    DEFAULT_QUEUE.to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}
