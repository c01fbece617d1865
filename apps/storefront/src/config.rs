//! Storefront configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// How the payment outcome is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Random draw with `payment_success_rate`.
    Simulated,
    /// Every payment completes.
    ApproveAll,
    /// Every payment fails.
    DeclineAll,
}

impl std::str::FromStr for PaymentMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(PaymentMode::Simulated),
            "approve_all" => Ok(PaymentMode::ApproveAll),
            "decline_all" => Ok(PaymentMode::DeclineAll),
            _ => Err(()),
        }
    }
}

/// Storefront configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// HTTP server port
    pub port: u16,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub db_max_connections: u32,

    /// Payment outcome strategy
    pub payment_mode: PaymentMode,

    /// Probability of a simulated payment completing, in [0, 1]
    pub payment_success_rate: f64,

    /// Mail-send API endpoint (optional; notifications are only logged without it)
    pub mail_api_url: Option<String>,

    /// Bearer token for the mail-send API
    pub mail_api_token: Option<String>,

    /// Sender address on customer emails
    pub email_from: String,

    /// Support address shown in email footers
    pub support_email: String,

    /// Mail API request timeout in seconds
    pub mail_timeout_secs: u64,

    /// Outbox relay poll interval in seconds
    pub outbox_poll_interval_secs: u64,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        StorefrontConfig {
            port: 5000,
            bind_addr: "0.0.0.0".to_string(),
            database_path: PathBuf::from("./data/esales.db"),
            db_max_connections: 5,
            payment_mode: PaymentMode::Simulated,
            payment_success_rate: 0.8,
            mail_api_url: None,
            mail_api_token: None,
            email_from: "noreply@esalesone.com".to_string(),
            support_email: "support@esalesone.com".to_string(),
            mail_timeout_secs: 10,
            outbox_poll_interval_secs: 30,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StorefrontConfig::default();

        let config = StorefrontConfig {
            port: parse_or(&lookup, "PORT", defaults.port)?,

            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),

            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,

            payment_mode: parse_or(&lookup, "PAYMENT_MODE", defaults.payment_mode)?,

            payment_success_rate: parse_or(
                &lookup,
                "PAYMENT_SUCCESS_RATE",
                defaults.payment_success_rate,
            )?,

            mail_api_url: lookup("MAIL_API_URL").filter(|v| !v.trim().is_empty()),

            mail_api_token: lookup("MAIL_API_TOKEN").filter(|v| !v.trim().is_empty()),

            email_from: lookup("EMAIL_FROM").unwrap_or(defaults.email_from),

            support_email: lookup("SUPPORT_EMAIL").unwrap_or(defaults.support_email),

            mail_timeout_secs: parse_or(&lookup, "MAIL_TIMEOUT_SECS", defaults.mail_timeout_secs)?,

            outbox_poll_interval_secs: parse_or(
                &lookup,
                "OUTBOX_POLL_INTERVAL_SECS",
                defaults.outbox_poll_interval_secs,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.payment_success_rate) {
            return Err(ConfigError::InvalidValue("PAYMENT_SUCCESS_RATE".to_string()));
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.outbox_poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("OUTBOX_POLL_INTERVAL_SECS".to_string()));
        }

        if self.mail_api_url.is_some() && self.mail_api_token.is_none() {
            return Err(ConfigError::MissingRequired("MAIL_API_TOKEN".to_string()));
        }

        Ok(())
    }

    /// The `host:port` the HTTP listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn mail_timeout(&self) -> Duration {
        Duration::from_secs(self.mail_timeout_secs)
    }

    pub fn outbox_poll_interval(&self) -> Duration {
        Duration::from_secs(self.outbox_poll_interval_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
