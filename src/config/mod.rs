//! Typed configuration: defaults, environment overrides, validation.
//!
//! Constructed once at startup and passed by reference into every component —
//! no process-wide config singleton.

use crate::error::{BridgeError, BridgeResult};
use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wall-clock session boundaries and tuning knobs for the Clock & Schedule
/// and Supervisor components. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub day_open: NaiveTime,
    pub day_close: NaiveTime,
    pub night_open: NaiveTime,
    pub night_close: NaiveTime,

    pub monitor_interval: Duration,
    pub critical_timeout: Duration,
    pub max_timeout_retries: u32,
    pub day_slow_tick_threshold: Duration,
    pub night_slow_tick_threshold: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            day_open: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            day_close: NaiveTime::from_hms_opt(13, 45, 0).unwrap(),
            night_open: NaiveTime::from_hms_opt(14, 50, 0).unwrap(),
            night_close: NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            monitor_interval: Duration::from_secs(10),
            critical_timeout: Duration::from_secs(300),
            max_timeout_retries: 3,
            day_slow_tick_threshold: Duration::from_secs(60),
            night_slow_tick_threshold: Duration::from_secs(180),
        }
    }
}

impl SessionConfig {
    /// The symmetric dilation applied to each session boundary (`2 x MONITOR_INTERVAL`).
    pub fn buffer(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.monitor_interval * 2).unwrap_or(chrono::Duration::zero())
    }
}

/// Upstream vendor credentials. Absence of either field is a fatal startup error.
#[derive(Debug, Clone)]
pub struct UpstreamCredentials {
    pub api_key: String,
    pub secret_key: String,
}

/// Downstream log (Kafka) connection parameters.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub broker: String,
    pub topic: String,
}

/// Log-level / filter directive, sourced from `LOG_LEVEL` (falls back to `RUST_LOG`).
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// The assembled, validated configuration passed into every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: UpstreamCredentials,
    pub kafka: KafkaConfig,
    pub session: SessionConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load from environment, applying overrides on top of the compiled-in
    /// defaults, then validate. This is the single entry point `main` uses.
    pub fn load_from_env() -> Result<Self> {
        let api_key = std::env::var("SHIOAJI_API_KEY").unwrap_or_default();
        let secret_key = std::env::var("SHIOAJI_SECRET_KEY").unwrap_or_default();
        let broker = std::env::var("KAFKA_BROKER").unwrap_or_default();
        let topic = std::env::var("KAFKA_TOPIC").unwrap_or_default();

        let mut session = SessionConfig::default();
        apply_session_env_overrides(&mut session);

        let log = LogConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let config = Self {
            credentials: UpstreamCredentials {
                api_key,
                secret_key,
            },
            kafka: KafkaConfig { broker, topic },
            session,
            log,
        };

        config.validate()?;
        Ok(config)
    }

    /// All startup config checks are reported as `BridgeError::MissingCredential`
    /// per §7's table ("startup config check fails" / "fatal, exit 1") — the
    /// name covers any config precondition, not only the vendor credentials.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.credentials.api_key.is_empty() || self.credentials.secret_key.is_empty() {
            return Err(BridgeError::MissingCredential(
                "SHIOAJI_API_KEY and SHIOAJI_SECRET_KEY must both be set".into(),
            ));
        }
        if self.kafka.broker.is_empty() {
            return Err(BridgeError::MissingCredential("missing KAFKA_BROKER".into()));
        }
        if self.kafka.topic.is_empty() {
            return Err(BridgeError::MissingCredential("missing KAFKA_TOPIC".into()));
        }
        if self.session.max_timeout_retries == 0 {
            return Err(BridgeError::MissingCredential(
                "MAX_TIMEOUT_RETRIES must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parse `u64` seconds from an env var into a `Duration`, falling back silently
/// to the existing default on absence or parse failure.
fn env_secs_override(var: &str, target: &mut Duration) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse::<u64>() {
            Ok(secs) => *target = Duration::from_secs(secs),
            Err(_) => {
                tracing::warn!(var, raw, "ignoring unparseable env override");
            }
        }
    }
}

fn apply_session_env_overrides(session: &mut SessionConfig) {
    env_secs_override("MONITOR_INTERVAL_SECS", &mut session.monitor_interval);
    env_secs_override("TIMEOUT_SECONDS", &mut session.critical_timeout);
    env_secs_override(
        "DAY_SESSION_SLOW_TICK_THRESHOLD",
        &mut session.day_slow_tick_threshold,
    );
    env_secs_override(
        "NIGHT_SESSION_SLOW_TICK_THRESHOLD",
        &mut session.night_slow_tick_threshold,
    );
    if let Ok(raw) = std::env::var("MAX_TIMEOUT_RETRIES") {
        match raw.parse::<u32>() {
            Ok(n) => session.max_timeout_retries = n,
            Err(_) => tracing::warn!(raw, "ignoring unparseable MAX_TIMEOUT_RETRIES"),
        }
    }
}

/// Convenience used by `main`: load, mapping the first validation failure to
/// the fatal `MissingCredential`/config-error exit path.
pub fn load() -> Result<Config> {
    Config::load_from_env().context("configuration load failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        for var in [
            "SHIOAJI_API_KEY",
            "SHIOAJI_SECRET_KEY",
            "KAFKA_BROKER",
            "KAFKA_TOPIC",
            "MONITOR_INTERVAL_SECS",
            "TIMEOUT_SECONDS",
            "MAX_TIMEOUT_RETRIES",
            "DAY_SESSION_SLOW_TICK_THRESHOLD",
            "NIGHT_SESSION_SLOW_TICK_THRESHOLD",
            "LOG_LEVEL",
        ] {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn default_session_config_matches_tuning_constants() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.monitor_interval, Duration::from_secs(10));
        assert_eq!(cfg.critical_timeout, Duration::from_secs(300));
        assert_eq!(cfg.max_timeout_retries, 3);
        assert_eq!(cfg.day_slow_tick_threshold, Duration::from_secs(60));
        assert_eq!(cfg.night_slow_tick_threshold, Duration::from_secs(180));
    }

    #[test]
    fn missing_credentials_fails_validation() {
        clear_env();
        unsafe { std::env::set_var("KAFKA_BROKER", "localhost:9092") };
        unsafe { std::env::set_var("KAFKA_TOPIC", "ticks") };
        let result = Config::load_from_env();
        assert!(result.is_err());
        clear_env();
    }

    #[test]
    fn missing_credentials_routes_through_missing_credential_and_is_fatal() {
        let config = Config {
            credentials: UpstreamCredentials {
                api_key: String::new(),
                secret_key: String::new(),
            },
            kafka: KafkaConfig {
                broker: "localhost:9092".into(),
                topic: "ticks".into(),
            },
            session: SessionConfig::default(),
            log: LogConfig::default(),
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BridgeError::MissingCredential(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn env_override_applies_and_falls_back_on_garbage() {
        clear_env();
        unsafe { std::env::set_var("SHIOAJI_API_KEY", "k") };
        unsafe { std::env::set_var("SHIOAJI_SECRET_KEY", "s") };
        unsafe { std::env::set_var("KAFKA_BROKER", "localhost:9092") };
        unsafe { std::env::set_var("KAFKA_TOPIC", "ticks") };
        unsafe { std::env::set_var("MONITOR_INTERVAL_SECS", "5") };
        unsafe { std::env::set_var("MAX_TIMEOUT_RETRIES", "not-a-number") };

        let config = Config::load_from_env().expect("should validate");
        assert_eq!(config.session.monitor_interval, Duration::from_secs(5));
        assert_eq!(config.session.max_timeout_retries, 3); // fallback preserved

        clear_env();
    }
}
