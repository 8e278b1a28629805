//! Application configuration loaded from environment variables.

use std::time::Duration;

use booking::VerificationFailurePolicy;
use booking::gateway::{DEFAULT_PAYMENT_SERVICE, DEFAULT_VERIFICATION_SERVICE};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset means in-memory
/// - `PAYMENT_SERVICE_URL` / `VERIFICATION_SERVICE_URL`: remote base URLs
/// - `PAYMENT_SERVICE_NAME` / `VERIFICATION_SERVICE_NAME`: registry names
/// - `GATEWAY_TIMEOUT_MS`: bound on one remote call (default: `5000`)
/// - `VERIFICATION_FAILURE_POLICY`: `open` or `closed` (default: `open`)
/// - `RECONCILE_GRACE_SECS`: age before a pending booking is failed (default: `300`)
/// - `RECONCILE_INTERVAL_SECS`: sweep period (default: `60`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub payment_service_url: String,
    pub verification_service_url: String,
    pub payment_service_name: String,
    pub verification_service_name: String,
    pub gateway_timeout: Duration,
    pub verification_policy: VerificationFailurePolicy,
    pub reconcile_grace: Duration,
    pub reconcile_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let verification_policy = match lookup("VERIFICATION_FAILURE_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring VERIFICATION_FAILURE_POLICY");
                defaults.verification_policy
            }),
            None => defaults.verification_policy,
        };

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            payment_service_url: lookup("PAYMENT_SERVICE_URL")
                .unwrap_or(defaults.payment_service_url),
            verification_service_url: lookup("VERIFICATION_SERVICE_URL")
                .unwrap_or(defaults.verification_service_url),
            payment_service_name: lookup("PAYMENT_SERVICE_NAME")
                .unwrap_or(defaults.payment_service_name),
            verification_service_name: lookup("VERIFICATION_SERVICE_NAME")
                .unwrap_or(defaults.verification_service_name),
            gateway_timeout: number("GATEWAY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.gateway_timeout),
            verification_policy,
            reconcile_grace: number("RECONCILE_GRACE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconcile_grace),
            reconcile_interval: number("RECONCILE_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconcile_interval),
        };
        config.validated()
    }

    /// Raises the reconcile grace to twice the gateway timeout if needed.
    ///
    /// A pending booking must never be failed while its payment call can
    /// still be in flight.
    pub fn validated(mut self) -> Self {
        let floor = self.gateway_timeout * 2;
        if self.reconcile_grace < floor {
            tracing::warn!(
                grace_ms = self.reconcile_grace.as_millis() as u64,
                timeout_ms = self.gateway_timeout.as_millis() as u64,
                "reconcile grace shorter than twice the gateway timeout, raising it"
            );
            self.reconcile_grace = floor;
        }
        self
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            payment_service_url: "http://127.0.0.1:1099".to_string(),
            verification_service_url: "http://127.0.0.1:1100".to_string(),
            payment_service_name: DEFAULT_PAYMENT_SERVICE.to_string(),
            verification_service_name: DEFAULT_VERIFICATION_SERVICE.to_string(),
            gateway_timeout: Duration::from_millis(5000),
            verification_policy: VerificationFailurePolicy::FailOpen,
            reconcile_grace: Duration::from_secs(300),
            reconcile_interval: Duration::from_secs(60),
        }
    }
}

/// Settings of the `remote-services` binary.
///
/// Reads `REMOTE_HOST` (default `127.0.0.1`), `PAYMENT_PORT` (default `1099`)
/// and `VERIFICATION_PORT` (default `1100`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServicesConfig {
    pub host: String,
    pub payment_port: u16,
    pub verification_port: u16,
}

impl RemoteServicesConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let port = |key: &str| std::env::var(key).ok().and_then(|p| p.parse().ok());
        Self {
            host: std::env::var("REMOTE_HOST").unwrap_or(defaults.host),
            payment_port: port("PAYMENT_PORT").unwrap_or(defaults.payment_port),
            verification_port: port("VERIFICATION_PORT").unwrap_or(defaults.verification_port),
        }
    }

    pub fn payment_addr(&self) -> String {
        format!("{}:{}", self.host, self.payment_port)
    }

    pub fn verification_addr(&self) -> String {
        format!("{}:{}", self.host, self.verification_port)
    }
}

impl Default for RemoteServicesConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            payment_port: 1099,
            verification_port: 1100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.payment_service_name, "PaymentService");
        assert_eq!(config.verification_service_name, "PoliceService");
        assert_eq!(config.gateway_timeout, Duration::from_secs(5));
        assert_eq!(config.verification_policy, VerificationFailurePolicy::FailOpen);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_addr_default() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("DATABASE_URL", "postgres://localhost/rental"),
            ("GATEWAY_TIMEOUT_MS", "250"),
            ("VERIFICATION_FAILURE_POLICY", "closed"),
            ("RECONCILE_GRACE_SECS", "30"),
            ("PAYMENT_SERVICE_NAME", "Bank"),
        ]));
        assert_eq!(config.port, 8081);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/rental")
        );
        assert_eq!(config.gateway_timeout, Duration::from_millis(250));
        assert_eq!(
            config.verification_policy,
            VerificationFailurePolicy::FailClosed
        );
        assert_eq!(config.reconcile_grace, Duration::from_secs(30));
        assert_eq!(config.payment_service_name, "Bank");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("VERIFICATION_FAILURE_POLICY", "sometimes"),
            ("RECONCILE_INTERVAL_SECS", "0"),
            ("DATABASE_URL", ""),
        ]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.verification_policy, VerificationFailurePolicy::FailOpen);
        assert_eq!(config.reconcile_interval, Duration::from_secs(60));
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_grace_raised_above_timeout() {
        let config = Config::from_lookup(lookup(&[
            ("GATEWAY_TIMEOUT_MS", "10000"),
            ("RECONCILE_GRACE_SECS", "5"),
        ]));
        assert_eq!(config.reconcile_grace, Duration::from_secs(20));
    }

    #[test]
    fn test_grace_between_timeout_and_floor_is_raised() {
        let config = Config::from_lookup(lookup(&[
            ("GATEWAY_TIMEOUT_MS", "5000"),
            ("RECONCILE_GRACE_SECS", "6"),
        ]));
        assert_eq!(config.reconcile_grace, Duration::from_secs(10));
    }

    #[test]
    fn test_remote_services_defaults() {
        let config = RemoteServicesConfig::default();
        assert_eq!(config.payment_addr(), "127.0.0.1:1099");
        assert_eq!(config.verification_addr(), "127.0.0.1:1100");
    }
}
