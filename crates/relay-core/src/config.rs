//! Configuration structures for settings-relay.
//!
//! This module defines explicit, serializable configuration objects consumed by
//! the host binary. Every field has a default so that a configuration file only
//! needs to name what it changes.
//!
//! The core crate itself does not read files or environment variables. The
//! host parses the configuration file (TOML) and merges command line flags
//! before handing a `RelayConfig` to the engine and sink.

use serde::{Deserialize, Serialize};

use crate::emitter::DEFAULT_NAMESPACE;
use crate::errors::{RelayError, RelayResult};
use crate::passthrough::PassthroughRule;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8181;
pub const DEFAULT_SUBMIT_PATH: &str = "/submit_change/";

/// Global configuration container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub logger: LoggerConfig,
    pub sink: SinkConfig,
    pub passthrough: Vec<PassthroughRule>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            sink: SinkConfig::default(),
            passthrough: vec![PassthroughRule::libreoffice()],
        }
    }
}

/// Collector location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub admin_server_host: String,
    pub admin_server_port: u16,
    pub submit_path: String,
    /// Namespace for schema-labelled events.
    pub namespace: String,
    /// Full base URL; when set, host/port/submit_path are ignored.
    pub endpoint: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            admin_server_host: DEFAULT_HOST.to_string(),
            admin_server_port: DEFAULT_PORT,
            submit_path: DEFAULT_SUBMIT_PATH.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            endpoint: None,
        }
    }
}

impl LoggerConfig {
    /// Base URL to which the namespace is appended.
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(e) => e.clone(),
            None => format!(
                "http://{}:{}{}",
                self.admin_server_host, self.admin_server_port, self.submit_path
            ),
        }
    }

    /// Collector URL for one namespace.
    pub fn endpoint_for(&self, namespace: &str) -> String {
        format!("{}{}", self.base_url(), namespace)
    }
}

/// Outbound delivery limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Concurrent in-flight requests.
    pub max_in_flight: usize,
    /// Deliveries in flight or waiting for a slot; further ones are dropped.
    pub max_pending: usize,
    pub request_timeout_ms: u64,
    /// Best-effort drain window at shutdown.
    pub drain_timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            max_pending: 1_024,
            request_timeout_ms: 5_000,
            drain_timeout_ms: 3_000,
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &RelayConfig) -> RelayResult<()> {
    if cfg.logger.endpoint.is_none() {
        if cfg.logger.admin_server_host.trim().is_empty() {
            return Err(RelayError::invalid_argument("admin_server_host must not be empty"));
        }
        if cfg.logger.admin_server_port == 0 {
            return Err(RelayError::invalid_argument("admin_server_port must be greater than zero"));
        }
        if !cfg.logger.submit_path.starts_with('/') || !cfg.logger.submit_path.ends_with('/') {
            return Err(RelayError::invalid_argument("submit_path must start and end with '/'"));
        }
    }

    if let Some(endpoint) = &cfg.logger.endpoint {
        if !endpoint.ends_with('/') {
            return Err(RelayError::invalid_argument("endpoint must end with '/'"));
        }
    }

    if cfg.logger.namespace.trim().is_empty() {
        return Err(RelayError::invalid_argument("namespace must not be empty"));
    }

    if cfg.sink.max_in_flight == 0 {
        return Err(RelayError::invalid_argument("max_in_flight must be greater than zero"));
    }

    if cfg.sink.max_pending < cfg.sink.max_in_flight {
        return Err(RelayError::invalid_argument("max_pending must be at least max_in_flight"));
    }

    if cfg.sink.request_timeout_ms == 0 {
        return Err(RelayError::invalid_argument("request_timeout_ms must be greater than zero"));
    }

    for rule in &cfg.passthrough {
        rule.validate()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = RelayConfig::default();
        validate_config(&cfg).unwrap();
        assert_eq!(
            cfg.logger.endpoint_for(DEFAULT_NAMESPACE),
            "http://localhost:8181/submit_change/org.gnome.gsettings"
        );
    }

    #[test]
    fn endpoint_overrides_host_and_port() {
        let mut cfg = RelayConfig::default();
        cfg.logger.admin_server_port = 0;
        cfg.logger.endpoint = Some("https://collector.example/in/".to_string());
        validate_config(&cfg).unwrap();
        assert_eq!(cfg.logger.endpoint_for("ns"), "https://collector.example/in/ns");
    }

    #[test]
    fn invalid_limits_detected() {
        let mut cfg = RelayConfig::default();
        cfg.sink.max_in_flight = 0;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = RelayConfig::default();
        cfg.sink.max_pending = cfg.sink.max_in_flight - 1;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn bad_passthrough_rule_detected() {
        let mut cfg = RelayConfig::default();
        cfg.passthrough.push(PassthroughRule::new("relative/", "x"));
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: RelayConfig = toml::from_str(
            r#"
            [logger]
            admin_server_host = "admin.example"

            [[passthrough]]
            prefix = "/org/mozilla/"
            namespace = "org.mozilla"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.logger.admin_server_host, "admin.example");
        assert_eq!(cfg.logger.admin_server_port, DEFAULT_PORT);
        assert_eq!(cfg.sink, SinkConfig::default());
        assert_eq!(cfg.passthrough, vec![PassthroughRule::new("/org/mozilla/", "org.mozilla")]);
    }
}
