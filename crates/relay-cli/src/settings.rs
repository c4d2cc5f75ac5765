//! Runtime configuration assembly.
//!
//! Precedence, lowest to highest:
//! - built-in defaults (`RelayConfig::default()`)
//! - `--host` / `--port`
//! - values present in the `[logger]` section of the configuration file
//! - `--endpoint`
//!
//! A configuration file that is missing, unparseable, or has no `[logger]`
//! section is a startup error.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

use settings_relay_core::config::{validate_config, RelayConfig};

/// Flag values that may override configuration defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub endpoint: Option<&'a str>,
}

pub fn resolve(configuration: Option<&Path>, flags: Overrides<'_>) -> Result<RelayConfig> {
    let (mut cfg, file_logger) = match configuration {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("could not read configuration file {}", path.display()))?;
            parse_config(&raw).with_context(|| format!("invalid configuration file {}", path.display()))?
        }
        None => (RelayConfig::default(), toml::Table::new()),
    };

    if let Some(host) = flags.host {
        if !file_logger.contains_key("admin_server_host") {
            cfg.logger.admin_server_host = host.to_string();
        }
    }
    if let Some(port) = flags.port {
        if !file_logger.contains_key("admin_server_port") {
            cfg.logger.admin_server_port = port;
        }
    }
    if let Some(endpoint) = flags.endpoint {
        cfg.logger.endpoint = Some(normalize_endpoint(endpoint)?);
    }

    validate_config(&cfg).map_err(|e| anyhow!("invalid configuration: {e}"))?;
    Ok(cfg)
}

/// Parse a TOML document, returning the config and the raw `[logger]` table.
fn parse_config(raw: &str) -> Result<(RelayConfig, toml::Table)> {
    let doc: toml::Table = raw.parse().map_err(|e| anyhow!("toml parse error: {e}"))?;

    let logger = match doc.get("logger") {
        Some(toml::Value::Table(t)) => t.clone(),
        Some(_) => bail!("`logger` must be a table"),
        None => bail!("configuration has no [logger] section"),
    };

    let cfg: RelayConfig = toml::Value::Table(doc)
        .try_into()
        .map_err(|e| anyhow!("configuration error: {e}"))?;
    Ok((cfg, logger))
}

/// Accept an endpoint with or without a trailing slash.
fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint).with_context(|| format!("invalid endpoint URL {endpoint:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("endpoint must be http or https, got {}", url.scheme());
    }
    let mut s = url.to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_without_file() {
        let cfg = resolve(None, Overrides::default()).unwrap();
        assert_eq!(cfg, RelayConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = resolve(
            None,
            Overrides {
                host: Some("admin"),
                port: Some(9000),
                endpoint: None,
            },
        )
        .unwrap();
        assert_eq!(cfg.logger.endpoint_for("ns"), "http://admin:9000/submit_change/ns");
    }

    #[test]
    fn file_overrides_flags_but_only_for_present_keys() {
        let f = write_config("[logger]\nadmin_server_port = 7000\n");
        let cfg = resolve(
            Some(f.path()),
            Overrides {
                host: Some("flag-host"),
                port: Some(9000),
                endpoint: None,
            },
        )
        .unwrap();
        assert_eq!(cfg.logger.admin_server_host, "flag-host");
        assert_eq!(cfg.logger.admin_server_port, 7000);
    }

    #[test]
    fn endpoint_flag_wins() {
        let f = write_config("[logger]\nadmin_server_host = \"file\"\n");
        let cfg = resolve(
            Some(f.path()),
            Overrides {
                endpoint: Some("http://collector:1234/in"),
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.logger.endpoint_for("ns"), "http://collector:1234/in/ns");
    }

    #[test]
    fn missing_logger_section_is_fatal() {
        let f = write_config("[sink]\nmax_in_flight = 2\n");
        let err = resolve(Some(f.path()), Overrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("no [logger] section"));
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(resolve(Some(Path::new("/nonexistent/relay.toml")), Overrides::default()).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let f = write_config("[logger]\n[sink]\nmax_in_flight = 0\n");
        assert!(resolve(Some(f.path()), Overrides::default()).is_err());
        assert!(normalize_endpoint("ftp://x/").is_err());
    }
}
