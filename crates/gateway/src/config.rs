use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Gateway configuration.
///
/// Loaded from a TOML file by the CLI, or from `XBRIDGE_*` environment
/// variables by the mobile facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Runtime worker threads. `None` uses one per core.
    pub worker_threads: Option<usize>,
    /// Name given to runtime worker threads.
    pub thread_name: String,
    /// Report markets-load failures as `Invalid handle` instead of
    /// `Failed to load markets: ...`.
    pub legacy_error_envelopes: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: "xbridge-worker".to_string(),
            legacy_error_envelopes: false,
        }
    }
}

impl GatewayConfig {
    pub fn from_toml_str(raw: &str) -> GatewayResult<Self> {
        toml::from_str(raw).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Read `XBRIDGE_WORKER_THREADS` and `XBRIDGE_LEGACY_ERRORS`; unset or
    /// unparseable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(threads) = lookup("XBRIDGE_WORKER_THREADS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            config.worker_threads = Some(threads);
        }
        if let Some(legacy) = lookup("XBRIDGE_LEGACY_ERRORS").and_then(|v| parse_flag(&v)) {
            config.legacy_error_envelopes = legacy;
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.worker_threads, None);
        assert_eq!(config.thread_name, "xbridge-worker");
        assert!(!config.legacy_error_envelopes);
    }

    #[test]
    fn test_from_toml() {
        let config = GatewayConfig::from_toml_str(
            r#"
            worker_threads = 2
            legacy_error_envelopes = true
            "#,
        )
        .unwrap();
        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.thread_name, "xbridge-worker");
        assert!(config.legacy_error_envelopes);

        assert_eq!(GatewayConfig::from_toml_str("").unwrap(), GatewayConfig::default());
        assert!(matches!(
            GatewayConfig::from_toml_str("worker_threads = \"many\""),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_from_env_lookup() {
        let vars: HashMap<&str, &str> = [
            ("XBRIDGE_WORKER_THREADS", "4"),
            ("XBRIDGE_LEGACY_ERRORS", "Yes"),
        ]
        .into_iter()
        .collect();
        let config = GatewayConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.worker_threads, Some(4));
        assert!(config.legacy_error_envelopes);

        let config = GatewayConfig::from_lookup(|key| match key {
            "XBRIDGE_WORKER_THREADS" => Some("0".to_string()),
            _ => Some("maybe".to_string()),
        });
        assert_eq!(config, GatewayConfig::default());
    }
}
