use crate::error::ExchangeError;
use serde_json::{Map, Value};
use std::time::Duration;

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Merge `overrides` into `base`, returning the merged value.
///
/// Objects merge key by key, recursively. Any other override value (scalar,
/// array, null) replaces whatever the base held at that position.
pub fn deep_extend(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in override_map {
                let next = match merged.get(key) {
                    Some(existing) => deep_extend(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, other) => other.clone(),
    }
}

/// Parse a caller-supplied JSON config string into an object.
///
/// `null` is accepted as an empty object; anything else that is not an
/// object is rejected.
pub fn parse_overrides(raw: &str) -> Result<Value, ExchangeError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ExchangeError::InvalidConfig(format!("Config is not valid JSON: {}", e)))?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        other => Err(ExchangeError::InvalidConfig(format!(
            "Config must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Merged exchange configuration: the exchange's defaults extended with the
/// caller's overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeConfig {
    value: Value,
}

impl ExchangeConfig {
    /// Build the effective config for an exchange from its defaults and the
    /// caller's overrides.
    pub fn merged(defaults: &Value, overrides: &Value) -> Self {
        Self {
            value: deep_extend(defaults, overrides),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Look up a nested value by a dotted path, e.g. `"urls.api"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.value, |current, key| current.get(key))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Base URL for the exchange's public REST API.
    pub fn api_url(&self) -> Result<String, ExchangeError> {
        self.get_str("urls.api")
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| ExchangeError::InvalidConfig("Missing urls.api".to_string()))
    }

    pub fn timeout(&self) -> Duration {
        let millis = self
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Duration::from_millis(millis)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.get_str("userAgent")
    }

    pub fn api_key(&self) -> Option<&str> {
        self.get_str("apiKey").filter(|s| !s.is_empty())
    }

    pub fn secret(&self) -> Option<&str> {
        self.get_str("secret").filter(|s| !s.is_empty())
    }

    /// Exchange-specific option, e.g. `option("latencyMs")`.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.value.get("options").and_then(|options| options.get(key))
    }
}
