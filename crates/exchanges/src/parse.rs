use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Parse a decimal string, accepting scientific notation. Blank reads as `None`.
pub fn decimal_str(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .map(|d| d.normalize())
}

/// Read a decimal from a JSON string or number.
pub fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => decimal_str(s),
        Value::Number(n) => decimal_str(&n.to_string()),
        _ => None,
    }
}

/// Read a decimal field of a JSON object.
pub fn decimal_field(value: &Value, key: &str) -> Option<Decimal> {
    value.get(key).and_then(decimal)
}

/// Read the `index`th element of a JSON array field as a decimal.
pub fn decimal_at(value: &Value, key: &str, index: usize) -> Option<Decimal> {
    value
        .get(key)
        .and_then(|v| v.get(index))
        .and_then(decimal)
}

pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Smallest increment for a number of decimal places, e.g. `2` -> `0.01`.
pub fn precision_from_digits(digits: u64) -> Option<Decimal> {
    let scale = u32::try_from(digits).ok().filter(|s| *s <= 28)?;
    Some(Decimal::new(1, scale))
}
