use std::collections::HashMap;

use crate::error::SettingsError;

/// A module declares one of these to turn its raw `key -> value` settings
/// map into a typed struct. Values transit a string-typed store, so the
/// parser must tolerate string-encoded booleans and numbers (spec §4.3).
pub trait SettingsParser: Sized {
    fn parse(module: &str, raw: &HashMap<String, String>) -> Result<Self, SettingsError>;
}

/// Reads a required string field, erroring with `MissingRequired` if
/// absent or empty.
pub fn require_str<'a>(
    module: &str,
    raw: &'a HashMap<String, String>,
    key: &str,
) -> Result<&'a str, SettingsError> {
    match raw.get(key).map(|s| s.as_str()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SettingsError::MissingRequired { module: module.to_string(), key: key.to_string() }),
    }
}

pub fn optional_str<'a>(raw: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    raw.get(key).map(|s| s.as_str()).filter(|s| !s.is_empty())
}

/// Coerces `"true"`/`"false"` (case-insensitive) to a bool, defaulting
/// when the key is absent.
pub fn bool_or(raw: &HashMap<String, String>, key: &str, default: bool) -> Result<bool, SettingsError> {
    match raw.get(key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(SettingsError::InvalidValue {
                module: String::new(),
                key: key.to_string(),
                reason: format!("expected true/false, got `{other}`"),
            }),
        },
    }
}

/// Parses a numeric setting, defaulting when absent and enforcing a
/// positivity constraint when `must_be_positive` is set (spec §4.3's
/// "numeric constraints (e.g., positive thresholds)").
pub fn number_or(
    module: &str,
    raw: &HashMap<String, String>,
    key: &str,
    default: f64,
    must_be_positive: bool,
) -> Result<f64, SettingsError> {
    let value = match raw.get(key) {
        None => default,
        Some(v) => v.parse::<f64>().map_err(|_| SettingsError::InvalidValue {
            module: module.to_string(),
            key: key.to_string(),
            reason: format!("expected a number, got `{v}`"),
        })?,
    };

    if must_be_positive && value <= 0.0 {
        return Err(SettingsError::InvalidValue {
            module: module.to_string(),
            key: key.to_string(),
            reason: format!("must be positive, got {value}"),
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_or_coerces_string_booleans() {
        let mut raw = HashMap::new();
        raw.insert("enabled".to_string(), "TRUE".to_string());
        assert!(bool_or(&raw, "enabled", false).unwrap());
    }

    #[test]
    fn bool_or_rejects_garbage() {
        let mut raw = HashMap::new();
        raw.insert("enabled".to_string(), "maybe".to_string());
        assert!(bool_or(&raw, "enabled", false).is_err());
    }

    #[test]
    fn number_or_enforces_positive_constraint() {
        let mut raw = HashMap::new();
        raw.insert("threshold".to_string(), "-1".to_string());
        assert!(number_or("bybit", &raw, "threshold", 1.0, true).is_err());
    }

    #[test]
    fn require_str_errors_on_missing() {
        let raw = HashMap::new();
        let err = require_str("bybit", &raw, "api_key").unwrap_err();
        assert!(matches!(err, SettingsError::MissingRequired { .. }));
    }
}
