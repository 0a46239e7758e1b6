//! Environment variable helpers shared by the config loaders.

use std::str::FromStr;

use crate::error::CoreError;

/// Read `key` and parse it, falling back to `default` when unset or blank.
///
/// A value that is present but does not parse is an error rather than a
/// silent fallback.
pub fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, CoreError> {
    match parse_optional(key)? {
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

/// Read `key` and parse it; `None` when unset or blank.
pub fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>, CoreError> {
    let Some(raw) = string_optional(key) else {
        return Ok(None);
    };
    raw.parse()
        .map(Some)
        .map_err(|_| CoreError::Config(format!("{key} has an invalid value: {raw:?}")))
}

/// Read `key` as a trimmed string; `None` when unset or blank.
pub fn string_optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
