//! Parsing of stored user-preference content.

use serde_json::{Map, Value};

/// Prefix of synthesized preference content.
pub(crate) const PREFERENCE_CONTENT_PREFIX: &str = "User preference: ";

/// Why preference content could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceParseError {
    /// The content is not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// The content parsed but is not a JSON object.
    #[error("preference content is not a json object")]
    NotAnObject,
}

/// Parse preference content into a key/value object.
///
/// Accepts a raw JSON object or the synthesized
/// `User preference: <key> = <json>` form. Callers implement the
/// skip-on-failure policy; this function only reports why parsing failed.
pub fn parse_preference(content: &str) -> Result<Map<String, Value>, PreferenceParseError> {
    if let Some(rest) = content.strip_prefix(PREFERENCE_CONTENT_PREFIX) {
        if let Some((key, raw_value)) = rest.split_once('=') {
            let value: Value = serde_json::from_str(raw_value.trim())?;
            let mut preferences = Map::new();
            preferences.insert(key.trim().to_string(), value);
            return Ok(preferences);
        }
    }
    match serde_json::from_str(content)? {
        Value::Object(preferences) => Ok(preferences),
        _ => Err(PreferenceParseError::NotAnObject),
    }
}
