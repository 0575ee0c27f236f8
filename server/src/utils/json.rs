//! JSON utility functions

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Converts a JsonValue to Option<String>, returning None for null values.
///
/// Keeps `JsonValue::Null` out of TEXT columns as the literal `"null"`.
pub fn json_to_opt_string(value: &JsonValue) -> Option<String> {
    if value.is_null() {
        None
    } else {
        serde_json::to_string(value).ok()
    }
}

/// Deserialize an optional identifier that SDKs send either as a string or a number
pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Deserialize an optional float, treating strings, booleans and non-finite values as absent
pub fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// Deserialize an optional structure, treating a value of the wrong shape as absent
///
/// Type errors inside the value are logged at debug and yield `T::default()`.
pub fn deserialize_lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(JsonValue::Null) => T::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Ignoring malformed optional field");
            T::default()
        }),
    })
}

/// Deserialize a list, dropping elements that do not match `T`
///
/// A non-list value is treated as an empty list.
pub fn deserialize_lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::Array(items)) => items,
        None | Some(JsonValue::Null) => return Ok(Vec::new()),
        Some(other) => {
            tracing::debug!(value = %other, "Expected a list, ignoring");
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| tracing::debug!(index, error = %e, "Dropping malformed list item"))
                .ok()
        })
        .collect())
}
