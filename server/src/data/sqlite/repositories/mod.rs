//! SQLite repository functions, one module per table group

pub mod call_cost;
pub mod call_log;
pub mod trace;

use serde_json::Value as JsonValue;

use super::SqliteError;

/// Decode a nullable JSON TEXT column
fn parse_json_column(value: Option<String>) -> Result<Option<JsonValue>, SqliteError> {
    value
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(Into::into)
}
