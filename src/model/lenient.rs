//! Forgiving field decoders for persisted and submitted documents.
//!
//! A document that decodes structurally must never be rejected for a stray
//! field type; these helpers turn anything unexpected into "absent" and let
//! the normalizer repair it.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use super::UNORDERED;

/// Decode a list, skipping elements that do not fit `T`.
/// Anything other than an array yields an empty list.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Position hint; missing or non-numeric values sort after every numbered entity.
pub(crate) fn order<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(order_from(&value))
}

fn order_from(value: &Value) -> i64 {
    if let Some(order) = value.as_i64() {
        return order;
    }
    match value.as_f64() {
        #[allow(clippy::cast_possible_truncation)]
        Some(order) if order.is_finite() => order.floor() as i64,
        _ => UNORDERED,
    }
}

/// Booleans only; anything else means enabled.
pub(crate) fn enabled<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(true))
}

/// Trimmed non-empty string, otherwise absent.
pub(crate) fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string))
}

/// Any string as-is, otherwise empty.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string).unwrap_or_default())
}

pub(crate) const fn unordered() -> i64 {
    UNORDERED
}

pub(crate) const fn enabled_default() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_accepts_integers_and_floors_floats() {
        assert_eq!(order_from(&json!(3)), 3);
        assert_eq!(order_from(&json!(2.7)), 2);
        assert_eq!(order_from(&json!(-1)), -1);
    }

    #[test]
    fn order_treats_garbage_as_unordered() {
        assert_eq!(order_from(&json!("1")), UNORDERED);
        assert_eq!(order_from(&json!(null)), UNORDERED);
        assert_eq!(order_from(&json!({})), UNORDERED);
    }
}
