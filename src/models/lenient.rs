//! Lenient field deserializers for request criteria.
//!
//! Every helper accepts any JSON value. Input that cannot be interpreted
//! (non-numeric strings, malformed `"min-max"` ranges, unknown enum names)
//! deserializes to an absent value so the owning filter stays inactive.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Best-effort numeric reading of a JSON value
pub fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn as_u64(value: &Value) -> Option<u64> {
    as_f64(value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.trunc().min(u64::MAX as f64) as u64)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_f64(&Value::deserialize(deserializer)?))
}

/// Non-negative integer, truncating fractional input like an `intval` cast
pub fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_u64(&value).map(|v| v.min(u32::MAX as u64) as u32))
}

pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_text(&Value::deserialize(deserializer)?))
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_flag(&Value::deserialize(deserializer)?).unwrap_or(false))
}

pub fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_flag(&Value::deserialize(deserializer)?))
}

/// Parse a `[min, max]` pair from either a two element array or a `"min-max"` string
pub fn parse_range(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Array(items) if items.len() == 2 => Some((as_f64(&items[0])?, as_f64(&items[1])?)),
        Value::String(s) => {
            let (min, max) = s.trim().split_once('-')?;
            let min = min.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
            let max = max.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
            Some((min, max))
        }
        _ => None,
    }
}

pub fn range<'de, D>(deserializer: D) -> Result<Option<(f64, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(parse_range(&Value::deserialize(deserializer)?))
}

/// A single string, a comma separated string or an array of strings
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let list = match value {
        Value::Array(items) => items.iter().filter_map(as_text).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    };
    Ok(list)
}

/// Positive ids; zero and unparsable entries are dropped
pub fn id_list<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let ids: Vec<u64> = match &value {
        Value::Array(items) => items.iter().filter_map(as_u64).collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|part| part.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.trunc() as u64)
            .collect(),
        other => as_u64(other).into_iter().collect(),
    };
    Ok(ids.into_iter().filter(|id| *id > 0).collect())
}

/// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(parse_datetime))
}

/// Enum-like values parsed through `FromStr`; unknown names become `None`
pub fn parsed<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(|s| s.trim().parse().ok()))
}

pub fn parsed_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    Ok(parsed(deserializer)?.unwrap_or_default())
}

/// Structured values that fall back to `None` when the shape does not match
pub fn structured<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_from_strings() {
        assert_eq!(as_f64(&json!("4.5")), Some(4.5));
        assert_eq!(as_f64(&json!(3)), Some(3.0));
        assert_eq!(as_f64(&json!("abc")), None);
        assert_eq!(as_f64(&json!(null)), None);
    }

    #[test]
    fn test_range_formats() {
        assert_eq!(parse_range(&json!("1500-6000")), Some((1500.0, 6000.0)));
        assert_eq!(parse_range(&json!([20, "35"])), Some((20.0, 35.0)));
        assert_eq!(parse_range(&json!("1500")), None);
        assert_eq!(parse_range(&json!("a-b")), None);
        assert_eq!(parse_range(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_datetime_formats() {
        let date = parse_datetime("2024-03-01").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(parse_datetime("2024-03-01T10:00:00Z").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }
}
