//! Coercion of loosely-typed JSON request fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::AppError;

pub fn required_text(value: &Option<String>, field: &str) -> Result<String, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

/// Accept a JSON number or a numeric string.
pub fn number(value: &Option<Value>, field: &str) -> Result<f64, AppError> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        None | Some(Value::Null) => return Err(AppError::Validation(format!("{field} is required"))),
        Some(Value::String(_)) => return Err(AppError::Validation(format!("{field} is required"))),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| AppError::Validation(format!("{field} must be a number")))
}

pub fn positive_count(value: &Option<Value>, field: &str) -> Result<i64, AppError> {
    let n = number(value, field)?;
    if n < 1.0 || n.fract() != 0.0 || n > i64::MAX as f64 {
        return Err(AppError::Validation(format!("{field} must be a positive whole number")));
    }
    Ok(n as i64)
}

pub fn coordinates(latitude: &Option<Value>, longitude: &Option<Value>) -> Result<(f64, f64), AppError> {
    let lat = number(latitude, "latitude")?;
    let lon = number(longitude, "longitude")?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(AppError::Validation("Location coordinates are out of range".to_string()));
    }
    Ok((lat, lon))
}

/// RFC 3339, or the `YYYY-MM-DDTHH:MM[:SS]` a browser datetime input sends (read as UTC).
pub fn timestamp(value: &Option<String>, field: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = required_text(value, field)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::Validation(format!("{field} is not a valid timestamp")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn numbers_accept_strings() {
        assert_eq!(number(&Some(json!("12.5")), "x").unwrap(), 12.5);
        assert_eq!(number(&Some(json!(7)), "x").unwrap(), 7.0);
        assert!(number(&Some(json!("abc")), "x").is_err());
        assert!(number(&None, "x").is_err());
        assert!(number(&Some(json!(true)), "x").is_err());
    }

    #[test]
    fn servings_must_be_positive_integers() {
        assert_eq!(positive_count(&Some(json!("5")), "servings").unwrap(), 5);
        assert!(positive_count(&Some(json!(0)), "servings").is_err());
        assert!(positive_count(&Some(json!(-2)), "servings").is_err());
        assert!(positive_count(&Some(json!(2.5)), "servings").is_err());
    }

    #[test]
    fn coordinates_are_range_checked() {
        assert_eq!(coordinates(&Some(json!(12.97)), &Some(json!("77.59"))).unwrap(), (12.97, 77.59));
        assert!(coordinates(&Some(json!(91)), &Some(json!(0))).is_err());
        assert!(coordinates(&Some(json!(0)), &None).is_err());
    }

    #[test]
    fn timestamps_in_browser_and_rfc3339_forms() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap();
        assert_eq!(timestamp(&Some("2026-03-01T18:30".into()), "t").unwrap(), expected);
        assert_eq!(timestamp(&Some("2026-03-02T00:00:00+05:30".into()), "t").unwrap(), expected);
        assert!(timestamp(&Some("yesterday".into()), "t").is_err());
    }

    #[test]
    fn blank_text_is_missing() {
        assert!(required_text(&Some("   ".into()), "name").is_err());
        assert_eq!(required_text(&Some(" Asha ".into()), "name").unwrap(), "Asha");
    }
}
