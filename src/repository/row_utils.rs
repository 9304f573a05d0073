// ==========================================
// Jury Engine - row conversion helpers
// ==========================================

use crate::db::DATETIME_FORMAT;
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::Type;

/// Current UTC time truncated to the stored precision
pub fn now() -> NaiveDateTime {
    let text = Utc::now().naive_utc().format(DATETIME_FORMAT).to_string();
    NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

pub fn format_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

/// Parse a TEXT datetime column inside a row mapper
pub fn parse_datetime(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Tags -> JSON array text (trimmed, empty entries dropped)
pub fn tags_to_json(tags: &[String]) -> String {
    let cleaned: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    serde_json::to_string(&cleaned).unwrap_or_else(|_| "[]".to_string())
}

/// JSON array text -> tags inside a row mapper
pub fn tags_from_json(idx: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse an enum stored as TEXT inside a row mapper
pub fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}
