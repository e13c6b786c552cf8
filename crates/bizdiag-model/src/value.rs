//! Tagged cell values for raw uploads.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw cell, typed once at the ingest boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Missing,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(value) => f.write_str(&format_number(*value)),
            CellValue::Text(value) => f.write_str(value),
            CellValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            CellValue::Missing => Ok(()),
        }
    }
}

/// Formats a floating-point number without trailing zeros.
pub fn format_number(value: f64) -> String {
    let text = format!("{value}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(CellValue::Number(10.0).to_string(), "10");
        assert_eq!(CellValue::Number(10.5).to_string(), "10.5");
        assert_eq!(CellValue::Number(100.0).to_string(), "100");
        assert_eq!(CellValue::Missing.to_string(), "");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_string(&CellValue::Number(1.5)).unwrap();
        assert_eq!(json, r#"{"kind":"number","value":1.5}"#);
        let json = serde_json::to_string(&CellValue::Missing).unwrap();
        assert_eq!(json, r#"{"kind":"missing"}"#);
    }
}
