//! Typing of raw cell text.
//!
//! Cells are typed once on the way in. Numeric text with currency symbols or
//! separators stays [`CellValue::Text`]; the coercion helpers here let later
//! stages read it as a number without guessing again.

use bizdiag_model::{CellValue, MonthKey};
use chrono::{NaiveDate, NaiveDateTime};

const NULL_TOKENS: &[&str] = &["", "na", "n/a", "null", "none", "nan", "-", "--", "#n/a"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%m/%d/%y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const RANGE_SEPARATORS: &[&str] = &[" to ", " - ", " – ", " through ", "..", "–"];

/// A period read from text: one calendar month or a span of several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodText {
    Month(MonthKey),
    Span { start: MonthKey, end: MonthKey },
}

pub fn is_null_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    NULL_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Types one trimmed cell.
pub fn classify_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if is_null_token(trimmed) {
        return CellValue::Missing;
    }
    if let Ok(value) = trimmed.parse::<f64>()
        && value.is_finite()
    {
        return CellValue::Number(value);
    }
    if let Some(date) = parse_date_text(trimmed) {
        return CellValue::Date(date);
    }
    CellValue::Text(trimmed.to_string())
}

/// Reads numeric text such as `$1,200.50`, `(300)`, `12%` or `€ 99`.
pub fn parse_numeric_text(raw: &str) -> Option<f64> {
    let mut text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') {
        negative = true;
        text = &text[1..text.len() - 1];
    }
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '$' | '€' | '£' | '¥' | ',' | '%' | ' ' | '\u{a0}' | '_' => {}
            _ => cleaned.push(ch),
        }
    }
    if cleaned.is_empty() {
        return None;
    }
    if let Some(rest) = cleaned.strip_prefix('-') {
        negative = !negative;
        cleaned = rest.to_string();
    }
    if !cleaned
        .chars()
        .all(|ch| ch.is_ascii_digit() || ch == '.')
    {
        return None;
    }
    let value = cleaned.parse::<f64>().ok().filter(|value| value.is_finite())?;
    Some(if negative { -value } else { value })
}

pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                .map(|datetime| datetime.date())
        })
}

/// Reads a month from text: `2024-01`, `2024/01`, `202401`, `Jan 2024`,
/// `January 2024`, `01/2024`, or any full date.
pub fn parse_month_text(raw: &str) -> Option<MonthKey> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(date) = parse_date_text(trimmed) {
        return Some(MonthKey::from_date(date));
    }
    for separator in ['-', '/', '.'] {
        if let Some((left, right)) = trimmed.split_once(separator) {
            let (year, month) = if left.len() == 4 {
                (left, right)
            } else if right.len() == 4 {
                (right, left)
            } else {
                continue;
            };
            if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>())
                && let Some(key) = MonthKey::new(year, month)
            {
                return Some(key);
            }
        }
    }
    if trimmed.len() == 6 && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        let year: i32 = trimmed[..4].parse().ok()?;
        let month: u32 = trimmed[4..].parse().ok()?;
        if (1900..=2200).contains(&year) {
            return MonthKey::new(year, month);
        }
    }
    let padded = format!("1 {}", trimmed.replace(['-', ','], " "));
    NaiveDate::parse_from_str(&padded, "%d %B %Y")
        .ok()
        .map(MonthKey::from_date)
}

/// Reads a single month or a month range such as `2024-01 to 2024-03`.
pub fn parse_period_text(raw: &str) -> Option<PeriodText> {
    let trimmed = raw.trim();
    if let Some(month) = parse_month_text(trimmed) {
        return Some(PeriodText::Month(month));
    }
    for separator in RANGE_SEPARATORS {
        if let Some((left, right)) = trimmed.split_once(separator) {
            let (Some(start), Some(end)) = (parse_month_text(left), parse_month_text(right)) else {
                continue;
            };
            return Some(if start == end {
                PeriodText::Month(start)
            } else {
                PeriodText::Span { start, end }
            });
        }
    }
    None
}

/// Numeric reading of a typed cell, accepting numeric text.
pub fn cell_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(value) => Some(*value),
        CellValue::Text(text) => parse_numeric_text(text),
        CellValue::Date(_) | CellValue::Missing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    #[test]
    fn classifies_cells() {
        assert_eq!(classify_cell("  "), CellValue::Missing);
        assert_eq!(classify_cell("N/A"), CellValue::Missing);
        assert_eq!(classify_cell("42.5"), CellValue::Number(42.5));
        assert_eq!(
            classify_cell("2024-03-15"),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
        assert_eq!(classify_cell("$1,200"), CellValue::Text("$1,200".into()));
        assert_eq!(classify_cell("inf"), CellValue::Text("inf".into()));
    }

    #[test]
    fn coerces_currency_text() {
        assert_eq!(parse_numeric_text("$1,200.50"), Some(1200.5));
        assert_eq!(parse_numeric_text("(300)"), Some(-300.0));
        assert_eq!(parse_numeric_text("-$45"), Some(-45.0));
        assert_eq!(parse_numeric_text("12%"), Some(12.0));
        assert_eq!(parse_numeric_text("€ 99"), Some(99.0));
        assert_eq!(parse_numeric_text("about 5"), None);
        assert_eq!(parse_numeric_text("$"), None);
    }

    #[test]
    fn overflowing_digits_are_not_numbers() {
        let huge = "9".repeat(400);
        assert_eq!(parse_numeric_text(&huge), None);
        assert_eq!(parse_numeric_text(&format!("${huge}")), None);
        assert_eq!(cell_number(&classify_cell(&huge)), None);
    }

    #[test]
    fn parses_month_spellings() {
        assert_eq!(parse_month_text("2024-01"), Some(month(2024, 1)));
        assert_eq!(parse_month_text("2024/11"), Some(month(2024, 11)));
        assert_eq!(parse_month_text("03/2024"), Some(month(2024, 3)));
        assert_eq!(parse_month_text("202405"), Some(month(2024, 5)));
        assert_eq!(parse_month_text("Jan 2024"), Some(month(2024, 1)));
        assert_eq!(parse_month_text("February 2024"), Some(month(2024, 2)));
        assert_eq!(parse_month_text("2024-07-19"), Some(month(2024, 7)));
        assert_eq!(parse_month_text("Q1 2024"), None);
        assert_eq!(parse_month_text("2024-13"), None);
    }

    #[test]
    fn recognises_month_ranges() {
        assert_eq!(
            parse_period_text("2024-01 to 2024-03"),
            Some(PeriodText::Span {
                start: month(2024, 1),
                end: month(2024, 3)
            })
        );
        assert_eq!(
            parse_period_text("2024-02"),
            Some(PeriodText::Month(month(2024, 2)))
        );
        assert_eq!(parse_period_text("whenever"), None);
    }
}
