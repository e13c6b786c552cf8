//! Generic per-field transforms and multi-column merges.

use bizdiag_ingest::{PeriodText, cell_number, parse_date_text, parse_month_text, parse_period_text};
use bizdiag_model::{CellValue, MergePolicy, MonthKey, RawRow, Transform};
use chrono::NaiveDate;

/// A cell after its field's transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    Missing,
    Number(f64),
    Date(NaiveDate),
    Period(PeriodText),
    Text(String),
}

/// A cell that could not be read the way its field expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformIssue {
    pub column: String,
    pub raw: String,
    pub expected: &'static str,
}

impl TransformIssue {
    /// Warning text for a row. The raw value is kept short.
    pub fn describe(&self, row_index: usize) -> String {
        let mut raw: String = self.raw.chars().take(40).collect();
        if raw.len() < self.raw.len() {
            raw.push('…');
        }
        format!(
            "row {row_index}: `{}` value '{raw}' is not a {}; dropped",
            self.column, self.expected
        )
    }
}

/// Apply `transform` to one cell of `column`.
pub fn apply_transform(
    transform: Transform,
    column: &str,
    cell: &CellValue,
) -> Result<Transformed, TransformIssue> {
    if cell.is_missing() {
        return Ok(Transformed::Missing);
    }
    let issue = |expected| TransformIssue {
        column: column.to_string(),
        raw: cell.to_string(),
        expected,
    };
    match transform {
        Transform::None => Ok(match cell {
            CellValue::Number(value) => Transformed::Number(*value),
            CellValue::Date(date) => Transformed::Date(*date),
            other => Transformed::Text(other.to_string()),
        }),
        Transform::ToNumber => cell_number(cell)
            .map(Transformed::Number)
            .ok_or_else(|| issue("number")),
        Transform::ParseDate => match cell {
            CellValue::Date(date) => Ok(Transformed::Date(*date)),
            CellValue::Text(text) => parse_date_text(text)
                .map(Transformed::Date)
                .ok_or_else(|| issue("date")),
            _ => Err(issue("date")),
        },
        Transform::ParseMonth => match cell {
            CellValue::Date(date) => Ok(Transformed::Period(PeriodText::Month(
                MonthKey::from_date(*date),
            ))),
            CellValue::Text(text) => parse_period_text(text)
                .map(Transformed::Period)
                .ok_or_else(|| issue("month")),
            CellValue::Number(value) => numeric_month(*value)
                .map(|month| Transformed::Period(PeriodText::Month(month)))
                .ok_or_else(|| issue("month")),
            CellValue::Missing => Ok(Transformed::Missing),
        },
    }
}

/// `202403` read as a number.
fn numeric_month(value: f64) -> Option<MonthKey> {
    if value.fract() != 0.0 || !(190_001.0..=220_012.0).contains(&value) {
        return None;
    }
    parse_month_text(&format!("{value:.0}"))
}

/// Collapse several source values into one according to `policy`.
///
/// `None` when no source had a value.
pub fn merge_numbers(values: &[f64], policy: MergePolicy) -> Option<f64> {
    match policy {
        MergePolicy::Coalesce => values.first().copied(),
        MergePolicy::Sum => (!values.is_empty()).then(|| values.iter().sum()),
    }
}

/// Numeric value of a mapped field for one row: every source column is read
/// with the mapping's transform and merged. Unreadable cells are reported and
/// skipped.
///
/// `Transform::None` keeps only cells that are already numbers; text such as
/// `$1,200` needs `Transform::ToNumber`.
pub fn read_number(
    row: &RawRow,
    source_columns: &[String],
    transform: Transform,
    merge: MergePolicy,
    issues: &mut Vec<TransformIssue>,
) -> Option<f64> {
    let mut values = Vec::with_capacity(source_columns.len());
    for column in source_columns {
        let cell = row.get(column);
        match apply_transform(transform, column, cell) {
            Ok(Transformed::Number(value)) => values.push(value),
            Ok(Transformed::Missing) => {}
            Ok(_) => issues.push(TransformIssue {
                column: column.clone(),
                raw: cell.to_string(),
                expected: "number",
            }),
            Err(issue) => issues.push(issue),
        }
    }
    merge_numbers(&values, merge)
}

/// First readable date among the source columns.
pub fn read_date(
    row: &RawRow,
    source_columns: &[String],
    issues: &mut Vec<TransformIssue>,
) -> Option<NaiveDate> {
    for column in source_columns {
        match apply_transform(Transform::ParseDate, column, row.get(column)) {
            Ok(Transformed::Date(date)) => return Some(date),
            Ok(_) => {}
            Err(issue) => issues.push(issue),
        }
    }
    None
}

/// First readable period among the source columns.
pub fn read_period(
    row: &RawRow,
    source_columns: &[String],
    issues: &mut Vec<TransformIssue>,
) -> Option<PeriodText> {
    for column in source_columns {
        match apply_transform(Transform::ParseMonth, column, row.get(column)) {
            Ok(Transformed::Period(period)) => return Some(period),
            Ok(_) => {}
            Err(issue) => issues.push(issue),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    #[test]
    fn to_number_accepts_currency_text() {
        let cell = CellValue::Text("$1,250.50".into());
        assert_eq!(
            apply_transform(Transform::ToNumber, "Sales", &cell),
            Ok(Transformed::Number(1250.5))
        );
        let bad = CellValue::Text("closed".into());
        let issue = apply_transform(Transform::ToNumber, "Sales", &bad).unwrap_err();
        assert_eq!(issue.expected, "number");
        assert_eq!(
            issue.describe(3),
            "row 3: `Sales` value 'closed' is not a number; dropped"
        );
    }

    #[test]
    fn parse_month_reads_dates_text_and_numbers() {
        let date = CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(
            apply_transform(Transform::ParseMonth, "Month", &date),
            Ok(Transformed::Period(PeriodText::Month(month(2024, 3))))
        );
        assert_eq!(
            apply_transform(Transform::ParseMonth, "Month", &CellValue::Number(202_402.0)),
            Ok(Transformed::Period(PeriodText::Month(month(2024, 2))))
        );
        assert_eq!(
            apply_transform(
                Transform::ParseMonth,
                "Month",
                &CellValue::Text("2024-01 to 2024-03".into())
            ),
            Ok(Transformed::Period(PeriodText::Span {
                start: month(2024, 1),
                end: month(2024, 3)
            }))
        );
        assert!(apply_transform(Transform::ParseMonth, "Month", &CellValue::Number(42.0)).is_err());
    }

    #[test]
    fn missing_is_never_an_issue() {
        for transform in [
            Transform::None,
            Transform::ToNumber,
            Transform::ParseDate,
            Transform::ParseMonth,
        ] {
            assert_eq!(
                apply_transform(transform, "x", &CellValue::Missing),
                Ok(Transformed::Missing)
            );
        }
    }

    #[test]
    fn merge_policies() {
        assert_eq!(merge_numbers(&[2.0, 3.0], MergePolicy::Coalesce), Some(2.0));
        assert_eq!(merge_numbers(&[2.0, 3.0], MergePolicy::Sum), Some(5.0));
        assert_eq!(merge_numbers(&[], MergePolicy::Sum), None);
        assert_eq!(merge_numbers(&[], MergePolicy::Coalesce), None);
    }

    #[test]
    fn read_number_merges_and_reports() {
        let mut row = RawRow::new(7);
        row.cells.insert("Wages".into(), CellValue::Number(100.0));
        row.cells.insert("Tips".into(), CellValue::Text("n/a?".into()));
        row.cells.insert("Bonus".into(), CellValue::Text("$50".into()));
        let mut issues = Vec::new();
        let value = read_number(
            &row,
            &["Wages".into(), "Tips".into(), "Bonus".into()],
            Transform::ToNumber,
            MergePolicy::Sum,
            &mut issues,
        );
        assert_eq!(value, Some(150.0));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, "Tips");
    }

    #[test]
    fn read_number_honors_the_mapping_transform() {
        let mut row = RawRow::new(2);
        row.cells.insert("Sales".into(), CellValue::Text("$1,200".into()));
        row.cells.insert("Tips".into(), CellValue::Number(80.0));
        let columns = ["Sales".to_string(), "Tips".to_string()];

        let mut issues = Vec::new();
        let coerced = read_number(&row, &columns, Transform::ToNumber, MergePolicy::Sum, &mut issues);
        assert_eq!(coerced, Some(1280.0));
        assert!(issues.is_empty());

        let as_is = read_number(&row, &columns, Transform::None, MergePolicy::Sum, &mut issues);
        assert_eq!(as_is, Some(80.0));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, "Sales");
        assert_eq!(issues[0].expected, "number");
    }
}
