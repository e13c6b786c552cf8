//! P&L pack: one row per month of already-aggregated figures.

use std::collections::BTreeMap;

use bizdiag_config::keys;
use bizdiag_ingest::PeriodText;
use bizdiag_model::{MonthKey, PackPanel};

use crate::engine::MappedPack;
use crate::transform::{read_date, read_period};

pub(crate) fn normalize(mapped: &MappedPack<'_>) -> PackPanel {
    let mut builder = mapped.builder(&[]);
    let month_columns = mapped.columns_for(keys::MONTH).unwrap_or_default();
    let start_columns = mapped.columns_for(keys::PERIOD_START);
    let end_columns = mapped.columns_for(keys::PERIOD_END);
    let mut first_seen: BTreeMap<MonthKey, usize> = BTreeMap::new();

    for row in &mapped.table.rows {
        let mut key_issues = Vec::new();
        let period = read_period(row, month_columns, &mut key_issues);
        let start = start_columns.and_then(|columns| read_date(row, columns, &mut key_issues));
        let end = end_columns.and_then(|columns| read_date(row, columns, &mut key_issues));

        if let Some(PeriodText::Span { start, end }) = period {
            builder.reject(
                row.index,
                format!(
                    "row {}: period {start} to {end} spans several months; rejected",
                    row.index
                ),
            );
            continue;
        }
        if let (Some(start), Some(end)) = (start, end)
            && MonthKey::from_date(start) != MonthKey::from_date(end)
        {
            builder.reject(
                row.index,
                format!(
                    "row {}: period {} to {} spans several months; rejected",
                    row.index,
                    start.format("%Y-%m-%d"),
                    end.format("%Y-%m-%d")
                ),
            );
            continue;
        }

        let from_dates = start.or(end).map(MonthKey::from_date);
        let month = match (period, from_dates) {
            (Some(PeriodText::Month(month)), _) => month,
            (_, Some(month)) => month,
            _ => {
                let detail = key_issues
                    .first()
                    .map(|issue| format!(" (`{}` is not a month)", issue.column))
                    .unwrap_or_default();
                builder.reject(
                    row.index,
                    format!("row {}: no readable month{detail}; rejected", row.index),
                );
                continue;
            }
        };

        if let Some(first) = first_seen.get(&month) {
            builder.flag(
                month,
                format!(
                    "row {}: duplicate of month {month} first seen in row {first}; ignored",
                    row.index
                ),
            );
            continue;
        }
        first_seen.insert(month, row.index);
        builder.touch(month);
        builder.mark_usable();

        if let Some(dated) = from_dates
            && dated != month
        {
            builder.flag(
                month,
                format!(
                    "row {}: period dates fall in {dated} but the month column says {month}; using {month}",
                    row.index
                ),
            );
        }
        for issue in &key_issues {
            builder.flag(month, issue.describe(row.index));
        }

        for measure in &mapped.measures {
            let mut issues = Vec::new();
            let value = measure.read(row, &mut issues);
            builder.set(month, measure.name, value);
            for issue in issues {
                builder.flag(month, issue.describe(row.index));
            }
        }
    }

    builder.finish(&mapped.completeness_basis())
}
