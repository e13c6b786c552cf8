//! Labor pack: pay periods prorated across the months they overlap.

use bizdiag_config::keys;
use bizdiag_model::{MonthKey, PackPanel};

use crate::engine::MappedPack;
use crate::proration::{overlap_days, prorate_period};
use crate::transform::read_date;

pub(crate) fn normalize(mapped: &MappedPack<'_>) -> PackPanel {
    let mut builder = mapped.builder(&[]);
    let start_columns = mapped.columns_for(keys::PAY_PERIOD_START).unwrap_or_default();
    let end_columns = mapped.columns_for(keys::PAY_PERIOD_END);
    if end_columns.is_none() {
        builder.warn(format!(
            "`{}` is not mapped; every pay period is treated as a single day",
            keys::PAY_PERIOD_END
        ));
    }

    for row in &mapped.table.rows {
        let mut key_issues = Vec::new();
        let Some(start) = read_date(row, start_columns, &mut key_issues) else {
            builder.reject(
                row.index,
                format!("row {}: no readable pay period start; rejected", row.index),
            );
            continue;
        };
        let end = match end_columns.and_then(|columns| read_date(row, columns, &mut key_issues)) {
            Some(end) => end,
            None => {
                if end_columns.is_some() {
                    let state = if key_issues.is_empty() { "missing" } else { "unreadable" };
                    builder.flag(
                        MonthKey::from_date(start),
                        format!(
                            "row {}: pay period end {state}; treated as a single day",
                            row.index
                        ),
                    );
                }
                start
            }
        };
        if end < start {
            builder.reject(
                row.index,
                format!(
                    "row {}: pay period ends ({}) before it starts ({}); rejected",
                    row.index,
                    end.format("%Y-%m-%d"),
                    start.format("%Y-%m-%d")
                ),
            );
            continue;
        }

        let overlaps = overlap_days(start, end);
        for (month, _) in &overlaps {
            builder.touch(*month);
        }
        builder.mark_usable();
        let first_month = overlaps.first().map(|(month, _)| *month);

        for measure in &mapped.measures {
            let mut issues = Vec::new();
            if let Some(total) = measure.read(row, &mut issues) {
                for (month, share) in prorate_period(start, end, total) {
                    builder.add(month, measure.name, share);
                }
            }
            if let Some(month) = first_month {
                for issue in issues {
                    builder.flag(month, issue.describe(row.index));
                }
            }
        }
    }

    builder.finish(&mapped.completeness_basis())
}
