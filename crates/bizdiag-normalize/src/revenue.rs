//! Revenue pack: transaction rows summed to monthly totals.

use bizdiag_config::keys;
use bizdiag_ingest::PeriodText;
use bizdiag_model::{MonthKey, PackPanel};

use crate::engine::MappedPack;
use crate::transform::{read_date, read_period};

pub(crate) fn normalize(mapped: &MappedPack<'_>) -> PackPanel {
    let mut builder = mapped.builder(&[keys::TRANSACTION_COUNT]);
    let date_columns = mapped.columns_for(keys::TRANSACTION_DATE).unwrap_or_default();
    let count_mapped = mapped
        .measures
        .iter()
        .any(|measure| measure.name == keys::TRANSACTION_COUNT);

    for row in &mapped.table.rows {
        let mut key_issues = Vec::new();
        let month = match read_date(row, date_columns, &mut key_issues) {
            Some(date) => Some(MonthKey::from_date(date)),
            // Exports that only carry the month are still usable.
            None => match read_period(row, date_columns, &mut Vec::new()) {
                Some(PeriodText::Month(month)) => Some(month),
                _ => None,
            },
        };
        let Some(month) = month else {
            let reason = if key_issues.is_empty() {
                "no transaction date"
            } else {
                "unreadable transaction date"
            };
            builder.reject(row.index, format!("row {}: {reason}; rejected", row.index));
            continue;
        };

        builder.touch(month);
        builder.mark_usable();
        for measure in &mapped.measures {
            let mut issues = Vec::new();
            if let Some(value) = measure.read(row, &mut issues) {
                builder.add(month, measure.name, value);
            }
            for issue in issues {
                builder.flag(month, issue.describe(row.index));
            }
        }
        if !count_mapped {
            builder.add(month, keys::TRANSACTION_COUNT, 1.0);
        }
    }

    builder.finish(&mapped.completeness_basis())
}
