//! Per-field descriptive facts.

use bizdiag_model::{AnalyticsFact, FactUnit, MonthKey};

use crate::collector::FactCollector;
use crate::panel::MonthlyPanel;
use crate::stats;

/// Fewest points for an outlier test to mean anything.
const MIN_OUTLIER_POINTS: usize = 3;
const MIN_DISTRIBUTION_POINTS: usize = 4;

pub(crate) fn series_window(series: &[(MonthKey, f64)]) -> String {
    match (series.first(), series.last()) {
        (Some((first, _)), Some((last, _))) if first == last => first.to_string(),
        (Some((first, _)), Some((last, _))) => format!("{first}..{last}"),
        _ => String::new(),
    }
}

fn humanize(field: &str) -> String {
    field.replace('_', " ")
}

/// Emits every fact the series of `field` supports.
pub(crate) fn emit_field_facts(
    panel: &MonthlyPanel,
    field: &str,
    unit: FactUnit,
    outlier_sigma: f64,
    out: &mut FactCollector,
) {
    let series = panel.series(field);
    if series.is_empty() {
        return;
    }
    let values: Vec<f64> = series.iter().map(|(_, value)| *value).collect();
    let name = humanize(field);
    let window = series_window(&series);
    let source = panel.source_label(field);
    let fact = |suffix: &str, label: String, value: f64, unit: FactUnit| {
        AnalyticsFact::numeric(format!("{field}_{suffix}"), label, value, unit)
            .with_period(window.clone())
            .with_source(source.clone())
    };

    if let Some(avg) = stats::mean(&values) {
        out.push(fact("avg", format!("Average monthly {name}"), avg, unit));
    }
    out.push(fact("total", format!("Total {name}"), values.iter().sum(), unit));
    if let Some(min) = values.iter().copied().reduce(f64::min) {
        out.push(fact("min", format!("Lowest monthly {name}"), min, unit));
    }
    if let Some(max) = values.iter().copied().reduce(f64::max) {
        out.push(fact("max", format!("Highest monthly {name}"), max, unit));
    }
    if let Some(median) = stats::median(&values) {
        out.push(fact("median", format!("Median monthly {name}"), median, unit));
    }
    out.push(fact(
        "months",
        format!("Months with {name}"),
        values.len() as f64,
        FactUnit::Months,
    ));

    if let Some(trend) = stats::trend(&series) {
        out.push(fact(
            "trend_slope",
            format!("{name} trend per month"),
            trend.slope,
            unit,
        ));
        if let Some(pct) = trend.window_pct {
            out.push(fact(
                "trend_pct",
                format!("{name} trend over the window"),
                pct,
                FactUnit::Percent,
            ));
        }
    }

    if values.len() >= 2
        && let Some(cv) = stats::coefficient_of_variation(&values)
    {
        out.push(fact("cv", format!("{name} volatility (CV)"), cv, FactUnit::Ratio));
    }

    if values.len() >= MIN_OUTLIER_POINTS {
        let flagged = stats::outliers(&series, outlier_sigma);
        for (month, value) in &flagged {
            out.push(
                AnalyticsFact::numeric(
                    format!("{field}_outlier_{}", month.key_suffix()),
                    format!("{name} outlier beyond {outlier_sigma} sigma"),
                    *value,
                    unit,
                )
                .with_period(month.to_string())
                .with_source(source.clone()),
            );
        }
        out.push(fact(
            "outlier_count",
            format!("{name} outlier months"),
            flagged.len() as f64,
            FactUnit::Count,
        ));
    }

    let changes: Vec<f64> = stats::month_over_month(&series)
        .into_iter()
        .map(|(_, change)| change)
        .collect();
    if let Some(avg) = stats::mean(&changes) {
        out.push(fact(
            "mom_avg_pct",
            format!("{name} average month-over-month change"),
            avg,
            FactUnit::Percent,
        ));
    }
    if let Some(max) = changes.iter().copied().reduce(f64::max) {
        out.push(fact(
            "mom_max_pct",
            format!("{name} largest month-over-month increase"),
            max,
            FactUnit::Percent,
        ));
    }
    if let Some(min) = changes.iter().copied().reduce(f64::min) {
        out.push(fact(
            "mom_min_pct",
            format!("{name} largest month-over-month decrease"),
            min,
            FactUnit::Percent,
        ));
    }

    if let Some(growth) = stats::growth(&series) {
        out.push(fact(
            "growth_total_pct",
            format!("{name} growth first to last month"),
            growth.total_pct,
            FactUnit::Percent,
        ));
        out.push(fact(
            "cmgr_pct",
            format!("{name} compound monthly growth"),
            growth.cmgr_pct,
            FactUnit::Percent,
        ));
    }

    if values.len() >= MIN_DISTRIBUTION_POINTS
        && let (Some(p25), Some(p75)) = (stats::quantile(&values, 0.25), stats::quantile(&values, 0.75))
    {
        out.push(fact("p25", format!("{name} 25th percentile"), p25, unit));
        out.push(fact("p75", format!("{name} 75th percentile"), p75, unit));
        out.push(fact("iqr", format!("{name} interquartile range"), p75 - p25, unit));
    }
}
