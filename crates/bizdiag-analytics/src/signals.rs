//! Vertical ratio signals.
//!
//! A signal that references a canonical field, directly or through another
//! signal, is a series signal: it is evaluated month by month and summarised.
//! Any other signal is scalar and evaluated once over the facts emitted so far.

use std::collections::{BTreeMap, BTreeSet};

use bizdiag_config::{EvalError, Signal, VerticalConfig};
use bizdiag_model::{AnalyticsFact, MonthKey};
use tracing::debug;

use crate::collector::FactCollector;
use crate::metrics::series_window;
use crate::panel::MonthlyPanel;
use crate::stats;

pub(crate) fn emit_signal_facts(config: &VerticalConfig, panel: &MonthlyPanel, out: &mut FactCollector) {
    let fields: BTreeSet<&str> = config
        .data_packs
        .iter()
        .flat_map(|pack| pack.fields.iter().map(|field| field.name.as_str()))
        .collect();
    let mut series_ids: BTreeSet<&str> = BTreeSet::new();
    let mut series_values: BTreeMap<&str, BTreeMap<MonthKey, f64>> = BTreeMap::new();

    // Signals arrive in dependency order.
    for signal in &config.signals {
        let is_series = signal
            .expr
            .references()
            .iter()
            .any(|name| fields.contains(name.as_str()) || series_ids.contains(name.as_str()));
        if is_series {
            series_ids.insert(signal.id.as_str());
            let values = evaluate_series(signal, panel, &fields, &series_values, out);
            emit_series(signal, &values, out);
            series_values.insert(signal.id.as_str(), values);
        } else {
            let facts = out.facts();
            match signal.expr.evaluate(&|name: &str| facts.value(name)) {
                Ok(value) => out.push(
                    AnalyticsFact::numeric(signal.id.clone(), signal.label.clone(), value, signal.unit)
                        .with_period(panel.window_label())
                        .with_source(format!("formula: {}", signal.formula)),
                ),
                Err(error) => debug!(signal = %signal.id, %error, "signal not evaluated"),
            }
        }
    }
}

fn evaluate_series(
    signal: &Signal,
    panel: &MonthlyPanel,
    fields: &BTreeSet<&str>,
    series_values: &BTreeMap<&str, BTreeMap<MonthKey, f64>>,
    out: &FactCollector,
) -> BTreeMap<MonthKey, f64> {
    let mut values = BTreeMap::new();
    let mut first_error: Option<EvalError> = None;
    for month in panel.months() {
        let resolve = |name: &str| {
            if fields.contains(name) {
                return panel.value(name, month);
            }
            if let Some(series) = series_values.get(name) {
                return series.get(&month).copied();
            }
            out.facts().value(name)
        };
        match signal.expr.evaluate(&resolve) {
            Ok(value) => {
                values.insert(month, value);
            }
            Err(error) => {
                first_error.get_or_insert(error);
            }
        }
    }
    if let Some(error) = first_error {
        debug!(
            signal = %signal.id,
            evaluated = values.len(),
            months = panel.month_count(),
            %error,
            "signal missing for some months"
        );
    }
    values
}

fn emit_series(signal: &Signal, values: &BTreeMap<MonthKey, f64>, out: &mut FactCollector) {
    let series: Vec<(MonthKey, f64)> = values.iter().map(|(month, value)| (*month, *value)).collect();
    let Some(&(latest_month, latest)) = series.last() else {
        return;
    };
    let window = series_window(&series);
    let source = format!("formula: {}", signal.formula);
    let points: Vec<f64> = series.iter().map(|(_, value)| *value).collect();

    if let Some(avg) = stats::mean(&points) {
        out.push(
            AnalyticsFact::numeric(
                format!("{}_avg", signal.id),
                format!("{} (monthly average)", signal.label),
                avg,
                signal.unit,
            )
            .with_period(window.clone())
            .with_source(source.clone()),
        );
    }
    out.push(
        AnalyticsFact::numeric(
            format!("{}_latest", signal.id),
            format!("{} (latest month)", signal.label),
            latest,
            signal.unit,
        )
        .with_period(latest_month.to_string())
        .with_source(source.clone()),
    );
    if let Some(trend) = stats::trend(&series) {
        out.push(
            AnalyticsFact::numeric(
                format!("{}_trend_slope", signal.id),
                format!("{} trend per month", signal.label),
                trend.slope,
                signal.unit,
            )
            .with_period(window)
            .with_source(source),
        );
    }
}
