use std::collections::BTreeSet;

use bizdiag_analytics::{AnalyticsEngine, Answers, PackCoverage, detect_mode};
use bizdiag_config::{ModeThresholds, VerticalConfig};
use bizdiag_model::{FactUnit, MonthKey, MonthlyPanelRow, OperatingMode, PackPanel, PackType};
use proptest::prelude::*;
use serde_json::json;

const RESTAURANT: &str = include_str!("../../../verticals/restaurant.json");

fn config() -> VerticalConfig {
    VerticalConfig::from_json_str(RESTAURANT).unwrap()
}

/// A pack panel whose months start in January 2024, one row per entry.
fn panel(pack: PackType, columns: &[(&str, Vec<f64>)]) -> PackPanel {
    let months = columns.iter().map(|(_, values)| values.len()).max().unwrap_or(0);
    let mut panel = PackPanel::empty(pack);
    panel.fields = columns.iter().map(|(field, _)| (*field).to_string()).collect();
    panel.completeness_score = 1.0;
    let mut month = MonthKey::new(2024, 1).unwrap();
    for index in 0..months {
        let mut row = MonthlyPanelRow::new(month, pack);
        for (field, values) in columns {
            row.values.insert((*field).to_string(), values.get(index).copied());
        }
        row.completeness_score = 1.0;
        panel.rows.push(row);
        month = month.next();
    }
    panel.input_rows = months;
    panel.usable_rows = months;
    panel
}

fn twelve(start: f64, step: f64) -> Vec<f64> {
    (0..12u32).map(|i| start + step * f64::from(i)).collect()
}

#[test]
fn twelve_months_of_pnl_without_labor() {
    let config = config();
    let revenue = twelve(10_000.0, 100.0);
    let cogs = twelve(3_000.0, 30.0);
    let pnl = panel(PackType::Pnl, &[("revenue", revenue), ("cogs", cogs)]);

    let output = AnalyticsEngine::new(&config).run(&[pnl]);

    assert_eq!(output.mode.mode, OperatingMode::Pnl);
    assert!((output.mode.confidence - 0.85).abs() < 1e-9);
    assert_eq!(output.facts.value("panel_months"), Some(12.0));
    assert!((output.facts.value("revenue_avg").unwrap() - 10_550.0).abs() < 1e-6);
    assert!((output.facts.value("revenue_trend_slope").unwrap() - 100.0).abs() < 1e-6);
    assert!((output.facts.value("cogs_pct_avg").unwrap() - 30.0).abs() < 1e-6);
    assert!(
        (output.facts.value("annual_revenue_run_rate").unwrap() - 10_550.0 * 12.0).abs() < 1e-6
    );
    assert!(!output.facts.contains("labor_pct_avg"));
    assert!(!output.facts.contains("prime_cost_pct_avg"));
    assert!(!output.facts.contains("labor_avg"));

    let fact = output.facts.get("revenue_avg").unwrap();
    assert_eq!(fact.unit, FactUnit::Currency);
    assert_eq!(fact.period, "2024-01..2024-12");
    assert_eq!(fact.source, "PNL");
}

#[test]
fn single_month_is_directional_without_trends() {
    let config = config();
    let pnl = panel(PackType::Pnl, &[("revenue", vec![1000.0]), ("cogs", vec![300.0])]);

    let output = AnalyticsEngine::new(&config).run(&[pnl]);

    assert_eq!(output.mode.mode, OperatingMode::Directional);
    assert!(output.facts.keys().all(|key| !key.contains("trend")));
    let keys: Vec<&str> = output.facts.keys().collect();
    insta::assert_snapshot!(keys.join("\n"), @r"
    panel_months
    data_completeness
    cogs_avg
    cogs_total
    cogs_min
    cogs_max
    cogs_median
    cogs_months
    revenue_avg
    revenue_total
    revenue_min
    revenue_max
    revenue_median
    revenue_months
    cogs_pct_avg
    cogs_pct_latest
    annual_revenue_run_rate
    cogs_pct_avg_vs_benchmark
    ");
}

#[test]
fn spike_shows_in_volatility_and_outliers() {
    let mut config = config();
    let pnl = panel(PackType::Pnl, &[("revenue", vec![100.0, 100.0, 100.0, 400.0])]);

    let output = AnalyticsEngine::new(&config).run(std::slice::from_ref(&pnl));
    let expected_cv = 16_875f64.sqrt() / 175.0;
    assert!((output.facts.value("revenue_cv").unwrap() - expected_cv).abs() < 1e-9);
    assert_eq!(output.facts.value("revenue_outlier_count"), Some(0.0));
    assert!(!output.facts.contains("revenue_outlier_2024_04"));

    config.assumptions.outlier_sigma = 1.5;
    let output = AnalyticsEngine::new(&config).run(&[pnl]);
    assert_eq!(output.facts.value("revenue_outlier_count"), Some(1.0));
    let flagged = output.facts.get("revenue_outlier_2024_04").unwrap();
    assert_eq!(flagged.value, Some(400.0));
    assert_eq!(flagged.period, "2024-04");
}

#[test]
fn labor_pack_fills_ratio_signals_and_benchmarks() {
    let config = config();
    let pnl = panel(
        PackType::Pnl,
        &[("revenue", vec![1000.0, 1000.0, 1000.0]), ("cogs", vec![300.0, 300.0, 300.0])],
    );
    let labor = panel(
        PackType::Labor,
        &[("labor", vec![350.0, 350.0, 350.0]), ("labor_hours", vec![20.0, 25.0, 25.0])],
    );

    let output = AnalyticsEngine::new(&config).run(&[labor, pnl]);

    assert_eq!(output.mode.mode, OperatingMode::Pnl);
    assert!((output.mode.confidence - 0.9).abs() < 1e-9);
    assert!((output.facts.value("labor_pct_avg").unwrap() - 35.0).abs() < 1e-9);
    assert!((output.facts.value("prime_cost_pct_avg").unwrap() - 65.0).abs() < 1e-9);
    assert!((output.facts.value("labor_pct_avg_vs_benchmark").unwrap() - 5.0).abs() < 1e-9);
    assert!((output.facts.value("revenue_per_labor_hour_latest").unwrap() - 40.0).abs() < 1e-9);
    assert_eq!(output.facts.get("labor_hours_avg").unwrap().unit, FactUnit::Hours);
    assert_eq!(output.facts.get("labor_avg").unwrap().source, "LABOR");
}

#[test]
fn questionnaire_answers_become_facts() {
    let config = config();
    let answers: Answers = serde_json::from_value(json!({
        "monthly_close": "no",
        "scheduling_tool": "whiteboard",
        "staffing_difficulty": 5
    }))
    .unwrap();
    let pnl = panel(PackType::Pnl, &[("revenue", vec![1000.0])]);

    let output = AnalyticsEngine::new(&config).with_answers(answers).run(&[pnl]);

    let flag = output.facts.get("questionnaire_flag_no_monthly_close").unwrap();
    assert_eq!(flag.value_text.as_deref(), Some("no_monthly_close"));
    assert!(!output.facts.contains("questionnaire_flag_manual_scheduling"));
    assert_eq!(output.facts.value("questionnaire_score_staffing_pressure"), Some(1.0));
}

#[test]
fn identical_input_gives_identical_facts() {
    let config = config();
    let revenue = twelve(5_000.0, -50.0);
    let pnl = panel(PackType::Pnl, &[("revenue", revenue)]);
    let engine = AnalyticsEngine::new(&config);

    let first = engine.run(std::slice::from_ref(&pnl));
    let second = engine.run(&[pnl]);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first.facts).unwrap(),
        serde_json::to_string(&second.facts).unwrap()
    );
    let unique: BTreeSet<&str> = first.facts.keys().collect();
    assert_eq!(unique.len(), first.facts.len());
}

#[test]
fn no_packs_is_directional_with_run_facts_only() {
    let config = config();
    let output = AnalyticsEngine::new(&config).run(&[]);
    assert_eq!(output.mode.mode, OperatingMode::Directional);
    assert_eq!(output.facts.keys().collect::<Vec<_>>(), vec!["panel_months", "data_completeness"]);
    assert!(output.issues.is_empty());
}

fn coverage(pack: PackType, months: usize, completeness: f64) -> PackCoverage {
    let mut month = MonthKey::new(2023, 1).unwrap();
    let mut set = BTreeSet::new();
    for _ in 0..months {
        set.insert(month);
        month = month.next();
    }
    PackCoverage {
        pack,
        months: set,
        completeness,
    }
}

proptest! {
    #[test]
    fn more_data_never_lowers_the_mode(
        base in proptest::collection::vec((0usize..14, 0.0f64..=1.0), 3),
        extra in proptest::collection::vec((0usize..14, 0.0f64..=1.0), 3),
        labor_values in any::<bool>(),
    ) {
        let thresholds = ModeThresholds::default();
        let mut before = Vec::new();
        let mut after = Vec::new();
        for (index, pack) in PackType::ALL.into_iter().enumerate() {
            let (months, completeness) = base[index];
            let (more, new_completeness) = extra[index];
            if months > 0 {
                before.push(coverage(pack, months, completeness));
                after.push(coverage(pack, months + more, completeness));
            } else if more > 0 {
                after.push(coverage(pack, more, new_completeness));
            }
        }

        let lower = detect_mode(&thresholds, &before, labor_values).mode;
        let higher = detect_mode(&thresholds, &after, labor_values).mode;
        prop_assert!(higher >= lower, "{lower} became {higher}");
    }
}
