//! Impact sizing.

use bizdiag_config::{InitiativeSpec, SizingMethod};
use bizdiag_model::{FactSet, ImpactRange, format_number};

/// Sized impact of one initiative. `impact` is `None` when the basis fact
/// is missing or unusable; the run carries on either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Sizing {
    pub impact: Option<ImpactRange>,
    pub basis: Option<String>,
    pub note: String,
}

/// Sizes one initiative against the fact set.
///
/// Percentage methods multiply the basis fact (a monthly average) by the
/// annualization factor and by each of the low/mid/high percentages.
pub fn size_initiative(spec: &InitiativeSpec, facts: &FactSet, annualization: f64) -> Sizing {
    let params = spec.sizing_params;
    if spec.sizing_method == SizingMethod::FixedValue {
        return Sizing {
            impact: Some(ordered(params.low, params.mid, params.high)),
            basis: None,
            note: format!(
                "fixed estimate of {} to {} per year",
                format_number(params.low),
                format_number(params.high)
            ),
        };
    }

    let Some(basis) = spec.basis_key() else {
        return Sizing {
            impact: None,
            basis: None,
            note: format!("{} has no basis fact", spec.sizing_method.as_str()),
        };
    };
    match facts.value(basis) {
        Some(value) if value.is_finite() && value > 0.0 => {
            let annual = value * annualization;
            Sizing {
                impact: Some(ordered(
                    annual * params.low,
                    annual * params.mid,
                    annual * params.high,
                )),
                basis: Some(basis.to_string()),
                note: format!(
                    "{}% to {}% of `{basis}` ({}) annualized x{}",
                    percent(params.low),
                    percent(params.high),
                    format_number(value),
                    format_number(annualization)
                ),
            }
        }
        Some(_) => Sizing {
            impact: None,
            basis: Some(basis.to_string()),
            note: format!("`{basis}` is not positive; impact not sized"),
        },
        None => Sizing {
            impact: None,
            basis: Some(basis.to_string()),
            note: format!("`{basis}` unavailable; impact not sized"),
        },
    }
}

/// `0.07` as `7`, without float noise.
fn percent(share: f64) -> String {
    format_number((share * 100.0 * 1e6).round() / 1e6)
}

/// Keeps `low <= mid <= high` even for misordered parameters.
fn ordered(low: f64, mid: f64, high: f64) -> ImpactRange {
    let mut values = [low, mid, high];
    values.sort_by(f64::total_cmp);
    ImpactRange {
        low: values[0],
        mid: values[1],
        high: values[2],
    }
}

#[cfg(test)]
mod tests {
    use bizdiag_config::{EligibilityRules, SizingParams};
    use bizdiag_model::{AnalyticsFact, FactUnit};

    use super::*;

    fn spec(method: SizingMethod, low: f64, mid: f64, high: f64) -> InitiativeSpec {
        InitiativeSpec {
            id: "pricing_review".into(),
            title: "Targeted price review".into(),
            category: "revenue".into(),
            description: String::new(),
            eligibility_rules: EligibilityRules::default(),
            sizing_method: method,
            sizing_params: SizingParams { low, mid, high },
            basis_key: None,
            priority_weight: 0.8,
            evidence_keys: Vec::new(),
            benchmark_gap: None,
        }
    }

    fn facts(key: &str, value: f64) -> FactSet {
        let mut facts = FactSet::new();
        facts
            .insert(AnalyticsFact::numeric(key, key, value, FactUnit::Currency))
            .unwrap();
        facts
    }

    #[test]
    fn percentage_of_revenue_is_annualized() {
        let sizing = size_initiative(
            &spec(SizingMethod::PercentageOfRevenue, 0.01, 0.02, 0.03),
            &facts("revenue_avg", 10_000.0),
            12.0,
        );
        let impact = sizing.impact.unwrap();
        assert!((impact.low - 1_200.0).abs() < 1e-9);
        assert!((impact.mid - 2_400.0).abs() < 1e-9);
        assert!((impact.high - 3_600.0).abs() < 1e-9);
        assert_eq!(sizing.basis.as_deref(), Some("revenue_avg"));
        assert_eq!(sizing.note, "1% to 3% of `revenue_avg` (10000) annualized x12");
    }

    #[test]
    fn missing_basis_leaves_impact_empty() {
        let sizing = size_initiative(
            &spec(SizingMethod::PercentageOfLabor, 0.03, 0.05, 0.08),
            &facts("revenue_avg", 10_000.0),
            12.0,
        );
        assert_eq!(sizing.impact, None);
        assert_eq!(sizing.note, "`labor_avg` unavailable; impact not sized");
    }

    #[test]
    fn non_positive_basis_is_not_sized() {
        let sizing = size_initiative(
            &spec(SizingMethod::PercentageOfCogs, 0.01, 0.02, 0.04),
            &facts("cogs_avg", 0.0),
            12.0,
        );
        assert_eq!(sizing.impact, None);
    }

    #[test]
    fn basis_override_is_honored() {
        let mut spec = spec(SizingMethod::PercentageOfRevenue, 0.1, 0.1, 0.1);
        spec.basis_key = Some("discount_avg".into());
        let sizing = size_initiative(&spec, &facts("discount_avg", 50.0), 12.0);
        assert!((sizing.impact.unwrap().mid - 60.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_values_are_used_as_given() {
        let sizing = size_initiative(
            &spec(SizingMethod::FixedValue, 5_000.0, 2_000.0, 10_000.0),
            &FactSet::new(),
            12.0,
        );
        let impact = sizing.impact.unwrap();
        assert_eq!((impact.low, impact.mid, impact.high), (2_000.0, 5_000.0, 10_000.0));
        assert_eq!(sizing.basis, None);
    }
}
