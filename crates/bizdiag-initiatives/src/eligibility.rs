//! Eligibility rules. Reasons stay in the report; they are never sent to a
//! collaborator.

use bizdiag_config::InitiativeSpec;
use bizdiag_model::{EligibilityOutcome, FactSet, ModeAssessment};

/// Checks every rule and keeps a reason for each, met or not.
pub fn check_eligibility(
    spec: &InitiativeSpec,
    mode: &ModeAssessment,
    facts: &FactSet,
) -> EligibilityOutcome {
    let rules = &spec.eligibility_rules;
    let mut met = Vec::new();
    let mut failed = Vec::new();

    if rules.min_months > 0 {
        if mode.months_available >= rules.min_months {
            met.push(format!(
                "{} month(s) available, {} needed",
                mode.months_available, rules.min_months
            ));
        } else {
            failed.push(format!(
                "needs {} month(s) of data, {} available",
                rules.min_months, mode.months_available
            ));
        }
    }

    for pack in &rules.requires_data {
        if mode.has_pack(*pack) {
            met.push(format!("{} data present", pack.label()));
        } else {
            failed.push(format!("requires {} data", pack.label()));
        }
    }

    if let Some(min_mode) = rules.min_mode {
        if mode.mode >= min_mode {
            met.push(format!("{} satisfies {min_mode}", mode.mode));
        } else {
            failed.push(format!("requires {min_mode} or better, run is {}", mode.mode));
        }
    }

    for key in &rules.requires_facts {
        if facts.contains(key) {
            met.push(format!("evidence `{key}` present"));
        } else {
            failed.push(format!("requires evidence `{key}`"));
        }
    }

    if failed.is_empty() {
        if met.is_empty() {
            met.push("no eligibility rules".to_string());
        }
        EligibilityOutcome {
            eligible: true,
            reasons: met,
        }
    } else {
        EligibilityOutcome {
            eligible: false,
            reasons: failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use bizdiag_config::{EligibilityRules, SizingMethod, SizingParams};
    use bizdiag_model::{AnalyticsFact, FactUnit, OperatingMode, PackType};

    use super::*;

    fn spec(rules: EligibilityRules) -> InitiativeSpec {
        InitiativeSpec {
            id: "discount_controls".into(),
            title: "Discount controls".into(),
            category: "revenue".into(),
            description: String::new(),
            eligibility_rules: rules,
            sizing_method: SizingMethod::FixedValue,
            sizing_params: SizingParams::default(),
            basis_key: None,
            priority_weight: 1.0,
            evidence_keys: Vec::new(),
            benchmark_gap: None,
        }
    }

    fn mode(mode: OperatingMode, months: usize, packs: Vec<PackType>) -> ModeAssessment {
        ModeAssessment {
            mode,
            confidence: 0.6,
            months_available: months,
            completeness: 1.0,
            packs_present: packs,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn collects_every_failed_rule() {
        let rules = EligibilityRules {
            min_months: 3,
            requires_data: vec![PackType::Revenue],
            min_mode: Some(OperatingMode::Pnl),
            requires_facts: vec!["discount_avg".into()],
        };
        let outcome = check_eligibility(
            &spec(rules),
            &mode(OperatingMode::Ops, 2, vec![PackType::Labor]),
            &FactSet::new(),
        );
        assert!(!outcome.eligible);
        assert_eq!(
            outcome.reasons,
            vec![
                "needs 3 month(s) of data, 2 available",
                "requires Revenue data",
                "requires PNL_MODE or better, run is OPS_MODE",
                "requires evidence `discount_avg`",
            ]
        );
    }

    #[test]
    fn met_rules_are_explained() {
        let rules = EligibilityRules {
            min_months: 1,
            requires_data: vec![PackType::Revenue],
            min_mode: Some(OperatingMode::Ops),
            requires_facts: vec!["discount_avg".into()],
        };
        let mut facts = FactSet::new();
        facts
            .insert(AnalyticsFact::numeric("discount_avg", "Average discount", 40.0, FactUnit::Currency))
            .unwrap();
        let outcome = check_eligibility(
            &spec(rules),
            &mode(OperatingMode::Pnl, 4, vec![PackType::Pnl, PackType::Revenue]),
            &facts,
        );
        assert!(outcome.eligible);
        assert_eq!(outcome.reasons.len(), 4);
        assert_eq!(outcome.reasons[2], "PNL_MODE satisfies OPS_MODE");
    }

    #[test]
    fn no_rules_is_eligible() {
        let outcome = check_eligibility(
            &spec(EligibilityRules::default()),
            &mode(OperatingMode::Directional, 0, Vec::new()),
            &FactSet::new(),
        );
        assert!(outcome.eligible);
        assert_eq!(outcome.reasons, vec!["no eligibility rules"]);
    }
}
