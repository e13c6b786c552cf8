//! Operating-mode decision table.
//!
//! Modes are tried in precedence order and the first whose rule is met wins;
//! `DIRECTIONAL_MODE` needs nothing and is always the fallback. A rule is met
//! when every required pack is present and, together with at least one of
//! its `any_of_packs` (when it names any), covers enough months at a high
//! enough mean completeness. Adding packs or months can only add ways to meet
//! a rule, never remove one.

use std::collections::BTreeSet;

use bizdiag_config::{ModeRule, ModeThresholds};
use bizdiag_model::{ModeAssessment, MonthKey, OperatingMode, PackType};

use crate::panel::PackCoverage;

const LABOR_BONUS: f64 = 0.1;
const HISTORY_BONUS: f64 = 0.05;
const HISTORY_MONTHS: usize = 6;
const PNL_CONFIDENCE_CAP: f64 = 0.95;
const OPS_BREADTH_BONUS: f64 = 0.15;

/// Evidence a candidate pack set offers a rule.
#[derive(Debug, Clone, PartialEq)]
struct SetEvidence {
    months: usize,
    completeness: f64,
}

fn evidence(coverage: &[PackCoverage], packs: &[PackType]) -> SetEvidence {
    let chosen: Vec<&PackCoverage> = coverage
        .iter()
        .filter(|entry| packs.contains(&entry.pack))
        .collect();
    let months: BTreeSet<MonthKey> = chosen
        .iter()
        .flat_map(|entry| entry.months.iter().copied())
        .collect();
    let completeness = if chosen.is_empty() {
        0.0
    } else {
        chosen.iter().map(|entry| entry.completeness).sum::<f64>() / chosen.len() as f64
    };
    SetEvidence {
        months: months.len(),
        completeness,
    }
}

/// `Ok` with the best qualifying evidence, or `Err` with why the rule failed.
fn check_rule(rule: &ModeRule, coverage: &[PackCoverage]) -> Result<SetEvidence, String> {
    let present: BTreeSet<PackType> = coverage.iter().map(|entry| entry.pack).collect();
    let missing: Vec<&str> = rule
        .required_packs
        .iter()
        .filter(|pack| !present.contains(pack))
        .map(|pack| pack.label())
        .collect();
    if !missing.is_empty() {
        return Err(format!("{} data absent", missing.join(", ")));
    }

    let candidates: Vec<Vec<PackType>> = if rule.any_of_packs.is_empty() {
        vec![rule.required_packs.clone()]
    } else {
        let options: Vec<Vec<PackType>> = rule
            .any_of_packs
            .iter()
            .filter(|pack| present.contains(pack))
            .map(|pack| {
                let mut packs = rule.required_packs.clone();
                if !packs.contains(pack) {
                    packs.push(*pack);
                }
                packs
            })
            .collect();
        if options.is_empty() {
            let names: Vec<&str> = rule.any_of_packs.iter().map(|pack| pack.label()).collect();
            return Err(format!("none of {} present", names.join(", ")));
        }
        options
    };

    let mut best: Option<SetEvidence> = None;
    let mut closest: Option<SetEvidence> = None;
    for packs in &candidates {
        let found = evidence(coverage, packs);
        let meets = found.months >= rule.min_months && found.completeness >= rule.min_completeness;
        if meets {
            if best.as_ref().is_none_or(|current| found.months > current.months) {
                best = Some(found);
            }
        } else if closest.as_ref().is_none_or(|current| found.months > current.months) {
            closest = Some(found);
        }
    }
    if let Some(best) = best {
        return Ok(best);
    }
    let found = closest.unwrap_or(SetEvidence {
        months: 0,
        completeness: 0.0,
    });
    if found.months < rule.min_months {
        Err(format!(
            "{} month(s) available, {} required",
            found.months, rule.min_months
        ))
    } else {
        Err(format!(
            "completeness {:.2} below {:.2}",
            found.completeness, rule.min_completeness
        ))
    }
}

/// Decide the operating mode for a run.
///
/// `has_labor_values` raises P&L-mode confidence when labor cost is known
/// from any pack.
pub fn detect_mode(
    thresholds: &ModeThresholds,
    coverage: &[PackCoverage],
    has_labor_values: bool,
) -> ModeAssessment {
    let present: Vec<PackType> = {
        let set: BTreeSet<PackType> = coverage.iter().map(|entry| entry.pack).collect();
        set.into_iter().collect()
    };
    let all_months: BTreeSet<MonthKey> = coverage
        .iter()
        .flat_map(|entry| entry.months.iter().copied())
        .collect();
    let overall = evidence(coverage, &present);
    let mut reasons = Vec::new();

    let mut chosen = None;
    for mode in OperatingMode::BY_PRECEDENCE {
        let Some(rule) = thresholds.rule(mode) else {
            continue;
        };
        match check_rule(rule, coverage) {
            Ok(found) => {
                chosen = Some((mode, rule, found));
                break;
            }
            Err(why) => reasons.push(format!("{mode} not met: {why}")),
        }
    }

    let (mode, confidence) = match chosen {
        Some((OperatingMode::Pnl, rule, found)) => {
            reasons.push(format!(
                "P&L data covers {} month(s) at completeness {:.2}",
                found.months, found.completeness
            ));
            let mut confidence = rule.base_confidence;
            if has_labor_values {
                confidence += LABOR_BONUS;
                reasons.push("labor cost available".to_string());
            }
            if all_months.len() >= HISTORY_MONTHS {
                confidence += HISTORY_BONUS;
                reasons.push(format!("{} months of history support trends", all_months.len()));
            }
            (OperatingMode::Pnl, confidence.min(PNL_CONFIDENCE_CAP))
        }
        Some((mode, rule, found)) => {
            reasons.push(format!(
                "operational data covers {} month(s) at completeness {:.2}",
                found.months, found.completeness
            ));
            let mut confidence = rule.base_confidence;
            if present.contains(&PackType::Revenue) && present.contains(&PackType::Labor) {
                confidence += OPS_BREADTH_BONUS;
                reasons.push("both revenue and labor data present".to_string());
            }
            (mode, confidence.min(1.0))
        }
        None => {
            reasons.push("limited data; directional insights only".to_string());
            (OperatingMode::Directional, thresholds.directional_confidence)
        }
    };

    ModeAssessment {
        mode,
        confidence,
        months_available: all_months.len(),
        completeness: overall.completeness,
        packs_present: present,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(pack: PackType, months: u32, completeness: f64) -> PackCoverage {
        let mut month = MonthKey::new(2024, 1).unwrap();
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

    #[test]
    fn twelve_months_of_pnl_is_pnl_mode() {
        let assessment = detect_mode(
            &ModeThresholds::default(),
            &[coverage(PackType::Pnl, 12, 1.0)],
            false,
        );
        assert_eq!(assessment.mode, OperatingMode::Pnl);
        assert!((assessment.confidence - 0.85).abs() < 1e-9);
        assert_eq!(assessment.months_available, 12);
    }

    #[test]
    fn pnl_confidence_is_capped() {
        let assessment = detect_mode(
            &ModeThresholds::default(),
            &[coverage(PackType::Pnl, 12, 1.0), coverage(PackType::Labor, 12, 1.0)],
            true,
        );
        assert!((assessment.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn single_month_is_directional() {
        let assessment = detect_mode(
            &ModeThresholds::default(),
            &[coverage(PackType::Pnl, 1, 1.0)],
            false,
        );
        assert_eq!(assessment.mode, OperatingMode::Directional);
        assert!((assessment.confidence - 0.4).abs() < 1e-9);
        assert!(assessment.reasons[0].starts_with("PNL_MODE not met: 1 month(s) available"));
    }

    #[test]
    fn revenue_and_labor_without_pnl_is_ops() {
        let assessment = detect_mode(
            &ModeThresholds::default(),
            &[coverage(PackType::Revenue, 4, 0.9), coverage(PackType::Labor, 4, 0.9)],
            true,
        );
        assert_eq!(assessment.mode, OperatingMode::Ops);
        assert!((assessment.confidence - 0.75).abs() < 1e-9);
        assert_eq!(assessment.reasons[0], "PNL_MODE not met: P&L data absent");
    }

    #[test]
    fn incomplete_data_falls_back() {
        let assessment = detect_mode(
            &ModeThresholds::default(),
            &[coverage(PackType::Pnl, 6, 0.3)],
            false,
        );
        assert_eq!(assessment.mode, OperatingMode::Directional);
        assert!(assessment.reasons[0].contains("completeness 0.30 below 0.60"));
    }

    #[test]
    fn nothing_uploaded_is_directional() {
        let assessment = detect_mode(&ModeThresholds::default(), &[], false);
        assert_eq!(assessment.mode, OperatingMode::Directional);
        assert_eq!(assessment.months_available, 0);
        assert!(assessment.packs_present.is_empty());
    }
}
