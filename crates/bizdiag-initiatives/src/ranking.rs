//! Priority scoring and rank assignment.

use std::cmp::Ordering;

use bizdiag_config::BenchmarkGap;
use bizdiag_model::{FactSet, RankedInitiative};

/// `weight × confidence × (1 + ln(1 + mid)) × (1 + gap)`, with an unsized or
/// negative impact counting as zero and `gap` clamped to `[0, 1]`.
/// Non-decreasing in confidence, impact and gap.
pub fn priority_score(
    weight: f64,
    confidence: f64,
    impact_mid: Option<f64>,
    gap_magnitude: Option<f64>,
) -> f64 {
    let impact = impact_mid.filter(|mid| mid.is_finite()).unwrap_or(0.0).max(0.0);
    let gap = gap_magnitude
        .filter(|gap| gap.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    weight * confidence.clamp(0.0, 1.0) * (1.0 + impact.ln_1p()) * (1.0 + gap)
}

/// Magnitude of the declared benchmark gap. A missing gap fact counts as no
/// gap.
pub fn gap_magnitude(gap: &BenchmarkGap, facts: &FactSet) -> f64 {
    facts
        .value(&gap.key)
        .map_or(0.0, |value| gap.magnitude(value))
}

/// Share of the declared evidence keys that exist; 1 when none are declared.
pub fn evidence_coverage(declared: usize, present: usize) -> f64 {
    if declared == 0 {
        1.0
    } else {
        present as f64 / declared as f64
    }
}

/// Sorts by score, highest first, and assigns 1-based ranks once. Equal
/// scores keep playbook order.
pub fn assign_ranks(initiatives: &mut [RankedInitiative]) {
    initiatives.sort_by(|a, b| {
        b.priority_score
            .total_cmp(&a.priority_score)
            .then_with(|| a.declaration_index.cmp(&b.declaration_index))
    });
    for (index, initiative) in initiatives.iter_mut().enumerate() {
        initiative.rank = index + 1;
    }
}

/// Orders by declared weight, highest first, then playbook order.
pub(crate) fn by_declared_weight(a: (f64, usize), b: (f64, usize)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1))
}
