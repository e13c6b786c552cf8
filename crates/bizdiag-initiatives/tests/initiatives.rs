use bizdiag_config::VerticalConfig;
use bizdiag_initiatives::{InitiativeSelector, NARRATIVE_TASK};
use bizdiag_llm::{CollaboratorError, DisabledCollaborator, ScriptedCollaborator};
use bizdiag_model::{
    AnalyticsFact, FactSet, FactUnit, ModeAssessment, NarrativeSource, OperatingMode, PackType,
    SelectionStage,
};
use proptest::prelude::*;
use serde_json::json;

const RESTAURANT: &str = include_str!("../../../verticals/restaurant.json");

fn config() -> VerticalConfig {
    VerticalConfig::from_json_str(RESTAURANT).unwrap()
}

fn assessment(mode: OperatingMode, confidence: f64, months: usize) -> ModeAssessment {
    ModeAssessment {
        mode,
        confidence,
        months_available: months,
        completeness: 1.0,
        packs_present: vec![PackType::Pnl, PackType::Revenue, PackType::Labor],
        reasons: Vec::new(),
    }
}

fn facts(values: Vec<(&str, f64)>) -> FactSet {
    let mut facts = FactSet::new();
    for (key, value) in values {
        facts
            .insert(AnalyticsFact::numeric(key, key, value, FactUnit::Currency))
            .unwrap();
    }
    facts
}

fn full_facts() -> FactSet {
    let mut facts = facts(vec![
        ("revenue_avg", 10_000.0),
        ("revenue_cv", 0.1),
        ("labor_avg", 3_000.0),
        ("labor_pct_avg", 30.0),
        ("cogs_avg", 3_000.0),
        ("cogs_pct_avg", 30.0),
        ("discount_avg", 200.0),
    ]);
    facts
        .insert(AnalyticsFact::text(
            "questionnaire_flag_no_monthly_close",
            "Questionnaire flag: no monthly close",
            "no_monthly_close",
            FactUnit::Flag,
        ))
        .unwrap();
    facts
}

#[test]
fn pnl_run_ranks_every_eligible_initiative() {
    let config = config();
    let outcome = InitiativeSelector::new(&config).select(
        &assessment(OperatingMode::Pnl, 0.95, 12),
        &full_facts(),
        &DisabledCollaborator,
    );

    assert_eq!(outcome.ranked.len(), 7);
    assert_eq!(outcome.excluded.len(), 1);
    let excluded = &outcome.excluded[0];
    assert_eq!(excluded.id, "marketing_efficiency");
    assert_eq!(excluded.stage, SelectionStage::Eligible);
    assert_eq!(excluded.reasons, vec!["requires evidence `marketing_avg`"]);

    let ranks: Vec<usize> = outcome.ranked.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, (1..=7).collect::<Vec<_>>());
    assert!(
        outcome
            .ranked
            .windows(2)
            .all(|pair| pair[0].priority_score >= pair[1].priority_score)
    );

    let labor = outcome
        .ranked
        .iter()
        .find(|r| r.id == "labor_scheduling")
        .unwrap();
    let impact = labor.impact.unwrap();
    assert!((impact.mid - 1_800.0).abs() < 1e-9);
    assert_eq!(labor.sizing_basis.as_deref(), Some("labor_avg"));
    assert_eq!(labor.missing_evidence, vec!["labor_cv"]);
    assert!((labor.confidence - 0.95 * 2.0 / 3.0).abs() < 1e-9);
    assert!(labor.eligibility.eligible);

    assert_eq!(outcome.narrative_source, NarrativeSource::Template);
    assert_eq!(outcome.narrative_error, Some(CollaboratorError::Disabled));
    assert_eq!(outcome.selected.len(), 7);
}

#[test]
fn labor_above_benchmark_moves_scheduling_up() {
    let config = config();
    let selector = InitiativeSelector::new(&config);
    let mode = assessment(OperatingMode::Pnl, 0.85, 12);
    let position = |ranked: &[bizdiag_model::RankedInitiative], id: &str| {
        ranked.iter().position(|r| r.id == id).unwrap()
    };

    let (at_benchmark, _) = selector.rank(&mode, &full_facts());
    assert!(
        position(&at_benchmark, "menu_engineering") < position(&at_benchmark, "labor_scheduling")
    );
    let scheduling = &at_benchmark[position(&at_benchmark, "labor_scheduling")];
    assert_eq!(scheduling.gap_magnitude, Some(0.0));
    let pricing = &at_benchmark[position(&at_benchmark, "pricing_review")];
    assert_eq!(pricing.gap_magnitude, None);

    let mut over = full_facts();
    over.insert(AnalyticsFact::numeric(
        "labor_pct_avg_vs_benchmark",
        "Labor % of revenue vs benchmark of 30",
        12.5,
        FactUnit::Percent,
    ))
    .unwrap();
    let (above_benchmark, _) = selector.rank(&mode, &over);
    assert!(
        position(&above_benchmark, "labor_scheduling")
            < position(&above_benchmark, "menu_engineering")
    );
    let scheduling = &above_benchmark[position(&above_benchmark, "labor_scheduling")];
    assert_eq!(scheduling.gap_magnitude, Some(1.0));
}

#[test]
fn ops_cap_drops_lowest_declared_weight() {
    let config = config();
    let (ranked, excluded) = InitiativeSelector::new(&config)
        .rank(&assessment(OperatingMode::Ops, 0.75, 12), &full_facts());

    assert_eq!(ranked.len(), 5);
    assert!(ranked.iter().all(|r| r.id != "cash_flow_planning"));
    let summary: Vec<(&str, SelectionStage)> = excluded
        .iter()
        .map(|e| (e.id.as_str(), e.stage))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("vendor_renegotiation", SelectionStage::Eligible),
            ("marketing_efficiency", SelectionStage::Eligible),
            ("cash_flow_planning", SelectionStage::Sized),
        ]
    );
    assert_eq!(excluded[2].reasons, vec!["beyond the OPS_MODE cap of 5"]);
}

#[test]
fn sparse_directional_run_keeps_only_what_the_data_supports() {
    let config = config();
    let mut mode = assessment(OperatingMode::Directional, 0.4, 1);
    mode.packs_present = vec![PackType::Pnl];

    let outcome = InitiativeSelector::new(&config).select(
        &mode,
        &facts(vec![("revenue_avg", 1_000.0)]),
        &DisabledCollaborator,
    );

    let ids: Vec<&str> = outcome.ranked.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["cash_flow_planning"]);
    assert_eq!(outcome.excluded.len(), 7);
    assert!(
        outcome
            .excluded
            .iter()
            .all(|e| e.stage == SelectionStage::Eligible)
    );
    let cash = &outcome.ranked[0];
    assert!((cash.confidence - 0.2).abs() < 1e-9);
    assert_eq!(cash.missing_evidence, vec!["revenue_cv"]);
    assert_eq!(outcome.selected[0].data_gaps, vec!["`revenue_cv` unavailable"]);
}

#[test]
fn collaborator_may_pick_and_reorder_a_subset() {
    let config = config();
    let response = json!({
        "selected": [
            {
                "initiative_id": "discount_controls",
                "explanation": "Discounts are high relative to sales.",
                "cited_evidence": ["discount_avg", "revenue_avg"],
                "data_gaps": ["No discount reason codes."]
            },
            {
                "initiative_id": "labor_scheduling",
                "explanation": "Labor runs at 30% of revenue.",
                "cited_evidence": ["labor_pct_avg"]
            }
        ]
    });
    let collaborator =
        ScriptedCollaborator::new().with_response(NARRATIVE_TASK, response.to_string());

    let outcome = InitiativeSelector::new(&config).select(
        &assessment(OperatingMode::Pnl, 0.95, 12),
        &full_facts(),
        &collaborator,
    );

    assert_eq!(outcome.narrative_source, NarrativeSource::Llm);
    assert_eq!(outcome.narrative_error, None);
    let ids: Vec<&str> = outcome
        .selected
        .iter()
        .map(|s| s.initiative.id.as_str())
        .collect();
    assert_eq!(ids, vec!["discount_controls", "labor_scheduling"]);
    assert_eq!(outcome.ranked.len(), 7);

    let requests = collaborator.requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].prompt.contains("marketing_efficiency"));
}

#[test]
fn invented_figures_in_collaborator_text_fall_back_to_template() {
    let config = config();
    let response = json!({
        "selected": [{
            "initiative_id": "labor_scheduling",
            "explanation": "Labor runs at 38.6% of revenue.",
            "cited_evidence": ["labor_pct_avg"]
        }]
    });
    let collaborator =
        ScriptedCollaborator::new().with_response(NARRATIVE_TASK, response.to_string());

    let outcome = InitiativeSelector::new(&config).select(
        &assessment(OperatingMode::Pnl, 0.95, 12),
        &full_facts(),
        &collaborator,
    );

    assert_eq!(outcome.narrative_source, NarrativeSource::Template);
    assert_eq!(
        outcome.narrative_error,
        Some(CollaboratorError::SchemaViolation {
            problems: vec!["`labor_scheduling` states 38.6, which matches no fact".to_string()],
        })
    );
    assert_eq!(outcome.selected.len(), outcome.ranked.len());
}

#[test]
fn rejected_collaborator_output_falls_back_to_template() {
    let config = config();
    let collaborator = ScriptedCollaborator::new()
        .with_failure(NARRATIVE_TASK, CollaboratorError::Timeout(30));

    let outcome = InitiativeSelector::new(&config).select(
        &assessment(OperatingMode::Pnl, 0.95, 12),
        &full_facts(),
        &collaborator,
    );

    assert_eq!(outcome.narrative_source, NarrativeSource::Template);
    assert_eq!(outcome.narrative_error, Some(CollaboratorError::Timeout(30)));
    let facts = full_facts();
    for selected in &outcome.selected {
        assert!(selected.cited_evidence.iter().all(|key| facts.contains(key)));
        assert!(!selected.explanation.is_empty());
    }
}

#[test]
fn ranking_is_deterministic() {
    let config = config();
    let selector = InitiativeSelector::new(&config);
    let mode = assessment(OperatingMode::Pnl, 0.95, 12);
    let first = selector.select(&mode, &full_facts(), &DisabledCollaborator);
    let second = selector.select(&mode, &full_facts(), &DisabledCollaborator);
    assert_eq!(first, second);
}

const OPTIONAL_FACTS: [&str; 6] = [
    "labor_avg",
    "labor_pct_avg",
    "cogs_avg",
    "discount_avg",
    "revenue_cv",
    "revenue_trend_pct",
];

proptest! {
    #[test]
    fn selections_cite_only_existing_evidence(
        present in proptest::collection::vec(any::<bool>(), OPTIONAL_FACTS.len()),
        confidence in 0.0f64..=1.0,
        months in 0usize..24,
        mode in prop_oneof![
            Just(OperatingMode::Directional),
            Just(OperatingMode::Ops),
            Just(OperatingMode::Pnl),
        ],
    ) {
        let config = config();
        let mut values = vec![("revenue_avg", 5_000.0)];
        for (key, keep) in OPTIONAL_FACTS.iter().zip(&present) {
            if *keep {
                values.push((*key, 1_000.0));
            }
        }
        let facts = facts(values);
        let outcome = InitiativeSelector::new(&config).select(
            &assessment(mode, confidence, months),
            &facts,
            &DisabledCollaborator,
        );

        let cap = config.assumptions.max_initiatives.for_mode(mode);
        prop_assert!(outcome.ranked.len() <= cap);
        prop_assert_eq!(
            outcome.ranked.len() + outcome.excluded.len(),
            config.initiatives.len()
        );
        for pair in outcome.ranked.windows(2) {
            prop_assert!(pair[0].priority_score >= pair[1].priority_score);
            prop_assert_eq!(pair[0].rank + 1, pair[1].rank);
        }
        for selected in &outcome.selected {
            for key in &selected.cited_evidence {
                prop_assert!(facts.contains(key), "cited missing key {}", key);
            }
        }
    }
}
