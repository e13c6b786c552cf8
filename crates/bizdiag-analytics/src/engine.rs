use std::time::Instant;

use bizdiag_config::VerticalConfig;
use bizdiag_model::{
    AnalyticsFact, FactSet, FactUnit, ModeAssessment, PackPanel, PackType, RunIssue,
};
use serde::Serialize;
use tracing::{info, info_span};

use crate::benchmarks::emit_benchmark_gaps;
use crate::collector::FactCollector;
use crate::metrics::emit_field_facts;
use crate::mode::detect_mode;
use crate::panel::MonthlyPanel;
use crate::questionnaire::{self, Answers, QuestionnaireOutcome};
use crate::signals::emit_signal_facts;

/// Everything the analytics stage derives from the normalized packs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsOutput {
    pub panel: MonthlyPanel,
    pub mode: ModeAssessment,
    pub facts: FactSet,
    pub questionnaire: QuestionnaireOutcome,
    pub issues: Vec<RunIssue>,
}

/// Deterministic analytics over a vertical's packs. Never calls out.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine<'a> {
    config: &'a VerticalConfig,
    answers: Answers,
}

impl<'a> AnalyticsEngine<'a> {
    pub fn new(config: &'a VerticalConfig) -> Self {
        Self {
            config,
            answers: Answers::new(),
        }
    }

    #[must_use]
    pub fn with_answers(mut self, answers: Answers) -> Self {
        self.answers = answers;
        self
    }

    /// Whether any labor measure has a value, from whichever pack supplied it.
    fn has_labor_values(&self, panel: &MonthlyPanel) -> bool {
        self.config
            .pack(PackType::Labor)
            .is_some_and(|spec| spec.measure_fields().any(|field| panel.has_field(&field.name)))
    }

    pub fn run(&self, panels: &[PackPanel]) -> AnalyticsOutput {
        let span = info_span!("analytics", vertical = %self.config.vertical_id);
        let _guard = span.enter();
        let started = Instant::now();

        let panel = MonthlyPanel::assemble(panels);
        let mode = detect_mode(
            &self.config.mode_thresholds,
            panel.coverage(),
            self.has_labor_values(&panel),
        );

        let mut out = FactCollector::default();
        let window = panel.window_label();
        out.push(
            AnalyticsFact::numeric(
                "panel_months",
                "Months in the combined panel",
                panel.month_count() as f64,
                FactUnit::Months,
            )
            .with_period(window.clone())
            .with_source("panel"),
        );
        out.push(
            AnalyticsFact::numeric(
                "data_completeness",
                "Mean completeness of the uploaded packs",
                panel.completeness(),
                FactUnit::Ratio,
            )
            .with_period(window)
            .with_source("panel"),
        );

        let sigma = self.config.assumptions.outlier_sigma;
        for field in panel.fields() {
            let unit = self.config.field_unit(field).unwrap_or(FactUnit::Currency);
            emit_field_facts(&panel, field, unit, sigma, &mut out);
        }

        let answers = questionnaire::evaluate(&self.config.questionnaire, &self.answers);
        for flag in &answers.flags {
            out.push(
                AnalyticsFact::text(
                    format!("questionnaire_flag_{flag}"),
                    format!("Questionnaire flag: {}", flag.replace('_', " ")),
                    flag.clone(),
                    FactUnit::Flag,
                )
                .with_source("questionnaire"),
            );
        }
        for (key, score) in &answers.scores {
            out.push(
                AnalyticsFact::numeric(
                    format!("questionnaire_score_{key}"),
                    format!("Questionnaire score: {}", key.replace('_', " ")),
                    *score,
                    FactUnit::Score,
                )
                .with_source("questionnaire"),
            );
        }

        emit_signal_facts(self.config, &panel, &mut out);
        emit_benchmark_gaps(&self.config.benchmarks, &mut out);

        let (facts, issues) = out.finish();
        info!(
            mode = %mode.mode,
            confidence = mode.confidence,
            months = panel.month_count(),
            facts = facts.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "analytics complete"
        );
        AnalyticsOutput {
            panel,
            mode,
            facts,
            questionnaire: answers,
            issues,
        }
    }
}
