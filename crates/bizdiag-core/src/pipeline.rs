//! Diagnostic run with explicit stages.
//!
//! Per pack: profile, map, normalize. Then analytics over every panel that
//! survived, then initiative selection. A run always produces a report once
//! the playbook is valid; pack failures and collaborator failures become
//! [`RunIssue`]s.

use std::collections::BTreeSet;
use std::time::Instant;

use bizdiag_analytics::AnalyticsEngine;
use bizdiag_config::{DataPackSpec, VerticalConfig};
use bizdiag_ingest::{ProfileOptions, profile_table_with_options};
use bizdiag_initiatives::InitiativeSelector;
use bizdiag_llm::{Collaborator, DisabledCollaborator};
use bizdiag_map::{FieldMapper, apply_confirmed};
use bizdiag_model::{
    DiagnosticReport, IssueSeverity, MappingGap, MappingResult, PackPanel, PackSummary, RunIssue,
};
use bizdiag_normalize::{NormalizeError, normalize_pack};
use tracing::{debug, info, info_span, warn};

use crate::digest::input_digest;
use crate::error::Result;
use crate::input::{PackUpload, RunInput, RunOptions};

/// Runs a vertical playbook over a set of uploads.
pub struct DiagnosticPipeline<'a> {
    config: &'a VerticalConfig,
    collaborator: Box<dyn Collaborator + 'a>,
    options: RunOptions,
}

/// Output of the per-pack stages.
struct PackOutcome {
    summary: PackSummary,
    mapping: MappingResult,
    panel: Option<PackPanel>,
    issues: Vec<RunIssue>,
}

impl<'a> DiagnosticPipeline<'a> {
    /// Offline pipeline: no collaborator, default options.
    pub fn new(config: &'a VerticalConfig) -> Self {
        Self {
            config,
            collaborator: Box::new(DisabledCollaborator),
            options: RunOptions::default(),
        }
    }

    #[must_use]
    pub fn with_collaborator(mut self, collaborator: impl Collaborator + 'a) -> Self {
        self.collaborator = Box::new(collaborator);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &VerticalConfig {
        self.config
    }

    pub fn run(&self, input: &RunInput) -> DiagnosticReport {
        let span = info_span!("run", vertical = %self.config.vertical_id);
        let _guard = span.enter();
        let started = Instant::now();
        let mut issues = Vec::new();

        let mut seen = BTreeSet::new();
        let mut uploads: Vec<&PackUpload> = Vec::new();
        for upload in &input.uploads {
            if seen.insert(upload.pack) {
                uploads.push(upload);
            } else {
                warn!(pack = %upload.pack, source = %upload.table.source, "duplicate upload ignored");
                issues.push(RunIssue::data_quality(
                    Some(upload.pack),
                    format!("second {} upload `{}` ignored", upload.pack.label(), upload.table.source),
                ));
            }
        }
        uploads.sort_by_key(|upload| upload.pack);

        let mut summaries = Vec::new();
        let mut mappings = Vec::new();
        let mut panels = Vec::new();
        for upload in uploads {
            let Some(spec) = self.config.pack(upload.pack) else {
                issues.push(RunIssue::structural(
                    upload.pack,
                    format!(
                        "{} data is not part of the `{}` playbook",
                        upload.pack.label(),
                        self.config.vertical_id
                    ),
                ));
                continue;
            };
            let outcome = self.process_pack(spec, upload);
            summaries.push(outcome.summary);
            mappings.push(outcome.mapping);
            panels.extend(outcome.panel);
            issues.extend(outcome.issues);
        }

        for spec in &self.config.data_packs {
            if !seen.contains(&spec.pack_type) {
                issues.push(
                    RunIssue::data_quality(
                        Some(spec.pack_type),
                        format!("no {} upload", spec.pack_type.label()),
                    )
                    .with_severity(IssueSeverity::Info),
                );
            }
        }

        let analytics = AnalyticsEngine::new(self.config)
            .with_answers(input.answers.clone())
            .run(&panels);
        issues.extend(analytics.issues);

        let selection = InitiativeSelector::new(self.config).select(
            &analytics.mode,
            &analytics.facts,
            self.collaborator.as_ref(),
        );
        if let Some(err) = selection.narrative_error.as_ref().filter(|err| err.is_reportable()) {
            issues.push(RunIssue::collaborator(format!(
                "narrative unavailable, template text used: {err}"
            )));
        }

        let report = DiagnosticReport {
            vertical_id: self.config.vertical_id.clone(),
            vertical_name: self.config.vertical_name.clone(),
            input_digest: input_digest(self.config, input),
            mode: analytics.mode,
            facts: analytics.facts,
            ranked: selection.ranked,
            excluded: selection.excluded,
            selected: selection.selected,
            packs: summaries,
            mappings,
            issues,
        };
        info!(
            mode = %report.mode.mode,
            confidence = report.mode.confidence,
            facts = report.facts.len(),
            ranked = report.ranked.len(),
            selected = report.selected.len(),
            errors = report.error_count(),
            warnings = report.warning_count(),
            duration_ms = started.elapsed().as_millis() as u64,
            "run complete"
        );
        report
    }

    fn process_pack(&self, spec: &DataPackSpec, upload: &PackUpload) -> PackOutcome {
        let pack = upload.pack;
        let span = info_span!("pack", pack = %pack);
        let _guard = span.enter();
        let table = &upload.table;
        let mut issues = Vec::new();

        let profile = {
            let _stage = info_span!("profile").entered();
            profile_table_with_options(
                table,
                ProfileOptions::default().with_sample_size(self.options.sample_size),
            )
        };

        let mapping = {
            let _stage = info_span!("map").entered();
            let assisted = FieldMapper::new(spec)
                .with_thresholds(self.options.thresholds)
                .suggest_assisted(&profile, self.collaborator.as_ref());
            if let Some(err) = assisted.advice_error.filter(|err| err.is_reportable()) {
                issues.push(
                    RunIssue::collaborator(format!(
                        "mapping advice unavailable, heuristic scores used: {err}"
                    ))
                    .with_pack(pack),
                );
            }
            let mut mapping = assisted.result;
            if !upload.confirmed.is_empty() {
                match apply_confirmed(mapping.clone(), &upload.confirmed, spec, &table.columns) {
                    Ok(merged) => mapping = merged,
                    Err(err) => {
                        warn!(pack = %pack, error = %err, "confirmed mappings rejected");
                        issues.push(RunIssue::data_quality(
                            Some(pack),
                            format!("confirmed mappings rejected, suggestions used: {err}"),
                        ));
                    }
                }
            }
            if !self.options.accept_unconfirmed {
                mapping = drop_unconfirmed(mapping, spec);
            }
            mapping
        };
        issues.extend(mapping_issues(&mapping));

        let mut summary = PackSummary {
            pack,
            source: table.source.clone(),
            input_rows: table.row_count(),
            usable_rows: 0,
            months: 0,
            completeness: 0.0,
            mapped_fields: mapping.mapped_count(),
            required_gaps: mapping.required_gaps().count(),
            pending_confirmations: mapping.pending_confirmation().count(),
            excluded: false,
        };

        let panel = match normalize_pack(spec, table, &mapping) {
            Ok(panel) => {
                summary.usable_rows = panel.usable_rows;
                summary.months = panel.month_count();
                summary.completeness = panel.completeness_score;
                issues.extend(
                    panel
                        .warnings
                        .iter()
                        .map(|warning| RunIssue::data_quality(Some(pack), warning.clone())),
                );
                Some(panel)
            }
            Err(err) => {
                warn!(pack = %pack, error = %err, "pack excluded");
                let issue = RunIssue::structural(pack, err.to_string());
                issues.push(match &err {
                    NormalizeError::MissingRequiredField { field, .. } => issue.with_field(field),
                    _ => issue,
                });
                summary.excluded = true;
                None
            }
        };

        debug!(pack = %pack, issues = issues.len(), excluded = summary.excluded, "pack stages done");
        PackOutcome {
            summary,
            mapping,
            panel,
            issues,
        }
    }
}

/// Load a playbook from JSON text and run it offline.
pub fn run_from_json(config_json: &str, input: &RunInput) -> Result<DiagnosticReport> {
    let config = VerticalConfig::from_json_str(config_json)?;
    Ok(DiagnosticPipeline::new(&config).run(input))
}

/// Keeps only confirmed mappings; the rest become gaps awaiting a person.
fn drop_unconfirmed(mut mapping: MappingResult, spec: &DataPackSpec) -> MappingResult {
    let (kept, pending): (Vec<_>, Vec<_>) =
        mapping.mappings.into_iter().partition(|field| field.confirmed);
    mapping.mappings = kept;
    for field in pending {
        let required = spec
            .field(&field.canonical_field)
            .is_some_and(|canonical| canonical.required);
        mapping.unmapped_columns.extend(field.source_columns);
        mapping.gaps.push(MappingGap {
            canonical_field: field.canonical_field,
            required,
            reason: "suggestion awaiting confirmation".to_string(),
        });
    }
    mapping
}

fn mapping_issues(mapping: &MappingResult) -> Vec<RunIssue> {
    let mut issues: Vec<RunIssue> = mapping
        .gaps
        .iter()
        .filter(|gap| !gap.required)
        .map(|gap| {
            RunIssue::data_quality(
                Some(mapping.pack),
                format!("optional field `{}` not mapped: {}", gap.canonical_field, gap.reason),
            )
            .with_field(gap.canonical_field.clone())
            .with_severity(IssueSeverity::Info)
        })
        .collect();
    let pending = mapping.pending_confirmation().count();
    if pending > 0 {
        issues.push(RunIssue::data_quality(
            Some(mapping.pack),
            format!("{pending} mapping(s) below the auto-confirm threshold were used unconfirmed"),
        ));
    }
    issues
}
