use std::time::Instant;

use anyhow::{Context, Result};
use bizdiag_config::VerticalConfig;
use bizdiag_core::{DiagnosticPipeline, RunInput, RunOptions};
use bizdiag_cli::inputs::{
    load_answers, load_confirmed_mappings, load_playbook, read_upload,
};
use bizdiag_ingest::{ProfileOptions, profile_table_with_options, read_csv_table};
use bizdiag_llm::{CollaboratorError, DisabledCollaborator, HttpCollaborator, LlmSettings};
use bizdiag_map::{ConfidenceThresholds, FieldMapper};
use bizdiag_model::{DiagnosticReport, MappingResult, PackType, TableProfile};
use tracing::{info, info_span, warn};

use crate::cli::{CheckConfigArgs, MapArgs, PlaybookArgs, ProfileArgs, RunArgs};

pub struct MapOutcome {
    pub mapping: MappingResult,
    pub thresholds: ConfidenceThresholds,
    pub advice_error: Option<CollaboratorError>,
}

pub fn run_profile(args: &ProfileArgs) -> Result<TableProfile> {
    let table = read_csv_table(&args.csv).context("read input")?;
    Ok(profile_table_with_options(
        &table,
        ProfileOptions::default().with_sample_size(args.samples),
    ))
}

pub fn run_map(args: &MapArgs) -> Result<MapOutcome> {
    let config = playbook(&args.playbook)?;
    let pack = PackType::from(args.pack);
    let spec = config.pack(pack).with_context(|| {
        format!(
            "the `{}` playbook has no {} data pack",
            config.vertical_id,
            pack.label()
        )
    })?;
    let table = read_csv_table(&args.csv).context("read input")?;
    let profile = profile_table_with_options(&table, ProfileOptions::default());
    let mapper = FieldMapper::new(spec);
    let assisted = match http_collaborator(args.llm) {
        Some(collaborator) => mapper.suggest_assisted(&profile, &collaborator),
        None => mapper.suggest_assisted(&profile, &DisabledCollaborator),
    };
    Ok(MapOutcome {
        mapping: assisted.result,
        thresholds: *mapper.thresholds(),
        advice_error: assisted.advice_error.filter(CollaboratorError::is_reportable),
    })
}

pub fn run_diagnostic(args: &RunArgs) -> Result<DiagnosticReport> {
    let span = info_span!("diagnose");
    let _guard = span.enter();
    let started = Instant::now();

    let config = playbook(&args.playbook)?;
    let mut confirmed = match &args.mappings {
        Some(path) => load_confirmed_mappings(path)?,
        None => Default::default(),
    };
    let mut input = RunInput::new();
    for (pack, path) in args.uploads() {
        let mut upload = read_upload(pack, path)?;
        if let Some(mappings) = confirmed.remove(&pack) {
            upload = upload.with_confirmed(mappings);
        }
        input = input.with_upload(upload);
    }
    for pack in confirmed.keys() {
        warn!(pack = %pack, "confirmed mappings given for a pack without an upload");
    }
    if let Some(path) = &args.answers {
        input = input.with_answers(load_answers(path)?);
    }

    let options = RunOptions::default().with_accept_unconfirmed(!args.confirmed_only);
    let pipeline = DiagnosticPipeline::new(&config).with_options(options);
    let report = match http_collaborator(args.llm) {
        Some(collaborator) => pipeline.with_collaborator(collaborator).run(&input),
        None => pipeline.run(&input),
    };

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report).context("serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("write report {}", path.display()))?;
    }
    info!(
        uploads = input.uploads.len(),
        mode = %report.mode.mode,
        duration_ms = started.elapsed().as_millis() as u64,
        "diagnostic complete"
    );
    Ok(report)
}

pub fn run_check_config(args: &CheckConfigArgs) -> Result<VerticalConfig> {
    playbook(&args.playbook)
}

fn playbook(args: &PlaybookArgs) -> Result<VerticalConfig> {
    load_playbook(args.config.as_deref(), args.vertical.as_deref())
}

/// HTTP collaborator from `BIZDIAG_LLM_*`, when requested and configured.
/// Any problem here leaves the run offline.
fn http_collaborator(requested: bool) -> Option<HttpCollaborator> {
    if !requested {
        return None;
    }
    let Some(settings) = LlmSettings::from_env() else {
        warn!("--llm given but BIZDIAG_LLM_URL is not set, running offline");
        return None;
    };
    match HttpCollaborator::new(settings) {
        Ok(collaborator) => Some(collaborator),
        Err(error) => {
            warn!(%error, "collaborator unavailable, running offline");
            None
        }
    }
}
