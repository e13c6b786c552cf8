//! Loading the files a `run` reads besides the uploads themselves.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use bizdiag_analytics::Answers;
use bizdiag_config::{VerticalConfig, load_vertical, load_vertical_config};
use bizdiag_core::PackUpload;
use bizdiag_ingest::read_csv_table;
use bizdiag_model::{FieldMapping, MergePolicy, PackType, Transform};
use serde::Deserialize;
use tracing::debug;

/// One person-confirmed mapping as written in a mappings file.
#[derive(Debug, Deserialize)]
struct ConfirmedEntry {
    canonical_field: String,
    source_columns: Vec<String>,
    #[serde(default)]
    transform: Transform,
    #[serde(default)]
    merge: MergePolicy,
}

/// Load a playbook either from a file or by id from the verticals directory.
pub fn load_playbook(path: Option<&Path>, vertical: Option<&str>) -> Result<VerticalConfig> {
    match (path, vertical) {
        (Some(path), _) => load_vertical_config(path)
            .with_context(|| format!("load playbook {}", path.display())),
        (None, Some(id)) => load_vertical(id).with_context(|| format!("load vertical `{id}`")),
        (None, None) => bail!("no playbook given"),
    }
}

pub fn read_upload(pack: PackType, path: &Path) -> Result<PackUpload> {
    let table =
        read_csv_table(path).with_context(|| format!("read {} upload", pack.label()))?;
    debug!(pack = %pack, source = %table.source, rows = table.row_count(), "upload read");
    Ok(PackUpload::new(pack, table))
}

/// Questionnaire answers: a JSON object of question id to answer.
pub fn load_answers(path: &Path) -> Result<Answers> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read answers {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse answers {}", path.display()))
}

/// Confirmed mappings: a JSON object keyed by pack name, each holding a list
/// of `{canonical_field, source_columns, transform?, merge?}` entries.
pub fn load_confirmed_mappings(path: &Path) -> Result<BTreeMap<PackType, Vec<FieldMapping>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read mappings {}", path.display()))?;
    parse_confirmed_mappings(&text).with_context(|| format!("parse mappings {}", path.display()))
}

pub fn parse_confirmed_mappings(text: &str) -> Result<BTreeMap<PackType, Vec<FieldMapping>>> {
    let raw: BTreeMap<String, Vec<ConfirmedEntry>> = serde_json::from_str(text)?;
    let mut mappings = BTreeMap::new();
    for (name, entries) in raw {
        let pack: PackType = name.parse()?;
        let confirmed: Vec<FieldMapping> = entries
            .into_iter()
            .map(|entry| {
                FieldMapping::confirmed(entry.canonical_field, entry.source_columns, entry.transform)
                    .with_merge(entry.merge)
            })
            .collect();
        if mappings.insert(pack, confirmed).is_some() {
            bail!("mappings for {pack} given twice");
        }
    }
    Ok(mappings)
}
