use std::path::Path;

use bizdiag_config::VerticalConfig;
use bizdiag_model::{
    AnalyticsFact, DiagnosticReport, IssueSeverity, NarrativeSource, OperatingMode, TableProfile,
    format_number,
};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::commands::MapOutcome;

pub fn print_profile(profile: &TableProfile) {
    println!("Source: {} ({} rows)", profile.source, profile.row_count);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Type"),
        header_cell("Nulls"),
        header_cell("Unique"),
        header_cell("Range"),
        header_cell("Samples"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for column in &profile.columns {
        let range = match column.stats {
            Some(stats) => Cell::new(format!(
                "{} .. {}",
                rounded(stats.min),
                rounded(stats.max)
            )),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            Cell::new(&column.name).add_attribute(Attribute::Bold),
            Cell::new(column.inferred_type.as_str()),
            Cell::new(format!("{:.0}%", column.null_fraction * 100.0)),
            count_cell(column.unique_count),
            range,
            Cell::new(column.sample_values.join(", ")),
        ]);
    }
    println!("{table}");
}

pub fn print_mapping(outcome: &MapOutcome) {
    let mapping = &outcome.mapping;
    println!("Pack: {}", mapping.pack.label());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Columns"),
        header_cell("Transform"),
        header_cell("Confidence"),
        header_cell("Level"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for field in &mapping.mappings {
        let level = if field.confirmed {
            Cell::new("confirmed").fg(Color::Green)
        } else {
            match outcome.thresholds.categorize(field.confidence) {
                Some(level) => Cell::new(level.as_str()).fg(Color::Yellow),
                None => dim_cell("-"),
            }
        };
        table.add_row(vec![
            Cell::new(&field.canonical_field).add_attribute(Attribute::Bold),
            Cell::new(field.source_columns.join(" + ")),
            Cell::new(field.transform.as_str()),
            Cell::new(format!("{:.2}", field.confidence)),
            level,
        ]);
    }
    println!("{table}");

    if !mapping.gaps.is_empty() {
        let mut gaps = Table::new();
        gaps.set_header(vec![
            header_cell("Field"),
            header_cell("Required"),
            header_cell("Reason"),
        ]);
        apply_table_style(&mut gaps);
        align_column(&mut gaps, 1, CellAlignment::Center);
        for gap in &mapping.gaps {
            let required = if gap.required {
                Cell::new("yes").fg(Color::Red).add_attribute(Attribute::Bold)
            } else {
                dim_cell("no")
            };
            gaps.add_row(vec![
                Cell::new(&gap.canonical_field),
                required,
                Cell::new(&gap.reason),
            ]);
        }
        println!();
        println!("Gaps:");
        println!("{gaps}");
    }
    if !mapping.unmapped_columns.is_empty() {
        println!("Unmapped columns: {}", mapping.unmapped_columns.join(", "));
    }
    if let Some(error) = &outcome.advice_error {
        println!("Mapping advice unavailable: {error}");
    }
}

pub fn print_report(report: &DiagnosticReport, output: Option<&Path>) {
    println!("Vertical: {} ({})", report.vertical_name, report.vertical_id);
    println!(
        "Mode: {} (confidence {:.2}, {} month(s), completeness {:.0}%)",
        report.mode.mode,
        report.mode.confidence,
        report.mode.months_available,
        report.mode.completeness * 100.0
    );
    for reason in &report.mode.reasons {
        println!("  - {reason}");
    }
    println!("Input digest: {}", report.input_digest);
    if let Some(path) = output {
        println!("Report: {}", path.display());
    }

    print_pack_table(report);
    print_fact_table(report);
    print_initiative_table(report);
    print_excluded_table(report);
    print_issue_table(report);
    print_narratives(report);
}

pub fn print_playbook(config: &VerticalConfig) {
    println!("Vertical: {} ({})", config.vertical_name, config.vertical_id);
    let packs: Vec<&str> = config
        .data_packs
        .iter()
        .map(|pack| pack.pack_type.label())
        .collect();
    println!("Data packs: {}", packs.join(", "));
    println!(
        "Initiatives: {}, questionnaire rules: {}, benchmarks: {}",
        config.initiatives.len(),
        config.questionnaire.len(),
        config.benchmarks.len()
    );
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Signal"),
        header_cell("Unit"),
        header_cell("Formula"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, signal) in config.signals.iter().enumerate() {
        table.add_row(vec![
            count_cell(index + 1),
            Cell::new(&signal.id).add_attribute(Attribute::Bold),
            Cell::new(signal.unit.as_str()),
            Cell::new(&signal.formula),
        ]);
    }
    println!("{table}");
}

fn print_pack_table(report: &DiagnosticReport) {
    if report.packs.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Pack"),
        header_cell("Source"),
        header_cell("Rows"),
        header_cell("Usable"),
        header_cell("Months"),
        header_cell("Mapped"),
        header_cell("Pending"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    for column in 2..=6 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    align_column(&mut table, 7, CellAlignment::Center);
    for pack in &report.packs {
        let status = if pack.excluded {
            Cell::new("excluded")
                .fg(Color::Red)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
        };
        table.add_row(vec![
            Cell::new(pack.pack.label()).add_attribute(Attribute::Bold),
            Cell::new(&pack.source),
            count_cell(pack.input_rows),
            count_cell(pack.usable_rows),
            count_cell(pack.months),
            count_cell(pack.mapped_fields),
            count_cell(pack.pending_confirmations),
            status,
        ]);
    }
    println!();
    println!("Packs:");
    println!("{table}");
}

fn print_fact_table(report: &DiagnosticReport) {
    if report.facts.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Evidence"),
        header_cell("Label"),
        header_cell("Value"),
        header_cell("Unit"),
        header_cell("Period"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for fact in report.facts.iter() {
        table.add_row(vec![
            dim_cell(&fact.evidence_key),
            Cell::new(&fact.label),
            Cell::new(fact_value(fact)),
            Cell::new(fact.unit.as_str()),
            Cell::new(&fact.period),
        ]);
    }
    println!();
    println!("Facts:");
    println!("{table}");
}

fn print_initiative_table(report: &DiagnosticReport) {
    if report.ranked.is_empty() {
        println!();
        println!("No initiatives are eligible in {}.", report.mode.mode);
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rank"),
        header_cell("Initiative"),
        header_cell("Category"),
        header_cell("Score"),
        header_cell("Confidence"),
        header_cell("Annual impact"),
        header_cell("Narrative"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    align_column(&mut table, 6, CellAlignment::Center);
    for initiative in &report.ranked {
        let impact = match &initiative.impact {
            Some(impact) => Cell::new(format!(
                "{} ({} .. {})",
                rounded(impact.mid),
                rounded(impact.low),
                rounded(impact.high)
            )),
            None => dim_cell("not sized"),
        };
        let narrative = report
            .selected
            .iter()
            .find(|selected| selected.initiative.id == initiative.id)
            .map_or_else(|| dim_cell("-"), |selected| source_cell(selected.narrative_source));
        table.add_row(vec![
            count_cell(initiative.rank),
            Cell::new(&initiative.title).add_attribute(Attribute::Bold),
            Cell::new(&initiative.category),
            Cell::new(format!("{:.2}", initiative.priority_score)),
            Cell::new(format!("{:.2}", initiative.confidence)),
            impact,
            narrative,
        ]);
    }
    println!();
    println!("Initiatives ({}):", mode_label(report.mode.mode));
    println!("{table}");
}

fn print_excluded_table(report: &DiagnosticReport) {
    if report.excluded.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Initiative"),
        header_cell("Stage"),
        header_cell("Reasons"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for excluded in &report.excluded {
        table.add_row(vec![
            Cell::new(&excluded.title),
            dim_cell(excluded.stage.to_string()),
            Cell::new(excluded.reasons.join("; ")),
        ]);
    }
    println!();
    println!("Excluded:");
    println!("{table}");
}

fn print_issue_table(report: &DiagnosticReport) {
    if report.issues.is_empty() {
        return;
    }
    let mut issues: Vec<_> = report.issues.iter().collect();
    issues.sort_by_key(|issue| (issue.severity, issue.pack));
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Category"),
        header_cell("Pack"),
        header_cell("Field"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    for issue in issues {
        table.add_row(vec![
            severity_cell(issue.severity),
            Cell::new(issue.category.as_str()),
            issue
                .pack
                .map_or_else(|| dim_cell("-"), |pack| Cell::new(pack.label())),
            issue
                .field
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&issue.message),
        ]);
    }
    println!();
    println!(
        "Issues ({} error(s), {} warning(s)):",
        report.error_count(),
        report.warning_count()
    );
    println!("{table}");
}

fn print_narratives(report: &DiagnosticReport) {
    for selected in &report.selected {
        println!();
        println!(
            "#{} {}",
            selected.initiative.rank, selected.initiative.title
        );
        println!("{}", selected.explanation);
        for assumption in &selected.assumptions {
            println!("  assumption: {assumption}");
        }
        for gap in &selected.data_gaps {
            println!("  data gap: {gap}");
        }
    }
}

fn fact_value(fact: &AnalyticsFact) -> String {
    match (&fact.value_text, fact.value) {
        (Some(text), _) => text.clone(),
        (None, Some(value)) => rounded(value),
        (None, None) => "-".to_string(),
    }
}

fn rounded(value: f64) -> String {
    format_number((value * 100.0).round() / 100.0)
}

fn mode_label(mode: OperatingMode) -> &'static str {
    match mode {
        OperatingMode::Pnl => "full P&L",
        OperatingMode::Ops => "operations data",
        OperatingMode::Directional => "directional only",
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn count_cell(value: usize) -> Cell {
    if value == 0 {
        dim_cell(value)
    } else {
        Cell::new(value)
    }
}

fn source_cell(source: NarrativeSource) -> Cell {
    match source {
        NarrativeSource::Llm => Cell::new("llm").fg(Color::Green),
        NarrativeSource::Template => dim_cell("template"),
    }
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Error => Cell::new("ERROR")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
        IssueSeverity::Info => dim_cell("INFO"),
    }
}
