//! Command line arguments for `bizdiag`.

use std::path::PathBuf;

use bizdiag_model::PackType;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "bizdiag",
    version,
    about = "Business diagnostics from small-business spreadsheets",
    long_about = "Profile and map uploaded spreadsheets, derive evidence-keyed facts,\n\
                  assess data confidence and rank improvement initiatives for a\n\
                  vertical playbook."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Profile the columns of a CSV file.
    Profile(ProfileArgs),

    /// Suggest canonical field mappings for a CSV file.
    Map(MapArgs),

    /// Run the full diagnostic over a set of uploads.
    Run(RunArgs),

    /// Validate a vertical playbook and list its signals.
    CheckConfig(CheckConfigArgs),
}

/// Where the vertical playbook comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PlaybookArgs {
    /// Path to a vertical playbook JSON file.
    #[arg(long = "config", value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Id of a playbook under the verticals directory (e.g. `restaurant`).
    #[arg(long = "vertical", value_name = "ID")]
    pub vertical: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Distinct sample values shown per column.
    #[arg(long = "samples", default_value_t = 5)]
    pub samples: usize,
}

#[derive(Args, Debug)]
pub struct MapArgs {
    #[command(flatten)]
    pub playbook: PlaybookArgs,

    /// Data pack the file belongs to.
    #[arg(long = "pack", value_enum)]
    pub pack: PackArg,

    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Ask the configured LLM collaborator for mapping advice.
    #[arg(long = "llm")]
    pub llm: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub playbook: PlaybookArgs,

    /// Profit and loss upload.
    #[arg(long = "pnl", value_name = "CSV")]
    pub pnl: Option<PathBuf>,

    /// Revenue or sales upload.
    #[arg(long = "revenue", value_name = "CSV")]
    pub revenue: Option<PathBuf>,

    /// Labor or payroll upload.
    #[arg(long = "labor", value_name = "CSV")]
    pub labor: Option<PathBuf>,

    /// Questionnaire answers as a JSON object.
    #[arg(long = "answers", value_name = "JSON")]
    pub answers: Option<PathBuf>,

    /// Confirmed mappings as a JSON object keyed by pack.
    #[arg(long = "mappings", value_name = "JSON")]
    pub mappings: Option<PathBuf>,

    /// Write the full report as JSON.
    #[arg(long = "output", short = 'o', value_name = "JSON")]
    pub output: Option<PathBuf>,

    /// Use the LLM collaborator configured through `BIZDIAG_LLM_*`.
    #[arg(long = "llm")]
    pub llm: bool,

    /// Only normalize with mappings that are confirmed.
    #[arg(long = "confirmed-only")]
    pub confirmed_only: bool,
}

impl RunArgs {
    /// Upload paths in pack order.
    pub fn uploads(&self) -> Vec<(PackType, &PathBuf)> {
        [
            (PackType::Pnl, self.pnl.as_ref()),
            (PackType::Revenue, self.revenue.as_ref()),
            (PackType::Labor, self.labor.as_ref()),
        ]
        .into_iter()
        .filter_map(|(pack, path)| path.map(|path| (pack, path)))
        .collect()
    }
}

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    #[command(flatten)]
    pub playbook: PlaybookArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PackArg {
    #[value(name = "PNL", alias = "pnl")]
    Pnl,
    #[value(name = "REVENUE", alias = "revenue")]
    Revenue,
    #[value(name = "LABOR", alias = "labor")]
    Labor,
}

impl From<PackArg> for PackType {
    fn from(value: PackArg) -> Self {
        match value {
            PackArg::Pnl => PackType::Pnl,
            PackArg::Revenue => PackType::Revenue,
            PackArg::Labor => PackType::Labor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
