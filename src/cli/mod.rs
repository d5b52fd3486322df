//! # Command line
//!
//! `apicheck [FEATURES_DIR] [--format text|json] [--report PATH] [--tag NAME]`
//!
//! Exit codes: 0 when every scenario passes, 1 when any fails, 2 when the
//! run could not start or its reports could not be written.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tracing::info;

use crate::config::Config;
use crate::data::DataLoader;
use crate::error::HarnessError;
use crate::feature::{self, Feature};
use crate::report::{allure, html, RunReport};
use crate::runner::Runner;
use crate::steps::StepRegistry;

pub const EXIT_PASSED: u8 = 0;
pub const EXIT_FAILED: u8 = 1;
pub const EXIT_ERROR: u8 = 2;

#[derive(Debug, Clone, Parser)]
#[command(name = "apicheck", version, about = "Run behavior-driven REST API scenarios")]
pub struct CliArgs {
    /// Directory searched recursively for `*.feature` files
    #[arg(default_value = "tests/features")]
    pub features: PathBuf,

    /// Summary format printed on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Only run scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
}

/// Output format for CLI reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Loads every feature file under `dir`.
pub fn load_features(dir: &Path) -> Result<Vec<Feature>, HarnessError> {
    let files = feature::discover(dir)?;
    if files.is_empty() {
        return Err(HarnessError::NoFeatures(dir.to_path_buf()));
    }
    files.iter().map(|path| Ok(feature::load(path)?)).collect()
}

/// Runs the scenarios selected by `args` and writes the configured reports.
pub fn execute(args: &CliArgs, config: &Config) -> Result<RunReport, HarnessError> {
    let features = load_features(&args.features)?;
    let registry = StepRegistry::with_default_steps()?;
    let data = DataLoader::new(&config.data_dir);

    let report = Runner::new(config, &registry, &data).run(&features, args.tag.as_deref())?;

    if let Some(path) = &args.report {
        report.write_json(path)?;
        info!(path = %path.display(), "wrote JSON report");
    }
    if config.enable_html_report {
        html::write(&report, &config.report_dir)?;
        info!(dir = %config.report_dir.display(), "wrote HTML report");
    }
    if config.enable_allure_report {
        let files = allure::write(&report, &config.report_dir)?;
        info!(results = files.len(), dir = %config.report_dir.display(), "wrote Allure results");
    }
    Ok(report)
}

/// Renders the run summary for stdout.
pub fn render(report: &RunReport, format: OutputFormat) -> Result<String, HarnessError> {
    match format {
        OutputFormat::Text => Ok(report.summary()),
        OutputFormat::Json => Ok(report.to_json()?),
    }
}

pub fn exit_code(report: &RunReport) -> u8 {
    if report.is_success() { EXIT_PASSED } else { EXIT_FAILED }
}
