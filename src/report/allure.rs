//! Allure result files, one `<uuid>-result.json` per scenario.

use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use super::{write_file, ReportError, RunReport, ScenarioOutcome, ScenarioReport};

pub const RESULTS_DIR: &str = "allure-results";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllureResult<'a> {
    uuid: String,
    history_id: String,
    name: &'a str,
    full_name: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_details: Option<StatusDetails>,
    stage: &'static str,
    start: u64,
    stop: u64,
    labels: Vec<NameValue>,
    parameters: Vec<NameValue>,
}

#[derive(Debug, Serialize)]
struct StatusDetails {
    message: String,
    trace: String,
}

#[derive(Debug, Serialize)]
struct NameValue {
    name: String,
    value: String,
}

impl NameValue {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

fn to_result(scenario: &ScenarioReport) -> AllureResult<'_> {
    let full_name = format!("{}: {}", scenario.feature, scenario.scenario);
    let (status, status_details) = match &scenario.outcome {
        ScenarioOutcome::Passed => ("passed", None),
        ScenarioOutcome::Failed { step, line, message } => (
            "failed",
            Some(StatusDetails {
                message: message.clone(),
                trace: format!("line {line}: {step}"),
            }),
        ),
    };
    let start = scenario.started_at_ms;

    AllureResult {
        uuid: Uuid::new_v4().to_string(),
        history_id: full_name.clone(),
        name: &scenario.scenario,
        full_name,
        status,
        status_details,
        stage: "finished",
        start,
        stop: start + scenario.record.duration_ms.unwrap_or(0),
        labels: vec![
            NameValue::new("feature", scenario.feature.clone()),
            NameValue::new("framework", "apicheck"),
        ],
        parameters: scenario
            .record
            .properties()
            .into_iter()
            .map(|(name, value)| NameValue::new(name, value))
            .collect(),
    }
}

/// Writes every scenario of `report` under `<report_dir>/allure-results` and
/// returns the files written.
pub fn write(report: &RunReport, report_dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let dir = report_dir.join(RESULTS_DIR);
    let mut written = Vec::with_capacity(report.scenarios.len());
    for scenario in &report.scenarios {
        let result = to_result(scenario);
        let path = dir.join(format!("{}-result.json", result.uuid));
        write_file(&path, &serde_json::to_string_pretty(&result)?)?;
        written.push(path);
    }
    Ok(written)
}
