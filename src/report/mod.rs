//! # Reporting
//!
//! Per-scenario records of the request that ran last and how long the
//! scenario took, plus writers for the run summary (text, JSON, HTML and
//! Allure result files).

pub mod allure;
pub mod html;

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;

use crate::http::HttpMethod;
use crate::steps::ScenarioContext;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to create report directory `{}`: {source}", .path.display())]
    CreateDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report `{}`: {source}", .path.display())]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to render HTML report: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Request and timing metadata attached to each scenario result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    #[serde(rename = "request.method", skip_serializing_if = "Option::is_none")]
    pub request_method: Option<HttpMethod>,
    #[serde(rename = "request.url", skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    #[serde(rename = "response.status", skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    #[serde(rename = "response.elapsed_ms", skip_serializing_if = "Option::is_none")]
    pub response_elapsed_ms: Option<u64>,
    #[serde(rename = "test.duration_ms", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ReportRecord {
    pub fn capture(context: &ScenarioContext) -> Self {
        let response = context.response();
        Self {
            request_method: response.map(|r| r.method),
            request_url: response.map(|r| r.url.clone()),
            response_status: response.map(|r| r.status),
            response_elapsed_ms: response.map(|r| r.elapsed_ms()),
            duration_ms: context.duration().map(|d| d.as_millis() as u64),
        }
    }

    /// `(name, value)` pairs in a fixed order, for report formats that take flat properties.
    pub fn properties(&self) -> Vec<(&'static str, String)> {
        let mut properties = Vec::new();
        if let Some(method) = self.request_method {
            properties.push(("request.method", method.to_string()));
        }
        if let Some(url) = &self.request_url {
            properties.push(("request.url", url.clone()));
        }
        if let Some(status) = self.response_status {
            properties.push(("response.status", status.to_string()));
        }
        if let Some(elapsed) = self.response_elapsed_ms {
            properties.push(("response.elapsed_ms", elapsed.to_string()));
        }
        if let Some(duration) = self.duration_ms {
            properties.push(("test.duration_ms", duration.to_string()));
        }
        properties
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScenarioOutcome {
    Passed,
    Failed { step: String, line: usize, message: String },
}

impl ScenarioOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, ScenarioOutcome::Passed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub feature: String,
    pub scenario: String,
    pub outcome: ScenarioOutcome,
    pub started_at_ms: u64,
    pub record: ReportRecord,
}

/// Summary of a run, scenarios in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn new(scenarios: Vec<ScenarioReport>, duration_ms: u64) -> Self {
        let passed = scenarios.iter().filter(|s| s.outcome.is_passed()).count();
        Self {
            total: scenarios.len(),
            passed,
            failed: scenarios.len() - passed,
            duration_ms,
            scenarios,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for report in &self.scenarios {
            match &report.outcome {
                ScenarioOutcome::Passed => {
                    lines.push(format!("PASS  {} - {}", report.feature, report.scenario));
                }
                ScenarioOutcome::Failed { step, line, message } => {
                    lines.push(format!("FAIL  {} - {}", report.feature, report.scenario));
                    lines.push(format!("      line {line}: {step}"));
                    lines.push(format!("      {message}"));
                }
            }
        }
        lines.push(format!(
            "{} scenarios: {} passed, {} failed ({} ms)",
            self.total, self.passed, self.failed, self.duration_ms
        ));
        lines.join("\n")
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        write_file(path, &self.to_json()?)
    }
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
