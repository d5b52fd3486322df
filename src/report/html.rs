use std::path::Path;

use handlebars::Handlebars;
use serde_json::{json, Value};

use super::{write_file, ReportError, RunReport, ScenarioOutcome};

pub const FILE_NAME: &str = "report.html";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>API test report</title>
<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }
tr.pass td:nth-child(3) { color: #1a7f37; }
tr.fail td:nth-child(3) { color: #cf222e; }
</style>
</head>
<body>
<h1>API test report</h1>
<p>{{total}} scenarios: {{passed}} passed, {{failed}} failed ({{duration_ms}} ms)</p>
<table>
<tr><th>Feature</th><th>Scenario</th><th>Status</th><th>Method</th><th>URL</th><th>HTTP status</th><th>Duration (ms)</th><th>Failure</th></tr>
{{#each scenarios}}
<tr class="{{class}}"><td>{{feature}}</td><td>{{scenario}}</td><td>{{status}}</td><td>{{method}}</td><td>{{url}}</td><td>{{http_status}}</td><td>{{duration_ms}}</td><td>{{#if failure}}line {{failure.line}}: {{failure.step}}<br>{{failure.message}}{{/if}}</td></tr>
{{/each}}
</table>
</body>
</html>
"#;

fn template_data(report: &RunReport) -> Value {
    let scenarios: Vec<Value> = report
        .scenarios
        .iter()
        .map(|scenario| {
            let record = &scenario.record;
            let (class, status, failure) = match &scenario.outcome {
                ScenarioOutcome::Passed => ("pass", "PASSED", Value::Null),
                ScenarioOutcome::Failed { step, line, message } => (
                    "fail",
                    "FAILED",
                    json!({ "step": step, "line": line, "message": message }),
                ),
            };
            json!({
                "class": class,
                "status": status,
                "feature": scenario.feature,
                "scenario": scenario.scenario,
                "method": record.request_method,
                "url": record.request_url,
                "http_status": record.response_status,
                "duration_ms": record.duration_ms,
                "failure": failure,
            })
        })
        .collect();

    json!({
        "total": report.total,
        "passed": report.passed,
        "failed": report.failed,
        "duration_ms": report.duration_ms,
        "scenarios": scenarios,
    })
}

/// Renders the run as an HTML table; values are HTML-escaped by the template engine.
pub fn render(report: &RunReport) -> Result<String, ReportError> {
    let handlebars = Handlebars::new();
    Ok(handlebars.render_template(TEMPLATE, &template_data(report))?)
}

pub fn write(report: &RunReport, report_dir: &Path) -> Result<(), ReportError> {
    write_file(&report_dir.join(FILE_NAME), &render(report)?)
}
