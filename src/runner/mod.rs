//! # Scenario runner
//!
//! Spreads scenarios over `parallel_workers` threads. Every worker owns its own
//! [`HttpClient`]; the configuration, step registry and fixture data are
//! shared read-only. Within a scenario, steps run in order and the first
//! failing step ends it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Instant, SystemTime};

use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::config::Config;
use crate::data::DataLoader;
use crate::feature::{Feature, Scenario};
use crate::http::{HttpClient, HttpError};
use crate::report::{unix_millis, ReportRecord, RunReport, ScenarioOutcome, ScenarioReport};
use crate::steps::{ScenarioContext, StepEnv, StepRegistry};

/// Bodies longer than this are cut when the last response is logged.
pub const RESPONSE_LOG_LIMIT: usize = 10_000;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to build HTTP client for worker: {0}")]
    Client(#[from] HttpError),

    #[error("A runner worker panicked")]
    WorkerPanicked,
}

pub struct Runner<'a> {
    config: &'a Config,
    registry: &'a StepRegistry,
    data: &'a DataLoader,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a Config, registry: &'a StepRegistry, data: &'a DataLoader) -> Self {
        Self {
            config,
            registry,
            data,
        }
    }

    /// Runs every scenario of `features`, or only those tagged `tag`.
    /// Scenario reports come back in feature file order.
    pub fn run(&self, features: &[Feature], tag: Option<&str>) -> Result<RunReport, RunnerError> {
        let started = Instant::now();
        let jobs = select(features, tag);
        let workers = self.config.parallel_workers.clamp(1, jobs.len().max(1));
        info!(scenarios = jobs.len(), workers, steps = self.registry.len(), "starting run");

        let clients = (0..workers)
            .map(|_| HttpClient::new(self.config))
            .collect::<Result<Vec<_>, _>>()?;

        let next = AtomicUsize::new(0);
        let mut results = thread::scope(|scope| {
            let handles: Vec<_> = clients
                .iter()
                .map(|client| {
                    let jobs = &jobs;
                    let next = &next;
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some((feature, scenario)) = jobs.get(index) else {
                                break;
                            };
                            done.push((index, self.run_scenario(client, feature, scenario)));
                        }
                        done
                    })
                })
                .collect();

            let mut results = Vec::with_capacity(jobs.len());
            for handle in handles {
                results.extend(handle.join().map_err(|_| RunnerError::WorkerPanicked)?);
            }
            Ok::<_, RunnerError>(results)
        })?;

        results.sort_by_key(|(index, _)| *index);
        let scenarios = results.into_iter().map(|(_, report)| report).collect();
        let report = RunReport::new(scenarios, started.elapsed().as_millis() as u64);
        info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "run finished"
        );
        Ok(report)
    }

    pub fn run_scenario(&self, client: &HttpClient, feature: &Feature, scenario: &Scenario) -> ScenarioReport {
        let span = info_span!("scenario", feature = %feature.name, scenario = %scenario.name);
        let _entered = span.enter();

        let started_at_ms = unix_millis(SystemTime::now());
        let mut context = ScenarioContext::new();
        let mut outcome = ScenarioOutcome::Passed;

        for step in &scenario.steps {
            let mut env = StepEnv {
                config: self.config,
                client,
                data: self.data,
                context: &mut context,
            };
            match self.registry.run(&mut env, &step.text, step.table.as_deref()) {
                Ok(()) => {
                    info!("[{} - {}] ✔ {} {}", feature.name, scenario.name, step.keyword, step.text);
                }
                Err(err) => {
                    if err.is_assertion() {
                        warn!("[{} - {}] ✘ {} {}: {err}", feature.name, scenario.name, step.keyword, step.text);
                    } else {
                        error!("[{} - {}] ✘ {} {}: {err}", feature.name, scenario.name, step.keyword, step.text);
                    }
                    outcome = ScenarioOutcome::Failed {
                        step: format!("{} {}", step.keyword, step.text),
                        line: step.line,
                        message: err.to_string(),
                    };
                    break;
                }
            }
        }

        let duration = context.finish();
        if let Some(response) = context.response() {
            debug!(
                status = response.status,
                latency_ms = response.elapsed_ms(),
                "last response:\n{}",
                response.display_body(RESPONSE_LOG_LIMIT)
            );
        }
        debug!(duration_ms = duration.as_millis() as u64, passed = outcome.is_passed(), "scenario finished");

        ScenarioReport {
            feature: feature.name.clone(),
            scenario: scenario.name.clone(),
            outcome,
            started_at_ms,
            record: ReportRecord::capture(&context),
        }
    }
}

fn select<'f>(features: &'f [Feature], tag: Option<&str>) -> Vec<(&'f Feature, &'f Scenario)> {
    features
        .iter()
        .flat_map(|feature| feature.scenarios.iter().map(move |scenario| (feature, scenario)))
        .filter(|(feature, scenario)| match tag {
            Some(tag) => {
                let tag = tag.trim_start_matches('@');
                scenario.has_tag(tag) || feature.tags.iter().any(|t| t == tag)
            }
            None => true,
        })
        .collect()
}
