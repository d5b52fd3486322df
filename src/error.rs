use thiserror::Error;

use crate::config::ConfigError;
use crate::feature::FeatureError;
use crate::report::ReportError;
use crate::runner::RunnerError;
use crate::steps::StepError;

/// Anything that stops a run before or after scenarios execute.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("No feature files found under `{}`", .0.display())]
    NoFeatures(std::path::PathBuf),

    #[error("Failed to register steps: {0}")]
    Steps(#[from] StepError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
