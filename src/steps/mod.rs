//! # Step orchestration
//!
//! Turns declarative step text into HTTP calls and response checks. Steps are
//! looked up in a [`StepRegistry`] populated once at startup; handlers receive
//! a [`StepEnv`] carrying the scenario's context and the shared, read-only
//! configuration, client and fixture data.

pub mod context;
pub mod registry;
pub mod table;
mod then;
mod when;

use thiserror::Error;

use crate::assertions::AssertionError;
use crate::config::Config;
use crate::data::{DataError, DataLoader};
use crate::http::{HttpClient, HttpError};

pub use context::ScenarioContext;
pub use registry::{StepArgs, StepHandler, StepRegistry};

#[derive(Debug, Error)]
pub enum StepError {
    #[error("No step definition matches `{0}`")]
    Unmatched(String),

    #[error("Invalid step pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Missing step argument `{0}`")]
    MissingArgument(String),

    #[error("Invalid value for `{name}`: `{value}`")]
    InvalidArgument { name: String, value: String },

    #[error("This step expects a table of `| key | value |` rows")]
    MissingTable,

    #[error("Path must begin with `/`: `{0}`")]
    InvalidPath(String),

    #[error("Fixture `{0}` is not a JSON object")]
    FixtureNotObject(String),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Assertion(#[from] AssertionError),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl StepError {
    /// Assertion failures are ordinary test failures; everything else points
    /// at a broken step, request or environment.
    pub fn is_assertion(&self) -> bool {
        matches!(self, StepError::Assertion(_))
    }
}

/// Everything a step handler may read or mutate.
pub struct StepEnv<'a> {
    pub config: &'a Config,
    pub client: &'a HttpClient,
    pub data: &'a DataLoader,
    pub context: &'a mut ScenarioContext,
}

/// `base_url` without its trailing slashes followed by `path` verbatim.
pub fn build_url(base_url: &str, path: &str) -> Result<String, StepError> {
    if !path.starts_with('/') {
        return Err(StepError::InvalidPath(path.to_string()));
    }
    Ok(format!("{}{}", base_url.trim_end_matches('/'), path))
}

impl StepRegistry {
    /// A registry holding the built-in request and response steps.
    pub fn with_default_steps() -> Result<Self, StepError> {
        let mut registry = StepRegistry::new();
        when::register(&mut registry)?;
        then::register(&mut registry)?;
        Ok(registry)
    }
}
