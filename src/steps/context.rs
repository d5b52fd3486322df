use std::time::{Duration, Instant};

use crate::http::HttpResponse;

/// Per-scenario state shared between steps. Holds at most one response: every
/// request step replaces whatever the previous one stored.
#[derive(Debug)]
pub struct ScenarioContext {
    last_response: Option<HttpResponse>,
    started_at: Instant,
    duration: Option<Duration>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self {
            last_response: None,
            started_at: Instant::now(),
            duration: None,
        }
    }

    pub fn store_response(&mut self, response: HttpResponse) {
        self.last_response = Some(response);
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    /// Stops the scenario clock. Later calls keep the first measurement.
    pub fn finish(&mut self) -> Duration {
        *self.duration.get_or_insert_with(|| self.started_at.elapsed())
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::new()
    }
}
