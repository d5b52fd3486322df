use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;

use super::method::HttpMethod;
use super::request::{JsonBody, QueryParams, RequestDescriptor};
use super::response::HttpResponse;
use super::retry::RetryPolicy;
use super::HttpError;

/// Connection-pooled blocking client. The pool lives as long as the client and
/// is released when it is dropped.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    policy: RetryPolicy,
    default_timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self, HttpError> {
        Self::build(config.timeout, config.retry_policy(), &default_headers(config))
    }

    pub fn build(
        default_timeout: Duration,
        policy: RetryPolicy,
        headers: &HashMap<String, String>,
    ) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .default_headers(build_headers(headers)?)
            .timeout(default_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(HttpError::Build)?;

        Ok(Self {
            inner,
            policy,
            default_timeout,
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Sends a request for a textual verb. Unsupported verbs fail before any
    /// connection is opened.
    pub fn request(
        &self,
        method: &str,
        url: &str,
        params: Option<&QueryParams>,
        json_body: Option<&JsonBody>,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, HttpError> {
        let method: HttpMethod = method.parse()?;
        self.execute(method, url, params, json_body, timeout)
    }

    pub fn dispatch(&self, url: &str, request: &RequestDescriptor) -> Result<HttpResponse, HttpError> {
        self.execute(
            request.method,
            url,
            request.query.as_ref(),
            request.body.as_ref(),
            request.timeout,
        )
    }

    pub fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        params: Option<&QueryParams>,
        json_body: Option<&JsonBody>,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, HttpError> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = self.policy.backoff(attempt);
                debug!(%method, url, retry = attempt, delay_ms = delay.as_millis() as u64, "backing off");
                thread::sleep(delay);
            }
            attempt += 1;

            let request = self.prepare(method, url, params, json_body, timeout);
            info!(%method, url, attempt, "request issued");

            let started = Instant::now();
            match request.send() {
                Ok(response) => {
                    let elapsed = started.elapsed();
                    let status = response.status().as_u16();
                    info!(%method, url, attempt, status, latency_ms = elapsed.as_millis() as u64, "response received");

                    if self.policy.is_retryable_status(status) {
                        if self.policy.can_retry(attempt) {
                            warn!(%method, url, attempt, status, "transient status, retrying");
                            continue;
                        }
                        return Err(HttpError::RetriesExhausted {
                            method,
                            url: url.to_string(),
                            attempts: attempt,
                            status,
                        });
                    }

                    return read_response(method, response, elapsed);
                }
                Err(err) => {
                    let transient = err.is_connect() || err.is_timeout();
                    warn!(%method, url, attempt, transient, error = %err, "request failed");

                    if transient && self.policy.can_retry(attempt) {
                        continue;
                    }
                    return Err(transport_error(method, url, attempt, err));
                }
            }
        }
    }

    fn prepare(
        &self,
        method: HttpMethod,
        url: &str,
        params: Option<&QueryParams>,
        json_body: Option<&JsonBody>,
        timeout: Duration,
    ) -> RequestBuilder {
        let mut request = self.inner.request(method.into(), url).timeout(timeout);
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(body) = json_body {
            request = request.json(body);
        }
        request
    }
}

pub fn default_headers(config: &Config) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Accept".to_string(), "application/json".to_string());
    if !config.api_key.is_empty() {
        headers.insert("x-api-key".to_string(), config.api_key.clone());
    }
    headers
}

fn build_headers(input: &HashMap<String, String>) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        if key.is_empty() {
            continue;
        }

        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| HttpError::InvalidHeader {
            name: key.clone(),
            reason: err.to_string(),
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| HttpError::InvalidHeader {
            name: key.clone(),
            reason: err.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

fn read_response(method: HttpMethod, response: Response, elapsed: Duration) -> Result<HttpResponse, HttpError> {
    let url = response.url().to_string();
    let status = response.status().as_u16();

    let mut headers = HashMap::new();
    for (key, value) in response.headers() {
        headers.insert(key.to_string(), value.to_str().unwrap_or_default().to_string());
    }

    let bytes = response.bytes().map_err(|source| HttpError::ReadBody {
        method,
        url: url.clone(),
        source,
    })?;

    Ok(HttpResponse {
        method,
        url,
        status,
        headers,
        elapsed,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

fn transport_error(method: HttpMethod, url: &str, attempts: u32, source: reqwest::Error) -> HttpError {
    let url = url.to_string();
    if source.is_timeout() {
        HttpError::Timeout {
            method,
            url,
            attempts,
            source,
        }
    } else {
        HttpError::Transport {
            method,
            url,
            attempts,
            source,
        }
    }
}
