//! # HTTP client wrapper
//!
//! A pooled blocking client that applies the configured timeout, default
//! headers and retry policy to every request a step issues.

pub mod client;
pub mod method;
pub mod request;
pub mod response;
pub mod retry;

use thiserror::Error;

pub use client::HttpClient;
pub use method::HttpMethod;
pub use request::{JsonBody, QueryParams, QueryValue, RequestDescriptor};
pub use response::HttpResponse;
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Invalid default header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("{method} {url} timed out after {attempts} attempt(s)")]
    Timeout {
        method: HttpMethod,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        method: HttpMethod,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} still returned {status} after {attempts} attempt(s)")]
    RetriesExhausted {
        method: HttpMethod,
        url: String,
        attempts: u32,
        status: u16,
    },

    #[error("Failed to read response from {method} {url}: {source}")]
    ReadBody {
        method: HttpMethod,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
