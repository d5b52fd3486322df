use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use super::method::HttpMethod;

/// The response captured for a scenario, together with the request that produced it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub method: HttpMethod,
    pub url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub elapsed: Duration,
    pub body: String,
}

impl HttpResponse {
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    /// Body for logs: pretty JSON when it decodes, otherwise the raw text cut to `limit` chars.
    pub fn display_body(&self, limit: usize) -> String {
        match self.json() {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| self.body.clone()),
            Err(_) => self.body.chars().take(limit).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        HttpResponse {
            method: HttpMethod::Get,
            url: "http://localhost/api/users".into(),
            status: 200,
            headers,
            elapsed: Duration::from_millis(42),
            body: body.into(),
        }
    }

    #[test]
    fn decodes_json_body() {
        let resp = response(r#"{"data": [1, 2]}"#);
        assert_eq!(resp.json().unwrap()["data"][1], 2);
        assert_eq!(resp.elapsed_ms(), 42);
    }

    #[test]
    fn display_body_truncates_non_json() {
        let resp = response(&"x".repeat(50));
        assert_eq!(resp.display_body(10), "x".repeat(10));
        let resp = response(r#"{"a":1}"#);
        assert_eq!(resp.display_body(10), "{\n  \"a\": 1\n}");
    }
}
