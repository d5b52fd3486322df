//! # Response assertions
//!
//! Pure checks over the response a scenario captured last: status code,
//! JSON Schema conformance and minimum array length of a top-level field.
//! Nothing here retries or touches the network.

use std::fs;
use std::path::{Component, Path};

use serde_json::Value;
use thiserror::Error;

use crate::http::HttpResponse;

/// How much of a response body is quoted in a failure message.
const BODY_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssertionError {
    #[error("No response was captured.")]
    NoResponse,

    #[error("Expected {expected}, got {actual}: {body}")]
    StatusMismatch { expected: u16, actual: u16, body: String },

    #[error("Response body is not valid JSON ({reason}): {body}")]
    NotJson { reason: String, body: String },

    #[error("Cannot check schema `{schema}`: no response was captured.")]
    SchemaNoResponse { schema: String },

    #[error("Cannot check schema `{schema}`: response body is not valid JSON ({reason}): {body}")]
    SchemaNotJson {
        schema: String,
        reason: String,
        body: String,
    },

    #[error("Invalid schema reference `{0}`")]
    InvalidSchemaName(String),

    #[error("Schema `{schema}` not found at {path}")]
    SchemaNotFound { schema: String, path: String },

    #[error("Schema `{schema}` is malformed: {reason}")]
    SchemaMalformed { schema: String, reason: String },

    #[error("Response does not match schema `{schema}` at {path}: {reason}")]
    SchemaViolation {
        schema: String,
        path: String,
        reason: String,
    },

    #[error("Field '{field}' is not an array: {observed}")]
    NotAnArray { field: String, observed: String },

    #[error("Expected at least {min} items in '{field}', got {actual}")]
    TooFewItems { field: String, min: usize, actual: usize },
}

pub fn assert_status(response: Option<&HttpResponse>, expected: u16) -> Result<(), AssertionError> {
    let response = response.ok_or(AssertionError::NoResponse)?;
    if response.status != expected {
        return Err(AssertionError::StatusMismatch {
            expected,
            actual: response.status,
            body: excerpt(&response.body),
        });
    }
    Ok(())
}

/// Validates the decoded body against `<schema_dir>/<schema_name>`.
pub fn assert_schema(
    response: Option<&HttpResponse>,
    schema_dir: &Path,
    schema_name: &str,
) -> Result<(), AssertionError> {
    let response = response.ok_or_else(|| AssertionError::SchemaNoResponse {
        schema: schema_name.to_string(),
    })?;
    let body = response.json().map_err(|err| AssertionError::SchemaNotJson {
        schema: schema_name.to_string(),
        reason: err.to_string(),
        body: excerpt(&response.body),
    })?;
    let schema = load_schema(schema_dir, schema_name)?;
    validate_instance(&body, &schema, schema_name)
}

pub fn assert_array_min_items(
    response: Option<&HttpResponse>,
    field: &str,
    min_items: usize,
) -> Result<(), AssertionError> {
    let response = response.ok_or(AssertionError::NoResponse)?;
    let body = decode_body(response)?;
    check_array_min_items(&body, field, min_items)
}

pub fn decode_body(response: &HttpResponse) -> Result<Value, AssertionError> {
    response.json().map_err(|err| AssertionError::NotJson {
        reason: err.to_string(),
        body: excerpt(&response.body),
    })
}

pub fn load_schema(schema_dir: &Path, schema_name: &str) -> Result<Value, AssertionError> {
    let relative = Path::new(schema_name);
    let plain = !schema_name.trim().is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !plain {
        return Err(AssertionError::InvalidSchemaName(schema_name.to_string()));
    }

    let path = schema_dir.join(relative);
    let raw = fs::read_to_string(&path).map_err(|_| AssertionError::SchemaNotFound {
        schema: schema_name.to_string(),
        path: path.display().to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|err| AssertionError::SchemaMalformed {
        schema: schema_name.to_string(),
        reason: err.to_string(),
    })
}

/// Reports the first structural violation with the JSON pointer of the offending instance.
pub fn validate_instance(instance: &Value, schema: &Value, schema_name: &str) -> Result<(), AssertionError> {
    let validator = jsonschema::validator_for(schema).map_err(|err| AssertionError::SchemaMalformed {
        schema: schema_name.to_string(),
        reason: err.to_string(),
    })?;

    match validator.iter_errors(instance).next() {
        None => Ok(()),
        Some(error) => {
            let pointer = error.instance_path.to_string();
            Err(AssertionError::SchemaViolation {
                schema: schema_name.to_string(),
                path: if pointer.is_empty() { "/".to_string() } else { pointer },
                reason: error.to_string(),
            })
        }
    }
}

pub fn check_array_min_items(body: &Value, field: &str, min_items: usize) -> Result<(), AssertionError> {
    let items = match body.get(field) {
        Some(Value::Array(items)) => items,
        other => {
            return Err(AssertionError::NotAnArray {
                field: field.to_string(),
                observed: json_type(other).to_string(),
            });
        }
    };

    if items.len() < min_items {
        return Err(AssertionError::TooFewItems {
            field: field.to_string(),
            min: min_items,
            actual: items.len(),
        });
    }
    Ok(())
}

fn json_type(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= BODY_EXCERPT_CHARS {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            method: HttpMethod::Get,
            url: "http://localhost/api/users".into(),
            status,
            headers: HashMap::new(),
            elapsed: Duration::from_millis(3),
            body: body.into(),
        }
    }

    fn user_schema() -> Value {
        json!({
            "type": "object",
            "required": ["data"],
            "properties": {
                "data": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id", "email"],
                        "properties": {"id": {"type": "integer"}, "email": {"type": "string"}}
                    }
                }
            }
        })
    }

    fn schema_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("users.json"), user_schema().to_string()).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("invalid.json"), r#"{"type": 12}"#).unwrap();
        dir
    }

    #[test]
    fn status_matches() {
        assert!(assert_status(Some(&response(204, "")), 204).is_ok());
    }

    #[test]
    fn status_mismatch_names_both_codes_and_body() {
        let err = assert_status(Some(&response(204, "gone")), 200).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("200"));
        assert!(message.contains("204"));
        assert!(message.contains("gone"));
    }

    #[test]
    fn missing_response_fails_every_check() {
        let dir = schema_dir();
        assert_eq!(assert_status(None, 200), Err(AssertionError::NoResponse));
        assert_eq!(
            assert_schema(None, dir.path(), "users.json"),
            Err(AssertionError::SchemaNoResponse {
                schema: "users.json".into()
            })
        );
        assert_eq!(assert_array_min_items(None, "data", 1), Err(AssertionError::NoResponse));
    }

    #[test]
    fn array_check_enforces_minimum() {
        let body = json!({"data": [1, 2, 3]});
        assert!(check_array_min_items(&body, "data", 2).is_ok());
        assert!(check_array_min_items(&body, "data", 3).is_ok());

        let err = check_array_min_items(&body, "data", 4).unwrap_err();
        assert_eq!(
            err,
            AssertionError::TooFewItems {
                field: "data".into(),
                min: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn array_check_rejects_non_arrays_regardless_of_minimum() {
        let body = json!({"data": "abc", "meta": {"page": 1}});
        for min in [0, 1, 10] {
            let err = check_array_min_items(&body, "data", min).unwrap_err();
            assert_eq!(err.to_string(), "Field 'data' is not an array: string");
        }
        let err = check_array_min_items(&body, "meta", 0).unwrap_err();
        assert!(err.to_string().contains("object"));
        let err = check_array_min_items(&body, "absent", 0).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn non_json_body_is_a_descriptive_failure() {
        let err = assert_array_min_items(Some(&response(200, "<html>")), "data", 1).unwrap_err();
        assert!(matches!(err, AssertionError::NotJson { ref body, .. } if body == "<html>"));
    }

    #[test]
    fn schema_check_passes_and_is_idempotent() {
        let dir = schema_dir();
        let resp = response(200, r#"{"data": [{"id": 1, "email": "george.bluth@reqres.in"}]}"#);
        assert!(assert_schema(Some(&resp), dir.path(), "users.json").is_ok());
        assert!(assert_schema(Some(&resp), dir.path(), "users.json").is_ok());
    }

    #[test]
    fn schema_violation_reports_schema_and_path() {
        let dir = schema_dir();
        let resp = response(200, r#"{"data": [{"id": 1, "email": "a@b"}, {"id": "two", "email": "c@d"}]}"#);

        let first = assert_schema(Some(&resp), dir.path(), "users.json").unwrap_err();
        let second = assert_schema(Some(&resp), dir.path(), "users.json").unwrap_err();
        assert_eq!(first, second);
        match first {
            AssertionError::SchemaViolation { schema, path, .. } => {
                assert_eq!(schema, "users.json");
                assert_eq!(path, "/data/1/id");
            }
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[test]
    fn schema_file_problems_are_distinct() {
        let dir = schema_dir();
        let resp = response(200, r#"{"data": []}"#);

        let err = assert_schema(Some(&resp), dir.path(), "nope.json").unwrap_err();
        assert!(matches!(err, AssertionError::SchemaNotFound { ref schema, .. } if schema == "nope.json"));

        let err = assert_schema(Some(&resp), dir.path(), "broken.json").unwrap_err();
        assert!(matches!(err, AssertionError::SchemaMalformed { ref schema, .. } if schema == "broken.json"));

        let err = assert_schema(Some(&resp), dir.path(), "invalid.json").unwrap_err();
        assert!(matches!(err, AssertionError::SchemaMalformed { .. }));

        let err = assert_schema(Some(&resp), dir.path(), "../users.json").unwrap_err();
        assert_eq!(err, AssertionError::InvalidSchemaName("../users.json".into()));
    }

    #[test]
    fn schema_check_rejects_non_json_body() {
        let dir = schema_dir();
        let err = assert_schema(Some(&response(200, "<html>")), dir.path(), "users.json").unwrap_err();
        assert!(matches!(err, AssertionError::SchemaNotJson { ref schema, ref body, .. }
            if schema == "users.json" && body == "<html>"));
        assert!(err.to_string().contains("users.json"));
    }

    #[test]
    fn schema_failures_without_a_body_name_the_schema() {
        let dir = schema_dir();
        let message = assert_schema(None, dir.path(), "users.json").unwrap_err().to_string();
        assert_eq!(message, "Cannot check schema `users.json`: no response was captured.");
    }

    #[test]
    fn long_bodies_are_cut_in_messages() {
        let body = "x".repeat(BODY_EXCERPT_CHARS + 10);
        let err = assert_status(Some(&response(500, &body)), 200).unwrap_err();
        assert!(err.to_string().ends_with("..."));
    }
}
