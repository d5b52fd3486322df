use std::fmt::{self, Display};
use std::time::Duration;

use serde::Serialize;

use super::method::HttpMethod;

/// A query-string value. Cells made only of ASCII digits become integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Integer(u64),
    Text(String),
}

impl Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Integer(value) => write!(f, "{value}"),
            QueryValue::Text(value) => write!(f, "{value}"),
        }
    }
}

/// Ordered query parameters; a repeated key replaces the earlier value.
pub type QueryParams = Vec<(String, QueryValue)>;

/// JSON object body built from a step table. Values are always strings.
pub type JsonBody = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub query: Option<QueryParams>,
    pub body: Option<JsonBody>,
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            timeout: None,
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_body(mut self, body: JsonBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_serialize_as_plain_scalars() {
        let params: QueryParams = vec![
            ("page".into(), QueryValue::Integer(2)),
            ("q".into(), QueryValue::Text("abc".into())),
        ];
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!([["page", 2], ["q", "abc"]]));
    }

    #[test]
    fn builder_sets_optional_parts() {
        let mut body = JsonBody::new();
        body.insert("name".into(), "morpheus".into());

        let request = RequestDescriptor::new(HttpMethod::Post, "/api/users")
            .with_body(body)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/api/users");
        assert!(request.query.is_none());
        assert_eq!(request.body.unwrap()["name"], "morpheus");
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }
}
