//! Pipe-table parsing for step arguments.
//!
//! Every non-empty line is read as `| key | value |`. Rows with fewer than two
//! cells are skipped without error.

use serde_json::Value;

use crate::http::{JsonBody, QueryParams, QueryValue};

pub fn parse_rows(table: &str) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    for line in table.trim().lines() {
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }

        let cells: Vec<&str> = raw
            .trim_matches('|')
            .split('|')
            .map(str::trim)
            .collect();
        if cells.len() < 2 {
            continue;
        }
        rows.push((cells[0].to_string(), cells[1].to_string()));
    }

    rows
}

/// Query variant: all-digit values become integers.
pub fn parse_query(table: &str) -> QueryParams {
    let mut params: QueryParams = Vec::new();
    for (key, value) in parse_rows(table) {
        let value = coerce(value);
        match params.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => params.push((key, value)),
        }
    }
    params
}

/// Body variant: values stay strings.
pub fn parse_json_body(table: &str) -> JsonBody {
    parse_rows(table)
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

fn coerce(value: String) -> QueryValue {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(number) = value.parse() {
            return QueryValue::Integer(number);
        }
    }
    QueryValue::Text(value)
}
