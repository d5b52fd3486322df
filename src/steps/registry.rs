//! Pattern-to-handler registry for step text.
//!
//! Patterns are literal text with `{name}` placeholders. A placeholder may
//! carry a type: `{name:w}` matches a single word and `{name:d}` an integer;
//! an untyped placeholder matches any non-empty text.

use std::collections::HashMap;

use regex::Regex;
use tracing::trace;

use super::{StepEnv, StepError};

pub type StepHandler = fn(&mut StepEnv<'_>, &StepArgs<'_>) -> Result<(), StepError>;

/// Values captured from a matched step plus its attached table, if any.
#[derive(Debug)]
pub struct StepArgs<'a> {
    values: HashMap<String, String>,
    pub table: Option<&'a str>,
}

impl<'a> StepArgs<'a> {
    pub fn new(values: HashMap<String, String>, table: Option<&'a str>) -> Self {
        Self { values, table }
    }

    pub fn get(&self, name: &str) -> Result<&str, StepError> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| StepError::MissingArgument(name.to_string()))
    }

    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<T, StepError> {
        let raw = self.get(name)?;
        raw.parse().map_err(|_| StepError::InvalidArgument {
            name: name.to_string(),
            value: raw.to_string(),
        })
    }

    pub fn table(&self) -> Result<&'a str, StepError> {
        self.table.ok_or(StepError::MissingTable)
    }
}

#[derive(Debug)]
struct CompiledStep {
    pattern: String,
    regex: Regex,
    slot_names: Vec<String>,
    handler: StepHandler,
}

#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: Vec<CompiledStep>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `pattern`. Earlier registrations win when
    /// several patterns match the same text.
    pub fn register(&mut self, pattern: &str, handler: StepHandler) -> Result<(), StepError> {
        let (regex, slot_names) = compile_pattern(pattern)?;
        self.steps.push(CompiledStep {
            pattern: pattern.to_string(),
            regex,
            slot_names,
            handler,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Finds the handler for `text` and the values its placeholders captured.
    pub fn find<'t>(&self, text: &str, table: Option<&'t str>) -> Option<(StepHandler, StepArgs<'t>)> {
        let text = text.trim();
        self.steps.iter().find_map(|step| {
            let captures = step.regex.captures(text)?;
            trace!(pattern = %step.pattern, text, "step matched");
            let values = step
                .slot_names
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect();
            Some((step.handler, StepArgs::new(values, table)))
        })
    }

    pub fn run(&self, env: &mut StepEnv<'_>, text: &str, table: Option<&str>) -> Result<(), StepError> {
        let (handler, args) = self
            .find(text, table)
            .ok_or_else(|| StepError::Unmatched(text.trim().to_string()))?;
        handler(env, &args)
    }
}

fn compile_pattern(pattern: &str) -> Result<(Regex, Vec<String>), StepError> {
    let mut regex_str = String::from("^");
    let mut slot_names = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '{' {
            literal.push(c);
            continue;
        }

        let mut slot = String::new();
        let mut closed = false;
        for next in chars.by_ref() {
            if next == '}' {
                closed = true;
                break;
            }
            slot.push(next);
        }
        if !closed {
            return Err(StepError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "unclosed placeholder".to_string(),
            });
        }

        let (name, kind) = slot.split_once(':').unwrap_or((slot.as_str(), ""));
        let group = match kind {
            "" => ".+?",
            "w" => r"\w+",
            "d" => r"-?\d+",
            other => {
                return Err(StepError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: format!("unknown placeholder type `{other}`"),
                });
            }
        };

        regex_str.push_str(&regex::escape(&literal));
        literal.clear();
        regex_str.push_str(&format!("(?P<{name}>{group})"));
        slot_names.push(name.to_string());
    }

    regex_str.push_str(&regex::escape(&literal));
    regex_str.push('$');

    let regex = Regex::new(&regex_str).map_err(|err| StepError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })?;
    Ok((regex, slot_names))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut StepEnv<'_>, _: &StepArgs<'_>) -> Result<(), StepError> {
        Ok(())
    }

    #[test]
    fn compiles_typed_placeholders() {
        let (regex, slots) = compile_pattern(r#"I {method:w} "{path}" with json:"#).unwrap();
        assert_eq!(slots, vec!["method", "path"]);

        let captures = regex.captures(r#"I POST "/api/users" with json:"#).unwrap();
        assert_eq!(&captures["method"], "POST");
        assert_eq!(&captures["path"], "/api/users");

        assert!(regex.captures(r#"I POST "/api/users""#).is_none());
    }

    #[test]
    fn integer_placeholder_rejects_words() {
        let (regex, _) = compile_pattern("the response status code should be {code:d}").unwrap();
        assert!(regex.is_match("the response status code should be 204"));
        assert!(!regex.is_match("the response status code should be ok"));
    }

    #[test]
    fn literal_text_is_escaped() {
        let (regex, _) = compile_pattern("total (gross) is {n:d}.").unwrap();
        assert!(regex.is_match("total (gross) is 3."));
        assert!(!regex.is_match("total gross is 3x"));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert!(matches!(
            compile_pattern("I {method"),
            Err(StepError::InvalidPattern { .. })
        ));
        assert!(matches!(
            compile_pattern("I {method:q}"),
            Err(StepError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn first_registration_wins_and_args_are_exposed() {
        let mut registry = StepRegistry::new();
        registry.register(r#"I GET "{path}""#, noop).unwrap();
        registry.register(r#"I {method:w} "{path}""#, noop).unwrap();
        assert_eq!(registry.len(), 2);

        let (_, args) = registry.find(r#"  I GET "/api/users?page=2"  "#, None).unwrap();
        assert_eq!(args.get("path").unwrap(), "/api/users?page=2");
        assert!(args.get("method").is_err());
        assert!(matches!(args.table(), Err(StepError::MissingTable)));

        assert!(registry.find("something else", None).is_none());
    }

    #[test]
    fn typed_parse_reports_offending_value() {
        let mut values = HashMap::new();
        values.insert("min".to_string(), "many".to_string());
        let args = StepArgs::new(values, Some("| a | b |"));

        let err = args.parse::<usize>("min").unwrap_err();
        assert!(matches!(
            err,
            StepError::InvalidArgument { ref name, ref value } if name == "min" && value == "many"
        ));
        assert_eq!(args.table().unwrap(), "| a | b |");
    }
}
