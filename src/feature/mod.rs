//! # Feature files
//!
//! A small reader for the Gherkin subset the harness needs: `Feature:`,
//! `Background:`, `Scenario:`, tag lines, keyword steps and pipe tables that
//! belong to the step above them. A `Scenario Outline:` is expanded into one
//! scenario per `Examples:` row, with `<column>` placeholders filled in.

use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Failed to read feature file `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan feature directory `{}`: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{location}:{line}: {reason}")]
    Syntax {
        location: String,
        line: usize,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKeyword {
    Given,
    When,
    Then,
    And,
    But,
}

impl StepKeyword {
    pub const ALL: [StepKeyword; 5] = [
        StepKeyword::Given,
        StepKeyword::When,
        StepKeyword::Then,
        StepKeyword::And,
        StepKeyword::But,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKeyword::Given => "Given",
            StepKeyword::When => "When",
            StepKeyword::Then => "Then",
            StepKeyword::And => "And",
            StepKeyword::But => "But",
        }
    }
}

impl Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub keyword: StepKeyword,
    pub text: String,
    pub table: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub steps: Vec<Step>,
    pub line: usize,
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim_start_matches('@');
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub path: Option<PathBuf>,
    pub tags: Vec<String>,
    pub scenarios: Vec<Scenario>,
}

enum Section {
    Preamble,
    Description,
    Background,
    Scenario,
    Outline,
    Examples,
}

struct Outline {
    template: Scenario,
    header: Option<Vec<String>>,
    example_tags: Vec<String>,
    expanded: usize,
}

impl Outline {
    fn expand(&self, header: &[String], row: &[String]) -> Scenario {
        let fill = |text: &str| {
            header
                .iter()
                .zip(row)
                .fold(text.to_string(), |text, (column, value)| text.replace(&format!("<{column}>"), value))
        };
        let mut tags = self.template.tags.clone();
        tags.extend(self.example_tags.iter().cloned());
        Scenario {
            name: format!("{} (example {})", fill(&self.template.name), self.expanded + 1),
            tags,
            steps: self
                .template
                .steps
                .iter()
                .map(|step| Step {
                    keyword: step.keyword,
                    text: fill(&step.text),
                    table: step.table.as_deref().map(fill),
                    line: step.line,
                })
                .collect(),
            line: self.template.line,
        }
    }
}

pub fn load(path: &Path) -> Result<Feature, FeatureError> {
    let source = fs::read_to_string(path).map_err(|source| FeatureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut feature = parse_named(&source, &path.display().to_string())?;
    feature.path = Some(path.to_path_buf());
    Ok(feature)
}

/// All `*.feature` files below `dir`, sorted by path.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, FeatureError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|source| FeatureError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "feature") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

pub fn parse(source: &str) -> Result<Feature, FeatureError> {
    parse_named(source, "<inline>")
}

fn parse_named(source: &str, location: &str) -> Result<Feature, FeatureError> {
    let syntax = |line: usize, reason: &str| FeatureError::Syntax {
        location: location.to_string(),
        line,
        reason: reason.to_string(),
    };

    let mut name: Option<String> = None;
    let mut feature_tags = Vec::new();
    let mut pending_tags: Vec<String> = Vec::new();
    let mut background: Vec<Step> = Vec::new();
    let mut scenarios: Vec<Scenario> = Vec::new();
    let mut outline: Option<Outline> = None;
    let mut section = Section::Preamble;
    let close_outline = |outline: Option<Outline>| match outline {
        Some(open) if open.expanded == 0 => Err(syntax(open.template.line, "Scenario Outline has no Examples rows")),
        _ => Ok(()),
    };

    for (index, raw) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('@') {
            pending_tags.extend(line.split_whitespace().map(|tag| tag.trim_start_matches('@').to_string()));
            continue;
        }

        if let Some(rest) = line.strip_prefix("Feature:") {
            if name.is_some() {
                return Err(syntax(line_no, "only one Feature per file"));
            }
            name = Some(rest.trim().to_string());
            feature_tags = std::mem::take(&mut pending_tags);
            section = Section::Description;
            continue;
        }

        if name.is_none() {
            return Err(syntax(line_no, "expected `Feature:`"));
        }

        if line.starts_with("Background:") {
            if !scenarios.is_empty() || outline.is_some() {
                return Err(syntax(line_no, "Background must come before the first Scenario"));
            }
            section = Section::Background;
            continue;
        }

        if let Some(rest) = line
            .strip_prefix("Scenario Outline:")
            .or_else(|| line.strip_prefix("Scenario Template:"))
        {
            close_outline(outline.take())?;
            outline = Some(Outline {
                template: Scenario {
                    name: rest.trim().to_string(),
                    tags: std::mem::take(&mut pending_tags),
                    steps: background.clone(),
                    line: line_no,
                },
                header: None,
                example_tags: Vec::new(),
                expanded: 0,
            });
            section = Section::Outline;
            continue;
        }

        if line.starts_with("Examples:") || line.starts_with("Scenarios:") {
            let open = outline
                .as_mut()
                .ok_or_else(|| syntax(line_no, "Examples outside of a Scenario Outline"))?;
            open.header = None;
            open.example_tags = std::mem::take(&mut pending_tags);
            section = Section::Examples;
            continue;
        }

        if let Some(rest) = line
            .strip_prefix("Scenario:")
            .or_else(|| line.strip_prefix("Example:"))
        {
            close_outline(outline.take())?;
            scenarios.push(Scenario {
                name: rest.trim().to_string(),
                tags: std::mem::take(&mut pending_tags),
                steps: background.clone(),
                line: line_no,
            });
            section = Section::Scenario;
            continue;
        }

        if line.starts_with('|') {
            if let (Section::Examples, Some(open)) = (&section, outline.as_mut()) {
                let row = cells(line);
                let Some(header) = open.header.clone() else {
                    open.header = Some(row);
                    continue;
                };
                if header.len() != row.len() {
                    return Err(syntax(
                        line_no,
                        &format!("example row has {} cells, header has {}", row.len(), header.len()),
                    ));
                }
                scenarios.push(open.expand(&header, &row));
                open.expanded += 1;
                continue;
            }

            let steps = match section {
                Section::Background => &mut background,
                Section::Outline => match outline.as_mut() {
                    Some(open) => &mut open.template.steps,
                    None => return Err(syntax(line_no, "table outside of a scenario")),
                },
                Section::Scenario => match scenarios.last_mut() {
                    Some(scenario) => &mut scenario.steps,
                    None => return Err(syntax(line_no, "table outside of a scenario")),
                },
                _ => return Err(syntax(line_no, "table outside of a scenario")),
            };
            let step = steps
                .last_mut()
                .ok_or_else(|| syntax(line_no, "table without a step"))?;
            let table = step.table.get_or_insert_with(String::new);
            if !table.is_empty() {
                table.push('\n');
            }
            table.push_str(line);
            continue;
        }

        if let Some((keyword, text)) = split_keyword(line) {
            let step = Step {
                keyword,
                text: text.to_string(),
                table: None,
                line: line_no,
            };
            match section {
                Section::Background => background.push(step),
                Section::Scenario => {
                    if let Some(scenario) = scenarios.last_mut() {
                        scenario.steps.push(step);
                    }
                }
                Section::Outline => {
                    if let Some(open) = outline.as_mut() {
                        open.template.steps.push(step);
                    }
                }
                _ => return Err(syntax(line_no, "step outside of a scenario")),
            }
            continue;
        }

        match section {
            // Free text right after `Feature:` is its description.
            Section::Description => continue,
            _ => return Err(syntax(line_no, &format!("unrecognized line `{line}`"))),
        }
    }

    close_outline(outline)?;
    let name = name.ok_or_else(|| syntax(0, "missing `Feature:`"))?;
    Ok(Feature {
        name,
        path: None,
        tags: feature_tags,
        scenarios,
    })
}

fn split_keyword(line: &str) -> Option<(StepKeyword, &str)> {
    StepKeyword::ALL.into_iter().find_map(|keyword| {
        let rest = line.strip_prefix(keyword.as_str())?;
        rest.starts_with(char::is_whitespace)
            .then(|| (keyword, rest.trim()))
    })
}

fn cells(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}
