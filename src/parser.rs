// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for parsing [Gherkin] documents into a [`Document`].
//!
//! Parsing is a pure function of its input: the same text always yields an
//! equal [`Document`] (or an equal [`Error`]).
//!
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

use std::{fmt, mem};

use derive_more::{Display, Error};
use lazy_regex::regex;

use crate::document::{
    Argument, DocString, Document, Feature, Keyword, LineCol, Scenario, Step,
    StepType, Table,
};

/// Result of parsing a [`Document`].
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the given `text` into a [`Document`].
///
/// # Errors
///
/// If the `text` is not a well-formed document. See [`ErrorKind`] for the
/// possible reasons.
pub fn parse(text: &str) -> Result<Document> {
    Parser::new(None, text).run()
}

/// Parses the given `text` into a [`Document`], remembering the `source` name
/// in every parsed [`Feature`] and in the returned [`Error`].
///
/// # Errors
///
/// If the `text` is not a well-formed document. See [`ErrorKind`] for the
/// possible reasons.
pub fn parse_source(source: impl Into<String>, text: &str) -> Result<Document> {
    Parser::new(Some(source.into()), text).run()
}

/// Error of parsing a [`Document`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Error {
    /// Name of the source being parsed, if known.
    #[error(not(source))]
    pub path: Option<String>,

    /// Position of the malformed construct.
    #[error(not(source))]
    pub position: LineCol,

    /// Kind of this [`Error`].
    #[error(not(source))]
    pub kind: ErrorKind,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{path}:")?;
        }
        write!(f, "{}: {}", self.position, self.kind)
    }
}

/// Possible kinds of a parsing [`Error`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
    /// Doc string is opened but never closed.
    #[display("unterminated doc string, expected closing `{fence}`")]
    UnterminatedDocString {
        /// Fence the doc string was opened with.
        fence: &'static str,
    },

    /// Line doesn't start with a keyword valid at its place.
    #[display("expected a keyword, found `{found}`")]
    MissingKeyword {
        /// Offending line, trimmed.
        found: String,
    },

    /// Table row is malformed.
    #[display("malformed table: {reason}")]
    MalformedTable {
        /// Description of the malformation.
        reason: String,
    },

    /// More than one `Background` in a single [`Feature`].
    #[display("feature already has a background")]
    DuplicateBackground,

    /// `Background` declared after a [`Scenario`].
    #[display("background must precede all scenarios")]
    MisplacedBackground,

    /// `Scenario Outline` without `Examples`.
    #[display("scenario outline `{outline}` has no examples")]
    MissingExamples {
        /// Name of the outline.
        outline: String,
    },

    /// Outline [`Step`] uses a placeholder absent from its `Examples`.
    #[display("unknown placeholder `<{name}>`")]
    UnknownPlaceholder {
        /// Name of the placeholder.
        name: String,
    },

    /// Doc string or table not directly attached to a [`Step`].
    #[display("step argument is not attached to a step")]
    OrphanArgument,

    /// Malformed tag.
    #[display("invalid tag `{tag}`")]
    InvalidTag {
        /// Offending token.
        tag: String,
    },

    /// Tags not followed by anything they may be attached to.
    #[display("tags are not followed by a feature, scenario or examples")]
    DanglingTags,
}

/// Raw `Examples` block of a [`Scenario`] outline.
#[derive(Debug)]
struct RawExamples {
    tags: Vec<String>,
    position: LineCol,
    header: Option<Vec<String>>,
    rows: Vec<(LineCol, Vec<String>)>,
}

/// [`Scenario`] being parsed.
#[derive(Debug)]
struct RawScenario {
    keyword: String,
    name: String,
    tags: Vec<String>,
    position: LineCol,
    steps: Vec<Step>,
    outline: bool,
    examples: Vec<RawExamples>,
}

/// Section of a [`Feature`] the parser currently is in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Section {
    Description,
    Background,
    Scenario,
    Examples,
}

/// Line-oriented [`Document`] parser.
#[derive(Debug)]
struct Parser<'t> {
    path: Option<String>,
    lines: Vec<&'t str>,
    cursor: usize,
    features: Vec<Feature>,
    feature: Option<Feature>,
    background: Option<Vec<Step>>,
    scenario: Option<RawScenario>,
    section: Section,
    tags: Vec<String>,
    tags_position: LineCol,
    step_open: bool,
    previous_ty: StepType,
}

impl<'t> Parser<'t> {
    fn new(path: Option<String>, text: &'t str) -> Self {
        Self {
            path,
            lines: text.lines().collect(),
            cursor: 0,
            features: Vec::new(),
            feature: None,
            background: None,
            scenario: None,
            section: Section::Description,
            tags: Vec::new(),
            tags_position: LineCol::default(),
            step_open: false,
            previous_ty: StepType::Given,
        }
    }

    fn error(&self, position: LineCol, kind: ErrorKind) -> Error {
        Error { path: self.path.clone(), position, kind }
    }

    fn run(mut self) -> Result<Document> {
        while let Some(&line) = self.lines.get(self.cursor) {
            self.cursor += 1;
            self.line(line)?;
        }
        if !self.tags.is_empty() {
            return Err(self.error(self.tags_position, ErrorKind::DanglingTags));
        }
        self.finish_feature()?;
        Ok(Document::new(self.features))
    }

    fn line(&mut self, line: &'t str) -> Result<()> {
        let trimmed = line.trim();
        let indent = line.len() - line.trim_start().len();
        let position = LineCol::new(self.cursor, indent + 1);

        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        if trimmed.starts_with('@') {
            return self.tags_line(trimmed, position);
        }
        if let Some(name) = trimmed.strip_prefix("Feature:") {
            return self.feature_line(name, position);
        }
        if trimmed.starts_with("Background:") {
            return self.background_line(position);
        }
        for (prefix, outline) in [
            ("Scenario Outline:", true),
            ("Scenario Template:", true),
            ("Scenario:", false),
            ("Example:", false),
        ] {
            if let Some(name) = trimmed.strip_prefix(prefix) {
                let keyword = prefix.trim_end_matches(':');
                return self.scenario_line(keyword, name, outline, position);
            }
        }
        if trimmed.starts_with("Examples:") || trimmed.starts_with("Scenarios:")
        {
            return self.examples_line(trimmed, position);
        }
        if let Some((keyword, value)) = step_keyword(trimmed) {
            return self.step_line(keyword, value, position);
        }
        if trimmed.starts_with('|') {
            return self.table_line(trimmed, position);
        }
        for fence in [r#"""""#, "```"] {
            if let Some(content_type) = trimmed.strip_prefix(fence) {
                return self.docstring(fence, content_type, indent, position);
            }
        }

        if self.section == Section::Description && self.scenario.is_none() {
            if let Some(feature) = &mut self.feature {
                let description = feature.description.get_or_insert_with(String::new);
                if !description.is_empty() {
                    description.push('\n');
                }
                description.push_str(trimmed);
                return Ok(());
            }
        }
        if self.accepts_description() {
            return Ok(());
        }

        Err(self.error(
            position,
            ErrorKind::MissingKeyword { found: trimmed.to_owned() },
        ))
    }

    /// Indicates whether free text is a description of the current
    /// `Background`, `Scenario` or `Examples`, which may only precede their
    /// steps or table.
    fn accepts_description(&self) -> bool {
        if !self.tags.is_empty() {
            return false;
        }
        match self.section {
            Section::Description => false,
            Section::Background => {
                self.background.as_ref().is_some_and(Vec::is_empty)
            }
            Section::Scenario => {
                self.scenario.as_ref().is_some_and(|sc| sc.steps.is_empty())
            }
            Section::Examples => self
                .scenario
                .as_ref()
                .and_then(|sc| sc.examples.last())
                .is_some_and(|ex| ex.header.is_none()),
        }
    }

    fn tags_line(&mut self, trimmed: &str, position: LineCol) -> Result<()> {
        if self.tags.is_empty() {
            self.tags_position = position;
        }
        for token in trimmed.split_whitespace() {
            if token.starts_with('#') {
                break;
            }
            if !regex!(r"^@[^@\s]+$").is_match(token) {
                return Err(self.error(
                    position,
                    ErrorKind::InvalidTag { tag: token.to_owned() },
                ));
            }
            self.tags.push(token[1..].to_owned());
        }
        self.step_open = false;
        Ok(())
    }

    fn feature_line(&mut self, name: &str, position: LineCol) -> Result<()> {
        self.finish_feature()?;
        self.feature = Some(Feature {
            source: self.path.clone(),
            name: name.trim().to_owned(),
            description: None,
            tags: mem::take(&mut self.tags),
            scenarios: Vec::new(),
            position,
        });
        self.section = Section::Description;
        self.step_open = false;
        Ok(())
    }

    fn background_line(&mut self, position: LineCol) -> Result<()> {
        let Some(feature) = &self.feature else {
            return Err(self.missing_keyword("Background:", position));
        };
        if !self.tags.is_empty() {
            return Err(self.error(self.tags_position, ErrorKind::DanglingTags));
        }
        if self.background.is_some() {
            return Err(self.error(position, ErrorKind::DuplicateBackground));
        }
        if self.scenario.is_some() || !feature.scenarios.is_empty() {
            return Err(self.error(position, ErrorKind::MisplacedBackground));
        }
        self.background = Some(Vec::new());
        self.section = Section::Background;
        self.previous_ty = StepType::Given;
        self.step_open = false;
        Ok(())
    }

    fn scenario_line(
        &mut self,
        keyword: &str,
        name: &str,
        outline: bool,
        position: LineCol,
    ) -> Result<()> {
        if self.feature.is_none() {
            return Err(self.missing_keyword(keyword, position));
        }
        self.finish_scenario()?;
        self.scenario = Some(RawScenario {
            keyword: keyword.to_owned(),
            name: name.trim().to_owned(),
            tags: mem::take(&mut self.tags),
            position,
            steps: Vec::new(),
            outline,
            examples: Vec::new(),
        });
        self.section = Section::Scenario;
        self.previous_ty = StepType::Given;
        self.step_open = false;
        Ok(())
    }

    fn examples_line(&mut self, trimmed: &str, position: LineCol) -> Result<()> {
        if !matches!(&self.scenario, Some(sc) if sc.outline) {
            return Err(self.missing_keyword(trimmed, position));
        }
        let tags = mem::take(&mut self.tags);
        if let Some(sc) = &mut self.scenario {
            sc.examples.push(RawExamples {
                tags,
                position,
                header: None,
                rows: Vec::new(),
            });
        }
        self.section = Section::Examples;
        self.step_open = false;
        Ok(())
    }

    fn step_line(
        &mut self,
        keyword: Keyword,
        value: &str,
        position: LineCol,
    ) -> Result<()> {
        if !self.tags.is_empty() {
            return Err(self.error(self.tags_position, ErrorKind::DanglingTags));
        }
        let ty = match keyword {
            Keyword::Given => StepType::Given,
            Keyword::When => StepType::When,
            Keyword::Then => StepType::Then,
            Keyword::And | Keyword::But | Keyword::Star => self.previous_ty,
        };
        let step = Step {
            keyword,
            ty,
            value: value.trim().to_owned(),
            argument: None,
            background: self.section == Section::Background,
            position,
        };

        let path = self.path.clone();
        let steps = match self.section {
            Section::Background => self.background.as_mut(),
            Section::Scenario => self.scenario.as_mut().map(|sc| &mut sc.steps),
            Section::Description | Section::Examples => None,
        };
        match steps {
            Some(steps) => steps.push(step),
            None => {
                return Err(Error {
                    path,
                    position,
                    kind: ErrorKind::MissingKeyword { found: step.to_string() },
                });
            }
        }
        self.previous_ty = ty;
        self.step_open = true;
        Ok(())
    }

    /// Returns the last [`Step`] accepting an argument, if any.
    fn open_step(&mut self) -> Option<&mut Step> {
        if !self.step_open {
            return None;
        }
        match self.section {
            Section::Background => self.background.as_mut()?.last_mut(),
            Section::Scenario => self.scenario.as_mut()?.steps.last_mut(),
            Section::Description | Section::Examples => None,
        }
    }

    fn table_line(&mut self, trimmed: &str, position: LineCol) -> Result<()> {
        let cells =
            parse_row(trimmed).map_err(|kind| self.error(position, kind))?;

        if self.section == Section::Examples {
            let path = self.path.clone();
            let Some(examples) =
                self.scenario.as_mut().and_then(|sc| sc.examples.last_mut())
            else {
                return Err(Error {
                    path,
                    position,
                    kind: ErrorKind::OrphanArgument,
                });
            };
            return match &examples.header {
                None => {
                    examples.header = Some(cells);
                    Ok(())
                }
                Some(header) if header.len() == cells.len() => {
                    examples.rows.push((position, cells));
                    Ok(())
                }
                Some(header) => {
                    let kind = width_mismatch(header.len(), cells.len());
                    Err(Error { path, position, kind })
                }
            };
        }

        let path = self.path.clone();
        let Some(step) = self.open_step() else {
            return Err(Error { path, position, kind: ErrorKind::OrphanArgument });
        };
        match &mut step.argument {
            None => {
                step.argument = Some(Argument::Table(Table { rows: vec![cells] }));
                Ok(())
            }
            Some(Argument::Table(table)) => {
                let expected = table.rows.first().map_or(0, Vec::len);
                if expected != cells.len() {
                    let kind = width_mismatch(expected, cells.len());
                    return Err(Error { path, position, kind });
                }
                table.rows.push(cells);
                Ok(())
            }
            Some(Argument::DocString(_)) => {
                Err(Error { path, position, kind: ErrorKind::OrphanArgument })
            }
        }
    }

    fn docstring(
        &mut self,
        fence: &'static str,
        content_type: &str,
        indent: usize,
        position: LineCol,
    ) -> Result<()> {
        let escaped = fence.chars().map(|c| format!("\\{c}")).collect::<String>();
        let mut content = Vec::new();
        let mut closed = false;
        while let Some(&line) = self.lines.get(self.cursor) {
            self.cursor += 1;
            if line.trim() == fence {
                closed = true;
                break;
            }
            content.push(strip_indent(line, indent).replace(&escaped, fence));
        }
        if !closed {
            return Err(self.error(
                position,
                ErrorKind::UnterminatedDocString { fence },
            ));
        }

        let docstring = DocString {
            content_type: Some(content_type.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_owned),
            content: content.join("\n"),
        };
        let path = self.path.clone();
        match self.open_step() {
            Some(step) if step.argument.is_none() => {
                step.argument = Some(Argument::DocString(docstring));
                Ok(())
            }
            Some(_) | None => {
                Err(Error { path, position, kind: ErrorKind::OrphanArgument })
            }
        }
    }

    fn missing_keyword(&self, found: &str, position: LineCol) -> Error {
        self.error(position, ErrorKind::MissingKeyword { found: found.to_owned() })
    }

    fn finish_scenario(&mut self) -> Result<()> {
        let Some(raw) = self.scenario.take() else {
            return Ok(());
        };
        let path = self.path.clone();
        let Some(feature) = &mut self.feature else {
            return Ok(());
        };

        let background = self.background.as_deref().unwrap_or_default();
        let mut tags = feature.tags.clone();
        merge_tags(&mut tags, &raw.tags);

        if !raw.outline {
            feature.scenarios.push(Scenario {
                keyword: raw.keyword,
                name: raw.name,
                tags,
                steps: background.iter().cloned().chain(raw.steps).collect(),
                position: raw.position,
                example: None,
            });
            return Ok(());
        }

        if raw.examples.is_empty() {
            return Err(Error {
                path,
                position: raw.position,
                kind: ErrorKind::MissingExamples { outline: raw.name },
            });
        }
        for examples in &raw.examples {
            let Some(header) = &examples.header else {
                return Err(Error {
                    path,
                    position: examples.position,
                    kind: ErrorKind::MalformedTable {
                        reason: "examples have no header row".into(),
                    },
                });
            };
            for step in &raw.steps {
                if let Some(name) = unknown_placeholder(&step.value, header) {
                    return Err(Error {
                        path,
                        position: step.position,
                        kind: ErrorKind::UnknownPlaceholder { name },
                    });
                }
            }

            let mut tags = tags.clone();
            merge_tags(&mut tags, &examples.tags);
            for (row_position, row) in &examples.rows {
                let values = header
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(String::as_str))
                    .collect::<Vec<_>>();
                feature.scenarios.push(Scenario {
                    keyword: raw.keyword.clone(),
                    name: substitute(&raw.name, &values),
                    tags: tags.clone(),
                    steps: background
                        .iter()
                        .cloned()
                        .chain(raw.steps.iter().map(|s| expand(s, &values)))
                        .collect(),
                    position: raw.position,
                    example: Some(*row_position),
                });
            }
        }
        Ok(())
    }

    fn finish_feature(&mut self) -> Result<()> {
        self.finish_scenario()?;
        self.background = None;
        if let Some(feature) = self.feature.take() {
            self.features.push(feature);
        }
        Ok(())
    }
}

/// Splits a step line into its [`Keyword`] and text.
fn step_keyword(trimmed: &str) -> Option<(Keyword, &str)> {
    [
        ("Given ", Keyword::Given),
        ("When ", Keyword::When),
        ("Then ", Keyword::Then),
        ("And ", Keyword::And),
        ("But ", Keyword::But),
        ("* ", Keyword::Star),
    ]
    .into_iter()
    .find_map(|(prefix, kw)| trimmed.strip_prefix(prefix).map(|v| (kw, v)))
}

/// Parses a single `| a | b |` table row into its unescaped cells.
fn parse_row(trimmed: &str) -> std::result::Result<Vec<String>, ErrorKind> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut closed = false;
    let mut chars = trimmed.chars().skip(1);
    while let Some(ch) = chars.next() {
        closed = false;
        match ch {
            '\\' => match chars.next() {
                Some('|') => cell.push('|'),
                Some('n') => cell.push('\n'),
                Some('\\') => cell.push('\\'),
                Some(other) => {
                    cell.push('\\');
                    cell.push(other);
                }
                None => cell.push('\\'),
            },
            '|' => {
                cells.push(mem::take(&mut cell).trim().to_owned());
                closed = true;
            }
            _ => cell.push(ch),
        }
    }
    if !closed {
        return Err(ErrorKind::MalformedTable {
            reason: "row is not closed with `|`".into(),
        });
    }
    Ok(cells)
}

fn width_mismatch(expected: usize, found: usize) -> ErrorKind {
    ErrorKind::MalformedTable {
        reason: format!("expected {expected} cells, found {found}"),
    }
}

/// Strips up to `indent` leading whitespace characters from `line`.
fn strip_indent(line: &str, indent: usize) -> &str {
    let skip = line
        .char_indices()
        .take(indent)
        .take_while(|(_, c)| c.is_whitespace())
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[skip..]
}

/// Appends `extra` tags to `tags`, skipping already present ones.
fn merge_tags(tags: &mut Vec<String>, extra: &[String]) {
    for tag in extra {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
}

/// Returns the first `<placeholder>` of `text` absent from the `header`.
fn unknown_placeholder(text: &str, header: &[String]) -> Option<String> {
    regex!(r"<([^<>\s]+)>")
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|name| !header.iter().any(|h| h == name))
        .map(str::to_owned)
}

/// Replaces every `<name>` occurrence in `text` with its example value.
///
/// Substituted values are never substituted again.
fn substitute(text: &str, values: &[(&str, &str)]) -> String {
    regex!(r"<([^<>]+)>")
        .replace_all(text, |caps: &regex::Captures<'_>| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_owned(), |(_, v)| (*v).to_owned())
        })
        .into_owned()
}

/// Expands an outline [`Step`] with the given example `values`.
fn expand(step: &Step, values: &[(&str, &str)]) -> Step {
    let argument = step.argument.as_ref().map(|arg| match arg {
        Argument::DocString(d) => Argument::DocString(DocString {
            content_type: d.content_type.clone(),
            content: substitute(&d.content, values),
        }),
        Argument::Table(t) => Argument::Table(Table {
            rows: t
                .rows
                .iter()
                .map(|row| row.iter().map(|c| substitute(c, values)).collect())
                .collect(),
        }),
    });
    Step {
        value: substitute(&step.value, values),
        argument,
        ..step.clone()
    }
}
