// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [Cucumber JSON format][1] [`Formatter`] implementation.
//!
//! [1]: https://github.com/cucumber/cucumber-json-schema

use std::{io, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    outcome::{Outcome, StepFailure},
    result::{self, FeatureResult, RunResult, ScenarioResult},
};

use super::{Capabilities, Formatter, FormatterError};

/// [`Formatter`] serializing the [`RunResult`] into the
/// [Cucumber JSON format][1].
///
/// [1]: https://github.com/cucumber/cucumber-json-schema
#[derive(Clone, Debug)]
pub struct Json<Out: io::Write> {
    output: Out,
}

impl<Out: io::Write> Json<Out> {
    /// Creates a new [`Json`] [`Formatter`] writing to the given `output`.
    #[must_use]
    pub const fn new(output: Out) -> Self {
        Self { output }
    }

    /// Returns the output this [`Json`] writes to.
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Formatter for Json<Out> {
    fn name(&self) -> &str {
        "json"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FINAL
    }

    async fn publish(
        &mut self,
        result: &Arc<RunResult>,
    ) -> Result<(), FormatterError> {
        let features = result.features.iter().map(Feature::new).collect::<Vec<_>>();
        serde_json::to_writer_pretty(&mut self.output, &features)?;
        self.output.flush()?;
        Ok(())
    }
}

/// [`FeatureResult`] or [`ScenarioResult`] tag.
#[derive(Clone, Debug, Serialize)]
pub struct Tag {
    /// Tag name with the leading `@`.
    name: String,

    /// Line number of the tagged item.
    line: usize,
}

impl Tag {
    fn many(tags: &[String], line: usize) -> Vec<Self> {
        tags.iter().map(|t| Self { name: format!("@{t}"), line }).collect()
    }
}

/// Step run status.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// [`Outcome::Passed`].
    Passed,

    /// [`Outcome::Failed`] with an execution error.
    Failed,

    /// [`Outcome::Skipped`].
    Skipped,

    /// [`Outcome::Failed`] with [`StepFailure::Ambiguous`].
    Ambiguous,

    /// [`Outcome::Undefined`].
    Undefined,

    /// [`Outcome::Pending`].
    Pending,
}

/// Step run result.
#[derive(Clone, Debug, Serialize)]
pub struct StepResult {
    /// Step [`Status`].
    status: Status,

    /// Step execution time.
    ///
    /// While nowhere to be documented, `cucumber-jvm` uses nanoseconds.
    duration: u128,

    /// Error message.
    ///
    /// Present only if [`Status::Failed`] or [`Status::Ambiguous`].
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

/// Executed step.
#[derive(Clone, Debug, Serialize)]
pub struct Step {
    /// Keyword with trailing whitespace.
    keyword: String,

    /// Line number in the `.feature` file.
    line: usize,

    /// Step text.
    name: String,

    /// Step run result.
    result: StepResult,
}

impl Step {
    fn new(step: &result::StepResult) -> Self {
        let (status, error_message) = match &step.outcome {
            Outcome::Passed => (Status::Passed, None),
            Outcome::Failed(e @ StepFailure::Ambiguous(_)) => {
                (Status::Ambiguous, Some(e.to_string()))
            }
            Outcome::Failed(e) => (Status::Failed, Some(e.to_string())),
            Outcome::Pending => (Status::Pending, None),
            Outcome::Skipped => (Status::Skipped, None),
            Outcome::Undefined => (Status::Undefined, None),
        };
        Self {
            keyword: format!("{} ", step.step.keyword),
            line: step.step.position.line,
            name: step.step.value.clone(),
            result: StepResult {
                status,
                duration: step.duration.as_nanos(),
                error_message,
            },
        }
    }
}

/// Scenario or expanded outline example.
#[derive(Clone, Debug, Serialize)]
pub struct Element {
    /// Keyword with trailing whitespace.
    keyword: String,

    /// Always `scenario`, as background steps are inlined.
    r#type: &'static str,

    /// Identifier, not necessarily unique.
    id: String,

    /// Line number inside the `.feature` file.
    line: usize,

    /// Scenario name.
    name: String,

    /// Scenario tags, inherited ones included.
    tags: Vec<Tag>,

    /// Scenario steps.
    steps: Vec<Step>,
}

impl Element {
    fn new(feature: &FeatureResult, scenario: &ScenarioResult) -> Self {
        Self {
            keyword: format!("{} ", scenario.keyword),
            r#type: "scenario",
            id: format!("{}/{}", slug(&feature.name), slug(&scenario.name)),
            line: scenario.position.line,
            name: scenario.name.clone(),
            tags: Tag::many(&scenario.tags, scenario.position.line),
            steps: scenario.steps.iter().map(Step::new).collect(),
        }
    }
}

/// Feature with its [`Element`]s.
#[derive(Clone, Debug, Serialize)]
pub struct Feature {
    /// Source of the feature, if known.
    uri: Option<String>,

    /// Keyword with trailing whitespace.
    keyword: &'static str,

    /// Identifier, not necessarily unique.
    id: String,

    /// Line number inside the `.feature` file.
    line: usize,

    /// Feature name.
    name: String,

    /// Free-form description.
    description: String,

    /// Feature tags.
    tags: Vec<Tag>,

    /// Feature [`Element`]s.
    elements: Vec<Element>,
}

impl Feature {
    fn new(feature: &FeatureResult) -> Self {
        Self {
            uri: feature.source.clone(),
            keyword: "Feature ",
            id: slug(&feature.name),
            line: feature.position.line,
            name: feature.name.clone(),
            description: feature.description.clone().unwrap_or_default(),
            tags: Tag::many(&feature.tags, feature.position.line),
            elements: feature
                .scenarios
                .iter()
                .map(|sc| Element::new(feature, sc))
                .collect(),
        }
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}
