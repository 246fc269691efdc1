// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-memory model of parsed [Gherkin] documents.
//!
//! Everything here is immutable once produced by the [`parser`].
//!
//! [`parser`]: crate::parser
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

use std::fmt;

use derive_more::with_trait::{Deref, Display, From};

/// Position inside a parsed source, 1-based.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[display("{line}:{column}")]
pub struct LineCol {
    /// Line number.
    pub line: usize,

    /// Column number.
    pub column: usize,
}

impl LineCol {
    /// Creates a new [`LineCol`].
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Ordered sequence of [`Feature`]s.
#[derive(Clone, Debug, Default, Deref, Eq, From, PartialEq)]
pub struct Document {
    /// [`Feature`]s in declaration order.
    features: Vec<Feature>,
}

impl Document {
    /// Creates a new [`Document`] out of the given [`Feature`]s.
    #[must_use]
    pub const fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Returns [`Feature`]s of this [`Document`] in declaration order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Appends all the [`Feature`]s of the `other` [`Document`] after the
    /// ones of this [`Document`].
    ///
    /// Used to assemble a single run out of several parsed sources.
    #[must_use]
    pub fn extend(mut self, other: Self) -> Self {
        self.features.extend(other.features);
        self
    }

    /// Returns the [`Scenario`] identified by the given [`ScenarioId`], if
    /// any.
    #[must_use]
    pub fn scenario(&self, id: ScenarioId) -> Option<(&Feature, &Scenario)> {
        let feature = self.features.get(id.feature)?;
        feature.scenarios.get(id.scenario).map(|sc| (feature, sc))
    }

    /// Iterates over all the [`Scenario`]s of this [`Document`] along with
    /// their [`ScenarioId`]s, in declaration order.
    pub fn scenarios(
        &self,
    ) -> impl Iterator<Item = (ScenarioId, &Feature, &Scenario)> + '_ {
        self.features.iter().enumerate().flat_map(|(f_idx, feature)| {
            feature.scenarios.iter().enumerate().map(move |(s_idx, sc)| {
                (ScenarioId::new(f_idx, s_idx), feature, sc)
            })
        })
    }

    /// Returns the total number of [`Scenario`]s in this [`Document`].
    #[must_use]
    pub fn count_scenarios(&self) -> usize {
        self.features.iter().map(|f| f.scenarios.len()).sum()
    }

    /// Returns the total number of [`Step`]s in this [`Document`],
    /// background ones included.
    #[must_use]
    pub fn count_steps(&self) -> usize {
        self.features
            .iter()
            .flat_map(|f| &f.scenarios)
            .map(|sc| sc.steps.len())
            .sum()
    }
}

/// Identifier of a [`Scenario`] inside a [`Document`].
///
/// Made of indices, so ordering by [`ScenarioId`] is the declaration order.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{feature}/{scenario}")]
pub struct ScenarioId {
    /// Index of the [`Feature`] inside its [`Document`].
    pub feature: usize,

    /// Index of the [`Scenario`] inside its [`Feature`].
    pub scenario: usize,
}

impl ScenarioId {
    /// Creates a new [`ScenarioId`].
    #[must_use]
    pub const fn new(feature: usize, scenario: usize) -> Self {
        Self { feature, scenario }
    }
}

/// [Feature] of a [`Document`].
///
/// [Feature]: https://cucumber.io/docs/gherkin/reference#feature
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Feature {
    /// Name of the source this [`Feature`] was parsed from, if any.
    pub source: Option<String>,

    /// Name of this [`Feature`].
    pub name: String,

    /// Free-form description following the `Feature:` line.
    pub description: Option<String>,

    /// Tags of this [`Feature`], without the leading `@`.
    pub tags: Vec<String>,

    /// [`Scenario`]s of this [`Feature`] in declaration order, with
    /// outlines already expanded.
    pub scenarios: Vec<Scenario>,

    /// Position of the `Feature:` keyword.
    pub position: LineCol,
}

/// [Scenario] of a [`Feature`].
///
/// [Scenario]: https://cucumber.io/docs/gherkin/reference#example
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Scenario {
    /// Keyword this [`Scenario`] was declared with, e.g. `Scenario` or
    /// `Scenario Outline`.
    pub keyword: String,

    /// Name of this [`Scenario`].
    pub name: String,

    /// Tags of this [`Scenario`] (inherited [`Feature`] and `Examples` ones
    /// included), without the leading `@`.
    pub tags: Vec<String>,

    /// [`Step`]s to execute, background ones first.
    pub steps: Vec<Step>,

    /// Position of the [`Scenario`] keyword.
    pub position: LineCol,

    /// Position of the `Examples` row this [`Scenario`] was expanded from,
    /// if it's an outline expansion.
    pub example: Option<LineCol>,
}

impl Scenario {
    /// Indicates whether this [`Scenario`] is tagged with the given `tag`
    /// (without the leading `@`).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Keyword a [`Step`] is written with.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Keyword {
    /// `Given`.
    #[display("Given")]
    Given,

    /// `When`.
    #[display("When")]
    When,

    /// `Then`.
    #[display("Then")]
    Then,

    /// `And`.
    #[display("And")]
    And,

    /// `But`.
    #[display("But")]
    But,

    /// `*`.
    #[display("*")]
    Star,
}

/// Resolved type of a [`Step`].
///
/// [`Keyword::And`], [`Keyword::But`] and [`Keyword::Star`] inherit the type
/// of the preceding [`Step`] (or [`StepType::Given`] if there is none).
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum StepType {
    /// [Given] step.
    ///
    /// [Given]: https://cucumber.io/docs/gherkin/reference#given
    Given,

    /// [When] step.
    ///
    /// [When]: https://cucumber.io/docs/gherkin/reference#when
    When,

    /// [Then] step.
    ///
    /// [Then]: https://cucumber.io/docs/gherkin/reference#then
    Then,
}

/// [Step] of a [`Scenario`].
///
/// [Step]: https://cucumber.io/docs/gherkin/reference#steps
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Step {
    /// [`Keyword`] as written.
    pub keyword: Keyword,

    /// Resolved [`StepType`].
    pub ty: StepType,

    /// Literal text following the keyword.
    pub value: String,

    /// Optional multiline argument.
    pub argument: Option<Argument>,

    /// Indicates whether this [`Step`] comes from a `Background`.
    pub background: bool,

    /// Position of the [`Keyword`].
    pub position: LineCol,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.value)
    }
}

impl Step {
    /// Returns the doc string argument of this [`Step`], if any.
    #[must_use]
    pub fn docstring(&self) -> Option<&DocString> {
        match &self.argument {
            Some(Argument::DocString(d)) => Some(d),
            Some(Argument::Table(_)) | None => None,
        }
    }

    /// Returns the table argument of this [`Step`], if any.
    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        match &self.argument {
            Some(Argument::Table(t)) => Some(t),
            Some(Argument::DocString(_)) | None => None,
        }
    }
}

/// Multiline argument of a [`Step`].
#[derive(Clone, Debug, Eq, From, PartialEq)]
pub enum Argument {
    /// [Doc String] argument.
    ///
    /// [Doc String]: https://cucumber.io/docs/gherkin/reference#doc-strings
    DocString(DocString),

    /// [Data Table] argument.
    ///
    /// [Data Table]: https://cucumber.io/docs/gherkin/reference#data-tables
    Table(Table),
}

/// [Doc String] argument of a [`Step`].
///
/// [Doc String]: https://cucumber.io/docs/gherkin/reference#doc-strings
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DocString {
    /// Content type written after the opening fence, if any.
    pub content_type: Option<String>,

    /// Content with the fence indentation stripped.
    pub content: String,
}

/// [Data Table] argument of a [`Step`].
///
/// [Data Table]: https://cucumber.io/docs/gherkin/reference#data-tables
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table {
    /// Rows of cells. Every row has the same number of cells.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Returns the first row of this [`Table`], if any.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Returns all the rows after the first one, each zipped with the header
    /// cells into `(column, value)` pairs.
    pub fn records(
        &self,
    ) -> impl Iterator<Item = Vec<(&str, &str)>> + '_ {
        let header = self.header().unwrap_or_default();
        self.rows.iter().skip(1).map(move |row| {
            header
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect()
        })
    }
}
