// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level orchestration of a run.

use std::{fmt::Write as _, process, sync::Arc};

use derive_more::with_trait::{Debug, Display};
use futures::StreamExt as _;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt as _,
    util::SubscriberInitExt as _, Layer as _,
};

use crate::{
    config::Config,
    document::Document,
    error::Error,
    parser,
    result::{Aggregator, RunResult},
    runner::{Cancellation, Runner},
    step::Registry,
    tag::TagExpression,
    world::World,
    writer::{Fanout, Formatter, FormatterWarning},
};

/// Exit status of a run.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ExitCode {
    /// All the [`Scenario`]s have passed.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[display("success")]
    Success,

    /// Some [`Scenario`] hasn't passed.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[display("execution failure")]
    Execution,

    /// Document couldn't be parsed.
    #[display("parse failure")]
    Parse,

    /// Configuration or registration is invalid.
    #[display("configuration error")]
    Config,
}

impl ExitCode {
    /// Indicates whether this is [`ExitCode::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => 0,
            ExitCode::Execution => 1,
            ExitCode::Parse => 2,
            ExitCode::Config => 3,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // Codes are in `0..=3`.
        Self::from(i32::from(code) as u8)
    }
}

/// Outcome of an [`Engine::run()`].
#[derive(Clone, Debug)]
pub struct Report {
    /// Frozen [`RunResult`].
    pub result: Arc<RunResult>,

    /// Failures of the attached [`Formatter`]s.
    pub warnings: Vec<FormatterWarning>,

    /// [`ExitCode`] of the run.
    pub exit_code: ExitCode,
}

impl Report {
    /// Enumerates every failed, ambiguous or undefined step of the run, one
    /// per line.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        let mut out = String::new();
        for p in self.result.problems() {
            _ = writeln!(
                out,
                "{}:{}: {} > {} > {}: {}",
                p.feature.source.as_deref().unwrap_or("<unknown>"),
                p.step.step.position.line,
                p.feature.name,
                p.scenario.name,
                p.step.step,
                p.step.outcome,
            );
        }
        out
    }
}

/// Orchestrator of a run: parses documents, executes them with its
/// [`Runner`] against its [`Registry`], and fans out the [`Event`]s and the
/// [`RunResult`] to its [`Formatter`]s.
///
/// # Example
///
/// ```rust
/// # use futures::{future::LocalBoxFuture, FutureExt as _};
/// # use cucumber_engine::{step::{Context, Matcher, Registry}, Engine};
/// #
/// fn logged_in(_: &mut (), _: Context) -> LocalBoxFuture<'_, anyhow::Result<()>> {
///     async { Ok(()) }.boxed_local()
/// }
///
/// # futures::executor::block_on(async {
/// let mut registry = Registry::<()>::new();
/// _ = registry.given(Matcher::literal("I am logged in"), logged_in).unwrap();
///
/// let report = Engine::new(registry)
///     .run("Feature: F\n  Scenario: S\n    Given I am logged in\n")
///     .await
///     .unwrap();
/// assert!(report.exit_code.is_success());
/// # });
/// ```
///
/// [`Event`]: crate::Event
#[derive(Debug)]
pub struct Engine<W> {
    /// [`Registry`] of step definitions.
    #[debug("{} definitions", registry.len())]
    registry: Registry<W>,

    /// [`Runner`] executing documents.
    runner: Runner,

    /// [`Fanout`] of the attached [`Formatter`]s.
    fanout: Fanout,

    /// Indicator whether pending [`Scenario`]s fail the run.
    ///
    /// [`Scenario`]: crate::document::Scenario
    strict: bool,
}

impl<W: World> Engine<W> {
    /// Creates a new [`Engine`] with a sequential [`Runner`] and no
    /// [`Formatter`]s.
    #[must_use]
    pub fn new(registry: Registry<W>) -> Self {
        Self {
            registry,
            runner: Runner::new(),
            fanout: Fanout::new(),
            strict: false,
        }
    }

    /// Creates a new [`Engine`] configured with the given [`Config`].
    ///
    /// # Errors
    ///
    /// If the [`Config`] is invalid. Unwritable destinations only fail their
    /// own [`Formatter`]s, showing up in [`Report::warnings`].
    pub fn from_config(
        registry: Registry<W>,
        config: &Config,
    ) -> Result<Self, Error> {
        let formatters = config.formatters()?;
        if !config.require.is_empty() || !config.require_module.is_empty() {
            tracing::debug!(
                require = ?config.require,
                require_module = ?config.require_module,
                "step sources are expected to be loaded into the registry",
            );
        }

        let mut engine = Self::new(registry)
            .max_concurrent_scenarios(config.parallel)
            .fail_fast(config.fail_fast)
            .filter(config.tag_expression()?)
            .strict(config.strict);
        for f in formatters {
            _ = engine.fanout.attach_boxed(f);
        }
        Ok(engine)
    }

    /// Replaces the [`Runner`] of this [`Engine`].
    #[must_use]
    pub fn with_runner(mut self, runner: Runner) -> Self {
        self.runner = runner;
        self
    }

    /// Limits the number of concurrently executed [`Scenario`]s.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn max_concurrent_scenarios(mut self, max: usize) -> Self {
        self.runner = self.runner.max_concurrent_scenarios(max);
        self
    }

    /// Makes the run stop after the first non-passed [`Scenario`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.runner = self.runner.fail_fast(fail_fast);
        self
    }

    /// Restricts the run to [`Scenario`]s matching the [`TagExpression`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn filter(mut self, filter: impl Into<Option<TagExpression>>) -> Self {
        self.runner = self.runner.filter(filter);
        self
    }

    /// Makes pending [`Scenario`]s fail the run.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Attaches the given [`Formatter`].
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        _ = self.fanout.attach(formatter);
        self
    }

    /// Initializes a global [`tracing`] subscriber printing `INFO` and more
    /// severe events to `stdout`.
    ///
    /// Does nothing if a global subscriber is installed already.
    #[must_use]
    pub fn init_tracing(self) -> Self {
        let installed = tracing_subscriber::registry()
            .with(LevelFilter::INFO.and_then(fmt::layer()))
            .try_init();
        if installed.is_err() {
            tracing::debug!("global subscriber is installed already");
        }
        self
    }

    /// Returns the [`Registry`] of this [`Engine`].
    #[must_use]
    pub const fn registry(&self) -> &Registry<W> {
        &self.registry
    }

    /// Returns the [`Registry`] of this [`Engine`] for registering more
    /// step definitions.
    pub fn registry_mut(&mut self) -> &mut Registry<W> {
        &mut self.registry
    }

    /// Returns a [`Cancellation`] handle of the run.
    #[must_use]
    pub fn cancellation(&self) -> Cancellation {
        self.runner.cancellation()
    }

    /// Parses the given `text` and runs it.
    ///
    /// # Errors
    ///
    /// If the `text` cannot be parsed. Nothing is executed then.
    pub async fn run(&mut self, text: &str) -> Result<Report, Error> {
        let document = parser::parse(text)?;
        Ok(self.run_document(&document).await)
    }

    /// Parses all the given named sources into a single [`Document`] and runs
    /// it.
    ///
    /// # Errors
    ///
    /// If any of the sources cannot be parsed. Nothing is executed then.
    pub async fn run_sources<S, T>(
        &mut self,
        sources: impl IntoIterator<Item = (S, T)>,
    ) -> Result<Report, Error>
    where
        S: Into<String>,
        T: AsRef<str>,
    {
        let mut document = Document::default();
        for (source, text) in sources {
            document =
                document.extend(parser::parse_source(source, text.as_ref())?);
        }
        Ok(self.run_document(&document).await)
    }

    /// Runs the given [`Document`].
    pub async fn run_document(&mut self, document: &Document) -> Report {
        let selected = self.runner.selected(document);
        let mut aggregator = Aggregator::with_selection(document, &selected);

        let mut events = self.runner.run(document, &self.registry);
        while let Some(ev) = events.next().await {
            aggregator.handle(&ev);
            self.fanout.handle_event(&ev).await;
        }
        drop(events);

        let result = aggregator.finish();
        self.fanout.publish(&result).await;
        let warnings = self.fanout.take_warnings();

        let exit_code = if result.is_success(self.strict) {
            ExitCode::Success
        } else {
            ExitCode::Execution
        };
        tracing::info!(
            %exit_code,
            scenarios = result.scenario_stats().total(),
            problems = result.problems().len(),
            warnings = warnings.len(),
            "report is ready",
        );

        Report { result, warnings, exit_code }
    }
}

#[cfg(test)]
mod tests {
    use futures::{
        executor::block_on, future::LocalBoxFuture, FutureExt as _,
    };

    use super::*;
    use crate::step::{Context, Matcher, Pending};

    fn pass(_: &mut (), _: Context) -> LocalBoxFuture<'_, anyhow::Result<()>> {
        async { Ok(()) }.boxed_local()
    }

    fn pending(
        _: &mut (),
        _: Context,
    ) -> LocalBoxFuture<'_, anyhow::Result<()>> {
        async { Err(Pending.into()) }.boxed_local()
    }

    fn engine() -> Engine<()> {
        let mut registry = Registry::new();
        _ = registry
            .given(Matcher::literal("a passing step"), pass)
            .unwrap()
            .when(Matcher::literal("a pending step"), pending)
            .unwrap();
        Engine::new(registry)
    }

    const PENDING: &str = "\
Feature: F
  Scenario: S
    Given a passing step
    When a pending step
";

    #[test]
    fn pending_fails_only_strict_runs() {
        let lenient = block_on(engine().run(PENDING)).unwrap();
        assert_eq!(lenient.exit_code, ExitCode::Success);

        let strict = block_on(engine().strict(true).run(PENDING)).unwrap();
        assert_eq!(strict.exit_code, ExitCode::Execution);
        assert_eq!(i32::from(strict.exit_code), 1);
    }

    #[test]
    fn parse_errors_abort_before_execution() {
        let err = block_on(engine().run("Given a passing step\n")).unwrap_err();

        assert_eq!(err.exit_code(), ExitCode::Parse);
    }

    #[test]
    fn summarizes_failures() {
        let report = block_on(engine().run_sources([(
            "f.feature",
            "Feature: F\n  Scenario: S\n    Given an unknown step\n",
        )]))
        .unwrap();

        assert_eq!(report.exit_code, ExitCode::Execution);
        assert_eq!(
            report.failure_summary(),
            "f.feature:3: F > S > Given an unknown step: undefined\n",
        );
    }

    #[test]
    fn configures_from_config() {
        let config = Config {
            format: vec![],
            parallel: 2,
            tags: Some("@fast".into()),
            strict: true,
            ..Config::default()
        };

        let engine = Engine::from_config(Registry::<()>::new(), &config).unwrap();

        assert!(engine.strict);
        assert!(engine.runner.tag_filter().is_some());
        assert!(engine.fanout.is_empty());

        let invalid = Config { parallel: 0, ..Config::default() };
        assert_eq!(
            Engine::from_config(Registry::<()>::new(), &invalid)
                .unwrap_err()
                .exit_code(),
            ExitCode::Config,
        );
    }
}
