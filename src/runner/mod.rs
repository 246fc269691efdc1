// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for executing [`Scenario`]s.
//!
//! [`Scenario`]: crate::document::Scenario

pub mod cancellation;
mod executor;

use std::{panic, time::Instant};

use futures::{
    channel::mpsc,
    future,
    stream::{self, FuturesUnordered, LocalBoxStream},
    FutureExt as _, StreamExt as _,
};
use smart_default::SmartDefault;

use crate::{
    document::{Document, ScenarioId},
    event::Event,
    step::Registry,
    tag::TagExpression,
    World,
};

use self::executor::Executor;

#[doc(inline)]
pub use self::cancellation::Cancellation;

/// Executor of a [`Document`] producing a [`Stream`] of [`Event`]s.
///
/// # Order guarantees
///
/// [`Scenario`]s are started in their declaration order. With
/// [`Runner::max_concurrent_scenarios()`] greater than 1, events of
/// different [`Scenario`]s may interleave, but events of a single
/// [`Scenario`] always follow the [happened-before] order, and its steps are
/// always executed sequentially.
///
/// [`Scenario`]: crate::document::Scenario
/// [`Stream`]: futures::Stream
/// [happened-before]: https://en.wikipedia.org/wiki/Happened-before
#[derive(Clone, Debug, SmartDefault)]
pub struct Runner {
    /// Maximum number of concurrently executed [`Scenario`]s.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[default(1)]
    max_concurrent_scenarios: usize,

    /// Indicator whether the run should stop after the first non-passed
    /// [`Scenario`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    fail_fast: bool,

    /// [`TagExpression`] selecting [`Scenario`]s to run.
    ///
    /// [`Scenario`]: crate::document::Scenario
    filter: Option<TagExpression>,

    /// [`Cancellation`] of the run.
    cancellation: Cancellation,
}

impl Runner {
    /// Creates a new sequential [`Runner`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of concurrently executed [`Scenario`]s.
    ///
    /// `0` is treated as `1`.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn max_concurrent_scenarios(mut self, max: usize) -> Self {
        self.max_concurrent_scenarios = max.max(1);
        self
    }

    /// Makes the run stop starting new [`Scenario`]s after the first
    /// non-passed one.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub const fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Restricts the run to the [`Scenario`]s matching the given
    /// [`TagExpression`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn filter(mut self, filter: impl Into<Option<TagExpression>>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Attaches the given [`Cancellation`] to this [`Runner`].
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns a [`Cancellation`] handle of this [`Runner`].
    #[must_use]
    pub fn cancellation(&self) -> Cancellation {
        self.cancellation.clone()
    }

    /// Returns the [`TagExpression`] this [`Runner`] filters [`Scenario`]s
    /// with, if any.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub const fn tag_filter(&self) -> Option<&TagExpression> {
        self.filter.as_ref()
    }

    /// Returns [`ScenarioId`]s of the [`Document`]'s [`Scenario`]s selected
    /// to run, in declaration order.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn selected(&self, document: &Document) -> Vec<ScenarioId> {
        let filter = self.filter.as_ref();
        document
            .scenarios()
            .filter(|(_, _, sc)| filter.map_or(true, |f| f.matches(sc)))
            .map(|(id, ..)| id)
            .collect()
    }

    /// Executes the given [`Document`], matching its steps against the
    /// given [`Registry`].
    ///
    /// The returned [`Stream`] is always started with an [`Event::Started`]
    /// and ended with an [`Event::Finished`].
    ///
    /// [`Stream`]: futures::Stream
    pub fn run<'a, W: World>(
        &'a self,
        document: &'a Document,
        registry: &'a Registry<W>,
    ) -> LocalBoxStream<'a, Event> {
        let (sender, receiver) = mpsc::unbounded();
        let execute = self.execute(document, registry, sender);

        stream::select(
            receiver.map(Some),
            execute.into_stream().map(|()| None),
        )
        .filter_map(future::ready)
        .boxed_local()
    }

    async fn execute<W: World>(
        &self,
        document: &Document,
        registry: &Registry<W>,
        sender: mpsc::UnboundedSender<Event>,
    ) {
        // Panics of steps are reported as failures, so the default hook
        // printing them to stderr is suppressed for the run's duration.
        let hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));

        let started = Instant::now();
        let selected = self.selected(document);
        let steps = selected
            .iter()
            .filter_map(|id| document.scenario(*id))
            .map(|(_, sc)| sc.steps.len())
            .sum::<usize>();
        let executor =
            Executor::new(registry, sender, self.cancellation.clone());

        tracing::info!(scenarios = selected.len(), steps, "run started");
        executor.send_event(Event::Started { scenarios: selected.len(), steps });

        let mut queue = selected.into_iter();
        let mut running = FuturesUnordered::new();
        loop {
            while running.len() < self.max_concurrent_scenarios
                && !executor.is_stopped()
            {
                let Some(id) = queue.next() else { break };
                if let Some((feature, scenario)) = document.scenario(id) {
                    running.push(executor.run_scenario(id, feature, scenario));
                }
            }

            let Some(outcome) = running.next().await else { break };
            if self.fail_fast && !outcome.is_passed() {
                tracing::warn!(%outcome, "stopping the run after a failure");
                executor.stop();
            }
        }

        let cancelled = queue.next().is_some();
        if cancelled {
            tracing::warn!("run has been cancelled");
        }
        let elapsed = started.elapsed();
        tracing::info!(?elapsed, cancelled, "run finished");
        executor.send_event(Event::Finished { cancelled, elapsed });

        panic::set_hook(hook);
    }
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, future::LocalBoxFuture};

    use super::*;
    use crate::{
        event::ScenarioEvent,
        outcome::Outcome,
        parser,
        step::{Context, Matcher},
    };

    #[derive(Default)]
    struct Counter(usize);

    fn inc(w: &mut Counter, _: Context) -> LocalBoxFuture<'_, anyhow::Result<()>> {
        async move {
            w.0 += 1;
            Ok(())
        }
        .boxed_local()
    }

    fn registry() -> Registry<Counter> {
        let mut reg = Registry::new();
        _ = reg.given(Matcher::literal("a step"), inc).unwrap();
        reg
    }

    const FEATURE: &str = "\
Feature: Counting
  @fast
  Scenario: first
    Given a step

  Scenario: second
    Given a step
    And a step
";

    #[test]
    fn defaults_to_sequential() {
        let runner = Runner::new();
        assert_eq!(runner.max_concurrent_scenarios, 1);
        assert_eq!(
            Runner::new().max_concurrent_scenarios(0).max_concurrent_scenarios,
            1,
        );
    }

    #[test]
    fn emits_events_in_order() {
        let doc = parser::parse(FEATURE).unwrap();
        let reg = registry();
        let runner = Runner::new();

        let events = block_on(runner.run(&doc, &reg).collect::<Vec<_>>());

        assert_eq!(events[0], Event::Started { scenarios: 2, steps: 3 });
        assert!(events.last().unwrap().is_finished());
        let finished = events
            .iter()
            .filter_map(|ev| match ev {
                Event::Scenario(id, ScenarioEvent::Finished { outcome, .. }) => {
                    Some((*id, outcome.clone()))
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            finished,
            [
                (ScenarioId::new(0, 0), Outcome::Passed),
                (ScenarioId::new(0, 1), Outcome::Passed),
            ],
        );
    }

    #[test]
    fn filters_by_tags() {
        let doc = parser::parse(FEATURE).unwrap();
        let runner =
            Runner::new().filter("not @fast".parse::<TagExpression>().unwrap());

        assert_eq!(runner.selected(&doc), [ScenarioId::new(0, 1)]);
    }

    #[test]
    fn cancelled_run_starts_nothing() {
        let doc = parser::parse(FEATURE).unwrap();
        let reg = registry();
        let runner = Runner::new();
        runner.cancellation().cancel();

        let events = block_on(runner.run(&doc, &reg).collect::<Vec<_>>());

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::Finished { cancelled: true, .. }));
    }

    #[test]
    fn fail_fast_stops_only_the_current_run() {
        let failing = parser::parse(
            "Feature: F\n  Scenario: a\n    Given nothing\n  \
             Scenario: b\n    Given a step\n",
        )
        .unwrap();
        let passing = parser::parse(FEATURE).unwrap();
        let reg = registry();
        let runner = Runner::new().fail_fast(true);

        let first = block_on(runner.run(&failing, &reg).collect::<Vec<_>>());
        let second = block_on(runner.run(&passing, &reg).collect::<Vec<_>>());

        assert!(matches!(
            first.last(),
            Some(Event::Finished { cancelled: true, .. }),
        ));
        assert!(!runner.cancellation().is_cancelled());
        assert!(matches!(
            second.last(),
            Some(Event::Finished { cancelled: false, .. }),
        ));
        let started = second
            .iter()
            .filter(|ev| matches!(ev, Event::Scenario(_, ScenarioEvent::Started)))
            .count();
        assert_eq!(started, 2);
    }
}
