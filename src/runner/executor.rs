// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution of a single [`Scenario`].

use std::{
    cell::Cell,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{channel::mpsc, FutureExt as _};

use crate::{
    document::{Feature, Scenario, ScenarioId, Step},
    event::{Event, ScenarioEvent},
    outcome::{coerce_panic, Outcome, StepFailure},
    step::{Context, Pending, Registry},
    World,
};

use super::Cancellation;

/// Executor of [`Scenario`]s, sending [`Event`]s about their progress.
pub(crate) struct Executor<'r, W> {
    /// [`Registry`] to match steps against.
    registry: &'r Registry<W>,

    /// Sender of [`Event`]s.
    sender: mpsc::UnboundedSender<Event>,

    /// External [`Cancellation`] of the run.
    cancellation: Cancellation,

    /// Indicator whether this run has been stopped from inside (by
    /// fail-fast). Unlike the [`Cancellation`], it never outlives the run.
    stopped: Cell<bool>,
}

impl<'r, W: World> Executor<'r, W> {
    /// Creates a new [`Executor`].
    pub(crate) const fn new(
        registry: &'r Registry<W>,
        sender: mpsc::UnboundedSender<Event>,
        cancellation: Cancellation,
    ) -> Self {
        Self { registry, sender, cancellation, stopped: Cell::new(false) }
    }

    /// Stops this run: no new [`Scenario`] is started, and running ones skip
    /// their remaining steps.
    pub(crate) fn stop(&self) {
        self.stopped.set(true);
    }

    /// Indicates whether this run is stopped or externally cancelled.
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.get() || self.cancellation.is_cancelled()
    }

    /// Sends the given [`Event`], ignoring a dropped receiver.
    pub(crate) fn send_event(&self, event: Event) {
        // If the receiver is dropped, nobody is interested in events anymore.
        drop(self.sender.unbounded_send(event));
    }

    /// Runs the given [`Scenario`] to completion, returning its rolled up
    /// [`Outcome`].
    ///
    /// A fresh [`World`] is created for the [`Scenario`], unless it has no
    /// steps at all.
    pub(crate) async fn run_scenario(
        &self,
        id: ScenarioId,
        feature: &Feature,
        scenario: &Scenario,
    ) -> Outcome {
        let started = Instant::now();
        self.send_event(Event::scenario(id, ScenarioEvent::Started));
        tracing::debug!(
            feature = %feature.name,
            scenario = %scenario.name,
            "scenario started",
        );

        let mut outcomes = Vec::with_capacity(scenario.steps.len());
        let mut world = None;
        if !scenario.steps.is_empty() {
            let failure = match AssertUnwindSafe(W::new()).catch_unwind().await {
                Ok(Ok(w)) => {
                    world = Some(w);
                    None
                }
                Ok(Err(e)) => Some(StepFailure::World(e.to_string())),
                Err(e) => Some(StepFailure::World(coerce_panic(&*e))),
            };
            if let Some(failure) = failure {
                tracing::debug!(%id, %failure, "failed to create world");
                let outcome = Outcome::Failed(failure);
                outcomes.push(outcome.clone());
                self.send_event(Event::scenario(
                    id,
                    ScenarioEvent::Step {
                        index: 0,
                        outcome,
                        duration: Duration::ZERO,
                    },
                ));
            }
        }

        let mut halted = false;
        let steps = scenario.steps.iter().enumerate().skip(outcomes.len());
        for (index, step) in steps {
            let (outcome, duration) = match world.as_mut() {
                Some(w) if !halted && !self.is_stopped() => {
                    self.run_step(w, step).await
                }
                Some(_) | None => (Outcome::Skipped, Duration::ZERO),
            };
            tracing::debug!(
                feature = %feature.name,
                scenario = %scenario.name,
                step = %step,
                outcome = %outcome,
                "step finished",
            );
            halted |= outcome.halts();
            outcomes.push(outcome.clone());
            self.send_event(Event::scenario(
                id,
                ScenarioEvent::Step { index, outcome, duration },
            ));
        }

        let outcome = Outcome::worst(&outcomes);
        let duration = started.elapsed();
        tracing::debug!(
            feature = %feature.name,
            scenario = %scenario.name,
            outcome = %outcome,
            "scenario finished",
        );
        self.send_event(Event::scenario(
            id,
            ScenarioEvent::Finished { outcome: outcome.clone(), duration },
        ));
        outcome
    }

    /// Matches and executes a single [`Step`].
    async fn run_step(&self, world: &mut W, step: &Step) -> (Outcome, Duration) {
        let started = Instant::now();

        let matched = match self.registry.find(&step.value) {
            Ok(Some(m)) => m,
            Ok(None) => return (Outcome::Undefined, started.elapsed()),
            Err(e) => {
                let outcome = Outcome::Failed(StepFailure::Ambiguous(e));
                return (outcome, started.elapsed());
            }
        };

        let ctx = Context::new(Arc::new(step.clone()), matched.captures);
        let step_fn = matched.definition.step;
        // Called lazily, so a panic before the first `.await` is caught too.
        let run = async move { step_fn(world, ctx).await };
        let outcome = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err(e)) if e.root_cause().is::<Pending>() => Outcome::Pending,
            Ok(Err(e)) => Outcome::Failed(StepFailure::Execution(format!("{e:#}"))),
            Err(e) => Outcome::Failed(StepFailure::from_panic(&*e)),
        };
        (outcome, started.elapsed())
    }
}
