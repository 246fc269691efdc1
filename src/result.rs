// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Accumulation of [`Event`]s into a frozen [`RunResult`] tree.

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    document::{Document, LineCol, ScenarioId, Step},
    event::{Event, ScenarioEvent},
    outcome::{Outcome, OutcomeKind},
};

/// Counters of [`Outcome`]s of steps (or [`Scenario`]s).
///
/// [`Scenario`]: crate::document::Scenario
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Number of passed items.
    pub passed: usize,

    /// Number of failed items.
    pub failed: usize,

    /// Number of pending items.
    pub pending: usize,

    /// Number of skipped items.
    pub skipped: usize,

    /// Number of undefined items.
    pub undefined: usize,
}

impl Stats {
    /// Returns total number of items these [`Stats`] have been collected for.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.pending + self.skipped + self.undefined
    }

    /// Counts the given [`Outcome`].
    pub fn record(&mut self, outcome: &Outcome) {
        let counter = match outcome.kind() {
            OutcomeKind::Passed => &mut self.passed,
            OutcomeKind::Failed => &mut self.failed,
            OutcomeKind::Pending => &mut self.pending,
            OutcomeKind::Skipped => &mut self.skipped,
            OutcomeKind::Undefined => &mut self.undefined,
        };
        *counter += 1;
    }

    /// Returns the number of items of the given [`OutcomeKind`].
    #[must_use]
    pub const fn get(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Passed => self.passed,
            OutcomeKind::Failed => self.failed,
            OutcomeKind::Pending => self.pending,
            OutcomeKind::Skipped => self.skipped,
            OutcomeKind::Undefined => self.undefined,
        }
    }
}

/// Frozen result of a whole run.
#[derive(Clone, Debug)]
pub struct RunResult {
    /// Results of [`Feature`]s, in declaration order.
    ///
    /// [`Feature`]: crate::document::Feature
    pub features: Vec<FeatureResult>,

    /// Wall-clock duration of the run.
    pub duration: Duration,

    /// Indicator whether the run was cancelled before all the selected
    /// [`Scenario`]s have been started.
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub cancelled: bool,
}

/// Result of a single [`Feature`].
///
/// [`Feature`]: crate::document::Feature
#[derive(Clone, Debug)]
pub struct FeatureResult {
    /// Name of the [`Feature`].
    ///
    /// [`Feature`]: crate::document::Feature
    pub name: String,

    /// Description of the [`Feature`], if any.
    ///
    /// [`Feature`]: crate::document::Feature
    pub description: Option<String>,

    /// Name of the source the [`Feature`] was parsed from, if any.
    ///
    /// [`Feature`]: crate::document::Feature
    pub source: Option<String>,

    /// Tags of the [`Feature`].
    ///
    /// [`Feature`]: crate::document::Feature
    pub tags: Vec<String>,

    /// Position of the [`Feature`] keyword.
    ///
    /// [`Feature`]: crate::document::Feature
    pub position: LineCol,

    /// Results of the selected [`Scenario`]s, in declaration order.
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub scenarios: Vec<ScenarioResult>,
}

impl FeatureResult {
    /// Returns the sum of durations of all the [`ScenarioResult`]s.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.scenarios.iter().map(|s| s.duration).sum()
    }

    /// Returns the worst [`Outcome`] of all the [`ScenarioResult`]s.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        Outcome::worst(self.scenarios.iter().map(|s| &s.outcome))
    }
}

/// Result of a single [`Scenario`].
///
/// [`Scenario`]: crate::document::Scenario
#[derive(Clone, Debug)]
pub struct ScenarioResult {
    /// ID of the [`Scenario`] in the [`Document`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub id: ScenarioId,

    /// Keyword the [`Scenario`] is declared with.
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub keyword: String,

    /// Name of the [`Scenario`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub name: String,

    /// Tags of the [`Scenario`], inherited ones included.
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub tags: Vec<String>,

    /// Position of the [`Scenario`] keyword, or of its `Examples` row.
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub position: LineCol,

    /// Results of the steps, in declaration order.
    pub steps: Vec<StepResult>,

    /// Rolled up [`Outcome`] of the steps.
    pub outcome: Outcome,

    /// Time spent executing the [`Scenario`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub duration: Duration,

    /// Indicator whether the [`Scenario`] has been started at all.
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub executed: bool,
}

/// Result of a single [`Step`].
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Executed [`Step`].
    pub step: Step,

    /// [`Outcome`] of the [`Step`].
    pub outcome: Outcome,

    /// Time spent executing the [`Step`].
    pub duration: Duration,
}

/// Step which hasn't passed for a reason other than being skipped or
/// pending.
#[derive(Clone, Copy, Debug)]
pub struct Problem<'r> {
    /// [`FeatureResult`] the step belongs to.
    pub feature: &'r FeatureResult,

    /// [`ScenarioResult`] the step belongs to.
    pub scenario: &'r ScenarioResult,

    /// The problematic step.
    pub step: &'r StepResult,
}

impl RunResult {
    /// Iterates over all the [`ScenarioResult`]s along with their
    /// [`FeatureResult`]s.
    pub fn scenarios(
        &self,
    ) -> impl Iterator<Item = (&FeatureResult, &ScenarioResult)> + '_ {
        self.features
            .iter()
            .flat_map(|f| f.scenarios.iter().map(move |s| (f, s)))
    }

    /// Returns [`Stats`] of [`ScenarioResult`]s.
    #[must_use]
    pub fn scenario_stats(&self) -> Stats {
        let mut stats = Stats::default();
        for (_, sc) in self.scenarios() {
            stats.record(&sc.outcome);
        }
        stats
    }

    /// Returns [`Stats`] of [`StepResult`]s.
    #[must_use]
    pub fn step_stats(&self) -> Stats {
        let mut stats = Stats::default();
        for step in self.scenarios().flat_map(|(_, sc)| &sc.steps) {
            stats.record(&step.outcome);
        }
        stats
    }

    /// Returns the worst [`Outcome`] of the whole run.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        Outcome::worst(self.scenarios().map(|(_, sc)| &sc.outcome))
    }

    /// Enumerates every failed (ambiguous included) or undefined step.
    #[must_use]
    pub fn problems(&self) -> Vec<Problem<'_>> {
        self.scenarios()
            .flat_map(|(feature, scenario)| {
                scenario
                    .steps
                    .iter()
                    .filter(|s| {
                        matches!(
                            s.outcome.kind(),
                            OutcomeKind::Failed | OutcomeKind::Undefined,
                        )
                    })
                    .map(move |step| Problem { feature, scenario, step })
            })
            .collect()
    }

    /// Indicates whether the run has succeeded.
    ///
    /// Every [`ScenarioResult`] has to be passed, while pending ones are
    /// tolerated unless `strict` is set.
    #[must_use]
    pub fn is_success(&self, strict: bool) -> bool {
        self.scenarios().all(|(_, sc)| match sc.outcome {
            Outcome::Passed => true,
            Outcome::Pending => !strict,
            Outcome::Failed(_) | Outcome::Skipped | Outcome::Undefined => {
                false
            }
        })
    }
}

/// Single-writer accumulator of [`Event`]s into a [`RunResult`].
///
/// Tolerates [`Event`]s of different [`Scenario`]s arriving interleaved, as
/// every [`StepResult`] is placed by its declared index.
///
/// [`Scenario`]: crate::document::Scenario
#[derive(Clone, Debug)]
pub struct Aggregator {
    features: Vec<FeatureResult>,
    index: HashMap<ScenarioId, (usize, usize)>,
    duration: Duration,
    cancelled: bool,
}

impl Aggregator {
    /// Creates a new [`Aggregator`] expecting all the [`Scenario`]s of the
    /// given [`Document`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn new(document: &Document) -> Self {
        let all = document.scenarios().map(|(id, ..)| id).collect::<Vec<_>>();
        Self::with_selection(document, &all)
    }

    /// Creates a new [`Aggregator`] expecting only the `selected`
    /// [`Scenario`]s of the given [`Document`].
    ///
    /// [`Feature`]s without any selected [`Scenario`] are omitted.
    ///
    /// [`Feature`]: crate::document::Feature
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn with_selection(document: &Document, selected: &[ScenarioId]) -> Self {
        let mut features = Vec::<FeatureResult>::new();
        let mut index = HashMap::new();

        for (id, feature, scenario) in document.scenarios() {
            if !selected.contains(&id) {
                continue;
            }
            let needs_feature = features.last().map_or(true, |f| {
                f.scenarios.first().map(|s| s.id.feature) != Some(id.feature)
            });
            if needs_feature {
                features.push(FeatureResult {
                    name: feature.name.clone(),
                    description: feature.description.clone(),
                    source: feature.source.clone(),
                    tags: feature.tags.clone(),
                    position: feature.position,
                    scenarios: Vec::new(),
                });
            }
            let fi = features.len().saturating_sub(1);
            let Some(f) = features.last_mut() else { continue };
            _ = index.insert(id, (fi, f.scenarios.len()));
            f.scenarios.push(ScenarioResult {
                id,
                keyword: scenario.keyword.clone(),
                name: scenario.name.clone(),
                tags: scenario.tags.clone(),
                position: scenario.example.unwrap_or(scenario.position),
                steps: scenario
                    .steps
                    .iter()
                    .map(|step| StepResult {
                        step: step.clone(),
                        outcome: Outcome::Skipped,
                        duration: Duration::ZERO,
                    })
                    .collect(),
                outcome: Outcome::Skipped,
                duration: Duration::ZERO,
                executed: false,
            });
        }

        Self { features, index, duration: Duration::ZERO, cancelled: false }
    }

    /// Accumulates the given [`Event`].
    ///
    /// [`Event`]s of unknown [`Scenario`]s are ignored.
    ///
    /// [`Scenario`]: crate::document::Scenario
    pub fn handle(&mut self, event: &Event) {
        match event {
            Event::Started { .. } => {}
            Event::Finished { cancelled, elapsed } => {
                self.cancelled = *cancelled;
                self.duration = *elapsed;
            }
            Event::Scenario(id, ev) => {
                let Some(&(f, s)) = self.index.get(id) else {
                    tracing::debug!(%id, "event of an unexpected scenario");
                    return;
                };
                let scenario = &mut self.features[f].scenarios[s];
                match ev {
                    ScenarioEvent::Started => scenario.executed = true,
                    ScenarioEvent::Step { index, outcome, duration } => {
                        if let Some(step) = scenario.steps.get_mut(*index) {
                            step.outcome = outcome.clone();
                            step.duration = *duration;
                        }
                    }
                    ScenarioEvent::Finished { duration, .. } => {
                        scenario.executed = true;
                        scenario.duration = *duration;
                    }
                }
            }
        }
    }

    /// Freezes the accumulated state into a [`RunResult`].
    ///
    /// [`Scenario`]s that have never been started keep all their steps
    /// skipped.
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub fn finish(mut self) -> Arc<RunResult> {
        for sc in self.features.iter_mut().flat_map(|f| &mut f.scenarios) {
            sc.outcome = if sc.executed {
                Outcome::worst(sc.steps.iter().map(|s| &s.outcome))
            } else {
                Outcome::Skipped
            };
        }
        Arc::new(RunResult {
            features: self.features,
            duration: self.duration,
            cancelled: self.cancelled,
        })
    }
}
