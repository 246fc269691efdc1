// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key occurrences in a lifecycle of a run.
//!
//! The top-level enum here is [`Event`]. Events are emitted by a [`Runner`]
//! in the order they happen. Events of different [`Scenario`]s may be
//! interleaved when they run concurrently, but events of a single
//! [`Scenario`] always arrive in order:
//! [`ScenarioEvent::Started`], then one [`ScenarioEvent::Step`] per step in
//! declaration order, then [`ScenarioEvent::Finished`].
//!
//! [`Runner`]: crate::Runner
//! [`Scenario`]: crate::document::Scenario

use std::time::Duration;

use crate::{document::ScenarioId, outcome::Outcome};

/// Top-level event of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// Run has started.
    Started {
        /// Number of [`Scenario`]s selected to run.
        ///
        /// [`Scenario`]: crate::document::Scenario
        scenarios: usize,

        /// Total number of steps of the selected [`Scenario`]s.
        ///
        /// [`Scenario`]: crate::document::Scenario
        steps: usize,
    },

    /// Event of a single [`Scenario`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    Scenario(ScenarioId, ScenarioEvent),

    /// Run has finished.
    Finished {
        /// Indicator whether the run was cancelled before all the selected
        /// [`Scenario`]s have been started.
        ///
        /// [`Scenario`]: crate::document::Scenario
        cancelled: bool,

        /// Wall-clock duration of the whole run.
        elapsed: Duration,
    },
}

/// Event specific to a single [`Scenario`].
///
/// [`Scenario`]: crate::document::Scenario
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScenarioEvent {
    /// [`Scenario`] execution has started.
    ///
    /// [`Scenario`]: crate::document::Scenario
    Started,

    /// Step has been executed or skipped.
    Step {
        /// Index of the step in its [`Scenario`], background steps included.
        ///
        /// [`Scenario`]: crate::document::Scenario
        index: usize,

        /// [`Outcome`] of the step.
        outcome: Outcome,

        /// Time spent executing the step. Zero for steps never executed.
        duration: Duration,
    },

    /// [`Scenario`] execution has finished.
    ///
    /// [`Scenario`]: crate::document::Scenario
    Finished {
        /// Rolled up [`Outcome`] of all the steps.
        outcome: Outcome,

        /// Time spent executing the [`Scenario`].
        duration: Duration,
    },
}

impl Event {
    /// Creates an [`Event::Scenario`].
    #[must_use]
    pub const fn scenario(id: ScenarioId, ev: ScenarioEvent) -> Self {
        Self::Scenario(id, ev)
    }

    /// Indicates whether this [`Event`] is the last one of a run.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}
