// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Outcomes of executed [`Step`]s and [`Scenario`]s.
//!
//! [`Scenario`]: crate::document::Scenario
//! [`Step`]: crate::document::Step

use std::any::Any;

use derive_more::with_trait::{Display, Error, From};

use crate::step::AmbiguousMatchError;

/// Outcome of a [`Step`] or, rolled up, of a [`Scenario`].
///
/// [`Outcome`]s are ranked by their [`Outcome::severity()`]:
/// `Failed > Undefined > Pending > Skipped > Passed`.
///
/// [`Scenario`]: crate::document::Scenario
/// [`Step`]: crate::document::Step
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Outcome {
    /// Executed successfully.
    #[display("passed")]
    Passed,

    /// Executed and failed.
    #[display("failed: {_0}")]
    Failed(StepFailure),

    /// Executor reported the step as not implemented yet.
    #[display("pending")]
    Pending,

    /// Not executed, because of a preceding non-passed step or cancellation.
    #[display("skipped")]
    Skipped,

    /// No step definition matches.
    #[display("undefined")]
    Undefined,
}

impl Outcome {
    /// Returns the severity rank of this [`Outcome`] (higher is worse).
    #[must_use]
    pub const fn severity(&self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Skipped => 1,
            Self::Pending => 2,
            Self::Undefined => 3,
            Self::Failed(_) => 4,
        }
    }

    /// Rolls up the given [`Outcome`]s into the worst one, the first one of
    /// the same [`Outcome::severity()`] winning.
    ///
    /// An empty sequence is [`Outcome::Passed`].
    #[must_use]
    pub fn worst<'o>(outcomes: impl IntoIterator<Item = &'o Self>) -> Self {
        outcomes
            .into_iter()
            .reduce(|w, o| if o.severity() > w.severity() { o } else { w })
            .cloned()
            .unwrap_or(Self::Passed)
    }

    /// Returns the [`OutcomeKind`] of this [`Outcome`].
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Passed => OutcomeKind::Passed,
            Self::Failed(_) => OutcomeKind::Failed,
            Self::Pending => OutcomeKind::Pending,
            Self::Skipped => OutcomeKind::Skipped,
            Self::Undefined => OutcomeKind::Undefined,
        }
    }

    /// Indicates whether this [`Outcome`] is [`Outcome::Passed`].
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Indicates whether this [`Outcome`] stops further execution of its
    /// [`Scenario`].
    ///
    /// [`Scenario`]: crate::document::Scenario
    #[must_use]
    pub const fn halts(&self) -> bool {
        !matches!(self, Self::Passed)
    }
}

/// Payload-free discriminant of an [`Outcome`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum OutcomeKind {
    /// [`Outcome::Passed`].
    #[display("passed")]
    Passed,

    /// [`Outcome::Skipped`].
    #[display("skipped")]
    Skipped,

    /// [`Outcome::Pending`].
    #[display("pending")]
    Pending,

    /// [`Outcome::Undefined`].
    #[display("undefined")]
    Undefined,

    /// [`Outcome::Failed`].
    #[display("failed")]
    Failed,
}

/// Detail of an [`Outcome::Failed`].
#[derive(Clone, Debug, Display, Eq, Error, From, PartialEq)]
pub enum StepFailure {
    /// Step executor returned an error or panicked.
    #[display("{_0}")]
    #[from(ignore)]
    Execution(#[error(not(source))] String),

    /// Step matches several definitions.
    #[display("ambiguous step: {_0}")]
    Ambiguous(AmbiguousMatchError),

    /// Per-scenario state couldn't be created.
    #[display("failed to initialize world: {_0}")]
    #[from(ignore)]
    World(#[error(not(source))] String),
}

impl StepFailure {
    /// Creates a [`StepFailure::Execution`] out of a [`catch_unwind()`]
    /// payload.
    ///
    /// [`catch_unwind()`]: std::panic::catch_unwind()
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send + 'static)) -> Self {
        Self::Execution(coerce_panic(payload))
    }
}

/// Coerces a panic payload into a readable [`String`].
pub(crate) fn coerce_panic(payload: &(dyn Any + Send + 'static)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "(could not resolve panic payload)".to_owned()
    }
}
