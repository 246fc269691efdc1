// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Registry`] of step definitions.

use derive_more::with_trait::Debug;
use futures::future::LocalBoxFuture;

use super::{
    context::{CaptureName, Context},
    error::{AmbiguousMatchError, DuplicatePatternError},
    location::Location,
    matcher::Matcher,
};

/// Alias for a step function that returns a [`LocalBoxFuture`].
///
/// Returning an [`Err`] fails the step, unless its root cause is
/// [`Pending`](super::Pending).
pub type StepFn<World> =
    for<'a> fn(&'a mut World, Context) -> LocalBoxFuture<'a, anyhow::Result<()>>;

/// Single registered step definition.
#[derive(Debug)]
pub struct Definition<World> {
    /// Pattern of this [`Definition`].
    pub matcher: Matcher,

    /// Function executing the step.
    #[debug("{step:p}")]
    pub step: StepFn<World>,

    /// Place this [`Definition`] was registered at.
    pub location: Option<Location>,
}

// Implemented manually to omit redundant `World: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<World> Clone for Definition<World> {
    fn clone(&self) -> Self {
        Self {
            matcher: self.matcher.clone(),
            step: self.step,
            location: self.location,
        }
    }
}

/// [`Definition`] matched by a step text, along with the captured arguments.
#[derive(Debug)]
pub struct Match<'r, World> {
    /// Matched [`Definition`].
    pub definition: &'r Definition<World>,

    /// Captures of the step text. The first one is always the whole text.
    pub captures: Vec<(CaptureName, String)>,
}

/// Registry of step definitions, populated before a run and only read during
/// it.
///
/// Matching is keyword-agnostic: a definition registered via
/// [`Registry::given()`] matches a `When` step as well.
#[derive(Debug)]
pub struct Registry<World> {
    definitions: Vec<Definition<World>>,
}

// Implemented manually to omit redundant `World: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<World> Clone for Registry<World> {
    fn clone(&self) -> Self {
        Self { definitions: self.definitions.clone() }
    }
}

// Implemented manually to omit redundant `World: Default` trait bound, imposed
// by `#[derive(Default)]`.
impl<World> Default for Registry<World> {
    fn default() -> Self {
        Self { definitions: Vec::new() }
    }
}

impl<World> Registry<World> {
    /// Creates a new empty [`Registry`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `step` function under the given `matcher`.
    ///
    /// # Errors
    ///
    /// If a [`Matcher`] of the same kind and source is registered already.
    #[track_caller]
    pub fn register(
        &mut self,
        matcher: Matcher,
        step: StepFn<World>,
    ) -> Result<&mut Self, DuplicatePatternError> {
        self.register_at(Some(Location::caller()), matcher, step)
    }

    /// Registers the `step` function under the given `matcher`, recording the
    /// provided [`Location`] instead of the caller's one.
    ///
    /// # Errors
    ///
    /// If a [`Matcher`] of the same kind and source is registered already.
    pub fn register_at(
        &mut self,
        location: Option<Location>,
        matcher: Matcher,
        step: StepFn<World>,
    ) -> Result<&mut Self, DuplicatePatternError> {
        if let Some(existing) =
            self.definitions.iter().find(|d| d.matcher == matcher)
        {
            return Err(DuplicatePatternError {
                matcher,
                existing: existing.location,
            });
        }
        self.definitions.push(Definition { matcher, step, location });
        Ok(self)
    }

    /// Alias for [`Registry::register()`] reading as a [Given] step.
    ///
    /// # Errors
    ///
    /// If a [`Matcher`] of the same kind and source is registered already.
    ///
    /// [Given]: https://cucumber.io/docs/gherkin/reference#given
    #[track_caller]
    pub fn given(
        &mut self,
        matcher: Matcher,
        step: StepFn<World>,
    ) -> Result<&mut Self, DuplicatePatternError> {
        self.register(matcher, step)
    }

    /// Alias for [`Registry::register()`] reading as a [When] step.
    ///
    /// # Errors
    ///
    /// If a [`Matcher`] of the same kind and source is registered already.
    ///
    /// [When]: https://cucumber.io/docs/gherkin/reference#when
    #[track_caller]
    pub fn when(
        &mut self,
        matcher: Matcher,
        step: StepFn<World>,
    ) -> Result<&mut Self, DuplicatePatternError> {
        self.register(matcher, step)
    }

    /// Alias for [`Registry::register()`] reading as a [Then] step.
    ///
    /// # Errors
    ///
    /// If a [`Matcher`] of the same kind and source is registered already.
    ///
    /// [Then]: https://cucumber.io/docs/gherkin/reference#then
    #[track_caller]
    pub fn then(
        &mut self,
        matcher: Matcher,
        step: StepFn<World>,
    ) -> Result<&mut Self, DuplicatePatternError> {
        self.register(matcher, step)
    }

    /// Returns all the registered [`Definition`]s in registration order.
    #[must_use]
    pub fn definitions(&self) -> &[Definition<World>] {
        &self.definitions
    }

    /// Returns the number of registered [`Definition`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Indicates whether this [`Registry`] has no [`Definition`]s.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the [`Definition`] matching the given step `text`, if any.
    ///
    /// # Errors
    ///
    /// If the `text` matches multiple [`Definition`]s.
    pub fn find(
        &self,
        text: &str,
    ) -> Result<Option<Match<'_, World>>, AmbiguousMatchError> {
        let mut found = self
            .definitions
            .iter()
            .filter_map(|d| {
                d.matcher.captures(text).map(|captures| Match {
                    definition: d,
                    captures,
                })
            })
            .collect::<Vec<_>>();

        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            _ => Err(AmbiguousMatchError {
                step: text.to_owned(),
                possible_matches: found
                    .into_iter()
                    .map(|m| (m.definition.matcher.clone(), m.definition.location))
                    .collect(),
            }),
        }
    }
}
