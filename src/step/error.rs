// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors of registering and matching step definitions.

use std::fmt;

use derive_more::with_trait::{Display, Error};

use super::{location::Location, matcher::Matcher};

/// Error of a step text matching multiple definitions inside a [`Registry`].
///
/// [`Registry`]: super::Registry
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct AmbiguousMatchError {
    /// Text of the step being matched.
    #[error(not(source))]
    pub step: String,

    /// Matching definitions, in registration order.
    #[error(not(source))]
    pub possible_matches: Vec<(Matcher, Option<Location>)>,
}

impl AmbiguousMatchError {
    /// Returns the source patterns of all the matching definitions.
    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.possible_matches.iter().map(|(m, _)| m.source())
    }
}

impl fmt::Display for AmbiguousMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`, possible matches:", self.step)?;
        for (matcher, loc) in &self.possible_matches {
            write!(f, "\n{matcher}")?;
            if let Some(loc) = loc {
                write!(f, " --> {loc}")?;
            }
        }
        Ok(())
    }
}

/// Error of registering a pattern that is already registered.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct DuplicatePatternError {
    /// Pattern being registered.
    #[error(not(source))]
    pub matcher: Matcher,

    /// Location of the already registered definition.
    #[error(not(source))]
    pub existing: Option<Location>,
}

impl fmt::Display for DuplicatePatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate step pattern {}", self.matcher)?;
        if let Some(loc) = &self.existing {
            write!(f, ", first registered at {loc}")?;
        }
        Ok(())
    }
}

/// Error of compiling a step pattern.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
#[display("invalid step pattern `{pattern}`: {reason}")]
pub struct InvalidPatternError {
    /// Source of the pattern.
    #[error(not(source))]
    pub pattern: String,

    /// Reason the pattern doesn't compile.
    #[error(not(source))]
    pub reason: String,
}

/// Marker error a step function returns to report itself as not implemented
/// yet.
///
/// ```rust
/// # use cucumber_engine::step::Pending;
/// #
/// async fn not_yet() -> anyhow::Result<()> {
///     Err(Pending.into())
/// }
/// ```
#[derive(Clone, Copy, Debug, Default, Display, Eq, Error, PartialEq)]
#[display("step is pending")]
pub struct Pending;
