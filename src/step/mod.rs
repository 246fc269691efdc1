// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step definitions: a [`Registry`] of [`StepFn`]s bound to [`Matcher`]s.

pub mod context;
pub mod error;
pub mod location;
pub mod matcher;
pub mod regex;
pub mod registry;

pub use self::{
    context::{CaptureName, Context},
    error::{
        AmbiguousMatchError, DuplicatePatternError, InvalidPatternError,
        Pending,
    },
    location::Location,
    matcher::{Matcher, MatcherKind},
    regex::HashableRegex,
    registry::{Definition, Match, Registry, StepFn},
};
