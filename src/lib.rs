// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Behavior-driven test orchestration engine.
//!
//! A run flows through the following stages:
//! 1. [`parser`] turns plain-text feature documents into a [`Document`].
//! 2. [`step::Registry`] matches every step's text against registered
//!    [`step::Matcher`]s.
//! 3. [`Runner`] executes [`Scenario`]s (concurrently, if allowed), each with
//!    its own fresh [`World`], emitting [`Event`]s.
//! 4. [`result::Aggregator`] folds the [`Event`]s into a frozen
//!    [`RunResult`], reordered into declaration order.
//! 5. [`writer::Fanout`] passes the [`Event`]s and the [`RunResult`] to the
//!    attached [`writer::Formatter`]s, isolating their failures.
//!
//! [`Engine`] wires all of them together.
//!
//! [`Scenario`]: document::Scenario

#![deny(nonstandard_style, trivial_casts, trivial_numeric_casts)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::print_stdout,
    clippy::print_stderr,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod event;
pub mod outcome;
pub mod parser;
pub mod result;
pub mod runner;
pub mod snippet;
pub mod step;
pub mod tag;
pub mod world;
pub mod writer;

#[doc(inline)]
pub use self::{
    config::{Config, Profiles},
    document::{Document, ScenarioId},
    engine::{Engine, ExitCode, Report},
    error::Error,
    event::{Event, ScenarioEvent},
    outcome::{Outcome, OutcomeKind, StepFailure},
    result::{RunResult, Stats},
    runner::{Cancellation, Runner},
    snippet::SnippetInterface,
    tag::TagExpression,
    world::World,
};
