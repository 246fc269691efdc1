// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for outputting [`Event`]s and [`RunResult`]s.

pub mod fanout;
pub mod html;
pub mod json;
pub mod out;
pub mod progress;
pub mod summary;

use std::{io, sync::Arc};

use async_trait::async_trait;
use derive_more::with_trait::{Display, Error, From};

use crate::{event::Event, result::RunResult};

#[doc(inline)]
pub use self::{
    fanout::Fanout,
    html::Html,
    json::Json,
    progress::{Progress, ProgressBar},
    summary::Summary,
};

/// What a [`Formatter`] is interested in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    /// Indicator whether the [`Formatter`] wants [`Event`]s as they happen.
    pub incremental: bool,

    /// Indicator whether the [`Formatter`] wants the frozen [`RunResult`].
    pub final_result: bool,
}

impl Capabilities {
    /// [`Capabilities`] of a [`Formatter`] handling [`Event`]s only.
    pub const INCREMENTAL: Self = Self { incremental: true, final_result: false };

    /// [`Capabilities`] of a [`Formatter`] handling the [`RunResult`] only.
    pub const FINAL: Self = Self { incremental: false, final_result: true };

    /// [`Capabilities`] of a [`Formatter`] handling both.
    pub const BOTH: Self = Self { incremental: true, final_result: true };
}

/// Renderer of a run, attached to a [`Fanout`].
#[async_trait(?Send)]
pub trait Formatter {
    /// Returns the name of this [`Formatter`], used to attribute its
    /// [`FormatterWarning`]s.
    fn name(&self) -> &str;

    /// Returns [`Capabilities`] of this [`Formatter`].
    fn capabilities(&self) -> Capabilities;

    /// Handles the given [`Event`] as it happens.
    ///
    /// # Errors
    ///
    /// If the [`Event`] cannot be rendered.
    async fn handle_event(&mut self, _: &Event) -> Result<(), FormatterError> {
        Ok(())
    }

    /// Renders the frozen [`RunResult`].
    ///
    /// # Errors
    ///
    /// If the [`RunResult`] cannot be rendered.
    async fn publish(
        &mut self,
        _: &Arc<RunResult>,
    ) -> Result<(), FormatterError> {
        Ok(())
    }
}

/// Error of a [`Formatter`].
#[derive(Debug, Display, Error, From)]
pub enum FormatterError {
    /// Failed to write the output.
    #[display("failed to write output: {_0}")]
    Io(io::Error),

    /// Failed to serialize the output.
    #[display("failed to serialize output: {_0}")]
    Serialize(serde_json::Error),

    /// Any other failure.
    #[display("{_0}")]
    #[from(ignore)]
    Other(#[error(not(source))] String),
}

/// Phase of a run a [`FormatterWarning`] has occurred in.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Phase {
    /// [`Formatter::handle_event()`].
    #[display("handle_event")]
    Event,

    /// [`Formatter::publish()`].
    #[display("publish")]
    Publish,
}

/// Isolated failure of a single [`Formatter`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display("formatter `{formatter}` failed on {phase}: {message}")]
pub struct FormatterWarning {
    /// [`Formatter::name()`] of the failed [`Formatter`].
    pub formatter: String,

    /// [`Phase`] the failure has occurred in.
    pub phase: Phase,

    /// Description of the failure: an error or a panic message.
    pub message: String,
}
