// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors aborting a run before any [`Scenario`] is executed.
//!
//! Failures of single steps never surface here: they are contained in their
//! [`Scenario`]'s [`Outcome`].
//!
//! [`Outcome`]: crate::Outcome
//! [`Scenario`]: crate::document::Scenario

use derive_more::{Display, Error, From};

use crate::{
    config::ConfigError,
    engine::ExitCode,
    parser,
    step::{DuplicatePatternError, InvalidPatternError},
    tag::TagExpressionError,
};

/// Top-level error of an [`Engine`].
///
/// [`Engine`]: crate::Engine
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Document is malformed.
    #[display("failed to parse document: {_0}")]
    Parse(parser::Error),

    /// Configuration is invalid.
    #[display("invalid configuration: {_0}")]
    Config(ConfigError),

    /// Step pattern is registered twice.
    #[display("{_0}")]
    Duplicate(DuplicatePatternError),

    /// Step pattern cannot be compiled.
    #[display("{_0}")]
    InvalidPattern(InvalidPatternError),

    /// Tag filter is malformed.
    #[display("{_0}")]
    TagExpression(TagExpressionError),
}

impl Error {
    /// Returns the [`ExitCode`] a process aborted with this [`Error`] should
    /// exit with.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Parse(_) => ExitCode::Parse,
            Self::Config(_)
            | Self::Duplicate(_)
            | Self::InvalidPattern(_)
            | Self::TagExpression(_) => ExitCode::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_exit_codes() {
        let parse = parser::parse("Scenario: orphan\n").unwrap_err();
        assert_eq!(Error::from(parse).exit_code(), ExitCode::Parse);
        assert_eq!(i32::from(ExitCode::Parse), 2);

        let config = Error::from(ConfigError::ZeroParallel);
        assert_eq!(config.exit_code(), ExitCode::Config);
        assert_eq!(
            config.to_string(),
            "invalid configuration: `parallel` must be at least 1",
        );

        let tags = "@a or".parse::<crate::TagExpression>().unwrap_err();
        assert_eq!(Error::from(tags).exit_code(), ExitCode::Config);
    }
}
