// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Patterns a step text is matched against.

use cucumber_expressions::Expression;
use derive_more::with_trait::Display;
use regex::Regex;

use super::{context::CaptureName, error::InvalidPatternError, HashableRegex};

/// Pattern of a step definition.
///
/// Two [`Matcher`]s are equal when they are of the same kind and have the
/// same source, regardless of how they were compiled.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
pub enum Matcher {
    /// Whole step text must be equal to the given one.
    #[display("\"{_0}\"")]
    Literal(String),

    /// Whole step text must match the given regular expression.
    #[display("/{source}/")]
    Regex {
        /// Pattern as it was written.
        source: String,

        /// Anchored compiled pattern.
        regex: HashableRegex,
    },

    /// Whole step text must match the given [Cucumber Expression][1].
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    #[display("{expression}")]
    Parameterized {
        /// Expression as it was written.
        expression: String,

        /// Compiled pattern.
        regex: HashableRegex,
    },
}

/// Payload-free discriminant of a [`Matcher`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum MatcherKind {
    /// [`Matcher::Literal`].
    #[display("literal")]
    Literal,

    /// [`Matcher::Regex`].
    #[display("regex")]
    Regex,

    /// [`Matcher::Parameterized`].
    #[display("parameterized")]
    Parameterized,
}

impl Matcher {
    /// Creates a [`Matcher::Literal`].
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Compiles a [`Matcher::Regex`], anchoring it to the whole step text.
    ///
    /// # Errors
    ///
    /// If the `pattern` isn't a valid [`Regex`].
    pub fn regex(pattern: &str) -> Result<Self, InvalidPatternError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            InvalidPatternError {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::Regex { source: pattern.to_owned(), regex: regex.into() })
    }

    /// Compiles a [`Matcher::Parameterized`].
    ///
    /// # Errors
    ///
    /// If the `expression` isn't a valid [Cucumber Expression][1].
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    pub fn expression(expression: &str) -> Result<Self, InvalidPatternError> {
        let regex = Expression::regex(expression).map_err(|e| {
            InvalidPatternError {
                pattern: expression.to_owned(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::Parameterized {
            expression: expression.to_owned(),
            regex: regex.into(),
        })
    }

    /// Returns the source of this [`Matcher`] as it was written.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Literal(s)
            | Self::Regex { source: s, .. }
            | Self::Parameterized { expression: s, .. } => s,
        }
    }

    /// Returns the [`MatcherKind`] of this [`Matcher`].
    #[must_use]
    pub const fn kind(&self) -> MatcherKind {
        match self {
            Self::Literal(_) => MatcherKind::Literal,
            Self::Regex { .. } => MatcherKind::Regex,
            Self::Parameterized { .. } => MatcherKind::Parameterized,
        }
    }

    /// Matches the given step `text`, returning its captures if it matches.
    ///
    /// The first capture is always the whole `text`. Internal groups of
    /// [Cucumber Expression][1] parameters are omitted, and quotes around
    /// `{string}` values are stripped.
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    #[must_use]
    pub fn captures(&self, text: &str) -> Option<Vec<(CaptureName, String)>> {
        match self {
            Self::Literal(s) => {
                (s == text).then(|| vec![(None, text.to_owned())])
            }
            Self::Regex { regex, .. } => capture(regex, text, false),
            Self::Parameterized { regex, .. } => capture(regex, text, true),
        }
    }
}

fn capture(
    re: &Regex,
    text: &str,
    unquote: bool,
) -> Option<Vec<(CaptureName, String)>> {
    let caps = re.captures(text)?;
    let mut args = vec![(None, Some(text.to_owned()))];
    // Alternatives of a single parameter (like `{string}`) are compiled into
    // a family of `__<param>_<alt>` groups, only one of which participates.
    let mut family = None;
    for (i, name) in re.capture_names().enumerate().skip(1) {
        let value = caps.get(i).map(|m| m.as_str());
        let Some(internal) = name.and_then(|n| n.strip_prefix("__")) else {
            family = None;
            let value = value.unwrap_or_default();
            let value = if unquote { strip_quotes(value) } else { value };
            args.push((name.map(str::to_owned), Some(value.to_owned())));
            continue;
        };
        let id = internal.split_once('_').map_or(internal, |(id, _)| id);
        if family != Some(id) {
            family = Some(id);
            args.push((None, None));
        }
        if let (Some(v), Some((_, arg))) = (value, args.last_mut()) {
            _ = arg.get_or_insert_with(|| v.to_owned());
        }
    }
    Some(
        args.into_iter()
            .map(|(name, value)| (name, value.unwrap_or_default()))
            .collect(),
    )
}

fn strip_quotes(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|q| value.strip_prefix(q)?.strip_suffix(q))
        .unwrap_or(value)
}
