// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Context passed to a step function.

use std::{str::FromStr, sync::Arc};

use anyhow::Context as _;

use crate::document::{DocString, Step, Table};

/// Name of a capturing group, if it's a named one.
pub type CaptureName = Option<String>;

/// Context of a step function execution.
#[derive(Clone, Debug)]
pub struct Context {
    /// [`Step`] being executed.
    pub step: Arc<Step>,

    /// Captures of the matched pattern. The first one is always the whole
    /// step text.
    pub matches: Vec<(CaptureName, String)>,
}

impl Context {
    /// Creates a new [`Context`].
    #[must_use]
    pub const fn new(step: Arc<Step>, matches: Vec<(CaptureName, String)>) -> Self {
        Self { step, matches }
    }

    /// Returns captured arguments, without the whole-text match.
    pub fn args(&self) -> impl Iterator<Item = &str> + '_ {
        self.matches.iter().skip(1).map(|(_, v)| v.as_str())
    }

    /// Returns the `n`-th captured argument (0-based), if any.
    #[must_use]
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.matches.get(n + 1).map(|(_, v)| v.as_str())
    }

    /// Returns the value of the named capturing group, if any.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        self.matches
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parses the `n`-th captured argument (0-based).
    ///
    /// # Errors
    ///
    /// If there is no such argument or it fails to parse.
    pub fn parse<T>(&self, n: usize) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw = self
            .arg(n)
            .with_context(|| format!("step has no argument #{n}"))?;
        raw.parse()
            .with_context(|| format!("failed to parse argument #{n}: `{raw}`"))
    }

    /// Returns the doc string argument of the [`Step`], if any.
    #[must_use]
    pub fn docstring(&self) -> Option<&DocString> {
        self.step.docstring()
    }

    /// Returns the table argument of the [`Step`], if any.
    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        self.step.table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Keyword, LineCol, StepType};

    fn context() -> Context {
        let step = Step {
            keyword: Keyword::Given,
            ty: StepType::Given,
            value: "I have 5 cucumbers".into(),
            argument: None,
            background: false,
            position: LineCol::new(1, 1),
        };
        Context::new(
            Arc::new(step),
            vec![
                (None, "I have 5 cucumbers".into()),
                (Some("count".into()), "5".into()),
                (None, "cucumbers".into()),
            ],
        )
    }

    #[test]
    fn exposes_arguments() {
        let ctx = context();
        assert_eq!(ctx.args().collect::<Vec<_>>(), ["5", "cucumbers"]);
        assert_eq!(ctx.arg(1), Some("cucumbers"));
        assert_eq!(ctx.arg(2), None);
        assert_eq!(ctx.named("count"), Some("5"));
        assert_eq!(ctx.named("missing"), None);
    }

    #[test]
    fn parses_arguments() {
        let ctx = context();
        assert_eq!(ctx.parse::<u32>(0).unwrap(), 5);

        let err = ctx.parse::<u32>(1).unwrap_err();
        assert!(err.to_string().contains("`cucumbers`"));
        assert!(ctx.parse::<u32>(5).is_err());
    }
}
