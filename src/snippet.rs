// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step definition snippets for undefined steps.

use std::{fmt::Write as _, str::FromStr};

use derive_more::with_trait::{Display, Error};
use itertools::Itertools as _;
use lazy_regex::regex;
use serde::{Deserialize, Serialize};

use crate::{
    document::StepType,
    outcome::OutcomeKind,
    result::RunResult,
};

/// Shape of a generated step function body.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SnippetInterface {
    /// `async` block.
    #[default]
    #[display("async-await")]
    AsyncAwait,

    /// Synchronous body wrapped into a ready future.
    #[display("synchronous")]
    Synchronous,

    /// Body completing a `oneshot` channel.
    #[display("callback")]
    Callback,

    /// Chain of future combinators.
    #[display("promise")]
    Promise,
}

/// Error of parsing an unknown [`SnippetInterface`].
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display(
    "unknown snippet interface `{_0}`, expected one of: async-await, \
     synchronous, callback, promise"
)]
pub struct UnknownSnippetInterface(#[error(not(source))] pub String);

impl FromStr for SnippetInterface {
    type Err = UnknownSnippetInterface;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "async-await" => Ok(Self::AsyncAwait),
            "synchronous" => Ok(Self::Synchronous),
            "callback" => Ok(Self::Callback),
            "promise" => Ok(Self::Promise),
            other => Err(UnknownSnippetInterface(other.to_owned())),
        }
    }
}

/// Snippet of a step definition for an undefined step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snippet {
    /// [`StepType`] of the undefined step.
    pub ty: StepType,

    /// [Cucumber Expression][1] matching the undefined step.
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    pub expression: String,

    /// Name of the generated function.
    pub function: String,
}

impl Snippet {
    /// Creates a [`Snippet`] for the given step text.
    #[must_use]
    pub fn new(ty: StepType, text: &str) -> Self {
        let mut expression = String::with_capacity(text.len());
        let mut words = String::with_capacity(text.len());
        let mut last = 0;
        for m in regex!(r#""[^"]*"|'[^']*'|-?\d+(\.\d+)?|[(){}/\\]"#)
            .find_iter(text)
        {
            let literal = &text[last..m.start()];
            expression.push_str(literal);
            words.push_str(literal);
            words.push(' ');
            let token = m.as_str();
            let replacement = match token.chars().next() {
                Some('"' | '\'') => "{string}",
                Some('(' | ')' | '{' | '}' | '/' | '\\') => {
                    expression.push('\\');
                    token
                }
                _ if token.contains('.') => "{float}",
                _ => "{int}",
            };
            expression.push_str(replacement);
            last = m.end();
        }
        expression.push_str(&text[last..]);
        words.push_str(&text[last..]);

        let function = words
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .join("_");
        let function = match function.chars().next() {
            Some(c) if !c.is_ascii_digit() => function,
            Some(_) => format!("step_{function}"),
            None => "step".to_owned(),
        };

        Self { ty, expression, function }
    }

    /// Renders this [`Snippet`] as Rust code with the given
    /// [`SnippetInterface`].
    #[must_use]
    pub fn render(&self, interface: SnippetInterface) -> String {
        let Self { ty, expression, function } = self;
        let method = match ty {
            StepType::Given => "given",
            StepType::When => "when",
            StepType::Then => "then",
        };
        let body = match interface {
            SnippetInterface::AsyncAwait => "\
    async move {
        // Write code here that turns the phrase above into concrete actions
        Err(Pending.into())
    }
    .boxed_local()",
            SnippetInterface::Synchronous => "\
    // Write code here that turns the phrase above into concrete actions
    future::ready(Err(Pending.into())).boxed_local()",
            SnippetInterface::Callback => "\
    let (done, finished) = oneshot::channel::<anyhow::Result<()>>();
    // Write code here that turns the phrase above into concrete actions,
    // calling `done.send()` once finished
    drop(done.send(Err(Pending.into())));
    async move { finished.await? }.boxed_local()",
            SnippetInterface::Promise => "\
    // Write code here that turns the phrase above into concrete actions
    future::ok(())
        .and_then(|()| future::err(Pending.into()))
        .boxed_local()",
        };

        let mut out = String::new();
        _ = writeln!(
            out,
            "fn {function}(\n    \
                 world: &mut World,\n    \
                 ctx: Context,\n\
             ) -> LocalBoxFuture<'_, anyhow::Result<()>> {{\n\
             {body}\n\
             }}\n",
        );
        _ = write!(
            out,
            "registry.{method}(Matcher::expression({expression:?})?, \
             {function})?;",
        );
        out
    }
}

/// Collects [`Snippet`]s for all the undefined steps of the given
/// [`RunResult`], deduplicated by their expressions.
#[must_use]
pub fn snippets(result: &RunResult) -> Vec<Snippet> {
    result
        .scenarios()
        .flat_map(|(_, sc)| &sc.steps)
        .filter(|s| s.outcome.kind() == OutcomeKind::Undefined)
        .map(|s| Snippet::new(s.step.ty, &s.step.value))
        .unique_by(|s| s.expression.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameterizes_numbers_and_strings() {
        let s = Snippet::new(
            StepType::Given,
            r#"I have 5 cucumbers and 1.5 "large" melons"#,
        );

        assert_eq!(
            s.expression,
            "I have {int} cucumbers and {float} {string} melons",
        );
        assert_eq!(s.function, "i_have_cucumbers_and_melons");
    }

    #[test]
    fn escapes_special_characters() {
        let s = Snippet::new(StepType::When, "I open (the) menu/bar");

        assert_eq!(s.expression, r"I open \(the\) menu\/bar");
        assert_eq!(s.function, "i_open_the_menu_bar");
    }

    #[test]
    fn names_numeric_steps() {
        assert_eq!(Snippet::new(StepType::Then, "42").function, "step");
        assert_eq!(Snippet::new(StepType::Then, "3 apples").function, "apples");
    }

    #[test]
    fn renders_interfaces() {
        let s = Snippet::new(StepType::When, "I do something weird");

        let code = s.render(SnippetInterface::AsyncAwait);
        assert!(code.starts_with("fn i_do_something_weird(\n"));
        assert!(code.contains("async move {"));
        assert!(code.ends_with(
            "registry.when(Matcher::expression(\"I do something weird\")?, \
             i_do_something_weird)?;",
        ));

        assert!(s.render(SnippetInterface::Synchronous).contains("future::ready"));
        assert!(s.render(SnippetInterface::Callback).contains("oneshot::channel"));
        assert!(s.render(SnippetInterface::Promise).contains(".and_then("));
    }

    #[test]
    fn parses_interface_names() {
        assert_eq!(
            "async-await".parse::<SnippetInterface>(),
            Ok(SnippetInterface::AsyncAwait),
        );
        assert_eq!(
            SnippetInterface::Callback.to_string().parse(),
            Ok(SnippetInterface::Callback),
        );
        assert!("coroutine".parse::<SnippetInterface>().is_err());
    }
}
