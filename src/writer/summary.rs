// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-of-run summary [`Formatter`].

use std::{io, sync::Arc};

use async_trait::async_trait;
use itertools::Itertools as _;

use crate::{
    outcome::{Outcome, OutcomeKind},
    result::{RunResult, Stats},
    snippet::{self, SnippetInterface},
};

use super::{
    out::{Styles, WriteStrExt as _},
    Capabilities, Formatter, FormatterError,
};

/// [`Formatter`] printing problems, counters, duration and snippets for
/// undefined steps once the run is over.
#[derive(Debug)]
pub struct Summary<Out: io::Write = io::Stdout> {
    output: Out,
    styles: Styles,
    snippets: SnippetInterface,
}

impl Summary {
    /// Creates a new [`Summary`] [`Formatter`] writing to `stdout`.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout(), Styles::new())
    }
}

impl<Out: io::Write> Summary<Out> {
    /// Creates a new [`Summary`] [`Formatter`] writing to the given `output`.
    #[must_use]
    pub fn new(output: Out, styles: Styles) -> Self {
        Self { output, styles, snippets: SnippetInterface::default() }
    }

    /// Sets the [`SnippetInterface`] to render snippets with.
    #[must_use]
    pub const fn snippet_interface(mut self, interface: SnippetInterface) -> Self {
        self.snippets = interface;
        self
    }

    /// Returns the output this [`Summary`] writes to.
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    /// Renders the whole summary of the given [`RunResult`].
    #[must_use]
    pub fn render(&self, result: &RunResult) -> String {
        let mut lines = Vec::new();

        let problems = result.problems();
        if !problems.is_empty() {
            lines.push(self.styles.bold("Failures:").into_owned());
            lines.push(String::new());
            for (n, p) in problems.iter().enumerate() {
                let source = p.feature.source.as_deref().unwrap_or("<unknown>");
                lines.push(format!(
                    "{}) {}: {} # {source}:{}",
                    n + 1,
                    p.scenario.keyword,
                    p.scenario.name,
                    p.scenario.position.line,
                ));
                let mark = match p.step.outcome.kind() {
                    OutcomeKind::Failed => "✘",
                    _ => "?",
                };
                lines.push(
                    self.styles
                        .outcome(
                            p.step.outcome.kind(),
                            format!(
                                "   {mark} {} # {source}:{}",
                                p.step.step, p.step.step.position.line,
                            ),
                        )
                        .into_owned(),
                );
                let detail = match &p.step.outcome {
                    Outcome::Failed(e) => e.to_string(),
                    _ => "Undefined. Implement with the snippet below.".into(),
                };
                for line in detail.lines() {
                    lines.push(
                        self.styles
                            .outcome(p.step.outcome.kind(), format!("       {line}"))
                            .into_owned(),
                    );
                }
                lines.push(String::new());
            }
        }

        if result.cancelled {
            lines.push(self.styles.err("Run was cancelled").into_owned());
        }
        lines.push(self.counter("scenario", result.scenario_stats()));
        lines.push(self.counter("step", result.step_stats()));
        lines.push(format!(
            "Finished in {}",
            humantime::format_duration(result.duration),
        ));

        let snippets = snippet::snippets(result);
        if !snippets.is_empty() {
            lines.push(String::new());
            lines.push(
                self.styles
                    .pending(
                        "You can implement missing steps with the snippets \
                         below:",
                    )
                    .into_owned(),
            );
            for s in snippets {
                lines.push(String::new());
                lines.push(self.styles.pending(s.render(self.snippets)).into_owned());
            }
        }

        lines.join("\n")
    }

    /// Formats the `total` of the given [`Stats`] followed by the non-zero
    /// counters, worst first.
    fn counter(&self, item: &str, stats: Stats) -> String {
        let total = stats.total();
        let plural = if total == 1 { "" } else { "s" };
        let counters = [
            OutcomeKind::Failed,
            OutcomeKind::Undefined,
            OutcomeKind::Pending,
            OutcomeKind::Skipped,
            OutcomeKind::Passed,
        ]
        .into_iter()
        .filter(|k| stats.get(*k) > 0)
        .map(|k| self.styles.outcome(k, format!("{} {k}", stats.get(k))))
        .join(", ");
        if counters.is_empty() {
            format!("{total} {item}{plural}")
        } else {
            format!("{total} {item}{plural} ({counters})")
        }
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Formatter for Summary<Out> {
    fn name(&self) -> &str {
        "summary"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FINAL
    }

    async fn publish(
        &mut self,
        result: &Arc<RunResult>,
    ) -> Result<(), FormatterError> {
        let summary = self.render(result);
        self.output.write_line(summary)?;
        self.output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::writer::{fixture, out::WritableString};

    #[test]
    fn prints_counters_and_problems() {
        let mut f = Summary::new(WritableString::default(), Styles::plain());
        block_on(f.publish(&fixture::login())).unwrap();
        let out = &f.output().0;

        assert!(out.starts_with("Failures:\n\n"), "{out}");
        assert!(out.contains(
            "1) Scenario: unknown step # features/login.feature:8\n   \
             ? When I do something weird # features/login.feature:10\n",
        ));
        assert!(out.contains(
            "2) Scenario: broken # features/login.feature:14\n   \
             ✘ Given I am on the login page # features/login.feature:15\n       \
             boom\n",
        ));
        assert!(out.contains("3 scenarios (1 failed, 1 undefined, 1 passed)\n"));
        assert!(out.contains(
            "7 steps (1 failed, 1 undefined, 1 skipped, 4 passed)\n",
        ));
        assert!(out.contains("Finished in 7ms"));
    }

    #[test]
    fn prints_snippets_in_configured_interface() {
        let mut f = Summary::new(WritableString::default(), Styles::plain())
            .snippet_interface(SnippetInterface::Callback);
        block_on(f.publish(&fixture::login())).unwrap();
        let out = &f.output().0;

        assert!(out.contains("You can implement missing steps"));
        assert!(out.contains("oneshot::channel"));
        assert!(out.contains(
            "registry.when(Matcher::expression(\"I do something weird\")?, \
             i_do_something_weird)?;",
        ));
        assert_eq!(out.matches("fn i_do_something_weird").count(), 1);
    }

    #[test]
    fn counts_empty_run() {
        let f = Summary::new(WritableString::default(), Styles::plain());
        let res = RunResult {
            features: vec![],
            duration: std::time::Duration::ZERO,
            cancelled: false,
        };

        assert_eq!(f.render(&res), "0 scenarios\n0 steps\nFinished in 0s");
    }
}
