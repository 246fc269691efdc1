// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Incremental console [`Formatter`]s.

use std::{io, sync::Arc};

use async_trait::async_trait;

use crate::{
    event::{Event, ScenarioEvent},
    outcome::OutcomeKind,
    result::RunResult,
};

use super::{
    out::{Styles, WriteStrExt as _},
    Capabilities, Formatter, FormatterError,
};

/// [`Formatter`] printing a single character per executed step.
///
/// `.` passed, `F` failed, `U` undefined, `P` pending, `-` skipped.
#[derive(Debug)]
pub struct Progress<Out: io::Write = io::Stdout> {
    output: Out,
    styles: Styles,
}

impl Progress {
    /// Creates a new [`Progress`] [`Formatter`] writing to `stdout`.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout(), Styles::new())
    }
}

impl<Out: io::Write> Progress<Out> {
    /// Creates a new [`Progress`] [`Formatter`] writing to the given
    /// `output`.
    #[must_use]
    pub const fn new(output: Out, styles: Styles) -> Self {
        Self { output, styles }
    }

    /// Returns the output this [`Progress`] writes to.
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    /// Returns the character representing the given [`OutcomeKind`].
    #[must_use]
    pub const fn symbol(kind: OutcomeKind) -> &'static str {
        match kind {
            OutcomeKind::Passed => ".",
            OutcomeKind::Failed => "F",
            OutcomeKind::Undefined => "U",
            OutcomeKind::Pending => "P",
            OutcomeKind::Skipped => "-",
        }
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Formatter for Progress<Out> {
    fn name(&self) -> &str {
        "progress"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::INCREMENTAL
    }

    async fn handle_event(&mut self, ev: &Event) -> Result<(), FormatterError> {
        match ev {
            Event::Scenario(_, ScenarioEvent::Step { outcome, .. }) => {
                let kind = outcome.kind();
                self.output
                    .write_str(self.styles.outcome(kind, Self::symbol(kind)))?;
            }
            Event::Finished { .. } => self.output.write_line("")?,
            Event::Started { .. } | Event::Scenario(..) => {}
        }
        self.output.flush()?;
        Ok(())
    }
}

/// [`Formatter`] drawing a bar of finished [`Scenario`]s.
///
/// When attached to a terminal, the bar is redrawn in place, otherwise
/// every update is written on its own line.
///
/// [`Scenario`]: crate::document::Scenario
#[derive(Debug)]
pub struct ProgressBar<Out: io::Write = io::Stdout> {
    output: Out,
    styles: Styles,
    interactive: bool,
    width: usize,
    total: usize,
    finished: usize,
    failed: usize,
}

impl ProgressBar {
    /// Creates a new [`ProgressBar`] [`Formatter`] writing to `stdout`.
    #[must_use]
    pub fn stdout() -> Self {
        let interactive = console::Term::stdout().is_term();
        Self::new(io::stdout(), Styles::new(), interactive)
    }
}

impl<Out: io::Write> ProgressBar<Out> {
    /// Default width of the bar in characters.
    pub const DEFAULT_WIDTH: usize = 40;

    /// Creates a new [`ProgressBar`] [`Formatter`] writing to the given
    /// `output`.
    ///
    /// Cursor control sequences are written only if `interactive` is set.
    #[must_use]
    pub const fn new(output: Out, styles: Styles, interactive: bool) -> Self {
        Self {
            output,
            styles,
            interactive,
            width: Self::DEFAULT_WIDTH,
            total: 0,
            finished: 0,
            failed: 0,
        }
    }

    /// Sets the width of the bar in characters.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// Returns the output this [`ProgressBar`] writes to.
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    /// Renders the bar for the current state.
    fn bar(&self) -> String {
        let filled = if self.total == 0 {
            self.width
        } else {
            self.finished * self.width / self.total
        };
        let bar = format!(
            "[{}{}] {}/{} scenarios",
            "#".repeat(filled),
            "-".repeat(self.width - filled),
            self.finished,
            self.total,
        );
        if self.failed > 0 {
            self.styles.err(bar).into_owned()
        } else {
            self.styles.ok(bar).into_owned()
        }
    }

    fn redraw(&mut self) -> io::Result<()> {
        let bar = self.bar();
        if self.interactive {
            self.output.clear_line()?;
            self.output.write_str(bar)?;
        } else {
            self.output.write_line(bar)?;
        }
        self.output.flush()
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Formatter for ProgressBar<Out> {
    fn name(&self) -> &str {
        "progress-bar"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::BOTH
    }

    async fn handle_event(&mut self, ev: &Event) -> Result<(), FormatterError> {
        match ev {
            Event::Started { scenarios, .. } => {
                self.total = *scenarios;
                self.finished = 0;
                self.failed = 0;
                self.redraw()?;
            }
            Event::Scenario(_, ScenarioEvent::Finished { outcome, .. }) => {
                self.finished += 1;
                if outcome.kind() == OutcomeKind::Failed {
                    self.failed += 1;
                }
                self.redraw()?;
            }
            Event::Scenario(..) | Event::Finished { .. } => {}
        }
        Ok(())
    }

    async fn publish(
        &mut self,
        result: &Arc<RunResult>,
    ) -> Result<(), FormatterError> {
        if self.interactive {
            self.output.write_line("")?;
        }
        let stats = result.scenario_stats();
        let line = format!(
            "{} of {} scenarios passed in {}",
            stats.passed,
            stats.total(),
            humantime::format_duration(result.duration),
        );
        self.output.write_line(self.styles.bold(line))?;
        self.output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::executor::block_on;

    use super::*;
    use crate::{
        document::ScenarioId,
        outcome::{Outcome, StepFailure},
        writer::out::WritableString,
    };

    fn step(index: usize, outcome: Outcome) -> Event {
        Event::scenario(
            ScenarioId::new(0, 0),
            ScenarioEvent::Step { index, outcome, duration: Duration::ZERO },
        )
    }

    fn finished(outcome: Outcome) -> Event {
        Event::scenario(
            ScenarioId::new(0, 0),
            ScenarioEvent::Finished { outcome, duration: Duration::ZERO },
        )
    }

    #[test]
    fn prints_symbol_per_step() {
        let mut f = Progress::new(WritableString::default(), Styles::plain());
        block_on(async {
            for ev in [
                Event::Started { scenarios: 1, steps: 5 },
                step(0, Outcome::Passed),
                step(1, Outcome::Failed(StepFailure::Execution("x".into()))),
                step(2, Outcome::Undefined),
                step(3, Outcome::Pending),
                step(4, Outcome::Skipped),
                Event::Finished { cancelled: false, elapsed: Duration::ZERO },
            ] {
                f.handle_event(&ev).await.unwrap();
            }
        });

        assert_eq!(f.output().0, ".FUP-\n");
    }

    #[test]
    fn draws_bar_per_finished_scenario() {
        let mut f =
            ProgressBar::new(WritableString::default(), Styles::plain(), false)
                .width(4);
        block_on(async {
            for ev in [
                Event::Started { scenarios: 2, steps: 2 },
                finished(Outcome::Passed),
                finished(Outcome::Undefined),
            ] {
                f.handle_event(&ev).await.unwrap();
            }
        });

        assert_eq!(
            f.output().0,
            "[----] 0/2 scenarios\n\
             [##--] 1/2 scenarios\n\
             [####] 2/2 scenarios\n",
        );
    }

    #[test]
    fn redraws_in_place_when_interactive() {
        let mut f =
            ProgressBar::new(WritableString::default(), Styles::plain(), true)
                .width(2);
        block_on(async {
            f.handle_event(&Event::Started { scenarios: 1, steps: 1 })
                .await
                .unwrap();
            f.handle_event(&finished(Outcome::Passed)).await.unwrap();
        });

        assert_eq!(
            f.output().0,
            "\r\x1b[2K[--] 0/1 scenarios\r\x1b[2K[##] 1/1 scenarios",
        );
    }
}
