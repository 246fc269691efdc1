// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Passing events and results to multiple [`Formatter`]s simultaneously.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use derive_more::with_trait::Debug;
use futures::{future, FutureExt as _};

use crate::{event::Event, outcome::coerce_panic, result::RunResult};

use super::{Formatter, FormatterError, FormatterWarning, Phase};

type Caught = Result<Result<(), FormatterError>, Box<dyn Any + Send>>;

/// Fan-out of [`Event`]s and of the frozen [`RunResult`] to multiple
/// [`Formatter`]s.
///
/// Errors and panics of one [`Formatter`] are caught and collected as
/// [`FormatterWarning`]s, never affecting other [`Formatter`]s. A
/// [`Formatter`] that failed on an [`Event`] is still offered the
/// [`RunResult`].
#[derive(Debug, Default)]
pub struct Fanout {
    /// Attached [`Formatter`]s.
    #[debug("{:?}", formatters.iter().map(|f| f.name()).collect::<Vec<_>>())]
    formatters: Vec<Box<dyn Formatter>>,

    /// Collected [`FormatterWarning`]s.
    warnings: Vec<FormatterWarning>,
}

impl Fanout {
    /// Creates a new [`Fanout`] without any [`Formatter`]s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the given [`Formatter`].
    pub fn attach(&mut self, formatter: impl Formatter + 'static) -> &mut Self {
        self.attach_boxed(Box::new(formatter))
    }

    /// Attaches the given boxed [`Formatter`].
    pub fn attach_boxed(&mut self, formatter: Box<dyn Formatter>) -> &mut Self {
        self.formatters.push(formatter);
        self
    }

    /// Returns the number of attached [`Formatter`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    /// Indicates whether no [`Formatter`] is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }

    /// Returns [`FormatterWarning`]s collected so far.
    #[must_use]
    pub fn warnings(&self) -> &[FormatterWarning] {
        &self.warnings
    }

    /// Takes [`FormatterWarning`]s collected so far.
    pub fn take_warnings(&mut self) -> Vec<FormatterWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Passes the given [`Event`] to every incremental [`Formatter`].
    pub async fn handle_event(&mut self, event: &Event) {
        let results = future::join_all(
            self.formatters
                .iter_mut()
                .filter(|f| f.capabilities().incremental)
                .map(|f| async move {
                    let name = f.name().to_owned();
                    let res = AssertUnwindSafe(f.handle_event(event))
                        .catch_unwind()
                        .await;
                    (name, res)
                }),
        )
        .await;
        self.collect(Phase::Event, results);
    }

    /// Passes the frozen [`RunResult`] to every final-result [`Formatter`]
    /// concurrently.
    pub async fn publish(&mut self, result: &Arc<RunResult>) {
        let results = future::join_all(
            self.formatters
                .iter_mut()
                .filter(|f| f.capabilities().final_result)
                .map(|f| async move {
                    let name = f.name().to_owned();
                    let res = AssertUnwindSafe(f.publish(result))
                        .catch_unwind()
                        .await;
                    (name, res)
                }),
        )
        .await;
        self.collect(Phase::Publish, results);
    }

    fn collect(&mut self, phase: Phase, results: Vec<(String, Caught)>) {
        for (formatter, res) in results {
            let message = match res {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panicked: {}", coerce_panic(&*panic)),
            };
            let warning = FormatterWarning { formatter, phase, message };
            // Failing destination repeats the same error on every `Event`.
            if self.warnings.contains(&warning) {
                continue;
            }
            tracing::warn!(
                formatter = %warning.formatter,
                phase = %warning.phase,
                message = %warning.message,
                "formatter failed",
            );
            self.warnings.push(warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use async_trait::async_trait;
    use futures::executor::block_on;

    use super::*;
    use crate::{result::Aggregator, writer::Capabilities, Document};

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        events: Rc<RefCell<usize>>,
        published: Rc<RefCell<usize>>,
        fail: Option<Phase>,
        panic: bool,
    }

    #[async_trait(?Send)]
    impl Formatter for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::BOTH
        }

        async fn handle_event(&mut self, _: &Event) -> Result<(), FormatterError> {
            *self.events.borrow_mut() += 1;
            if self.fail == Some(Phase::Event) {
                return Err(FormatterError::Other("broken pipe".into()));
            }
            Ok(())
        }

        async fn publish(
            &mut self,
            _: &Arc<RunResult>,
        ) -> Result<(), FormatterError> {
            assert!(!self.panic, "renderer exploded");
            *self.published.borrow_mut() += 1;
            if self.fail == Some(Phase::Publish) {
                return Err(FormatterError::Other("disk full".into()));
            }
            Ok(())
        }
    }

    fn result() -> Arc<RunResult> {
        Aggregator::new(&Document::default()).finish()
    }

    #[test]
    fn isolates_failures() {
        let published = Rc::new(RefCell::new(0));
        let events = Rc::new(RefCell::new(0));
        let mut fanout = Fanout::new();
        _ = fanout
            .attach(Recorder {
                name: "flaky",
                fail: Some(Phase::Event),
                published: published.clone(),
                events: events.clone(),
                ..Recorder::default()
            })
            .attach(Recorder {
                name: "exploding",
                panic: true,
                ..Recorder::default()
            })
            .attach(Recorder {
                name: "healthy",
                published: published.clone(),
                events: events.clone(),
                ..Recorder::default()
            });

        block_on(async {
            fanout
                .handle_event(&Event::Finished {
                    cancelled: false,
                    elapsed: Duration::ZERO,
                })
                .await;
            fanout.publish(&result()).await;
        });

        assert_eq!(*events.borrow(), 2);
        assert_eq!(*published.borrow(), 2);

        let warnings = fanout.take_warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].formatter, "flaky");
        assert_eq!(warnings[0].phase, Phase::Event);
        assert_eq!(warnings[1].formatter, "exploding");
        assert_eq!(warnings[1].phase, Phase::Publish);
        assert!(warnings[1].message.contains("renderer exploded"));
        assert!(fanout.warnings().is_empty());
    }

    #[test]
    fn collects_publish_errors() {
        let mut fanout = Fanout::new();
        _ = fanout.attach(Recorder {
            name: "full",
            fail: Some(Phase::Publish),
            ..Recorder::default()
        });

        block_on(fanout.publish(&result()));

        assert_eq!(
            fanout.warnings()[0].to_string(),
            "formatter `full` failed on publish: disk full",
        );
    }

    #[test]
    fn repeated_failure_is_warned_once() {
        let events = Rc::new(RefCell::new(0));
        let mut fanout = Fanout::new();
        _ = fanout.attach(Recorder {
            name: "flaky",
            fail: Some(Phase::Event),
            events: events.clone(),
            ..Recorder::default()
        });

        block_on(async {
            for _ in 0..3 {
                fanout
                    .handle_event(&Event::Started { scenarios: 1, steps: 1 })
                    .await;
            }
        });

        assert_eq!(*events.borrow(), 3);
        assert_eq!(fanout.warnings().len(), 1);
    }
}
