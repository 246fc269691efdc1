// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cooperative cancellation of a run.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cloneable handle cancelling a run.
///
/// Once cancelled, no new [`Scenario`] is started, and already running ones
/// skip their remaining steps after the current one completes.
///
/// [`Scenario`]: crate::document::Scenario
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Creates a new non-cancelled [`Cancellation`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the run this [`Cancellation`] is attached to.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Indicates whether this [`Cancellation`] has been triggered.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let c = Cancellation::new();
        let other = c.clone();
        assert!(!other.is_cancelled());

        c.cancel();
        assert!(other.is_cancelled());
    }
}
