// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-[`Scenario`] user-defined state.
//!
//! [`Scenario`]: crate::document::Scenario

use std::{convert::Infallible, fmt::Display, future::Future};

/// Represents a user-defined state living on per-[`Scenario`] basis.
///
/// A fresh instance is created for every [`Scenario`] right before its first
/// step, and dropped once the [`Scenario`] finishes. Instances are never
/// shared between [`Scenario`]s. State that has to outlive a [`Scenario`]
/// (ex. a connection pool) should be organized outside, via
/// [shared state][1].
///
/// Any [`Default`] type is a [`World`] with an [`Infallible`] constructor.
///
/// [`Scenario`]: crate::document::Scenario
/// [1]: https://doc.rust-lang.org/book/ch16-03-shared-state.html
pub trait World: Sized + 'static {
    /// Error of creating a new [`World`] instance.
    type Error: Display;

    /// Creates a new [`World`] instance.
    fn new() -> impl Future<Output = Result<Self, Self::Error>>;
}

impl<T: Default + 'static> World for T {
    type Error = Infallible;

    async fn new() -> Result<Self, Self::Error> {
        Ok(Self::default())
    }
}
