// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Source location of a registered step definition.

use std::panic;

use derive_more::with_trait::Display;

/// Location in Rust sources where a step definition was registered.
///
/// Captured via `#[track_caller]` by the [`Registry`] registration methods.
///
/// [`Registry`]: super::Registry
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{path}:{line}:{column}")]
pub struct Location {
    /// Path to the file.
    pub path: &'static str,

    /// Line in the file.
    pub line: u32,

    /// Column in the file.
    pub column: u32,
}

impl Location {
    /// Creates a new [`Location`].
    #[must_use]
    pub const fn new(path: &'static str, line: u32, column: u32) -> Self {
        Self { path, line, column }
    }

    /// Returns the [`Location`] of the caller of the `#[track_caller]`
    /// function this is invoked in.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let loc = panic::Location::caller();
        Self::new(loc.file(), loc.line(), loc.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_path_line_column() {
        assert_eq!(
            Location::new("tests/steps.rs", 10, 5).to_string(),
            "tests/steps.rs:10:5",
        );
    }

    #[test]
    fn captures_caller() {
        let loc = Location::caller();
        assert!(loc.path.ends_with("location.rs"));
        assert!(loc.line > 0);
    }
}
