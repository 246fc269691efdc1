// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Regex`] wrapper comparable by its source pattern.

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use derive_more::with_trait::{Debug, Deref, Display};
use regex::Regex;

/// [`Regex`] wrapper implementing [`Eq`], [`Ord`] and [`Hash`] by its source
/// pattern.
#[derive(Clone, Debug, Deref, Display)]
pub struct HashableRegex(Regex);

impl HashableRegex {
    /// Creates a new [`HashableRegex`] from a [`Regex`].
    #[must_use]
    pub const fn new(regex: Regex) -> Self {
        Self(regex)
    }

    /// Returns the source pattern of the wrapped [`Regex`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Regex> for HashableRegex {
    fn from(re: Regex) -> Self {
        Self(re)
    }
}

impl Hash for HashableRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_str().hash(state);
    }
}

impl PartialEq for HashableRegex {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Eq for HashableRegex {}

impl PartialOrd for HashableRegex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HashableRegex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_str().cmp(other.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn compares_by_pattern() {
        let a = HashableRegex::new(Regex::new("a+").unwrap());
        let b = HashableRegex::from(Regex::new("a+").unwrap());
        let c = HashableRegex::new(Regex::new("b+").unwrap());

        assert_eq!(a, b);
        assert!(a < c);

        let set = [a, b, c].into_iter().collect::<HashSet<_>>();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn derefs_to_regex() {
        let re = HashableRegex::new(Regex::new(r"^\d+$").unwrap());
        assert!(re.is_match("42"));
        assert_eq!(re.to_string(), r"^\d+$");
    }
}
