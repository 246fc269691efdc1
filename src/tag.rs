// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [Tag expressions] for selecting [`Scenario`]s.
//!
//! [Tag expressions]: https://cucumber.io/docs/cucumber/api#tag-expressions

use std::{fmt, iter::Peekable, str::FromStr, vec};

use derive_more::with_trait::{Display, Error};

use crate::document::Scenario;

/// Parsed tag expression, like `@smoke and not (@slow or @wip)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TagExpression {
    /// Single tag, stored without the leading `@`.
    Tag(String),

    /// Negation.
    Not(Box<Self>),

    /// Conjunction.
    And(Box<Self>, Box<Self>),

    /// Disjunction.
    Or(Box<Self>, Box<Self>),
}

impl TagExpression {
    /// Evaluates this [`TagExpression`] for the given `tags` (without the
    /// leading `@`).
    #[must_use]
    pub fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        match self {
            Self::And(l, r) => l.eval(tags.clone()) && r.eval(tags),
            Self::Or(l, r) => l.eval(tags.clone()) || r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Tag(t) => tags.into_iter().any(|tag| tag.as_ref() == t),
        }
    }

    /// Indicates whether the given [`Scenario`] is selected by this
    /// [`TagExpression`].
    ///
    /// [`Feature`] tags are inherited by the [`Scenario`] at parse time, so
    /// only the [`Scenario`]'s own tags are considered.
    ///
    /// [`Feature`]: crate::document::Feature
    #[must_use]
    pub fn matches(&self, scenario: &Scenario) -> bool {
        self.eval(scenario.tags.iter())
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(t) => write!(f, "@{t}"),
            Self::Not(t) => write!(f, "not ({t})"),
            Self::And(l, r) => write!(f, "({l} and {r})"),
            Self::Or(l, r) => write!(f, "({l} or {r})"),
        }
    }
}

/// Error of parsing a [`TagExpression`].
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
#[display("invalid tag expression `{expression}`: {reason}")]
pub struct TagExpressionError {
    /// Expression being parsed.
    #[error(not(source))]
    pub expression: String,

    /// Reason of the failure.
    #[error(not(source))]
    pub reason: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    Not,
    Tag(String),
}

impl FromStr for TagExpression {
    type Err = TagExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: &str| TagExpressionError {
            expression: s.to_owned(),
            reason: reason.to_owned(),
        };

        let mut tokens = Vec::new();
        for word in s.replace('(', " ( ").replace(')', " ) ").split_whitespace()
        {
            tokens.push(match word {
                "(" => Token::Open,
                ")" => Token::Close,
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                tag => match tag.strip_prefix('@') {
                    Some(t) if !t.is_empty() => Token::Tag(t.to_owned()),
                    Some(_) | None => {
                        return Err(err(&format!("unexpected `{tag}`")));
                    }
                },
            });
        }

        let mut tokens = tokens.into_iter().peekable();
        let expr = or(&mut tokens).map_err(|r| err(r))?;
        match tokens.next() {
            None => Ok(expr),
            Some(_) => Err(err("unexpected trailing input")),
        }
    }
}

type Tokens = Peekable<vec::IntoIter<Token>>;

fn or(tokens: &mut Tokens) -> Result<TagExpression, &'static str> {
    let mut left = and(tokens)?;
    while tokens.next_if_eq(&Token::Or).is_some() {
        left = TagExpression::Or(Box::new(left), Box::new(and(tokens)?));
    }
    Ok(left)
}

fn and(tokens: &mut Tokens) -> Result<TagExpression, &'static str> {
    let mut left = not(tokens)?;
    while tokens.next_if_eq(&Token::And).is_some() {
        left = TagExpression::And(Box::new(left), Box::new(not(tokens)?));
    }
    Ok(left)
}

fn not(tokens: &mut Tokens) -> Result<TagExpression, &'static str> {
    if tokens.next_if_eq(&Token::Not).is_some() {
        return Ok(TagExpression::Not(Box::new(not(tokens)?)));
    }
    match tokens.next() {
        Some(Token::Tag(t)) => Ok(TagExpression::Tag(t)),
        Some(Token::Open) => {
            let inner = or(tokens)?;
            tokens
                .next_if_eq(&Token::Close)
                .map(|_| inner)
                .ok_or("unbalanced parentheses")
        }
        Some(Token::Close | Token::And | Token::Or | Token::Not) | None => {
            Err("expected a tag")
        }
    }
}
