// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Run configuration, laid out as `cucumber.js` profiles are.
//!
//! ```json
//! {
//!   "default": {
//!     "format": ["progress-bar", "json:reports/run.json"],
//!     "formatOptions": { "snippetInterface": "synchronous" },
//!     "parallel": 4,
//!     "tags": "not @wip"
//!   }
//! }
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    io,
    path::PathBuf,
    str::FromStr,
};

use derive_more::with_trait::{Display, Error, From};
use serde::Deserialize;
use smart_default::SmartDefault;

use crate::{
    snippet::{SnippetInterface, UnknownSnippetInterface},
    tag::{TagExpression, TagExpressionError},
    writer::{
        out::{LazyFile, Styles},
        Formatter, Html, Json, Progress, ProgressBar, Summary,
    },
};

/// Configuration of a single run.
///
/// Unknown keys are ignored on deserialization.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, SmartDefault)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Modules step-source adapters should load before the run.
    pub require_module: Vec<String>,

    /// Files step-source adapters should load step definitions from.
    pub require: Vec<String>,

    /// [`FormatSpec`]s of the [`Formatter`]s to attach.
    #[default(vec!["progress".into()])]
    pub format: Vec<String>,

    /// Options shared by all the [`Formatter`]s.
    pub format_options: FormatOptions,

    /// Suppresses the report publishing banner.
    pub publish_quiet: bool,

    /// Maximum number of concurrently executed scenarios.
    #[default(1)]
    pub parallel: usize,

    /// Stops the run after the first non-passed scenario.
    pub fail_fast: bool,

    /// [`TagExpression`] selecting the scenarios to run.
    pub tags: Option<String>,

    /// Treats pending scenarios as failures.
    pub strict: bool,
}

/// Options shared by all the [`Formatter`]s.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, SmartDefault)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatOptions {
    /// Name of the [`SnippetInterface`] to render snippets with.
    #[default(SnippetInterface::default().to_string())]
    pub snippet_interface: String,

    /// Custom snippet template. Not supported, ignored with a warning.
    pub snippet_syntax: Option<String>,

    /// Forces colored output on or off instead of detecting a terminal.
    pub colors_enabled: Option<bool>,
}

/// Named [`Config`]s.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct Profiles(BTreeMap<String, Config>);

impl Profiles {
    /// Name of the profile used when none is requested.
    pub const DEFAULT: &'static str = "default";

    /// Parses [`Profiles`] out of the given JSON.
    ///
    /// # Errors
    ///
    /// If the JSON is malformed or doesn't describe [`Profiles`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the [`Config`] of the profile with the given `name`.
    ///
    /// # Errors
    ///
    /// If there is no such profile.
    pub fn profile(&self, name: &str) -> Result<&Config, ConfigError> {
        self.0
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_owned()))
    }

    /// Returns names of all the profiles.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }
}

/// Parsed `id[:destination]` formatter identifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormatSpec {
    /// Kind of the [`Formatter`].
    pub kind: FormatKind,

    /// Path to write the output to, `stdout` if [`None`].
    pub destination: Option<PathBuf>,
}

/// Kind of a shipped [`Formatter`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum FormatKind {
    /// [`Progress`].
    #[display("progress")]
    Progress,

    /// [`ProgressBar`].
    #[display("progress-bar")]
    ProgressBar,

    /// [`Summary`].
    #[display("summary")]
    Summary,

    /// [`Html`].
    #[display("html")]
    Html,

    /// [`Json`].
    #[display("json")]
    Json,
}

impl FormatKind {
    /// Indicates whether this [`FormatKind`] can't write to `stdout`.
    #[must_use]
    pub const fn requires_destination(self) -> bool {
        matches!(self, Self::Html | Self::Json)
    }
}

impl FromStr for FormatSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, destination) = match s.split_once(':') {
            Some((id, path)) if !path.is_empty() => (id, Some(path.into())),
            Some((id, _)) => (id, None),
            None => (s, None),
        };
        let kind = match id {
            "progress" => FormatKind::Progress,
            "progress-bar" => FormatKind::ProgressBar,
            "summary" => FormatKind::Summary,
            "html" => FormatKind::Html,
            "json" => FormatKind::Json,
            _ => return Err(ConfigError::UnknownFormatter(s.to_owned())),
        };
        if kind.requires_destination() && destination.is_none() {
            return Err(ConfigError::MissingDestination(kind));
        }
        Ok(Self { kind, destination })
    }
}

impl Config {
    /// Parses a [`Config`] out of the given JSON.
    ///
    /// # Errors
    ///
    /// If the JSON is malformed or doesn't describe a [`Config`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks this [`Config`].
    ///
    /// # Errors
    ///
    /// On the first invalid option. See [`ConfigError`] for the possible
    /// reasons.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel == 0 {
            return Err(ConfigError::ZeroParallel);
        }
        _ = self.snippet_interface()?;
        _ = self.tag_expression()?;
        _ = self.formats()?;
        Ok(())
    }

    /// Parses every [`Config::format`] entry.
    ///
    /// # Errors
    ///
    /// If an entry is unrecognized, lacks a required destination, or two
    /// entries write to the same destination.
    pub fn formats(&self) -> Result<Vec<FormatSpec>, ConfigError> {
        let mut seen = HashSet::new();
        self.format
            .iter()
            .map(|f| {
                let spec = f.parse::<FormatSpec>()?;
                let destination = spec.destination.clone();
                if !seen.insert(destination.clone()) {
                    return Err(ConfigError::DuplicateDestination(
                        destination.map_or_else(
                            || "stdout".to_owned(),
                            |p| p.display().to_string(),
                        ),
                    ));
                }
                Ok(spec)
            })
            .collect()
    }

    /// Parses [`FormatOptions::snippet_interface`].
    ///
    /// # Errors
    ///
    /// If the interface is unknown.
    pub fn snippet_interface(&self) -> Result<SnippetInterface, ConfigError> {
        Ok(self.format_options.snippet_interface.parse::<SnippetInterface>()?)
    }

    /// Parses [`Config::tags`], if any.
    ///
    /// # Errors
    ///
    /// If the [`TagExpression`] is malformed.
    pub fn tag_expression(&self) -> Result<Option<TagExpression>, ConfigError> {
        Ok(self.tags.as_deref().map(str::parse::<TagExpression>).transpose()?)
    }

    /// Creates all the [`Formatter`]s this [`Config`] describes.
    ///
    /// File destinations are opened on the first write, so an unwritable one
    /// fails only its own [`Formatter`].
    ///
    /// # Errors
    ///
    /// If this [`Config`] is invalid.
    pub fn formatters(&self) -> Result<Vec<Box<dyn Formatter>>, ConfigError> {
        self.validate()?;
        if self.format_options.snippet_syntax.is_some() {
            tracing::warn!("`snippetSyntax` is not supported and is ignored");
        }
        let interface = self.snippet_interface()?;
        let colors = self.format_options.colors_enabled;
        let styles = || Styles::new().colored(colors);

        self.formats()?
            .into_iter()
            .map(|spec| {
                let formatter: Box<dyn Formatter> = match spec.destination {
                    None => match spec.kind {
                        FormatKind::Progress => {
                            Box::new(Progress::new(io::stdout(), styles()))
                        }
                        FormatKind::ProgressBar => Box::new(ProgressBar::new(
                            io::stdout(),
                            styles(),
                            console::Term::stdout().is_term(),
                        )),
                        FormatKind::Summary => Box::new(
                            Summary::new(io::stdout(), styles())
                                .snippet_interface(interface),
                        ),
                        FormatKind::Html | FormatKind::Json => {
                            return Err(ConfigError::MissingDestination(
                                spec.kind,
                            ));
                        }
                    },
                    Some(path) => {
                        let file = LazyFile::new(path);
                        let plain = Styles::plain().colored(colors);
                        match spec.kind {
                            FormatKind::Progress => {
                                Box::new(Progress::new(file, plain))
                            }
                            FormatKind::ProgressBar => {
                                Box::new(ProgressBar::new(file, plain, false))
                            }
                            FormatKind::Summary => Box::new(
                                Summary::new(file, plain)
                                    .snippet_interface(interface),
                            ),
                            FormatKind::Html => Box::new(Html::new(file)),
                            FormatKind::Json => Box::new(Json::new(file)),
                        }
                    }
                };
                Ok(formatter)
            })
            .collect()
    }
}

/// Error of an invalid [`Config`].
#[derive(Debug, Display, Error, From)]
pub enum ConfigError {
    /// Configuration is not valid JSON of the expected shape.
    #[display("malformed configuration: {_0}")]
    Malformed(serde_json::Error),

    /// Formatter identifier is not recognized.
    #[display("unknown formatter `{_0}`")]
    #[from(ignore)]
    UnknownFormatter(#[error(not(source))] String),

    /// Formatter requires a destination, but none is given.
    #[display("formatter `{_0}` requires a destination, as in `{_0}:<path>`")]
    #[from(ignore)]
    MissingDestination(#[error(not(source))] FormatKind),

    /// Several formatters write to the same destination.
    #[display("several formatters write to `{_0}`")]
    #[from(ignore)]
    DuplicateDestination(#[error(not(source))] String),

    /// Snippet interface is not recognized.
    #[display("{_0}")]
    SnippetInterface(UnknownSnippetInterface),

    /// Zero scenarios are allowed to run concurrently.
    #[display("`parallel` must be at least 1")]
    ZeroParallel,

    /// Tag expression is malformed.
    #[display("invalid `tags`: {_0}")]
    Tags(TagExpressionError),

    /// Requested profile doesn't exist.
    #[display("unknown profile `{_0}`")]
    #[from(ignore)]
    UnknownProfile(#[error(not(source))] String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_ignoring_unknown_keys() {
        let cfg = Config::from_json(
            r#"{
                "requireModule": ["ts-node/register"],
                "require": ["steps/**/*.rs"],
                "format": ["summary", "json:out/report.json"],
                "formatOptions": {
                    "snippetInterface": "promise",
                    "colorsEnabled": false
                },
                "publishQuiet": true,
                "parallel": 3,
                "failFast": true,
                "tags": "@smoke and not @wip",
                "strict": true,
                "retry": 2
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.require_module, ["ts-node/register"]);
        assert_eq!(cfg.parallel, 3);
        assert!(cfg.fail_fast && cfg.strict && cfg.publish_quiet);
        assert_eq!(cfg.snippet_interface().unwrap(), SnippetInterface::Promise);
        assert_eq!(cfg.format_options.colors_enabled, Some(false));
        assert!(cfg.tag_expression().unwrap().is_some());
        cfg.validate().unwrap();
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();

        assert_eq!(cfg.parallel, 1);
        assert_eq!(cfg.format, ["progress"]);
        assert_eq!(cfg.snippet_interface().unwrap(), SnippetInterface::AsyncAwait);
        assert_eq!(Config::from_json("{}").unwrap(), cfg);
        cfg.validate().unwrap();
    }

    #[test]
    fn parses_format_specs() {
        assert_eq!(
            "html:report.html".parse::<FormatSpec>().unwrap(),
            FormatSpec {
                kind: FormatKind::Html,
                destination: Some("report.html".into()),
            },
        );
        assert_eq!(
            "progress-bar".parse::<FormatSpec>().unwrap(),
            FormatSpec { kind: FormatKind::ProgressBar, destination: None },
        );
        assert!(matches!(
            "junit".parse::<FormatSpec>(),
            Err(ConfigError::UnknownFormatter(id)) if id == "junit",
        ));
        assert!(matches!(
            "json".parse::<FormatSpec>(),
            Err(ConfigError::MissingDestination(FormatKind::Json)),
        ));
    }

    #[test]
    fn rejects_invalid_options() {
        let invalid = |cfg: Config| cfg.validate().unwrap_err().to_string();

        assert_eq!(
            invalid(Config { parallel: 0, ..Config::default() }),
            "`parallel` must be at least 1",
        );
        assert_eq!(
            invalid(Config {
                format: vec!["summary".into(), "progress".into()],
                ..Config::default()
            }),
            "several formatters write to `stdout`",
        );
        assert_eq!(
            invalid(Config {
                format: vec!["json:a.json".into(), "html:a.json".into()],
                ..Config::default()
            }),
            "several formatters write to `a.json`",
        );
        assert!(invalid(Config {
            format_options: FormatOptions {
                snippet_interface: "coroutine".into(),
                ..FormatOptions::default()
            },
            ..Config::default()
        })
        .contains("unknown snippet interface `coroutine`"));
        assert!(invalid(Config {
            tags: Some("@a and".into()),
            ..Config::default()
        })
        .starts_with("invalid `tags`"));
        assert!(matches!(
            Config::from_json(r#"{"parallel": "many"}"#),
            Err(ConfigError::Malformed(_)),
        ));
    }

    #[test]
    fn selects_profiles() {
        let profiles = Profiles::from_json(
            r#"{"default": {}, "ci": {"parallel": 8, "strict": true}}"#,
        )
        .unwrap();

        assert_eq!(profiles.names().collect::<Vec<_>>(), ["ci", "default"]);
        assert_eq!(profiles.profile("ci").unwrap().parallel, 8);
        assert_eq!(profiles.profile(Profiles::DEFAULT).unwrap().parallel, 1);
        assert!(matches!(
            profiles.profile("nightly"),
            Err(ConfigError::UnknownProfile(_)),
        ));
    }

    #[test]
    fn creates_file_formatters() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("nested/report.json");
        let cfg = Config {
            format: vec![
                format!("json:{}", json.display()),
                format!("summary:{}", dir.path().join("summary.txt").display()),
            ],
            ..Config::default()
        };

        let formatters = cfg.formatters().unwrap();

        assert_eq!(
            formatters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            ["json", "summary"],
        );
        assert!(!json.exists(), "destinations are opened on first write");
    }
}
