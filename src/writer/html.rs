// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Self-contained HTML report [`Formatter`].

use std::{borrow::Cow, fmt::Write as _, io, sync::Arc};

use async_trait::async_trait;

use crate::{
    outcome::{Outcome, OutcomeKind},
    result::{RunResult, Stats},
};

use super::{out::WriteStrExt as _, Capabilities, Formatter, FormatterError};

const STYLE: &str = "\
body{font-family:sans-serif;margin:2em;color:#222}\
h1{font-size:1.4em}\
section{border:1px solid #ddd;border-radius:4px;margin:1em 0;padding:.5em 1em}\
.tag{color:#777;margin-right:.5em}\
ol{padding-left:1.5em}\
pre{background:#fee;padding:.5em;white-space:pre-wrap}\
.passed{color:#2a7d2a}.failed{color:#c62828}.undefined,.pending{color:#b58900}\
.skipped{color:#2c7a9b}";

/// [`Formatter`] rendering the [`RunResult`] as a single HTML page with
/// inlined styles.
#[derive(Clone, Debug)]
pub struct Html<Out: io::Write> {
    output: Out,
    title: String,
}

impl<Out: io::Write> Html<Out> {
    /// Creates a new [`Html`] [`Formatter`] writing to the given `output`.
    #[must_use]
    pub fn new(output: Out) -> Self {
        Self { output, title: "Cucumber report".into() }
    }

    /// Sets the page title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Returns the output this [`Html`] writes to.
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    /// Renders the given [`RunResult`] as an HTML page.
    #[must_use]
    pub fn render(&self, result: &RunResult) -> String {
        let mut page = String::new();
        let title = escape(&self.title);
        _ = write!(
            page,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n\
             <body>\n<h1>{title}</h1>\n",
        );
        _ = writeln!(
            page,
            "<p class=\"{}\">{}</p>\n<p>{}</p>\n<p>Finished in {}{}</p>",
            result.outcome().kind(),
            counter("scenario", result.scenario_stats()),
            counter("step", result.step_stats()),
            humantime::format_duration(result.duration),
            if result.cancelled { " (cancelled)" } else { "" },
        );

        for feature in &result.features {
            _ = writeln!(page, "<section>");
            _ = writeln!(
                page,
                "<h2 class=\"{}\">Feature: {}</h2>",
                feature.outcome().kind(),
                escape(&feature.name),
            );
            tags(&mut page, &feature.tags);
            if let Some(src) = &feature.source {
                _ = writeln!(page, "<p><code>{}</code></p>", escape(src));
            }
            if let Some(desc) = &feature.description {
                _ = writeln!(page, "<p>{}</p>", escape(desc));
            }

            for sc in &feature.scenarios {
                _ = writeln!(
                    page,
                    "<h3 class=\"{}\">{}: {}</h3>",
                    sc.outcome.kind(),
                    escape(&sc.keyword),
                    escape(&sc.name),
                );
                tags(&mut page, &sc.tags);
                _ = writeln!(page, "<ol>");
                for step in &sc.steps {
                    let kind = step.outcome.kind();
                    _ = write!(
                        page,
                        "<li class=\"{kind}\">{} <small>({kind})</small>",
                        escape(&step.step.to_string()),
                    );
                    if let Outcome::Failed(e) = &step.outcome {
                        _ = write!(page, "<pre>{}</pre>", escape(&e.to_string()));
                    }
                    _ = writeln!(page, "</li>");
                }
                _ = writeln!(page, "</ol>");
            }
            _ = writeln!(page, "</section>");
        }

        page.push_str("</body>\n</html>\n");
        page
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Formatter for Html<Out> {
    fn name(&self) -> &str {
        "html"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FINAL
    }

    async fn publish(
        &mut self,
        result: &Arc<RunResult>,
    ) -> Result<(), FormatterError> {
        let page = self.render(result);
        self.output.write_str(page)?;
        self.output.flush()?;
        Ok(())
    }
}

fn tags(page: &mut String, tags: &[String]) {
    if tags.is_empty() {
        return;
    }
    page.push_str("<p>");
    for t in tags {
        _ = write!(page, "<span class=\"tag\">@{}</span>", escape(t));
    }
    page.push_str("</p>\n");
}

fn counter(item: &str, stats: Stats) -> String {
    let parts = [
        OutcomeKind::Passed,
        OutcomeKind::Failed,
        OutcomeKind::Undefined,
        OutcomeKind::Pending,
        OutcomeKind::Skipped,
    ]
    .into_iter()
    .filter(|k| stats.get(*k) > 0)
    .map(|k| format!("<span class=\"{k}\">{} {k}</span>", stats.get(k)))
    .collect::<Vec<_>>();
    format!("{} {item}s: {}", stats.total(), parts.join(", "))
}

/// Escapes HTML special characters of the given `text`.
fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return text.into();
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out.into()
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::writer::{fixture, out::WritableString};

    #[test]
    fn renders_self_contained_page() {
        let mut f = Html::new(WritableString::default()).title("Login <report>");
        block_on(f.publish(&fixture::login())).unwrap();
        let page = &f.output().0;

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Login &lt;report&gt;</title>"));
        assert!(page.contains("<style>"));
        assert!(!page.contains("<script src") && !page.contains("<link"));
        assert!(page.contains("<h2 class=\"failed\">Feature: Login</h2>"));
        assert!(page.contains(
            "<h3 class=\"undefined\">Scenario: unknown step</h3>",
        ));
        assert!(page.contains(
            "<li class=\"passed\">When I log in as &quot;alice&quot; \
             <small>(passed)</small></li>",
        ));
        assert!(page.contains("Then I see the &lt;dashboard&gt;"));
        assert!(page.contains("<pre>boom</pre>"));
        assert!(page.contains("3 scenarios: "));
        assert!(page.trim_end().ends_with("</html>"));
    }

    #[test]
    fn escapes_only_when_needed() {
        assert!(matches!(escape("plain"), Cow::Borrowed("plain")));
        assert_eq!(escape("a & 'b'"), "a &amp; &#39;b&#39;");
    }
}
