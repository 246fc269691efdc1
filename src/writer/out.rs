// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for writing output.

use std::{
    borrow::Cow,
    fs, io,
    path::{Path, PathBuf},
    str,
};

use console::{Style, Term};
use derive_more::with_trait::{Deref, DerefMut, Display, From, Into};

use crate::outcome::OutcomeKind;

/// [`Style`]s for terminal output.
#[derive(Clone, Debug)]
pub struct Styles {
    /// [`Style`] for rendering passed items.
    pub ok: Style,

    /// [`Style`] for rendering skipped items.
    pub skipped: Style,

    /// [`Style`] for rendering pending and undefined items.
    pub pending: Style,

    /// [`Style`] for rendering failed items and errors.
    pub err: Style,

    /// [`Style`] for rendering __bold__.
    pub bold: Style,

    /// Indicates whether the output is colored.
    pub is_present: bool,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            ok: Style::new().green(),
            skipped: Style::new().cyan(),
            pending: Style::new().yellow(),
            err: Style::new().red(),
            bold: Style::new().bold(),
            is_present: Term::stdout().is_term() && console::colors_enabled(),
        }
    }
}

impl Styles {
    /// Creates new [`Styles`], coloring output only if `stdout` is an
    /// attended terminal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates new [`Styles`] never coloring the output.
    #[must_use]
    pub fn plain() -> Self {
        Self { is_present: false, ..Self::default() }
    }

    /// Overrides color detection with the given value, if any.
    #[must_use]
    pub fn colored(mut self, enabled: Option<bool>) -> Self {
        if let Some(enabled) = enabled {
            self.is_present = enabled;
        }
        self
    }

    fn apply<'a>(
        &self,
        style: &Style,
        input: impl Into<Cow<'a, str>>,
    ) -> Cow<'a, str> {
        if self.is_present {
            style.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }

    /// Colors `input` with [`Styles::ok`] color, if output is colored.
    #[must_use]
    pub fn ok<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.ok, input)
    }

    /// Colors `input` with [`Styles::skipped`] color, if output is colored.
    #[must_use]
    pub fn skipped<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.skipped, input)
    }

    /// Colors `input` with [`Styles::pending`] color, if output is colored.
    #[must_use]
    pub fn pending<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.pending, input)
    }

    /// Colors `input` with [`Styles::err`] color, if output is colored.
    #[must_use]
    pub fn err<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.err, input)
    }

    /// Makes `input` __bold__, if output is colored.
    #[must_use]
    pub fn bold<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.bold, input)
    }

    /// Colors `input` according to the given [`OutcomeKind`].
    #[must_use]
    pub fn outcome<'a>(
        &self,
        kind: OutcomeKind,
        input: impl Into<Cow<'a, str>>,
    ) -> Cow<'a, str> {
        match kind {
            OutcomeKind::Passed => self.ok(input),
            OutcomeKind::Skipped => self.skipped(input),
            OutcomeKind::Pending | OutcomeKind::Undefined => {
                self.pending(input)
            }
            OutcomeKind::Failed => self.err(input),
        }
    }
}

/// [`io::Write`] extension for easier manipulation with strings and special
/// sequences.
pub trait WriteStrExt: io::Write {
    /// Writes the given `string` into this writer.
    ///
    /// # Errors
    ///
    /// If this writer fails to write the given `string`.
    fn write_str(&mut self, string: impl AsRef<str>) -> io::Result<()> {
        self.write_all(string.as_ref().as_bytes())
    }

    /// Writes the given `string` into this writer followed by a newline.
    ///
    /// # Errors
    ///
    /// If this writer fails to write the given `string`.
    fn write_line(&mut self, string: impl AsRef<str>) -> io::Result<()> {
        self.write_str(string.as_ref())
            .and_then(|()| self.write_str("\n"))
    }

    /// Writes a special sequence into this writer clearing the current line
    /// and moving a cursor to its beginning.
    ///
    /// # Errors
    ///
    /// If this writer fails to write a special sequence.
    fn clear_line(&mut self) -> io::Result<()> {
        self.write_str("\r\x1b[2K")
    }
}

impl<T: io::Write + ?Sized> WriteStrExt for T {}

/// [`String`] wrapper implementing [`io::Write`].
#[derive(
    Clone,
    Debug,
    Default,
    Deref,
    DerefMut,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct WritableString(pub String);

impl io::Write for WritableString {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.push_str(
            str::from_utf8(buf)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        );
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// File [`io::Write`]r creating its file (and missing parent directories)
/// on the first write.
///
/// A destination that cannot be opened surfaces as an [`io::Error`] of the
/// write, so it fails the writing formatter only.
#[derive(Debug)]
pub struct LazyFile {
    /// Path of the file.
    path: PathBuf,

    /// Opened file, if any.
    file: Option<fs::File>,
}

impl LazyFile {
    /// Creates a new [`LazyFile`] without touching the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: None }
    }

    /// Returns the path of this [`LazyFile`].
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> io::Result<&mut fs::File> {
        let file = match self.file.take() {
            Some(f) => f,
            None => open(&self.path)?,
        };
        Ok(self.file.insert(file))
    }
}

impl io::Write for LazyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(self.file()?, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.as_mut().map_or(Ok(()), io::Write::flush)
    }
}

fn open(path: &Path) -> io::Result<fs::File> {
    let context = |e: io::Error| {
        io::Error::new(e.kind(), format!("cannot open `{}`: {e}", path.display()))
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(context)?;
    }
    fs::File::create(path).map_err(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_lines() {
        let mut out = WritableString::default();
        out.write_str("a").unwrap();
        out.write_line("b").unwrap();
        out.clear_line().unwrap();

        assert_eq!(out.0, "ab\n\r\x1b[2K");
    }

    #[test]
    fn plain_styles_leave_input_as_is() {
        let styles = Styles::plain();
        assert_eq!(styles.outcome(OutcomeKind::Failed, "F"), "F");
        assert_eq!(styles.bold("x"), "x");
    }

    #[test]
    fn forced_colors_apply_styles() {
        console::set_colors_enabled(true);
        let styles = Styles::plain().colored(Some(true));
        assert_ne!(styles.ok("ok"), "ok");
    }

    #[test]
    fn lazy_file_is_created_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.txt");
        let mut file = LazyFile::new(&path);
        assert!(!path.exists());

        file.write_line("done").unwrap();
        io::Write::flush(&mut file).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "done\n");
    }

    #[test]
    fn lazy_file_reports_unopenable_path_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = LazyFile::new(dir.path());

        let err = file.write_str("x").unwrap_err();

        assert!(err.to_string().starts_with("cannot open `"), "{err}");
        assert!(io::Write::flush(&mut file).is_ok());
    }
}
