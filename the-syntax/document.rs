//! Document text with incrementally maintained highlights.
//!
//! A [`Document`] owns a rope and the [`Highlighter`] that classifies it.
//! Every edit goes through [`Document::apply`], which reports the touched
//! line range to the highlighter in the same call, so spans and line states
//! are never observable out of step with the text.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ropey::Rope;
//! use the_syntax::{
//!   document::Document,
//!   syntax::{
//!     Classifier,
//!     LineState,
//!   },
//! };
//!
//! let classifier = Arc::new(Classifier::builtin().unwrap());
//! let mut doc = Document::new(Rope::from("int a;\nint b;\n"), classifier);
//!
//! let recomputed = doc.insert(0, "/* ").unwrap();
//! assert_eq!(recomputed.last, 2);
//! assert_eq!(doc.entry_state(1).unwrap(), LineState::InBlockComment);
//! ```

use std::{
  borrow::Cow,
  fmt,
  ops,
  sync::Arc,
};

use parking_lot::Mutex;
use ropey::Rope;
use the_core::line_ending::line_end_char_index;
use thiserror::Error;

use crate::{
  Tendril,
  syntax::{
    Classifier,
    Highlighter,
    LineEdit,
    LineSource,
    LineState,
    LinesRecomputed,
    Span,
    SyntaxError,
  },
};

/// (from, to) replacement, in chars.
pub type Change = (usize, usize, Option<Tendril>);

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
  #[error("invalid change range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error(transparent)]
  Syntax(#[from] SyntaxError),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

type Listener = Box<dyn FnMut(LinesRecomputed) + Send>;

pub struct Document {
  text:        Rope,
  highlighter: Highlighter,
  version:     u64,
  listeners:   Vec<Listener>,
}

impl fmt::Debug for Document {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Document")
      .field("text", &self.text)
      .field("highlighter", &self.highlighter)
      .field("version", &self.version)
      .field("listeners", &self.listeners.len())
      .finish()
  }
}

impl Document {
  pub fn new(text: Rope, classifier: Arc<Classifier>) -> Self {
    let highlighter = Highlighter::new(classifier, &text);
    Self {
      text,
      highlighter,
      version: 0,
      listeners: Vec::new(),
    }
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn highlighter(&self) -> &Highlighter {
    &self.highlighter
  }

  pub fn line_count(&self) -> usize {
    self.text.len_lines()
  }

  pub fn line_text(&self, line: usize) -> Result<Cow<'_, str>> {
    self.check_line(line)?;
    Ok(self.text.line_text(line))
  }

  pub fn spans_for_line(&self, line: usize) -> Result<&[Span]> {
    Ok(self.highlighter.spans_for_line(line)?)
  }

  /// Spans of every line in `lines`, for renderers repainting a region.
  pub fn spans_for_lines(&self, lines: ops::RangeInclusive<usize>) -> Result<Vec<(usize, &[Span])>> {
    Ok(self.highlighter.states().spans_in(lines)?)
  }

  pub fn entry_state(&self, line: usize) -> Result<LineState> {
    Ok(self.highlighter.entry_state(line)?)
  }

  /// Registers a callback invoked with every recomputed line range.
  pub fn on_lines_recomputed(&mut self, listener: impl FnMut(LinesRecomputed) + Send + 'static) {
    self.listeners.push(Box::new(listener));
  }

  /// Swaps the grammar and re-classifies every line.
  pub fn set_classifier(&mut self, classifier: Arc<Classifier>) -> LinesRecomputed {
    let recomputed = self.highlighter.set_classifier(classifier, &self.text);
    self.notify(recomputed);
    recomputed
  }

  pub fn apply(&mut self, (from, to, insert): Change) -> Result<LinesRecomputed> {
    let len = self.text.len_chars();
    if from > to {
      return Err(DocumentError::InvalidRange { from, to });
    }
    if to > len {
      return Err(DocumentError::RangeOutOfBounds { from, to, len });
    }

    let first = self.text.char_to_line(from);
    let old_last = self.text.char_to_line(to);

    self.text.remove(from..to);
    let inserted = match &insert {
      Some(text) => {
        self.text.insert(from, text);
        text.chars().count()
      },
      None => 0,
    };
    let last = self.text.char_to_line(from + inserted);
    // Joining a lone `\r` with a following `\n` pulls `from` onto the line
    // above.
    let first = first.min(self.text.char_to_line(from));

    if from != to || inserted > 0 {
      self.version = self.version.saturating_add(1);
    }

    let edit = LineEdit {
      first,
      last,
      delta: last as isize - old_last as isize,
    };
    let recomputed = self.highlighter.on_edit(&self.text, edit);
    self.notify(recomputed);
    Ok(recomputed)
  }

  pub fn replace(&mut self, range: ops::Range<usize>, text: impl Into<Tendril>) -> Result<LinesRecomputed> {
    self.apply((range.start, range.end, Some(text.into())))
  }

  pub fn insert(&mut self, at: usize, text: impl Into<Tendril>) -> Result<LinesRecomputed> {
    self.apply((at, at, Some(text.into())))
  }

  pub fn delete(&mut self, range: ops::Range<usize>) -> Result<LinesRecomputed> {
    self.apply((range.start, range.end, None))
  }

  /// Replaces the content of `line`, keeping its line ending.
  pub fn set_line(&mut self, line: usize, text: impl Into<Tendril>) -> Result<LinesRecomputed> {
    self.check_line(line)?;
    let start = self.text.line_to_char(line);
    let end = line_end_char_index(&self.text.slice(..), line);
    self.replace(start..end, text)
  }

  fn check_line(&self, line: usize) -> Result<()> {
    let len = self.line_count();
    if line >= len {
      return Err(SyntaxError::LineOutOfRange { line, len }.into());
    }
    Ok(())
  }

  fn notify(&mut self, recomputed: LinesRecomputed) {
    for listener in &mut self.listeners {
      listener(recomputed);
    }
  }
}

/// A document behind a lock, so that an edit and the re-classification it
/// triggers form one critical section.
#[derive(Debug, Clone)]
pub struct SharedDocument(Arc<Mutex<Document>>);

impl SharedDocument {
  pub fn new(document: Document) -> Self {
    Self(Arc::new(Mutex::new(document)))
  }

  pub fn edit<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
    f(&mut *self.0.lock())
  }

  pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
    f(&*self.0.lock())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use super::*;
  use crate::syntax::{
    Highlight,
    LineState::{
      Clear,
      InBlockComment as Open,
    },
  };

  fn document(text: &str) -> Document {
    Document::new(Rope::from(text), Arc::new(Classifier::builtin().unwrap()))
  }

  fn entries(doc: &Document) -> Vec<LineState> {
    (0..doc.line_count())
      .map(|line| doc.entry_state(line).unwrap())
      .collect()
  }

  #[test]
  fn initial_classification() {
    let doc = document("int x = 5; // done\n/* start\nstill comment */ int y;\n");
    assert_eq!(doc.line_count(), 4);
    assert_eq!(entries(&doc), [Clear, Clear, Open, Clear]);
    assert_eq!(doc.spans_for_line(2).unwrap(), &[
      Span::new(0..16, Highlight::Comment),
      Span::new(17..20, Highlight::Keyword),
    ]);
    assert!(doc.spans_for_line(3).unwrap().is_empty());
  }

  #[test]
  fn typing_an_opener_propagates() {
    let mut doc = document("a;\nb;\nc;\nd;");
    let recomputed = doc.insert(3, "/*").unwrap();

    assert_eq!(recomputed, LinesRecomputed { first: 1, last: 3 });
    assert_eq!(entries(&doc), [Clear, Clear, Open, Open]);
    assert_eq!(doc.version(), 1);
  }

  #[test]
  fn inserting_a_newline_splits_the_line() {
    let mut doc = document("/* a b */\nint c;");
    let recomputed = doc.insert(4, "\n").unwrap();

    assert_eq!(doc.line_count(), 3);
    assert_eq!(doc.line_text(0).unwrap(), "/* a");
    assert_eq!(doc.line_text(1).unwrap(), " b */");
    assert_eq!(recomputed, LinesRecomputed { first: 0, last: 1 });
    assert_eq!(entries(&doc), [Clear, Open, Clear]);
    assert_eq!(doc.spans_for_line(2).unwrap(), &[Span::new(
      0..3,
      Highlight::Keyword
    )]);
  }

  #[test]
  fn deleting_a_line_break_joins_lines() {
    let mut doc = document("/* a\nb */\nint c;\nd");
    // Remove "\nb */\n" so the opener swallows "int c;".
    let recomputed = doc.delete(4..10).unwrap();

    assert_eq!(doc.text().to_string(), "/* aint c;\nd");
    assert_eq!(recomputed, LinesRecomputed { first: 0, last: 1 });
    assert_eq!(entries(&doc), [Clear, Open]);
    assert_eq!(doc.spans_for_line(1).unwrap(), &[Span::new(
      0..1,
      Highlight::Comment
    )]);
  }

  #[test]
  fn joining_cr_with_lf_starts_on_the_line_above() {
    let tail: String = (0..20).map(|i| format!("int v{i};\n")).collect();
    let mut doc = document(&format!("a\rx\nb\n{tail}"));
    assert_eq!(doc.line_count(), 24);

    // "a\r" and "x\n" become the single line "a\r\n".
    let recomputed = doc.delete(2..3).unwrap();

    assert_eq!(doc.line_count(), 23);
    assert_eq!(doc.line_text(0).unwrap(), "a");
    assert_eq!(recomputed, LinesRecomputed { first: 0, last: 0 });
    let fresh = Highlighter::new(Arc::new(Classifier::builtin().unwrap()), doc.text());
    assert_eq!(fresh.states(), doc.highlighter().states());
  }

  #[test]
  fn spans_for_a_range_of_lines() {
    let doc = document("int a;\n/* b\nc */ f(1);");
    let lines = doc.spans_for_lines(1..=2).unwrap();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], (1, &[Span::new(0..4, Highlight::Comment)][..]));
    assert_eq!(lines[1].0, 2);
    assert_eq!(lines[1].1[0], Span::new(0..4, Highlight::Comment));
    assert!(doc.spans_for_lines(2..=3).is_err());
  }

  #[test]
  fn set_line_keeps_line_ending() {
    let mut doc = document("int a;\r\nint b;\r\n");
    let recomputed = doc.set_line(0, "float a;").unwrap();

    assert_eq!(doc.text().to_string(), "float a;\r\nint b;\r\n");
    assert_eq!(recomputed, LinesRecomputed { first: 0, last: 0 });
    assert_eq!(doc.spans_for_line(0).unwrap()[0].range, 0..5);
  }

  #[test]
  fn listeners_see_every_recomputed_range() {
    let mut doc = document("a\nb\nc");
    let (tx, rx) = mpsc::channel();
    doc.on_lines_recomputed(move |recomputed| {
      tx.send(recomputed).unwrap();
    });

    doc.set_line(1, "/* b").unwrap();
    doc.set_line(2, "c */").unwrap();
    doc.set_classifier(Arc::new(Classifier::builtin().unwrap()));

    let seen: Vec<_> = rx.try_iter().collect();
    assert_eq!(seen, [
      LinesRecomputed { first: 1, last: 2 },
      LinesRecomputed { first: 2, last: 2 },
      LinesRecomputed { first: 0, last: 2 },
    ]);
  }

  #[test]
  fn out_of_range_requests_are_errors() {
    let mut doc = document("a\nb");
    assert_eq!(
      doc.spans_for_line(2).unwrap_err(),
      DocumentError::Syntax(SyntaxError::LineOutOfRange { line: 2, len: 2 })
    );
    assert!(doc.line_text(5).is_err());
    assert!(doc.set_line(2, "x").is_err());
    assert_eq!(
      doc.delete(2..9).unwrap_err(),
      DocumentError::RangeOutOfBounds {
        from: 2,
        to:   9,
        len:  3,
      }
    );
    assert_eq!(
      doc.apply((2, 1, None)).unwrap_err(),
      DocumentError::InvalidRange { from: 2, to: 1 }
    );
    assert_eq!(doc.version(), 0);
  }

  #[test]
  fn empty_change_leaves_version_alone() {
    let mut doc = document("int a;");
    let recomputed = doc.apply((3, 3, None)).unwrap();
    assert_eq!(recomputed, LinesRecomputed { first: 0, last: 0 });
    assert_eq!(doc.version(), 0);
  }

  #[test]
  fn shared_document_serializes_edits() {
    let shared = SharedDocument::new(document("int a;\nint b;"));
    let handles: Vec<_> = (0..4)
      .map(|i| {
        let shared = shared.clone();
        std::thread::spawn(move || {
          shared.edit(|doc| doc.insert(0, format!("v{i}();\n").as_str()).unwrap());
        })
      })
      .collect();
    for handle in handles {
      handle.join().unwrap();
    }

    shared.read(|doc| {
      assert_eq!(doc.line_count(), 6);
      assert_eq!(doc.version(), 4);
      for line in 0..4 {
        assert_eq!(
          doc.spans_for_line(line).unwrap()[0].highlight,
          Highlight::FunctionCall
        );
      }
    });
  }
}
