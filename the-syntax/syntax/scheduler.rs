//! Incremental re-classification.
//!
//! After an edit the [`Highlighter`] re-runs the classifier from the first
//! changed line and keeps going for as long as the state leaving a line
//! differs from the entry state stored for the next one. Once they agree the
//! rest of the document is known to be up to date.
//!
//! An unterminated block comment opener therefore re-classifies every line
//! down to the document end. That cost is inherent and the propagation is
//! never cut short.

use std::{
  borrow::Cow,
  ops,
  sync::Arc,
};

use ropey::Rope;
use the_core::line_ending::line_without_line_ending;

use super::{
  Classification,
  Classifier,
  LineState,
  LineStates,
  Result,
  Span,
};

/// Read access to the lines of a document.
pub trait LineSource {
  fn line_count(&self) -> usize;

  /// Text of `line` without its line ending. Only called for
  /// `line < self.line_count()`.
  fn line_text(&self, line: usize) -> Cow<'_, str>;
}

impl LineSource for Rope {
  fn line_count(&self) -> usize {
    self.len_lines()
  }

  fn line_text(&self, line: usize) -> Cow<'_, str> {
    line_without_line_ending(&self.slice(..), line).into()
  }
}

impl<S: AsRef<str>> LineSource for [S] {
  fn line_count(&self) -> usize {
    self.len()
  }

  fn line_text(&self, line: usize) -> Cow<'_, str> {
    Cow::Borrowed(self[line].as_ref())
  }
}

impl<S: AsRef<str>> LineSource for Vec<S> {
  fn line_count(&self) -> usize {
    self.as_slice().line_count()
  }

  fn line_text(&self, line: usize) -> Cow<'_, str> {
    self.as_slice().line_text(line)
  }
}

/// Which lines an edit touched, numbered after the edit.
///
/// Lines `first..=last` hold new text; they replaced
/// `last - first + 1 - delta` lines of the old document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEdit {
  pub first: usize,
  pub last:  usize,
  pub delta: isize,
}

impl LineEdit {
  /// An in-place edit of a single line.
  pub fn line(line: usize) -> Self {
    Self {
      first: line,
      last:  line,
      delta: 0,
    }
  }

  /// Number of lines the edit removed from the old document.
  fn removed(&self) -> Option<usize> {
    let inserted = self.inserted() as isize;
    usize::try_from(inserted - self.delta)
      .ok()
      .filter(|&n| n > 0)
  }

  fn inserted(&self) -> usize {
    self.last + 1 - self.first
  }
}

/// Lines whose spans were recomputed, for renderers to repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinesRecomputed {
  pub first: usize,
  pub last:  usize,
}

impl LinesRecomputed {
  pub fn lines(&self) -> ops::RangeInclusive<usize> {
    self.first..=self.last
  }

  pub fn len(&self) -> usize {
    self.last + 1 - self.first
  }

  pub fn contains(&self, line: usize) -> bool {
    self.lines().contains(&line)
  }
}

/// A classifier bound to the line states of one document.
#[derive(Debug, Clone)]
pub struct Highlighter {
  classifier: Arc<Classifier>,
  states:     LineStates,
}

impl Highlighter {
  /// Classifies every line of `source`.
  pub fn new<S: LineSource + ?Sized>(classifier: Arc<Classifier>, source: &S) -> Self {
    let mut highlighter = Self {
      classifier,
      states: LineStates::default(),
    };
    highlighter.rehighlight(source);
    highlighter
  }

  pub fn classifier(&self) -> &Arc<Classifier> {
    &self.classifier
  }

  pub fn states(&self) -> &LineStates {
    &self.states
  }

  pub fn line_count(&self) -> usize {
    self.states.len()
  }

  pub fn spans_for_line(&self, line: usize) -> Result<&[Span]> {
    self.states.spans(line)
  }

  /// The state open at the start of `line`.
  pub fn entry_state(&self, line: usize) -> Result<LineState> {
    Ok(self.states.entry(line)?.unwrap_or_default())
  }

  /// Swaps the grammar and re-classifies the whole document.
  pub fn set_classifier<S: LineSource + ?Sized>(
    &mut self,
    classifier: Arc<Classifier>,
    source: &S,
  ) -> LinesRecomputed {
    self.classifier = classifier;
    self.rehighlight(source)
  }

  /// Drops every stored state and classifies `source` from the first line.
  pub fn rehighlight<S: LineSource + ?Sized>(&mut self, source: &S) -> LinesRecomputed {
    let line_count = source.line_count().max(1);
    tracing::debug!(
      grammar = self.classifier.name(),
      line_count,
      "rehighlighting document"
    );
    self.states.reset(line_count);
    self.run(source, 0, line_count - 1)
  }

  /// Brings the stored states up to date with `source` after `edit`.
  ///
  /// The store is reshaped to the new line numbering first, then lines
  /// `edit.first..=edit.last` are re-classified and the exit state is carried
  /// forward until it matches what the next line already has stored.
  pub fn on_edit<S: LineSource + ?Sized>(&mut self, source: &S, edit: LineEdit) -> LinesRecomputed {
    let old_len = self.states.len();
    let new_len = source.line_count();
    let consistent = edit.first <= edit.last
      && edit.last < new_len
      && old_len as isize + edit.delta == new_len as isize
      && edit
        .removed()
        .is_some_and(|removed| edit.first + removed <= old_len);

    if !consistent {
      tracing::warn!(
        ?edit,
        old_len,
        new_len,
        "line edit does not match document, rehighlighting"
      );
      return self.rehighlight(source);
    }

    if let Some(removed) = edit.removed() {
      self.states.splice(edit.first, removed, edit.inserted());
    }
    self.run(source, edit.first, edit.last)
  }

  /// Classifies from `first`, unconditionally through `forced_last`, then
  /// until the carried state reaches a fixpoint or the document ends.
  fn run<S: LineSource + ?Sized>(
    &mut self,
    source: &S,
    first: usize,
    forced_last: usize,
  ) -> LinesRecomputed {
    let len = self.states.len();
    let mut line = first;

    loop {
      let entry = if line == 0 {
        LineState::Clear
      } else {
        self.states.stored_entry(line).unwrap_or_default()
      };
      self.states.set_entry(line, entry);

      // An empty source still has its one empty line.
      let text = if line < source.line_count() {
        source.line_text(line)
      } else {
        Cow::Borrowed("")
      };
      let Classification { spans, exit } = self.classifier.classify(&text, entry);
      self.states.set_spans(line, spans);

      let next = line + 1;
      if next >= len {
        break;
      }
      if next > forced_last && self.states.stored_entry(next) == Some(exit) {
        break;
      }
      if self.states.stored_entry(next) != Some(exit) {
        tracing::trace!(line = next, ?exit, "entry state changed");
      }
      self.states.set_entry(next, exit);
      line = next;
    }

    tracing::debug!(
      first,
      last = line,
      propagated = line.saturating_sub(forced_last),
      "reclassified lines"
    );
    LinesRecomputed { first, last: line }
  }
}
