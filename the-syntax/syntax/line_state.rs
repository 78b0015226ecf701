//! Per-line entry states and spans.
//!
//! The store holds one slot per document line: the state open at the start of
//! the line and the spans of its latest classification. Readers get shared
//! access; only the scheduler reshapes or rewrites slots.

use std::ops;

use super::{
  LineState,
  Result,
  Span,
  SyntaxError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LineSlot {
  /// `None` until the line has been reached by a classification pass.
  entry: Option<LineState>,
  spans: Vec<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStates {
  slots: Vec<LineSlot>,
}

impl LineStates {
  /// A store for `line_count` lines, none of them classified yet.
  pub fn new(line_count: usize) -> Self {
    Self {
      slots: vec![LineSlot::default(); line_count],
    }
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  /// The stored entry state of `line`, `None` when it was never computed.
  pub fn entry(&self, line: usize) -> Result<Option<LineState>> {
    Ok(self.slot(line)?.entry)
  }

  pub fn spans(&self, line: usize) -> Result<&[Span]> {
    Ok(&self.slot(line)?.spans)
  }

  /// Spans of every line in `lines`, in line order.
  pub fn spans_in(&self, lines: ops::RangeInclusive<usize>) -> Result<Vec<(usize, &[Span])>> {
    let (first, last) = (*lines.start(), *lines.end());
    if first <= last {
      self.slot(last)?;
    }
    Ok(
      (first..=last)
        .map(|line| (line, self.slots[line].spans.as_slice()))
        .collect(),
    )
  }

  fn slot(&self, line: usize) -> Result<&LineSlot> {
    self.slots.get(line).ok_or(SyntaxError::LineOutOfRange {
      line,
      len: self.slots.len(),
    })
  }

  /// Entry state without the range check; the scheduler only asks for lines
  /// it knows exist.
  pub(crate) fn stored_entry(&self, line: usize) -> Option<LineState> {
    self.slots[line].entry
  }

  pub(crate) fn set_entry(&mut self, line: usize, state: LineState) {
    self.slots[line].entry = Some(state);
  }

  pub(crate) fn set_spans(&mut self, line: usize, spans: Vec<Span>) {
    self.slots[line].spans = spans;
  }

  /// Replaces `removed` slots starting at `first` with `inserted` fresh ones.
  /// The entry state of `first` survives: the text above it did not change.
  pub(crate) fn splice(&mut self, first: usize, removed: usize, inserted: usize) {
    let entry = self.slots.get(first).and_then(|slot| slot.entry);
    self.slots.splice(
      first..first + removed,
      std::iter::repeat_n(LineSlot::default(), inserted),
    );
    if let Some(slot) = self.slots.get_mut(first) {
      slot.entry = entry;
    }
  }

  /// Forgets every stored state and span, keeping the line count.
  pub(crate) fn reset(&mut self, line_count: usize) {
    self.slots.clear();
    self.slots.resize(line_count, LineSlot::default());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::Highlight;

  fn comment(range: ops::Range<usize>) -> Span {
    Span::new(range, Highlight::Comment)
  }

  #[test]
  fn new_store_is_unclassified() {
    let store = LineStates::new(3);
    assert_eq!(store.len(), 3);
    for line in 0..3 {
      assert_eq!(store.entry(line), Ok(None));
      assert_eq!(store.spans(line), Ok(&[][..]));
    }
  }

  #[test]
  fn out_of_range_is_an_error() {
    let store = LineStates::new(2);
    assert_eq!(store.spans(2), Err(SyntaxError::LineOutOfRange {
      line: 2,
      len:  2,
    }));
    assert!(store.entry(7).is_err());
    assert!(store.spans_in(1..=2).is_err());
  }

  #[test]
  fn spans_in_range() {
    let mut store = LineStates::new(3);
    store.set_spans(1, vec![comment(0..2)]);

    let lines = store.spans_in(0..=2).unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], (1, &[comment(0..2)][..]));
    assert!(store.spans_in(2..=1).unwrap().is_empty());
  }

  #[test]
  fn splice_keeps_first_entry_and_renumbers() {
    let mut store = LineStates::new(4);
    for line in 0..4 {
      store.set_entry(line, LineState::InBlockComment);
      store.set_spans(line, vec![comment(line..line + 1)]);
    }

    // Line 1 split into three lines.
    store.splice(1, 1, 3);
    assert_eq!(store.len(), 6);
    assert_eq!(store.stored_entry(1), Some(LineState::InBlockComment));
    assert_eq!(store.stored_entry(2), None);
    assert_eq!(store.stored_entry(3), None);
    assert!(store.spans(1).unwrap().is_empty());
    assert_eq!(store.spans(4).unwrap(), &[comment(2..3)]);
    assert_eq!(store.spans(5).unwrap(), &[comment(3..4)]);

    // Lines 3..=5 joined into one.
    store.splice(3, 3, 1);
    assert_eq!(store.len(), 4);
    assert_eq!(store.stored_entry(3), None);
  }

  #[test]
  fn reset_forgets_everything() {
    let mut store = LineStates::new(2);
    store.set_entry(1, LineState::InBlockComment);
    store.reset(5);
    assert_eq!(store, LineStates::new(5));
  }
}
