//! Line-state driven syntax classification.
//!
//! The engine is split into small layers, leaves first:
//!
//! - **Configuration** (`syntax::config`): data-only grammar settings.
//! - **Rules** (`syntax::rules`): the ordered single-line pattern table
//!   compiled from a grammar.
//! - **Classifier** (`syntax::classifier`): a pure function from a line and
//!   the state open at its start to spans plus the state open at its end.
//! - **Store** (`syntax::line_state`): one entry state and span list per line.
//! - **Scheduler** (`syntax::scheduler`): re-runs the classifier after an edit
//!   until the carried state reaches a fixpoint.
//!
//! # Example
//!
//! ```no_run
//! use the_syntax::syntax::{
//!   Classifier,
//!   Highlight,
//!   LineState,
//! };
//!
//! let classifier = Classifier::builtin().unwrap();
//! let line = classifier.classify("int x = 5; // done", LineState::Clear);
//! assert_eq!(line.spans[0].highlight, Highlight::Keyword);
//! assert_eq!(line.exit, LineState::Clear);
//! ```
pub mod classifier;
pub mod config;
pub mod line_state;
pub mod rules;
pub mod scheduler;

use std::{
  fmt,
  ops,
};

pub use classifier::{
  Classification,
  Classifier,
};
pub use config::{
  ConfigError,
  EmptyLinePolicy,
  GrammarConfig,
};
pub use line_state::LineStates;
pub use rules::{
  Rule,
  RuleError,
  RuleTable,
};
pub use scheduler::{
  Highlighter,
  LineEdit,
  LineSource,
  LinesRecomputed,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
  #[error("line {line} is out of range for document with {len} lines")]
  LineOutOfRange { line: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, SyntaxError>;

/// Failure to turn a grammar description into a classifier.
#[derive(Debug, Error)]
pub enum GrammarError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Rule(#[from] RuleError),
}

/// Semantic class of a span. Plain text carries no span at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Highlight {
  Keyword,
  ClassName,
  String,
  Number,
  Comment,
  FunctionCall,
}

impl Highlight {
  pub const ALL: [Highlight; 6] = [
    Highlight::Keyword,
    Highlight::ClassName,
    Highlight::String,
    Highlight::Number,
    Highlight::Comment,
    Highlight::FunctionCall,
  ];

  /// Scope name renderers use to look the class up in a theme.
  pub const fn scope(self) -> &'static str {
    match self {
      Highlight::Keyword => "keyword",
      Highlight::ClassName => "type",
      Highlight::String => "string",
      Highlight::Number => "constant.numeric",
      Highlight::Comment => "comment",
      Highlight::FunctionCall => "function",
    }
  }
}

impl fmt::Display for Highlight {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.scope())
  }
}

/// The multi-line construct open at a line boundary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineState {
  #[default]
  Clear,
  InBlockComment,
}

/// A classified, half-open char range within one line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
  pub range:     ops::Range<usize>,
  pub highlight: Highlight,
}

impl Span {
  pub fn new(range: ops::Range<usize>, highlight: Highlight) -> Self {
    Self { range, highlight }
  }

  pub fn start(&self) -> usize {
    self.range.start
  }

  pub fn end(&self) -> usize {
    self.range.end
  }

  pub fn len(&self) -> usize {
    self.range.len()
  }

  pub fn is_empty(&self) -> bool {
    self.range.is_empty()
  }
}

/// Flattens spans into non-overlapping runs over a line of `len` chars.
///
/// Spans are applied in order and a later span overrides an earlier one on
/// every char they share. Runs of plain text are omitted and adjacent runs of
/// the same class are merged.
pub fn paint(spans: &[Span], len: usize) -> Vec<(Highlight, ops::Range<usize>)> {
  let mut cells: Vec<Option<Highlight>> = vec![None; len];
  for span in spans {
    let end = span.end().min(len);
    for cell in cells.iter_mut().take(end).skip(span.start()) {
      *cell = Some(span.highlight);
    }
  }

  let mut runs: Vec<(Highlight, ops::Range<usize>)> = Vec::new();
  for (idx, cell) in cells.into_iter().enumerate() {
    let Some(highlight) = cell else {
      continue;
    };
    match runs.last_mut() {
      Some((last, range)) if *last == highlight && range.end == idx => range.end = idx + 1,
      _ => runs.push((highlight, idx..idx + 1)),
    }
  }
  runs
}
