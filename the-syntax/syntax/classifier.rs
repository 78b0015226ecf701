//! Classification of a single line.
//!
//! [`Classifier::classify`] is total and pure: the same text and entry state
//! always produce the same spans and exit state, and nothing outside the
//! line is consulted.

use std::ops;

use smallvec::SmallVec;

use super::{
  GrammarError,
  Highlight,
  LineState,
  Span,
  config::{
    BlockCommentTokens,
    EmptyLinePolicy,
    GrammarConfig,
  },
  rules::{
    RuleError,
    RuleTable,
  },
};

/// Result of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
  /// Block comment spans first, then single-line rule spans in table order.
  pub spans: Vec<Span>,
  pub exit:  LineState,
}

#[derive(Debug, Clone)]
pub struct Classifier {
  name:          String,
  rules:         RuleTable,
  block_comment: BlockCommentTokens,
  empty_line:    EmptyLinePolicy,
}

impl Classifier {
  pub fn new(grammar: &GrammarConfig) -> Result<Self, RuleError> {
    if grammar.block_comment.start.is_empty() {
      return Err(RuleError::EmptyToken {
        token: "block comment start",
      });
    }
    if grammar.block_comment.end.is_empty() {
      return Err(RuleError::EmptyToken {
        token: "block comment end",
      });
    }

    Ok(Self {
      name:          grammar.name.clone(),
      rules:         RuleTable::from_grammar(grammar)?,
      block_comment: grammar.block_comment.clone(),
      empty_line:    grammar.empty_line,
    })
  }

  /// Classifier for the built-in grammar.
  pub fn builtin() -> Result<Self, GrammarError> {
    Ok(Self::new(&GrammarConfig::builtin()?)?)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn rules(&self) -> &RuleTable {
    &self.rules
  }

  pub fn empty_line_policy(&self) -> EmptyLinePolicy {
    self.empty_line
  }

  pub fn classify(&self, text: &str, entry: LineState) -> Classification {
    if text.is_empty() {
      let exit = match self.empty_line {
        EmptyLinePolicy::PassThrough => entry,
        EmptyLinePolicy::Reset => LineState::Clear,
      };
      return Classification {
        spans: Vec::new(),
        exit,
      };
    }

    let offsets = CharOffsets::new(text);
    let (comments, exit) = self.block_comments(text, entry);

    let mut spans: Vec<Span> = comments
      .iter()
      .map(|range| Span::new(offsets.to_chars(range.clone()), Highlight::Comment))
      .collect();

    let swallowed = comments
      .first()
      .is_some_and(|range| range.start == 0 && range.end == text.len());
    if swallowed {
      return Classification { spans, exit };
    }

    for rule in self.rules.rules() {
      for range in rule.find_iter(text) {
        clip(range, &comments, |fragment| {
          spans.push(Span::new(offsets.to_chars(fragment), rule.highlight()));
        });
      }
    }

    Classification { spans, exit }
  }

  /// Byte ranges covered by block comments, plus the state at line end.
  ///
  /// The closer is searched from the start of the comment, opener included,
  /// so an opener and closer may share a char (`/*/` is a complete comment).
  fn block_comments(
    &self,
    text: &str,
    entry: LineState,
  ) -> (SmallVec<[ops::Range<usize>; 4]>, LineState) {
    let BlockCommentTokens { start: open, end: close } = &self.block_comment;
    let mut comments = SmallVec::new();
    let mut state = LineState::Clear;

    let mut start = match entry {
      LineState::InBlockComment => Some(0),
      LineState::Clear => text.find(open.as_str()),
    };

    while let Some(from) = start {
      match text[from..].find(close.as_str()) {
        Some(offset) => {
          let end = from + offset + close.len();
          comments.push(from..end);
          start = text[end..].find(open.as_str()).map(|idx| end + idx);
        },
        None => {
          comments.push(from..text.len());
          state = LineState::InBlockComment;
          break;
        },
      }
    }

    (comments, state)
  }
}

/// Emits the parts of `range` not covered by `covered`, which must be sorted
/// and disjoint.
fn clip(
  range: ops::Range<usize>,
  covered: &[ops::Range<usize>],
  mut emit: impl FnMut(ops::Range<usize>),
) {
  let mut cursor = range.start;
  for hole in covered {
    if hole.end <= cursor {
      continue;
    }
    if hole.start >= range.end {
      break;
    }
    if hole.start > cursor {
      emit(cursor..hole.start);
    }
    cursor = hole.end;
    if cursor >= range.end {
      return;
    }
  }
  if cursor < range.end {
    emit(cursor..range.end);
  }
}

/// Byte to char offset conversion for one line.
struct CharOffsets {
  /// Byte offset of every char, or `None` when the line is ASCII.
  starts: Option<Vec<usize>>,
}

impl CharOffsets {
  fn new(text: &str) -> Self {
    let starts = (!text.is_ascii()).then(|| text.char_indices().map(|(idx, _)| idx).collect());
    Self { starts }
  }

  fn to_char(&self, byte: usize) -> usize {
    match &self.starts {
      None => byte,
      Some(starts) => starts.partition_point(|&start| start < byte),
    }
  }

  fn to_chars(&self, range: ops::Range<usize>) -> ops::Range<usize> {
    self.to_char(range.start)..self.to_char(range.end)
  }
}
