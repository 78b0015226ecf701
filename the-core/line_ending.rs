//! Line endings as ropey counts them.
//!
//! With the `unicode-lines` feature every Unicode line break starts a new
//! line, matching `ropey/unicode_lines`. Without it only LF and CRLF do.

use ropey::RopeSlice;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LineEnding {
  /// CarriageReturn followed by LineFeed.
  Crlf,

  /// U+000A -- LineFeed
  LF,

  #[cfg(feature = "unicode-lines")]
  /// U+000B -- VerticalTab
  VT,

  #[cfg(feature = "unicode-lines")]
  /// U+000C -- FormFeed
  FF,

  #[cfg(feature = "unicode-lines")]
  /// U+000D -- CarriageReturn
  CR,

  #[cfg(feature = "unicode-lines")]
  /// U+0085 -- NextLine
  Nel,

  /// U+2028 -- Line Separator
  #[cfg(feature = "unicode-lines")]
  LS,

  /// U+2029 -- ParagraphSeparator
  #[cfg(feature = "unicode-lines")]
  PS,
}

impl LineEnding {
  #[inline]
  pub const fn len_chars(&self) -> usize {
    match self {
      Self::Crlf => 2,
      _ => 1,
    }
  }

  #[inline]
  pub const fn from_char(ch: char) -> Option<LineEnding> {
    match ch {
      '\u{000A}' => Some(LineEnding::LF),
      #[cfg(feature = "unicode-lines")]
      '\u{000B}' => Some(LineEnding::VT),
      #[cfg(feature = "unicode-lines")]
      '\u{000C}' => Some(LineEnding::FF),
      #[cfg(feature = "unicode-lines")]
      '\u{000D}' => Some(LineEnding::CR),
      #[cfg(feature = "unicode-lines")]
      '\u{0085}' => Some(LineEnding::Nel),
      #[cfg(feature = "unicode-lines")]
      '\u{2028}' => Some(LineEnding::LS),
      #[cfg(feature = "unicode-lines")]
      '\u{2029}' => Some(LineEnding::PS),
      _ => None,
    }
  }
}

/// The line ending `line` finishes with, if any.
pub fn get_line_ending(line: &RopeSlice) -> Option<LineEnding> {
  // Ropey never splits a CRLF pair across lines.
  let len = line.len_chars();
  if len >= 2 && line.char(len - 2) == '\u{000D}' && line.char(len - 1) == '\u{000A}' {
    return Some(LineEnding::Crlf);
  }
  len
    .checked_sub(1)
    .and_then(|last| LineEnding::from_char(line.char(last)))
}

/// Char index where `line`'s content ends, before its line ending.
pub fn line_end_char_index(slice: &RopeSlice, line: usize) -> usize {
  slice.line_to_char(line + 1)
    - get_line_ending(&slice.line(line))
      .map(|le| le.len_chars())
      .unwrap_or(0)
}

/// Line `line_idx` of `slice` without its line ending.
pub fn line_without_line_ending<'a>(slice: &RopeSlice<'a>, line_idx: usize) -> RopeSlice<'a> {
  let start = slice.line_to_char(line_idx);
  let end = line_end_char_index(slice, line_idx);
  slice.slice(start..end)
}
