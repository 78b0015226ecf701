//! The ordered table of single-line rules.
//!
//! Order matters: every rule is an independent pass over the line and spans
//! are applied in table order, so a later rule overrides an earlier one where
//! their matches overlap.

use std::ops;

use regex::Regex;
use thiserror::Error;

use super::{
  Highlight,
  config::GrammarConfig,
};

/// Quoted strings, greedy up to the last quote of the same kind. Escaped
/// quotes are not recognised.
pub const STRING_PATTERN: &str = r#"".*"|'.*'"#;
pub const NUMBER_PATTERN: &str = r"\b[0-9]+\.?[0-9]*\b";
/// An identifier directly followed by `(`. Only the identifier (group 1) is
/// highlighted.
pub const FUNCTION_CALL_PATTERN: &str = r"\b([A-Za-z0-9_]+)\(";

#[derive(Debug, Error)]
pub enum RuleError {
  #[error("invalid {highlight} pattern `{pattern}`: {source}")]
  InvalidPattern {
    highlight: Highlight,
    pattern:   String,
    #[source]
    source:    regex::Error,
  },
  #[error("{token} token must not be empty")]
  EmptyToken { token: &'static str },
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[derive(Debug, Clone)]
pub struct Rule {
  regex:     Regex,
  highlight: Highlight,
  /// Capture group whose range is highlighted; 0 is the whole match.
  group:     usize,
}

impl Rule {
  pub fn new(pattern: &str, highlight: Highlight) -> Result<Self> {
    let regex = Regex::new(pattern).map_err(|source| {
      RuleError::InvalidPattern {
        highlight,
        pattern: pattern.to_owned(),
        source,
      }
    })?;
    Ok(Self {
      regex,
      highlight,
      group: 0,
    })
  }

  pub fn with_group(mut self, group: usize) -> Self {
    self.group = group;
    self
  }

  pub fn highlight(&self) -> Highlight {
    self.highlight
  }

  pub fn pattern(&self) -> &str {
    self.regex.as_str()
  }

  /// Byte ranges of every non-overlapping, non-empty match in `text`.
  pub fn find_iter<'t>(&'t self, text: &'t str) -> impl Iterator<Item = ops::Range<usize>> + 't {
    let group = self.group;
    self
      .regex
      .captures_iter(text)
      .filter_map(move |captures| captures.get(group))
      .map(|m| m.range())
      .filter(|range| !range.is_empty())
  }
}

#[derive(Debug, Clone)]
pub struct RuleTable {
  rules: Vec<Rule>,
}

impl RuleTable {
  pub fn from_grammar(grammar: &GrammarConfig) -> Result<Self> {
    if grammar.line_comment.is_empty() {
      return Err(RuleError::EmptyToken {
        token: "line comment",
      });
    }

    let mut rules = Vec::with_capacity(6);

    if !grammar.keywords.is_empty() {
      let alternation = grammar
        .keywords
        .iter()
        .map(|keyword| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|");
      rules.push(Rule::new(
        &format!(r"\b(?:{alternation})\b"),
        Highlight::Keyword,
      )?);
    }
    rules.push(Rule::new(&grammar.class_name, Highlight::ClassName)?);
    rules.push(Rule::new(STRING_PATTERN, Highlight::String)?);
    rules.push(Rule::new(NUMBER_PATTERN, Highlight::Number)?);
    rules.push(Rule::new(FUNCTION_CALL_PATTERN, Highlight::FunctionCall)?.with_group(1));
    rules.push(Rule::new(
      &format!("{}.*", regex::escape(&grammar.line_comment)),
      Highlight::Comment,
    )?);

    Ok(Self { rules })
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn matches(rule: &Rule, text: &str) -> Vec<String> {
    rule
      .find_iter(text)
      .map(|range| text[range].to_owned())
      .collect()
  }

  fn builtin() -> RuleTable {
    RuleTable::from_grammar(&GrammarConfig::builtin().unwrap()).unwrap()
  }

  #[test]
  fn table_order() {
    let table = builtin();
    let order: Vec<_> = table.rules().iter().map(Rule::highlight).collect();
    assert_eq!(order, [
      Highlight::Keyword,
      Highlight::ClassName,
      Highlight::String,
      Highlight::Number,
      Highlight::FunctionCall,
      Highlight::Comment,
    ]);
  }

  #[test]
  fn line_comment_token_is_escaped() {
    let mut grammar = GrammarConfig::builtin().unwrap();
    grammar.line_comment = "#".into();
    let table = RuleTable::from_grammar(&grammar).unwrap();
    let comment = table.rules().last().unwrap();
    assert_eq!(comment.pattern(), r"\#.*");
    assert_eq!(matches(comment, "x # y"), ["# y"]);
  }

  #[test]
  fn keywords_need_word_boundaries() {
    let table = builtin();
    let keywords = &table.rules()[0];
    assert_eq!(matches(keywords, "int integer print int_x for(;;)"), [
      "int", "for"
    ]);
  }

  #[test]
  fn keywords_are_escaped() {
    let mut grammar = GrammarConfig::builtin().unwrap();
    grammar.keywords = vec!["c++".into(), "a.b".into()];
    let table = RuleTable::from_grammar(&grammar).unwrap();
    assert_eq!(matches(&table.rules()[0], "axb a.b"), ["a.b"]);
  }

  #[test]
  fn string_is_greedy() {
    let rule = Rule::new(STRING_PATTERN, Highlight::String).unwrap();
    assert_eq!(matches(&rule, r#"f("a", "b");"#), [r#""a", "b""#]);
    assert_eq!(matches(&rule, r#"s = "say \"hi\"" + x;"#), [
      r#""say \"hi\"""#
    ]);
    assert_eq!(matches(&rule, "c = 'x'; d = 'y';"), ["'x'; d = 'y'"]);
    assert!(matches(&rule, r#"unterminated " quote"#).is_empty());
  }

  #[test]
  fn numbers() {
    let rule = Rule::new(NUMBER_PATTERN, Highlight::Number).unwrap();
    assert_eq!(matches(&rule, "x = 5; y = 3.25; z = a1; w = 7."), [
      "5", "3.25", "7"
    ]);
  }

  #[test]
  fn function_call_highlights_identifier_only() {
    let rule = Rule::new(FUNCTION_CALL_PATTERN, Highlight::FunctionCall)
      .unwrap()
      .with_group(1);
    assert_eq!(matches(&rule, "foo(bar(1), baz (2))"), ["foo", "bar"]);
  }

  #[test]
  fn line_comment_runs_to_end_of_line() {
    let table = builtin();
    let comment = table.rules().last().unwrap();
    assert_eq!(matches(comment, "x; // a // b"), ["// a // b"]);
  }

  #[test]
  fn empty_keyword_list_skips_rule() {
    let mut grammar = GrammarConfig::builtin().unwrap();
    grammar.keywords.clear();
    let table = RuleTable::from_grammar(&grammar).unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(table.rules()[0].highlight(), Highlight::ClassName);
  }

  #[test]
  fn invalid_class_pattern_is_reported() {
    let mut grammar = GrammarConfig::builtin().unwrap();
    grammar.class_name = "[unclosed".into();
    let err = RuleTable::from_grammar(&grammar).unwrap_err();
    assert!(matches!(err, RuleError::InvalidPattern {
      highlight: Highlight::ClassName,
      ..
    }));
  }

  #[test]
  fn empty_line_comment_token_is_rejected() {
    let mut grammar = GrammarConfig::builtin().unwrap();
    grammar.line_comment.clear();
    assert!(matches!(
      RuleTable::from_grammar(&grammar),
      Err(RuleError::EmptyToken { .. })
    ));
  }
}
