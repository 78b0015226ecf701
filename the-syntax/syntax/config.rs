//! Data-only grammar settings, parsed from TOML.
//!
//! A [`GrammarConfig`] carries everything that varies between languages: the
//! keyword list, the comment tokens, the class-name pattern and how empty
//! lines treat an open block comment. Swapping it never touches the
//! scheduler.

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

/// Built-in grammar.toml.
const BUILTIN_GRAMMAR: &str = include_str!("../grammar.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse grammar: {0}")]
  Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GrammarConfig {
  pub name:          String,
  #[serde(default)]
  pub keywords:      Vec<String>,
  /// Regex for class-like identifiers.
  pub class_name:    String,
  pub line_comment:  String,
  pub block_comment: BlockCommentTokens,
  #[serde(default)]
  pub empty_line:    EmptyLinePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockCommentTokens {
  pub start: String,
  pub end:   String,
}

/// What an empty line does to the state it receives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyLinePolicy {
  /// The exit state equals the entry state.
  #[default]
  PassThrough,
  /// The exit state is always `Clear`, closing any open block comment.
  Reset,
}

impl GrammarConfig {
  /// The grammar shipped with the crate.
  pub fn builtin() -> Result<Self> {
    Self::from_toml(BUILTIN_GRAMMAR)
  }

  pub fn from_toml(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }
}
