use std::sync::{
  Arc,
  OnceLock,
};

use ropey::Rope;
use the_syntax::{
  document::Document,
  syntax::{
    Classifier,
    Highlighter,
    LinesRecomputed,
  },
};

const MAX_INITIAL_BYTES: usize = 8 * 1024;
const MAX_OPS: usize = 128;
const MAX_INSERT_BYTES: usize = 256;

/// Tokens spliced into inserted text so that comment openers and closers
/// show up far more often than random bytes would produce them.
const TOKENS: &[&str] = &["/*", "*/", "//", "\n", "\r\n", "\r", "\u{2028}", "\"", "'", "int ", "f("];

#[derive(Debug, Clone)]
pub struct EditOp {
  pub anchor: u16,
  pub delete: u16,
  pub insert: Vec<u8>,
}

struct Scenario {
  initial: Vec<u8>,
  ops:     Vec<EditOp>,
}

pub struct FuzzSession {
  pub classifier: Arc<Classifier>,
  pub document:   Document,
  pub ops:        Vec<EditOp>,
}

pub fn session_from_bytes(data: &[u8]) -> FuzzSession {
  let mut scenario = decode_scenario(data);
  if scenario.ops.is_empty() {
    scenario.ops.push(EditOp {
      anchor: 0,
      delete: 0,
      insert: b"/*".to_vec(),
    });
  }

  let classifier = fuzz_classifier();
  let initial = expand_tokens(&scenario.initial);
  let document = Document::new(Rope::from_str(&initial), Arc::clone(&classifier));

  FuzzSession {
    classifier,
    document,
    ops: scenario.ops,
  }
}

pub fn apply_edit(document: &mut Document, op: &EditOp) -> Option<LinesRecomputed> {
  let len_chars = document.text().len_chars();
  let from = (op.anchor as usize) % (len_chars + 1);
  let max_delete = len_chars - from;
  let delete = (op.delete as usize) % (max_delete + 1);
  let replacement = expand_tokens(&op.insert);

  document
    .replace(from..from + delete, replacement.as_str())
    .ok()
}

/// The incrementally maintained states must equal a from-scratch pass.
pub fn assert_matches_fresh(session: &FuzzSession) {
  let fresh = Highlighter::new(Arc::clone(&session.classifier), session.document.text());
  assert_eq!(
    fresh.states(),
    session.document.highlighter().states(),
    "incremental highlight diverged for {:?}",
    session.document.text().to_string()
  );
}

/// Small bytes select an entry of `TOKENS`, everything else is taken as text.
fn expand_tokens(bytes: &[u8]) -> String {
  let mut text = String::with_capacity(bytes.len());
  let mut plain = Vec::new();
  for &byte in bytes {
    match TOKENS.get(byte as usize) {
      Some(token) => {
        text.push_str(&String::from_utf8_lossy(&plain));
        plain.clear();
        text.push_str(token);
      },
      None => plain.push(byte),
    }
  }
  text.push_str(&String::from_utf8_lossy(&plain));
  text
}

fn fuzz_classifier() -> Arc<Classifier> {
  static CLASSIFIER: OnceLock<Arc<Classifier>> = OnceLock::new();
  CLASSIFIER
    .get_or_init(|| Arc::new(Classifier::builtin().expect("built-in grammar compiles")))
    .clone()
}

fn decode_scenario(data: &[u8]) -> Scenario {
  let mut cursor = ByteCursor::new(data);
  let initial_len = cursor.next_usize(MAX_INITIAL_BYTES);
  let initial = cursor.next_bytes(initial_len).to_vec();
  let op_count = cursor.next_usize(MAX_OPS);
  let mut ops = Vec::with_capacity(op_count);
  for _ in 0..op_count {
    let anchor = cursor.next_u16();
    let delete = cursor.next_u16();
    let insert_len = cursor.next_usize(MAX_INSERT_BYTES);
    let insert = cursor.next_bytes(insert_len).to_vec();
    ops.push(EditOp {
      anchor,
      delete,
      insert,
    });
  }

  Scenario { initial, ops }
}

struct ByteCursor<'a> {
  data: &'a [u8],
  pos:  usize,
}

impl<'a> ByteCursor<'a> {
  fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0 }
  }

  fn next_u8(&mut self) -> u8 {
    let value = self.data.get(self.pos).copied().unwrap_or(0);
    self.pos = self.pos.saturating_add(1);
    value
  }

  fn next_u16(&mut self) -> u16 {
    let lo = self.next_u8() as u16;
    let hi = self.next_u8() as u16;
    lo | (hi << 8)
  }

  fn next_usize(&mut self, max: usize) -> usize {
    if max == 0 {
      return 0;
    }
    (self.next_u16() as usize) % (max + 1)
  }

  fn next_bytes(&mut self, len: usize) -> &'a [u8] {
    let start = self.pos.min(self.data.len());
    let end = start.saturating_add(len).min(self.data.len());
    self.pos = end;
    &self.data[start..end]
  }
}
