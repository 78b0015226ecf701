#![no_main]

mod common;

use std::mem;

use libfuzzer_sys::fuzz_target;

use crate::common::{
  apply_edit,
  assert_matches_fresh,
  session_from_bytes,
};

fuzz_target!(|data: &[u8]| {
  let mut session = session_from_bytes(data);

  for op in mem::take(&mut session.ops) {
    if apply_edit(&mut session.document, &op).is_none() {
      continue;
    }
    assert_matches_fresh(&session);
  }
});
