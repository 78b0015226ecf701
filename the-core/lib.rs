//! Text primitives shared by the highlighting crates.

pub mod line_ending;
