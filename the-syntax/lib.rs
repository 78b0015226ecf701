use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod document;
pub mod syntax;

pub type Tendril = SmartString<LazyCompact>;
