//! Per-call interning of class names.
//!
//! A fully qualified name is written inline once per serialize or deserialize
//! call; every later occurrence is a negative back-reference to the position
//! of the first (see the crate docs for the exact bytes). These tables hold
//! that state. They live on the stack of one public call, start empty, and
//! never escape it, which is why the same value always produces the same
//! stream and why codecs can be shared across threads without locks.

use std::collections::HashMap;

/// Write side: class name to the position of its first, inline occurrence.
#[derive(Debug, Default)]
pub struct NameTable {
  seen: HashMap<&'static str, usize>,
}

impl NameTable {
  pub fn new() -> NameTable { NameTable::default() }

  pub fn first_position(&self, name: &str) -> Option<usize> { self.seen.get(name).copied() }

  pub fn insert(&mut self, name: &'static str, pos: usize) {
    trace!("interned `{name}` at {pos}");
    self.seen.insert(name, pos);
  }

  pub fn len(&self) -> usize { self.seen.len() }
  pub fn is_empty(&self) -> bool { self.seen.is_empty() }
}

/// Read side: position of an inline name to the ordinal it resolved to.
#[derive(Debug, Default)]
pub struct NameCache {
  seen: HashMap<usize, u32>,
}

impl NameCache {
  pub fn new() -> NameCache { NameCache::default() }

  pub fn lookup(&self, pos: usize) -> Option<u32> { self.seen.get(&pos).copied() }

  pub fn insert(&mut self, pos: usize, ordinal: u32) { self.seen.insert(pos, ordinal); }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_position_wins() {
    let mut names = NameTable::new();
    assert_eq!(names.first_position("a::B"), None);
    names.insert("a::B", 4);
    assert_eq!(names.first_position("a::B"), Some(4));
    assert_eq!(names.first_position("a::C"), None);
    assert_eq!(names.len(), 1);
  }

  #[test]
  fn cache_by_position() {
    let mut cache = NameCache::new();
    cache.insert(10, 2);
    assert_eq!(cache.lookup(10), Some(2));
    assert_eq!(cache.lookup(11), None);
  }
}
