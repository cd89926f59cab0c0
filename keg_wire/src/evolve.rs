//! Structural record fingerprints, and what a reader does when the stream's
//! fingerprint is not its own.
//!
//! A fingerprint is the first 8 bytes, big-endian, of the SHA-256 of the
//! record's structural signature: its simple name, then for each component
//! the pre-order tag tokens of its declared type and the component's name,
//! all joined with `!`. So `parts: Array<Optional<f64>>` contributes
//! `ARRAY!OPTIONAL!F64!parts`. Nothing positional or host-specific goes in:
//! no ordinals, no accessor names, no annotations. That is what keeps a
//! fingerprint stable while unrelated types come and go.

use crate::{
  error::Result,
  schema::{simple_name, FieldType, PrimKind, RecordSchema, RefKind},
  Tag, WireError,
};
use keg_common::Compatibility;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Computes the fingerprint of a record, and of every prefix of its
/// component list. `prefixes[k]` covers the first `k` components;
/// `prefixes[n]` is the full fingerprint. A reader under backwards
/// compatibility matches a stream fingerprint against these to recognise an
/// older writer layout.
pub(crate) fn record_fingerprints(
  rec: &RecordSchema,
  kinds: &HashMap<&'static str, Tag>,
) -> Result<(u64, Vec<u64>)> {
  let mut signature = String::from(simple_name(rec.name));
  let mut prefixes = Vec::with_capacity(rec.components.len() + 1);
  prefixes.push(hash64(&signature));
  for comp in rec.components {
    signature.push('!');
    push_tokens(&comp.ty, kinds, &mut signature)?;
    signature.push('!');
    signature.push_str(comp.name);
    prefixes.push(hash64(&signature));
  }
  Ok((*prefixes.last().unwrap_or(&0), prefixes))
}

/// Decides how many components to read for a record whose stream fingerprint
/// is `stream`. Exact matches read everything. Under
/// [`Backwards`](Compatibility::Backwards), a match against an older prefix
/// layout reads that many components, and the caller zero-fills the rest.
pub(crate) fn match_fingerprint(
  class: &str,
  fingerprint: u64,
  prefixes: &[u64],
  stream: u64,
  compat: Compatibility,
) -> Result<usize> {
  let n = prefixes.len().saturating_sub(1);
  if stream == fingerprint {
    return Ok(n);
  }
  if compat == Compatibility::Backwards {
    // Longest prefix first, in case of an (unlikely) collision.
    if let Some(k) = (0..n).rev().find(|&k| prefixes[k] == stream) {
      warn!("record `{class}`: stream carries an older layout with {k} of {n} components");
      return Ok(k);
    }
  }
  Err(WireError::SchemaMismatch { class: class.to_string(), stream, expected: fingerprint })
}

fn hash64(signature: &str) -> u64 {
  let digest = Sha256::digest(signature.as_bytes());
  let mut out = [0; 8];
  out.copy_from_slice(&digest[..8]);
  u64::from_be_bytes(out)
}

fn push_tokens(
  ty: &FieldType,
  kinds: &HashMap<&'static str, Tag>,
  out: &mut String,
) -> Result<()> {
  match ty {
    FieldType::Primitive(p) => out.push_str(prim_token(*p)),
    FieldType::Ref(k) => match k {
      RefKind::Bool => out.push_str("BOOL"),
      RefKind::I8 => out.push_str("I8"),
      RefKind::Char => out.push_str("CHAR"),
      RefKind::I16 => out.push_str("I16"),
      RefKind::I32 => out.push_str("I32"),
      RefKind::I64 => out.push_str("I64"),
      RefKind::F32 => out.push_str("F32"),
      RefKind::F64 => out.push_str("F64"),
      RefKind::Str => out.push_str("STRING"),
      RefKind::Uuid => out.push_str("UUID"),
      RefKind::User(f) => {
        let name = f().name();
        let tag = kinds.get(name).ok_or_else(|| {
          WireError::InvalidType(format!("`{name}` was not discovered before fingerprinting"))
        })?;
        out.push_str(match tag {
          Tag::Enum => "ENUM",
          Tag::Interface => "INTERFACE",
          _ => "RECORD",
        });
      }
    },
    FieldType::Array(elem) => {
      out.push_str("ARRAY!");
      push_tokens(elem, kinds, out)?;
    }
    FieldType::List(elem) => {
      out.push_str("LIST!");
      push_tokens(elem, kinds, out)?;
    }
    FieldType::Map(key, value) => {
      out.push_str("MAP!");
      push_tokens(key, kinds, out)?;
      out.push('!');
      push_tokens(value, kinds, out)?;
    }
    FieldType::Optional(inner) => {
      out.push_str("OPTIONAL!");
      push_tokens(inner, kinds, out)?;
    }
  }
  Ok(())
}

fn prim_token(p: PrimKind) -> &'static str {
  match p {
    PrimKind::Bool => "BOOL",
    PrimKind::I8 => "I8",
    PrimKind::Char => "CHAR",
    PrimKind::I16 => "I16",
    PrimKind::I32 => "I32",
    PrimKind::I64 => "I64",
    PrimKind::F32 => "F32",
    PrimKind::F64 => "F64",
  }
}
