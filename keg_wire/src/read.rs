//! The read side of the wire: the byte source the compiled chains read from,
//! and the per-call read context.

use crate::{build::Core, dedup::NameCache, error::Result, varint, Tag, WireError};
use keg_common::{buffer, Buffer};

/// How deep a stream may nest before the reader gives up. Keeps a hostile
/// stream from overflowing the stack with nested containers.
pub(crate) const MAX_DEPTH: usize = 256;

/// A positioned byte source. The codec reads through this; [`Buffer`]
/// implements it for any backing store that can be viewed as bytes.
///
/// All multi-byte values are big-endian.
pub trait WireRead {
  fn get_u8(&mut self) -> buffer::Result<u8>;
  fn get_i8(&mut self) -> buffer::Result<i8>;
  fn get_u16(&mut self) -> buffer::Result<u16>;
  fn get_i16(&mut self) -> buffer::Result<i16>;
  fn get_i32(&mut self) -> buffer::Result<i32>;
  fn get_i64(&mut self) -> buffer::Result<i64>;
  fn get_u64(&mut self) -> buffer::Result<u64>;
  fn get_f32(&mut self) -> buffer::Result<f32>;
  fn get_f64(&mut self) -> buffer::Result<f64>;
  fn get_bytes(&mut self, len: usize) -> buffer::Result<Vec<u8>>;
  /// The index the next byte will be read from.
  fn position(&self) -> usize;
  /// The number of bytes left before the limit.
  fn remaining(&self) -> usize;
}

impl<T> WireRead for Buffer<T>
where
  T: AsRef<[u8]>,
{
  fn get_u8(&mut self) -> buffer::Result<u8> { self.read_u8() }
  fn get_i8(&mut self) -> buffer::Result<i8> { self.read_i8() }
  fn get_u16(&mut self) -> buffer::Result<u16> { self.read_u16() }
  fn get_i16(&mut self) -> buffer::Result<i16> { self.read_i16() }
  fn get_i32(&mut self) -> buffer::Result<i32> { self.read_i32() }
  fn get_i64(&mut self) -> buffer::Result<i64> { self.read_i64() }
  fn get_u64(&mut self) -> buffer::Result<u64> { self.read_u64() }
  fn get_f32(&mut self) -> buffer::Result<f32> { self.read_f32() }
  fn get_f64(&mut self) -> buffer::Result<f64> { self.read_f64() }
  fn get_bytes(&mut self, len: usize) -> buffer::Result<Vec<u8>> { self.read_buf(len) }
  fn position(&self) -> usize { Buffer::position(self) }
  fn remaining(&self) -> usize { Buffer::remaining(self) }
}

/// Everything one deserialize call needs: the source, the compiled core, a
/// fresh back-reference session, and the nesting depth.
pub struct ReadCtx<'a> {
  pub(crate) buf:   &'a mut dyn WireRead,
  pub(crate) core:  &'a Core,
  pub(crate) names: NameCache,
  pub(crate) depth: usize,
}

impl<'a> ReadCtx<'a> {
  pub(crate) fn new(buf: &'a mut dyn WireRead, core: &'a Core) -> ReadCtx<'a> {
    ReadCtx { buf, core, names: NameCache::new(), depth: 0 }
  }

  pub(crate) fn get_tag(&mut self) -> Result<Tag> {
    let id = self.buf.get_u8()?;
    Tag::from_id(id)
      .ok_or_else(|| WireError::MalformedStream(format!("invalid tag byte {id:#04x}")))
  }

  pub(crate) fn enter(&mut self) -> Result<()> {
    self.depth += 1;
    if self.depth > MAX_DEPTH {
      Err(WireError::MalformedStream(format!("nesting deeper than {MAX_DEPTH}")))
    } else {
      Ok(())
    }
  }

  pub(crate) fn leave(&mut self) { self.depth -= 1; }

  /// Reads a class name reference and resolves it to an ordinal.
  ///
  /// A non-negative ref means the length-prefixed name follows inline, and
  /// the position of the ref becomes the key for later back-references. A
  /// negative ref is the delta back to such a key.
  pub(crate) fn get_class_ref(&mut self) -> Result<u32> {
    let pos = self.buf.position();
    let r = varint::get(self.buf)?;
    if r >= 0 {
      let len = varint::get_len(self.buf)?;
      let bytes = self.buf.get_bytes(len)?;
      let name = std::str::from_utf8(&bytes)
        .map_err(|e| WireError::MalformedStream(format!("class name is not UTF-8: {e}")))?;
      let ordinal = self.core.table.ordinal_of(name)?;
      self.names.insert(pos, ordinal);
      Ok(ordinal)
    } else {
      let first = pos as i64 + r;
      usize::try_from(first)
        .ok()
        .and_then(|first| self.names.lookup(first))
        .ok_or_else(|| {
          WireError::MalformedStream(format!("back-reference to {first}, which holds no name"))
        })
    }
  }
}
