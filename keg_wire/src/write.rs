//! The write side of the wire: the byte sink the compiled chains write to,
//! and the per-call write context.

use crate::{build::Core, dedup::NameTable, error::Result, varint, Tag};
use keg_common::{buffer, Buffer};
use std::io::{Cursor, Write};

/// A positioned byte sink. The codec writes through this; [`Buffer`]
/// implements it for any backing store a `Cursor` can write to.
///
/// All multi-byte values are big-endian.
pub trait WireWrite {
  fn put_u8(&mut self, v: u8) -> buffer::Result<()>;
  fn put_i8(&mut self, v: i8) -> buffer::Result<()>;
  fn put_u16(&mut self, v: u16) -> buffer::Result<()>;
  fn put_i16(&mut self, v: i16) -> buffer::Result<()>;
  fn put_i32(&mut self, v: i32) -> buffer::Result<()>;
  fn put_i64(&mut self, v: i64) -> buffer::Result<()>;
  fn put_u64(&mut self, v: u64) -> buffer::Result<()>;
  fn put_f32(&mut self, v: f32) -> buffer::Result<()>;
  fn put_f64(&mut self, v: f64) -> buffer::Result<()>;
  fn put_bytes(&mut self, v: &[u8]) -> buffer::Result<()>;
  /// The index the next byte will be written at.
  fn position(&self) -> usize;
}

impl<T> WireWrite for Buffer<T>
where
  Cursor<T>: Write,
{
  fn put_u8(&mut self, v: u8) -> buffer::Result<()> { self.write_u8(v) }
  fn put_i8(&mut self, v: i8) -> buffer::Result<()> { self.write_i8(v) }
  fn put_u16(&mut self, v: u16) -> buffer::Result<()> { self.write_u16(v) }
  fn put_i16(&mut self, v: i16) -> buffer::Result<()> { self.write_i16(v) }
  fn put_i32(&mut self, v: i32) -> buffer::Result<()> { self.write_i32(v) }
  fn put_i64(&mut self, v: i64) -> buffer::Result<()> { self.write_i64(v) }
  fn put_u64(&mut self, v: u64) -> buffer::Result<()> { self.write_u64(v) }
  fn put_f32(&mut self, v: f32) -> buffer::Result<()> { self.write_f32(v) }
  fn put_f64(&mut self, v: f64) -> buffer::Result<()> { self.write_f64(v) }
  fn put_bytes(&mut self, v: &[u8]) -> buffer::Result<()> { self.write_buf(v) }
  fn position(&self) -> usize { Buffer::position(self) }
}

/// Everything one serialize call needs: the sink, the compiled core, and a
/// fresh name interning session.
pub struct WriteCtx<'a> {
  pub(crate) buf:   &'a mut dyn WireWrite,
  pub(crate) core:  &'a Core,
  pub(crate) names: NameTable,
}

impl<'a> WriteCtx<'a> {
  pub(crate) fn new(buf: &'a mut dyn WireWrite, core: &'a Core) -> WriteCtx<'a> {
    WriteCtx { buf, core, names: NameTable::new() }
  }

  pub(crate) fn put_tag(&mut self, tag: Tag) -> Result<()> {
    self.buf.put_u8(tag.id())?;
    Ok(())
  }

  /// Writes a class name reference: inline on first occurrence, a negative
  /// back-reference delta afterwards. See the crate docs for the layout.
  pub(crate) fn put_class_ref(&mut self, name: &'static str) -> Result<()> {
    let pos = self.buf.position();
    match self.names.first_position(name) {
      Some(first) => {
        varint::put(self.buf, first as i64 - pos as i64)?;
      }
      None => {
        varint::put(self.buf, 0)?;
        varint::put(self.buf, name.len() as i64)?;
        self.buf.put_bytes(name.as_bytes())?;
        self.names.insert(name, pos);
      }
    }
    Ok(())
  }
}

/// The most bytes a class name reference can take: an inline name, costed as
/// if it always appears in full. Used by the sizers, which never undercount.
pub(crate) fn class_ref_size_limit(name: &str) -> usize {
  1 + varint::size_of(name.len() as i64) + name.len()
}
