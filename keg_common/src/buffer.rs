use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use std::{
  convert::TryFrom,
  fmt, io,
  io::{Cursor, Read, Write},
  ops::{Deref, DerefMut},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BufferError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Reading,
  Writing,
}

use Mode::{Reading, Writing};

/// An error produced by a [`Buffer`]. This stores the position the buffer was
/// at when the operation failed, and whether the buffer was being read from or
/// written to at the time.
#[derive(Debug)]
pub struct BufferError {
  err:  BufferErrorKind,
  pos:  u64,
  mode: Mode,
}

impl fmt::Display for BufferError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if self.mode == Reading {
      write!(f, "error while reading from buffer at index {}: {}", self.pos, self.err)
    } else {
      write!(f, "error while writing to buffer at index {}: {}", self.pos, self.err)
    }
  }
}

#[derive(Debug, Error)]
pub enum BufferErrorKind {
  /// Reading would pass the limit, or writing would pass the end of a
  /// fixed-size backing store.
  #[error("eof reached")]
  Eof,
  #[error("{0}")]
  Io(io::Error),
  #[error("expected bytes {0:x?}, got {1:x?}")]
  Expected(Vec<u8>, Vec<u8>),
}

impl std::error::Error for BufferError {}

impl BufferError {
  pub fn kind(&self) -> &BufferErrorKind { &self.err }
  pub fn pos(&self) -> u64 { self.pos }
  pub fn mode(&self) -> Mode { self.mode }
}

impl From<io::Error> for BufferErrorKind {
  fn from(e: io::Error) -> Self {
    match e.kind() {
      io::ErrorKind::UnexpectedEof | io::ErrorKind::WriteZero => BufferErrorKind::Eof,
      _ => BufferErrorKind::Io(e),
    }
  }
}

/// A positioned, sized byte region, with big-endian semantics. This is a
/// wrapper around a [`Cursor`], with an explicit limit. Reads never pass the
/// limit. The limit starts at the end of the backing store, and a
/// [`flip`](Buffer::flip) moves it to the current position, which is how a
/// host switches one region from writing to reading.
#[derive(Debug)]
pub struct Buffer<T> {
  data:  Cursor<T>,
  limit: Option<u64>,
}

macro_rules! add_read {
  ($fn: ident, $ty: ty, $size: expr) => {
    pub fn $fn(&mut self) -> Result<$ty> {
      self.check_read($size)?;
      self.data.$fn::<BigEndian>().map_err(|e| self.err(e, Reading))
    }
  };
}
// The same as add_read(), but with no byte-order parameter.
macro_rules! add_read_byte {
  ($fn: ident, $ty: ty) => {
    pub fn $fn(&mut self) -> Result<$ty> {
      self.check_read(1)?;
      self.data.$fn().map_err(|e| self.err(e, Reading))
    }
  };
}

macro_rules! add_write {
  ($fn: ident, $ty: ty, $size: expr) => {
    pub fn $fn(&mut self, v: $ty) -> Result<()> {
      self.check_write($size)?;
      self.data.$fn::<BigEndian>(v).map_err(|e| self.err(e, Writing))
    }
  };
}
// The same as add_write(), but with no byte-order parameter.
macro_rules! add_write_byte {
  ($fn: ident, $ty: ty) => {
    pub fn $fn(&mut self, v: $ty) -> Result<()> {
      self.check_write(1)?;
      self.data.$fn(v).map_err(|e| self.err(e, Writing))
    }
  };
}

impl<T> Buffer<T> {
  pub fn new(data: T) -> Self { Buffer { data: Cursor::new(data), limit: None } }
  pub fn new_index(data: T, index: usize) -> Self {
    let mut cursor = Cursor::new(data);
    cursor.set_position(index as u64);
    Buffer { data: cursor, limit: None }
  }

  pub fn err(&self, e: impl Into<BufferErrorKind>, mode: Mode) -> BufferError {
    BufferError { err: e.into(), pos: self.data.position(), mode }
  }

  /// Returns the current index. This byte has not been read or written yet,
  /// and will be on the next call.
  pub fn position(&self) -> usize { usize::try_from(self.data.position()).unwrap() }
  pub fn set_position(&mut self, index: usize) { self.data.set_position(index as u64) }

  /// Advances the cursor `amount` bytes, without touching the data.
  pub fn skip(&mut self, amount: usize) {
    let new_pos = self.data.position() + amount as u64;
    self.data.set_position(new_pos);
  }

  pub fn into_inner(self) -> T { self.data.into_inner() }
}

impl<T> Buffer<T>
where
  T: AsRef<[u8]>,
{
  pub fn len(&self) -> usize { self.data.get_ref().as_ref().len() }
  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// The first index that can no longer be read. Unless
  /// [`set_limit`](Buffer::set_limit) or [`flip`](Buffer::flip) has been
  /// called, this is the end of the backing store.
  pub fn limit(&self) -> usize {
    match self.limit {
      Some(l) => usize::try_from(l).unwrap(),
      None => self.len(),
    }
  }
  pub fn set_limit(&mut self, limit: usize) { self.limit = Some(limit as u64) }

  /// Switches from writing to reading: the limit moves to the current
  /// position, and the position moves back to 0.
  pub fn flip(&mut self) {
    self.limit = Some(self.data.position());
    self.data.set_position(0);
  }

  /// The number of bytes between the position and the limit.
  pub fn remaining(&self) -> usize { self.limit().saturating_sub(self.position()) }

  fn check_read(&self, len: usize) -> Result<()> {
    if self.position() + len > self.limit() {
      Err(self.err(BufferErrorKind::Eof, Reading))
    } else {
      Ok(())
    }
  }

  pub fn read_bool(&mut self) -> Result<bool> { Ok(self.read_u8()? != 0) }
  add_read_byte!(read_u8, u8);
  add_read!(read_u16, u16, 2);
  add_read!(read_u32, u32, 4);
  add_read!(read_u64, u64, 8);
  add_read_byte!(read_i8, i8);
  add_read!(read_i16, i16, 2);
  add_read!(read_i32, i32, 4);
  add_read!(read_i64, i64, 8);

  add_read!(read_f32, f32, 4);
  add_read!(read_f64, f64, 8);

  pub fn read_buf(&mut self, len: usize) -> Result<Vec<u8>> {
    self.check_read(len)?;
    let mut buf = vec![0; len];
    self.data.read_exact(&mut buf).map_err(|e| self.err(e, Reading))?;
    Ok(buf)
  }

  /// Reads `len` bytes at the given index, without moving the position.
  pub fn read_buf_at(&mut self, index: usize, len: usize) -> Result<Vec<u8>> {
    let prev = self.data.position();
    self.data.set_position(index as u64);
    let res = self.read_buf(len);
    self.data.set_position(prev);
    res
  }

  /// Expects the next bytes. Returns an error if the next bytes do not match.
  /// This will read the exact number of bytes that are passed in.
  pub fn expect(&mut self, expected: &[u8]) -> Result<()> {
    let got = self.read_buf(expected.len())?;
    if got == expected {
      Ok(())
    } else {
      Err(self.err(BufferErrorKind::Expected(expected.to_vec(), got), Reading))
    }
  }
}

impl<T> Buffer<T>
where
  Cursor<T>: io::Write,
{
  fn check_write(&self, len: usize) -> Result<()> {
    if let Some(limit) = self.limit {
      if self.data.position() + len as u64 > limit {
        return Err(self.err(BufferErrorKind::Eof, Writing));
      }
    }
    Ok(())
  }

  pub fn write_bool(&mut self, v: bool) -> Result<()> {
    if v {
      self.write_u8(1)
    } else {
      self.write_u8(0)
    }
  }
  add_write_byte!(write_u8, u8);
  add_write!(write_u16, u16, 2);
  add_write!(write_u32, u32, 4);
  add_write!(write_u64, u64, 8);
  add_write_byte!(write_i8, i8);
  add_write!(write_i16, i16, 2);
  add_write!(write_i32, i32, 4);
  add_write!(write_i64, i64, 8);

  add_write!(write_f32, f32, 4);
  add_write!(write_f64, f64, 8);

  pub fn write_buf(&mut self, v: &[u8]) -> Result<()> {
    self.check_write(v.len())?;
    self.data.write_all(v).map_err(|e| self.err(e, Writing))
  }

  /// Writes the bytes at the given index, without moving the position.
  pub fn write_buf_at(&mut self, index: usize, v: &[u8]) -> Result<()> {
    let prev = self.data.position();
    self.data.set_position(index as u64);
    let res = self.write_buf(v);
    self.data.set_position(prev);
    res
  }
}

impl<T> Deref for Buffer<T> {
  type Target = T;

  fn deref(&self) -> &Self::Target { self.data.get_ref() }
}

impl<T> DerefMut for Buffer<T> {
  fn deref_mut(&mut self) -> &mut Self::Target { self.data.get_mut() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn read_write() {
    let mut buf = Buffer::new(vec![]);
    buf.write_u8(5).unwrap();
    buf.write_i16(-3).unwrap();
    buf.write_i32(1024).unwrap();
    buf.write_f64(3.5).unwrap();
    assert_eq!(buf.position(), 15);

    buf.flip();
    assert_eq!(buf.position(), 0);
    assert_eq!(buf.limit(), 15);
    assert_eq!(buf.read_u8().unwrap(), 5);
    assert_eq!(buf.read_i16().unwrap(), -3);
    assert_eq!(buf.read_i32().unwrap(), 1024);
    assert_eq!(buf.read_f64().unwrap(), 3.5);
    assert_eq!(buf.remaining(), 0);
  }

  #[test]
  fn big_endian() {
    let mut buf = Buffer::new(vec![]);
    buf.write_u16(0x1234).unwrap();
    buf.write_i32(0x0a0b0c0d).unwrap();
    assert_eq!(buf.deref(), &[0x12, 0x34, 0x0a, 0x0b, 0x0c, 0x0d]);
  }

  #[test]
  fn limit_bounds_reads() {
    let mut buf = Buffer::new(vec![1, 2, 3, 4]);
    buf.set_limit(2);
    assert_eq!(buf.read_u8().unwrap(), 1);
    assert_eq!(buf.read_u8().unwrap(), 2);
    let err = buf.read_u8().unwrap_err();
    assert!(matches!(err.kind(), BufferErrorKind::Eof));
    assert_eq!(err.mode(), Mode::Reading);
    // The position is left at the point of failure.
    assert_eq!(buf.position(), 2);
  }

  #[test]
  fn fixed_store_overflows() {
    let mut data = [0; 2];
    let mut buf = Buffer::new(data.as_mut_slice());
    buf.write_u8(1).unwrap();
    buf.write_u8(2).unwrap();
    let err = buf.write_u8(3).unwrap_err();
    assert!(matches!(err.kind(), BufferErrorKind::Eof));
    assert_eq!(err.mode(), Mode::Writing);
  }

  #[test]
  fn absolute_access() {
    let mut buf = Buffer::new(vec![]);
    buf.write_buf(b"hello world").unwrap();
    assert_eq!(buf.read_buf_at(6, 5).unwrap(), b"world");
    buf.write_buf_at(0, b"jello").unwrap();
    assert_eq!(buf.position(), 11);
    buf.flip();
    assert_eq!(buf.read_buf(5).unwrap(), b"jello");
  }

  #[test]
  fn expect() {
    let mut buf = Buffer::new(vec![b'h', b'i']);
    assert!(buf.expect(b"hi").is_ok());
    let mut buf = Buffer::new(vec![b'h', b'i']);
    assert!(buf.expect(b"no").is_err());
  }
}
