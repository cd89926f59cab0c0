use std::{fmt, num::ParseIntError, str::FromStr};
use thiserror::Error;

/// A 128 bit UUID. This is stored as a single `u128`, and converted to and
/// from byte arrays as needed. On the wire it always travels big-endian: the
/// most significant 8 bytes first, then the least significant 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uuid(u128);

#[derive(Debug, Error)]
pub enum UuidParseError {
  #[error("int parsing error: {0}")]
  Int(#[from] ParseIntError),
  #[error("invalid length: {0}")]
  Length(usize),
}

impl Uuid {
  pub fn from_u128(v: u128) -> Self { Uuid(v) }
  pub fn from_be_bytes(v: [u8; 16]) -> Self { Uuid(u128::from_be_bytes(v)) }
  pub fn from_le_bytes(v: [u8; 16]) -> Self { Uuid(u128::from_le_bytes(v)) }

  pub fn as_u128(&self) -> u128 { self.0 }
  pub fn as_be_bytes(&self) -> [u8; 16] { self.0.to_be_bytes() }
  pub fn as_le_bytes(&self) -> [u8; 16] { self.0.to_le_bytes() }

  /// The most significant 8 bytes, as one big-endian integer.
  pub fn msb(&self) -> u64 { (self.0 >> 64) as u64 }
  /// The least significant 8 bytes, as one big-endian integer.
  pub fn lsb(&self) -> u64 { self.0 as u64 }
  pub fn from_parts(msb: u64, lsb: u64) -> Self { Uuid(((msb as u128) << 64) | lsb as u128) }

  /// Parses the string as a uuid with dashes in between. This is the same
  /// format produced by [`as_dashed_str`](Self::as_dashed_str).
  pub fn from_dashed_str(s: &str) -> Result<Self, UuidParseError> {
    if s.len() != 36 {
      return Err(UuidParseError::Length(s.len()));
    }
    Self::from_str(&s.split('-').collect::<Vec<&str>>().join(""))
  }

  /// Returns the uuid as a hex string, with no dashes or other characters.
  pub fn as_str(&self) -> String { format!("{:032x}", self.0) }

  /// Returns the uuid as a hex string with dashes.
  pub fn as_dashed_str(&self) -> String {
    format!(
      "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
      //          11111111222233334444555555555555
      (self.0 & 0xffffffff000000000000000000000000) >> (24 * 4), // 4 bits per digit
      (self.0 & 0x00000000ffff00000000000000000000) >> (20 * 4),
      (self.0 & 0x000000000000ffff0000000000000000) >> (16 * 4),
      (self.0 & 0x0000000000000000ffff000000000000) >> (12 * 4),
      self.0 & 0x00000000000000000000ffffffffffff,
    )
  }
}

impl FromStr for Uuid {
  type Err = UuidParseError;

  /// Parses a uuid from a 32 character hex string, without any dashes.
  fn from_str(s: &str) -> Result<Self, UuidParseError> {
    if s.len() != 32 {
      return Err(UuidParseError::Length(s.len()));
    }
    Ok(Uuid(u128::from_str_radix(s, 16)?))
  }
}

impl fmt::Display for Uuid {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.as_dashed_str()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn byte_order() {
    let id = Uuid::from_u128(0x0102030405060708090a0b0c0d0e0f10);
    assert_eq!(id.as_be_bytes()[0], 0x01);
    assert_eq!(id.as_le_bytes()[0], 0x10);
    assert_eq!(id.msb(), 0x0102030405060708);
    assert_eq!(id.lsb(), 0x090a0b0c0d0e0f10);
    assert_eq!(Uuid::from_parts(id.msb(), id.lsb()), id);
  }

  #[test]
  fn strings() {
    let id = Uuid::from_u128(0x123e4567e89b12d3a456426614174000);
    assert_eq!(id.as_dashed_str(), "123e4567-e89b-12d3-a456-426614174000");
    assert_eq!(Uuid::from_dashed_str("123e4567-e89b-12d3-a456-426614174000").unwrap(), id);
    assert_eq!(id.as_str().parse::<Uuid>().unwrap(), id);
    assert!(Uuid::from_dashed_str("123e4567").is_err());
    assert!("xyz".parse::<Uuid>().is_err());
  }
}
