//! A compact binary codec for algebraic data types: records (immutable
//! product types with ordered, named components), enums (named constants),
//! and sealed unions (a closed set of record or enum subtypes).
//!
//! A host declares its types once as [`Schema`](schema::Schema) descriptors
//! and bridges its values through the [`Reflect`](value::Reflect) trait. A
//! [`Codec`](codec::Codec) built for a root type walks every type reachable
//! from that root, assigns each one a stable ordinal, and compiles one
//! encoder/decoder/sizer chain per record component. Serialization then runs
//! those chains against a [`Buffer`](keg_common::Buffer) owned by the host.
//!
//! # Wire Format
//!
//! All multi-byte integers are big-endian. All varints are zigzag-LEB128 (see
//! [`ZigZag`] and [`varint`]). Every nullable position starts with a single
//! [`Tag`] byte; `0x00` always means null.
//!
//! | value | encoding |
//! |---|---|
//! | primitive | fixed-width big-endian, no tag (bool is one byte, 0 or 1) |
//! | nullable scalar | tag, then the payload (`i32`/`i64` as varints, `f32`/`f64`/`char`/`i16`/`i8` fixed) |
//! | string | `0x09`, varint byte length, UTF-8 bytes |
//! | uuid | `0x0A`, most significant 8 bytes, least significant 8 |
//! | enum | `0x0B`, class name ref, varint constant ordinal |
//! | record | `0x0C`, class name ref, fingerprint (only when evolution is on), components in order |
//! | union value | `0x0D`, concrete class name ref, then record or enum payload as above |
//! | array / list | `0x0E` / `0x0F`, varint length, elements (primitive elements are packed fixed-width) |
//! | map | `0x10`, varint length, key/value pairs in source order |
//! | optional | `0x11`, then `0x00` for empty or `0x01` followed by the value |
//!
//! A root record is written bare: its components in order, with no tag, name,
//! or (unless evolution is on) fingerprint, since both sides already agreed
//! on the root. Root unions and enums are written as their tagged forms.
//!
//! # Class name refs
//!
//! Class names are interned per call. The first occurrence of a name writes
//! varint `0` followed by the varint length and the UTF-8 name; the position
//! of that leading varint is the name's key. Every later occurrence writes a
//! single negative varint, the delta from the current position back to the
//! key. A reader treats any non-negative ref as "inline name follows". This
//! convention is stable; both sides of a stream must use it.

#[macro_use]
extern crate log;

pub mod analyze;
pub mod build;
pub mod codec;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod evolve;
pub mod read;
pub mod schema;
pub mod value;
pub mod varint;
pub mod write;

pub use codec::{Codec, Options};
pub use error::WireError;
pub use keg_common::{Buffer, Compatibility, Uuid};
pub use schema::{Component, EnumSchema, FieldType, PrimKind, RecordSchema, RefKind, Schema,
                 UnionSchema};
pub use value::{Reflect, Value};

/// The single-byte markers that let a stream describe itself. Every nullable
/// or polymorphic position starts with one of these; a byte outside this
/// alphabet in a tag position means the stream is corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
  /// Reserved for null in all nullable positions.
  Null,
  Bool,
  I8,
  /// A single UTF-16 code unit: 2 bytes, big-endian, unsigned.
  Char,
  I16,
  I32,
  I64,
  F32,
  F64,
  Str,
  Uuid,
  /// A named constant of an enum class. Also used for unions whose permitted
  /// subtypes are all enums.
  Enum,
  /// A record. Also used for unions whose permitted subtypes are all records.
  Record,
  /// A union that permits at least one record and at least one enum.
  Interface,
  Array,
  List,
  Map,
  Optional,
}

impl Tag {
  /// Returns the Tag for this byte. `None` is returned for any value outside
  /// the alphabet.
  pub fn from_id(id: u8) -> Option<Tag> {
    Some(match id {
      0x00 => Self::Null,
      0x01 => Self::Bool,
      0x02 => Self::I8,
      0x03 => Self::Char,
      0x04 => Self::I16,
      0x05 => Self::I32,
      0x06 => Self::I64,
      0x07 => Self::F32,
      0x08 => Self::F64,
      0x09 => Self::Str,
      0x0a => Self::Uuid,
      0x0b => Self::Enum,
      0x0c => Self::Record,
      0x0d => Self::Interface,
      0x0e => Self::Array,
      0x0f => Self::List,
      0x10 => Self::Map,
      0x11 => Self::Optional,
      _ => return None,
    })
  }

  /// Returns the byte for this tag. This is used when writing a value.
  pub fn id(&self) -> u8 {
    match self {
      Self::Null => 0x00,
      Self::Bool => 0x01,
      Self::I8 => 0x02,
      Self::Char => 0x03,
      Self::I16 => 0x04,
      Self::I32 => 0x05,
      Self::I64 => 0x06,
      Self::F32 => 0x07,
      Self::F64 => 0x08,
      Self::Str => 0x09,
      Self::Uuid => 0x0a,
      Self::Enum => 0x0b,
      Self::Record => 0x0c,
      Self::Interface => 0x0d,
      Self::Array => 0x0e,
      Self::List => 0x0f,
      Self::Map => 0x10,
      Self::Optional => 0x11,
    }
  }
}

/// Encodes the number using zig zag encoding. See the [trait](ZigZag) docs
/// for more.
#[inline(always)]
pub fn zig<Z>(num: Z) -> Z::Unsigned
where
  Z: ZigZag,
{
  ZigZag::zig(num)
}

/// Decodes the number using zig zag encoding. See the [trait](ZigZag) docs
/// for more.
#[inline(always)]
pub fn zag<Z>(num: Z::Unsigned) -> Z
where
  Z: ZigZag,
{
  ZigZag::zag(num)
}

/// Encoding and decoding of negative numbers in a form that varint encoding
/// can keep small.
///
/// Zig-zag encoding works like so:
///
/// Original | Encoded
/// ---------|--------
/// 0        | 0
/// -1       | 1
/// 1        | 2
/// -2       | 3
///
/// Small positive and negative values both map to small unsigned values, and
/// therefore use fewer bytes in the buffer. The encoding function is
/// `(n << 1) ^ (n >> 63)`, where the arithmetic shift smears the sign over
/// all the bits. The decoding function is `(n >> 1) ^ -(n & 1)`.
pub trait ZigZag {
  /// The unsigned version of this number (`u32` if Self is `i32`, etc).
  type Unsigned;

  /// Encodes the number using zig zag encoding.
  fn zig(n: Self) -> Self::Unsigned;
  /// Decodes the number using zig zag encoding.
  fn zag(n: Self::Unsigned) -> Self;
}

macro_rules! zigzag_impl {
  ($signed: ty, $unsigned: ty, $shift: expr) => {
    impl ZigZag for $signed {
      type Unsigned = $unsigned;

      #[inline(always)]
      fn zig(n: $signed) -> $unsigned { ((n << 1) ^ (n >> $shift)) as $unsigned }
      #[inline(always)]
      fn zag(n: $unsigned) -> $signed { (n >> 1) as $signed ^ -((n & 1) as $signed) }
    }
  };
}

zigzag_impl!(i8, u8, 7);
zigzag_impl!(i16, u16, 15);
zigzag_impl!(i32, u32, 31);
zigzag_impl!(i64, u64, 63);
