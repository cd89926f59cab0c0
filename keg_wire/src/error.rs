use keg_common::{BufferError, Mode};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WireError>;

/// An error from building a codec, or from one serialize/deserialize call.
///
/// The codec attempts no recovery: every failure surfaces as one of these,
/// and the buffer's position is left at the point of failure so the caller
/// can inspect context.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WireError {
  /// The root, or a type reachable from it, is not usable: a union that
  /// permits nothing, a component type in an illegal position, or a
  /// duplicate class name. Also raised at write time for a value whose shape
  /// does not match its declared schema.
  #[error("invalid type: {0}")]
  InvalidType(String),

  /// The writer could not fit a byte. The caller can retry with a larger
  /// buffer.
  #[error("buffer overflow: {0}")]
  BufferOverflow(BufferError),

  /// The reader hit the buffer's limit mid-value: the stream is truncated.
  #[error("buffer underflow: {0}")]
  BufferUnderflow(BufferError),

  /// An invalid tag byte, a varint out of range, a bad length, invalid
  /// UTF-8, or any other corruption.
  #[error("malformed stream: {0}")]
  MalformedStream(String),

  /// A class name in the stream is not in the set of types reachable from
  /// the root. This usually means version skew between writer and reader.
  #[error("unknown type in stream: `{0}`")]
  UnknownType(String),

  /// A polymorphic value resolved to a class outside the declared union's
  /// permitted subtypes. This is a security boundary: the value is never
  /// constructed.
  #[error("type `{class}` is not permitted by `{declared}`")]
  DisallowedType { class: String, declared: String },

  /// The fingerprint in the stream does not match the reader's layout for
  /// the same record (and, under backwards compatibility, no older prefix
  /// layout matches either).
  #[error(
    "schema mismatch for `{class}`: stream fingerprint {stream:#018x}, expected {expected:#018x}"
  )]
  SchemaMismatch { class: String, stream: u64, expected: u64 },
}

impl From<BufferError> for WireError {
  fn from(e: BufferError) -> Self {
    match e.mode() {
      Mode::Reading => WireError::BufferUnderflow(e),
      Mode::Writing => WireError::BufferOverflow(e),
    }
  }
}
