//! The dynamic value tree that the compiled chains interpret, and the
//! [`Reflect`] trait that bridges host types to it.

use crate::{error::Result, schema::Schema, WireError};
use keg_common::Uuid;
use std::fmt;

/// A value of some declared type. The writer chains walk one of these; the
/// reader chains produce one.
///
/// `Null` is legal wherever the declared type is nullable (any
/// [`Ref`](crate::FieldType::Ref) or container position). `Char` is a single
/// UTF-16 code unit, matching its 2-byte wire form.
#[derive(Clone, PartialEq)]
pub enum Value {
  Null,
  Bool(bool),
  I8(i8),
  Char(u16),
  I16(i16),
  I32(i32),
  I64(i64),
  F32(f32),
  F64(f64),
  Str(String),
  Uuid(Uuid),
  Enum(EnumValue),
  Record(RecordValue),
  Array(Vec<Value>),
  List(Vec<Value>),
  /// Pairs in insertion order. The order is part of the value: it is what
  /// the writer emits and what the reader reconstructs.
  Map(Vec<(Value, Value)>),
  Opt(Option<Box<Value>>),
}

/// A constant of an enum class, by declaration-order ordinal.
#[derive(Clone, PartialEq, Eq)]
pub struct EnumValue {
  pub class:   &'static str,
  pub ordinal: u32,
}

/// An instance of a record class: its components, in declaration order.
#[derive(Clone, PartialEq)]
pub struct RecordValue {
  pub class:  &'static str,
  pub fields: Vec<Value>,
}

/// Connects a host type to its descriptor and to the dynamic value tree.
///
/// For records, `from_value` is the canonical positional constructor: it
/// always receives exactly one value per declared component (the codec fills
/// any components missing from an older stream with zero values first).
/// For unions, `from_value` dispatches on the concrete class name.
pub trait Reflect: Sized {
  fn schema() -> &'static Schema;
  fn to_value(&self) -> Value;
  fn from_value(v: Value) -> Result<Self>;
}

macro_rules! scalar_impl {
  ($variant: ident, $ty: ty, $into: ident) => {
    impl From<$ty> for Value {
      fn from(v: $ty) -> Value { Value::$variant(v) }
    }
    impl Value {
      pub fn $into(self) -> Result<$ty> {
        match self {
          Value::$variant(v) => Ok(v),
          v => Err(v.mismatch(stringify!($variant))),
        }
      }
    }
  };
}

scalar_impl!(Bool, bool, into_bool);
scalar_impl!(I8, i8, into_i8);
scalar_impl!(Char, u16, into_char);
scalar_impl!(I16, i16, into_i16);
scalar_impl!(I32, i32, into_i32);
scalar_impl!(I64, i64, into_i64);
scalar_impl!(F32, f32, into_f32);
scalar_impl!(F64, f64, into_f64);
scalar_impl!(Str, String, into_str);
scalar_impl!(Uuid, Uuid, into_uuid);

impl From<&str> for Value {
  fn from(v: &str) -> Value { Value::Str(v.into()) }
}

impl Value {
  fn mismatch(&self, expected: &str) -> WireError {
    WireError::InvalidType(format!("expected {expected}, got {self:?}"))
  }

  /// `None` for `Null`, `Some(self)` otherwise. The usual first step when
  /// converting a nullable component.
  pub fn nullable(self) -> Option<Value> {
    match self {
      Value::Null => None,
      v => Some(v),
    }
  }

  /// Wraps an optional host value as a nullable wire value.
  pub fn from_nullable(v: Option<impl Into<Value>>) -> Value {
    match v {
      Some(v) => v.into(),
      None => Value::Null,
    }
  }

  pub fn into_record(self) -> Result<RecordValue> {
    match self {
      Value::Record(r) => Ok(r),
      v => Err(v.mismatch("Record")),
    }
  }

  pub fn into_enum(self) -> Result<EnumValue> {
    match self {
      Value::Enum(e) => Ok(e),
      v => Err(v.mismatch("Enum")),
    }
  }

  pub fn into_array(self) -> Result<Vec<Value>> {
    match self {
      Value::Array(v) => Ok(v),
      v => Err(v.mismatch("Array")),
    }
  }

  pub fn into_list(self) -> Result<Vec<Value>> {
    match self {
      Value::List(v) => Ok(v),
      v => Err(v.mismatch("List")),
    }
  }

  pub fn into_map(self) -> Result<Vec<(Value, Value)>> {
    match self {
      Value::Map(v) => Ok(v),
      v => Err(v.mismatch("Map")),
    }
  }

  pub fn into_opt(self) -> Result<Option<Value>> {
    match self {
      Value::Opt(v) => Ok(v.map(|b| *b)),
      v => Err(v.mismatch("Optional")),
    }
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Null => write!(f, "Null"),
      Self::Bool(v) => write!(f, "Bool({v})"),
      Self::I8(v) => write!(f, "I8({v})"),
      Self::Char(v) => write!(f, "Char({v:#06x})"),
      Self::I16(v) => write!(f, "I16({v})"),
      Self::I32(v) => write!(f, "I32({v})"),
      Self::I64(v) => write!(f, "I64({v})"),
      Self::F32(v) => write!(f, "F32({v})"),
      Self::F64(v) => write!(f, "F64({v})"),
      Self::Str(v) => write!(f, "{v:?}"),
      Self::Uuid(v) => write!(f, "Uuid({v})"),
      Self::Enum(v) => v.fmt(f),
      Self::Record(v) => v.fmt(f),
      Self::Array(v) => f.debug_list().entries(v).finish(),
      Self::List(v) => f.debug_list().entries(v).finish(),
      Self::Map(v) => f.debug_map().entries(v.iter().map(|(k, v)| (k, v))).finish(),
      Self::Opt(None) => write!(f, "Empty"),
      Self::Opt(Some(v)) => write!(f, "Present({v:?})"),
    }
  }
}

impl fmt::Debug for EnumValue {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}#{}", crate::schema::simple_name(self.class), self.ordinal)
  }
}

impl fmt::Debug for RecordValue {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let mut tup = f.debug_tuple(crate::schema::simple_name(self.class));
    for field in &self.fields {
      tup.field(field);
    }
    tup.finish()
  }
}
