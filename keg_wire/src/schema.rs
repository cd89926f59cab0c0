//! Descriptors for user-declared types, and the recursive type tree that
//! describes every supported component type.
//!
//! Descriptors are plain `static` data. Links between user types are
//! `fn() -> &'static Schema` pointers, so mutually recursive declarations
//! (a record whose component is the union that permits it) work without any
//! registration step:
//!
//! ```
//! use keg_wire::{Component, FieldType, PrimKind, RecordSchema, Schema};
//!
//! static POINT: Schema = Schema::Record(RecordSchema {
//!   name:       "geo::Point",
//!   components: &[
//!     Component { name: "x", ty: FieldType::Primitive(PrimKind::F64) },
//!     Component { name: "y", ty: FieldType::Primitive(PrimKind::F64) },
//!   ],
//! });
//! ```

use crate::value::Value;

/// A non-nullable scalar. Only legal as a record component's top level type,
/// or as an array/list element (the packed fast path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimKind {
  Bool,
  I8,
  /// A single UTF-16 code unit.
  Char,
  I16,
  I32,
  I64,
  F32,
  F64,
}

/// A link to another user type's descriptor. A plain function pointer, so it
/// is const-constructible and breaks declaration cycles.
pub type SchemaRef = fn() -> &'static Schema;

/// A nullable scalar or user type.
#[derive(Debug, Clone, Copy)]
pub enum RefKind {
  Bool,
  I8,
  Char,
  I16,
  I32,
  I64,
  F32,
  F64,
  Str,
  Uuid,
  /// A record, enum, or sealed union declared by the user.
  User(SchemaRef),
}

/// The recursive type tree. One of these describes the declared type of each
/// record component.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
  Primitive(PrimKind),
  Ref(RefKind),
  /// Ordered, length-prefixed, homogeneous sequence.
  Array(&'static FieldType),
  /// Same wire shape as `Array`; decoded as a semantic immutable sequence.
  List(&'static FieldType),
  /// Key-value pairs; iteration order is preserved on read.
  Map(&'static FieldType, &'static FieldType),
  /// Zero- or one-element container.
  Optional(&'static FieldType),
}

/// One named, typed component of a record.
#[derive(Debug)]
pub struct Component {
  pub name: &'static str,
  pub ty:   FieldType,
}

/// An immutable product type: an ordered list of named, typed components and
/// one canonical positional constructor (the type's
/// [`from_value`](crate::Reflect::from_value)).
#[derive(Debug)]
pub struct RecordSchema {
  /// The fully qualified name, e.g. `"geo::Point"`. This is what travels on
  /// the wire; it must be unique within one codec.
  pub name:       &'static str,
  pub components: &'static [Component],
}

/// A closed set of named constants, in declaration order. Enums may carry
/// extra host-side fields, but only the constant's ordinal travels.
#[derive(Debug)]
pub struct EnumSchema {
  pub name:      &'static str,
  pub constants: &'static [&'static str],
}

/// A sealed union: the complete set of permitted subtypes is known at
/// declaration site. Permits may name records, enums, or further unions;
/// nested unions are flattened to their concrete leaves during analysis.
#[derive(Debug)]
pub struct UnionSchema {
  pub name:    &'static str,
  pub permits: &'static [SchemaRef],
}

/// A user-declared type.
#[derive(Debug)]
pub enum Schema {
  Record(RecordSchema),
  Enum(EnumSchema),
  Union(UnionSchema),
}

impl Schema {
  pub fn name(&self) -> &'static str {
    match self {
      Schema::Record(r) => r.name,
      Schema::Enum(e) => e.name,
      Schema::Union(u) => u.name,
    }
  }

  /// The last segment of the fully qualified name.
  pub fn simple_name(&self) -> &'static str { simple_name(self.name()) }
}

pub fn simple_name(name: &str) -> &str { name.rsplit("::").next().unwrap_or(name) }

/// The zero of a declared type: what a canonical constructor receives for a
/// component the stream did not carry. Numbers are 0, booleans false,
/// nullable positions null, and containers empty.
pub fn zero_value(ty: &FieldType) -> Value {
  match ty {
    FieldType::Primitive(p) => match p {
      PrimKind::Bool => Value::Bool(false),
      PrimKind::I8 => Value::I8(0),
      PrimKind::Char => Value::Char(0),
      PrimKind::I16 => Value::I16(0),
      PrimKind::I32 => Value::I32(0),
      PrimKind::I64 => Value::I64(0),
      PrimKind::F32 => Value::F32(0.0),
      PrimKind::F64 => Value::F64(0.0),
    },
    FieldType::Ref(_) => Value::Null,
    FieldType::Array(_) => Value::Array(vec![]),
    FieldType::List(_) => Value::List(vec![]),
    FieldType::Map(_, _) => Value::Map(vec![]),
    FieldType::Optional(_) => Value::Opt(None),
  }
}
