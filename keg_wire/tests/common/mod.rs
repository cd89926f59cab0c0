//! Declarations shared by the integration tests: a scalar-only record, a
//! recursive cons list over a mixed union, a record-only tree union, and a
//! kitchen-sink record that touches every type tree node.
#![allow(dead_code)]

use keg_wire::{
  error::Result,
  value::{EnumValue, RecordValue},
  Component, EnumSchema, FieldType, PrimKind, RecordSchema, RefKind, Reflect, Schema,
  UnionSchema, Uuid, Value,
};

pub static SIMPLE: Schema = Schema::Record(RecordSchema {
  name:       "demo::Simple",
  components: &[Component { name: "value", ty: FieldType::Ref(RefKind::I32) }],
});

#[derive(Debug, Clone, PartialEq)]
pub struct Simple {
  pub value: Option<i32>,
}

impl Reflect for Simple {
  fn schema() -> &'static Schema { &SIMPLE }

  fn to_value(&self) -> Value {
    Value::Record(RecordValue {
      class:  "demo::Simple",
      fields: vec![Value::from_nullable(self.value)],
    })
  }

  fn from_value(v: Value) -> Result<Self> {
    let rec = v.into_record()?;
    let mut fields = rec.fields.into_iter();
    let value = match fields.next() {
      Some(Value::Null) | None => None,
      Some(v) => Some(v.into_i32()?),
    };
    Ok(Simple { value })
  }
}

// A linked list: a union of one record and one terminator enum, so the union
// classifies as a mixed interface.
pub static LINK: Schema = Schema::Union(UnionSchema {
  name:    "demo::Link",
  permits: &[|| &CONS, || &NIL],
});
pub static CONS: Schema = Schema::Record(RecordSchema {
  name:       "demo::Cons",
  components: &[
    Component { name: "value", ty: FieldType::Ref(RefKind::I32) },
    Component { name: "next", ty: FieldType::Ref(RefKind::User(|| &LINK)) },
  ],
});
pub static NIL: Schema = Schema::Enum(EnumSchema { name: "demo::Nil", constants: &["Nil"] });

#[derive(Debug, Clone, PartialEq)]
pub enum Link {
  Node(Box<ConsCell>),
  Nil,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsCell {
  pub value: i32,
  pub next:  Link,
}

impl Link {
  pub fn node(value: i32, next: Link) -> Link {
    Link::Node(Box::new(ConsCell { value, next }))
  }
}

impl Reflect for Link {
  fn schema() -> &'static Schema { &LINK }

  fn to_value(&self) -> Value {
    match self {
      Link::Node(cell) => Value::Record(RecordValue {
        class:  "demo::Cons",
        fields: vec![Value::I32(cell.value), cell.next.to_value()],
      }),
      Link::Nil => Value::Enum(EnumValue { class: "demo::Nil", ordinal: 0 }),
    }
  }

  fn from_value(v: Value) -> Result<Self> {
    match v {
      Value::Record(rec) if rec.class == "demo::Cons" => {
        let mut fields = rec.fields.into_iter();
        let value = match fields.next() {
          Some(Value::Null) | None => 0,
          Some(v) => v.into_i32()?,
        };
        let next = match fields.next() {
          Some(Value::Null) | None => Link::Nil,
          Some(v) => Link::from_value(v)?,
        };
        Ok(Link::node(value, next))
      }
      Value::Enum(ev) if ev.class == "demo::Nil" => Ok(Link::Nil),
      v => Err(keg_wire::WireError::InvalidType(format!("not a demo::Link: {v:?}"))),
    }
  }
}

// A binary tree: a union of two records, so the union classifies as a
// record-only union and dispatches with the record tag.
pub static TREE: Schema = Schema::Union(UnionSchema {
  name:    "demo::TreeNode",
  permits: &[|| &INTERNAL, || &LEAF],
});
pub static INTERNAL: Schema = Schema::Record(RecordSchema {
  name:       "demo::Internal",
  components: &[
    Component { name: "name", ty: FieldType::Ref(RefKind::Str) },
    Component { name: "left", ty: FieldType::Ref(RefKind::User(|| &TREE)) },
    Component { name: "right", ty: FieldType::Ref(RefKind::User(|| &TREE)) },
  ],
});
pub static LEAF: Schema = Schema::Record(RecordSchema {
  name:       "demo::Leaf",
  components: &[Component { name: "value", ty: FieldType::Ref(RefKind::I32) }],
});

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
  Internal { name: String, left: Option<Box<TreeNode>>, right: Option<Box<TreeNode>> },
  Leaf(i32),
}

impl TreeNode {
  pub fn internal(
    name: &str,
    left: Option<TreeNode>,
    right: Option<TreeNode>,
  ) -> TreeNode {
    TreeNode::Internal {
      name:  name.into(),
      left:  left.map(Box::new),
      right: right.map(Box::new),
    }
  }
}

impl Reflect for TreeNode {
  fn schema() -> &'static Schema { &TREE }

  fn to_value(&self) -> Value {
    match self {
      TreeNode::Internal { name, left, right } => Value::Record(RecordValue {
        class:  "demo::Internal",
        fields: vec![
          Value::Str(name.clone()),
          match left {
            Some(n) => n.to_value(),
            None => Value::Null,
          },
          match right {
            Some(n) => n.to_value(),
            None => Value::Null,
          },
        ],
      }),
      TreeNode::Leaf(v) => Value::Record(RecordValue {
        class:  "demo::Leaf",
        fields: vec![Value::I32(*v)],
      }),
    }
  }

  fn from_value(v: Value) -> Result<Self> {
    let rec = v.into_record()?;
    match rec.class {
      "demo::Internal" => {
        let mut fields = rec.fields.into_iter();
        let name = match fields.next() {
          Some(Value::Null) | None => String::new(),
          Some(v) => v.into_str()?,
        };
        let left = match fields.next() {
          Some(Value::Null) | None => None,
          Some(v) => Some(Box::new(TreeNode::from_value(v)?)),
        };
        let right = match fields.next() {
          Some(Value::Null) | None => None,
          Some(v) => Some(Box::new(TreeNode::from_value(v)?)),
        };
        Ok(TreeNode::Internal { name, left, right })
      }
      "demo::Leaf" => {
        let mut fields = rec.fields.into_iter();
        let value = match fields.next() {
          Some(Value::Null) | None => 0,
          Some(v) => v.into_i32()?,
        };
        Ok(TreeNode::Leaf(value))
      }
      other => Err(keg_wire::WireError::InvalidType(format!("not a demo::TreeNode: {other}"))),
    }
  }
}

// Every type tree node in one record: bare primitives, nullable scalars, a
// packed primitive array, a list, an insertion-ordered map, and an optional.
pub static EVERYTHING: Schema = Schema::Record(RecordSchema {
  name:       "demo::Everything",
  components: &[
    Component { name: "flag", ty: FieldType::Primitive(PrimKind::Bool) },
    Component { name: "tiny", ty: FieldType::Primitive(PrimKind::I8) },
    Component { name: "glyph", ty: FieldType::Primitive(PrimKind::Char) },
    Component { name: "short", ty: FieldType::Primitive(PrimKind::I16) },
    Component { name: "count", ty: FieldType::Primitive(PrimKind::I32) },
    Component { name: "total", ty: FieldType::Primitive(PrimKind::I64) },
    Component { name: "ratio", ty: FieldType::Primitive(PrimKind::F32) },
    Component { name: "precise", ty: FieldType::Primitive(PrimKind::F64) },
    Component { name: "label", ty: FieldType::Ref(RefKind::Str) },
    Component { name: "id", ty: FieldType::Ref(RefKind::Uuid) },
    Component {
      name: "samples",
      ty:   FieldType::Array(&FieldType::Primitive(PrimKind::F64)),
    },
    Component { name: "names", ty: FieldType::List(&FieldType::Ref(RefKind::Str)) },
    Component {
      name: "attrs",
      ty:   FieldType::Map(&FieldType::Ref(RefKind::Str), &FieldType::Ref(RefKind::I32)),
    },
    Component {
      name: "nickname",
      ty:   FieldType::Optional(&FieldType::Ref(RefKind::Str)),
    },
  ],
});

#[derive(Debug, Clone, PartialEq)]
pub struct Everything {
  pub flag:     bool,
  pub tiny:     i8,
  pub glyph:    u16,
  pub short:    i16,
  pub count:    i32,
  pub total:    i64,
  pub ratio:    f32,
  pub precise:  f64,
  pub label:    Option<String>,
  pub id:       Option<Uuid>,
  pub samples:  Vec<f64>,
  pub names:    Vec<Option<String>>,
  pub attrs:    Vec<(String, i32)>,
  pub nickname: Option<String>,
}

impl Reflect for Everything {
  fn schema() -> &'static Schema { &EVERYTHING }

  fn to_value(&self) -> Value {
    Value::Record(RecordValue {
      class:  "demo::Everything",
      fields: vec![
        Value::Bool(self.flag),
        Value::I8(self.tiny),
        Value::Char(self.glyph),
        Value::I16(self.short),
        Value::I32(self.count),
        Value::I64(self.total),
        Value::F32(self.ratio),
        Value::F64(self.precise),
        Value::from_nullable(self.label.clone()),
        Value::from_nullable(self.id),
        Value::Array(self.samples.iter().map(|s| Value::F64(*s)).collect()),
        Value::List(self.names.iter().map(|n| Value::from_nullable(n.clone())).collect()),
        Value::Map(
          self
            .attrs
            .iter()
            .map(|(k, v)| (Value::Str(k.clone()), Value::I32(*v)))
            .collect(),
        ),
        Value::Opt(self.nickname.clone().map(|n| Box::new(Value::Str(n)))),
      ],
    })
  }

  fn from_value(v: Value) -> Result<Self> {
    let rec = v.into_record()?;
    let mut fields = rec.fields.into_iter();
    let mut next = || {
      fields
        .next()
        .ok_or_else(|| keg_wire::WireError::InvalidType("missing component".into()))
    };
    Ok(Everything {
      flag:     next()?.into_bool()?,
      tiny:     next()?.into_i8()?,
      glyph:    next()?.into_char()?,
      short:    next()?.into_i16()?,
      count:    next()?.into_i32()?,
      total:    next()?.into_i64()?,
      ratio:    next()?.into_f32()?,
      precise:  next()?.into_f64()?,
      label:    match next()?.nullable() {
        Some(v) => Some(v.into_str()?),
        None => None,
      },
      id:       match next()?.nullable() {
        Some(v) => Some(v.into_uuid()?),
        None => None,
      },
      samples:  next()?
        .into_array()?
        .into_iter()
        .map(Value::into_f64)
        .collect::<Result<Vec<f64>>>()?,
      names:    next()?
        .into_list()?
        .into_iter()
        .map(|v| match v.nullable() {
          Some(v) => v.into_str().map(Some),
          None => Ok(None),
        })
        .collect::<Result<Vec<Option<String>>>>()?,
      attrs:    next()?
        .into_map()?
        .into_iter()
        .map(|(k, v)| Ok((k.into_str()?, v.into_i32()?)))
        .collect::<Result<Vec<(String, i32)>>>()?,
      nickname: match next()?.into_opt()? {
        Some(v) => Some(v.into_str()?),
        None => None,
      },
    })
  }
}

impl Default for Everything {
  fn default() -> Everything {
    Everything {
      flag:     true,
      tiny:     -3,
      glyph:    0x2764,
      short:    -1000,
      count:    123456,
      total:    -9_876_543_210,
      ratio:    1.5,
      precise:  -2.25,
      label:    Some("hello".into()),
      id:       Some(Uuid::from_u128(0x123e4567e89b12d3a456426614174000)),
      samples:  vec![0.0, -1.5, 3.25],
      names:    vec![Some("a".into()), None, Some("b".into())],
      attrs:    vec![("z".into(), 26), ("a".into(), 1), ("m".into(), 13)],
      nickname: Some("kit".into()),
    }
  }
}

// For the permit-set security tests: a union of two records, plus a record
// that is reachable from the root but deliberately not permitted by the
// union.
pub static SHAPE: Schema = Schema::Union(UnionSchema {
  name:    "demo::Shape",
  permits: &[|| &CIRCLE, || &SQUARE],
});
pub static CIRCLE: Schema = Schema::Record(RecordSchema {
  name:       "demo::Circle",
  components: &[Component { name: "radius", ty: FieldType::Ref(RefKind::I32) }],
});
pub static SQUARE: Schema = Schema::Record(RecordSchema {
  name:       "demo::Square",
  components: &[Component { name: "side", ty: FieldType::Ref(RefKind::I32) }],
});
pub static STANDALONE: Schema = Schema::Record(RecordSchema {
  name:       "demo::Standalone",
  components: &[Component { name: "x", ty: FieldType::Ref(RefKind::I32) }],
});
pub static HOLDER: Schema = Schema::Record(RecordSchema {
  name:       "demo::Holder",
  components: &[
    Component { name: "shape", ty: FieldType::Ref(RefKind::User(|| &SHAPE)) },
    Component { name: "spare", ty: FieldType::Ref(RefKind::User(|| &STANDALONE)) },
  ],
});

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
  Circle(Option<i32>),
  Square(Option<i32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Holder {
  pub shape: Option<Shape>,
  pub spare: Option<i32>,
}

impl Reflect for Holder {
  fn schema() -> &'static Schema { &HOLDER }

  fn to_value(&self) -> Value {
    let shape = match &self.shape {
      None => Value::Null,
      Some(Shape::Circle(r)) => Value::Record(RecordValue {
        class:  "demo::Circle",
        fields: vec![Value::from_nullable(*r)],
      }),
      Some(Shape::Square(s)) => Value::Record(RecordValue {
        class:  "demo::Square",
        fields: vec![Value::from_nullable(*s)],
      }),
    };
    let spare = match self.spare {
      None => Value::Null,
      Some(x) => Value::Record(RecordValue {
        class:  "demo::Standalone",
        fields: vec![Value::from_nullable(Some(x))],
      }),
    };
    Value::Record(RecordValue { class: "demo::Holder", fields: vec![shape, spare] })
  }

  fn from_value(v: Value) -> Result<Self> {
    let rec = v.into_record()?;
    let mut fields = rec.fields.into_iter();
    let shape = match fields.next() {
      Some(Value::Null) | None => None,
      Some(v) => {
        let rec = v.into_record()?;
        let first = rec.fields.into_iter().next();
        let n = match first {
          Some(Value::Null) | None => None,
          Some(v) => Some(v.into_i32()?),
        };
        match rec.class {
          "demo::Circle" => Some(Shape::Circle(n)),
          "demo::Square" => Some(Shape::Square(n)),
          other => {
            return Err(keg_wire::WireError::InvalidType(format!("not a demo::Shape: {other}")))
          }
        }
      }
    };
    let spare = match fields.next() {
      Some(Value::Null) | None => None,
      Some(v) => {
        let rec = v.into_record()?;
        match rec.fields.into_iter().next() {
          Some(Value::Null) | None => None,
          Some(v) => Some(v.into_i32()?),
        }
      }
    };
    Ok(Holder { shape, spare })
  }
}
