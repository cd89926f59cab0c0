//! Compilation of a type tree into write/read/size chains.
//!
//! [`compile`] turns one [`FieldType`] node into a [`NodeCodec`]: three boxed
//! closures that write, read, and size a value of that type. Everything that
//! can be resolved at construction time (tags, ordinals, permit sets) is
//! captured inside the closures, so the hot path does no schema lookups. The
//! closures never capture the compiled core itself; recursion between types
//! flows through the per-call context, which carries a reference to it.

use crate::{
  analyze::ClassTable,
  codec::Options,
  dispatch,
  error::Result,
  read::ReadCtx,
  schema::{FieldType, PrimKind, RefKind, Schema},
  value::Value,
  varint,
  write::WriteCtx,
  Tag, WireError,
};

pub(crate) type WriteFn = Box<dyn Fn(&mut WriteCtx, &Value) -> Result<()> + Send + Sync>;
pub(crate) type ReadFn = Box<dyn Fn(&mut ReadCtx) -> Result<Value> + Send + Sync>;
pub(crate) type SizeFn = Box<dyn Fn(&SizeCtx, &Value) -> Result<usize> + Send + Sync>;

/// What the sizers get to see: just the compiled core. Sizing writes nothing
/// and needs no session state.
pub(crate) struct SizeCtx<'a> {
  pub(crate) core: &'a Core,
}

/// The compiled writer, reader, and sizer for one type tree node.
pub struct NodeCodec {
  pub(crate) write: WriteFn,
  pub(crate) read:  ReadFn,
  pub(crate) size:  SizeFn,
}

/// One compiled chain per record: a codec per component, in declaration
/// order.
pub(crate) struct RecordChain {
  pub(crate) fields: Vec<NodeCodec>,
}

/// Everything a codec owns after construction: the discovery table, one
/// chain per record, and the options. Immutable and shared by every call.
pub(crate) struct Core {
  pub(crate) table:  ClassTable,
  pub(crate) chains: Vec<Option<RecordChain>>,
  pub(crate) opts:   Options,
}

impl Core {
  pub(crate) fn build(root: &'static Schema, opts: Options) -> Result<Core> {
    let table = ClassTable::build(root)?;
    let mut chains = Vec::with_capacity(table.len());
    for entry in table.iter() {
      chains.push(match entry.schema {
        Schema::Record(rec) => {
          let mut fields = Vec::with_capacity(rec.components.len());
          for comp in rec.components {
            fields.push(compile(&comp.ty, &table)?);
          }
          Some(RecordChain { fields })
        }
        _ => None,
      });
    }
    Ok(Core { table, chains, opts })
  }

  pub(crate) fn chain(&self, ordinal: u32) -> Result<&RecordChain> {
    self.chains[ordinal as usize].as_ref().ok_or_else(|| {
      WireError::InvalidType(format!("`{}` is not a record", self.table.entry(ordinal).name()))
    })
  }
}

/// Compiles one type tree node. Called once per record component at
/// construction; the result is reused by every serialize/deserialize call.
pub(crate) fn compile(ty: &FieldType, table: &ClassTable) -> Result<NodeCodec> {
  Ok(match ty {
    FieldType::Primitive(p) => prim_codec(*p),
    FieldType::Ref(RefKind::User(f)) => dispatch::user_codec(f(), table)?,
    FieldType::Ref(k) => scalar_codec(*k),
    // A primitive element type makes this the packed fast path: one length
    // prefix, then fixed-width payloads with no per-element tags.
    FieldType::Array(elem) => seq_codec(Tag::Array, compile(elem, table)?),
    FieldType::List(elem) => seq_codec(Tag::List, compile(elem, table)?),
    FieldType::Map(key, value) => map_codec(compile(key, table)?, compile(value, table)?),
    FieldType::Optional(inner) => opt_codec(compile(inner, table)?),
  })
}

fn prim_codec(p: PrimKind) -> NodeCodec {
  NodeCodec {
    write: Box::new(move |ctx, v| write_prim(ctx, p, v)),
    read:  Box::new(move |ctx| read_prim(ctx, p)),
    size:  Box::new(move |_, _| Ok(prim_size(p))),
  }
}

fn write_prim(ctx: &mut WriteCtx, p: PrimKind, v: &Value) -> Result<()> {
  match (p, v) {
    (PrimKind::Bool, Value::Bool(b)) => ctx.buf.put_u8(*b as u8)?,
    (PrimKind::I8, Value::I8(n)) => ctx.buf.put_i8(*n)?,
    (PrimKind::Char, Value::Char(n)) => ctx.buf.put_u16(*n)?,
    (PrimKind::I16, Value::I16(n)) => ctx.buf.put_i16(*n)?,
    (PrimKind::I32, Value::I32(n)) => ctx.buf.put_i32(*n)?,
    (PrimKind::I64, Value::I64(n)) => ctx.buf.put_i64(*n)?,
    (PrimKind::F32, Value::F32(n)) => ctx.buf.put_f32(*n)?,
    (PrimKind::F64, Value::F64(n)) => ctx.buf.put_f64(*n)?,
    (p, v) => {
      return Err(WireError::InvalidType(format!("expected a {p:?} value, got {v:?}")))
    }
  }
  Ok(())
}

fn read_prim(ctx: &mut ReadCtx, p: PrimKind) -> Result<Value> {
  Ok(match p {
    PrimKind::Bool => match ctx.buf.get_u8()? {
      0 => Value::Bool(false),
      1 => Value::Bool(true),
      b => {
        return Err(WireError::MalformedStream(format!("boolean byte {b:#04x}")))
      }
    },
    PrimKind::I8 => Value::I8(ctx.buf.get_i8()?),
    PrimKind::Char => Value::Char(ctx.buf.get_u16()?),
    PrimKind::I16 => Value::I16(ctx.buf.get_i16()?),
    PrimKind::I32 => Value::I32(ctx.buf.get_i32()?),
    PrimKind::I64 => Value::I64(ctx.buf.get_i64()?),
    PrimKind::F32 => Value::F32(ctx.buf.get_f32()?),
    PrimKind::F64 => Value::F64(ctx.buf.get_f64()?),
  })
}

fn prim_size(p: PrimKind) -> usize {
  match p {
    PrimKind::Bool | PrimKind::I8 => 1,
    PrimKind::Char | PrimKind::I16 => 2,
    PrimKind::I32 | PrimKind::F32 => 4,
    PrimKind::I64 | PrimKind::F64 => 8,
  }
}

fn scalar_tag(k: &RefKind) -> Tag {
  match k {
    RefKind::Bool => Tag::Bool,
    RefKind::I8 => Tag::I8,
    RefKind::Char => Tag::Char,
    RefKind::I16 => Tag::I16,
    RefKind::I32 => Tag::I32,
    RefKind::I64 => Tag::I64,
    RefKind::F32 => Tag::F32,
    RefKind::F64 => Tag::F64,
    RefKind::Str => Tag::Str,
    RefKind::Uuid => Tag::Uuid,
    RefKind::User(_) => Tag::Record,
  }
}

/// A nullable scalar: a tag byte (or null), then the payload.
fn scalar_codec(k: RefKind) -> NodeCodec {
  let tag = scalar_tag(&k);
  NodeCodec {
    write: Box::new(move |ctx, v| match v {
      Value::Null => ctx.put_tag(Tag::Null),
      v => {
        ctx.put_tag(tag)?;
        write_scalar_payload(ctx, k, v)
      }
    }),
    read:  Box::new(move |ctx| {
      let got = ctx.get_tag()?;
      if got == Tag::Null {
        return Ok(Value::Null);
      }
      if got != tag {
        return Err(WireError::MalformedStream(format!("expected {tag:?} or Null, got {got:?}")));
      }
      read_scalar_payload(ctx, k)
    }),
    size:  Box::new(move |_, v| size_scalar(k, v)),
  }
}

fn write_scalar_payload(ctx: &mut WriteCtx, k: RefKind, v: &Value) -> Result<()> {
  match (k, v) {
    (RefKind::Bool, Value::Bool(b)) => ctx.buf.put_u8(*b as u8)?,
    (RefKind::I8, Value::I8(n)) => ctx.buf.put_i8(*n)?,
    (RefKind::Char, Value::Char(n)) => ctx.buf.put_u16(*n)?,
    (RefKind::I16, Value::I16(n)) => ctx.buf.put_i16(*n)?,
    (RefKind::I32, Value::I32(n)) => {
      varint::put(ctx.buf, i64::from(*n))?;
    }
    (RefKind::I64, Value::I64(n)) => {
      varint::put(ctx.buf, *n)?;
    }
    (RefKind::F32, Value::F32(n)) => ctx.buf.put_f32(*n)?,
    (RefKind::F64, Value::F64(n)) => ctx.buf.put_f64(*n)?,
    (RefKind::Str, Value::Str(s)) => {
      varint::put(ctx.buf, s.len() as i64)?;
      ctx.buf.put_bytes(s.as_bytes())?;
    }
    (RefKind::Uuid, Value::Uuid(id)) => {
      ctx.buf.put_u64(id.msb())?;
      ctx.buf.put_u64(id.lsb())?;
    }
    (k, v) => {
      return Err(WireError::InvalidType(format!("expected a {k:?} value, got {v:?}")))
    }
  }
  Ok(())
}

fn read_scalar_payload(ctx: &mut ReadCtx, k: RefKind) -> Result<Value> {
  Ok(match k {
    RefKind::Bool => match ctx.buf.get_u8()? {
      0 => Value::Bool(false),
      1 => Value::Bool(true),
      b => {
        return Err(WireError::MalformedStream(format!("boolean byte {b:#04x}")))
      }
    },
    RefKind::I8 => Value::I8(ctx.buf.get_i8()?),
    RefKind::Char => Value::Char(ctx.buf.get_u16()?),
    RefKind::I16 => Value::I16(ctx.buf.get_i16()?),
    RefKind::I32 => Value::I32(varint::get_i32(ctx.buf)?),
    RefKind::I64 => Value::I64(varint::get(ctx.buf)?),
    RefKind::F32 => Value::F32(ctx.buf.get_f32()?),
    RefKind::F64 => Value::F64(ctx.buf.get_f64()?),
    RefKind::Str => {
      let len = varint::get_len(ctx.buf)?;
      let bytes = ctx.buf.get_bytes(len)?;
      Value::Str(String::from_utf8(bytes).map_err(|e| {
        WireError::MalformedStream(format!("string is not UTF-8: {e}"))
      })?)
    }
    RefKind::Uuid => {
      let msb = ctx.buf.get_u64()?;
      let lsb = ctx.buf.get_u64()?;
      Value::Uuid(keg_common::Uuid::from_parts(msb, lsb))
    }
    RefKind::User(_) => {
      return Err(WireError::InvalidType("user types do not take the scalar path".into()))
    }
  })
}

fn size_scalar(k: RefKind, v: &Value) -> Result<usize> {
  Ok(match (k, v) {
    (_, Value::Null) => 1,
    (RefKind::Bool, _) | (RefKind::I8, _) => 2,
    (RefKind::Char, _) | (RefKind::I16, _) => 3,
    (RefKind::I32, Value::I32(n)) => 1 + varint::size_of(i64::from(*n)),
    (RefKind::I64, Value::I64(n)) => 1 + varint::size_of(*n),
    (RefKind::F32, _) => 5,
    (RefKind::F64, _) => 9,
    (RefKind::Str, Value::Str(s)) => 1 + varint::size_of(s.len() as i64) + s.len(),
    (RefKind::Uuid, _) => 17,
    (k, v) => {
      return Err(WireError::InvalidType(format!("expected a {k:?} value, got {v:?}")))
    }
  })
}

/// Arrays and lists: a tag, a varint length, then the elements. The element
/// codec decides whether the payload is packed (primitives) or per-element
/// tagged (everything else).
fn seq_codec(tag: Tag, elem: NodeCodec) -> NodeCodec {
  let NodeCodec { write: elem_write, read: elem_read, size: elem_size } = elem;
  NodeCodec {
    write: Box::new(move |ctx, v| {
      let items = match (tag, v) {
        (_, Value::Null) => return ctx.put_tag(Tag::Null),
        (Tag::Array, Value::Array(items)) => items,
        (Tag::List, Value::List(items)) => items,
        (_, v) => {
          return Err(WireError::InvalidType(format!("expected a {tag:?} value, got {v:?}")))
        }
      };
      ctx.put_tag(tag)?;
      varint::put(ctx.buf, items.len() as i64)?;
      for item in items {
        elem_write(ctx, item)?;
      }
      Ok(())
    }),
    read:  Box::new(move |ctx| {
      let got = ctx.get_tag()?;
      if got == Tag::Null {
        return Ok(Value::Null);
      }
      if got != tag {
        return Err(WireError::MalformedStream(format!("expected {tag:?} or Null, got {got:?}")));
      }
      let len = varint::get_len(ctx.buf)?;
      ctx.enter()?;
      let mut items = Vec::with_capacity(len.min(4096));
      for _ in 0..len {
        items.push(elem_read(ctx)?);
      }
      ctx.leave();
      Ok(match tag {
        Tag::Array => Value::Array(items),
        _ => Value::List(items),
      })
    }),
    size:  Box::new(move |ctx, v| match v {
      Value::Null => Ok(1),
      Value::Array(items) | Value::List(items) => {
        let mut n = 1 + varint::size_of(items.len() as i64);
        for item in items {
          n += elem_size(ctx, item)?;
        }
        Ok(n)
      }
      v => Err(WireError::InvalidType(format!("expected a {tag:?} value, got {v:?}"))),
    }),
  }
}

/// Maps: a tag, a varint pair count, then key/value pairs in the order the
/// value carries them. The reader keeps that order.
fn map_codec(key: NodeCodec, value: NodeCodec) -> NodeCodec {
  let NodeCodec { write: key_write, read: key_read, size: key_size } = key;
  let NodeCodec { write: val_write, read: val_read, size: val_size } = value;
  NodeCodec {
    write: Box::new(move |ctx, v| {
      let pairs = match v {
        Value::Null => return ctx.put_tag(Tag::Null),
        Value::Map(pairs) => pairs,
        v => return Err(WireError::InvalidType(format!("expected a Map value, got {v:?}"))),
      };
      ctx.put_tag(Tag::Map)?;
      varint::put(ctx.buf, pairs.len() as i64)?;
      for (k, v) in pairs {
        key_write(ctx, k)?;
        val_write(ctx, v)?;
      }
      Ok(())
    }),
    read:  Box::new(move |ctx| {
      let got = ctx.get_tag()?;
      if got == Tag::Null {
        return Ok(Value::Null);
      }
      if got != Tag::Map {
        return Err(WireError::MalformedStream(format!("expected Map or Null, got {got:?}")));
      }
      let len = varint::get_len(ctx.buf)?;
      ctx.enter()?;
      let mut pairs = Vec::with_capacity(len.min(4096));
      for _ in 0..len {
        let k = key_read(ctx)?;
        let v = val_read(ctx)?;
        pairs.push((k, v));
      }
      ctx.leave();
      Ok(Value::Map(pairs))
    }),
    size:  Box::new(move |ctx, v| match v {
      Value::Null => Ok(1),
      Value::Map(pairs) => {
        let mut n = 1 + varint::size_of(pairs.len() as i64);
        for (k, v) in pairs {
          n += key_size(ctx, k)?;
          n += val_size(ctx, v)?;
        }
        Ok(n)
      }
      v => Err(WireError::InvalidType(format!("expected a Map value, got {v:?}"))),
    }),
  }
}

/// Optionals: a tag, then one presence byte, then the value when present.
/// The outer tag comes before any inner length.
fn opt_codec(inner: NodeCodec) -> NodeCodec {
  let NodeCodec { write: inner_write, read: inner_read, size: inner_size } = inner;
  NodeCodec {
    write: Box::new(move |ctx, v| match v {
      Value::Null => ctx.put_tag(Tag::Null),
      Value::Opt(None) => {
        ctx.put_tag(Tag::Optional)?;
        ctx.buf.put_u8(0x00)?;
        Ok(())
      }
      Value::Opt(Some(v)) => {
        ctx.put_tag(Tag::Optional)?;
        ctx.buf.put_u8(0x01)?;
        inner_write(ctx, v)
      }
      v => Err(WireError::InvalidType(format!("expected an Optional value, got {v:?}"))),
    }),
    read:  Box::new(move |ctx| {
      let got = ctx.get_tag()?;
      if got == Tag::Null {
        return Ok(Value::Null);
      }
      if got != Tag::Optional {
        return Err(WireError::MalformedStream(format!("expected Optional or Null, got {got:?}")));
      }
      match ctx.buf.get_u8()? {
        0x00 => Ok(Value::Opt(None)),
        0x01 => {
          ctx.enter()?;
          let v = inner_read(ctx)?;
          ctx.leave();
          Ok(Value::Opt(Some(Box::new(v))))
        }
        b => Err(WireError::MalformedStream(format!("optional presence byte {b:#04x}"))),
      }
    }),
    size:  Box::new(move |ctx, v| match v {
      Value::Null => Ok(1),
      Value::Opt(None) => Ok(2),
      Value::Opt(Some(v)) => Ok(2 + inner_size(ctx, v)?),
      v => Err(WireError::InvalidType(format!("expected an Optional value, got {v:?}"))),
    }),
  }
}
