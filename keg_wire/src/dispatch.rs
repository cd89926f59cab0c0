//! Dispatch over user types: records, enums, and sealed unions.
//!
//! A position declared as a user type always writes a tag, then the concrete
//! class name reference, then the payload. For unions the concrete class is
//! whatever the value carries, and the reader refuses any class outside the
//! declared permit set before constructing anything.

use crate::{
  build::{NodeCodec, SizeCtx},
  error::Result,
  evolve,
  read::ReadCtx,
  schema::{zero_value, Schema},
  value::{EnumValue, RecordValue, Value},
  varint,
  write::{class_ref_size_limit, WriteCtx},
  analyze::ClassTable,
  Tag, WireError,
};

/// Compiles the codec for a position declared as the given user type. The
/// declared type's wire tag and flattened permit set are resolved here, once.
pub(crate) fn user_codec(schema: &'static Schema, table: &ClassTable) -> Result<NodeCodec> {
  let ordinal = table.ordinal_of(schema.name())?;
  let entry = table.entry(ordinal);
  let wire_tag = entry.tag;
  let declared = schema.name();
  let permits = entry.permits.clone();
  let read_permits = permits.clone();
  Ok(NodeCodec {
    write: Box::new(move |ctx, v| write_user(ctx, declared, wire_tag, &permits, v)),
    read:  Box::new(move |ctx| read_user(ctx, declared, wire_tag, &read_permits)),
    size:  Box::new(move |ctx, v| size_user(ctx, v)),
  })
}

fn write_user(
  ctx: &mut WriteCtx,
  declared: &'static str,
  wire_tag: Tag,
  permits: &[u32],
  v: &Value,
) -> Result<()> {
  match v {
    Value::Null => ctx.put_tag(Tag::Null),
    Value::Record(rec) => {
      let ordinal = ctx.core.table.ordinal_of(rec.class)?;
      if permits.binary_search(&ordinal).is_err() {
        return Err(WireError::DisallowedType {
          class:    rec.class.into(),
          declared: declared.into(),
        });
      }
      ctx.put_tag(wire_tag)?;
      ctx.put_class_ref(rec.class)?;
      write_record_body(ctx, ordinal, rec)
    }
    Value::Enum(ev) => {
      let ordinal = ctx.core.table.ordinal_of(ev.class)?;
      if permits.binary_search(&ordinal).is_err() {
        return Err(WireError::DisallowedType {
          class:    ev.class.into(),
          declared: declared.into(),
        });
      }
      ctx.put_tag(wire_tag)?;
      ctx.put_class_ref(ev.class)?;
      varint::put(ctx.buf, i64::from(ev.ordinal))?;
      Ok(())
    }
    v => Err(WireError::InvalidType(format!("expected a `{declared}` value, got {v:?}"))),
  }
}

/// Reading a nullable user-typed position: null tag yields null, the
/// declared tag resolves the concrete class, validates it against the permit
/// set, and delegates. Anything else means the stream is corrupt.
fn read_user(
  ctx: &mut ReadCtx,
  declared: &'static str,
  wire_tag: Tag,
  permits: &[u32],
) -> Result<Value> {
  let tag = ctx.get_tag()?;
  if tag == Tag::Null {
    return Ok(Value::Null);
  }
  if tag != wire_tag {
    return Err(WireError::MalformedStream(format!(
      "expected {wire_tag:?} or Null, got {tag:?}"
    )));
  }
  let ordinal = ctx.get_class_ref()?;
  if permits.binary_search(&ordinal).is_err() {
    return Err(WireError::DisallowedType {
      class:    ctx.core.table.entry(ordinal).name().into(),
      declared: declared.into(),
    });
  }
  let core = ctx.core;
  let entry = core.table.entry(ordinal);
  match entry.schema {
    Schema::Record(_) => read_record_body(ctx, ordinal),
    Schema::Enum(e) => {
      let raw = varint::get(ctx.buf)?;
      let constant = u32::try_from(raw)
        .ok()
        .filter(|&c| (c as usize) < e.constants.len())
        .ok_or_else(|| {
          WireError::MalformedStream(format!(
            "constant ordinal {raw} out of range for `{}`",
            entry.name()
          ))
        })?;
      Ok(Value::Enum(EnumValue { class: entry.name(), ordinal: constant }))
    }
    // Permit sets only hold concrete leaves, so a union here means the
    // stream named one directly.
    Schema::Union(_) => Err(WireError::DisallowedType {
      class:    entry.name().into(),
      declared: declared.into(),
    }),
  }
}

fn size_user(ctx: &SizeCtx, v: &Value) -> Result<usize> {
  match v {
    Value::Null => Ok(1),
    Value::Record(rec) => {
      let ordinal = ctx.core.table.ordinal_of(rec.class)?;
      Ok(1 + class_ref_size_limit(rec.class) + size_record_body(ctx, ordinal, rec)?)
    }
    Value::Enum(ev) => {
      Ok(1 + class_ref_size_limit(ev.class) + varint::size_of(i64::from(ev.ordinal)))
    }
    v => Err(WireError::InvalidType(format!("expected a record or enum value, got {v:?}"))),
  }
}

/// Writes a record's fingerprint (when evolution is on) and its components,
/// in declaration order. No tag or name: the callers that need those write
/// them first.
pub(crate) fn write_record_body(
  ctx: &mut WriteCtx,
  ordinal: u32,
  rec: &RecordValue,
) -> Result<()> {
  let core = ctx.core;
  let entry = core.table.entry(ordinal);
  let chain = core.chain(ordinal)?;
  if rec.fields.len() != chain.fields.len() {
    return Err(WireError::InvalidType(format!(
      "`{}` declares {} components, the value carries {}",
      rec.class,
      chain.fields.len(),
      rec.fields.len()
    )));
  }
  if core.opts.evolution_enabled() {
    ctx.buf.put_u64(entry.fingerprint)?;
  }
  for (codec, field) in chain.fields.iter().zip(&rec.fields) {
    (codec.write)(ctx, field)?;
  }
  Ok(())
}

/// Reads a record's components. When evolution is on, the leading
/// fingerprint decides how many components the stream actually carries; the
/// rest are zero-filled, which is what the canonical constructor receives.
pub(crate) fn read_record_body(ctx: &mut ReadCtx, ordinal: u32) -> Result<Value> {
  let core = ctx.core;
  let entry = core.table.entry(ordinal);
  let chain = core.chain(ordinal)?;
  let rec = match entry.schema {
    Schema::Record(r) => r,
    _ => return Err(WireError::InvalidType(format!("`{}` is not a record", entry.name()))),
  };
  let total = chain.fields.len();
  let carried = if core.opts.evolution_enabled() {
    let stream = ctx.buf.get_u64()?;
    evolve::match_fingerprint(
      entry.name(),
      entry.fingerprint,
      &entry.prefixes,
      stream,
      core.opts.compatibility,
    )?
  } else {
    total
  };
  ctx.enter()?;
  let mut fields = Vec::with_capacity(total);
  for codec in chain.fields.iter().take(carried) {
    fields.push((codec.read)(ctx)?);
  }
  ctx.leave();
  for comp in rec.components.iter().skip(carried) {
    fields.push(zero_value(&comp.ty));
  }
  Ok(Value::Record(RecordValue { class: entry.name(), fields }))
}

/// Upper bound for a record body: fingerprint (when evolution is on) plus
/// every component.
pub(crate) fn size_record_body(
  ctx: &SizeCtx,
  ordinal: u32,
  rec: &RecordValue,
) -> Result<usize> {
  let chain = ctx.core.chain(ordinal)?;
  if rec.fields.len() != chain.fields.len() {
    return Err(WireError::InvalidType(format!(
      "`{}` declares {} components, the value carries {}",
      rec.class,
      chain.fields.len(),
      rec.fields.len()
    )));
  }
  let mut n = if ctx.core.opts.evolution_enabled() { 8 } else { 0 };
  for (codec, field) in chain.fields.iter().zip(&rec.fields) {
    n += (codec.size)(ctx, field)?;
  }
  Ok(n)
}
