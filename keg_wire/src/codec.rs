//! The public facade: one [`Codec`] per root type.

use crate::{
  build::{compile, Core, NodeCodec, SizeCtx},
  dispatch,
  error::Result,
  read::{ReadCtx, WireRead},
  schema::{FieldType, RefKind, Schema},
  value::{Reflect, Value},
  varint,
  write::{WireWrite, WriteCtx},
  Tag, WireError,
};
use keg_common::{Buffer, Compatibility, Config};
use std::marker::PhantomData;

/// Options a codec is built with. Writers and readers of the same streams
/// must use the same options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Options {
  pub compatibility: Compatibility,
  /// Write and check record fingerprints even under
  /// [`Strict`](Compatibility::Strict) matching. Implied by
  /// [`Backwards`](Compatibility::Backwards).
  pub evolution: bool,
}

impl Options {
  pub fn from_config(config: &Config) -> Options {
    Options { compatibility: config.compatibility(), evolution: false }
  }

  pub(crate) fn evolution_enabled(&self) -> bool {
    self.evolution || self.compatibility == Compatibility::Backwards
  }
}

/// A compiled codec for the root type `T`. Construction does all the work:
/// discovery, ordinal assignment, fingerprinting, and chain compilation.
/// After that the codec is immutable, so one instance can be shared freely
/// across threads; every call owns its own session state on the stack.
pub struct Codec<T> {
  core:    Core,
  root:    Root,
  _marker: PhantomData<fn() -> T>,
}

/// A root record is written bare (components only); any other root is
/// written as its tagged, class-named form.
enum Root {
  Record(u32),
  Node(NodeCodec),
}

/// One discovered type, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
  pub name:        &'static str,
  pub tag:         Tag,
  pub fingerprint: u64,
}

impl<T: Reflect> Codec<T> {
  /// Builds a codec with default options. Fails with
  /// [`InvalidType`](WireError::InvalidType) if the root declaration, or
  /// anything reachable from it, is unusable.
  pub fn for_root() -> Result<Codec<T>> { Self::with_options(Options::default()) }

  pub fn with_options(opts: Options) -> Result<Codec<T>> {
    let schema = T::schema();
    let core = Core::build(schema, opts)?;
    let root = match schema {
      Schema::Record(_) => Root::Record(core.table.ordinal_of(schema.name())?),
      _ => Root::Node(compile(&FieldType::Ref(RefKind::User(T::schema)), &core.table)?),
    };
    debug!(
      "codec for `{}`: {} user types, evolution {}",
      schema.name(),
      core.table.len(),
      if opts.evolution_enabled() { "on" } else { "off" }
    );
    Ok(Codec { core, root, _marker: PhantomData })
  }

  /// An upper bound on the bytes [`serialize`](Codec::serialize) will write
  /// for this value. Exact except for repeated class names, which are
  /// costed as if written in full every time.
  pub fn size_of(&self, value: &T) -> Result<usize> {
    let v = value.to_value();
    let ctx = SizeCtx { core: &self.core };
    match &self.root {
      Root::Record(ordinal) => dispatch::size_record_body(&ctx, *ordinal, &self.root_record(v)?),
      Root::Node(node) => (node.size)(&ctx, &v),
    }
  }

  /// Writes the value at the buffer's position and returns the number of
  /// bytes written. On failure the buffer is left positioned at the point
  /// of failure, with whatever partial bytes were already written.
  pub fn serialize<B>(&self, buf: &mut Buffer<B>, value: &T) -> Result<usize>
  where
    Buffer<B>: WireWrite,
  {
    let start = WireWrite::position(buf);
    let mut ctx = WriteCtx::new(buf, &self.core);
    let v = value.to_value();
    self.write_root(&mut ctx, &v)?;
    let end = ctx.buf.position();
    Ok(end - start)
  }

  /// Reads one value of the root type from the buffer's position.
  pub fn deserialize<B>(&self, buf: &mut Buffer<B>) -> Result<T>
  where
    Buffer<B>: WireRead,
  {
    let mut ctx = ReadCtx::new(buf, &self.core);
    let v = self.read_root(&mut ctx)?;
    T::from_value(v)
  }

  /// Writes a varint count and then each value, sharing one name interning
  /// session across the whole call, so repeated class names collapse to
  /// back-references across elements too.
  pub fn serialize_many<B>(&self, buf: &mut Buffer<B>, items: &[T]) -> Result<usize>
  where
    Buffer<B>: WireWrite,
  {
    let start = WireWrite::position(buf);
    let mut ctx = WriteCtx::new(buf, &self.core);
    varint::put(ctx.buf, items.len() as i64)?;
    for item in items {
      let v = item.to_value();
      self.write_root(&mut ctx, &v)?;
    }
    let end = ctx.buf.position();
    Ok(end - start)
  }

  /// The counterpart of [`serialize_many`](Codec::serialize_many).
  pub fn deserialize_many<B>(&self, buf: &mut Buffer<B>) -> Result<Vec<T>>
  where
    Buffer<B>: WireRead,
  {
    let mut ctx = ReadCtx::new(buf, &self.core);
    let len = varint::get_len(ctx.buf)?;
    let mut out = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
      let v = self.read_root(&mut ctx)?;
      out.push(T::from_value(v)?);
    }
    Ok(out)
  }

  /// The discovered types, in ordinal order.
  pub fn describe(&self) -> Vec<TypeInfo> {
    self
      .core
      .table
      .iter()
      .map(|e| TypeInfo { name: e.name(), tag: e.tag, fingerprint: e.fingerprint })
      .collect()
  }

  fn root_record(&self, v: Value) -> Result<crate::value::RecordValue> {
    let rec = v.into_record()?;
    let Root::Record(ordinal) = &self.root else {
      return Err(WireError::InvalidType("root is not a record".into()));
    };
    let expected = self.core.table.entry(*ordinal).name();
    if rec.class != expected {
      return Err(WireError::InvalidType(format!(
        "root value is `{}`, expected `{expected}`",
        rec.class
      )));
    }
    Ok(rec)
  }

  fn write_root(&self, ctx: &mut WriteCtx, v: &Value) -> Result<()> {
    match &self.root {
      Root::Record(ordinal) => match v {
        Value::Record(rec) => {
          let expected = self.core.table.entry(*ordinal).name();
          if rec.class != expected {
            return Err(WireError::InvalidType(format!(
              "root value is `{}`, expected `{expected}`",
              rec.class
            )));
          }
          dispatch::write_record_body(ctx, *ordinal, rec)
        }
        v => Err(WireError::InvalidType(format!("expected a record root, got {v:?}"))),
      },
      Root::Node(node) => (node.write)(ctx, v),
    }
  }

  fn read_root(&self, ctx: &mut ReadCtx) -> Result<Value> {
    match &self.root {
      Root::Record(ordinal) => dispatch::read_record_body(ctx, *ordinal),
      Root::Node(node) => (node.read)(ctx),
    }
  }
}
