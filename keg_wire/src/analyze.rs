//! Discovery of every user type reachable from a root declaration, and the
//! table that gives each one a stable ordinal.

use crate::{
  error::Result,
  evolve,
  schema::{FieldType, Schema},
  Tag, WireError,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// The immutable per-codec table of discovered types, in strict lexicographic
/// order of fully qualified name. The index of a type here is its ordinal.
/// Adding a new type to a declaration shifts ordinals, but fingerprints stay
/// stable per type, since they never involve ordinals.
#[derive(Debug)]
pub struct ClassTable {
  entries: Vec<ClassEntry>,
  index:   HashMap<&'static str, u32>,
}

/// One discovered type.
#[derive(Debug)]
pub struct ClassEntry {
  pub schema: &'static Schema,
  /// The wire tag: `Record` for records and record-only unions, `Enum` for
  /// enums and enum-only unions, `Interface` for mixed unions.
  pub tag: Tag,
  /// For records, the structural fingerprint over all components. 0 for
  /// enums and unions.
  pub fingerprint: u64,
  /// For records, the fingerprints of every component prefix: `prefixes[k]`
  /// covers the first `k` components, so the last entry equals
  /// `fingerprint`. This is how a reader recognises an older writer layout.
  pub prefixes: Vec<u64>,
  /// The ordinals a value at a position declared as this type may actually
  /// carry: the flattened concrete leaves for a union, the type itself
  /// otherwise. Sorted, for binary search.
  pub permits: Vec<u32>,
}

impl ClassEntry {
  pub fn name(&self) -> &'static str { self.schema.name() }

  pub fn allows(&self, ordinal: u32) -> bool { self.permits.binary_search(&ordinal).is_ok() }
}

impl ClassTable {
  /// Walks every type reachable from `root` and builds the table. This is
  /// the construction-time half of the codec; everything it computes is
  /// immutable afterwards.
  pub fn build(root: &'static Schema) -> Result<ClassTable> {
    let mut discovered: BTreeMap<&'static str, &'static Schema> = BTreeMap::new();
    let mut stack = vec![root];
    while let Some(schema) = stack.pop() {
      if let Some(prev) = discovered.get(schema.name()) {
        if !std::ptr::eq(*prev, schema) {
          return Err(WireError::InvalidType(format!(
            "two different types share the name `{}`",
            schema.name()
          )));
        }
        continue;
      }
      discovered.insert(schema.name(), schema);
      match schema {
        Schema::Record(rec) => {
          for comp in rec.components {
            walk_field(&comp.ty, Position::Component, &mut stack).map_err(|e| {
              WireError::InvalidType(format!("component `{}.{}`: {e}", rec.name, comp.name))
            })?;
          }
        }
        Schema::Enum(_) => {}
        Schema::Union(u) => {
          for permit in u.permits {
            stack.push(permit());
          }
        }
      }
    }

    // Classify before fingerprinting: a component's fingerprint tokens depend
    // on whether its target is a record, enum, or mixed union.
    let mut kinds: HashMap<&'static str, Tag> = HashMap::new();
    for (name, schema) in &discovered {
      kinds.insert(*name, classify(*schema, &discovered)?);
    }

    let mut entries = Vec::with_capacity(discovered.len());
    let mut index = HashMap::with_capacity(discovered.len());
    for (ordinal, (name, schema)) in discovered.iter().enumerate() {
      index.insert(*name, ordinal as u32);
      entries.push(ClassEntry {
        schema:      *schema,
        tag:         kinds[name],
        fingerprint: 0,
        prefixes:    vec![],
        permits:     vec![],
      });
    }
    for entry in &mut entries {
      match entry.schema {
        Schema::Record(rec) => {
          let (fingerprint, prefixes) = evolve::record_fingerprints(rec, &kinds)?;
          entry.fingerprint = fingerprint;
          entry.prefixes = prefixes;
          entry.permits = vec![index[entry.schema.name()]];
        }
        Schema::Enum(_) => entry.permits = vec![index[entry.schema.name()]],
        Schema::Union(_) => {
          let mut leaves = vec![];
          let mut seen = HashSet::new();
          flatten(entry.schema, &mut leaves, &mut seen);
          let mut permits: Vec<u32> = leaves.iter().map(|l| index[l.name()]).collect();
          permits.sort_unstable();
          permits.dedup();
          entry.permits = permits;
        }
      }
    }

    debug!("discovered {} user types from `{}`", entries.len(), root.name());
    Ok(ClassTable { entries, index })
  }

  /// The ordinal of the named type. Fails with
  /// [`UnknownType`](WireError::UnknownType) if it was never discovered.
  pub fn ordinal_of(&self, name: &str) -> Result<u32> {
    self.index.get(name).copied().ok_or_else(|| WireError::UnknownType(name.to_string()))
  }

  pub fn entry(&self, ordinal: u32) -> &ClassEntry { &self.entries[ordinal as usize] }

  pub fn len(&self) -> usize { self.entries.len() }
  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &ClassEntry> { self.entries.iter() }
}

/// Where a type tree node sits, for the placement rules: primitives are only
/// legal as a component's top level type or as a packed array element; map
/// keys must be nullable scalars or user types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
  Component,
  Element,
  Key,
  MapValue,
  Inner,
}

fn walk_field(
  ty: &FieldType,
  pos: Position,
  users: &mut Vec<&'static Schema>,
) -> Result<()> {
  match ty {
    FieldType::Primitive(_) => {
      if pos != Position::Component && pos != Position::Element {
        return Err(WireError::InvalidType(format!(
          "a primitive is not allowed in a {pos:?} position; use a nullable kind"
        )));
      }
    }
    FieldType::Ref(crate::schema::RefKind::User(f)) => users.push(f()),
    FieldType::Ref(_) => {}
    FieldType::Array(elem) | FieldType::List(elem) => {
      walk_field(elem, Position::Element, users)?
    }
    FieldType::Map(key, value) => {
      if !matches!(key, FieldType::Ref(_)) {
        return Err(WireError::InvalidType(
          "a map key must be a nullable scalar or user type".into(),
        ));
      }
      walk_field(key, Position::Key, users)?;
      walk_field(value, Position::MapValue, users)?;
    }
    FieldType::Optional(inner) => walk_field(inner, Position::Inner, users)?,
  }
  Ok(())
}

/// The wire tag for a discovered type. Unions are classified by their
/// flattened leaves: at least one record and at least one enum make an
/// `Interface`; all records make a `Record`; all enums make an `Enum`.
fn classify(
  schema: &'static Schema,
  discovered: &BTreeMap<&'static str, &'static Schema>,
) -> Result<Tag> {
  match schema {
    Schema::Record(_) => Ok(Tag::Record),
    Schema::Enum(_) => Ok(Tag::Enum),
    Schema::Union(u) => {
      let mut leaves = vec![];
      let mut seen = HashSet::new();
      flatten(schema, &mut leaves, &mut seen);
      if leaves.is_empty() {
        return Err(WireError::InvalidType(format!("union `{}` permits no concrete type", u.name)));
      }
      debug_assert!(leaves.iter().all(|l| discovered.contains_key(l.name())));
      let records = leaves.iter().any(|l| matches!(l, Schema::Record(_)));
      let enums = leaves.iter().any(|l| matches!(l, Schema::Enum(_)));
      Ok(match (records, enums) {
        (true, true) => Tag::Interface,
        (true, false) => Tag::Record,
        (false, true) => Tag::Enum,
        (false, false) => unreachable!("leaves are records or enums"),
      })
    }
  }
}

/// Collects the concrete leaves of a union, looking through nested unions.
fn flatten(
  schema: &'static Schema,
  leaves: &mut Vec<&'static Schema>,
  seen: &mut HashSet<&'static str>,
) {
  match schema {
    Schema::Record(_) | Schema::Enum(_) => leaves.push(schema),
    Schema::Union(u) => {
      if seen.insert(u.name) {
        for permit in u.permits {
          flatten(permit(), leaves, seen);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{
    Component, EnumSchema, FieldType, PrimKind, RecordSchema, RefKind, UnionSchema,
  };

  static COLOR: Schema = Schema::Enum(EnumSchema {
    name:      "paint::Color",
    constants: &["Red", "Green", "Blue"],
  });
  static SWATCH: Schema = Schema::Record(RecordSchema {
    name:       "paint::Swatch",
    components: &[
      Component { name: "label", ty: FieldType::Ref(RefKind::Str) },
      Component { name: "color", ty: FieldType::Ref(RefKind::User(|| &COLOR)) },
    ],
  });
  static BLEND: Schema = Schema::Record(RecordSchema {
    name:       "paint::Blend",
    components: &[Component {
      name: "parts",
      ty:   FieldType::Array(&FieldType::Ref(RefKind::User(|| &SAMPLE))),
    }],
  });
  static SAMPLE: Schema = Schema::Union(UnionSchema {
    name:    "paint::Sample",
    permits: &[|| &SWATCH, || &BLEND, || &COLOR],
  });

  #[test]
  fn lexicographic_ordinals() {
    let table = ClassTable::build(&SAMPLE).unwrap();
    let names: Vec<&str> = table.iter().map(|e| e.name()).collect();
    assert_eq!(names, ["paint::Blend", "paint::Color", "paint::Sample", "paint::Swatch"]);
    assert_eq!(table.ordinal_of("paint::Color").unwrap(), 1);
    assert!(matches!(
      table.ordinal_of("paint::Missing").unwrap_err(),
      WireError::UnknownType(_)
    ));
  }

  #[test]
  fn classification() {
    let table = ClassTable::build(&SAMPLE).unwrap();
    let sample = table.entry(table.ordinal_of("paint::Sample").unwrap());
    // Records and an enum in the permit set: a mixed union.
    assert_eq!(sample.tag, Tag::Interface);
    assert_eq!(sample.permits, [0, 1, 3]);
    assert!(sample.allows(0));
    assert!(!sample.allows(2)); // the union itself is not a permitted value

    let swatch = table.entry(table.ordinal_of("paint::Swatch").unwrap());
    assert_eq!(swatch.tag, Tag::Record);
    assert_eq!(swatch.permits, [3]);
  }

  #[test]
  fn record_fingerprints_present() {
    let table = ClassTable::build(&SAMPLE).unwrap();
    let swatch = table.entry(table.ordinal_of("paint::Swatch").unwrap());
    assert_ne!(swatch.fingerprint, 0);
    // One prefix per component count, 0..=n.
    assert_eq!(swatch.prefixes.len(), 3);
    assert_eq!(*swatch.prefixes.last().unwrap(), swatch.fingerprint);

    let color = table.entry(table.ordinal_of("paint::Color").unwrap());
    assert_eq!(color.fingerprint, 0);
  }

  #[test]
  fn rejects_primitive_map_keys() {
    static BAD: Schema = Schema::Record(RecordSchema {
      name:       "bad::Keyed",
      components: &[Component {
        name: "m",
        ty:   FieldType::Map(
          &FieldType::Primitive(PrimKind::I32),
          &FieldType::Ref(RefKind::Str),
        ),
      }],
    });
    assert!(matches!(ClassTable::build(&BAD).unwrap_err(), WireError::InvalidType(_)));
  }

  #[test]
  fn rejects_primitive_optionals() {
    static BAD: Schema = Schema::Record(RecordSchema {
      name:       "bad::Opt",
      components: &[Component {
        name: "o",
        ty:   FieldType::Optional(&FieldType::Primitive(PrimKind::I32)),
      }],
    });
    assert!(matches!(ClassTable::build(&BAD).unwrap_err(), WireError::InvalidType(_)));
  }

  #[test]
  fn rejects_empty_unions() {
    static EMPTY: Schema = Schema::Union(UnionSchema { name: "bad::Empty", permits: &[] });
    assert!(matches!(ClassTable::build(&EMPTY).unwrap_err(), WireError::InvalidType(_)));
  }

  #[test]
  fn recursive_declarations_terminate() {
    // A union that permits a record that refers back to the union.
    static NODE: Schema = Schema::Union(UnionSchema {
      name:    "tree::Node",
      permits: &[|| &FORK, || &TIP],
    });
    static FORK: Schema = Schema::Record(RecordSchema {
      name:       "tree::Fork",
      components: &[
        Component { name: "left", ty: FieldType::Ref(RefKind::User(|| &NODE)) },
        Component { name: "right", ty: FieldType::Ref(RefKind::User(|| &NODE)) },
      ],
    });
    static TIP: Schema = Schema::Enum(EnumSchema { name: "tree::Tip", constants: &["Tip"] });
    let table = ClassTable::build(&NODE).unwrap();
    assert_eq!(table.len(), 3);
    let node = table.entry(table.ordinal_of("tree::Node").unwrap());
    assert_eq!(node.tag, Tag::Interface);
  }
}
