// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Closure properties over a small geometry schema: stability, read-closure
//! monotonicity, and the instantiation policy for abstract supertypes.
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use serial_oracle::{
    Classification, Direction, FieldSerializerModel, Schema, SerializableTypeOracle,
    SerializableTypeOracleUnion, SubtypeIndex, SubtypeRegistry, TypeOracleBuilder, TypeRef,
};

const SCHEMA: &str = r#"{
    "schemaVersion": "serial-schema/v1",
    "types": [
        { "name": "geo.Point", "kind": "class",
          "fields": [ { "name": "x", "type": "int" }, { "name": "y", "type": "int" } ] },
        { "name": "geo.Shape", "kind": "class", "abstract": true,
          "fields": [ { "name": "name", "type": "String" }, { "name": "origin", "type": "geo.Point" } ] },
        { "name": "geo.Circle", "kind": "class", "superclass": "geo.Shape",
          "fields": [ { "name": "radius", "type": "double" } ] },
        { "name": "geo.Square", "kind": "class", "superclass": "geo.Shape",
          "fields": [ { "name": "side", "type": "int" } ] },
        { "name": "geo.Canvas", "kind": "class",
          "fields": [ { "name": "shapes", "type": "geo.Shape[]" }, { "name": "tint", "type": "geo.Tint" } ] },
        { "name": "geo.Tint", "kind": "enum", "values": ["LIGHT", "DARK"] },
        { "name": "geo.Holder", "kind": "class",
          "fields": [ { "name": "shape", "type": "geo.Shape" } ] }
    ]
}"#;

const ROOTS: [&str; 6] = [
    "geo.Point",
    "geo.Shape",
    "geo.Canvas",
    "geo.Holder",
    "geo.Tint",
    "long[]",
];

fn schema() -> Schema {
    Schema::from_json(SCHEMA).unwrap()
}

fn index_for(schema: &Schema, names: &[&str]) -> SubtypeIndex {
    let mut reg = SubtypeRegistry::new();
    for name in names {
        reg.insert(*name);
    }
    reg.subtype_index(schema)
}

fn full_index(schema: &Schema) -> SubtypeIndex {
    let mut reg = SubtypeRegistry::new();
    reg.merge_discovered(schema);
    reg.subtype_index(schema)
}

fn close(
    schema: &Schema,
    index: &SubtypeIndex,
    direction: Direction,
    roots: &[&str],
) -> SerializableTypeOracle {
    let mut builder = TypeOracleBuilder::new(schema, index, direction);
    builder.add_roots(roots.iter().map(|r| TypeRef::parse(r).unwrap()));
    builder.build().oracle
}

fn rendered(oracle: &SerializableTypeOracle) -> Vec<String> {
    oracle.types().map(ToString::to_string).collect()
}

#[test]
fn shape_root_reads_every_known_subtype() {
    let schema = schema();
    let index = full_index(&schema);
    let oracle = close(&schema, &index, Direction::Read, &["geo.Shape"]);
    for name in ["geo.Shape", "geo.Circle", "geo.Square", "geo.Point"] {
        assert!(oracle.is_serializable(&TypeRef::declared(name)), "{name}");
    }
}

#[test]
fn abstract_field_type_is_read_only_superclass() {
    let schema = schema();
    let index = full_index(&schema);
    let read = close(&schema, &index, Direction::Read, &["geo.Holder"]);
    let write = close(&schema, &index, Direction::Write, &[]);
    let union = SerializableTypeOracleUnion::new(read, write);
    assert_eq!(
        union.classify(&TypeRef::declared("geo.Shape")),
        Some(Classification::ReadOnlySuperclass)
    );
    assert_eq!(
        union.classify(&TypeRef::declared("geo.Circle")),
        Some(Classification::ReadOnlyInstantiate)
    );
    assert_eq!(union.classify(&TypeRef::declared("geo.Canvas")), None);
}

#[test]
fn union_classifies_both_directions() {
    let schema = schema();
    let index = full_index(&schema);
    let read = close(&schema, &index, Direction::Read, &["geo.Point"]);
    let write = close(&schema, &index, Direction::Write, &["geo.Canvas"]);
    let union = SerializableTypeOracleUnion::new(read, write);
    assert_eq!(
        union.classify(&TypeRef::declared("geo.Point")),
        Some(Classification::Both)
    );
    assert_eq!(
        union.classify(&TypeRef::declared("geo.Shape")),
        Some(Classification::WriteOnly)
    );
    assert_eq!(
        union.classify(&TypeRef::declared("geo.Tint")),
        Some(Classification::WriteOnly)
    );
    let all = union.serializable_types();
    let mut sorted = all.clone();
    sorted.sort();
    assert_eq!(all, sorted);
}

#[test]
fn subclass_model_chains_serializable_superclass() {
    let schema = schema();
    let index = full_index(&schema);
    let read = close(&schema, &index, Direction::Read, &["geo.Shape"]);
    let write = close(&schema, &index, Direction::Write, &[]);
    let union = SerializableTypeOracleUnion::new(read, write);
    let circle = FieldSerializerModel::create(&schema, &union, "geo.Circle").unwrap();
    assert_eq!(circle.superclass.as_deref(), Some("geo.Shape"));
    let names: Vec<_> = circle.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["radius"]);
}

#[test]
fn registry_round_trip_preserves_closure() {
    let schema = schema();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(serial_oracle::KNOWN_TYPES_FILENAME);

    let mut first = SubtypeRegistry::load(&path).unwrap();
    first.merge_discovered(&schema);
    first.persist(&path).unwrap();

    // A later incremental round sees no declarations of its own.
    let second = SubtypeRegistry::load(&path).unwrap();
    assert_eq!(second, first);
    let a = close(&schema, &first.subtype_index(&schema), Direction::Read, &ROOTS);
    let b = close(&schema, &second.subtype_index(&schema), Direction::Read, &ROOTS);
    assert_eq!(rendered(&a), rendered(&b));
}

fn subset<'a>(items: &[&'a str], mask: u32) -> Vec<&'a str> {
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, s)| *s)
        .collect()
}

const KNOWN: [&str; 7] = [
    "geo.Point",
    "geo.Shape",
    "geo.Circle",
    "geo.Square",
    "geo.Canvas",
    "geo.Tint",
    "geo.Holder",
];

proptest! {
    #[test]
    fn closure_is_stable(roots in 0u32..64, known in 0u32..128, write in any::<bool>()) {
        let schema = schema();
        let index = index_for(&schema, &subset(&KNOWN, known));
        let roots = subset(&ROOTS, roots);
        let direction = if write { Direction::Write } else { Direction::Read };
        let first = close(&schema, &index, direction, &roots);
        let second = close(&schema, &index, direction, &roots);
        prop_assert_eq!(rendered(&first), rendered(&second));
    }

    #[test]
    fn read_closure_is_monotonic(
        roots in 0u32..64,
        extra_roots in 0u32..64,
        known in 0u32..128,
        extra_known in 0u32..128,
    ) {
        let schema = schema();
        let small_roots = subset(&ROOTS, roots);
        let big_roots = subset(&ROOTS, roots | extra_roots);
        let small_index = index_for(&schema, &subset(&KNOWN, known));
        let big_index = index_for(&schema, &subset(&KNOWN, known | extra_known));

        let small = close(&schema, &small_index, Direction::Read, &small_roots);
        let big = close(&schema, &big_index, Direction::Read, &big_roots);
        for ty in small.types() {
            prop_assert!(big.is_serializable(ty), "{} dropped", ty);
        }
    }
}
