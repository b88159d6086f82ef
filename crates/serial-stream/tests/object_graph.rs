// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Object-table behavior with hand-written field serializers: round trips,
//! shared references, cycles, deep chains, string dedup, truncation, and
//! dispatch errors.
#![allow(clippy::unwrap_used)]

use std::any::Any;

use serial_stream::{
    borrow_as, downcast_mut, downcast_ref, new_object, same_object, FieldSerializer, ObjectRef,
    Reader, SerializationError, SerializerTable, WireObject, Writer, HEADER_LEN, MAX_OBJECT_DEPTH,
};

const POINT: &str = "geo.Point";
const NODE: &str = "geo.Node";
const SHAPE: &str = "geo.Shape";
const LABEL: &str = "geo.Label";

#[derive(Debug, Default, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Default)]
struct Node {
    label: String,
    next: Option<ObjectRef>,
}

/// Stands in for an abstract type: registered, but never instantiated.
#[derive(Default)]
struct Shape;

#[derive(Default)]
struct Label {
    a: String,
    b: String,
}

macro_rules! wire_object {
    ($ty:ty, $sig:expr) => {
        impl WireObject for $ty {
            fn type_signature(&self) -> &'static str {
                $sig
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

wire_object!(Point, POINT);
wire_object!(Node, NODE);
wire_object!(Shape, SHAPE);
wire_object!(Label, LABEL);

fn serialize_point(w: &mut Writer<'_>, o: &dyn WireObject) -> Result<(), SerializationError> {
    let p = downcast_ref::<Point>(o, POINT)?;
    w.write_int(p.x);
    w.write_int(p.y);
    Ok(())
}

fn deserialize_point(r: &mut Reader<'_>, o: &mut dyn WireObject) -> Result<(), SerializationError> {
    let p = downcast_mut::<Point>(o, POINT)?;
    p.x = r.read_int().map_err(|e| e.in_field(POINT, "x"))?;
    p.y = r.read_int().map_err(|e| e.in_field(POINT, "y"))?;
    Ok(())
}

fn instantiate_point(_: &mut Reader<'_>) -> Result<ObjectRef, SerializationError> {
    Ok(new_object(Point::default()))
}

fn serialize_node(w: &mut Writer<'_>, o: &dyn WireObject) -> Result<(), SerializationError> {
    let n = downcast_ref::<Node>(o, NODE)?;
    w.write_string(&n.label)?;
    w.write_object(n.next.as_ref())
}

fn deserialize_node(r: &mut Reader<'_>, o: &mut dyn WireObject) -> Result<(), SerializationError> {
    let n = downcast_mut::<Node>(o, NODE)?;
    n.label = r.read_string().map_err(|e| e.in_field(NODE, "label"))?;
    n.next = r.read_object().map_err(|e| e.in_field(NODE, "next"))?;
    Ok(())
}

fn instantiate_node(_: &mut Reader<'_>) -> Result<ObjectRef, SerializationError> {
    Ok(new_object(Node::default()))
}

fn serialize_shape(_: &mut Writer<'_>, _: &dyn WireObject) -> Result<(), SerializationError> {
    Ok(())
}

fn deserialize_shape(_: &mut Reader<'_>, _: &mut dyn WireObject) -> Result<(), SerializationError> {
    Ok(())
}

fn serialize_label(w: &mut Writer<'_>, o: &dyn WireObject) -> Result<(), SerializationError> {
    let l = downcast_ref::<Label>(o, LABEL)?;
    w.write_string(&l.a)?;
    w.write_string(&l.b)
}

fn table() -> SerializerTable {
    let mut table = SerializerTable::new();
    table
        .register(
            POINT,
            FieldSerializer {
                serialize: Some(serialize_point),
                deserialize: Some(deserialize_point),
                instantiate: Some(instantiate_point),
            },
        )
        .register(
            NODE,
            FieldSerializer {
                serialize: Some(serialize_node),
                deserialize: Some(deserialize_node),
                instantiate: Some(instantiate_node),
            },
        )
        .register(
            SHAPE,
            FieldSerializer {
                serialize: Some(serialize_shape),
                deserialize: Some(deserialize_shape),
                instantiate: None,
            },
        )
        .register(
            LABEL,
            FieldSerializer {
                serialize: Some(serialize_label),
                deserialize: None,
                instantiate: None,
            },
        );
    table
}

fn encode(table: &SerializerTable, objects: &[Option<&ObjectRef>]) -> Vec<u8> {
    let mut w = Writer::new(table);
    for object in objects {
        w.write_object(*object).unwrap();
    }
    w.into_payload()
}

#[test]
fn point_round_trip() {
    let table = table();
    let point = new_object(Point { x: 3, y: 4 });
    let bytes = encode(&table, &[Some(&point)]);

    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    let decoded = r.read_object().unwrap().unwrap();
    r.finish().unwrap();
    assert_eq!(*borrow_as::<Point>(&decoded).unwrap(), Point { x: 3, y: 4 });
}

#[test]
fn shared_reference_decodes_to_one_instance() {
    let table = table();
    let point = new_object(Point { x: 1, y: 2 });
    let bytes = encode(&table, &[Some(&point), Some(&point), None]);

    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    let a = r.read_object().unwrap().unwrap();
    let b = r.read_object().unwrap().unwrap();
    assert!(r.read_object().unwrap().is_none());
    assert!(same_object(&a, &b));
}

#[test]
fn cycle_resolves_to_the_in_progress_instance() {
    let table = table();
    let a = new_object(Node {
        label: "a".into(),
        next: None,
    });
    let b = new_object(Node {
        label: "b".into(),
        next: Some(a.clone()),
    });
    borrow_as_mut_node(&a).next = Some(b.clone());

    let bytes = encode(&table, &[Some(&a)]);
    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    let da = r.read_object().unwrap().unwrap();
    r.finish().unwrap();

    let db = borrow_as::<Node>(&da).unwrap().next.clone().unwrap();
    let dba = borrow_as::<Node>(&db).unwrap().next.clone().unwrap();
    assert!(same_object(&da, &dba));
    assert_eq!(borrow_as::<Node>(&db).unwrap().label, "b");

    // break the cycles so the test does not leak
    borrow_as_mut_node(&a).next = None;
    borrow_as_mut_node(&da).next = None;
}

fn borrow_as_mut_node(o: &ObjectRef) -> std::cell::RefMut<'_, Node> {
    serial_stream::borrow_as_mut::<Node>(o).unwrap()
}

#[test]
fn repeated_string_uses_one_table_entry() {
    let table = SerializerTable::new();
    let mut once = Writer::new(&table);
    once.write_string("repeated value").unwrap();
    let single = once.into_payload().len();

    let mut w = Writer::new(&table);
    for _ in 0..100 {
        w.write_string("repeated value").unwrap();
    }
    assert_eq!(w.string_count(), 1);
    let bytes = w.into_payload();
    assert_eq!(bytes.len(), single + 99 * 4);

    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    for _ in 0..100 {
        assert_eq!(r.read_string().unwrap(), "repeated value");
    }
    r.finish().unwrap();
}

#[test]
fn equal_field_values_share_a_string_entry() {
    let table = table();
    let label = new_object(Label {
        a: "a".into(),
        b: "a".into(),
    });
    let mut w = Writer::new(&table);
    w.write_object(Some(&label)).unwrap();
    // the type signature plus "a"
    assert_eq!(w.string_count(), 2);
}

#[test]
fn every_truncated_prefix_fails_cleanly() {
    let table = table();
    let tail = new_object(Node {
        label: "tail".into(),
        next: None,
    });
    let head = new_object(Node {
        label: "head".into(),
        next: Some(tail),
    });
    let point = new_object(Point { x: -1, y: 7 });
    let bytes = encode(&table, &[Some(&head), Some(&point), Some(&head)]);

    for cut in 0..bytes.len() {
        let prefix = &bytes[..cut];
        let outcome = Reader::from_payload(&table, prefix).and_then(|mut r| {
            for _ in 0..3 {
                r.read_object()?;
            }
            r.finish()
        });
        let err = outcome.unwrap_err();
        if cut < HEADER_LEN {
            assert!(matches!(err, SerializationError::MalformedStream(_)));
        } else {
            assert!(
                matches!(err.root_cause(), SerializationError::TruncatedBuffer { .. }),
                "cut {cut}: {err}"
            );
        }
    }
}

#[test]
fn abstract_entry_is_not_instantiable() {
    let table = table();
    let shape = new_object(Shape);
    let bytes = encode(&table, &[Some(&shape)]);
    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    assert_eq!(
        r.read_object().unwrap_err(),
        SerializationError::NotInstantiable(SHAPE.into())
    );
}

#[test]
fn unknown_signature_fails_to_read() {
    let writer_table = table();
    let point = new_object(Point { x: 0, y: 0 });
    let bytes = encode(&writer_table, &[Some(&point)]);

    let reader_table = SerializerTable::new();
    let mut r = Reader::from_payload(&reader_table, &bytes).unwrap();
    assert_eq!(
        r.read_object().unwrap_err(),
        SerializationError::UnknownTypeSignature(POINT.into())
    );
}

#[test]
fn write_only_entry_cannot_be_read() {
    let table = table();
    let label = new_object(Label::default());
    let bytes = encode(&table, &[Some(&label)]);
    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    assert!(matches!(
        r.read_object().unwrap_err(),
        SerializationError::NotInstantiable(_)
    ));
}

#[test]
fn forward_object_ordinal_is_rejected() {
    let table = table();
    let bytes = [1, 0, 0, 0, 2, 0, 0, 0];
    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    assert_eq!(
        r.read_object().unwrap_err(),
        SerializationError::BadObjectOrdinal {
            ordinal: 2,
            known: 0
        }
    );
}

#[test]
fn field_errors_carry_context() {
    let table = table();
    let node = new_object(Node {
        label: "n".into(),
        next: Some(new_object(Point { x: 5, y: 6 })),
    });
    let mut bytes = encode(&table, &[Some(&node)]);
    bytes.truncate(bytes.len() - 2);
    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    let err = r.read_object().unwrap_err();
    assert_eq!(err.field_path(), vec!["geo.Node.next", "geo.Point.y"]);
}

/// `len` nodes linked through `next`, labelled from the tail (`"0"`) up.
fn chain(len: usize) -> ObjectRef {
    let mut head = new_object(Node {
        label: "0".into(),
        next: None,
    });
    for i in 1..len {
        head = new_object(Node {
            label: i.to_string(),
            next: Some(head),
        });
    }
    head
}

/// Drop a chain one link at a time instead of recursively.
fn unlink(head: ObjectRef) {
    let mut current = Some(head);
    while let Some(node) = current {
        current = borrow_as_mut_node(&node).next.take();
    }
}

fn next_of(node: &ObjectRef) -> Option<ObjectRef> {
    borrow_as::<Node>(node).unwrap().next.clone()
}

fn chain_len(head: &ObjectRef) -> usize {
    let mut len = 0;
    let mut current = Some(head.clone());
    while let Some(node) = current {
        len += 1;
        current = next_of(&node);
    }
    len
}

#[test]
fn chain_at_the_depth_limit_round_trips() {
    let table = table();
    let head = chain(MAX_OBJECT_DEPTH);
    let bytes = encode(&table, &[Some(&head)]);

    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    let decoded = r.read_object().unwrap().unwrap();
    r.finish().unwrap();
    assert_eq!(chain_len(&decoded), MAX_OBJECT_DEPTH);
    assert_eq!(
        borrow_as::<Node>(&decoded).unwrap().label,
        (MAX_OBJECT_DEPTH - 1).to_string()
    );

    unlink(head);
    unlink(decoded);
}

#[test]
fn writer_refuses_one_level_past_the_limit() {
    let table = table();
    let head = chain(MAX_OBJECT_DEPTH + 1);
    let mut w = Writer::new(&table);
    let err = w.write_object(Some(&head)).unwrap_err();
    assert_eq!(
        err.root_cause(),
        &SerializationError::NestingTooDeep {
            limit: MAX_OBJECT_DEPTH
        }
    );
    drop(w);
    unlink(head);
}

#[test]
fn back_references_do_not_count_towards_depth() {
    let table = table();
    let head = chain(MAX_OBJECT_DEPTH);
    // The tail goes first, so the second root reaches it as a back-reference
    // one level past the limit.
    let mut tail = head.clone();
    while let Some(next) = next_of(&tail) {
        tail = next;
    }
    let extra = new_object(Node {
        label: "extra".into(),
        next: Some(head.clone()),
    });
    let bytes = encode(&table, &[Some(&tail), Some(&extra)]);
    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    let first = r.read_object().unwrap().unwrap();
    let second = r.read_object().unwrap().unwrap();
    r.finish().unwrap();
    assert_eq!(chain_len(&second), MAX_OBJECT_DEPTH + 1);

    assert_eq!(borrow_as::<Node>(&first).unwrap().label, "0");
    unlink(second);
    unlink(extra);
}

#[test]
fn reader_refuses_payload_deeper_than_its_limit() {
    let table = table();
    let head = chain(MAX_OBJECT_DEPTH + 1);
    let mut w = Writer::new(&table).with_max_depth(MAX_OBJECT_DEPTH + 1);
    w.write_object(Some(&head)).unwrap();
    let bytes = w.into_payload();

    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    let err = r.read_object().unwrap_err();
    assert_eq!(
        err.root_cause(),
        &SerializationError::NestingTooDeep {
            limit: MAX_OBJECT_DEPTH
        }
    );
    assert_eq!(err.field_path().len(), MAX_OBJECT_DEPTH);

    // A reader configured like the writer accepts it.
    let mut r = Reader::from_payload(&table, &bytes)
        .unwrap()
        .with_max_depth(MAX_OBJECT_DEPTH + 1);
    let decoded = r.read_object().unwrap().unwrap();
    r.finish().unwrap();
    assert_eq!(chain_len(&decoded), MAX_OBJECT_DEPTH + 1);

    unlink(head);
    unlink(decoded);
}

#[test]
fn very_long_chain_fails_without_exhausting_the_stack() {
    let table = table();
    let head = chain(20_000);
    let mut w = Writer::new(&table);
    let err = w.write_object(Some(&head)).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        SerializationError::NestingTooDeep { .. }
    ));
    drop(w);
    unlink(head);

    // The same depth written by hand: every node is new, each signature and
    // label after the first is a back-reference.
    let mut bytes = vec![1, 0, 0, 0];
    for i in 0..20_000u32 {
        bytes.extend_from_slice(&(i + 1).to_le_bytes());
        if i == 0 {
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&8u32.to_le_bytes());
            bytes.extend_from_slice(NODE.as_bytes());
            bytes.extend_from_slice(&2u32.to_le_bytes());
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.push(b'x');
        } else {
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&2u32.to_le_bytes());
        }
    }
    bytes.extend_from_slice(&0u32.to_le_bytes());
    let mut r = Reader::from_payload(&table, &bytes).unwrap();
    let err = r.read_object().unwrap_err();
    assert!(matches!(
        err.root_cause(),
        SerializationError::NestingTooDeep { .. }
    ));
}
