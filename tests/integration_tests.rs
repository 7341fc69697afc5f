use jsonbind::{
    Decimal, Engine, ErrorKind, JsonType, ObjectDescription, Options, Reader, RegistryBuilder,
    Shape, UnknownFieldPolicy, Value, Writer,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves its input `step` bytes per read call.
struct Chunked<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Chunked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct User {
    id: u32,
    name: String,
    active: bool,
    tags: Vec<String>,
}
impl JsonType for User {}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Product {
    sku: String,
    price: f64,
    quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Order {
    order_id: u32,
    customer: User,
    items: Vec<Product>,
    note: Option<String>,
}
impl JsonType for Order {}

#[test]
fn integer_round_trip() {
    let engine = Engine::new();
    let value: i32 = engine.deserialize(&b"42"[..]).unwrap();
    assert_eq!(value, 42);
    assert_eq!(engine.to_vec(&value).unwrap(), b"42");
}

#[test]
fn string_round_trip() {
    let engine = Engine::new();
    let value: String = engine.deserialize(&b"\"Hello World!\""[..]).unwrap();
    assert_eq!(value, "Hello World!");
    assert_eq!(engine.to_vec(&value).unwrap(), b"\"Hello World!\"");
}

#[test]
fn lazy_iteration_over_array() {
    let engine = Engine::new();
    let mut items = engine.iterate_over::<i32, _>(&b"[1,2,3]"[..]).unwrap();
    assert_eq!(items.next().unwrap().unwrap(), 1);
    assert_eq!(items.next().unwrap().unwrap(), 2);
    assert_eq!(items.next().unwrap().unwrap(), 3);
    assert!(items.next().is_none());
}

#[test]
fn decimal_keeps_its_scale() {
    let engine = Engine::new();
    let value: Decimal = engine.deserialize(&b"1E28"[..]).unwrap();
    assert_eq!(engine.to_string(&value).unwrap(), "1E+28");

    let precise: Decimal = engine.deserialize(&b"0.1000000000000000000000000001"[..]).unwrap();
    assert_eq!(
        engine.to_string(&precise).unwrap(),
        "0.1000000000000000000000000001"
    );
}

#[test]
fn string_spanning_refills() {
    let engine = Engine::with_options(Options::new().with_buffer_size(4));
    let chunked: String = engine
        .deserialize(Chunked {
            data: b"\"abcdefgh\"",
            step: 4,
        })
        .unwrap();
    let whole: String = Engine::new().deserialize_bytes(b"\"abcdefgh\"", 10).unwrap();
    assert_eq!(chunked, "abcdefgh");
    assert_eq!(chunked, whole);
}

#[test]
fn collection_factory_is_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry = RegistryBuilder::empty()
        .register_reader::<i32, _>(|r| r.read_int())
        .register_reader_factory(move |request| {
            if request.shape() != Shape::Collection || request.raw_name() != "Vec" {
                return None;
            }
            counter.fetch_add(1, Ordering::SeqCst);
            request.synthesize()
        })
        .build();

    assert!(!registry.is_cached::<Vec<i32>>());
    let read = registry.try_find_reader::<Vec<i32>>().unwrap();
    assert!(registry.is_cached::<Vec<i32>>());
    let mut reader = Reader::from_slice(b"[4, 5]");
    reader.advance().unwrap();
    assert_eq!(read(&mut reader).unwrap(), vec![4, 5]);

    assert!(registry.try_find_reader::<Vec<i32>>().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // No exact reader for the element, so the factory cannot help.
    assert!(registry.try_find_reader::<Vec<u64>>().is_none());
}

#[test]
fn serde_types_through_the_registry() {
    let registry = RegistryBuilder::new()
        .register_serde::<User>()
        .register_serde::<Order>()
        .build();
    let engine = Engine::with_registry(registry);

    let order = Order {
        order_id: 12345,
        customer: User {
            id: 7,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["vip".to_string()],
        },
        items: vec![
            Product {
                sku: "WIDGET-001".to_string(),
                price: 29.99,
                quantity: 2,
            },
            Product {
                sku: "GADGET-002".to_string(),
                price: 0.5,
                quantity: 10,
            },
        ],
        note: None,
    };

    let mut out = Vec::new();
    let written = engine.serialize(&order, &mut out).unwrap();
    assert_eq!(written, out.len() as u64);
    assert_eq!(out, serde_json::to_vec(&order).unwrap());

    let back: Order = engine.deserialize(&out[..]).unwrap();
    assert_eq!(back, order);

    // Collections of serde types come from the analyzers.
    let users = vec![order.customer.clone(), order.customer.clone()];
    let text = engine.to_string(&users).unwrap();
    let users_back: Vec<User> = engine.deserialize(text.as_bytes()).unwrap();
    assert_eq!(users_back, users);
}

#[derive(Debug, Default, PartialEq, Clone)]
struct Point {
    x: i64,
    y: i64,
    label: Option<String>,
}
impl JsonType for Point {}

#[derive(Debug, Default, PartialEq, Clone)]
struct Polygon {
    name: String,
    points: Vec<Point>,
}
impl JsonType for Polygon {}

fn polygon_registry() -> RegistryBuilder {
    RegistryBuilder::new()
        // Declared before the type it depends on.
        .register_object(
            ObjectDescription::<Polygon>::new("Polygon")
                .mandatory_field("name", |s| &s.name, |s, v| s.name = v)
                .field("points", |s| &s.points, |s, v| s.points = v),
        )
        .register_object(
            ObjectDescription::<Point>::new("Point")
                .mandatory_field("x", |p| &p.x, |p, v| p.x = v)
                .mandatory_field("y", |p| &p.y, |p, v| p.y = v)
                .field("label", |p| &p.label, |p, v| p.label = v)
                .with_array_format(),
        )
}

#[test]
fn described_objects_in_both_formats() {
    let engine = Engine::with_registry(polygon_registry().build());
    let input = br#"{"points": [{"y": 2, "x": 1}, [3, 4, "c"]], "name": "tri", "extra": {"a": [1]}}"#;
    let polygon: Polygon = engine.deserialize_bytes(input, input.len()).unwrap();
    assert_eq!(polygon.name, "tri");
    assert_eq!(
        polygon.points,
        vec![
            Point { x: 1, y: 2, label: None },
            Point { x: 3, y: 4, label: Some("c".to_string()) },
        ]
    );
    assert_eq!(
        engine.to_string(&polygon).unwrap(),
        r#"{"name":"tri","points":[{"x":1,"y":2,"label":null},{"x":3,"y":4,"label":"c"}]}"#
    );

    let compact = Engine::from_parts(
        polygon_registry().build(),
        Options::new().with_prefer_array_format(true),
    );
    assert_eq!(
        compact.to_string(&polygon).unwrap(),
        r#"{"name":"tri","points":[[1,2,null],[3,4,"c"]]}"#
    );
}

#[test]
fn described_object_policies() {
    let strict = Engine::from_parts(
        polygon_registry().build(),
        Options::new()
            .with_unknown_fields(UnknownFieldPolicy::Fail)
            .with_array_format(false),
    );
    let err = strict
        .deserialize_bytes::<Point>(br#"{"x":1,"y":2,"z":3}"#, 19)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownField);

    let err = strict.deserialize_bytes::<Point>(b"[1,2]", 5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidToken);

    let err = strict.deserialize_bytes::<Point>(br#"{"x":1}"#, 7).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingField);
}

#[test]
fn bind_into_existing_value() {
    let engine = Engine::with_registry(polygon_registry().build());
    let mut point = Point {
        x: 0,
        y: 0,
        label: Some("kept".to_string()),
    };
    engine
        .deserialize_into(&mut point, br#"{"x": 5, "y": 6}"#)
        .unwrap();
    assert_eq!(point.x, 5);
    assert_eq!(point.y, 6);
    assert_eq!(point.label.as_deref(), Some("kept"));
}

#[test]
fn dynamic_values_keep_numbers_exact() {
    let engine = Engine::new();
    let text = r#"{"big": 123456789012345678901234567890, "pi": 3.14159265358979323846, "n": -5, "list": [true, null, "x"]}"#;
    let value: Value = engine.deserialize(text.as_bytes()).unwrap();
    assert_eq!(value["n"].as_i64(), Some(-5));
    assert_eq!(value["list"][2].as_str(), Some("x"));
    assert_eq!(
        engine.to_string(&value).unwrap(),
        r#"{"big":123456789012345678901234567890,"pi":3.14159265358979323846,"n":-5,"list":[true,null,"x"]}"#
    );
}

#[test]
fn writer_reuse_across_documents() {
    let engine = Engine::new();
    let mut writer = Writer::new();
    for i in 0..3u8 {
        writer.reset();
        engine.serialize_into(&vec![i; 2], &mut writer).unwrap();
        assert_eq!(writer.as_bytes(), format!("[{i},{i}]").as_bytes());
    }
}

#[test]
fn errors_carry_offsets() {
    let engine = Engine::new();
    let err = engine.deserialize::<Vec<i32>, _>(&b"[1, 2,"[..]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEnd);
    assert_eq!(err.offset(), Some(6));

    let err = engine.deserialize::<Vec<i32>, _>(&b"[1, x]"[..]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidToken);
    assert_eq!(err.offset(), Some(4));
    assert!(err.to_string().contains("offset 4"));
}

#[test]
fn engine_is_shared_across_threads() {
    let engine = Engine::with_registry(RegistryBuilder::new().register_serde::<User>().build());
    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for j in 0..50u32 {
                    let user = User {
                        id: i * 100 + j,
                        name: format!("user-{j}"),
                        active: j % 2 == 0,
                        tags: vec![],
                    };
                    let bytes = engine.to_vec(&user).unwrap();
                    let back: User = engine.deserialize(&bytes[..]).unwrap();
                    assert_eq!(back, user);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
