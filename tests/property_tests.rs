//! Property-based tests for the round-trip, skip and buffer-boundary laws.

use jsonbind::{Decimal, Engine, JsonMap, Number, Options, Reader, Value};
use num_bigint::BigInt;
use proptest::prelude::*;
use std::io::{self, Read};

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

fn engine_roundtrip<T>(value: &T) -> T
where
    T: jsonbind::JsonType + std::fmt::Debug,
{
    let engine = Engine::new();
    let bytes = engine.to_vec(value).unwrap();
    engine.deserialize(&bytes[..]).unwrap()
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(Number::Integer(n))),
        (-1e12f64..1e12).prop_map(|f| Value::Number(Number::Float(f))),
        ".{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z\u{e9}\"]{0,6}", inner), 0..6).prop_map(|entries| {
                Value::Object(entries.into_iter().collect::<JsonMap>())
            }),
        ]
    })
}

proptest! {
    #[test]
    fn prop_i64(n in any::<i64>()) {
        prop_assert_eq!(engine_roundtrip(&n), n);
    }

    #[test]
    fn prop_u64(n in any::<u64>()) {
        prop_assert_eq!(engine_roundtrip(&n), n);
    }

    #[test]
    fn prop_i16(n in any::<i16>()) {
        prop_assert_eq!(engine_roundtrip(&n), n);
    }

    #[test]
    fn prop_f64_bits(f in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
        prop_assert_eq!(engine_roundtrip(&f).to_bits(), f.to_bits());
    }

    #[test]
    fn prop_f32_bits(f in any::<f32>().prop_filter("finite", |f| f.is_finite())) {
        prop_assert_eq!(engine_roundtrip(&f).to_bits(), f.to_bits());
    }

    #[test]
    fn prop_string(s in any::<String>()) {
        prop_assert_eq!(engine_roundtrip(&s), s.clone());
        prop_assert_eq!(jsonbind::to_string(&s).unwrap(), serde_json::to_string(&s).unwrap());
    }

    #[test]
    fn prop_decimal_digits(unscaled in any::<i128>(), scale in -40i32..40) {
        let decimal = Decimal::new(BigInt::from(unscaled), scale);
        let back = engine_roundtrip(&decimal);
        prop_assert_eq!(back.to_string(), decimal.to_string());
        prop_assert_eq!(back, decimal);
    }

    #[test]
    fn prop_vec_of_options(values in prop::collection::vec(prop::option::of(any::<i32>()), 0..20)) {
        prop_assert_eq!(engine_roundtrip(&values), values.clone());
        let via_serde: Vec<Option<i32>> = jsonbind::from_str(&jsonbind::to_string(&values).unwrap()).unwrap();
        prop_assert_eq!(via_serde, values);
    }

    #[test]
    fn prop_one_byte_buffers(value in arb_value(), step in 1usize..5) {
        let engine = Engine::new();
        let text = engine.to_vec(&value).unwrap();
        let whole: Value = engine.deserialize_bytes(&text, text.len()).unwrap();

        let tiny = Engine::with_options(Options::new().with_buffer_size(1));
        let chunked: Value = tiny.deserialize(Chunked { data: &text, step }).unwrap();
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn prop_skip_lands_on_next_token(value in arb_value()) {
        let engine = Engine::new();
        let mut doc = b"[".to_vec();
        doc.extend(engine.to_vec(&value).unwrap());
        doc.extend_from_slice(b" , 7]");

        let mut reader = Reader::from_slice(&doc);
        reader.advance().unwrap();
        reader.advance().unwrap();
        reader.skip_value().unwrap();
        let skipped_at = reader.position();
        prop_assert_eq!(reader.advance().unwrap(), b',');
        reader.advance().unwrap();
        prop_assert_eq!(reader.read_int::<u8>().unwrap(), 7);

        let read_fn = engine.registry().find_reader::<Value>().unwrap();
        let mut reader = Reader::from_slice(&doc);
        reader.advance().unwrap();
        reader.advance().unwrap();
        read_fn(&mut reader).unwrap();
        prop_assert_eq!(reader.position(), skipped_at);
    }
}
