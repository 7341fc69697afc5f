use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jsonbind::{from_str, to_string, Engine, JsonType, ObjectDescription, RegistryBuilder, Value, Writer};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Default)]
struct Product {
    sku: String,
    name: String,
    price: f64,
    quantity: u32,
}
impl JsonType for Product {}

fn products(size: u32) -> Vec<Product> {
    (0..size)
        .map(|i| Product {
            sku: format!("SKU{i}"),
            name: format!("Product \"{i}\""),
            price: 9.99 + f64::from(i),
            quantity: i,
        })
        .collect()
}

fn described_engine() -> Engine {
    let registry = RegistryBuilder::new()
        .register_object(
            ObjectDescription::<Product>::new("Product")
                .field("sku", |p| &p.sku, |p, v| p.sku = v)
                .field("name", |p| &p.name, |p, v| p.name = v)
                .field("price", |p| &p.price, |p, v| p.price = v)
                .field("quantity", |p| &p.quantity, |p, v| p.quantity = v),
        )
        .build();
    Engine::with_registry(registry)
}

fn serde_engine() -> Engine {
    Engine::with_registry(RegistryBuilder::new().register_serde::<Product>().build())
}

fn benchmark_serialize_products(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize_products");
    let described = described_engine();
    let bridged = serde_engine();

    for size in [10u32, 100, 1000] {
        let data = products(size);
        group.bench_with_input(BenchmarkId::new("described", size), &data, |b, data| {
            let mut writer = Writer::new();
            b.iter(|| {
                writer.reset();
                described.serialize_into(black_box(data), &mut writer).unwrap();
            })
        });
        group.bench_with_input(BenchmarkId::new("serde_bridge", size), &data, |b, data| {
            b.iter(|| bridged.to_vec(black_box(data)))
        });
        group.bench_with_input(BenchmarkId::new("serde_json", size), &data, |b, data| {
            b.iter(|| serde_json::to_vec(black_box(data)))
        });
    }
    group.finish();
}

fn benchmark_deserialize_products(c: &mut Criterion) {
    let mut group = c.benchmark_group("deserialize_products");
    let described = described_engine();
    let bridged = serde_engine();

    for size in [10u32, 100, 1000] {
        let text = to_string(&products(size)).unwrap();
        group.bench_with_input(BenchmarkId::new("described", size), &text, |b, text| {
            b.iter(|| {
                described
                    .deserialize_bytes::<Vec<Product>>(black_box(text.as_bytes()), text.len())
                    .unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("serde_bridge", size), &text, |b, text| {
            b.iter(|| bridged.deserialize::<Vec<Product>, _>(black_box(text.as_bytes())).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("serde_json", size), &text, |b, text| {
            b.iter(|| serde_json::from_str::<Vec<Product>>(black_box(text)).unwrap())
        });
    }
    group.finish();
}

fn benchmark_numbers(c: &mut Criterion) {
    let mut group = c.benchmark_group("numbers");
    let engine = Engine::new();

    let integers: Vec<i64> = (0..1000).map(|i| i * 7919 - 500_000).collect();
    let floats: Vec<f64> = (0..1000).map(|i| f64::from(i) * 1.000_1).collect();
    let integers_text = to_string(&integers).unwrap();
    let floats_text = to_string(&floats).unwrap();

    group.bench_function("write_integers", |b| b.iter(|| engine.to_vec(black_box(&integers))));
    group.bench_function("write_floats", |b| b.iter(|| engine.to_vec(black_box(&floats))));
    group.bench_function("read_integers", |b| {
        b.iter(|| engine.deserialize::<Vec<i64>, _>(black_box(integers_text.as_bytes())))
    });
    group.bench_function("read_floats", |b| {
        b.iter(|| engine.deserialize::<Vec<f64>, _>(black_box(floats_text.as_bytes())))
    });
    group.bench_function("read_decimals", |b| {
        b.iter(|| engine.deserialize::<Vec<jsonbind::Decimal>, _>(black_box(floats_text.as_bytes())))
    });
    group.finish();
}

fn benchmark_dynamic_values(c: &mut Criterion) {
    let text = to_string(&products(100)).unwrap();
    let engine = Engine::new();

    c.bench_function("value_tree_native", |b| {
        b.iter(|| engine.deserialize::<Value, _>(black_box(text.as_bytes())))
    });
    c.bench_function("value_tree_serde", |b| b.iter(|| from_str::<Value>(black_box(&text))));
}

fn benchmark_iterate(c: &mut Criterion) {
    let text = to_string(&(0..10_000).collect::<Vec<u32>>()).unwrap();
    let engine = Engine::new();

    c.bench_function("iterate_over_10k", |b| {
        b.iter(|| {
            engine
                .iterate_over::<u32, _>(black_box(text.as_bytes()))
                .unwrap()
                .map(|item| u64::from(item.unwrap()))
                .sum::<u64>()
        })
    });
}

criterion_group!(
    benches,
    benchmark_serialize_products,
    benchmark_deserialize_products,
    benchmark_numbers,
    benchmark_dynamic_values,
    benchmark_iterate
);
criterion_main!(benches);
