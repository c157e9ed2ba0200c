use bytefield_core::{Endianness, FieldKind, Record, Schema};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

fn wide_schema(dynamic_fields: usize) -> Arc<Schema> {
    let mut builder = Schema::builder("Wide").field("head", FieldKind::u32(Endianness::Big));
    for i in 0..dynamic_fields {
        builder = builder
            .field(format!("blob{}", i), FieldKind::bytes(None))
            .field(format!("word{}", i), FieldKind::u32(Endianness::Little));
    }
    builder.build().unwrap()
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for fields in [1, 8, 32] {
        let mut record = Record::new(wide_schema(fields));
        for i in 0..fields {
            record.resize(&format!("blob{}", i), 16usize).unwrap();
        }
        let last = format!("word{}", fields - 1);

        group.bench_with_input(BenchmarkId::new("last_word", fields), &last, |b, name| {
            b.iter(|| record.get(black_box(name)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("head", fields), &fields, |b, _| {
            b.iter(|| record.get(black_box("head")).unwrap());
        });
    }

    group.finish();
}

fn bench_random_get(c: &mut Criterion) {
    let fields = 32;
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut record = Record::new(wide_schema(fields));
    for i in 0..fields {
        record
            .resize(&format!("blob{}", i), rng.gen_range(0usize..64))
            .unwrap();
    }
    let names: Vec<String> = (0..256)
        .map(|_| format!("word{}", rng.gen_range(0..fields)))
        .collect();

    c.bench_function("random_get", |b| {
        b.iter(|| {
            for name in &names {
                black_box(record.get(name).unwrap());
            }
        });
    });
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");

    for fields in [1, 8, 32] {
        let mut record = Record::new(wide_schema(fields));
        let last = format!("word{}", fields - 1);

        group.bench_with_input(BenchmarkId::new("last_word", fields), &last, |b, name| {
            b.iter(|| record.set(black_box(name), black_box(7u32)).unwrap());
        });
    }

    group.finish();
}

fn bench_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("array");

    for len in [64usize, 1024] {
        let schema = Schema::builder("Samples")
            .field("samples", FieldKind::array(vec![len], FieldKind::i16(Endianness::Little)))
            .build()
            .unwrap();
        let mut record = Record::new(schema);

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("fill", len), &len, |b, _| {
            b.iter(|| record.array_mut("samples").unwrap().fill(black_box(-1i16)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("to_array", len), &len, |b, _| {
            b.iter(|| record.array("samples").unwrap().to_array().unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_get, bench_random_get, bench_set, bench_array);
criterion_main!(benches);
