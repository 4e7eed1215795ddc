//! Benchmark – `ojson::dump` and `ojson::parse` across modes
#![allow(missing_docs)]

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ojson::{Attr, Mode, Options, Value, dump, parse};

/// A deterministic document of `rows` records mixing every plain kind, plus
/// one generic object per record for the modes that can encode it.
fn make_document(rows: usize, with_objects: bool) -> Value {
    let records = (0..rows).map(|i| {
        let n = i64::try_from(i).unwrap_or(i64::MAX);
        let mut entries = vec![
            ("id", Value::Int(n)),
            ("name", Value::from(format!("record \"{i}\" caf\u{e9}"))),
            ("ratio", Value::from(n as f64 / 7.0)),
            ("active", Value::Bool(i % 3 == 0)),
            ("note", Value::Null),
            ("tags", Value::array([Value::from("a"), Value::from("b\n")])),
        ];
        if with_objects {
            entries.push((
                "origin",
                Value::object("Point", [Attr::new("x", n), Attr::new("y", -n)]),
            ));
        }
        Value::map(entries)
    });
    Value::array(records)
}

fn bench_dump(c: &mut Criterion) {
    let mut group = c.benchmark_group("dump");
    for mode in [Mode::Strict, Mode::Object, Mode::Compat, Mode::Custom] {
        let options = Options::with_mode(mode);
        let doc = make_document(1_000, mode != Mode::Strict);
        let len = dump(&doc, &options).map_or(0, |s| s.len());
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("mode", mode), &doc, |b, doc| {
            b.iter(|| black_box(dump(black_box(doc), &options).map(|s| s.len())));
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for mode in [Mode::Strict, Mode::Object, Mode::Compat] {
        let options = Options::with_mode(mode);
        let json = dump(&make_document(1_000, mode == Mode::Object), &options).unwrap_or_default();
        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_with_input(BenchmarkId::new("mode", mode), &json, |b, json| {
            b.iter(|| black_box(parse(black_box(json), &options).is_ok()));
        });
    }
    group.finish();
}

fn bench_indent(c: &mut Criterion) {
    let doc = make_document(1_000, false);
    let mut group = c.benchmark_group("dump_indent");
    for indent in [0usize, 2, 8] {
        let options = Options {
            indent,
            ..Options::with_mode(Mode::Strict)
        };
        group.bench_with_input(BenchmarkId::from_parameter(indent), &options, |b, options| {
            b.iter(|| black_box(dump(black_box(&doc), options).map(|s| s.len())));
        });
    }
    group.finish();
}

fn criterion() -> Criterion {
    let mut c = Criterion::default();
    if cfg!(feature = "bench-fast") {
        c = c
            .warm_up_time(Duration::from_millis(10))
            .measurement_time(Duration::from_millis(100))
            .sample_size(10);
    } else {
        c = c
            .warm_up_time(Duration::from_secs(3))
            .measurement_time(Duration::from_secs(5));
    }
    c
}

criterion_group! { name = benches; config = criterion(); targets = bench_dump, bench_parse, bench_indent }
criterion_main!(benches);
