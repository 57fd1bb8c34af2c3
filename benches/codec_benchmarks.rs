// ABOUTME: Benchmark suite for the hex UCS-2 message codec and statement rendering
// ABOUTME: Measures encode/decode cost across common SMS lengths and query-log rendering

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smsd_bridge::client::OutboxRecord;
use smsd_bridge::codec;
use smsd_bridge::phone;
use smsd_bridge::store::Statement;
use std::time::Duration;

fn create_sample_record() -> OutboxRecord {
    OutboxRecord {
        destination_number: "+33612345678".to_string(),
        multi_part: false,
        relative_validity: 255,
        text: codec::encode("Hello World").unwrap(),
        udh: String::new(),
        class: -1,
        insert_into_db: NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
        text_decoded: "Hello World".to_string(),
        delivery_report: true,
        creator_id: "+33612345678".to_string(),
    }
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("ascii", |b| b.iter(|| codec::encode(black_box("Hello World"))));
    group.bench_function("accented", |b| {
        b.iter(|| codec::encode(black_box("Zürich à 15€")))
    });
    group.bench_function("surrogate_pairs", |b| {
        b.iter(|| codec::encode(black_box("ok 😀😀")))
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.measurement_time(Duration::from_secs(10));

    let ascii = codec::encode("Hello World").unwrap();
    let accented = codec::encode("Zürich à 15€").unwrap();

    group.bench_function("ascii", |b| b.iter(|| codec::decode(black_box(&ascii))));
    group.bench_function("accented", |b| b.iter(|| codec::decode(black_box(&accented))));
    group.bench_function("invalid_digit", |b| {
        b.iter(|| codec::decode(black_box("00zz")))
    });

    group.finish();
}

fn bench_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_sizes");
    group.measurement_time(Duration::from_secs(10));

    let message_sizes = [10, 70, 160, 306, 612]; // Single part and concatenated lengths

    for &size in &message_sizes {
        let message = "A".repeat(size);
        group.bench_with_input(BenchmarkId::new("encode", size), &message, |b, message| {
            b.iter(|| codec::encode(black_box(message)).unwrap())
        });

        let encoded = codec::encode(&message).unwrap();
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| codec::decode(black_box(encoded)).unwrap())
        });
    }

    group.finish();
}

fn bench_statements(c: &mut Criterion) {
    let mut group = c.benchmark_group("statements");
    group.measurement_time(Duration::from_secs(10));

    let record = create_sample_record();

    group.bench_function("normalize", |b| {
        b.iter(|| phone::normalize(black_box(" 612345678 ")))
    });
    group.bench_function("render_insert", |b| {
        b.iter(|| Statement::InsertOutbox(black_box(&record)).render())
    });
    group.bench_function("render_inbox_from", |b| {
        b.iter(|| {
            Statement::InboxFrom {
                sender: black_box("+33612345678"),
                limit: 10,
            }
            .render()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_message_sizes,
    bench_statements
);
criterion_main!(benches);
