// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the snapshot read path.

use criterion::{criterion_group, criterion_main, Criterion};
use snapshot_layout::{decode, encode, SnapshotRecord, TemperatureSensor, REGION_SIZE};
use snapshot_reader::{InMemoryRegion, SnapshotReader};
use std::hint::black_box;

fn full_record() -> SnapshotRecord {
    SnapshotRecord {
        write_sequence: 2,
        memory_total_mb: 16_000,
        memory_used_mb: 4_000,
        temperature_sensors: (0..32)
            .map(|i| TemperatureSensor::new(format!("Core #{i}"), 40.0 + i as f32))
            .collect(),
        ..Default::default()
    }
}

fn bench_decode(c: &mut Criterion) {
    let mut bytes = vec![0u8; REGION_SIZE];
    encode(&full_record(), &mut bytes).unwrap();
    c.bench_function("decode_full_region", |b| {
        b.iter(|| decode(black_box(&bytes)).unwrap())
    });
}

fn bench_read_snapshot(c: &mut Criterion) {
    let mut bytes = vec![0u8; REGION_SIZE];
    encode(&full_record(), &mut bytes).unwrap();
    let region = InMemoryRegion::new(bytes);
    let mut reader = SnapshotReader::from_region(Box::new(region), "bench").unwrap();
    c.bench_function("read_snapshot_stable", |b| {
        b.iter(|| reader.read_snapshot().unwrap())
    });
}

criterion_group!(benches, bench_decode, bench_read_snapshot);
criterion_main!(benches);
