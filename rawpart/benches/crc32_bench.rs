// cargo bench -p rawpart
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use uuid::Uuid;

use rawpart::crc32;
use rawpart::gpt::{GptCodec, GptPartitionEntry};
use rawpart::guids::GPT_PARTITION_TYPE_BASIC_DATA;

criterion_group!(benches, bench_crc, bench_relocate);
criterion_main!(benches);

fn bench_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");
    // header, default entry array, max entry array
    for &len in &[92usize, 16 * 1024, 16384 * 128] {
        let data: Vec<u8> = (0..len).map(|i| (i * 31) as u8).collect();

        group.bench_with_input(BenchmarkId::new("table", len), &data, |b, d| {
            b.iter(|| std::hint::black_box(crc32::checksum(d)));
        });

        group.bench_with_input(BenchmarkId::new("crc32fast", len), &data, |b, d| {
            b.iter(|| std::hint::black_box(crc32fast::hash(d)));
        });
    }
    group.finish();
}

fn bench_relocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpt_relocate");
    let codec = GptCodec::new(512).unwrap();

    for &n in &[4usize, 64, 128] {
        let parts: Vec<GptPartitionEntry> = (0..n as u64)
            .map(|i| {
                let first = 2048 + i * 1024;
                GptPartitionEntry::new(GPT_PARTITION_TYPE_BASIC_DATA, first, first + 1023, &format!("p{i}"))
            })
            .collect();
        let mirror = codec
            .create_mirror(512 * 1024 * 1024, Uuid::new_v4(), &parts)
            .unwrap();

        group.bench_with_input(BenchmarkId::new("relocate_pair", n), &mirror, |b, m| {
            b.iter(|| {
                let out = codec
                    .relocate_pair(&m.primary_raw, &m.backup_raw, 1024 * 1024 * 1024)
                    .unwrap();
                std::hint::black_box(out.backup.header.current_lba)
            });
        });
    }
    group.finish();
}
