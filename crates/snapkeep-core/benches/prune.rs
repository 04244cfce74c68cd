use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use snapkeep_core::{Policy, prune};

const SIZES: [(&str, i64); 3] = [("1k", 1_000), ("10k", 10_000), ("100k", 100_000)];

const POLICY: &str = "3@last 6@secondly:1h 7@daily 6@monthly:2 4@monthly:6 3@yearly 10@yearly:2 yearly:5";

fn hourly(count: i64) -> Vec<DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    (0..count).map(|h| start + Duration::hours(h)).collect()
}

fn bench_prune(c: &mut Criterion) {
    let policy: Policy = POLICY.parse().expect("bench policy parses");
    let mut group = c.benchmark_group("prune.hourly");

    for (name, count) in SIZES {
        let snapshots = hourly(count);
        group.throughput(Throughput::Elements(count.unsigned_abs()));
        group.bench_with_input(BenchmarkId::from_parameter(name), &snapshots, |b, snapshots| {
            b.iter(|| {
                let pruned = prune(black_box(snapshots), &policy);
                black_box(pruned.pruned())
            });
        });
    }

    group.finish();
}

fn bench_prune_offset(c: &mut Criterion) {
    let policy: Policy = POLICY.parse().expect("bench policy parses");
    let tz = FixedOffset::west_opt(7 * 3600).expect("valid offset");
    let snapshots: Vec<_> = hourly(10_000)
        .iter()
        .map(|at| at.with_timezone(&tz))
        .collect();

    c.bench_function("prune.offset.10k", |b| {
        b.iter(|| black_box(prune(black_box(&snapshots), &policy).pruned()));
    });
}

fn bench_parse_policy(c: &mut Criterion) {
    c.bench_function("policy.parse", |b| {
        b.iter(|| black_box(POLICY).parse::<Policy>().map(|policy| policy.len()));
    });
}

criterion_group!(benches, bench_prune, bench_prune_offset, bench_parse_policy);
criterion_main!(benches);
