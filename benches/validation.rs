//! Benchmark for request validation
//!
//! Every ClusterSync write runs the validation kit before touching the
//! OperatorConfig singleton.

use clustersync_operator::clustersync::{BackupRequest, ScheduleRequest, StorageRequest};
use clustersync_operator::crd::GoDuration;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn backup_request() -> BackupRequest {
    BackupRequest {
        backup_name: "daily".into(),
        is_one_time: Some(false),
        included_namespaces: Some((0..20).map(|i| format!("team-{}", i)).collect()),
        excluded_namespaces: Some(vec!["kube-system".into(), "kube-public".into()]),
        ttl: "168h30m".into(),
        storage_location: "s1".into(),
        snapshot_move_data: Some(true),
        volume_snapshot_locations: Some(vec!["vsl-a".into(), "vsl-b".into(), "vsl-a".into()]),
        ..Default::default()
    }
}

fn bench_requests(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");
    group.throughput(Throughput::Elements(1));

    let storage = StorageRequest {
        storage_name: "s1".into(),
        provider: "aws".into(),
        bucket: "velero-backups".into(),
        region: "us-east-1".into(),
        ip: "10.0.0.12".into(),
        port: Some(9000),
        ..Default::default()
    };
    group.bench_function("storage_request", |b| {
        b.iter(|| black_box(&storage).validate())
    });

    let backup = backup_request();
    group.bench_function("backup_request", |b| {
        b.iter(|| black_box(&backup).validate(true))
    });

    let schedule = ScheduleRequest {
        schedule_name: "nightly".into(),
        schedule: "0 2 * * 1-5".into(),
        paused: None,
        template: backup_request(),
    };
    group.bench_function("schedule_request", |b| {
        b.iter(|| black_box(&schedule).validate())
    });

    group.finish();
}

fn bench_durations(c: &mut Criterion) {
    let mut group = c.benchmark_group("duration");

    group.bench_function("parse", |b| {
        b.iter(|| black_box("1h15m30.5s").parse::<GoDuration>())
    });

    let duration: GoDuration = "720h".parse().unwrap();
    group.bench_function("format", |b| b.iter(|| black_box(duration).to_string()));

    group.finish();
}

criterion_group!(benches, bench_requests, bench_durations);
criterion_main!(benches);
