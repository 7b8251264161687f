use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mrkmeans_rs::{
    generate_fragment, generate_initial_centroids, map_fragment, reduce, ExecutionMode,
    FragmentKMeans, RunConfig,
};
use std::time::Duration;

fn benchmark_map_varying_clusters(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_fragment_clusters");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    let n_features = 64;
    let points_per_fragment = 5_000;
    let cluster_counts = [10, 50, 100];

    let fragment = generate_fragment(42, 0, points_per_fragment, n_features, None).unwrap();

    for k in cluster_counts.iter() {
        group.throughput(Throughput::Elements(points_per_fragment as u64));
        group.bench_with_input(BenchmarkId::from_parameter(k), k, |b, &k| {
            let centroids = generate_initial_centroids(42, k, n_features).unwrap();
            b.iter(|| map_fragment(black_box(&fragment), black_box(&centroids)).unwrap());
        });
    }
    group.finish();
}

fn benchmark_reduce_varying_fragments(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_fragments");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    let k = 100;
    let n_features = 64;
    let centroids = generate_initial_centroids(42, k, n_features).unwrap();
    let fragment_counts = [16, 64, 256];

    for n_fragments in fragment_counts.iter() {
        group.throughput(Throughput::Elements(*n_fragments as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(n_fragments),
            n_fragments,
            |b, &n_fragments| {
                let fragment = generate_fragment(7, 0, 200, n_features, None).unwrap();
                let partial = map_fragment(&fragment, &centroids).unwrap();
                let partials = vec![partial; n_fragments];

                b.iter(|| reduce(black_box(&centroids), black_box(&partials), n_fragments).unwrap());
            },
        );
    }
    group.finish();
}

fn benchmark_run_execution_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_execution_mode");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(3));

    let modes = [
        ("sequential", ExecutionMode::Sequential),
        ("thread_pool", ExecutionMode::ThreadPool { threads: 0 }),
    ];

    for (name, mode) in modes.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), mode, |b, &mode| {
            let config = RunConfig::new(32)
                .with_n_points(50_000)
                .with_dimensions(32)
                .with_n_fragments(32)
                .with_iterations(3)
                .with_seed(42)
                .with_execution(mode);

            b.iter(|| {
                let mut kmeans = FragmentKMeans::new(config.clone());
                kmeans.train().unwrap();
                kmeans
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_map_varying_clusters,
    benchmark_reduce_varying_fragments,
    benchmark_run_execution_modes
);
criterion_main!(benches);
