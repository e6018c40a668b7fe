use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vcad_kernel_spatial::KdTree;

fn random_points(rng: &mut StdRng, n: usize) -> Vec<[f64; 3]> {
    (0..n)
        .map(|_| {
            [
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            ]
        })
        .collect()
}

fn bench_kdtree(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut group = c.benchmark_group("kdtree");

    for &n in &[1_000usize, 10_000, 100_000] {
        let points = random_points(&mut rng, n);
        let queries = random_points(&mut rng, 1_000);

        group.bench_with_input(BenchmarkId::new("build", n), &points, |b, points| {
            b.iter(|| KdTree::build(black_box(points)).unwrap())
        });

        let tree = KdTree::build(&points).unwrap();
        group.bench_with_input(BenchmarkId::new("nearest_1000", n), &queries, |b, queries| {
            b.iter(|| {
                for q in queries {
                    black_box(tree.nearest(q).unwrap());
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("nearest_batch_1000", n), &queries, |b, queries| {
            b.iter(|| black_box(tree.nearest_batch(queries).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kdtree);
criterion_main!(benches);
