use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::{SeedableRng as _, rngs::SmallRng};
use twolevel_bvh::{
    Bvh, SceneAccelerator, TwoLevelBvh,
    scene::procedural::{instance_grid, triangle_soup},
};

fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(1234);
    let meshes = vec![
        triangle_soup(&mut rng, 50_000, 10.0),
        triangle_soup(&mut rng, 5_000, 4.0),
    ];
    let instances = instance_grid(meshes.len(), 16, 15.0);
    let bounds = meshes[0].triangle_bounds();

    c.bench_function("build_bvh", |b| b.iter(|| Bvh::build(&bounds)));

    let scene = SceneAccelerator::builder()
        .meshes(meshes.clone())
        .instances(instances.clone())
        .build()
        .unwrap();
    c.bench_function("translate", |b| {
        b.iter(|| TwoLevelBvh::translate(scene.top_level(), scene.bottom_levels(), &instances))
    });

    c.bench_function("build_scene", |b| {
        b.iter_batched(
            || (meshes.clone(), instances.clone()),
            |(meshes, instances)| {
                SceneAccelerator::builder()
                    .meshes(meshes)
                    .instances(instances)
                    .build()
                    .unwrap()
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(20));
    targets = criterion_benchmark
}
criterion_main!(benches);
