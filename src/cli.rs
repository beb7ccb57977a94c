use std::time::Instant;

use rand::{SeedableRng as _, rngs::SmallRng};
use twolevel_bvh::{
    SceneAccelerator,
    scene::procedural::{instance_grid, triangle_soup},
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut rng = SmallRng::seed_from_u64(1234);
    let meshes = vec![
        triangle_soup(&mut rng, 20_000, 10.0),
        triangle_soup(&mut rng, 5_000, 6.0),
        triangle_soup(&mut rng, 500, 3.0),
    ];
    let instances = instance_grid(meshes.len(), 8, 15.0);

    let start = Instant::now();
    let scene = SceneAccelerator::builder()
        .meshes(meshes)
        .instances(instances)
        .build()?;
    println!("Built in {:.1?}", start.elapsed());

    for (i, bvh) in scene.bottom_levels().iter().enumerate() {
        bvh.validate()?;
        println!("Mesh {i}:\n{}", bvh.statistics());
    }

    scene.top_level().validate()?;
    println!("Instances:\n{}", scene.top_level().statistics());
    scene.top_level().print_tree();

    let flattened = scene.flattened();
    flattened.validate()?;
    println!(
        "Flattened: {} nodes, {} bytes, instance tree at {}",
        flattened.nodes().len(),
        flattened.as_bytes().len(),
        flattened.top_root()
    );

    Ok(())
}
