//! Watch the culling task reclaim excess despawned instances in real time

use spawnpool::{InstanceFactory, PoolGroup, PoolPolicy, Recyclable};
use std::time::Duration;

struct Particle;
impl Recyclable for Particle {}

struct ParticleFactory;

impl InstanceFactory for ParticleFactory {
    type Instance = Particle;
    type Placement = ();

    fn create(&mut self, _template: &str) -> Particle {
        Particle
    }
    fn destroy(&mut self, _instance: Particle) {}
    fn set_active(&mut self, _instance: &mut Particle, _active: bool) {}
    fn place(&mut self, _instance: &mut Particle, _placement: Option<&()>) {}
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    println!("=== spawnpool - Culling Demo ===\n");

    let group = PoolGroup::new("fx", ParticleFactory);
    group
        .create_template_pool(
            PoolPolicy::new("Spark")
                .with_culling(4, Duration::from_millis(500), 2)
                .with_verbose_logging(),
        )
        .unwrap();

    let sparks: Vec<_> = (0..10)
        .map(|_| group.spawn("Spark", None).unwrap())
        .collect();
    println!("spawned {} sparks", sparks.len());

    for spark in sparks {
        group.despawn(spark).unwrap();
    }
    let pool = group.template_pool("Spark").unwrap();
    println!(
        "despawned all, total {} > threshold 4, culling armed: {}",
        pool.total(),
        pool.is_culling_active()
    );

    while pool.is_culling_active() {
        tokio::time::sleep(Duration::from_millis(250)).await;
        println!(
            "  {} instances remain (despawned: {})",
            pool.total(),
            pool.despawned_count()
        );
    }
    println!("culling finished at {} instances", pool.total());

    group.teardown();
}
