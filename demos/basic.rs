//! Basic usage walkthrough for spawnpool

use spawnpool::{InstanceFactory, PoolGroup, PoolPolicy, PoolRegistry, Recyclable};
use std::sync::Arc;

struct Bullet {
    visible: bool,
    position: (f32, f32),
}

impl Recyclable for Bullet {
    fn on_respawned(&mut self) {
        println!("   bullet respawned at {:?}", self.position);
    }
}

struct BulletFactory;

impl InstanceFactory for BulletFactory {
    type Instance = Bullet;
    type Placement = (f32, f32);

    fn create(&mut self, template: &str) -> Bullet {
        println!("   factory created a '{template}'");
        Bullet {
            visible: true,
            position: (0.0, 0.0),
        }
    }

    fn destroy(&mut self, _instance: Bullet) {
        println!("   factory destroyed a bullet");
    }

    fn set_active(&mut self, instance: &mut Bullet, active: bool) {
        instance.visible = active;
    }

    fn place(&mut self, instance: &mut Bullet, placement: Option<&(f32, f32)>) {
        instance.position = placement.copied().unwrap_or((0.0, 0.0));
    }
}

fn main() {
    env_logger::init();
    println!("=== spawnpool - Basic Examples ===\n");

    spawn_and_reuse();
    limits();
    preloading();
    registry();
}

fn spawn_and_reuse() {
    println!("1. Spawn and Reuse:");
    let group = PoolGroup::new("demo", BulletFactory);

    let bullet = group.spawn("Bullet", Some(&(5.0, 0.0))).unwrap();
    println!("   spawned {bullet}, active: {}", group.is_active(bullet));

    group.despawn(bullet).unwrap();
    let again = group.spawn("Bullet", Some(&(7.5, 1.0))).unwrap();
    println!("   reused the same instance: {}\n", again == bullet);
}

fn limits() {
    println!("2. Limits:");
    let group = PoolGroup::new("demo", BulletFactory);
    group
        .create_template_pool(PoolPolicy::new("Bullet").with_limit(2))
        .unwrap();

    let _a = group.spawn("Bullet", None).unwrap();
    let _b = group.spawn("Bullet", None).unwrap();
    println!(
        "   third spawn under a limit of 2 yields: {:?}\n",
        group.spawn("Bullet", None)
    );
}

fn preloading() {
    println!("3. Preloading:");
    let group = PoolGroup::new("demo", BulletFactory);
    let warm = group
        .create_template_pool(PoolPolicy::new("Bullet").with_preload(3))
        .unwrap();
    println!("   preloaded {} bullets, ready for reuse", warm.len());

    let pool = group.template_pool("Bullet").unwrap();
    println!(
        "   spawned: {}, despawned: {}\n",
        pool.spawned_count(),
        pool.despawned_count()
    );
}

fn registry() {
    println!("4. Registry:");
    let registry = PoolRegistry::new();
    let group = PoolGroup::new("hud", BulletFactory);
    registry.register(Arc::clone(&group));

    let found = registry.lookup("hud").unwrap();
    println!("   looked up group '{}'", found.name());

    registry.teardown_all();
    println!("   torn down, registry empty: {}", registry.is_empty());
}
