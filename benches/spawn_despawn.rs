use criterion::{Criterion, black_box, criterion_group, criterion_main};
use spawnpool::{InstanceFactory, PoolGroup, PoolPolicy, Recyclable};

struct Payload {
    #[allow(dead_code)]
    buffer: Vec<u8>,
}

impl Recyclable for Payload {}

struct PayloadFactory;

impl InstanceFactory for PayloadFactory {
    type Instance = Payload;
    type Placement = usize;

    fn create(&mut self, _template: &str) -> Payload {
        Payload {
            buffer: vec![0u8; 4096],
        }
    }
    fn destroy(&mut self, _instance: Payload) {}
    fn set_active(&mut self, _instance: &mut Payload, _active: bool) {}
    fn place(&mut self, _instance: &mut Payload, _placement: Option<&usize>) {}
}

fn spawn_despawn_cycle(c: &mut Criterion) {
    let group = PoolGroup::new("bench", PayloadFactory);
    group
        .create_template_pool(PoolPolicy::new("Payload").with_preload(64))
        .unwrap();

    c.bench_function("spawn_despawn_reuse", |b| {
        b.iter(|| {
            let handle = group.spawn("Payload", None).unwrap();
            group.despawn(black_box(handle)).unwrap();
        })
    });

    c.bench_function("spawn_despawn_batch_32", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..32)
                .map(|_| group.spawn("Payload", None).unwrap())
                .collect();
            for handle in handles {
                group.despawn(black_box(handle)).unwrap();
            }
        })
    });
}

criterion_group!(benches, spawn_despawn_cycle);
criterion_main!(benches);
