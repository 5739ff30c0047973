//! Per-pool counters and snapshots

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time statistics for one template pool
///
/// # Examples
///
/// ```
/// # use spawnpool::{InstanceFactory, PoolGroup, PoolPolicy, Recyclable};
/// # struct Unit;
/// # impl Recyclable for Unit {}
/// # struct UnitFactory;
/// # impl InstanceFactory for UnitFactory {
/// #     type Instance = Unit;
/// #     type Placement = ();
/// #     fn create(&mut self, _t: &str) -> Unit { Unit }
/// #     fn destroy(&mut self, _i: Unit) {}
/// #     fn set_active(&mut self, _i: &mut Unit, _a: bool) {}
/// #     fn place(&mut self, _i: &mut Unit, _p: Option<&()>) {}
/// # }
/// let group = PoolGroup::new("units", UnitFactory);
/// let handle = group.spawn("Pawn", None).unwrap();
/// group.despawn(handle).unwrap();
/// let again = group.spawn("Pawn", None).unwrap();
/// assert_eq!(handle, again);
///
/// let stats = group.template_pool("Pawn").unwrap().stats();
/// assert_eq!(stats.total_created, 1);
/// assert_eq!(stats.total_reused, 1);
/// ```
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Template this snapshot belongs to
    pub template: String,

    /// Currently spawned (active) instances
    pub spawned: usize,

    /// Currently despawned (reusable) instances
    pub despawned: usize,

    /// Instances created through the factory over the pool's lifetime
    pub total_created: usize,

    /// Spawns satisfied by reusing a despawned instance
    pub total_reused: usize,

    /// Completed despawns
    pub total_despawned: usize,

    /// Instances destroyed by culling
    pub total_culled: usize,

    /// Spawn attempts refused because the limit was reached
    pub limit_hits: usize,

    /// Total instances over the configured limit, when a limit is set
    pub utilization: Option<f64>,
}

impl PoolStats {
    /// Export the snapshot as string key/value pairs
    pub fn export(&self) -> HashMap<String, String> {
        let mut out = HashMap::new();
        out.insert("template".to_string(), self.template.clone());
        out.insert("spawned".to_string(), self.spawned.to_string());
        out.insert("despawned".to_string(), self.despawned.to_string());
        out.insert("total_created".to_string(), self.total_created.to_string());
        out.insert("total_reused".to_string(), self.total_reused.to_string());
        out.insert(
            "total_despawned".to_string(),
            self.total_despawned.to_string(),
        );
        out.insert("total_culled".to_string(), self.total_culled.to_string());
        out.insert("limit_hits".to_string(), self.limit_hits.to_string());
        if let Some(utilization) = self.utilization {
            out.insert("utilization".to_string(), format!("{utilization:.2}"));
        }
        out
    }
}

/// Internal lifetime counters, updated with relaxed atomics
#[derive(Default)]
pub(crate) struct StatsTracker {
    pub total_created: AtomicUsize,
    pub total_reused: AtomicUsize,
    pub total_despawned: AtomicUsize,
    pub total_culled: AtomicUsize,
    pub limit_hits: AtomicUsize,
}

impl StatsTracker {
    pub fn record_created(&self) {
        self.total_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reused(&self) {
        self.total_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_despawned(&self) {
        self.total_despawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_culled(&self, count: usize) {
        self.total_culled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_limit_hit(&self) {
        self.limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(
        &self,
        template: &str,
        spawned: usize,
        despawned: usize,
        limit: Option<usize>,
    ) -> PoolStats {
        let utilization = limit.map(|limit| {
            if limit > 0 {
                (spawned + despawned) as f64 / limit as f64
            } else {
                0.0
            }
        });

        PoolStats {
            template: template.to_string(),
            spawned,
            despawned,
            total_created: self.total_created.load(Ordering::Relaxed),
            total_reused: self.total_reused.load(Ordering::Relaxed),
            total_despawned: self.total_despawned.load(Ordering::Relaxed),
            total_culled: self.total_culled.load(Ordering::Relaxed),
            limit_hits: self.limit_hits.load(Ordering::Relaxed),
            utilization,
        }
    }
}
