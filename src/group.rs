//! Pool group: routes spawn/despawn requests across template pools

use crate::config::PoolPolicy;
use crate::errors::{PoolError, PoolResult};
use crate::factory::InstanceFactory;
use crate::stats::PoolStats;
use crate::template_pool::{Handle, TemplatePool};

use dashmap::DashMap;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// A named set of template pools sharing one factory.
///
/// The group routes `spawn`/`despawn` to the right [`TemplatePool`] by
/// template identity, creating pools on demand with default policy, and
/// keeps a redundant active set for O(1) membership queries. Template counts
/// are expected in the tens, so routing is a linear scan over an ordered
/// list rather than a map.
///
/// # Examples
///
/// ```
/// # use spawnpool::{InstanceFactory, PoolGroup, Recyclable};
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
/// let group = PoolGroup::new("board", UnitFactory);
///
/// let pawn = group.spawn("Pawn", None).unwrap();
/// assert!(group.is_active(pawn));
///
/// group.despawn(pawn).unwrap();
/// assert!(!group.is_active(pawn));
///
/// // The despawned instance is reused instead of recreated.
/// assert_eq!(group.spawn("Pawn", None).unwrap(), pawn);
/// ```
pub struct PoolGroup<F: InstanceFactory> {
    name: String,
    factory: Arc<Mutex<F>>,
    pools: Mutex<Vec<Arc<TemplatePool<F>>>>,
    active: DashMap<Handle, ()>,
    handles: Arc<AtomicU64>,
    alive: AtomicBool,
    weak: Weak<Self>,
}

impl<F: InstanceFactory> PoolGroup<F> {
    /// Create an empty group around a factory
    pub fn new(name: impl Into<String>, factory: F) -> Arc<Self> {
        let group = Arc::new_cyclic(|weak| Self {
            name: name.into(),
            factory: Arc::new(Mutex::new(factory)),
            pools: Mutex::new(Vec::new()),
            active: DashMap::new(),
            handles: Arc::new(AtomicU64::new(1)),
            alive: AtomicBool::new(true),
            weak: weak.clone(),
        });
        info!("pool group '{}' created", group.name);
        group
    }

    /// Create a group and set up one template pool per policy, running any
    /// configured preloads.
    pub fn with_pools(
        name: impl Into<String>,
        factory: F,
        policies: Vec<PoolPolicy>,
    ) -> PoolResult<Arc<Self>> {
        let group = Self::new(name, factory);
        for policy in policies {
            group.create_template_pool(policy)?;
        }
        Ok(group)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicitly create a template pool with a custom policy.
    ///
    /// Idempotent per template: a second call never creates a duplicate
    /// pool, it only merges a pending preload into the existing one. Returns
    /// the handles of any instances the preload created (despawned, ready
    /// for reuse).
    pub fn create_template_pool(&self, policy: PoolPolicy) -> PoolResult<Vec<Handle>> {
        policy.validate()?;

        // The lock is held across lookup and insert so two concurrent
        // creations of the same template cannot both miss and both push.
        let mut pools = self.pools.lock();
        if let Some(pool) = pools
            .iter()
            .find(|pool| pool.template() == policy.template)
            .cloned()
        {
            debug!(
                "group '{}': template pool '{}' already exists",
                self.name, policy.template
            );
            if policy.preload_amount > 0 && !pool.has_preloaded() {
                return pool.preload(policy.preload_amount);
            }
            return Ok(Vec::new());
        }

        let preload_amount = policy.preload_amount;
        let template = policy.template.clone();
        let pool = TemplatePool::new(
            policy,
            Arc::clone(&self.factory),
            Arc::clone(&self.handles),
        )?;
        pools.push(Arc::clone(&pool));
        info!(
            "group '{}': template pool '{}' registered",
            self.name, template
        );

        if preload_amount > 0 {
            pool.preload(preload_amount)
        } else {
            Ok(Vec::new())
        }
    }

    /// Spawn an instance of `template`, creating a default-policy template
    /// pool on first sight of an unseen template.
    ///
    /// Returns `None` only when the resolved pool's instance limit is
    /// reached.
    pub fn spawn(&self, template: &str, placement: Option<&F::Placement>) -> Option<Handle> {
        let pool = {
            // Lookup and on-demand insert under one lock, so concurrent
            // first spawns of a template resolve to a single pool.
            let mut pools = self.pools.lock();
            match pools.iter().find(|pool| pool.template() == template).cloned() {
                Some(pool) => pool,
                None => match TemplatePool::new(
                    PoolPolicy::new(template),
                    Arc::clone(&self.factory),
                    Arc::clone(&self.handles),
                ) {
                    Ok(pool) => {
                        pools.push(Arc::clone(&pool));
                        info!(
                            "group '{}': template pool '{}' created on demand",
                            self.name, template
                        );
                        pool
                    }
                    Err(err) => {
                        error!(
                            "group '{}': cannot create pool for template '{}': {}",
                            self.name, template, err
                        );
                        return None;
                    }
                },
            }
        };

        let handle = pool.spawn_instance(placement)?;
        self.active.insert(handle, ());
        Some(handle)
    }

    /// Despawn a handle, scanning owned pools to find which one holds it as
    /// spawned.
    pub fn despawn(&self, handle: Handle) -> PoolResult<()> {
        let pools = self.pools_snapshot();

        for pool in &pools {
            if pool.holds_spawned(handle) {
                pool.despawn_instance(handle)?;
                self.active.remove(&handle);
                return Ok(());
            }
        }
        for pool in &pools {
            if pool.holds_despawned(handle) {
                warn!(
                    "group '{}': handle {} is already despawned",
                    self.name, handle
                );
                return Err(PoolError::AlreadyDespawned);
            }
        }
        warn!(
            "group '{}': handle {} is not held by any template pool",
            self.name, handle
        );
        Err(PoolError::NotManaged)
    }

    /// Despawn with an explicit template hint, skipping the scan
    pub fn despawn_from(&self, template: &str, handle: Handle) -> PoolResult<()> {
        let pool = self
            .pool_for(template)
            .ok_or_else(|| PoolError::TemplateNotFound(template.to_string()))?;
        pool.despawn_instance(handle)?;
        self.active.remove(&handle);
        Ok(())
    }

    /// Schedule a despawn after `delay`.
    ///
    /// Membership is re-validated at fire time: a handle despawned early by
    /// other code is a logged no-op, while a handle found in neither or both
    /// internal states is reported as state corruption. Outside a tokio
    /// runtime the despawn happens immediately instead.
    pub fn despawn_delayed(&self, handle: Handle, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "group '{}': delayed despawn requires a tokio runtime, despawning now",
                self.name
            );
            if let Err(err) = self.despawn(handle) {
                warn!(
                    "group '{}': immediate fallback despawn of {} failed: {}",
                    self.name, handle, err
                );
            }
            return;
        };

        let weak = self.weak.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(group) = weak.upgrade() else { return };
            if !group.alive.load(Ordering::Acquire) {
                return;
            }
            group.resolve_delayed_despawn(handle);
        });
    }

    /// Schedule a despawn after `delay` with an explicit template hint,
    /// skipping the fire-time scan.
    ///
    /// The hint is resolved up front (`TemplateNotFound` if no pool matches)
    /// and membership within that pool is still re-validated when the delay
    /// elapses, with the same early-despawn no-op semantics as
    /// [`despawn_delayed`](PoolGroup::despawn_delayed).
    pub fn despawn_delayed_from(
        &self,
        template: &str,
        handle: Handle,
        delay: Duration,
    ) -> PoolResult<()> {
        let pool = self
            .pool_for(template)
            .ok_or_else(|| PoolError::TemplateNotFound(template.to_string()))?;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "group '{}': delayed despawn requires a tokio runtime, despawning now",
                self.name
            );
            return self.despawn_from(template, handle);
        };

        let weak = self.weak.clone();
        let pool = Arc::downgrade(&pool);
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(group) = weak.upgrade() else { return };
            if !group.alive.load(Ordering::Acquire) {
                return;
            }
            let Some(pool) = pool.upgrade() else { return };
            if pool.holds_spawned(handle) {
                if let Err(err) = pool.despawn_instance(handle) {
                    warn!(
                        "group '{}': delayed despawn of {} failed: {}",
                        group.name, handle, err
                    );
                } else {
                    group.active.remove(&handle);
                    debug!("group '{}': delayed despawn of {} fired", group.name, handle);
                }
            } else if pool.holds_despawned(handle) {
                debug!(
                    "group '{}': {} was despawned before its delay elapsed",
                    group.name, handle
                );
            } else {
                error!(
                    "pool state corruption: group '{}' scheduled a despawn for {} in pool '{}' but the pool no longer holds it",
                    group.name,
                    handle,
                    pool.template()
                );
            }
        });
        Ok(())
    }

    fn resolve_delayed_despawn(&self, handle: Handle) {
        let pools = self.pools_snapshot();
        let spawned_in: Vec<_> = pools
            .iter()
            .filter(|p| p.holds_spawned(handle))
            .collect();
        let despawned_in = pools.iter().filter(|p| p.holds_despawned(handle)).count();

        match (spawned_in.len(), despawned_in) {
            (1, 0) => {
                if let Err(err) = spawned_in[0].despawn_instance(handle) {
                    warn!(
                        "group '{}': delayed despawn of {} failed: {}",
                        self.name, handle, err
                    );
                } else {
                    self.active.remove(&handle);
                    debug!("group '{}': delayed despawn of {} fired", self.name, handle);
                }
            }
            (0, 1) => {
                debug!(
                    "group '{}': {} was despawned before its delay elapsed",
                    self.name, handle
                );
            }
            (0, 0) => {
                error!(
                    "pool state corruption: group '{}' scheduled a despawn for {} but no template pool holds it",
                    self.name, handle
                );
            }
            _ => {
                error!(
                    "pool state corruption: group '{}' found {} in multiple pool states",
                    self.name, handle
                );
            }
        }
    }

    /// Despawn every active instance. The active set is snapshotted first so
    /// the set being iterated is never the one being mutated.
    pub fn despawn_all(&self) {
        let snapshot: Vec<Handle> = self.active.iter().map(|entry| *entry.key()).collect();
        debug!(
            "group '{}': despawning all {} active instances",
            self.name,
            snapshot.len()
        );
        for handle in snapshot {
            if let Err(err) = self.despawn(handle) {
                warn!(
                    "group '{}': despawn-all skipped {}: {}",
                    self.name, handle, err
                );
            }
        }
    }

    /// O(1) query against the redundant active set
    pub fn is_active(&self, handle: Handle) -> bool {
        self.active.contains_key(&handle)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Register an instance created outside the pool (for example at process
    /// start) into the matching template pool, bypassing the factory.
    ///
    /// Adopted instances count against the pool's limit; a full pool rejects
    /// the adoption with [`PoolError::LimitReached`].
    pub fn adopt(
        &self,
        template: &str,
        instance: F::Instance,
        start_despawned: bool,
    ) -> PoolResult<Handle> {
        let pool = self
            .pool_for(template)
            .ok_or_else(|| PoolError::TemplateNotFound(template.to_string()))?;
        let handle = pool.adopt(instance, start_despawned)?;
        if !start_despawned {
            self.active.insert(handle, ());
        }
        Ok(handle)
    }

    /// Stop all deferred work and destroy every owned instance.
    pub fn teardown(&self) {
        self.alive.store(false, Ordering::Release);
        let pools = std::mem::take(&mut *self.pools.lock());
        for pool in &pools {
            pool.self_destruct();
        }
        self.active.clear();
        info!(
            "pool group '{}' torn down, {} template pools destroyed",
            self.name,
            pools.len()
        );
    }

    /// Look up an owned template pool by template identity
    pub fn template_pool(&self, template: &str) -> Option<Arc<TemplatePool<F>>> {
        self.pool_for(template)
    }

    /// Templates this group currently has pools for, in creation order
    pub fn templates(&self) -> Vec<String> {
        self.pools
            .lock()
            .iter()
            .map(|pool| pool.template().to_string())
            .collect()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }

    /// Run a closure against a pooled instance, wherever it lives
    pub fn with_instance<R>(&self, handle: Handle, f: impl FnOnce(&F::Instance) -> R) -> Option<R> {
        let pool = self
            .pools_snapshot()
            .into_iter()
            .find(|pool| pool.contains(handle))?;
        pool.with_instance(handle, f)
    }

    /// Run a closure against a pooled instance, mutably
    pub fn with_instance_mut<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut F::Instance) -> R,
    ) -> Option<R> {
        let pool = self
            .pools_snapshot()
            .into_iter()
            .find(|pool| pool.contains(handle))?;
        pool.with_instance_mut(handle, f)
    }

    /// Snapshot statistics for every owned template pool
    pub fn stats(&self) -> Vec<PoolStats> {
        self.pools_snapshot().iter().map(|p| p.stats()).collect()
    }

    fn pool_for(&self, template: &str) -> Option<Arc<TemplatePool<F>>> {
        self.pools
            .lock()
            .iter()
            .find(|pool| pool.template() == template)
            .cloned()
    }

    fn pools_snapshot(&self) -> Vec<Arc<TemplatePool<F>>> {
        self.pools.lock().clone()
    }
}
