//! Per-template reuse pool: the core spawn/despawn state machine

use crate::config::PoolPolicy;
use crate::errors::{PoolError, PoolResult};
use crate::factory::{InstanceFactory, Recyclable};
use crate::label::display_label;
use crate::stats::{PoolStats, StatsTracker};

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Opaque identity of a pooled instance
///
/// Handles are allocated from a per-group monotone counter, so a handle is
/// never reissued within a group even after its instance is culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Knobs for a single despawn call
///
/// Defaults fire the `on_despawned` hook and deactivate the instance through
/// the factory; either side effect can be suppressed per call.
#[derive(Debug, Clone, Copy)]
pub struct DespawnOptions {
    pub fire_hooks: bool,
    pub deactivate: bool,
}

impl Default for DespawnOptions {
    fn default() -> Self {
        Self {
            fire_hooks: true,
            deactivate: true,
        }
    }
}

struct Slot<T> {
    instance: T,
    label: String,
}

struct PoolState<T> {
    /// Backing storage for every instance this pool owns
    slots: HashMap<Handle, Slot<T>>,
    /// Active instances, membership only
    spawned: HashSet<Handle>,
    /// Reusable instances, oldest-despawned at the front
    despawned: VecDeque<Handle>,
}

impl<T> PoolState<T> {
    fn total(&self) -> usize {
        self.spawned.len() + self.despawned.len()
    }
}

impl<T> Default for PoolState<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            spawned: HashSet::new(),
            despawned: VecDeque::new(),
        }
    }
}

/// Reuse pool for one template identity.
///
/// Owns every instance it ever created until self-destruct or culling.
/// Instances move Spawned ⇄ Despawned through [`spawn_instance`] and
/// [`despawn_instance`]; culling destroys excess despawned instances after a
/// delay, oldest-idle first, complementing the oldest-first reuse order so
/// resources age evenly.
///
/// [`spawn_instance`]: TemplatePool::spawn_instance
/// [`despawn_instance`]: TemplatePool::despawn_instance
pub struct TemplatePool<F: InstanceFactory> {
    template: String,
    policy: PoolPolicy,
    factory: Arc<Mutex<F>>,
    handles: Arc<AtomicU64>,
    state: Mutex<PoolState<F::Instance>>,
    preloaded: AtomicBool,
    culling_active: AtomicBool,
    alive: AtomicBool,
    counters: StatsTracker,
    weak: Weak<Self>,
}

impl<F: InstanceFactory> TemplatePool<F> {
    pub(crate) fn new(
        policy: PoolPolicy,
        factory: Arc<Mutex<F>>,
        handles: Arc<AtomicU64>,
    ) -> PoolResult<Arc<Self>> {
        policy.validate()?;
        let template = policy.template.clone();
        Ok(Arc::new_cyclic(|weak| Self {
            template,
            policy,
            factory,
            handles,
            state: Mutex::new(PoolState::default()),
            preloaded: AtomicBool::new(false),
            culling_active: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            counters: StatsTracker::default(),
            weak: weak.clone(),
        }))
    }

    /// Eagerly create instances until `amount` exist, each demoted straight
    /// into the despawn queue without firing activation hooks.
    ///
    /// Fails with [`PoolError::AlreadyPreloaded`] on a second call and with
    /// [`PoolError::PreloadLimitConflict`] as soon as the instance limit
    /// makes further progress impossible; instances created before the
    /// conflict are kept.
    pub fn preload(&self, amount: usize) -> PoolResult<Vec<Handle>> {
        if self.preloaded.swap(true, Ordering::AcqRel) {
            return Err(PoolError::AlreadyPreloaded);
        }

        let mut created = Vec::new();
        let mut state = self.state.lock();
        while state.total() < amount {
            if self.policy.limit_enabled && state.total() >= self.policy.limit_amount {
                warn!(
                    "pool '{}': preload target {} conflicts with limit {}, stopping at {}",
                    self.template,
                    amount,
                    self.policy.limit_amount,
                    state.total()
                );
                return Err(PoolError::PreloadLimitConflict {
                    requested: amount,
                    limit: self.policy.limit_amount,
                });
            }
            let handle = self.create_slot(&mut state);
            let slot = state.slots.get_mut(&handle).expect("slot just created");
            self.factory.lock().set_active(&mut slot.instance, false);
            state.despawned.push_back(handle);
            created.push(handle);
        }
        info!(
            "pool '{}': preloaded {} instances",
            self.template,
            created.len()
        );
        Ok(created)
    }

    /// Activate an instance, reusing the oldest despawned one when the queue
    /// is non-empty and creating through the factory otherwise.
    ///
    /// Returns `None` only when the instance limit is reached - a legitimate
    /// steady-state signal, not an error.
    pub fn spawn_instance(&self, placement: Option<&F::Placement>) -> Option<Handle> {
        self.spawn_with(placement, true)
    }

    /// Same as [`spawn_instance`](TemplatePool::spawn_instance) but without
    /// firing the `on_spawned`/`on_respawned` hook.
    pub fn spawn_instance_quiet(&self, placement: Option<&F::Placement>) -> Option<Handle> {
        self.spawn_with(placement, false)
    }

    fn spawn_with(&self, placement: Option<&F::Placement>, fire_hooks: bool) -> Option<Handle> {
        let mut state = self.state.lock();

        // Oldest-despawned-first reuse, so resources age evenly.
        if let Some(handle) = state.despawned.pop_front() {
            state.spawned.insert(handle);
            let slot = state
                .slots
                .get_mut(&handle)
                .expect("despawned handle has a backing instance");
            {
                let mut factory = self.factory.lock();
                factory.set_active(&mut slot.instance, true);
                factory.place(&mut slot.instance, placement);
            }
            if fire_hooks {
                slot.instance.on_respawned();
            }
            if self.policy.verbose_logging {
                debug!("pool '{}': respawned '{}'", self.template, slot.label);
            }
            self.counters.record_reused();
            return Some(handle);
        }

        if self.policy.limit_enabled && state.total() >= self.policy.limit_amount {
            debug!(
                "pool '{}': limit of {} reached, spawn refused",
                self.template, self.policy.limit_amount
            );
            self.counters.record_limit_hit();
            return None;
        }

        let handle = self.create_slot(&mut state);
        state.spawned.insert(handle);
        let slot = state.slots.get_mut(&handle).expect("slot just created");
        {
            let mut factory = self.factory.lock();
            factory.set_active(&mut slot.instance, true);
            factory.place(&mut slot.instance, placement);
        }
        if fire_hooks {
            slot.instance.on_spawned();
        }
        if self.policy.verbose_logging {
            debug!("pool '{}': spawned fresh '{}'", self.template, slot.label);
        }
        Some(handle)
    }

    /// Create an instance through the factory and register its slot.
    ///
    /// The display label ordinal is the total count at creation time plus
    /// one, which can repeat after culling shrinks the pool; labels are
    /// diagnostics, the handle is the identity.
    fn create_slot(&self, state: &mut PoolState<F::Instance>) -> Handle {
        let label = display_label(&self.template, state.total() + 1);
        let instance = self.factory.lock().create(&self.template);
        let handle = Handle(self.handles.fetch_add(1, Ordering::Relaxed));
        if self.policy.verbose_logging {
            debug!("pool '{}': created '{}' as {}", self.template, label, handle);
        }
        state.slots.insert(handle, Slot { instance, label });
        self.counters.record_created();
        handle
    }

    /// Deactivate a spawned instance back into the despawn queue.
    pub fn despawn_instance(&self, handle: Handle) -> PoolResult<()> {
        self.despawn_with(handle, DespawnOptions::default())
    }

    /// Despawn with per-call control over hook delivery and deactivation.
    pub fn despawn_with(&self, handle: Handle, options: DespawnOptions) -> PoolResult<()> {
        {
            let mut state = self.state.lock();
            if !state.spawned.contains(&handle) {
                if state.despawned.contains(&handle) {
                    warn!(
                        "pool '{}': double despawn of {} rejected",
                        self.template, handle
                    );
                    return Err(PoolError::AlreadyDespawned);
                }
                return Err(PoolError::NotSpawned);
            }
            if !state.slots.contains_key(&handle) {
                let message = format!(
                    "spawned handle {handle} has no backing instance in pool '{}'",
                    self.template
                );
                error!("pool state corruption: {message}");
                return Err(PoolError::StateCorruption(message));
            }

            state.spawned.remove(&handle);
            state.despawned.push_back(handle);
            let slot = state.slots.get_mut(&handle).expect("presence checked above");
            if options.fire_hooks {
                slot.instance.on_despawned();
            }
            if options.deactivate {
                self.factory.lock().set_active(&mut slot.instance, false);
            }
            if self.policy.verbose_logging {
                debug!("pool '{}': despawned '{}'", self.template, slot.label);
            }
            self.counters.record_despawned();
        }

        self.maybe_arm_culling();
        Ok(())
    }

    /// Register an instance created outside the factory, starting it in
    /// either state. An adopted instance counts against the limit like any
    /// other, so a full pool rejects the adoption.
    pub(crate) fn adopt(
        &self,
        instance: F::Instance,
        start_despawned: bool,
    ) -> PoolResult<Handle> {
        let mut state = self.state.lock();
        if self.policy.limit_enabled && state.total() >= self.policy.limit_amount {
            warn!(
                "pool '{}': adoption refused, limit of {} reached",
                self.template, self.policy.limit_amount
            );
            return Err(PoolError::LimitReached);
        }
        let label = display_label(&self.template, state.total() + 1);
        let handle = Handle(self.handles.fetch_add(1, Ordering::Relaxed));
        info!(
            "pool '{}': adopted foreign instance as '{}' ({})",
            self.template, label, handle
        );
        state.slots.insert(handle, Slot { instance, label });
        if start_despawned {
            let slot = state.slots.get_mut(&handle).expect("slot just inserted");
            self.factory.lock().set_active(&mut slot.instance, false);
            state.despawned.push_back(handle);
        } else {
            state.spawned.insert(handle);
        }
        Ok(handle)
    }

    /// Arm the single culling task when the policy asks for it and the total
    /// sits above the threshold. A no-op while a task is already running.
    fn maybe_arm_culling(&self) {
        if !self.policy.cull_enabled {
            return;
        }
        if self.state.lock().total() <= self.policy.cull_above {
            return;
        }
        if self.culling_active.swap(true, Ordering::AcqRel) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "pool '{}': culling requires a tokio runtime, skipping",
                self.template
            );
            self.culling_active.store(false, Ordering::Release);
            return;
        };

        info!(
            "pool '{}': culling armed, {} instances above threshold {}",
            self.template,
            self.state.lock().total(),
            self.policy.cull_above
        );

        let weak = self.weak.clone();
        let delay = self.policy.cull_delay;
        runtime.spawn(async move {
            loop {
                tokio::time::sleep(delay).await;
                // Teardown cancels the task implicitly: either the pool is
                // gone or its liveness flag is down.
                let Some(pool) = weak.upgrade() else { return };
                if !pool.alive.load(Ordering::Acquire) {
                    return;
                }
                if pool.cull_pass() {
                    return;
                }
            }
        });
    }

    /// One culling pass: destroy up to `cull_max_per_pass` instances from the
    /// front of the despawn queue. Returns true once the total has dropped to
    /// the threshold and the task should stop.
    fn cull_pass(&self) -> bool {
        let mut victims = Vec::new();
        let done = {
            let mut state = self.state.lock();
            while victims.len() < self.policy.cull_max_per_pass
                && state.total() > self.policy.cull_above
            {
                match state.despawned.pop_front() {
                    Some(handle) => {
                        let slot = state.slots.remove(&handle);
                        victims.push((handle, slot));
                    }
                    // Everything left is spawned; wait for more despawns.
                    None => break,
                }
            }
            state.total() <= self.policy.cull_above
        };

        if !victims.is_empty() {
            let mut culled = 0usize;
            let mut factory = self.factory.lock();
            for (handle, slot) in victims {
                match slot {
                    Some(slot) => {
                        if self.policy.verbose_logging {
                            debug!("pool '{}': culled '{}'", self.template, slot.label);
                        }
                        factory.destroy(slot.instance);
                        culled += 1;
                    }
                    None => error!(
                        "pool '{}': culled handle {} had no backing instance, skipped",
                        self.template, handle
                    ),
                }
            }
            self.counters.record_culled(culled);
        }

        if done {
            self.culling_active.store(false, Ordering::Release);
            info!(
                "pool '{}': culling finished at {} instances",
                self.template,
                self.state.lock().total()
            );
        }
        done
    }

    /// Destroy every owned instance and clear all collections. Pending
    /// deferred work observes the cleared liveness flag and stops.
    pub fn self_destruct(&self) {
        self.alive.store(false, Ordering::Release);
        let slots = {
            let mut state = self.state.lock();
            state.spawned.clear();
            state.despawned.clear();
            std::mem::take(&mut state.slots)
        };
        let count = slots.len();
        let mut factory = self.factory.lock();
        for (_, slot) in slots {
            if self.policy.verbose_logging {
                debug!("pool '{}': destroying '{}'", self.template, slot.label);
            }
            factory.destroy(slot.instance);
        }
        drop(factory);
        info!(
            "pool '{}': self-destructed, {} instances destroyed",
            self.template, count
        );
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn policy(&self) -> &PoolPolicy {
        &self.policy
    }

    pub fn spawned_count(&self) -> usize {
        self.state.lock().spawned.len()
    }

    pub fn despawned_count(&self) -> usize {
        self.state.lock().despawned.len()
    }

    /// Total instances currently owned (spawned + despawned)
    pub fn total(&self) -> usize {
        self.state.lock().total()
    }

    pub fn has_preloaded(&self) -> bool {
        self.preloaded.load(Ordering::Acquire)
    }

    pub fn is_culling_active(&self) -> bool {
        self.culling_active.load(Ordering::Acquire)
    }

    pub fn holds_spawned(&self, handle: Handle) -> bool {
        self.state.lock().spawned.contains(&handle)
    }

    pub fn holds_despawned(&self, handle: Handle) -> bool {
        self.state.lock().despawned.contains(&handle)
    }

    /// Whether this pool owns the instance behind `handle`, in either state
    pub fn contains(&self, handle: Handle) -> bool {
        self.state.lock().slots.contains_key(&handle)
    }

    /// Display label of an owned instance. Labels can repeat after culling
    /// (the creation ordinal derives from the current total, not a monotone
    /// counter); use the handle for identity.
    pub fn label(&self, handle: Handle) -> Option<String> {
        self.state.lock().slots.get(&handle).map(|s| s.label.clone())
    }

    /// Run a closure against an owned instance
    pub fn with_instance<R>(&self, handle: Handle, f: impl FnOnce(&F::Instance) -> R) -> Option<R> {
        self.state.lock().slots.get(&handle).map(|s| f(&s.instance))
    }

    /// Run a closure against an owned instance, mutably
    pub fn with_instance_mut<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut F::Instance) -> R,
    ) -> Option<R> {
        self.state
            .lock()
            .slots
            .get_mut(&handle)
            .map(|s| f(&mut s.instance))
    }

    /// Snapshot lifetime counters and current occupancy
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let limit = self.policy.limit_enabled.then_some(self.policy.limit_amount);
        self.counters
            .snapshot(&self.template, state.spawned.len(), state.despawned.len(), limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Recyclable;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct Widget {
        active: bool,
        position: (i32, i32),
        spawned_hits: usize,
        respawned_hits: usize,
        despawned_hits: usize,
    }

    impl Recyclable for Widget {
        fn on_spawned(&mut self) {
            self.spawned_hits += 1;
        }
        fn on_respawned(&mut self) {
            self.respawned_hits += 1;
        }
        fn on_despawned(&mut self) {
            self.despawned_hits += 1;
        }
    }

    struct WidgetFactory {
        created: Arc<AtomicUsize>,
        destroyed: Arc<AtomicUsize>,
    }

    impl InstanceFactory for WidgetFactory {
        type Instance = Widget;
        type Placement = (i32, i32);

        fn create(&mut self, _template: &str) -> Widget {
            self.created.fetch_add(1, Ordering::Relaxed);
            Widget::default()
        }

        fn destroy(&mut self, _instance: Widget) {
            self.destroyed.fetch_add(1, Ordering::Relaxed);
        }

        fn set_active(&mut self, instance: &mut Widget, active: bool) {
            instance.active = active;
        }

        fn place(&mut self, instance: &mut Widget, placement: Option<&(i32, i32)>) {
            instance.position = placement.copied().unwrap_or((0, 0));
        }
    }

    struct Counters {
        created: Arc<AtomicUsize>,
        destroyed: Arc<AtomicUsize>,
    }

    fn pool_with(policy: PoolPolicy) -> (Arc<TemplatePool<WidgetFactory>>, Counters) {
        let created = Arc::new(AtomicUsize::new(0));
        let destroyed = Arc::new(AtomicUsize::new(0));
        let factory = WidgetFactory {
            created: Arc::clone(&created),
            destroyed: Arc::clone(&destroyed),
        };
        let pool = TemplatePool::new(
            policy,
            Arc::new(Mutex::new(factory)),
            Arc::new(AtomicU64::new(1)),
        )
        .unwrap();
        (pool, Counters { created, destroyed })
    }

    #[test]
    fn fifo_reuse_across_three_instances() {
        let (pool, _) = pool_with(PoolPolicy::new("Widget"));

        let a = pool.spawn_instance(None).unwrap();
        let b = pool.spawn_instance(None).unwrap();
        let c = pool.spawn_instance(None).unwrap();

        // Despawn order a, b, c: reuse must come back in the same order.
        pool.despawn_instance(a).unwrap();
        pool.despawn_instance(b).unwrap();
        pool.despawn_instance(c).unwrap();

        assert_eq!(pool.spawn_instance(None).unwrap(), a);
        assert_eq!(pool.spawn_instance(None).unwrap(), b);
        assert_eq!(pool.spawn_instance(None).unwrap(), c);
    }

    #[test]
    fn spawned_and_despawned_stay_disjoint() {
        let (pool, _) = pool_with(PoolPolicy::new("Widget"));

        let mut handles = Vec::new();
        for _ in 0..5 {
            handles.push(pool.spawn_instance(None).unwrap());
        }
        for handle in handles.iter().step_by(2) {
            pool.despawn_instance(*handle).unwrap();
        }
        for handle in handles {
            assert!(pool.holds_spawned(handle) != pool.holds_despawned(handle));
        }
        assert_eq!(pool.spawned_count() + pool.despawned_count(), 5);
    }

    #[test]
    fn limit_refuses_overflow_without_growing() {
        let (pool, counters) = pool_with(PoolPolicy::new("Widget").with_limit(2));

        let a = pool.spawn_instance(None).unwrap();
        let _b = pool.spawn_instance(None).unwrap();
        assert_eq!(pool.spawn_instance(None), None);
        assert_eq!(pool.total(), 2);
        assert_eq!(counters.created.load(Ordering::Relaxed), 2);

        // A despawned instance makes room via reuse, not creation.
        pool.despawn_instance(a).unwrap();
        assert_eq!(pool.spawn_instance(None).unwrap(), a);
        assert_eq!(counters.created.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn double_despawn_is_rejected_and_state_unchanged() {
        let (pool, _) = pool_with(PoolPolicy::new("Widget"));

        let handle = pool.spawn_instance(None).unwrap();
        pool.despawn_instance(handle).unwrap();
        assert_eq!(
            pool.despawn_instance(handle),
            Err(PoolError::AlreadyDespawned)
        );
        assert_eq!(pool.despawned_count(), 1);
        assert_eq!(pool.spawned_count(), 0);
    }

    #[test]
    fn despawn_of_unknown_handle_is_not_spawned() {
        let (pool, _) = pool_with(PoolPolicy::new("Widget"));
        let _ = pool.spawn_instance(None).unwrap();
        assert_eq!(
            pool.despawn_instance(Handle(999)),
            Err(PoolError::NotSpawned)
        );
    }

    #[test]
    fn preload_fills_despawn_queue_without_hooks() {
        let (pool, counters) = pool_with(PoolPolicy::new("Widget"));

        let handles = pool.preload(3).unwrap();
        assert_eq!(handles.len(), 3);
        assert_eq!(pool.despawned_count(), 3);
        assert_eq!(pool.spawned_count(), 0);
        assert_eq!(counters.created.load(Ordering::Relaxed), 3);

        for handle in &handles {
            pool.with_instance(*handle, |w| {
                assert!(!w.active);
                assert_eq!(w.spawned_hits, 0);
            })
            .unwrap();
        }
    }

    #[test]
    fn preload_twice_fails() {
        let (pool, _) = pool_with(PoolPolicy::new("Widget"));
        pool.preload(2).unwrap();
        assert_eq!(pool.preload(2), Err(PoolError::AlreadyPreloaded));
        assert_eq!(pool.total(), 2);
    }

    #[test]
    fn preload_conflicting_with_limit_fails_fast() {
        let (pool, counters) = pool_with(PoolPolicy::new("Widget").with_limit(5));

        assert_eq!(
            pool.preload(10),
            Err(PoolError::PreloadLimitConflict {
                requested: 10,
                limit: 5
            })
        );
        // Exactly the limit's worth of instances exist, no more.
        assert_eq!(pool.total(), 5);
        assert_eq!(counters.created.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn hooks_fire_on_the_right_transitions() {
        let (pool, _) = pool_with(PoolPolicy::new("Widget"));

        let handle = pool.spawn_instance(Some(&(4, 2))).unwrap();
        pool.with_instance(handle, |w| {
            assert_eq!(w.spawned_hits, 1);
            assert_eq!(w.respawned_hits, 0);
            assert_eq!(w.position, (4, 2));
            assert!(w.active);
        })
        .unwrap();

        pool.despawn_instance(handle).unwrap();
        pool.with_instance(handle, |w| {
            assert_eq!(w.despawned_hits, 1);
            assert!(!w.active);
        })
        .unwrap();

        let again = pool.spawn_instance(None).unwrap();
        assert_eq!(again, handle);
        pool.with_instance(handle, |w| {
            assert_eq!(w.spawned_hits, 1);
            assert_eq!(w.respawned_hits, 1);
            assert_eq!(w.position, (0, 0));
        })
        .unwrap();
    }

    #[test]
    fn quiet_spawn_and_despawn_suppress_side_effects() {
        let (pool, _) = pool_with(PoolPolicy::new("Widget"));

        let handle = pool.spawn_instance_quiet(None).unwrap();
        pool.with_instance(handle, |w| assert_eq!(w.spawned_hits, 0))
            .unwrap();

        pool.despawn_with(
            handle,
            DespawnOptions {
                fire_hooks: false,
                deactivate: false,
            },
        )
        .unwrap();
        pool.with_instance(handle, |w| {
            assert_eq!(w.despawned_hits, 0);
            assert!(w.active);
        })
        .unwrap();
    }

    #[test]
    fn labels_are_sequential_at_creation() {
        let (pool, _) = pool_with(PoolPolicy::new("Card"));

        let a = pool.spawn_instance(None).unwrap();
        let b = pool.spawn_instance(None).unwrap();
        assert_eq!(pool.label(a).unwrap(), "Card001");
        assert_eq!(pool.label(b).unwrap(), "Card002");
    }

    #[test]
    fn self_destruct_destroys_everything() {
        let (pool, counters) = pool_with(PoolPolicy::new("Widget"));

        let a = pool.spawn_instance(None).unwrap();
        let _b = pool.spawn_instance(None).unwrap();
        pool.despawn_instance(a).unwrap();

        pool.self_destruct();
        assert_eq!(pool.total(), 0);
        assert_eq!(counters.destroyed.load(Ordering::Relaxed), 2);
        assert!(!pool.contains(a));
    }

    #[test]
    fn stats_track_reuse_and_limit_hits() {
        let (pool, _) = pool_with(PoolPolicy::new("Widget").with_limit(1));

        let handle = pool.spawn_instance(None).unwrap();
        assert_eq!(pool.spawn_instance(None), None);
        pool.despawn_instance(handle).unwrap();
        pool.spawn_instance(None).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.total_created, 1);
        assert_eq!(stats.total_reused, 1);
        assert_eq!(stats.total_despawned, 1);
        assert_eq!(stats.limit_hits, 1);
        assert_eq!(stats.utilization, Some(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn culling_reclaims_down_to_threshold() {
        let policy = PoolPolicy::new("Widget").with_culling(5, Duration::from_secs(1), 2);
        let (pool, counters) = pool_with(policy);

        let handles: Vec<_> = (0..8).map(|_| pool.spawn_instance(None).unwrap()).collect();
        for handle in handles {
            pool.despawn_instance(handle).unwrap();
        }
        assert!(pool.is_culling_active());
        assert_eq!(pool.total(), 8);

        // First pass after one delay destroys at most two.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(pool.total(), 6);
        assert!(pool.is_culling_active());

        // Second pass needs only one more to reach the threshold.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(pool.total(), 5);
        assert!(!pool.is_culling_active());
        assert_eq!(counters.destroyed.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn culling_rearms_after_finishing() {
        let policy = PoolPolicy::new("Widget").with_culling(2, Duration::from_secs(1), 4);
        let (pool, _) = pool_with(policy);

        let handles: Vec<_> = (0..4).map(|_| pool.spawn_instance(None).unwrap()).collect();
        for handle in handles {
            pool.despawn_instance(handle).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(pool.total(), 2);
        assert!(!pool.is_culling_active());

        // Push the total back over the threshold; culling must arm again.
        let extra: Vec<_> = (0..3)
            .map(|_| pool.spawn_instance(None).unwrap())
            .collect();
        for handle in extra {
            pool.despawn_instance(handle).unwrap();
        }
        assert!(pool.is_culling_active());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(pool.total(), 2);
        assert!(!pool.is_culling_active());
    }

    #[tokio::test(start_paused = true)]
    async fn culling_spares_spawned_instances() {
        let policy = PoolPolicy::new("Widget").with_culling(1, Duration::from_secs(1), 8);
        let (pool, _) = pool_with(policy);

        let keep_a = pool.spawn_instance(None).unwrap();
        let keep_b = pool.spawn_instance(None).unwrap();
        let drop_c = pool.spawn_instance(None).unwrap();
        pool.despawn_instance(drop_c).unwrap();

        // Only the one despawned instance is eligible; the pass drains the
        // queue, stays above the threshold, and keeps polling.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(pool.total(), 2);
        assert!(pool.holds_spawned(keep_a));
        assert!(pool.holds_spawned(keep_b));
        assert!(pool.is_culling_active());

        // Despawning one more lets the still-armed task finish the job.
        pool.despawn_instance(keep_b).unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(pool.total(), 1);
        assert!(!pool.is_culling_active());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_culling() {
        let policy = PoolPolicy::new("Widget").with_culling(0, Duration::from_secs(5), 1);
        let (pool, counters) = pool_with(policy);

        let handle = pool.spawn_instance(None).unwrap();
        pool.despawn_instance(handle).unwrap();
        assert!(pool.is_culling_active());

        pool.self_destruct();
        assert_eq!(counters.destroyed.load(Ordering::Relaxed), 1);

        // The armed task resumes after its delay, sees the pool dead, and
        // must not destroy anything twice.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(counters.destroyed.load(Ordering::Relaxed), 1);
    }
}
