//! Named directory of pool groups

use crate::factory::InstanceFactory;
use crate::group::PoolGroup;

use dashmap::DashMap;
use log::{info, warn};
use std::sync::Arc;

/// Process-scoped directory mapping group names to [`PoolGroup`]s.
///
/// Deliberately injectable rather than an ambient singleton: construct one
/// per process (or per test) and pass it where lookup by name is needed.
/// Names are expected unique; registering a duplicate logs the conflict and
/// the newest registration wins for lookups.
///
/// # Examples
///
/// ```
/// # use spawnpool::{InstanceFactory, PoolGroup, PoolRegistry, Recyclable};
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
/// let registry = PoolRegistry::new();
/// let group = PoolGroup::new("board", UnitFactory);
/// registry.register(group.clone());
///
/// let found = registry.lookup("board").unwrap();
/// assert_eq!(found.name(), "board");
///
/// registry.unregister(&group);
/// assert!(registry.lookup("board").is_none());
/// ```
pub struct PoolRegistry<F: InstanceFactory> {
    groups: DashMap<String, Arc<PoolGroup<F>>>,
}

impl<F: InstanceFactory> PoolRegistry<F> {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Add a group under its name, overwriting any previous registration
    pub fn register(&self, group: Arc<PoolGroup<F>>) {
        let name = group.name().to_string();
        if self.groups.insert(name.clone(), group).is_some() {
            warn!("registry: pool group name '{name}' registered twice, newest wins");
        } else {
            info!("registry: pool group '{name}' registered");
        }
    }

    /// Remove a group by identity; a no-op when a different group of the
    /// same name has since taken the slot, or when the group is absent.
    pub fn unregister(&self, group: &Arc<PoolGroup<F>>) {
        self.groups
            .remove_if(group.name(), |_, registered| Arc::ptr_eq(registered, group));
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<PoolGroup<F>>> {
        self.groups.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Tear down every registered group and clear the directory
    pub fn teardown_all(&self) {
        for entry in self.groups.iter() {
            entry.value().teardown();
        }
        self.groups.clear();
        info!("registry: all pool groups torn down");
    }
}

impl<F: InstanceFactory> Default for PoolRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}
