//! # spawnpool
//!
//! Template-keyed instance-reuse pool: hand out reusable instance handles,
//! recycle them instead of destroying and recreating, and cull excess
//! recycled instances under configurable pressure.
//!
//! ## Features
//!
//! - Spawn/despawn recycling with FIFO reuse (oldest-despawned first, so
//!   resources age evenly)
//! - Per-template policies: preloading, hard instance limits, delayed
//!   culling with bounded per-pass destruction
//! - Pool groups that route requests by template and answer active-set
//!   membership in O(1)
//! - An injectable named registry of groups (no ambient singleton)
//! - Lifecycle hooks (`on_spawned` / `on_respawned` / `on_despawned`) as an
//!   optional capability with no-op defaults
//! - Delayed despawn and culling as tokio tasks cancelled implicitly by
//!   teardown
//! - Per-pool statistics snapshots
//!
//! ## Quick Start
//!
//! ```rust
//! use spawnpool::{InstanceFactory, PoolGroup, PoolPolicy, Recyclable};
//!
//! # struct Card;
//! # impl Recyclable for Card {}
//! # struct CardFactory;
//! # impl InstanceFactory for CardFactory {
//! #     type Instance = Card;
//! #     type Placement = (f32, f32);
//! #     fn create(&mut self, _t: &str) -> Card { Card }
//! #     fn destroy(&mut self, _i: Card) {}
//! #     fn set_active(&mut self, _i: &mut Card, _a: bool) {}
//! #     fn place(&mut self, _i: &mut Card, _p: Option<&(f32, f32)>) {}
//! # }
//! let group = PoolGroup::new("table", CardFactory);
//! group.create_template_pool(PoolPolicy::new("Card").with_limit(3))?;
//!
//! let card = group.spawn("Card", Some(&(10.0, 20.0))).unwrap();
//! group.despawn(card)?;
//!
//! // Reuse, not a new instance.
//! assert_eq!(group.spawn("Card", None).unwrap(), card);
//! # Ok::<(), spawnpool::PoolError>(())
//! ```

mod config;
mod errors;
mod factory;
mod group;
pub mod label;
mod registry;
mod stats;
mod template_pool;

pub use config::PoolPolicy;
pub use errors::{PoolError, PoolResult};
pub use factory::{InstanceFactory, Recyclable};
pub use group::PoolGroup;
pub use registry::PoolRegistry;
pub use stats::PoolStats;
pub use template_pool::{DespawnOptions, Handle, TemplatePool};
