//! Boundary traits: the instance factory and the lifecycle-hook capability

/// Creates, destroys, and manipulates concrete instances on behalf of the pool.
///
/// The pool never constructs or drops an instance itself; every transition
/// that touches the underlying resource goes through the factory. `create`
/// is expected to fail hard (panic) on a template the factory does not
/// recognize - an unknown template is a wiring bug, not a condition the
/// pool can recover from.
///
/// # Examples
///
/// ```
/// use spawnpool::{InstanceFactory, Recyclable};
///
/// struct Sprite { visible: bool }
/// impl Recyclable for Sprite {}
///
/// struct SpriteFactory;
/// impl InstanceFactory for SpriteFactory {
///     type Instance = Sprite;
///     type Placement = (f32, f32);
///
///     fn create(&mut self, _template: &str) -> Sprite {
///         Sprite { visible: true }
///     }
///     fn destroy(&mut self, _instance: Sprite) {}
///     fn set_active(&mut self, instance: &mut Sprite, active: bool) {
///         instance.visible = active;
///     }
///     fn place(&mut self, _instance: &mut Sprite, _placement: Option<&(f32, f32)>) {}
/// }
/// ```
pub trait InstanceFactory: Send + 'static {
    /// Concrete pooled resource
    type Instance: Recyclable + Send + 'static;

    /// Opaque placement value applied on (re)activation
    type Placement;

    /// Create a fresh instance for `template`. Fatal for unknown templates.
    fn create(&mut self, template: &str) -> Self::Instance;

    /// Permanently destroy an instance. Called on culling and teardown.
    fn destroy(&mut self, instance: Self::Instance);

    /// Activate or deactivate an instance without destroying it.
    fn set_active(&mut self, instance: &mut Self::Instance, active: bool);

    /// Apply a placement on (re)activation. `None` means the caller omitted
    /// one and the factory's default-placement policy applies.
    fn place(&mut self, instance: &mut Self::Instance, placement: Option<&Self::Placement>);
}

/// Lifecycle hooks delivered to pooled instances.
///
/// Delivery is fire-and-forget: every method defaults to a no-op, so an
/// instance that does not care about a transition simply leaves it
/// unimplemented. Receivers hold no reference back into the pool, which
/// keeps a hook from re-entering pool mutation mid-transition.
pub trait Recyclable {
    /// First activation of a freshly created instance
    fn on_spawned(&mut self) {}

    /// Reactivation of an instance pulled back out of the despawn queue
    fn on_respawned(&mut self) {}

    /// Deactivation back into the despawn queue
    fn on_despawned(&mut self) {}
}
