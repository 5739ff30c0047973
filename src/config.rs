//! Per-template pool policy options

use crate::errors::{PoolError, PoolResult};
use std::time::Duration;

/// Policy for a single template pool
///
/// A policy names the template it governs and configures preloading, the
/// hard instance limit, and the culling behavior that reclaims excess
/// despawned instances after a delay.
///
/// # Examples
///
/// ```
/// use spawnpool::PoolPolicy;
/// use std::time::Duration;
///
/// let policy = PoolPolicy::new("Card")
///     .with_preload(4)
///     .with_limit(16)
///     .with_culling(8, Duration::from_secs(30), 2);
///
/// assert_eq!(policy.preload_amount, 4);
/// assert!(policy.limit_enabled);
/// assert_eq!(policy.cull_above, 8);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolPolicy {
    /// Template identity this policy governs (factory key)
    pub template: String,

    /// Number of instances to create up front, despawned and ready for reuse
    pub preload_amount: usize,

    /// Whether the hard instance limit is enforced
    pub limit_enabled: bool,

    /// Maximum total instances (spawned + despawned) when the limit is enabled
    pub limit_amount: usize,

    /// Whether excess despawned instances are culled after a delay
    pub cull_enabled: bool,

    /// Culling keeps destroying until total instances drop to this count
    pub cull_above: usize,

    /// Delay before the first culling pass, and between passes
    #[cfg_attr(feature = "serde", serde(with = "duration_secs"))]
    pub cull_delay: Duration,

    /// Maximum instances destroyed per culling pass
    pub cull_max_per_pass: usize,

    /// Emit per-instance debug records for every pool operation
    pub verbose_logging: bool,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            template: String::new(),
            preload_amount: 0,
            limit_enabled: false,
            limit_amount: 100,
            cull_enabled: false,
            cull_above: 50,
            cull_delay: Duration::from_secs(60),
            cull_max_per_pass: 5,
            verbose_logging: false,
        }
    }
}

impl PoolPolicy {
    /// Create a default policy for `template`: no preload, no limit, no culling
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    /// Set the number of instances created eagerly on pool setup
    pub fn with_preload(mut self, amount: usize) -> Self {
        self.preload_amount = amount;
        self
    }

    /// Enable the hard cap on total (spawned + despawned) instances
    ///
    /// # Examples
    ///
    /// ```
    /// use spawnpool::PoolPolicy;
    ///
    /// let policy = PoolPolicy::new("Bullet").with_limit(32);
    /// assert!(policy.limit_enabled);
    /// assert_eq!(policy.limit_amount, 32);
    /// ```
    pub fn with_limit(mut self, amount: usize) -> Self {
        self.limit_enabled = true;
        self.limit_amount = amount;
        self
    }

    /// Enable delayed culling of excess despawned instances
    pub fn with_culling(mut self, above: usize, delay: Duration, max_per_pass: usize) -> Self {
        self.cull_enabled = true;
        self.cull_above = above;
        self.cull_delay = delay;
        self.cull_max_per_pass = max_per_pass;
        self
    }

    /// Enable per-instance debug logging
    pub fn with_verbose_logging(mut self) -> Self {
        self.verbose_logging = true;
        self
    }

    /// Check the recognized-option constraints: a non-empty template,
    /// `limit_amount > 0`, and `cull_max_per_pass >= 1`.
    pub fn validate(&self) -> PoolResult<()> {
        if self.template.is_empty() {
            return Err(PoolError::TemplateNotFound(String::new()));
        }
        if self.limit_enabled && self.limit_amount == 0 {
            return Err(PoolError::StateCorruption(
                "limit_amount must be greater than zero".into(),
            ));
        }
        if self.cull_enabled && self.cull_max_per_pass == 0 {
            return Err(PoolError::StateCorruption(
                "cull_max_per_pass must be at least one".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
