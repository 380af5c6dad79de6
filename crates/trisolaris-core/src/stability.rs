//! Chaos signal and the bounded sanity index.
//!
//! Each tick the session reduces the body list to a single chaos value in
//! `[0, 1]` and feeds it to [`StabilityEngine::update`], which moves the
//! sanity index by a fixed penalty or recovery step and reports any
//! threshold crossings.
//!
//! # Thresholds
//!
//! | Event | Fires when |
//! |-------|------------|
//! | collapse | `previous >= collapse_threshold && next < collapse_threshold` |
//! | extinction | `previous > 0 && next == 0` |
//!
//! Both are edge-triggered: a sanity value that stays below the threshold
//! does not fire again until it has climbed back above it.

use serde::{Deserialize, Serialize};
use trisolaris_physics::Body;

/// Upper bound of the sanity index.
pub const MAX_SANITY: f64 = 100.0;

/// Lower bound of the sanity index.
pub const MIN_SANITY: f64 = 0.0;

/// Tuning constants for the chaos signal and the sanity state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Weight applied to the mean body speed.
    #[serde(default = "default_speed_weight")]
    pub speed_weight: f64,

    /// Weight applied to the system radius.
    #[serde(default = "default_radius_weight")]
    pub radius_weight: f64,

    /// Divisor mapping the weighted sum onto `[0, 1]`.
    #[serde(default = "default_normalization")]
    pub normalization: f64,

    /// Chaos above this value costs sanity.
    #[serde(default = "default_high_chaos_threshold")]
    pub high_chaos_threshold: f64,

    /// Sanity lost on a high-chaos tick.
    #[serde(default = "default_decay_penalty")]
    pub decay_penalty: f64,

    /// Sanity regained on a calm tick.
    #[serde(default = "default_recovery")]
    pub recovery: f64,

    /// Downward crossing of this value raises a collapse alert.
    #[serde(default = "default_collapse_threshold")]
    pub collapse_threshold: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            speed_weight: default_speed_weight(),
            radius_weight: default_radius_weight(),
            normalization: default_normalization(),
            high_chaos_threshold: default_high_chaos_threshold(),
            decay_penalty: default_decay_penalty(),
            recovery: default_recovery(),
            collapse_threshold: default_collapse_threshold(),
        }
    }
}

const fn default_speed_weight() -> f64 {
    0.5
}

const fn default_radius_weight() -> f64 {
    0.01
}

const fn default_normalization() -> f64 {
    50.0
}

const fn default_high_chaos_threshold() -> f64 {
    0.8
}

const fn default_decay_penalty() -> f64 {
    5.0
}

const fn default_recovery() -> f64 {
    1.0
}

const fn default_collapse_threshold() -> f64 {
    30.0
}

/// Result of one sanity update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanityTransition {
    /// Sanity before the update.
    pub previous: f64,
    /// Sanity after the update, in `[0, 100]`.
    pub sanity: f64,
    /// Chaos level that drove the update.
    pub chaos: f64,
    /// The collapse threshold was crossed downward.
    pub collapsed: bool,
    /// Sanity just reached zero.
    pub extinct: bool,
}

/// Derives chaos from body state and advances the sanity index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StabilityEngine {
    config: StabilityConfig,
}

impl StabilityEngine {
    /// Create an engine with the given tuning.
    pub const fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    /// The active tuning.
    pub const fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Chaos level in `[0, 1]`.
    ///
    /// `min(1, (speed_weight * mean_speed + radius_weight * system_radius) / normalization)`.
    /// An empty body list has mean speed 0. Non-finite intermediates yield 0.
    pub fn chaos_level(&self, bodies: &[Body], system_radius: f64) -> f64 {
        let mean_speed = mean_speed(bodies);
        let c = &self.config;
        let raw = c
            .speed_weight
            .mul_add(mean_speed, c.radius_weight * system_radius)
            / c.normalization;
        if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 }
    }

    /// Apply one tick's worth of decay or recovery.
    ///
    /// A non-finite `previous` is treated as a fresh record at
    /// [`MAX_SANITY`].
    pub fn update(&self, previous: f64, chaos: f64) -> SanityTransition {
        let previous = if previous.is_finite() {
            clamp_sanity(previous)
        } else {
            MAX_SANITY
        };
        let delta = if chaos > self.config.high_chaos_threshold {
            -self.config.decay_penalty
        } else {
            self.config.recovery
        };
        let sanity = if delta.is_finite() {
            clamp_sanity(previous + delta)
        } else {
            previous
        };
        SanityTransition {
            previous,
            sanity,
            chaos,
            collapsed: crossed_collapse(previous, sanity, self.config.collapse_threshold),
            extinct: reached_extinction(previous, sanity),
        }
    }

    /// Restore `power` points of sanity, clamped to `[0, 100]`.
    ///
    /// Negative power restores nothing. Never raises a collapse or
    /// extinction event.
    pub fn restore(&self, sanity: f64, power: f64) -> f64 {
        let base = if sanity.is_finite() { clamp_sanity(sanity) } else { MAX_SANITY };
        if power.is_finite() {
            clamp_sanity(base + power.max(0.0))
        } else {
            base
        }
    }
}

fn mean_speed(bodies: &[Body]) -> f64 {
    if bodies.is_empty() {
        return 0.0;
    }
    let total: f64 = bodies.iter().map(Body::speed).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = bodies.len() as f64;
    total / count
}

/// Clamp a sanity value to `[MIN_SANITY, MAX_SANITY]`.
pub fn clamp_sanity(value: f64) -> f64 {
    value.clamp(MIN_SANITY, MAX_SANITY)
}

/// `true` exactly on a downward crossing of `threshold`.
pub fn crossed_collapse(previous: f64, next: f64, threshold: f64) -> bool {
    previous >= threshold && next < threshold
}

/// `true` exactly when sanity first reaches zero.
pub fn reached_extinction(previous: f64, next: f64) -> bool {
    previous > MIN_SANITY && next <= MIN_SANITY
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use trisolaris_physics::Vec3;

    fn moving(speed: f64) -> Body {
        Body::new(1.0, 1.0, Vec3::zeros(), Vec3::new(speed, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn chaos_combines_speed_and_radius() {
        let engine = StabilityEngine::default();
        let bodies = [moving(10.0), moving(30.0)];
        // (0.5 * 20 + 0.01 * 500) / 50 = 0.3
        assert!((engine.chaos_level(&bodies, 500.0) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn chaos_saturates_at_one() {
        let engine = StabilityEngine::default();
        assert_eq!(engine.chaos_level(&[moving(1e6)], 0.0), 1.0);
    }

    #[test]
    fn chaos_of_empty_system_is_radius_only() {
        let engine = StabilityEngine::default();
        assert_eq!(engine.chaos_level(&[], 0.0), 0.0);
        assert!((engine.chaos_level(&[], 1000.0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn chaos_ignores_non_finite_radius() {
        let engine = StabilityEngine::default();
        assert_eq!(engine.chaos_level(&[moving(1.0)], f64::NAN), 0.0);
    }

    #[test]
    fn high_chaos_decays_and_calm_recovers() {
        let engine = StabilityEngine::default();
        assert_eq!(engine.update(50.0, 0.9).sanity, 45.0);
        assert_eq!(engine.update(50.0, 0.8).sanity, 51.0);
        assert_eq!(engine.update(50.0, 0.1).sanity, 51.0);
    }

    #[test]
    fn sanity_stays_within_bounds() {
        let engine = StabilityEngine::default();
        assert_eq!(engine.update(100.0, 0.0).sanity, 100.0);
        assert_eq!(engine.update(2.0, 1.0).sanity, 0.0);
        assert_eq!(engine.restore(95.0, 10_000.0), 100.0);
        assert_eq!(engine.restore(5.0, -10_000.0), 5.0);
        assert_eq!(engine.restore(40.0, f64::INFINITY), 40.0);
        assert_eq!(engine.update(f64::NAN, 1.0).sanity, 95.0);
    }

    #[test]
    fn collapse_fires_once_per_downward_crossing() {
        let trace = [50.0, 40.0, 25.0, 26.0, 24.0];
        let fired: Vec<bool> = trace
            .windows(2)
            .map(|w| crossed_collapse(w[0], w[1], 30.0))
            .collect();
        assert_eq!(fired, vec![false, true, false, false]);
    }

    #[test]
    fn collapse_fires_at_exact_threshold_boundary() {
        let engine = StabilityEngine::default();
        let t = engine.update(34.0, 1.0);
        assert_eq!(t.sanity, 29.0);
        assert!(t.collapsed);
        // Already below: no repeat.
        assert!(!engine.update(29.0, 1.0).collapsed);
        // Climbing back above never fires.
        assert!(!engine.update(29.5, 0.0).collapsed);
    }

    #[test]
    fn extinction_fires_on_reaching_zero() {
        let engine = StabilityEngine::default();
        let t = engine.update(3.0, 1.0);
        assert!(t.extinct);
        assert!(!engine.update(0.0, 1.0).extinct);
    }

    #[test]
    fn restore_ignores_negative_power() {
        let engine = StabilityEngine::default();
        assert_eq!(engine.restore(31.0, -5.0), 31.0);
        assert_eq!(engine.restore(31.0, -0.0), 31.0);
        assert_eq!(engine.restore(31.0, f64::NEG_INFINITY), 31.0);
    }

    #[test]
    fn sanity_stays_within_bounds_under_repeated_extremes() {
        let engine = StabilityEngine::default();
        let mut sanity = 100.0;
        for i in 0..1_000 {
            sanity = engine.update(sanity, 1.0).sanity;
            assert!((0.0..=100.0).contains(&sanity), "update {i}: {sanity}");
            if i % 3 == 0 {
                sanity = engine.restore(sanity, 10_000.0);
                assert!((0.0..=100.0).contains(&sanity), "restore {i}: {sanity}");
            }
            sanity = engine.restore(sanity, -10_000.0);
            assert!((0.0..=100.0).contains(&sanity), "negative restore {i}: {sanity}");
        }
        for _ in 0..100 {
            sanity = engine.update(sanity, 1.0).sanity;
        }
        assert_eq!(sanity, 0.0);
        assert_eq!(engine.restore(sanity, 10_000.0), 100.0);
    }

    #[test]
    fn config_defaults_from_partial_yaml() {
        let cfg: StabilityConfig = serde_yml::from_str("decay_penalty: 7.5\n").unwrap();
        assert_eq!(cfg.decay_penalty, 7.5);
        assert_eq!(cfg.collapse_threshold, 30.0);
        assert_eq!(cfg.normalization, 50.0);
    }
}
