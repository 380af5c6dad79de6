//! Interpolation of sparse server frames into continuous motion.
//!
//! A renderer never draws server coordinates directly. Each body in a
//! `PHYSICS_UPDATE` becomes a [`RenderTarget`]; every rendered frame moves
//! each visual entity a fixed fraction of the remaining distance toward
//! its target. Entities are matched by id (slot + 1). A new id is placed
//! directly at its first target, and an id missing from the latest update
//! is retired.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::Serialize;
use trisolaris_types::PhysicsFrame;

use crate::error::ClientError;
use crate::palette::body_color;

/// Fraction of the remaining distance covered per rendered frame.
pub const DEFAULT_SMOOTHING: f64 = 0.1;

/// Where the renderer should move one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTarget {
    /// Stable entity id, `slot + 1`.
    pub id: u32,
    /// Authoritative position from the latest update.
    pub target_position: Vector3<f64>,
    /// Body mass.
    pub mass: f64,
    /// Body radius.
    pub radius: f64,
    /// Packed `0xRRGGBB` colour.
    pub color: u32,
}

/// Convert one physics frame into render targets.
pub fn targets_from_frame(frame: &PhysicsFrame) -> Vec<RenderTarget> {
    frame
        .bodies
        .iter()
        .enumerate()
        .zip(1_u32..)
        .map(|((slot, body), id)| RenderTarget {
            id,
            target_position: Vector3::from(body.position),
            mass: body.mass,
            radius: body.radius,
            color: body_color(slot),
        })
        .collect()
}

/// A renderer-side entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualEntity {
    /// Current drawn position.
    pub position: Vector3<f64>,
    /// Latest target.
    pub target: RenderTarget,
}

/// Entity churn caused by one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameUpdate {
    /// Ids seen for the first time.
    pub spawned: Vec<u32>,
    /// Ids that disappeared and must be removed from the scene.
    pub retired: Vec<u32>,
}

impl FrameUpdate {
    /// `true` when the entity set did not change.
    pub fn is_unchanged(&self) -> bool {
        self.spawned.is_empty() && self.retired.is_empty()
    }
}

/// Id-matched exponential smoothing toward the latest targets.
#[derive(Debug, Clone)]
pub struct Reconciler {
    smoothing: f64,
    entities: BTreeMap<u32, VisualEntity>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_SMOOTHING,
            entities: BTreeMap::new(),
        }
    }
}

impl Reconciler {
    /// Create a reconciler with the given smoothing factor.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Smoothing`] unless `0 < smoothing <= 1`.
    pub fn new(smoothing: f64) -> Result<Self, ClientError> {
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            return Err(ClientError::Smoothing(smoothing));
        }
        Ok(Self {
            smoothing,
            entities: BTreeMap::new(),
        })
    }

    /// Smoothing factor in use.
    pub const fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Replace all targets with the bodies of `frame`.
    pub fn apply_frame(&mut self, frame: &PhysicsFrame) -> FrameUpdate {
        self.apply_targets(targets_from_frame(frame))
    }

    /// Replace all targets.
    ///
    /// Known ids keep their drawn position and only retarget. Unknown ids
    /// appear at their target. Ids absent from `targets` are removed.
    pub fn apply_targets(&mut self, targets: Vec<RenderTarget>) -> FrameUpdate {
        let mut update = FrameUpdate::default();
        let mut next = BTreeMap::new();

        for target in targets {
            let id = target.id;
            let entity = match self.entities.remove(&id) {
                Some(existing) => VisualEntity {
                    position: existing.position,
                    target,
                },
                None => {
                    update.spawned.push(id);
                    VisualEntity {
                        position: target.target_position,
                        target,
                    }
                }
            };
            next.insert(id, entity);
        }

        update.retired = std::mem::replace(&mut self.entities, next)
            .into_keys()
            .collect();
        if !update.is_unchanged() {
            tracing::debug!(spawned = ?update.spawned, retired = ?update.retired, "entity set changed");
        }
        update
    }

    /// Advance every entity one rendered frame toward its target.
    pub fn step(&mut self) {
        for entity in self.entities.values_mut() {
            let remaining = entity.target.target_position - entity.position;
            entity.position += remaining * self.smoothing;
        }
    }

    /// Entity with `id`, if live.
    pub fn entity(&self, id: u32) -> Option<&VisualEntity> {
        self.entities.get(&id)
    }

    /// Live entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &VisualEntity> {
        self.entities.values()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// `true` when nothing is on screen.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use trisolaris_types::WireBody;

    use super::*;

    fn target(id: u32, x: f64) -> RenderTarget {
        RenderTarget {
            id,
            target_position: Vector3::new(x, 0.0, 0.0),
            mass: 1.0,
            radius: 4.0,
            color: body_color(0),
        }
    }

    fn close(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn one_step_covers_a_tenth_of_the_distance() {
        let mut reconciler = Reconciler::default();
        reconciler.apply_targets(vec![target(1, 0.0)]);
        reconciler.apply_targets(vec![target(1, 10.0)]);
        reconciler.step();
        let entity = reconciler.entity(1).unwrap();
        assert!(close(&entity.position, &Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn first_appearance_is_placed_directly() {
        let mut reconciler = Reconciler::default();
        let update = reconciler.apply_targets(vec![target(7, 10.0)]);
        assert_eq!(update.spawned, vec![7]);
        let entity = reconciler.entity(7).unwrap();
        assert!(close(&entity.position, &Vector3::new(10.0, 0.0, 0.0)));

        reconciler.step();
        let entity = reconciler.entity(7).unwrap();
        assert!(close(&entity.position, &Vector3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn vanished_ids_are_retired() {
        let mut reconciler = Reconciler::default();
        reconciler.apply_targets(vec![target(1, 0.0), target(2, 5.0), target(3, 9.0)]);
        let update = reconciler.apply_targets(vec![target(1, 1.0), target(2, 6.0)]);
        assert!(update.spawned.is_empty());
        assert_eq!(update.retired, vec![3]);
        assert_eq!(reconciler.len(), 2);
        assert!(reconciler.entity(3).is_none());
    }

    #[test]
    fn repeated_steps_converge_without_overshoot() {
        let mut reconciler = Reconciler::new(0.5).unwrap();
        reconciler.apply_targets(vec![target(1, 0.0)]);
        reconciler.apply_targets(vec![target(1, 8.0)]);
        let mut last = 0.0;
        for _ in 0..40 {
            reconciler.step();
            let x = reconciler.entity(1).unwrap().position.x;
            assert!(x >= last && x <= 8.0);
            last = x;
        }
        assert!((8.0 - last).abs() < 1e-9);
    }

    #[test]
    fn full_smoothing_snaps() {
        let mut reconciler = Reconciler::new(1.0).unwrap();
        reconciler.apply_targets(vec![target(1, 0.0)]);
        reconciler.apply_targets(vec![target(1, 3.0)]);
        reconciler.step();
        assert_eq!(reconciler.entity(1).unwrap().position.x, 3.0);
    }

    #[test]
    fn invalid_smoothing_is_rejected() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(Reconciler::new(bad), Err(ClientError::Smoothing(_))));
        }
    }

    #[test]
    fn frame_bodies_become_targets_by_slot() {
        let frame = PhysicsFrame {
            bodies: vec![
                WireBody { mass: 1.0, radius: 4.0, position: [1.0, 2.0, 3.0] },
                WireBody { mass: 2.0, radius: 5.0, position: [4.0, 5.0, 6.0] },
                WireBody { mass: 3.0, radius: 6.0, position: [7.0, 8.0, 9.0] },
                WireBody { mass: 4.0, radius: 7.0, position: [0.0, 0.0, 0.0] },
            ],
            system_radius: 12.0,
        };
        let targets = targets_from_frame(&frame);
        let ids: Vec<u32> = targets.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        let colors: Vec<u32> = targets.iter().map(|t| t.color).collect();
        assert_eq!(colors, vec![body_color(0), body_color(1), body_color(2), body_color(0)]);
        assert!(close(&targets[1].target_position, &Vector3::new(4.0, 5.0, 6.0)));
        assert_eq!(targets[2].radius, 6.0);
    }
}
