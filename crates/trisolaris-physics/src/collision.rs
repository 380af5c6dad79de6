//! Collision detection and perfectly inelastic merging.
//!
//! Two bodies collide when their centres are closer than the sum of their
//! radii. Pairs are resolved first-come in `(i, j)` order with `i < j`; a
//! body already consumed by an earlier merge in the same pass is skipped.
//! Survivors keep their relative order and merged bodies are appended
//! after them.

use std::collections::BTreeSet;

use crate::body::Body;

/// Every colliding pair `(i, j)` with `i < j`, in scan order.
pub fn detect(bodies: &[Body]) -> Vec<(usize, usize)> {
    bodies
        .iter()
        .enumerate()
        .flat_map(|(i, a)| {
            bodies
                .iter()
                .enumerate()
                .skip(i.saturating_add(1))
                .filter(move |(_, b)| overlaps(a, b))
                .map(move |(j, _)| (i, j))
        })
        .collect()
}

fn overlaps(a: &Body, b: &Body) -> bool {
    (b.position - a.position).norm() < a.radius + b.radius
}

/// Merge two bodies into one, conserving mass and momentum.
///
/// Position is the mass-weighted centre, radius follows volume
/// conservation (`r = cbrt(ra^3 + rb^3)`).
pub fn merge(a: &Body, b: &Body) -> Body {
    let mass = a.mass + b.mass;
    let position = (a.position * a.mass + b.position * b.mass) / mass;
    let velocity = (a.momentum() + b.momentum()) / mass;
    let radius = (a.radius.powi(3) + b.radius.powi(3)).cbrt();
    Body {
        mass,
        radius,
        position,
        velocity,
    }
}

/// Detect and merge all collisions in place. Returns the number of merges.
pub fn resolve(bodies: &mut Vec<Body>) -> usize {
    let pairs = detect(bodies);
    if pairs.is_empty() {
        return 0;
    }

    let mut consumed = BTreeSet::new();
    let mut merged = Vec::new();
    for (i, j) in pairs {
        if consumed.contains(&i) || consumed.contains(&j) {
            continue;
        }
        if let (Some(a), Some(b)) = (bodies.get(i), bodies.get(j)) {
            merged.push(merge(a, b));
            consumed.insert(i);
            consumed.insert(j);
        }
    }

    let count = merged.len();
    let mut slot = 0_usize;
    bodies.retain(|_| {
        let keep = !consumed.contains(&slot);
        slot = slot.saturating_add(1);
        keep
    });
    bodies.extend(merged);
    count
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::body::{Vec3, total_mass, total_momentum};

    fn body(mass: f64, radius: f64, x: f64, vx: f64) -> Body {
        Body::new(mass, radius, Vec3::new(x, 0.0, 0.0), Vec3::new(vx, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn merge_conserves_mass_and_momentum() {
        let a = body(3.0, 1.0, 0.0, 2.0);
        let b = body(1.0, 1.0, 4.0, -2.0);
        let m = merge(&a, &b);
        assert_eq!(m.mass, 4.0);
        assert!((m.position - Vec3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((m.momentum() - (a.momentum() + b.momentum())).norm() < 1e-12);
        assert!((m.radius - 2.0_f64.cbrt()).abs() < 1e-12);
    }

    #[test]
    fn merge_is_symmetric() {
        let a = body(2.0, 1.5, -1.0, 0.5);
        let b = body(5.0, 0.5, 1.0, -0.25);
        let ab = merge(&a, &b);
        let ba = merge(&b, &a);
        assert!((ab.position - ba.position).norm() < 1e-12);
        assert!((ab.velocity - ba.velocity).norm() < 1e-12);
        assert!((ab.radius - ba.radius).abs() < 1e-12);
    }

    #[test]
    fn separated_bodies_are_untouched() {
        let mut bodies = vec![body(1.0, 1.0, 0.0, 0.0), body(1.0, 1.0, 2.5, 0.0)];
        let before = bodies.clone();
        assert_eq!(resolve(&mut bodies), 0);
        assert_eq!(bodies, before);
    }

    #[test]
    fn touching_exactly_is_not_a_collision() {
        let bodies = [body(1.0, 1.0, 0.0, 0.0), body(1.0, 1.0, 2.0, 0.0)];
        assert!(detect(&bodies).is_empty());
    }

    #[test]
    fn first_pair_wins_when_three_overlap() {
        let mut bodies = vec![
            body(1.0, 2.0, 0.0, 0.0),
            body(2.0, 2.0, 1.0, 0.0),
            body(4.0, 2.0, 2.0, 0.0),
        ];
        let mass = total_mass(&bodies);
        let momentum = total_momentum(&bodies);
        assert_eq!(detect(&bodies), vec![(0, 1), (0, 2), (1, 2)]);

        assert_eq!(resolve(&mut bodies), 1);
        assert_eq!(bodies.len(), 2);
        // Body 2 survives in front, the (0, 1) merger is appended.
        assert_eq!(bodies[0].mass, 4.0);
        assert_eq!(bodies[1].mass, 3.0);
        assert!((total_mass(&bodies) - mass).abs() < 1e-12);
        assert!((total_momentum(&bodies) - momentum).norm() < 1e-12);
    }

    #[test]
    fn survivors_keep_relative_order() {
        let mut bodies = vec![
            body(1.0, 1.0, -100.0, 0.0),
            body(1.0, 1.0, 0.0, 0.0),
            body(7.0, 1.0, 100.0, 0.0),
            body(1.0, 1.0, 0.5, 0.0),
            body(9.0, 1.0, 200.0, 0.0),
        ];
        assert_eq!(resolve(&mut bodies), 1);
        let masses: Vec<f64> = bodies.iter().map(|b| b.mass).collect();
        assert_eq!(masses, vec![1.0, 7.0, 9.0, 2.0]);
    }
}
