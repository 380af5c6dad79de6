//! Force model: softened pairwise gravitation plus a boundary spring.
//!
//! Every acceleration term is evaluated from positions alone, so the
//! same model feeds all integration schemes through
//! [`ForceModel::accelerations`].

use serde::{Deserialize, Serialize};

use crate::body::{Body, Vec3};

/// Inward spring applied to bodies that stray beyond a radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCorrection {
    /// Distance from the origin beyond which the spring engages.
    pub radius: f64,
    /// Acceleration per unit of excess distance with no shield active.
    pub stiffness: f64,
    /// Fractional stiffness increase per point of shield power.
    pub shield_gain: f64,
}

impl BoundaryCorrection {
    /// Effective stiffness under the given shield power.
    pub fn effective_stiffness(&self, shield: f64) -> f64 {
        let shield = if shield.is_finite() { shield.max(0.0) } else { 0.0 };
        self.stiffness * (1.0 + self.shield_gain * shield)
    }

    /// Corrective acceleration for a body at `position`.
    ///
    /// Zero inside the boundary.
    pub fn acceleration(&self, position: &Vec3, shield: f64) -> Vec3 {
        let distance = position.norm();
        if distance <= self.radius || distance <= 0.0 {
            return Vec3::zeros();
        }
        let excess = distance - self.radius;
        -(*position / distance) * (excess * self.effective_stiffness(shield))
    }
}

impl Default for BoundaryCorrection {
    fn default() -> Self {
        Self {
            radius: 500.0,
            stiffness: 2.0,
            shield_gain: 0.01,
        }
    }
}

/// Gravitational force model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceModel {
    /// Gravitational constant (tuned for visuals, not SI).
    pub gravitational_constant: f64,
    /// Softening added to the squared separation.
    pub softening: f64,
    /// Optional inward correction beyond a radius.
    pub boundary: Option<BoundaryCorrection>,
}

impl Default for ForceModel {
    fn default() -> Self {
        Self {
            gravitational_constant: 2000.0,
            softening: 100.0,
            boundary: Some(BoundaryCorrection::default()),
        }
    }
}

impl ForceModel {
    /// Acceleration on every body given positions and masses.
    ///
    /// `a_i = G * sum_j m_j * r_ij / (|r_ij|^2 + eps)^(3/2)`. With
    /// `eps > 0` a coincident pair contributes zero instead of a NaN.
    pub fn accelerations(&self, positions: &[Vec3], masses: &[f64], shield: f64) -> Vec<Vec3> {
        positions
            .iter()
            .enumerate()
            .map(|(i, xi)| {
                let gravity = positions
                    .iter()
                    .zip(masses)
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .fold(Vec3::zeros(), |acc, (_, (xj, mj))| {
                        acc + self.pair_acceleration(xi, xj, *mj)
                    });
                let correction = self
                    .boundary
                    .map_or_else(Vec3::zeros, |b| b.acceleration(xi, shield));
                gravity + correction
            })
            .collect()
    }

    /// Acceleration of a body at `xi` caused by mass `mj` at `xj`.
    fn pair_acceleration(&self, xi: &Vec3, xj: &Vec3, mj: f64) -> Vec3 {
        let r = *xj - *xi;
        let d2 = r.norm_squared() + self.softening;
        if d2 <= 0.0 || !d2.is_finite() {
            return Vec3::zeros();
        }
        let inv_d = d2.sqrt().recip();
        r * (self.gravitational_constant * mj * inv_d * inv_d * inv_d)
    }

    /// Softened gravitational potential energy of a body list.
    ///
    /// Consistent with [`accelerations`](Self::accelerations): each pair
    /// contributes `-G m_i m_j / sqrt(|r|^2 + eps)`. The boundary spring
    /// is not included, so this is exact only while every body is inside
    /// the boundary.
    pub fn potential_energy(&self, bodies: &[Body]) -> f64 {
        bodies
            .iter()
            .enumerate()
            .flat_map(|(i, a)| bodies.iter().skip(i.saturating_add(1)).map(move |b| (a, b)))
            .map(|(a, b)| {
                let d2 = (b.position - a.position).norm_squared() + self.softening;
                if d2 <= 0.0 {
                    0.0
                } else {
                    -self.gravitational_constant * a.mass * b.mass / d2.sqrt()
                }
            })
            .sum()
    }

    /// Kinetic plus softened potential energy.
    pub fn total_energy(&self, bodies: &[Body]) -> f64 {
        let kinetic: f64 = bodies.iter().map(Body::kinetic_energy).sum();
        kinetic + self.potential_energy(bodies)
    }
}
