//! Bodies and their phase-space state.
//!
//! A [`Body`] has no identity of its own; sessions address bodies by slot
//! index. Mass and radius are validated on construction so a live body
//! always carries strictly positive, finite values.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Three-component vector used for positions, velocities, and accelerations.
pub type Vec3 = Vector3<f64>;

/// Errors raised when constructing a body from untrusted values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BodyError {
    /// Mass must be finite and strictly positive.
    #[error("invalid mass {0}: must be finite and > 0")]
    Mass(f64),

    /// Radius must be finite and strictly positive.
    #[error("invalid radius {0}: must be finite and > 0")]
    Radius(f64),

    /// Position and velocity components must be finite.
    #[error("non-finite position or velocity")]
    NonFinite,
}

/// A massive spherical body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Mass, always `> 0`.
    pub mass: f64,
    /// Radius, always `> 0`.
    pub radius: f64,
    /// Position relative to the system origin.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
}

impl Body {
    /// Construct a body, validating mass, radius, and finiteness.
    ///
    /// # Errors
    ///
    /// Returns a [`BodyError`] describing the first invalid field.
    pub fn new(mass: f64, radius: f64, position: Vec3, velocity: Vec3) -> Result<Self, BodyError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(BodyError::Mass(mass));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(BodyError::Radius(radius));
        }
        if !position.iter().chain(velocity.iter()).all(|c| c.is_finite()) {
            return Err(BodyError::NonFinite);
        }
        Ok(Self {
            mass,
            radius,
            position,
            velocity,
        })
    }

    /// Magnitude of the velocity.
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Distance from the system origin.
    pub fn distance_from_origin(&self) -> f64 {
        self.position.norm()
    }

    /// Linear momentum `m * v`.
    pub fn momentum(&self) -> Vec3 {
        self.velocity * self.mass
    }

    /// Kinetic energy `m * |v|^2 / 2`.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }
}

/// Positions and velocities of every body, in slot order.
///
/// This is the vector the integrators advance. Masses are held aside
/// because no scheme changes them.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseState {
    /// Body positions.
    pub positions: Vec<Vec3>,
    /// Body velocities.
    pub velocities: Vec<Vec3>,
}

impl PhaseState {
    /// Capture the phase state of a body list.
    pub fn capture(bodies: &[Body]) -> Self {
        Self {
            positions: bodies.iter().map(|b| b.position).collect(),
            velocities: bodies.iter().map(|b| b.velocity).collect(),
        }
    }

    /// Return `self + h * d`.
    pub fn offset(&self, d: &Derivative, h: f64) -> Self {
        Self {
            positions: self
                .positions
                .iter()
                .zip(&d.dposition)
                .map(|(x, dx)| *x + *dx * h)
                .collect(),
            velocities: self
                .velocities
                .iter()
                .zip(&d.dvelocity)
                .map(|(v, dv)| *v + *dv * h)
                .collect(),
        }
    }

    /// Write positions and velocities back into the bodies.
    pub fn apply(&self, bodies: &mut [Body]) {
        for ((body, x), v) in bodies.iter_mut().zip(&self.positions).zip(&self.velocities) {
            body.position = *x;
            body.velocity = *v;
        }
    }
}

/// Time derivative of a [`PhaseState`].
#[derive(Debug, Clone, PartialEq)]
pub struct Derivative {
    /// `d(position)/dt`, i.e. velocity.
    pub dposition: Vec<Vec3>,
    /// `d(velocity)/dt`, i.e. acceleration.
    pub dvelocity: Vec<Vec3>,
}

/// Total linear momentum of a body list.
pub fn total_momentum(bodies: &[Body]) -> Vec3 {
    bodies.iter().map(Body::momentum).fold(Vec3::zeros(), |acc, p| acc + p)
}

/// Total mass of a body list.
pub fn total_mass(bodies: &[Body]) -> f64 {
    bodies.iter().map(|b| b.mass).sum()
}
