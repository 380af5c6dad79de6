//! Fixed-step integration schemes.
//!
//! All four schemes advance the same [`PhaseState`] using the same
//! derivative contract (`dposition = velocity`, `dvelocity =
//! acceleration`), so a session can switch schemes through
//! configuration without touching anything else.
//!
//! | Scheme | Force evaluations | Character |
//! |--------|-------------------|-----------|
//! | `rk4` | 4 | most accurate, not symplectic |
//! | `verlet` | 2 | symplectic, bounded energy error |
//! | `semi_implicit_euler` | 1 | symplectic, first order |
//! | `euler` | 1 | diverges on bound orbits |

use serde::{Deserialize, Serialize};

use crate::body::{Body, Derivative, PhaseState, Vec3};
use crate::collision;
use crate::forces::ForceModel;

/// Selectable integration scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    /// Classic fourth-order Runge-Kutta over the full phase state.
    Rk4,
    /// Velocity-Verlet (kick, drift, kick).
    #[default]
    Verlet,
    /// Velocity first, then position from the new velocity.
    SemiImplicitEuler,
    /// Position and velocity both from the old state. Unstable.
    Euler,
}

/// Active corrective parameters for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Corrections {
    /// Gravity shield power; scales the boundary spring.
    pub shield: f64,
}

/// Outcome of one [`Integrator::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Number of pairwise merges resolved after the step.
    pub merges: usize,
}

/// Advances a body list under a [`ForceModel`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Integrator {
    kind: IntegratorKind,
    forces: ForceModel,
}

impl Integrator {
    /// Create an integrator with the given scheme and force model.
    pub const fn new(kind: IntegratorKind, forces: ForceModel) -> Self {
        Self { kind, forces }
    }

    /// The configured scheme.
    pub const fn kind(&self) -> IntegratorKind {
        self.kind
    }

    /// The configured force model.
    pub const fn forces(&self) -> &ForceModel {
        &self.forces
    }

    /// Evaluate the phase-space derivative at `state`.
    pub fn derivative(&self, masses: &[f64], state: &PhaseState, corrections: Corrections) -> Derivative {
        Derivative {
            dposition: state.velocities.clone(),
            dvelocity: self
                .forces
                .accelerations(&state.positions, masses, corrections.shield),
        }
    }

    /// Advance one step of size `dt`, then merge colliding bodies.
    pub fn advance(&self, bodies: &mut Vec<Body>, dt: f64, corrections: Corrections) -> StepReport {
        self.step(bodies, dt, corrections);
        let merges = collision::resolve(bodies);
        if merges > 0 {
            tracing::debug!(merges, remaining = bodies.len(), "bodies merged");
        }
        StepReport { merges }
    }

    /// Advance one step of size `dt` without collision handling.
    pub fn step(&self, bodies: &mut [Body], dt: f64, corrections: Corrections) {
        if bodies.is_empty() || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let masses: Vec<f64> = bodies.iter().map(|b| b.mass).collect();
        let state = PhaseState::capture(bodies);

        let next = match self.kind {
            IntegratorKind::Rk4 => self.rk4(&masses, &state, dt, corrections),
            IntegratorKind::Verlet => self.verlet(&masses, &state, dt, corrections),
            IntegratorKind::SemiImplicitEuler => {
                self.semi_implicit_euler(&masses, &state, dt, corrections)
            }
            IntegratorKind::Euler => {
                let d = self.derivative(&masses, &state, corrections);
                state.offset(&d, dt)
            }
        };
        next.apply(bodies);
    }

    fn rk4(&self, masses: &[f64], s0: &PhaseState, dt: f64, c: Corrections) -> PhaseState {
        let half = 0.5 * dt;
        let k1 = self.derivative(masses, s0, c);
        let k2 = self.derivative(masses, &s0.offset(&k1, half), c);
        let k3 = self.derivative(masses, &s0.offset(&k2, half), c);
        let k4 = self.derivative(masses, &s0.offset(&k3, dt), c);

        let blended = Derivative {
            dposition: blend(&k1.dposition, &k2.dposition, &k3.dposition, &k4.dposition),
            dvelocity: blend(&k1.dvelocity, &k2.dvelocity, &k3.dvelocity, &k4.dvelocity),
        };
        s0.offset(&blended, dt)
    }

    fn verlet(&self, masses: &[f64], s0: &PhaseState, dt: f64, c: Corrections) -> PhaseState {
        let half = 0.5 * dt;

        // Kick: v(t + dt/2) = v(t) + a(t) dt/2
        let a0 = self.forces.accelerations(&s0.positions, masses, c.shield);
        let half_velocities: Vec<Vec3> = s0
            .velocities
            .iter()
            .zip(&a0)
            .map(|(v, a)| *v + *a * half)
            .collect();

        // Drift: x(t + dt) = x(t) + v(t + dt/2) dt
        let positions: Vec<Vec3> = s0
            .positions
            .iter()
            .zip(&half_velocities)
            .map(|(x, v)| *x + *v * dt)
            .collect();

        // Kick: v(t + dt) = v(t + dt/2) + a(t + dt) dt/2
        let a1 = self.forces.accelerations(&positions, masses, c.shield);
        let velocities = half_velocities
            .iter()
            .zip(&a1)
            .map(|(v, a)| *v + *a * half)
            .collect();

        PhaseState {
            positions,
            velocities,
        }
    }

    fn semi_implicit_euler(
        &self,
        masses: &[f64],
        s0: &PhaseState,
        dt: f64,
        c: Corrections,
    ) -> PhaseState {
        let d = self.derivative(masses, s0, c);
        let velocities: Vec<Vec3> = s0
            .velocities
            .iter()
            .zip(&d.dvelocity)
            .map(|(v, a)| *v + *a * dt)
            .collect();
        let positions = s0
            .positions
            .iter()
            .zip(&velocities)
            .map(|(x, v)| *x + *v * dt)
            .collect();
        PhaseState {
            positions,
            velocities,
        }
    }
}

/// RK4 weighting `(k1 + 2 k2 + 2 k3 + k4) / 6`.
fn blend(k1: &[Vec3], k2: &[Vec3], k3: &[Vec3], k4: &[Vec3]) -> Vec<Vec3> {
    k1.iter()
        .zip(k2)
        .zip(k3)
        .zip(k4)
        .map(|(((a, b), c), d)| (*a + *b * 2.0 + *c * 2.0 + *d) / 6.0)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::body::total_momentum;

    /// G = 1, negligible softening, no boundary.
    fn kepler_model() -> ForceModel {
        ForceModel {
            gravitational_constant: 1.0,
            softening: 1e-6,
            boundary: None,
        }
    }

    /// Two unit masses on a circular orbit of separation 2.
    fn circular_pair() -> Vec<Body> {
        vec![
            Body::new(1.0, 0.01, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.5, 0.0)).unwrap(),
            Body::new(1.0, 0.01, Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, -0.5, 0.0)).unwrap(),
        ]
    }

    fn relative_energy_drift(kind: IntegratorKind, steps: usize, dt: f64) -> f64 {
        let integrator = Integrator::new(kind, kepler_model());
        let mut bodies = circular_pair();
        let e0 = integrator.forces().total_energy(&bodies);
        for _ in 0..steps {
            integrator.advance(&mut bodies, dt, Corrections::default());
        }
        assert_eq!(bodies.len(), 2, "orbit must not collide");
        let e1 = integrator.forces().total_energy(&bodies);
        ((e1 - e0) / e0).abs()
    }

    #[test]
    fn verlet_conserves_momentum_for_a_pair() {
        let integrator = Integrator::new(IntegratorKind::Verlet, ForceModel::default());
        let mut bodies = vec![
            Body::new(3.0, 1.0, Vec3::new(10.0, -20.0, 5.0), Vec3::new(1.0, 2.0, 0.0)).unwrap(),
            Body::new(1.0, 1.0, Vec3::new(-40.0, 30.0, 0.0), Vec3::new(0.0, -1.5, 0.5)).unwrap(),
        ];
        let p0 = total_momentum(&bodies);
        integrator.advance(&mut bodies, 0.05, Corrections::default());
        let p1 = total_momentum(&bodies);
        assert!((p1 - p0).norm() < 1e-9, "momentum drifted: {p0} -> {p1}");
    }

    #[test]
    fn explicit_euler_diverges_where_verlet_holds() {
        let euler = relative_energy_drift(IntegratorKind::Euler, 20_000, 0.01);
        let verlet = relative_energy_drift(IntegratorKind::Verlet, 50_000, 0.01);
        assert!(euler > 0.05, "euler should drift, got {euler}");
        assert!(verlet < 0.01, "verlet should hold, got {verlet}");
    }

    #[test]
    fn rk4_holds_energy_on_circular_orbit() {
        let drift = relative_energy_drift(IntegratorKind::Rk4, 5_000, 0.01);
        assert!(drift < 1e-4, "rk4 drift {drift}");
    }

    #[test]
    fn semi_implicit_euler_stays_bounded() {
        let drift = relative_energy_drift(IntegratorKind::SemiImplicitEuler, 20_000, 0.01);
        assert!(drift < 0.05, "semi-implicit drift {drift}");
    }

    #[test]
    fn all_schemes_share_the_derivative_contract() {
        let kinds = [
            IntegratorKind::Rk4,
            IntegratorKind::Verlet,
            IntegratorKind::SemiImplicitEuler,
            IntegratorKind::Euler,
        ];
        // A lone body with no forces moves in a straight line under every scheme.
        for kind in kinds {
            let integrator = Integrator::new(kind, kepler_model());
            let mut bodies =
                vec![Body::new(1.0, 1.0, Vec3::zeros(), Vec3::new(2.0, 0.0, -1.0)).unwrap()];
            integrator.advance(&mut bodies, 0.5, Corrections::default());
            assert!((bodies[0].position - Vec3::new(1.0, 0.0, -0.5)).norm() < 1e-12, "{kind:?}");
        }
    }

    #[test]
    fn degenerate_input_never_produces_nan() {
        let integrator = Integrator::new(IntegratorKind::Rk4, ForceModel::default());
        let mut bodies = vec![
            Body::new(1.0, 0.001, Vec3::zeros(), Vec3::zeros()).unwrap(),
            Body::new(1.0, 0.001, Vec3::zeros(), Vec3::zeros()).unwrap(),
        ];
        integrator.step(&mut bodies, 0.05, Corrections::default());
        for b in &bodies {
            assert!(b.position.iter().chain(b.velocity.iter()).all(|c| c.is_finite()));
        }
    }

    #[test]
    fn non_positive_dt_is_a_no_op() {
        let integrator = Integrator::default();
        let mut bodies = circular_pair();
        let before = bodies.clone();
        integrator.step(&mut bodies, 0.0, Corrections::default());
        integrator.step(&mut bodies, f64::NAN, Corrections::default());
        assert_eq!(bodies, before);
    }

    #[test]
    fn scheme_names_in_config() {
        let kind: IntegratorKind = serde_json::from_str("\"semi_implicit_euler\"").unwrap();
        assert_eq!(kind, IntegratorKind::SemiImplicitEuler);
        assert_eq!(IntegratorKind::default(), IntegratorKind::Verlet);
    }
}
