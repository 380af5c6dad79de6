//! Gravitational N-body integration for the Trisolaris simulation.
//!
//! This crate is pure computation: no clocks, no I/O, no shared state.
//! Sessions own a body list and call [`Integrator::advance`] once per
//! sub-step.
//!
//! # Modules
//!
//! - [`body`] -- [`Body`] and the phase-space vectors the integrators advance.
//! - [`forces`] -- Softened gravitation plus the inward boundary spring.
//! - [`integrator`] -- RK4, velocity-Verlet, semi-implicit and explicit Euler.
//! - [`collision`] -- Overlap detection and momentum-conserving merges.

pub mod body;
pub mod collision;
pub mod forces;
pub mod integrator;

pub use body::{Body, BodyError, Vec3, total_mass, total_momentum};
pub use forces::{BoundaryCorrection, ForceModel};
pub use integrator::{Corrections, Integrator, IntegratorKind, StepReport};
