//! Observer-side reconciliation for the Trisolaris simulation.
//!
//! Turns the session's tagged JSON frames into renderer-facing data: a
//! list of interpolated entities keyed by id, the sanity band, and alerts.
//! No graphics types cross this boundary; a renderer reads positions,
//! radii, and packed colours, and nothing else.
//!
//! # Modules
//!
//! - [`reconcile`] -- [`RenderTarget`] construction and exponential smoothing
//! - [`view`] -- [`ObserverView`] message folding and outbound builders
//! - [`palette`] -- Body colours and [`SanityBand`] grading
//! - [`error`] -- Client error type

pub mod error;
pub mod palette;
pub mod reconcile;
pub mod view;

pub use error::ClientError;
pub use palette::{SanityBand, body_color};
pub use reconcile::{FrameUpdate, Reconciler, RenderTarget, VisualEntity, targets_from_frame};
pub use view::{Alert, AlertKind, ObserverView, RIP_WARNING_RADIUS, ViewChange};
