//! Everything one observer knows about its world.
//!
//! [`ObserverView`] folds inbound [`ServerMessage`]s into renderer-facing
//! state: reconciled entities, the sanity reading and its band, the
//! expansion radius with its rip warning, and any alerts to show. It also
//! builds the outbound messages an observer UI sends.

use trisolaris_types::{ClientMessage, InterventionKind, ServerMessage};

use crate::error::ClientError;
use crate::palette::SanityBand;
use crate::reconcile::{FrameUpdate, Reconciler};

/// System radius above which the scene shows the rip warning.
pub const RIP_WARNING_RADIUS: f64 = 450.0;

/// Which alert the session raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Sanity fell below the collapse threshold.
    Collapse,
    /// Sanity reached zero.
    Extinction,
}

/// An alert to show the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Alert kind.
    pub kind: AlertKind,
    /// Text from the session.
    pub message: String,
}

/// What changed after applying one message.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewChange {
    /// New physics targets; carries entity churn.
    Physics(FrameUpdate),
    /// New sanity reading.
    Sanity(SanityBand),
    /// A new alert was queued.
    Alert(AlertKind),
    /// The message had an unknown tag and was ignored.
    Ignored,
}

/// Observer-side world state.
#[derive(Debug, Clone, Default)]
pub struct ObserverView {
    reconciler: Reconciler,
    sanity: Option<f64>,
    system_radius: f64,
    time_scale: f64,
    alerts: Vec<Alert>,
}

impl ObserverView {
    /// Create a view with a custom reconciler.
    pub fn with_reconciler(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            ..Self::default()
        }
    }

    /// Decode and apply one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] for malformed frames; the view is
    /// left untouched.
    pub fn apply_text(&mut self, text: &str) -> Result<ViewChange, ClientError> {
        let message = ServerMessage::decode(text)?;
        Ok(self.apply(message))
    }

    /// Apply one server message.
    pub fn apply(&mut self, message: ServerMessage) -> ViewChange {
        match message {
            ServerMessage::PhysicsUpdate { state, time_scale } => {
                self.system_radius = state.system_radius;
                self.time_scale = time_scale;
                ViewChange::Physics(self.reconciler.apply_frame(&state))
            }
            ServerMessage::SanityUpdate { sanity } => {
                self.sanity = Some(sanity);
                ViewChange::Sanity(SanityBand::from_sanity(sanity))
            }
            ServerMessage::CollapseAlert { message } => self.push_alert(AlertKind::Collapse, message),
            ServerMessage::ExtinctionReport { message } => {
                self.push_alert(AlertKind::Extinction, message)
            }
            ServerMessage::Unknown => {
                tracing::debug!("unknown server message ignored");
                ViewChange::Ignored
            }
        }
    }

    fn push_alert(&mut self, kind: AlertKind, message: String) -> ViewChange {
        self.alerts.push(Alert { kind, message });
        ViewChange::Alert(kind)
    }

    /// Advance the reconciled entities by one rendered frame.
    pub fn render_step(&mut self) {
        self.reconciler.step();
    }

    /// Reconciled entities.
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Latest sanity, if any update has arrived.
    pub const fn sanity(&self) -> Option<f64> {
        self.sanity
    }

    /// Band of the latest sanity.
    pub fn band(&self) -> Option<SanityBand> {
        self.sanity.map(SanityBand::from_sanity)
    }

    /// Latest expansion radius.
    pub const fn system_radius(&self) -> f64 {
        self.system_radius
    }

    /// Latest time multiplier reported by the session.
    pub const fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// `true` while the system radius exceeds [`RIP_WARNING_RADIUS`].
    pub fn rip_warning(&self) -> bool {
        self.system_radius > RIP_WARNING_RADIUS
    }

    /// Take all queued alerts.
    pub fn drain_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }
}

/// Encoded `INTERVENTION` for a gravity shield.
///
/// # Errors
///
/// Returns [`ClientError::Encode`] if `power` is not representable.
pub fn gravity_shield(power: f64) -> Result<String, ClientError> {
    encode(&ClientMessage::Intervention {
        kind: InterventionKind::GravityShield,
        power,
    })
}

/// Encoded `INTERVENTION` for a rational beacon.
///
/// # Errors
///
/// Returns [`ClientError::Encode`] if `power` is not representable.
pub fn rational_beacon(power: f64) -> Result<String, ClientError> {
    encode(&ClientMessage::Intervention {
        kind: InterventionKind::RationalBeacon,
        power,
    })
}

/// Encoded `SET_TIME_SCALE`.
///
/// # Errors
///
/// Returns [`ClientError::Encode`] if `value` is not representable.
pub fn set_time_scale(value: f64) -> Result<String, ClientError> {
    encode(&ClientMessage::SetTimeScale { value })
}

fn encode(message: &ClientMessage) -> Result<String, ClientError> {
    message.to_json().map_err(ClientError::Encode)
}
