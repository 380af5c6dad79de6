//! The authoritative simulation session.
//!
//! One [`SessionController`] owns one world: its body list, its observers,
//! its tick scheduler, and its view of the durable sanity record. The
//! controller runs inside a single Tokio task and is driven exclusively
//! through [`SessionCommand`]s arriving on one mailbox, so ticks,
//! interventions, attaches, and detaches never interleave.
//!
//! # Tick
//!
//! 1. Advance the bodies by `time_scale * dt` of simulated time.
//! 2. Raise `system_radius` to the farthest body if it grew.
//! 3. Derive chaos, re-read sanity from the store, apply the update.
//! 4. Request a narrative report on a collapse or extinction crossing.
//! 5. Persist sanity, broadcast `PHYSICS_UPDATE` then `SOCIAL_UPDATE`.
//!
//! A tick that produces a non-finite body state is rolled back, logged,
//! and skipped. Store failures are logged and the record is assumed to
//! hold the default.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use trisolaris_physics::{Body, BodyError, Corrections, Integrator};
use trisolaris_types::{
    ClientMessage, InterventionKind, ObserverId, PhysicsFrame, ServerMessage, WireBody, WorldId,
};

use crate::config::SimulationConfig;
use crate::narrative::{NarrativeError, NarrativeProvider, ReportFields, ReportKind, fallback_message};
use crate::observers::{ObserverSet, ObserverSink};
use crate::scheduler::TickScheduler;
use crate::stability::{MAX_SANITY, SanityTransition, StabilityEngine};
use crate::store::{KeyValueStore, SanityRecord};

/// Commands queued for a session.
#[derive(Debug)]
pub enum SessionCommand {
    /// A new observer connected.
    Attach {
        /// Connection identity.
        observer: ObserverId,
        /// Outbound channel to the connection.
        sink: ObserverSink,
    },
    /// An observer disconnected.
    Detach {
        /// Connection identity.
        observer: ObserverId,
    },
    /// A decoded message from an observer.
    Inbound {
        /// Sender.
        observer: ObserverId,
        /// The message.
        message: ClientMessage,
    },
    /// Advance the simulation by one tick.
    Tick,
    /// Broadcast a message produced outside the session task.
    Publish(ServerMessage),
    /// Read the current sanity.
    QuerySanity {
        /// Reply channel.
        reply: oneshot::Sender<f64>,
    },
    /// Read a status snapshot.
    QueryStatus {
        /// Reply channel.
        reply: oneshot::Sender<SessionStatus>,
    },
}

/// Errors raised by a session or its handle.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A starting body failed validation.
    #[error("invalid starting body: {0}")]
    InvalidBody(#[from] BodyError),

    /// The session task is no longer running.
    #[error("session {0} is closed")]
    Closed(WorldId),

    /// The integrator produced a non-finite body state.
    #[error("non-finite body state at tick {tick}")]
    NonFiniteState {
        /// Tick that was rolled back.
        tick: u64,
    },
}

/// Point-in-time summary of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    /// World name.
    pub world: String,
    /// Ticks completed.
    pub tick: u64,
    /// Attached observers.
    pub observers: usize,
    /// Whether the tick scheduler is running.
    pub running: bool,
    /// Live body count.
    pub bodies: usize,
    /// Expansion high-water mark.
    pub system_radius: f64,
    /// Current time multiplier.
    pub time_scale: f64,
    /// Current gravity shield power.
    pub shield: f64,
}

/// Fixed parameters of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// World this session simulates.
    pub world: WorldId,
    /// Wall-clock time between ticks.
    pub tick_interval: Duration,
    /// Simulated time per tick at time scale 1.
    pub dt: f64,
    /// Cap on sub-steps per tick.
    pub max_substeps: u32,
    /// Upper clamp for observer time-scale requests.
    pub max_time_scale: f64,
    /// Upper clamp for observer shield requests.
    pub max_shield: f64,
    /// Integration scheme and force model.
    pub integrator: Integrator,
    /// Chaos and sanity tuning.
    pub stability: StabilityEngine,
    /// Starting body list.
    pub initial_bodies: Vec<Body>,
    /// Civilization name used in reports.
    pub civilization: String,
    /// Technology level quoted in reports.
    pub tech_level: u32,
    /// Population quoted in reports.
    pub population: u64,
    /// Event text for collapse reports.
    pub collapse_event: String,
    /// Event text for extinction reports.
    pub extinction_event: String,
    /// Time limit for one narrative request.
    pub narrative_timeout: Duration,
}

impl SessionSettings {
    /// Build settings for `world` from the simulation config.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidBody`] if a starting body is invalid.
    pub fn from_config(config: &SimulationConfig, world: WorldId) -> Result<Self, SessionError> {
        Ok(Self {
            world,
            tick_interval: Duration::from_millis(config.world.tick_interval_ms),
            dt: config.physics.dt,
            max_substeps: config.physics.max_substeps.max(1),
            max_time_scale: config.physics.max_time_scale.max(0.0),
            max_shield: config.physics.max_shield.max(0.0),
            integrator: config.physics.integrator(),
            stability: StabilityEngine::new(config.stability.clone()),
            initial_bodies: config.world.initial_bodies()?,
            civilization: config.world.civilization.clone(),
            tech_level: config.world.tech_level,
            population: config.world.population,
            collapse_event: config.narrative.collapse_event.clone(),
            extinction_event: config.narrative.extinction_event.clone(),
            narrative_timeout: Duration::from_millis(config.narrative.timeout_ms),
        })
    }

    /// The same settings for a different world.
    #[must_use]
    pub fn for_world(&self, world: WorldId) -> Self {
        Self {
            world,
            ..self.clone()
        }
    }
}

/// Mutable physical state of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    /// Live bodies in slot order.
    pub bodies: Vec<Body>,
    /// Largest body distance from the origin ever observed.
    pub system_radius: f64,
    /// Player-set time multiplier, `>= 0`.
    pub time_scale: f64,
    /// Gravity shield power, `>= 0`.
    pub shield: f64,
    /// Ticks completed.
    pub tick: u64,
}

impl SimulationState {
    /// Fresh state around a starting body list.
    pub fn new(bodies: Vec<Body>) -> Self {
        let mut state = Self {
            bodies,
            system_radius: 0.0,
            time_scale: 1.0,
            shield: 0.0,
            tick: 0,
        };
        state.raise_system_radius();
        state
    }

    /// Raise `system_radius` to the current farthest body. Never lowers it.
    pub fn raise_system_radius(&mut self) {
        let farthest = self
            .bodies
            .iter()
            .map(Body::distance_from_origin)
            .fold(0.0_f64, f64::max);
        if farthest.is_finite() {
            self.system_radius = self.system_radius.max(farthest);
        }
    }

    /// Wire form of the physics state.
    pub fn frame(&self) -> PhysicsFrame {
        PhysicsFrame {
            bodies: self
                .bodies
                .iter()
                .map(|b| WireBody {
                    mass: b.mass,
                    radius: b.radius,
                    position: [b.position.x, b.position.y, b.position.z],
                })
                .collect(),
            system_radius: self.system_radius,
        }
    }
}

/// Sub-step plan for one tick: `(steps, step_dt)`, `None` when frozen.
///
/// `ceil(time_scale)` equal steps covering `time_scale * dt`. The scale is
/// first capped at `max_substeps`, so `step_dt` never exceeds `dt`.
pub fn substeps(time_scale: f64, dt: f64, max_substeps: u32) -> Option<(u32, f64)> {
    if !time_scale.is_finite() || time_scale <= 0.0 || !dt.is_finite() || dt <= 0.0 {
        return None;
    }
    let scale = time_scale.min(f64::from(max_substeps.max(1)));
    let steps = scale.ceil().max(1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = steps as u32;
    Some((count, scale * dt / steps))
}

/// Summary of a completed tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSummary {
    /// Tick number just completed.
    pub tick: u64,
    /// Sanity transition applied.
    pub transition: SanityTransition,
    /// Bodies merged during the tick.
    pub merges: usize,
}

/// Owner of one world's simulation.
pub struct SessionController<S, N> {
    settings: SessionSettings,
    state: SimulationState,
    observers: ObserverSet,
    scheduler: TickScheduler,
    store: S,
    narrator: Arc<N>,
    record: SanityRecord,
    mailbox: mpsc::WeakSender<SessionCommand>,
    born_at: DateTime<Utc>,
    initialized: bool,
}

impl<S: KeyValueStore, N: NarrativeProvider> SessionController<S, N> {
    /// Create a controller. `mailbox` is the session's own command queue,
    /// used by the timer and by narrative tasks to post back.
    pub fn new(
        settings: SessionSettings,
        store: S,
        narrator: Arc<N>,
        mailbox: mpsc::WeakSender<SessionCommand>,
    ) -> Self {
        let record = SanityRecord::for_world(&settings.world);
        let state = SimulationState::new(settings.initial_bodies.clone());
        Self {
            settings,
            state,
            observers: ObserverSet::new(),
            scheduler: TickScheduler::Stopped,
            store,
            narrator,
            record,
            mailbox,
            born_at: Utc::now(),
            initialized: false,
        }
    }

    /// The physical state.
    pub const fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Whether the tick scheduler is running.
    pub const fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Seed the durable record on first use. Idempotent.
    pub async fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        match self.record.initialize(&self.store).await {
            Ok(sanity) => info!(world = %self.settings.world, sanity, "session initialized"),
            Err(e) => warn!(
                world = %self.settings.world,
                error = %e,
                "sanity record unavailable, assuming default"
            ),
        }
        self.born_at = Utc::now();
        self.initialized = true;
    }

    /// Current sanity from the durable record.
    ///
    /// Missing or unreadable records read as [`MAX_SANITY`].
    pub async fn sanity(&self) -> f64 {
        match self.record.load(&self.store).await {
            Ok(Some(value)) => value,
            Ok(None) => MAX_SANITY,
            Err(e) => {
                warn!(world = %self.settings.world, error = %e, "sanity read failed, assuming default");
                MAX_SANITY
            }
        }
    }

    async fn persist(&self, sanity: f64) {
        if let Err(e) = self.record.save(&self.store, sanity).await {
            warn!(world = %self.settings.world, error = %e, "sanity write failed");
        }
    }

    /// Status snapshot.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            world: self.settings.world.to_string(),
            tick: self.state.tick,
            observers: self.observers.len(),
            running: self.scheduler.is_running(),
            bodies: self.state.bodies.len(),
            system_radius: self.state.system_radius,
            time_scale: self.state.time_scale,
            shield: self.state.shield,
        }
    }

    /// Attach an observer. The first observer starts the scheduler.
    ///
    /// The new observer immediately receives the current sanity.
    pub async fn attach(&mut self, observer: ObserverId, sink: ObserverSink) {
        self.initialize().await;
        if !self.observers.insert(observer, sink) {
            return;
        }
        info!(
            world = %self.settings.world,
            observer_id = %observer,
            observers = self.observers.len(),
            "observer attached"
        );
        if self.observers.len() == 1 && self.scheduler.start(self.settings.tick_interval, self.mailbox.clone()) {
            info!(world = %self.settings.world, "tick scheduler started");
        }
        let sanity = self.sanity().await;
        self.observers
            .send_to(&observer, &ServerMessage::SanityUpdate { sanity });
    }

    /// Detach an observer. The last observer stops the scheduler.
    pub fn detach(&mut self, observer: &ObserverId) {
        if !self.observers.remove(observer) {
            return;
        }
        info!(
            world = %self.settings.world,
            observer_id = %observer,
            observers = self.observers.len(),
            "observer detached"
        );
        self.stop_if_unobserved();
    }

    fn stop_if_unobserved(&mut self) {
        if self.observers.is_empty() && self.scheduler.stop() {
            info!(world = %self.settings.world, "tick scheduler stopped");
        }
    }

    /// Broadcast to every observer, pruning closed ones.
    pub fn publish(&mut self, message: &ServerMessage) {
        let report = self.observers.broadcast(message);
        if !report.pruned.is_empty() {
            self.stop_if_unobserved();
        }
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NonFiniteState`] if integration produced a
    /// non-finite state. The body list is rolled back in that case.
    pub async fn tick(&mut self) -> Result<TickSummary, SessionError> {
        let merges = self.integrate()?;
        self.state.tick = self.state.tick.saturating_add(1);

        let chaos = self
            .settings
            .stability
            .chaos_level(&self.state.bodies, self.state.system_radius);
        let previous = self.sanity().await;
        let transition = self.settings.stability.update(previous, chaos);

        if transition.collapsed {
            warn!(world = %self.settings.world, sanity = transition.sanity, "sanity collapse");
            self.request_report(ReportKind::SanityCollapse, transition.sanity);
        }
        if transition.extinct {
            warn!(world = %self.settings.world, tick = self.state.tick, "civilization extinct");
            self.request_report(ReportKind::Extinction, transition.sanity);
        }

        self.persist(transition.sanity).await;

        self.publish(&ServerMessage::PhysicsUpdate {
            state: self.state.frame(),
            time_scale: self.state.time_scale,
        });
        self.publish(&ServerMessage::SanityUpdate {
            sanity: transition.sanity,
        });

        debug!(
            world = %self.settings.world,
            tick = self.state.tick,
            chaos,
            sanity = transition.sanity,
            bodies = self.state.bodies.len(),
            "tick complete"
        );
        Ok(TickSummary {
            tick: self.state.tick,
            transition,
            merges,
        })
    }

    fn integrate(&mut self) -> Result<usize, SessionError> {
        let Some((steps, step_dt)) =
            substeps(self.state.time_scale, self.settings.dt, self.settings.max_substeps)
        else {
            return Ok(0);
        };

        let snapshot = self.state.bodies.clone();
        let corrections = Corrections {
            shield: self.state.shield,
        };
        let mut merges = 0_usize;
        for _ in 0..steps {
            let report = self
                .settings
                .integrator
                .advance(&mut self.state.bodies, step_dt, corrections);
            merges = merges.saturating_add(report.merges);
        }

        let finite = self
            .state
            .bodies
            .iter()
            .all(|b| b.position.iter().chain(b.velocity.iter()).all(|c| c.is_finite()));
        if !finite {
            self.state.bodies = snapshot;
            return Err(SessionError::NonFiniteState {
                tick: self.state.tick.saturating_add(1),
            });
        }

        self.state.raise_system_radius();
        Ok(merges)
    }

    /// Apply a message from an observer.
    pub async fn handle(&mut self, observer: ObserverId, message: ClientMessage) {
        match message {
            ClientMessage::Intervention { kind, power } => match kind {
                InterventionKind::GravityShield => self.set_shield(power),
                InterventionKind::RationalBeacon => self.beacon(power).await,
                InterventionKind::SetTimeScale => self.set_time_scale(power),
                InterventionKind::Unknown => {
                    debug!(observer_id = %observer, "unknown intervention ignored");
                }
            },
            ClientMessage::SetTimeScale { value } => self.set_time_scale(value),
            ClientMessage::Unknown => debug!(observer_id = %observer, "unknown message ignored"),
        }
    }

    fn set_shield(&mut self, power: f64) {
        if !power.is_finite() {
            return;
        }
        self.state.shield = power.clamp(0.0, self.settings.max_shield);
        info!(world = %self.settings.world, shield = self.state.shield, "gravity shield set");
    }

    fn set_time_scale(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.state.time_scale = value.clamp(0.0, self.settings.max_time_scale);
        info!(world = %self.settings.world, time_scale = self.state.time_scale, "time scale set");
    }

    async fn beacon(&mut self, power: f64) {
        let current = self.sanity().await;
        let sanity = self.settings.stability.restore(current, power);
        self.persist(sanity).await;
        info!(world = %self.settings.world, power, sanity, "rational beacon");
        self.publish(&ServerMessage::SanityUpdate { sanity });
    }

    fn report_fields(&self, kind: ReportKind, sanity: f64) -> ReportFields {
        let event = match kind {
            ReportKind::SanityCollapse => self.settings.collapse_event.clone(),
            ReportKind::Extinction => self.settings.extinction_event.clone(),
        };
        ReportFields {
            civilization: self.settings.civilization.clone(),
            current_sanity: sanity.floor(),
            max_sanity: MAX_SANITY,
            tech_level: self.settings.tech_level,
            population: self.settings.population,
            event,
            tick: self.state.tick,
            born_at: self.born_at,
            occurred_at: Utc::now(),
        }
    }

    /// Generate a report off the session task and post it back.
    fn request_report(&self, kind: ReportKind, sanity: f64) {
        let fields = self.report_fields(kind, sanity);
        let narrator = Arc::clone(&self.narrator);
        let mailbox = self.mailbox.clone();
        let limit = self.settings.narrative_timeout;
        tokio::spawn(async move {
            let message = match generate_bounded(narrator.as_ref(), kind, &fields, limit).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(kind = kind.as_str(), error = %e, "narrative failed, using fallback");
                    fallback_message(kind, &fields)
                }
            };
            let outbound = match kind {
                ReportKind::SanityCollapse => ServerMessage::CollapseAlert { message },
                ReportKind::Extinction => ServerMessage::ExtinctionReport { message },
            };
            let delivered = match mailbox.upgrade() {
                Some(tx) => tx.send(SessionCommand::Publish(outbound)).await.is_ok(),
                None => false,
            };
            if !delivered {
                debug!(kind = kind.as_str(), "session gone before report was delivered");
            }
        });
    }

    /// Apply one command.
    pub async fn dispatch(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Attach { observer, sink } => self.attach(observer, sink).await,
            SessionCommand::Detach { observer } => self.detach(&observer),
            SessionCommand::Inbound { observer, message } => self.handle(observer, message).await,
            SessionCommand::Tick if !self.scheduler.is_running() => {
                debug!(world = %self.settings.world, "tick after last observer left, dropped");
            }
            SessionCommand::Tick => {
                if let Err(e) = self.tick().await {
                    error!(world = %self.settings.world, error = %e, "tick failed, skipped");
                }
            }
            SessionCommand::Publish(message) => self.publish(&message),
            SessionCommand::QuerySanity { reply } => {
                let sanity = self.sanity().await;
                let _ = reply.send(sanity);
            }
            SessionCommand::QueryStatus { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Process commands until every handle is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!(world = %self.settings.world, "session started");
        while let Some(command) = commands.recv().await {
            self.dispatch(command).await;
        }
        self.scheduler.stop();
        info!(world = %self.settings.world, "session closed");
    }
}

async fn generate_bounded<N: NarrativeProvider>(
    narrator: &N,
    kind: ReportKind,
    fields: &ReportFields,
    limit: Duration,
) -> Result<String, NarrativeError> {
    let text = tokio::time::timeout(limit, narrator.generate(kind, fields))
        .await
        .map_err(|_elapsed| NarrativeError::Timeout {
            ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        })??;
    if text.trim().is_empty() {
        return Err(NarrativeError::Empty);
    }
    Ok(text)
}

/// Mailbox depth of a session.
pub const MAILBOX_CAPACITY: usize = 256;

/// Cloneable address of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    world: WorldId,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// World this session simulates.
    pub const fn world(&self) -> &WorldId {
        &self.world
    }

    /// `true` once the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(command)
            .await
            .map_err(|_closed| SessionError::Closed(self.world.clone()))
    }

    /// Attach an observer connection.
    pub async fn attach(&self, observer: ObserverId, sink: ObserverSink) -> Result<(), SessionError> {
        self.send(SessionCommand::Attach { observer, sink }).await
    }

    /// Detach an observer connection.
    pub async fn detach(&self, observer: ObserverId) -> Result<(), SessionError> {
        self.send(SessionCommand::Detach { observer }).await
    }

    /// Forward a decoded observer message.
    pub async fn inbound(&self, observer: ObserverId, message: ClientMessage) -> Result<(), SessionError> {
        self.send(SessionCommand::Inbound { observer, message }).await
    }

    /// Read the current sanity.
    pub async fn sanity(&self) -> Result<f64, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::QuerySanity { reply }).await?;
        rx.await.map_err(|_closed| SessionError::Closed(self.world.clone()))
    }

    /// Read a status snapshot.
    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::QueryStatus { reply }).await?;
        rx.await.map_err(|_closed| SessionError::Closed(self.world.clone()))
    }
}

/// Spawn a session task and return its handle.
pub fn spawn_session<S: KeyValueStore, N: NarrativeProvider>(
    settings: SessionSettings,
    store: S,
    narrator: Arc<N>,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let world = settings.world.clone();
    let controller = SessionController::new(settings, store, narrator, tx.downgrade());
    tokio::spawn(controller.run(rx));
    SessionHandle { world, tx }
}
