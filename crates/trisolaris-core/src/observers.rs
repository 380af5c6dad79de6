//! Observer membership and outbound fan-out.
//!
//! Each observer is represented by the sending half of a bounded channel
//! whose receiver is drained by the observer's transport task. Sending
//! never blocks the session: a full channel drops that one frame for that
//! one observer, a closed channel marks the observer for removal.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use trisolaris_types::{ObserverId, ServerMessage};

/// Default per-observer outbound buffer, in frames.
pub const DEFAULT_SINK_CAPACITY: usize = 64;

/// Outbound half of one observer connection.
#[derive(Debug, Clone)]
pub struct ObserverSink {
    tx: mpsc::Sender<String>,
}

/// Outcome of delivering one frame to one observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was queued.
    Sent,
    /// The observer's buffer was full; the frame was dropped.
    Lagged,
    /// The observer has gone away.
    Closed,
}

impl ObserverSink {
    /// Wrap an existing sender.
    pub const fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver its transport task should drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a serialized frame without waiting.
    pub fn deliver(&self, frame: &str) -> Delivery {
        match self.tx.try_send(frame.to_owned()) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => Delivery::Lagged,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// `true` once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Per-broadcast delivery counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Observers that received the frame.
    pub delivered: usize,
    /// Observers that skipped the frame because their buffer was full.
    pub lagged: usize,
    /// Observers removed because their channel was closed.
    pub pruned: Vec<ObserverId>,
}

/// The set of observers attached to one session.
#[derive(Debug, Default)]
pub struct ObserverSet {
    members: BTreeMap<ObserverId, ObserverSink>,
}

impl ObserverSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Returns `true` if it was not already present.
    pub fn insert(&mut self, id: ObserverId, sink: ObserverSink) -> bool {
        self.members.insert(id, sink).is_none()
    }

    /// Remove an observer. Returns `true` if it was present.
    pub fn remove(&mut self, id: &ObserverId) -> bool {
        self.members.remove(id).is_some()
    }

    /// Whether `id` is attached.
    pub fn contains(&self, id: &ObserverId) -> bool {
        self.members.contains_key(id)
    }

    /// Number of attached observers.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` when nobody is watching.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Send one message to a single observer.
    pub fn send_to(&self, id: &ObserverId, message: &ServerMessage) -> Option<Delivery> {
        let sink = self.members.get(id)?;
        match message.to_json() {
            Ok(frame) => Some(sink.deliver(&frame)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode outbound frame");
                None
            }
        }
    }

    /// Send one message to every observer.
    ///
    /// Failures are collected during iteration and pruned afterwards.
    pub fn broadcast(&mut self, message: &ServerMessage) -> BroadcastReport {
        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode outbound frame");
                return BroadcastReport::default();
            }
        };

        let mut report = BroadcastReport::default();
        for (id, sink) in &self.members {
            match sink.deliver(&frame) {
                Delivery::Sent => report.delivered = report.delivered.saturating_add(1),
                Delivery::Lagged => {
                    report.lagged = report.lagged.saturating_add(1);
                    tracing::debug!(observer_id = %id, "observer lagging, frame dropped");
                }
                Delivery::Closed => report.pruned.push(*id),
            }
        }

        for id in &report.pruned {
            self.members.remove(id);
            tracing::info!(observer_id = %id, "pruned closed observer");
        }
        report
    }
}
