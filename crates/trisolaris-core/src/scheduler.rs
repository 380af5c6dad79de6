//! Presence-driven tick scheduler.
//!
//! The scheduler is a two-state machine owned by the session:
//!
//! ```text
//!   Stopped --(first observer attaches)--> Running(timer task)
//!   Running --(last observer detaches)---> Stopped
//! ```
//!
//! While running, a timer task posts [`SessionCommand::Tick`] into the
//! session mailbox at a fixed period. It holds only a weak sender and
//! exits on its own once the session is gone. If the mailbox is full when
//! the timer fires, that tick is skipped rather than queued.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::session::SessionCommand;

/// Tick scheduler state.
#[derive(Debug, Default)]
pub enum TickScheduler {
    /// No timer exists.
    #[default]
    Stopped,
    /// A timer task is posting ticks.
    Running(JoinHandle<()>),
}

impl TickScheduler {
    /// Start the timer if stopped. Returns `true` on a state change.
    pub fn start(&mut self, period: Duration, mailbox: mpsc::WeakSender<SessionCommand>) -> bool {
        if self.is_running() {
            return false;
        }
        *self = Self::Running(tokio::spawn(drive(period, mailbox)));
        true
    }

    /// Abort the timer if running. Returns `true` on a state change.
    pub fn stop(&mut self) -> bool {
        match std::mem::take(self) {
            Self::Running(handle) => {
                handle.abort();
                true
            }
            Self::Stopped => false,
        }
    }

    /// Whether a timer task currently exists.
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }
}

async fn drive(period: Duration, mailbox: mpsc::WeakSender<SessionCommand>) {
    let period = period.max(Duration::from_millis(1));
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let Some(tx) = mailbox.upgrade() else {
            break;
        };
        match tx.try_send(SessionCommand::Tick) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::debug!("session busy, tick skipped"),
            Err(TrySendError::Closed(_)) => break,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn running_scheduler_posts_ticks() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = TickScheduler::default();
        assert!(scheduler.start(Duration::from_millis(100), tx.downgrade()));
        assert!(!scheduler.start(Duration::from_millis(100), tx.downgrade()));

        tokio::time::sleep(Duration::from_millis(350)).await;
        let mut ticks = 0;
        while let Ok(cmd) = rx.try_recv() {
            assert!(matches!(cmd, SessionCommand::Tick));
            ticks += 1;
        }
        assert_eq!(ticks, 3);

        assert!(scheduler.stop());
        assert!(!scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_scheduler_is_idle() {
        let mut scheduler = TickScheduler::default();
        assert!(!scheduler.is_running());
        assert!(!scheduler.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn full_mailbox_skips_ticks() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut scheduler = TickScheduler::default();
        scheduler.start(Duration::from_millis(10), tx.downgrade());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn timer_exits_when_session_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        let mut scheduler = TickScheduler::default();
        scheduler.start(Duration::from_millis(10), tx.downgrade());
        drop(tx);
        drop(rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let TickScheduler::Running(handle) = &scheduler {
            assert!(handle.is_finished());
        }
        scheduler.stop();
    }
}
