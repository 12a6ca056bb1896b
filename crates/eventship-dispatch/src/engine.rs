//! Dispatcher: the batching state machine.
//!
//! Pure and synchronous: every input returns the [`Action`]s the caller must
//! carry out (start a transport call, start a cooldown sleep, schedule a
//! retry). The service module owns one dispatcher on one task and feeds it
//! inputs one at a time; tests drive it directly.
//!
//! ```text
//! track ──► pending ──drain──► in-flight ──► Transport
//!                                  ▲             │
//!                                  └── failure ──┤ (merge pending, resend)
//!                                                └── success → clear in-flight
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eventship_core::config::ShipperConfig;
use eventship_core::error::Result;
use eventship_core::traits::DurableStore;
use eventship_core::types::Event;
use serde::Serialize;

use crate::cooldown::{Arming, CooldownTimer};
use crate::log::EventLog;
use crate::retry::RetryPolicy;
use crate::state::DispatchState;

/// Side effect requested by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Call the transport with this payload and report back via
    /// [`Dispatcher::on_send_outcome`].
    Send {
        payload: String,
        batch_len: usize,
        attempt: u32,
    },
    /// Sleep, then report back via [`Dispatcher::on_cooldown_expired`].
    ArmCooldown(Arming),
    /// Sleep, then report back via [`Dispatcher::on_retry_due`].
    RetryAfter(Duration),
}

/// Snapshot of dispatcher counters.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchStats {
    pub state: DispatchState,
    pub pending: usize,
    pub in_flight: usize,
    /// Attempt number of the current batch (0 when nothing is out).
    pub attempt: u32,
    pub sent_batches: u64,
    pub sent_events: u64,
    pub failed_attempts: u64,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// The dispatch state machine.
pub struct Dispatcher {
    pending: EventLog,
    in_flight: EventLog,
    state: DispatchState,
    cooldown: CooldownTimer,
    retry: RetryPolicy,
    attempt: u32,
    /// A transport call has been requested and not yet reported.
    outstanding: bool,
    /// A failed batch is waiting out its retry delay.
    retry_scheduled: bool,
    sent_batches: u64,
    sent_events: u64,
    failed_attempts: u64,
    last_success_at: Option<DateTime<Utc>>,
}

impl Dispatcher {
    pub fn new(
        pending: EventLog,
        in_flight: EventLog,
        cooldown: CooldownTimer,
        retry: RetryPolicy,
    ) -> Self {
        tracing::debug!(
            "⚙️ Dispatcher over '{}' → '{}' (cooldown {:?}, {:?})",
            pending.key(),
            in_flight.key(),
            cooldown.duration(),
            cooldown.policy()
        );
        Self {
            pending,
            in_flight,
            state: DispatchState::Idle,
            cooldown,
            retry,
            attempt: 0,
            outstanding: false,
            retry_scheduled: false,
            sent_batches: 0,
            sent_events: 0,
            failed_attempts: 0,
            last_success_at: None,
        }
    }

    /// Open both logs from `store` and build a dispatcher from `config`.
    pub fn from_config(store: Arc<dyn DurableStore>, config: &ShipperConfig) -> Result<Self> {
        let pending = EventLog::open(&config.store.pending_key, store.clone())?;
        let in_flight = EventLog::open(&config.store.in_flight_key, store)?;
        Ok(Self::new(
            pending,
            in_flight,
            CooldownTimer::new(config.cooldown(), config.cooldown_policy),
            RetryPolicy::from(&config.retry),
        ))
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn pending(&self) -> &EventLog {
        &self.pending
    }

    pub fn in_flight(&self) -> &EventLog {
        &self.in_flight
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            state: self.state,
            pending: self.pending.len(),
            in_flight: self.in_flight.len(),
            attempt: self.attempt,
            sent_batches: self.sent_batches,
            sent_events: self.sent_events,
            failed_attempts: self.failed_attempts,
            last_success_at: self.last_success_at,
        }
    }

    /// Startup check: anything restored from the store goes out at once.
    pub fn start(&mut self) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        if !self.pending.is_empty() || !self.in_flight.is_empty() {
            tracing::info!(
                "♻️ Recovering {} in-flight + {} pending events",
                self.in_flight.len(),
                self.pending.len()
            );
            self.begin_send(&mut actions)?;
        }
        Ok(actions)
    }

    /// Accept one event. It is persisted before this returns.
    pub fn track(&mut self, event: Event) -> Result<Vec<Action>> {
        tracing::debug!("📥 Track '{}' (state: {})", event.kind, self.state);
        self.pending.append(event)?;
        let mut actions = Vec::new();
        if self.state.can_send() {
            self.begin_send(&mut actions)?;
        }
        Ok(actions)
    }

    /// Persist an event to pending without starting a send. Used while
    /// shutting down; the event goes out on the next start.
    pub fn record(&mut self, event: Event) -> Result<()> {
        tracing::debug!("📥 Record '{}' for next start", event.kind);
        self.pending.append(event)
    }

    /// Report the result of the last [`Action::Send`].
    pub fn on_send_outcome(&mut self, success: bool) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        if !self.outstanding {
            tracing::warn!("⚠️ Ignoring send outcome with no batch outstanding");
            return Ok(actions);
        }
        self.outstanding = false;

        if success {
            let sent = self.in_flight.len();
            self.in_flight.clear()?;
            self.state = self.state.send_succeeded();
            self.sent_batches += 1;
            self.sent_events += sent as u64;
            self.last_success_at = Some(Utc::now());
            tracing::info!(
                "✅ Batch of {} events delivered (attempt {})",
                sent,
                self.attempt
            );
            self.attempt = 0;
            // The send outlasted the cooldown and more events queued up meanwhile
            if !self.state.is_cooling_down() && !self.pending.is_empty() {
                self.begin_send(&mut actions)?;
            }
            return Ok(actions);
        }

        self.failed_attempts += 1;
        let delay = self.retry.delay(self.attempt);
        tracing::warn!(
            "⚠️ Batch of {} events failed (attempt {}), retrying in {:?}",
            self.in_flight.len(),
            self.attempt,
            delay
        );
        if delay.is_zero() {
            self.begin_send(&mut actions)?;
        } else {
            self.retry_scheduled = true;
            actions.push(Action::RetryAfter(delay));
        }
        Ok(actions)
    }

    /// A retry delay requested with [`Action::RetryAfter`] has elapsed.
    pub fn on_retry_due(&mut self) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        if !self.retry_scheduled {
            tracing::warn!("⚠️ Ignoring retry with nothing scheduled");
            return Ok(actions);
        }
        self.retry_scheduled = false;
        self.begin_send(&mut actions)?;
        Ok(actions)
    }

    /// A cooldown sleep requested with [`Action::ArmCooldown`] has elapsed.
    pub fn on_cooldown_expired(&mut self, generation: u64) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        if !self.cooldown.expire(generation) {
            tracing::debug!(
                "⏱️ Stale cooldown #{} ignored (current #{})",
                generation,
                self.cooldown.generation()
            );
            return Ok(actions);
        }
        self.state = self.state.cooldown_expired();
        tracing::debug!("⏱️ Cooldown #{} over (state: {})", generation, self.state);
        if !self.pending.is_empty() && !self.state.is_sending() {
            self.begin_send(&mut actions)?;
        }
        Ok(actions)
    }

    /// Drain pending into in-flight, mark sending, arm the cooldown and ask
    /// for a transport call. On a retry path in-flight already holds the
    /// failed batch and pending is appended behind it.
    fn begin_send(&mut self, actions: &mut Vec<Action>) -> Result<()> {
        let retrying = self.state.is_sending();
        self.pending.drain_into(&mut self.in_flight)?;
        if self.in_flight.is_empty() {
            return Ok(());
        }

        self.state = self.state.send_started();
        self.attempt = if retrying { self.attempt.saturating_add(1) } else { 1 };

        if let Some(arming) = self.cooldown.arm() {
            self.state = self.state.cooldown_started();
            actions.push(Action::ArmCooldown(arming));
        }

        let payload = self.in_flight.to_wire_payload()?;
        tracing::info!(
            "📤 Sending batch of {} events (attempt {})",
            self.in_flight.len(),
            self.attempt
        );
        self.outstanding = true;
        actions.push(Action::Send {
            payload,
            batch_len: self.in_flight.len(),
            attempt: self.attempt,
        });
        Ok(())
    }
}
