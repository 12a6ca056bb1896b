//! Event shipper service: runs a [`Dispatcher`] on its own tokio task.
//!
//! Every input (tracked events, transport outcomes, cooldown and retry
//! timers) arrives on one mpsc queue and is handled to completion before the
//! next, so the dispatcher needs no locks. Transport calls and timer sleeps
//! run in spawned tasks that post their result back onto the queue.

use std::sync::Arc;

use eventship_core::config::ShipperConfig;
use eventship_core::error::{Result, ShipError};
use eventship_core::traits::Transport;
use eventship_core::types::Event;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::engine::{Action, DispatchStats, Dispatcher};
use crate::store::open_store;
use crate::transport::HttpTransport;

enum Message {
    Track(Event),
    SendFinished { success: bool },
    CooldownExpired { generation: u64 },
    RetryDue,
    Stats(oneshot::Sender<DispatchStats>),
    Shutdown,
}

/// Cheap, cloneable fire-and-forget handle for reporting events.
#[derive(Clone)]
pub struct Tracker {
    tx: mpsc::UnboundedSender<Message>,
}

impl Tracker {
    /// Report an event. Never blocks and never fails from the caller's side.
    pub fn track(&self, kind: impl Into<String>, data: impl Into<String>) {
        let event = Event::new(kind, data);
        if let Err(mpsc::error::SendError(Message::Track(event))) = self.tx.send(Message::Track(event)) {
            tracing::warn!("⚠️ Event shipper is closed, '{}' event not recorded", event.kind);
        }
    }
}

/// Running event shipper.
pub struct EventShipper {
    tracker: Tracker,
    worker: JoinHandle<Result<()>>,
}

impl EventShipper {
    /// Run the startup check and spawn the worker. Must be called from within
    /// a tokio runtime.
    pub fn spawn(mut dispatcher: Dispatcher, transport: Arc<dyn Transport>) -> Result<Self> {
        let startup = dispatcher.start()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut worker = Worker {
            dispatcher,
            transport,
            tx: tx.downgrade(),
            cooldown_task: None,
            retry_task: None,
        };
        worker.apply(startup);
        tracing::info!("🚀 Event shipper started");
        Ok(Self {
            tracker: Tracker { tx },
            worker: tokio::spawn(worker.run(rx)),
        })
    }

    /// Build store, logs and HTTP transport from configuration and spawn.
    pub fn from_config(config: &ShipperConfig) -> Result<Self> {
        config.validate()?;
        let store = open_store(&config.store)?;
        let transport = Arc::new(HttpTransport::from_config(config));
        tracing::info!(
            "📦 Event shipper → {} (store: {}, cooldown: {}s)",
            transport.url(),
            store.name(),
            config.cooldown_secs
        );
        let dispatcher = Dispatcher::from_config(store, config)?;
        Self::spawn(dispatcher, transport)
    }

    /// Report an event. See [`Tracker::track`].
    pub fn track(&self, kind: impl Into<String>, data: impl Into<String>) {
        self.tracker.track(kind, data);
    }

    /// A cloneable handle for reporting from elsewhere.
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }

    /// Current dispatcher counters.
    pub async fn stats(&self) -> Result<DispatchStats> {
        let (reply, rx) = oneshot::channel();
        self.tracker
            .tx
            .send(Message::Stats(reply))
            .map_err(|_| ShipError::Closed)?;
        rx.await.map_err(|_| ShipError::Closed)
    }

    /// Stop the worker and return how it ended. A batch still out is not
    /// cancelled; its events stay persisted and go out on the next start.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.tracker.tx.send(Message::Shutdown);
        self.worker
            .await
            .map_err(|e| ShipError::Worker(e.to_string()))?
    }
}

struct Worker {
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
    /// Weak so that dropping every handle stops the worker.
    tx: mpsc::WeakUnboundedSender<Message>,
    cooldown_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) -> Result<()> {
        while let Some(msg) = rx.recv().await {
            let result = match msg {
                Message::Track(event) => self.dispatcher.track(event),
                Message::SendFinished { success } => self.dispatcher.on_send_outcome(success),
                Message::CooldownExpired { generation } => {
                    self.dispatcher.on_cooldown_expired(generation)
                }
                Message::RetryDue => self.dispatcher.on_retry_due(),
                Message::Stats(reply) => {
                    let _ = reply.send(self.dispatcher.stats());
                    continue;
                }
                Message::Shutdown => {
                    self.stop_timers();
                    return self.drain(rx).await;
                }
            };
            match result {
                Ok(actions) => self.apply(actions),
                Err(e) => {
                    tracing::error!("❌ Event shipper stopped, store failed: {e}");
                    self.stop_timers();
                    return Err(e);
                }
            }
        }
        self.stop_timers();
        self.log_stopped();
        Ok(())
    }

    /// Close the queue and persist events that were tracked behind the
    /// shutdown request. No new sends start.
    async fn drain(mut self, mut rx: mpsc::UnboundedReceiver<Message>) -> Result<()> {
        rx.close();
        while let Some(msg) = rx.recv().await {
            if let Message::Track(event) = msg {
                if let Err(e) = self.dispatcher.record(event) {
                    tracing::error!("❌ Event shipper stopped, store failed: {e}");
                    return Err(e);
                }
            }
        }
        self.log_stopped();
        Ok(())
    }

    fn log_stopped(&self) {
        tracing::info!(
            "🛑 Event shipper stopped ({} pending, {} in flight)",
            self.dispatcher.pending().len(),
            self.dispatcher.in_flight().len()
        );
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Send {
                    payload,
                    batch_len,
                    attempt,
                } => {
                    let transport = self.transport.clone();
                    let name = transport.name().to_string();
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        // Inner task so a panicking transport still reports back
                        let call = tokio::spawn(async move { transport.send(&payload).await });
                        let success = match call.await {
                            Ok(Ok(())) => true,
                            Ok(Err(e)) => {
                                tracing::warn!(
                                    "⚠️ {name} send of {batch_len} events failed (attempt {attempt}): {e}"
                                );
                                false
                            }
                            Err(e) => {
                                tracing::error!(
                                    "❌ {name} send of {batch_len} events aborted (attempt {attempt}): {e}"
                                );
                                false
                            }
                        };
                        post(&tx, Message::SendFinished { success });
                    });
                }
                Action::ArmCooldown(arming) => {
                    if let Some(task) = self.cooldown_task.take() {
                        task.abort();
                    }
                    let tx = self.tx.clone();
                    self.cooldown_task = Some(tokio::spawn(async move {
                        tokio::time::sleep(arming.after).await;
                        post(&tx, Message::CooldownExpired {
                            generation: arming.generation,
                        });
                    }));
                }
                Action::RetryAfter(delay) => {
                    let tx = self.tx.clone();
                    self.retry_task = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        post(&tx, Message::RetryDue);
                    }));
                }
            }
        }
    }

    fn stop_timers(&mut self) {
        for task in [self.cooldown_task.take(), self.retry_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

fn post(tx: &mpsc::WeakUnboundedSender<Message>, msg: Message) {
    if let Some(tx) = tx.upgrade() {
        let _ = tx.send(msg);
    }
}
