//! # Eventship Dispatch
//!
//! Batching, cooldown-throttled, crash-safe event dispatch.
//!
//! ## Architecture
//! ```text
//! EventShipper (one tokio task, one mpsc queue)
//!   └── Dispatcher (pure state machine)
//!         ├── EventLog "pending_events"   ─┐
//!         ├── EventLog "in_flight_events" ─┴─► DurableStore (file | sqlite | memory)
//!         ├── CooldownTimer (restart | keep_existing)
//!         └── RetryPolicy (immediate | exponential)
//!   └── Transport (HTTP POST, 200 = delivered)
//! ```
//!
//! Events are persisted the moment they are tracked and removed only after
//! the collector acknowledges the batch that carried them. On start, anything
//! left in either log is sent without waiting for a new event.

pub mod cooldown;
pub mod engine;
pub mod log;
pub mod persistence;
pub mod retry;
pub mod service;
pub mod state;
pub mod store;
pub mod transport;

pub use cooldown::{Arming, CooldownPolicy, CooldownTimer};
pub use engine::{Action, DispatchStats, Dispatcher};
pub use log::EventLog;
pub use persistence::SqliteStore;
pub use retry::RetryPolicy;
pub use service::{EventShipper, Tracker};
pub use state::DispatchState;
pub use store::{FileStore, MemoryStore, open_store};
pub use transport::HttpTransport;
