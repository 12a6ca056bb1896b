//! # Eventship Core
//!
//! Shared building blocks for the event shipper:
//! - [`types::Event`] and the `{"events": [...]}` batch envelope
//! - [`traits::DurableStore`] and [`traits::Transport`] seams
//! - [`config::ShipperConfig`] (TOML, every field defaulted)
//! - [`error::ShipError`]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ShipperConfig;
pub use error::{Result, ShipError};
pub use traits::{DurableStore, Transport};
pub use types::{Event, EventBatch};
