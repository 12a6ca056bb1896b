//! Trait seams between the dispatcher and the outside world.

pub mod store;
pub mod transport;

pub use store::DurableStore;
pub use transport::Transport;
