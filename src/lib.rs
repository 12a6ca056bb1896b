//! # Eventship
//!
//! Client-side telemetry shipper. Report `(type, data)` events with
//! [`EventShipper::track`]; they are persisted at once, batched, and POSTed to
//! a collector as `{"events":[{"type":..,"data":..}]}`, at most one batch at a
//! time and no more often than the configured cooldown. Failed batches are
//! retried with any newer events folded in; anything unacknowledged at exit
//! goes out on the next start.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! eventship::logging::init(false);
//! let shipper = eventship::start()?;
//! shipper.track("click", "play-button");
//! shipper.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod logging;

pub use eventship_core::config::{
    CooldownPolicy, RetryConfig, RetryStrategy, ShipperConfig, StoreBackend, StoreConfig,
};
pub use eventship_core::error::{Result, ShipError};
pub use eventship_core::traits::{DurableStore, Transport};
pub use eventship_core::types::{Event, EventBatch};
pub use eventship_dispatch::{
    DispatchState, DispatchStats, Dispatcher, EventShipper, FileStore, HttpTransport,
    MemoryStore, RetryPolicy, SqliteStore, Tracker,
};

/// Start a shipper from `~/.eventship/config.toml`, or defaults if absent.
pub fn start() -> anyhow::Result<EventShipper> {
    let config = ShipperConfig::load()?;
    start_with(&config)
}

/// Start a shipper from an explicit configuration.
pub fn start_with(config: &ShipperConfig) -> anyhow::Result<EventShipper> {
    Ok(EventShipper::from_config(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::post;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_logging_init_is_idempotent() {
        logging::init(true);
        assert!(!logging::init(false));
        assert!(!logging::init_json(false));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = ShipperConfig {
            cooldown_secs: 0.0,
            ..ShipperConfig::default()
        };
        assert!(start_with(&config).is_err());
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let bodies: Arc<Mutex<Vec<EventBatch>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = bodies.clone();
        let app = Router::new().route(
            "/ingest",
            post(move |body: String| {
                let seen = seen.clone();
                async move {
                    let batch: EventBatch = serde_json::from_str(&body).unwrap();
                    seen.lock().unwrap().push(batch);
                    axum::http::StatusCode::OK
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let dir = std::env::temp_dir().join("eventship-test-e2e");
        std::fs::remove_dir_all(&dir).ok();
        let config = ShipperConfig {
            endpoint_url: format!("http://{addr}/ingest"),
            cooldown_secs: 0.2,
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                path: Some(dir.join("state.db").display().to_string()),
                ..StoreConfig::default()
            },
            ..ShipperConfig::default()
        };

        let shipper = start_with(&config).unwrap();
        shipper.track("click", "a");
        shipper.track("click", "b");
        shipper.track("view", "home");

        let mut delivered = Vec::new();
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            delivered = bodies
                .lock()
                .unwrap()
                .iter()
                .flat_map(|b| b.events.clone())
                .collect::<Vec<Event>>();
            if delivered.len() == 3 {
                break;
            }
        }
        assert_eq!(
            delivered,
            vec![
                Event::new("click", "a"),
                Event::new("click", "b"),
                Event::new("view", "home"),
            ]
        );

        let stats = shipper.stats().await.unwrap();
        assert_eq!(stats.pending + stats.in_flight, 0);
        assert_eq!(stats.sent_events, 3);
        shipper.shutdown().await.unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }
}
