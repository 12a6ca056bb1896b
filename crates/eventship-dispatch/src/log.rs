//! Event log: an ordered, persisted sequence of events.
//! Every mutation rewrites the whole sequence under the log's key.

use std::sync::Arc;

use eventship_core::error::Result;
use eventship_core::traits::DurableStore;
use eventship_core::types::{Event, EventBatch};

/// One named, persisted sequence of events.
pub struct EventLog {
    key: String,
    events: Vec<Event>,
    store: Arc<dyn DurableStore>,
}

impl EventLog {
    /// Open the log stored under `key`. A missing or empty value is an empty
    /// log; a value that does not parse is an error.
    pub fn open(key: &str, store: Arc<dyn DurableStore>) -> Result<Self> {
        let events = match store.load(key)? {
            Some(raw) => EventBatch::decode(&raw)?.events,
            None => Vec::new(),
        };
        if !events.is_empty() {
            tracing::info!(
                "📂 Restored {} events from '{}' ({})",
                events.len(),
                key,
                store.name()
            );
        }
        Ok(Self {
            key: key.to_string(),
            events,
            store,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Append one event to the tail and persist.
    pub fn append(&mut self, event: Event) -> Result<()> {
        self.events.push(event);
        self.save()
    }

    /// Append all of `other`'s events, in order, and persist.
    pub fn merge(&mut self, other: &EventLog) -> Result<()> {
        self.events.extend_from_slice(&other.events);
        self.save()
    }

    /// Empty the log and persist the empty state.
    pub fn clear(&mut self) -> Result<()> {
        self.events.clear();
        self.save()
    }

    /// Move every event into `target`, then clear this log.
    /// `target` is saved first: a crash in between duplicates, never loses.
    pub fn drain_into(&mut self, target: &mut EventLog) -> Result<()> {
        if self.events.is_empty() {
            return Ok(());
        }
        target.merge(self)?;
        self.clear()
    }

    /// Serialize to the collector's request body.
    pub fn to_wire_payload(&self) -> Result<String> {
        Ok(EventBatch::encode(&self.events)?)
    }

    fn save(&self) -> Result<()> {
        let json = self.to_wire_payload()?;
        self.store.save(&self.key, &json)
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("key", &self.key)
            .field("events", &self.events)
            .field("store", &self.store.name())
            .finish()
    }
}
