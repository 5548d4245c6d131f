//! Event publication.
//!
//! The workflow emits structured events; whatever sink is installed decides
//! what happens to them. The server installs the tracing sink, tests install
//! the buffering sink to assert on emissions.

use super::models::WorkflowEvent;
use std::sync::Mutex;
use tracing::info;

pub trait EventSink: Send + Sync {
    fn publish(&self, event: WorkflowEvent);
}

/// Logs every event as structured JSON.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: WorkflowEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "workflow_events", "{}", json),
            Err(err) => info!(target: "workflow_events", "unserializable event: {}", err),
        }
    }
}

/// Collects events in memory.
#[derive(Default)]
pub struct BufferingEventSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl BufferingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<WorkflowEvent> {
        std::mem::take(&mut self.events.lock().unwrap())
    }

    pub fn snapshot(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for BufferingEventSink {
    fn publish(&self, event: WorkflowEvent) {
        self.events.lock().unwrap().push(event);
    }
}
