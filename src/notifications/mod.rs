//! Structured workflow events and their publication.

mod models;
mod service;

pub use models::WorkflowEvent;
pub use service::{BufferingEventSink, EventSink, TracingEventSink};
