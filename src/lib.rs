//! Ethica Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod notifications;
pub mod portal_store;
pub mod proposals;
pub mod reviews;
pub mod server;
pub mod sqlite_persistence;
pub mod users;

// Re-export commonly used types for convenience
pub use notifications::{BufferingEventSink, EventSink, TracingEventSink, WorkflowEvent};
pub use portal_store::{PortalStore, SqlitePortalStore};
pub use reviews::{WorkflowError, WorkflowOrchestrator};
pub use server::{run_server, RequestsLoggingLevel};
pub use users::{SqliteUserStore, UserDirectory, UserStore};
