use axum::extract::FromRef;

use crate::portal_store::PortalStore;
use crate::reviews::WorkflowOrchestrator;
use crate::users::UserStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPortalStore = Arc<dyn PortalStore>;
pub type GuardedUserStore = Arc<dyn UserStore>;
pub type GuardedWorkflow = Arc<WorkflowOrchestrator>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub portal_store: GuardedPortalStore,
    pub user_store: GuardedUserStore,
    pub workflow: GuardedWorkflow,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedPortalStore {
    fn from_ref(input: &ServerState) -> Self {
        input.portal_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for GuardedWorkflow {
    fn from_ref(input: &ServerState) -> Self {
        input.workflow.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
