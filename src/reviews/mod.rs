//! The review workflow: route classification, stage machine, decision
//! aggregation and the orchestrator tying them together.

mod aggregator;
mod classifier;
mod error;
mod models;
mod stage;
mod workflow;

pub use aggregator::{aggregate, Outcome};
pub use classifier::{
    classify, elevated_risk_reasons, ChamberMap, Route, RouteDecision, RouteReason,
};
pub use error::WorkflowError;
pub use models::{Continuation, Decision, Escalation, Review, ReviewStage, Verdict};
pub use stage::{advance_stage, close_review, return_to_assignment};
pub use workflow::{ProposalDraft, RouteDurations, WorkflowOrchestrator};
