//! Workflow event payloads.
//!
//! Every observable transition in the review workflow emits one of these.
//! Delivery (e-mail, dashboards) is entirely external; consumers subscribe
//! through an [`EventSink`](super::EventSink).

use crate::proposals::ProposalStatus;
use crate::reviews::{Continuation, ReviewStage};
use crate::users::UserId;
use serde::{Deserialize, Serialize};

/// Events are serialized using serde's adjacently tagged representation:
/// `{"type": "event_name", "payload": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkflowEvent {
    #[serde(rename = "proposal_status_changed")]
    ProposalStatusChanged {
        proposal_id: i64,
        reference_number: String,
        old_status: ProposalStatus,
        new_status: ProposalStatus,
        reason: String,
    },

    #[serde(rename = "review_started")]
    ReviewStarted {
        review_id: i64,
        proposal_id: i64,
        is_committee_review: bool,
        short_route: Option<bool>,
    },

    #[serde(rename = "review_stage_changed")]
    ReviewStageChanged {
        review_id: i64,
        old_stage: ReviewStage,
        new_stage: ReviewStage,
    },

    #[serde(rename = "decision_recorded")]
    DecisionRecorded {
        review_id: i64,
        reviewer: UserId,
        /// Whether this was the last missing decision.
        all_decisions_in: bool,
    },

    #[serde(rename = "review_closed")]
    ReviewClosed {
        review_id: i64,
        proposal_id: i64,
        go: Option<bool>,
        continuation: Continuation,
    },

    #[serde(rename = "reviewer_assigned")]
    ReviewerAssigned { review_id: i64, reviewer: UserId },

    #[serde(rename = "reviewer_withdrawn")]
    ReviewerWithdrawn { review_id: i64, reviewer: UserId },

    /// The proposal was approved; the decision letter can be generated.
    #[serde(rename = "documents_ready")]
    DocumentsReady {
        proposal_id: i64,
        reference_number: String,
    },

    /// The proposal was referred to the external medical-ethics committee.
    #[serde(rename = "metc_referral")]
    MetcReferral { proposal_id: i64 },

    #[serde(rename = "review_due_soon")]
    ReviewDueSoon {
        review_id: i64,
        date_should_end: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "review_overdue")]
    ReviewOverdue {
        review_id: i64,
        date_should_end: chrono::DateTime<chrono::Utc>,
    },
}
