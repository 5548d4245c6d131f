//! Combines individual reviewer decisions into a review's overall outcome.
//!
//! Approval is unanimous, not majority: one dissenting reviewer blocks the go.
//! Escalation flags override the vote tally entirely.

use super::error::WorkflowError;
use super::models::{Continuation, Decision, Escalation, Verdict};

/// Aggregate outcome of a decision set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// None while any assigned reviewer has not voted.
    pub go: Option<bool>,
    /// None while pending.
    pub continuation: Option<Continuation>,
}

impl Outcome {
    pub const PENDING: Outcome = Outcome {
        go: None,
        continuation: None,
    };

    pub fn is_final(&self) -> bool {
        self.go.is_some()
    }
}

/// Aggregates the decisions of a review.
///
/// Withdrawn decisions (unassigned reviewers) are ignored. A review with no
/// active decisions at all cannot report an outcome; that is an assignment
/// error, not an auto-approval.
///
/// `post_hoc` turns the plain approval/rejection continuations into their
/// post-hoc variants for studies that already ran when reviewed.
pub fn aggregate(decisions: &[Decision], post_hoc: bool) -> Result<Outcome, WorkflowError> {
    let active: Vec<&Decision> = decisions.iter().filter(|d| !d.withdrawn).collect();
    if active.is_empty() {
        return Err(WorkflowError::policy(
            "review has no assigned reviewers; refusing to derive an outcome",
        ));
    }

    if active.iter().any(|d| d.verdict.is_none()) {
        return Ok(Outcome::PENDING);
    }

    let go = active.iter().all(|d| d.verdict == Some(Verdict::Approved));

    // An METC referral supersedes an internal escalation; both supersede the
    // plain vote tally.
    let continuation = if active.iter().any(|d| d.escalation == Some(Escalation::Metc)) {
        Continuation::Metc
    } else if active
        .iter()
        .any(|d| d.escalation == Some(Escalation::LongRoute))
    {
        Continuation::LongRoute
    } else if go {
        if post_hoc {
            Continuation::GoPostHoc
        } else {
            Continuation::Go
        }
    } else if active
        .iter()
        .any(|d| d.verdict == Some(Verdict::NeedsRevision))
    {
        Continuation::Revision
    } else if post_hoc {
        Continuation::NoGoPostHoc
    } else {
        Continuation::NoGo
    };

    Ok(Outcome {
        go: Some(go),
        continuation: Some(continuation),
    })
}
