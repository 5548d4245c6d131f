//! Stage transitions for a single review.
//!
//! Valid forward transitions:
//!
//! - `Supervisor -> Closed` (the supervisor's decision is terminal for the
//!   review)
//! - `Assignment -> Commission` (reviewers assigned)
//! - `Assignment -> Closed` (secretary short-circuit)
//! - `Commission -> Closed` (all decisions in, outcome derived)
//!
//! `Closed` is terminal: a revision spawns a new review, it never reopens a
//! closed one. The single sanctioned backward step, `Commission ->
//! Assignment`, exists only for the unassign-everyone case and has its own
//! entry point.

use super::error::WorkflowError;
use super::models::{Continuation, Review, ReviewStage};
use chrono::Utc;

fn allowed(from: ReviewStage, to: ReviewStage) -> bool {
    matches!(
        (from, to),
        (ReviewStage::Supervisor, ReviewStage::Closed)
            | (ReviewStage::Assignment, ReviewStage::Commission)
            | (ReviewStage::Assignment, ReviewStage::Closed)
            | (ReviewStage::Commission, ReviewStage::Closed)
    )
}

/// Moves the review to the next stage, rejecting anything the workflow does
/// not allow. Skipping a stage or touching a closed review is a policy
/// violation, never a silent no-op.
pub fn advance_stage(review: &mut Review, next: ReviewStage) -> Result<(), WorkflowError> {
    if review.stage == ReviewStage::Closed {
        return Err(WorkflowError::policy(format!(
            "review {} is closed; no further transitions",
            review.id
        )));
    }
    if !allowed(review.stage, next) {
        return Err(WorkflowError::policy(format!(
            "invalid stage transition {:?} -> {:?} for review {}",
            review.stage, next, review.id
        )));
    }
    review.stage = next;
    Ok(())
}

/// Returns a commission review to the assignment stage after every reviewer
/// was unassigned. This is the only sanctioned stage decrease.
pub fn return_to_assignment(review: &mut Review) -> Result<(), WorkflowError> {
    if review.stage != ReviewStage::Commission {
        return Err(WorkflowError::policy(format!(
            "cannot return review {} to assignment from {:?}",
            review.id, review.stage
        )));
    }
    review.stage = ReviewStage::Assignment;
    Ok(())
}

/// Closes the review with its final outcome, stamping the end date.
/// Enforces the invariant that `go`, `continuation` and `date_end` are set
/// exactly when the stage is `Closed`.
pub fn close_review(
    review: &mut Review,
    go: Option<bool>,
    continuation: Continuation,
) -> Result<(), WorkflowError> {
    advance_stage(review, ReviewStage::Closed)?;
    review.go = go;
    review.continuation = Some(continuation);
    review.date_end = Some(Utc::now());
    Ok(())
}
