//! The workflow orchestrator: creates reviews for submitted proposals,
//! advances proposal statuses as reviews close, and spawns follow-up reviews
//! on escalation or revision.
//!
//! Every mutation of a review goes through a compare-and-swap on its version
//! counter. The writer that wins the swap to the closed stage applies the
//! proposal-side transition; a loser re-reads and retries once, then reports a
//! conflict. This serializes concurrent decision submissions around the final
//! "all decisions present" check without holding database locks across calls.

use super::aggregator::{aggregate, Outcome};
use super::classifier::{classify, ChamberMap, Route};
use super::error::WorkflowError;
use super::models::{Continuation, Decision, Escalation, Review, ReviewStage, Verdict};
use super::stage;
use crate::notifications::{EventSink, WorkflowEvent};
use crate::portal_store::PortalStore;
use crate::proposals::{
    next_reference_number, next_revision_reference_number, Proposal, ProposalStatus, Wmo,
    YesNoDoubt,
};
use crate::users::{UserDirectory, UserGroup, UserId, UserStore};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

/// Target durations per route, in weeks. Configuration, not computation.
#[derive(Debug, Clone, Copy)]
pub struct RouteDurations {
    pub pre_assessment_weeks: i64,
    pub short_route_weeks: i64,
    pub revision_weeks: i64,
    pub supervisor_weeks: i64,
}

impl Default for RouteDurations {
    fn default() -> Self {
        Self {
            pre_assessment_weeks: 1,
            short_route_weeks: 2,
            revision_weeks: 1,
            supervisor_weeks: 1,
        }
    }
}

/// Fields needed to open a new draft proposal.
#[derive(Debug, Clone)]
pub struct ProposalDraft {
    pub title: String,
    pub created_by: UserId,
    pub supervisor: Option<UserId>,
    pub applicants: Vec<UserId>,
    pub relation_id: i64,
    pub institution_id: i64,
    pub is_pre_assessment: bool,
    pub is_practice: bool,
    pub date_start_study: Option<NaiveDate>,
    pub knowledge_security: Option<YesNoDoubt>,
    pub researcher_risk: Option<YesNoDoubt>,
}

pub struct WorkflowOrchestrator {
    store: Arc<dyn PortalStore>,
    users: Arc<dyn UserStore>,
    events: Arc<dyn EventSink>,
    durations: RouteDurations,
}

impl WorkflowOrchestrator {
    pub fn new(
        store: Arc<dyn PortalStore>,
        users: Arc<dyn UserStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            users,
            events,
            durations: RouteDurations::default(),
        }
    }

    pub fn with_durations(mut self, durations: RouteDurations) -> Self {
        self.durations = durations;
        self
    }

    fn proposal(&self, id: i64) -> Result<Proposal, WorkflowError> {
        self.store
            .get_proposal(id)?
            .ok_or_else(|| WorkflowError::not_found("proposal", id))
    }

    fn review(&self, id: i64) -> Result<Review, WorkflowError> {
        self.store
            .get_review(id)?
            .ok_or_else(|| WorkflowError::not_found("review", id))
    }

    fn wmo(&self, proposal_id: i64) -> Result<Wmo, WorkflowError> {
        Ok(self
            .store
            .wmo_for(proposal_id)?
            .unwrap_or_else(|| Wmo::new(proposal_id)))
    }

    fn chamber_map(&self) -> Result<ChamberMap, WorkflowError> {
        Ok(ChamberMap::from_institutions(&self.store.institutions()?))
    }

    fn set_status(
        &self,
        proposal: &mut Proposal,
        new_status: ProposalStatus,
        reason: &str,
    ) -> Result<(), WorkflowError> {
        let old_status = proposal.status;
        proposal.status = new_status;
        self.store.update_proposal(proposal)?;
        if old_status != new_status {
            self.events.publish(WorkflowEvent::ProposalStatusChanged {
                proposal_id: proposal.id,
                reference_number: proposal.reference_number.clone(),
                old_status,
                new_status,
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    /// Writes the review via compare-and-swap; on a lost race, re-reads and
    /// retries the mutation once before reporting a conflict.
    fn write_review<F>(&self, mut review: Review, mutate: F) -> Result<Review, WorkflowError>
    where
        F: Fn(&mut Review) -> Result<(), WorkflowError>,
    {
        for attempt in 0..2 {
            let mut updated = review.clone();
            mutate(&mut updated)?;
            if self.store.update_review_cas(&updated, review.version)? {
                updated.version = review.version + 1;
                return Ok(updated);
            }
            if attempt == 0 {
                review = self.review(review.id)?;
            }
        }
        Err(WorkflowError::ConcurrencyConflict {
            review_id: review.id,
        })
    }

    // ------------------------------------------------------------------
    // Proposal lifecycle
    // ------------------------------------------------------------------

    /// Opens a new draft proposal with a fresh reference number.
    pub fn create_draft(&self, draft: ProposalDraft) -> Result<Proposal, WorkflowError> {
        self.store
            .get_relation(draft.relation_id)?
            .ok_or_else(|| WorkflowError::not_found("relation", draft.relation_id))?;

        let existing = self.store.all_reference_numbers()?;
        let reference = next_reference_number(Utc::now().year(), &existing)?;

        let now = Utc::now();
        let mut applicants = draft.applicants;
        if !applicants.contains(&draft.created_by) {
            applicants.push(draft.created_by.clone());
        }

        let proposal = Proposal {
            id: 0,
            reference_number: reference.format(),
            title: draft.title,
            status: ProposalStatus::Draft,
            created_by: draft.created_by,
            supervisor: draft.supervisor,
            applicants,
            relation_id: draft.relation_id,
            institution_id: draft.institution_id,
            reviewing_chamber: None,
            is_pre_assessment: draft.is_pre_assessment,
            is_revision: false,
            is_practice: draft.is_practice,
            in_archive: false,
            embargo: false,
            has_minor_revision: false,
            status_review: None,
            parent_id: None,
            date_start_study: draft.date_start_study,
            knowledge_security: draft.knowledge_security,
            researcher_risk: draft.researcher_risk,
            date_created: now,
            date_modified: now,
            date_submitted: None,
            date_submitted_supervisor: None,
            date_reviewed: None,
            date_reviewed_supervisor: None,
        };
        let created = self.store.create_proposal(&proposal)?;
        let mut wmo = Wmo::new(created.id);
        wmo.update_status();
        self.store.upsert_wmo(&wmo)?;
        info!(
            "Created proposal {} ({})",
            created.reference_number, created.id
        );
        Ok(created)
    }

    /// Creates a revision of an existing proposal: a new draft carrying the
    /// parent's answers, a revision reference number and a weak back-reference
    /// to the parent.
    pub fn create_revision(
        &self,
        parent_id: i64,
        created_by: &UserId,
    ) -> Result<Proposal, WorkflowError> {
        let parent = self.proposal(parent_id)?;
        if parent.date_submitted.is_none() && parent.date_submitted_supervisor.is_none() {
            return Err(WorkflowError::policy(format!(
                "proposal {} was never submitted; edit it instead of revising",
                parent.reference_number
            )));
        }

        let existing = self.store.all_reference_numbers()?;
        let reference = next_revision_reference_number(&parent.reference_number, &existing)?;

        let now = Utc::now();
        let mut revision = parent.clone();
        revision.id = 0;
        revision.reference_number = reference.format();
        revision.status = ProposalStatus::Draft;
        revision.created_by = created_by.clone();
        revision.reviewing_chamber = None;
        revision.is_revision = true;
        revision.in_archive = false;
        revision.has_minor_revision = false;
        revision.status_review = None;
        revision.parent_id = Some(parent.id);
        revision.date_created = now;
        revision.date_modified = now;
        revision.date_submitted = None;
        revision.date_submitted_supervisor = None;
        revision.date_reviewed = None;
        revision.date_reviewed_supervisor = None;

        let created = self.store.create_proposal(&revision)?;

        for study in self.store.studies_for(parent.id)? {
            let mut copy = study.clone();
            copy.id = 0;
            copy.proposal_id = created.id;
            self.store.add_study(&copy)?;
        }
        let mut wmo = self.wmo(parent.id)?;
        wmo.proposal_id = created.id;
        wmo.update_status();
        self.store.upsert_wmo(&wmo)?;

        info!(
            "Created revision {} of proposal {}",
            created.reference_number, parent.reference_number
        );
        Ok(created)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Entry point when the applicant finalizes a proposal.
    ///
    /// Classifies the proposal, opens the first review and advances the
    /// status. Returns the created review, or None for proposals that require
    /// no review at all (practice proposals).
    pub fn submit_proposal(&self, proposal_id: i64) -> Result<Option<Review>, WorkflowError> {
        let mut proposal = self.proposal(proposal_id)?;
        if proposal.status != ProposalStatus::Draft {
            return Err(WorkflowError::policy(format!(
                "proposal {} is not editable; double submission rejected",
                proposal.reference_number
            )));
        }

        let studies = self.store.studies_for(proposal.id)?;
        let wmo = self.wmo(proposal.id)?;
        let chambers = self.chamber_map()?;
        let decision = classify(&proposal, &studies, &wmo, &chambers)?;
        proposal.reviewing_chamber = Some(decision.chamber.clone());

        if decision.route == Route::None {
            self.store.update_proposal(&proposal)?;
            info!(
                "Proposal {} requires no review",
                proposal.reference_number
            );
            return Ok(None);
        }

        let relation = self
            .store
            .get_relation(proposal.relation_id)?
            .ok_or_else(|| WorkflowError::not_found("relation", proposal.relation_id))?;

        let review = if relation.needs_supervisor {
            self.start_supervisor_phase(&mut proposal)?
        } else if proposal.is_pre_assessment {
            self.start_pre_assessment_phase(&mut proposal)?
        } else {
            self.start_assignment_phase(&mut proposal, decision.route)?
        };
        Ok(Some(review))
    }

    /// Opens the supervisor sign-off review.
    fn start_supervisor_phase(&self, proposal: &mut Proposal) -> Result<Review, WorkflowError> {
        let supervisor = proposal.supervisor.clone().ok_or_else(|| {
            WorkflowError::policy(format!(
                "proposal {} requires supervisor sign-off but no supervisor is designated",
                proposal.reference_number
            ))
        })?;
        if self.store.active_review_for(proposal.id, false)?.is_some() {
            return Err(WorkflowError::policy(format!(
                "proposal {} already has an open supervisor review",
                proposal.id
            )));
        }

        let now = Utc::now();
        let review = self.store.create_review(&Review {
            id: 0,
            proposal_id: proposal.id,
            stage: ReviewStage::Supervisor,
            short_route: None,
            go: None,
            continuation: None,
            is_committee_review: false,
            date_start: now,
            date_end: None,
            date_should_end: Some(now + Duration::weeks(self.durations.supervisor_weeks)),
            version: 0,
        })?;
        self.store.create_decision(review.id, &supervisor)?;

        proposal.date_submitted_supervisor = Some(now);
        // A resubmission starts a fresh sign-off cycle.
        proposal.date_reviewed_supervisor = None;
        self.set_status(
            proposal,
            ProposalStatus::SubmittedToSupervisor,
            "submitted for supervisor sign-off",
        )?;
        self.events.publish(WorkflowEvent::ReviewStarted {
            review_id: review.id,
            proposal_id: proposal.id,
            is_committee_review: false,
            short_route: None,
        });
        Ok(review)
    }

    /// Opens the committee review in the assignment stage.
    fn start_assignment_phase(
        &self,
        proposal: &mut Proposal,
        route: Route,
    ) -> Result<Review, WorkflowError> {
        if self.store.active_review_for(proposal.id, true)?.is_some() {
            return Err(WorkflowError::policy(format!(
                "proposal {} already has an open committee review",
                proposal.id
            )));
        }

        let short_route = route == Route::Short;
        let now = Utc::now();
        let date_should_end = if short_route {
            Some(now + Duration::weeks(self.durations.short_route_weeks))
        } else {
            None
        };

        let review = self.store.create_review(&Review {
            id: 0,
            proposal_id: proposal.id,
            stage: ReviewStage::Assignment,
            short_route: Some(short_route),
            go: None,
            continuation: None,
            is_committee_review: true,
            date_start: now,
            date_end: None,
            date_should_end,
            version: 0,
        })?;

        let secretary = self
            .users
            .secretary()?
            .ok_or_else(|| WorkflowError::config("no secretary configured"))?;
        self.store.create_decision(review.id, &secretary)?;

        proposal.date_submitted = Some(now);
        self.set_status(proposal, ProposalStatus::Submitted, "submitted for review")?;
        self.events.publish(WorkflowEvent::ReviewStarted {
            review_id: review.id,
            proposal_id: proposal.id,
            is_committee_review: true,
            short_route: Some(short_route),
        });
        Ok(review)
    }

    /// Opens the preliminary-assessment review: short route, one-week target,
    /// assessed by the secretary.
    fn start_pre_assessment_phase(
        &self,
        proposal: &mut Proposal,
    ) -> Result<Review, WorkflowError> {
        if self.store.active_review_for(proposal.id, true)?.is_some() {
            return Err(WorkflowError::policy(format!(
                "proposal {} already has an open committee review",
                proposal.id
            )));
        }

        let now = Utc::now();
        let review = self.store.create_review(&Review {
            id: 0,
            proposal_id: proposal.id,
            stage: ReviewStage::Assignment,
            short_route: Some(true),
            go: None,
            continuation: None,
            is_committee_review: true,
            date_start: now,
            date_end: None,
            date_should_end: Some(now + Duration::weeks(self.durations.pre_assessment_weeks)),
            version: 0,
        })?;

        let secretary = self
            .users
            .secretary()?
            .ok_or_else(|| WorkflowError::config("no secretary configured"))?;
        self.store.create_decision(review.id, &secretary)?;

        proposal.date_submitted = Some(now);
        self.set_status(
            proposal,
            ProposalStatus::Submitted,
            "submitted for preliminary assessment",
        )?;
        self.events.publish(WorkflowEvent::ReviewStarted {
            review_id: review.id,
            proposal_id: proposal.id,
            is_committee_review: true,
            short_route: Some(true),
        });
        Ok(review)
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// Records one reviewer's verdict and, when it completes the decision
    /// set, closes the review with the aggregate outcome.
    pub fn record_decision(
        &self,
        review_id: i64,
        reviewer: &UserId,
        verdict: Verdict,
        escalation: Option<Escalation>,
        comments: &str,
    ) -> Result<Outcome, WorkflowError> {
        let review = self.review(review_id)?;
        if review.is_closed() {
            return Err(WorkflowError::policy(format!(
                "review {} is closed; decisions can no longer be recorded",
                review_id
            )));
        }

        let mut decision = self
            .store
            .decision_for(review_id, reviewer)?
            .ok_or_else(|| {
                WorkflowError::policy(format!(
                    "user {} is not assigned to review {}",
                    reviewer, review_id
                ))
            })?;
        if decision.withdrawn {
            return Err(WorkflowError::policy(format!(
                "user {} was unassigned from review {}",
                reviewer, review_id
            )));
        }

        decision.verdict = Some(verdict);
        decision.escalation = escalation;
        decision.comments = comments.to_string();
        decision.date_decision = Some(Utc::now());
        self.store.update_decision(&decision)?;

        let decisions = self.store.decisions_for_review(review_id)?;
        let all_in = decisions
            .iter()
            .filter(|d| !d.withdrawn)
            .all(|d| d.verdict.is_some());
        self.events.publish(WorkflowEvent::DecisionRecorded {
            review_id,
            reviewer: reviewer.clone(),
            all_decisions_in: all_in,
        });

        self.conclude_review(review)
    }

    /// Re-aggregates the review's decisions and closes it when the outcome is
    /// final. Safe to call after any decision or assignment change.
    fn conclude_review(&self, review: Review) -> Result<Outcome, WorkflowError> {
        let proposal = self.proposal(review.proposal_id)?;
        let decisions = self.store.decisions_for_review(review.id)?;
        let outcome = aggregate(&decisions, proposal.is_post_hoc())?;
        let Some(mut continuation) = outcome.continuation else {
            return Ok(outcome);
        };
        // A supervisor withholding approval returns the proposal for
        // revision; outright rejection is reserved for the committee.
        if !review.is_committee_review && continuation.is_rejection() {
            continuation = Continuation::Revision;
        }

        let closed = match self.write_review(review, |r| {
            stage::close_review(r, outcome.go, continuation)
        }) {
            Ok(closed) => closed,
            Err(WorkflowError::PolicyViolation(_)) => {
                // The retry found the review already closed: the concurrent
                // writer won the race and applied the transition.
                return Ok(outcome);
            }
            Err(other) => return Err(other),
        };

        self.events.publish(WorkflowEvent::ReviewClosed {
            review_id: closed.id,
            proposal_id: closed.proposal_id,
            go: closed.go,
            continuation,
        });
        self.dispatch_review_closed(&closed)?;
        Ok(outcome)
    }

    /// Public hook per the workflow contract: applies the proposal-side
    /// effects of a closed review. Calling it for a review whose effects were
    /// already applied is a policy violation, never a double transition.
    pub fn on_review_closed(&self, review_id: i64) -> Result<(), WorkflowError> {
        let review = self.review(review_id)?;
        if !review.is_closed() {
            return Err(WorkflowError::policy(format!(
                "review {} is not closed",
                review_id
            )));
        }
        self.dispatch_review_closed(&review)
    }

    fn dispatch_review_closed(&self, review: &Review) -> Result<(), WorkflowError> {
        let continuation = review.continuation.ok_or_else(|| {
            WorkflowError::policy(format!("review {} closed without an outcome", review.id))
        })?;
        let mut proposal = self.proposal(review.proposal_id)?;

        if !review.is_committee_review {
            return self.dispatch_supervisor_closed(review, &mut proposal);
        }

        match continuation {
            Continuation::Go
            | Continuation::GoPostHoc
            | Continuation::NoGo
            | Continuation::NoGoPostHoc => {
                if proposal.status != ProposalStatus::Submitted {
                    return Err(WorkflowError::policy(format!(
                        "decision for proposal {} already applied",
                        proposal.reference_number
                    )));
                }
                proposal.status_review = Some(continuation.is_approval());
                proposal.date_reviewed = review.date_end;
                proposal.in_archive = !proposal.is_pre_assessment;
                self.set_status(
                    &mut proposal,
                    ProposalStatus::DecisionMade,
                    "committee decision recorded",
                )?;
                if continuation.is_approval() {
                    self.events.publish(WorkflowEvent::DocumentsReady {
                        proposal_id: proposal.id,
                        reference_number: proposal.reference_number.clone(),
                    });
                }
            }
            Continuation::Revision => {
                if proposal.status != ProposalStatus::Submitted {
                    return Err(WorkflowError::policy(format!(
                        "revision outcome for proposal {} already applied",
                        proposal.reference_number
                    )));
                }
                self.set_status(
                    &mut proposal,
                    ProposalStatus::Draft,
                    "revision required; returned to applicants",
                )?;
            }
            Continuation::Discontinued => {
                if proposal.status == ProposalStatus::DecisionMade {
                    return Err(WorkflowError::policy(format!(
                        "proposal {} already carries a decision",
                        proposal.reference_number
                    )));
                }
                proposal.date_reviewed = review.date_end;
                self.set_status(
                    &mut proposal,
                    ProposalStatus::DecisionMade,
                    "taken out of consideration",
                )?;
            }
            Continuation::LongRoute => {
                self.escalate_to_long_route(review, &proposal)?;
            }
            Continuation::Metc => {
                let mut wmo = self.wmo(proposal.id)?;
                wmo.enforced_by_commission = true;
                wmo.update_status();
                self.store.upsert_wmo(&wmo)?;
                self.events.publish(WorkflowEvent::MetcReferral {
                    proposal_id: proposal.id,
                });
                self.set_status(
                    &mut proposal,
                    ProposalStatus::Draft,
                    "referred to the external medical-ethics committee",
                )?;
            }
        }
        Ok(())
    }

    fn dispatch_supervisor_closed(
        &self,
        review: &Review,
        proposal: &mut Proposal,
    ) -> Result<(), WorkflowError> {
        if proposal.date_reviewed_supervisor.is_some() {
            return Err(WorkflowError::policy(format!(
                "supervisor decision for proposal {} already applied",
                proposal.reference_number
            )));
        }
        proposal.date_reviewed_supervisor = review.date_end;

        if review.go == Some(true) {
            // Supervisor approval does not close the proposal; the committee
            // review starts next.
            let studies = self.store.studies_for(proposal.id)?;
            let wmo = self.wmo(proposal.id)?;
            let chambers = self.chamber_map()?;
            let decision = classify(proposal, &studies, &wmo, &chambers)?;
            if proposal.is_pre_assessment {
                self.start_pre_assessment_phase(proposal)?;
            } else {
                self.start_assignment_phase(proposal, decision.route)?;
            }
        } else {
            self.set_status(
                proposal,
                ProposalStatus::Draft,
                "returned for revision by the supervisor",
            )?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reviewer assignment
    // ------------------------------------------------------------------

    /// Assigns or reassigns committee members to a review.
    ///
    /// New reviewers get a pending decision; unassigned reviewers who have not
    /// voted are withdrawn (the decision row stays, for the audit trail). The
    /// acting secretary is never withdrawn. Afterwards the aggregate is
    /// recomputed so the review does not wait for withdrawn reviewers.
    pub fn assign_reviewers(
        &self,
        review_id: i64,
        reviewers: &[UserId],
        use_short_route: bool,
    ) -> Result<(), WorkflowError> {
        let review = self.review(review_id)?;
        if review.is_closed() {
            return Err(WorkflowError::policy(format!(
                "review {} is closed; reviewers can no longer be assigned",
                review_id
            )));
        }
        if !review.is_committee_review {
            return Err(WorkflowError::policy(format!(
                "review {} is a supervisor review; it has a fixed reviewer",
                review_id
            )));
        }

        let proposal = self.proposal(review.proposal_id)?;
        let secretary = self.users.secretary()?;
        let decisions = self.store.decisions_for_review(review_id)?;

        for reviewer in reviewers {
            match decisions.iter().find(|d| &d.reviewer == reviewer) {
                None => {
                    self.store.create_decision(review_id, reviewer)?;
                    self.events.publish(WorkflowEvent::ReviewerAssigned {
                        review_id,
                        reviewer: reviewer.clone(),
                    });
                }
                Some(existing) if existing.withdrawn => {
                    let mut restored = existing.clone();
                    restored.withdrawn = false;
                    self.store.update_decision(&restored)?;
                    self.events.publish(WorkflowEvent::ReviewerAssigned {
                        review_id,
                        reviewer: reviewer.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        for decision in &decisions {
            let keep = reviewers.contains(&decision.reviewer)
                || Some(&decision.reviewer) == secretary.as_ref();
            if !keep && decision.is_pending() {
                let mut withdrawn = decision.clone();
                withdrawn.withdrawn = true;
                self.store.update_decision(&withdrawn)?;
                self.events.publish(WorkflowEvent::ReviewerWithdrawn {
                    review_id,
                    reviewer: decision.reviewer.clone(),
                });
            }
        }

        let remaining = self.store.decisions_for_review(review_id)?;
        let active_count = remaining.iter().filter(|d| !d.withdrawn).count();

        let durations = self.durations;
        let is_revision = proposal.is_revision;
        let old_stage = review.stage;
        let updated = self.write_review(review, |r| {
            r.short_route = Some(use_short_route);
            if active_count > 0 && r.stage == ReviewStage::Assignment {
                stage::advance_stage(r, ReviewStage::Commission)?;
            } else if active_count == 0 && r.stage == ReviewStage::Commission {
                stage::return_to_assignment(r)?;
            }
            // Target date precedence: revisions end in one week; an existing
            // target is kept; otherwise the route default applies.
            if is_revision {
                r.date_should_end = Some(Utc::now() + Duration::weeks(durations.revision_weeks));
            } else if r.date_should_end.is_some() {
                // Keep the target set at submission.
            } else if use_short_route {
                r.date_should_end =
                    Some(Utc::now() + Duration::weeks(durations.short_route_weeks));
            } else {
                r.date_should_end = None;
            }
            Ok(())
        })?;

        if updated.stage != old_stage {
            self.events.publish(WorkflowEvent::ReviewStageChanged {
                review_id,
                old_stage,
                new_stage: updated.stage,
            });
        }

        // Recompute so the review is not left waiting on withdrawn reviewers.
        if active_count > 0 {
            self.conclude_review(updated)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Secretary short-circuits
    // ------------------------------------------------------------------

    /// Takes an open review out of consideration. The review closes with the
    /// discontinued outcome and is set in stone.
    pub fn discontinue_review(&self, review_id: i64) -> Result<(), WorkflowError> {
        let review = self.review(review_id)?;
        if review.is_closed() {
            return Err(WorkflowError::policy(format!(
                "review {} is already closed",
                review_id
            )));
        }

        let closed = self.write_review(review, |r| {
            stage::close_review(r, None, Continuation::Discontinued)
        })?;
        self.events.publish(WorkflowEvent::ReviewClosed {
            review_id: closed.id,
            proposal_id: closed.proposal_id,
            go: None,
            continuation: Continuation::Discontinued,
        });
        self.dispatch_review_closed(&closed)
    }

    /// Bypasses the committee assessment entirely: every pending decision is
    /// stamped needs-revision and the review closes with the revision outcome.
    pub fn straight_to_revision(&self, review_id: i64) -> Result<(), WorkflowError> {
        let review = self.review(review_id)?;
        if review.is_closed() {
            return Err(WorkflowError::policy(format!(
                "review {} is already closed",
                review_id
            )));
        }
        if !review.is_committee_review {
            return Err(WorkflowError::policy(
                "only committee reviews can be sent straight to revision",
            ));
        }

        let now = Utc::now();
        for decision in self.store.decisions_for_review(review_id)? {
            if decision.is_pending() {
                let mut stamped = decision.clone();
                stamped.verdict = Some(Verdict::NeedsRevision);
                stamped.date_decision = Some(now);
                self.store.update_decision(&stamped)?;
            }
        }

        let closed = self.write_review(review, |r| {
            stage::close_review(r, Some(false), Continuation::Revision)
        })?;
        self.events.publish(WorkflowEvent::ReviewClosed {
            review_id: closed.id,
            proposal_id: closed.proposal_id,
            go: Some(false),
            continuation: Continuation::Revision,
        });
        self.dispatch_review_closed(&closed)
    }

    // ------------------------------------------------------------------
    // Escalation
    // ------------------------------------------------------------------

    /// Opens the follow-up long-route review after an escalation. The whole
    /// chamber is assigned; the proposal stays under review.
    fn escalate_to_long_route(
        &self,
        closed: &Review,
        proposal: &Proposal,
    ) -> Result<(), WorkflowError> {
        if self.store.active_review_for(proposal.id, true)?.is_some() {
            return Err(WorkflowError::policy(format!(
                "escalation of review {} already applied; proposal {} has an open committee review",
                closed.id, proposal.reference_number
            )));
        }
        let chamber_key = proposal.reviewing_chamber.as_deref().ok_or_else(|| {
            WorkflowError::config(format!(
                "proposal {} has no reviewing chamber recorded",
                proposal.reference_number
            ))
        })?;
        let chamber_group = UserGroup::for_chamber(chamber_key).ok_or_else(|| {
            WorkflowError::config(format!("unknown reviewing chamber {:?}", chamber_key))
        })?;
        let mut reviewers = self.users.members_of(chamber_group)?;
        if let Some(secretary) = self.users.secretary()? {
            if !reviewers.contains(&secretary) {
                reviewers.push(secretary);
            }
        }
        if reviewers.is_empty() {
            return Err(WorkflowError::config(format!(
                "chamber {} has no members to review proposal {}",
                chamber_key, proposal.reference_number
            )));
        }

        let review = self.store.create_review(&Review {
            id: 0,
            proposal_id: proposal.id,
            stage: ReviewStage::Commission,
            short_route: Some(false),
            go: None,
            continuation: None,
            is_committee_review: true,
            date_start: Utc::now(),
            date_end: None,
            date_should_end: None,
            version: 0,
        })?;
        for reviewer in &reviewers {
            self.store.create_decision(review.id, reviewer)?;
            self.events.publish(WorkflowEvent::ReviewerAssigned {
                review_id: review.id,
                reviewer: reviewer.clone(),
            });
        }
        self.events.publish(WorkflowEvent::ReviewStarted {
            review_id: review.id,
            proposal_id: proposal.id,
            is_committee_review: true,
            short_route: Some(false),
        });
        info!(
            "Escalated review {} of proposal {} to the long route (review {})",
            closed.id, proposal.reference_number, review.id
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Due-date scanning
    // ------------------------------------------------------------------

    /// Emits reminder events for reviews nearing or past their target date.
    /// Called periodically; delivery of the reminders is external.
    pub fn scan_due_reviews(&self) -> Result<usize, WorkflowError> {
        let now = Utc::now();
        let mut emitted = 0;

        for review in self
            .store
            .short_route_reviews_due_before(now + Duration::days(2))?
        {
            if let Some(due) = review.date_should_end {
                if due >= now {
                    self.events.publish(WorkflowEvent::ReviewDueSoon {
                        review_id: review.id,
                        date_should_end: due,
                    });
                    emitted += 1;
                }
            }
        }

        for review in self.store.supervisor_reviews_overdue(now)? {
            if let Some(due) = review.date_should_end {
                self.events.publish(WorkflowEvent::ReviewOverdue {
                    review_id: review.id,
                    date_should_end: due,
                });
                emitted += 1;
            }
        }

        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::BufferingEventSink;
    use crate::portal_store::SqlitePortalStore;
    use crate::proposals::{Institution, Relation, Study};
    use crate::users::SqliteUserStore;

    struct Harness {
        _dir: tempfile::TempDir,
        store: Arc<SqlitePortalStore>,
        users: Arc<SqliteUserStore>,
        events: Arc<BufferingEventSink>,
        workflow: WorkflowOrchestrator,
        secretary: UserId,
        supervisor: UserId,
        applicant: UserId,
        reviewer_a: UserId,
        reviewer_b: UserId,
        relation_with_supervisor: i64,
        relation_without_supervisor: i64,
        institution_id: i64,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqlitePortalStore::new(dir.path().join("portal.db")).unwrap());
        let users = Arc::new(SqliteUserStore::new(dir.path().join("users.db")).unwrap());
        let events = Arc::new(BufferingEventSink::new());

        let secretary = users.create_user("secretary", "S. Ecretary").unwrap();
        users
            .add_user_to_group(&secretary, UserGroup::Secretary)
            .unwrap();
        let supervisor = users.create_user("supervisor", "P. Rof").unwrap();
        let applicant = users.create_user("applicant", "A. Pplicant").unwrap();
        users
            .add_user_to_group(&applicant, UserGroup::Applicant)
            .unwrap();
        let reviewer_a = users.create_user("reviewer-a", "R. A").unwrap();
        users
            .add_user_to_group(&reviewer_a, UserGroup::LinguisticsChamber)
            .unwrap();
        let reviewer_b = users.create_user("reviewer-b", "R. B").unwrap();
        users
            .add_user_to_group(&reviewer_b, UserGroup::LinguisticsChamber)
            .unwrap();

        let relation_with_supervisor = store
            .insert_relation(&Relation {
                id: 0,
                order: 1,
                description: "PhD candidate".into(),
                needs_supervisor: true,
            })
            .unwrap()
            .id;
        let relation_without_supervisor = store
            .insert_relation(&Relation {
                id: 0,
                order: 2,
                description: "Staff researcher".into(),
                needs_supervisor: false,
            })
            .unwrap()
            .id;
        let institution_id = store
            .insert_institution(&Institution {
                id: 0,
                order: 1,
                description: "Faculty of Humanities".into(),
                reviewing_chamber: "LK".into(),
            })
            .unwrap()
            .id;

        let workflow =
            WorkflowOrchestrator::new(store.clone(), users.clone(), events.clone());

        Harness {
            _dir: dir,
            store,
            users,
            events,
            workflow,
            secretary,
            supervisor,
            applicant,
            reviewer_a,
            reviewer_b,
            relation_with_supervisor,
            relation_without_supervisor,
            institution_id,
        }
    }

    impl Harness {
        fn draft(&self, with_supervisor: bool) -> Proposal {
            self.workflow
                .create_draft(ProposalDraft {
                    title: "A harmless listening experiment".into(),
                    created_by: self.applicant.clone(),
                    supervisor: with_supervisor.then(|| self.supervisor.clone()),
                    applicants: vec![self.applicant.clone()],
                    relation_id: if with_supervisor {
                        self.relation_with_supervisor
                    } else {
                        self.relation_without_supervisor
                    },
                    institution_id: self.institution_id,
                    is_pre_assessment: false,
                    is_practice: false,
                    date_start_study: None,
                    knowledge_security: None,
                    researcher_risk: None,
                })
                .unwrap()
        }

        /// Draft without a supervisor, submitted: yields a committee review in
        /// the assignment stage holding only the secretary's decision.
        fn submitted_committee_review(&self) -> (Proposal, Review) {
            let proposal = self.draft(false);
            let review = self.workflow.submit_proposal(proposal.id).unwrap().unwrap();
            (
                self.store.get_proposal(proposal.id).unwrap().unwrap(),
                review,
            )
        }
    }

    #[test]
    fn scenario_a_supervisor_approval_spawns_committee_review() {
        let h = harness();
        let proposal = h.draft(true);

        let review = h.workflow.submit_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(review.stage, ReviewStage::Supervisor);
        assert!(!review.is_committee_review);

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::SubmittedToSupervisor);

        let outcome = h
            .workflow
            .record_decision(review.id, &h.supervisor, Verdict::Approved, None, "fine")
            .unwrap();
        assert_eq!(outcome.go, Some(true));

        let closed = h.store.get_review(review.id).unwrap().unwrap();
        assert_eq!(closed.stage, ReviewStage::Closed);
        assert_eq!(closed.continuation, Some(Continuation::Go));
        assert!(closed.date_end.is_some());

        // The committee review exists, in the assignment stage, short route.
        let committee = h
            .store
            .active_review_for(proposal.id, true)
            .unwrap()
            .unwrap();
        assert_eq!(committee.stage, ReviewStage::Assignment);
        assert_eq!(committee.short_route, Some(true));

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Submitted);
        assert!(proposal.date_reviewed_supervisor.is_some());
    }

    #[test]
    fn supervisor_rejection_returns_proposal_for_revision() {
        let h = harness();
        let proposal = h.draft(true);
        let review = h.workflow.submit_proposal(proposal.id).unwrap().unwrap();

        h.workflow
            .record_decision(
                review.id,
                &h.supervisor,
                Verdict::NotApproved,
                None,
                "needs work",
            )
            .unwrap();

        let closed = h.store.get_review(review.id).unwrap().unwrap();
        assert_eq!(closed.go, Some(false));
        assert_eq!(closed.continuation, Some(Continuation::Revision));

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
        // No committee review was spawned.
        assert!(h.store.active_review_for(proposal.id, true).unwrap().is_none());
    }

    #[test]
    fn scenario_b_one_dissent_yields_revision_and_editable_proposal() {
        let h = harness();
        let (proposal, review) = h.submitted_committee_review();

        // Three active decisions: secretary plus the two assigned reviewers.
        h.workflow
            .assign_reviewers(
                review.id,
                &[h.reviewer_a.clone(), h.reviewer_b.clone()],
                true,
            )
            .unwrap();
        let commission = h.store.get_review(review.id).unwrap().unwrap();
        assert_eq!(commission.stage, ReviewStage::Commission);

        h.workflow
            .record_decision(review.id, &h.reviewer_a, Verdict::Approved, None, "")
            .unwrap();
        h.workflow
            .record_decision(
                review.id,
                &h.secretary,
                Verdict::NeedsRevision,
                None,
                "consent form unclear",
            )
            .unwrap();
        let outcome = h
            .workflow
            .record_decision(review.id, &h.reviewer_b, Verdict::Approved, None, "")
            .unwrap();

        assert_eq!(outcome.go, Some(false));
        assert_eq!(outcome.continuation, Some(Continuation::Revision));

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
        assert!(proposal.status.is_editable());
    }

    #[test]
    fn scenario_c_rejection_is_terminal_and_blocks_new_decisions() {
        let h = harness();
        let (proposal, review) = h.submitted_committee_review();
        h.workflow
            .assign_reviewers(review.id, &[h.reviewer_a.clone()], true)
            .unwrap();

        h.workflow
            .record_decision(review.id, &h.secretary, Verdict::NotApproved, None, "")
            .unwrap();
        let outcome = h
            .workflow
            .record_decision(review.id, &h.reviewer_a, Verdict::NotApproved, None, "")
            .unwrap();
        assert_eq!(outcome.continuation, Some(Continuation::NoGo));

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::DecisionMade);
        assert_eq!(proposal.status_review, Some(false));
        assert!(proposal.in_archive);

        // A further decision against the closed review is a policy violation.
        let result = h.workflow.record_decision(
            review.id,
            &h.reviewer_b,
            Verdict::Approved,
            None,
            "",
        );
        assert!(matches!(result, Err(WorkflowError::PolicyViolation(_))));
    }

    #[test]
    fn scenario_d_pre_assessment_review_despite_risk_flags() {
        let h = harness();
        let proposal = h
            .workflow
            .create_draft(ProposalDraft {
                title: "Urgent pre-check".into(),
                created_by: h.applicant.clone(),
                supervisor: None,
                applicants: vec![h.applicant.clone()],
                relation_id: h.relation_without_supervisor,
                institution_id: h.institution_id,
                is_pre_assessment: true,
                is_practice: false,
                date_start_study: None,
                knowledge_security: Some(YesNoDoubt::Yes),
                researcher_risk: Some(YesNoDoubt::Yes),
            })
            .unwrap();
        let mut study = Study::new(proposal.id, 1);
        study.risk = Some(YesNoDoubt::Yes);
        h.store.add_study(&study).unwrap();

        let review = h.workflow.submit_proposal(proposal.id).unwrap().unwrap();
        // Pre-assessment precedence: short route with the one-week target.
        assert_eq!(review.short_route, Some(true));
        assert!(review.date_should_end.is_some());
        let due = review.date_should_end.unwrap();
        assert!(due <= Utc::now() + Duration::weeks(1) + Duration::minutes(1));
    }

    #[test]
    fn unanimous_approval_closes_and_archives() {
        let h = harness();
        let (proposal, review) = h.submitted_committee_review();
        h.workflow
            .assign_reviewers(review.id, &[h.reviewer_a.clone()], true)
            .unwrap();

        h.workflow
            .record_decision(review.id, &h.secretary, Verdict::Approved, None, "")
            .unwrap();
        let outcome = h
            .workflow
            .record_decision(review.id, &h.reviewer_a, Verdict::Approved, None, "")
            .unwrap();
        assert_eq!(outcome.go, Some(true));
        assert_eq!(outcome.continuation, Some(Continuation::Go));

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::DecisionMade);
        assert_eq!(proposal.status_review, Some(true));
        assert!(proposal.date_reviewed.is_some());
        assert!(proposal.in_archive);

        let events = h.events.snapshot();
        assert!(events
            .iter()
            .any(|e| matches!(e, WorkflowEvent::DocumentsReady { .. })));
    }

    #[test]
    fn double_submission_is_rejected() {
        let h = harness();
        let (proposal, _review) = h.submitted_committee_review();
        let result = h.workflow.submit_proposal(proposal.id);
        assert!(matches!(result, Err(WorkflowError::PolicyViolation(_))));
    }

    #[test]
    fn on_review_closed_is_not_applied_twice() {
        let h = harness();
        let (_proposal, review) = h.submitted_committee_review();
        h.workflow
            .assign_reviewers(review.id, &[h.reviewer_a.clone()], true)
            .unwrap();
        h.workflow
            .record_decision(review.id, &h.secretary, Verdict::Approved, None, "")
            .unwrap();
        h.workflow
            .record_decision(review.id, &h.reviewer_a, Verdict::Approved, None, "")
            .unwrap();

        // The close already applied the proposal transition; a second
        // application must surface, not double-apply.
        let result = h.workflow.on_review_closed(review.id);
        assert!(matches!(result, Err(WorkflowError::PolicyViolation(_))));
    }

    #[test]
    fn escalation_to_long_route_spawns_chamber_review() {
        let h = harness();
        let (proposal, review) = h.submitted_committee_review();
        h.workflow
            .assign_reviewers(review.id, &[h.reviewer_a.clone()], true)
            .unwrap();

        h.workflow
            .record_decision(review.id, &h.secretary, Verdict::Approved, None, "")
            .unwrap();
        let outcome = h
            .workflow
            .record_decision(
                review.id,
                &h.reviewer_a,
                Verdict::Approved,
                Some(Escalation::LongRoute),
                "wants a full look",
            )
            .unwrap();
        assert_eq!(outcome.continuation, Some(Continuation::LongRoute));

        // Proposal stays under review; a long-route commission review exists.
        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Submitted);

        let follow_up = h
            .store
            .active_review_for(proposal.id, true)
            .unwrap()
            .unwrap();
        assert_ne!(follow_up.id, review.id);
        assert_eq!(follow_up.stage, ReviewStage::Commission);
        assert_eq!(follow_up.short_route, Some(false));

        // The whole chamber plus the secretary hold decisions.
        let decisions = h.store.decisions_for_review(follow_up.id).unwrap();
        assert_eq!(decisions.len(), 3);
    }

    #[test]
    fn metc_referral_resets_proposal_and_flags_wmo() {
        let h = harness();
        let (proposal, review) = h.submitted_committee_review();

        h.workflow
            .record_decision(
                review.id,
                &h.secretary,
                Verdict::NotApproved,
                Some(Escalation::Metc),
                "medical review required",
            )
            .unwrap();

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
        let wmo = h.store.wmo_for(proposal.id).unwrap().unwrap();
        assert!(wmo.enforced_by_commission);
        assert_eq!(wmo.status, crate::proposals::WmoStatus::Waiting);
        assert!(h
            .events
            .snapshot()
            .iter()
            .any(|e| matches!(e, WorkflowEvent::MetcReferral { .. })));
    }

    #[test]
    fn discontinued_review_is_set_in_stone() {
        let h = harness();
        let (proposal, review) = h.submitted_committee_review();

        h.workflow.discontinue_review(review.id).unwrap();

        let closed = h.store.get_review(review.id).unwrap().unwrap();
        assert_eq!(closed.stage, ReviewStage::Closed);
        assert_eq!(closed.continuation, Some(Continuation::Discontinued));
        assert_eq!(closed.go, None);

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::DecisionMade);
        assert_eq!(proposal.status_review, None);

        let result = h.workflow.discontinue_review(review.id);
        assert!(matches!(result, Err(WorkflowError::PolicyViolation(_))));
    }

    #[test]
    fn straight_to_revision_stamps_pending_decisions() {
        let h = harness();
        let (proposal, review) = h.submitted_committee_review();

        h.workflow.straight_to_revision(review.id).unwrap();

        let closed = h.store.get_review(review.id).unwrap().unwrap();
        assert_eq!(closed.continuation, Some(Continuation::Revision));
        let decisions = h.store.decisions_for_review(review.id).unwrap();
        assert!(decisions
            .iter()
            .all(|d| d.verdict == Some(Verdict::NeedsRevision)));

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
    }

    #[test]
    fn withdrawing_a_reviewer_unblocks_the_aggregate() {
        let h = harness();
        let (_proposal, review) = h.submitted_committee_review();
        h.workflow
            .assign_reviewers(
                review.id,
                &[h.reviewer_a.clone(), h.reviewer_b.clone()],
                true,
            )
            .unwrap();

        h.workflow
            .record_decision(review.id, &h.secretary, Verdict::Approved, None, "")
            .unwrap();
        h.workflow
            .record_decision(review.id, &h.reviewer_a, Verdict::Approved, None, "")
            .unwrap();

        // reviewer_b never voted; unassigning them completes the review.
        h.workflow
            .assign_reviewers(review.id, &[h.reviewer_a.clone()], true)
            .unwrap();

        let closed = h.store.get_review(review.id).unwrap().unwrap();
        assert_eq!(closed.stage, ReviewStage::Closed);
        assert_eq!(closed.go, Some(true));

        // The withdrawn decision still exists, for the audit trail.
        let decisions = h.store.decisions_for_review(review.id).unwrap();
        let withdrawn = decisions
            .iter()
            .find(|d| d.reviewer == h.reviewer_b)
            .unwrap();
        assert!(withdrawn.withdrawn);
    }

    #[test]
    fn revision_proposal_gets_versioned_reference_number() {
        let h = harness();
        let (proposal, review) = h.submitted_committee_review();
        h.workflow.straight_to_revision(review.id).unwrap();

        let revision = h
            .workflow
            .create_revision(proposal.id, &h.applicant)
            .unwrap();
        assert!(revision.is_revision);
        assert_eq!(revision.parent_id, Some(proposal.id));
        assert_eq!(revision.status, ProposalStatus::Draft);

        let parent_ref =
            crate::proposals::ReferenceNumber::parse(&proposal.reference_number).unwrap();
        let revision_ref =
            crate::proposals::ReferenceNumber::parse(&revision.reference_number).unwrap();
        assert_eq!(parent_ref.year, revision_ref.year);
        assert_eq!(parent_ref.sequence, revision_ref.sequence);
        assert_eq!(revision_ref.version, parent_ref.version + 1);

        // The revision can be submitted like any draft.
        let new_review = h.workflow.submit_proposal(revision.id).unwrap().unwrap();
        assert!(new_review.is_committee_review);
    }

    #[test]
    fn unrevised_draft_cannot_be_revised() {
        let h = harness();
        let proposal = h.draft(false);
        let result = h.workflow.create_revision(proposal.id, &h.applicant);
        assert!(matches!(result, Err(WorkflowError::PolicyViolation(_))));
    }

    #[test]
    fn practice_proposal_submits_without_review() {
        let h = harness();
        let proposal = h
            .workflow
            .create_draft(ProposalDraft {
                title: "Course exercise".into(),
                created_by: h.applicant.clone(),
                supervisor: None,
                applicants: vec![h.applicant.clone()],
                relation_id: h.relation_without_supervisor,
                institution_id: h.institution_id,
                is_pre_assessment: false,
                is_practice: true,
                date_start_study: None,
                knowledge_security: None,
                researcher_risk: None,
            })
            .unwrap();

        let review = h.workflow.submit_proposal(proposal.id).unwrap();
        assert!(review.is_none());
        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
    }

    #[test]
    fn post_hoc_approval_uses_post_hoc_continuation() {
        let h = harness();
        let proposal = h
            .workflow
            .create_draft(ProposalDraft {
                title: "Already running study".into(),
                created_by: h.applicant.clone(),
                supervisor: None,
                applicants: vec![h.applicant.clone()],
                relation_id: h.relation_without_supervisor,
                institution_id: h.institution_id,
                is_pre_assessment: false,
                is_practice: false,
                date_start_study: Some(Utc::now().date_naive() - Duration::days(60)),
                knowledge_security: None,
                researcher_risk: None,
            })
            .unwrap();
        let review = h.workflow.submit_proposal(proposal.id).unwrap().unwrap();

        let outcome = h
            .workflow
            .record_decision(review.id, &h.secretary, Verdict::Approved, None, "")
            .unwrap();
        assert_eq!(outcome.continuation, Some(Continuation::GoPostHoc));

        let proposal = h.store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::DecisionMade);
        assert_eq!(proposal.status_review, Some(true));
    }

    #[test]
    fn due_review_scan_emits_reminders() {
        let h = harness();
        let (_proposal, review) = h.submitted_committee_review();
        h.workflow
            .assign_reviewers(review.id, &[h.reviewer_a.clone()], true)
            .unwrap();

        // The short-route review is due in two weeks, outside the window.
        assert_eq!(h.workflow.scan_due_reviews().unwrap(), 0);

        // Pull the target date into the reminder window.
        let mut due = h.store.get_review(review.id).unwrap().unwrap();
        due.date_should_end = Some(Utc::now() + Duration::days(1));
        assert!(h.store.update_review_cas(&due, due.version).unwrap());

        h.events.drain();
        assert_eq!(h.workflow.scan_due_reviews().unwrap(), 1);
        assert!(h
            .events
            .snapshot()
            .iter()
            .any(|e| matches!(e, WorkflowEvent::ReviewDueSoon { .. })));
    }

    #[test]
    fn status_change_events_carry_old_and_new_status() {
        let h = harness();
        let proposal = h.draft(false);
        h.workflow.submit_proposal(proposal.id).unwrap();

        let events = h.events.snapshot();
        let change = events
            .iter()
            .find_map(|e| match e {
                WorkflowEvent::ProposalStatusChanged {
                    old_status,
                    new_status,
                    ..
                } => Some((*old_status, *new_status)),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            change,
            (ProposalStatus::Draft, ProposalStatus::Submitted)
        );
    }

    #[test]
    fn supervisor_required_but_missing_is_surfaced() {
        let h = harness();
        let proposal = h
            .workflow
            .create_draft(ProposalDraft {
                title: "Missing supervisor".into(),
                created_by: h.applicant.clone(),
                supervisor: None,
                applicants: vec![h.applicant.clone()],
                relation_id: h.relation_with_supervisor,
                institution_id: h.institution_id,
                is_pre_assessment: false,
                is_practice: false,
                date_start_study: None,
                knowledge_security: None,
                researcher_risk: None,
            })
            .unwrap();
        let result = h.workflow.submit_proposal(proposal.id);
        assert!(matches!(result, Err(WorkflowError::PolicyViolation(_))));
    }

    #[test]
    fn risky_proposal_without_supervisor_goes_long_route() {
        let h = harness();
        let proposal = h.draft(false);
        let mut study = Study::new(proposal.id, 1);
        study.deception = Some(YesNoDoubt::Yes);
        h.store.add_study(&study).unwrap();

        let review = h.workflow.submit_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(review.short_route, Some(false));
        assert!(review.date_should_end.is_none());
        assert!(h
            .users
            .user_groups(&h.secretary)
            .unwrap()
            .contains(&UserGroup::Secretary));
    }
}
