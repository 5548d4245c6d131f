mod schema;
mod sqlite_portal_store;

pub use sqlite_portal_store::SqlitePortalStore;

use crate::proposals::{Institution, LookupEntry, Proposal, Relation, Study, Wmo};
use crate::reviews::{Decision, Review};
use crate::users::UserId;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Persistence for proposals, studies, reviews and decisions.
///
/// All methods return `Ok(None)` for missing rows and `Err` for database
/// failures. Review updates go through a compare-and-swap on the review's
/// version counter so concurrent decision submissions serialize around the
/// final "all decisions present" check.
pub trait PortalStore: Send + Sync {
    // Proposals
    fn create_proposal(&self, proposal: &Proposal) -> Result<Proposal>;
    fn get_proposal(&self, id: i64) -> Result<Option<Proposal>>;
    fn update_proposal(&self, proposal: &Proposal) -> Result<()>;
    /// Every reference number ever assigned; used to compute the next one.
    fn all_reference_numbers(&self) -> Result<Vec<String>>;
    /// Revisions/copies of the given proposal (weak parent back-reference).
    fn proposals_with_parent(&self, parent_id: i64) -> Result<Vec<Proposal>>;
    fn proposals_created_by(&self, uid: &UserId) -> Result<Vec<Proposal>>;

    // Studies
    fn add_study(&self, study: &Study) -> Result<Study>;
    fn studies_for(&self, proposal_id: i64) -> Result<Vec<Study>>;

    // WMO sub-records
    fn upsert_wmo(&self, wmo: &Wmo) -> Result<()>;
    fn wmo_for(&self, proposal_id: i64) -> Result<Option<Wmo>>;

    // Reviews
    fn create_review(&self, review: &Review) -> Result<Review>;
    fn get_review(&self, id: i64) -> Result<Option<Review>>;
    fn reviews_for_proposal(&self, proposal_id: i64) -> Result<Vec<Review>>;
    /// The non-closed review of the given type, if any. At most one exists
    /// per proposal per type.
    fn active_review_for(&self, proposal_id: i64, is_committee: bool) -> Result<Option<Review>>;
    /// Writes the review if and only if its stored version still equals
    /// `expected_version`, bumping the version. Returns false when the row
    /// changed underneath the caller.
    fn update_review_cas(&self, review: &Review, expected_version: i64) -> Result<bool>;
    /// Open short-route committee reviews with a target date on or before the
    /// given deadline.
    fn short_route_reviews_due_before(&self, deadline: DateTime<Utc>) -> Result<Vec<Review>>;
    /// Open supervisor reviews whose target date has passed.
    fn supervisor_reviews_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Review>>;

    // Decisions
    fn create_decision(&self, review_id: i64, reviewer: &UserId) -> Result<Decision>;
    fn get_decision(&self, id: i64) -> Result<Option<Decision>>;
    fn decision_for(&self, review_id: i64, reviewer: &UserId) -> Result<Option<Decision>>;
    fn decisions_for_review(&self, review_id: i64) -> Result<Vec<Decision>>;
    fn update_decision(&self, decision: &Decision) -> Result<()>;
    /// Pending (unvoted, not withdrawn) decisions assigned to the reviewer.
    fn pending_decisions_for(&self, reviewer: &UserId) -> Result<Vec<Decision>>;

    // Lookups
    fn insert_relation(&self, relation: &Relation) -> Result<Relation>;
    fn relations(&self) -> Result<Vec<Relation>>;
    fn get_relation(&self, id: i64) -> Result<Option<Relation>>;
    fn insert_institution(&self, institution: &Institution) -> Result<Institution>;
    fn institutions(&self) -> Result<Vec<Institution>>;
    fn insert_lookup_entry(&self, kind: &str, entry: &LookupEntry) -> Result<LookupEntry>;
    fn lookup_entries(&self, kind: &str) -> Result<Vec<LookupEntry>>;
}
