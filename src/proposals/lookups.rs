//! Admin-maintained lookup tables consulted read-only by the workflow.
//!
//! These all follow the same "order + description + flags" pattern (settings,
//! recruitment modes, compensations, traits, registrations, funding sources).
//! Only the two the routing logic actually reads get their own types; the rest
//! share [`LookupEntry`].

use serde::{Deserialize, Serialize};

/// Generic lookup row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupEntry {
    pub id: i64,
    pub order: i64,
    pub description: String,
    pub needs_details: bool,
    /// Selecting this entry forces the long review route.
    pub requires_review: bool,
}

/// The applicant's relation to the institution. Decides whether supervisor
/// sign-off is required before committee review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: i64,
    pub order: i64,
    pub description: String,
    pub needs_supervisor: bool,
}

/// An institution hosting research, mapped to the chamber that reviews for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: i64,
    pub order: i64,
    pub description: String,
    /// Key of the reviewing chamber (e.g. "LK", "AK").
    pub reviewing_chamber: String,
}
