//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user handles, tokens, lookup ids),
//! update only this file.

// ============================================================================
// Test users and their pre-provisioned session tokens
// ============================================================================

/// Applicant (regular researcher) handle
pub const APPLICANT_USER: &str = "applicant";
pub const APPLICANT_TOKEN: &str = "token-applicant";

/// Supervisor handle
pub const SUPERVISOR_USER: &str = "supervisor";
pub const SUPERVISOR_TOKEN: &str = "token-supervisor";

/// Secretary handle (member of the secretary group)
pub const SECRETARY_USER: &str = "secretary";
pub const SECRETARY_TOKEN: &str = "token-secretary";

/// Linguistics-chamber reviewer handles
pub const REVIEWER_A_USER: &str = "reviewer-a";
pub const REVIEWER_A_TOKEN: &str = "token-reviewer-a";
pub const REVIEWER_B_USER: &str = "reviewer-b";
pub const REVIEWER_B_TOKEN: &str = "token-reviewer-b";

// ============================================================================
// Lookup row ids (deterministic on a fresh database)
// ============================================================================

/// Relation requiring supervisor sign-off ("PhD candidate")
pub const RELATION_WITH_SUPERVISOR_ID: i64 = 1;

/// Relation without supervisor sign-off ("Staff researcher")
pub const RELATION_WITHOUT_SUPERVISOR_ID: i64 = 2;

/// Institution mapped to the linguistics chamber
pub const INSTITUTION_ID: i64 = 1;

// ============================================================================
// Timeouts
// ============================================================================

pub const REQUEST_TIMEOUT_SECS: u64 = 5;
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;
