use crate::users::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage of a review.
///
/// The integer codes are persisted; value 3 was a separate secretary close-out
/// stage in an earlier version of the portal and now folds into `Closed`.
/// The gap stays: renumbering would corrupt archived reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStage {
    /// Sign-off by the accountable supervisor.
    Supervisor,
    /// The secretary is picking committee members.
    Assignment,
    /// Committee members are assessing.
    Commission,
    /// Terminal.
    Closed,
}

impl ReviewStage {
    pub fn as_int(self) -> i64 {
        match self {
            ReviewStage::Supervisor => 0,
            ReviewStage::Assignment => 1,
            ReviewStage::Commission => 2,
            ReviewStage::Closed => 4,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(ReviewStage::Supervisor),
            1 => Some(ReviewStage::Assignment),
            2 => Some(ReviewStage::Commission),
            // Legacy secretary close-out stage, folded into Closed.
            3 | 4 => Some(ReviewStage::Closed),
            _ => None,
        }
    }
}

/// Coded outcome of a closed review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Continuation {
    /// Approved.
    Go,
    /// Revision required; the applicants may resubmit.
    Revision,
    /// Rejected.
    NoGo,
    /// Escalated to an open long-route review.
    LongRoute,
    /// Referred to the external medical-ethics committee.
    Metc,
    /// Approved post-hoc (the study had already started).
    GoPostHoc,
    /// Rejected post-hoc.
    NoGoPostHoc,
    /// Taken out of consideration by the secretary.
    Discontinued,
}

impl Continuation {
    pub fn as_int(self) -> i64 {
        match self {
            Continuation::Go => 0,
            Continuation::Revision => 1,
            Continuation::NoGo => 2,
            Continuation::LongRoute => 3,
            Continuation::Metc => 4,
            Continuation::GoPostHoc => 5,
            Continuation::NoGoPostHoc => 6,
            Continuation::Discontinued => 7,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(Continuation::Go),
            1 => Some(Continuation::Revision),
            2 => Some(Continuation::NoGo),
            3 => Some(Continuation::LongRoute),
            4 => Some(Continuation::Metc),
            5 => Some(Continuation::GoPostHoc),
            6 => Some(Continuation::NoGoPostHoc),
            7 => Some(Continuation::Discontinued),
            _ => None,
        }
    }

    pub fn is_approval(self) -> bool {
        matches!(self, Continuation::Go | Continuation::GoPostHoc)
    }

    pub fn is_rejection(self) -> bool {
        matches!(self, Continuation::NoGo | Continuation::NoGoPostHoc)
    }
}

/// One assessment pass against a proposal, by the supervisor or a committee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub proposal_id: i64,
    pub stage: ReviewStage,
    /// Set once the route is known; None before assignment.
    pub short_route: Option<bool>,
    /// Overall outcome; None while the review runs.
    pub go: Option<bool>,
    /// Coded outcome; None until the review closes.
    pub continuation: Option<Continuation>,
    pub is_committee_review: bool,
    pub date_start: DateTime<Utc>,
    pub date_end: Option<DateTime<Utc>>,
    /// Route-dependent target date; None for the long route.
    pub date_should_end: Option<DateTime<Utc>>,
    /// Bumped on every write; used for optimistic concurrency control.
    pub version: i64,
}

impl Review {
    pub fn is_closed(&self) -> bool {
        self.stage == ReviewStage::Closed
    }
}

/// A single reviewer's verdict.
/// Persisted as the one-character codes of the original decision forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    NotApproved,
    NeedsRevision,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Approved => "Y",
            Verdict::NotApproved => "N",
            Verdict::NeedsRevision => "?",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Y" => Some(Verdict::Approved),
            "N" => Some(Verdict::NotApproved),
            "?" => Some(Verdict::NeedsRevision),
            _ => None,
        }
    }
}

/// Special route a reviewer can flag regardless of their go/no-go verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Escalation {
    LongRoute,
    Metc,
}

impl Escalation {
    pub fn as_str(self) -> &'static str {
        match self {
            Escalation::LongRoute => "long_route",
            Escalation::Metc => "metc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "long_route" => Some(Escalation::LongRoute),
            "metc" => Some(Escalation::Metc),
            _ => None,
        }
    }
}

/// One reviewer's decision within a review. Unique per (review, reviewer).
/// Decisions are never deleted; unassigning a reviewer withdraws the decision
/// instead, keeping the audit trail intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: i64,
    pub review_id: i64,
    pub reviewer: UserId,
    /// None while the reviewer has not voted.
    pub verdict: Option<Verdict>,
    pub escalation: Option<Escalation>,
    pub comments: String,
    pub date_decision: Option<DateTime<Utc>>,
    /// Reviewer was unassigned before voting; excluded from aggregation.
    pub withdrawn: bool,
}

impl Decision {
    pub fn is_pending(&self) -> bool {
        !self.withdrawn && self.verdict.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_codes_keep_the_gap() {
        assert_eq!(ReviewStage::Supervisor.as_int(), 0);
        assert_eq!(ReviewStage::Assignment.as_int(), 1);
        assert_eq!(ReviewStage::Commission.as_int(), 2);
        assert_eq!(ReviewStage::Closed.as_int(), 4);
    }

    #[test]
    fn legacy_closeout_stage_reads_as_closed() {
        assert_eq!(ReviewStage::from_int(3), Some(ReviewStage::Closed));
        assert_eq!(ReviewStage::from_int(4), Some(ReviewStage::Closed));
    }

    #[test]
    fn stage_from_int_rejects_unknown() {
        assert_eq!(ReviewStage::from_int(5), None);
        assert_eq!(ReviewStage::from_int(-1), None);
    }

    #[test]
    fn continuation_roundtrip() {
        for value in 0..=7 {
            let continuation = Continuation::from_int(value).unwrap();
            assert_eq!(continuation.as_int(), value);
        }
        assert_eq!(Continuation::from_int(8), None);
    }

    #[test]
    fn continuation_classification() {
        assert!(Continuation::Go.is_approval());
        assert!(Continuation::GoPostHoc.is_approval());
        assert!(Continuation::NoGo.is_rejection());
        assert!(Continuation::NoGoPostHoc.is_rejection());
        assert!(!Continuation::Revision.is_approval());
        assert!(!Continuation::Revision.is_rejection());
    }

    #[test]
    fn verdict_roundtrip() {
        for verdict in [Verdict::Approved, Verdict::NotApproved, Verdict::NeedsRevision] {
            assert_eq!(Verdict::parse(verdict.as_str()), Some(verdict));
        }
        assert_eq!(Verdict::parse(""), None);
        assert_eq!(Verdict::parse("yes"), None);
    }

    #[test]
    fn escalation_roundtrip() {
        for escalation in [Escalation::LongRoute, Escalation::Metc] {
            assert_eq!(Escalation::parse(escalation.as_str()), Some(escalation));
        }
        assert_eq!(Escalation::parse("short_route"), None);
    }

    #[test]
    fn withdrawn_decision_is_not_pending() {
        let decision = Decision {
            id: 1,
            review_id: 1,
            reviewer: UserId("r".into()),
            verdict: None,
            escalation: None,
            comments: String::new(),
            date_decision: None,
            withdrawn: true,
        };
        assert!(!decision.is_pending());
    }
}
