use crate::users::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Top-level status of a proposal.
///
/// The integer codes are the ones persisted by the portal since its first
/// deployment, which is why they jump from 1 to 40: codes 2 through 34 were
/// data-entry progress markers in a retired version of the schema and must not
/// be reused. Treat these as legacy identifiers, never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Editable by the applicants.
    Draft,
    /// Waiting for the supervisor's sign-off.
    SubmittedToSupervisor,
    /// Submitted to the committee (reviewer assignment or assessment running).
    Submitted,
    /// The committee reached a decision.
    DecisionMade,
    /// Judged externally by a medical-ethics committee.
    MetcDecisionMade,
}

impl ProposalStatus {
    pub fn as_int(self) -> i64 {
        match self {
            ProposalStatus::Draft => 1,
            ProposalStatus::SubmittedToSupervisor => 40,
            ProposalStatus::Submitted => 50,
            ProposalStatus::DecisionMade => 55,
            ProposalStatus::MetcDecisionMade => 60,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            1 => Some(ProposalStatus::Draft),
            40 => Some(ProposalStatus::SubmittedToSupervisor),
            50 => Some(ProposalStatus::Submitted),
            55 => Some(ProposalStatus::DecisionMade),
            60 => Some(ProposalStatus::MetcDecisionMade),
            _ => None,
        }
    }

    /// Whether the applicants may still edit the proposal.
    pub fn is_editable(self) -> bool {
        matches!(self, ProposalStatus::Draft)
    }
}

/// Three-valued answer used throughout the application forms.
/// Persisted as the one-character codes of the original paper forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YesNoDoubt {
    Yes,
    No,
    Doubt,
}

impl YesNoDoubt {
    pub fn as_str(self) -> &'static str {
        match self {
            YesNoDoubt::Yes => "Y",
            YesNoDoubt::No => "N",
            YesNoDoubt::Doubt => "?",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Y" => Some(YesNoDoubt::Yes),
            "N" => Some(YesNoDoubt::No),
            "?" => Some(YesNoDoubt::Doubt),
            _ => None,
        }
    }

    /// Yes and doubt both count as a flag for review-routing purposes.
    pub fn is_flagged(self) -> bool {
        matches!(self, YesNoDoubt::Yes | YesNoDoubt::Doubt)
    }
}

/// Status of the external medical-ethics (METC) track of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WmoStatus {
    NoWmo,
    Waiting,
    Judged,
}

impl WmoStatus {
    pub fn as_int(self) -> i64 {
        match self {
            WmoStatus::NoWmo => 0,
            WmoStatus::Waiting => 1,
            WmoStatus::Judged => 2,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(WmoStatus::NoWmo),
            1 => Some(WmoStatus::Waiting),
            2 => Some(WmoStatus::Judged),
            _ => None,
        }
    }
}

/// The METC sub-record of a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wmo {
    pub proposal_id: i64,
    /// Does data collection happen at an institution that mandates METC review?
    pub metc: Option<YesNoDoubt>,
    /// Is the research question medical-scientific in nature?
    pub is_medical: Option<YesNoDoubt>,
    /// Has the METC reached a decision?
    pub metc_decision: bool,
    /// Was the METC decision document supplied?
    pub metc_decision_document: bool,
    /// Set when a review closes with an METC referral.
    pub enforced_by_commission: bool,
    pub status: WmoStatus,
}

impl Wmo {
    pub fn new(proposal_id: i64) -> Self {
        Self {
            proposal_id,
            metc: None,
            is_medical: None,
            metc_decision: false,
            metc_decision_document: false,
            enforced_by_commission: false,
            status: WmoStatus::NoWmo,
        }
    }

    /// Whether the METC track applies at all.
    pub fn applies(&self) -> bool {
        self.metc.map(YesNoDoubt::is_flagged).unwrap_or(false)
            || self.is_medical == Some(YesNoDoubt::Yes)
            || self.enforced_by_commission
    }

    /// Recomputes the derived status from the declared answers.
    pub fn update_status(&mut self) {
        self.status = if self.applies() {
            if self.metc_decision && self.metc_decision_document {
                WmoStatus::Judged
            } else {
                WmoStatus::Waiting
            }
        } else {
            WmoStatus::NoWmo
        };
    }
}

/// One participant group / protocol described by a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    pub id: i64,
    pub proposal_id: i64,
    pub order: i64,
    /// Participants include minors.
    pub has_minors: bool,
    /// Participants include legally incapable adults.
    pub legally_incapable: bool,
    pub deception: Option<YesNoDoubt>,
    /// Hierarchical relation between researchers and participants.
    pub hierarchy: bool,
    /// Special categories of personal data are collected.
    pub has_special_details: bool,
    /// Participants are selected on traits implying elevated vulnerability.
    pub has_traits: bool,
    /// Some questions may provoke negative reactions.
    pub negativity: Option<YesNoDoubt>,
    /// Physical or psychological safety risk beyond everyday life.
    pub risk: Option<YesNoDoubt>,
}

impl Study {
    pub fn new(proposal_id: i64, order: i64) -> Self {
        Self {
            id: 0,
            proposal_id,
            order,
            has_minors: false,
            legally_incapable: false,
            deception: None,
            hierarchy: false,
            has_special_details: false,
            has_traits: false,
            negativity: None,
            risk: None,
        }
    }
}

/// A research-ethics application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: i64,
    pub reference_number: String,
    pub title: String,
    pub status: ProposalStatus,

    pub created_by: UserId,
    pub supervisor: Option<UserId>,
    pub applicants: Vec<UserId>,

    /// Relation of the applicant to the institution (lookup row id); decides
    /// whether supervisor sign-off is required.
    pub relation_id: i64,
    /// Institution hosting the research (lookup row id); decides the chamber.
    pub institution_id: i64,
    /// Chamber key recorded at submission time.
    pub reviewing_chamber: Option<String>,

    pub is_pre_assessment: bool,
    pub is_revision: bool,
    /// Practice proposals are course material and never enter review.
    pub is_practice: bool,
    pub in_archive: bool,
    pub embargo: bool,
    pub has_minor_revision: bool,
    /// Final verdict once a decision was made: Some(true) approved,
    /// Some(false) rejected.
    pub status_review: Option<bool>,
    /// Weak back-reference to the proposal this one revises or copies.
    pub parent_id: Option<i64>,

    /// Declared start date of the study itself; a start before submission
    /// makes any decision post-hoc.
    pub date_start_study: Option<NaiveDate>,
    pub knowledge_security: Option<YesNoDoubt>,
    pub researcher_risk: Option<YesNoDoubt>,

    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub date_submitted: Option<DateTime<Utc>>,
    pub date_submitted_supervisor: Option<DateTime<Utc>>,
    pub date_reviewed: Option<DateTime<Utc>>,
    pub date_reviewed_supervisor: Option<DateTime<Utc>>,
}

impl Proposal {
    /// Whether a decision on this proposal would be post-hoc: the declared
    /// study start lies before the submission date.
    pub fn is_post_hoc(&self) -> bool {
        match (self.date_start_study, self.date_submitted) {
            (Some(start), Some(submitted)) => start < submitted.date_naive(),
            _ => false,
        }
    }
}
