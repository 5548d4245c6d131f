//! Route classification: decides which review track a submitted proposal
//! follows and which chamber is responsible, from the declared answers alone.
//!
//! Classification is a pure function of already-validated form data; it never
//! consults the database and never fails on well-formed input. The only error
//! is a missing chamber mapping, which is a configuration problem and halts
//! the submission.

use super::error::WorkflowError;
use crate::proposals::{Institution, Proposal, Study, Wmo, YesNoDoubt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Review track for a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// No review at all (practice proposals).
    None,
    /// Expedited route, two-week target.
    Short,
    /// Full committee review, no target date.
    Long,
    /// Preliminary assessment, one-week target.
    PreAssessment,
}

/// Why a proposal was pushed onto the long route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    MinorParticipants,
    LegallyIncapable,
    Deception,
    HierarchicalRelation,
    SpecialPersonalData,
    VulnerableTraits,
    Negativity,
    ParticipantRisk,
    KnowledgeSecurity,
    ResearcherRisk,
    MetcRequired,
}

impl RouteReason {
    pub fn description(self) -> &'static str {
        match self {
            RouteReason::MinorParticipants => "The application involves minors",
            RouteReason::LegallyIncapable => {
                "The application involves legally incapable adults"
            }
            RouteReason::Deception => "The application involves deception",
            RouteReason::HierarchicalRelation => {
                "There is a hierarchical relation between researchers and participants"
            }
            RouteReason::SpecialPersonalData => {
                "The research collects special categories of personal data"
            }
            RouteReason::VulnerableTraits => {
                "Participants are selected on traits implying elevated vulnerability"
            }
            RouteReason::Negativity => {
                "Some questions may provoke negative reactions in participants or researchers"
            }
            RouteReason::ParticipantRisk => {
                "There may be issues around participant safety during or after the research"
            }
            RouteReason::KnowledgeSecurity => "There may be knowledge security issues",
            RouteReason::ResearcherRisk => {
                "There may be issues around the safety of the researchers involved"
            }
            RouteReason::MetcRequired => {
                "The research falls under mandatory medical-ethics (METC) review"
            }
        }
    }
}

/// Mapping from institution to the chamber reviewing for it.
/// Loaded from the institutions lookup table; purely configuration.
#[derive(Debug, Clone, Default)]
pub struct ChamberMap {
    by_institution: HashMap<i64, String>,
}

impl ChamberMap {
    pub fn from_institutions(institutions: &[Institution]) -> Self {
        Self {
            by_institution: institutions
                .iter()
                .map(|i| (i.id, i.reviewing_chamber.clone()))
                .collect(),
        }
    }

    pub fn chamber_for(&self, institution_id: i64) -> Option<&str> {
        self.by_institution.get(&institution_id).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub route: Route,
    /// Whether a full committee assessment is mandatory (long route only; the
    /// short route permits an expedited pass).
    pub needs_committee_review: bool,
    /// Chamber key responsible for this proposal.
    pub chamber: String,
    /// Reasons that forced the long route; empty otherwise.
    pub reasons: Vec<RouteReason>,
}

fn flagged(answer: Option<YesNoDoubt>) -> bool {
    answer.map(YesNoDoubt::is_flagged).unwrap_or(false)
}

/// Collects every regulation-based reason the proposal cannot take the short
/// route. One reason per kind, even if several studies trigger it.
pub fn elevated_risk_reasons(proposal: &Proposal, studies: &[Study], wmo: &Wmo) -> Vec<RouteReason> {
    let mut reasons = Vec::new();
    let mut push = |reason: RouteReason| {
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    };

    for study in studies {
        if study.has_minors {
            push(RouteReason::MinorParticipants);
        }
        if study.legally_incapable {
            push(RouteReason::LegallyIncapable);
        }
        if flagged(study.deception) {
            push(RouteReason::Deception);
        }
        if study.hierarchy {
            push(RouteReason::HierarchicalRelation);
        }
        if study.has_special_details {
            push(RouteReason::SpecialPersonalData);
        }
        if study.has_traits {
            push(RouteReason::VulnerableTraits);
        }
        if flagged(study.negativity) {
            push(RouteReason::Negativity);
        }
        if flagged(study.risk) {
            push(RouteReason::ParticipantRisk);
        }
    }

    if flagged(proposal.knowledge_security) {
        push(RouteReason::KnowledgeSecurity);
    }
    if flagged(proposal.researcher_risk) {
        push(RouteReason::ResearcherRisk);
    }
    if wmo.applies() {
        push(RouteReason::MetcRequired);
    }

    reasons
}

/// Classifies a proposal into its review route and responsible chamber.
///
/// Pre-assessment takes precedence over risk-based branching: a pre-assessment
/// proposal with elevated-risk answers still routes to the preliminary
/// assessment. This is committee policy, not an oversight.
pub fn classify(
    proposal: &Proposal,
    studies: &[Study],
    wmo: &Wmo,
    chambers: &ChamberMap,
) -> Result<RouteDecision, WorkflowError> {
    let chamber = chambers
        .chamber_for(proposal.institution_id)
        .ok_or_else(|| {
            WorkflowError::config(format!(
                "No reviewing chamber configured for institution {}",
                proposal.institution_id
            ))
        })?
        .to_string();

    if proposal.is_practice {
        return Ok(RouteDecision {
            route: Route::None,
            needs_committee_review: false,
            chamber,
            reasons: Vec::new(),
        });
    }

    if proposal.is_pre_assessment {
        return Ok(RouteDecision {
            route: Route::PreAssessment,
            needs_committee_review: false,
            chamber,
            reasons: Vec::new(),
        });
    }

    let reasons = elevated_risk_reasons(proposal, studies, wmo);
    if reasons.is_empty() {
        Ok(RouteDecision {
            route: Route::Short,
            needs_committee_review: false,
            chamber,
            reasons,
        })
    } else {
        Ok(RouteDecision {
            route: Route::Long,
            needs_committee_review: true,
            chamber,
            reasons,
        })
    }
}
