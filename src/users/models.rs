use serde::{Deserialize, Serialize};

/// Opaque user identifier handed out by the directory.
///
/// The workflow core never inspects it; everything user-related beyond this id
/// (names, mail addresses, credentials) lives in the external directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    SubmitProposals,
    DecideAssigned,
    AssignReviewers,
    CloseReviews,
    ManageLookups,
}

const SECRETARY_PERMISSIONS: &[Permission] = &[
    Permission::SubmitProposals,
    Permission::DecideAssigned,
    Permission::AssignReviewers,
    Permission::CloseReviews,
    Permission::ManageLookups,
];
const CHAIR_PERMISSIONS: &[Permission] = &[
    Permission::SubmitProposals,
    Permission::DecideAssigned,
    Permission::CloseReviews,
];
const CHAMBER_PERMISSIONS: &[Permission] =
    &[Permission::SubmitProposals, Permission::DecideAssigned];
const APPLICANT_PERMISSIONS: &[Permission] =
    &[Permission::SubmitProposals, Permission::DecideAssigned];

/// Directory groups recognized by the portal.
///
/// Membership is administered in the external directory; the stand-in store
/// keeps a plain membership table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserGroup {
    Secretary,
    Chair,
    LinguisticsChamber,
    GeneralChamber,
    Applicant,
}

impl UserGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            UserGroup::Secretary => "secretary",
            UserGroup::Chair => "chair",
            UserGroup::LinguisticsChamber => "chamber-linguistics",
            UserGroup::GeneralChamber => "chamber-general",
            UserGroup::Applicant => "applicant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "secretary" => Some(UserGroup::Secretary),
            "chair" => Some(UserGroup::Chair),
            "chamber-linguistics" => Some(UserGroup::LinguisticsChamber),
            "chamber-general" => Some(UserGroup::GeneralChamber),
            "applicant" => Some(UserGroup::Applicant),
            _ => None,
        }
    }

    pub fn permissions(self) -> &'static [Permission] {
        match self {
            UserGroup::Secretary => SECRETARY_PERMISSIONS,
            UserGroup::Chair => CHAIR_PERMISSIONS,
            UserGroup::LinguisticsChamber | UserGroup::GeneralChamber => CHAMBER_PERMISSIONS,
            UserGroup::Applicant => APPLICANT_PERMISSIONS,
        }
    }

    /// The chamber group reviewing for the given chamber key, if any.
    pub fn for_chamber(key: &str) -> Option<Self> {
        match key {
            "LK" => Some(UserGroup::LinguisticsChamber),
            "AK" => Some(UserGroup::GeneralChamber),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub uid: UserId,
    pub handle: String,
    pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct AuthToken {
    pub value: String,
    pub uid: UserId,
    pub created: i64,
    pub last_used: Option<i64>,
}

impl AuthToken {
    pub fn generate(uid: UserId) -> Self {
        Self {
            value: uuid::Uuid::new_v4().to_string(),
            uid,
            created: chrono::Utc::now().timestamp(),
            last_used: None,
        }
    }
}
