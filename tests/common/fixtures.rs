//! Test fixture creation: users with session tokens and the lookup tables
//! the routing logic needs.

use super::constants::*;
use anyhow::Result;
use ethica_server::portal_store::{PortalStore, SqlitePortalStore};
use ethica_server::proposals::{Institution, Relation};
use ethica_server::users::{AuthToken, SqliteUserStore, UserGroup, UserStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary user database with the standard test users, each with
/// a pre-provisioned session token. Returns (temp_dir, db_path).
pub fn create_test_user_db() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("user.db");
    let store = SqliteUserStore::new(&db_path)?;

    let users = [
        (APPLICANT_USER, "A. Pplicant", APPLICANT_TOKEN, None),
        (SUPERVISOR_USER, "P. Rof", SUPERVISOR_TOKEN, None),
        (
            SECRETARY_USER,
            "S. Ecretary",
            SECRETARY_TOKEN,
            Some(UserGroup::Secretary),
        ),
        (
            REVIEWER_A_USER,
            "R. A",
            REVIEWER_A_TOKEN,
            Some(UserGroup::LinguisticsChamber),
        ),
        (
            REVIEWER_B_USER,
            "R. B",
            REVIEWER_B_TOKEN,
            Some(UserGroup::LinguisticsChamber),
        ),
    ];

    for (handle, name, token, group) in users {
        let uid = store.create_user(handle, name)?;
        if let Some(group) = group {
            store.add_user_to_group(&uid, group)?;
        }
        let mut auth = AuthToken::generate(uid);
        auth.value = token.to_string();
        store.add_auth_token(auth)?;
    }

    Ok((dir, db_path))
}

/// Creates a temporary portal database seeded with the lookup rows referenced
/// by the test constants. Returns (temp_dir, db_path).
pub fn create_test_portal_db() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("portal.db");
    let store = SqlitePortalStore::new(&db_path)?;

    // Insertion order matters: ids are asserted by the constants.
    let with_supervisor = store.insert_relation(&Relation {
        id: 0,
        order: 1,
        description: "PhD candidate".into(),
        needs_supervisor: true,
    })?;
    assert_eq!(with_supervisor.id, RELATION_WITH_SUPERVISOR_ID);

    let without_supervisor = store.insert_relation(&Relation {
        id: 0,
        order: 2,
        description: "Staff researcher".into(),
        needs_supervisor: false,
    })?;
    assert_eq!(without_supervisor.id, RELATION_WITHOUT_SUPERVISOR_ID);

    let institution = store.insert_institution(&Institution {
        id: 0,
        order: 1,
        description: "Faculty of Humanities".into(),
        reviewing_chamber: "LK".into(),
    })?;
    assert_eq!(institution.id, INSTITUTION_ID);

    store.insert_institution(&Institution {
        id: 0,
        order: 2,
        description: "University Medical Centre".into(),
        reviewing_chamber: "AK".into(),
    })?;

    Ok((dir, db_path))
}
