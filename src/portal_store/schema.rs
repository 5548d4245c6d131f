//! SQLite schema for the portal database: proposals, studies, WMO records,
//! reviews, decisions and the admin lookup tables.

use crate::sqlite_persistence::{ColumnSpec, SchemaVersion, TableSpec};

macro_rules! col {
    ($name:expr, $sql_type:expr) => {
        ColumnSpec {
            name: $name,
            sql_type: $sql_type,
            non_null: false,
        }
    };
    ($name:expr, $sql_type:expr, non_null) => {
        ColumnSpec {
            name: $name,
            sql_type: $sql_type,
            non_null: true,
        }
    };
}

const PROPOSALS_TABLE_V1: TableSpec = TableSpec {
    name: "proposals",
    create_sql: "CREATE TABLE proposals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        reference_number TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        status INTEGER NOT NULL,
        created_by TEXT NOT NULL,
        supervisor TEXT,
        relation_id INTEGER NOT NULL,
        institution_id INTEGER NOT NULL,
        reviewing_chamber TEXT,
        is_pre_assessment INTEGER NOT NULL,
        is_revision INTEGER NOT NULL,
        is_practice INTEGER NOT NULL,
        in_archive INTEGER NOT NULL,
        embargo INTEGER NOT NULL,
        has_minor_revision INTEGER NOT NULL,
        status_review INTEGER,
        parent_id INTEGER,
        date_start_study TEXT,
        knowledge_security TEXT,
        researcher_risk TEXT,
        date_created TEXT NOT NULL,
        date_modified TEXT NOT NULL,
        date_submitted TEXT,
        date_submitted_supervisor TEXT,
        date_reviewed TEXT,
        date_reviewed_supervisor TEXT
    )",
    columns: &[
        col!("id", "INTEGER"),
        col!("reference_number", "TEXT", non_null),
        col!("title", "TEXT", non_null),
        col!("status", "INTEGER", non_null),
        col!("created_by", "TEXT", non_null),
        col!("supervisor", "TEXT"),
        col!("relation_id", "INTEGER", non_null),
        col!("institution_id", "INTEGER", non_null),
        col!("reviewing_chamber", "TEXT"),
        col!("is_pre_assessment", "INTEGER", non_null),
        col!("is_revision", "INTEGER", non_null),
        col!("is_practice", "INTEGER", non_null),
        col!("in_archive", "INTEGER", non_null),
        col!("embargo", "INTEGER", non_null),
        col!("has_minor_revision", "INTEGER", non_null),
        col!("status_review", "INTEGER"),
        col!("parent_id", "INTEGER"),
        col!("date_start_study", "TEXT"),
        col!("knowledge_security", "TEXT"),
        col!("researcher_risk", "TEXT"),
        col!("date_created", "TEXT", non_null),
        col!("date_modified", "TEXT", non_null),
        col!("date_submitted", "TEXT"),
        col!("date_submitted_supervisor", "TEXT"),
        col!("date_reviewed", "TEXT"),
        col!("date_reviewed_supervisor", "TEXT"),
    ],
    indices: &[
        ("idx_proposals_status", "status"),
        ("idx_proposals_parent", "parent_id"),
        ("idx_proposals_created_by", "created_by"),
    ],
};

const PROPOSAL_APPLICANTS_TABLE_V1: TableSpec = TableSpec {
    name: "proposal_applicants",
    create_sql: "CREATE TABLE proposal_applicants (
        proposal_id INTEGER NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
        uid TEXT NOT NULL,
        UNIQUE (proposal_id, uid)
    )",
    columns: &[
        col!("proposal_id", "INTEGER", non_null),
        col!("uid", "TEXT", non_null),
    ],
    indices: &[("idx_proposal_applicants_uid", "uid")],
};

const STUDIES_TABLE_V1: TableSpec = TableSpec {
    name: "studies",
    create_sql: "CREATE TABLE studies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        proposal_id INTEGER NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
        study_order INTEGER NOT NULL,
        has_minors INTEGER NOT NULL,
        legally_incapable INTEGER NOT NULL,
        deception TEXT,
        hierarchy INTEGER NOT NULL,
        has_special_details INTEGER NOT NULL,
        has_traits INTEGER NOT NULL,
        negativity TEXT,
        risk TEXT,
        UNIQUE (proposal_id, study_order)
    )",
    columns: &[
        col!("id", "INTEGER"),
        col!("proposal_id", "INTEGER", non_null),
        col!("study_order", "INTEGER", non_null),
        col!("has_minors", "INTEGER", non_null),
        col!("legally_incapable", "INTEGER", non_null),
        col!("deception", "TEXT"),
        col!("hierarchy", "INTEGER", non_null),
        col!("has_special_details", "INTEGER", non_null),
        col!("has_traits", "INTEGER", non_null),
        col!("negativity", "TEXT"),
        col!("risk", "TEXT"),
    ],
    indices: &[("idx_studies_proposal", "proposal_id")],
};

const WMO_TABLE_V1: TableSpec = TableSpec {
    name: "wmo",
    create_sql: "CREATE TABLE wmo (
        proposal_id INTEGER PRIMARY KEY REFERENCES proposals(id) ON DELETE CASCADE,
        metc TEXT,
        is_medical TEXT,
        metc_decision INTEGER NOT NULL,
        metc_decision_document INTEGER NOT NULL,
        enforced_by_commission INTEGER NOT NULL,
        status INTEGER NOT NULL
    )",
    columns: &[
        col!("proposal_id", "INTEGER"),
        col!("metc", "TEXT"),
        col!("is_medical", "TEXT"),
        col!("metc_decision", "INTEGER", non_null),
        col!("metc_decision_document", "INTEGER", non_null),
        col!("enforced_by_commission", "INTEGER", non_null),
        col!("status", "INTEGER", non_null),
    ],
    indices: &[],
};

const REVIEWS_TABLE_V1: TableSpec = TableSpec {
    name: "reviews",
    create_sql: "CREATE TABLE reviews (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        proposal_id INTEGER NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
        stage INTEGER NOT NULL,
        short_route INTEGER,
        go INTEGER,
        continuation INTEGER,
        is_committee_review INTEGER NOT NULL,
        date_start TEXT NOT NULL,
        date_end TEXT,
        date_should_end TEXT,
        version INTEGER NOT NULL
    )",
    columns: &[
        col!("id", "INTEGER"),
        col!("proposal_id", "INTEGER", non_null),
        col!("stage", "INTEGER", non_null),
        col!("short_route", "INTEGER"),
        col!("go", "INTEGER"),
        col!("continuation", "INTEGER"),
        col!("is_committee_review", "INTEGER", non_null),
        col!("date_start", "TEXT", non_null),
        col!("date_end", "TEXT"),
        col!("date_should_end", "TEXT"),
        col!("version", "INTEGER", non_null),
    ],
    indices: &[
        ("idx_reviews_proposal", "proposal_id"),
        ("idx_reviews_stage", "stage"),
    ],
};

const DECISIONS_TABLE_V1: TableSpec = TableSpec {
    name: "decisions",
    create_sql: "CREATE TABLE decisions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        review_id INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
        reviewer TEXT NOT NULL,
        verdict TEXT,
        escalation TEXT,
        comments TEXT NOT NULL,
        date_decision TEXT,
        withdrawn INTEGER NOT NULL,
        UNIQUE (review_id, reviewer)
    )",
    columns: &[
        col!("id", "INTEGER"),
        col!("review_id", "INTEGER", non_null),
        col!("reviewer", "TEXT", non_null),
        col!("verdict", "TEXT"),
        col!("escalation", "TEXT"),
        col!("comments", "TEXT", non_null),
        col!("date_decision", "TEXT"),
        col!("withdrawn", "INTEGER", non_null),
    ],
    indices: &[
        ("idx_decisions_review", "review_id"),
        ("idx_decisions_reviewer", "reviewer"),
    ],
};

const RELATIONS_TABLE_V1: TableSpec = TableSpec {
    name: "relations",
    create_sql: "CREATE TABLE relations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sort_order INTEGER NOT NULL UNIQUE,
        description TEXT NOT NULL,
        needs_supervisor INTEGER NOT NULL
    )",
    columns: &[
        col!("id", "INTEGER"),
        col!("sort_order", "INTEGER", non_null),
        col!("description", "TEXT", non_null),
        col!("needs_supervisor", "INTEGER", non_null),
    ],
    indices: &[],
};

const INSTITUTIONS_TABLE_V1: TableSpec = TableSpec {
    name: "institutions",
    create_sql: "CREATE TABLE institutions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sort_order INTEGER NOT NULL UNIQUE,
        description TEXT NOT NULL,
        reviewing_chamber TEXT NOT NULL
    )",
    columns: &[
        col!("id", "INTEGER"),
        col!("sort_order", "INTEGER", non_null),
        col!("description", "TEXT", non_null),
        col!("reviewing_chamber", "TEXT", non_null),
    ],
    indices: &[],
};

const LOOKUP_ENTRIES_TABLE_V1: TableSpec = TableSpec {
    name: "lookup_entries",
    create_sql: "CREATE TABLE lookup_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        sort_order INTEGER NOT NULL,
        description TEXT NOT NULL,
        needs_details INTEGER NOT NULL,
        requires_review INTEGER NOT NULL,
        UNIQUE (kind, sort_order)
    )",
    columns: &[
        col!("id", "INTEGER"),
        col!("kind", "TEXT", non_null),
        col!("sort_order", "INTEGER", non_null),
        col!("description", "TEXT", non_null),
        col!("needs_details", "INTEGER", non_null),
        col!("requires_review", "INTEGER", non_null),
    ],
    indices: &[("idx_lookup_entries_kind", "kind")],
};

pub const PORTAL_SCHEMAS: &[SchemaVersion] = &[SchemaVersion {
    version: 1,
    tables: &[
        PROPOSALS_TABLE_V1,
        PROPOSAL_APPLICANTS_TABLE_V1,
        STUDIES_TABLE_V1,
        WMO_TABLE_V1,
        REVIEWS_TABLE_V1,
        DECISIONS_TABLE_V1,
        RELATIONS_TABLE_V1,
        INSTITUTIONS_TABLE_V1,
        LOOKUP_ENTRIES_TABLE_V1,
    ],
    migration: None,
}];
