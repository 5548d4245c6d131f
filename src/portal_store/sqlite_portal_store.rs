use super::schema::PORTAL_SCHEMAS;
use super::PortalStore;
use crate::proposals::{
    Institution, LookupEntry, Proposal, ProposalStatus, Relation, Study, Wmo, WmoStatus,
    YesNoDoubt,
};
use crate::reviews::{Continuation, Decision, Escalation, Review, ReviewStage, Verdict};
use crate::sqlite_persistence::open_database;
use crate::users::UserId;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqlitePortalStore {
    conn: Arc<Mutex<Connection>>,
}

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn fmt_dt(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_dt(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, format!("bad timestamp {:?}: {}", s, e)))
}

fn parse_opt_dt(idx: usize, s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_dt(idx, &s)).transpose()
}

fn parse_opt_date(idx: usize, s: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    s.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| conversion_err(idx, format!("bad date {:?}: {}", s, e)))
    })
    .transpose()
}

fn parse_opt_ynd(idx: usize, s: Option<String>) -> rusqlite::Result<Option<YesNoDoubt>> {
    s.map(|s| {
        YesNoDoubt::parse(&s).ok_or_else(|| conversion_err(idx, format!("bad answer code {:?}", s)))
    })
    .transpose()
}

fn row_to_proposal(row: &Row) -> rusqlite::Result<Proposal> {
    let status_raw: i64 = row.get("status")?;
    let status = ProposalStatus::from_int(status_raw)
        .ok_or_else(|| conversion_err(3, format!("unknown proposal status {}", status_raw)))?;

    Ok(Proposal {
        id: row.get("id")?,
        reference_number: row.get("reference_number")?,
        title: row.get("title")?,
        status,
        created_by: UserId(row.get("created_by")?),
        supervisor: row.get::<_, Option<String>>("supervisor")?.map(UserId),
        applicants: Vec::new(),
        relation_id: row.get("relation_id")?,
        institution_id: row.get("institution_id")?,
        reviewing_chamber: row.get("reviewing_chamber")?,
        is_pre_assessment: row.get("is_pre_assessment")?,
        is_revision: row.get("is_revision")?,
        is_practice: row.get("is_practice")?,
        in_archive: row.get("in_archive")?,
        embargo: row.get("embargo")?,
        has_minor_revision: row.get("has_minor_revision")?,
        status_review: row.get("status_review")?,
        parent_id: row.get("parent_id")?,
        date_start_study: parse_opt_date(17, row.get("date_start_study")?)?,
        knowledge_security: parse_opt_ynd(18, row.get("knowledge_security")?)?,
        researcher_risk: parse_opt_ynd(19, row.get("researcher_risk")?)?,
        date_created: parse_dt(20, &row.get::<_, String>("date_created")?)?,
        date_modified: parse_dt(21, &row.get::<_, String>("date_modified")?)?,
        date_submitted: parse_opt_dt(22, row.get("date_submitted")?)?,
        date_submitted_supervisor: parse_opt_dt(23, row.get("date_submitted_supervisor")?)?,
        date_reviewed: parse_opt_dt(24, row.get("date_reviewed")?)?,
        date_reviewed_supervisor: parse_opt_dt(25, row.get("date_reviewed_supervisor")?)?,
    })
}

fn row_to_study(row: &Row) -> rusqlite::Result<Study> {
    Ok(Study {
        id: row.get("id")?,
        proposal_id: row.get("proposal_id")?,
        order: row.get("study_order")?,
        has_minors: row.get("has_minors")?,
        legally_incapable: row.get("legally_incapable")?,
        deception: parse_opt_ynd(5, row.get("deception")?)?,
        hierarchy: row.get("hierarchy")?,
        has_special_details: row.get("has_special_details")?,
        has_traits: row.get("has_traits")?,
        negativity: parse_opt_ynd(9, row.get("negativity")?)?,
        risk: parse_opt_ynd(10, row.get("risk")?)?,
    })
}

fn row_to_review(row: &Row) -> rusqlite::Result<Review> {
    let stage_raw: i64 = row.get("stage")?;
    let stage = ReviewStage::from_int(stage_raw)
        .ok_or_else(|| conversion_err(2, format!("unknown review stage {}", stage_raw)))?;
    let continuation = row
        .get::<_, Option<i64>>("continuation")?
        .map(|raw| {
            Continuation::from_int(raw)
                .ok_or_else(|| conversion_err(5, format!("unknown continuation {}", raw)))
        })
        .transpose()?;

    Ok(Review {
        id: row.get("id")?,
        proposal_id: row.get("proposal_id")?,
        stage,
        short_route: row.get("short_route")?,
        go: row.get("go")?,
        continuation,
        is_committee_review: row.get("is_committee_review")?,
        date_start: parse_dt(7, &row.get::<_, String>("date_start")?)?,
        date_end: parse_opt_dt(8, row.get("date_end")?)?,
        date_should_end: parse_opt_dt(9, row.get("date_should_end")?)?,
        version: row.get("version")?,
    })
}

fn row_to_decision(row: &Row) -> rusqlite::Result<Decision> {
    let verdict = row
        .get::<_, Option<String>>("verdict")?
        .map(|s| {
            Verdict::parse(&s).ok_or_else(|| conversion_err(3, format!("bad verdict code {:?}", s)))
        })
        .transpose()?;
    let escalation = row
        .get::<_, Option<String>>("escalation")?
        .map(|s| {
            Escalation::parse(&s)
                .ok_or_else(|| conversion_err(4, format!("bad escalation code {:?}", s)))
        })
        .transpose()?;

    Ok(Decision {
        id: row.get("id")?,
        review_id: row.get("review_id")?,
        reviewer: UserId(row.get("reviewer")?),
        verdict,
        escalation,
        comments: row.get("comments")?,
        date_decision: parse_opt_dt(6, row.get("date_decision")?)?,
        withdrawn: row.get("withdrawn")?,
    })
}

impl SqlitePortalStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_database(db_path.as_ref(), PORTAL_SCHEMAS, "portal")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn applicants_for(conn: &Connection, proposal_id: i64) -> rusqlite::Result<Vec<UserId>> {
        let mut stmt =
            conn.prepare("SELECT uid FROM proposal_applicants WHERE proposal_id = ?1 ORDER BY uid")?;
        let applicants = stmt
            .query_map(params![proposal_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(UserId)
            .collect();
        Ok(applicants)
    }

    fn write_applicants(
        conn: &Connection,
        proposal_id: i64,
        applicants: &[UserId],
    ) -> rusqlite::Result<()> {
        conn.execute(
            "DELETE FROM proposal_applicants WHERE proposal_id = ?1",
            params![proposal_id],
        )?;
        for uid in applicants {
            conn.execute(
                "INSERT OR IGNORE INTO proposal_applicants (proposal_id, uid) VALUES (?1, ?2)",
                params![proposal_id, uid.as_str()],
            )?;
        }
        Ok(())
    }
}

impl PortalStore for SqlitePortalStore {
    fn create_proposal(&self, proposal: &Proposal) -> Result<Proposal> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO proposals (
                reference_number, title, status, created_by, supervisor,
                relation_id, institution_id, reviewing_chamber,
                is_pre_assessment, is_revision, is_practice, in_archive,
                embargo, has_minor_revision, status_review, parent_id,
                date_start_study, knowledge_security, researcher_risk,
                date_created, date_modified, date_submitted,
                date_submitted_supervisor, date_reviewed, date_reviewed_supervisor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
            params![
                proposal.reference_number,
                proposal.title,
                proposal.status.as_int(),
                proposal.created_by.as_str(),
                proposal.supervisor.as_ref().map(|u| u.as_str().to_string()),
                proposal.relation_id,
                proposal.institution_id,
                proposal.reviewing_chamber,
                proposal.is_pre_assessment,
                proposal.is_revision,
                proposal.is_practice,
                proposal.in_archive,
                proposal.embargo,
                proposal.has_minor_revision,
                proposal.status_review,
                proposal.parent_id,
                proposal
                    .date_start_study
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                proposal.knowledge_security.map(|v| v.as_str()),
                proposal.researcher_risk.map(|v| v.as_str()),
                fmt_dt(&proposal.date_created),
                fmt_dt(&proposal.date_modified),
                proposal.date_submitted.as_ref().map(fmt_dt),
                proposal.date_submitted_supervisor.as_ref().map(fmt_dt),
                proposal.date_reviewed.as_ref().map(fmt_dt),
                proposal.date_reviewed_supervisor.as_ref().map(fmt_dt),
            ],
        )
        .with_context(|| {
            format!(
                "Failed to create proposal {}",
                proposal.reference_number
            )
        })?;
        let id = conn.last_insert_rowid();
        Self::write_applicants(&conn, id, &proposal.applicants)?;

        let mut created = proposal.clone();
        created.id = id;
        Ok(created)
    }

    fn get_proposal(&self, id: i64) -> Result<Option<Proposal>> {
        let conn = self.conn.lock().unwrap();
        let proposal = conn
            .query_row(
                "SELECT * FROM proposals WHERE id = ?1",
                params![id],
                row_to_proposal,
            )
            .optional()?;
        match proposal {
            Some(mut p) => {
                p.applicants = Self::applicants_for(&conn, p.id)?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    fn update_proposal(&self, proposal: &Proposal) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE proposals SET
                title = ?2, status = ?3, supervisor = ?4, relation_id = ?5,
                institution_id = ?6, reviewing_chamber = ?7,
                is_pre_assessment = ?8, is_revision = ?9, is_practice = ?10,
                in_archive = ?11, embargo = ?12, has_minor_revision = ?13,
                status_review = ?14, parent_id = ?15, date_start_study = ?16,
                knowledge_security = ?17, researcher_risk = ?18,
                date_modified = ?19, date_submitted = ?20,
                date_submitted_supervisor = ?21, date_reviewed = ?22,
                date_reviewed_supervisor = ?23
             WHERE id = ?1",
            params![
                proposal.id,
                proposal.title,
                proposal.status.as_int(),
                proposal.supervisor.as_ref().map(|u| u.as_str().to_string()),
                proposal.relation_id,
                proposal.institution_id,
                proposal.reviewing_chamber,
                proposal.is_pre_assessment,
                proposal.is_revision,
                proposal.is_practice,
                proposal.in_archive,
                proposal.embargo,
                proposal.has_minor_revision,
                proposal.status_review,
                proposal.parent_id,
                proposal
                    .date_start_study
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                proposal.knowledge_security.map(|v| v.as_str()),
                proposal.researcher_risk.map(|v| v.as_str()),
                fmt_dt(&Utc::now()),
                proposal.date_submitted.as_ref().map(fmt_dt),
                proposal.date_submitted_supervisor.as_ref().map(fmt_dt),
                proposal.date_reviewed.as_ref().map(fmt_dt),
                proposal.date_reviewed_supervisor.as_ref().map(fmt_dt),
            ],
        )?;
        anyhow::ensure!(updated == 1, "Proposal {} not found", proposal.id);
        Self::write_applicants(&conn, proposal.id, &proposal.applicants)?;
        Ok(())
    }

    fn all_reference_numbers(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT reference_number FROM proposals")?;
        let refs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(refs)
    }

    fn proposals_with_parent(&self, parent_id: i64) -> Result<Vec<Proposal>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM proposals WHERE parent_id = ?1 ORDER BY id")?;
        let mut proposals = stmt
            .query_map(params![parent_id], row_to_proposal)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for p in &mut proposals {
            p.applicants = Self::applicants_for(&conn, p.id)?;
        }
        Ok(proposals)
    }

    fn proposals_created_by(&self, uid: &UserId) -> Result<Vec<Proposal>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM proposals WHERE created_by = ?1 ORDER BY id")?;
        let mut proposals = stmt
            .query_map(params![uid.as_str()], row_to_proposal)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for p in &mut proposals {
            p.applicants = Self::applicants_for(&conn, p.id)?;
        }
        Ok(proposals)
    }

    fn add_study(&self, study: &Study) -> Result<Study> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO studies (
                proposal_id, study_order, has_minors, legally_incapable,
                deception, hierarchy, has_special_details, has_traits,
                negativity, risk
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                study.proposal_id,
                study.order,
                study.has_minors,
                study.legally_incapable,
                study.deception.map(|v| v.as_str()),
                study.hierarchy,
                study.has_special_details,
                study.has_traits,
                study.negativity.map(|v| v.as_str()),
                study.risk.map(|v| v.as_str()),
            ],
        )?;
        let mut created = study.clone();
        created.id = conn.last_insert_rowid();
        Ok(created)
    }

    fn studies_for(&self, proposal_id: i64) -> Result<Vec<Study>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM studies WHERE proposal_id = ?1 ORDER BY study_order")?;
        let studies = stmt
            .query_map(params![proposal_id], row_to_study)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(studies)
    }

    fn upsert_wmo(&self, wmo: &Wmo) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO wmo (
                proposal_id, metc, is_medical, metc_decision,
                metc_decision_document, enforced_by_commission, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(proposal_id) DO UPDATE SET
                metc = excluded.metc,
                is_medical = excluded.is_medical,
                metc_decision = excluded.metc_decision,
                metc_decision_document = excluded.metc_decision_document,
                enforced_by_commission = excluded.enforced_by_commission,
                status = excluded.status",
            params![
                wmo.proposal_id,
                wmo.metc.map(|v| v.as_str()),
                wmo.is_medical.map(|v| v.as_str()),
                wmo.metc_decision,
                wmo.metc_decision_document,
                wmo.enforced_by_commission,
                wmo.status.as_int(),
            ],
        )?;
        Ok(())
    }

    fn wmo_for(&self, proposal_id: i64) -> Result<Option<Wmo>> {
        let conn = self.conn.lock().unwrap();
        let wmo = conn
            .query_row(
                "SELECT * FROM wmo WHERE proposal_id = ?1",
                params![proposal_id],
                |row| {
                    let status_raw: i64 = row.get("status")?;
                    let status = WmoStatus::from_int(status_raw).ok_or_else(|| {
                        conversion_err(6, format!("unknown wmo status {}", status_raw))
                    })?;
                    Ok(Wmo {
                        proposal_id: row.get("proposal_id")?,
                        metc: parse_opt_ynd(1, row.get("metc")?)?,
                        is_medical: parse_opt_ynd(2, row.get("is_medical")?)?,
                        metc_decision: row.get("metc_decision")?,
                        metc_decision_document: row.get("metc_decision_document")?,
                        enforced_by_commission: row.get("enforced_by_commission")?,
                        status,
                    })
                },
            )
            .optional()?;
        Ok(wmo)
    }

    fn create_review(&self, review: &Review) -> Result<Review> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO reviews (
                proposal_id, stage, short_route, go, continuation,
                is_committee_review, date_start, date_end, date_should_end, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
            params![
                review.proposal_id,
                review.stage.as_int(),
                review.short_route,
                review.go,
                review.continuation.map(|c| c.as_int()),
                review.is_committee_review,
                fmt_dt(&review.date_start),
                review.date_end.as_ref().map(fmt_dt),
                review.date_should_end.as_ref().map(fmt_dt),
            ],
        )?;
        let mut created = review.clone();
        created.id = conn.last_insert_rowid();
        created.version = 0;
        Ok(created)
    }

    fn get_review(&self, id: i64) -> Result<Option<Review>> {
        let conn = self.conn.lock().unwrap();
        let review = conn
            .query_row(
                "SELECT * FROM reviews WHERE id = ?1",
                params![id],
                row_to_review,
            )
            .optional()?;
        Ok(review)
    }

    fn reviews_for_proposal(&self, proposal_id: i64) -> Result<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM reviews WHERE proposal_id = ?1 ORDER BY id")?;
        let reviews = stmt
            .query_map(params![proposal_id], row_to_review)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reviews)
    }

    fn active_review_for(&self, proposal_id: i64, is_committee: bool) -> Result<Option<Review>> {
        let conn = self.conn.lock().unwrap();
        let review = conn
            .query_row(
                "SELECT * FROM reviews
                 WHERE proposal_id = ?1 AND is_committee_review = ?2 AND stage != 4
                 ORDER BY id DESC LIMIT 1",
                params![proposal_id, is_committee],
                row_to_review,
            )
            .optional()?;
        Ok(review)
    }

    fn update_review_cas(&self, review: &Review, expected_version: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE reviews SET
                stage = ?2, short_route = ?3, go = ?4, continuation = ?5,
                date_end = ?6, date_should_end = ?7, version = version + 1
             WHERE id = ?1 AND version = ?8",
            params![
                review.id,
                review.stage.as_int(),
                review.short_route,
                review.go,
                review.continuation.map(|c| c.as_int()),
                review.date_end.as_ref().map(fmt_dt),
                review.date_should_end.as_ref().map(fmt_dt),
                expected_version,
            ],
        )?;
        Ok(updated == 1)
    }

    fn short_route_reviews_due_before(&self, deadline: DateTime<Utc>) -> Result<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM reviews
             WHERE is_committee_review = 1 AND stage = 2 AND short_route = 1
               AND date_should_end IS NOT NULL AND date_should_end <= ?1",
        )?;
        let reviews = stmt
            .query_map(params![fmt_dt(&deadline)], row_to_review)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reviews)
    }

    fn supervisor_reviews_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM reviews
             WHERE is_committee_review = 0 AND stage = 0 AND date_end IS NULL
               AND date_should_end IS NOT NULL AND date_should_end <= ?1",
        )?;
        let reviews = stmt
            .query_map(params![fmt_dt(&now)], row_to_review)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reviews)
    }

    fn create_decision(&self, review_id: i64, reviewer: &UserId) -> Result<Decision> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO decisions (review_id, reviewer, comments, withdrawn)
             VALUES (?1, ?2, '', 0)",
            params![review_id, reviewer.as_str()],
        )
        .with_context(|| {
            format!(
                "Failed to assign reviewer {} to review {}",
                reviewer, review_id
            )
        })?;
        Ok(Decision {
            id: conn.last_insert_rowid(),
            review_id,
            reviewer: reviewer.clone(),
            verdict: None,
            escalation: None,
            comments: String::new(),
            date_decision: None,
            withdrawn: false,
        })
    }

    fn get_decision(&self, id: i64) -> Result<Option<Decision>> {
        let conn = self.conn.lock().unwrap();
        let decision = conn
            .query_row(
                "SELECT * FROM decisions WHERE id = ?1",
                params![id],
                row_to_decision,
            )
            .optional()?;
        Ok(decision)
    }

    fn decision_for(&self, review_id: i64, reviewer: &UserId) -> Result<Option<Decision>> {
        let conn = self.conn.lock().unwrap();
        let decision = conn
            .query_row(
                "SELECT * FROM decisions WHERE review_id = ?1 AND reviewer = ?2",
                params![review_id, reviewer.as_str()],
                row_to_decision,
            )
            .optional()?;
        Ok(decision)
    }

    fn decisions_for_review(&self, review_id: i64) -> Result<Vec<Decision>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM decisions WHERE review_id = ?1 ORDER BY id")?;
        let decisions = stmt
            .query_map(params![review_id], row_to_decision)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(decisions)
    }

    fn update_decision(&self, decision: &Decision) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE decisions SET
                verdict = ?2, escalation = ?3, comments = ?4,
                date_decision = ?5, withdrawn = ?6
             WHERE id = ?1",
            params![
                decision.id,
                decision.verdict.map(|v| v.as_str()),
                decision.escalation.map(|e| e.as_str()),
                decision.comments,
                decision.date_decision.as_ref().map(fmt_dt),
                decision.withdrawn,
            ],
        )?;
        anyhow::ensure!(updated == 1, "Decision {} not found", decision.id);
        Ok(())
    }

    fn pending_decisions_for(&self, reviewer: &UserId) -> Result<Vec<Decision>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT d.* FROM decisions d
             JOIN reviews r ON r.id = d.review_id
             WHERE d.reviewer = ?1 AND d.verdict IS NULL AND d.withdrawn = 0
               AND r.stage != 4
             ORDER BY d.id",
        )?;
        let decisions = stmt
            .query_map(params![reviewer.as_str()], row_to_decision)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(decisions)
    }

    fn insert_relation(&self, relation: &Relation) -> Result<Relation> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO relations (sort_order, description, needs_supervisor)
             VALUES (?1, ?2, ?3)",
            params![
                relation.order,
                relation.description,
                relation.needs_supervisor
            ],
        )?;
        let mut created = relation.clone();
        created.id = conn.last_insert_rowid();
        Ok(created)
    }

    fn relations(&self) -> Result<Vec<Relation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM relations ORDER BY sort_order")?;
        let relations = stmt
            .query_map([], |row| {
                Ok(Relation {
                    id: row.get("id")?,
                    order: row.get("sort_order")?,
                    description: row.get("description")?,
                    needs_supervisor: row.get("needs_supervisor")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(relations)
    }

    fn get_relation(&self, id: i64) -> Result<Option<Relation>> {
        let conn = self.conn.lock().unwrap();
        let relation = conn
            .query_row(
                "SELECT * FROM relations WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Relation {
                        id: row.get("id")?,
                        order: row.get("sort_order")?,
                        description: row.get("description")?,
                        needs_supervisor: row.get("needs_supervisor")?,
                    })
                },
            )
            .optional()?;
        Ok(relation)
    }

    fn insert_institution(&self, institution: &Institution) -> Result<Institution> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO institutions (sort_order, description, reviewing_chamber)
             VALUES (?1, ?2, ?3)",
            params![
                institution.order,
                institution.description,
                institution.reviewing_chamber
            ],
        )?;
        let mut created = institution.clone();
        created.id = conn.last_insert_rowid();
        Ok(created)
    }

    fn institutions(&self) -> Result<Vec<Institution>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM institutions ORDER BY sort_order")?;
        let institutions = stmt
            .query_map([], |row| {
                Ok(Institution {
                    id: row.get("id")?,
                    order: row.get("sort_order")?,
                    description: row.get("description")?,
                    reviewing_chamber: row.get("reviewing_chamber")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(institutions)
    }

    fn insert_lookup_entry(&self, kind: &str, entry: &LookupEntry) -> Result<LookupEntry> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO lookup_entries (kind, sort_order, description, needs_details, requires_review)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                kind,
                entry.order,
                entry.description,
                entry.needs_details,
                entry.requires_review
            ],
        )?;
        let mut created = entry.clone();
        created.id = conn.last_insert_rowid();
        Ok(created)
    }

    fn lookup_entries(&self, kind: &str) -> Result<Vec<LookupEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT * FROM lookup_entries WHERE kind = ?1 ORDER BY sort_order")?;
        let entries = stmt
            .query_map(params![kind], |row| {
                Ok(LookupEntry {
                    id: row.get("id")?,
                    order: row.get("sort_order")?,
                    description: row.get("description")?,
                    needs_details: row.get("needs_details")?,
                    requires_review: row.get("requires_review")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
