use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::session::Session;
use super::{log_requests, state::*, ServerConfig};
use crate::proposals::{Proposal, Study, Wmo, YesNoDoubt};
use crate::reviews::{
    Decision, Escalation, Review, Verdict, WorkflowError, WorkflowOrchestrator,
};
use crate::users::{Permission, UserDirectory, UserId, UserStore};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn error_body(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message.into() }))
}

fn workflow_error_response(err: WorkflowError) -> Response {
    match err {
        WorkflowError::PolicyViolation(msg) => {
            (StatusCode::CONFLICT, error_body(msg)).into_response()
        }
        WorkflowError::ConfigurationError(msg) => {
            (StatusCode::UNPROCESSABLE_ENTITY, error_body(msg)).into_response()
        }
        WorkflowError::ConcurrencyConflict { review_id } => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_body(format!(
                "review {} was modified concurrently; please retry",
                review_id
            )),
        )
            .into_response(),
        WorkflowError::NotFound { kind, id } => (
            StatusCode::NOT_FOUND,
            error_body(format!("{} {} not found", kind, id)),
        )
            .into_response(),
        WorkflowError::Storage(err) => {
            error!("storage error: {:?}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn internal_error(err: anyhow::Error) -> Response {
    error!("internal error: {:?}", err);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Whether the session user may see the proposal at all.
fn can_view(session: &Session, proposal: &Proposal) -> bool {
    session.is_secretary()
        || proposal.created_by == session.uid
        || proposal.supervisor.as_ref() == Some(&session.uid)
        || proposal.applicants.contains(&session.uid)
}

/// Whether the session user may edit the proposal's content.
fn can_edit(session: &Session, proposal: &Proposal) -> bool {
    proposal.created_by == session.uid || proposal.applicants.contains(&session.uid)
}

fn resolve_handles(
    user_store: &Arc<dyn UserStore>,
    handles: &[String],
) -> Result<Result<Vec<UserId>, String>> {
    let mut uids = Vec::with_capacity(handles.len());
    for handle in handles {
        match user_store.resolve_handle(handle)? {
            Some(uid) => uids.push(uid),
            None => return Ok(Err(format!("unknown user handle {:?}", handle))),
        }
    }
    Ok(Ok(uids))
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
struct CreateProposalBody {
    pub title: String,
    #[serde(default)]
    pub supervisor_handle: Option<String>,
    #[serde(default)]
    pub applicant_handles: Vec<String>,
    pub relation_id: i64,
    pub institution_id: i64,
    #[serde(default)]
    pub is_pre_assessment: bool,
    #[serde(default)]
    pub is_practice: bool,
    #[serde(default)]
    pub date_start_study: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub knowledge_security: Option<YesNoDoubt>,
    #[serde(default)]
    pub researcher_risk: Option<YesNoDoubt>,
}

async fn create_proposal(
    session: Session,
    State(workflow): State<GuardedWorkflow>,
    State(user_store): State<GuardedUserStore>,
    Json(body): Json<CreateProposalBody>,
) -> Response {
    let supervisor = match &body.supervisor_handle {
        Some(handle) => match user_store.resolve_handle(handle) {
            Ok(Some(uid)) => Some(uid),
            Ok(None) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    error_body(format!("unknown supervisor handle {:?}", handle)),
                )
                    .into_response()
            }
            Err(err) => return internal_error(err),
        },
        None => None,
    };
    let applicants = match resolve_handles(&user_store, &body.applicant_handles) {
        Ok(Ok(uids)) => uids,
        Ok(Err(msg)) => {
            return (StatusCode::UNPROCESSABLE_ENTITY, error_body(msg)).into_response()
        }
        Err(err) => return internal_error(err),
    };

    let draft = crate::reviews::ProposalDraft {
        title: body.title,
        created_by: session.uid,
        supervisor,
        applicants,
        relation_id: body.relation_id,
        institution_id: body.institution_id,
        is_pre_assessment: body.is_pre_assessment,
        is_practice: body.is_practice,
        date_start_study: body.date_start_study,
        knowledge_security: body.knowledge_security,
        researcher_risk: body.researcher_risk,
    };
    match workflow.create_draft(draft) {
        Ok(proposal) => (StatusCode::CREATED, Json(proposal)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

#[derive(Serialize)]
struct ProposalDetail {
    proposal: Proposal,
    studies: Vec<Study>,
    wmo: Option<Wmo>,
    reviews: Vec<Review>,
}

async fn get_proposal(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Response {
    let proposal = match state.portal_store.get_proposal(id) {
        Ok(Some(p)) => p,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return internal_error(err),
    };
    if !can_view(&session, &proposal) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let studies = match state.portal_store.studies_for(id) {
        Ok(studies) => studies,
        Err(err) => return internal_error(err),
    };
    let wmo = match state.portal_store.wmo_for(id) {
        Ok(wmo) => wmo,
        Err(err) => return internal_error(err),
    };
    let reviews = match state.portal_store.reviews_for_proposal(id) {
        Ok(reviews) => reviews,
        Err(err) => return internal_error(err),
    };
    Json(ProposalDetail {
        proposal,
        studies,
        wmo,
        reviews,
    })
    .into_response()
}

async fn get_my_proposals(
    session: Session,
    State(portal_store): State<GuardedPortalStore>,
) -> Response {
    match portal_store.proposals_created_by(&session.uid) {
        Ok(proposals) => Json(proposals).into_response(),
        Err(err) => internal_error(err),
    }
}

#[derive(Deserialize, Debug)]
struct AddStudyBody {
    #[serde(default)]
    pub has_minors: bool,
    #[serde(default)]
    pub legally_incapable: bool,
    #[serde(default)]
    pub deception: Option<YesNoDoubt>,
    #[serde(default)]
    pub hierarchy: bool,
    #[serde(default)]
    pub has_special_details: bool,
    #[serde(default)]
    pub has_traits: bool,
    #[serde(default)]
    pub negativity: Option<YesNoDoubt>,
    #[serde(default)]
    pub risk: Option<YesNoDoubt>,
}

async fn add_study(
    session: Session,
    State(portal_store): State<GuardedPortalStore>,
    Path(id): Path<i64>,
    Json(body): Json<AddStudyBody>,
) -> Response {
    let proposal = match portal_store.get_proposal(id) {
        Ok(Some(p)) => p,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return internal_error(err),
    };
    if !can_edit(&session, &proposal) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if !proposal.status.is_editable() {
        return (
            StatusCode::CONFLICT,
            error_body("proposal is no longer editable"),
        )
            .into_response();
    }

    let order = match portal_store.studies_for(id) {
        Ok(studies) => studies.len() as i64 + 1,
        Err(err) => return internal_error(err),
    };
    let mut study = Study::new(id, order);
    study.has_minors = body.has_minors;
    study.legally_incapable = body.legally_incapable;
    study.deception = body.deception;
    study.hierarchy = body.hierarchy;
    study.has_special_details = body.has_special_details;
    study.has_traits = body.has_traits;
    study.negativity = body.negativity;
    study.risk = body.risk;

    match portal_store.add_study(&study) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => internal_error(err),
    }
}

#[derive(Deserialize, Debug)]
struct WmoBody {
    #[serde(default)]
    pub metc: Option<YesNoDoubt>,
    #[serde(default)]
    pub is_medical: Option<YesNoDoubt>,
    #[serde(default)]
    pub metc_decision: bool,
    #[serde(default)]
    pub metc_decision_document: bool,
}

async fn put_wmo(
    session: Session,
    State(portal_store): State<GuardedPortalStore>,
    Path(id): Path<i64>,
    Json(body): Json<WmoBody>,
) -> Response {
    let proposal = match portal_store.get_proposal(id) {
        Ok(Some(p)) => p,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return internal_error(err),
    };
    if !can_edit(&session, &proposal) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if !proposal.status.is_editable() {
        return (
            StatusCode::CONFLICT,
            error_body("proposal is no longer editable"),
        )
            .into_response();
    }

    let mut wmo = match portal_store.wmo_for(id) {
        Ok(Some(wmo)) => wmo,
        Ok(None) => Wmo::new(id),
        Err(err) => return internal_error(err),
    };
    wmo.metc = body.metc;
    wmo.is_medical = body.is_medical;
    wmo.metc_decision = body.metc_decision;
    wmo.metc_decision_document = body.metc_decision_document;
    wmo.update_status();

    match portal_store.upsert_wmo(&wmo) {
        Ok(()) => Json(wmo).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn submit_proposal(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Response {
    let proposal = match state.portal_store.get_proposal(id) {
        Ok(Some(p)) => p,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return internal_error(err),
    };
    if !can_edit(&session, &proposal) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match state.workflow.submit_proposal(id) {
        Ok(review) => Json(review).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

async fn revise_proposal(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Response {
    let parent = match state.portal_store.get_proposal(id) {
        Ok(Some(p)) => p,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return internal_error(err),
    };
    if !can_view(&session, &parent) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match state.workflow.create_revision(id, &session.uid) {
        Ok(revision) => (StatusCode::CREATED, Json(revision)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ReviewDetail {
    review: Review,
    decisions: Vec<Decision>,
}

async fn get_review(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Response {
    let review = match state.portal_store.get_review(id) {
        Ok(Some(r)) => r,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return internal_error(err),
    };
    let decisions = match state.portal_store.decisions_for_review(id) {
        Ok(decisions) => decisions,
        Err(err) => return internal_error(err),
    };
    let is_reviewer = decisions.iter().any(|d| d.reviewer == session.uid);
    if !session.is_secretary() && !is_reviewer {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(ReviewDetail { review, decisions }).into_response()
}

async fn get_my_open_decisions(
    session: Session,
    State(portal_store): State<GuardedPortalStore>,
) -> Response {
    match portal_store.pending_decisions_for(&session.uid) {
        Ok(decisions) => Json(decisions).into_response(),
        Err(err) => internal_error(err),
    }
}

#[derive(Deserialize, Debug)]
struct DecisionBody {
    pub verdict: Verdict,
    #[serde(default)]
    pub escalation: Option<Escalation>,
    #[serde(default)]
    pub comments: String,
}

async fn post_decision(
    session: Session,
    State(workflow): State<GuardedWorkflow>,
    Path(id): Path<i64>,
    Json(body): Json<DecisionBody>,
) -> Response {
    match workflow.record_decision(
        id,
        &session.uid,
        body.verdict,
        body.escalation,
        &body.comments,
    ) {
        Ok(outcome) => Json(serde_json::json!({
            "go": outcome.go,
            "continuation": outcome.continuation,
        }))
        .into_response(),
        Err(err) => workflow_error_response(err),
    }
}

#[derive(Deserialize, Debug)]
struct AssignReviewersBody {
    pub reviewer_handles: Vec<String>,
    pub short_route: bool,
}

async fn assign_reviewers(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(body): Json<AssignReviewersBody>,
) -> Response {
    if !session.has_permission(Permission::AssignReviewers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let reviewers = match resolve_handles(&state.user_store, &body.reviewer_handles) {
        Ok(Ok(uids)) => uids,
        Ok(Err(msg)) => {
            return (StatusCode::UNPROCESSABLE_ENTITY, error_body(msg)).into_response()
        }
        Err(err) => return internal_error(err),
    };

    match state
        .workflow
        .assign_reviewers(id, &reviewers, body.short_route)
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => workflow_error_response(err),
    }
}

async fn discontinue_review(
    session: Session,
    State(workflow): State<GuardedWorkflow>,
    Path(id): Path<i64>,
) -> Response {
    if !session.has_permission(Permission::CloseReviews) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match workflow.discontinue_review(id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => workflow_error_response(err),
    }
}

async fn straight_to_revision(
    session: Session,
    State(workflow): State<GuardedWorkflow>,
    Path(id): Path<i64>,
) -> Response {
    if !session.has_permission(Permission::CloseReviews) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match workflow.straight_to_revision(id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => workflow_error_response(err),
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

async fn get_relations(
    _session: Session,
    State(portal_store): State<GuardedPortalStore>,
) -> Response {
    match portal_store.relations() {
        Ok(relations) => Json(relations).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn get_institutions(
    _session: Session,
    State(portal_store): State<GuardedPortalStore>,
) -> Response {
    match portal_store.institutions() {
        Ok(institutions) => Json(institutions).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn get_lookup_entries(
    _session: Session,
    State(portal_store): State<GuardedPortalStore>,
    Path(kind): Path<String>,
) -> Response {
    match portal_store.lookup_entries(&kind) {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => internal_error(err),
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn logout(session: Session, State(user_store): State<GuardedUserStore>) -> Response {
    match user_store.delete_auth_token(&session.token) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(err) => internal_error(err),
    }
}

// ---------------------------------------------------------------------------
// App assembly
// ---------------------------------------------------------------------------

pub fn make_app(
    config: ServerConfig,
    portal_store: GuardedPortalStore,
    user_store: GuardedUserStore,
    workflow: Arc<WorkflowOrchestrator>,
) -> Result<Router> {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        portal_store,
        user_store,
        workflow,
        hash: env!("GIT_HASH").to_string(),
    };

    let auth_routes: Router = Router::new()
        .route("/logout", post(logout))
        .with_state(state.clone());

    let proposal_routes: Router = Router::new()
        .route("/", post(create_proposal))
        .route("/mine", get(get_my_proposals))
        .route("/{id}", get(get_proposal))
        .route("/{id}/studies", post(add_study))
        .route("/{id}/wmo", put(put_wmo))
        .route("/{id}/submit", post(submit_proposal))
        .route("/{id}/revise", post(revise_proposal))
        .with_state(state.clone());

    let review_routes: Router = Router::new()
        .route("/mine", get(get_my_open_decisions))
        .route("/{id}", get(get_review))
        .route("/{id}/decision", post(post_decision))
        .route("/{id}/assign", post(assign_reviewers))
        .route("/{id}/discontinue", post(discontinue_review))
        .route("/{id}/straight-to-revision", post(straight_to_revision))
        .with_state(state.clone());

    let lookup_routes: Router = Router::new()
        .route("/relations", get(get_relations))
        .route("/institutions", get(get_institutions))
        .route("/{kind}", get(get_lookup_entries))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let mut app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/proposals", proposal_routes)
        .nest("/v1/reviews", review_routes)
        .nest("/v1/lookups", lookup_routes);

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    portal_store: GuardedPortalStore,
    user_store: GuardedUserStore,
    workflow: Arc<WorkflowOrchestrator>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, portal_store, user_store, workflow)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    Ok(axum::serve(listener, app).await?)
}
