//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all portal endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client carrying a pre-provisioned session token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Session token sent in the Authorization header, if any
    pub token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    ///
    /// Use this for testing authentication handling; for most tests use
    /// `with_token()` with one of the fixture tokens.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client authenticated with the given fixture token.
    pub fn with_token(base_url: String, token: &str) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.to_string());
        client
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", token);
        }
        builder
    }

    async fn get(&self, path: &str) -> Response {
        self.request(reqwest::Method::GET, path)
            .send()
            .await
            .expect("request failed")
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Response {
        self.request(reqwest::Method::POST, path)
            .json(&body)
            .send()
            .await
            .expect("request failed")
    }

    async fn post_empty(&self, path: &str) -> Response {
        self.request(reqwest::Method::POST, path)
            .send()
            .await
            .expect("request failed")
    }

    async fn put(&self, path: &str, body: serde_json::Value) -> Response {
        self.request(reqwest::Method::PUT, path)
            .json(&body)
            .send()
            .await
            .expect("request failed")
    }

    // ========================================================================
    // Home / auth
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.get("/").await
    }

    /// POST /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.post_empty("/v1/auth/logout").await
    }

    // ========================================================================
    // Proposals
    // ========================================================================

    /// POST /v1/proposals with a minimal harmless proposal
    pub async fn create_proposal(&self, title: &str, relation_id: i64) -> Response {
        self.post(
            "/v1/proposals",
            json!({
                "title": title,
                "relation_id": relation_id,
                "institution_id": INSTITUTION_ID,
            }),
        )
        .await
    }

    /// POST /v1/proposals with a full body
    pub async fn create_proposal_with(&self, body: serde_json::Value) -> Response {
        self.post("/v1/proposals", body).await
    }

    /// GET /v1/proposals/{id}
    pub async fn get_proposal(&self, id: i64) -> Response {
        self.get(&format!("/v1/proposals/{}", id)).await
    }

    /// GET /v1/proposals/mine
    pub async fn my_proposals(&self) -> Response {
        self.get("/v1/proposals/mine").await
    }

    /// POST /v1/proposals/{id}/studies
    pub async fn add_study(&self, id: i64, body: serde_json::Value) -> Response {
        self.post(&format!("/v1/proposals/{}/studies", id), body)
            .await
    }

    /// PUT /v1/proposals/{id}/wmo
    pub async fn put_wmo(&self, id: i64, body: serde_json::Value) -> Response {
        self.put(&format!("/v1/proposals/{}/wmo", id), body).await
    }

    /// POST /v1/proposals/{id}/submit
    pub async fn submit_proposal(&self, id: i64) -> Response {
        self.post_empty(&format!("/v1/proposals/{}/submit", id))
            .await
    }

    /// POST /v1/proposals/{id}/revise
    pub async fn revise_proposal(&self, id: i64) -> Response {
        self.post_empty(&format!("/v1/proposals/{}/revise", id))
            .await
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// GET /v1/reviews/{id}
    pub async fn get_review(&self, id: i64) -> Response {
        self.get(&format!("/v1/reviews/{}", id)).await
    }

    /// GET /v1/reviews/mine
    pub async fn my_open_decisions(&self) -> Response {
        self.get("/v1/reviews/mine").await
    }

    /// POST /v1/reviews/{id}/decision
    pub async fn post_decision(&self, id: i64, verdict: &str, comments: &str) -> Response {
        self.post(
            &format!("/v1/reviews/{}/decision", id),
            json!({ "verdict": verdict, "comments": comments }),
        )
        .await
    }

    /// POST /v1/reviews/{id}/decision with an escalation flag
    pub async fn post_decision_with_escalation(
        &self,
        id: i64,
        verdict: &str,
        escalation: &str,
    ) -> Response {
        self.post(
            &format!("/v1/reviews/{}/decision", id),
            json!({ "verdict": verdict, "escalation": escalation }),
        )
        .await
    }

    /// POST /v1/reviews/{id}/assign
    pub async fn assign_reviewers(
        &self,
        id: i64,
        reviewer_handles: &[&str],
        short_route: bool,
    ) -> Response {
        self.post(
            &format!("/v1/reviews/{}/assign", id),
            json!({ "reviewer_handles": reviewer_handles, "short_route": short_route }),
        )
        .await
    }

    /// POST /v1/reviews/{id}/discontinue
    pub async fn discontinue_review(&self, id: i64) -> Response {
        self.post_empty(&format!("/v1/reviews/{}/discontinue", id))
            .await
    }

    /// POST /v1/reviews/{id}/straight-to-revision
    pub async fn straight_to_revision(&self, id: i64) -> Response {
        self.post_empty(&format!("/v1/reviews/{}/straight-to-revision", id))
            .await
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// GET /v1/lookups/relations
    pub async fn relations(&self) -> Response {
        self.get("/v1/lookups/relations").await
    }

    /// GET /v1/lookups/institutions
    pub async fn institutions(&self) -> Response {
        self.get("/v1/lookups/institutions").await
    }
}
