use super::state::ServerState;
use crate::users::{Permission, UserDirectory, UserGroup, UserId};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

/// An authenticated request: the opaque user id plus resolved groups.
#[derive(Debug)]
pub struct Session {
    pub uid: UserId,
    pub token: String,
    pub groups: Vec<UserGroup>,
}

impl Session {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.groups
            .iter()
            .any(|g| g.permissions().contains(&permission))
    }

    pub fn is_secretary(&self) -> bool {
        self.groups.contains(&UserGroup::Secretary)
    }
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    AccessDenied,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
            SessionExtractionError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

async fn extract_session_token_from_cookies(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<String> {
    CookieJar::from_request_parts(parts, &ctx)
        .await
        .expect("Could not read cookies into CookieJar.")
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &mut Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<Session> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return None;
        }
        Some(x) => x,
    };

    let auth_token = match ctx.user_store.get_auth_token(&token) {
        Ok(Some(found)) => {
            if let Err(e) = ctx.user_store.touch_auth_token(&token) {
                debug!("Failed to update auth token last_used timestamp: {}", e);
                // Not critical for authentication; continue.
            }
            found
        }
        Ok(None) => {
            debug!("Auth token not found");
            return None;
        }
        Err(e) => {
            debug!("Failed to look up auth token: {}", e);
            return None;
        }
    };

    let groups = match ctx.user_store.user_groups(&auth_token.uid) {
        Ok(groups) => groups,
        Err(e) => {
            debug!("Failed to resolve groups for {}: {}", auth_token.uid, e);
            return None;
        }
    };

    Some(Session {
        uid: auth_token.uid,
        token: auth_token.value,
        groups,
    })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await
            .ok_or(SessionExtractionError::AccessDenied)
    }
}

impl FromRequestParts<ServerState> for Option<Session> {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx).await)
    }
}
