//! Forwarding boundary.
//!
//! `authorize` runs the decision pipeline in front of whatever serves the
//! request. On allow it replaces the identity header with the caller's
//! policies and hands the request on; on deny it answers itself:
//! session problems -> login redirect (or 401), access list -> 403.
//!
//! Byte-level proxying to an upstream is not done here. The built-in
//! `forward_auth` handler answers 200 so an external proxy can use the
//! gateway as its auth subrequest target.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use authgate_core::cookie::find_cookie;
use authgate_core::error::{AuthGateError, ClientCode};
use authgate_core::pipeline::{AuthRequest, Decision, DenyReason};
use authgate_core::session::Session;

use crate::app_state::AppState;
use crate::auth::error_response;

pub async fn authorize(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let decision = {
        let cookie = find_cookie(
            req.headers()
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
            state.cookie_name(),
        );
        state.authorizer().authorize_now(&AuthRequest {
            cookie,
            path: &path,
            method: method.as_str(),
        })
    };

    let reason = decision.reason_str();
    let outcome = if decision.is_allowed() { "allow" } else { "deny" };
    state
        .metrics()
        .decisions
        .inc(&[("outcome", outcome), ("reason", reason)]);
    state
        .metrics()
        .decision_duration
        .observe(&[("outcome", outcome)], started.elapsed());

    match decision {
        Decision::Allow { session, rule } => {
            let value = match identity_header(&session) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(%path, error = %e, "policies not representable as header");
                    return error_response(&e);
                }
            };
            tracing::debug!(%method, %path, %rule, "request allowed");

            let headers = req.headers_mut();
            // never trust a client-supplied identity header
            headers.remove(state.header_name());
            headers.insert(state.header_name().clone(), value);
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Decision::Deny { reason, near_miss } => {
            if reason.requires_login() {
                tracing::debug!(%method, %path, reason = reason.as_str(), "session required");
            } else {
                tracing::info!(
                    %method,
                    %path,
                    reason = reason.as_str(),
                    near_miss = near_miss.as_deref().unwrap_or("-"),
                    "request denied"
                );
            }
            deny_response(&state, reason)
        }
    }
}

/// Answers an already-authorized request for forward-auth callers.
pub async fn forward_auth(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match headers.get(state.header_name()) {
        Some(v) => (StatusCode::OK, [(state.header_name().clone(), v.clone())]).into_response(),
        None => StatusCode::OK.into_response(),
    }
}

/// Header value carrying the session's policies, comma separated.
pub fn identity_header(session: &Session) -> authgate_core::Result<HeaderValue> {
    HeaderValue::from_str(&session.policies.join(","))
        .map_err(|e| AuthGateError::Internal(format!("identity header: {e}")))
}

fn deny_response(state: &AppState, reason: DenyReason) -> Response {
    match reason {
        DenyReason::Acl(acl) => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": ClientCode::Forbidden.as_str(),
                "reason": acl.coalesced(),
            })),
        )
            .into_response(),
        // all session failures look the same from outside
        _ => match state.login_url().map(HeaderValue::from_str) {
            Some(Ok(location)) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            _ => error_response(&AuthGateError::NoSession),
        },
    }
}
