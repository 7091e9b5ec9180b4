//! Login collaborator: issues the encrypted session cookie.
//!
//! - `GET /auth/login`   -> HTML form posting to the route below
//! - `POST /auth/login`  `{"token": ".."}` -> 204 + `Set-Cookie`, or 401
//! - `POST /auth/logout` -> 204 + expired cookie

pub mod login;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use authgate_core::error::{AuthGateError, ClientCode};
use authgate_core::session::Session;

use crate::app_state::AppState;
use login::Credentials;

const LOGIN_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<form id="login">
  <label>Token <input name="token" type="password" autocomplete="current-password" required></label>
  <button type="submit">Sign in</button>
  <p id="status"></p>
</form>
<script>
document.getElementById("login").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const token = new FormData(ev.target).get("token");
  const res = await fetch("/auth/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ token }),
  });
  if (res.ok) {
    location.href = "/";
  } else {
    document.getElementById("status").textContent = "Sign in failed";
  }
});
</script>
</body>
</html>
"#;

/// Landing page for the login redirect.
pub async fn login_form() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Response {
    let creds = match payload {
        Ok(Json(c)) => c,
        Err(rejection) => {
            state.metrics().logins.inc(&[("result", "malformed")]);
            tracing::debug!(error = %rejection.body_text(), "login body rejected");
            return error_response(&AuthGateError::BadRequest(rejection.body_text()));
        }
    };
    let backend = state.login_backend();
    let policies = match backend.authenticate(&creds).await {
        Ok(p) => p,
        Err(e) => {
            state.metrics().logins.inc(&[("result", "rejected")]);
            tracing::info!(backend = backend.name(), error = %e, "login rejected");
            return error_response(&e);
        }
    };

    let session = Session::issue(policies, state.session_lifetime(), Utc::now());
    let token = match state.authorizer().codec().encode(&session) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "session encode failed");
            return error_response(&e);
        }
    };

    let cookie = session_cookie(&state, &token, state.cfg().session.ttl_secs);
    state.metrics().logins.inc(&[("result", "ok")]);
    tracing::info!(
        backend = backend.name(),
        policies = session.policies.len(),
        ttl = %session.ttl,
        "session issued"
    );
    with_cookie(StatusCode::NO_CONTENT, cookie)
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = session_cookie(&state, "", 0);
    with_cookie(StatusCode::NO_CONTENT, cookie)
}

/// `Set-Cookie` value for the session cookie.
pub fn session_cookie(state: &AppState, value: &str, max_age_secs: u64) -> String {
    let mut c = format!(
        "{}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}",
        state.cookie_name()
    );
    if state.cfg().session.cookie_secure {
        c.push_str("; Secure");
    }
    c
}

fn with_cookie(status: StatusCode, cookie: String) -> Response {
    match HeaderValue::from_str(&cookie) {
        Ok(v) => (status, [(header::SET_COOKIE, v)]).into_response(),
        Err(_) => error_response(&AuthGateError::Internal("set-cookie header invalid".into())),
    }
}

/// Stable JSON error body; never carries the internal message.
pub fn error_response(e: &AuthGateError) -> Response {
    let code = e.client_code();
    let status = match code {
        ClientCode::AuthFailed => StatusCode::UNAUTHORIZED,
        ClientCode::Forbidden => StatusCode::FORBIDDEN,
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": code.as_str() }))).into_response()
}
