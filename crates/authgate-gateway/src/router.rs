//! Axum router wiring.
//!
//! Ops and `/auth/*` routes bypass the access list; everything else goes
//! through `proxy::authorize` and, when allowed, the forward-auth responder.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, auth, ops, proxy};

pub fn build_router(state: AppState) -> Router {
    let protected = protect(Router::new().fallback(proxy::forward_auth), state.clone())
        .with_state(state.clone());

    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .route("/auth/login", get(auth::login_form).post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .with_state(state)
        .merge(protected)
}

/// Put the authorization middleware in front of an embedder's routes.
pub fn protect<S>(router: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(state, proxy::authorize))
}
