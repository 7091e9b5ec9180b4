//! Shared application state for the authgate gateway.
//!
//! Everything is compiled from `GatewayConfig` once at startup and then only
//! read. Handlers clone `AppState` (an `Arc`) per request.

use std::sync::Arc;

use axum::http::HeaderName;

use authgate_core::acl::AccessControlTable;
use authgate_core::error::{AuthGateError, Result};
use authgate_core::pipeline::Authorizer;
use authgate_core::session::SessionCodec;

use crate::auth::login::{LoginBackend, StaticTokenBackend};
use crate::config::GatewayConfig;
use crate::obs::metrics::GatewayMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<GatewayMetrics>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    authorizer: Authorizer,
    login: Arc<dyn LoginBackend>,
    header_name: HeaderName,
    login_url: Option<String>,
}

impl AppState {
    /// Build application state with the static login backend from config.
    /// Returns Result so main can refuse to start on a bad access list.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let login = Arc::new(StaticTokenBackend::new(&cfg.login.tokens));
        Self::with_login_backend(cfg, login)
    }

    pub fn with_login_backend(cfg: GatewayConfig, login: Arc<dyn LoginBackend>) -> Result<Self> {
        // 1) Codec + access list
        let codec = SessionCodec::new(cfg.session.cookie_encryption_key.as_bytes())?;
        let table = AccessControlTable::compile(&cfg.access_list).map_err(|e| {
            tracing::error!(error = %e, "access list compile failed");
            e
        })?;
        tracing::info!(rules = table.len(), backend = login.name(), "access list compiled");
        for (idx, rule) in table.rules().iter().enumerate() {
            let policies: Vec<&str> = rule.required_policies().iter().collect();
            tracing::debug!(
                idx,
                name = %rule.name,
                pattern = rule.pattern(),
                methods = ?rule.methods(),
                policies = %policies.join(","),
                "access rule"
            );
        }

        // 2) Header injected on allowed requests
        let header_name = HeaderName::from_bytes(cfg.session.header_name.as_bytes())
            .map_err(|e| AuthGateError::config(format!("session.header_name: {e}")))?;

        let login_url = cfg.gateway.login_url();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                authorizer: Authorizer::new(codec, table),
                login,
                header_name,
                login_url,
                cfg,
            }),
            metrics: Arc::new(GatewayMetrics::default()),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.inner.authorizer
    }

    pub fn login_backend(&self) -> Arc<dyn LoginBackend> {
        Arc::clone(&self.inner.login)
    }

    pub fn cookie_name(&self) -> &str {
        &self.inner.cfg.session.cookie_name
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.inner.header_name
    }

    pub fn login_url(&self) -> Option<&str> {
        self.inner.login_url.as_deref()
    }

    pub fn session_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.inner.cfg.session.ttl_secs as i64)
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    /// Gauges computed at scrape time.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![(
            "authgate_access_rules",
            self.inner.authorizer.table().len() as u64,
        )]
    }
}
