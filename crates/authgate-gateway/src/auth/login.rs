//! Login backend boundary.
//!
//! The real identity provider handshake lives outside this crate; the gateway
//! only needs "credentials in, policies out". `StaticTokenBackend` serves
//! development setups and tests from the `login.tokens` config table.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use authgate_core::error::{AuthGateError, Result};

use crate::config::StaticToken;

/// Credentials posted to `/auth/login`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub token: String,
}

/// Identity/policy backend.
#[async_trait]
pub trait LoginBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Policies granted to the caller, or `AuthFailed`.
    async fn authenticate(&self, creds: &Credentials) -> Result<Vec<String>>;
}

/// Token -> policies lookup built from config.
#[derive(Debug, Default)]
pub struct StaticTokenBackend {
    tokens: HashMap<String, Vec<String>>,
}

impl StaticTokenBackend {
    pub fn new(entries: &[StaticToken]) -> Self {
        let tokens = entries
            .iter()
            .map(|t| (t.token.clone(), t.policies.clone()))
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl LoginBackend for StaticTokenBackend {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn authenticate(&self, creds: &Credentials) -> Result<Vec<String>> {
        self.tokens
            .get(&creds.token)
            .cloned()
            .ok_or(AuthGateError::AuthFailed)
    }
}
