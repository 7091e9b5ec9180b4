use axum::http::{HeaderName, Uri};
use serde::Deserialize;

use authgate_core::acl::RawRule;
use authgate_core::error::{AuthGateError, Result};
use authgate_core::session::KEY_LEN;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    pub session: SessionSection,

    #[serde(default)]
    pub login: LoginSection,

    /// Evaluated top to bottom; first satisfying rule wins.
    #[serde(default)]
    pub access_list: Vec<RawRule>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(AuthGateError::config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.session.validate()?;
        self.login.validate()?;

        if self.access_list.is_empty() {
            tracing::warn!("access_list is empty: every request will be denied");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Externally visible base URL; unauthenticated callers are redirected to
    /// `<public_url>/auth/login`. Without it they get a plain 401.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            public_url: None,
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if let Some(raw) = &self.public_url {
            let uri: Uri = raw
                .parse()
                .map_err(|e| AuthGateError::config(format!("unable to parse gateway.public_url: {e}")))?;
            if uri.scheme().is_none() || uri.authority().is_none() {
                return Err(AuthGateError::config(
                    "gateway.public_url must be an absolute URL",
                ));
            }
        }
        Ok(())
    }

    /// Login location for redirects, if a public URL is configured.
    pub fn login_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|base| format!("{}/auth/login", base.trim_end_matches('/')))
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Raw AES-256 key, exactly 32 bytes.
    pub cookie_encryption_key: String,

    /// Request header carrying the caller's policies upstream.
    #[serde(default = "default_header_name")]
    pub header_name: String,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if self.cookie_encryption_key.len() != KEY_LEN {
            return Err(AuthGateError::config(format!(
                "session.cookie_encryption_key must be {KEY_LEN} bytes"
            )));
        }
        if self.cookie_name.is_empty() || !self.cookie_name.bytes().all(is_cookie_token_byte) {
            return Err(AuthGateError::config(format!(
                "session.cookie_name is not a valid cookie name: {:?}",
                self.cookie_name
            )));
        }
        HeaderName::from_bytes(self.header_name.as_bytes()).map_err(|_| {
            AuthGateError::config(format!(
                "session.header_name is not a valid header name: {:?}",
                self.header_name
            ))
        })?;
        if !(60..=604_800).contains(&self.ttl_secs) {
            return Err(AuthGateError::config(
                "session.ttl_secs must be between 60 and 604800",
            ));
        }
        Ok(())
    }
}

// RFC 6265 cookie-name: any CHAR except CTLs or separators.
fn is_cookie_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
}

fn default_cookie_name() -> String {
    "authgate".into()
}
fn default_header_name() -> String {
    "X-Auth-Policies".into()
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_cookie_secure() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginSection {
    /// Static token -> policies table for the built-in login backend.
    #[serde(default)]
    pub tokens: Vec<StaticToken>,
}

impl LoginSection {
    pub fn validate(&self) -> Result<()> {
        if self.tokens.iter().any(|t| t.token.is_empty()) {
            return Err(AuthGateError::config("login.tokens entries need a non-empty token"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticToken {
    pub token: String,
    #[serde(default)]
    pub policies: Vec<String>,
}
