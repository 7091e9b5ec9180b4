//! Per-request authorization decision.
//!
//! cookie -> codec -> expiry -> access list. Every step is pure and
//! synchronous; the first failure is the answer, nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::acl::{AccessControlTable, AclDenyReason};
use crate::error::AuthGateError;
use crate::session::{Session, SessionCodec};

/// What the pipeline needs to know about an inbound request.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    /// Session cookie value, if the request carried one.
    pub cookie: Option<&'a str>,
    pub path: &'a str,
    pub method: &'a str,
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No cookie: caller never logged in.
    NoSession,
    /// Cookie failed to decode, authenticate or parse.
    InvalidSession,
    ExpiredSession,
    /// Session fine, access list said no.
    Acl(AclDenyReason),
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::NoSession => "no-session",
            DenyReason::InvalidSession => "invalid-session",
            DenyReason::ExpiredSession => "expired-session",
            DenyReason::Acl(r) => r.as_str(),
        }
    }

    /// Session problems send the caller back to login; ACL denials do not.
    pub fn requires_login(self) -> bool {
        !matches!(self, DenyReason::Acl(_))
    }
}

/// Terminal state of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow {
        session: Session,
        /// Name of the access rule that granted the request.
        rule: String,
    },
    Deny {
        reason: DenyReason,
        /// Closest rule on ACL denials, for logs.
        near_miss: Option<String>,
    },
}

impl Decision {
    fn deny(reason: DenyReason) -> Self {
        Decision::Deny {
            reason,
            near_miss: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn reason_str(&self) -> &'static str {
        match self {
            Decision::Allow { .. } => "allowed",
            Decision::Deny { reason, .. } => reason.as_str(),
        }
    }
}

/// Immutable codec + access list pair.
/// Construct once at startup, then share; no locking needed.
#[derive(Debug, Clone)]
pub struct Authorizer {
    codec: SessionCodec,
    table: Arc<AccessControlTable>,
}

impl Authorizer {
    pub fn new(codec: SessionCodec, table: AccessControlTable) -> Self {
        Self {
            codec,
            table: Arc::new(table),
        }
    }

    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    pub fn table(&self) -> &AccessControlTable {
        &self.table
    }

    pub fn authorize_now(&self, req: &AuthRequest<'_>) -> Decision {
        self.authorize(req, Utc::now())
    }

    pub fn authorize(&self, req: &AuthRequest<'_>, now: DateTime<Utc>) -> Decision {
        let Some(token) = req.cookie else {
            return Decision::deny(DenyReason::NoSession);
        };

        let session = match self.codec.decode(token) {
            Ok(s) => s,
            Err(e) => {
                log_codec_failure(&e);
                return Decision::deny(DenyReason::InvalidSession);
            }
        };

        if let Err(e) = session.ensure_fresh(now) {
            tracing::debug!(ttl = %session.ttl, error = %e, "session rejected");
            return Decision::deny(DenyReason::ExpiredSession);
        }

        let acl = self
            .table
            .evaluate(req.path, req.method, &session.policy_set());
        match (acl.allowed, acl.matched_rule, acl.reason) {
            (true, Some(rule), _) => Decision::Allow { session, rule },
            (_, _, reason) => Decision::Deny {
                reason: DenyReason::Acl(reason.unwrap_or(AclDenyReason::NoMatchingRule)),
                near_miss: acl.near_miss,
            },
        }
    }
}

fn log_codec_failure(e: &AuthGateError) {
    // detail stays in logs; callers only ever see InvalidSession
    tracing::debug!(error = %e, "session cookie rejected");
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::acl::RawRule;
    use chrono::{Duration, TimeZone};

    const KEY: &[u8; 32] = b"fedcba9876543210fedcba9876543210";

    fn authorizer() -> Authorizer {
        let rules = vec![RawRule {
            name: "api".into(),
            path: "^/api".into(),
            methods: vec!["get".into()],
            policies: vec!["reader".into()],
        }];
        Authorizer::new(
            SessionCodec::new(KEY).unwrap(),
            AccessControlTable::compile(&rules).unwrap(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    fn token(az: &Authorizer, policies: &[&str], ttl: DateTime<Utc>) -> String {
        let s = Session::new(policies.iter().map(|p| p.to_string()).collect(), ttl);
        az.codec().encode(&s).unwrap()
    }

    fn req<'a>(cookie: Option<&'a str>, path: &'a str, method: &'a str) -> AuthRequest<'a> {
        AuthRequest {
            cookie,
            path,
            method,
        }
    }

    #[test]
    fn missing_cookie_is_no_session() {
        let d = authorizer().authorize(&req(None, "/api", "GET"), now());
        assert_eq!(d.reason_str(), "no-session");
        match d {
            Decision::Deny { reason, .. } => assert!(reason.requires_login()),
            Decision::Allow { .. } => unreachable!(),
        }
    }

    #[test]
    fn garbage_cookie_is_invalid_session() {
        let d = authorizer().authorize(&req(Some("bm9wZQ=="), "/api", "GET"), now());
        assert_eq!(d.reason_str(), "invalid-session");
    }

    #[test]
    fn cookie_from_other_key_is_invalid_session() {
        let other = Authorizer::new(
            SessionCodec::new(&[1u8; 32]).unwrap(),
            AccessControlTable::default(),
        );
        let t = token(&other, &["reader"], now() + Duration::hours(1));
        let d = authorizer().authorize(&req(Some(t.as_str()), "/api", "GET"), now());
        assert_eq!(d.reason_str(), "invalid-session");
    }

    #[test]
    fn expiry_equal_to_now_is_expired() {
        let az = authorizer();
        let t = token(&az, &["reader"], now());
        let d = az.authorize(&req(Some(t.as_str()), "/api", "GET"), now());
        assert_eq!(d.reason_str(), "expired-session");

        let d = az.authorize(&req(Some(t.as_str()), "/api", "GET"), now() - Duration::seconds(1));
        assert!(d.is_allowed());
    }

    #[test]
    fn allow_carries_session_and_rule() {
        let az = authorizer();
        let t = token(&az, &["reader"], now() + Duration::hours(1));
        match az.authorize(&req(Some(t.as_str()), "/api/items", "GET"), now()) {
            Decision::Allow { session, rule } => {
                assert_eq!(rule, "api");
                assert_eq!(session.policies, vec!["reader".to_string()]);
            }
            other => unreachable!("{other:?}"),
        }
    }

    #[test]
    fn acl_denial_keeps_true_cause() {
        let az = authorizer();
        let t = token(&az, &["reader"], now() + Duration::hours(1));
        let d = az.authorize(&req(Some(t.as_str()), "/api/items", "POST"), now());
        assert_eq!(
            d,
            Decision::Deny {
                reason: DenyReason::Acl(AclDenyReason::MethodNotAllowed),
                near_miss: Some("api".into()),
            }
        );
        match d {
            Decision::Deny { reason, .. } => assert!(!reason.requires_login()),
            Decision::Allow { .. } => unreachable!(),
        }
    }
}
