#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use authgate_core::AuthGateError;
use authgate_gateway::config;

const KEY: &str = "0123456789abcdef0123456789abcdef";

fn with_access_list(access_list: &str) -> String {
    format!(
        r#"
version: 1
session:
  cookie_encryption_key: "{KEY}"
access_list:
{access_list}
"#
    )
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = format!(
        r#"
version: 1
session:
  cookie_encryption_key: "{KEY}"
  cookie_nmae: "typo"
"#
    );
    let err = config::load_from_str(&bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str(&with_access_list("  - { path: \"/.*\" }")).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:8080");
    assert_eq!(cfg.session.cookie_name, "authgate");
    assert_eq!(cfg.session.header_name, "X-Auth-Policies");
    assert_eq!(cfg.session.ttl_secs, 3600);
    assert!(cfg.session.cookie_secure);
    assert!(cfg.access_list[0].methods.is_empty());
}

#[test]
fn invalid_pattern_is_fatal() {
    let err = config::load_from_str(&with_access_list("  - { name: broken, path: \"/(\" }"))
        .expect_err("must fail");
    match err {
        AuthGateError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "/("),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn short_key_is_rejected() {
    let bad = r#"
version: 1
session:
  cookie_encryption_key: "too-short"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("32 bytes"));
}

#[test]
fn relative_public_url_is_rejected() {
    let bad = format!(
        r#"
version: 1
gateway:
  public_url: "/relative"
session:
  cookie_encryption_key: "{KEY}"
"#
    );
    assert!(config::load_from_str(&bad).is_err());
}

#[test]
fn bad_cookie_and_header_names_are_rejected() {
    for (field, value) in [("cookie_name", "my cookie"), ("header_name", "X Bad")] {
        let bad = format!(
            r#"
version: 1
session:
  cookie_encryption_key: "{KEY}"
  {field}: "{value}"
"#
        );
        assert!(config::load_from_str(&bad).is_err(), "{field} accepted {value:?}");
    }
}

#[test]
fn unsupported_version_is_rejected() {
    let bad = format!("version: 2\nsession:\n  cookie_encryption_key: \"{KEY}\"\n");
    assert!(config::load_from_str(&bad).is_err());
}

#[test]
fn login_url_joins_public_url() {
    let ok = format!(
        r#"
version: 1
gateway:
  public_url: "https://auth.example.com/"
session:
  cookie_encryption_key: "{KEY}"
"#
    );
    let cfg = config::load_from_str(&ok).unwrap();
    assert_eq!(
        cfg.gateway.login_url().as_deref(),
        Some("https://auth.example.com/auth/login")
    );
}
