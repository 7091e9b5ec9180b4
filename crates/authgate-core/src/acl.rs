//! Access list compilation and matching.
//!
//! A table is an ordered list of compiled rules. Evaluation walks the list in
//! configuration order and stops at the first rule whose path, method and
//! policy conditions all hold; if none does, the request is denied.
//!
//! # Ordering
//! Order is load-bearing. Path patterns are searched, not anchored, so `/.*`
//! also covers `/admin/x`. A broad rule placed after a narrow one still grants
//! access to callers the narrow rule turned away:
//!
//! ```text
//! - path: "/admin.*"   policies: [admin]
//! - path: "/.*"        policies: []        # lets everyone into /admin too
//! ```
//!
//! Rule authors own both anchoring (`^...$`) and ordering.

use std::collections::BTreeSet;

use regex::Regex;
use serde::Deserialize;

use crate::error::{AuthGateError, Result};

/// Set of policy identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet(BTreeSet<String>);

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every policy in `required` is held here.
    pub fn is_superset_of(&self, required: &PolicySet) -> bool {
        self.0.is_superset(&required.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for PolicySet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for PolicySet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

/// Access list entry as written in configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRule {
    /// Label for logs; no effect on matching.
    #[serde(default)]
    pub name: String,
    /// Regular expression searched in the request path.
    pub path: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub policies: Vec<String>,
}

/// Which HTTP methods a rule accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    /// No `methods` configured: every method passes.
    Any,
    /// Uppercase method tokens.
    Only(BTreeSet<String>),
}

impl MethodFilter {
    pub fn allows(&self, method: &str) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(set) => set.contains(method),
        }
    }
}

/// Compiled access list entry. Immutable once built.
#[derive(Debug, Clone)]
pub struct AccessRule {
    pub name: String,
    pattern: Regex,
    methods: MethodFilter,
    required_policies: PolicySet,
}

impl AccessRule {
    /// Compile one raw rule: uppercase methods, compile the path regex and
    /// collapse policies into a set.
    pub fn compile(raw: &RawRule) -> Result<Self> {
        let pattern = Regex::new(&raw.path).map_err(|e| AuthGateError::InvalidPattern {
            pattern: raw.path.clone(),
            message: e.to_string(),
        })?;

        let methods = if raw.methods.is_empty() {
            MethodFilter::Any
        } else {
            MethodFilter::Only(raw.methods.iter().map(|m| m.to_uppercase()).collect())
        };

        Ok(Self {
            name: raw.name.clone(),
            pattern,
            methods,
            required_policies: raw.policies.iter().cloned().collect(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn methods(&self) -> &MethodFilter {
        &self.methods
    }

    pub fn required_policies(&self) -> &PolicySet {
        &self.required_policies
    }

    fn check(&self, path: &str, method: &str, policies: &PolicySet) -> RuleOutcome {
        if !self.pattern.is_match(path) {
            return RuleOutcome::PathMismatch;
        }
        if !self.methods.allows(method) {
            return RuleOutcome::MethodMismatch;
        }
        if !policies.is_superset_of(&self.required_policies) {
            return RuleOutcome::PolicyMismatch;
        }
        RuleOutcome::Match
    }
}

// Variant order ranks how close a rule came to matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RuleOutcome {
    PathMismatch,
    MethodMismatch,
    PolicyMismatch,
    Match,
}

/// Why the table denied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclDenyReason {
    /// Table has no rules at all.
    NoMatchingRule,
    /// No rule's pattern matched the path.
    PathNotCovered,
    /// A rule covered the path but not the method.
    MethodNotAllowed,
    /// A rule covered path and method but the caller lacks policies.
    InsufficientPolicy,
}

impl AclDenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AclDenyReason::NoMatchingRule => "no-matching-rule",
            AclDenyReason::PathNotCovered => "path-not-covered",
            AclDenyReason::MethodNotAllowed => "method-not-allowed",
            AclDenyReason::InsufficientPolicy => "insufficient-policy",
        }
    }

    /// Client-facing form: every denial reads as `no-matching-rule`.
    pub fn coalesced(self) -> &'static str {
        AclDenyReason::NoMatchingRule.as_str()
    }
}

/// Outcome of [`AccessControlTable::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclDecision {
    pub allowed: bool,
    /// Name of the rule that granted access.
    pub matched_rule: Option<String>,
    /// Set when `allowed` is false.
    pub reason: Option<AclDenyReason>,
    /// On denial, the rule that came closest to matching.
    pub near_miss: Option<String>,
}

impl AclDecision {
    fn allow(rule: &AccessRule) -> Self {
        Self {
            allowed: true,
            matched_rule: Some(rule.name.clone()),
            reason: None,
            near_miss: None,
        }
    }

    fn deny(reason: AclDenyReason, near_miss: Option<String>) -> Self {
        Self {
            allowed: false,
            matched_rule: None,
            reason: Some(reason),
            near_miss,
        }
    }
}

/// Ordered, compiled access list. Strict allow-list: no match means deny.
#[derive(Debug, Clone, Default)]
pub struct AccessControlTable {
    rules: Vec<AccessRule>,
}

impl AccessControlTable {
    /// Compile every rule in order; the first invalid one aborts the load.
    pub fn compile(raw: &[RawRule]) -> Result<Self> {
        let mut rules = Vec::with_capacity(raw.len());
        for (idx, r) in raw.iter().enumerate() {
            let rule = AccessRule::compile(r).map_err(|e| match e {
                AuthGateError::InvalidPattern { pattern, message } => {
                    AuthGateError::InvalidPattern {
                        pattern,
                        message: format!("access_list[{idx}] ({}): {message}", r.name),
                    }
                }
                other => other,
            })?;
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule satisfying path, method and policies wins.
    pub fn evaluate(&self, path: &str, method: &str, policies: &PolicySet) -> AclDecision {
        if self.rules.is_empty() {
            return AclDecision::deny(AclDenyReason::NoMatchingRule, None);
        }

        let mut closest: Option<(RuleOutcome, &AccessRule)> = None;
        for rule in &self.rules {
            let outcome = rule.check(path, method, policies);
            if outcome == RuleOutcome::Match {
                return AclDecision::allow(rule);
            }
            // strictly greater: ties keep the earlier rule
            if closest.map_or(true, |(best, _)| outcome > best) {
                closest = Some((outcome, rule));
            }
        }

        match closest {
            Some((RuleOutcome::PolicyMismatch, rule)) => {
                AclDecision::deny(AclDenyReason::InsufficientPolicy, Some(rule.name.clone()))
            }
            Some((RuleOutcome::MethodMismatch, rule)) => {
                AclDecision::deny(AclDenyReason::MethodNotAllowed, Some(rule.name.clone()))
            }
            _ => AclDecision::deny(AclDenyReason::PathNotCovered, None),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;

    fn raw(name: &str, path: &str, methods: &[&str], policies: &[&str]) -> RawRule {
        RawRule {
            name: name.into(),
            path: path.into(),
            methods: methods.iter().map(|s| s.to_string()).collect(),
            policies: policies.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn set(items: &[&str]) -> PolicySet {
        items.iter().copied().collect()
    }

    #[test]
    fn methods_are_uppercased_at_compile_time() {
        let rule = AccessRule::compile(&raw("r", "/", &["get", "Post"], &[])).unwrap();
        assert!(rule.methods().allows("GET"));
        assert!(rule.methods().allows("POST"));
        assert!(!rule.methods().allows("get"));
    }

    #[test]
    fn empty_methods_means_any() {
        let rule = AccessRule::compile(&raw("r", "/", &[], &[])).unwrap();
        assert_eq!(rule.methods(), &MethodFilter::Any);
    }

    #[test]
    fn duplicate_policies_collapse() {
        let rule = AccessRule::compile(&raw("r", "/", &[], &["a", "a", "b"])).unwrap();
        assert_eq!(rule.required_policies().len(), 2);
    }

    #[test]
    fn compiled_table_keeps_config_order() {
        let t = AccessControlTable::compile(&[
            raw("admin", "^/admin", &[], &["admin"]),
            raw("docs", "^/docs/", &["GET"], &["default", "admin"]),
        ])
        .unwrap();
        let names: Vec<_> = t.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["admin", "docs"]);
        assert_eq!(t.rules()[1].pattern(), "^/docs/");
        let required: Vec<_> = t.rules()[1].required_policies().iter().collect();
        assert_eq!(required, ["admin", "default"]);
    }

    #[test]
    fn invalid_pattern_is_reported_with_rule_position() {
        let err = AccessControlTable::compile(&[raw("ok", "/", &[], &[]), raw("bad", "(", &[], &[])])
            .unwrap_err();
        match err {
            AuthGateError::InvalidPattern { pattern, message } => {
                assert_eq!(pattern, "(");
                assert!(message.starts_with("access_list[1] (bad)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_policies_use_and_semantics() {
        let t = AccessControlTable::compile(&[raw("r", "/", &[], &["a", "b"])]).unwrap();
        assert!(!t.evaluate("/", "GET", &set(&["a"])).allowed);
        assert!(t.evaluate("/", "GET", &set(&["a", "b", "c"])).allowed);
    }

    #[test]
    fn path_is_searched_not_anchored() {
        let t = AccessControlTable::compile(&[raw("r", "admin", &[], &[])]).unwrap();
        assert!(t.evaluate("/v1/admin/users", "GET", &set(&[])).allowed);

        let anchored = AccessControlTable::compile(&[raw("r", "^/admin$", &[], &[])]).unwrap();
        assert!(!anchored.evaluate("/admin/users", "GET", &set(&[])).allowed);
    }

    #[test]
    fn empty_table_denies_everything() {
        let t = AccessControlTable::default();
        let d = t.evaluate("/", "GET", &set(&["admin"]));
        assert!(!d.allowed);
        assert_eq!(d.reason, Some(AclDenyReason::NoMatchingRule));
    }

    #[test]
    fn deepest_failure_is_reported() {
        let t = AccessControlTable::compile(&[
            raw("reads", "^/data", &["GET"], &[]),
            raw("writes", "^/data", &["POST"], &["writer"]),
        ])
        .unwrap();

        let d = t.evaluate("/data", "POST", &set(&[]));
        assert_eq!(d.reason, Some(AclDenyReason::InsufficientPolicy));
        assert_eq!(d.near_miss.as_deref(), Some("writes"));

        let d = t.evaluate("/data", "DELETE", &set(&["writer"]));
        assert_eq!(d.reason, Some(AclDenyReason::MethodNotAllowed));
        assert_eq!(d.near_miss.as_deref(), Some("reads"));

        let d = t.evaluate("/other", "GET", &set(&["writer"]));
        assert_eq!(d.reason, Some(AclDenyReason::PathNotCovered));
        assert_eq!(d.near_miss, None);
    }

    #[test]
    fn coalesced_reason_hides_cause() {
        assert_eq!(AclDenyReason::InsufficientPolicy.coalesced(), "no-matching-rule");
        assert_eq!(AclDenyReason::MethodNotAllowed.as_str(), "method-not-allowed");
    }
}
