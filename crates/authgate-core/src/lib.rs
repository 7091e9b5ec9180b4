//! authgate core: session cookie codec, access list engine, and the
//! per-request authorization pipeline.
//!
//! Everything here is pure and synchronous. Codec and access list are built
//! once from configuration and shared read-only across request handlers; no
//! transport or runtime dependencies are carried so the crate can back any
//! HTTP front end.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Hostile cookies and bad requests surface as `AuthGateError` or a deny
//! `Decision`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod acl;
pub mod cookie;
pub mod error;
pub mod pipeline;
pub mod session;

/// Shared result type.
pub use error::{AuthGateError, Result};

pub use acl::{AccessControlTable, AccessRule, AclDecision, AclDenyReason, PolicySet, RawRule};
pub use pipeline::{AuthRequest, Authorizer, Decision, DenyReason};
pub use session::{Session, SessionCodec};
