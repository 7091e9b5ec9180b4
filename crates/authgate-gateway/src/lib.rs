//! authgate gateway library entry.
//!
//! Wires config, the login collaborator, the authorization middleware and
//! ops endpoints into an axum `Router`. Consumed by the binary (`main.rs`)
//! and by integration tests.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod obs;
pub mod ops;
pub mod proxy;
pub mod router;
