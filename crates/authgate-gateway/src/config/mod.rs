//! Gateway config loader (strict parsing).
//!
//! Parsing, validation and access list compilation all happen here so a bad
//! file stops the process before it binds a socket.

pub mod schema;

use std::fs;

use authgate_core::acl::AccessControlTable;
use authgate_core::error::{AuthGateError, Result};

pub use schema::{GatewayConfig, GatewaySection, LoginSection, SessionSection, StaticToken};

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| AuthGateError::config(format!("unable to load configuration file {path}: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| AuthGateError::config(format!("unable to parse configuration: {e}")))?;
    cfg.validate()?;
    // pattern errors are fatal at load time
    AccessControlTable::compile(&cfg.access_list)?;
    Ok(cfg)
}
