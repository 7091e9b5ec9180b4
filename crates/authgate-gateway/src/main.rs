//! authgate gateway binary.
//!
//! - Config path from `AUTHGATE_CONFIG` (default `authgate.yaml`)
//! - Log filter from `RUST_LOG` (default `info`)
//! - Refuses to start on any config or access list error
//! - Ctrl-C: mark draining (readyz -> 503), then shut down gracefully

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

use authgate_core::error::AuthGateError;
use authgate_gateway::{app_state, config, router};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] AuthGateError),
    #[error("gateway.listen must be a valid socket address: {0}")]
    Listen(#[from] AddrParseError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "authgate-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let path = std::env::var("AUTHGATE_CONFIG").unwrap_or_else(|_| "authgate.yaml".into());
    tracing::info!(config = %path, "starting authgate-gateway");

    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(%listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            state.metrics().set_draining();
            tracing::info!("draining");
        })
        .await?;
    Ok(())
}
