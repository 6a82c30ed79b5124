use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::sync::Mutex;

use crate::{Res, api, config, types::PkceToken};

/// Serves the OAuth callback until the process exits.
///
/// # Errors
///
/// Fails when `SERVER_ADDRESS` is not a socket address or cannot be bound.
pub async fn start_api_server(state: Arc<Mutex<Option<PkceToken>>>) -> Res<()> {
    let app = Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(state));

    let addr = SocketAddr::from_str(&config::server_addr())
        .map_err(|e| format!("invalid server address {}: {}", config::server_addr(), e))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
