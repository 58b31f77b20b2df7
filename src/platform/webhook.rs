use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tracing::{debug, info, warn};

use crate::platform::{ChatSender, WireUpdate};
use crate::processor::Processor;

#[derive(Clone)]
pub struct WebhookState {
    pub processor: Arc<Processor>,
    pub sender: Arc<dyn ChatSender>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", any(handle_webhook))
        .with_state(state)
}

/// Serve the webhook on `0.0.0.0:{port}` until Ctrl-C.
pub async fn serve(state: WebhookState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on port {}", port);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, stopping webhook server");
        })
        .await
        .context("Server error")?;

    Ok(())
}

/// Telegram only needs to see 200 once the body decoded; anything else makes it redeliver.
async fn handle_webhook(
    State(state): State<WebhookState>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            "Only POST requests are accepted",
        )
            .into_response();
    }

    let wire: WireUpdate = match serde_json::from_slice(&body) {
        Ok(wire) => wire,
        Err(e) => {
            warn!("Failed to decode update: {}", e);
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    let update_id = wire.update_id;
    match wire.into_update() {
        Some(update) => state.processor.handle(state.sender.as_ref(), &update).await,
        None => debug!("Received non-message update {:?}, ignoring", update_id),
    }

    StatusCode::OK.into_response()
}
