//! HTTP frame batch receiver.

use crate::{
    AppError, AppResult, config::ReceiverConfig, server::bind, shutdown::shutdown_signal,
};

use celestial_core::{FrameBatch, FrameStore};

use std::{panic::Location, time::Instant};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
struct ReceiverState {
    store: FrameStore,
    started_at: Instant,
}

/// Body of a successful `POST /frames`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FramesResponse {
    success: bool,
    message: String,
    frames_received: usize,
    timestamp: DateTime<Utc>,
    saved_to: String,
}

/// Body of a failed `POST /frames`.
#[derive(Debug, Serialize)]
struct FramesError {
    success: bool,
    error: String,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: DateTime<Utc>,
    uptime: f64,
}

/// Build the receiver routes writing into `store`.
pub(crate) fn receiver_router(store: FrameStore, body_limit: usize) -> Router {
    let state = ReceiverState {
        store,
        started_at: Instant::now(),
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/frames", post(receive_frames))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create the frames directory and serve until a shutdown signal.
#[instrument(skip(config), fields(port = config.port))]
pub(crate) async fn run_receiver(config: &ReceiverConfig) -> AppResult<()> {
    let store = FrameStore::new(&config.frames_dir);
    store.ensure_dir()?;

    let (listener, addr) = bind(config.port).await?;

    info!(
        %addr,
        frames_dir = %store.dir().display(),
        body_limit_mb = config.body_limit_mb,
        "Frame receiver listening"
    );

    axum::serve(listener, receiver_router(store, config.body_limit_bytes()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::ServerError {
            reason: format!("Frame receiver failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Frame receiver stopped");

    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Celestial Frame Receiver Server",
        "endpoints": {
            "POST /frames": "Receive frames from the video recorder",
            "GET /health": "Health check",
            "GET /": "This message"
        }
    }))
}

async fn health(State(state): State<ReceiverState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "Celestial Frame Receiver is running!",
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

/// Decode and store one batch. Any failure is a 500 carrying the message.
async fn receive_frames(
    State(state): State<ReceiverState>,
    body: Result<Json<FrameBatch>, JsonRejection>,
) -> Response {
    let batch = match body {
        Ok(Json(batch)) => batch,
        Err(rejection) => {
            error!(error = %rejection.body_text(), "Rejected frame batch body");
            let status = match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return failure(status, rejection.body_text());
        }
    };

    let store = state.store.clone();
    let persisted = tokio::task::spawn_blocking(move || store.persist_batch(&batch)).await;

    match persisted {
        Ok(Ok(count)) => {
            info!(frames = count, "Frame batch saved");
            Json(FramesResponse {
                success: true,
                message: format!("Successfully received and saved {} frames!", count),
                frames_received: count,
                timestamp: Utc::now(),
                saved_to: state.store.dir().display().to_string(),
            })
            .into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, "Error processing frames");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.reason().to_string())
        }
        Err(e) => {
            error!(error = %e, "Frame writer task failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn failure(status: StatusCode, error: String) -> Response {
    (
        status,
        Json(FramesError {
            success: false,
            error,
        }),
    )
        .into_response()
}
