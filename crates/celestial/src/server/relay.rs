//! WebSocket live relay server.
//!
//! One [`RelaySession`] per server. Each connection gets a writer task that
//! drains the peer's outbound queue into the socket, while the connection
//! task reads frames and hands them to the session.

use crate::{AppError, AppResult, config::RelayConfig, server::bind, shutdown::shutdown_signal};

use celestial_core::{CoreError, Outbound, PeerId, PeerInfo, RelaySession};

use std::{panic::Location, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, instrument, warn};

const RECEIVER_PAGE: &str = include_str!("../../assets/receiver.html");

/// Body of `GET /api/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: &'static str,
    stream_active: bool,
    connected_clients: usize,
    timestamp: DateTime<Utc>,
}

/// Body of `GET /api/clients`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientsResponse {
    connected_clients: usize,
    clients: Vec<PeerInfo>,
}

/// Build the relay routes around `session`.
pub(crate) fn relay_router(session: Arc<RelaySession>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ws", get(upgrade))
        .route("/api/status", get(status))
        .route("/api/clients", get(clients))
        .route("/receiver", get(receiver_page))
        .layer(CorsLayer::permissive())
        .with_state(session)
}

/// Serve the relay until a shutdown signal, then close every peer.
#[instrument(skip(config), fields(port = config.port))]
pub(crate) async fn run_relay(config: &RelayConfig) -> AppResult<()> {
    let session = Arc::new(RelaySession::new(config.peer_buffer));
    let (listener, addr) = bind(config.port).await?;

    info!(%addr, peer_buffer = config.peer_buffer, "Live relay listening");
    info!("Receiver page available at http://localhost:{}/receiver", config.port);

    let shutdown_session = Arc::clone(&session);
    axum::serve(listener, relay_router(session))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_session.shutdown();
        })
        .await
        .map_err(|e| AppError::ServerError {
            reason: format!("Relay server failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Live relay stopped");

    Ok(())
}

/// WebSocket upgrade on `/`, service description otherwise.
async fn root(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(session): State<Arc<RelaySession>>,
) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, session)),
        Err(_) => Json(json!({
            "message": "Celestial Live Video Streaming Server",
            "endpoints": {
                "WebSocket": "ws://<host>/ or ws://<host>/ws (live streaming)",
                "GET /api/status": "Server status",
                "GET /api/clients": "Connected clients",
                "GET /receiver": "Receiver page for other computers"
            }
        }))
        .into_response(),
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(session): State<Arc<RelaySession>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

async fn status(State(session): State<Arc<RelaySession>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "active",
        stream_active: session.is_stream_active(),
        connected_clients: session.peer_count(),
        timestamp: Utc::now(),
    })
}

async fn clients(State(session): State<Arc<RelaySession>>) -> Json<ClientsResponse> {
    let clients = session.peers();
    Json(ClientsResponse {
        connected_clients: clients.len(),
        clients,
    })
}

async fn receiver_page() -> Html<&'static str> {
    Html(RECEIVER_PAGE)
}

#[instrument(skip_all)]
async fn handle_socket(socket: WebSocket, session: Arc<RelaySession>) {
    let (peer_id, mut outbound_rx) = session.join();
    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = outbound_rx.recv().await {
            let message = match outbound {
                Outbound::Text(text) => Message::Text(text.into()),
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if let Err(e) = sink.send(message).await {
                let err = connection_error(e);
                debug!(peer_id = %peer_id, error = %err, "Peer socket write failed");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    session.dispatch(peer_id, text.as_str());
                }
                Some(Ok(Message::Binary(bytes))) => dispatch_binary(&session, peer_id, &bytes),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let err = connection_error(e);
                    warn!(peer_id = %peer_id, error = %err, "Peer connection error");
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    session.leave(peer_id);
    writer.abort();
}

/// Binary frames carry the same JSON as text frames.
fn dispatch_binary(session: &RelaySession, peer_id: PeerId, bytes: &[u8]) {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            session.dispatch(peer_id, text);
        }
        Err(e) => warn!(peer_id = %peer_id, error = %e, "Dropping non-UTF-8 binary message"),
    }
}

#[track_caller]
fn connection_error(e: axum::Error) -> CoreError {
    CoreError::Connection {
        reason: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
