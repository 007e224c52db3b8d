mod receiver;
mod relay;

pub(crate) use {
    receiver::{receiver_router, run_receiver},
    relay::{relay_router, run_relay},
};

use crate::{AppError, AppResult};

use std::{net::SocketAddr, panic::Location};

use error_location::ErrorLocation;
use tokio::net::TcpListener;

/// Bind on all interfaces so other machines on the network can connect.
async fn bind(port: u16) -> AppResult<(TcpListener, SocketAddr)> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::ServerError {
            reason: format!("Failed to bind {}: {}", addr, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok((listener, addr))
}
