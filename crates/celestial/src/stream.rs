//! Stream mode: live camera frames pushed to the relay as `video-chunk`s.

use crate::{
    AppError, AppResult,
    config::{CameraConfig, StreamConfig},
    shutdown::shutdown_signal,
};

use celestial_core::{ClientMessage, CoreError, CoreResult, FfmpegCamera, FrameFeed};

use std::{future::Future, panic::Location};

use chrono::Utc;
use error_location::ErrorLocation;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, info, instrument, warn};

/// Stream the camera to the relay until a shutdown signal or the feed ends.
#[instrument(skip_all, fields(relay_url = %config.relay_url, fps = config.fps))]
pub(crate) async fn run_stream(camera: &CameraConfig, config: &StreamConfig) -> AppResult<()> {
    let feed = FfmpegCamera::new(camera.camera_config())
        .open_feed(config.fps)
        .await?;

    let sent = publish(&config.relay_url, feed_frames(feed), shutdown_signal()).await?;

    info!(frames_sent = sent, "Live stream finished");

    Ok(())
}

/// Frames from `feed` until it ends. The encoder is killed when the stream
/// is dropped.
pub(crate) fn feed_frames(feed: FrameFeed) -> impl Stream<Item = CoreResult<Vec<u8>>> {
    futures::stream::unfold(feed, |mut feed| async move {
        match feed.next_frame().await {
            Ok(Some(frame)) => Some((Ok(frame), feed)),
            Ok(None) => None,
            Err(e) => Some((Err(e), feed)),
        }
    })
}

/// Announce a stream on the relay at `relay_url`, send every frame as a
/// `video-chunk` with ids counting up from 1, then announce the stop.
///
/// Ends when `frames` ends or `shutdown` completes and returns the number of
/// frames sent. `stream-stop` is attempted even after a failure.
pub(crate) async fn publish<S>(
    relay_url: &str,
    frames: S,
    shutdown: impl Future<Output = ()>,
) -> AppResult<u64>
where
    S: Stream<Item = CoreResult<Vec<u8>>>,
{
    let (socket, _) = connect_async(relay_url).await.map_err(connection_error)?;
    let (mut sink, mut incoming) = socket.split();

    info!(relay_url, "Connected to relay");

    tokio::pin!(frames);
    tokio::pin!(shutdown);

    send(&mut sink, &ClientMessage::stream_start(Utc::now())).await?;

    let mut sent: u64 = 0;
    let result = loop {
        tokio::select! {
            () = &mut shutdown => break Ok(()),

            frame = frames.next() => match frame {
                Some(Ok(jpeg)) => {
                    let chunk = ClientMessage::video_chunk(&jpeg, sent + 1, Utc::now());
                    if let Err(e) = send(&mut sink, &chunk).await {
                        break Err(e);
                    }
                    sent += 1;
                }
                Some(Err(e)) => break Err(AppError::from(e)),
                None => {
                    info!("Camera feed ended");
                    break Ok(());
                }
            },

            message = incoming.next() => match message {
                Some(Ok(Message::Text(text))) => debug!(bytes = text.len(), "Relay message"),
                Some(Ok(Message::Close(_))) | None => {
                    break Err(AppError::from(CoreError::Connection {
                        reason: "Relay closed the connection".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    }));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(connection_error(e)),
            },
        }
    };

    if let Err(e) = send(&mut sink, &ClientMessage::stream_stop(Utc::now())).await {
        warn!(error = %e, "Failed to announce stream stop");
    }
    let _ = sink.close().await;

    result.map(|()| sent)
}

async fn send<S>(sink: &mut S, message: &ClientMessage) -> AppResult<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let json = message.to_json()?;
    sink.send(Message::text(json)).await.map_err(connection_error)
}

#[track_caller]
fn connection_error(e: WsError) -> AppError {
    AppError::from(CoreError::Connection {
        reason: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}
