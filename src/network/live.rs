use futures_util::StreamExt;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::{EventSender, NetEvent, StreamEvent};
use crate::model::{decode_live_bytes, decode_live_frame, DecodeError, LiveFrame};
use crate::state::{Epoch, LiveHandle};

/// Handle to one live WebSocket session.
///
/// The session runs on its own task and reports every message as a
/// [`NetEvent::Live`] tagged with the epoch it was opened under. Closing only
/// signals the task; anything it already queued is filtered out by epoch.
pub struct LiveConnection {
    epoch: Epoch,
    cancel: Option<oneshot::Sender<()>>,
}

impl LiveConnection {
    /// Spawns the session task. Must be called inside a tokio runtime.
    pub fn open(url: Url, epoch: Epoch, events: EventSender) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(run_session(url, epoch, events, cancel_rx));
        Self {
            epoch,
            cancel: Some(cancel_tx),
        }
    }
}

impl LiveHandle for LiveConnection {
    fn close(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
            debug!(epoch = self.epoch.get(), "close requested");
        }
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_session(
    url: Url,
    epoch: Epoch,
    events: EventSender,
    mut cancel: oneshot::Receiver<()>,
) {
    let send = |event: StreamEvent| {
        let _ = events.send(NetEvent::Live { epoch, event });
    };

    let connected = tokio::select! {
        _ = &mut cancel => {
            debug!(epoch = epoch.get(), "cancelled before connecting");
            return;
        }
        result = connect_async(url.as_str()) => result,
    };
    let mut socket = match connected {
        Ok((socket, _response)) => socket,
        Err(err) => {
            warn!(%url, error = %err, "live channel connect failed");
            send(StreamEvent::Closed(Some(format!("could not connect to {url}: {err}"))));
            return;
        }
    };
    info!(%url, epoch = epoch.get(), "live channel connected");
    send(StreamEvent::Connected);

    loop {
        tokio::select! {
            _ = &mut cancel => {
                let _ = socket.close(None).await;
                debug!(epoch = epoch.get(), "live channel closed by viewer");
                return;
            }
            message = socket.next() => match message {
                Some(Ok(Message::Text(text))) => send(frame_event(decode_live_frame(&text))),
                Some(Ok(Message::Binary(bytes))) => send(frame_event(decode_live_bytes(&bytes))),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|frame| frame.reason.into_owned())
                        .filter(|reason| !reason.is_empty());
                    info!(epoch = epoch.get(), ?reason, "server closed live channel");
                    send(StreamEvent::Closed(reason));
                    return;
                }
                // ping, pong and raw frames
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(epoch = epoch.get(), error = %err, "live channel failed");
                    send(StreamEvent::Closed(Some(err.to_string())));
                    return;
                }
                None => {
                    send(StreamEvent::Closed(None));
                    return;
                }
            }
        }
    }
}

fn frame_event(decoded: Result<LiveFrame, DecodeError>) -> StreamEvent {
    match decoded {
        Ok(LiveFrame::Packet(record)) => StreamEvent::Packet(record),
        Ok(LiveFrame::ServerError { error }) => StreamEvent::ServerError(error),
        Err(err) => StreamEvent::Malformed(err.to_string()),
    }
}
