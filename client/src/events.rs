use crate::{Error, Result};
use flipboard_types::api::BetEvent;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::{tungstenite::Message, WebSocketStream};
use tracing::{debug, error};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Stream of bet events from the WebSocket connection
pub struct Stream {
    receiver: mpsc::Receiver<Result<BetEvent>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Drop for Stream {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

impl Stream {
    pub(crate) fn new<S>(mut ws: WebSocketStream<S>) -> Self
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);

        let handle = tokio::spawn(async move {
            while let Some(msg) = ws.next().await {
                match msg {
                    Ok(Message::Text(data)) => {
                        debug!("received event message: {} bytes", data.len());
                        match serde_json::from_str::<BetEvent>(&data) {
                            Ok(event) => {
                                if tx.send(Ok(event)).await.is_err() {
                                    break; // Receiver dropped
                                }
                            }
                            Err(err) => {
                                error!("failed to decode event: {err}");
                                if tx.send(Err(Error::InvalidData(err))).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("WebSocket closed");
                        let _ = tx.send(Err(Error::ConnectionClosed)).await;
                        break;
                    }
                    Ok(_) => {} // Ignore other message types
                    Err(err) => {
                        error!("WebSocket error: {err}");
                        let _ = tx.send(Err(Error::Tungstenite(err))).await;
                        break;
                    }
                }
            }
        });

        Self {
            receiver: rx,
            _handle: handle,
        }
    }

    /// Next event, or `None` once the connection is finished.
    pub async fn next(&mut self) -> Option<Result<BetEvent>> {
        self.receiver.recv().await
    }
}
