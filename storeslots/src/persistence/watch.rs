use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::{PersistenceError, PersistenceResult};

use super::ConfigEvent;

/// Live feed of configuration changes made by other editors of the same
/// store. Dropping all receivers does not close the socket; call
/// [`ConfigWatcher::disconnect`].
pub struct ConfigWatcher {
    events_tx: broadcast::Sender<ConfigEvent>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ConfigWatcher {
    pub async fn connect(ws_url: &str) -> PersistenceResult<Self> {
        let url = url::Url::parse(ws_url)
            .map_err(|e| PersistenceError::Network(format!("Invalid WS URL: {}", e)))?;

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| PersistenceError::Network(format!("WebSocket connect failed: {}", e)))?;

        let (mut ws_sink, mut ws_rx) = ws_stream.split();
        let (events_tx, _) = broadcast::channel::<ConfigEvent>(64);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let events = events_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = ws_rx.next() => match frame {
                        Some(Ok(Message::Text(text))) => match parse_event(&text) {
                            Some(event) => {
                                let _ = events.send(event);
                            }
                            None => log::debug!("watch: ignoring frame {}", text),
                        },
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    _ = shutdown_rx.recv() => {
                        let _ = ws_sink.close().await;
                        break;
                    }
                }
            }
            log::info!("watch: configuration event stream ended");
        });

        log::info!("watch: connected");
        Ok(Self {
            events_tx,
            shutdown_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events_tx.subscribe()
    }

    pub async fn disconnect(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

fn parse_event(text: &str) -> Option<ConfigEvent> {
    serde_json::from_str(text).ok()
}
