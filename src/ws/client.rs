//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Outcome of one connection attempt
enum StreamEnd {
    /// Server closed the socket
    Closed,
    /// Consumer dropped the receiver
    ConsumerGone,
}

/// Read-only WebSocket client with reconnection and ping keepalive
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return a receiver for messages
    ///
    /// The background task ends once the receiver is dropped, which is how
    /// callers tear a subscription down.
    pub fn connect(&self) -> mpsc::Receiver<WsMessage> {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, tx).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        rx
    }

    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
    ) -> Result<(), WsError> {
        let mut attempts = 0;

        loop {
            match Self::connect_and_stream(&config, &tx).await {
                Ok(StreamEnd::ConsumerGone) => {
                    tracing::debug!(url = %config.url, "Stream consumer dropped, closing");
                    return Ok(());
                }
                Ok(StreamEnd::Closed) => {
                    tracing::info!(url = %config.url, "WebSocket closed by server");
                    attempts = 0;
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(error = %e, attempt = attempts, "WebSocket error, reconnecting");

                    if config.max_reconnect_attempts > 0 && attempts >= config.max_reconnect_attempts {
                        tracing::error!("Max reconnection attempts reached");
                        let _ = tx.send(WsMessage::Disconnected).await;
                        return Err(WsError::MaxReconnectsExceeded);
                    }
                }
            }

            if tx.is_closed() {
                return Ok(());
            }
            let _ = tx.send(WsMessage::Reconnecting { attempt: attempts }).await;
            sleep(config.backoff(attempts.max(1))).await;
        }
    }

    async fn connect_and_stream(
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
    ) -> Result<StreamEnd, WsError> {
        let (ws_stream, _response) = connect_async(config.url.as_str())
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        if tx.send(WsMessage::Connected).await.is_err() {
            return Ok(StreamEnd::ConsumerGone);
        }

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text.to_string())).await.is_err() {
                                let _ = write.send(Message::Close(None)).await;
                                return Ok(StreamEnd::ConsumerGone);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => waiting_for_pong = false,
                        Some(Ok(Message::Close(_))) => return Ok(StreamEnd::Closed),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(WsError::ConnectionFailed(e.to_string())),
                        None => return Err(WsError::ConnectionFailed("stream ended".into())),
                    }
                }
                _ = ping_interval.tick() => {
                    if waiting_for_pong {
                        return Err(WsError::ConnectionFailed("pong timeout".into()));
                    }
                    write.send(Message::Ping(Default::default())).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    waiting_for_pong = true;
                }
                _ = tx.closed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(StreamEnd::ConsumerGone);
                }
            }
        }
    }
}
