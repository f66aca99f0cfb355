//! WebSocket adapter for the ElevenLabs Conversational AI endpoint.
//!
//! Opens `wss://api.elevenlabs.io/v1/convai/conversation?agent_id=…` and
//! forwards every JSON text frame as a [`ChannelEvent::Message`], leaving
//! shape interpretation to the normalizer. Protocol pings are answered
//! inline so the provider keeps the session alive.

use super::{ChannelEvent, ChannelHandle, ChannelSession, VoiceChannel};
use crate::error::{EchoError, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default ConvAI WebSocket endpoint.
pub const DEFAULT_API_URL: &str = "wss://api.elevenlabs.io/v1/convai/conversation";

/// Inbound event channel capacity.
const EVENT_CHANNEL_SIZE: usize = 64;

/// A [`VoiceChannel`] backed by the ElevenLabs ConvAI WebSocket API.
pub struct ElevenLabsChannel {
    api_url: String,
}

impl ElevenLabsChannel {
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }
}

impl Default for ElevenLabsChannel {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[async_trait]
impl VoiceChannel for ElevenLabsChannel {
    async fn open(&self, agent_id: &str) -> Result<ChannelSession> {
        let url = session_url(&self.api_url, agent_id)?;
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| EchoError::Connection(e.to_string()))?;
        info!(agent_id, "voice channel socket established");

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            run_socket(stream, events_tx, task_cancel).await;
        });

        Ok(ChannelSession {
            events: events_rx,
            handle: Box::new(SocketHandle { cancel }),
        })
    }
}

/// Closes the socket by cancelling its reader task.
struct SocketHandle {
    cancel: CancellationToken,
}

#[async_trait]
impl ChannelHandle for SocketHandle {
    async fn close(&self) -> Result<()> {
        self.cancel.cancel();
        Ok(())
    }
}

fn session_url(api_url: &str, agent_id: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(api_url)
        .map_err(|e| EchoError::Config(format!("invalid voice API URL '{api_url}': {e}")))?;
    url.query_pairs_mut().append_pair("agent_id", agent_id);
    Ok(url)
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Reader loop: drains the socket into the event channel in arrival order.
async fn run_socket(
    stream: WsStream,
    events_tx: mpsc::Sender<ChannelEvent>,
    cancel: CancellationToken,
) {
    let (mut write, mut read) = stream.split();

    // The socket handshake succeeded; the session is live.
    if events_tx.send(ChannelEvent::Connected).await.is_err() {
        return;
    }

    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => {
                let _ = write.send(WsMessage::Close(None)).await;
                debug!("voice channel closed by local request");
                return;
            }
            frame = read.next() => frame,
        };

        match frame {
            Some(Ok(WsMessage::Text(text))) => {
                let payload: Value = match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(error = %e, "non-JSON text frame on voice channel");
                        continue;
                    }
                };
                if let Some(pong) = ping_reply(&payload) {
                    if let Err(e) = write.send(WsMessage::text(pong.to_string())).await {
                        warn!(error = %e, "failed to answer voice channel ping");
                    }
                    continue;
                }
                if events_tx.send(ChannelEvent::Message(payload)).await.is_err() {
                    return;
                }
            }
            Some(Ok(WsMessage::Close(_))) | None => {
                info!("voice channel closed by provider");
                let _ = events_tx.send(ChannelEvent::Disconnected).await;
                return;
            }
            Some(Ok(_)) => {
                // Binary/ping/pong frames carry no conversation payload.
                continue;
            }
            Some(Err(e)) => {
                warn!(error = %e, "voice channel transport error");
                let _ = events_tx.send(ChannelEvent::Error(e.to_string())).await;
                return;
            }
        }
    }
}

/// Builds the pong payload for a ConvAI protocol ping, if `payload` is one.
fn ping_reply(payload: &Value) -> Option<Value> {
    if payload.get("type").and_then(Value::as_str) != Some("ping") {
        return None;
    }
    let event_id = payload.get("ping_event").and_then(|e| e.get("event_id"));
    Some(json!({
        "type": "pong",
        "event_id": event_id.cloned().unwrap_or(Value::Null),
    }))
}
