use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::events::{
    parse_socket_frame, EventContext, EventDispatcher, SlackEnvelope, SlackEvent, SocketFrame,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket mode gave up after {attempts} consecutive failed connection attempts: {last}")]
    RetriesExhausted { attempts: u32, last: TransportError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 8, base_delay_ms: 250, max_delay_ms: 30_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// Next envelope, or `None` once the server has closed or asked to refresh the connection.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

enum SessionEnd {
    /// The server closed the stream; reconnect straight away.
    Closed,
    ConnectFailed(TransportError),
    /// The connection was up and then failed.
    Dropped(TransportError),
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher: Arc::new(dispatcher), reconnect_policy }
    }

    /// Pumps envelopes until connecting fails more than `max_retries` times in a row. Slack
    /// rotates Socket Mode connections routinely, so closed sessions are reopened without
    /// counting as failures.
    pub async fn start(&self) -> Result<(), SocketError> {
        let mut failures = 0_u32;

        loop {
            let error = match self.run_session(failures).await {
                SessionEnd::Closed => {
                    failures = 0;
                    continue;
                }
                SessionEnd::Dropped(error) => {
                    failures = 0;
                    error
                }
                SessionEnd::ConnectFailed(error) => {
                    failures += 1;
                    error
                }
            };

            warn!(
                attempt = failures,
                max_retries = self.reconnect_policy.max_retries,
                error = %error,
                "socket mode transport failed"
            );

            if failures > self.reconnect_policy.max_retries {
                return Err(SocketError::RetriesExhausted { attempts: failures, last: error });
            }

            let delay = self.reconnect_policy.backoff(failures.saturating_sub(1));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn run_session(&self, attempt: u32) -> SessionEnd {
        info!(attempt, "opening socket mode transport connection");
        if let Err(error) = self.transport.connect().await {
            return SessionEnd::ConnectFailed(error);
        }
        info!(attempt, "socket mode transport connected");

        match self.pump().await {
            Ok(()) => {
                if let Err(error) = self.transport.disconnect().await {
                    debug!(error = %error, "socket mode disconnect after close failed");
                }
                SessionEnd::Closed
            }
            Err(error) => SessionEnd::Dropped(error),
        }
    }

    async fn pump(&self) -> Result<(), TransportError> {
        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!("socket mode transport stream closed");
                return Ok(());
            };
            let (user_id, surface) = correlation_fields(&envelope);

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                user_id = user_id.unwrap_or("unknown"),
                surface = surface.unwrap_or("unknown"),
                "received slack envelope"
            );

            // Slack retries unacknowledged envelopes after three seconds, so ack before handling.
            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    "acknowledged slack envelope"
                );
            }

            // Handlers run detached so a slow lookup never delays reading and acking the next
            // envelope.
            let dispatcher = Arc::clone(&self.dispatcher);
            let user_id = user_id.unwrap_or("unknown").to_owned();
            tokio::spawn(async move {
                let context = EventContext { correlation_id: envelope.envelope_id.clone() };
                if let Err(error) = dispatcher.dispatch(&envelope, &context).await {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %envelope.envelope_id,
                        user_id = %user_id,
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
            });
        }
    }
}

/// Requesting user and the command, shortcut, view or action that triggered the envelope.
fn correlation_fields(envelope: &SlackEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        SlackEvent::SlashCommand(payload) => {
            (Some(payload.user_id.as_str()), Some(payload.command.as_str()))
        }
        SlackEvent::Shortcut(payload) => {
            (Some(payload.user_id.as_str()), Some(payload.callback_id.as_str()))
        }
        SlackEvent::ViewSubmission(event) => {
            (Some(event.user_id.as_str()), Some(event.callback_id.as_str()))
        }
        SlackEvent::BlockAction(event) => {
            (Some(event.user_id.as_str()), Some(event.action_id.as_str()))
        }
        SlackEvent::Unsupported { .. } => (None, None),
    }
}

type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Socket Mode over a real websocket. Each `connect` asks `apps.connections.open` for a fresh
/// single-use URL.
pub struct WebSocketTransport {
    client: Client,
    api_base_url: String,
    app_token: SecretString,
    stream: Mutex<Option<SocketStream>>,
}

impl WebSocketTransport {
    pub fn new(api_base_url: impl Into<String>, app_token: SecretString) -> Self {
        Self {
            client: Client::new(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_owned(),
            app_token,
            stream: Mutex::new(None),
        }
    }

    async fn open_connection_url(&self) -> Result<String, TransportError> {
        let response = self
            .client
            .post(format!("{}/apps.connections.open", self.api_base_url))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?
            .json::<ConnectionsOpenResponse>()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        match response {
            ConnectionsOpenResponse { ok: true, url: Some(url), .. } => Ok(url),
            ConnectionsOpenResponse { error, .. } => Err(TransportError::Connect(format!(
                "apps.connections.open failed: {}",
                error.unwrap_or_else(|| "missing url".to_owned())
            ))),
        }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self.open_connection_url().await?;
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Receive("not connected".to_owned()));
        };

        while let Some(message) = stream.next().await {
            let message = message.map_err(|error| TransportError::Receive(error.to_string()))?;
            let text = match message {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    debug!(?frame, "socket mode server closed the connection");
                    return Ok(None);
                }
                _ => continue,
            };

            match parse_socket_frame(&text) {
                Ok(SocketFrame::Hello) => debug!("socket mode hello received"),
                Ok(SocketFrame::Disconnect { reason }) => {
                    info!(reason = %reason, "socket mode server requested reconnect");
                    return Ok(None);
                }
                Ok(SocketFrame::Envelope(envelope)) => return Ok(Some(envelope)),
                Err(error) => warn!(error = %error, "skipping undecodable socket mode frame"),
            }
        }

        Ok(None)
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Acknowledge("not connected".to_owned()));
        };

        let ack = serde_json::json!({ "envelope_id": envelope_id }).to_string();
        stream
            .send(Message::Text(ack))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        stream.close(None).await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}
