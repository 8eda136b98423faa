//! Streaming chat sessions.
//!
//! One [`SessionClient::ask`] call is one connection: connect with the access
//! token in the query string, send a single [`SessionRequest`], then pump
//! frames into an [`Exchange`] until it settles or the socket goes away.

pub mod event;
pub mod exchange;
pub mod request;

use crate::auth::CredentialStore;
use crate::config::ServiceConfig;
use crate::ui::channels::OutputChannels;
use crate::ui::user_messages;
use anyhow::{anyhow, Context, Result};
use exchange::{Exchange, Flow};
use futures::{SinkExt, StreamExt};
use request::{generate_session_id, SessionRequest};
use reqwest::Url;
use std::io::Write;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

const PLATFORM: &str = "WEB";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SessionClient {
    config: ServiceConfig,
    connect_timeout: Duration,
}

impl SessionClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `{ws_base}/muninn/v4/chat/sessions/{id}/ws?token=..&session_type=..&platform=WEB`
    pub fn session_url(&self, session_id: &str, access_token: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/muninn/v4/chat/sessions/{session_id}/ws",
            self.config.ws_base()
        ))
        .context("Invalid session URL")?;

        url.query_pairs_mut()
            .append_pair("token", access_token)
            .append_pair("session_type", self.config.session_type().as_ref())
            .append_pair("platform", PLATFORM);

        Ok(url)
    }

    /// Ask one question on a fresh session, printing the answer as it streams.
    pub async fn ask(&self, question: &str, credentials: &mut CredentialStore) -> Result<String> {
        let access_token = credentials.access_token().await?;
        let session_id = generate_session_id();
        self.exchange(question, &session_id, &access_token, OutputChannels::stdout())
            .await
    }

    /// Run one exchange over `channels`. Resolves with the assembled answer,
    /// or the transport error that ended the session first.
    pub async fn exchange<W: Write>(
        &self,
        question: &str,
        session_id: &str,
        access_token: &str,
        channels: OutputChannels<W>,
    ) -> Result<String> {
        let url = self.session_url(session_id, access_token)?;
        let mut exchange = Exchange::new(channels);

        debug!(session_id, session_type = %self.config.session_type(), "opening session");
        let mut ws = match tokio::time::timeout(self.connect_timeout, connect_async(url.as_str())).await {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                exchange.on_transport_error(anyhow::Error::new(e).context("WebSocket connection failed"));
                return exchange.finish();
            }
            Err(_) => {
                exchange.on_transport_error(anyhow!(
                    "WebSocket handshake timed out after {:?}",
                    self.connect_timeout
                ));
                return exchange.finish();
            }
        };

        exchange.on_open();
        user_messages::connection_open();

        let request = SessionRequest::new(question);
        let payload = serde_json::to_string(&request).context("Failed to serialize session request")?;
        if let Err(e) = ws.send(Message::text(payload)).await {
            exchange.on_transport_error(anyhow::Error::new(e).context("Failed to send session request"));
            return exchange.finish();
        }
        user_messages::request_sent();
        info!(request_id = request.request_id(), session_id, "question sent");

        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Close(close)) => {
                    debug!(?close, "server closed the session");
                    break;
                }
                Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                    let flow = match msg.to_text() {
                        Ok(text) => exchange.on_frame(text),
                        Err(e) => {
                            debug!("Skipping non UTF-8 frame: {e}");
                            Flow::Continue
                        }
                    };
                    if flow == Flow::Close {
                        if let Err(e) = ws.close(None).await {
                            debug!("Error while closing session: {e}");
                        }
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    exchange.on_transport_error(anyhow::Error::new(e).context("WebSocket error"));
                    break;
                }
            }
        }

        exchange.on_close();
        exchange.finish()
    }
}
