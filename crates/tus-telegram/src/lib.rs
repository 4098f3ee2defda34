//! Telegram transport adapter (grammers, MTProto user session).
//!
//! Implements the `tus-core` BotTransport port over a real user account: the
//! lookup bot only talks to users, so a plain Bot API token cannot drive it.
//! The session credential is a base64-encoded grammers session blob supplied
//! via configuration; interactive login is out of scope.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use grammers_client::{Client, Config as ClientConfig, InitParams};
use grammers_session::{PackedChat, Session};
use tracing::info;

use tus_core::{
    config::Config,
    domain::BotReply,
    errors::Error,
    transport::BotTransport,
    Result,
};

/// The single live authenticated session plus the resolved bot handle.
pub struct TelegramTransport {
    client: Client,
    bot: PackedChat,
    connected: AtomicBool,
}

impl TelegramTransport {
    /// Connect, verify the held credential is authorized, and resolve the
    /// target bot's username into a stable handle.
    ///
    /// Failure here is fatal to readiness: the caller should serve in an
    /// unready state rather than attempt doomed exchanges.
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let session_bytes = BASE64
            .decode(cfg.session_string.trim())
            .map_err(|e| Error::Config(format!("SESSION_STRING is not valid base64: {e}")))?;
        let session = Session::load(&session_bytes)
            .map_err(|e| Error::Config(format!("SESSION_STRING does not decode: {e}")))?;

        let client = Client::connect(ClientConfig {
            session,
            api_id: cfg.api_id,
            api_hash: cfg.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| Error::Connection(format!("telegram connect failed: {e}")))?;

        let authorized = client
            .is_authorized()
            .await
            .map_err(|e| Error::Connection(format!("authorization check failed: {e}")))?;
        if !authorized {
            return Err(Error::Connection("session not authorized".to_string()));
        }

        let chat = client
            .resolve_username(&cfg.bot_username)
            .await
            .map_err(|e| Error::Connection(format!("resolving {} failed: {e}", cfg.bot_username)))?
            .ok_or_else(|| {
                Error::Connection(format!("no such bot username: {}", cfg.bot_username))
            })?;

        info!("connected to @{}", cfg.bot_username);

        Ok(Self {
            bot: chat.pack(),
            client,
            connected: AtomicBool::new(true),
        })
    }

    fn track<T>(&self, res: std::result::Result<T, impl std::fmt::Display>) -> Result<T> {
        match res {
            Ok(v) => {
                self.connected.store(true, Ordering::Relaxed);
                Ok(v)
            }
            Err(e) => {
                self.connected.store(false, Ordering::Relaxed);
                Err(Error::Transport(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl BotTransport for TelegramTransport {
    async fn send_text(&self, text: &str) -> Result<DateTime<Utc>> {
        let message = self.track(self.client.send_message(self.bot, text).await)?;
        // Server-assigned date, same clock and resolution as inbound replies.
        Ok(message.date())
    }

    async fn recent_messages(&self, limit: usize) -> Result<Vec<BotReply>> {
        let mut iter = self.client.iter_messages(self.bot).limit(limit);
        let mut replies = Vec::with_capacity(limit);

        // Newest first. Our own outgoing messages (the trigger and the query)
        // share the conversation, so skip them here.
        while let Some(message) = self.track(iter.next().await)? {
            if message.outgoing() {
                continue;
            }
            replies.push(BotReply {
                text: message.text().to_string(),
                received_at: message.date(),
            });
        }

        Ok(replies)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
