use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{domain::BotReply, Result};

/// Port onto the messaging transport holding the single authenticated session
/// to the target bot.
///
/// The adapter's constructor owns the whole session lifecycle: connect,
/// authorization check, and resolving the bot's username into a stable handle.
/// A constructed transport is therefore always bound to one bot contact, and
/// these are the only operations the correlation engine needs from it.
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Send a plain text message to the bot. Fire-and-forget: no reply is
    /// awaited.
    ///
    /// Returns the timestamp the transport assigned to the sent message, from
    /// the same clock that stamps inbound replies. Telegram serves message
    /// dates at whole-second resolution, so comparing a reply against a local
    /// sub-second clock would misjudge same-second arrivals.
    async fn send_text(&self, text: &str) -> Result<DateTime<Utc>>;

    /// Fetch the most recent messages in the conversation, newest first.
    /// Includes our own outgoing messages only if the transport cannot filter
    /// them; callers must not assume every entry is from the bot.
    async fn recent_messages(&self, limit: usize) -> Result<Vec<BotReply>>;

    /// Whether the underlying connection is believed live (drives `/status`).
    fn is_connected(&self) -> bool;
}
