use std::{env, net::SocketAddr, time::Duration};

use crate::{errors::Error, Result};

/// Fixed phrase that switches the remote bot into lookup mode.
const DEFAULT_TRIGGER_PHRASE: &str = "Us\u{1d07}\u{0280}\u{0274}\u{1d00}\u{1d0d}\u{1d07} \u{1d1b}\u{1d0f} \u{0274}\u{1d1c}\u{1d0d}";

/// Banner substring that identifies a lookup-result message.
const DEFAULT_REPLY_MARKER: &str = "User Information Lookup";

/// Typed configuration for the bridge, sourced from the environment.
///
/// Required values fail `load()` loudly; the process must not begin serving
/// with a partial credential set.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram credentials
    pub api_id: i32,
    pub api_hash: String,
    pub session_string: String,
    pub bot_username: String,

    // HTTP boundary
    pub api_key: String,
    pub bind_addr: SocketAddr,

    // Exchange protocol tunables
    pub trigger_phrase: String,
    pub reply_marker: String,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    pub poll_budget: Duration,
    pub fetch_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Best-effort .env support; real env always wins.
        let _ = dotenvy::dotenv();

        let api_id = require("API_ID")?
            .parse::<i32>()
            .map_err(|_| Error::Config("API_ID must be a number".to_string()))?;
        let api_hash = require("API_HASH")?;
        let session_string = require("SESSION_STRING")?;
        let bot_username = require("BOT_USERNAME")?;
        let api_key = require("API_KEY")?;

        let bind_addr = env_str("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("BIND_ADDR is not a socket address: {e}")))?;

        let trigger_phrase =
            env_str("TRIGGER_PHRASE").unwrap_or_else(|| DEFAULT_TRIGGER_PHRASE.to_string());
        let reply_marker =
            env_str("REPLY_MARKER").unwrap_or_else(|| DEFAULT_REPLY_MARKER.to_string());

        let settle_delay = Duration::from_millis(env_u64("SETTLE_DELAY_MS").unwrap_or(1_000));
        let poll_interval = Duration::from_millis(env_u64("POLL_INTERVAL_MS").unwrap_or(300));
        let poll_budget = Duration::from_millis(env_u64("POLL_BUDGET_MS").unwrap_or(3_000));
        let fetch_limit = env_usize("FETCH_LIMIT").unwrap_or(3).max(1);

        // The poll window must leave room for at least a couple of iterations,
        // otherwise every exchange times out by construction.
        if poll_budget < poll_interval * 2 {
            return Err(Error::Config(
                "POLL_BUDGET_MS must be at least twice POLL_INTERVAL_MS".to_string(),
            ));
        }

        Ok(Self {
            api_id,
            api_hash,
            session_string,
            bot_username,
            api_key,
            bind_addr,
            trigger_phrase,
            reply_marker,
            settle_delay,
            poll_interval,
            poll_budget,
            fetch_limit,
        })
    }
}

fn require(key: &str) -> Result<String> {
    env_str(key)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_empty)
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trigger_phrase_is_the_small_caps_command() {
        // The remote bot only reacts to this exact small-caps rendering.
        assert_eq!(DEFAULT_TRIGGER_PHRASE, "Usᴇʀɴᴀᴍᴇ ᴛᴏ ɴᴜᴍ");
    }
}
