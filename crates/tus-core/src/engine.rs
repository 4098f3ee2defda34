//! The send-then-poll exchange with the lookup bot.
//!
//! The remote protocol has no request id: a reply is recognized purely by a
//! banner substring in recent messages. Two disciplines keep that sound:
//! - exchanges are single-flight (a `tokio::sync::Mutex` held for the whole
//!   run), so concurrent HTTP callers queue instead of reading each other's
//!   replies;
//! - replies that arrived before this exchange's query was sent are skipped,
//!   so a late reply to a previously timed-out exchange is never consumed.

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::{
    config::Config,
    domain::{ExchangeResult, ExtractedRecord, FailureReason, Query},
    parser::parse_bot_reply,
    transport::BotTransport,
    Result,
};

/// Tunables for one exchange. The cadence constants are not protocol-mandated,
/// but the settle delay plus a few poll iterations must fit inside the budget.
#[derive(Clone, Debug)]
pub struct ExchangeOptions {
    pub trigger_phrase: String,
    pub reply_marker: String,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    pub poll_budget: Duration,
    pub fetch_limit: usize,
}

impl ExchangeOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            trigger_phrase: cfg.trigger_phrase.clone(),
            reply_marker: cfg.reply_marker.clone(),
            settle_delay: cfg.settle_delay,
            poll_interval: cfg.poll_interval,
            poll_budget: cfg.poll_budget,
            fetch_limit: cfg.fetch_limit,
        }
    }
}

/// Orchestrates one trigger→query→poll→parse run per caller.
pub struct CorrelationEngine {
    transport: Arc<dyn BotTransport>,
    opts: ExchangeOptions,
    flight: Mutex<()>,
}

impl CorrelationEngine {
    pub fn new(transport: Arc<dyn BotTransport>, opts: ExchangeOptions) -> Self {
        Self {
            transport,
            opts,
            flight: Mutex::new(()),
        }
    }

    /// Run one exchange for `query`.
    ///
    /// Never returns an error: transport failures mid-exchange fold into
    /// `Failure { reason: Transport }` so nothing unhandled crosses into the
    /// HTTP layer.
    pub async fn exchange(&self, query: &Query) -> ExchangeResult {
        let _flight = self.flight.lock().await;

        match self.run(query).await {
            Ok(result) => result,
            Err(e) => {
                warn!("exchange for {query} aborted: {e}");
                ExchangeResult::Failure {
                    reason: FailureReason::Transport(e.to_string()),
                    partial: None,
                }
            }
        }
    }

    async fn run(&self, query: &Query) -> Result<ExchangeResult> {
        // Step 1: switch the bot into lookup mode. No reply is awaited; the
        // settle delay is the bot's own processing latency, not a correctness
        // mechanism.
        self.transport.send_text(&self.opts.trigger_phrase).await?;
        sleep(self.opts.settle_delay).await;

        // Step 2: the query itself. Replies stamped before the query message
        // belong to some earlier exchange and must not be matched. The
        // watermark is the transport's own timestamp for the sent message, so
        // it lives on the same clock (and at the same resolution) as the
        // reply dates it is compared against.
        let sent_at = self.transport.send_text(query.as_str()).await?;

        let deadline = Instant::now() + self.opts.poll_budget;
        loop {
            let replies = self.transport.recent_messages(self.opts.fetch_limit).await?;
            for reply in replies {
                if reply.received_at < sent_at {
                    continue;
                }
                if !reply.text.contains(&self.opts.reply_marker) {
                    continue;
                }
                // First qualifying reply decides the exchange either way;
                // polling past a matched-but-invalid message would only ever
                // find staler data.
                debug!("qualifying reply for {query} after {:?}", sent_at);
                let record = parse_bot_reply(&reply.text);
                return Ok(validate(record, query));
            }

            if Instant::now() >= deadline {
                return Ok(ExchangeResult::Failure {
                    reason: FailureReason::Timeout,
                    partial: None,
                });
            }
            sleep(self.opts.poll_interval).await;
        }
    }
}

/// A qualifying reply is only a success if it carries a phone number distinct
/// from the query: the bot sometimes echoes the queried id back before the
/// real answer arrives.
fn validate(record: ExtractedRecord, query: &Query) -> ExchangeResult {
    match record.phone_number.as_deref() {
        Some(phone) if phone != query.as_str() => ExchangeResult::Success {
            record,
            query: query.clone(),
        },
        _ => ExchangeResult::Failure {
            reason: FailureReason::Mismatch,
            partial: Some(record),
        },
    }
}
