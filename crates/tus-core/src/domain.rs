use chrono::{DateTime, Utc};
use serde::Serialize;

/// Caller-supplied lookup identifier: a non-empty all-digit string.
///
/// Validated once at the boundary; the rest of the core can rely on the shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inbound message from the target bot, as seen by the transport.
#[derive(Clone, Debug)]
pub struct BotReply {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Fields recovered from a lookup-result message. All optional: the bot's
/// output is scraped human-readable text, not a schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<String>,
}

impl ExtractedRecord {
    pub fn is_empty(&self) -> bool {
        self.phone_number.is_none()
            && self.country.is_none()
            && self.country_code.is_none()
            && self.telegram_id.is_none()
    }
}

/// Why an exchange did not produce a usable record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Send or fetch failed mid-exchange.
    Transport(String),
    /// No qualifying reply arrived within the poll budget.
    Timeout,
    /// A qualifying reply was found but its phone number was missing or merely
    /// echoed the query back.
    Mismatch,
}

impl FailureReason {
    /// Human-readable message for the HTTP error envelope.
    pub fn message(&self, partial: Option<&ExtractedRecord>) -> String {
        match self {
            FailureReason::Transport(msg) => msg.clone(),
            FailureReason::Timeout => "no data found this number".to_string(),
            FailureReason::Mismatch => {
                let phone = partial
                    .and_then(|r| r.phone_number.as_deref())
                    .unwrap_or("none");
                format!("Parsing issue. Phone: {phone}, Expected different from ID")
            }
        }
    }
}

/// Terminal outcome of one exchange.
///
/// Invariant: `Success` only when the record's phone number is present and
/// differs from the query (the bot sometimes echoes the query back first).
#[derive(Clone, Debug)]
pub enum ExchangeResult {
    Success {
        record: ExtractedRecord,
        query: Query,
    },
    Failure {
        reason: FailureReason,
        partial: Option<ExtractedRecord>,
    },
}

impl ExchangeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExchangeResult::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_accepts_digits_only() {
        assert!(Query::parse("123456").is_some());
        assert!(Query::parse("  42  ").is_some());
        assert!(Query::parse("").is_none());
        assert!(Query::parse("12a4").is_none());
        assert!(Query::parse("+123").is_none());
    }

    #[test]
    fn record_serializes_without_absent_fields() {
        let rec = ExtractedRecord {
            phone_number: Some("+15551234567".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["phone_number"], "+15551234567");
        assert!(json.get("country").is_none());
    }
}
