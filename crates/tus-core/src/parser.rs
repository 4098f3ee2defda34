//! Tolerant extraction of structured fields from the lookup bot's reply text.
//!
//! The bot's output is not a stable schema: it is human-readable text with
//! inline markdown (backtick code spans) and box-drawing list decorations.
//! Each field is searched independently so a missing or reordered line never
//! poisons the others. The alternative strategy (scan every backtick token once
//! and classify by digit-count) is cheaper but misclassifies tokens when the
//! layout shifts, so the label-anchored strategy is used throughout.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::ExtractedRecord;

// The emoji-prefixed variant ("📞 Phone Number:") contains the plain label, so
// one pattern covers both formats the bot emits.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Phone Number:\s*`(\+?\d+)`").expect("valid regex"));

// "Country Code:" does not match here: the label requires a colon directly
// after "Country".
static COUNTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Country:\s*([^\n`]+)").expect("valid regex"));

static COUNTRY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Country Code:\s*`(\+\d+)`").expect("valid regex"));

static QUERY_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Query ID:\s*`(\d+)`").expect("valid regex"));

/// Parse a lookup-result message into its structured fields.
///
/// Never fails: unmatched fields are simply absent, and empty or unrelated
/// input yields an empty record.
pub fn parse_bot_reply(text: &str) -> ExtractedRecord {
    let mut record = ExtractedRecord::default();

    if text.is_empty() {
        return record;
    }

    if let Some(caps) = PHONE_RE.captures(text) {
        record.phone_number = Some(caps[1].to_string());
    }

    if let Some(caps) = COUNTRY_RE.captures(text) {
        record.country = Some(clean_country(&caps[1]));
    }

    if let Some(caps) = COUNTRY_CODE_RE.captures(text) {
        record.country_code = Some(caps[1].to_string());
    }

    if let Some(caps) = QUERY_ID_RE.captures(text) {
        record.telegram_id = Some(caps[1].to_string());
    }

    record
}

/// Strip box-drawing continuation glyphs the bot appends after the country
/// name. They belong to the list rendering, not the value.
fn clean_country(raw: &str) -> String {
    let mut value = raw;
    for glyph in ['└', '├'] {
        if let Some(idx) = value.find(glyph) {
            value = &value[..idx];
        }
    }
    value.trim().to_string()
}
