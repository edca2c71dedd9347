// src/memory/redaction.rs
// PII redaction (§4.2.1 step 5): emails, phone numbers, credit-card-shaped
// digit runs, and long hex/keys are replaced with placeholder tokens before
// a memory is ever written. The redaction map allows server-side reversal
// only — it is never logged and never leaves this process.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap();
    static ref PHONE_RE: Regex =
        Regex::new(r"\b(?:\+?\d{1,2}[ .-]?)?\(?\d{3}\)?[ .-]?\d{3}[ .-]?\d{4}\b").unwrap();
    static ref CARD_RE: Regex = Regex::new(r"\b(?:\d[ -]*?){13,19}\b").unwrap();
    static ref HEX_KEY_RE: Regex = Regex::new(r"\b[0-9a-fA-F]{24,}\b").unwrap();
}

pub struct RedactionResult {
    pub redacted_content: String,
    /// `None` when nothing needed redacting — avoids persisting an empty map.
    pub redaction_map: Option<Value>,
}

/// Redacts PII in `content`, returning the sanitized text plus a reversible
/// map of placeholder -> original value.
pub fn redact(content: &str) -> RedactionResult {
    let mut working = content.to_string();
    let mut map = serde_json::Map::new();
    let mut counter = 0usize;

    working = replace_all(&EMAIL_RE, &working, "EMAIL", &mut map, &mut counter);
    working = replace_all(&PHONE_RE, &working, "PHONE", &mut map, &mut counter);
    working = replace_all(&CARD_RE, &working, "CARD", &mut map, &mut counter);
    working = replace_all(&HEX_KEY_RE, &working, "KEY", &mut map, &mut counter);

    RedactionResult {
        redacted_content: working,
        redaction_map: if map.is_empty() { None } else { Some(json!(map)) },
    }
}

fn replace_all(
    re: &Regex,
    text: &str,
    label: &str,
    map: &mut serde_json::Map<String, Value>,
    counter: &mut usize,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;

    for m in re.find_iter(text) {
        out.push_str(&text[last_end..m.start()]);
        *counter += 1;
        let placeholder = format!("[REDACTED_{label}_{counter}]");
        map.insert(placeholder.clone(), json!(m.as_str()));
        out.push_str(&placeholder);
        last_end = m.end();
    }
    out.push_str(&text[last_end..]);
    out
}

/// Reverses a redaction, for server-side-only consumers (e.g. an owning
/// user's explicit export or a support tool). Never called on the recall
/// path that feeds the LLM.
pub fn unredact(content: &str, map: &Value) -> String {
    let Some(obj) = map.as_object() else {
        return content.to_string();
    };

    let mut out = content.to_string();
    for (placeholder, original) in obj {
        if let Some(original) = original.as_str() {
            out = out.replace(placeholder.as_str(), original);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_email_address() {
        let result = redact("reach me at ada@example.com please");
        assert!(!result.redacted_content.contains("ada@example.com"));
        assert!(result.redaction_map.is_some());
    }

    #[test]
    fn redacts_phone_number() {
        let result = redact("call 555-123-4567 tomorrow");
        assert!(!result.redacted_content.contains("555-123-4567"));
    }

    #[test]
    fn redacts_card_shaped_digits() {
        let result = redact("card 4111 1111 1111 1111 expires soon");
        assert!(!result.redacted_content.contains("4111 1111 1111 1111"));
    }

    #[test]
    fn leaves_clean_text_untouched_with_no_map() {
        let result = redact("I prefer dark mode and tabs over spaces");
        assert_eq!(result.redacted_content, "I prefer dark mode and tabs over spaces");
        assert!(result.redaction_map.is_none());
    }

    #[test]
    fn round_trips_through_unredact() {
        let original = "email ada@example.com now";
        let result = redact(original);
        let map = result.redaction_map.unwrap();
        let restored = unredact(&result.redacted_content, &map);
        assert_eq!(restored, original);
    }
}
