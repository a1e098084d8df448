//! Scrub credentials from tool parameters before they are logged.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

const REDACTED: &str = "[REDACTED]";
const SENSITIVE_SUBSTRINGS: &[&str] = &["token", "secret", "password", "authorization"];

/// Slack bot, user, app and refresh tokens.
static SLACK_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xox[abpre]-[A-Za-z0-9-]+").expect("token pattern is valid"));

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

fn redact_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => redact_object(map),
        Value::Array(items) => items.iter_mut().for_each(redact_in_place),
        Value::String(s) if SLACK_TOKEN_RE.is_match(s.as_str()) => {
            *s = SLACK_TOKEN_RE.replace_all(s.as_str(), REDACTED).into_owned();
        }
        _ => {}
    }
}

fn redact_object(map: &mut Map<String, Value>) {
    for (key, val) in map {
        if is_sensitive_key(key) && !val.is_null() {
            *val = Value::String(REDACTED.to_string());
        } else {
            redact_in_place(val);
        }
    }
}

/// Copy of `value` with sensitive keys and embedded Slack tokens replaced.
pub fn redact_sensitive_json(value: &Value) -> Value {
    let mut cloned = value.clone();
    redact_in_place(&mut cloned);
    cloned
}
