//! Pattern-based masking of emails and phone numbers in free text. Applied
//! to every string value a context builder sends out of the process.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

pub const EMAIL_MASK: &str = "[redacted-email]";
pub const PHONE_MASK: &str = "[redacted-phone]";

// A candidate phone match must carry this many digits; shorter runs are
// order numbers, years, quantities.
const MIN_PHONE_DIGITS: usize = 8;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\+?\(?\d[\d\s().-]{5,}\d").expect("phone pattern"))
}

/// Masks email addresses and phone numbers in one text value.
pub fn redact_text(text: &str) -> String {
    let masked = email_pattern().replace_all(text, EMAIL_MASK);
    phone_pattern()
        .replace_all(&masked, |captures: &regex::Captures| {
            let candidate = &captures[0];
            let digits = candidate.chars().filter(char::is_ascii_digit).count();
            if digits >= MIN_PHONE_DIGITS {
                PHONE_MASK.to_string()
            } else {
                candidate.to_string()
            }
        })
        .into_owned()
}

/// Recursively masks every string value in a JSON tree. Keys are field
/// names, not user data, and stay untouched.
pub fn redact_value(value: &mut Value) {
    match value {
        Value::String(text) => {
            let masked = redact_text(text);
            if masked != *text {
                *text = masked;
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        }
        Value::Object(fields) => {
            for (_, field) in fields.iter_mut() {
                redact_value(field);
            }
        }
        _ => {}
    }
}
