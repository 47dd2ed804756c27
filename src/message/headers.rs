//! Header encoding (RFC 2047), header validation and `Date` parsing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::error::{Result, SmokeError};

/// Longest UTF-8 payload per encoded word; keeps each word under 76 columns.
const MAX_WORD_BYTES: usize = 45;

/// Encode `text` as one or more `=?UTF-8?B?...?=` words.
///
/// Long input is split on character boundaries and the words are joined
/// with folding whitespace.
pub fn encode_word(text: &str) -> String {
    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (idx, ch) in text.char_indices() {
        let next = idx + ch.len_utf8();
        if next - start > MAX_WORD_BYTES && end > start {
            words.push(&text[start..end]);
            start = end;
        }
        end = next;
    }
    if end > start || words.is_empty() {
        words.push(&text[start..end]);
    }

    words
        .into_iter()
        .map(|chunk| format!("=?UTF-8?B?{}?=", STANDARD.encode(chunk.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

/// Encode an unstructured header value (e.g. `Subject`).
///
/// Plain ASCII passes through unchanged.
pub fn encode_text(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        encode_word(value)
    }
}

/// Check that `name` is a legal header field name (RFC 5322 §2.2).
pub fn validate_name(name: &str) -> Result<()> {
    let legal = !name.is_empty()
        && name
            .bytes()
            .all(|b| (33..=126).contains(&b) && b != b':');
    if legal {
        Ok(())
    } else {
        Err(SmokeError::InvalidHeader {
            name: name.to_string(),
            reason: "header names must be printable ASCII without ':' or spaces".to_string(),
        })
    }
}

/// Reject values that would break out of their header line.
pub fn validate_value(name: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(SmokeError::InvalidHeader {
            name: name.to_string(),
            reason: "value contains a line break".to_string(),
        });
    }
    Ok(())
}

/// Parse a date string in any of the common mail formats.
///
/// Supports RFC 2822, RFC 3339, a few looser layouts and named time zones.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let no_dow = strip_day_of_week(trimmed);
    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    for candidate in [no_dow.clone(), replace_named_tz(&no_dow)] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
                return Some(Utc.from_utc_datetime(&ndt));
            }
        }
    }

    if let Ok(day) = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|ndt| Utc.from_utc_datetime(&ndt));
    }

    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Last resort: let `mail-parser` read the value as a `Date:` header.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    let wrapped = format!("Date: {input}\n\n");
    let parsed = mail_parser::MessageParser::default().parse(wrapped.as_bytes())?;
    let rfc3339 = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&rfc3339)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn strip_day_of_week(s: &str) -> String {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in DAYS {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim_start_matches(',').trim().to_string();
        }
    }
    s.to_string()
}

fn replace_named_tz(s: &str) -> String {
    const ZONES: [(&str, &str); 13] = [
        ("CEST", "+0200"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    for (name, offset) in ZONES {
        if let Some(rest) = s.strip_suffix(name) {
            return format!("{rest}{offset}");
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_word_roundtrips_through_mail_parser() {
        let encoded = encode_word("Informe trimestral: café ☕");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        let raw = format!("Subject: {encoded}\r\n\r\n");
        let parsed = mail_parser::MessageParser::default()
            .parse(raw.as_bytes())
            .unwrap();
        assert_eq!(parsed.subject(), Some("Informe trimestral: café ☕"));
    }

    #[test]
    fn test_encode_word_splits_long_text() {
        let long = "ü".repeat(100);
        let encoded = encode_word(&long);
        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        assert!(words.iter().all(|w| w.len() <= 75));
    }

    #[test]
    fn test_encode_text_passes_ascii_through() {
        assert_eq!(encode_text("Plain subject"), "Plain subject");
        assert_ne!(encode_text("Grüße"), "Grüße");
    }

    #[test]
    fn test_validate_name_and_value() {
        assert!(validate_name("X-Smoke-Test").is_ok());
        assert!(validate_name("Bad Name").is_err());
        assert!(validate_name("Bad:Name").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_value("X-A", "fine").is_ok());
        assert!(validate_value("X-A", "line\r\nBcc: evil@example.com").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        for input in [
            "Thu, 04 Jan 2024 10:00:00 +0000",
            "04 Jan 2024 10:00:00 +0000",
            "Thu, 04 Jan 2024 10:00:00 EST",
            "2024-01-04T10:00:00Z",
            "2024-01-04 10:00:00",
            "2024-01-04",
        ] {
            let dt = parse_date(input).unwrap_or_else(|| panic!("failed on {input}"));
            assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-04");
        }
    }

    #[test]
    fn test_parse_date_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("not a date at all").is_none());
    }
}
