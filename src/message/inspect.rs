//! Read a built message back with `mail-parser` for reporting.

use mail_parser::{MessageParser, MimeHeaders};
use serde::Serialize;

use crate::error::{Result, SmokeError};

/// One attachment of a parsed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentSummary {
    pub filename: String,
    pub content_type: String,
    /// Decoded size in bytes.
    pub size: u64,
}

/// What a mail client would see in a message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub subject: Option<String>,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub date: Option<String>,
    pub message_id: Option<String>,
    /// Characters of the first text body.
    pub body_chars: usize,
    pub attachments: Vec<AttachmentSummary>,
    /// Size of the raw message in bytes.
    pub raw_size: u64,
}

/// Parse `raw` and summarize it.
pub fn summarize(raw: &[u8]) -> Result<MessageSummary> {
    let msg = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| SmokeError::InvalidSpec("built message could not be parsed".to_string()))?;

    let attachments = msg
        .attachments()
        .enumerate()
        .map(|(idx, part)| AttachmentSummary {
            filename: part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{idx}")),
            content_type: part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{sub}", ct.ctype()),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            size: part.contents().len() as u64,
        })
        .collect();

    Ok(MessageSummary {
        subject: msg.subject().map(String::from),
        from: addresses(msg.from()),
        to: addresses(msg.to()),
        date: msg.date().map(|d| d.to_rfc3339()),
        message_id: msg.message_id().map(String::from),
        body_chars: msg.body_text(0).map(|t| t.chars().count()).unwrap_or(0),
        attachments,
        raw_size: raw.len() as u64,
    })
}

fn addresses(list: Option<&mail_parser::Address<'_>>) -> Vec<String> {
    list.map(|address| {
        address
            .iter()
            .filter_map(|addr| addr.address().map(String::from))
            .collect()
    })
    .unwrap_or_default()
}
