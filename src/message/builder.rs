//! Assemble a `multipart/mixed` RFC 5322 message from a [`Spec`].

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info};

use crate::error::{Result, SmokeError};
use crate::message::headers::{encode_text, encode_word, parse_date, validate_name, validate_value};
use crate::model::address::EmailAddress;
use crate::parser::spec::Spec;

const CRLF: &str = "\r\n";

/// Base64 line length (RFC 2045 §6.8).
const BASE64_LINE: usize = 76;

/// RFC 5322 hard limit on line length, excluding CRLF.
const MAX_LINE: usize = 998;

/// Headers the builder writes itself; a spec cannot set them as extras.
const RESERVED: &[&str] = &[
    "from",
    "to",
    "cc",
    "bcc",
    "reply-to",
    "subject",
    "date",
    "message-id",
    "mime-version",
    "content-type",
    "content-transfer-encoding",
];

/// Knobs for [`build_message`].
#[derive(Debug, Clone)]
pub struct MessageOptions {
    /// Right-hand side of generated Message-IDs.
    pub domain: String,
}

impl Default for MessageOptions {
    fn default() -> Self {
        Self {
            domain: "mailsmoke.local".to_string(),
        }
    }
}

/// Build the raw bytes of the message described by `spec`.
pub fn build_message(spec: &Spec, options: &MessageOptions) -> Result<Vec<u8>> {
    let headers = &spec.headers;
    let mut out = String::new();

    if let Some(from) = &headers.from {
        let from = EmailAddress::parse("From", from)?;
        push_header(&mut out, "From", &from.to_header());
    }
    for (name, values) in [("To", &headers.to), ("Cc", &headers.cc), ("Bcc", &headers.bcc)] {
        let mut list = Vec::new();
        for value in values {
            list.extend(EmailAddress::parse_list(name, value)?);
        }
        if !list.is_empty() {
            let joined = list
                .iter()
                .map(EmailAddress::to_header)
                .collect::<Vec<_>>()
                .join(", ");
            push_header(&mut out, name, &joined);
        }
    }
    if let Some(reply_to) = &headers.reply_to {
        let reply_to = EmailAddress::parse("Reply-To", reply_to)?;
        push_header(&mut out, "Reply-To", &reply_to.to_header());
    }
    if let Some(subject) = &headers.subject {
        validate_value("Subject", subject)?;
        push_header(&mut out, "Subject", &encode_text(subject));
    }

    let date = match &headers.date {
        Some(raw) => parse_date(raw).ok_or_else(|| SmokeError::InvalidHeader {
            name: "Date".to_string(),
            reason: format!("'{raw}' is not a recognized date"),
        })?,
        None => chrono::Utc::now(),
    };
    push_header(&mut out, "Date", &date.to_rfc2822());

    let message_id = match &headers.message_id {
        Some(id) => {
            validate_value("Message-ID", id)?;
            let id = id.trim().trim_start_matches('<').trim_end_matches('>');
            format!("<{id}>")
        }
        None => format!("<{}@{}>", uuid::Uuid::new_v4(), options.domain),
    };
    push_header(&mut out, "Message-ID", &message_id);

    for (name, value) in &headers.extra {
        validate_name(name)?;
        if RESERVED.contains(&name.to_ascii_lowercase().as_str()) {
            return Err(SmokeError::InvalidHeader {
                name: name.clone(),
                reason: "this header is generated and cannot be overridden".to_string(),
            });
        }
        let value = value.to_string();
        validate_value(name, &value)?;
        push_header(&mut out, name, &encode_text(&value));
    }

    let boundary = format!("----=_Part_{}", uuid::Uuid::new_v4().simple());
    push_header(&mut out, "MIME-Version", "1.0");
    push_header(
        &mut out,
        "Content-Type",
        &format!("multipart/mixed; boundary=\"{boundary}\""),
    );
    out.push_str(CRLF);
    out.push_str("This is a multi-part message in MIME format.");
    out.push_str(CRLF);

    out.push_str(&format!("--{boundary}{CRLF}"));
    write_text_part(&mut out, &spec.body);

    let mut attached_bytes = 0usize;
    for path in &spec.attach {
        out.push_str(&format!("--{boundary}{CRLF}"));
        attached_bytes += write_attachment_part(&mut out, path)?;
    }
    out.push_str(&format!("--{boundary}--{CRLF}"));

    info!(
        message_id = %message_id,
        attachments = spec.attach.len(),
        attached_bytes,
        "Built message"
    );
    Ok(out.into_bytes())
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str(CRLF);
}

fn write_text_part(out: &mut String, body: &str) {
    let normalized = body.replace("\r\n", "\n");
    let seven_bit = normalized.is_ascii() && normalized.lines().all(|l| l.len() <= MAX_LINE);

    if seven_bit {
        out.push_str("Content-Type: text/plain; charset=us-ascii");
        out.push_str(CRLF);
        out.push_str("Content-Transfer-Encoding: 7bit");
        out.push_str(CRLF);
        out.push_str(CRLF);
        for line in normalized.lines() {
            out.push_str(line);
            out.push_str(CRLF);
        }
    } else {
        out.push_str("Content-Type: text/plain; charset=utf-8");
        out.push_str(CRLF);
        out.push_str("Content-Transfer-Encoding: base64");
        out.push_str(CRLF);
        out.push_str(CRLF);
        push_base64(out, normalized.replace('\n', CRLF).as_bytes());
    }
}

/// Append one attachment part; returns the number of bytes read from disk.
fn write_attachment_part(out: &mut String, path: &Path) -> Result<usize> {
    let data = std::fs::read(path).map_err(|e| SmokeError::io(path, e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let file_name = if file_name.is_ascii() {
        file_name.replace(['"', '\\'], "_")
    } else {
        encode_word(&file_name)
    };
    let content_type = content_type_for(path);
    debug!(path = %path.display(), bytes = data.len(), content_type, "Attaching file");

    out.push_str(&format!(
        "Content-Type: {content_type}; name=\"{file_name}\"{CRLF}"
    ));
    out.push_str("Content-Transfer-Encoding: base64");
    out.push_str(CRLF);
    out.push_str(&format!(
        "Content-Disposition: attachment; filename=\"{file_name}\"{CRLF}"
    ));
    out.push_str(CRLF);
    push_base64(out, &data);
    Ok(data.len())
}

fn push_base64(out: &mut String, data: &[u8]) {
    let encoded = STANDARD.encode(data);
    // Base64 output is ASCII, so byte chunks are valid str slices.
    for chunk in encoded.as_bytes().chunks(BASE64_LINE) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str(CRLF);
    }
}

/// MIME type guessed from a file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "htm" | "html" => "text/html",
        "md" => "text/markdown",
        "xml" => "application/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "ics" => "text/calendar",
        "eml" => "message/rfc822",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
