//! Email addresses used in spec headers (RFC 5322 §3.4).

use crate::error::{Result, SmokeError};
use crate::message::headers::encode_word;

/// A mailbox written by a spec author.
///
/// # Examples
/// - `"Smoke Bot <bot@example.com>"` → `display_name = "Smoke Bot"`, `address = "bot@example.com"`
/// - `"ops@example.com"` → `display_name = ""`, `address = "ops@example.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Parse a single mailbox from a header value.
    ///
    /// Accepts `user@domain`, `<user@domain>`, `Name <user@domain>` and
    /// `"Quoted, Name" <user@domain>`. The address part must contain exactly
    /// one `@` with text on both sides.
    pub fn parse(header: &str, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        let (display_name, address) = match (trimmed.rfind('<'), trimmed.rfind('>')) {
            (Some(start), Some(end)) if end > start => (
                strip_quotes(&trimmed[..start]),
                trimmed[start + 1..end].trim().to_string(),
            ),
            _ => (String::new(), trimmed.to_string()),
        };

        match address.split_once('@') {
            Some((local, domain))
                if !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !address.chars().any(char::is_whitespace) =>
            {
                Ok(Self {
                    display_name,
                    address,
                })
            }
            _ => Err(SmokeError::InvalidHeader {
                name: header.to_string(),
                reason: format!("'{trimmed}' is not a valid email address"),
            }),
        }
    }

    /// Parse a comma-separated list of mailboxes.
    ///
    /// Handles quoted commas: `"Last, First" <a@b.com>, other@c.com`
    pub fn parse_list(header: &str, raw: &str) -> Result<Vec<Self>> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    if !current.trim().is_empty() {
                        results.push(Self::parse(header, &current)?);
                    }
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        if !current.trim().is_empty() {
            results.push(Self::parse(header, &current)?);
        }

        Ok(results)
    }

    /// Format for a header line. Non-ASCII display names are RFC 2047
    /// encoded, names with specials are quoted.
    pub fn to_header(&self) -> String {
        if self.display_name.is_empty() {
            return self.address.clone();
        }
        let name = if !self.display_name.is_ascii() {
            encode_word(&self.display_name)
        } else if self.display_name.contains(|c: char| ",;:<>@\"()[]\\.".contains(c)) {
            format!("\"{}\"", self.display_name.replace('"', "\\\""))
        } else {
            self.display_name.clone()
        };
        format!("{name} <{}>", self.address)
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("to", "user@example.com").unwrap();
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("from", "Smoke Bot <bot@example.com>").unwrap();
        assert_eq!(addr.address, "bot@example.com");
        assert_eq!(addr.display_name, "Smoke Bot");
    }

    #[test]
    fn test_parse_rejects_missing_at() {
        let err = EmailAddress::parse("to", "not-an-address").unwrap_err();
        assert!(matches!(err, SmokeError::InvalidHeader { ref name, .. } if name == "to"));
        assert!(EmailAddress::parse("to", "a@b@c").is_err());
        assert!(EmailAddress::parse("to", "@example.com").is_err());
    }

    #[test]
    fn test_parse_list_with_quoted_comma() {
        let list = EmailAddress::parse_list("cc", "\"Last, First\" <a@b.com>, other@c.com").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Last, First");
        assert_eq!(list[1].address, "other@c.com");
    }

    #[test]
    fn test_to_header_quotes_specials() {
        let addr = EmailAddress::parse("from", "\"Ops, Team\" <ops@example.com>").unwrap();
        assert_eq!(addr.to_header(), "\"Ops, Team\" <ops@example.com>");
    }

    #[test]
    fn test_to_header_encodes_unicode() {
        let addr = EmailAddress::parse("from", "José <jose@example.com>").unwrap();
        assert!(addr.to_header().starts_with("=?UTF-8?B?"));
        assert!(addr.to_header().ends_with(" <jose@example.com>"));
    }
}
