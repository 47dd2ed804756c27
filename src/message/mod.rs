//! Building RFC 5322 messages from rendered specs, and reading them back.

pub mod builder;
pub mod headers;
pub mod inspect;

pub use builder::{build_message, MessageOptions};
