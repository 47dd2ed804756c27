//! Core data model types: attachment records and email addresses.

pub mod address;
pub mod attachment;
