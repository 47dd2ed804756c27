//! Writing rendered messages to disk.

pub mod eml;
