//! `mailsmoke`: render email smoke-test messages from YAML templates.
//!
//! This crate provides an attachment library that indexes candidate files
//! on disk and narrows them with chained queries, a template layer that
//! exposes those queries as filters, and a message builder that turns a
//! rendered spec into a MIME message ready to send or save as `.eml`.

pub mod config;
pub mod error;
pub mod export;
pub mod library;
pub mod message;
pub mod model;
pub mod parser;
pub mod template;
