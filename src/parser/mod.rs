//! Text inputs: human-readable sizes and message specs.

pub mod size;
pub mod spec;
