//! Small helpers shared across modules.

pub mod redact;
