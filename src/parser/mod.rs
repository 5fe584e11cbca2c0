//! Message parsing: MIME structure, body selection, and attachment payload recovery.

pub mod mime;
pub mod payload;
