//! Core data model types: parsed messages, attachment metadata, stored artifacts.

pub mod artifact;
pub mod attachment;
pub mod message;
