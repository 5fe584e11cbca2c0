//! Filesystem side: project resolution, staging, artifact writing and listing.

pub mod listing;
pub mod project;
pub mod staging;
pub mod writer;
