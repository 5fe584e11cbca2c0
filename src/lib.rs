//! `eml2md` — convert `.eml` messages into Markdown documents.
//!
//! Each message becomes one Markdown file with YAML front matter, stored in
//! a project directory next to an `attachments/` folder. Projects live either
//! in an inbox staging root or in the general project root.

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod store;
