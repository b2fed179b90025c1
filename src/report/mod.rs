//! Report rendering.

pub mod generator;

pub use generator::{generate_evaluation_markdown, generate_json_report, generate_markdown_report};
