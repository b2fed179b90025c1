//! Model provider access.
//!
//! This module provides the model-caller capability used by the pipeline
//! and the prompt that is sent to every model.

pub mod client;
pub mod prompt;

pub use client::{ClientConfig, HuggingFaceClient, ModelCaller};
pub use prompt::{build_analysis_prompt, PROMPT_VERSION};
