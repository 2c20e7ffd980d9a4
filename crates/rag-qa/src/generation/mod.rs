//! Prompt assembly for answer generation

pub mod prompt;

pub use prompt::{AssembledPrompt, PromptTemplate, DEFAULT_TEMPLATE};
