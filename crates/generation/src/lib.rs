//! LLM-backed message generation.

pub mod openrouter;
pub mod prompt;

pub use {
    openrouter::{OpenRouterGenerator, parse_messages},
    prompt::build_prompt,
};
