pub mod answer;
pub mod config;
pub mod console;
pub mod error;
pub mod execution;
pub mod inference;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod sanitizer;
pub mod schema;
pub mod server;

pub use error::{AskError, Result};
pub use pipeline::{build_assistant, AskOutcome, Assistant, GenerationSettings};
