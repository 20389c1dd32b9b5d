mod client;
mod error;
mod openai;
pub mod prompt;
mod stub;

pub use client::{ModelClient, TokenStream};
pub use error::{ModelError, Result};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use prompt::Prompt;
pub use stub::ScriptedModel;
