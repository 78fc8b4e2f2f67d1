pub mod classifier;
pub mod client;
pub mod prompts;
mod stream;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use client::OllamaClient;
pub use prompts::compose;
pub use types::{ResponseKind, StructuredResponse};
