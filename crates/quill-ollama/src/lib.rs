//! Quill: text generation through an Ollama server.
//!
//! Both modes post to Ollama's generate endpoint with `stream: true` and
//! decode the newline-delimited JSON reply; buffered generation simply
//! concatenates the chunks.

pub mod config;
pub mod generator;
mod ndjson;

pub use config::OllamaConfig;
pub use generator::OllamaGenerator;
