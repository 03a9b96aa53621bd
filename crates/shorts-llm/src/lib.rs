//! Client for OpenAI-compatible chat completion APIs.
//!
//! Provides:
//! - [`TextGenerator`] and [`VisionDescriber`], the seams the pipeline
//!   generates through
//! - [`OpenAiClient`], an implementation with model fallback and
//!   JSON-schema structured output
//! - Extraction of JSON from fenced or prose-wrapped responses

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod generator;
pub mod types;

pub use client::OpenAiClient;
pub use config::LlmClientConfig;
pub use error::{LlmError, LlmResult};
pub use extract::{extract_json, parse_json_value, parse_structured};
pub use generator::{
    generate_structured, GenerationRequest, ImageInput, OutputSchema, TextGenerator,
    VisionDescriber,
};
