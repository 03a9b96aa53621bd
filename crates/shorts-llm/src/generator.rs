//! Generation seams used by the pipeline.

use async_trait::async_trait;
use base64::Engine;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{LlmError, LlmResult};
use crate::extract::parse_structured;

/// JSON schema the response should conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    /// Schema name (`[A-Za-z0-9_-]+`)
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    /// Schema generated from `T`'s `JsonSchema` derive.
    pub fn for_type<T: JsonSchema>(name: impl Into<String>) -> Self {
        let schema = schemars::schema_for!(T);
        Self {
            name: name.into(),
            schema: serde_json::to_value(schema).unwrap_or(Value::Null),
        }
    }
}

/// One text generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Step name, used for logging and as the schema name
    pub step: String,
    pub system: Option<String>,
    pub prompt: String,
    /// When set, a JSON object matching the schema is requested
    pub schema: Option<OutputSchema>,
    /// Request a JSON object even without a schema
    pub json: bool,
}

impl GenerationRequest {
    pub fn new(step: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            system: None,
            prompt: prompt.into(),
            schema: None,
            json: true,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach the JSON schema of `T`.
    pub fn with_schema_of<T: JsonSchema>(mut self) -> Self {
        self.schema = Some(OutputSchema::for_type::<T>(self.step.clone()));
        self
    }
}

/// Produces text from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the raw text of the model's answer.
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String>;
}

/// An image to describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// MIME type, e.g. `image/jpeg`
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Guess the MIME type from a file extension; JPEG when unknown.
    pub fn from_path_bytes(path: &std::path::Path, data: Vec<u8>) -> Self {
        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            _ => "image/jpeg",
        };
        Self::new(mime, data)
    }

    /// Base64 `data:` URL.
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }
}

/// Describes one or more images (e.g. sampled video frames) in free text.
#[async_trait]
pub trait VisionDescriber: Send + Sync {
    async fn describe(&self, prompt: &str, images: &[ImageInput]) -> LlmResult<String>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for std::sync::Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String> {
        (**self).generate(request).await
    }
}

#[async_trait]
impl<T: VisionDescriber + ?Sized> VisionDescriber for std::sync::Arc<T> {
    async fn describe(&self, prompt: &str, images: &[ImageInput]) -> LlmResult<String> {
        (**self).describe(prompt, images).await
    }
}

/// Generate and parse a typed output, requesting `T`'s schema.
pub async fn generate_structured<T, G>(
    generator: &G,
    request: GenerationRequest,
) -> LlmResult<T>
where
    T: DeserializeOwned + JsonSchema,
    G: TextGenerator + ?Sized,
{
    let request = request.with_schema_of::<T>();
    let text = generator.generate(&request).await?;
    if text.trim().is_empty() {
        return Err(LlmError::empty_response(request.step));
    }
    parse_structured(&text)
}
