//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::LlmClientConfig;
use crate::error::{LlmError, LlmResult};
use crate::generator::{GenerationRequest, ImageInput, TextGenerator, VisionDescriber};
use crate::types::{
    ApiErrorBody, ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl,
    JsonSchemaFormat, ResponseFormat,
};

/// Chat completions client with ordered model fallback.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: LlmClientConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: LlmClientConfig) -> LlmResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::config("API key is empty"));
        }
        if config.models.is_empty() {
            return Err(LlmError::config("no text models configured"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        Self::new(LlmClientConfig::from_env()?)
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    /// Send one chat completion request and return the first choice's text.
    pub async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        let url = self.config.chat_completions_url();
        debug!(model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::api(status.as_u16(), message));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::parse(format!("Failed to parse chat response: {}", e)))?;

        if let Some(refusal) = body.choices.first().and_then(|c| c.message.refusal.as_deref()) {
            return Err(LlmError::empty_response(format!("model refused: {}", refusal)));
        }

        body.first_text()
            .map(str::to_string)
            .ok_or_else(|| LlmError::empty_response(format!("no content from {}", request.model)))
    }

    /// Try each configured model in order and return the first success.
    async fn chat_with_fallback(
        &self,
        step: &str,
        build: impl Fn(&str) -> ChatRequest,
    ) -> LlmResult<String> {
        let mut last_error = None;

        for model in &self.config.models {
            info!(step = %step, model = %model, "Attempting generation");
            match self.chat(&build(model)).await {
                Ok(text) => {
                    debug!(step = %step, model = %model, chars = text.len(), "Generation succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(step = %step, model = %model, error = %e, "Model failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            // A single configured model keeps its own error classification
            Some(e) if self.config.models.len() == 1 => Err(e),
            Some(e) => Err(LlmError::AllModelsFailed(format!("{}: {}", step, e))),
            None => Err(LlmError::AllModelsFailed(step.to_string())),
        }
    }

    fn response_format(request: &GenerationRequest) -> Option<ResponseFormat> {
        match &request.schema {
            Some(schema) => Some(ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: schema.name.clone(),
                    schema: schema.schema.clone(),
                    strict: false,
                },
            }),
            None if request.json => Some(ResponseFormat::JsonObject),
            None => None,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(request.prompt.clone()));
        let response_format = Self::response_format(request);

        self.chat_with_fallback(&request.step, |model| ChatRequest {
            model: model.to_string(),
            messages: messages.clone(),
            temperature: self.config.temperature,
            max_tokens: None,
            response_format: response_format.clone(),
        })
        .await
    }
}

#[async_trait]
impl VisionDescriber for OpenAiClient {
    async fn describe(&self, prompt: &str, images: &[ImageInput]) -> LlmResult<String> {
        if images.is_empty() {
            return Err(LlmError::request("no images to describe"));
        }

        let mut parts = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];
        parts.extend(images.iter().map(|image| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.to_data_url(),
                detail: None,
            },
        }));

        let request = ChatRequest {
            model: self.config.vision_model.clone(),
            messages: vec![ChatMessage::user_parts(parts)],
            temperature: self.config.temperature,
            max_tokens: Some(self.config.vision_max_tokens),
            response_format: None,
        };

        let text = self.chat(&request).await?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
        }))
    }

    fn client_for(server: &MockServer, models: &[&str]) -> OpenAiClient {
        let config = LlmClientConfig::default()
            .with_api_key("test-key")
            .with_base_url(server.uri())
            .with_models(models.iter().copied());
        OpenAiClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_generate_sends_schema_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_schema", "json_schema": {"name": "hook"}}
            })))
            .respond_with(reply("{\"hook_line\": \"Hi\"}"))
            .expect(1)
            .mount(&server)
            .await;

        #[derive(serde::Deserialize, schemars::JsonSchema)]
        struct Hook {
            hook_line: String,
        }

        let client = client_for(&server, &["gpt-4o"]);
        let request = GenerationRequest::new("hook", "make a hook").with_system("You write hooks");
        let hook: Hook = crate::generate_structured(&client, request).await.unwrap();
        assert_eq!(hook.hook_line, "Hi");
    }

    #[tokio::test]
    async fn test_model_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"model": "primary"})))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"error": {"message": "overloaded"}})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"model": "backup"})))
            .respond_with(reply("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, &["primary", "backup"]);
        let text = client
            .generate(&GenerationRequest::new("scenes", "p"))
            .await
            .unwrap();
        assert_eq!(text, "{}");
    }

    #[tokio::test]
    async fn test_all_models_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "bad request"}})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, &["a", "b"]);
        let err = client
            .generate(&GenerationRequest::new("story", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::AllModelsFailed(_)));

        let client = client_for(&server, &["a"]);
        let err = client
            .generate(&GenerationRequest::new("story", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 400, .. }));
        assert!(err.to_string().contains("bad request"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server, &["gpt-4o"]);
        let err = client
            .generate(&GenerationRequest::new("hook", "p"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_content_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = client_for(&server, &["gpt-4o"]);
        let err = client
            .generate(&GenerationRequest::new("hook", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn test_describe_sends_data_urls_to_vision_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "max_tokens": 512})))
            .respond_with(reply("  A classroom with students.  "))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, &["gpt-4o"]);
        let images = vec![
            ImageInput::new("image/jpeg", vec![1, 2, 3]),
            ImageInput::new("image/jpeg", vec![4, 5, 6]),
        ];
        let text = client.describe("Describe the scene", &images).await.unwrap();
        assert_eq!(text, "A classroom with students.");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let parts = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert!(parts[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_describe_without_images() {
        let server = MockServer::start().await;
        let client = client_for(&server, &["gpt-4o"]);
        assert!(client.describe("x", &[]).await.is_err());
    }

    #[test]
    fn test_rejects_empty_key() {
        assert!(matches!(
            OpenAiClient::new(LlmClientConfig::default()),
            Err(LlmError::Config(_))
        ));
    }
}
