use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One request/response exchange with the hosted vision model, shaped like
/// the Bedrock Converse API: system blocks, a user message carrying text and
/// image content, an optional tool declaration, and inference settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub system: Vec<SystemBlock>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    pub inference_config: InferenceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemBlock {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// A single content block. Externally tagged to match the wire shape:
/// `{"text": ...}`, `{"image": {...}}` or `{"toolUse": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    Text(String),
    Image(ImageBlock),
    ToolUse(ToolUseBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBlock {
    pub format: String,
    pub source: ImageSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    /// Base64-encoded image bytes.
    pub bytes: String,
}

impl ImageBlock {
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        Self {
            format: format.to_string(),
            source: ImageSource {
                bytes: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }
}

/// A structured callback emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseBlock {
    pub tool_use_id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Declares the callable actions available to the model. The extractor
/// always declares exactly one.
#[derive(Debug, Clone, Serialize)]
pub struct ToolConfig {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub tool_spec: ToolSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInputSchema {
    pub json: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseResponse {
    pub output: ConverseOutput,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConverseOutput {
    pub message: Message,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Abstraction over the model endpoint so the extraction pipelines can be
/// exercised against a stub in tests.
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn model_id(&self) -> &str;

    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse, ModelError>;
}

/// HTTP client for a Converse-compatible model endpoint.
pub struct ConverseHttpClient {
    http: Client,
    endpoint: String,
    api_token: String,
    model_id: String,
}

impl ConverseHttpClient {
    pub fn new(
        endpoint: &str,
        api_token: &str,
        model_id: &str,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = Client::builder().timeout(timeout).build().map_err(ModelError::Http)?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            model_id: model_id.to_string(),
        })
    }
}

#[async_trait]
impl ModelClient for ConverseHttpClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse, ModelError> {
        let url = format!("{}/model/{}/converse", self.endpoint, self.model_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await
            .map_err(ModelError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(ModelError::Http)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}
