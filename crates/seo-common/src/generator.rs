/// The generative-service boundary.
///
/// Everything "intelligent" in this crate is a single prompt-in, text-out call through
/// [`TextGenerator`]. The production implementation is [`crate::gemini::GeminiClient`];
/// tests plug in scripted fakes.
use async_trait::async_trait;
use reqwest::StatusCode;

pub const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system_instruction: String,
    /// Output schema descriptor, in the service's OpenAPI-subset dialect.
    pub response_schema: Option<serde_json::Value>,
    pub response_mime_type: Option<String>,
}

impl GenerationRequest {
    pub fn text(model: &str, system_instruction: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            system_instruction: system_instruction.to_string(),
            response_schema: None,
            response_mime_type: None,
        }
    }

    pub fn json(
        model: &str,
        system_instruction: &str,
        prompt: String,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            response_schema: Some(schema),
            response_mime_type: Some(JSON_MIME_TYPE.to_string()),
            ..Self::text(model, system_instruction, prompt)
        }
    }

    pub fn wants_json(&self) -> bool {
        self.response_mime_type.as_deref() == Some(JSON_MIME_TYPE)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("prompt was blocked: {0}")]
    Blocked(String),

    #[error("response contained no text")]
    EmptyResponse,

    #[error("streaming response ended without a completion")]
    StreamEnded,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Issue exactly one request and return the concatenated response text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
