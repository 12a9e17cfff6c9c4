use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CommonError;
use crate::generator::{GenerationError, GenerationRequest, TextGenerator};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug)]
pub struct GeminiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_timeout: Duration,
    pub max_error_body_bytes: usize,
    /// Aggregate free-text responses from the SSE endpoint instead of a single body.
    pub stream_text: bool,
}

impl GeminiClientConfig {
    /// Required:
    /// - `GEMINI_API_KEY`
    ///
    /// Optional:
    /// - `GEMINI_BASE_URL`, `GEMINI_TIMEOUT_SECS` (default 120),
    ///   `GEMINI_MAX_ERROR_BODY_BYTES` (default 8 KiB), `GEMINI_STREAM_TEXT` (default false)
    pub fn from_env() -> Result<Self, CommonError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CommonError::Config("GEMINI_API_KEY environment variable is required".to_string())
            })?;

        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let default_timeout = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(120));

        let max_error_body_bytes = std::env::var("GEMINI_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        let stream_text = std::env::var("GEMINI_STREAM_TEXT")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_timeout,
            max_error_body_bytes,
            stream_text,
        })
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiClientConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .user_agent("seo-autopilot")
            .timeout(config.default_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiClientConfig {
        &self.config
    }

    pub async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, request.model
        );
        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&GenerateContentBody::from_request(request))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }
        let body = resp.json::<GenerateContentResponse>().await?;
        body.into_text()
    }

    pub async fn generate_content_streaming_aggregate(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, request.model
        );
        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&GenerateContentBody::from_request(request))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }

        // Chunks may split a UTF-8 sequence or a CRLF pair, so events are cut from
        // raw bytes and only decoded once complete.
        let mut stream = resp.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut out = String::new();
        while let Some(next) = stream.next().await {
            buffer.extend_from_slice(&next?);
            while let Some((end, separator_len)) = next_event_boundary(&buffer) {
                let event: Vec<u8> = buffer.drain(..end + separator_len).take(end).collect();
                collect_sse_event(&String::from_utf8_lossy(&event), &mut out)?;
            }
        }
        collect_sse_event(&String::from_utf8_lossy(&buffer), &mut out)?;

        if out.is_empty() {
            return Err(GenerationError::StreamEnded);
        }
        Ok(out)
    }

    async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> GenerationError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        if let Ok(parsed) = serde_json::from_str::<GeminiErrorEnvelope>(&body) {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| "unknown upstream error".to_string());
            return GenerationError::Upstream { status, message };
        }
        GenerationError::UpstreamBody { status, body }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            json = request.wants_json(),
            "dispatching generation request"
        );
        if self.config.stream_text && !request.wants_json() {
            self.generate_content_streaming_aggregate(&request).await
        } else {
            self.generate_content(&request).await
        }
    }
}

/// Position and length of the first blank-line separator (`\n\n` or `\r\n\r\n`).
fn next_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    (0..buffer.len()).find_map(|i| {
        let rest = &buffer[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else {
            None
        }
    })
}

fn collect_sse_event(event: &str, out: &mut String) -> Result<(), GenerationError> {
    for line in event.lines() {
        let Some(rest) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = rest.trim();
        if data.is_empty() {
            continue;
        }
        let chunk = serde_json::from_str::<GenerateContentResponse>(data)?;
        if let Some(reason) = chunk.block_reason() {
            return Err(GenerationError::Blocked(reason));
        }
        out.push_str(&chunk.text());
    }
    Ok(())
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

impl<'a> GenerateContentBody<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        let generation_config =
            if request.response_mime_type.is_some() || request.response_schema.is_some() {
                Some(GenerationConfig {
                    response_mime_type: request.response_mime_type.as_deref(),
                    response_schema: request.response_schema.as_ref(),
                })
            } else {
                None
            };
        Self {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            },
            generation_config,
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn block_reason(&self) -> Option<String> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
    }

    fn into_text(self) -> Result<String, GenerationError> {
        if let Some(reason) = self.block_reason() {
            return Err(GenerationError::Blocked(reason));
        }
        let text = self.text();
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorObject,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorObject {
    message: Option<String>,
    #[allow(dead_code)]
    status: Option<String>,
    #[allow(dead_code)]
    code: Option<serde_json::Value>,
}
