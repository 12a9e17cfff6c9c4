use seo_common::engine::DEFAULT_MODEL;
use seo_common::ingest::{
    file_marker, IngestLimits, DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_TOTAL_BYTES, TRUNCATION_MARKER,
};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub model: String,
    pub limits: IngestLimits,
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    /// Optional:
    /// - `SEO_MODEL` (default: "gemini-2.5-flash")
    /// - `SEO_MAX_FILE_BYTES` (default: 200000)
    /// - `SEO_MAX_TOTAL_BYTES` (default: 1000000)
    /// - `MCP_TCP_LISTEN_ADDR` (serve over TCP instead of stdio)
    ///
    /// Gemini credentials are read separately by `GeminiClientConfig::from_env`.
    pub fn from_env() -> Result<Self, AppError> {
        let model = std::env::var("SEO_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_file_bytes = std::env::var("SEO_MAX_FILE_BYTES")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_FILE_BYTES);

        let max_total_bytes = std::env::var("SEO_MAX_TOTAL_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_TOTAL_BYTES);

        // Room for the truncation marker and at least one empty file header.
        let min_total_bytes = TRUNCATION_MARKER.len() + file_marker("").len();
        if max_total_bytes <= min_total_bytes {
            return Err(AppError::Config(format!(
                "SEO_MAX_TOTAL_BYTES must be larger than {min_total_bytes} bytes"
            )));
        }

        Ok(Self {
            model,
            limits: IngestLimits {
                max_file_bytes,
                max_total_bytes,
            },
            tcp_listen_addr: std::env::var("MCP_TCP_LISTEN_ADDR").ok(),
        })
    }
}
