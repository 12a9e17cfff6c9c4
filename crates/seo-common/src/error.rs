/// Errors surfaced while wiring the SEO crates together at startup.
///
/// Request-time failures keep their own narrow enums (`GenerationError`, `IngestError`,
/// `EngineError`) and are reported per tool call; only configuration and client
/// construction go through `CommonError`.
use crate::generator::GenerationError;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
