pub mod engine;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod ingest;
pub mod mcp_api;
pub mod model;
pub mod prompts;
pub mod report;
pub mod state;
