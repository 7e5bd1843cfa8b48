pub mod config;
pub mod ollama;

pub use config::EnrichmentConfig;
pub use ollama::OllamaFacts;
