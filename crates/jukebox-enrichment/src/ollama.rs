//! Fun facts from an Ollama server's `/api/generate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use jukebox_core::ports::{EnrichmentError, FactProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EnrichmentConfig;

pub struct OllamaFacts {
  client: Client,
  base_url: String,
  model: String,
  timeout: Duration,
}

impl OllamaFacts {
  pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
    let base_url: String = base_url.into();
    Self {
      client: Client::new(),
      base_url: base_url.trim_end_matches('/').to_string(),
      model: model.into(),
      timeout,
    }
  }

  pub fn from_config(config: &EnrichmentConfig) -> Self {
    Self::new(&config.base_url, &config.model, config.timeout())
  }

  fn prompt(title: &str, artist: &str) -> String {
    format!(
      "Tell me one short, fun fact about the song \"{title}\" by {artist}. \
       Answer in one or two sentences, without any preamble."
    )
  }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
  model: &'a str,
  prompt: String,
  stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  response: String,
}

fn clean(raw: &str) -> Option<String> {
  let fact = raw.trim().trim_matches('"').trim();
  (!fact.is_empty()).then(|| fact.to_string())
}

#[async_trait]
impl FactProvider for OllamaFacts {
  fn name(&self) -> &str {
    "ollama"
  }

  async fn get_fact(&self, title: &str, artist: &str) -> Result<String, EnrichmentError> {
    let url = format!("{}/api/generate", self.base_url);
    let request =
      GenerateRequest { model: &self.model, prompt: Self::prompt(title, artist), stream: false };

    debug!(model = %self.model, title, artist, "asking for a fun fact");

    let response = self
      .client
      .post(&url)
      .json(&request)
      .timeout(self.timeout)
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          EnrichmentError::Timeout
        } else {
          EnrichmentError::Unavailable(e.to_string())
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(EnrichmentError::Unavailable(format!("status {}: {body}", status.as_u16())));
    }

    let body: GenerateResponse = response.json().await.map_err(|e| {
      if e.is_timeout() {
        EnrichmentError::Timeout
      } else {
        EnrichmentError::InvalidResponse(e.to_string())
      }
    })?;

    clean(&body.response)
      .ok_or_else(|| EnrichmentError::InvalidResponse("empty response".to_string()))
  }
}
