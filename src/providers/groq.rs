use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::GenerationProviderConfig;
use crate::error::{AgencyError, Result};
use crate::gateway::{ProviderClient, ProviderFault, ProviderKind, ProviderPayload, ProviderRequest};
use crate::providers::{read_reply, transport_fault};

/// Chat-completions client for the text-generation provider.
pub struct GroqClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl GroqClient {
    pub fn new(config: &GenerationProviderConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AgencyError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body for one prompt, filling unset knobs from the config.
    pub fn request_body(&self, payload: &ProviderPayload) -> std::result::Result<Value, ProviderFault> {
        match payload {
            ProviderPayload::Generation {
                prompt,
                max_tokens,
                temperature,
            } => Ok(json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": temperature.unwrap_or(self.temperature),
                "max_tokens": max_tokens.unwrap_or(self.max_tokens),
            })),
            ProviderPayload::Search { .. } => Err(ProviderFault::Rejected(
                "search payload sent to the generation provider".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ProviderClient for GroqClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Generation
    }

    async fn send(&self, request: &ProviderRequest) -> std::result::Result<Value, ProviderFault> {
        let body = self.request_body(&request.payload)?;
        debug!("POST {} (model {})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_fault)?;

        read_reply(response).await
    }
}
