use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::SearchProviderConfig;
use crate::error::{AgencyError, Result};
use crate::gateway::{ProviderClient, ProviderFault, ProviderKind, ProviderPayload, ProviderRequest};
use crate::providers::{read_reply, transport_fault};

/// Google search through SerpAPI's JSON endpoint.
pub struct SerpApiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    location: String,
    result_count: u32,
}

impl SerpApiClient {
    pub fn new(config: &SearchProviderConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AgencyError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.base_url.clone(),
            api_key: api_key.to_string(),
            location: config.location.clone(),
            result_count: config.result_count,
        })
    }

    /// Query string pairs, without the credential.
    pub fn query_pairs(&self, payload: &ProviderPayload) -> std::result::Result<Vec<(String, String)>, ProviderFault> {
        match payload {
            ProviderPayload::Search {
                query,
                result_count,
                extra,
            } => {
                let mut pairs = vec![
                    ("engine".to_string(), "google".to_string()),
                    ("q".to_string(), query.clone()),
                    ("location".to_string(), self.location.clone()),
                    ("num".to_string(), result_count.unwrap_or(self.result_count).to_string()),
                ];
                // extra params override the defaults above
                for (key, value) in extra {
                    pairs.retain(|(existing, _)| existing != key);
                    pairs.push((key.clone(), value.clone()));
                }
                Ok(pairs)
            }
            ProviderPayload::Generation { .. } => Err(ProviderFault::Rejected(
                "generation payload sent to the search provider".to_string(),
            )),
        }
    }

    /// SerpAPI reports problems in an `error` field, sometimes with a 200.
    /// "No results" is not a failure and becomes an empty result list.
    fn check_body(mut body: Value) -> std::result::Result<Value, ProviderFault> {
        let error = body.get("error").and_then(Value::as_str).map(str::to_string);
        match error {
            Some(message) if message.contains("any results") => {
                if let Some(object) = body.as_object_mut() {
                    object.insert("organic_results".to_string(), json!([]));
                }
                Ok(body)
            }
            Some(message) => Err(ProviderFault::Rejected(message)),
            None => Ok(body),
        }
    }
}

#[async_trait]
impl ProviderClient for SerpApiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Search
    }

    async fn send(&self, request: &ProviderRequest) -> std::result::Result<Value, ProviderFault> {
        let mut pairs = self.query_pairs(&request.payload)?;
        debug!("GET {} with {} params", self.endpoint, pairs.len());
        pairs.push(("api_key".to_string(), self.api_key.clone()));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&pairs)
            .send()
            .await
            .map_err(transport_fault)?;

        Self::check_body(read_reply(response).await?)
    }
}
