pub mod groq;
pub mod serpapi;

use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, Credentials};
use crate::error::Result;
use crate::gateway::{Gateway, ProviderFault};

pub use groq::GroqClient;
pub use serpapi::SerpApiClient;

const BODY_SNIPPET_LEN: usize = 200;

/// Build a gateway wired to the real generation and search services.
pub fn connect(config: &Config, credentials: &Credentials) -> Result<Gateway> {
    let generation = GroqClient::new(&config.providers.generation, &credentials.generation_api_key)?;
    let search = SerpApiClient::new(&config.providers.search, &credentials.search_api_key)?;

    info!(
        "Connecting providers: generation model {} at {}, search at {}",
        config.providers.generation.model, config.providers.generation.base_url, config.providers.search.base_url
    );

    Ok(Gateway::new(&config.gateway)
        .with_provider(Arc::new(generation), &config.providers.generation.limits())
        .with_provider(Arc::new(search), &config.providers.search.limits()))
}

/// Map an HTTP status and body onto the gateway's fault classes.
pub(crate) fn classify_reply(status: StatusCode, body: &str) -> std::result::Result<Value, ProviderFault> {
    let snippet = snippet(body);

    if status.is_success() {
        return serde_json::from_str(body)
            .map_err(|e| ProviderFault::Rejected(format!("unreadable response body ({}): {}", e, snippet)));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderFault::RateLimited(format!("{}: {}", status, snippet)));
    }
    if status.is_server_error() {
        return Err(ProviderFault::Server(format!("{}: {}", status, snippet)));
    }
    Err(ProviderFault::Rejected(format!("{}: {}", status, snippet)))
}

pub(crate) async fn read_reply(response: reqwest::Response) -> std::result::Result<Value, ProviderFault> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderFault::Transport(format!("failed to read response body: {}", e)))?;
    classify_reply(status, &body)
}

pub(crate) fn transport_fault(err: reqwest::Error) -> ProviderFault {
    if let Some(status) = err.status() {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return ProviderFault::RateLimited(err.to_string());
        }
        if status.is_client_error() {
            return ProviderFault::Rejected(err.to_string());
        }
    }
    ProviderFault::Transport(err.to_string())
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
