use tracing::{debug, warn};

use crate::agents::{AgentDescriptor, AgentResult, Params};
use crate::error::ErrorKind;
use crate::gateway::{ProviderResponse, ProviderStatus};

/// Shapes a gateway response into the common result envelope. Parser
/// failures are recorded as data, never raised.
pub fn normalize(agent: &AgentDescriptor, params: &Params, response: &ProviderResponse) -> AgentResult {
    let result = match response.status {
        ProviderStatus::Success => match agent.parse(params, &response.raw_payload) {
            Ok(data) => AgentResult::ok(agent.name, data),
            Err(failure) => {
                warn!("{} returned a payload it could not parse: {}", agent.name, failure);
                AgentResult::failed(agent.name, ErrorKind::ParseError, failure.0)
            }
        },
        status => {
            let kind = failure_kind(status);
            let message = response
                .message
                .clone()
                .unwrap_or_else(|| format!("{} provider call failed", response.provider));
            debug!("{} failed with {}: {}", agent.name, kind, message);
            AgentResult::failed(agent.name, kind, message)
        }
    };

    result.with_timing(response.latency_ms, response.attempts)
}

fn failure_kind(status: ProviderStatus) -> ErrorKind {
    match status {
        ProviderStatus::RateLimited => ErrorKind::RateLimited,
        ProviderStatus::Timeout => ErrorKind::Timeout,
        // success never reaches here
        ProviderStatus::ProviderError | ProviderStatus::Success => ErrorKind::ProviderError,
    }
}
