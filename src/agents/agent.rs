use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::gateway::{ProviderKind, ProviderRequest, RequestError};

/// Invocation parameters, keyed by input name.
pub type Params = BTreeMap<String, Value>;

/// Structured output of a successful agent.
pub type ResultData = serde_json::Map<String, Value>;

pub type BuildRequestFn = fn(&Params) -> Result<ProviderRequest, RequestError>;
pub type ParseResponseFn = fn(&Params, &Value) -> Result<ResultData, ParseFailure>;
pub type PageUrlsFn = fn(&Params) -> Vec<String>;

/// Pages an agent reads before its request is built. Fetched html lands in
/// the `pages` param keyed by url.
#[derive(Clone, Copy)]
pub enum PageInputs {
    None,
    /// A fetch failure fails the invocation.
    Required(PageUrlsFn),
    /// Fetch failures are recorded per url in `page_errors`.
    BestEffort(PageUrlsFn),
}

impl PageInputs {
    pub fn urls(&self, params: &Params) -> Vec<String> {
        match self {
            PageInputs::None => Vec::new(),
            PageInputs::Required(urls) | PageInputs::BestEffort(urls) => urls(params),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, PageInputs::Required(_))
    }
}

/// Provider payload did not have the shape the agent expects.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ParseFailure(pub String);

/// A named analysis task: which provider it needs, how to turn params into
/// a request, and how to turn the provider's payload back into data.
#[derive(Clone)]
pub struct AgentDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub required_inputs: &'static [&'static str],
    pub provider: ProviderKind,
    pub pages: PageInputs,
    pub build_request: BuildRequestFn,
    pub parse_response: ParseResponseFn,
}

impl AgentDescriptor {
    pub fn build(&self, params: &Params) -> Result<ProviderRequest, RequestError> {
        (self.build_request)(params)
    }

    pub fn parse(&self, params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
        (self.parse_response)(params, payload)
    }

    /// Required inputs that are absent, null, blank or empty.
    pub fn missing_inputs(&self, params: &Params) -> Vec<String> {
        self.required_inputs
            .iter()
            .filter(|name| params.get(**name).map_or(true, is_blank))
            .map(|name| name.to_string())
            .collect()
    }
}

impl std::fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("required_inputs", &self.required_inputs)
            .finish_non_exhaustive()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Common envelope for every invocation outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResult {
    pub agent_name: String,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AgentFailure>,
    pub latency_ms: u64,
    pub attempts: u32,
}

impl AgentResult {
    pub fn ok(agent_name: impl Into<String>, data: ResultData) -> Self {
        Self {
            agent_name: agent_name.into(),
            status: ResultStatus::Ok,
            data: Some(data),
            error: None,
            latency_ms: 0,
            attempts: 0,
        }
    }

    pub fn failed(agent_name: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::unsuccessful(agent_name, ResultStatus::Failed, kind, message)
    }

    pub fn skipped(agent_name: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::unsuccessful(agent_name, ResultStatus::Skipped, kind, message)
    }

    fn unsuccessful(
        agent_name: impl Into<String>,
        status: ResultStatus,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            status,
            data: None,
            error: Some(AgentFailure {
                kind,
                message: message.into(),
            }),
            latency_ms: 0,
            attempts: 0,
        }
    }

    pub fn with_timing(mut self, latency_ms: u64, attempts: u32) -> Self {
        self.latency_ms = latency_ms;
        self.attempts = attempts;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|failure| failure.kind)
    }
}

// param accessors shared by the catalogue builders and parsers

pub(crate) fn text_param(params: &Params, name: &str) -> Option<String> {
    match params.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn required_text(params: &Params, name: &str) -> Result<String, RequestError> {
    text_param(params, name).ok_or_else(|| RequestError(format!("'{}' must be a non-empty string", name)))
}

/// Accepts a JSON array of strings or a single comma-separated string.
pub(crate) fn text_list(params: &Params, name: &str) -> Result<Vec<String>, RequestError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(RequestError(format!("'{}' must be a list of strings", name))),
            })
            .collect(),
        Some(_) => Err(RequestError(format!("'{}' must be a list of strings", name))),
    }
}

pub(crate) fn count_param(params: &Params, name: &str) -> Result<Option<u32>, RequestError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .filter(|count| (1..=100).contains(count))
            .map(|count| Some(count as u32))
            .ok_or_else(|| RequestError(format!("'{}' must be between 1 and 100", name))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|count| (1..=100).contains(count))
            .map(Some)
            .ok_or_else(|| RequestError(format!("'{}' must be between 1 and 100", name))),
        Some(_) => Err(RequestError(format!("'{}' must be a number", name))),
    }
}

/// Optional map of string values (e.g. url to price text).
pub(crate) fn text_map(params: &Params, name: &str) -> Result<BTreeMap<String, String>, RequestError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key.clone(), s.clone())),
                Value::Number(n) => Ok((key.clone(), n.to_string())),
                _ => Err(RequestError(format!("'{}.{}' must be a string", name, key))),
            })
            .collect(),
        Some(_) => Err(RequestError(format!("'{}' must be an object", name))),
    }
}
