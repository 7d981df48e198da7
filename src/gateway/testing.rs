//! Scripted provider doubles shared by the unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

use crate::gateway::{ProviderClient, ProviderFault, ProviderKind, ProviderRequest};

pub struct Step {
    pub delay: Duration,
    pub reply: Result<Value, ProviderFault>,
}

impl Step {
    pub fn ok(payload: Value) -> Self {
        Self { delay: Duration::ZERO, reply: Ok(payload) }
    }

    pub fn fault(fault: ProviderFault) -> Self {
        Self { delay: Duration::ZERO, reply: Err(fault) }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = Box<dyn Fn(&ProviderRequest) -> Step + Send + Sync>;

/// Replays queued steps in order, then falls back to a responder that can
/// look at the request.
pub struct ScriptedProvider {
    kind: ProviderKind,
    script: Mutex<VecDeque<Step>>,
    fallback: Responder,
    calls: AtomicUsize,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self::responding(kind, |_| Step::fault(ProviderFault::Rejected("script exhausted".to_string())))
    }

    pub fn responding<F>(kind: ProviderKind, responder: F) -> Self
    where
        F: Fn(&ProviderRequest) -> Step + Send + Sync + 'static,
    {
        Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            fallback: Box::new(responder),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, step: Step) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn send(&self, request: &ProviderRequest) -> Result<Value, ProviderFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let step = {
            let mut script = self.script.lock().unwrap();
            script.pop_front()
        }
        .unwrap_or_else(|| (self.fallback)(request));

        if !step.delay.is_zero() {
            sleep(step.delay).await;
        }
        step.reply
    }
}

/// Chat-completions shaped body carrying `text`.
pub fn completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
}

/// Search body with `(title, link, snippet)` organic results.
pub fn organic(results: &[(&str, &str, &str)]) -> Value {
    let organic: Vec<Value> = results
        .iter()
        .enumerate()
        .map(|(i, (title, link, snippet))| {
            json!({"position": i + 1, "title": title, "link": link, "snippet": snippet})
        })
        .collect();
    json!({"search_metadata": {"status": "Success"}, "organic_results": organic})
}
