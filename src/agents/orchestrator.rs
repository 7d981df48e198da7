use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::agents::{AgentDescriptor, AgentRegistry, AgentResult, Params, ResultStatus};
use crate::config::Config;
use crate::error::ErrorKind;
use crate::gateway::{Gateway, ProviderKind};
use crate::normalizer::normalize;
use crate::page::PageFetcher;

/// Bulkhead size for providers without an explicit limit.
const DEFAULT_MAX_CONCURRENCY: usize = 4;

// cap for absurd deadlines that would overflow the clock
const MAX_DEADLINE_SECS: u64 = 365 * 24 * 60 * 60;

/// One requested agent run, as read from a batch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub agent: String,
    #[serde(default)]
    pub params: Params,
    /// Order in which queued invocations of one provider take a free
    /// concurrency slot, 0 first. Unset runs after every explicit priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Earlier slots whose result data is merged into `params` before this
    /// invocation runs. Explicit params win over merged ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs_from: Vec<usize>,
}

impl InvocationRequest {
    pub fn new(agent: impl Into<String>, params: Params) -> Self {
        Self {
            agent: agent.into(),
            params,
            priority: None,
            inputs_from: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_inputs_from(mut self, slot: usize) -> Self {
        self.inputs_from.push(slot);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    Pending,
    Dispatched,
    Succeeded,
    Failed,
    Skipped,
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvocationState::Succeeded | InvocationState::Failed | InvocationState::Skipped
        )
    }
}

/// Lifecycle of a single slot in a batch. Once terminal, the recorded
/// result can no longer change.
#[derive(Debug)]
pub struct Invocation {
    position: usize,
    agent: String,
    state: InvocationState,
    result: Option<AgentResult>,
}

impl Invocation {
    pub fn new(position: usize, agent: impl Into<String>) -> Self {
        Self {
            position,
            agent: agent.into(),
            state: InvocationState::Pending,
            result: None,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn result(&self) -> Option<&AgentResult> {
        self.result.as_ref()
    }

    pub fn dispatch(&mut self) -> bool {
        if self.state != InvocationState::Pending {
            return false;
        }
        self.state = InvocationState::Dispatched;
        true
    }

    /// Records the outcome. Returns false and keeps the first result if the
    /// slot was already terminal.
    pub fn complete(&mut self, result: AgentResult) -> bool {
        if self.state.is_terminal() {
            debug!(
                "Ignoring late result for slot {} ({}), already {:?}",
                self.position, self.agent, self.state
            );
            return false;
        }
        self.state = match result.status {
            ResultStatus::Ok => InvocationState::Succeeded,
            ResultStatus::Failed => InvocationState::Failed,
            ResultStatus::Skipped => InvocationState::Skipped,
        };
        self.result = Some(result);
        true
    }

    fn into_result(self) -> AgentResult {
        match self.result {
            Some(result) => result,
            // never dispatched and never completed
            None => AgentResult::failed(
                self.agent,
                ErrorKind::DeadlineExceeded,
                "invocation never completed",
            ),
        }
    }
}

/// Outcome of one batch, results in request order.
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    results: Vec<AgentResult>,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub total_latency_ms: u64,
}

impl Batch {
    pub fn new(id: Uuid, started_at: DateTime<Utc>, results: Vec<AgentResult>, total_latency_ms: u64) -> Self {
        let count = |status: ResultStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            id,
            started_at,
            succeeded_count: count(ResultStatus::Ok),
            failed_count: count(ResultStatus::Failed),
            skipped_count: count(ResultStatus::Skipped),
            results,
            total_latency_ms,
        }
    }

    pub fn results(&self) -> &[AgentResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

struct Dispatch {
    position: usize,
    descriptor: AgentDescriptor,
    params: Params,
    priority: Option<u8>,
    inputs_from: Vec<usize>,
}

type WorkerOutcome = Option<(usize, std::thread::Result<AgentResult>)>;

/// Runs batches of agent invocations concurrently. Invocations that read
/// another slot's output run in a later wave; within a wave, a per-provider
/// semaphore caps in-flight calls and queued work is taken by priority.
pub struct Orchestrator {
    gateway: Arc<Gateway>,
    registry: Arc<AgentRegistry>,
    bulkheads: HashMap<ProviderKind, Arc<Semaphore>>,
    pages: Option<Arc<dyn PageFetcher>>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<Gateway>, registry: Arc<AgentRegistry>) -> Self {
        let bulkheads = [ProviderKind::Generation, ProviderKind::Search]
            .into_iter()
            .map(|kind| (kind, Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY))))
            .collect();
        Self {
            gateway,
            registry,
            bulkheads,
            pages: None,
        }
    }

    pub fn from_config(config: &Config, gateway: Arc<Gateway>, registry: Arc<AgentRegistry>) -> Self {
        Self::new(gateway, registry)
            .with_concurrency(
                ProviderKind::Generation,
                config.providers.generation.max_concurrency,
            )
            .with_concurrency(ProviderKind::Search, config.providers.search.max_concurrency)
    }

    pub fn with_concurrency(mut self, provider: ProviderKind, max_in_flight: usize) -> Self {
        self.bulkheads
            .insert(provider, Arc::new(Semaphore::new(max_in_flight.max(1))));
        self
    }

    /// Without a fetcher, agents only see page html passed in their params.
    pub fn with_page_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.pages = Some(fetcher);
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    fn bulkhead(&self, provider: ProviderKind) -> Arc<Semaphore> {
        match self.bulkheads.get(&provider) {
            Some(semaphore) => semaphore.clone(),
            None => Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)),
        }
    }

    /// Executes every request and returns one result per request, in
    /// request order. Never fails as a whole.
    pub async fn run_batch(&self, requests: Vec<InvocationRequest>, deadline: Duration) -> Batch {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        let deadline_at = started
            .checked_add(deadline)
            .unwrap_or_else(|| started + Duration::from_secs(MAX_DEADLINE_SECS));
        info!("Starting batch {} with {} invocations (deadline {:?})", id, requests.len(), deadline);

        let mut invocations: Vec<Invocation> = requests
            .iter()
            .enumerate()
            .map(|(position, request)| Invocation::new(position, request.agent.clone()))
            .collect();

        // everything is resolved before the first provider call; slots with
        // inputs_from finish validation once their inputs exist
        let mut depth = vec![0usize; requests.len()];
        let mut waves: Vec<Vec<Dispatch>> = Vec::new();
        for (position, request) in requests.into_iter().enumerate() {
            match self.prepare(position, request) {
                Ok(dispatch) => {
                    let wave = dispatch
                        .inputs_from
                        .iter()
                        .map(|source| depth[*source] + 1)
                        .max()
                        .unwrap_or(0);
                    depth[position] = wave;
                    if waves.len() <= wave {
                        waves.resize_with(wave + 1, Vec::new);
                    }
                    waves[wave].push(dispatch);
                }
                Err(skipped) => {
                    invocations[position].complete(skipped);
                }
            }
        }

        for (wave, dispatches) in waves.into_iter().enumerate() {
            let mut ready = Vec::with_capacity(dispatches.len());
            for dispatch in dispatches {
                let position = dispatch.position;
                match self.attach_inputs(dispatch, &invocations) {
                    Ok(dispatch) => ready.push(dispatch),
                    Err(skipped) => {
                        invocations[position].complete(skipped);
                    }
                }
            }

            debug!("Batch {} wave {}: dispatching {} invocations", id, wave, ready.len());
            if !self.run_wave(ready, &mut invocations, deadline_at).await {
                warn!("Batch {} hit its deadline of {:?}, cancelling outstanding work", id, deadline);
                break;
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let results: Vec<AgentResult> = invocations
            .into_iter()
            .map(|mut invocation| {
                if !invocation.state().is_terminal() {
                    let agent = invocation.agent.clone();
                    invocation.complete(
                        AgentResult::failed(
                            agent,
                            ErrorKind::DeadlineExceeded,
                            format!("batch deadline of {}ms elapsed", deadline.as_millis()),
                        )
                        .with_timing(elapsed_ms, 0),
                    );
                }
                invocation.into_result()
            })
            .collect();

        let batch = Batch::new(id, started_at, results, elapsed_ms);
        info!(
            "Batch {} finished in {}ms: {} succeeded, {} failed, {} skipped",
            batch.id, batch.total_latency_ms, batch.succeeded_count, batch.failed_count, batch.skipped_count
        );
        batch
    }

    /// Runs one wave to completion. Returns false if the deadline cut it
    /// short; unfinished slots are left for the caller to fail.
    async fn run_wave(&self, wave: Vec<Dispatch>, invocations: &mut [Invocation], deadline_at: Instant) -> bool {
        let mut lanes: HashMap<ProviderKind, Vec<Dispatch>> = HashMap::new();
        for dispatch in wave {
            invocations[dispatch.position].dispatch();
            lanes.entry(dispatch.descriptor.provider).or_default().push(dispatch);
        }

        let mut aborts = Vec::new();
        let mut running = FuturesUnordered::new();
        for (provider, mut lane) in lanes {
            // popped from the back: lowest priority value, then request order
            lane.sort_by_key(|dispatch| Reverse((dispatch.priority.unwrap_or(u8::MAX), dispatch.position)));
            let workers = lane.len();
            let queue = Arc::new(Mutex::new(lane));
            let bulkhead = self.bulkhead(provider);

            for _ in 0..workers {
                let queue = queue.clone();
                let bulkhead = bulkhead.clone();
                let gateway = self.gateway.clone();
                let pages = self.pages.clone();
                let handle = tokio::spawn(async move {
                    // the semaphore is never closed
                    let _permit = bulkhead.acquire_owned().await.ok();
                    let Some(dispatch) = pop_next(&queue) else {
                        return None;
                    };
                    let position = dispatch.position;
                    let outcome = AssertUnwindSafe(execute(gateway, pages, dispatch))
                        .catch_unwind()
                        .await;
                    Some((position, outcome))
                });
                aborts.push(handle.abort_handle());
                running.push(handle);
            }
        }

        loop {
            let finished: Option<Result<WorkerOutcome, _>> = match timeout_at(deadline_at, running.next()).await {
                Ok(finished) => finished,
                Err(_) => {
                    for abort in &aborts {
                        abort.abort();
                    }
                    return false;
                }
            };

            match finished {
                Some(Ok(Some((position, Ok(result))))) => {
                    invocations[position].complete(result);
                }
                Some(Ok(Some((position, Err(_))))) => {
                    error!("Invocation in slot {} panicked", position);
                    let agent = invocations[position].agent.clone();
                    invocations[position].complete(AgentResult::failed(
                        agent,
                        ErrorKind::ProviderError,
                        "invocation task panicked",
                    ));
                }
                Some(Ok(None)) => {}
                Some(Err(join_error)) => {
                    error!("Invocation worker failed: {}", join_error);
                }
                None => return true,
            }
        }
    }

    /// Resolves one request and, unless it waits on other slots, validates
    /// and test-builds it. Anything that cannot run comes back as a skipped
    /// result.
    fn prepare(&self, position: usize, request: InvocationRequest) -> Result<Dispatch, AgentResult> {
        let descriptor = self.registry.resolve(&request.agent).map_err(|e| {
            warn!("Skipping slot {}: {}", position, e);
            AgentResult::skipped(request.agent.clone(), e.kind(), e.to_string())
        })?;

        if let Some(source) = request.inputs_from.iter().find(|source| **source >= position) {
            warn!("Skipping slot {} ({}): inputs_from {} is not an earlier slot", position, descriptor.name, source);
            return Err(AgentResult::skipped(
                descriptor.name,
                ErrorKind::InvalidParam,
                format!("inputs_from may only name earlier slots, got {}", source),
            ));
        }
        if request.inputs_from.is_empty() {
            self.check(position, descriptor, &request.params)?;
        }

        Ok(Dispatch {
            position,
            descriptor: descriptor.clone(),
            params: request.params,
            priority: request.priority,
            inputs_from: request.inputs_from,
        })
    }

    /// Merges upstream result data into the params of a dependent slot,
    /// then validates it.
    fn attach_inputs(&self, mut dispatch: Dispatch, invocations: &[Invocation]) -> Result<Dispatch, AgentResult> {
        if dispatch.inputs_from.is_empty() {
            return Ok(dispatch);
        }

        for source in &dispatch.inputs_from {
            let upstream = invocations[*source]
                .result()
                .filter(|result| result.is_ok())
                .and_then(|result| result.data.as_ref());
            let Some(data) = upstream else {
                warn!(
                    "Skipping slot {} ({}): input slot {} did not succeed",
                    dispatch.position, dispatch.descriptor.name, source
                );
                return Err(AgentResult::skipped(
                    dispatch.descriptor.name,
                    ErrorKind::UpstreamFailed,
                    format!("input slot {} did not succeed", source),
                ));
            };
            for (key, value) in data {
                dispatch
                    .params
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        self.check(dispatch.position, &dispatch.descriptor, &dispatch.params)?;
        Ok(dispatch)
    }

    fn check(&self, position: usize, descriptor: &AgentDescriptor, params: &Params) -> Result<(), AgentResult> {
        self.registry.validate(descriptor, params).map_err(|e| {
            warn!("Skipping slot {} ({}): {}", position, descriptor.name, e);
            AgentResult::skipped(descriptor.name, e.kind(), e.to_string())
        })?;

        descriptor.build(params).map_err(|e| {
            warn!("Skipping slot {} ({}): {}", position, descriptor.name, e);
            AgentResult::skipped(descriptor.name, ErrorKind::InvalidParam, e.0)
        })?;
        Ok(())
    }
}

fn pop_next(queue: &Mutex<Vec<Dispatch>>) -> Option<Dispatch> {
    match queue.lock() {
        Ok(mut queue) => queue.pop(),
        Err(poisoned) => poisoned.into_inner().pop(),
    }
}

async fn execute(gateway: Arc<Gateway>, pages: Option<Arc<dyn PageFetcher>>, dispatch: Dispatch) -> AgentResult {
    let Dispatch {
        position,
        descriptor,
        mut params,
        priority,
        ..
    } = dispatch;

    if let Some(fetcher) = pages {
        if let Err(failed) = fetch_pages(fetcher.as_ref(), &descriptor, &mut params).await {
            return failed;
        }
    }

    debug!("Dispatching {} (slot {})", descriptor.name, position);
    let response = gateway
        .call_with(descriptor.provider, || {
            descriptor.build(&params).map(|request| request.with_priority(priority))
        })
        .await;
    normalize(&descriptor, &params, &response)
}

/// Downloads the pages an agent reads into its `pages` param. Failed
/// best-effort pages are listed under `page_errors` instead.
async fn fetch_pages(
    fetcher: &dyn PageFetcher,
    descriptor: &AgentDescriptor,
    params: &mut Params,
) -> Result<(), AgentResult> {
    let urls = descriptor.pages.urls(params);
    if urls.is_empty() {
        return Ok(());
    }

    let started = Instant::now();
    let fetched = join_all(urls.iter().map(|url| fetcher.fetch(url))).await;

    let mut pages = object_param(params, "pages");
    let mut page_errors = object_param(params, "page_errors");
    for (url, outcome) in urls.into_iter().zip(fetched) {
        match outcome {
            Ok(html) => {
                pages.insert(url, Value::String(html));
            }
            Err(e) if descriptor.pages.is_required() => {
                warn!("{} cannot run without its page: {}", descriptor.name, e);
                return Err(AgentResult::failed(descriptor.name, ErrorKind::ProviderError, e.to_string())
                    .with_timing(started.elapsed().as_millis() as u64, 0));
            }
            Err(e) => {
                warn!("{} continues without a page: {}", descriptor.name, e);
                page_errors.insert(url, Value::String(e.reason));
            }
        }
    }

    params.insert("pages".to_string(), Value::Object(pages));
    if !page_errors.is_empty() {
        params.insert("page_errors".to_string(), Value::Object(page_errors));
    }
    Ok(())
}

fn object_param(params: &Params, name: &str) -> Map<String, Value> {
    match params.get(name) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}
