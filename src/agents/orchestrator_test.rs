#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    use crate::agents::{
        AgentRegistry, AgentResult, Batch, Invocation, InvocationRequest, InvocationState, Orchestrator, Params,
        ResultStatus,
    };
    use crate::config::{Config, OnLimit, ProviderLimits};
    use crate::error::ErrorKind;
    use crate::gateway::testing::{completion, organic, ScriptedProvider, Step};
    use crate::gateway::{
        Backoff, Gateway, ProviderClient, ProviderFault, ProviderKind, ProviderPayload, ProviderRequest, RetryPolicy,
    };
    use crate::page::{MockPageFetcher, PageFetchError};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            per_call_timeout: Duration::from_secs(2),
            on_limit: OnLimit::Wait,
            max_wait: Duration::from_millis(100),
            backoff: Backoff::new(Duration::from_millis(1), Duration::from_millis(4)),
        }
    }

    fn limits() -> ProviderLimits {
        ProviderLimits {
            rate_limit: 1_000,
            window: Duration::from_secs(60),
            max_concurrency: 8,
        }
    }

    fn orchestrator_over(gateway: Gateway) -> Orchestrator {
        Orchestrator::new(Arc::new(gateway), Arc::new(AgentRegistry::builtin().unwrap()))
    }

    fn orchestrator(client: Arc<dyn ProviderClient>) -> Orchestrator {
        orchestrator_over(Gateway::with_policy(policy()).with_provider(client, &limits()))
    }

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    fn post(topic: &str) -> InvocationRequest {
        InvocationRequest::new(
            "post_creator",
            params(&[("topic", json!(topic)), ("platform", json!("twitter"))]),
        )
    }

    fn prompt(request: &ProviderRequest) -> &str {
        match &request.payload {
            ProviderPayload::Generation { prompt, .. } => prompt,
            ProviderPayload::Search { query, .. } => query,
        }
    }

    /// Reply delay depends on the topic, so completion order differs from
    /// request order.
    fn echo_provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::responding(ProviderKind::Generation, |request| {
            let text = prompt(request);
            let delay = if text.contains("slow") {
                Duration::from_millis(120)
            } else if text.contains("medium") {
                Duration::from_millis(60)
            } else {
                Duration::ZERO
            };
            Step::ok(completion("Launch day is here #Launch")).after(delay)
        }))
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let provider = echo_provider();
        let orchestrator = orchestrator(provider.clone());

        let batch = orchestrator
            .run_batch(
                vec![post("slow topic"), post("medium topic"), post("fast topic")],
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.succeeded_count, 3);
        let topics: Vec<&Value> = batch
            .results()
            .iter()
            .map(|result| &result.data.as_ref().unwrap()["topic"])
            .collect();
        assert_eq!(topics, vec!["slow topic", "medium topic", "fast topic"]);
        assert_eq!(provider.calls(), 3);
    }

    /// "cursed" topics hit a slow, retried server error; everything else
    /// answers at once.
    fn flaky_provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::responding(ProviderKind::Generation, |request| {
            if prompt(request).contains("cursed") {
                Step::fault(ProviderFault::Server("503 overloaded".to_string())).after(Duration::from_millis(80))
            } else {
                Step::ok(completion("fine #ok"))
            }
        }))
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_siblings() {
        let baseline = orchestrator(flaky_provider())
            .run_batch(vec![post("first"), post("third")], Duration::from_secs(5))
            .await;

        let provider = flaky_provider();
        let batch = orchestrator(provider.clone())
            .run_batch(
                vec![post("first"), post("cursed"), post("third")],
                Duration::from_secs(5),
            )
            .await;

        let statuses: Vec<ResultStatus> = batch.results().iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![ResultStatus::Ok, ResultStatus::Failed, ResultStatus::Ok]
        );
        let cursed = &batch.results()[1];
        assert_eq!(cursed.error_kind(), Some(ErrorKind::ProviderError));
        assert_eq!(cursed.attempts, 2);
        assert!(cursed.latency_ms >= 160);
        assert_eq!(batch.succeeded_count, 2);
        assert_eq!(batch.failed_count, 1);

        let pairs = [
            (&batch.results()[0], &baseline.results()[0]),
            (&batch.results()[2], &baseline.results()[1]),
        ];
        for (sibling, alone) in pairs {
            assert_eq!(sibling.attempts, alone.attempts);
            assert_eq!(sibling.attempts, 1);
            assert!(sibling.latency_ms <= alone.latency_ms + 30);
            assert!(sibling.latency_ms < cursed.latency_ms);
        }
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_deadline_fails_slow_invocations_and_keeps_finished() {
        let provider = Arc::new(ScriptedProvider::responding(ProviderKind::Generation, |request| {
            let delay = if prompt(request).contains("glacial") {
                Duration::from_millis(500)
            } else {
                Duration::ZERO
            };
            Step::ok(completion("done")).after(delay)
        }));
        let orchestrator = orchestrator(provider);

        let started = std::time::Instant::now();
        let batch = orchestrator
            .run_batch(vec![post("glacial"), post("quick")], Duration::from_millis(100))
            .await;

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(batch.results()[0].status, ResultStatus::Failed);
        assert_eq!(batch.results()[0].error_kind(), Some(ErrorKind::DeadlineExceeded));
        assert_eq!(batch.results()[0].agent_name, "post_creator");
        assert!(batch.results()[1].is_ok());
    }

    #[tokio::test]
    async fn test_unknown_agent_is_skipped_in_place() {
        let provider = echo_provider();
        let orchestrator = orchestrator(provider.clone());

        let batch = orchestrator
            .run_batch(
                vec![
                    InvocationRequest::new("nonexistent_agent", Params::new()),
                    post("fast"),
                ],
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.results()[0].status, ResultStatus::Skipped);
        assert_eq!(batch.results()[0].error_kind(), Some(ErrorKind::UnknownAgent));
        assert_eq!(batch.results()[0].agent_name, "nonexistent_agent");
        assert!(batch.results()[1].is_ok());
        assert_eq!(batch.skipped_count, 1);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_entries_never_reach_a_provider() {
        let generation = echo_provider();
        let search = Arc::new(ScriptedProvider::new(ProviderKind::Search));
        let orchestrator = orchestrator_over(
            Gateway::with_policy(policy())
                .with_provider(generation.clone(), &limits())
                .with_provider(search.clone(), &limits()),
        );

        let batch = orchestrator
            .run_batch(
                vec![
                    InvocationRequest::new("post_creator", params(&[("topic", json!("no platform"))])),
                    InvocationRequest::new(
                        "brand_mentions",
                        params(&[("brand_name", json!("HubSpot")), ("timeframe", json!("someday"))]),
                    ),
                ],
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(batch.results()[0].error_kind(), Some(ErrorKind::MissingParam));
        assert!(batch.results()[0]
            .error
            .as_ref()
            .unwrap()
            .message
            .contains("platform"));
        assert_eq!(batch.results()[1].status, ResultStatus::Skipped);
        assert_eq!(batch.results()[1].error_kind(), Some(ErrorKind::InvalidParam));
        assert_eq!(generation.calls(), 0);
        assert_eq!(search.calls(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_payload_is_parse_error() {
        let search = Arc::new(
            ScriptedProvider::new(ProviderKind::Search)
                .then(Step::ok(json!({"search_metadata": {"status": "Success"}})))
                .then(Step::ok(organic(&[("HubSpot pricing", "https://hubspot.com/pricing", "Plans")]))),
        );
        let orchestrator = orchestrator(search.clone());
        let rankings = || {
            InvocationRequest::new("competitor_rankings", params(&[("competitor", json!("hubspot"))]))
        };

        let first = orchestrator.run_batch(vec![rankings()], Duration::from_secs(5)).await;
        assert_eq!(first.results()[0].error_kind(), Some(ErrorKind::ParseError));
        assert_eq!(first.results()[0].attempts, 1);

        let second = orchestrator.run_batch(vec![rankings()], Duration::from_secs(5)).await;
        let data = second.results()[0].data.as_ref().unwrap();
        assert_eq!(data["rankings"][0]["url"], "https://hubspot.com/pricing");
        assert_eq!(search.calls(), 2);
    }

    #[tokio::test]
    async fn test_priority_reaches_the_provider_request() {
        let provider = echo_provider();
        let orchestrator = orchestrator(provider.clone());

        let batch = orchestrator
            .run_batch(vec![post("urgent").with_priority(0)], Duration::from_secs(5))
            .await;

        assert!(batch.results()[0].is_ok());
        assert_eq!(provider.requests()[0].priority, Some(0));
    }

    fn topic_of(request: &ProviderRequest) -> String {
        let text = prompt(request);
        let after = text.split("post about ").nth(1).unwrap_or_default();
        after.split(" with").next().unwrap_or_default().to_string()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_scarce_slots_go_to_higher_priority_first() {
        let provider = echo_provider();
        let orchestrator =
            orchestrator(provider.clone()).with_concurrency(ProviderKind::Generation, 1);

        let batch = orchestrator
            .run_batch(
                vec![
                    post("unranked"),
                    post("low").with_priority(9),
                    post("urgent").with_priority(0),
                    post("normal").with_priority(4),
                    post("also urgent").with_priority(0),
                ],
                Duration::from_secs(5),
            )
            .await;

        let served: Vec<String> = provider.requests().iter().map(topic_of).collect();
        assert_eq!(served, vec!["urgent", "also urgent", "normal", "low", "unranked"]);

        let topics: Vec<&Value> = batch
            .results()
            .iter()
            .map(|result| &result.data.as_ref().unwrap()["topic"])
            .collect();
        assert_eq!(topics, vec!["unranked", "low", "urgent", "normal", "also urgent"]);
    }

    fn mentions_and_sentiment() -> (Arc<ScriptedProvider>, Arc<ScriptedProvider>, Orchestrator) {
        let search = Arc::new(ScriptedProvider::responding(ProviderKind::Search, |_| {
            Step::ok(organic(&[
                ("HubSpot CRM review", "https://twitter.com/a/status/1", "Love the new CRM"),
                ("HubSpot outage", "https://www.linkedin.com/posts/b", "Support was slow today"),
            ]))
        }));
        let generation = Arc::new(ScriptedProvider::responding(ProviderKind::Generation, |_| {
            Step::ok(completion("Overall sentiment: positive, with some support concerns."))
        }));
        let orchestrator = orchestrator_over(
            Gateway::with_policy(policy())
                .with_provider(generation.clone(), &limits())
                .with_provider(search.clone(), &limits()),
        );
        (search, generation, orchestrator)
    }

    #[tokio::test]
    async fn test_mentions_feed_sentiment_analysis() {
        let (search, generation, orchestrator) = mentions_and_sentiment();

        let batch = orchestrator
            .run_batch(
                vec![
                    InvocationRequest::new(
                        "brand_mentions",
                        params(&[("brand_name", json!("HubSpot")), ("timeframe", json!("past_week"))]),
                    ),
                    InvocationRequest::new("sentiment_analyzer", params(&[("brand_name", json!("HubSpot"))]))
                        .with_inputs_from(0),
                ],
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(batch.succeeded_count, 2);
        assert_eq!(search.calls(), 1);
        let analysis_prompt = prompt(&generation.requests()[0]).to_string();
        assert!(analysis_prompt.contains("- HubSpot CRM review: Love the new CRM"));
        assert!(analysis_prompt.contains("- HubSpot outage: Support was slow today"));
        assert!(analysis_prompt.contains("over the past week"));
        assert!(!analysis_prompt.contains("no mentions supplied"));

        let sentiment = batch.results()[1].data.as_ref().unwrap();
        assert_eq!(sentiment["overall_sentiment"], "positive");
        assert_eq!(sentiment["timeframe"], "past_week");
    }

    #[tokio::test]
    async fn test_failed_input_slot_skips_dependent() {
        let search = Arc::new(ScriptedProvider::responding(ProviderKind::Search, |_| {
            Step::fault(ProviderFault::Rejected("invalid api key".to_string()))
        }));
        let generation = echo_provider();
        let orchestrator = orchestrator_over(
            Gateway::with_policy(policy())
                .with_provider(generation.clone(), &limits())
                .with_provider(search, &limits()),
        );

        let batch = orchestrator
            .run_batch(
                vec![
                    InvocationRequest::new("brand_mentions", params(&[("brand_name", json!("HubSpot"))])),
                    InvocationRequest::new("sentiment_analyzer", params(&[("brand_name", json!("HubSpot"))]))
                        .with_inputs_from(0),
                    post("independent"),
                ],
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(batch.results()[0].status, ResultStatus::Failed);
        assert_eq!(batch.results()[1].status, ResultStatus::Skipped);
        assert_eq!(batch.results()[1].error_kind(), Some(ErrorKind::UpstreamFailed));
        assert!(batch.results()[2].is_ok());
        assert_eq!(generation.calls(), 1);
    }

    #[tokio::test]
    async fn test_inputs_from_must_name_an_earlier_slot() {
        let (search, generation, orchestrator) = mentions_and_sentiment();

        let batch = orchestrator
            .run_batch(
                vec![
                    InvocationRequest::new("sentiment_analyzer", params(&[("brand_name", json!("HubSpot"))]))
                        .with_inputs_from(1),
                    InvocationRequest::new("brand_mentions", params(&[("brand_name", json!("HubSpot"))])),
                ],
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(batch.results()[0].error_kind(), Some(ErrorKind::InvalidParam));
        assert!(batch.results()[1].is_ok());
        assert_eq!(search.calls(), 1);
        assert_eq!(generation.calls(), 0);
    }

    #[tokio::test]
    async fn test_dependent_slot_is_validated_with_merged_params() {
        let provider = echo_provider();
        let orchestrator = orchestrator(provider.clone());

        let batch = orchestrator
            .run_batch(
                vec![
                    post("launch"),
                    InvocationRequest::new("content_performance", Params::new()).with_inputs_from(0),
                    InvocationRequest::new("content_performance", Params::new()),
                ],
                Duration::from_secs(5),
            )
            .await;

        assert!(batch.results()[1].is_ok());
        let prediction = batch.results()[1].data.as_ref().unwrap();
        assert_eq!(prediction["platform"], "twitter");
        assert_eq!(prediction["content_preview"], "Launch day is here #Launch...");
        assert_eq!(batch.results()[2].error_kind(), Some(ErrorKind::MissingParam));
        assert_eq!(provider.calls(), 2);
    }

    const HUBSPOT_HOME: &str = "<html><head><title>HubSpot CRM</title>\
        <meta name=\"description\" content=\"Free CRM for growing teams\"></head>\
        <body><h1>Grow better</h1></body></html>";

    fn seo_request() -> InvocationRequest {
        InvocationRequest::new(
            "seo_optimizer",
            params(&[("url", json!("https://www.hubspot.com")), ("keywords", json!(["crm software"]))]),
        )
    }

    #[tokio::test]
    async fn test_seo_page_is_fetched_before_dispatch() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().times(1).returning(|url| {
            if url == "https://www.hubspot.com" {
                Ok(HUBSPOT_HOME.to_string())
            } else {
                Err(PageFetchError {
                    url: url.to_string(),
                    reason: "unexpected url".to_string(),
                })
            }
        });
        let provider = Arc::new(ScriptedProvider::responding(ProviderKind::Generation, |_| {
            Step::ok(completion("Add the keyword to the title."))
        }));
        let orchestrator = orchestrator(provider.clone()).with_page_fetcher(Arc::new(fetcher));

        let batch = orchestrator.run_batch(vec![seo_request()], Duration::from_secs(5)).await;

        assert!(batch.results()[0].is_ok());
        let sent = prompt(&provider.requests()[0]).to_string();
        assert!(sent.contains("Title: HubSpot CRM"));
        assert!(sent.contains("Meta Description: Free CRM for growing teams"));
        assert!(sent.contains("H1 Tags: Grow better"));
        let data = batch.results()[0].data.as_ref().unwrap();
        assert_eq!(data["current_title"], "HubSpot CRM");
        assert_eq!(data["current_h1"], json!(["Grow better"]));
    }

    #[tokio::test]
    async fn test_seo_page_fetch_failure_fails_without_provider_call() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().times(1).returning(|url| {
            Err(PageFetchError {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        });
        let provider = echo_provider();
        let orchestrator = orchestrator(provider.clone()).with_page_fetcher(Arc::new(fetcher));

        let batch = orchestrator
            .run_batch(vec![seo_request(), post("unaffected")], Duration::from_secs(5))
            .await;

        let seo = &batch.results()[0];
        assert_eq!(seo.status, ResultStatus::Failed);
        assert_eq!(seo.error_kind(), Some(ErrorKind::ProviderError));
        assert!(seo
            .error
            .as_ref()
            .unwrap()
            .message
            .contains("failed to fetch https://www.hubspot.com: connection refused"));
        assert!(batch.results()[1].is_ok());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_supplied_page_html_is_not_refetched() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().never();
        let provider = echo_provider();
        let orchestrator = orchestrator(provider.clone()).with_page_fetcher(Arc::new(fetcher));

        let mut request = seo_request();
        request.params.insert("page_html".to_string(), json!(HUBSPOT_HOME));
        let batch = orchestrator.run_batch(vec![request], Duration::from_secs(5)).await;

        assert!(batch.results()[0].is_ok());
        assert!(prompt(&provider.requests()[0]).contains("Title: HubSpot CRM"));
    }

    #[tokio::test]
    async fn test_price_pages_record_fetch_errors_per_url() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().times(3).returning(|url| match url {
            "https://shop.example/widget" => Ok("<span class=\"price\">$50</span>".to_string()),
            "https://rival.example/a" => Ok("<div><span class=\"price\"> $45 </span></div>".to_string()),
            _ => Err(PageFetchError {
                url: url.to_string(),
                reason: "timed out".to_string(),
            }),
        });
        let provider = Arc::new(ScriptedProvider::responding(ProviderKind::Generation, |_| {
            Step::ok(completion("Hold the price."))
        }));
        let orchestrator = orchestrator(provider.clone()).with_page_fetcher(Arc::new(fetcher));

        let batch = orchestrator
            .run_batch(
                vec![InvocationRequest::new(
                    "price_monitor",
                    params(&[
                        ("product_url", json!("https://shop.example/widget")),
                        (
                            "competitors",
                            json!(["https://rival.example/a", "https://rival.example/b"]),
                        ),
                    ]),
                )],
                Duration::from_secs(5),
            )
            .await;

        assert!(batch.results()[0].is_ok());
        let data = batch.results()[0].data.as_ref().unwrap();
        assert_eq!(
            data["prices"],
            json!({
                "https://shop.example/widget": "$50",
                "https://rival.example/a": "$45",
                "https://rival.example/b": "Error: timed out"
            })
        );
        let sent = prompt(&provider.requests()[0]).to_string();
        assert!(sent.contains("Main product (https://shop.example/widget): $50"));
        assert!(sent.contains("- https://rival.example/b: Error: timed out"));
    }

    /// Records the highest number of overlapping `send` calls.
    struct InFlightCounter {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ProviderClient for InFlightCounter {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Generation
        }

        async fn send(&self, _request: &ProviderRequest) -> Result<Value, ProviderFault> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(30)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(completion("counted #ok"))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bulkhead_caps_in_flight_calls() {
        let counter = Arc::new(InFlightCounter {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let orchestrator =
            orchestrator(counter.clone()).with_concurrency(ProviderKind::Generation, 2);

        let requests = (0..8).map(|i| post(&format!("topic {}", i))).collect();
        let batch = orchestrator.run_batch(requests, Duration::from_secs(5)).await;

        assert_eq!(batch.succeeded_count, 8);
        assert!(counter.peak.load(Ordering::SeqCst) <= 2);
        assert!(counter.peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_from_config_uses_provider_limits() {
        let mut config = Config::default();
        config.providers.generation.max_concurrency = 1;
        let counter = Arc::new(InFlightCounter {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let gateway = Gateway::with_policy(policy()).with_provider(counter.clone(), &limits());
        let orchestrator = Orchestrator::from_config(
            &config,
            Arc::new(gateway),
            Arc::new(AgentRegistry::builtin().unwrap()),
        );

        let batch = orchestrator
            .run_batch(vec![post("a"), post("b"), post("c")], Duration::from_secs(5))
            .await;

        assert_eq!(batch.succeeded_count, 3);
        assert_eq!(counter.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let orchestrator = orchestrator(echo_provider());
        let batch = orchestrator.run_batch(Vec::new(), Duration::from_secs(1)).await;

        assert!(batch.is_empty());
        assert_eq!(batch.succeeded_count + batch.failed_count + batch.skipped_count, 0);
    }

    #[test]
    fn test_invocation_terminal_state_is_final() {
        let mut invocation = Invocation::new(0, "post_creator");
        assert_eq!(invocation.state(), InvocationState::Pending);

        assert!(invocation.dispatch());
        assert!(!invocation.dispatch());
        assert_eq!(invocation.state(), InvocationState::Dispatched);

        assert!(invocation.complete(AgentResult::failed(
            "post_creator",
            ErrorKind::Timeout,
            "slow"
        )));
        assert_eq!(invocation.state(), InvocationState::Failed);

        assert!(!invocation.complete(AgentResult::ok("post_creator", Default::default())));
        assert_eq!(invocation.state(), InvocationState::Failed);
    }

    #[test]
    fn test_pending_can_be_skipped_directly() {
        let mut invocation = Invocation::new(3, "nonexistent_agent");
        assert!(invocation.complete(AgentResult::skipped(
            "nonexistent_agent",
            ErrorKind::UnknownAgent,
            "unknown agent 'nonexistent_agent'"
        )));
        assert_eq!(invocation.state(), InvocationState::Skipped);
        assert!(!invocation.dispatch());
        assert_eq!(invocation.position(), 3);
    }

    #[test]
    fn test_batch_counts() {
        let batch = Batch::new(
            uuid::Uuid::new_v4(),
            chrono::Utc::now(),
            vec![
                AgentResult::ok("post_creator", Default::default()),
                AgentResult::failed("seo_optimizer", ErrorKind::RateLimited, "429"),
                AgentResult::skipped("nonexistent_agent", ErrorKind::UnknownAgent, "unknown"),
                AgentResult::failed("price_monitor", ErrorKind::Timeout, "slow"),
            ],
            1_500,
        );

        assert_eq!(batch.succeeded_count, 1);
        assert_eq!(batch.failed_count, 2);
        assert_eq!(batch.skipped_count, 1);
        assert_eq!(batch.total_latency_ms, 1_500);
    }
}
