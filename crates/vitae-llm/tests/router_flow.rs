//! End-to-end routing behaviour against scripted providers

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vitae_llm::{
    AiRouter, Error, ModelTarget, PriceTable, ModelPricing, ProviderId, RetryPolicy, RouteOptions,
    RoutePolicy, RoutingTable, ScriptedProvider, Step, TaskType, TokenUsage,
};

fn table(timeout_ms: u64, retries: u32) -> RoutingTable {
    RoutingTable::new(RoutePolicy::new(
        ModelTarget::new(ProviderId::Anthropic, "claude-haiku"),
        ModelTarget::new(ProviderId::OpenAi, "gpt-mini"),
        timeout_ms,
        retries,
    ))
}

fn router(
    primary: &Arc<ScriptedProvider>,
    fallback: &Arc<ScriptedProvider>,
    table: RoutingTable,
) -> AiRouter {
    AiRouter::builder()
        .provider(primary.clone())
        .provider(fallback.clone())
        .routing_table(table)
        .retry_policy(RetryPolicy::immediate())
        .build()
        .unwrap()
}

fn pair() -> (Arc<ScriptedProvider>, Arc<ScriptedProvider>) {
    (
        Arc::new(ScriptedProvider::new(ProviderId::Anthropic)),
        Arc::new(ScriptedProvider::new(ProviderId::OpenAi)),
    )
}

async fn collect(stream: vitae_llm::TextStream) -> (String, Option<Error>) {
    let mut text = String::new();
    let mut error = None;
    let items: Vec<_> = stream.collect().await;
    for item in items {
        match item {
            Ok(chunk) => text.push_str(&chunk),
            Err(e) => error = Some(e),
        }
    }
    (text, error)
}

// ============================================================================
// Single-shot routing
// ============================================================================

#[tokio::test]
async fn test_primary_serves_request() {
    let (primary, fallback) = pair();
    let router = router(&primary, &fallback, table(1_000, 2));

    let result = router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();

    assert_eq!(result.content, "anthropic reply");
    assert_eq!(result.provider, ProviderId::Anthropic);
    assert_eq!(result.model, "claude-haiku");
    assert_eq!(fallback.calls(), 0);

    let stats = router.get_stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.successful_requests, 1);
    assert_eq!(stats.success_rate, "100.00%");
    assert_eq!(stats.fallback_rate, "0.00%");
}

#[tokio::test]
async fn test_fallback_after_retries_exhausted() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Fail(503)));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(1_000, 2));

    let result = router
        .route(TaskType::IMPROVE_SUMMARY, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();

    assert_eq!(result.provider, ProviderId::OpenAi);
    assert_eq!(result.model, "gpt-mini");
    assert_eq!(primary.calls(), 2);
    assert_eq!(fallback.calls(), 1);

    let stats = router.get_stats();
    assert_eq!(stats.fallback_used, 1);
    assert_eq!(stats.failed_requests, 0);
    assert_eq!(stats.fallback_rate, "100.00%");
}

#[tokio::test]
async fn test_retry_recovers_on_primary() {
    let primary = Arc::new(
        ScriptedProvider::new(ProviderId::Anthropic)
            .then(Step::Timeout)
            .then(Step::reply("second try")),
    );
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(1_000, 3));

    let result = router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();

    assert_eq!(result.content, "second try");
    assert_eq!(primary.calls(), 2);
    assert_eq!(fallback.calls(), 0);
    assert_eq!(router.get_stats().fallback_used, 0);
}

#[tokio::test]
async fn test_total_failure_reports_fallback_error() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Fail(500)));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi).always(Step::Fail(502)));
    let router = router(&primary, &fallback, table(1_000, 2));

    let err = router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap_err();

    match err {
        Error::AllProvidersFailed { task, source } => {
            assert_eq!(task, "chat");
            assert_eq!(source.status(), Some(502));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(primary.calls(), 2);
    assert_eq!(fallback.calls(), 2);

    let stats = router.get_stats();
    assert_eq!(stats.failed_requests, 1);
    assert_eq!(stats.successful_requests, 0);
    assert_eq!(stats.success_rate, "0.00%");
}

#[tokio::test]
async fn test_unknown_task_uses_default_policy() {
    let (primary, fallback) = pair();
    let table = table(1_000, 1).with_policy(
        TaskType::TRANSLATE,
        RoutePolicy::new(
            ModelTarget::new(ProviderId::OpenAi, "gpt"),
            ModelTarget::new(ProviderId::Anthropic, "claude-opus"),
            2_000,
            1,
        ),
    );
    let router = router(&primary, &fallback, table);

    let result = router
        .route("write_limerick", "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();
    assert_eq!(result.provider, ProviderId::Anthropic);

    let result = router
        .route(TaskType::TRANSLATE, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();
    assert_eq!(result.provider, ProviderId::OpenAi);
    assert_eq!(fallback.requests()[0].timeout_ms, 2_000);
}

#[tokio::test]
async fn test_unavailable_primary_goes_to_fallback_without_calls() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).unavailable());
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(1_000, 3));

    let result = router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();

    assert_eq!(result.provider, ProviderId::OpenAi);
    assert_eq!(primary.calls(), 0);
}

#[tokio::test]
async fn test_no_provider_available() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).unavailable());
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi).unavailable());
    let router = router(&primary, &fallback, table(1_000, 3));

    let err = router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoProviderAvailable { .. }));
    let stats = router.get_stats();
    assert_eq!(stats.failed_requests, 1);
    assert_eq!(stats.total_requests, 1);
    assert_eq!(primary.calls() + fallback.calls(), 0);
}

#[tokio::test]
async fn test_exhausted_primary_with_unavailable_fallback() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Fail(503)));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi).unavailable());
    let router = router(&primary, &fallback, table(1_000, 2));

    let err = router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoProviderAvailable { ref task } if task == "chat"));
    assert_eq!(primary.calls(), 2);
    assert_eq!(fallback.calls(), 0);

    let stats = router.get_stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.failed_requests, 1);
    assert_eq!(stats.successful_requests, 0);
}

#[tokio::test]
async fn test_cost_accounting() {
    let primary = Arc::new(
        ScriptedProvider::new(ProviderId::Anthropic)
            .with_usage(TokenUsage::new(1_000_000, 500_000))
            .with_pricing(
                PriceTable::new(ModelPricing::new(1.0, 2.0))
                    .with_model("claude-haiku", ModelPricing::new(3.0, 4.0)),
            ),
    );
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(1_000, 1));

    for _ in 0..2 {
        router
            .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
            .await
            .unwrap();
    }

    let stats = router.get_stats();
    // 3.0 input + 2.0 output per call
    assert!((stats.total_cost - 10.0).abs() < 1e-9);

    let usage = &stats.by_provider[&ProviderId::Anthropic];
    assert_eq!(usage.requests, 2);
    assert_eq!(usage.input_tokens, 2_000_000);
    assert_eq!(usage.output_tokens, 1_000_000);
    assert!(!stats.by_provider.contains_key(&ProviderId::OpenAi));
}

// ============================================================================
// PII
// ============================================================================

#[tokio::test]
async fn test_provider_sees_tokens_caller_sees_originals() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Echo));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(1_000, 1));

    let input = "Reach me at jane.doe@example.com or 06 12 34 56 78, 12 rue de la Paix.";
    let result = router
        .route(TaskType::IMPROVE_SUMMARY, "sys", input, &RouteOptions::default())
        .await
        .unwrap();

    let seen = &primary.inputs()[0];
    assert!(seen.contains("[PII_EMAIL_1]"));
    assert!(seen.contains("[PII_PHONE_1]"));
    assert!(seen.contains("[PII_ADDRESS_1]"));
    assert!(!seen.contains("jane.doe"));
    assert!(!seen.contains("06 12"));
    assert!(!seen.contains("rue de la Paix"));

    assert_eq!(result.content, input);
}

#[tokio::test]
async fn test_fallback_receives_masked_input() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Fail(500)));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi).always(Step::Echo));
    let router = router(&primary, &fallback, table(1_000, 1));

    let input = "Email: a.b@example.org";
    let result = router
        .route(TaskType::CHAT, "sys", input, &RouteOptions::default())
        .await
        .unwrap();

    assert_eq!(fallback.inputs(), vec!["Email: [PII_EMAIL_1]".to_string()]);
    assert_eq!(result.content, input);
}

// ============================================================================
// Concurrency, cancellation, timeouts
// ============================================================================

#[tokio::test]
async fn test_concurrent_requests_keep_counters_consistent() {
    let primary = Arc::new(
        ScriptedProvider::new(ProviderId::Anthropic)
            .then(Step::Fail(400))
            .then(Step::Fail(400))
            .always(Step::Delayed(5, "ok".to_string())),
    );
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi).always(Step::Fail(500)));
    let router = Arc::new(router(&primary, &fallback, table(1_000, 1)));

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                router
                    .route(TaskType::CHAT, "sys", &format!("request {i}"), &RouteOptions::default())
                    .await
            })
        })
        .collect();

    let mut ok = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            ok += 1;
        }
    }

    let stats = router.get_stats();
    assert_eq!(stats.total_requests, 20);
    assert_eq!(stats.successful_requests, ok);
    assert_eq!(stats.successful_requests + stats.failed_requests, 20);
    assert_eq!(stats.failed_requests, 2);
}

#[tokio::test]
async fn test_cancellation_aborts_request() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Hang));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(10_000, 1));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = router
        .route_with_cancel(TaskType::CHAT, "sys", "hello", &RouteOptions::default(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(fallback.calls(), 0);
    assert_eq!(router.get_stats().failed_requests, 1);
}

#[tokio::test]
async fn test_hung_primary_times_out_then_falls_back() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Hang));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(100, 2));

    let result = router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();

    assert_eq!(result.provider, ProviderId::OpenAi);
    assert_eq!(primary.calls(), 2);
}

#[tokio::test]
async fn test_policy_swap_does_not_affect_request_in_flight() {
    let primary = Arc::new(
        ScriptedProvider::new(ProviderId::Anthropic).then(Step::Delayed(200, "slow".to_string())),
    );
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = Arc::new(router(&primary, &fallback, table(2_000, 1)));

    let in_flight = {
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            router
                .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let swapped = RoutingTable::new(RoutePolicy::new(
        ModelTarget::new(ProviderId::OpenAi, "gpt"),
        ModelTarget::new(ProviderId::Anthropic, "claude-haiku"),
        50,
        1,
    ));
    router.set_routing_table(swapped).unwrap();

    let first = in_flight.await.unwrap().unwrap();
    assert_eq!(first.provider, ProviderId::Anthropic);
    assert_eq!(first.content, "slow");
    assert_eq!(primary.requests()[0].timeout_ms, 2_000);

    let second = router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();
    assert_eq!(second.provider, ProviderId::OpenAi);
    assert_eq!(fallback.requests()[0].model, "gpt");
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_stream_is_lazy() {
    let (primary, fallback) = pair();
    let router = router(&primary, &fallback, table(1_000, 1));

    let stream = router.route_stream(TaskType::CHAT, "sys", "hello", &RouteOptions::default());
    assert_eq!(primary.stream_calls(), 0);
    assert_eq!(router.get_stats().total_requests, 0);

    let (text, error) = collect(stream).await;
    assert_eq!(text, "anthropic reply");
    assert!(error.is_none());
    assert_eq!(primary.stream_calls(), 1);
}

#[tokio::test]
async fn test_stream_unmasks_split_tokens() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).then(Step::Chunks(vec![
        "Write to [PII_EM".to_string(),
        "AIL_1] or [PII".to_string(),
        "_PHONE_1] today".to_string(),
    ])));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(1_000, 1));

    let input = "jane@example.com, +33 6 12 34 56 78";
    let stream = router.route_stream(TaskType::CHAT, "sys", input, &RouteOptions::default());
    let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;

    assert_eq!(
        chunks.concat(),
        "Write to jane@example.com or +33 6 12 34 56 78 today"
    );
    assert!(chunks.iter().all(|c| !c.contains("[PII")));
    assert!(primary.inputs()[0].contains("[PII_EMAIL_1]"));
}

#[tokio::test]
async fn test_stream_echo_round_trips_pii() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Echo));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(1_000, 1));

    let input = "Call 06 12 34 56 78 or mail jo@example.fr";
    let (text, error) =
        collect(router.route_stream(TaskType::CHAT, "sys", input, &RouteOptions::default())).await;

    assert!(error.is_none());
    assert_eq!(text, input);
}

#[tokio::test]
async fn test_broken_primary_stream_restarts_on_fallback() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).then(Step::BrokenStream(
        vec!["par".to_string(), "tial ".to_string()],
    )));
    let fallback = Arc::new(
        ScriptedProvider::new(ProviderId::OpenAi)
            .then(Step::Chunks(vec!["full ".to_string(), "answer".to_string()])),
    );
    let router = router(&primary, &fallback, table(1_000, 1));

    let (text, error) =
        collect(router.route_stream(TaskType::CHAT, "sys", "hello", &RouteOptions::default())).await;

    assert!(error.is_none());
    assert_eq!(text, "partial full answer");
    assert_eq!(fallback.stream_calls(), 1);

    let stats = router.get_stats();
    assert_eq!(stats.successful_requests, 1);
    assert_eq!(stats.fallback_used, 1);
    assert_eq!(stats.total_cost, 0.0);
}

#[tokio::test]
async fn test_stream_failure_on_both_providers() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Fail(500)));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi).always(Step::BrokenStream(
        vec!["half".to_string()],
    )));
    let router = router(&primary, &fallback, table(1_000, 1));

    let items: Vec<_> = router
        .route_stream(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "half");
    assert!(matches!(items[1], Err(Error::AllProvidersFailed { .. })));

    let stats = router.get_stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.failed_requests, 1);
}

#[tokio::test]
async fn test_stream_with_no_provider_available() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).unavailable());
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi).unavailable());
    let router = router(&primary, &fallback, table(1_000, 1));

    let items: Vec<_> = router
        .route_stream(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(Error::NoProviderAvailable { .. })));
}

#[tokio::test]
async fn test_stream_failed_primary_with_unavailable_fallback() {
    let primary = Arc::new(ScriptedProvider::new(ProviderId::Anthropic).always(Step::Fail(503)));
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi).unavailable());
    let router = router(&primary, &fallback, table(1_000, 2));

    let items: Vec<_> = router
        .route_stream(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(Error::NoProviderAvailable { .. })));
    assert_eq!(primary.stream_calls(), 1);
    assert_eq!(router.get_stats().failed_requests, 1);
}

#[tokio::test]
async fn test_stream_usage_is_priced() {
    let primary = Arc::new(
        ScriptedProvider::new(ProviderId::Anthropic)
            .always(Step::Chunks(vec!["Bon".to_string(), "jour".to_string()]))
            .with_usage(TokenUsage::new(1_000_000, 500_000))
            .with_pricing(PriceTable::new(ModelPricing::new(2.0, 4.0))),
    );
    let fallback = Arc::new(ScriptedProvider::new(ProviderId::OpenAi));
    let router = router(&primary, &fallback, table(1_000, 1));

    let (text, error) =
        collect(router.route_stream(TaskType::CHAT, "sys", "hello", &RouteOptions::default())).await;

    assert!(error.is_none());
    assert_eq!(text, "Bonjour");

    let stats = router.get_stats();
    assert_eq!(stats.successful_requests, 1);
    assert!((stats.total_cost - 4.0).abs() < 1e-9);
    let usage = &stats.by_provider[&ProviderId::Anthropic];
    assert_eq!(usage.input_tokens, 1_000_000);
    assert_eq!(usage.output_tokens, 500_000);
    assert!((usage.cost - 4.0).abs() < 1e-9);
}

// ============================================================================
// Stats & availability
// ============================================================================

#[tokio::test]
async fn test_reset_stats() {
    let (primary, fallback) = pair();
    let router = router(&primary, &fallback, table(1_000, 1));

    router
        .route(TaskType::CHAT, "sys", "hello", &RouteOptions::default())
        .await
        .unwrap();
    let before = router.get_stats();
    assert_eq!(before.total_requests, 1);

    router.reset_stats();
    let after = router.get_stats();
    assert_eq!(after.total_requests, 0);
    assert_eq!(after.success_rate, "0%");
    assert!(after.by_provider.is_empty());
    assert!(after.since >= before.since);
}

#[tokio::test]
async fn test_check_availability_tracks_providers() {
    let (primary, fallback) = pair();
    let router = router(&primary, &fallback, table(1_000, 1));

    let report = router.check_availability();
    assert!(report.any_available);
    assert_eq!(report.per_provider.len(), 2);

    primary.set_available(false);
    fallback.set_available(false);
    let report = router.check_availability();
    assert!(!report.any_available);
    assert!(!report.per_provider[&ProviderId::Anthropic]);
}
