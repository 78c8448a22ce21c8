use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use modelgate_core::config::EngineConfig;
use modelgate_core::error::EngineError;
use modelgate_core::model::{ModelScores, Scenario};
use modelgate_engine::engine::ModelGate;
use modelgate_engine::memory::{InMemoryCostCatalog, InMemoryModelCatalog, ScriptedTelemetry};
use modelgate_engine::refresher::RefreshOutcome;
use modelgate_testing::{FlakyCounterStore, TestBed, init_tracing, scored_model};
use serde_json::json;

#[tokio::test]
async fn quota_walkthrough_admit_then_record() -> anyhow::Result<()> {
    init_tracing();
    let bed = TestBed::new(vec![scored_model(
        "gpt-4o",
        1,
        &["AGENT_CHAT"],
        ModelScores::uniform(80.0),
    )])
    .await;

    for _ in 0..20 {
        bed.gate.record_usage("alice", "gpt-4o").await?;
    }
    assert_eq!(bed.gate.remaining_quota("alice", "gpt-4o", 100).await?, 80);

    // Admission alone must not consume quota.
    assert!(bed.gate.try_acquire("alice", "gpt-4o", 100).await?);
    assert_eq!(bed.gate.remaining_quota("alice", "gpt-4o", 100).await?, 80);

    bed.gate.record_usage("alice", "gpt-4o").await?;
    assert_eq!(bed.gate.remaining_quota("alice", "gpt-4o", 100).await?, 79);
    Ok(())
}

#[tokio::test]
async fn exhausted_quota_rejects_without_touching_counters() {
    init_tracing();
    let bed = TestBed::new(vec![scored_model(
        "gpt-4o",
        1,
        &["AGENT_CHAT"],
        ModelScores::uniform(80.0),
    )])
    .await;

    for _ in 0..3 {
        bed.gate.record_usage("alice", "gpt-4o").await.unwrap();
    }
    assert_eq!(bed.store.key_count().await, 1);

    // Over the limit: no admit, no new keys, rate counter untouched.
    assert!(!bed.gate.try_acquire("alice", "gpt-4o", 3).await.unwrap());
    assert_eq!(bed.store.key_count().await, 1);
    assert_eq!(
        bed.gate.rate_limit_current("alice", "gpt-4o").await.unwrap(),
        0
    );

    // Another user is unaffected by alice's exhaustion.
    assert!(bed.gate.try_acquire("bram", "gpt-4o", 3).await.unwrap());
    assert_eq!(bed.store.key_count().await, 2);
}

#[tokio::test]
async fn refresh_then_select_picks_scenario_winners() -> anyhow::Result<()> {
    init_tracing();
    let bed = TestBed::new(vec![
        scored_model("swift", 1, &["CASE_GENERATION"], ModelScores::default()),
        scored_model("sturdy", 2, &["CASE_GENERATION"], ModelScores::default()),
        scored_model("thrifty", 3, &["CASE_GENERATION"], ModelScores::default()),
    ])
    .await;

    bed.script_stats("swift", 100, 80, 80.0).await;
    bed.script_stats("sturdy", 1000, 1000, 400.0).await;
    bed.script_stats("thrifty", 200, 150, 250.0).await;
    bed.price_model("swift", 14.0, 10.0).await;
    bed.price_model("sturdy", 8.0, 4.0).await;
    bed.price_model("thrifty", 0.5, 0.5).await;

    let before = Utc::now();
    let outcome = bed.gate.refresh_scores().await?;
    assert_eq!(
        outcome,
        RefreshOutcome {
            refreshed: 3,
            failed: 0
        }
    );

    let swift = bed.catalog.get("swift").await.unwrap();
    assert!((swift.scores.speed - 100.0).abs() < 0.001);
    assert!((swift.scores.reliability - 80.0).abs() < 0.001);
    assert!((swift.scores.cost - 0.0).abs() < 0.001);
    let refreshed_at = swift.last_score_refresh.expect("refresh must stamp the row");
    assert!(refreshed_at >= before && refreshed_at <= Utc::now());

    let sturdy = bed.catalog.get("sturdy").await.unwrap();
    assert!((sturdy.scores.cost - 52.17).abs() < 0.001);
    let thrifty = bed.catalog.get("thrifty").await.unwrap();
    assert!((thrifty.scores.composite - 73.96).abs() < 0.001);

    let balanced = bed.gate.select_optimal_model("CASE_GENERATION").await?;
    assert_eq!(balanced.code, "thrifty");
    let fast = bed
        .gate
        .select_optimal_model_by_scenario("CASE_GENERATION", Scenario::Speed)
        .await?;
    assert_eq!(fast.code, "swift");
    let stable = bed
        .gate
        .select_optimal_model_by_scenario("CASE_GENERATION", Scenario::Reliability)
        .await?;
    assert_eq!(stable.code, "sturdy");
    let cheap = bed
        .gate
        .select_optimal_model_by_scenario("CASE_GENERATION", Scenario::Cost)
        .await?;
    assert_eq!(cheap.code, "thrifty");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rate_window_and_quota_period_expire_independently() {
    init_tracing();
    let mut config = EngineConfig::default();
    config.admission.rate_window_secs = 2;
    config.admission.quota_period_secs = 3600;
    let bed = TestBed::with_config(
        vec![scored_model(
            "gpt-4o",
            1,
            &["AGENT_CHAT"],
            ModelScores::uniform(80.0),
        )],
        config,
    )
    .await;

    bed.gate.record_usage("alice", "gpt-4o").await.unwrap();
    for _ in 0..3 {
        assert!(bed.gate.try_acquire("alice", "gpt-4o", 10).await.unwrap());
    }
    assert_eq!(
        bed.gate.rate_limit_current("alice", "gpt-4o").await.unwrap(),
        3
    );
    assert_eq!(bed.gate.remaining_quota("alice", "gpt-4o", 10).await.unwrap(), 9);

    // The rate window lapses; the quota period has not.
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(
        bed.gate.rate_limit_current("alice", "gpt-4o").await.unwrap(),
        0
    );
    assert_eq!(bed.gate.remaining_quota("alice", "gpt-4o", 10).await.unwrap(), 9);

    // Now the quota period lapses too.
    tokio::time::advance(Duration::from_secs(3599)).await;
    assert_eq!(bed.gate.remaining_quota("alice", "gpt-4o", 10).await.unwrap(), 10);
}

#[tokio::test]
async fn store_outage_fails_closed_then_recovers() {
    init_tracing();
    let catalog = Arc::new(InMemoryModelCatalog::new());
    catalog
        .upsert(scored_model(
            "resident",
            1,
            &["AGENT_CHAT"],
            ModelScores::uniform(88.0),
        ))
        .await;
    let store = Arc::new(FlakyCounterStore::failing_times(2));
    let gate = ModelGate::new(
        catalog,
        Arc::new(InMemoryCostCatalog::new()),
        Arc::new(ScriptedTelemetry::new()),
        store,
        EngineConfig::default(),
    )
    .unwrap();

    let denied = gate.try_acquire("mara", "resident", 5).await;
    assert!(matches!(denied, Err(EngineError::Store(_))));

    // Selection does not depend on the counter store.
    let picked = gate.select_optimal_model("AGENT_CHAT").await.unwrap();
    assert_eq!(picked.code, "resident");

    let dropped = gate.record_usage("mara", "resident").await;
    assert!(matches!(dropped, Err(EngineError::Store(_))));

    // Store back: admission resumes from a clean slate.
    assert!(gate.try_acquire("mara", "resident", 5).await.unwrap());
    gate.record_usage("mara", "resident").await.unwrap();
    assert_eq!(gate.remaining_quota("mara", "resident", 5).await.unwrap(), 4);
}

#[tokio::test]
async fn missing_candidates_surface_as_no_candidate() {
    init_tracing();
    let bed = TestBed::new(vec![scored_model(
        "gpt-4o",
        1,
        &["AGENT_CHAT"],
        ModelScores::uniform(80.0),
    )])
    .await;

    modelgate_testing::assert_no_candidate!(
        bed.gate.select_optimal_model("UI_SCRIPT_GENERATION").await,
        "UI_SCRIPT_GENERATION"
    );
    modelgate_testing::assert_no_candidate!(
        bed.gate.default_model("UI_SCRIPT_GENERATION").await,
        "UI_SCRIPT_GENERATION"
    );
    assert!(bed
        .gate
        .candidate_models("UI_SCRIPT_GENERATION")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn default_model_ignores_score_movements() -> anyhow::Result<()> {
    init_tracing();
    let bed = TestBed::new(vec![
        scored_model("anchor", 1, &["CASE_REVIEW"], ModelScores::default()),
        scored_model("hotshot", 5, &["CASE_REVIEW"], ModelScores::default()),
    ])
    .await;

    // With all scores level the optimal pick falls back to priority.
    assert_eq!(bed.gate.select_optimal_model("CASE_REVIEW").await?.code, "anchor");
    assert_eq!(bed.gate.default_model("CASE_REVIEW").await?.code, "anchor");

    bed.script_stats("anchor", 100, 60, 500.0).await;
    bed.script_stats("hotshot", 100, 99, 100.0).await;
    bed.gate.refresh_scores().await?;

    // Fresh scores move the optimal pick but never the default.
    assert_eq!(bed.gate.select_optimal_model("CASE_REVIEW").await?.code, "hotshot");
    assert_eq!(bed.gate.default_model("CASE_REVIEW").await?.code, "anchor");
    Ok(())
}

#[tokio::test]
async fn engine_config_deserializes_from_partial_json() {
    let config: EngineConfig = serde_json::from_value(json!({
        "admission": { "rate_window_secs": 5 },
        "scoring": { "default_score": 55.0 }
    }))
    .unwrap();

    assert_eq!(config.admission.rate_window_secs, 5);
    assert_eq!(config.admission.quota_period_secs, 86_400);
    assert!((config.scoring.default_score - 55.0).abs() < f64::EPSILON);
    assert!((config.scoring.speed_weights.speed - 0.70).abs() < f64::EPSILON);
    assert!(config.validate().is_ok());
}
