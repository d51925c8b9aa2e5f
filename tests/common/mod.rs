//! Common test utilities for integration tests
//!
//! Fixtures for wiring a daemon against the in-memory store and mock
//! executors.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use edgewise::adapters::code_executor::PaperTradingExecutor;
use edgewise::adapters::notifiers::RecordingNotifier;
use edgewise::adapters::pipeline::MockPipelineRunner;
use edgewise::adapters::store::MemoryStore;
use edgewise::adapters::sync::NoopSync;
use edgewise::adapters::workers::MockWorker;
use edgewise::domain::models::{Config, HealthRecord, Hypothesis, HypothesisStatus};
use edgewise::domain::ports::StateStore;
use edgewise::services::{Daemon, DaemonDeps, HypothesisService, NewHypothesis};

/// Config under which an empty, healthy store raises no priorities.
pub fn quiet_config() -> Config {
    let mut config = Config::default();
    config.detectors.velocity.min_trades_per_week = 0;
    config
}

/// A store with a fresh health record and every critical file present.
pub async fn healthy_store(config: &Config) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set_health(Some(HealthRecord {
            checked_at: Utc::now(),
            services: vec![],
            errors: vec![],
        }))
        .await;
    for file in &config.detectors.health.critical_files {
        store.set_state_file(&file.name, Some(Utc::now())).await;
    }
    store
}

pub fn hypothesis_service(
    store: Arc<MemoryStore>,
    config: &Config,
    notifier: &RecordingNotifier,
) -> HypothesisService<dyn StateStore> {
    let store: Arc<dyn StateStore> = store;
    HypothesisService::new(
        store,
        Arc::new(notifier.clone()),
        config.hypothesis.clone(),
        config.roles.clone(),
    )
}

/// Handles a test keeps to inspect what the daemon did.
pub struct Fixture {
    pub daemon: Daemon,
    pub store: Arc<MemoryStore>,
    pub worker: MockWorker,
    pub pipelines: MockPipelineRunner,
    pub notifier: RecordingNotifier,
}

pub async fn fixture(config: Config, worker: MockWorker, pipelines: MockPipelineRunner) -> Fixture {
    let store = healthy_store(&config).await;
    let notifier = RecordingNotifier::new();
    let dyn_store: Arc<dyn StateStore> = store.clone();
    let code_executor = PaperTradingExecutor::new(
        dyn_store.clone(),
        Arc::new(hypothesis_service(store.clone(), &config, &notifier)),
        Arc::new(pipelines.clone()),
        Arc::new(notifier.clone()),
    );
    let deps = DaemonDeps {
        store: dyn_store,
        code_executor: Arc::new(code_executor),
        worker: Arc::new(worker.clone()),
        pipelines: Arc::new(pipelines.clone()),
        sync: Arc::new(NoopSync),
        notifier: Arc::new(notifier.clone()),
    };
    Fixture {
        daemon: Daemon::new(config, deps),
        store,
        worker,
        pipelines,
        notifier,
    }
}

/// A hypothesis already under test.
pub async fn testing_hypothesis(
    service: &HypothesisService<dyn StateStore>,
    statement: &str,
) -> Hypothesis {
    let h = service
        .create(NewHypothesis {
            statement: statement.to_string(),
            rationale: "Thin liquidity".to_string(),
            test_method: "Paper trade every qualifying market".to_string(),
            entry_rules: Some("Buy YES below 0.20".to_string()),
            ..NewHypothesis::default()
        })
        .await
        .expect("create hypothesis");
    let h = service
        .transition(&h.id, HypothesisStatus::Testing, None)
        .await
        .expect("start testing");
    assert_eq!(h.status, HypothesisStatus::Testing);
    h
}
