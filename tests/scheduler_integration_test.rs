//! Daemon ticks against the in-memory store with mock executors.

mod common;

use chrono::{Duration, Utc};
use common::{fixture, hypothesis_service, quiet_config};
use edgewise::adapters::pipeline::MockPipelineRunner;
use edgewise::adapters::workers::{MockResponse, MockWorker};
use edgewise::domain::models::{
    HandoffContext, HandoffStatus, HypothesisStatus, NotificationKind, PipelineConfig,
    PriorityTier, ResponsibilityConfig, ScheduledTask, TaskContext, WorkSource,
};
use edgewise::domain::ports::StateStore;
use edgewise::services::{HandoffQueue, NewHypothesis, TaskQueue};
use edgewise::TickOutcome;

#[tokio::test]
async fn test_idle_when_nothing_is_due() {
    let f = fixture(quiet_config(), MockWorker::new(), MockPipelineRunner::new(&[])).await;

    let report = f.daemon.tick().await;

    assert_eq!(report.tick, 1);
    assert_eq!(report.outcome, TickOutcome::Idle);
    assert!(report.pulled && report.pushed);
    assert!(f.worker.requests().await.is_empty());
}

#[tokio::test]
async fn test_responsibility_then_handoff_then_task() {
    let mut config = quiet_config();
    config.responsibilities.push(ResponsibilityConfig {
        role: "research".to_string(),
        name: "market-scan".to_string(),
        frequency: "1d".to_string(),
        instructions: "Scan new markets for mispricing".to_string(),
    });
    let f = fixture(config, MockWorker::new(), MockPipelineRunner::new(&["scan"])).await;
    f.daemon.seed().await.unwrap();

    let handoff = HandoffQueue::new(f.store.clone())
        .create(
            "research",
            "trader",
            "review-setup",
            PriorityTier::Medium,
            HandoffContext {
                reason: Some("New setup ready".to_string()),
                ..HandoffContext::default()
            },
        )
        .await
        .unwrap();
    let task = ScheduledTask::new(
        "Run the scan pipeline",
        Utc::now() - Duration::minutes(1),
        PriorityTier::Medium,
        TaskContext::Pipeline {
            pipeline: "scan".to_string(),
        },
    );
    TaskQueue::new(f.store.clone(), "24h").add(task.clone()).await.unwrap();

    let first = f.daemon.tick().await;
    assert!(matches!(
        first.outcome,
        TickOutcome::Responsibility { ref name, success: true, .. } if name == "market-scan"
    ));

    let second = f.daemon.tick().await;
    assert!(matches!(
        second.outcome,
        TickOutcome::Handoff { ref handoff_id, success: true, .. } if *handoff_id == handoff.id
    ));
    let handoffs = f.store.load_handoffs().await.unwrap();
    assert_eq!(handoffs[0].status, HandoffStatus::Completed);

    let third = f.daemon.tick().await;
    assert!(matches!(
        third.outcome,
        TickOutcome::ScheduledTask { ref task_id, success: true, .. } if *task_id == task.id
    ));
    assert_eq!(f.pipelines.runs().await, vec!["scan".to_string()]);
    assert!(f.store.load_scheduled_tasks().await.unwrap().is_empty());

    assert_eq!(f.daemon.tick().await.outcome, TickOutcome::Idle);

    let roles: Vec<String> = f.worker.requests().await.into_iter().map(|r| r.role).collect();
    assert_eq!(roles, vec!["research".to_string(), "trader".to_string()]);
}

#[tokio::test]
async fn test_low_confidence_override_preempts_queued_work() {
    let config = quiet_config();
    let f = fixture(config.clone(), MockWorker::new(), MockPipelineRunner::new(&[])).await;
    let service = hypothesis_service(f.store.clone(), &config, &f.notifier);
    let h = service
        .create(NewHypothesis {
            statement: "Late money is smart money".to_string(),
            test_method: "Buy when volume spikes in the last hour".to_string(),
            confidence: Some(0.25),
            ..NewHypothesis::default()
        })
        .await
        .unwrap();
    service
        .transition(&h.id, HypothesisStatus::Testing, None)
        .await
        .unwrap();
    HandoffQueue::new(f.store.clone())
        .create(
            "trader",
            "research",
            "follow-up",
            PriorityTier::Low,
            HandoffContext::default(),
        )
        .await
        .unwrap();

    let report = f.daemon.tick().await;

    match report.outcome {
        TickOutcome::Override {
            urgency, success, ..
        } => {
            assert_eq!(urgency, 65);
            assert!(success);
        }
        other => panic!("expected override, got {other:?}"),
    }
    let requests = f.worker.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].role, config.roles.research);
    assert!(matches!(requests[0].source, WorkSource::Override { .. }));
    assert!(requests[0].instructions.contains(&h.id));

    let pending = f.store.load_handoffs().await.unwrap();
    assert_eq!(pending[0].status, HandoffStatus::Pending);
    assert!(f
        .notifier
        .sent()
        .await
        .iter()
        .any(|n| n.kind == NotificationKind::StrategicOverride));
}

#[tokio::test]
async fn test_failed_worker_fails_the_handoff() {
    let worker = MockWorker::with_default_response(MockResponse::failure(2, "rate limited"));
    let f = fixture(quiet_config(), worker, MockPipelineRunner::new(&[])).await;
    let handoff = HandoffQueue::new(f.store.clone())
        .create(
            "research",
            "engineering",
            "fix-feed",
            PriorityTier::High,
            HandoffContext::default(),
        )
        .await
        .unwrap();

    let report = f.daemon.tick().await;

    assert!(matches!(report.outcome, TickOutcome::Handoff { success: false, .. }));
    let stored = f.store.load_handoffs().await.unwrap();
    assert_eq!(stored[0].id, handoff.id);
    assert_eq!(stored[0].status, HandoffStatus::Failed);
    assert!(f
        .notifier
        .sent()
        .await
        .iter()
        .any(|n| n.kind == NotificationKind::TaskFailed));
}

#[tokio::test]
async fn test_failed_pipeline_task_stays_queued() {
    let pipelines = MockPipelineRunner::new(&["settle"]).failing("settle");
    let f = fixture(quiet_config(), MockWorker::new(), pipelines).await;
    let task = ScheduledTask::new(
        "Settle resolved markets",
        Utc::now() - Duration::minutes(5),
        PriorityTier::High,
        TaskContext::Pipeline {
            pipeline: "settle".to_string(),
        },
    );
    TaskQueue::new(f.store.clone(), "24h").add(task.clone()).await.unwrap();

    let report = f.daemon.tick().await;

    assert!(matches!(
        report.outcome,
        TickOutcome::ScheduledTask { success: false, .. }
    ));
    let queued = f.store.load_scheduled_tasks().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id, task.id);
    assert_eq!(queued[0].attempts, 1);
    assert!(queued[0].last_error.is_some());

    let runs = f.store.load_pipeline_runs().await.unwrap();
    assert_eq!(runs.len(), 1);
    assert!(!runs[0].success);
}

#[tokio::test]
async fn test_recurring_pipelines_are_healed_once() {
    let mut config = quiet_config();
    config.pipelines.push(PipelineConfig {
        name: "scan".to_string(),
        command: "true".to_string(),
        args: vec![],
        frequency: "6h".to_string(),
        priority: PriorityTier::Medium,
    });
    let f = fixture(config, MockWorker::new(), MockPipelineRunner::new(&["scan"])).await;
    let (_, healed) = f.daemon.seed().await.unwrap();
    assert_eq!(healed, 1);

    // A second seed finds the task already queued.
    assert_eq!(f.daemon.seed().await.unwrap().1, 0);

    let queued = f.store.load_scheduled_tasks().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert!(queued[0].recurrence.is_some());
}

#[tokio::test]
async fn test_tick_counter_advances() {
    let f = fixture(quiet_config(), MockWorker::new(), MockPipelineRunner::new(&[])).await;
    for expected in 1..=3 {
        assert_eq!(f.daemon.tick().await.tick, expected);
    }
    assert_eq!(f.daemon.tick_count(), 3);
}
