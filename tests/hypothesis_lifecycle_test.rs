//! End-to-end hypothesis lifecycle through the service layer.

mod common;

use common::{hypothesis_service, quiet_config, testing_hypothesis};
use edgewise::adapters::notifiers::RecordingNotifier;
use edgewise::adapters::store::MemoryStore;
use edgewise::domain::models::{HandoffStatus, HypothesisStatus, NotificationKind, PriorityTier};
use edgewise::domain::ports::StateStore;
use edgewise::services::{HypothesisRanker, NewHypothesis};
use edgewise::DomainError;
use std::sync::Arc;

#[tokio::test]
async fn test_hypothesis_validates_after_a_full_winning_sample() {
    let config = quiet_config();
    let store = Arc::new(MemoryStore::new());
    let notifier = RecordingNotifier::new();
    let service = hypothesis_service(store.clone(), &config, &notifier);

    let h = testing_hypothesis(&service, "Longshots on weather markets are overpriced").await;
    for won in [true, true, false, true, false] {
        service.record_trade(&h.id, won, if won { 1.0 } else { -1.0 }).await.unwrap();
    }
    let (h, outcome) = service
        .add_evidence(&h.id, "Spreads narrowed after resolution", Some(true), 0.1)
        .await
        .unwrap();
    assert!((outcome.confidence - 0.6).abs() < 1e-9);
    assert!(outcome.auto_transition.is_none(), "0.60 is below the auto-validate bound");

    let h = service
        .transition(&h.id, HypothesisStatus::Validated, Some("Edge held over 5 trades"))
        .await
        .unwrap();
    assert_eq!(h.status, HypothesisStatus::Validated);
    assert_eq!(h.conclusion.as_deref(), Some("Edge held over 5 trades"));
    assert!(h.ended_at.is_some());
    assert_eq!(h.confidence_trajectory().len(), 2);

    let learnings = store.load_learnings().await.unwrap();
    assert_eq!(learnings.len(), 1);
    assert_eq!(learnings[0].hypothesis_id, h.id);
    assert_eq!(learnings[0].outcome, HypothesisStatus::Validated);
    assert_eq!(learnings[0].test_results.trades, 5);
}

#[tokio::test]
async fn test_rejected_validation_changes_nothing() {
    let config = quiet_config();
    let store = Arc::new(MemoryStore::new());
    let notifier = RecordingNotifier::new();
    let service = hypothesis_service(store.clone(), &config, &notifier);

    let h = testing_hypothesis(&service, "Favorites drift late").await;
    for _ in 0..4 {
        service.record_trade(&h.id, true, 1.0).await.unwrap();
    }
    service
        .add_evidence(&h.id, "Drift seen again", Some(true), 0.1)
        .await
        .unwrap();
    let before = service.get(&h.id).await.unwrap();

    let err = service
        .transition(&h.id, HypothesisStatus::Validated, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::InsufficientSample {
            required: 5,
            actual: 4
        }
    ));
    assert_eq!(service.get(&h.id).await.unwrap(), before);
    assert!(store.load_learnings().await.unwrap().is_empty());

    let sent = notifier.sent().await;
    assert!(sent
        .iter()
        .any(|n| n.kind == NotificationKind::TransitionRejected));
}

#[tokio::test]
async fn test_contradicting_evidence_auto_invalidates() {
    let config = quiet_config();
    let store = Arc::new(MemoryStore::new());
    let notifier = RecordingNotifier::new();
    let service = hypothesis_service(store.clone(), &config, &notifier);

    let h = testing_hypothesis(&service, "Debate nights move markets").await;
    let (h, outcome) = service
        .add_evidence(&h.id, "No movement across three debates", Some(false), -0.3)
        .await
        .unwrap();

    assert!((outcome.confidence - 0.2).abs() < 1e-9);
    let effects = outcome.auto_transition.expect("auto transition");
    assert_eq!(effects.to, HypothesisStatus::Invalidated);
    assert_eq!(h.status, HypothesisStatus::Invalidated);
    assert!(h.conclusion.unwrap().starts_with("Auto-invalidated"));
    assert_eq!(store.load_learnings().await.unwrap().len(), 1);

    let err = service
        .add_evidence(&h.id, "Too late", None, 0.1)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::HypothesisNotActive { .. }));
}

#[tokio::test]
async fn test_blocking_queues_an_unblock_handoff() {
    let config = quiet_config();
    let store = Arc::new(MemoryStore::new());
    let notifier = RecordingNotifier::new();
    let service = hypothesis_service(store.clone(), &config, &notifier);

    let h = testing_hypothesis(&service, "Order book imbalance predicts moves").await;
    let err = service
        .transition(&h.id, HypothesisStatus::Blocked, Some("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::MissingField(ref f) if f == "reason"));

    let h = service
        .transition(&h.id, HypothesisStatus::Blocked, Some("Order book feed is down"))
        .await
        .unwrap();
    assert_eq!(h.blocked_reason.as_deref(), Some("Order book feed is down"));

    let handoffs = store.load_handoffs().await.unwrap();
    assert_eq!(handoffs.len(), 1);
    assert_eq!(handoffs[0].to_role, config.roles.engineering);
    assert_eq!(handoffs[0].priority, PriorityTier::High);
    assert_eq!(handoffs[0].status, HandoffStatus::Pending);
    assert_eq!(handoffs[0].context.hypothesis_id.as_deref(), Some(h.id.as_str()));

    let h = service
        .transition(&h.id, HypothesisStatus::Testing, None)
        .await
        .unwrap();
    assert!(h.blocked_reason.is_none());
}

#[tokio::test]
async fn test_testing_requires_entry_criteria() {
    let config = quiet_config();
    let store = Arc::new(MemoryStore::new());
    let notifier = RecordingNotifier::new();
    let service = hypothesis_service(store, &config, &notifier);

    let h = service
        .create(NewHypothesis {
            statement: "Crowds overreact".to_string(),
            test_method: "Watch the markets".to_string(),
            ..NewHypothesis::default()
        })
        .await
        .unwrap();
    let err = service
        .transition(&h.id, HypothesisStatus::Testing, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition { .. }));
    assert_eq!(
        service.get(&h.id).await.unwrap().status,
        HypothesisStatus::Proposed
    );
}

#[tokio::test]
async fn test_ranking_skips_concluded_hypotheses() {
    let config = quiet_config();
    let store = Arc::new(MemoryStore::new());
    let notifier = RecordingNotifier::new();
    let service = hypothesis_service(store, &config, &notifier);

    let strong = testing_hypothesis(&service, "Election markets lag polls").await;
    service
        .add_evidence(&strong.id, "Lag confirmed", Some(true), 0.15)
        .await
        .unwrap();
    let weak = testing_hypothesis(&service, "Sports markets lag injuries").await;
    service
        .add_evidence(&weak.id, "No lag", Some(false), -0.1)
        .await
        .unwrap();
    let dead = testing_hypothesis(&service, "Rain markets lag radar").await;
    service
        .transition(&dead.id, HypothesisStatus::Invalidated, None)
        .await
        .unwrap();

    let hypotheses = service.list(None).await.unwrap();
    let learnings = service.learnings().await.unwrap();
    let ranked = HypothesisRanker::new().rank(&hypotheses, &learnings);

    let ids: Vec<&str> = ranked.iter().map(|s| s.hypothesis_id.as_str()).collect();
    assert_eq!(ids, vec![strong.id.as_str(), weak.id.as_str()]);
    assert!(ranked[0].total > ranked[1].total);
}
