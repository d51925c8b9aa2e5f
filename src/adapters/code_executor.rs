//! Deterministic in-process actions for the paper-trading portfolio.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ExitReason, Notification, NotificationKind, PipelineRun, Priority, PriorityAction,
    PriorityContext, TradeRecord,
};
use crate::domain::ports::{
    notify_best_effort, CodeExecutor, Notifier, PipelineExecutor, StateStore,
};
use crate::services::hypothesis_service::HypothesisService;

/// Pipeline run by [`PriorityAction::RefreshHealthCheck`].
pub const HEALTH_CHECK_PIPELINE: &str = "health-check";

/// Code executor for the paper-trading store.
///
/// Closing a position is idempotent: a position that is already gone is
/// treated as closed and nothing is written.
pub struct PaperTradingExecutor {
    store: Arc<dyn StateStore>,
    hypotheses: Arc<HypothesisService<dyn StateStore>>,
    pipelines: Arc<dyn PipelineExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl PaperTradingExecutor {
    pub fn new(
        store: Arc<dyn StateStore>,
        hypotheses: Arc<HypothesisService<dyn StateStore>>,
        pipelines: Arc<dyn PipelineExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            hypotheses,
            pipelines,
            notifier,
        }
    }

    async fn close_position(&self, position_id: &str, reason: ExitReason) -> DomainResult<bool> {
        let now = Utc::now();
        let mut portfolio = self.store.load_portfolio().await?;
        let Some(price) = portfolio.position(position_id).map(|p| p.current_price) else {
            tracing::info!(position_id, reason = reason.as_str(), "Position already closed");
            return Ok(true);
        };

        let Some(position) = portfolio.close_position(position_id, price, now) else {
            return Ok(true);
        };
        let trade = TradeRecord::closing(&position, price, reason, now);

        self.store.save_portfolio(&portfolio).await?;
        self.store.append_trade(&trade).await?;
        tracing::info!(
            position_id,
            market_id = %position.market_id,
            reason = reason.as_str(),
            exit_price = price,
            pnl = trade.pnl,
            cash = portfolio.cash,
            "Position closed"
        );

        if let Some(hypothesis_id) = &position.hypothesis_id {
            if let Err(e) = self.hypotheses.record_closed_trade(hypothesis_id, &trade).await {
                tracing::warn!(
                    hypothesis_id = %hypothesis_id,
                    trade_id = %trade.id,
                    error = %e,
                    "Could not fold closed trade into hypothesis"
                );
            }
        }

        notify_best_effort(
            self.notifier.as_ref(),
            Notification::new(
                NotificationKind::Info,
                format!("Closed {position_id} ({})", reason.as_str()),
                format!(
                    "{} shares of {} at {price:.3}, pnl {:+.2}",
                    trade.shares, trade.market_id, trade.pnl
                ),
            ),
        )
        .await;
        Ok(true)
    }

    async fn refresh_health_check(&self) -> DomainResult<bool> {
        if !self.pipelines.is_registered(HEALTH_CHECK_PIPELINE) {
            tracing::warn!("No health-check pipeline registered, nothing to refresh");
            return Ok(false);
        }

        let (success, error) = match self.pipelines.run(HEALTH_CHECK_PIPELINE).await {
            Ok(outcome) if outcome.success => (true, None),
            Ok(outcome) => (false, Some(outcome.output)),
            Err(e) => (false, Some(e.to_string())),
        };
        self.store
            .append_pipeline_run(&PipelineRun {
                pipeline: HEALTH_CHECK_PIPELINE.to_string(),
                at: Utc::now(),
                success,
                error,
            })
            .await?;
        Ok(success)
    }
}

fn position_id(priority: &Priority) -> DomainResult<&str> {
    match &priority.context {
        PriorityContext::Position { position_id, .. } => Ok(position_id),
        _ => Err(DomainError::ValidationFailed(format!(
            "{} needs a position context",
            priority.action
        ))),
    }
}

#[async_trait]
impl CodeExecutor for PaperTradingExecutor {
    fn supports(&self, action: PriorityAction) -> bool {
        matches!(
            action,
            PriorityAction::ExecuteStopLoss
                | PriorityAction::ExecuteTakeProfit
                | PriorityAction::RefreshHealthCheck
                | PriorityAction::NoteStaleStateFile
        )
    }

    async fn execute(&self, priority: &Priority) -> DomainResult<bool> {
        match priority.action {
            PriorityAction::ExecuteStopLoss => {
                self.close_position(position_id(priority)?, ExitReason::StopLoss)
                    .await
            }
            PriorityAction::ExecuteTakeProfit => {
                self.close_position(position_id(priority)?, ExitReason::TakeProfit)
                    .await
            }
            PriorityAction::RefreshHealthCheck => self.refresh_health_check().await,
            PriorityAction::NoteStaleStateFile => {
                notify_best_effort(
                    self.notifier.as_ref(),
                    Notification::new(NotificationKind::Info, priority.summary.clone(), ""),
                )
                .await;
                Ok(true)
            }
            other => Err(DomainError::ExecutionFailed(format!(
                "{other} is not a code action"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notifiers::RecordingNotifier;
    use crate::adapters::pipeline::MockPipelineRunner;
    use crate::adapters::store::MemoryStore;
    use crate::domain::models::{
        Hypothesis, HypothesisStatus, HypothesisThresholds, Portfolio, Position, PriorityType,
        RolesConfig, StoreSnapshot,
    };
    use crate::services::detectors::portfolio_risk::PortfolioRiskDetector;
    use crate::services::detectors::SignalDetector;

    fn position(hypothesis_id: Option<&str>) -> Position {
        Position {
            id: "p1".to_string(),
            market_id: "m1".to_string(),
            market_question: "Will it rain?".to_string(),
            side: "YES".to_string(),
            shares: 100.0,
            entry_price: 0.10,
            current_price: 0.045,
            stop_loss: Some(0.05),
            take_profit: None,
            hypothesis_id: hypothesis_id.map(str::to_string),
            opened_at: Utc::now(),
        }
    }

    async fn executor(
        store: Arc<MemoryStore>,
        pipelines: MockPipelineRunner,
    ) -> (PaperTradingExecutor, RecordingNotifier) {
        let notifier = RecordingNotifier::new();
        let dyn_store: Arc<dyn StateStore> = store;
        let hypotheses = Arc::new(HypothesisService::new(
            dyn_store.clone(),
            Arc::new(notifier.clone()),
            HypothesisThresholds::default(),
            RolesConfig::default(),
        ));
        (
            PaperTradingExecutor::new(
                dyn_store,
                hypotheses,
                Arc::new(pipelines),
                Arc::new(notifier.clone()),
            ),
            notifier,
        )
    }

    #[tokio::test]
    async fn test_stop_loss_closes_position_once() {
        let portfolio = Portfolio {
            cash: 100.0,
            positions: vec![position(None)],
            updated_at: None,
        };
        let store = Arc::new(MemoryStore::new().with_portfolio(portfolio.clone()).await);
        let (executor, _) = executor(store.clone(), MockPipelineRunner::default()).await;

        let mut snapshot = StoreSnapshot::empty(Utc::now());
        snapshot.portfolio = portfolio;
        let priority = PortfolioRiskDetector::new(Default::default())
            .detect(&snapshot)
            .into_iter()
            .find(|p| p.action == PriorityAction::ExecuteStopLoss)
            .unwrap();
        assert_eq!(priority.urgency, 99);
        assert_eq!(priority.priority_type, PriorityType::PortfolioRisk);
        assert!(executor.supports(priority.action));

        assert!(executor.execute(&priority).await.unwrap());
        let after = store.load_portfolio().await.unwrap();
        assert!(after.positions.is_empty());
        assert!((after.cash - 104.5).abs() < 1e-9);
        assert_eq!(store.trades().await.len(), 1);

        // Second run finds nothing to close.
        assert!(executor.execute(&priority).await.unwrap());
        let again = store.load_portfolio().await.unwrap();
        assert!((again.cash - 104.5).abs() < 1e-9);
        assert_eq!(store.trades().await.len(), 1);
    }

    #[tokio::test]
    async fn test_closing_linked_position_updates_hypothesis() {
        let mut hypothesis = Hypothesis::new("rain", "", "buy YES below 0.1", 0.5).with_id("hyp_1");
        hypothesis.status = HypothesisStatus::Testing;
        let store = Arc::new(
            MemoryStore::new()
                .with_hypotheses(vec![hypothesis])
                .await
                .with_portfolio(Portfolio {
                    cash: 0.0,
                    positions: vec![position(Some("hyp_1"))],
                    updated_at: None,
                })
                .await,
        );
        let (executor, _) = executor(store.clone(), MockPipelineRunner::default()).await;

        let priority = Priority::for_code(
            PriorityType::PortfolioRisk,
            99,
            PriorityAction::ExecuteStopLoss,
            "p1 hit stop",
            PriorityContext::Position {
                position_id: "p1".to_string(),
                market_id: "m1".to_string(),
                pnl_pct: -55.0,
                entry_price: 0.10,
                current_price: 0.045,
                stop_loss: Some(0.05),
                take_profit: None,
            },
        );
        executor.execute(&priority).await.unwrap();

        let updated = &store.load_hypotheses().await.unwrap()[0];
        assert_eq!(updated.test_results.trades, 1);
        assert_eq!(updated.test_results.losses, 1);
        assert!((updated.confidence - 0.45).abs() < 1e-9);
        assert_eq!(updated.evidence.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_health_check_records_run() {
        let store = Arc::new(MemoryStore::new());
        let runner = MockPipelineRunner::new(&[HEALTH_CHECK_PIPELINE]);
        let (executor, _) = executor(store.clone(), runner.clone()).await;

        let priority = Priority::for_code(
            PriorityType::SystemHealth,
            50,
            PriorityAction::RefreshHealthCheck,
            "stale",
            PriorityContext::HealthStale { age_hours: 8.0 },
        );
        assert!(executor.execute(&priority).await.unwrap());
        assert_eq!(runner.runs().await, vec![HEALTH_CHECK_PIPELINE]);
        let runs = store.load_pipeline_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].success);
    }

    #[tokio::test]
    async fn test_stale_state_file_only_notifies() {
        let store = Arc::new(MemoryStore::new());
        let (executor, notifier) = executor(store.clone(), MockPipelineRunner::default()).await;
        let priority = Priority::for_code(
            PriorityType::SystemHealth,
            55,
            PriorityAction::NoteStaleStateFile,
            "portfolio.json not updated for 30.0h",
            PriorityContext::StateFileStale {
                file: "portfolio.json".to_string(),
                age_hours: 30.0,
            },
        );
        assert!(executor.execute(&priority).await.unwrap());
        assert_eq!(notifier.sent().await.len(), 1);
        assert!(store.load_pipeline_runs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_worker_actions_are_rejected() {
        let (executor, _) = executor(Arc::new(MemoryStore::new()), MockPipelineRunner::default()).await;
        assert!(!executor.supports(PriorityAction::ReviewCriticalLoss));
        let priority = Priority::for_code(
            PriorityType::SystemHealth,
            60,
            PriorityAction::BootstrapHealthCheck,
            "x",
            PriorityContext::HealthMissing,
        );
        assert!(executor.execute(&priority).await.is_err());
    }
}
