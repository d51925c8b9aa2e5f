//! The scheduler tick.
//!
//! One tick executes at most one unit of work, chosen by strict precedence:
//!
//! 1. pull shared state
//! 2. recompute and persist engine status
//! 3. strategic override from the priority engine
//! 4. most overdue responsibility
//! 5. highest-tier pending handoff
//! 6. self-heal recurring pipelines, then the earliest due scheduled task
//! 7. push shared state, whatever happened above
//!
//! Executors are awaited to completion with no timeout. A worker that never
//! exits holds the in-flight guard, and every later tick reports
//! [`TickOutcome::Busy`] until it does. Only one daemon may run against a
//! store at a time; nothing here protects against a second instance.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::Instrument;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Config, HandoffResult, Notification, NotificationKind, PipelineHealth, PipelineRun, Priority,
    PriorityType, RetryPolicy, RolesConfig, ScheduledTask, TaskContext, WorkSource,
    WorkerOutcome, WorkerRequest,
};
use crate::domain::ports::{
    notify_best_effort, CodeExecutor, Notifier, PipelineExecutor, StateStore, StoreSync,
    WorkerExecutor,
};
use crate::services::engine_status::EngineStatusService;
use crate::services::handoff_queue::HandoffQueue;
use crate::services::hypothesis_lifecycle::HypothesisStateMachine;
use crate::services::priority_engine::PriorityEngine;
use crate::services::prompts::{
    handoff_instructions, priority_instructions, responsibility_instructions,
};
use crate::services::responsibility_tracker::ResponsibilityTracker;
use crate::services::task_queue::TaskQueue;

/// Collaborators the daemon drives.
#[derive(Clone)]
pub struct DaemonDeps {
    pub store: Arc<dyn StateStore>,
    pub code_executor: Arc<dyn CodeExecutor>,
    pub worker: Arc<dyn WorkerExecutor>,
    pub pipelines: Arc<dyn PipelineExecutor>,
    pub sync: Arc<dyn StoreSync>,
    pub notifier: Arc<dyn Notifier>,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Another tick was still running.
    Busy,
    Override {
        action: String,
        urgency: u8,
        executor: String,
        success: bool,
    },
    Responsibility {
        role: String,
        name: String,
        success: bool,
    },
    Handoff {
        handoff_id: String,
        handoff_type: String,
        success: bool,
    },
    ScheduledTask {
        task_id: String,
        task_type: String,
        success: bool,
    },
    /// Nothing was due.
    Idle,
    /// Scheduler bookkeeping failed before or after dispatch.
    Error { message: String },
}

impl TickOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Override { .. } => "override",
            Self::Responsibility { .. } => "responsibility",
            Self::Handoff { .. } => "handoff",
            Self::ScheduledTask { .. } => "scheduled_task",
            Self::Idle => "idle",
            Self::Error { .. } => "error",
        }
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pulled: bool,
    pub pushed: bool,
    pub engine_health: Option<PipelineHealth>,
    /// Recurring pipeline tasks inserted by self-healing.
    pub healed: usize,
    pub outcome: TickOutcome,
}

impl TickReport {
    fn busy() -> Self {
        let now = Utc::now();
        Self {
            tick: 0,
            started_at: now,
            finished_at: now,
            pulled: false,
            pushed: false,
            engine_health: None,
            healed: 0,
            outcome: TickOutcome::Busy,
        }
    }
}

/// Role that handles worker-dispatched priorities of each type.
pub fn role_for(priority_type: PriorityType, roles: &RolesConfig) -> &str {
    match priority_type {
        PriorityType::PortfolioRisk | PriorityType::TimeSensitive => &roles.trader,
        PriorityType::StuckHypothesis | PriorityType::ExecutionVelocity => &roles.research,
        PriorityType::SystemHealth => &roles.engineering,
    }
}

pub struct Daemon {
    config: Config,
    deps: DaemonDeps,
    engine: PriorityEngine,
    responsibilities: ResponsibilityTracker<dyn StateStore>,
    handoffs: HandoffQueue<dyn StateStore>,
    tasks: TaskQueue<dyn StateStore>,
    status: EngineStatusService<dyn StateStore>,
    in_flight: Mutex<()>,
    ticks: AtomicU64,
}

impl Daemon {
    pub fn new(config: Config, deps: DaemonDeps) -> Self {
        let store = deps.store.clone();
        let default_frequency = config.scheduler.default_frequency.clone();
        let retry_policy = RetryPolicy {
            max_attempts: config.scheduler.max_task_attempts,
            ..RetryPolicy::unbounded()
        };
        let machine = HypothesisStateMachine::new(config.hypothesis.clone(), config.roles.clone());

        Self {
            engine: PriorityEngine::from_config(&config),
            responsibilities: ResponsibilityTracker::new(store.clone(), default_frequency.clone()),
            handoffs: HandoffQueue::new(store.clone()),
            tasks: TaskQueue::new(store.clone(), default_frequency).with_retry_policy(retry_policy),
            status: EngineStatusService::new(store, machine, config.scheduler.clone()),
            config,
            deps,
            in_flight: Mutex::new(()),
            ticks: AtomicU64::new(0),
        }
    }

    /// Number of ticks started so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Seed configured responsibilities and recurring pipeline tasks.
    pub async fn seed(&self) -> DomainResult<(usize, usize)> {
        let added = self
            .responsibilities
            .sync_from_config(&self.config.responsibilities)
            .await?;
        let healed = self
            .tasks
            .heal_recurring(&self.config.pipelines, Utc::now())
            .await?;
        Ok((added, healed.len()))
    }

    /// Run one tick now. Returns [`TickOutcome::Busy`] if a tick is already
    /// in flight.
    pub async fn tick(&self) -> TickReport {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::info!("Tick requested while another is running");
            return TickReport::busy();
        };
        let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        self.run_tick(n)
            .instrument(tracing::info_span!("tick", tick = n))
            .await
    }

    /// Tick on the configured interval until `shutdown` resolves. The first
    /// tick runs immediately.
    pub async fn run_until<F>(&self, shutdown: F) -> DomainResult<()>
    where
        F: Future<Output = ()>,
    {
        self.seed().await?;
        let every = Duration::from_secs(self.config.scheduler.tick_interval_secs.max(1));
        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = every.as_secs(), "Daemon started");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(ticks = self.tick_count(), "Daemon stopping");
                    break;
                }
                _ = timer.tick() => {
                    let report = self.tick().await;
                    tracing::info!(
                        tick = report.tick,
                        outcome = report.outcome.label(),
                        "Tick finished"
                    );
                }
            }
        }
        Ok(())
    }

    /// Tick until ctrl-c.
    pub async fn run(&self) -> DomainResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    async fn run_tick(&self, n: u64) -> TickReport {
        let started_at = Utc::now();

        let pulled = self.deps.sync.pull().await;
        if !pulled {
            tracing::warn!("State pull failed, continuing with local state");
        }

        let engine_health = match self.status.refresh(Utc::now()).await {
            Ok(status) => Some(status.aggregates.health),
            Err(e) => {
                tracing::error!(error = %e, "Engine status refresh failed");
                None
            }
        };

        let mut healed = 0;
        let outcome = match self.dispatch(&mut healed).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Tick failed");
                TickOutcome::Error {
                    message: e.to_string(),
                }
            }
        };

        let pushed = self.deps.sync.push().await;
        if !pushed {
            tracing::warn!("State push failed");
        }

        TickReport {
            tick: n,
            started_at,
            finished_at: Utc::now(),
            pulled,
            pushed,
            engine_health,
            healed,
            outcome,
        }
    }

    /// Steps 3 to 6: pick and run exactly one unit of work.
    async fn dispatch(&self, healed: &mut usize) -> DomainResult<TickOutcome> {
        let now = Utc::now();
        let snapshot = self
            .deps
            .store
            .snapshot(&self.config.detectors.health.critical_files, now)
            .await?;
        let decision = self.engine.evaluate(&snapshot);
        if let (true, Some(priority)) = (decision.should_override, decision.selected) {
            return Ok(self.run_override(priority).await);
        }

        if let Some(duty) = self.responsibilities.most_overdue(now).await? {
            let request = WorkerRequest::new(
                &duty.role,
                WorkSource::Responsibility {
                    name: duty.name.clone(),
                },
                responsibility_instructions(&duty),
            );
            let outcome = self.run_worker(request).await;
            if outcome.is_success() {
                self.responsibilities
                    .mark_complete(&duty.role, &duty.name, Utc::now())
                    .await?;
            }
            return Ok(TickOutcome::Responsibility {
                role: duty.role,
                name: duty.name,
                success: outcome.is_success(),
            });
        }

        if let Some(handoff) = self.handoffs.next_pending().await? {
            let handoff = self.handoffs.start(&handoff.id).await?;
            let request = WorkerRequest::new(
                &handoff.to_role,
                WorkSource::Handoff {
                    handoff_id: handoff.id.clone(),
                    handoff_type: handoff.handoff_type.clone(),
                },
                handoff_instructions(&handoff),
            );
            let outcome = self.run_worker(request).await;
            let result = HandoffResult {
                success: outcome.is_success(),
                exit_code: Some(outcome.exit_code),
                summary: (!outcome.output.is_empty()).then(|| outcome.output.clone()),
                error: outcome.error.clone(),
            };
            if outcome.is_success() {
                self.handoffs.complete(&handoff.id, result).await?;
            } else {
                self.handoffs.fail(&handoff.id, result).await?;
            }
            return Ok(TickOutcome::Handoff {
                handoff_id: handoff.id,
                handoff_type: handoff.handoff_type,
                success: outcome.is_success(),
            });
        }

        *healed = self
            .tasks
            .heal_recurring(&self.config.pipelines, now)
            .await?
            .len();
        if let Some(task) = self.tasks.next_due(now).await? {
            return self.run_scheduled_task(task).await;
        }

        tracing::debug!("Nothing due");
        Ok(TickOutcome::Idle)
    }

    async fn run_override(&self, priority: Priority) -> TickOutcome {
        tracing::info!(
            action = %priority.action,
            urgency = priority.urgency,
            priority_type = %priority.priority_type,
            "Strategic override"
        );
        notify_best_effort(
            self.deps.notifier.as_ref(),
            Notification::new(
                NotificationKind::StrategicOverride,
                format!("Override: {} ({})", priority.action, priority.urgency),
                priority.summary.clone(),
            ),
        )
        .await;

        if priority.is_code_executable() && self.deps.code_executor.supports(priority.action) {
            let success = match self.deps.code_executor.execute(&priority).await {
                Ok(success) => success,
                Err(e) => {
                    tracing::error!(action = %priority.action, error = %e, "Code action failed");
                    false
                }
            };
            self.notify_result(&priority.action.to_string(), success, None)
                .await;
            return TickOutcome::Override {
                action: priority.action.to_string(),
                urgency: priority.urgency,
                executor: "code".to_string(),
                success,
            };
        }

        let instructions = priority.instructions.clone().unwrap_or_else(|| {
            priority_instructions(priority.action, &priority.summary, &priority.context)
        });
        let request = WorkerRequest::new(
            role_for(priority.priority_type, &self.config.roles),
            WorkSource::Override {
                action: priority.action.to_string(),
                urgency: priority.urgency,
            },
            instructions,
        );
        let outcome = self.run_worker(request).await;
        TickOutcome::Override {
            action: priority.action.to_string(),
            urgency: priority.urgency,
            executor: self.deps.worker.name().to_string(),
            success: outcome.is_success(),
        }
    }

    async fn run_scheduled_task(&self, task: ScheduledTask) -> DomainResult<TickOutcome> {
        tracing::info!(task_id = %task.id, task_type = task.task_type(), "Running scheduled task");
        let (success, error) = match &task.context {
            TaskContext::Pipeline { pipeline } => {
                notify_best_effort(
                    self.deps.notifier.as_ref(),
                    Notification::new(
                        NotificationKind::TaskStarted,
                        format!("Pipeline {pipeline} started"),
                        task.description.clone(),
                    ),
                )
                .await;
                let (success, error) = self.run_pipeline(pipeline).await;
                self.deps
                    .store
                    .append_pipeline_run(&PipelineRun {
                        pipeline: pipeline.clone(),
                        at: Utc::now(),
                        success,
                        error: error.clone(),
                    })
                    .await?;
                self.notify_result(&format!("Pipeline {pipeline}"), success, error.as_deref())
                    .await;
                (success, error)
            }
            TaskContext::Worker {
                role, instructions, ..
            } => {
                let request = WorkerRequest::new(
                    role,
                    WorkSource::ScheduledTask {
                        task_id: task.id.clone(),
                    },
                    instructions,
                );
                let outcome = self.run_worker(request).await;
                (outcome.is_success(), outcome.error)
            }
        };

        if success {
            self.tasks.complete(&task.id, Utc::now()).await?;
        } else {
            self.tasks
                .record_failure(&task.id, error.as_deref().unwrap_or("failed"))
                .await?;
        }
        Ok(TickOutcome::ScheduledTask {
            task_id: task.id,
            task_type: task.context.task_type().to_string(),
            success,
        })
    }

    async fn run_pipeline(&self, pipeline: &str) -> (bool, Option<String>) {
        if !self.deps.pipelines.is_registered(pipeline) {
            tracing::warn!(pipeline, "Scheduled pipeline is not registered");
            return (false, Some(format!("pipeline {pipeline} is not registered")));
        }
        match self.deps.pipelines.run(pipeline).await {
            Ok(outcome) if outcome.success => (true, None),
            Ok(outcome) => (false, Some(outcome.output)),
            Err(e) => (false, Some(e.to_string())),
        }
    }

    /// Dispatch to the worker and wait. Spawn errors count as a failed run.
    async fn run_worker(&self, request: WorkerRequest) -> WorkerOutcome {
        let label = request.source.label();
        notify_best_effort(
            self.deps.notifier.as_ref(),
            Notification::new(
                NotificationKind::TaskStarted,
                format!("{} started ({})", label, request.role),
                String::new(),
            ),
        )
        .await;

        let outcome = match self.deps.worker.execute(request).await {
            Ok(outcome) => outcome,
            Err(e) => WorkerOutcome::failure(-1, e.to_string()),
        };
        if outcome.is_success() {
            tracing::info!(work = %label, "Worker finished");
        } else {
            tracing::warn!(
                work = %label,
                exit_code = outcome.exit_code,
                error = outcome.error.as_deref().unwrap_or_default(),
                "Worker failed"
            );
        }
        self.notify_result(&label, outcome.is_success(), outcome.error.as_deref())
            .await;
        outcome
    }

    async fn notify_result(&self, what: &str, success: bool, error: Option<&str>) {
        let notification = if success {
            Notification::new(
                NotificationKind::TaskSucceeded,
                format!("{what} succeeded"),
                String::new(),
            )
        } else {
            Notification::new(
                NotificationKind::TaskFailed,
                format!("{what} failed"),
                error.unwrap_or_default(),
            )
        };
        notify_best_effort(self.deps.notifier.as_ref(), notification).await;
    }
}
