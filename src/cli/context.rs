//! Wiring from a loaded [`Config`] to store, services and executors.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::code_executor::PaperTradingExecutor;
use crate::adapters::notifiers::FanoutNotifier;
use crate::adapters::pipeline::ScriptPipelineRunner;
use crate::adapters::store::JsonFileStore;
use crate::adapters::sync::{GitSync, NoopSync};
use crate::adapters::workers::ClaudeCodeWorker;
use crate::domain::models::Config;
use crate::domain::ports::{Notifier, PipelineExecutor, StateStore, StoreSync};
use crate::services::{
    Daemon, DaemonDeps, HandoffQueue, HypothesisService, PriorityEngine, ResponsibilityTracker,
    TaskQueue,
};

/// Everything a command needs, built once per invocation.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn StateStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    /// Open the JSON store under `config.state_dir`.
    pub async fn open(config: Config) -> Result<Self> {
        let store = JsonFileStore::open(&config.state_dir)
            .await
            .with_context(|| format!("Failed to open state directory {}", config.state_dir))?;
        let notifier = FanoutNotifier::from_config(&config.notifications)
            .context("Failed to configure notifications")?;
        Ok(Self {
            config,
            store: Arc::new(store),
            notifier: Arc::new(notifier),
        })
    }

    pub fn hypotheses(&self) -> HypothesisService<dyn StateStore> {
        HypothesisService::new(
            self.store.clone(),
            self.notifier.clone(),
            self.config.hypothesis.clone(),
            self.config.roles.clone(),
        )
    }

    pub fn handoffs(&self) -> HandoffQueue<dyn StateStore> {
        HandoffQueue::new(self.store.clone())
    }

    pub fn tasks(&self) -> TaskQueue<dyn StateStore> {
        TaskQueue::new(self.store.clone(), &self.config.scheduler.default_frequency)
    }

    pub fn responsibilities(&self) -> ResponsibilityTracker<dyn StateStore> {
        ResponsibilityTracker::new(self.store.clone(), &self.config.scheduler.default_frequency)
    }

    pub fn priority_engine(&self) -> PriorityEngine {
        PriorityEngine::from_config(&self.config)
    }

    /// Build a daemon with the production executors.
    pub fn daemon(&self) -> Daemon {
        let pipelines: Arc<dyn PipelineExecutor> = Arc::new(ScriptPipelineRunner::new(
            &self.config.pipelines,
        ));
        let sync: Arc<dyn StoreSync> = if self.config.sync.enabled {
            Arc::new(GitSync::new(&self.config.sync))
        } else {
            Arc::new(NoopSync)
        };
        let code_executor = PaperTradingExecutor::new(
            self.store.clone(),
            Arc::new(self.hypotheses()),
            pipelines.clone(),
            self.notifier.clone(),
        );

        Daemon::new(
            self.config.clone(),
            DaemonDeps {
                store: self.store.clone(),
                code_executor: Arc::new(code_executor),
                worker: Arc::new(ClaudeCodeWorker::new(self.config.worker.clone())),
                pipelines,
                sync,
                notifier: self.notifier.clone(),
            },
        )
    }
}
