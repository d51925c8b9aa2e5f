//! JSON-file state store.
//!
//! One pretty-printed JSON file per collection inside the state directory.
//! Writes go to a temp file that is renamed over the target, so readers
//! never see a half-written collection. A missing file reads as empty.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CriticalFileConfig, EngineStatus, Handoff, HealthRecord, Hypothesis, Learning, PipelineRun,
    Portfolio, Responsibility, ScheduledTask, StateFileStatus, TradeRecord,
};
use crate::domain::ports::StateStore;

pub const HYPOTHESES_FILE: &str = "hypotheses.json";
pub const PORTFOLIO_FILE: &str = "portfolio.json";
pub const TRADES_FILE: &str = "trades.json";
pub const LEARNINGS_FILE: &str = "learnings.json";
pub const HANDOFFS_FILE: &str = "handoffs.json";
pub const TASKS_FILE: &str = "scheduled_tasks.json";
pub const RESPONSIBILITIES_FILE: &str = "responsibilities.json";
pub const HEALTH_FILE: &str = "health.json";
pub const PIPELINE_RUNS_FILE: &str = "pipeline_runs.json";
pub const ENGINE_STATUS_FILE: &str = "engine_status.json";

/// Pipeline runs older than this are dropped on append.
const PIPELINE_RUN_RETENTION_DAYS: i64 = 7;

/// A [`StateStore`] backed by JSON files in one directory.
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Open the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> DomainResult<Self> {
        let store = Self::new(dir);
        tokio::fs::create_dir_all(&store.dir).await.map_err(|e| {
            DomainError::StoreError(format!("Failed to create {}: {e}", store.dir.display()))
        })?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn read_opt<T: DeserializeOwned>(&self, file: &str) -> DomainResult<Option<T>> {
        let path = self.path(file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DomainError::StoreError(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            DomainError::SerializationError(format!("{}: {e}", path.display()))
        })
    }

    async fn read_or_default<T: DeserializeOwned + Default>(&self, file: &str) -> DomainResult<T> {
        Ok(self.read_opt(file).await?.unwrap_or_default())
    }

    async fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> DomainResult<()> {
        let json = serde_json::to_vec_pretty(value)?;
        let path = self.path(file);
        let tmp = self.path(&format!(".{file}.tmp"));

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, &json).await.map_err(|e| {
            DomainError::StoreError(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            DomainError::StoreError(format!("Failed to replace {}: {e}", path.display()))
        })?;
        tracing::trace!(file, bytes = json.len(), "State file written");
        Ok(())
    }

    /// Read-modify-write of a list collection under the write lock.
    async fn append<T>(&self, file: &str, item: &T, retain: impl FnMut(&T) -> bool) -> DomainResult<()>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<T> = self.read_or_default(file).await?;
        items.push(item.clone());
        items.retain(retain);
        self.write(file, &items).await
    }

    async fn replace<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(file, value).await
    }
}

fn modified_at(meta: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    meta.modified().ok().map(DateTime::<Utc>::from)
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load_hypotheses(&self) -> DomainResult<Vec<Hypothesis>> {
        self.read_or_default(HYPOTHESES_FILE).await
    }

    async fn save_hypotheses(&self, hypotheses: &[Hypothesis]) -> DomainResult<()> {
        self.replace(HYPOTHESES_FILE, hypotheses).await
    }

    async fn load_portfolio(&self) -> DomainResult<Portfolio> {
        self.read_or_default(PORTFOLIO_FILE).await
    }

    async fn save_portfolio(&self, portfolio: &Portfolio) -> DomainResult<()> {
        self.replace(PORTFOLIO_FILE, portfolio).await
    }

    async fn load_trades(&self) -> DomainResult<Vec<TradeRecord>> {
        self.read_or_default(TRADES_FILE).await
    }

    async fn append_trade(&self, trade: &TradeRecord) -> DomainResult<()> {
        self.append(TRADES_FILE, trade, |_| true).await
    }

    async fn load_learnings(&self) -> DomainResult<Vec<Learning>> {
        self.read_or_default(LEARNINGS_FILE).await
    }

    async fn append_learning(&self, learning: &Learning) -> DomainResult<()> {
        self.append(LEARNINGS_FILE, learning, |_| true).await
    }

    async fn load_handoffs(&self) -> DomainResult<Vec<Handoff>> {
        self.read_or_default(HANDOFFS_FILE).await
    }

    async fn save_handoffs(&self, handoffs: &[Handoff]) -> DomainResult<()> {
        self.replace(HANDOFFS_FILE, handoffs).await
    }

    async fn load_scheduled_tasks(&self) -> DomainResult<Vec<ScheduledTask>> {
        self.read_or_default(TASKS_FILE).await
    }

    async fn save_scheduled_tasks(&self, tasks: &[ScheduledTask]) -> DomainResult<()> {
        self.replace(TASKS_FILE, tasks).await
    }

    async fn load_responsibilities(&self) -> DomainResult<Vec<Responsibility>> {
        self.read_or_default(RESPONSIBILITIES_FILE).await
    }

    async fn save_responsibilities(&self, responsibilities: &[Responsibility]) -> DomainResult<()> {
        self.replace(RESPONSIBILITIES_FILE, responsibilities).await
    }

    async fn load_health(&self) -> DomainResult<Option<HealthRecord>> {
        self.read_opt(HEALTH_FILE).await
    }

    async fn load_pipeline_runs(&self) -> DomainResult<Vec<PipelineRun>> {
        self.read_or_default(PIPELINE_RUNS_FILE).await
    }

    async fn append_pipeline_run(&self, run: &PipelineRun) -> DomainResult<()> {
        let cutoff = run.at - Duration::days(PIPELINE_RUN_RETENTION_DAYS);
        self.append(PIPELINE_RUNS_FILE, run, |r: &PipelineRun| r.at >= cutoff)
            .await
    }

    async fn state_file_statuses(
        &self,
        files: &[CriticalFileConfig],
    ) -> DomainResult<Vec<StateFileStatus>> {
        let mut statuses = Vec::with_capacity(files.len());
        for file in files {
            let meta = tokio::fs::metadata(self.path(&file.name)).await.ok();
            statuses.push(StateFileStatus {
                name: file.name.clone(),
                exists: meta.is_some(),
                modified_at: meta.as_ref().and_then(modified_at),
                stale_after_hours: file.stale_hours,
            });
        }
        Ok(statuses)
    }

    async fn load_engine_status(&self) -> DomainResult<Option<EngineStatus>> {
        self.read_opt(ENGINE_STATUS_FILE).await
    }

    async fn save_engine_status(&self, status: &EngineStatus) -> DomainResult<()> {
        self.replace(ENGINE_STATUS_FILE, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_files_read_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_hypotheses().await.unwrap().is_empty());
        assert!(store.load_health().await.unwrap().is_none());
        assert!((store.load_portfolio().await.unwrap().cash).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("state")).await.unwrap();
        let h = Hypothesis::new("s", "r", "t", 0.5).with_id("hyp_1");
        store.save_hypotheses(std::slice::from_ref(&h)).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![HYPOTHESES_FILE.to_string()]);
        assert_eq!(store.load_hypotheses().await.unwrap(), vec![h]);
    }

    #[tokio::test]
    async fn test_pipeline_runs_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let now = Utc::now();
        let run = |days_ago: i64| PipelineRun {
            pipeline: "scan".to_string(),
            at: now - Duration::days(days_ago),
            success: false,
            error: None,
        };
        store.append_pipeline_run(&run(10)).await.unwrap();
        store.append_pipeline_run(&run(0)).await.unwrap();
        assert_eq!(store.load_pipeline_runs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_state_file_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save_portfolio(&Portfolio::default()).await.unwrap();

        let files = vec![
            CriticalFileConfig {
                name: PORTFOLIO_FILE.to_string(),
                stale_hours: 24.0,
            },
            CriticalFileConfig {
                name: HYPOTHESES_FILE.to_string(),
                stale_hours: 24.0,
            },
        ];
        let statuses = store.state_file_statuses(&files).await.unwrap();
        assert!(statuses[0].exists);
        assert!(statuses[0].modified_at.is_some());
        assert!(!statuses[0].is_stale(Utc::now()));
        assert!(!statuses[1].exists);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HANDOFFS_FILE), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(
            store.load_handoffs().await,
            Err(DomainError::SerializationError(_))
        ));
    }
}
