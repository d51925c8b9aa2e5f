//! Frequency-based due checks for recurring role duties.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Responsibility, ResponsibilityConfig};
use crate::domain::ports::StateStore;

/// The most overdue due responsibility. Ties go to the first in list order.
pub fn select_most_overdue<'a>(
    responsibilities: &'a [Responsibility],
    now: DateTime<Utc>,
    default_frequency: &str,
) -> Option<&'a Responsibility> {
    let mut best: Option<(&Responsibility, Duration)> = None;
    for r in responsibilities {
        let Some(overdue) = r.overdue_by(now, default_frequency) else {
            continue;
        };
        if best.map_or(true, |(_, b)| overdue > b) {
            best = Some((r, overdue));
        }
    }
    best.map(|(r, _)| r)
}

pub struct ResponsibilityTracker<S: StateStore + ?Sized> {
    store: Arc<S>,
    default_frequency: String,
}

impl<S: StateStore + ?Sized> ResponsibilityTracker<S> {
    pub fn new(store: Arc<S>, default_frequency: impl Into<String>) -> Self {
        Self {
            store,
            default_frequency: default_frequency.into(),
        }
    }

    pub async fn list(&self) -> DomainResult<Vec<Responsibility>> {
        self.store.load_responsibilities().await
    }

    /// Add configured duties that are missing and refresh the frequency and
    /// instructions of known ones. Existing `last_run` values are kept.
    ///
    /// Returns the number of duties added.
    pub async fn sync_from_config(&self, configured: &[ResponsibilityConfig]) -> DomainResult<usize> {
        let mut all = self.store.load_responsibilities().await?;
        let mut added = 0;
        for cfg in configured {
            if let Some(existing) = all.iter_mut().find(|r| r.matches(&cfg.role, &cfg.name)) {
                existing.frequency = cfg.frequency.clone();
                existing.instructions = cfg.instructions.clone();
            } else {
                all.push(
                    Responsibility::new(&cfg.role, &cfg.name, &cfg.frequency)
                        .with_instructions(&cfg.instructions),
                );
                added += 1;
            }
        }
        self.store.save_responsibilities(&all).await?;
        if added > 0 {
            tracing::info!(added, "Seeded responsibilities from config");
        }
        Ok(added)
    }

    /// Due duties with how overdue each is, most overdue first.
    pub async fn due(&self, now: DateTime<Utc>) -> DomainResult<Vec<(Responsibility, Duration)>> {
        let mut due: Vec<_> = self
            .store
            .load_responsibilities()
            .await?
            .into_iter()
            .filter_map(|r| {
                let overdue = r.overdue_by(now, &self.default_frequency)?;
                Some((r, overdue))
            })
            .collect();
        due.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(due)
    }

    pub async fn most_overdue(&self, now: DateTime<Utc>) -> DomainResult<Option<Responsibility>> {
        let all = self.store.load_responsibilities().await?;
        Ok(select_most_overdue(&all, now, &self.default_frequency).cloned())
    }

    /// Set `last_run = now` on the duty keyed by `(role, name)`.
    pub async fn mark_complete(
        &self,
        role: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Responsibility> {
        let mut all = self.store.load_responsibilities().await?;
        let duty = all
            .iter_mut()
            .find(|r| r.matches(role, name))
            .ok_or_else(|| DomainError::ResponsibilityNotFound {
                role: role.to_string(),
                name: name.to_string(),
            })?;
        duty.last_run = Some(now);
        let done = duty.clone();
        self.store.save_responsibilities(&all).await?;
        tracing::debug!(role, name, "Responsibility marked complete");
        Ok(done)
    }
}
