//! In-memory accounting of outstanding processing tasks per content record.
//!
//! The tracker owns the only shared mutable table in the processing core. The
//! lock is never held across a store call: counts are adjusted under the lock,
//! status transitions happen afterwards as conditional store updates.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::{bounded, ContentError, ContentStatus, ContentStore};
use crate::metrics;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] ContentError),
}

/// Result of registering one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Nothing was tracked for the record.
    Untracked,
    /// The same output was already counted for the record.
    Duplicate,
    /// Tasks are still outstanding.
    Remaining(u32),
    /// The last task completed. `transitioned` tells whether the record moved
    /// from `processing` to `processed`.
    Finished { transitioned: bool },
}

/// Processing status as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStatus {
    pub status: ContentStatus,
    pub remaining_tasks: u32,
}

#[derive(Debug)]
struct TrackedContent {
    remaining: u32,
    applied: HashSet<String>,
}

/// Outstanding task counts per content id.
///
/// Process-local: a restart forgets every count and leaves records in
/// whatever status the store holds.
pub struct TaskTracker {
    store: Arc<dyn ContentStore>,
    timeout: Duration,
    tasks: Mutex<HashMap<String, TrackedContent>>,
}

impl TaskTracker {
    pub fn new(store: Arc<dyn ContentStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TrackedContent>> {
        // The table stays consistent even if a holder panicked mid-update.
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking `tasks` outstanding results for a record and move it
    /// from `draft` to `processing`.
    ///
    /// A second start for the same record replaces the previous count. Records
    /// in any other status keep it, but are still tracked.
    pub async fn register_start(&self, content_id: &str, tasks: u32) -> Result<(), TrackerError> {
        if tasks == 0 {
            return Ok(());
        }

        {
            let mut table = self.lock();
            let replaced = table.insert(
                content_id.to_string(),
                TrackedContent {
                    remaining: tasks,
                    applied: HashSet::new(),
                },
            );
            if let Some(previous) = replaced {
                debug!(
                    content_id,
                    previous = previous.remaining,
                    tasks,
                    "Replacing outstanding task count"
                );
            }
            metrics::TRACKED_CONTENT.set(table.len() as i64);
        }

        let moved = bounded(
            self.timeout,
            self.store.transition_status(
                content_id,
                &ContentStatus::Draft,
                &ContentStatus::Processing,
            ),
        )
        .await?;

        if moved {
            metrics::STATUS_TRANSITIONS
                .with_label_values(&["processing"])
                .inc();
            info!(content_id, tasks, "Content moved to processing");
        } else {
            debug!(content_id, tasks, "Content not in draft, status left as is");
        }

        Ok(())
    }

    /// Count one completed task for a record.
    pub async fn register_completion(
        &self,
        content_id: &str,
    ) -> Result<CompletionOutcome, TrackerError> {
        self.register_completion_keyed(content_id, None).await
    }

    /// Count one completed task, ignoring it when `output_key` was already
    /// counted for this record.
    pub async fn register_completion_keyed(
        &self,
        content_id: &str,
        output_key: Option<&str>,
    ) -> Result<CompletionOutcome, TrackerError> {
        let remaining = {
            let mut table = self.lock();
            let Some(entry) = table.get_mut(content_id) else {
                debug!(content_id, "Completion for untracked content ignored");
                return Ok(CompletionOutcome::Untracked);
            };

            if let Some(key) = output_key {
                if !entry.applied.insert(key.to_string()) {
                    debug!(content_id, key, "Duplicate completion ignored");
                    return Ok(CompletionOutcome::Duplicate);
                }
            }

            entry.remaining = entry.remaining.saturating_sub(1);
            let remaining = entry.remaining;
            if remaining == 0 {
                table.remove(content_id);
                metrics::TRACKED_CONTENT.set(table.len() as i64);
            }
            remaining
        };

        if remaining > 0 {
            debug!(content_id, remaining, "Task completed");
            return Ok(CompletionOutcome::Remaining(remaining));
        }

        let transitioned = bounded(
            self.timeout,
            self.store.transition_status(
                content_id,
                &ContentStatus::Processing,
                &ContentStatus::Processed,
            ),
        )
        .await?;

        if transitioned {
            metrics::STATUS_TRANSITIONS
                .with_label_values(&["processed"])
                .inc();
            info!(content_id, "All tasks completed, content processed");
        } else {
            warn!(content_id, "All tasks completed but content was not processing");
        }

        Ok(CompletionOutcome::Finished { transitioned })
    }

    /// Report the processing status of a record.
    pub async fn query_status(&self, content_id: &str) -> Result<ProcessingStatus, TrackerError> {
        if let Some(remaining) = self.remaining(content_id) {
            return Ok(ProcessingStatus {
                status: ContentStatus::Processing,
                remaining_tasks: remaining,
            });
        }

        let record = bounded(self.timeout, self.store.get(content_id))
            .await?
            .ok_or_else(|| ContentError::NotFound(content_id.to_string()))?;

        Ok(ProcessingStatus {
            status: record.status,
            remaining_tasks: 0,
        })
    }

    /// Outstanding tasks for a record, if tracked.
    pub fn remaining(&self, content_id: &str) -> Option<u32> {
        self.lock().get(content_id).map(|entry| entry.remaining)
    }

    /// Number of records with outstanding tasks.
    pub fn tracked_count(&self) -> usize {
        self.lock().len()
    }
}
