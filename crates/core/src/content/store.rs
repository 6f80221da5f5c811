//! Content storage trait and types.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::{ContentPatch, ContentRecord, ContentStatus, MediaMerge};

/// Error type for content store operations.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Record not found.
    #[error("Content not found: {0}")]
    NotFound(String),

    /// The operation did not finish within its time budget.
    #[error("Store operation timed out after {0}ms")]
    Timeout(u64),

    /// Record fields could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Run a store operation under a time budget.
pub async fn bounded<T, F>(timeout: Duration, operation: F) -> Result<T, ContentError>
where
    F: Future<Output = Result<T, ContentError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(ContentError::Timeout(timeout.as_millis() as u64)),
    }
}

/// Filter for listing content records.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    /// Restrict to one organization.
    pub organization_id: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by render type.
    pub render_type: Option<String>,
    /// Include soft-deleted records.
    pub include_inactive: bool,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl ContentFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 10,
            ..Default::default()
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_render_type(mut self, render_type: impl Into<String>) -> Self {
        self.render_type = Some(render_type.into());
        self
    }

    pub fn with_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Document store for content records.
///
/// Every mutation is a targeted update keyed by id; callers never write back a
/// whole record they read earlier.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a new record.
    async fn insert(&self, record: &ContentRecord) -> Result<(), ContentError>;

    /// Get a record by id, active or not.
    async fn get(&self, id: &str) -> Result<Option<ContentRecord>, ContentError>;

    /// Get an active record by public reference id.
    async fn find_by_ref_id(&self, ref_id: &str) -> Result<Option<ContentRecord>, ContentError>;

    /// Whether any record already uses this reference id.
    async fn ref_id_exists(&self, ref_id: &str) -> Result<bool, ContentError>;

    /// List records matching the filter, newest first.
    async fn list(&self, filter: &ContentFilter) -> Result<Vec<ContentRecord>, ContentError>;

    /// Count records matching the filter (ignores limit/offset).
    async fn count(&self, filter: &ContentFilter) -> Result<i64, ContentError>;

    /// Write the set fields of `patch` and bump `updated_at`.
    /// Returns false when no record has this id.
    async fn update(&self, id: &str, patch: &ContentPatch) -> Result<bool, ContentError>;

    /// Fold `merges` into the stored media lists by key and write the set
    /// fields of `patch`, as one atomic step. A merge takes precedence over
    /// the patch's list for the same kind.
    /// Returns false when no record has this id.
    async fn merge_update(
        &self,
        id: &str,
        patch: &ContentPatch,
        merges: &[MediaMerge],
    ) -> Result<bool, ContentError>;

    /// Set the status to `to` only if it currently equals `from`.
    /// Returns whether the record was modified.
    async fn transition_status(
        &self,
        id: &str,
        from: &ContentStatus,
        to: &ContentStatus,
    ) -> Result<bool, ContentError>;

    /// Mark an active record of the organization inactive.
    /// Returns false when nothing matched.
    async fn soft_delete(&self, id: &str, organization_id: &str) -> Result<bool, ContentError>;

    /// Get an active record belonging to the organization.
    async fn get_active(
        &self,
        id: &str,
        organization_id: &str,
    ) -> Result<Option<ContentRecord>, ContentError> {
        Ok(self
            .get(id)
            .await?
            .filter(|r| r.is_active && r.organization_id == organization_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let value =
            tokio_test::assert_ok!(bounded(Duration::from_millis(100), async { Ok(7) }).await);
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), ContentError> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ContentError::Timeout(10))));
    }

    #[test]
    fn test_filter_builder() {
        let filter = ContentFilter::new()
            .with_organization("org-1")
            .with_status("draft")
            .with_limit(25)
            .with_offset(50);
        assert_eq!(filter.organization_id.as_deref(), Some("org-1"));
        assert_eq!(filter.status.as_deref(), Some("draft"));
        assert_eq!(filter.limit, 25);
        assert_eq!(filter.offset, 50);
        assert!(!filter.include_inactive);
    }
}
