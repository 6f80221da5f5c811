//! Applies processing results to content records.
//!
//! Results arrive over two transports, the HTTP callback and the result
//! topics on the bus. Both go through [`ResultIngestor::ingest`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::tracker::{CompletionOutcome, TaskTracker};
use super::types::{MediaType, ProcessingResult, ProcessingType, RESULT_TOPICS};
use crate::bus::{BusError, MessageBus, Subscription};
use crate::content::{
    bounded, ContentError, ContentPatch, ContentStore, MediaEntry, MediaKind, MediaMerge,
};
use crate::metrics;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required field: content_id")]
    MissingContentId,

    #[error("missing required field: processed URL")]
    MissingOutput,

    #[error("content not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] ContentError),
}

impl IngestError {
    /// Whether the result itself was unusable, as opposed to a failure while
    /// applying it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, IngestError::MissingContentId | IngestError::MissingOutput)
    }
}

/// How a result reached the ingestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Callback,
    Bus,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Callback => "callback",
            Transport::Bus => "bus",
        }
    }
}

/// What applying a result did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Media was written and the task counted.
    Applied(CompletionOutcome),
    /// The task failed; it was counted without touching media.
    FailedTask(CompletionOutcome),
}

/// Folds processing results into stored records and the task tracker.
pub struct ResultIngestor {
    store: Arc<dyn ContentStore>,
    tracker: Arc<TaskTracker>,
    timeout: Duration,
    dedupe: bool,
}

impl ResultIngestor {
    pub fn new(store: Arc<dyn ContentStore>, tracker: Arc<TaskTracker>, timeout: Duration) -> Self {
        Self {
            store,
            tracker,
            timeout,
            dedupe: false,
        }
    }

    /// Count repeated deliveries of the same output only once.
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// Apply a result and record metrics for the transport it came from.
    pub async fn ingest(
        &self,
        result: &ProcessingResult,
        transport: Transport,
    ) -> Result<ApplyOutcome, IngestError> {
        let applied = self.apply(result).await;

        let outcome = match &applied {
            Ok(ApplyOutcome::Applied(CompletionOutcome::Duplicate))
            | Ok(ApplyOutcome::FailedTask(CompletionOutcome::Duplicate)) => "duplicate",
            Ok(ApplyOutcome::Applied(_)) => "applied",
            Ok(ApplyOutcome::FailedTask(_)) => "failed_task",
            Err(e) if e.is_rejection() => "rejected",
            Err(_) => "error",
        };
        metrics::RESULTS_RECEIVED
            .with_label_values(&[transport.as_str(), outcome])
            .inc();

        applied
    }

    /// Validate a result, write its output into the record and count the task.
    pub async fn apply(&self, result: &ProcessingResult) -> Result<ApplyOutcome, IngestError> {
        if result.content_id.is_empty() {
            warn!("Rejected processing result without content id");
            return Err(IngestError::MissingContentId);
        }
        if !result.has_output() {
            warn!(content_id = %result.content_id, "Rejected processing result without output URL");
            return Err(IngestError::MissingOutput);
        }

        let content_id = result.content_id.as_str();

        if !result.success {
            warn!(
                content_id,
                media_type = result.media_type.as_str(),
                processing_type = result.processing_type.as_str(),
                error = %result.error,
                "Media processing failed"
            );
            let completion = self.complete(result).await;
            return Ok(ApplyOutcome::FailedTask(completion));
        }

        let (patch, merges) = build_update(result);
        if merges.is_empty() {
            debug!(content_id, "Result carries no media output for its kind");
        }

        let updated = bounded(
            self.timeout,
            self.store.merge_update(content_id, &patch, &merges),
        )
        .await?;
        if !updated {
            return Err(IngestError::NotFound(content_id.to_string()));
        }

        info!(
            target: "audit",
            actor = "system",
            action = %format!(
                "Updated {} with {} URLs",
                result.media_type.as_str(),
                result.processing_type.as_str()
            ),
            content_id,
            "Content updated"
        );
        info!(
            content_id,
            media_type = result.media_type.as_str(),
            processing_type = result.processing_type.as_str(),
            "Applied processing result"
        );

        let completion = self.complete(result).await;
        Ok(ApplyOutcome::Applied(completion))
    }

    // Tracker errors never fail the result itself.
    async fn complete(&self, result: &ProcessingResult) -> CompletionOutcome {
        let key = self.dedupe.then(|| result.dedupe_key());
        match self
            .tracker
            .register_completion_keyed(&result.content_id, key.as_deref())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(content_id = %result.content_id, error = %e, "Failed to register completion");
                CompletionOutcome::Untracked
            }
        }
    }

    /// Subscribe to every result topic and apply messages until shutdown.
    ///
    /// All subscriptions are made before any worker starts, so a subscribe
    /// failure leaves nothing running.
    pub async fn start_subscriptions(
        self: &Arc<Self>,
        bus: &Arc<dyn MessageBus>,
        shutdown: &broadcast::Sender<()>,
    ) -> Result<Vec<JoinHandle<()>>, BusError> {
        let mut subscriptions = Vec::with_capacity(RESULT_TOPICS.len());
        for topic in RESULT_TOPICS {
            subscriptions.push(bus.subscribe(topic).await?);
            info!(topic, "Subscribed to result topic");
        }

        Ok(subscriptions
            .into_iter()
            .map(|subscription| self.spawn_worker(subscription, shutdown.subscribe()))
            .collect())
    }

    fn spawn_worker(
        self: &Arc<Self>,
        mut subscription: Subscription,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let ingestor = Arc::clone(self);

        tokio::spawn(async move {
            let topic = subscription.topic().to_string();
            debug!(topic = %topic, "Result worker started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(topic = %topic, "Result worker received shutdown signal");
                        break;
                    }
                    message = subscription.next() => {
                        let Some(message) = message else {
                            warn!(topic = %topic, "Result topic closed");
                            break;
                        };
                        ingestor.handle_message(&message.topic, &message.payload).await;
                    }
                }
            }
            debug!(topic = %topic, "Result worker stopped");
        })
    }

    async fn handle_message(&self, topic: &str, payload: &[u8]) {
        let result: ProcessingResult = match serde_json::from_slice(payload) {
            Ok(result) => result,
            Err(e) => {
                warn!(topic, error = %e, "Discarding undecodable processing result");
                metrics::RESULTS_RECEIVED
                    .with_label_values(&[Transport::Bus.as_str(), "rejected"])
                    .inc();
                return;
            }
        };

        debug!(topic, content_id = %result.content_id, "Received processing result");

        if let Err(e) = self.ingest(&result, Transport::Bus).await {
            error!(topic, content_id = %result.content_id, error = %e, "Failed to apply processing result");
        }
    }
}

/// Compute the targeted update a successful result makes to a record.
///
/// Outputs become key merges into the matching media list. Orientation is
/// copied when present and `has_alpha` only when set, so feedback from one
/// task never clears what another reported.
pub fn build_update(result: &ProcessingResult) -> (ContentPatch, Vec<MediaMerge>) {
    let mut patch = ContentPatch::new();

    if !result.orientation.is_empty() {
        patch.orientation = Some(result.orientation.clone());
    }
    if result.has_alpha {
        patch.has_alpha = Some(true);
    }

    let processed = result.processed_url.as_str();
    let mut entries: Vec<MediaEntry> = Vec::new();

    let kind = match result.media_type {
        MediaType::Image => {
            if !processed.is_empty() {
                entries.push(MediaEntry::new("compressed", processed));
            }
            Some(MediaKind::Image)
        }
        MediaType::Video => {
            match result.processing_type {
                ProcessingType::Compressed | ProcessingType::Alpha | ProcessingType::Stitched => {
                    if !processed.is_empty() {
                        entries.push(MediaEntry::new(result.processing_type.as_str(), processed));
                    }
                }
                ProcessingType::Hls => {
                    if !result.hls_url.is_empty() {
                        entries.push(MediaEntry::new("hls", &result.hls_url));
                    }
                    if !result.dash_url.is_empty() {
                        entries.push(MediaEntry::new("dash", &result.dash_url));
                    }
                }
                ProcessingType::Dash => {
                    let dash = if result.dash_url.is_empty() {
                        processed
                    } else {
                        result.dash_url.as_str()
                    };
                    if !dash.is_empty() {
                        entries.push(MediaEntry::new("dash", dash));
                    }
                }
                ProcessingType::Unknown => {}
            }
            Some(MediaKind::Video)
        }
        MediaType::Object3d => {
            if !processed.is_empty() {
                entries.push(MediaEntry::new("processed", processed));
            }
            Some(MediaKind::Object3d)
        }
        MediaType::Unknown => None,
    };

    let merges = match kind {
        Some(kind) if !entries.is_empty() => vec![MediaMerge::new(kind, entries)],
        _ => Vec::new(),
    };

    (patch, merges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentRecord, ContentStatus, SqliteContentStore};

    fn result(media_type: MediaType, processing_type: ProcessingType) -> ProcessingResult {
        ProcessingResult {
            content_id: "c1".to_string(),
            media_type,
            processing_type,
            success: true,
            ..Default::default()
        }
    }

    fn record_with_original_video() -> ContentRecord {
        let mut record = ContentRecord::new("c1", "org", "user");
        record.videos = vec![MediaEntry::new("original", "v.mp4")];
        record
    }

    #[test]
    fn test_image_result_sets_compressed() {
        let mut r = result(MediaType::Image, ProcessingType::Compressed);
        r.processed_url = "a.webp".to_string();

        let (patch, merges) = build_update(&r);
        assert!(patch.is_empty());
        assert_eq!(
            merges,
            vec![MediaMerge::single(MediaKind::Image, "compressed", "a.webp")]
        );
    }

    #[test]
    fn test_hls_result_sets_hls_and_dash() {
        let mut r = result(MediaType::Video, ProcessingType::Hls);
        r.hls_url = "v.m3u8".to_string();
        r.dash_url = "v.mpd".to_string();

        let (_, merges) = build_update(&r);
        assert_eq!(
            merges,
            vec![MediaMerge::new(
                MediaKind::Video,
                vec![MediaEntry::new("hls", "v.m3u8"), MediaEntry::new("dash", "v.mpd")]
            )]
        );
    }

    #[test]
    fn test_video_subtypes_map_to_keys() {
        for (kind, key) in [
            (ProcessingType::Compressed, "compressed"),
            (ProcessingType::Alpha, "alpha"),
            (ProcessingType::Stitched, "stitched"),
        ] {
            let mut r = result(MediaType::Video, kind);
            r.processed_url = format!("{}.mp4", key);
            let (_, merges) = build_update(&r);
            assert_eq!(
                merges,
                vec![MediaMerge::single(MediaKind::Video, key, format!("{}.mp4", key))]
            );
        }
    }

    #[test]
    fn test_object_result_sets_processed() {
        let mut r = result(MediaType::Object3d, ProcessingType::Compressed);
        r.processed_url = "m.glb".to_string();
        let (_, merges) = build_update(&r);
        assert_eq!(
            merges,
            vec![MediaMerge::single(MediaKind::Object3d, "processed", "m.glb")]
        );
    }

    #[test]
    fn test_feedback_fields_copied_only_when_present() {
        let mut r = result(MediaType::Video, ProcessingType::Stitched);
        r.processed_url = "s.mp4".to_string();
        let (patch, _) = build_update(&r);
        assert!(patch.orientation.is_none());
        assert!(patch.has_alpha.is_none());

        r.orientation = "portrait".to_string();
        r.has_alpha = true;
        let (patch, _) = build_update(&r);
        assert_eq!(patch.orientation.as_deref(), Some("portrait"));
        assert_eq!(patch.has_alpha, Some(true));
    }

    #[test]
    fn test_unknown_kinds_yield_no_media() {
        let mut r = result(MediaType::Unknown, ProcessingType::Compressed);
        r.processed_url = "x".to_string();
        assert!(build_update(&r).1.is_empty());

        let mut r = result(MediaType::Video, ProcessingType::Unknown);
        r.processed_url = "x".to_string();
        assert!(build_update(&r).1.is_empty());
    }

    async fn setup(dedupe: bool) -> (Arc<dyn ContentStore>, Arc<TaskTracker>, ResultIngestor) {
        let store: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::in_memory().unwrap());
        store.insert(&record_with_original_video()).await.unwrap();
        let tracker = Arc::new(TaskTracker::new(Arc::clone(&store), Duration::from_secs(5)));
        let ingestor = ResultIngestor::new(
            Arc::clone(&store),
            Arc::clone(&tracker),
            Duration::from_secs(5),
        )
        .with_dedupe(dedupe);
        (store, tracker, ingestor)
    }

    #[tokio::test]
    async fn test_rejects_missing_content_id() {
        let (_store, _tracker, ingestor) = setup(false).await;
        let mut r = result(MediaType::Video, ProcessingType::Compressed);
        r.content_id.clear();
        r.processed_url = "c.mp4".to_string();
        assert!(matches!(
            ingestor.apply(&r).await,
            Err(IngestError::MissingContentId)
        ));
    }

    #[tokio::test]
    async fn test_rejects_result_without_urls_even_when_failed() {
        let (_store, tracker, ingestor) = setup(false).await;
        tracker.register_start("c1", 2).await.unwrap();

        let mut r = result(MediaType::Video, ProcessingType::Compressed);
        r.success = false;
        let err = ingestor.apply(&r).await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(tracker.remaining("c1"), Some(2));
    }

    #[tokio::test]
    async fn test_failed_result_counts_without_media_change() {
        let (store, tracker, ingestor) = setup(false).await;
        tracker.register_start("c1", 2).await.unwrap();

        let mut r = result(MediaType::Video, ProcessingType::Compressed);
        r.success = false;
        r.processed_url = "c.mp4".to_string();
        r.error = "encoder crashed".to_string();

        let outcome = ingestor.apply(&r).await.unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::FailedTask(CompletionOutcome::Remaining(1))
        );
        let stored = store.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.videos.len(), 1);
    }

    #[tokio::test]
    async fn test_successful_result_is_persisted_and_counted() {
        let (store, tracker, ingestor) = setup(false).await;
        tracker.register_start("c1", 1).await.unwrap();

        let mut r = result(MediaType::Video, ProcessingType::Compressed);
        r.processed_url = "c.mp4".to_string();
        r.orientation = "landscape".to_string();

        let outcome = ingestor.ingest(&r, Transport::Callback).await.unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Applied(CompletionOutcome::Finished { transitioned: true })
        );

        let stored = store.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.videos[1], MediaEntry::new("compressed", "c.mp4"));
        assert_eq!(stored.orientation, "landscape");
        assert_eq!(stored.status, ContentStatus::Processed);
    }

    #[tokio::test]
    async fn test_unknown_record_reports_not_found() {
        let (_store, _tracker, ingestor) = setup(false).await;
        let mut r = result(MediaType::Image, ProcessingType::Compressed);
        r.content_id = "missing".to_string();
        r.processed_url = "a.webp".to_string();
        assert!(matches!(
            ingestor.apply(&r).await,
            Err(IngestError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicates_counted_twice_by_default() {
        let (_store, tracker, ingestor) = setup(false).await;
        tracker.register_start("c1", 3).await.unwrap();

        let mut r = result(MediaType::Video, ProcessingType::Compressed);
        r.processed_url = "c.mp4".to_string();
        ingestor.apply(&r).await.unwrap();
        ingestor.apply(&r).await.unwrap();

        assert_eq!(tracker.remaining("c1"), Some(1));
    }

    #[tokio::test]
    async fn test_dedupe_ignores_redelivery() {
        let (_store, tracker, ingestor) = setup(true).await;
        tracker.register_start("c1", 3).await.unwrap();

        let mut r = result(MediaType::Video, ProcessingType::Compressed);
        r.processed_url = "c.mp4".to_string();
        ingestor.apply(&r).await.unwrap();
        let second = ingestor.apply(&r).await.unwrap();

        assert_eq!(second, ApplyOutcome::Applied(CompletionOutcome::Duplicate));
        assert_eq!(tracker.remaining("c1"), Some(2));
    }
}
