//! Fans a record's unprocessed media out as processing requests.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::classifier::{classify, is_original, mask_video, primary_video, TaskPlan};
use super::tracker::TaskTracker;
use super::types::{ProcessingRequest, RequestTopic};
use crate::bus::{BusError, MessageBus};
use crate::config::{ProcessingConfig, VideoDispatch};
use crate::content::ContentRecord;
use crate::metrics;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// What one dispatch run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Tasks registered with the tracker.
    pub tasks: u32,
    /// Requests published.
    pub published: u32,
    /// Requests that could not be published.
    pub failed: u32,
    /// Completions registered on behalf of failed requests.
    pub compensated: u32,
}

/// Publishes processing requests and keeps the tracker's count honest when a
/// publish fails.
pub struct Dispatcher {
    bus: Arc<dyn MessageBus>,
    tracker: Arc<TaskTracker>,
    config: ProcessingConfig,
}

impl Dispatcher {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        tracker: Arc<TaskTracker>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            bus,
            tracker,
            config,
        }
    }

    /// Dispatch on a detached task. Failures are logged, never returned.
    pub fn spawn(self: &Arc<Self>, record: ContentRecord) -> JoinHandle<DispatchReport> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.run(&record).await })
    }

    /// Register the record's tasks and publish its requests.
    pub async fn run(&self, record: &ContentRecord) -> DispatchReport {
        let content_id = record.id.as_str();
        let plan = classify(record);
        let mut report = DispatchReport {
            tasks: plan.total(),
            ..Default::default()
        };

        if report.tasks == 0 {
            debug!(content_id, "No unprocessed media, nothing to dispatch");
            return report;
        }

        if let Err(e) = self.tracker.register_start(content_id, report.tasks).await {
            // Requests still go out; results are applied even without a
            // status transition.
            error!(content_id, error = %e, "Failed to register processing start");
        }

        info!(
            content_id,
            organization_id = %record.organization_id,
            tasks = report.tasks,
            "Dispatching media processing"
        );

        self.dispatch_images(record, &mut report).await;

        match self.config.video_dispatch {
            VideoDispatch::Combined => self.dispatch_video_combined(record, &plan, &mut report).await,
            VideoDispatch::PerTask => self.dispatch_video_per_task(record, &plan, &mut report).await,
        }

        for object in record.objects_3d.iter().filter(|e| is_original(e)) {
            info!(
                content_id,
                key = %object.key,
                "3D object processing not available, skipping"
            );
        }

        report
    }

    async fn dispatch_images(&self, record: &ContentRecord, report: &mut DispatchReport) {
        for image in record.images.iter().filter(|e| is_original(e)) {
            let request =
                ProcessingRequest::image(&image.value, &record.id, &record.organization_id);
            if self.publish_reported(RequestTopic::CompressImage, &request, report).await {
                continue;
            }
            if self.config.compensate_failed_publishes {
                self.compensate(&record.id, 1, report).await;
            }
        }
    }

    async fn dispatch_video_combined(
        &self,
        record: &ContentRecord,
        plan: &TaskPlan,
        report: &mut DispatchReport,
    ) {
        let Some(primary) = primary_video(record) else {
            return;
        };

        let mut request =
            ProcessingRequest::video(&primary.value, &record.id, &record.organization_id);
        if let Some(mask) = mask_video(record) {
            debug!(content_id = %record.id, mask = %mask.value, "Including mask video");
            request = request.with_alpha(&mask.value);
        }

        if !self
            .publish_reported(RequestTopic::CreateExperience, &request, report)
            .await
        {
            // None of the counted video tasks will ever report back.
            self.compensate(&record.id, plan.video_tasks(), report).await;
        }
    }

    async fn dispatch_video_per_task(
        &self,
        record: &ContentRecord,
        plan: &TaskPlan,
        report: &mut DispatchReport,
    ) {
        let compensate = self.config.compensate_failed_publishes;

        for video in record.videos.iter().filter(|e| is_original(e)) {
            let request =
                ProcessingRequest::video(&video.value, &record.id, &record.organization_id);
            for topic in [RequestTopic::TranscodeHlsDash, RequestTopic::CompressVideo] {
                if !self.publish_reported(topic, &request, report).await && compensate {
                    self.compensate(&record.id, 1, report).await;
                }
            }
        }

        if plan.original_videos == 0 || !plan.has_alpha_counterpart {
            return;
        }

        let counterpart = record
            .videos
            .iter()
            .find(|e| e.key == "mask" || e.key == "original_alpha")
            .filter(|e| !e.value.is_empty())
            .or_else(|| mask_video(record));

        match (primary_video(record), counterpart) {
            (Some(primary), Some(alpha)) => {
                let request =
                    ProcessingRequest::video(&primary.value, &record.id, &record.organization_id)
                        .with_alpha(&alpha.value);
                if !self
                    .publish_reported(RequestTopic::StitchVideos, &request, report)
                    .await
                    && compensate
                {
                    self.compensate(&record.id, 1, report).await;
                }
            }
            _ => {
                warn!(content_id = %record.id, "Alpha counterpart has no URL, stitch skipped");
                self.compensate(&record.id, 1, report).await;
            }
        }
    }

    /// Publish and update the report. Returns whether the publish succeeded.
    async fn publish_reported(
        &self,
        topic: RequestTopic,
        request: &ProcessingRequest,
        report: &mut DispatchReport,
    ) -> bool {
        match self.publish(topic, request).await {
            Ok(()) => {
                report.published += 1;
                true
            }
            Err(e) => {
                error!(
                    content_id = %request.content_id,
                    topic = %topic,
                    error = %e,
                    "Failed to publish processing request"
                );
                report.failed += 1;
                false
            }
        }
    }

    async fn publish(
        &self,
        topic: RequestTopic,
        request: &ProcessingRequest,
    ) -> Result<(), DispatchError> {
        let result = match serde_json::to_vec(request) {
            Ok(payload) => self
                .bus
                .publish(topic.as_str(), payload)
                .await
                .map_err(DispatchError::from),
            Err(e) => Err(DispatchError::from(e)),
        };

        let label = if result.is_ok() { "ok" } else { "error" };
        metrics::REQUESTS_PUBLISHED
            .with_label_values(&[topic.as_str(), label])
            .inc();

        if result.is_ok() {
            debug!(content_id = %request.content_id, topic = %topic, "Published processing request");
        }
        result
    }

    async fn compensate(&self, content_id: &str, completions: u32, report: &mut DispatchReport) {
        for _ in 0..completions {
            if let Err(e) = self.tracker.register_completion(content_id).await {
                error!(content_id, error = %e, "Failed to register compensating completion");
            }
        }
        metrics::COMPENSATED_COMPLETIONS.inc_by(u64::from(completions));
        report.compensated += completions;
        warn!(content_id, completions, "Registered completions for unpublished requests");
    }
}
