//! Media processing orchestration.
//!
//! A record's unprocessed originals are classified into tasks, the tasks are
//! registered with the [`TaskTracker`] and published by the [`Dispatcher`],
//! and results coming back are folded in by the [`ResultIngestor`]. Status
//! moves `draft → processing → processed` as the count drains.

mod classifier;
mod dispatcher;
mod ingest;
mod merger;
mod tracker;
mod types;
mod update;

pub use classifier::{
    classify, count_media_tasks, is_original, mask_video, primary_video, TaskPlan, MASK_PREFIX,
    ORIGINAL_PREFIX,
};
pub use dispatcher::{DispatchError, DispatchReport, Dispatcher};
pub use ingest::{build_update, ApplyOutcome, IngestError, ResultIngestor, Transport};
pub use merger::{changed_originals, merge_media, set_media};
pub use tracker::{CompletionOutcome, ProcessingStatus, TaskTracker, TrackerError};
pub use types::{
    MediaType, ProcessingRequest, ProcessingResult, ProcessingType, RequestTopic, RESULT_TOPICS,
};
pub use update::{plan_update, ContentUpdate, UpdatePlan};
