//! Decides which media entries still need processing and how many tasks the
//! processing service will report back for them.

use crate::content::{ContentRecord, MediaEntry};

/// Key prefix of user-submitted source media.
pub const ORIGINAL_PREFIX: &str = "original";
/// Key prefix of mask videos sent along with the primary video.
pub const MASK_PREFIX: &str = "mask";

/// Whether an entry is an unprocessed user-submitted source.
pub fn is_original(entry: &MediaEntry) -> bool {
    entry.key.starts_with(ORIGINAL_PREFIX) && !entry.value.is_empty()
}

/// Tasks a record generates, broken down by media kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskPlan {
    /// Original images, one compression task each.
    pub images: u32,
    /// Original videos, each compressed and transcoded to HLS/DASH.
    pub original_videos: u32,
    /// A `mask` or `original_alpha` video exists, adding one stitch task.
    pub has_alpha_counterpart: bool,
    /// Original 3D objects. They produce no tasks today.
    pub objects_3d: u32,
}

impl TaskPlan {
    pub fn image_tasks(&self) -> u32 {
        self.images
    }

    pub fn video_tasks(&self) -> u32 {
        if self.original_videos == 0 {
            return 0;
        }
        let stitch = u32::from(self.has_alpha_counterpart);
        stitch + self.original_videos * 2
    }

    pub fn total(&self) -> u32 {
        self.image_tasks() + self.video_tasks()
    }
}

/// Inspect a record's media lists.
pub fn classify(record: &ContentRecord) -> TaskPlan {
    let images = record.images.iter().filter(|e| is_original(e)).count() as u32;
    let original_videos = record.videos.iter().filter(|e| is_original(e)).count() as u32;
    let has_alpha_counterpart = record
        .videos
        .iter()
        .any(|e| e.key == "mask" || e.key == "original_alpha");
    let objects_3d = record.objects_3d.iter().filter(|e| is_original(e)).count() as u32;

    TaskPlan {
        images,
        original_videos,
        has_alpha_counterpart,
        objects_3d,
    }
}

/// Number of completion results the record's media will produce.
pub fn count_media_tasks(record: &ContentRecord) -> u32 {
    classify(record).total()
}

/// First original video in list order.
pub fn primary_video(record: &ContentRecord) -> Option<&MediaEntry> {
    record.videos.iter().find(|e| is_original(e))
}

/// First non-empty mask video in list order.
pub fn mask_video(record: &ContentRecord) -> Option<&MediaEntry> {
    record
        .videos
        .iter()
        .find(|e| e.key.starts_with(MASK_PREFIX) && !e.value.is_empty())
}
