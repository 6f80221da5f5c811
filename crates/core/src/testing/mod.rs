//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use mrcontent_core::testing::{fixtures, MockBus};
//!
//! let bus = Arc::new(MockBus::new());
//! let record = fixtures::record_with_video("c1", true);
//! ```

mod mock_bus;

pub use mock_bus::MockBus;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::content::{ContentRecord, MediaEntry};
    use crate::processing::{MediaType, ProcessingResult, ProcessingType};

    pub const ORGANIZATION: &str = "org-test";
    pub const USER: &str = "user-test";

    /// A draft record with no media.
    pub fn record(id: &str) -> ContentRecord {
        let mut record = ContentRecord::new(id, ORGANIZATION, USER);
        record.name = format!("Experience {}", id);
        record.render_type = "ar".to_string();
        record
    }

    /// A draft record with `count` original images.
    pub fn record_with_images(id: &str, count: usize) -> ContentRecord {
        let mut record = record(id);
        record.images = (0..count)
            .map(|i| {
                let key = if i == 0 {
                    "original".to_string()
                } else {
                    format!("original_{}", i + 1)
                };
                MediaEntry::new(key, format!("https://cdn.example/{}/image_{}.png", id, i))
            })
            .collect();
        record
    }

    /// A draft record with one original video, optionally with a mask.
    pub fn record_with_video(id: &str, with_mask: bool) -> ContentRecord {
        let mut record = record(id);
        record.videos = vec![MediaEntry::new(
            "original",
            format!("https://cdn.example/{}/video.mp4", id),
        )];
        if with_mask {
            record.videos.push(MediaEntry::new(
                "mask",
                format!("https://cdn.example/{}/mask.mp4", id),
            ));
        }
        record
    }

    /// A successful result carrying `processed_url`.
    pub fn success_result(
        content_id: &str,
        media_type: MediaType,
        processing_type: ProcessingType,
        processed_url: &str,
    ) -> ProcessingResult {
        ProcessingResult {
            content_id: content_id.to_string(),
            processed_url: processed_url.to_string(),
            media_type,
            processing_type,
            success: true,
            timestamp: chrono::Utc::now().timestamp(),
            ..Default::default()
        }
    }

    /// A successful HLS/DASH result.
    pub fn hls_result(content_id: &str) -> ProcessingResult {
        ProcessingResult {
            content_id: content_id.to_string(),
            hls_url: format!("https://cdn.example/{}/master.m3u8", content_id),
            dash_url: format!("https://cdn.example/{}/manifest.mpd", content_id),
            media_type: MediaType::Video,
            processing_type: ProcessingType::Hls,
            success: true,
            timestamp: chrono::Utc::now().timestamp(),
            ..Default::default()
        }
    }

    /// A failed result. It still names the input URL it failed on.
    pub fn failed_result(content_id: &str, error: &str) -> ProcessingResult {
        ProcessingResult {
            content_id: content_id.to_string(),
            processed_url: format!("https://cdn.example/{}/partial", content_id),
            media_type: MediaType::Video,
            processing_type: ProcessingType::Compressed,
            success: false,
            error: error.to_string(),
            ..Default::default()
        }
    }
}
