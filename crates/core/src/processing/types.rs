//! Processing request and result messages exchanged with the media
//! processing service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topics the processing service consumes requests from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestTopic {
    CompressImage,
    CompressVideo,
    TranscodeHlsDash,
    GenerateAlpha,
    StitchVideos,
    CreateExperience,
}

impl RequestTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestTopic::CompressImage => "compressimage",
            RequestTopic::CompressVideo => "compressvideo",
            RequestTopic::TranscodeHlsDash => "transcodehlsdash",
            RequestTopic::GenerateAlpha => "generatealpha",
            RequestTopic::StitchVideos => "stitchvideos",
            RequestTopic::CreateExperience => "createexperience",
        }
    }
}

impl fmt::Display for RequestTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topics results are published back on. Every topic is handled identically.
pub const RESULT_TOPICS: [&str; 6] = [
    "result.compressimage",
    "result.compressvideo",
    "result.transcodehlsdash",
    "result.generatealpha",
    "result.stitchvideos",
    "result.default",
];

/// Request published for the processing service.
///
/// Empty fields are left out of the JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub video_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_url: String,
    #[serde(
        rename = "alphavideo_url",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub alpha_video_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_topic: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub organization_id: String,
}

impl ProcessingRequest {
    pub fn image(
        image_url: impl Into<String>,
        content_id: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Self {
        Self {
            image_url: image_url.into(),
            content_id: content_id.into(),
            organization_id: organization_id.into(),
            ..Default::default()
        }
    }

    pub fn video(
        video_url: impl Into<String>,
        content_id: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Self {
        Self {
            video_url: video_url.into(),
            content_id: content_id.into(),
            organization_id: organization_id.into(),
            ..Default::default()
        }
    }

    pub fn with_alpha(mut self, alpha_video_url: impl Into<String>) -> Self {
        self.alpha_video_url = alpha_video_url.into();
        self
    }
}

/// Media kind a result refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    #[serde(rename = "object_3d")]
    Object3d,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Object3d => "object_3d",
            MediaType::Unknown => "unknown",
        }
    }
}

/// Which output a result carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingType {
    Compressed,
    Hls,
    Dash,
    Alpha,
    Stitched,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProcessingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingType::Compressed => "compressed",
            ProcessingType::Hls => "hls",
            ProcessingType::Dash => "dash",
            ProcessingType::Alpha => "alpha",
            ProcessingType::Stitched => "stitched",
            ProcessingType::Unknown => "unknown",
        }
    }
}

/// Completion report for one processing task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingResult {
    pub content_id: String,
    pub original_url: String,
    pub processed_url: String,
    pub hls_url: String,
    pub dash_url: String,
    pub media_type: MediaType,
    pub processing_type: ProcessingType,
    pub orientation: String,
    pub has_alpha: bool,
    pub success: bool,
    pub error: String,
    pub timestamp: i64,
}

impl ProcessingResult {
    /// Whether any produced URL is present.
    pub fn has_output(&self) -> bool {
        !self.processed_url.is_empty() || !self.hls_url.is_empty() || !self.dash_url.is_empty()
    }

    /// Identity of the output this result reports, used to spot redeliveries.
    pub fn dedupe_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.media_type.as_str(),
            self.processing_type.as_str(),
            self.original_url,
            self.processed_url,
            self.hls_url,
            self.dash_url
        )
    }
}
