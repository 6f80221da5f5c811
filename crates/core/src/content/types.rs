//! Content record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single keyed media slot, serialized as `{"k": ..., "v": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    #[serde(rename = "k")]
    pub key: String,
    #[serde(rename = "v")]
    pub value: String,
}

impl MediaEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Entries to fold into one media list by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMerge {
    pub kind: MediaKind,
    pub entries: Vec<MediaEntry>,
}

impl MediaMerge {
    pub fn new(kind: MediaKind, entries: Vec<MediaEntry>) -> Self {
        Self { kind, entries }
    }

    /// Merge of a single `(key, value)` pair.
    pub fn single(kind: MediaKind, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(kind, vec![MediaEntry::new(key, value)])
    }
}

/// The three media lists a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "object_3d")]
    Object3d,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Video, MediaKind::Object3d];

    /// Name of the record field holding this kind's list.
    pub fn field_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
            MediaKind::Object3d => "objects_3d",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Object3d => "object_3d",
        }
    }
}

/// Lifecycle status of a content record.
///
/// Only `draft → processing → processed` is driven by media processing. Any
/// other value written by a client is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentStatus {
    #[default]
    Draft,
    Processing,
    Processed,
    Other(String),
}

impl ContentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Processing => "processing",
            ContentStatus::Processed => "processed",
            ContentStatus::Other(s) => s,
        }
    }
}

impl From<String> for ContentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => ContentStatus::Draft,
            "processing" => ContentStatus::Processing,
            "processed" => ContentStatus::Processed,
            _ => ContentStatus::Other(value),
        }
    }
}

impl From<&str> for ContentStatus {
    fn from(value: &str) -> Self {
        ContentStatus::from(value.to_string())
    }
}

impl From<ContentStatus> for String {
    fn from(status: ContentStatus) -> Self {
        match status {
            ContentStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ref_id: String,
    #[serde(default)]
    pub render_type: String,
    #[serde(default)]
    pub images: Vec<MediaEntry>,
    #[serde(default)]
    pub videos: Vec<MediaEntry>,
    #[serde(default)]
    pub objects_3d: Vec<MediaEntry>,
    #[serde(default)]
    pub has_alpha: bool,
    #[serde(default)]
    pub orientation: String,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Create a fresh draft record owned by the given user and organization.
    pub fn new(
        id: impl Into<String>,
        organization_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            user_id: user_id.into(),
            name: String::new(),
            ref_id: String::new(),
            render_type: String::new(),
            images: Vec::new(),
            videos: Vec::new(),
            objects_3d: Vec::new(),
            has_alpha: false,
            orientation: String::new(),
            status: ContentStatus::Draft,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn media(&self, kind: MediaKind) -> &[MediaEntry] {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
            MediaKind::Object3d => &self.objects_3d,
        }
    }

    pub fn media_mut(&mut self, kind: MediaKind) -> &mut Vec<MediaEntry> {
        match kind {
            MediaKind::Image => &mut self.images,
            MediaKind::Video => &mut self.videos,
            MediaKind::Object3d => &mut self.objects_3d,
        }
    }

    pub fn has_media(&self) -> bool {
        MediaKind::ALL.iter().any(|kind| !self.media(*kind).is_empty())
    }

    /// Apply a patch in memory, mirroring what the store persists.
    pub fn apply(&mut self, patch: &ContentPatch) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(ref render_type) = patch.render_type {
            self.render_type = render_type.clone();
        }
        if let Some(ref orientation) = patch.orientation {
            self.orientation = orientation.clone();
        }
        if let Some(ref status) = patch.status {
            self.status = status.clone();
        }
        if let Some(has_alpha) = patch.has_alpha {
            self.has_alpha = has_alpha;
        }
        for kind in MediaKind::ALL {
            if let Some(list) = patch.media(kind) {
                *self.media_mut(kind) = list.to_vec();
            }
        }
        self.updated_at = Utc::now();
    }
}

/// A targeted set of field writes. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentPatch {
    pub name: Option<String>,
    pub render_type: Option<String>,
    pub orientation: Option<String>,
    pub status: Option<ContentStatus>,
    pub has_alpha: Option<bool>,
    pub images: Option<Vec<MediaEntry>>,
    pub videos: Option<Vec<MediaEntry>>,
    pub objects_3d: Option<Vec<MediaEntry>>,
}

impl ContentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn media(&self, kind: MediaKind) -> Option<&[MediaEntry]> {
        match kind {
            MediaKind::Image => self.images.as_deref(),
            MediaKind::Video => self.videos.as_deref(),
            MediaKind::Object3d => self.objects_3d.as_deref(),
        }
    }

    pub fn set_media(&mut self, kind: MediaKind, list: Vec<MediaEntry>) {
        match kind {
            MediaKind::Image => self.images = Some(list),
            MediaKind::Video => self.videos = Some(list),
            MediaKind::Object3d => self.objects_3d = Some(list),
        }
    }

    pub fn with_media(mut self, kind: MediaKind, list: Vec<MediaEntry>) -> Self {
        self.set_media(kind, list);
        self
    }

    pub fn with_orientation(mut self, orientation: impl Into<String>) -> Self {
        self.orientation = Some(orientation.into());
        self
    }

    pub fn with_has_alpha(mut self, has_alpha: bool) -> Self {
        self.has_alpha = Some(has_alpha);
        self
    }

    pub fn with_status(mut self, status: ContentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// True when the patch would only bump `updated_at`.
    pub fn is_empty(&self) -> bool {
        self == &ContentPatch::default()
    }
}
