//! Client updates to an existing record: media merged by key, plain fields
//! written only when provided, and changed originals picked out for
//! reprocessing.

use serde::Deserialize;

use super::merger::{changed_originals, merge_media};
use crate::content::{
    ContentPatch, ContentRecord, ContentStatus, MediaEntry, MediaKind, MediaMerge,
};

/// Partial update sent by a client.
///
/// Empty strings count as absent. `has_alpha` is written only when the key is
/// present in the request, so `false` can be set explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentUpdate {
    pub name: Option<String>,
    pub render_type: Option<String>,
    pub orientation: Option<String>,
    pub status: Option<String>,
    pub has_alpha: Option<bool>,
    pub images: Option<Vec<MediaEntry>>,
    pub videos: Option<Vec<MediaEntry>>,
    pub objects_3d: Option<Vec<MediaEntry>>,
}

impl ContentUpdate {
    pub fn media(&self, kind: MediaKind) -> Option<&[MediaEntry]> {
        match kind {
            MediaKind::Image => self.images.as_deref(),
            MediaKind::Video => self.videos.as_deref(),
            MediaKind::Object3d => self.objects_3d.as_deref(),
        }
    }
}

/// Outcome of planning an update against the stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// Plain field writes.
    pub patch: ContentPatch,
    /// Incoming media, merged by key into the stored lists on write.
    pub merges: Vec<MediaMerge>,
    /// Reduced record holding only new or changed originals, when any.
    pub reprocess: Option<ContentRecord>,
}

fn provided(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Plan how `update` applies to `existing`.
pub fn plan_update(existing: &ContentRecord, update: &ContentUpdate) -> UpdatePlan {
    let patch = ContentPatch {
        name: provided(&update.name),
        render_type: provided(&update.render_type),
        orientation: provided(&update.orientation),
        status: provided(&update.status).map(ContentStatus::from),
        has_alpha: update.has_alpha,
        ..Default::default()
    };

    let mut reprocess = ContentRecord::new(
        existing.id.clone(),
        existing.organization_id.clone(),
        existing.user_id.clone(),
    );
    reprocess.has_alpha = update.has_alpha.unwrap_or(existing.has_alpha);
    let mut merges = Vec::new();

    for kind in MediaKind::ALL {
        let Some(incoming) = update.media(kind) else {
            continue;
        };
        let current = existing.media(kind);
        let changed = changed_originals(current, incoming);
        let merged = merge_media(current, incoming);

        // Keep list order of the merged result for the reprocessed entries.
        *reprocess.media_mut(kind) = merged
            .iter()
            .filter(|e| changed.iter().any(|c| c.key == e.key))
            .cloned()
            .collect();
        merges.push(MediaMerge::new(kind, incoming.to_vec()));
    }

    UpdatePlan {
        patch,
        merges,
        reprocess: reprocess.has_media().then_some(reprocess),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing() -> ContentRecord {
        let mut record = ContentRecord::new("c1", "org", "user");
        record.name = "Before".to_string();
        record.images = vec![
            MediaEntry::new("original", "a.png"),
            MediaEntry::new("compressed", "a.webp"),
        ];
        record.videos = vec![MediaEntry::new("original", "v.mp4")];
        record
    }

    fn update_json(json: &str) -> ContentUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_plain_fields_only_when_provided() {
        let plan = plan_update(&existing(), &update_json(r#"{"name":"After","render_type":""}"#));
        assert_eq!(plan.patch.name.as_deref(), Some("After"));
        assert!(plan.patch.render_type.is_none());
        assert!(plan.merges.is_empty());
        assert!(plan.reprocess.is_none());
    }

    #[test]
    fn test_has_alpha_written_only_when_present() {
        let plan = plan_update(&existing(), &update_json(r#"{"name":"x"}"#));
        assert!(plan.patch.has_alpha.is_none());

        let plan = plan_update(&existing(), &update_json(r#"{"has_alpha":false}"#));
        assert_eq!(plan.patch.has_alpha, Some(false));
    }

    #[test]
    fn test_status_is_carried_as_given() {
        let plan = plan_update(&existing(), &update_json(r#"{"status":"archived"}"#));
        assert_eq!(
            plan.patch.status,
            Some(ContentStatus::Other("archived".to_string()))
        );
    }

    #[test]
    fn test_media_merged_and_changed_original_reprocessed() {
        let plan = plan_update(
            &existing(),
            &update_json(r#"{"images":[{"k":"original","v":"b.png"},{"k":"thumb","v":"t.png"}]}"#),
        );

        assert!(plan.patch.images.is_none());
        assert_eq!(
            plan.merges,
            vec![MediaMerge::new(
                MediaKind::Image,
                vec![
                    MediaEntry::new("original", "b.png"),
                    MediaEntry::new("thumb", "t.png"),
                ]
            )]
        );
        let reprocess = plan.reprocess.unwrap();
        assert_eq!(reprocess.images, vec![MediaEntry::new("original", "b.png")]);
        assert!(reprocess.videos.is_empty());
        assert_eq!(reprocess.organization_id, "org");
    }

    #[test]
    fn test_unchanged_originals_not_reprocessed() {
        let plan = plan_update(
            &existing(),
            &update_json(r#"{"videos":[{"k":"original","v":"v.mp4"},{"k":"mask","v":"m.mp4"}]}"#),
        );
        assert_eq!(plan.merges.len(), 1);
        assert!(plan.reprocess.is_none());
    }

    #[test]
    fn test_new_video_original_reprocessed() {
        let plan = plan_update(
            &existing(),
            &update_json(r#"{"videos":[{"k":"original_2","v":"w.mp4"}]}"#),
        );
        let reprocess = plan.reprocess.unwrap();
        assert_eq!(reprocess.videos, vec![MediaEntry::new("original_2", "w.mp4")]);
    }
}
