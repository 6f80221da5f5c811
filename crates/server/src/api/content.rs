//! Content record API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};

use mrcontent_core::content::{bounded, new_content_id, unique_ref_id};
use mrcontent_core::processing::plan_update;
use mrcontent_core::{
    ContentError, ContentFilter, ContentRecord, ContentStatus, ContentUpdate, MediaEntry,
    MediaKind, ProcessingStatus, TrackerError,
};

use super::middleware::CurrentIdentity;
use crate::metrics::{CONTENT_CREATED_TOTAL, CONTENT_DELETED_TOTAL};
use crate::state::AppState;

/// Page size when the client gives none or an unusable one
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a content record
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateContentBody {
    pub name: String,
    pub render_type: String,
    pub images: Vec<MediaEntry>,
    pub videos: Vec<MediaEntry>,
    pub objects_3d: Vec<MediaEntry>,
    pub has_alpha: bool,
    pub orientation: String,
    /// Defaults to `draft` when empty
    pub status: String,
}

/// Query parameters for listing content.
///
/// Pagination values are kept as text so unusable input falls back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListContentParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub render_type: Option<String>,
}

/// A record with its media flattened into `<kind>_<key>` fields
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ContentResponse(Map<String, Value>);

impl From<ContentRecord> for ContentResponse {
    fn from(record: ContentRecord) -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::from(record.id));
        fields.insert("organization_id".into(), Value::from(record.organization_id));
        fields.insert("user_id".into(), Value::from(record.user_id));
        fields.insert("name".into(), Value::from(record.name));
        fields.insert("ref_id".into(), Value::from(record.ref_id));
        fields.insert("render_type".into(), Value::from(record.render_type));
        fields.insert("has_alpha".into(), Value::from(record.has_alpha));
        fields.insert("orientation".into(), Value::from(record.orientation));
        fields.insert("status".into(), Value::from(String::from(record.status)));
        fields.insert("is_active".into(), Value::from(record.is_active));
        fields.insert("created_at".into(), Value::from(record.created_at.to_rfc3339()));
        fields.insert("updated_at".into(), Value::from(record.updated_at.to_rfc3339()));

        for (kind, list) in [
            (MediaKind::Image, record.images),
            (MediaKind::Video, record.videos),
            (MediaKind::Object3d, record.objects_3d),
        ] {
            for entry in list {
                fields.insert(
                    format!("{}_{}", kind.field_name(), entry.key),
                    Value::from(entry.value),
                );
            }
        }

        Self(fields)
    }
}

/// Response for listing content
#[derive(Debug, Serialize)]
pub struct ListContentResponse {
    pub data: Vec<ContentResponse>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ContentErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ContentErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ContentErrorResponse {
            error: message.into(),
        }),
    )
}

fn store_error(e: ContentError) -> ApiError {
    error!(error = %e, "Content store operation failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "MR content not found")
}

/// Parse a positive integer, tolerating junk the way form-style clients send it.
fn parse_positive(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a content record and start processing its media
pub async fn create_content(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(body): Json<CreateContentBody>,
) -> Result<(StatusCode, Json<ContentResponse>), ApiError> {
    let timeout = state.store_timeout();
    let store = state.store();

    let ref_id = bounded(timeout, unique_ref_id(store.as_ref()))
        .await
        .map_err(store_error)?;

    let mut record = ContentRecord::new(
        new_content_id(),
        identity.organization_id.clone(),
        identity.user_id.clone(),
    );
    record.ref_id = ref_id;
    record.name = body.name;
    record.render_type = body.render_type;
    record.images = body.images;
    record.videos = body.videos;
    record.objects_3d = body.objects_3d;
    record.has_alpha = body.has_alpha;
    record.orientation = body.orientation;
    if !body.status.is_empty() {
        record.status = ContentStatus::from(body.status);
    }

    bounded(timeout, store.insert(&record))
        .await
        .map_err(store_error)?;

    CONTENT_CREATED_TOTAL.inc();
    info!(
        target: "audit",
        actor = %identity.user_id,
        action = "content_created",
        content_id = %record.id,
        "Created content"
    );

    // Media without original entries classifies to zero tasks and stays draft.
    if record.has_media() {
        state.dispatcher().spawn(record.clone());
        info!(content_id = %record.id, "Media processing triggered");
    }

    Ok((StatusCode::CREATED, Json(ContentResponse::from(record))))
}

/// Get a content record of the caller's organization
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<ContentResponse>, ApiError> {
    let record = bounded(
        state.store_timeout(),
        state.store().get_active(&id, &identity.organization_id),
    )
    .await
    .map_err(store_error)?
    .ok_or_else(not_found)?;

    Ok(Json(ContentResponse::from(record)))
}

/// Public lookup by reference id
pub async fn get_content_by_ref(
    State(state): State<Arc<AppState>>,
    Path(ref_id): Path<String>,
) -> Result<Json<ContentResponse>, ApiError> {
    let record = bounded(state.store_timeout(), state.store().find_by_ref_id(&ref_id))
        .await
        .map_err(store_error)?
        .ok_or_else(not_found)?;

    Ok(Json(ContentResponse::from(record)))
}

/// Partially update a content record.
///
/// Media lists merge by key. New or changed originals are dispatched as a
/// reduced record holding only those entries.
pub async fn update_content(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(id): Path<String>,
    Json(update): Json<ContentUpdate>,
) -> Result<Json<ContentResponse>, ApiError> {
    let timeout = state.store_timeout();
    let store = state.store();

    let existing = bounded(timeout, store.get_active(&id, &identity.organization_id))
        .await
        .map_err(store_error)?
        .ok_or_else(not_found)?;

    let plan = plan_update(&existing, &update);

    let updated = bounded(timeout, store.merge_update(&id, &plan.patch, &plan.merges))
        .await
        .map_err(store_error)?;
    if !updated {
        return Err(not_found());
    }

    info!(
        target: "audit",
        actor = %identity.user_id,
        action = "content_updated",
        content_id = %id,
        "Updated content"
    );

    let record = bounded(timeout, store.get(&id))
        .await
        .map_err(store_error)?
        .ok_or_else(not_found)?;

    match plan.reprocess {
        Some(reduced) => {
            info!(content_id = %id, "New or changed originals, triggering media processing");
            state.dispatcher().spawn(reduced);
        }
        None => info!(content_id = %id, "No new originals, skipping media processing"),
    }

    Ok(Json(ContentResponse::from(record)))
}

/// Soft-delete a content record
pub async fn delete_content(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = bounded(
        state.store_timeout(),
        state.store().soft_delete(&id, &identity.organization_id),
    )
    .await
    .map_err(store_error)?;

    if !deleted {
        return Err(not_found());
    }

    CONTENT_DELETED_TOTAL.inc();
    info!(
        target: "audit",
        actor = %identity.user_id,
        action = "content_deleted",
        content_id = %id,
        "Deleted content"
    );

    Ok(Json(MessageResponse {
        message: "MR content deleted successfully".to_string(),
    }))
}

/// List content records of the caller's organization, newest first
pub async fn list_content(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(params): Query<ListContentParams>,
) -> Result<Json<ListContentResponse>, ApiError> {
    let limit = parse_positive(params.limit.as_deref())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    let offset = parse_positive(params.page.as_deref())
        .map(|page| (page - 1).saturating_mul(limit))
        .unwrap_or(0);

    let mut filter = ContentFilter::new()
        .with_organization(identity.organization_id.as_str())
        .with_limit(limit)
        .with_offset(offset);

    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        filter = filter.with_status(status);
    }
    if let Some(render_type) = params.render_type.as_deref().filter(|s| !s.is_empty()) {
        filter = filter.with_render_type(render_type);
    }

    let timeout = state.store_timeout();
    let records = bounded(timeout, state.store().list(&filter))
        .await
        .map_err(store_error)?;
    let total = bounded(timeout, state.store().count(&filter))
        .await
        .map_err(store_error)?;

    Ok(Json(ListContentResponse {
        data: records.into_iter().map(ContentResponse::from).collect(),
        total,
        page: offset / limit + 1,
        page_size: limit,
        total_pages: (total + limit - 1) / limit,
    }))
}

/// Report whether a record's media is still being processed
pub async fn get_processing_status(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<ProcessingStatus>, ApiError> {
    bounded(
        state.store_timeout(),
        state.store().get_active(&id, &identity.organization_id),
    )
    .await
    .map_err(store_error)?
    .ok_or_else(not_found)?;

    match state.tracker().query_status(&id).await {
        Ok(status) => Ok(Json(status)),
        Err(TrackerError::Store(ContentError::NotFound(_))) => Err(not_found()),
        Err(TrackerError::Store(e)) => Err(store_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_flattens_media() {
        let mut record = ContentRecord::new("c1", "org", "user");
        record.images = vec![
            MediaEntry::new("original", "a.png"),
            MediaEntry::new("compressed", "a.webp"),
        ];
        record.videos = vec![MediaEntry::new("hls", "v.m3u8")];
        record.objects_3d = vec![MediaEntry::new("original", "m.glb")];

        let json = serde_json::to_value(ContentResponse::from(record)).unwrap();
        assert_eq!(json["images_original"], "a.png");
        assert_eq!(json["images_compressed"], "a.webp");
        assert_eq!(json["videos_hls"], "v.m3u8");
        assert_eq!(json["objects_3d_original"], "m.glb");
        assert_eq!(json["status"], "draft");
        assert_eq!(json["is_active"], true);
        assert!(json.get("images").is_none());
        assert!(json.get("videos").is_none());
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(Some("5")), Some(5));
        assert_eq!(parse_positive(Some(" 7 ")), Some(7));
        assert_eq!(parse_positive(Some("0")), None);
        assert_eq!(parse_positive(Some("-3")), None);
        assert_eq!(parse_positive(Some("abc")), None);
        assert_eq!(parse_positive(None), None);
    }
}
