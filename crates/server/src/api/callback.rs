//! HTTP delivery of processing results.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use mrcontent_core::{IngestError, ProcessingResult, Transport};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallbackResponse {
    fn ok() -> Self {
        Self {
            success: true,
            message: Some("Callback processed successfully".to_string()),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

fn status_for(e: &IngestError) -> StatusCode {
    match e {
        IngestError::MissingContentId | IngestError::MissingOutput => StatusCode::BAD_REQUEST,
        IngestError::NotFound(_) => StatusCode::NOT_FOUND,
        IngestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Apply a processing result posted by a media worker
pub async fn media_callback(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ProcessingResult>, JsonRejection>,
) -> (StatusCode, Json<CallbackResponse>) {
    let Json(result) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Unparseable processing callback");
            return (
                StatusCode::BAD_REQUEST,
                Json(CallbackResponse::failed("Invalid request body")),
            );
        }
    };

    debug!(
        content_id = %result.content_id,
        media_type = %result.media_type.as_str(),
        processing_type = %result.processing_type.as_str(),
        success = result.success,
        "Received processing result via callback"
    );

    match state.ingestor().ingest(&result, Transport::Callback).await {
        Ok(_) => (StatusCode::OK, Json(CallbackResponse::ok())),
        Err(e) => {
            if e.is_rejection() {
                warn!(content_id = %result.content_id, error = %e, "Rejected processing callback");
            } else {
                error!(content_id = %result.content_id, error = %e, "Failed to apply processing callback");
            }
            (status_for(&e), Json(CallbackResponse::failed(e.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrcontent_core::ContentError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&IngestError::MissingContentId), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&IngestError::MissingOutput), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&IngestError::NotFound("c1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&IngestError::Store(ContentError::Timeout(5000))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_shapes() {
        let ok = serde_json::to_value(CallbackResponse::ok()).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["message"], "Callback processed successfully");
        assert!(ok.get("error").is_none());

        let failed = serde_json::to_value(CallbackResponse::failed("boom")).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "boom");
        assert!(failed.get("message").is_none());
    }
}
