use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::ticket::Ticket;
use crate::services::extractor::ExtractError;
use crate::services::{image, store};

/// Body returned on a successful detection, matching the persisted artifact.
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub ticket: Ticket,
}

/// POST /api/v1/detect — upload an image, run one extraction call, persist
/// and return the ticket. Extractor failures surface as `{"error": ...}`
/// responses and an error artifact; they never crash the process.
pub async fn detect(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let mut upload: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("malformed multipart body"))?
    {
        if field.name() == Some("image") {
            let filename = field
                .file_name()
                .map(sanitize_filename)
                .unwrap_or_else(|| "upload.bin".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::bad_request("failed to read image field"))?;
            upload = Some((data.to_vec(), filename));
        }
    }

    let (raw_bytes, filename) =
        upload.ok_or_else(|| ApiError::bad_request("missing \"image\" field"))?;

    let loaded = image::prepare(raw_bytes.clone()).map_err(|e| {
        ApiError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, format!("unsupported image: {e}"))
    })?;

    // Keep the raw upload around, same as the UI's images/ directory.
    if let Err(e) = save_upload(&state, &filename, &raw_bytes).await {
        tracing::warn!(error = %e, filename, "failed to save uploaded image");
    }

    let ticket = match state.extractor.extract(&loaded.bytes, loaded.encoding).await {
        Ok(ticket) => ticket,
        Err(e) => {
            if let Err(artifact_err) = store::write_error_artifact(&state.artifact_dir, &e.to_string()) {
                tracing::error!(error = %artifact_err, "failed to write error artifact");
            }
            return Err(ApiError::from_extract(e));
        }
    };

    store::insert_ticket(&state.db, &ticket)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to persist ticket: {e}")))?;

    if let Err(e) = store::write_ticket_artifact(&state.artifact_dir, &ticket) {
        tracing::error!(error = %e, ticket_id = %ticket.ticket_id, "failed to write ticket artifact");
    }

    Ok(Json(DetectResponse { ticket }))
}

/// GET /api/v1/tickets — all persisted tickets, newest first.
pub async fn list_tickets(State(state): State<AppState>) -> Result<Json<Vec<Ticket>>, ApiError> {
    let tickets = store::list_tickets(&state.db)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(tickets))
}

async fn save_upload(state: &AppState, filename: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&state.image_dir).await?;
    tokio::fs::write(state.image_dir.join(filename), bytes).await
}

fn sanitize_filename(name: &str) -> String {
    std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin")
        .to_string()
}

/// Error body for the API surface: `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn from_extract(err: ExtractError) -> Self {
        let status = match err {
            // The model misbehaved or was unreachable.
            ExtractError::Transport(_) | ExtractError::NoCallback => StatusCode::BAD_GATEWAY,
            ExtractError::SchemaViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from_extract(ExtractError::NoCallback).status,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from_extract(ExtractError::SchemaViolation("missing field".to_string()))
                .status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn filenames_are_stripped_of_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("street.png"), "street.png");
    }
}
