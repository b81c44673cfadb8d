//! Web endpoints for Packrat.
//!
//! Two operations: multipart upload under `/files/...` and retrieval by
//! content hash at `/files/<40-hex hash>/<filename>`. Both POST and GET
//! share the `/files/{*path}` wildcard; the GET handler splits the hash
//! off the front of the path itself, since a separate
//! `/files/{hash}/{*filename}` route would overlap the upload wildcard.

use crate::serve;
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use stash::{ContentHash, PathError, Repository, UploadError};
use std::sync::Arc;

/// Shared state for web handlers
#[derive(Clone)]
pub struct WebState {
    pub repo: Arc<Repository>,
    /// Externally visible hostname, rendered into upload-response URLs.
    pub hostname: String,
}

#[derive(Serialize)]
struct UploadResponse {
    url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/files", post(upload_root))
        // The wildcard below needs a non-empty remainder, so the bare
        // trailing-slash form gets its own route.
        .route("/files/", post(upload_root))
        .route("/files/{*path}", post(upload).get(retrieve))
        .with_state(state)
}

/// Upload with no subpath: the logical path is the filename alone.
async fn upload_root(State(state): State<WebState>, multipart: Multipart) -> Response {
    handle_upload(state, String::new(), multipart).await
}

async fn upload(
    State(state): State<WebState>,
    Path(subpath): Path<String>,
    multipart: Multipart,
) -> Response {
    handle_upload(state, subpath, multipart).await
}

/// Pull the `file` field out of the multipart body and commit it.
async fn handle_upload(state: WebState, subpath: String, mut multipart: Multipart) -> Response {
    let (filename, bytes) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    let filename = field.file_name().unwrap_or("").to_string();
                    match field.bytes().await {
                        Ok(bytes) => break (filename, bytes),
                        Err(err) => {
                            return error_response(
                                StatusCode::BAD_REQUEST,
                                &format!("Malformed upload: {err}"),
                            )
                        }
                    }
                }
            }
            Ok(None) => {
                return error_response(StatusCode::BAD_REQUEST, "Missing multipart field: file")
            }
            Err(err) => {
                return error_response(StatusCode::BAD_REQUEST, &format!("Malformed upload: {err}"))
            }
        }
    };

    match state.repo.upload(&subpath, &filename, &bytes) {
        Ok(upload) => {
            tracing::info!(path = %upload.logical_path, hash = %upload.content_hash, "upload accepted");
            let url = format!(
                "http://{}/files/{}/{}",
                state.hostname,
                upload.content_hash,
                encode_path(upload.logical_path.as_str())
            );
            Json(UploadResponse { url }).into_response()
        }
        Err(UploadError::Path(err @ PathError::TooDeep)) => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(UploadError::Path(err @ PathError::AccessDenied)) => {
            error_response(StatusCode::FORBIDDEN, &err.to_string())
        }
        Err(UploadError::Storage(err)) => {
            tracing::error!("upload failed: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
        }
    }
}

/// Serve stored content at `<40-hex hash>/<filename>`.
async fn retrieve(State(state): State<WebState>, Path(path): Path<String>) -> Response {
    let Some((hash, filename)) = split_object_path(&path) else {
        return not_found();
    };

    match serve::retrieve(&state.repo, &hash, filename) {
        Ok(Some(served)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, served.content_type)
            .header(header::CONTENT_DISPOSITION, served.disposition)
            .body(Body::from(served.bytes))
            .unwrap_or_else(|err| {
                tracing::error!("failed to build response: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }),
        Ok(None) => not_found(),
        Err(err) => {
            tracing::error!("retrieval failed: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
        }
    }
}

/// Percent-encode the segments of a logical path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split `<hash>/<filename>` and validate the hash shape.
fn split_object_path(path: &str) -> Option<(ContentHash, &str)> {
    let (hash, filename) = path.split_once('/')?;
    if filename.is_empty() {
        return None;
    }
    let hash: ContentHash = hash.parse().ok()?;
    Some((hash, filename))
}

fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "File not found")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
