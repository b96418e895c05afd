//! Object-level API handlers.
//!
//! Each handler translates one HTTP request into one gateway call.  Input
//! problems the gateway cannot see (missing form fields, unparseable query
//! values) are rejected here as [`ApiError::invalid_param`]; everything else
//! is left to the gateway so validation happens in one order.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::parse_query;
use crate::errors::{ApiError, DataObjectError};
use crate::AppState;

/// Multipart field carrying the upload payload.
const FILE_FIELD: &str = "file";
/// Optional multipart field overriding the stored key.
const KEY_FIELD: &str = "key";

/// Body of `GET /container`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ContainerInfo {
    /// Bucket name.
    pub name: String,
    /// Provider region of the bucket.
    pub region: String,
}

// -- Query parameters ---------------------------------------------------------

/// Parse the `duration` query value (whole minutes).
///
/// Only presence and syntax are checked here; the sign is the gateway's
/// call, so `0` and negative values are passed through.
fn parse_duration_minutes(query: &HashMap<String, String>) -> Result<chrono::Duration, ApiError> {
    let raw = query
        .get("duration")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::invalid_param("missing query parameter 'duration'"))?;

    let minutes: i64 = raw.parse().map_err(|_| {
        ApiError::invalid_param(format!("duration must be a whole number of minutes, got '{raw}'"))
    })?;

    chrono::Duration::try_minutes(minutes)
        .ok_or_else(|| ApiError::invalid_param(format!("duration out of range: {minutes}")))
}

// -- Upload staging -----------------------------------------------------------

/// Stream a multipart field into a temporary file.
///
/// The file is removed when the returned handle is dropped.
async fn stage_field(mut field: Field<'_>) -> Result<NamedTempFile, ApiError> {
    let staged = NamedTempFile::new().map_err(staging_error)?;
    let mut out = tokio::fs::File::from_std(staged.reopen().map_err(staging_error)?);

    let mut written = 0usize;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::invalid_param(format!("failed to read upload: {e}")))?
    {
        out.write_all(&chunk).await.map_err(staging_error)?;
        written += chunk.len();
    }
    out.flush().await.map_err(staging_error)?;

    debug!("staged upload: {} bytes at {}", written, staged.path().display());
    Ok(staged)
}

fn staging_error(err: std::io::Error) -> ApiError {
    ApiError(DataObjectError::Client(format!(
        "failed to stage upload: {err}"
    )))
}

/// Pick the object key for an upload: the explicit `key` field if given,
/// else the uploaded file's name.
fn resolve_upload_key(
    key_field: Option<String>,
    file_name: Option<String>,
) -> Result<String, ApiError> {
    key_field
        .filter(|k| !k.is_empty())
        .or_else(|| file_name.filter(|n| !n.is_empty()))
        .ok_or_else(|| ApiError::invalid_param("uploaded file has no name and no 'key' was given"))
}

// -- Handlers -----------------------------------------------------------------

/// `GET /objects` -- every key in the container.
#[utoipa::path(
    get,
    path = "/objects",
    tag = "Object",
    operation_id = "ListObjects",
    responses(
        (status = 200, description = "Keys in listing order", body = Vec<String>),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Container not found"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let keys = state.gateway.list_objects().await?;
    Ok(Json(keys))
}

/// `POST /objects` -- upload the multipart `file` field.
#[utoipa::path(
    post,
    path = "/objects",
    tag = "Object",
    operation_id = "AddObject",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Form with a `file` field and an optional `key` field"
    ),
    responses(
        (status = 200, description = "Object stored"),
        (status = 400, description = "Missing or invalid file"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Container not found"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn post_object(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    let mut upload: Option<(Option<String>, NamedTempFile)> = None;
    let mut key_field: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_param(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field.file_name().map(str::to_string);
                let staged = stage_field(field).await?;
                upload = Some((file_name, staged));
            }
            Some(KEY_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::invalid_param(format!("invalid 'key' field: {e}")))?;
                key_field = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, staged) =
        upload.ok_or_else(|| ApiError::invalid_param("missing multipart field 'file'"))?;
    let key = resolve_upload_key(key_field, file_name)?;

    state.gateway.add(&key, staged.path()).await?;
    Ok(StatusCode::OK)
}

/// `GET /objects/{key}?duration=<minutes>` -- presigned download URL.
#[utoipa::path(
    get,
    path = "/objects/{key}",
    tag = "Object",
    operation_id = "GetObjectUrl",
    params(
        ("key" = String, Path, description = "Object key"),
        ("duration" = i64, Query, description = "Link lifetime in minutes"),
    ),
    responses(
        (status = 200, description = "Presigned URL", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or non-positive duration"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Key not found"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn get_object_url(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, ApiError> {
    let duration = parse_duration_minutes(&parse_query(raw_query))?;
    let url = state.gateway.get_url(&key, duration).await?;
    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        url,
    )
        .into_response())
}

/// `GET /objects/{key}/content` -- raw object bytes.
#[utoipa::path(
    get,
    path = "/objects/{key}/content",
    tag = "Object",
    operation_id = "GetObjectContent",
    params(("key" = String, Path, description = "Object key")),
    responses(
        (status = 200, description = "Object data", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Key not found"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn get_object_content(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.gateway.get(&key).await?;
    Ok((
        StatusCode::OK,
        [("content-type", "application/octet-stream")],
        data,
    )
        .into_response())
}

/// `HEAD /objects/{key}` -- 200 if present, 404 if not.
#[utoipa::path(
    head,
    path = "/objects/{key}",
    tag = "Object",
    operation_id = "HeadObject",
    params(("key" = String, Path, description = "Object key")),
    responses(
        (status = 200, description = "Object exists"),
        (status = 404, description = "Object does not exist"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn head_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.gateway.exists(&key).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// `DELETE /objects/{key}`
#[utoipa::path(
    delete,
    path = "/objects/{key}",
    tag = "Object",
    operation_id = "DeleteObject",
    params(("key" = String, Path, description = "Object key")),
    responses(
        (status = 204, description = "Object deleted"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Key not found"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.gateway.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /container` -- the bound container.
#[utoipa::path(
    get,
    path = "/container",
    tag = "Container",
    operation_id = "GetContainer",
    responses((status = 200, description = "Container name and region", body = ContainerInfo))
)]
pub async fn get_container(State(state): State<Arc<AppState>>) -> Json<ContainerInfo> {
    let container = state.gateway.container();
    Json(ContainerInfo {
        name: container.name.clone(),
        region: container.region.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(raw: &str) -> HashMap<String, String> {
        parse_query(Some(raw.to_string()))
    }

    #[test]
    fn test_duration_minutes() {
        let d = parse_duration_minutes(&query("duration=15")).unwrap();
        assert_eq!(d, chrono::Duration::minutes(15));
    }

    #[test]
    fn test_duration_sign_left_to_gateway() {
        assert_eq!(
            parse_duration_minutes(&query("duration=0")).unwrap(),
            chrono::Duration::zero()
        );
        assert_eq!(
            parse_duration_minutes(&query("duration=-5")).unwrap(),
            chrono::Duration::minutes(-5)
        );
    }

    #[test]
    fn test_duration_missing_or_malformed() {
        for raw in ["", "duration=", "duration=ten", "duration=1.5", "other=3"] {
            let err = parse_duration_minutes(&query(raw)).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{raw}");
        }
    }

    #[test]
    fn test_duration_out_of_range() {
        let err = parse_duration_minutes(&query(&format!("duration={}", i64::MAX))).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upload_key_prefers_explicit_field() {
        let key = resolve_upload_key(Some("docs/a.txt".into()), Some("a.txt".into())).unwrap();
        assert_eq!(key, "docs/a.txt");
    }

    #[test]
    fn test_upload_key_falls_back_to_file_name() {
        assert_eq!(
            resolve_upload_key(None, Some("a.txt".into())).unwrap(),
            "a.txt"
        );
        assert_eq!(
            resolve_upload_key(Some(String::new()), Some("a.txt".into())).unwrap(),
            "a.txt"
        );
    }

    #[test]
    fn test_upload_key_missing() {
        assert!(resolve_upload_key(None, None).is_err());
        assert!(resolve_upload_key(None, Some(String::new())).is_err());
    }
}
