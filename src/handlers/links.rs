//! Downloads through links minted by the in-memory store.
//!
//! With the `memory` backend there is no provider endpoint to hand out, so
//! minted links point back at this server:
//! `{public_url}/{container}/{key}?X-Objectgate-Expires=..&X-Objectgate-Signature=..`.
//! The route is only mounted when that backend is active.

use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::parse_query;
use crate::errors::{ApiError, DataObjectError};
use crate::gateway::classify::classify;
use crate::storage::backend::ObjectStoreClient;
use crate::storage::memory::{EXPIRES_PARAM, SIGNATURE_PARAM};
use crate::AppState;

fn denied(message: &str) -> ApiError {
    ApiError(DataObjectError::AccessDenied(message.to_string()))
}

/// `GET /links/{container}/{key}` -- serve the object if the link is
/// authentic and unexpired.
pub async fn download_link(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, ApiError> {
    let store = state
        .link_store
        .as_ref()
        .ok_or_else(|| denied("links are not served by this backend"))?;

    let (container, key) = path
        .split_once('/')
        .filter(|(_, key)| !key.is_empty())
        .ok_or_else(|| ApiError::invalid_param("link path must be /{container}/{key}"))?;
    if container != store.container() {
        return Err(ApiError(DataObjectError::DataObjectNotFound(
            container.to_string(),
        )));
    }

    let query = parse_query(raw_query);
    let expires_at: i64 = query
        .get(EXPIRES_PARAM)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| denied("link expiry missing or malformed"))?;
    let signature = query
        .get(SIGNATURE_PARAM)
        .ok_or_else(|| denied("link signature missing"))?;

    if !store.verify_signature(key, expires_at, signature, chrono::Utc::now()) {
        debug!("rejected link: key={} expires_at={}", key, expires_at);
        return Err(denied("link signature invalid or expired"));
    }

    let data = store
        .get_object(key)
        .await
        .map_err(|e| classify(e, Some(key)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "application/octet-stream")],
        data,
    )
        .into_response())
}
