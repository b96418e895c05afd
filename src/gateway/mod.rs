//! The storage gateway.
//!
//! [`DataObjectGateway`] exposes add / list / get / delete / exists /
//! presigned-link operations on the single configured container.  Every
//! operation is one live round trip (two for `delete` and `get_url`) to the
//! [`ObjectStoreClient`]; nothing is cached.
//!
//! Validation order is fixed for every operation:
//!   1. shape checks on caller input (no provider traffic yet),
//!   2. existence checks for operations that need the key to exist,
//!   3. the provider call itself, whose failures go through [`classify`].
//!
//! `delete` and `get_url` are check-then-act: a concurrent delete by
//! another client between the existence probe and the action is not
//! detected.  The provider has no compare-and-swap for these calls, so the
//! race is accepted.

pub mod classify;

use bytes::Bytes;
use metrics::counter;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::errors::DataObjectError;
use crate::metrics::GATEWAY_OPERATIONS_TOTAL;
use crate::storage::backend::ObjectStoreClient;

use self::classify::{classify, is_absent_key};

/// The container binding: immutable for the life of the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Bucket name.
    pub name: String,
    /// Provider region the bucket lives in.
    pub region: String,
}

impl Container {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }
}

/// Provider-independent access to one container.
///
/// Cheap to share behind an `Arc`; the underlying client is assumed safe
/// for concurrent use and the gateway holds no mutable state.
pub struct DataObjectGateway {
    container: Container,
    store: Arc<dyn ObjectStoreClient>,
}

impl DataObjectGateway {
    pub fn new(container: Container, store: Arc<dyn ObjectStoreClient>) -> Self {
        Self { container, store }
    }

    /// Name of the configured container.
    pub fn name(&self) -> &str {
        &self.container.name
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Upload the file at `source` under `key`, replacing any existing
    /// object with that key.
    ///
    /// `source` must be a readable regular file; the caller is responsible
    /// for materializing uploaded payloads there first.
    pub async fn add(&self, key: &str, source: &Path) -> Result<(), DataObjectError> {
        let result = async {
            validate_key(key)?;
            let data = read_source(source).await?;

            debug!(
                "add: container={} key={} bytes={}",
                self.container.name,
                key,
                data.len()
            );

            self.store
                .put_object(key, data)
                .await
                .map_err(|e| classify(e, Some(key)))
        }
        .await;
        observe("add", result)
    }

    /// Every key currently in the container, in provider listing order.
    ///
    /// A missing container is `DataObjectNotFound` and a refused listing is
    /// `AccessDenied`; every other listing failure is `DataObject`.
    pub async fn list_objects(&self) -> Result<Vec<String>, DataObjectError> {
        debug!("list_objects: container={}", self.container.name);
        let result = self
            .store
            .list_keys()
            .await
            .map_err(|e| listing_error(classify(e, None)));
        observe("list_objects", result)
    }

    /// Full content of the object at `key`.
    pub async fn get(&self, key: &str) -> Result<Bytes, DataObjectError> {
        let result = async {
            validate_key(key)?;
            debug!("get: container={} key={}", self.container.name, key);
            self.store
                .get_object(key)
                .await
                .map_err(|e| classify(e, Some(key)))
        }
        .await;
        observe("get", result)
    }

    /// Remove the object at `key`.
    ///
    /// Deleting an absent key is an error ([`DataObjectError::KeyNotFound`]),
    /// not a silent no-op, so callers can tell "removed" from "nothing there".
    pub async fn delete(&self, key: &str) -> Result<(), DataObjectError> {
        let result = async {
            validate_key(key)?;
            if !self.probe(key).await? {
                return Err(DataObjectError::key_not_found(key));
            }

            debug!("delete: container={} key={}", self.container.name, key);

            self.store
                .delete_object(key)
                .await
                .map_err(|e| classify(e, Some(key)))
        }
        .await;
        observe("delete", result)
    }

    /// Whether an object is stored under `key`.  Absence is `Ok(false)`;
    /// every other provider failure is an error.
    pub async fn exists(&self, key: &str) -> Result<bool, DataObjectError> {
        let result = async {
            validate_key(key)?;
            self.probe(key).await
        }
        .await;
        observe("exists", result)
    }

    /// Issue a presigned download URL for `key`, valid for `duration`
    /// from now.
    pub async fn get_url(
        &self,
        key: &str,
        duration: chrono::Duration,
    ) -> Result<String, DataObjectError> {
        let result = async {
            validate_key(key)?;
            if duration <= chrono::Duration::zero() {
                return Err(DataObjectError::InvalidParam(
                    "link duration must be positive".to_string(),
                ));
            }
            let expires_in = duration.to_std().map_err(|e| {
                DataObjectError::InvalidParam(format!("link duration out of range: {e}"))
            })?;

            if !self.probe(key).await? {
                return Err(DataObjectError::key_not_found(key));
            }

            debug!(
                "get_url: container={} key={} expires_in={}s",
                self.container.name,
                key,
                expires_in.as_secs()
            );

            self.store
                .presign_get(key, expires_in)
                .await
                .map_err(|e| classify(e, Some(key)))
        }
        .await;
        observe("get_url", result)
    }

    /// Existence probe shared by `exists`, `delete` and `get_url`.
    async fn probe(&self, key: &str) -> Result<bool, DataObjectError> {
        debug!("head: container={} key={}", self.container.name, key);
        match self.store.head_object(key).await {
            Ok(()) => Ok(true),
            Err(e) if is_absent_key(&e) => Ok(false),
            Err(e) => Err(classify(e, Some(key))),
        }
    }
}

/// Reject keys the provider could never address.
fn validate_key(key: &str) -> Result<(), DataObjectError> {
    if key.is_empty() {
        return Err(DataObjectError::InvalidParam(
            "key must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Read a materialized upload source fully into memory.
async fn read_source(source: &Path) -> Result<Bytes, DataObjectError> {
    let meta = tokio::fs::metadata(source).await.map_err(|e| {
        DataObjectError::InvalidParam(format!(
            "content source {} does not exist: {e}",
            source.display()
        ))
    })?;
    if !meta.is_file() {
        return Err(DataObjectError::InvalidParam(format!(
            "content source {} is not a regular file",
            source.display()
        )));
    }
    let data = tokio::fs::read(source).await.map_err(|e| {
        DataObjectError::InvalidParam(format!(
            "content source {} is unreadable: {e}",
            source.display()
        ))
    })?;
    Ok(Bytes::from(data))
}

fn listing_error(err: DataObjectError) -> DataObjectError {
    match err {
        DataObjectError::DataObjectNotFound(_)
        | DataObjectError::AccessDenied(_)
        | DataObjectError::DataObject(_) => err,
        DataObjectError::InvalidParam(m)
        | DataObjectError::Client(m)
        | DataObjectError::Service(m) => DataObjectError::DataObject(m),
        DataObjectError::KeyNotFound { key } => {
            DataObjectError::DataObject(format!("listing failed on key {key}"))
        }
    }
}

/// Count the operation outcome and hand the result back.
fn observe<T>(
    operation: &'static str,
    result: Result<T, DataObjectError>,
) -> Result<T, DataObjectError> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    counter!(GATEWAY_OPERATIONS_TOTAL, "operation" => operation, "outcome" => outcome)
        .increment(1);
    result
}

// -- Tests -------------------------------------------------------------------
