//! Abstract object store client trait.
//!
//! Every provider binding must implement [`ObjectStoreClient`].  A client
//! is bound to exactly one container (bucket, region, credentials) at
//! construction time, so none of the methods take a bucket argument.
//!
//! Failures are reported as [`ProviderError`]: the provider's own error
//! code plus a coarse [`Fault`] class describing where the call broke.
//! Turning that into the gateway's error taxonomy is the job of
//! [`crate::gateway::classify`], not of the client.

use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Where a provider call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The request could not be built (bad endpoint, signing failure).
    Construction,
    /// The request could not be delivered (DNS, connect, TLS, I/O).
    Dispatch,
    /// The transport gave up waiting for the provider.
    Timeout,
    /// The provider answered, but the response could not be understood.
    Response,
    /// The provider answered with an error status.
    Service {
        /// HTTP status returned by the provider.
        status: u16,
    },
    /// The provider accepted the request but the body stream broke mid-read.
    Body,
    /// The client refused an input before sending anything
    /// (e.g. a presign expiry beyond the provider's maximum).
    Rejected,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Construction => f.write_str("construction failure"),
            Fault::Dispatch => f.write_str("dispatch failure"),
            Fault::Timeout => f.write_str("timeout"),
            Fault::Response => f.write_str("unreadable response"),
            Fault::Service { status } => write!(f, "service error (HTTP {status})"),
            Fault::Body => f.write_str("body read failure"),
            Fault::Rejected => f.write_str("input rejected"),
        }
    }
}

/// A failed provider round trip, in provider vocabulary.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed: {fault}: {message}")]
pub struct ProviderError {
    /// Provider operation name (`put_object`, `head_object`, ...).
    pub operation: &'static str,
    /// Failure class.
    pub fault: Fault,
    /// Provider error code (`NoSuchKey`, `AccessDenied`, ...), if any.
    pub code: Option<String>,
    /// Human-readable detail.
    pub message: String,
}

impl ProviderError {
    /// Build a [`Fault::Service`] error carrying a provider error code.
    pub fn service(
        operation: &'static str,
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            fault: Fault::Service { status },
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Build an error with no provider code.
    pub fn new(operation: &'static str, fault: Fault, message: impl Into<String>) -> Self {
        Self {
            operation,
            fault,
            code: None,
            message: message.into(),
        }
    }

    /// Provider error code, if the provider sent one.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// Result of a provider round trip.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Boxed future returned by [`ObjectStoreClient`] methods.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = ProviderResult<T>> + Send + 'a>>;

/// Async object store contract for a single container.
///
/// Implementations must be safe to share across concurrent callers; the
/// gateway adds no locking of its own.
pub trait ObjectStoreClient: Send + Sync + 'static {
    /// Store `data` under `key`, replacing any existing object.
    fn put_object(&self, key: &str, data: Bytes) -> ProviderFuture<'_, ()>;

    /// List every key in the container, in provider order.
    fn list_keys(&self) -> ProviderFuture<'_, Vec<String>>;

    /// Read the full object at `key`.
    fn get_object(&self, key: &str) -> ProviderFuture<'_, Bytes>;

    /// Probe `key`. Succeeds only if the object exists.
    fn head_object(&self, key: &str) -> ProviderFuture<'_, ()>;

    /// Remove the object at `key`.
    fn delete_object(&self, key: &str) -> ProviderFuture<'_, ()>;

    /// Mint a download URL for `key`, valid for `expires_in` from now.
    ///
    /// Any signing resource used here must not outlive the call.
    fn presign_get(&self, key: &str, expires_in: Duration) -> ProviderFuture<'_, String>;
}
