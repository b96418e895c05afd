//! objectgate library -- HTTP gateway over a single object-store container.
//!
//! This crate provides the storage gateway core ([`gateway`]), pluggable
//! provider clients ([`storage`]), the HTTP surface ([`server`],
//! [`handlers`]) and the ambient configuration, error, and metrics layers.

use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod storage;

use crate::config::Config;
use crate::gateway::DataObjectGateway;
use crate::storage::memory::MemoryObjectStore;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Gateway bound to the configured container.
    pub gateway: DataObjectGateway,
    /// The in-memory store, when it is the active backend.  Its minted
    /// links are served by this process.
    pub link_store: Option<Arc<MemoryObjectStore>>,
}
