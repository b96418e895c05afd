//! Object store providers.
//!
//! The [`backend::ObjectStoreClient`] trait abstracts over the remote
//! service holding the container.  Implementations: AWS S3 (and
//! S3-compatible endpoints) and an in-process store for local runs and
//! tests.

pub mod aws;
pub mod backend;
pub mod configurator;
pub mod memory;
