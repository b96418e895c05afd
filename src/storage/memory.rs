//! In-memory object store.
//!
//! Objects live in a `tokio::sync::RwLock<BTreeMap<...>>`, so listings come
//! back in lexical key order like S3's.  A configurable byte cap
//! (`max_size_bytes`) bounds total stored data.
//!
//! Links minted by [`MemoryObjectStore::presign_get`] are signed with
//! HMAC-SHA256 over the container, key and expiry timestamp, so they cannot
//! be forged or extended without the signing secret.  Failures mirror what
//! an S3 provider reports: `NoSuchKey` on reads, a bare 404 (`NotFound`) on
//! head, and idempotent deletes.

use bytes::Bytes;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::backend::{Fault, ObjectStoreClient, ProviderError, ProviderFuture};

type HmacSha256 = Hmac<Sha256>;

/// Characters left unescaped in a key path segment.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Query parameter carrying the link expiry (unix seconds).
pub const EXPIRES_PARAM: &str = "X-Objectgate-Expires";
/// Query parameter carrying the hex HMAC signature.
pub const SIGNATURE_PARAM: &str = "X-Objectgate-Signature";

/// In-memory object store bound to one container.
pub struct MemoryObjectStore {
    /// Container name, embedded in minted links.
    container: String,
    /// key -> data.
    objects: tokio::sync::RwLock<BTreeMap<String, Bytes>>,
    /// Current total bytes stored.
    current_size: tokio::sync::RwLock<u64>,
    /// Maximum bytes allowed.  0 means unlimited.
    max_size_bytes: u64,
    /// Base URL for minted links, without trailing slash.
    public_url: String,
    /// HMAC key for minted links.
    signing_secret: Vec<u8>,
    /// Number of provider calls served.
    requests: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new(container: &str, public_url: &str, signing_secret: &str, max_size_bytes: u64) -> Self {
        Self {
            container: container.to_string(),
            objects: tokio::sync::RwLock::new(BTreeMap::new()),
            current_size: tokio::sync::RwLock::new(0),
            max_size_bytes,
            public_url: public_url.trim_end_matches('/').to_string(),
            signing_secret: signing_secret.as_bytes().to_vec(),
            requests: AtomicUsize::new(0),
        }
    }

    /// Container name embedded in minted links.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// How many provider calls this store has served.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn mac(&self) -> Result<HmacSha256, ProviderError> {
        HmacSha256::new_from_slice(&self.signing_secret)
            .map_err(|e| ProviderError::new("presign_get", Fault::Construction, e.to_string()))
    }

    /// Canonical string covered by a link signature.
    fn string_to_sign(&self, key: &str, expires_at: i64) -> String {
        format!("GET\n{}\n{}\n{}", self.container, key, expires_at)
    }

    /// Check a signature produced by [`Self::presign_get`] for `key`.
    ///
    /// Returns false once `now` has reached `expires_at`.
    pub fn verify_signature(
        &self,
        key: &str,
        expires_at: i64,
        signature_hex: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        if now.timestamp() >= expires_at {
            return false;
        }
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(self.string_to_sign(key, expires_at).as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    fn no_such_key(operation: &'static str, key: &str) -> ProviderError {
        ProviderError::service(
            operation,
            404,
            "NoSuchKey",
            format!("The specified key does not exist: {key}"),
        )
    }
}

impl ObjectStoreClient for MemoryObjectStore {
    fn put_object(&self, key: &str, data: Bytes) -> ProviderFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.count();
            let mut objects = self.objects.write().await;
            let mut size = self.current_size.write().await;

            let old_len = objects.get(&key).map(|d| d.len() as u64).unwrap_or(0);
            let new_total = size.saturating_sub(old_len) + data.len() as u64;
            if self.max_size_bytes > 0 && new_total > self.max_size_bytes {
                return Err(ProviderError::service(
                    "put_object",
                    507,
                    "InsufficientStorage",
                    format!(
                        "Memory limit exceeded: current={}, incoming={}, max={}",
                        *size,
                        data.len(),
                        self.max_size_bytes
                    ),
                ));
            }

            debug!("memory put_object: key={} bytes={}", key, data.len());
            objects.insert(key, data);
            *size = new_total;
            Ok(())
        })
    }

    fn list_keys(&self) -> ProviderFuture<'_, Vec<String>> {
        Box::pin(async move {
            self.count();
            let objects = self.objects.read().await;
            Ok(objects.keys().cloned().collect())
        })
    }

    fn get_object(&self, key: &str) -> ProviderFuture<'_, Bytes> {
        let key = key.to_string();
        Box::pin(async move {
            self.count();
            let objects = self.objects.read().await;
            objects
                .get(&key)
                .cloned()
                .ok_or_else(|| Self::no_such_key("get_object", &key))
        })
    }

    fn head_object(&self, key: &str) -> ProviderFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.count();
            let objects = self.objects.read().await;
            if objects.contains_key(&key) {
                Ok(())
            } else {
                // HEAD responses carry no body, hence only the generic code.
                Err(ProviderError::service("head_object", 404, "NotFound", "Not Found"))
            }
        })
    }

    fn delete_object(&self, key: &str) -> ProviderFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.count();
            let mut objects = self.objects.write().await;
            if let Some(old) = objects.remove(&key) {
                let mut size = self.current_size.write().await;
                *size = size.saturating_sub(old.len() as u64);
            }
            Ok(())
        })
    }

    fn presign_get(&self, key: &str, expires_in: Duration) -> ProviderFuture<'_, String> {
        let key = key.to_string();
        Box::pin(async move {
            self.count();
            let expires_in = chrono::Duration::from_std(expires_in).map_err(|e| {
                ProviderError::new("presign_get", Fault::Rejected, e.to_string())
            })?;
            let expires_at = chrono::Utc::now()
                .checked_add_signed(expires_in)
                .ok_or_else(|| {
                    ProviderError::new(
                        "presign_get",
                        Fault::Rejected,
                        "link expiry is past the latest representable date",
                    )
                })?
                .timestamp();

            let mut mac = self.mac()?;
            mac.update(self.string_to_sign(&key, expires_at).as_bytes());
            let signature = hex::encode(mac.finalize().into_bytes());

            Ok(format!(
                "{}/{}/{}?{}={}&{}={}",
                self.public_url,
                utf8_percent_encode(&self.container, KEY_ENCODE_SET),
                utf8_percent_encode(&key, KEY_ENCODE_SET),
                EXPIRES_PARAM,
                expires_at,
                SIGNATURE_PARAM,
                signature
            ))
        })
    }
}

// -- Tests -------------------------------------------------------------------
