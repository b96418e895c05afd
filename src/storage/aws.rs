//! AWS S3 object store.
//!
//! Binds one S3 bucket in one region with one credential set, as resolved
//! by [`AwsServiceConfigurator`].  Keys are passed through unchanged.
//!
//! SDK failures are converted into [`ProviderError`] with the S3 error code
//! preserved, so classification happens in one place
//! ([`crate::gateway::classify`]).

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use base64::Engine;
use bytes::Bytes;
use md5::{Digest, Md5};
use std::time::Duration;
use tracing::{debug, info};

use super::backend::{Fault, ObjectStoreClient, ProviderError, ProviderFuture};
use super::configurator::AwsServiceConfigurator;

/// Object store backed by a single S3 bucket.
pub struct AwsObjectStore {
    /// Long-lived client shared by every call.
    client: Client,
    /// Client configuration, kept to build per-call presigners.
    s3_config: aws_sdk_s3::Config,
    /// The bucket this store is bound to.
    bucket: String,
}

impl AwsObjectStore {
    /// Create a store for `bucket`.
    ///
    /// `endpoint_url` points at an S3-compatible endpoint (MinIO,
    /// LocalStack) instead of AWS; `use_path_style` forces path-style
    /// addressing, which such endpoints usually need.
    pub async fn new(
        bucket: String,
        configurator: &AwsServiceConfigurator,
        endpoint_url: Option<&str>,
        use_path_style: bool,
    ) -> Self {
        let sdk_config = configurator.load_sdk_config(endpoint_url).await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(use_path_style)
            .build();
        let client = Client::from_conf(s3_config.clone());

        info!(
            "AWS object store initialized: bucket={} region={} static_credentials={}",
            bucket,
            configurator.region(),
            configurator.credentials().is_some()
        );

        Self {
            client,
            s3_config,
            bucket,
        }
    }

    /// Base64 MD5 digest for the `Content-MD5` header.
    fn content_md5(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
    }
}

/// Convert an SDK failure into a [`ProviderError`].
fn sdk_error<E>(operation: &'static str, err: SdkError<E, HttpResponse>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let fault = match &err {
        SdkError::ConstructionFailure(_) => Fault::Construction,
        SdkError::TimeoutError(_) => Fault::Timeout,
        SdkError::DispatchFailure(_) => Fault::Dispatch,
        SdkError::ResponseError(_) => Fault::Response,
        SdkError::ServiceError(ctx) => Fault::Service {
            status: ctx.raw().status().as_u16(),
        },
        _ => Fault::Response,
    };

    // HEAD responses have no body, so a 404 arrives without a code.
    let code = match err.code() {
        Some(code) => Some(code.to_string()),
        None if matches!(fault, Fault::Service { status: 404 }) => Some("NotFound".to_string()),
        None => None,
    };

    ProviderError {
        operation,
        fault,
        code,
        message: DisplayErrorContext(&err).to_string(),
    }
}

impl ObjectStoreClient for AwsObjectStore {
    fn put_object(&self, key: &str, data: Bytes) -> ProviderFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let md5 = Self::content_md5(&data);

            debug!("AWS put_object: bucket={} key={}", self.bucket, key);

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_md5(md5)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(|e| sdk_error("put_object", e))?;

            Ok(())
        })
    }

    fn list_keys(&self) -> ProviderFuture<'_, Vec<String>> {
        Box::pin(async move {
            debug!("AWS list_objects_v2: bucket={}", self.bucket);

            let mut keys = Vec::new();
            let mut continuation_token: Option<String> = None;
            loop {
                let mut req = self.client.list_objects_v2().bucket(&self.bucket);
                if let Some(ref token) = continuation_token {
                    req = req.continuation_token(token);
                }

                let resp = req
                    .send()
                    .await
                    .map_err(|e| sdk_error("list_objects_v2", e))?;

                keys.extend(
                    resp.contents()
                        .iter()
                        .filter_map(|obj| obj.key().map(str::to_string)),
                );

                if resp.is_truncated() == Some(true) {
                    continuation_token = resp.next_continuation_token().map(|s| s.to_string());
                    if continuation_token.is_none() {
                        break;
                    }
                } else {
                    break;
                }
            }

            Ok(keys)
        })
    }

    fn get_object(&self, key: &str) -> ProviderFuture<'_, Bytes> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("AWS get_object: bucket={} key={}", self.bucket, key);

            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| sdk_error("get_object", e))?;

            let body = resp.body.collect().await.map_err(|e| {
                ProviderError::new("get_object", Fault::Body, DisplayErrorContext(&e).to_string())
            })?;

            Ok(body.into_bytes())
        })
    }

    fn head_object(&self, key: &str) -> ProviderFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("AWS head_object: bucket={} key={}", self.bucket, key);

            self.client
                .head_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| sdk_error("head_object", e))?;

            Ok(())
        })
    }

    fn delete_object(&self, key: &str) -> ProviderFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("AWS delete_object: bucket={} key={}", self.bucket, key);

            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| sdk_error("delete_object", e))?;

            Ok(())
        })
    }

    fn presign_get(&self, key: &str, expires_in: Duration) -> ProviderFuture<'_, String> {
        let key = key.to_string();
        Box::pin(async move {
            let presigning = PresigningConfig::expires_in(expires_in).map_err(|e| {
                ProviderError::new("presign_get", Fault::Rejected, DisplayErrorContext(&e).to_string())
            })?;

            debug!(
                "AWS presign get_object: bucket={} key={} expires_in={}s",
                self.bucket,
                key,
                expires_in.as_secs()
            );

            // Scoped to this call: the signer and whatever credential
            // resources it resolves are dropped before returning.
            let signer = Client::from_conf(self.s3_config.clone());
            let request = signer
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .presigned(presigning)
                .await
                .map_err(|e| sdk_error("presign_get", e))?;

            Ok(request.uri().to_string())
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::get_object::GetObjectError;
    use aws_sdk_s3::operation::head_object::HeadObjectError;
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;

    fn raw(status: u16) -> HttpResponse {
        HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty())
    }

    async fn test_store() -> AwsObjectStore {
        let configurator = AwsServiceConfigurator::builder()
            .region("eu-west-3")
            .credentials("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY")
            .build();
        AwsObjectStore::new(
            "test-bucket".to_string(),
            &configurator,
            Some("http://localhost:9000"),
            true,
        )
        .await
    }

    #[test]
    fn test_content_md5_empty() {
        assert_eq!(AwsObjectStore::content_md5(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn test_content_md5_hello() {
        assert_eq!(
            AwsObjectStore::content_md5(b"hello world"),
            "XrY7u+Ae7tCTyyK7j1rNww=="
        );
    }

    #[test]
    fn test_sdk_error_service_code_preserved() {
        let err: SdkError<GetObjectError, HttpResponse> = SdkError::service_error(
            GetObjectError::generic(
                ErrorMetadata::builder()
                    .code("NoSuchKey")
                    .message("The specified key does not exist.")
                    .build(),
            ),
            raw(404),
        );
        let converted = sdk_error("get_object", err);
        assert_eq!(converted.fault, Fault::Service { status: 404 });
        assert_eq!(converted.code(), Some("NoSuchKey"));
        assert_eq!(converted.operation, "get_object");
    }

    #[test]
    fn test_sdk_error_bare_404_becomes_not_found() {
        let err: SdkError<HeadObjectError, HttpResponse> = SdkError::service_error(
            HeadObjectError::generic(ErrorMetadata::builder().build()),
            raw(404),
        );
        assert_eq!(sdk_error("head_object", err).code(), Some("NotFound"));
    }

    #[test]
    fn test_sdk_error_bare_500_has_no_code() {
        let err: SdkError<HeadObjectError, HttpResponse> = SdkError::service_error(
            HeadObjectError::generic(ErrorMetadata::builder().build()),
            raw(500),
        );
        let converted = sdk_error("head_object", err);
        assert_eq!(converted.fault, Fault::Service { status: 500 });
        assert!(converted.code().is_none());
    }

    #[test]
    fn test_sdk_error_timeout() {
        let err: SdkError<GetObjectError, HttpResponse> = SdkError::timeout_error("too slow");
        assert_eq!(sdk_error("get_object", err).fault, Fault::Timeout);
    }

    #[test]
    fn test_sdk_error_construction_failure() {
        let err: SdkError<GetObjectError, HttpResponse> =
            SdkError::construction_failure("bad endpoint");
        assert_eq!(sdk_error("get_object", err).fault, Fault::Construction);
    }

    #[tokio::test]
    async fn test_presign_get_url() {
        let store = test_store().await;
        let url = store
            .presign_get("report.pdf", Duration::from_secs(600))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/test-bucket/report.pdf?"), "{url}");
        assert!(url.contains("X-Amz-Expires=600"), "{url}");
        assert!(url.contains("X-Amz-Signature="), "{url}");
        assert!(url.contains("AKIDEXAMPLE"), "{url}");
    }

    #[tokio::test]
    async fn test_presign_beyond_a_week_is_rejected() {
        let store = test_store().await;
        let err = store
            .presign_get("report.pdf", Duration::from_secs(8 * 24 * 3600))
            .await
            .unwrap_err();
        assert_eq!(err.fault, Fault::Rejected);
    }
}
