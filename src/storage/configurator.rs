//! Region and credential resolution for the AWS provider.
//!
//! [`AwsServiceConfigurator`] is built from explicit settings (usually the
//! YAML config) and, when asked, the standard AWS environment variables.
//! Environment values take precedence over explicit ones.  When no static
//! credentials end up configured, the SDK default credential chain
//! (profile files, IMDS, SSO, ...) is used instead.

use aws_config::Region;
use aws_sdk_s3::config::Credentials;

use crate::config::AwsStorageConfig;
use crate::gateway::Container;

/// Credential provider name reported to the SDK for static credentials.
const PROVIDER_NAME: &str = "objectgate-config";

/// Resolved region and optional static credentials.
#[derive(Debug, Clone)]
pub struct AwsServiceConfigurator {
    region: Region,
    credentials: Option<Credentials>,
}

impl AwsServiceConfigurator {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Resolve from the `storage.aws` section and the configured container
    /// region.  When `use_environment` is set, `lookup` (`std::env::var` in
    /// production) overlays the `AWS_*` variables.
    pub fn from_config<F>(aws: &AwsStorageConfig, region: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let builder = Self::builder()
            .region(region)
            .credentials(aws.access_key_id.as_str(), aws.secret_access_key.as_str());
        if aws.use_environment {
            builder.with_lookup(lookup).build()
        } else {
            builder.build()
        }
    }

    /// The container binding for bucket `name` in the resolved region.
    pub fn container(&self, name: impl Into<String>) -> Container {
        Container::new(name, self.region.as_ref())
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Static credentials, if any were supplied.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Load an SDK config for this region/credential set.
    pub async fn load_sdk_config(&self, endpoint_url: Option<&str>) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(self.region.clone());

        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(creds) = &self.credentials {
            loader = loader.credentials_provider(creds.clone());
        }

        loader.load().await
    }
}

/// Builder for [`AwsServiceConfigurator`].
#[derive(Debug, Default)]
pub struct Builder {
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
}

impl Builder {
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = non_empty(region.into());
        self
    }

    pub fn credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = non_empty(access_key_id.into());
        self.secret_access_key = non_empty(secret_access_key.into());
        self
    }

    /// Overlay `AWS_REGION` / `AWS_DEFAULT_REGION`, `AWS_ACCESS_KEY_ID`,
    /// `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN` from the process
    /// environment.
    pub fn with_environment_variables(self) -> Self {
        self.with_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::with_environment_variables`] with a custom lookup.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_empty);

        if let Some(region) = get("AWS_REGION").or_else(|| get("AWS_DEFAULT_REGION")) {
            self.region = Some(region);
        }
        if let Some(ak) = get("AWS_ACCESS_KEY_ID") {
            self.access_key_id = Some(ak);
        }
        if let Some(sk) = get("AWS_SECRET_ACCESS_KEY") {
            self.secret_access_key = Some(sk);
        }
        if let Some(token) = get("AWS_SESSION_TOKEN") {
            self.session_token = Some(token);
        }
        self
    }

    /// Finish.  Without a region, `us-east-1` is assumed.  Credentials are
    /// only set when both the key id and the secret are present.
    pub fn build(self) -> AwsServiceConfigurator {
        let region = Region::new(self.region.unwrap_or_else(|| "us-east-1".to_string()));
        let credentials = match (self.access_key_id, self.secret_access_key) {
            (Some(ak), Some(sk)) => Some(Credentials::new(
                ak,
                sk,
                self.session_token,
                None,
                PROVIDER_NAME,
            )),
            _ => None,
        };
        AwsServiceConfigurator {
            region,
            credentials,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = AwsServiceConfigurator::builder().build();
        assert_eq!(cfg.region().as_ref(), "us-east-1");
        assert!(cfg.credentials().is_none());
    }

    #[test]
    fn test_explicit_values() {
        let cfg = AwsServiceConfigurator::builder()
            .region("eu-west-3")
            .credentials("AKIDEXAMPLE", "secret")
            .build();
        assert_eq!(cfg.region().as_ref(), "eu-west-3");
        let creds = cfg.credentials().unwrap();
        assert_eq!(creds.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(creds.secret_access_key(), "secret");
        assert!(creds.session_token().is_none());
    }

    #[test]
    fn test_environment_overrides_explicit() {
        let cfg = AwsServiceConfigurator::builder()
            .region("eu-west-3")
            .credentials("FROMCONFIG", "config-secret")
            .with_lookup(lookup(&[
                ("AWS_REGION", "us-west-2"),
                ("AWS_ACCESS_KEY_ID", "FROMENV"),
                ("AWS_SECRET_ACCESS_KEY", "env-secret"),
                ("AWS_SESSION_TOKEN", "token"),
            ]))
            .build();
        assert_eq!(cfg.region().as_ref(), "us-west-2");
        let creds = cfg.credentials().unwrap();
        assert_eq!(creds.access_key_id(), "FROMENV");
        assert_eq!(creds.session_token(), Some("token"));
    }

    fn aws_section(use_environment: bool) -> AwsStorageConfig {
        AwsStorageConfig {
            access_key_id: "FROMCONFIG".to_string(),
            secret_access_key: "config-secret".to_string(),
            use_environment,
            ..AwsStorageConfig::default()
        }
    }

    #[test]
    fn test_environment_region_flows_into_container() {
        let cfg = AwsServiceConfigurator::from_config(
            &aws_section(true),
            "eu-west-3",
            lookup(&[("AWS_REGION", "us-west-2")]),
        );
        let container = cfg.container("photos-bucket");
        assert_eq!(container.name, "photos-bucket");
        assert_eq!(container.region, "us-west-2");
        assert_eq!(container.region, cfg.region().as_ref());
    }

    #[test]
    fn test_from_config_without_environment() {
        let cfg = AwsServiceConfigurator::from_config(
            &aws_section(false),
            "eu-west-3",
            lookup(&[("AWS_REGION", "us-west-2"), ("AWS_ACCESS_KEY_ID", "FROMENV")]),
        );
        assert_eq!(cfg.container("b").region, "eu-west-3");
        assert_eq!(cfg.credentials().unwrap().access_key_id(), "FROMCONFIG");
    }

    #[test]
    fn test_default_region_variable() {
        let cfg = AwsServiceConfigurator::builder()
            .with_lookup(lookup(&[("AWS_DEFAULT_REGION", "ap-south-1")]))
            .build();
        assert_eq!(cfg.region().as_ref(), "ap-south-1");
    }

    #[test]
    fn test_half_credentials_are_ignored() {
        let cfg = AwsServiceConfigurator::builder()
            .with_lookup(lookup(&[("AWS_ACCESS_KEY_ID", "ONLYKEY")]))
            .build();
        assert!(cfg.credentials().is_none());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let cfg = AwsServiceConfigurator::builder()
            .region("")
            .credentials("", "")
            .with_lookup(lookup(&[("AWS_REGION", "")]))
            .build();
        assert_eq!(cfg.region().as_ref(), "us-east-1");
        assert!(cfg.credentials().is_none());
    }
}
