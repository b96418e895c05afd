//! Configuration loading and types for objectgate.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Every section has defaults, so an empty file (or a
//! missing section) yields a runnable configuration.  A few environment
//! variables override file values; see [`apply_overrides`].

use garde::Validate;
use serde::Deserialize;
use std::path::Path;

/// Bucket the gateway is bound to unless configured otherwise.
pub const DEFAULT_CONTAINER: &str = "amt.team08.diduno.education";

/// Overrides `container.name`.
pub const ENV_CONTAINER: &str = "OBJECTGATE_CONTAINER";
/// Overrides the bind address (`host:port`).
pub const ENV_BIND: &str = "OBJECTGATE_BIND";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    #[garde(dive)]
    pub server: ServerConfig,

    /// The bound container.
    #[serde(default)]
    #[garde(dive)]
    pub container: ContainerConfig,

    /// Object store provider settings.
    #[serde(default)]
    #[garde(dive)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    #[garde(dive)]
    pub logging: LoggingConfig,

    /// Observability settings (metrics + health probe).
    #[serde(default)]
    #[garde(skip)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    #[garde(length(min = 1))]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    #[garde(range(min = 1))]
    pub port: u16,

    /// Maximum accepted request body in bytes (uploads).
    #[serde(default = "default_max_upload_size")]
    #[garde(range(min = 1))]
    pub max_upload_size: usize,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    #[serde(default = "default_shutdown_timeout")]
    #[garde(skip)]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_size: default_max_upload_size(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// `host:port` to listen on.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The single container this gateway serves.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContainerConfig {
    /// Bucket name.
    #[serde(default = "default_container")]
    #[garde(length(min = 3, max = 63))]
    pub name: String,

    /// Provider region of the bucket.
    #[serde(default = "default_region")]
    #[garde(length(min = 1))]
    pub region: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: default_container(),
            region: default_region(),
        }
    }
}

/// Object store provider configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StorageConfig {
    /// Provider: `aws` or `memory`.
    #[serde(default = "default_storage_backend")]
    #[garde(pattern(r"^(aws|memory)$"))]
    pub backend: String,

    /// AWS S3 settings.
    #[serde(default)]
    #[garde(skip)]
    pub aws: AwsStorageConfig,

    /// In-memory store settings.
    #[serde(default)]
    #[garde(dive)]
    pub memory: MemoryStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            aws: AwsStorageConfig::default(),
            memory: MemoryStorageConfig::default(),
        }
    }
}

/// AWS S3 provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsStorageConfig {
    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: String,
    /// Force path-style URL addressing.
    #[serde(default)]
    pub use_path_style: bool,
    /// Explicit access key (falls back to env/credential chain).
    #[serde(default)]
    pub access_key_id: String,
    /// Explicit secret key (falls back to env/credential chain).
    #[serde(default)]
    pub secret_access_key: String,
    /// Let `AWS_*` environment variables override the values above.
    #[serde(default = "default_true")]
    pub use_environment: bool,
}

impl Default for AwsStorageConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            use_path_style: false,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            use_environment: true,
        }
    }
}

/// In-memory provider configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MemoryStorageConfig {
    /// Maximum total size in bytes (0 = unlimited).
    #[serde(default)]
    #[garde(skip)]
    pub max_size_bytes: u64,
    /// Base URL placed in minted download links.  The default points at
    /// this server's own `/links` route.
    #[serde(default = "default_public_url")]
    #[garde(length(min = 1))]
    pub public_url: String,
    /// HMAC key for minted download links.
    #[serde(default = "default_signing_secret")]
    #[garde(length(min = 8))]
    pub signing_secret: String,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 0,
            public_url: default_public_url(),
            signing_secret: default_signing_secret(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    #[garde(pattern(r"^(trace|debug|info|warn|error)$"))]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    #[garde(pattern(r"^(text|json)$"))]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.  Both are enabled by default.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and the `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,

    /// Enable the `/health` probe.
    #[serde(default = "default_true")]
    pub health_check: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics: true,
            health_check: true,
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_size() -> usize {
    100 * 1024 * 1024 // 100 MiB
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_region() -> String {
    "eu-west-3".to_string()
}

fn default_storage_backend() -> String {
    "aws".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8080/links".to_string()
}

fn default_signing_secret() -> String {
    "objectgate-dev-secret".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Parse and validate configuration from YAML text.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    // An empty document deserializes to unit, not to an empty map.
    let config: Config = if contents.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(contents)?
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

/// Load and validate configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    parse_config(&contents)
}

/// Apply `OBJECTGATE_CONTAINER` / `OBJECTGATE_BIND` overrides.
///
/// `lookup` is `std::env::var` in production.  Returns the bind address
/// override, if any; the container override is written into `config`.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> anyhow::Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = lookup(ENV_CONTAINER).filter(|s| !s.is_empty()) {
        config.container.name = name;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid {ENV_CONTAINER}: {e}"))?;
    }
    Ok(lookup(ENV_BIND).filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.container.name, DEFAULT_CONTAINER);
        assert_eq!(config.container.region, "eu-west-3");
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.server.shutdown_timeout, 30);
        assert_eq!(config.storage.backend, "aws");
        assert!(config.storage.aws.use_environment);
        assert!(config.observability.metrics);
    }

    #[test]
    fn test_partial_config() {
        let yaml = r#"
server:
  port: 9100
container:
  name: my-bucket
storage:
  backend: memory
  memory:
    max_size_bytes: 1024
logging:
  format: json
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.container.name, "my-bucket");
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.storage.memory.max_size_bytes, 1024);
        assert_eq!(config.storage.memory.public_url, "http://localhost:8080/links");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_aws_section() {
        let yaml = r#"
storage:
  aws:
    endpoint_url: http://localhost:9000
    use_path_style: true
    access_key_id: minio
    secret_access_key: minio123
    use_environment: false
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.storage.aws.endpoint_url, "http://localhost:9000");
        assert!(config.storage.aws.use_path_style);
        assert!(!config.storage.aws.use_environment);
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(parse_config("storage:\n  backend: gcp\n").is_err());
    }

    #[test]
    fn test_rejects_port_zero() {
        assert!(parse_config("server:\n  port: 0\n").is_err());
    }

    #[test]
    fn test_rejects_short_container_name() {
        assert!(parse_config("container:\n  name: ab\n").is_err());
    }

    #[test]
    fn test_rejects_bad_log_format() {
        assert!(parse_config("logging:\n  format: xml\n").is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let bind = apply_overrides(&mut config, |name| match name {
            ENV_CONTAINER => Some("other-bucket".to_string()),
            ENV_BIND => Some("127.0.0.1:9999".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.container.name, "other-bucket");
        assert_eq!(bind.as_deref(), Some("127.0.0.1:9999"));
    }

    #[test]
    fn test_overrides_absent() {
        let mut config = Config::default();
        let bind = apply_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config.container.name, DEFAULT_CONTAINER);
        assert!(bind.is_none());
    }

    #[test]
    fn test_invalid_container_override() {
        let mut config = Config::default();
        assert!(apply_overrides(&mut config, |name| {
            (name == ENV_CONTAINER).then(|| "x".to_string())
        })
        .is_err());
    }
}
