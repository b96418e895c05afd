//! objectgate -- HTTP gateway over a single object-store container.
//!
//! SIGTERM/SIGINT stop accepting connections and wait up to
//! `server.shutdown_timeout` seconds for in-flight requests.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use objectgate::config::{Config, LoggingConfig};
use objectgate::gateway::{Container, DataObjectGateway};
use objectgate::storage::aws::AwsObjectStore;
use objectgate::storage::backend::ObjectStoreClient;
use objectgate::storage::configurator::AwsServiceConfigurator;
use objectgate::storage::memory::MemoryObjectStore;

/// Command-line arguments for the objectgate server.
#[derive(Parser, Debug)]
#[command(
    name = "objectgate",
    version,
    about = "HTTP gateway exposing CRUD access to a single object-store bucket"
)]
struct Cli {
    /// Path to the YAML configuration file.  Defaults apply when absent.
    #[arg(short, long, default_value = "objectgate.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if std::path::Path::new(&cli.config).exists() {
        objectgate::config::load_config(&cli.config)?
    } else {
        Config::default()
    };
    let env_bind = objectgate::config::apply_overrides(&mut config, |name| {
        std::env::var(name).ok()
    })?;

    init_tracing(&config.logging);
    info!("Configuration loaded from {}", cli.config);

    let bind_addr = cli
        .bind
        .or(env_bind)
        .unwrap_or_else(|| config.server.bind_addr());

    if config.observability.metrics {
        objectgate::metrics::init_metrics();
        objectgate::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    // Initialize the object store provider based on config.  The container
    // binding takes the region the provider actually resolved.
    let mut link_store = None;
    let (container, store): (Container, Arc<dyn ObjectStoreClient>) =
        match config.storage.backend.as_str() {
            "memory" => {
                let container = Container::new(
                    config.container.name.clone(),
                    config.container.region.clone(),
                );
                let memory = &config.storage.memory;
                let store = Arc::new(MemoryObjectStore::new(
                    &container.name,
                    &memory.public_url,
                    &memory.signing_secret,
                    memory.max_size_bytes,
                ));
                info!(
                    "Memory object store initialized: container={} max_size_bytes={}",
                    container.name, memory.max_size_bytes
                );
                link_store = Some(store.clone());
                (container, store)
            }
            _ => {
                let aws = &config.storage.aws;
                let configurator = AwsServiceConfigurator::from_config(
                    aws,
                    &config.container.region,
                    |name| std::env::var(name).ok(),
                );
                let container = configurator.container(config.container.name.clone());
                if container.region != config.container.region {
                    info!(
                        "Region {} from the environment overrides configured {}",
                        container.region, config.container.region
                    );
                }

                let endpoint = Some(aws.endpoint_url.as_str()).filter(|s| !s.is_empty());
                let store = AwsObjectStore::new(
                    container.name.clone(),
                    &configurator,
                    endpoint,
                    aws.use_path_style,
                )
                .await;
                (container, Arc::new(store))
            }
        };

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let state = Arc::new(objectgate::AppState {
        config,
        gateway: DataObjectGateway::new(container, store),
        link_store,
    });

    let app = objectgate::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("objectgate listening on {}", bind_addr);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::pin!(server);

    // Once a signal arrives, give in-flight requests a bounded grace period.
    tokio::select! {
        result = &mut server => result?,
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                "In-flight requests still running after {}s, exiting",
                shutdown_timeout.as_secs()
            );
        }
    }

    // The gateway and its provider client are dropped here.
    info!("objectgate shut down");

    Ok(())
}

/// Install the global tracing subscriber.  `RUST_LOG` wins over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
