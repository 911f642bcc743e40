//! # KohakuHub Server
//!
//! The main entry point for running a KohakuHub instance.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use kohakuhub_server::config::NodeConfig;
use kohakuhub_server::health::{health_routes, HealthState};
use kohakuhub_server::observability::{init_logging, metrics_handler, LogFormat};
use kohakuhub_server::validation::body_size_limit_middleware;

/// KohakuHub server - a self-hostable ML-artifact hub.
#[derive(Parser, Debug)]
#[command(name = "kohakuhub-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// API listen address override.
    #[arg(long)]
    api_addr: Option<SocketAddr>,

    /// Log level override.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if args.config.exists() {
        NodeConfig::from_file(&args.config).context("loading configuration file")?
    } else {
        NodeConfig::from_env().context("loading configuration from environment")?
    };
    if let Some(addr) = args.api_addr {
        config.api.addr = addr;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate_config().context("validating configuration")?;

    init_logging(&config.logging.level, LogFormat::parse(&config.logging.format) == LogFormat::Json);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting KohakuHub server");

    let health_state = HealthState::new();

    let db = kohakuhub_db::Db::connect(
        config.database.url.as_deref().expect("validated above"),
        config.database.max_connections,
    )
    .await
    .context("connecting to database")?;
    health_state.set_database_healthy(true);

    let blobstore: Arc<dyn kohakuhub_blobstore::BlobStore> = build_blobstore(&config.storage).await?;
    health_state.set_blobstore_healthy(true);

    let vstore: Arc<dyn kohakuhub_vstore::VersionedStore> = build_vstore(&config.vstore);

    let mut hub_config = config.hub.to_hub_config();
    hub_config.base_url = config.api.base_url.clone();

    spawn_quota_recompute_job(db.clone());

    let state = kohakuhub_api::AppState::new(db, vstore, blobstore, hub_config);
    let api_router = kohakuhub_api::create_router(state)
        .layer(axum::middleware::from_fn(body_size_limit_middleware));

    health_state.set_startup_complete(true);
    health_state.set_ready(true);

    let api_addr = config.api.addr;
    let api_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(api_addr).await.expect("bind API address");
        tracing::info!(addr = %api_addr, "API server listening");
        axum::serve(listener, api_router).await.expect("API server crashed");
    });

    let metrics_addr = config.metrics.addr;
    let metrics_enabled = config.metrics.enabled;
    let metrics_handle = tokio::spawn(async move {
        if !metrics_enabled {
            return;
        }
        let app = axum::Router::new()
            .route("/metrics", axum::routing::get(metrics_handler))
            .merge(health_routes(health_state));
        let listener = match tokio::net::TcpListener::bind(metrics_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, addr = %metrics_addr, "failed to bind metrics address");
                return;
            }
        };
        tracing::info!(addr = %metrics_addr, "Metrics/health server listening");
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server crashed");
        }
    });

    tracing::info!("KohakuHub server running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    api_handle.abort();
    metrics_handle.abort();

    Ok(())
}

/// Builds the S3-compatible blob store from `storage` settings.
async fn build_blobstore(
    storage: &kohakuhub_server::config::StorageConfig,
) -> Result<Arc<dyn kohakuhub_blobstore::BlobStore>> {
    let endpoint = storage.endpoint.clone().expect("validated above");

    let loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(aws_sdk_s3::config::Region::new(
            storage.region.clone(),
        ));
    let shared_config = loader.load().await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
    if let (Some(access), Some(secret)) = (&storage.access_key, &storage.secret_key) {
        let credentials = aws_sdk_s3::config::Credentials::new(access, secret, None, None, "kohakuhub-server");
        builder = builder.credentials_provider(credentials);
    }
    builder = builder.endpoint_url(endpoint).force_path_style(true);

    let client = aws_sdk_s3::Client::from_conf(builder.build());

    Ok(Arc::new(kohakuhub_blobstore::S3BlobStore::new(
        client,
        storage.bucket.clone(),
        storage.public_endpoint.clone(),
    )))
}

/// Periodically recomputes every repository's `used_bytes` from its
/// live `files` rows, correcting drift the additive fast path
/// (`adjust_repository_usage`) accumulates between commits (spec §5,
/// `DESIGN.md`'s quota staleness decision).
fn spawn_quota_recompute_job(db: kohakuhub_db::Db) {
    const INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(INTERVAL);
        loop {
            interval.tick().await;
            let ids = match db.all_repository_ids().await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(error = %e, "quota recompute: failed to list repositories");
                    continue;
                }
            };
            for id in ids {
                if let Err(e) = db.recompute_used_bytes(id).await {
                    tracing::warn!(repo_id = id, error = %e, "quota recompute: failed for repository");
                }
            }
            tracing::debug!("quota recompute sweep complete");
        }
    });
}

/// Builds the versioned-store bridge. No HTTP-backed implementation of
/// [`kohakuhub_vstore::VersionedStore`] exists yet (see `DESIGN.md`); an
/// operator-configured `vstore.endpoint` is accepted but currently
/// ignored in favor of the in-process store, which is durable only for
/// the lifetime of this process.
fn build_vstore(vstore: &kohakuhub_server::config::VstoreConfig) -> Arc<dyn kohakuhub_vstore::VersionedStore> {
    if let Some(endpoint) = &vstore.endpoint {
        tracing::warn!(
            endpoint = %endpoint,
            "vstore.endpoint is configured but no HTTP-backed VersionedStore is implemented yet; \
             falling back to the in-process store"
        );
    }
    Arc::new(kohakuhub_vstore::MemoryVersionedStore::new())
}
