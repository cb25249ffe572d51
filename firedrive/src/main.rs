use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use aws_config::BehaviorVersion;
use clap::{Parser, ValueEnum};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use firedrive_core::drive::{DriveConfig, TeamDrive};
use firedrive_core::storage::memory::MemoryBlobStore;
use firedrive_core::storage::s3::S3BlobStore;
use firedrive_core::storage::BlobStore;

use firedrive::api;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// In-process store; contents vanish on restart. For local development.
    Memory,
    /// S3-compatible object storage.
    S3,
}

#[derive(Parser, Debug)]
#[command(name = "firedrive", about = "Team-scoped file storage service")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: String,

    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    /// Bucket name; required with the s3 backend.
    #[arg(long)]
    bucket: Option<String>,

    /// Sleep before the post-write re-list, to paper over propagation lag.
    #[arg(long, default_value_t = 2000)]
    propagation_delay_ms: u64,

    /// Upper bound on any single storage call.
    #[arg(long, default_value_t = 30_000)]
    call_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let store: Arc<dyn BlobStore> = match args.backend {
        Backend::Memory => Arc::new(MemoryBlobStore::new()),
        Backend::S3 => {
            let bucket = args
                .bucket
                .context("--bucket is required with the s3 backend")?;
            let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
            Arc::new(S3BlobStore::new(
                aws_sdk_s3::Client::new(&sdk_config),
                bucket,
            ))
        }
    };

    let config = DriveConfig {
        call_timeout: Duration::from_millis(args.call_timeout_ms),
        propagation_delay: Duration::from_millis(args.propagation_delay_ms),
    };
    let drive = Arc::new(TeamDrive::new(store, config));

    let app = api::router(drive)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(&args.listen).await?;
    tracing::info!(listen = %args.listen, backend = ?args.backend, "firedrive listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
