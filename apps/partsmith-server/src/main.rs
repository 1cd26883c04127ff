//! Partsmith Server - multipart upload broker for direct-to-S3 uploads.
//!
//! Serves the multipart upload protocol under a mount path and forwards each
//! step to S3 (or an S3-compatible endpoint). Clients upload part bytes
//! straight to the pre-signed URLs this server hands out.
//!
//! # Usage
//!
//! ```text
//! BUCKET=uploads GATEWAY_LISTEN=0.0.0.0:4580 partsmith-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:4580` | Bind address |
//! | `MOUNT_PATH` | `/s3/multipart` | Path prefix of the upload routes |
//! | `BUCKET` | *(required)* | Target bucket |
//! | `KEY_PREFIX` | *(unset)* | Prefix for generated object keys |
//! | `PUBLIC` | `false` | Create public-read objects, return unsigned URLs |
//! | `DEFAULT_REGION` | `us-east-1` | Bucket region |
//! | `S3_ENDPOINT_URL` | *(unset)* | S3-compatible endpoint |
//! | `S3_FORCE_PATH_STYLE` | `false` | Path-style addressing |
//! | `PRESIGN_EXPIRES_SECS` | `900` | Pre-signed URL validity |
//! | `BACKEND_TIMEOUT_SECS` | `10` | Per-attempt S3 timeout |
//! | `OPERATION_OPTIONS` | *(unset)* | JSON object of static per-operation options |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use partsmith_core::BrokerConfig;
use partsmith_http::{
    HandlerConfig, MultipartHandler, MultipartService, OperationOverrides, ServiceConfig,
};
use partsmith_storage::S3StorageClient;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Listen address used by `--health-check` when `GATEWAY_LISTEN` is unset.
const DEFAULT_LISTEN: &str = "0.0.0.0:4580";

/// Mount path used by `--health-check` when `MOUNT_PATH` is unset.
const DEFAULT_MOUNT: &str = "/s3/multipart";

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the [`HandlerConfig`] from the broker configuration.
fn build_handler_config(config: &BrokerConfig) -> Result<HandlerConfig> {
    let overrides = match &config.operation_options {
        Some(value) => {
            OperationOverrides::from_json(value).context("invalid OPERATION_OPTIONS")?
        }
        None => OperationOverrides::new(),
    };

    Ok(HandlerConfig {
        prefix: config.key_prefix.clone(),
        public: config.public,
        upload_options: partsmith_storage::OperationOptions::default(),
        overrides,
    })
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: MultipartService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// The request line and the marker a healthy reply contains.
///
/// `/health` lives outside the mount, so a root mount is checked with a
/// preflight instead, which the service answers without backend work.
fn health_request(mount_path: &str) -> (&'static str, &'static str) {
    if mount_path.trim_matches('/').is_empty() {
        ("OPTIONS / HTTP/1.1", "204 No Content")
    } else {
        ("GET /health HTTP/1.1", "\"status\":\"running\"")
    }
}

/// Perform a health check by connecting to the server and sending the health request.
async fn run_health_check(addr: &str, mount_path: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let (request_line, marker) = health_request(mount_path);
    let request = format!("{request_line}\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains(marker) {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK. Needs no bucket.
    if std::env::args().any(|a| a == "--health-check") {
        let listen = std::env::var("GATEWAY_LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN.to_owned());
        let mount_path = std::env::var("MOUNT_PATH").unwrap_or_else(|_| DEFAULT_MOUNT.to_owned());
        let addr = listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr, &mount_path).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = BrokerConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        mount_path = %config.mount_path,
        bucket = %config.bucket,
        region = %config.default_region,
        public = config.public,
        version = VERSION,
        "starting Partsmith Server",
    );

    let storage = S3StorageClient::from_config(&config).await;
    let handler = MultipartHandler::new(Arc::new(storage), build_handler_config(&config)?);
    let service = MultipartService::new(handler, ServiceConfig::from_broker_config(&config));

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
