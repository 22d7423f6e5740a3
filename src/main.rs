//! Image Filter Server
//!
//! A Rust-based server that:
//! - Downloads an image from a caller-supplied URL
//! - Resizes it to 256x256, converts it to greyscale and encodes a JPEG
//! - Streams the result back and deletes the temporary file afterwards
//! - Shuts down gracefully on SIGTERM/SIGINT

mod cleanup;
mod config;
mod image_proc;
mod web;

#[cfg(test)]
mod test_support;

use clap::Parser;
use config::Config;
use image_proc::{ImageFetcher, ImageProcessor, ImageTransformer, TransformOptions};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "image-filter-server")]
#[command(about = "Fetch an image by URL and return a 256x256 greyscale JPEG")]
#[command(version)]
struct Args {
    /// Optional JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port (overrides config, default: 8082)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Directory for filtered images in flight (overrides config)
    #[arg(long = "tmp-dir")]
    tmp_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose);

    tracing::info!("Starting Image Filter Server");

    let config = load_config(&args)?;
    config.ensure_tmp_dir()?;
    tracing::info!("Filtered images staged in {}", config.tmp_dir.display());

    let fetcher = ImageFetcher::new(config.fetch_timeout(), config.max_download_bytes)?;
    let transformer = ImageTransformer::new(&config.tmp_dir, TransformOptions::default());
    let web_server = web::WebServer::new(ImageProcessor::new(fetcher, transformer));

    // Setup shutdown signal handling
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let port = config.port;
    let web_shutdown = shutdown_tx.subscribe();
    let mut web_handle = tokio::spawn(async move {
        if let Err(e) = web_server.run_with_shutdown(port, web_shutdown).await {
            tracing::error!("Web server error: {}", e);
        }
    });

    tokio::select! {
        _ = wait_for_shutdown() => {
            tracing::info!("Shutdown signal received");
        }
        _ = &mut web_handle => {
            // Server exited on its own (e.g. port already in use)
            anyhow::bail!("Web server stopped unexpectedly");
        }
    }

    // Send shutdown to all tasks
    let _ = shutdown_tx.send(());

    // Wait for in-flight responses with timeout
    tokio::select! {
        _ = web_handle => {},
        _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
            tracing::warn!("Web server shutdown timeout");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Layer configuration: defaults, then the optional file, then CLI/env
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", path.display(), e))?,
        None => Config::default(),
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(tmp_dir) = &args.tmp_dir {
        config.tmp_dir = tmp_dir.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Initialize tracing/logging
///
/// Default level is "info"; `--verbose` switches to "debug".
/// `RUST_LOG` takes precedence over both.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("image_filter_server={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        _ => {
            tracing::warn!("Failed to install signal handlers, falling back to Ctrl-C");
            wait_for_ctrl_c(tokio::signal::ctrl_c()).await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}

/// Resolve once `ctrl_c` reports a Ctrl-C; never resolve if it fails
///
/// Without any signal source, only an external kill stops the server.
async fn wait_for_ctrl_c<F>(ctrl_c: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match ctrl_c.await {
        Ok(()) => tracing::info!("Received Ctrl-C"),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn ctrl_c_listener_failure_does_not_trigger_shutdown() {
        let failing = async { Err(std::io::Error::other("no signal support")) };
        let waited = tokio::time::timeout(Duration::from_millis(100), wait_for_ctrl_c(failing)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn ctrl_c_triggers_shutdown() {
        let received = async { Ok(()) };
        let waited = tokio::time::timeout(Duration::from_millis(100), wait_for_ctrl_c(received)).await;
        assert!(waited.is_ok());
    }

    #[test]
    fn cli_overrides_defaults() {
        let args = Args::parse_from(["image-filter-server", "--port", "9100", "--tmp-dir", "/var/tmp/x"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.tmp_dir, PathBuf::from("/var/tmp/x"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = Args::parse_from(["image-filter-server", "--config", "/nonexistent/config.json"]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn zero_port_is_rejected() {
        let args = Args::parse_from(["image-filter-server", "--port", "0"]);
        assert!(load_config(&args).is_err());
    }
}
