//! Web server module.
//!
//! Provides the HTTP server using Axum for the image filter endpoint.

pub mod body;
pub mod routes;

use crate::image_proc::ImageProcessor;
use axum::{routing::get, Router};
use routes::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),

    #[error("Server error: {0}")]
    ServerError(String),
}

/// Web server
pub struct WebServer {
    processor: Arc<ImageProcessor>,
}

impl WebServer {
    /// Create a new web server
    pub fn new(processor: ImageProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let state = AppState {
            processor: Arc::clone(&self.processor),
        };

        Router::new()
            .route("/", get(routes::index))
            .route("/filteredimage", get(routes::filtered_image))
            .route("/health", get(routes::health))
            .with_state(state)
    }

    /// Run the web server with graceful shutdown
    pub async fn run_with_shutdown(
        &self,
        port: u16,
        shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<(), WebError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server running at http://localhost:{}", port);

        let mut shutdown = shutdown;
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Web server shutting down gracefully");
            })
            .await
            .map_err(|e| WebError::ServerError(e.to_string()))
    }
}
