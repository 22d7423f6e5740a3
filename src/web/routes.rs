//! HTTP route handlers.

use super::body::{FilteredImageBody, TempFileGuard};
use crate::image_proc::{ImageProcessor, ProcessingError};
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Text returned by `GET /`
pub const USAGE: &str = "Try GET /filteredimage?image_url={{URL}} to filter an image.";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<ImageProcessor>,
}

/// Query string for `/filteredimage`
#[derive(Debug, Deserialize)]
pub struct FilterParams {
    pub image_url: Option<String>,
}

/// Failures surfaced by the filter endpoint
///
/// Only two shapes ever reach the client: 400 for a missing URL and 500 for
/// everything else. Details stay in the server log.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("image_url query parameter is missing or empty")]
    MissingImageUrl,

    #[error("Malformed query string: {0}")]
    InvalidQuery(#[from] QueryRejection),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Failed to open filtered image: {0}")]
    Respond(#[source] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingImageUrl | ApiError::InvalidQuery(_) => {
                tracing::debug!("Rejected request: {}", self);
                (StatusCode::BAD_REQUEST, "Please provide a valid image URL").into_response()
            }
            _ => {
                tracing::error!("Could not filter image: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Could not filter the image").into_response()
            }
        }
    }
}

/// GET / - Usage hint
pub async fn index() -> &'static str {
    USAGE
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /filteredimage?image_url=... - Filter a remote image
///
/// The filtered file is owned by the response body from the moment it
/// exists, so it is removed even if opening it fails here.
pub async fn filtered_image(
    State(state): State<AppState>,
    query: Result<Query<FilterParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query?;
    let url = params
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(ApiError::MissingImageUrl)?;

    let path = state.processor.filter_image_from_url(url).await?;
    let guard = TempFileGuard::new(path);

    let file = tokio::fs::File::open(guard.path())
        .await
        .map_err(ApiError::Respond)?;
    let len = file.metadata().await.map_err(ApiError::Respond)?.len();

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
        (header::CONTENT_LENGTH, HeaderValue::from(len)),
    ];
    let body = Body::from_stream(FilteredImageBody::new(file, guard));

    Ok((headers, body).into_response())
}
