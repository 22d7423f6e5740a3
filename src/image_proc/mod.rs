//! Image processing module.
//!
//! Provides image download and transformation for the filter endpoint.

pub mod download;
pub mod transform;

pub use download::{FetchError, ImageFetcher};
pub use transform::{ImageTransformer, TransformError, TransformOptions};

use std::path::PathBuf;
use thiserror::Error;

/// Image processing errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Download error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
}

/// Image processor that handles the full pipeline
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    fetcher: ImageFetcher,
    transformer: ImageTransformer,
}

impl ImageProcessor {
    /// Create a new image processor
    pub fn new(fetcher: ImageFetcher, transformer: ImageTransformer) -> Self {
        Self {
            fetcher,
            transformer,
        }
    }

    /// Download and filter an image, returning the path of the filtered file
    ///
    /// Full pipeline:
    /// 1. Download image from URL
    /// 2. Resize to 256x256, greyscale, encode JPEG at quality 60
    /// 3. Write to a unique file in the transient directory
    ///
    /// The caller owns the returned file and must delete it.
    pub async fn filter_image_from_url(&self, url: &str) -> Result<PathBuf, ProcessingError> {
        let bytes = self.fetcher.fetch(url).await?;
        let path = self.transformer.transform(bytes).await?;

        tracing::info!("Filtered image written to {}", path.display());
        Ok(path)
    }
}
