//! Image transformation operations.
//!
//! Decodes the downloaded bytes, applies resize, greyscale and JPEG quality,
//! and writes the result to a uniquely named file in the transient directory.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Transform errors
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Image decode failed: {0}")]
    Decode(#[source] image::ImageError),

    #[error("JPEG encode failed: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Image transformation options
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
    /// Reduce to a single luminance channel
    pub greyscale: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            quality: 60,
            greyscale: true,
        }
    }
}

/// Writes filtered images into one directory under collision-free names
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    output_dir: PathBuf,
    options: TransformOptions,
}

impl ImageTransformer {
    pub fn new(output_dir: impl Into<PathBuf>, options: TransformOptions) -> Self {
        Self {
            output_dir: output_dir.into(),
            options,
        }
    }

    /// Fresh `filtered-<uuid>.jpg` path inside the output directory
    pub fn next_output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("filtered-{}.jpg", Uuid::new_v4().simple()))
    }

    /// Decode, filter and encode `bytes`, then write the JPEG to a new file
    ///
    /// Returns the path of the written file. Decoding and encoding run on the
    /// blocking pool. On any failure no output file is left behind.
    pub async fn transform(&self, bytes: Bytes) -> Result<PathBuf, TransformError> {
        let options = self.options.clone();
        let encoded = tokio::task::spawn_blocking(move || filter_to_jpeg(&bytes, &options)).await??;

        let path = self.next_output_path();
        if let Err(source) = tokio::fs::write(&path, &encoded).await {
            // A partial file may exist if the write failed midway
            let _ = tokio::fs::remove_file(&path).await;
            return Err(TransformError::Write { path, source });
        }

        tracing::debug!("Wrote {} bytes to {}", encoded.len(), path.display());
        Ok(path)
    }
}

/// Run the full filter pipeline in memory and return the JPEG bytes
pub fn filter_to_jpeg(bytes: &[u8], options: &TransformOptions) -> Result<Vec<u8>, TransformError> {
    let img = decode(bytes)?;
    tracing::info!("Image decoded: {}x{}", img.width(), img.height());

    let img = apply_filters(img, options);

    let mut output = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut output, options.quality.clamp(1, 100));
    img.write_with_encoder(encoder)
        .map_err(TransformError::Encode)?;

    Ok(output.into_inner())
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, TransformError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(image::ImageError::IoError(e)))?
        .decode()
        .map_err(TransformError::Decode)
}

/// Resize (ignoring aspect ratio), then greyscale
///
/// Colour types JPEG cannot carry (alpha, 16-bit) are narrowed to 8-bit
/// luma or RGB.
fn apply_filters(img: DynamicImage, options: &TransformOptions) -> DynamicImage {
    let (src_width, src_height) = (img.width(), img.height());
    tracing::debug!(
        "Resizing {}x{} -> {}x{}",
        src_width,
        src_height,
        options.width,
        options.height
    );

    let resized = img.resize_exact(options.width, options.height, FilterType::Triangle);

    if options.greyscale {
        DynamicImage::ImageLuma8(resized.to_luma8())
    } else {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    }
}
