//! Shared fixtures for unit tests: synthetic images and a loopback image host.

use axum::body::Body;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use std::time::Duration;
use tokio::net::TcpListener;

/// Colourful test image with distinct R, G and B channels
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let r = (x % 256) as u8;
        let g = (y % 256) as u8;
        let b = ((x + y) % 256) as u8;
        Rgb([r, g, b])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn encode_test_image(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    buffer
}

/// Serve fixture files on an ephemeral loopback port and return the base URL
///
/// Routes: `/photo.jpg` (1024x768 colour JPEG), `/photo.png` (PNG),
/// `/not-an-image` (HTML), `/small.bin`, `/large.bin` (2 KiB),
/// `/chunked.bin` (2 KiB without Content-Length), `/slow` (answers after
/// 3 s), `/broken` (500). Anything else is 404.
pub async fn spawn_source_server() -> String {
    let jpeg = encode_test_image(&gradient_image(1024, 768), ImageFormat::Jpeg);
    let png = encode_test_image(&gradient_image(320, 200), ImageFormat::Png);

    let app = Router::new()
        .route(
            "/photo.jpg",
            get(move || async move { ([(header::CONTENT_TYPE, "image/jpeg")], jpeg) }),
        )
        .route(
            "/photo.png",
            get(move || async move { ([(header::CONTENT_TYPE, "image/png")], png) }),
        )
        .route(
            "/not-an-image",
            get(|| async { axum::response::Html("<html><body>hello</body></html>") }),
        )
        .route("/small.bin", get(|| async { &b"0123456789"[..] }))
        .route("/large.bin", get(|| async { vec![0u8; 2048] }))
        .route(
            "/chunked.bin",
            get(|| async {
                let chunks = (0..4).map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 512])));
                Body::from_stream(futures_util::stream::iter(chunks))
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        )
        .route(
            "/broken",
            get(|| async {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}
