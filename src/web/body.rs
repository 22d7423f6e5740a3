//! Streaming response body for filtered images.
//!
//! The file backing a response is deleted when the body is dropped, which
//! hyper does once the last chunk is written, the write fails, or the client
//! goes away. Cleanup therefore always follows the send, exactly once.
//!
//! Only failures visible to the stream are logged: a file read error, or the
//! body being dropped before the file was fully read. A socket write that
//! fails after the last chunk has been handed to hyper is not observed here.

use crate::cleanup;
use bytes::Bytes;
use futures_util::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Owns a transient file and deletes it on drop
#[derive(Debug)]
pub struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Err(e) = cleanup::delete_local_files(&[&self.path]) {
            tracing::error!("Cleanup failed: {}", e);
        }
    }
}

/// File contents as a byte stream, tied to the file's [`TempFileGuard`]
pub struct FilteredImageBody {
    inner: ReaderStream<File>,
    guard: TempFileGuard,
    sent: u64,
    finished: bool,
}

impl FilteredImageBody {
    pub fn new(file: File, guard: TempFileGuard) -> Self {
        Self {
            inner: ReaderStream::new(file),
            guard,
            sent: 0,
            finished: false,
        }
    }
}

impl Stream for FilteredImageBody {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        let item = match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(item) => item,
        };

        match &item {
            Some(Ok(chunk)) => this.sent += chunk.len() as u64,
            Some(Err(e)) => {
                tracing::warn!("Failed reading {}: {}", this.guard.path().display(), e);
                this.finished = true;
            }
            None => {
                tracing::debug!(
                    "Sent {} bytes from {}",
                    this.sent,
                    this.guard.path().display()
                );
                this.finished = true;
            }
        }

        Poll::Ready(item)
    }
}

impl Drop for FilteredImageBody {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                "Response for {} ended after {} bytes",
                self.guard.path().display(),
                self.sent
            );
        }
    }
}
