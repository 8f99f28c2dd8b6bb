//! Chunked file transfer over HTTP, so media never sits in memory whole.

use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;

/// Open `path` as a streaming request body plus its length in bytes
pub(crate) async fn file_body(path: &Path) -> std::io::Result<(reqwest::Body, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    Ok((reqwest::Body::wrap_stream(ReaderStream::new(file)), len))
}

/// Write a response body to `dest` chunk by chunk, returning the byte count
pub(crate) async fn write_body(
    response: reqwest::Response,
    dest: &Path,
) -> std::result::Result<u64, String> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| format!("cannot create {}: {}", dest.display(), e))?;

    let mut written = 0u64;
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("cannot write {}: {}", dest.display(), e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| format!("cannot write {}: {}", dest.display(), e))?;
    Ok(written)
}
