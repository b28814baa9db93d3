use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::cache::ObjectCache;
use crate::errors::client_error;
use crate::headers::rewrite_headers;
use crate::request::ParsedRequest;
use crate::uri::Target;
use crate::MAX_OBJECT_SIZE;

/// Executes one HTTP/1.0 proxy request: cache consult, origin connect,
/// header rewrite, response streaming, opportunistic cache store.
pub async fn handle_http_request(
    client: &mut TcpStream,
    req: &ParsedRequest,
    target: &Target,
    cache: &ObjectCache,
) -> Result<()> {
    if let Some(payload) = cache.get(&req.uri) {
        log::debug!("cache hit: {} ({} bytes)", req.uri, payload.len());
        client.write_all(&payload).await?;
        client.flush().await?;
        return Ok(());
    }

    let mut origin = match TcpStream::connect(format!("{}:{}", target.host, target.port)).await {
        Ok(stream) => stream,
        Err(err) => {
            log::debug!("origin connect failed for {}: {err}", req.uri);
            client_error(
                client,
                &target.host,
                502,
                "Bad Gateway",
                "Proxy couldn't connect to origin server",
            )
            .await?;
            return Ok(());
        }
    };

    // Origin-form request line, then the rewritten header block.
    let mut upstream_head =
        format!("{} {} HTTP/1.0\r\n", req.method, target.path).into_bytes();
    upstream_head.extend_from_slice(&rewrite_headers(&req.headers, &target.host));
    origin.write_all(&upstream_head).await?;
    origin.flush().await?;

    // Stream the response back, capturing into scratch while it still fits.
    let mut chunk = [0u8; 8192];
    let mut scratch = Vec::new();
    let mut overflowed = false;
    loop {
        let n = origin.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        client.write_all(&chunk[..n]).await?;
        if !overflowed {
            if scratch.len() + n <= MAX_OBJECT_SIZE {
                scratch.extend_from_slice(&chunk[..n]);
            } else {
                overflowed = true;
                scratch = Vec::new();
            }
        }
    }
    client.flush().await?;

    if !overflowed {
        log::debug!("caching {} ({} bytes)", req.uri, scratch.len());
        cache.put(&req.uri, &scratch);
    }

    Ok(())
}
