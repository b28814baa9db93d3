use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::errors::client_error;

/// Full-duplex opaque byte relay between the client and `host:port`.
///
/// `leftover` carries client bytes the request reader had already buffered
/// past the CONNECT head (clients can pipeline the TLS hello); they reach
/// the origin before the relay loop starts. Either side hitting EOF or an
/// error ends the tunnel; the origin socket closes on drop and the caller
/// owns the client socket.
pub async fn tunnel_relay(
    client: &mut TcpStream,
    host: &str,
    port: &str,
    leftover: &[u8],
) -> Result<()> {
    let mut origin = match TcpStream::connect(format!("{host}:{port}")).await {
        Ok(stream) => stream,
        Err(err) => {
            log::debug!("tunnel connect failed for {host}:{port}: {err}");
            client_error(
                client,
                host,
                502,
                "Bad Gateway",
                "Unable to connect to the origin server",
            )
            .await?;
            return Ok(());
        }
    };

    client
        .write_all(b"HTTP/1.0 200 Connection Established\r\n\r\n")
        .await?;
    client.flush().await?;

    if !leftover.is_empty() {
        origin.write_all(leftover).await?;
        origin.flush().await?;
    }

    let (mut client_rd, mut client_wr) = client.split();
    let (mut origin_rd, mut origin_wr) = origin.split();
    let mut inbound = [0u8; 8192];
    let mut outbound = [0u8; 8192];

    loop {
        tokio::select! {
            read = client_rd.read(&mut outbound) => match read {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if origin_wr.write_all(&outbound[..n]).await.is_err() {
                        break;
                    }
                }
            },
            read = origin_rd.read(&mut inbound) => match read {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if client_wr.write_all(&inbound[..n]).await.is_err() {
                        break;
                    }
                }
            },
        }
    }

    Ok(())
}
