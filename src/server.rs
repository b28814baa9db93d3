use std::io;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

use crate::cache::ObjectCache;
use crate::errors::client_error;
use crate::relay::handle_http_request;
use crate::request::read_request;
use crate::tunnel::tunnel_relay;
use crate::uri::{parse_uri, split_connect_target};

/// Accept loop: one detached worker per client connection. The cache is the
/// only state workers share.
pub async fn serve(listener: TcpListener, cache: Arc<ObjectCache>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(_) => continue,
        };
        let _ = stream.set_nodelay(true);
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, cache).await {
                log::warn!("peer={peer} error: {err}");
            }
        });
    }
}

/// Drives one client session: read the request head, then either tunnel
/// (CONNECT) or relay (everything else). Owns the client socket; it closes
/// on return.
pub async fn handle_client(mut stream: TcpStream, cache: Arc<ObjectCache>) -> Result<()> {
    let (outcome, leftover) = {
        let mut reader = BufReader::new(&mut stream);
        let outcome = read_request(&mut reader).await;
        (outcome, reader.buffer().to_vec())
    };

    let req = match outcome {
        Ok(Some(req)) => req,
        // Client went away before a full request head; nothing is owed.
        Ok(None) => return Ok(()),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            client_error(
                &mut stream,
                &err.to_string(),
                400,
                "Bad Request",
                "Cannot parse the request",
            )
            .await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if req.method.eq_ignore_ascii_case("CONNECT") {
        let (host, port) = split_connect_target(&req.uri);
        log::info!("CONNECT {host}:{port}");
        return tunnel_relay(&mut stream, &host, &port, &leftover).await;
    }

    let Some(target) = parse_uri(&req.uri) else {
        client_error(
            &mut stream,
            &req.uri,
            400,
            "Bad Request",
            "Cannot parse the request URI",
        )
        .await?;
        return Ok(());
    };

    log::info!("{} {}", req.method, req.uri);
    handle_http_request(&mut stream, &req, &target, &cache).await
}
