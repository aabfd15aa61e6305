//! CONNECT tunneling.
//!
//! Tunneled bytes are opaque (usually TLS), so tunnels are never observed.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

/// Answer a CONNECT request and splice the upgraded connection to the target.
pub async fn handle_connect<B>(request: Request<B>) -> Response
where
    B: Send + 'static,
{
    let Some(authority) = request.uri().authority().map(|a| a.to_string()) else {
        return (StatusCode::BAD_REQUEST, "CONNECT must be to a socket address").into_response();
    };

    let server = match TcpStream::connect(&authority).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(target_addr = %authority, error = %e, "CONNECT target unreachable");
            return (StatusCode::BAD_GATEWAY, "CONNECT target unreachable").into_response();
        }
    };

    tokio::spawn(async move {
        match hyper::upgrade::on(request).await {
            Ok(upgraded) => match tunnel(upgraded, server).await {
                Ok((up, down)) => {
                    tracing::debug!(target_addr = %authority, up, down, "Tunnel closed");
                }
                Err(e) => tracing::debug!(target_addr = %authority, error = %e, "Tunnel error"),
            },
            Err(e) => tracing::warn!(target_addr = %authority, error = %e, "Upgrade failed"),
        }
    });

    Response::new(Body::empty())
}

async fn tunnel(upgraded: Upgraded, mut server: TcpStream) -> std::io::Result<(u64, u64)> {
    let mut client = TokioIo::new(upgraded);
    tokio::io::copy_bidirectional(&mut client, &mut server).await
}
