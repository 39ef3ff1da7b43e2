//! CONNECT tunneling for HTTPS guest traffic: once the axum handler answers
//! a `CONNECT` request, the underlying TCP connection is upgraded to a raw
//! byte pipe between the guest and the destination host, metered and
//! capped the same way a plain HTTP forward is.

use crate::stats::ProxyStats;
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Pump bytes from `reader` to `writer` until EOF or `try_add` reports the
/// cumulative cap was reached, in which case the pump stops silently
/// rather than signaling the peer.
async fn copy_capped<R, W>(
    mut reader: R,
    mut writer: W,
    mut try_add: impl FnMut(u64) -> bool,
) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if try_add(n as u64) {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
    }
}

/// Dial `target` (a `host:port` authority) and relay bytes in both
/// directions, accounting upload (guest -> target) and download
/// (target -> guest) bytes against the run's caps.
pub async fn tunnel(
    upgraded: Upgraded,
    target: &str,
    stats: Arc<ProxyStats>,
    upload_cap: u64,
    download_cap: u64,
) -> std::io::Result<()> {
    let server = TcpStream::connect(target).await?;
    let client = TokioIo::new(upgraded);

    let (client_r, client_w) = tokio::io::split(client);
    let (server_r, server_w) = server.into_split();

    let upload_stats = stats.clone();
    let download_stats = stats;

    let client_to_server = copy_capped(client_r, server_w, move |n| {
        upload_stats.try_add_upload(n, upload_cap)
    });
    let server_to_client = copy_capped(server_r, client_w, move |n| {
        download_stats.try_add_download(n, download_cap)
    });

    let (up, down) = tokio::join!(client_to_server, server_to_client);
    up?;
    down?;
    Ok(())
}
