//! Reachability probe for the analyzed app's `listen(...)` port

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use trellis_core::UrlInfo;

const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// True if something accepts TCP connections on `127.0.0.1:port`.
pub async fn is_listening(port: u16) -> bool {
    matches!(
        timeout(PROBE_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}

/// Fill in `reachable`. Never touches the graph itself.
pub async fn probe(url_info: &mut UrlInfo) {
    let reachable = is_listening(url_info.port).await;
    tracing::debug!("Probe {} reachable={}", url_info.url, reachable);
    url_info.reachable = Some(reachable);
}
