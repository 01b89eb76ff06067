use std::net::SocketAddr;

/// Key used when neither a forwarded header nor a peer address is available
pub const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

/// Extract the rate limiting key for a request.
///
/// The first entry of `X-Forwarded-For` wins, since the service normally runs
/// behind a proxy or platform edge. Without it the peer address is used, and
/// without a peer address every caller shares the loopback key.
pub fn client_key(headers: &http::HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return first_ip.to_string();
                }
            }
        }
    }

    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| FALLBACK_CLIENT_IP.to_string())
}
