//! Working out the address that other devices can reach this machine at

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::debug;

// no packets are sent; connecting a udp socket only selects a route
const PROBE_ADDR: &str = "8.8.8.8:80";

/// The local IPv4 address of the interface used for outbound traffic, or
/// `127.0.0.1` if it can't be determined.
pub fn local_ip() -> IpAddr {
    probe_local_ip().unwrap_or_else(|e| {
        debug!("Unable to determine local ip, using loopback: {e}");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

fn probe_local_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(PROBE_ADDR)?;
    Ok(socket.local_addr()?.ip())
}

/// The url that the QR code should point to: an explicitly configured public
/// url if there is one, otherwise the local address on the given port.
pub fn server_url(explicit: Option<&str>, port: u16) -> String {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => format!("http://{}:{port}", local_ip()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_local_ip_is_ipv4() {
        // either a real interface address or the loopback fallback
        assert!(local_ip().is_ipv4());
    }

    #[test]
    fn test_server_url() {
        assert_eq!(
            server_url(Some("https://tracker.example.com/"), 5000),
            "https://tracker.example.com"
        );
        let url = server_url(Some("  "), 5000);
        assert!(url.starts_with("http://"));
        assert!(url.ends_with(":5000"));
        assert_eq!(server_url(None, 8080), format!("http://{}:8080", local_ip()));
    }
}
