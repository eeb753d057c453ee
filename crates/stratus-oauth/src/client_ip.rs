//! Client IP resolution for the trusted-gateway headers.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use http::HeaderMap;

/// Header value sent when no address can be determined.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// Resolve the caller's address.
///
/// Takes the right-most globally routable entry of `X-Forwarded-For`, so
/// proxies we control (private addresses appended after the real client)
/// are skipped. Falls back to the peer address.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect::<Vec<_>>();

    forwarded
        .iter()
        .rev()
        .filter_map(|entry| entry.parse::<IpAddr>().ok())
        .find(is_global)
        .or_else(|| peer.map(|addr| addr.ip()))
}

/// Header form of [`resolve_client_ip`]; unresolvable callers are `unknown`.
pub fn client_ip_header(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    resolve_client_ip(headers, peer)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string())
}

fn is_global(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_global_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_global_v4(&v4),
            None => is_global_v6(v6),
        },
    }
}

fn is_global_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 carrier-grade NAT
    let shared = a == 100 && (b & 0xc0) == 64;
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || shared)
}

fn is_global_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || unique_local || link_local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xff(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", value.parse().unwrap());
        headers
    }

    #[test]
    fn test_rightmost_global_address() {
        let headers = xff("10.0.0.1, 203.0.113.5, 192.168.1.1");
        assert_eq!(
            resolve_client_ip(&headers, None),
            Some("203.0.113.5".parse().unwrap())
        );
    }

    #[test]
    fn test_prefers_rightmost_of_several_globals() {
        let headers = xff("198.51.100.7, 203.0.113.5, 127.0.0.1");
        assert_eq!(
            client_ip_header(&headers, None),
            "203.0.113.5"
        );
    }

    #[test]
    fn test_falls_back_to_peer() {
        let peer: SocketAddr = "10.1.2.3:55000".parse().unwrap();
        let headers = xff("10.0.0.1, 100.64.0.9, fe80::1");
        assert_eq!(client_ip_header(&headers, Some(peer)), "10.1.2.3");
        assert_eq!(client_ip_header(&HeaderMap::new(), Some(peer)), "10.1.2.3");
    }

    #[test]
    fn test_garbage_is_unknown() {
        let headers = xff("not-an-ip, also bad");
        assert_eq!(client_ip_header(&headers, None), UNKNOWN_CLIENT_IP);
    }

    #[test]
    fn test_ipv6() {
        let headers = xff("2001:db8::1, fd00::1");
        assert_eq!(client_ip_header(&headers, None), "2001:db8::1");
    }
}
