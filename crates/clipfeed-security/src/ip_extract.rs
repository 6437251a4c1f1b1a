use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;

/// Default trusted CIDRs (§4.3): loopback, RFC-1918, and IPv6 ULA. A peer
/// inside one of these is assumed to be our own reverse proxy, so its
/// `X-Real-IP` header is trusted.
pub fn default_trusted_cidrs() -> Vec<IpNetwork> {
    [
        "127.0.0.0/8",
        "::1/128",
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "fc00::/7",
    ]
    .iter()
    .map(|cidr| IpNetwork::from_str(cidr).expect("static CIDR literal is valid"))
    .collect()
}

fn is_trusted(peer: IpAddr, trusted: &[IpNetwork]) -> bool {
    trusted.iter().any(|net| net.contains(peer))
}

/// Strips a trailing `:<port>` from a socket address string. IPv6
/// addresses are expected in bracketed form (`[::1]:8080`); bare IPv6
/// literals without a port pass through unchanged.
fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) && !host.contains(':') => host,
        _ => addr,
    }
}

/// Resolves the client IP for a request per §4.3: trust `X-Real-IP` only
/// when `peer_addr` is within a trusted CIDR, else take the left-most
/// `X-Forwarded-For` entry, else fall back to the peer address itself
/// with its port stripped.
pub fn extract_client_ip(
    peer_addr: &str,
    x_real_ip: Option<&str>,
    x_forwarded_for: Option<&str>,
    trusted: &[IpNetwork],
) -> String {
    let peer_host = strip_port(peer_addr);

    if let Ok(peer_ip) = peer_host.parse::<IpAddr>() {
        if is_trusted(peer_ip, trusted) {
            if let Some(real_ip) = x_real_ip.map(str::trim).filter(|s| !s.is_empty()) {
                return real_ip.to_string();
            }
            if let Some(forwarded) = x_forwarded_for {
                if let Some(first) = forwarded.split(',').next().map(str::trim).filter(|s| !s.is_empty()) {
                    return first.to_string();
                }
            }
        }
    }

    peer_host.to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trusts_x_real_ip_from_a_loopback_peer() {
        let trusted = default_trusted_cidrs();
        let ip = extract_client_ip("127.0.0.1:54321", Some("203.0.113.5"), None, &trusted);
        assert_eq!(ip, "203.0.113.5");
    }

    #[test]
    fn ignores_x_real_ip_from_an_untrusted_peer() {
        let trusted = default_trusted_cidrs();
        let ip = extract_client_ip("203.0.113.9:443", Some("1.2.3.4"), None, &trusted);
        assert_eq!(ip, "203.0.113.9");
    }

    #[test]
    fn falls_back_to_leftmost_forwarded_for_entry() {
        let trusted = default_trusted_cidrs();
        let ip = extract_client_ip(
            "10.0.0.5:8080",
            None,
            Some("203.0.113.7, 10.0.0.1"),
            &trusted,
        );
        assert_eq!(ip, "203.0.113.7");
    }

    #[test]
    fn untrusted_peer_uses_peer_address_even_with_forwarded_headers() {
        let trusted = default_trusted_cidrs();
        let ip = extract_client_ip(
            "203.0.113.9:443",
            None,
            Some("9.9.9.9, 8.8.8.8"),
            &trusted,
        );
        assert_eq!(ip, "203.0.113.9");
    }

    #[test]
    fn strips_the_port_from_a_bare_peer_address() {
        assert_eq!(strip_port("203.0.113.9:443"), "203.0.113.9");
        assert_eq!(strip_port("[::1]:443"), "::1");
    }

    #[test]
    fn private_rfc1918_peer_is_trusted() {
        let trusted = default_trusted_cidrs();
        let ip = extract_client_ip("172.16.5.2:1234", Some("203.0.113.5"), None, &trusted);
        assert_eq!(ip, "203.0.113.5");
    }
}
