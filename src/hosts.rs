//! Subject alternative name classification.
//!
//! Host strings come from configuration as DNS names or IP literals, possibly
//! with a `:port` suffix. Each lands in exactly one SAN bucket; nothing is
//! rejected here.

use std::net::IpAddr;

use crate::cert::extensions::SubjectAltName;

/// Partitions `hosts` into IP addresses and DNS names, keeping the relative
/// order inside each bucket.
///
/// A `:port` suffix is removed first when the string splits cleanly into host
/// and port; the remainder is an IP address if it parses as one and a DNS name
/// otherwise.
pub fn classify_hosts<S: AsRef<str>>(hosts: &[S]) -> SubjectAltName {
    let mut san = SubjectAltName::default();
    for host in hosts {
        let host = host.as_ref();
        let host = split_host_port(host).map_or(host, |(host, _)| host);
        match host.parse::<IpAddr>() {
            Ok(ip) => san.ip_addresses.push(ip),
            Err(_) => san.dns_names.push(host.to_string()),
        }
    }
    san
}

/// Splits `host:port`, `[host]:port` or `[v6%zone]:port`.
///
/// Returns `None` for anything else, including bare IPv6 literals, a
/// bracketed host without a port and hosts with stray brackets or colons.
/// The port is not validated.
pub fn split_host_port(input: &str) -> Option<(&str, &str)> {
    let colon = input.rfind(':')?;
    let (host, port) = (&input[..colon], &input[colon + 1..]);
    let host = if let Some(rest) = host.strip_prefix('[') {
        // the closing bracket must sit right before the port separator
        let inner = rest.strip_suffix(']')?;
        if inner.contains(['[', ']']) {
            return None;
        }
        inner
    } else {
        if host.contains([':', '[', ']']) {
            return None;
        }
        host
    };
    if port.contains(['[', ']']) {
        return None;
    }
    Some((host, port))
}
