//! Private-address guard for outbound fetches.
//!
//! Refuses targets whose host is, or resolves to, a loopback, private,
//! link-local, multicast or unspecified address.
use std::net::{IpAddr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use url::{Host, Url};

/// Error type for address guard failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SsrfError {
    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("DNS resolution failed: {0}")]
    DnsError(String),
}

/// Check if an IP address is private, reserved, or otherwise blocked.
///
/// This covers:
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - RFC 1918 private ranges (10/8, 172.16/12, 192.168/16)
/// - Link-local addresses (169.254/16, fe80::/10)
/// - Multicast addresses (224/4, ff00::/8)
/// - Unspecified addresses (0.0.0.0/8, ::)
/// - IPv6 unique local (fc00::/7)
/// - IPv4-mapped IPv6 forms of all of the above
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Validate that an IP address is not private or reserved.
pub fn validate_ip(ip: IpAddr) -> Result<(), SsrfError> {
    if is_private_or_reserved(ip) { Err(SsrfError::BlockedIp(ip)) } else { Ok(()) }
}

/// Reject URLs whose host is a literal private address.
///
/// Domain names pass; [`PublicOnlyResolver`] checks them at connect time.
pub fn check_literal_host(url: &Url) -> Result<(), SsrfError> {
    match url.host() {
        Some(Host::Ipv4(v4)) => validate_ip(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => validate_ip(IpAddr::V6(v6)),
        _ => Ok(()),
    }
}

/// Resolve `host` and require every answer to be public.
pub async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>, SsrfError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| SsrfError::DnsError(format!("{host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(SsrfError::DnsError(format!("{host}: no addresses")));
    }
    for addr in &addrs {
        validate_ip(addr.ip())?;
    }
    Ok(addrs)
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// DNS resolver for the HTTP client that refuses private answers.
///
/// reqwest asks it for every connection it opens, redirect hops included, so
/// the address checked is the address dialled. IP-literal hosts never reach
/// a resolver; [`check_literal_host`] covers those.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let addrs = resolve_public(name.as_str()).await.map_err(|e| {
                tracing::debug!(host = name.as_str(), error = %e, "refused to resolve");
                Box::new(e) as BoxError
            })?;
            Ok::<Addrs, BoxError>(Box::new(addrs.into_iter()))
        })
    }
}
