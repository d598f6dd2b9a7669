//! Peer address allowlist for the events route.
//!
//! Bybit delivers from a published set of egress ranges. When ranges are
//! configured, only peers inside one of them reach the handler. The peer
//! address comes from axum's `ConnectInfo`, so the server must be started
//! with `into_make_service_with_connect_info::<SocketAddr>()`.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ipnetwork::{IpNetwork, IpNetworkError};
use thiserror::Error;
use tracing::warn;

use crate::handlers::events::create_error_response;

/// Set of CIDR ranges allowed to deliver events.
///
/// An empty list admits every peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpAllowlist {
    networks: Vec<IpNetwork>,
}

impl IpAllowlist {
    /// Allowlist that admits every peer.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Creates an allowlist from parsed ranges.
    pub fn new(networks: Vec<IpNetwork>) -> Self {
        Self { networks }
    }

    /// Parses a comma-separated list of CIDR ranges or bare addresses.
    ///
    /// Blank entries are skipped, so `""` yields an allow-all list.
    ///
    /// # Errors
    ///
    /// Returns the first entry that fails to parse.
    pub fn parse(ranges: &str) -> Result<Self, IpNetworkError> {
        let networks = ranges
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse::<IpNetwork>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { networks })
    }

    /// True when no ranges are configured.
    pub fn is_unrestricted(&self) -> bool {
        self.networks.is_empty()
    }

    /// Configured ranges.
    pub fn networks(&self) -> &[IpNetwork] {
        &self.networks
    }

    /// Whether `ip` may deliver events.
    pub fn permits(&self, ip: IpAddr) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let ip = canonical(ip);
        self.networks.iter().any(|network| network.contains(ip))
    }
}

/// Maps IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) to plain IPv4 so
/// dual-stack listeners match IPv4 ranges.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    }
}

/// Peer rejected by the allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllowlistError {
    /// Peer address is outside every configured range (E2101).
    #[error("[E2101] Peer address is not allowed")]
    Forbidden,

    /// Connection info unavailable while ranges are configured (E2102).
    #[error("[E2102] Peer address is unknown")]
    UnknownPeer,
}

impl AllowlistError {
    /// Returns the stable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Forbidden => "E2101",
            Self::UnknownPeer => "E2102",
        }
    }
}

impl IntoResponse for AllowlistError {
    fn into_response(self) -> Response {
        create_error_response(StatusCode::FORBIDDEN, self.code(), "Forbidden")
    }
}

/// Axum middleware enforcing the allowlist.
pub async fn allowlist_middleware(
    State(allowlist): State<Arc<IpAllowlist>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AllowlistError> {
    if allowlist.is_unrestricted() {
        return Ok(next.run(req).await);
    }

    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0);

    match peer {
        Some(addr) if allowlist.permits(addr.ip()) => Ok(next.run(req).await),
        Some(addr) => {
            warn!(peer = %addr.ip(), "Rejected delivery from address outside allowlist");
            Err(AllowlistError::Forbidden)
        },
        None => {
            warn!("Rejected delivery without connection info while allowlist is active");
            Err(AllowlistError::UnknownPeer)
        },
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn empty_list_permits_everyone() {
        let allowlist = IpAllowlist::parse(" , ").unwrap();

        assert!(allowlist.is_unrestricted());
        assert!(allowlist.permits(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
    }

    #[test]
    fn parses_ranges_and_bare_addresses() {
        let allowlist = IpAllowlist::parse("10.0.0.0/8, 192.168.1.7 ,2001:db8::/32").unwrap();
        assert_eq!(allowlist.networks().len(), 3);

        assert!(allowlist.permits(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3))));
        assert!(allowlist.permits(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 7))));
        assert!(!allowlist.permits(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 8))));
        assert!(allowlist.permits("2001:db8::1".parse().unwrap()));
        assert!(!allowlist.permits(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }

    #[test]
    fn mapped_ipv4_matches_ipv4_range() {
        let allowlist = IpAllowlist::parse("10.0.0.0/8").unwrap();
        let mapped = IpAddr::V6(Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped());

        assert!(allowlist.permits(mapped));
    }

    #[test]
    fn invalid_range_fails_to_parse() {
        assert!(IpAllowlist::parse("10.0.0.0/33").is_err());
        assert!(IpAllowlist::parse("not-an-ip").is_err());
    }

    #[test]
    fn rejections_carry_distinct_codes() {
        assert_eq!(AllowlistError::Forbidden.code(), "E2101");
        assert_eq!(AllowlistError::UnknownPeer.code(), "E2102");
        assert_eq!(AllowlistError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
    }
}
